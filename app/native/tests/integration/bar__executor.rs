//! Block execution tests: polling, tailing, updates and cancellation.

use std::time::Duration;

use vbar_lib::bar::{BlockSpec, Position};
use vbar_lib::platform::ipc::{AddBlock, ControlRequest};

use crate::common::*;

#[tokio::test]
async fn test_command_output_becomes_text() {
    let bar = TestBar::start().await;
    bar.send(ControlRequest::AddBlock(AddBlock {
        command: Some("printf '  spaced out  \\n'".into()),
        ..block("trimmed")
    }))
    .await
    .unwrap();

    let sink = bar.sink.clone();
    assert!(eventually(SETTLE_TIMEOUT, || sink.text_of("trimmed").as_deref() == Some("spaced out")).await);
    bar.stop().await;
}

#[tokio::test]
async fn test_failing_command_shows_error() {
    let bar = TestBar::start().await;
    bar.send(ControlRequest::AddBlock(AddBlock {
        text: "pending".into(),
        command: Some("exit 3".into()),
        ..block("broken")
    }))
    .await
    .unwrap();

    let sink = bar.sink.clone();
    assert!(eventually(SETTLE_TIMEOUT, || sink.text_of("broken").as_deref() == Some("ERROR")).await);
    bar.stop().await;
}

#[tokio::test]
async fn test_tail_lines_arrive_in_order() {
    let bar = TestBar::start().await;
    bar.send(ControlRequest::AddBlock(AddBlock {
        tail_command: Some("for i in 1 2 3 4 5; do echo line-$i; sleep 0.05; done".into()),
        ..block("stream")
    }))
    .await
    .unwrap();

    let sink = bar.sink.clone();
    assert!(eventually(SETTLE_TIMEOUT, || sink.text_of("stream").as_deref() == Some("line-5")).await);

    let history = sink.history_of("stream");
    let lines: Vec<_> = history.iter().filter(|text| !text.is_empty()).cloned().collect();
    assert_eq!(lines, vec!["line-1", "line-2", "line-3", "line-4", "line-5"]);
    bar.stop().await;
}

#[tokio::test]
async fn test_interval_reruns_command() {
    let bar = TestBar::start().await;
    let counter = bar.scratch("runs");
    let registry = bar.app().registry();

    let handle = registry
        .add_block(
            BlockSpec::new("ticker", Position::Right)
                .with_command(format!("echo run >> '{}'; wc -l < '{}'", counter.display(), counter.display()))
                .with_interval(Duration::from_millis(200)),
        )
        .unwrap();
    registry.start_block(&handle).unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let runs = line_count(&counter);
    assert!(runs >= 4, "expected at least 4 runs, got {runs}");

    bar.stop().await;
}

#[tokio::test]
async fn test_zero_interval_runs_once() {
    let bar = TestBar::start().await;
    let counter = bar.scratch("once");

    bar.send(ControlRequest::AddBlock(AddBlock {
        command: Some(format!("echo run >> '{}'", counter.display())),
        ..block("once")
    }))
    .await
    .unwrap();

    assert!(eventually(SETTLE_TIMEOUT, || line_count(&counter) == 1).await);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(line_count(&counter), 1);
    bar.stop().await;
}

#[tokio::test]
async fn test_update_reruns_on_demand() {
    let bar = TestBar::start().await;
    let source = bar.scratch("source");
    std::fs::write(&source, "first").unwrap();

    bar.send(ControlRequest::AddBlock(AddBlock {
        command: Some(format!("cat '{}'", source.display())),
        ..block("file")
    }))
    .await
    .unwrap();

    let sink = bar.sink.clone();
    assert!(eventually(SETTLE_TIMEOUT, || sink.text_of("file").as_deref() == Some("first")).await);

    std::fs::write(&source, "second").unwrap();
    bar.send(ControlRequest::Update { name: "file".into() }).await.unwrap();

    // The update request returns after the command has run.
    assert_eq!(bar.app().registry().list()[0].text, "second");
    assert!(eventually(SETTLE_TIMEOUT, || sink.text_of("file").as_deref() == Some("second")).await);
    bar.stop().await;
}

#[tokio::test]
async fn test_update_of_static_block_succeeds() {
    let bar = TestBar::start().await;
    bar.send(ControlRequest::AddBlock(AddBlock { text: "fixed".into(), ..block("label") }))
        .await
        .unwrap();

    assert!(bar.send(ControlRequest::Update { name: "label".into() }).await.is_ok());
    assert_eq!(bar.app().registry().list()[0].text, "fixed");
    bar.stop().await;
}

#[tokio::test]
async fn test_remove_cancels_running_command() {
    let bar = TestBar::start().await;
    let heartbeat = bar.scratch("heartbeat");

    bar.send(ControlRequest::AddBlock(AddBlock {
        tail_command: Some(format!("while true; do echo beat >> '{}'; sleep 0.05; done", heartbeat.display())),
        ..block("looping")
    }))
    .await
    .unwrap();

    assert!(eventually(SETTLE_TIMEOUT, || line_count(&heartbeat) >= 3).await);

    bar.send(ControlRequest::Remove { name: "looping".into() }).await.unwrap();
    let after_remove = line_count(&heartbeat);
    tokio::time::sleep(Duration::from_millis(300)).await;

    // At most one iteration that was already past its check may land.
    assert!(line_count(&heartbeat) <= after_remove + 1);
    assert!(bar.app().registry().find_block("looping").is_none());

    let sink = bar.sink.clone();
    assert!(eventually(SETTLE_TIMEOUT, || sink.text_of("looping").is_none()).await);
    bar.stop().await;
}

#[tokio::test]
async fn test_name_is_reusable_after_remove() {
    let bar = TestBar::start().await;
    bar.send(ControlRequest::AddBlock(AddBlock { text: "old".into(), ..block("slot") }))
        .await
        .unwrap();
    bar.send(ControlRequest::Remove { name: "slot".into() }).await.unwrap();
    bar.send(ControlRequest::AddBlock(AddBlock { text: "new".into(), ..block("slot") }))
        .await
        .unwrap();

    let sink = bar.sink.clone();
    assert!(eventually(SETTLE_TIMEOUT, || sink.text_of("slot").as_deref() == Some("new")).await);
    assert_eq!(sink.names_in_order(), vec!["slot"]);
    bar.stop().await;
}

#[tokio::test]
async fn test_shutdown_stops_long_running_blocks() {
    let bar = TestBar::start().await;
    bar.send(ControlRequest::AddBlock(AddBlock {
        tail_command: Some("sleep 30".into()),
        ..block("sleeper")
    }))
    .await
    .unwrap();

    tokio::time::timeout(Duration::from_secs(5), bar.stop()).await.unwrap();
}
