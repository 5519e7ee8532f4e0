//! Control protocol tests against a running bar.

use futures::future::join_all;
use vbar_lib::Error;
use vbar_lib::app::App;
use vbar_lib::bar::{MemorySink, Position};
use vbar_lib::platform::ipc::{
    AddBlock, AddCss, AddMenu, ControlRequest, ResponseData, is_app_running, send_request,
};

use crate::common::*;

#[tokio::test]
async fn test_add_block_round_trip() {
    let bar = TestBar::start().await;

    let reply = bar
        .send(ControlRequest::AddBlock(AddBlock {
            text: "hello".into(),
            right: true,
            ..block("greeting")
        }))
        .await
        .unwrap();
    assert_eq!(reply, None);

    let Some(ResponseData::Blocks { blocks }) = bar.send(ControlRequest::List).await.unwrap()
    else {
        panic!("expected block list");
    };
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].name, "greeting");
    assert_eq!(blocks[0].position, Position::Right);
    assert_eq!(blocks[0].text, "hello");
    assert_eq!(blocks[0].mode, "static");

    let sink = bar.sink.clone();
    assert!(eventually(SETTLE_TIMEOUT, || sink.text_of("greeting").as_deref() == Some("hello")).await);
    bar.stop().await;
}

#[tokio::test]
async fn test_unknown_block_is_reported() {
    let bar = TestBar::start().await;
    bar.send(ControlRequest::AddBlock(AddBlock { text: "here".into(), ..block("present") }))
        .await
        .unwrap();

    for request in [
        ControlRequest::Update { name: "ghost".into() },
        ControlRequest::Remove { name: "ghost".into() },
        ControlRequest::AddMenu(AddMenu {
            name: "ghost".into(),
            text: "Lock".into(),
            command: "true".into(),
        }),
    ] {
        let err = bar.send(request).await.unwrap_err();
        assert!(matches!(&err, Error::Other(reason) if reason == "block 'ghost' not found"));
    }

    assert_eq!(bar.app().registry().len(), 1);
    assert!(bar.app().registry().find_block("present").is_some());
    bar.stop().await;
}

#[tokio::test]
async fn test_duplicate_and_invalid_blocks_are_rejected() {
    let bar = TestBar::start().await;
    bar.send(ControlRequest::AddBlock(block("a"))).await.unwrap();

    let duplicate = bar.send(ControlRequest::AddBlock(block("a"))).await.unwrap_err();
    assert_eq!(duplicate.to_string(), "block 'a' already exists");

    let both = AddBlock {
        command: Some("date".into()),
        tail_command: Some("date".into()),
        ..block("b")
    };
    assert!(bar.send(ControlRequest::AddBlock(both)).await.is_err());

    let positions = AddBlock { left: true, center: true, ..block("c") };
    assert!(bar.send(ControlRequest::AddBlock(positions)).await.is_err());

    assert_eq!(bar.app().registry().len(), 1);
    bar.stop().await;
}

#[tokio::test]
async fn test_oversized_interval_is_rejected() {
    let bar = TestBar::start().await;

    let err = bar
        .send(ControlRequest::AddBlock(AddBlock {
            command: Some("date".into()),
            interval: u64::MAX,
            ..block("forever")
        }))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("interval exceeds"), "{err}");

    assert!(bar.app().registry().is_empty());
    assert!(bar.send(ControlRequest::Ping).await.is_ok());
    bar.stop().await;
}

#[tokio::test]
async fn test_concurrent_adds_all_succeed() {
    let bar = TestBar::start().await;
    let socket = bar.socket();

    let requests: Vec<_> = (0..20)
        .map(|n| ControlRequest::AddBlock(block(&format!("block-{n}"))))
        .collect();
    let results = join_all(requests.iter().map(|request| send_request(&socket, request))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(bar.app().registry().len(), 20);

    let mut names: Vec<_> = bar.app().registry().list().into_iter().map(|b| b.name).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 20);
    bar.stop().await;
}

#[tokio::test]
async fn test_concurrent_duplicate_adds_admit_one() {
    let bar = TestBar::start().await;
    let socket = bar.socket();

    let request = ControlRequest::AddBlock(block("same"));
    let results = join_all((0..10).map(|_| send_request(&socket, &request))).await;

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert_eq!(bar.app().registry().len(), 1);
    bar.stop().await;
}

#[tokio::test]
async fn test_ping_reports_process() {
    let bar = TestBar::start().await;

    let Some(ResponseData::Pong { pid, version }) = bar.send(ControlRequest::Ping).await.unwrap()
    else {
        panic!("expected pong");
    };
    assert_eq!(pid, std::process::id());
    assert_eq!(version, env!("CARGO_PKG_VERSION"));
    assert!(is_app_running(&bar.socket()).await);

    bar.stop().await;
}

#[tokio::test]
async fn test_add_css_reaches_sink() {
    let bar = TestBar::start().await;
    bar.send(ControlRequest::AddCss(AddCss {
        class: "blockclock".into(),
        css: "color: #fff;".into(),
    }))
    .await
    .unwrap();

    let sink = bar.sink.clone();
    assert!(eventually(SETTLE_TIMEOUT, || sink.snapshot().css.len() == 1).await);
    assert_eq!(sink.snapshot().css[0].0, "blockclock");
    bar.stop().await;
}

#[tokio::test]
async fn test_stale_socket_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path(), None);

    // Bind and drop to leave a socket file nobody listens on.
    drop(std::os::unix::net::UnixListener::bind(&settings.socket_path).unwrap());
    assert!(settings.socket_path.exists());

    let (_tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let app = App::start(settings.clone(), Box::new(MemorySink::new()), rx).await.unwrap();
    assert!(send_request(&settings.socket_path, &ControlRequest::Ping).await.is_ok());

    app.shutdown().await;
    assert!(!settings.socket_path.exists());
}

#[tokio::test]
async fn test_second_instance_is_refused() {
    let bar = TestBar::start().await;
    let settings = settings_in(bar.dir.path(), None);

    let (_tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let err = App::start(settings, Box::new(MemorySink::new()), rx).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyRunning(_)));

    // The first instance keeps serving.
    assert!(bar.send(ControlRequest::Ping).await.is_ok());
    bar.stop().await;
}

#[tokio::test]
async fn test_quit_request_stops_bar() {
    let mut bar = TestBar::start().await;
    let socket = bar.socket();
    let app = bar.take_app();
    let running = tokio::spawn(app.run_until_shutdown());

    send_request(&socket, &ControlRequest::Quit).await.unwrap();

    tokio::time::timeout(SETTLE_TIMEOUT, running).await.unwrap().unwrap();
    assert!(!socket.exists());
    assert!(send_request(&socket, &ControlRequest::Ping).await.is_err());
}
