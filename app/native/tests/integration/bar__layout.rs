//! Placement, menus and click handling.

use vbar_lib::bar::UiEvent;
use vbar_lib::platform::ipc::{AddBlock, AddMenu, ControlRequest};

use crate::common::*;

async fn add(bar: &TestBar, name: &str, left: bool, center: bool, right: bool) {
    bar.send(ControlRequest::AddBlock(AddBlock {
        text: name.to_string(),
        left,
        center,
        right,
        ..block(name)
    }))
    .await
    .unwrap();
}

#[tokio::test]
async fn test_groups_stay_ordered_whatever_the_insertion_order() {
    let bar = TestBar::start().await;

    add(&bar, "clock", false, false, true).await;
    add(&bar, "title", false, true, false).await;
    add(&bar, "workspaces", true, false, false).await;
    add(&bar, "battery", false, false, true).await;
    add(&bar, "mode", true, false, false).await;
    add(&bar, "default", false, false, false).await;

    let sink = bar.sink.clone();
    assert!(eventually(SETTLE_TIMEOUT, || sink.names_in_order().len() == 6).await);
    assert_eq!(sink.names_in_order(), vec![
        "workspaces",
        "mode",
        "default",
        "title",
        "clock",
        "battery"
    ]);
    bar.stop().await;
}

#[tokio::test]
async fn test_removed_tail_is_skipped_as_anchor() {
    let bar = TestBar::start().await;

    add(&bar, "l1", true, false, false).await;
    add(&bar, "r1", false, false, true).await;
    bar.send(ControlRequest::Remove { name: "l1".into() }).await.unwrap();
    add(&bar, "c1", false, true, false).await;

    let sink = bar.sink.clone();
    assert!(eventually(SETTLE_TIMEOUT, || sink.names_in_order() == vec!["c1", "r1"]).await);
    bar.stop().await;
}

#[tokio::test]
async fn test_click_runs_command() {
    let bar = TestBar::start().await;
    let clicked = bar.scratch("clicked");

    bar.send(ControlRequest::AddBlock(AddBlock {
        text: "click me".into(),
        click_command: Some(format!("echo yes >> '{}'", clicked.display())),
        ..block("button")
    }))
    .await
    .unwrap();

    bar.emit(UiEvent::Clicked { name: "button".into() });
    assert!(eventually(SETTLE_TIMEOUT, || line_count(&clicked) == 1).await);

    // Clicking an unknown block is ignored.
    bar.emit(UiEvent::Clicked { name: "nothing".into() });
    bar.stop().await;
}

#[tokio::test]
async fn test_menu_pops_up_and_runs_items() {
    let bar = TestBar::start().await;
    let chosen = bar.scratch("chosen");
    let clicked = bar.scratch("clicked");

    bar.send(ControlRequest::AddBlock(AddBlock {
        text: "power".into(),
        click_command: Some(format!("echo click >> '{}'", clicked.display())),
        ..block("power")
    }))
    .await
    .unwrap();

    for (label, word) in [("Lock", "lock"), ("Sleep", "sleep")] {
        bar.send(ControlRequest::AddMenu(AddMenu {
            name: "power".into(),
            text: label.into(),
            command: format!("echo {word} >> '{}'", chosen.display()),
        }))
        .await
        .unwrap();
    }

    let summary = &bar.app().registry().list()[0];
    assert_eq!(summary.menu_items, 2);
    assert!(summary.clickable);

    bar.emit(UiEvent::Clicked { name: "power".into() });
    let sink = bar.sink.clone();
    assert!(eventually(SETTLE_TIMEOUT, || sink.snapshot().popups.len() == 1).await);
    // The click command still runs alongside the menu.
    assert!(eventually(SETTLE_TIMEOUT, || line_count(&clicked) == 1).await);

    bar.emit(UiEvent::MenuItemActivated { name: "power".into(), index: 1 });
    assert!(eventually(SETTLE_TIMEOUT, || line_count(&chosen) == 1).await);
    assert_eq!(std::fs::read_to_string(&chosen).unwrap().trim(), "sleep");

    let widget_menu = sink
        .snapshot()
        .widgets
        .into_values()
        .find(|widget| widget.name == "power")
        .and_then(|widget| widget.menu);
    assert_eq!(widget_menu, Some(vec!["Lock".to_string(), "Sleep".to_string()]));
    bar.stop().await;
}
