use dbml::Parser;

use super::*;
use crate::config::DiagramConfig;

fn drain(rx: &mut mpsc::UnboundedReceiver<Action>) -> Vec<Action> {
    let mut out = Vec::new();
    while let Ok(action) = rx.try_recv() {
        out.push(action);
    }
    out
}

fn view() -> DiagramView<Parser> {
    DiagramView::new(Parser::new(), DiagramConfig::default())
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_parses_once() {
    let (edit_tx, edit_rx) = mpsc::channel(8);
    let (action_tx, mut action_rx) = mpsc::unbounded_channel();

    let editor = async move {
        for n in 1..=3 {
            edit_tx.send(format!("Table t{n} {{\n  id int\n}}\n")).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(1_000)).await;
    };
    let (view, ()) = tokio::join!(run_sync_driver(view(), edit_rx, action_tx), editor);

    assert_eq!(view.sync().parse_count(), 1);
    let schema = view.schema().unwrap();
    assert!(schema.table("t3").is_some());
    assert!(schema.table("t1").is_none());
    assert_eq!(drain(&mut action_rx), vec![Action::ClearAnnotations, Action::PublishParseError(None), Action::RenderNeeded]);
}

#[tokio::test(start_paused = true)]
async fn spaced_edits_parse_each_time() {
    let (edit_tx, edit_rx) = mpsc::channel(8);
    let (action_tx, _action_rx) = mpsc::unbounded_channel();

    let editor = async move {
        edit_tx.send("Table a {\n  id int\n}\n".to_owned()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;
        edit_tx.send("Table b {\n  id int\n}\n".to_owned()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;
    };
    let (view, ()) = tokio::join!(run_sync_driver(view(), edit_rx, action_tx), editor);

    assert_eq!(view.sync().parse_count(), 2);
    assert!(view.schema().unwrap().table("b").is_some());
}

#[tokio::test(start_paused = true)]
async fn closing_channel_flushes_pending_edit() {
    let (edit_tx, edit_rx) = mpsc::channel(8);
    let (action_tx, mut action_rx) = mpsc::unbounded_channel();

    edit_tx.send("Table late {\n  id int\n}\n".to_owned()).await.unwrap();
    drop(edit_tx);
    let view = run_sync_driver(view(), edit_rx, action_tx).await;

    assert!(view.is_loaded());
    assert_eq!(view.sync().parse_count(), 1);
    assert_eq!(drain(&mut action_rx).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn parse_error_is_published() {
    let (edit_tx, edit_rx) = mpsc::channel(8);
    let (action_tx, mut action_rx) = mpsc::unbounded_channel();

    let editor = async move {
        edit_tx.send("Table broken {".to_owned()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
    };
    let (view, ()) = tokio::join!(run_sync_driver(view(), edit_rx, action_tx), editor);

    assert!(!view.is_loaded());
    let actions = drain(&mut action_rx);
    assert!(matches!(actions.as_slice(), [Action::PublishParseError(Some(record))] if record.kind == "error"));
}

#[tokio::test(start_paused = true)]
async fn dropped_receiver_does_not_stop_driver() {
    let (edit_tx, edit_rx) = mpsc::channel(8);
    let (action_tx, action_rx) = mpsc::unbounded_channel();
    drop(action_rx);

    let editor = async move {
        edit_tx.send("Table a {\n  id int\n}\n".to_owned()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
    };
    let (view, ()) = tokio::join!(run_sync_driver(view(), edit_rx, action_tx), editor);
    assert!(view.is_loaded());
}
