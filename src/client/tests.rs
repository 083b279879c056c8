use super::pubsub_client::Client;
use crate::protocol::ServerFrame;
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

#[test]
fn test_client_new() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    assert!(client.id.starts_with("client-"));
    assert!(client.session_id.is_none());
}

#[test]
fn test_send_frame_serializes_text() {
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    client.send_frame(&ServerFrame::receipt("r1")).unwrap();

    match rx.try_recv().unwrap() {
        WsMessage::Text(text) => assert_eq!(text.as_str(), "RECEIPT\nreceipt-id:r1\n\n\0"),
        other => panic!("Expected a text message, got {other:?}"),
    }
}

#[test]
fn test_send_frame_fails_when_writer_is_gone() {
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    drop(rx);
    assert!(client.send_frame(&ServerFrame::receipt("r1")).is_err());
}
