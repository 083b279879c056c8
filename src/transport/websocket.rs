//! WebSocket transport
//!
//! Every accepted connection gets two tasks:
//! - a writer draining the client's outbound channel into the socket, which
//!   closes the socket once every sender is gone
//! - the reader (the connection task itself) feeding text messages through a
//!   `FrameBuffer` and dispatching complete frames one at a time
//!
//! Frames of one connection are processed strictly in order: the next frame is
//! not dispatched before the previous one has produced its response, even when
//! that response waits on an authentication backend.
//!
//! Requests that do not ask for a WebSocket upgrade get a plain
//! `200 Websocket only.` answer and are closed.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::accept_hdr_async;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::http::header::{HeaderValue, SEC_WEBSOCKET_PROTOCOL};
use tungstenite::protocol::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::broker::{SharedBroker, dispatch, lock};
use crate::client::Client;
use crate::protocol::{FrameBuffer, SUBPROTOCOL};
use crate::transport::stream::{
    Prefixed, WEBSOCKET_ONLY_RESPONSE, is_websocket_upgrade, read_request_head,
};

/// Upper bound for TLS plus HTTP request head, before any frame is read.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bind a listener on every address.
pub async fn bind(addrs: &[String]) -> io::Result<Vec<TcpListener>> {
    let mut listeners = Vec::with_capacity(addrs.len());
    for addr in addrs {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        listeners.push(listener);
    }
    Ok(listeners)
}

/// Accept connections until `shutdown` flips. With `tls` set every connection
/// is a TLS session first.
pub async fn serve(
    listener: TcpListener,
    broker: SharedBroker,
    tls: Option<TlsAcceptor>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = shutdown.changed() => break,
        };
        match accepted {
            Ok((stream, peer)) => {
                spawn(handle_connection(
                    stream,
                    peer,
                    broker.clone(),
                    tls.clone(),
                    shutdown.clone(),
                ));
            }
            Err(e) => error!("Failed to accept connection: {e}"),
        }
    }
    debug!("Accept loop stopped");
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: SharedBroker,
    tls: Option<TlsAcceptor>,
    shutdown: watch::Receiver<bool>,
) {
    match tls {
        Some(acceptor) => match timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
            Ok(Ok(stream)) => handle_stream(stream, peer, broker, shutdown).await,
            Ok(Err(e)) => warn!("TLS handshake error from {peer}: {e}"),
            Err(_) => warn!("TLS handshake from {peer} timed out"),
        },
        None => handle_stream(stream, peer, broker, shutdown).await,
    }
}

/// Handshake callback: only clients offering the STOMP subprotocol get in.
fn negotiate(request: &Request, mut response: Response) -> Result<Response, ErrorResponse> {
    let offered = request
        .headers()
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|protocol| protocol.trim() == SUBPROTOCOL);

    if !offered {
        let mut rejection = ErrorResponse::new(Some("not accepted protocol(s)".to_string()));
        *rejection.status_mut() = StatusCode::BAD_REQUEST;
        return Err(rejection);
    }

    response
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));
    Ok(response)
}

async fn handle_stream<S>(
    mut stream: S,
    peer: SocketAddr,
    broker: SharedBroker,
    mut shutdown: watch::Receiver<bool>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let head = match timeout(HANDSHAKE_TIMEOUT, read_request_head(&mut stream)).await {
        Ok(Ok(head)) => head,
        Ok(Err(e)) => {
            debug!("Failed to read request from {peer}: {e}");
            return;
        }
        Err(_) => {
            debug!("Request from {peer} timed out");
            return;
        }
    };
    if !is_websocket_upgrade(&head) {
        debug!("Plain HTTP request from {peer}");
        let _ = stream.write_all(WEBSOCKET_ONLY_RESPONSE).await;
        let _ = stream.shutdown().await;
        return;
    }

    let ws_stream = match accept_hdr_async(Prefixed::new(head, stream), negotiate).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error from {peer}: {e}");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx.clone());
    let client_id = client.id.clone();

    // Register client before doing anything else
    lock(&broker).register_client(client);
    info!("{client_id} connected from {peer}");

    let writer = {
        let client_id = client_id.clone();
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    warn!("Failed to send message to {client_id}: {e}");
                    break;
                }
            }
            let _ = ws_sender.close().await;
            debug!("Send loop closed for {client_id}");
        })
    };

    let mut buffer = FrameBuffer::new();
    'reader: loop {
        let next = tokio::select! {
            next = ws_receiver.next() => next,
            _ = shutdown.changed() => break,
        };
        let text = match next {
            Some(Ok(WsMessage::Text(text))) => text,
            Some(Ok(WsMessage::Binary(_))) => {
                warn!("{client_id} sent a binary message, ignoring");
                continue;
            }
            Some(Ok(WsMessage::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                debug!("{client_id} read error: {e}");
                break;
            }
        };

        for raw in buffer.push(text.as_str()) {
            let Some(response) = dispatch(&broker, &client_id, &raw).await else {
                continue;
            };
            let fatal = response.is_error();
            if tx.send(WsMessage::text(response.serialize())).is_err() || fatal {
                break 'reader;
            }
        }
    }

    // Dropping the last senders lets the writer flush and close the socket
    lock(&broker).cleanup_client(&client_id);
    drop(tx);
    let _ = writer.await;
    info!("{client_id} disconnected");
}
