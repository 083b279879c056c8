//! CLI for StompSub
//!
//! Subcommands:
//! - `server`: run the broker
//! - `client`: connect, subscribe, publish and acknowledge once (useful for smoke tests)
//! - `token`: mint an ephemeral login/passcode pair

use std::error::Error;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use stompsub::auth::EphemeralTokenVerifier;
use stompsub::config::load_config_from;
use stompsub::protocol::{Frame, FrameBuffer, Headers, SUBPROTOCOL};
use stompsub::server::Server;
use stompsub::utils::logging;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{error, info};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Parser)]
#[command(name = "stompsub")]
enum Command {
    /// Start the broker
    Server {
        /// Configuration file, extension optional
        #[arg(long, default_value = "config/default")]
        config: String,
    },
    /// Run the example client (connect, subscribe, send, ack, disconnect)
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        #[arg(long)]
        login: Option<String>,
        #[arg(long)]
        passcode: Option<String>,
        #[arg(long, default_value = "/queue/smoke")]
        destination: String,
    },
    /// Print a login/passcode pair accepted in `ephemeral` auth mode
    Token {
        #[arg(long, env = "STOMPSUB_AUTH__SECRET")]
        secret: String,
        #[arg(long)]
        id: String,
        /// Lifetime of the token in seconds
        #[arg(long, default_value_t = 3600)]
        ttl_secs: i64,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cmd = Command::parse();

    match cmd {
        Command::Server { config } => {
            if let Err(e) = run_server(&config).await {
                // no-op when the configured subscriber is already installed
                logging::init("info");
                error!("Server failed: {}", e);
            }
        }
        Command::Client {
            url,
            login,
            passcode,
            destination,
        } => {
            logging::init("info");
            if let Err(e) = run_client(&url, login, passcode, &destination).await {
                error!("Client failed: {}", e);
            }
        }
        Command::Token { secret, id, ttl_secs } => {
            let expires_at = Utc::now() + chrono::Duration::seconds(ttl_secs);
            let (login, passcode) = EphemeralTokenVerifier::new(secret).issue(&id, expires_at);
            println!("login: {login}");
            println!("passcode: {passcode}");
        }
    }
}

async fn run_server(config: &str) -> Result<(), Box<dyn Error>> {
    let settings = load_config_from(config)?;
    logging::init(&settings.logging.level);

    let server = Server::start(&settings).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully.");
    server.stop().await;

    Ok(())
}

async fn run_client(
    url: &str,
    login: Option<String>,
    passcode: Option<String>,
    destination: &str,
) -> Result<(), Box<dyn Error>> {
    let mut request = url.into_client_request()?;
    request
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));
    let (mut ws, _response) = connect_async(request).await?;
    let mut buffer = FrameBuffer::new();

    // 1. Connect
    let mut headers = Headers::new();
    if let Some(login) = login {
        headers.insert("login", login);
    }
    if let Some(passcode) = passcode {
        headers.insert("passcode", passcode);
    }
    send(&mut ws, Frame::new("CONNECT", headers, "")).await?;
    let connected = read_frame(&mut ws, &mut buffer).await?;
    println!("Connected: session {:?}", connected.header("session"));

    // 2. Subscribe with client acknowledgement
    let subscribe = [
        ("destination", destination),
        ("id", "sub-0"),
        ("ack", "client"),
        ("receipt", "subscribed"),
    ];
    send(&mut ws, Frame::new("SUBSCRIBE", subscribe.into_iter().collect(), "")).await?;
    read_frame(&mut ws, &mut buffer).await?;

    // 3. Publish to ourselves
    let send_headers = [("destination", destination)].into_iter().collect();
    send(&mut ws, Frame::new("SEND", send_headers, "Hello from stompsub")).await?;
    let message = read_frame(&mut ws, &mut buffer).await?;
    println!("Incoming: {}", message.body);

    // 4. Acknowledge
    let message_id = message.header("message-id").unwrap_or_default();
    let ack = [("message-id", message_id)].into_iter().collect();
    send(&mut ws, Frame::new("ACK", ack, "")).await?;
    let receipt = read_frame(&mut ws, &mut buffer).await?;
    println!("Acknowledged: {:?}", receipt.header("receipt-id"));

    send(&mut ws, Frame::new("DISCONNECT", Headers::new(), "")).await?;
    ws.close(None).await?;
    Ok(())
}

async fn send(ws: &mut Ws, frame: Frame) -> Result<(), Box<dyn Error>> {
    ws.send(WsMessage::text(frame.serialize())).await?;
    Ok(())
}

async fn read_frame(ws: &mut Ws, buffer: &mut FrameBuffer) -> Result<Frame, Box<dyn Error>> {
    loop {
        let next = tokio::time::timeout(Duration::from_secs(10), ws.next()).await?;
        let text = match next {
            Some(Ok(WsMessage::Text(text))) => text,
            Some(Ok(WsMessage::Close(_))) | None => return Err("connection closed".into()),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        };
        // the exchange is strictly request/response
        if let Some(raw) = buffer.push(text.as_str()).into_iter().next() {
            let frame = Frame::parse(&raw)?;
            if frame.command == "ERROR" {
                return Err(format!("{:?}: {}", frame.header("message"), frame.body).into());
            }
            return Ok(frame);
        }
    }
}
