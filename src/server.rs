//! Broker façade
//!
//! `Server` owns everything a running broker needs: the shared state, one
//! accept loop per configured address and the redelivery timer. `start` brings
//! them up together and `stop` tears them down, closing every open connection
//! and dropping all sessions, pending acknowledgements and transactions.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tracing::info;

use crate::auth::AuthError;
use crate::broker::{Broker, RedeliveryTimer, SharedBroker, lock, shared};
use crate::config::Settings;
use crate::transport::{self, TlsError};

#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to bind listener: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

#[derive(Debug)]
pub struct Server {
    broker: SharedBroker,
    local_addrs: Vec<SocketAddr>,
    listeners: Vec<JoinHandle<()>>,
    timer: RedeliveryTimer,
    shutdown: watch::Sender<bool>,
}

impl Server {
    /// Build the broker from `settings` and start serving on every
    /// configured host.
    pub async fn start(settings: &Settings) -> Result<Self, StartError> {
        let broker = Broker::from_settings(settings)?;
        let tls = settings
            .server
            .tls
            .as_ref()
            .map(transport::load_acceptor)
            .transpose()?;
        let server = Self::start_with(
            broker,
            &settings.server.addrs(),
            settings.broker.redelivery_interval(),
            tls,
        )
        .await?;
        Ok(server)
    }

    /// Serve an already built broker on `addrs`. Port `0` picks a free port;
    /// see [`Server::local_addrs`].
    pub async fn start_with(
        broker: Broker,
        addrs: &[String],
        redelivery_interval: Duration,
        tls: Option<TlsAcceptor>,
    ) -> io::Result<Self> {
        let listeners = transport::bind(addrs).await?;
        let local_addrs = listeners
            .iter()
            .map(|listener| listener.local_addr())
            .collect::<io::Result<Vec<_>>>()?;

        let broker = shared(broker);
        let (shutdown, signal) = watch::channel(false);
        let listeners = listeners
            .into_iter()
            .map(|listener| {
                tokio::spawn(transport::serve(
                    listener,
                    broker.clone(),
                    tls.clone(),
                    signal.clone(),
                ))
            })
            .collect();
        let timer = RedeliveryTimer::start(broker.clone(), redelivery_interval);

        let scheme = if tls.is_some() { "wss" } else { "ws" };
        info!("Broker started on {local_addrs:?} ({scheme})");
        Ok(Self {
            broker,
            local_addrs,
            listeners,
            timer,
            shutdown,
        })
    }

    pub fn broker(&self) -> SharedBroker {
        self.broker.clone()
    }

    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// Stop accepting, close open connections, stop the timer and drop all
    /// broker state.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        futures::future::join_all(self.listeners).await;
        self.timer.stop();
        lock(&self.broker).clear();
        info!("Broker stopped");
    }
}
