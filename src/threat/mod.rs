pub mod ratelimit;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::timeout;

use crate::{error::SessionError, logging::ServerLogger};

#[derive(Debug, Clone, Copy)]
pub enum ClientIntent {
    Handshake,
    Login,
    Configuration,
}

impl ClientIntent {
    const fn label(self) -> &'static str {
        match self {
            ClientIntent::Handshake => "handshaking",
            ClientIntent::Login => "logging in",
            ClientIntent::Configuration => "configuring",
        }
    }
}

#[derive(Debug, Default)]
pub struct ThreatControlService;

impl ThreatControlService {
    pub fn new() -> Self {
        Self
    }

    /// A `timeout` wrapper for the pre-play stages; elapsed deadlines are
    /// logged and surface as [`SessionError::Timeout`].
    pub async fn nuisance<F, T>(
        &self,
        duration: Duration,
        future: F,
        intent: ClientIntent,
        client: &SocketAddr,
    ) -> Result<T, SessionError>
    where
        F: IntoFuture<Output = Result<T, SessionError>>,
    {
        match timeout(duration, future.into_future()).await {
            Ok(v) => v,
            Err(elapsed) => {
                ServerLogger::deadline_missed(intent.label(), duration, client);
                Err(elapsed.into())
            }
        }
    }
}
