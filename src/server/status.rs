use net::{
    proto::{StatusPongS2c, StatusResponseS2c},
    ServerboundPacket,
};
use serde_json::json;

use super::Server;
use crate::{connection::Session, error::SessionError};

/// Answers status requests until the client pings, then closes.
pub(super) async fn serve(server: &Server, session: &mut Session) -> Result<(), SessionError> {
    loop {
        match session.next_packet().await? {
            ServerboundPacket::StatusRequest(_) => {
                session.send(&StatusResponseS2c {
                    json: server.status_json(),
                })?;
            }
            ServerboundPacket::StatusPing(ping) => {
                session.send(&StatusPongS2c {
                    payload: ping.payload,
                })?;
                session.close();
                return Ok(());
            }
            other => return Err(SessionError::unexpected(session.phase(), &other)),
        }
    }
}

impl Server {
    pub fn status_json(&self) -> String {
        let config = self.config();
        json!({
            "version": {
                "name": format!("basalt {}", env!("CARGO_PKG_VERSION")),
                "protocol": config.protocol_version,
            },
            "players": {
                "max": config.max_players,
                "online": self.online(),
                "sample": [],
            },
            "description": {
                "text": config.motd,
            },
        })
        .to_string()
    }
}
