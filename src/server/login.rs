use net::{
    proto::{HandshakeC2s, LoginDisconnectS2c, LoginSuccessS2c, SetCompressionS2c},
    PacketState, ServerboundPacket,
};
use serde_json::json;

use super::Server;
use crate::{connection::Session, error::SessionError, player::Profile};

/// Runs the login exchange. `Ok(None)` means the client was turned away
/// with a disconnect and the session is already closing.
///
/// Authentication and the encryption key exchange are left to an outer
/// collaborator, which calls [`Session::enable_encryption`] once it has the
/// shared secret.
pub(super) async fn login(
    server: &Server,
    session: &mut Session,
    handshake: &HandshakeC2s,
) -> Result<Option<Profile>, SessionError> {
    let start = match session.next_packet().await? {
        ServerboundPacket::LoginStart(start) => start,
        other => return Err(SessionError::unexpected(session.phase(), &other)),
    };

    let config = server.config();
    if handshake.protocol_version != config.protocol_version {
        let text = if handshake.protocol_version < config.protocol_version {
            "Outdated client"
        } else {
            "Outdated server"
        };
        return refuse(session, text);
    }
    if server.online() >= config.max_players as usize {
        return refuse(session, "The server is full");
    }

    if let Some(threshold) = config.compression() {
        session.send(&SetCompressionS2c {
            threshold: config.compression_threshold,
        })?;
        session.enable_compression(Some(threshold))?;
    }

    session.send(&LoginSuccessS2c {
        uuid: start.profile_id,
        username: start.username.clone(),
        properties: Vec::new(),
    })?;

    match session.next_packet().await? {
        ServerboundPacket::LoginAcknowledged(_) => {}
        other => return Err(SessionError::unexpected(session.phase(), &other)),
    }
    session.advance(PacketState::Configuration)?;

    Ok(Some(Profile {
        uuid: start.profile_id,
        username: start.username,
        entity_id: server.world().allocate_entity_id(),
    }))
}

fn refuse(session: &mut Session, text: &str) -> Result<Option<Profile>, SessionError> {
    let reason = json!({ "text": text }).to_string();
    session.send(&LoginDisconnectS2c { reason })?;
    session.close();
    Ok(None)
}
