use log::debug;
use net::{
    proto::{FinishConfigurationS2c, UpdateTagsS2c},
    PacketState, ServerboundPacket,
};

use super::Server;
use crate::{connection::Session, error::SessionError};

pub(super) async fn configure(server: &Server, session: &mut Session) -> Result<(), SessionError> {
    session.send(&UpdateTagsS2c {
        tags: server.registry().tags().to_vec(),
    })?;
    session.send(&FinishConfigurationS2c)?;

    loop {
        match session.next_packet().await? {
            ServerboundPacket::ClientInformation(info) => {
                debug!(
                    "{}: locale {}, view distance {}",
                    session.address(),
                    info.locale,
                    info.view_distance
                );
            }
            ServerboundPacket::ConfigKeepAlive(_) => {}
            ServerboundPacket::FinishConfigurationAck(_) => break,
            other => return Err(SessionError::unexpected(session.phase(), &other)),
        }
    }

    session.advance(PacketState::Play)
}
