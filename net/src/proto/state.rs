use super::{
    codec::wire_enum,
    error::{ProtoError, Result},
};

/// Protocol state used to select packet IDs.
///
/// Phases only move forward: `Handshaking -> {Status, Login}`,
/// `Login -> Configuration -> Play`, and any phase may end in `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketState {
    Handshaking,
    Status,
    Login,
    Configuration,
    Play,
    Closed,
}

impl PacketState {
    #[must_use]
    pub const fn can_advance_to(self, next: PacketState) -> bool {
        matches!(
            (self, next),
            (PacketState::Handshaking, PacketState::Status)
                | (PacketState::Handshaking, PacketState::Login)
                | (PacketState::Login, PacketState::Configuration)
                | (PacketState::Configuration, PacketState::Play)
        ) || (matches!(next, PacketState::Closed) && !matches!(self, PacketState::Closed))
    }

    pub fn advance(&mut self, next: PacketState) -> Result<()> {
        if !self.can_advance_to(next) {
            return Err(ProtoError::IllegalTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, PacketState::Closed)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            PacketState::Handshaking => "handshake",
            PacketState::Status => "status",
            PacketState::Login => "login",
            PacketState::Configuration => "configuration",
            PacketState::Play => "play",
            PacketState::Closed => "closed",
        }
    }
}

wire_enum! {
    /// Next state value in the handshake packet.
    pub enum HandshakeNextState {
        Status = 1,
        Login = 2,
    }
}

impl From<HandshakeNextState> for PacketState {
    fn from(value: HandshakeNextState) -> Self {
        match value {
            HandshakeNextState::Status => PacketState::Status,
            HandshakeNextState::Login => PacketState::Login,
        }
    }
}
