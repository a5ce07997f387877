use net::{
    proto::{ConfigDisconnectS2c, LoginDisconnectS2c, PlayDisconnectS2c},
    ErrorKind, PacketState, ProtoError, ServerboundPacket,
};
use serde_json::json;

use crate::{connection::SessionHandle, logging::ServerLogger};

/// Fatal session errors. The code in parentheses is what the client sees.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Malformed packet: {0} (re:mp)")]
    Malformed(ProtoError),
    #[error("Protocol violation: {0} (re:pv)")]
    ProtocolViolation(ProtoError),
    #[error("Networking error - {0:?} (re:ne)")]
    Io(#[from] std::io::Error),
    #[error("Outbound queue overflow (re:of)")]
    OutboundOverflow,
    #[error("Request timeout (re:rt)")]
    Timeout(#[from] tokio::time::error::Elapsed),
    #[error("Keep-alive timeout (re:ka)")]
    KeepAliveTimeout,
    #[error("Session closed")]
    Closed,
}

impl From<ProtoError> for SessionError {
    fn from(err: ProtoError) -> Self {
        match err.kind() {
            ErrorKind::MalformedPacket => SessionError::Malformed(err),
            ErrorKind::ProtocolViolation => SessionError::ProtocolViolation(err),
        }
    }
}

impl SessionError {
    /// A packet that is registered for the phase but arrived out of turn.
    #[must_use]
    pub fn unexpected(phase: PacketState, packet: &ServerboundPacket) -> Self {
        SessionError::ProtocolViolation(ProtoError::UnexpectedPacket {
            state: phase,
            id: packet.id(),
        })
    }

    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            SessionError::Malformed(_) => "re:mp",
            SessionError::ProtocolViolation(_) => "re:pv",
            SessionError::Io(_) => "re:ne",
            SessionError::OutboundOverflow => "re:of",
            SessionError::Timeout(_) => "re:rt",
            SessionError::KeepAliveTimeout => "re:ka",
            SessionError::Closed => "re:cl",
        }
    }

    /// Whether the client can still be told why it is being dropped.
    #[must_use]
    pub fn reportable(&self) -> bool {
        matches!(
            self,
            SessionError::Malformed(_)
                | SessionError::ProtocolViolation(_)
                | SessionError::Timeout(_)
                | SessionError::KeepAliveTimeout
        )
    }
}

/// Container-level rejections. These never reach the network layer; the
/// client is resynchronised instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("Slot {index} cannot hold item {item}")]
    InvalidSlotContents { index: usize, item: i32 },
    #[error("Slot {0} is a result slot")]
    ResultSlot(usize),
    #[error("Slot {index} out of bounds (size {size})")]
    IndexOutOfBounds { index: usize, size: usize },
    #[error("Stale state id {got}, container is at {current}")]
    StaleStateId { got: i32, current: i32 },
    #[error("Window {0} is not open")]
    UnknownWindow(u8),
}

impl ContainerError {
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            ContainerError::InvalidSlotContents { .. } => "invalid_contents",
            ContainerError::ResultSlot(_) => "result_slot",
            ContainerError::IndexOutOfBounds { .. } => "out_of_bounds",
            ContainerError::StaleStateId { .. } => "stale",
            ContainerError::UnknownWindow(_) => "unknown_window",
        }
    }
}

/// Why a click could not be applied.
#[derive(thiserror::Error, Debug)]
pub enum ClickError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("Could not encode broadcast: {0}")]
    Encode(#[from] ProtoError),
}

#[derive(Clone, Copy, Default)]
pub struct ErrorResponder;

impl ErrorResponder {
    pub const fn new() -> Self {
        Self
    }

    /// Queues the phase's disconnect packet, if it has one, followed by a
    /// close. Anything already queued is still written first.
    pub fn disconnect_with_error(&self, handle: &SessionHandle, phase: PacketState, err: &SessionError) {
        let log_reason = format!("{} in {}", err, phase.label());
        ServerLogger::disconnect_warning(handle.address(), &log_reason);

        if err.reportable() {
            let reason = json!({
                "text": format!("Disconnected: {err}"),
                "color": "red",
            })
            .to_string();
            let sent = match phase {
                PacketState::Login => handle.send(&LoginDisconnectS2c { reason }),
                PacketState::Configuration => handle.send(&ConfigDisconnectS2c { reason }),
                PacketState::Play => handle.send(&PlayDisconnectS2c { reason }),
                _ => Ok(()),
            };
            if let Err(send_err) = sent {
                ServerLogger::disconnect_failure(handle.address(), &send_err);
            }
        }

        if handle.close_after_flush().is_err() {
            handle.close();
        }
    }
}
