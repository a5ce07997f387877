use std::fmt;

use super::state::PacketState;

/// Protocol decode/encode error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    UnexpectedEof,
    VarIntTooLarge,
    PacketTooLarge { len: usize },
    NegativeLength(i32),
    InvalidBool(u8),
    InvalidUtf8,
    StringTooLong { max: usize, actual: usize },
    LengthTooLarge { max: usize, actual: usize },
    TrailingBytes(usize),
    InvalidEnum { table: &'static str, value: i32 },
    InvalidItemCount(i32),
    FieldMismatch { packet: &'static str, index: u8 },
    MissingField { packet: &'static str, index: u8 },
    Compression(String),
    CompressedLength { declared: usize, actual: usize },
    BelowThreshold { len: usize, threshold: usize },
    InvalidPacketId { state: PacketState, id: i32 },
    UnexpectedPacket { state: PacketState, id: i32 },
    IllegalTransition { from: PacketState, to: PacketState },
}

/// Coarse classification used by the session to pick a disconnect reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bytes do not form a structurally valid frame or packet.
    MalformedPacket,
    /// A well-formed packet that is not legal in the current phase.
    ProtocolViolation,
}

pub type Result<T> = std::result::Result<T, ProtoError>;

impl ProtoError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            ProtoError::InvalidPacketId { .. }
            | ProtoError::UnexpectedPacket { .. }
            | ProtoError::IllegalTransition { .. } => ErrorKind::ProtocolViolation,
            _ => ErrorKind::MalformedPacket,
        }
    }
}

pub(crate) fn debug_log_error(context: &str, error: &ProtoError) {
    #[cfg(debug_assertions)]
    {
        log::error!("{}: {:?}", context, error);
    }
    let _ = context;
    let _ = error;
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtoError::InvalidPacketId { state, id } => {
                write!(f, "packet id {id:#04x} is not registered in {state:?}")
            }
            ProtoError::UnexpectedPacket { state, id } => {
                write!(f, "packet id {id:#04x} not expected now in {state:?}")
            }
            ProtoError::IllegalTransition { from, to } => {
                write!(f, "illegal phase transition {from:?} -> {to:?}")
            }
            other => write!(f, "{:?}", other),
        }
    }
}

impl std::error::Error for ProtoError {}
