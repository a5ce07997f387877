//! Block-world protocol: descriptor-driven field codec, packet table, phases
//! and the frame transport with optional compression and encryption.

mod cipher;
pub mod codec;
mod compression;
pub mod descriptor;
mod error;
mod io;
pub mod packets;
mod state;
mod types;
mod varint;


pub use codec::{decode_fields, encode_fields, EnumTable, FieldKind, FieldSpec, Fields, Value, WireEnum};
pub use descriptor::{decode_packet, lookup, Direction, Packet, PacketDescriptor};
pub use error::{ErrorKind, ProtoError, Result};
pub use packets::*;
pub use state::{HandshakeNextState, PacketState};
pub use types::{
    encode_packet, encode_raw_packet, serialize, BlockPos, ItemStack, PacketDecoder,
    PacketEncoder, PacketFrame, Uuid, MAX_PACKET_SIZE, MAX_STACK_SIZE,
};
pub use varint::{read_varint, varint_len, write_varint};
