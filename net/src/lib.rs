//! Block-world protocol codec: packet descriptors, typed packets and frame transport.
pub mod proto;

pub use proto::{
    decode_packet, encode_packet, encode_raw_packet, serialize, BlockPos, Direction, ErrorKind,
    Fields, HandshakeNextState, ItemStack, Packet, PacketDecoder, PacketDescriptor,
    PacketEncoder, PacketFrame, PacketState, ProtoError, ServerboundPacket, Uuid, Value,
    WireEnum, MAX_PACKET_SIZE, MAX_STACK_SIZE,
};
