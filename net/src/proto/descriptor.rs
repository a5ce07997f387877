//! Packet descriptor table: identifier, phase and direction bound to the
//! ordered field layout of every packet this server speaks.

use super::{
    codec::{decode_fields, encode_fields, EnumTable, FieldKind, FieldSpec, Fields, WireEnum},
    error::{ProtoError, Result},
    packets::{ChatMode, ClickMode, MainHand, ScreenKind},
    state::{HandshakeNextState, PacketState},
    types::PacketFrame,
};

/// Which peer sends the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Serverbound,
    Clientbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketDescriptor {
    pub id: i32,
    pub name: &'static str,
    pub state: PacketState,
    pub direction: Direction,
    pub fields: &'static [FieldSpec],
}

impl PacketDescriptor {
    #[must_use]
    pub fn fields(&self) -> Fields {
        Fields::new(self.name)
    }

    pub fn encode_body(&self, fields: &Fields, out: &mut Vec<u8>) -> Result<()> {
        encode_fields(self.name, self.fields, fields, out)
    }

    pub fn decode_body(&self, input: &mut &[u8]) -> Result<Fields> {
        decode_fields(self.name, self.fields, input)
    }
}

/// A typed packet bound to its descriptor.
pub trait Packet: Sized {
    const DESCRIPTOR: &'static PacketDescriptor;

    fn to_fields(&self) -> Fields;
    fn from_fields(fields: Fields) -> Result<Self>;
}

/// Decodes a frame as `P`, rejecting a foreign id or unread trailing bytes.
pub fn decode_packet<P: Packet>(frame: &PacketFrame) -> Result<P> {
    let descriptor = P::DESCRIPTOR;
    if frame.id != descriptor.id {
        return Err(ProtoError::InvalidPacketId {
            state: descriptor.state,
            id: frame.id,
        });
    }

    let mut input = frame.body.as_slice();
    let fields = descriptor.decode_body(&mut input)?;
    if !input.is_empty() {
        return Err(ProtoError::TrailingBytes(input.len()));
    }
    P::from_fields(fields)
}

/// Looks up the descriptor registered for `id` in one phase and direction.
#[must_use]
pub fn lookup(state: PacketState, direction: Direction, id: i32) -> Option<&'static PacketDescriptor> {
    PACKETS
        .iter()
        .copied()
        .find(|d| d.state == state && d.direction == direction && d.id == id)
}

const fn sb(
    id: i32,
    name: &'static str,
    state: PacketState,
    fields: &'static [FieldSpec],
) -> PacketDescriptor {
    PacketDescriptor {
        id,
        name,
        state,
        direction: Direction::Serverbound,
        fields,
    }
}

const fn cb(
    id: i32,
    name: &'static str,
    state: PacketState,
    fields: &'static [FieldSpec],
) -> PacketDescriptor {
    PacketDescriptor {
        id,
        name,
        state,
        direction: Direction::Clientbound,
        fields,
    }
}

const NEXT_STATE: &EnumTable = &<HandshakeNextState as WireEnum>::TABLE;
const CLICK_MODE: &EnumTable = &<ClickMode as WireEnum>::TABLE;
const CHAT_MODE: &EnumTable = &<ChatMode as WireEnum>::TABLE;
const MAIN_HAND: &EnumTable = &<MainHand as WireEnum>::TABLE;
const SCREEN_KIND: &EnumTable = &<ScreenKind as WireEnum>::TABLE;

const TEXT: FieldKind = FieldKind::Str { max: 32_767 };
const USERNAME: FieldKind = FieldKind::Str { max: 16 };
const IDENTIFIER: FieldKind = FieldKind::Str { max: 32_767 };

const PROFILE_PROPERTY: &[FieldSpec] = &[
    FieldSpec::new(0, "name", TEXT),
    FieldSpec::new(1, "value", TEXT),
    FieldSpec::new(2, "signature", FieldKind::Optional(&TEXT)),
];

const TAG: &[FieldSpec] = &[
    FieldSpec::new(0, "name", IDENTIFIER),
    FieldSpec::new(1, "entries", FieldKind::Seq(&FieldKind::VarInt)),
];

// Handshaking
pub const HANDSHAKE: PacketDescriptor = sb(
    0x00,
    "handshake",
    PacketState::Handshaking,
    &[
        FieldSpec::new(0, "protocol_version", FieldKind::VarInt),
        FieldSpec::new(1, "server_address", FieldKind::Str { max: 255 }),
        FieldSpec::new(2, "server_port", FieldKind::UShort),
        FieldSpec::new(3, "next_state", FieldKind::Enum(NEXT_STATE)),
    ],
);

// Status
pub const STATUS_REQUEST: PacketDescriptor = sb(0x00, "status_request", PacketState::Status, &[]);
pub const STATUS_PING: PacketDescriptor = sb(
    0x01,
    "status_ping",
    PacketState::Status,
    &[FieldSpec::new(0, "payload", FieldKind::Long)],
);
pub const STATUS_RESPONSE: PacketDescriptor = cb(
    0x00,
    "status_response",
    PacketState::Status,
    &[FieldSpec::new(0, "json", TEXT)],
);
pub const STATUS_PONG: PacketDescriptor = cb(
    0x01,
    "status_pong",
    PacketState::Status,
    &[FieldSpec::new(0, "payload", FieldKind::Long)],
);

// Login
pub const LOGIN_START: PacketDescriptor = sb(
    0x00,
    "login_start",
    PacketState::Login,
    &[
        FieldSpec::new(0, "username", USERNAME),
        FieldSpec::new(1, "profile_id", FieldKind::Uuid),
    ],
);
pub const LOGIN_ACKNOWLEDGED: PacketDescriptor =
    sb(0x03, "login_acknowledged", PacketState::Login, &[]);
pub const LOGIN_DISCONNECT: PacketDescriptor = cb(
    0x00,
    "login_disconnect",
    PacketState::Login,
    &[FieldSpec::new(0, "reason", TEXT)],
);
pub const LOGIN_SUCCESS: PacketDescriptor = cb(
    0x02,
    "login_success",
    PacketState::Login,
    &[
        FieldSpec::new(0, "uuid", FieldKind::Uuid),
        FieldSpec::new(1, "username", USERNAME),
        FieldSpec::new(2, "properties", FieldKind::Seq(&FieldKind::Struct(PROFILE_PROPERTY))),
    ],
);
pub const SET_COMPRESSION: PacketDescriptor = cb(
    0x03,
    "set_compression",
    PacketState::Login,
    &[FieldSpec::new(0, "threshold", FieldKind::VarInt)],
);

// Configuration
pub const CLIENT_INFORMATION: PacketDescriptor = sb(
    0x00,
    "client_information",
    PacketState::Configuration,
    &[
        FieldSpec::new(0, "locale", USERNAME),
        FieldSpec::new(1, "view_distance", FieldKind::Byte),
        FieldSpec::new(2, "chat_mode", FieldKind::Enum(CHAT_MODE)),
        FieldSpec::new(3, "chat_colors", FieldKind::Bool),
        FieldSpec::new(4, "skin_parts", FieldKind::UByte),
        FieldSpec::new(5, "main_hand", FieldKind::Enum(MAIN_HAND)),
        FieldSpec::new(6, "text_filtering", FieldKind::Bool),
        FieldSpec::new(7, "allow_listing", FieldKind::Bool),
    ],
);
pub const FINISH_CONFIGURATION_ACK: PacketDescriptor = sb(
    0x03,
    "finish_configuration_ack",
    PacketState::Configuration,
    &[],
);
pub const CONFIG_KEEP_ALIVE_SB: PacketDescriptor = sb(
    0x04,
    "config_keep_alive",
    PacketState::Configuration,
    &[FieldSpec::new(0, "id", FieldKind::Long)],
);
pub const CONFIG_DISCONNECT: PacketDescriptor = cb(
    0x02,
    "config_disconnect",
    PacketState::Configuration,
    &[FieldSpec::new(0, "reason", TEXT)],
);
pub const FINISH_CONFIGURATION: PacketDescriptor =
    cb(0x03, "finish_configuration", PacketState::Configuration, &[]);
pub const UPDATE_TAGS: PacketDescriptor = cb(
    0x0D,
    "update_tags",
    PacketState::Configuration,
    &[FieldSpec::new(
        0,
        "tags",
        FieldKind::Map {
            key: &IDENTIFIER,
            value: &FieldKind::Seq(&FieldKind::Struct(TAG)),
        },
    )],
);

// Play
pub const CONTAINER_CLICK: PacketDescriptor = sb(
    0x0E,
    "container_click",
    PacketState::Play,
    &[
        FieldSpec::new(0, "window_id", FieldKind::UByte),
        FieldSpec::new(1, "state_id", FieldKind::VarInt),
        FieldSpec::new(2, "slot", FieldKind::Short),
        FieldSpec::new(3, "button", FieldKind::Byte),
        FieldSpec::new(4, "mode", FieldKind::Enum(CLICK_MODE)),
        FieldSpec::new(
            5,
            "changed_slots",
            FieldKind::Map {
                key: &FieldKind::Short,
                value: &FieldKind::Slot,
            },
        ),
        FieldSpec::new(6, "carried", FieldKind::Slot),
    ],
);
pub const CONTAINER_CLOSE: PacketDescriptor = sb(
    0x0F,
    "container_close",
    PacketState::Play,
    &[FieldSpec::new(0, "window_id", FieldKind::UByte)],
);
pub const KEEP_ALIVE_SB: PacketDescriptor = sb(
    0x18,
    "keep_alive",
    PacketState::Play,
    &[FieldSpec::new(0, "id", FieldKind::Long)],
);
pub const SET_PLAYER_POSITION: PacketDescriptor = sb(
    0x1A,
    "set_player_position",
    PacketState::Play,
    &[
        FieldSpec::new(0, "x", FieldKind::Double),
        FieldSpec::new(1, "feet_y", FieldKind::Double),
        FieldSpec::new(2, "z", FieldKind::Double),
        FieldSpec::new(3, "on_ground", FieldKind::Bool),
    ],
);
pub const SPAWN_ENTITY: PacketDescriptor = cb(
    0x01,
    "spawn_entity",
    PacketState::Play,
    &[
        FieldSpec::new(0, "entity_id", FieldKind::VarInt),
        FieldSpec::new(1, "uuid", FieldKind::Uuid),
        FieldSpec::new(2, "entity_type", FieldKind::VarInt),
        FieldSpec::new(3, "x", FieldKind::Double),
        FieldSpec::new(4, "y", FieldKind::Double),
        FieldSpec::new(5, "z", FieldKind::Double),
        FieldSpec::new(6, "pitch", FieldKind::Angle),
        FieldSpec::new(7, "yaw", FieldKind::Angle),
        FieldSpec::new(8, "head_yaw", FieldKind::Angle),
        FieldSpec::new(9, "data", FieldKind::VarInt),
        FieldSpec::new(10, "velocity_x", FieldKind::Short),
        FieldSpec::new(11, "velocity_y", FieldKind::Short),
        FieldSpec::new(12, "velocity_z", FieldKind::Short),
    ],
);
pub const CONTAINER_SET_CONTENT: PacketDescriptor = cb(
    0x13,
    "container_set_content",
    PacketState::Play,
    &[
        FieldSpec::new(0, "window_id", FieldKind::UByte),
        FieldSpec::new(1, "state_id", FieldKind::VarInt),
        FieldSpec::new(2, "slots", FieldKind::Seq(&FieldKind::Slot)),
    ],
);
pub const CONTAINER_SET_SLOT: PacketDescriptor = cb(
    0x15,
    "container_set_slot",
    PacketState::Play,
    &[
        FieldSpec::new(0, "window_id", FieldKind::Byte),
        FieldSpec::new(1, "state_id", FieldKind::VarInt),
        FieldSpec::new(2, "slot", FieldKind::Short),
        FieldSpec::new(3, "item", FieldKind::Slot),
    ],
);
pub const PLAY_DISCONNECT: PacketDescriptor = cb(
    0x1D,
    "play_disconnect",
    PacketState::Play,
    &[FieldSpec::new(0, "reason", TEXT)],
);
pub const KEEP_ALIVE_CB: PacketDescriptor = cb(
    0x26,
    "keep_alive",
    PacketState::Play,
    &[FieldSpec::new(0, "id", FieldKind::Long)],
);
pub const OPEN_SCREEN: PacketDescriptor = cb(
    0x33,
    "open_screen",
    PacketState::Play,
    &[
        FieldSpec::new(0, "window_id", FieldKind::VarInt),
        FieldSpec::new(1, "kind", FieldKind::Enum(SCREEN_KIND)),
        FieldSpec::new(2, "title", TEXT),
    ],
);
pub const REMOVE_ENTITIES: PacketDescriptor = cb(
    0x42,
    "remove_entities",
    PacketState::Play,
    &[FieldSpec::new(0, "entity_ids", FieldKind::Seq(&FieldKind::VarInt))],
);
pub const SPAWN_POSITION: PacketDescriptor = cb(
    0x56,
    "spawn_position",
    PacketState::Play,
    &[
        FieldSpec::new(0, "location", FieldKind::Position),
        FieldSpec::new(1, "angle", FieldKind::Float),
    ],
);
pub const SET_ENTITY_METADATA: PacketDescriptor = cb(
    0x58,
    "set_entity_metadata",
    PacketState::Play,
    &[
        FieldSpec::new(0, "entity_id", FieldKind::VarInt),
        FieldSpec::new(1, "flags", FieldKind::Byte),
        FieldSpec::new(2, "item", FieldKind::Slot),
    ],
);

/// Every registered packet.
pub static PACKETS: &[&PacketDescriptor] = &[
    &HANDSHAKE,
    &STATUS_REQUEST,
    &STATUS_PING,
    &STATUS_RESPONSE,
    &STATUS_PONG,
    &LOGIN_START,
    &LOGIN_ACKNOWLEDGED,
    &LOGIN_DISCONNECT,
    &LOGIN_SUCCESS,
    &SET_COMPRESSION,
    &CLIENT_INFORMATION,
    &FINISH_CONFIGURATION_ACK,
    &CONFIG_KEEP_ALIVE_SB,
    &CONFIG_DISCONNECT,
    &FINISH_CONFIGURATION,
    &UPDATE_TAGS,
    &CONTAINER_CLICK,
    &CONTAINER_CLOSE,
    &KEEP_ALIVE_SB,
    &SET_PLAYER_POSITION,
    &SPAWN_ENTITY,
    &CONTAINER_SET_CONTENT,
    &CONTAINER_SET_SLOT,
    &PLAY_DISCONNECT,
    &KEEP_ALIVE_CB,
    &OPEN_SCREEN,
    &REMOVE_ENTITIES,
    &SPAWN_POSITION,
    &SET_ENTITY_METADATA,
];
