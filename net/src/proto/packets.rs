use super::{
    codec::{wire_enum, Fields, Value, WireEnum},
    descriptor::{self, decode_packet, Packet, PacketDescriptor},
    error::{debug_log_error, ProtoError, Result},
    state::{HandshakeNextState, PacketState},
    types::{BlockPos, ItemStack, PacketFrame, Uuid},
};

wire_enum! {
    /// Operation mode of a container click.
    pub enum ClickMode {
        MouseClick = 0,
        ShiftMouseClick = 1,
        NumberKeys = 2,
        MiddleMouseClick = 3,
        Drop = 4,
        MouseDrag = 5,
        DoubleClick = 6,
    }
}

wire_enum! {
    pub enum ChatMode {
        Enabled = 0,
        CommandsOnly = 1,
        Hidden = 2,
    }
}

wire_enum! {
    pub enum MainHand {
        Left = 0,
        Right = 1,
    }
}

wire_enum! {
    /// Screen layout shown by the client for an opened window.
    pub enum ScreenKind {
        Generic9x1 = 0,
        Generic9x2 = 1,
        Generic9x3 = 2,
        Generic9x4 = 3,
        Generic9x5 = 4,
        Generic9x6 = 5,
        BrewingStand = 11,
        Crafting = 12,
        Furnace = 14,
    }
}

/// Handshake (C2S) packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeC2s {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: HandshakeNextState,
}

/// Status request (C2S) packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRequestC2s;

/// Status ping (C2S) packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPingC2s {
    pub payload: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStartC2s {
    pub username: String,
    pub profile_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginAcknowledgedC2s;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInformationC2s {
    pub locale: String,
    pub view_distance: i8,
    pub chat_mode: ChatMode,
    pub chat_colors: bool,
    pub skin_parts: u8,
    pub main_hand: MainHand,
    pub text_filtering: bool,
    pub allow_listing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishConfigurationAckC2s;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigKeepAliveC2s {
    pub id: i64,
}

/// Container click (C2S): one click transaction as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerClickC2s {
    pub window_id: u8,
    pub state_id: i32,
    pub slot: i16,
    pub button: i8,
    pub mode: ClickMode,
    pub changed_slots: Vec<(i16, Option<ItemStack>)>,
    pub carried: Option<ItemStack>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerCloseC2s {
    pub window_id: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveC2s {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetPlayerPositionC2s {
    pub x: f64,
    pub feet_y: f64,
    pub z: f64,
    pub on_ground: bool,
}

/// Status response (S2C) packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponseS2c {
    pub json: String,
}

/// Status pong (S2C) packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPongS2c {
    pub payload: i64,
}

/// Login disconnect (S2C) packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDisconnectS2c {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccessS2c {
    pub uuid: Uuid,
    pub username: String,
    pub properties: Vec<ProfileProperty>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCompressionS2c {
    pub threshold: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDisconnectS2c {
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishConfigurationS2c;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub entries: Vec<i32>,
}

/// Update tags (S2C): registry name mapped to its tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTagsS2c {
    pub tags: Vec<(String, Vec<Tag>)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnEntityS2c {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub entity_type: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pitch: u8,
    pub yaw: u8,
    pub head_yaw: u8,
    pub data: i32,
    /// Velocity in 1/8000 block per tick.
    pub velocity: [i16; 3],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSetContentS2c {
    pub window_id: u8,
    pub state_id: i32,
    pub slots: Vec<Option<ItemStack>>,
}

/// Window `-1` with slot `-1` addresses the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSetSlotS2c {
    pub window_id: i8,
    pub state_id: i32,
    pub slot: i16,
    pub item: Option<ItemStack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayDisconnectS2c {
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveS2c {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveEntitiesS2c {
    pub entity_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenScreenS2c {
    pub window_id: i32,
    pub kind: ScreenKind,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPositionS2c {
    pub location: BlockPos,
    pub angle: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetEntityMetadataS2c {
    pub entity_id: i32,
    pub flags: i8,
    pub item: Option<ItemStack>,
}

/// Any serverbound packet supported by this crate.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerboundPacket {
    Handshake(HandshakeC2s),
    StatusRequest(StatusRequestC2s),
    StatusPing(StatusPingC2s),
    LoginStart(LoginStartC2s),
    LoginAcknowledged(LoginAcknowledgedC2s),
    ClientInformation(ClientInformationC2s),
    FinishConfigurationAck(FinishConfigurationAckC2s),
    ConfigKeepAlive(ConfigKeepAliveC2s),
    ContainerClick(ContainerClickC2s),
    ContainerClose(ContainerCloseC2s),
    KeepAlive(KeepAliveC2s),
    SetPlayerPosition(SetPlayerPositionC2s),
}

impl PacketFrame {
    pub fn decode_serverbound(&self, state: PacketState) -> Result<ServerboundPacket> {
        ServerboundPacket::decode(state, self)
    }
}

impl ServerboundPacket {
    /// Decodes `frame` in the given phase. An id that is not registered for
    /// the phase is a protocol violation, whatever its body looks like.
    pub fn decode(state: PacketState, frame: &PacketFrame) -> Result<Self> {
        let packet = match (state, frame.id) {
            (PacketState::Handshaking, HandshakeC2s::ID) => {
                decode_packet(frame).map(Self::Handshake)
            }
            (PacketState::Status, StatusRequestC2s::ID) => {
                decode_packet(frame).map(Self::StatusRequest)
            }
            (PacketState::Status, StatusPingC2s::ID) => decode_packet(frame).map(Self::StatusPing),
            (PacketState::Login, LoginStartC2s::ID) => decode_packet(frame).map(Self::LoginStart),
            (PacketState::Login, LoginAcknowledgedC2s::ID) => {
                decode_packet(frame).map(Self::LoginAcknowledged)
            }
            (PacketState::Configuration, ClientInformationC2s::ID) => {
                decode_packet(frame).map(Self::ClientInformation)
            }
            (PacketState::Configuration, FinishConfigurationAckC2s::ID) => {
                decode_packet(frame).map(Self::FinishConfigurationAck)
            }
            (PacketState::Configuration, ConfigKeepAliveC2s::ID) => {
                decode_packet(frame).map(Self::ConfigKeepAlive)
            }
            (PacketState::Play, ContainerClickC2s::ID) => {
                decode_packet(frame).map(Self::ContainerClick)
            }
            (PacketState::Play, ContainerCloseC2s::ID) => {
                decode_packet(frame).map(Self::ContainerClose)
            }
            (PacketState::Play, KeepAliveC2s::ID) => decode_packet(frame).map(Self::KeepAlive),
            (PacketState::Play, SetPlayerPositionC2s::ID) => {
                decode_packet(frame).map(Self::SetPlayerPosition)
            }
            _ => Err(ProtoError::UnexpectedPacket {
                state,
                id: frame.id,
            }),
        };

        if let Err(err) = &packet {
            debug_log_error("serverbound packet decode failed", err);
        }
        packet
    }

    #[must_use]
    pub fn id(&self) -> i32 {
        match self {
            Self::Handshake(_) => HandshakeC2s::ID,
            Self::StatusRequest(_) => StatusRequestC2s::ID,
            Self::StatusPing(_) => StatusPingC2s::ID,
            Self::LoginStart(_) => LoginStartC2s::ID,
            Self::LoginAcknowledged(_) => LoginAcknowledgedC2s::ID,
            Self::ClientInformation(_) => ClientInformationC2s::ID,
            Self::FinishConfigurationAck(_) => FinishConfigurationAckC2s::ID,
            Self::ConfigKeepAlive(_) => ConfigKeepAliveC2s::ID,
            Self::ContainerClick(_) => ContainerClickC2s::ID,
            Self::ContainerClose(_) => ContainerCloseC2s::ID,
            Self::KeepAlive(_) => KeepAliveC2s::ID,
            Self::SetPlayerPosition(_) => SetPlayerPositionC2s::ID,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Handshake(_) => HandshakeC2s::DESCRIPTOR.name,
            Self::StatusRequest(_) => StatusRequestC2s::DESCRIPTOR.name,
            Self::StatusPing(_) => StatusPingC2s::DESCRIPTOR.name,
            Self::LoginStart(_) => LoginStartC2s::DESCRIPTOR.name,
            Self::LoginAcknowledged(_) => LoginAcknowledgedC2s::DESCRIPTOR.name,
            Self::ClientInformation(_) => ClientInformationC2s::DESCRIPTOR.name,
            Self::FinishConfigurationAck(_) => FinishConfigurationAckC2s::DESCRIPTOR.name,
            Self::ConfigKeepAlive(_) => ConfigKeepAliveC2s::DESCRIPTOR.name,
            Self::ContainerClick(_) => ContainerClickC2s::DESCRIPTOR.name,
            Self::ContainerClose(_) => ContainerCloseC2s::DESCRIPTOR.name,
            Self::KeepAlive(_) => KeepAliveC2s::DESCRIPTOR.name,
            Self::SetPlayerPosition(_) => SetPlayerPositionC2s::DESCRIPTOR.name,
        }
    }
}

/// Binds a packet type to its descriptor and exposes the id as a constant.
macro_rules! bind {
    ($($ty:ident => $desc:ident),+ $(,)?) => {
        $(
            impl $ty {
                pub const ID: i32 = descriptor::$desc.id;
            }
        )+
    };
}

bind! {
    HandshakeC2s => HANDSHAKE,
    StatusRequestC2s => STATUS_REQUEST,
    StatusPingC2s => STATUS_PING,
    LoginStartC2s => LOGIN_START,
    LoginAcknowledgedC2s => LOGIN_ACKNOWLEDGED,
    ClientInformationC2s => CLIENT_INFORMATION,
    FinishConfigurationAckC2s => FINISH_CONFIGURATION_ACK,
    ConfigKeepAliveC2s => CONFIG_KEEP_ALIVE_SB,
    ContainerClickC2s => CONTAINER_CLICK,
    ContainerCloseC2s => CONTAINER_CLOSE,
    KeepAliveC2s => KEEP_ALIVE_SB,
    SetPlayerPositionC2s => SET_PLAYER_POSITION,
}

fn mismatch(fields: &Fields, index: u8) -> ProtoError {
    ProtoError::FieldMismatch {
        packet: fields.packet(),
        index,
    }
}

fn slot_value(slot: &Option<ItemStack>) -> Value {
    Value::Slot(slot.clone())
}

impl Packet for HandshakeC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::HANDSHAKE;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::VarInt(self.protocol_version))
            .with(1, Value::Str(self.server_address.clone()))
            .with(2, Value::UShort(self.server_port))
            .with(3, Value::Enum(self.next_state.to_wire()))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            protocol_version: fields.into_varint(0)?,
            server_address: fields.into_str(1)?,
            server_port: fields.into_ushort(2)?,
            next_state: fields.enumeration(3)?,
        })
    }
}

impl Packet for StatusRequestC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::STATUS_REQUEST;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields()
    }

    fn from_fields(_: Fields) -> Result<Self> {
        Ok(Self)
    }
}

impl Packet for StatusPingC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::STATUS_PING;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(0, Value::Long(self.payload))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            payload: fields.into_long(0)?,
        })
    }
}

impl Packet for LoginStartC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::LOGIN_START;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::Str(self.username.clone()))
            .with(1, Value::Uuid(self.profile_id))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            username: fields.into_str(0)?,
            profile_id: fields.into_uuid(1)?,
        })
    }
}

impl Packet for LoginAcknowledgedC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::LOGIN_ACKNOWLEDGED;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields()
    }

    fn from_fields(_: Fields) -> Result<Self> {
        Ok(Self)
    }
}

impl Packet for ClientInformationC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::CLIENT_INFORMATION;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::Str(self.locale.clone()))
            .with(1, Value::Byte(self.view_distance))
            .with(2, Value::Enum(self.chat_mode.to_wire()))
            .with(3, Value::Bool(self.chat_colors))
            .with(4, Value::UByte(self.skin_parts))
            .with(5, Value::Enum(self.main_hand.to_wire()))
            .with(6, Value::Bool(self.text_filtering))
            .with(7, Value::Bool(self.allow_listing))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            locale: fields.into_str(0)?,
            view_distance: fields.into_byte(1)?,
            chat_mode: fields.enumeration(2)?,
            chat_colors: fields.into_bool(3)?,
            skin_parts: fields.into_ubyte(4)?,
            main_hand: fields.enumeration(5)?,
            text_filtering: fields.into_bool(6)?,
            allow_listing: fields.into_bool(7)?,
        })
    }
}

impl Packet for FinishConfigurationAckC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::FINISH_CONFIGURATION_ACK;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields()
    }

    fn from_fields(_: Fields) -> Result<Self> {
        Ok(Self)
    }
}

impl Packet for ConfigKeepAliveC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::CONFIG_KEEP_ALIVE_SB;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(0, Value::Long(self.id))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            id: fields.into_long(0)?,
        })
    }
}

impl Packet for ContainerClickC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::CONTAINER_CLICK;

    fn to_fields(&self) -> Fields {
        let changed = self
            .changed_slots
            .iter()
            .map(|(slot, item)| (Value::Short(*slot), slot_value(item)))
            .collect();
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::UByte(self.window_id))
            .with(1, Value::VarInt(self.state_id))
            .with(2, Value::Short(self.slot))
            .with(3, Value::Byte(self.button))
            .with(4, Value::Enum(self.mode.to_wire()))
            .with(5, Value::Map(changed))
            .with(6, slot_value(&self.carried))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        let changed_slots = fields
            .into_map(5)?
            .into_iter()
            .map(|(k, v)| match (k.into_short(), v.into_slot()) {
                (Some(slot), Some(item)) => Ok((slot, item)),
                _ => Err(mismatch(&fields, 5)),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            window_id: fields.into_ubyte(0)?,
            state_id: fields.into_varint(1)?,
            slot: fields.into_short(2)?,
            button: fields.into_byte(3)?,
            mode: fields.enumeration(4)?,
            changed_slots,
            carried: fields.into_slot(6)?,
        })
    }
}

impl Packet for ContainerCloseC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::CONTAINER_CLOSE;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(0, Value::UByte(self.window_id))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            window_id: fields.into_ubyte(0)?,
        })
    }
}

impl Packet for KeepAliveC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::KEEP_ALIVE_SB;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(0, Value::Long(self.id))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            id: fields.into_long(0)?,
        })
    }
}

impl Packet for SetPlayerPositionC2s {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::SET_PLAYER_POSITION;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::Double(self.x))
            .with(1, Value::Double(self.feet_y))
            .with(2, Value::Double(self.z))
            .with(3, Value::Bool(self.on_ground))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            x: fields.into_double(0)?,
            feet_y: fields.into_double(1)?,
            z: fields.into_double(2)?,
            on_ground: fields.into_bool(3)?,
        })
    }
}

impl Packet for StatusResponseS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::STATUS_RESPONSE;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(0, Value::Str(self.json.clone()))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            json: fields.into_str(0)?,
        })
    }
}

impl Packet for StatusPongS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::STATUS_PONG;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(0, Value::Long(self.payload))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            payload: fields.into_long(0)?,
        })
    }
}

impl Packet for LoginDisconnectS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::LOGIN_DISCONNECT;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(0, Value::Str(self.reason.clone()))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            reason: fields.into_str(0)?,
        })
    }
}

impl ProfileProperty {
    fn to_value(&self) -> Value {
        let signature = self
            .signature
            .as_ref()
            .map(|s| Box::new(Value::Str(s.clone())));
        Value::Struct(
            Fields::new("profile_property")
                .with(0, Value::Str(self.name.clone()))
                .with(1, Value::Str(self.value.clone()))
                .with(2, Value::Optional(signature)),
        )
    }

    fn from_value(value: Value) -> Option<Self> {
        let mut fields = value.into_struct()?;
        let signature = match fields.into_optional(2).ok()? {
            Some(inner) => Some(inner.into_str()?),
            None => None,
        };
        Some(Self {
            name: fields.into_str(0).ok()?,
            value: fields.into_str(1).ok()?,
            signature,
        })
    }
}

impl Packet for LoginSuccessS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::LOGIN_SUCCESS;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::Uuid(self.uuid))
            .with(1, Value::Str(self.username.clone()))
            .with(
                2,
                Value::Seq(self.properties.iter().map(ProfileProperty::to_value).collect()),
            )
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        let properties = fields
            .into_seq(2)?
            .into_iter()
            .map(|v| ProfileProperty::from_value(v).ok_or_else(|| mismatch(&fields, 2)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            uuid: fields.into_uuid(0)?,
            username: fields.into_str(1)?,
            properties,
        })
    }
}

impl Packet for SetCompressionS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::SET_COMPRESSION;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(0, Value::VarInt(self.threshold))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            threshold: fields.into_varint(0)?,
        })
    }
}

impl Packet for ConfigDisconnectS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::CONFIG_DISCONNECT;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(0, Value::Str(self.reason.clone()))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            reason: fields.into_str(0)?,
        })
    }
}

impl Packet for FinishConfigurationS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::FINISH_CONFIGURATION;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields()
    }

    fn from_fields(_: Fields) -> Result<Self> {
        Ok(Self)
    }
}

impl Tag {
    fn to_value(&self) -> Value {
        let entries = self.entries.iter().copied().map(Value::VarInt).collect();
        Value::Struct(
            Fields::new("tag")
                .with(0, Value::Str(self.name.clone()))
                .with(1, Value::Seq(entries)),
        )
    }

    fn from_value(value: Value) -> Option<Self> {
        let mut fields = value.into_struct()?;
        let entries = fields
            .into_seq(1)
            .ok()?
            .into_iter()
            .map(Value::into_varint)
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            name: fields.into_str(0).ok()?,
            entries,
        })
    }
}

impl Packet for UpdateTagsS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::UPDATE_TAGS;

    fn to_fields(&self) -> Fields {
        let tags = self
            .tags
            .iter()
            .map(|(registry, tags)| {
                (
                    Value::Str(registry.clone()),
                    Value::Seq(tags.iter().map(Tag::to_value).collect()),
                )
            })
            .collect();
        Self::DESCRIPTOR.fields().with(0, Value::Map(tags))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        let mut tags = Vec::new();
        for (registry, list) in fields.into_map(0)? {
            let registry = registry.into_str().ok_or_else(|| mismatch(&fields, 0))?;
            let list = list
                .into_seq()
                .and_then(|list| list.into_iter().map(Tag::from_value).collect::<Option<Vec<_>>>())
                .ok_or_else(|| mismatch(&fields, 0))?;
            tags.push((registry, list));
        }
        Ok(Self { tags })
    }
}

impl Packet for SpawnEntityS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::SPAWN_ENTITY;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::VarInt(self.entity_id))
            .with(1, Value::Uuid(self.uuid))
            .with(2, Value::VarInt(self.entity_type))
            .with(3, Value::Double(self.x))
            .with(4, Value::Double(self.y))
            .with(5, Value::Double(self.z))
            .with(6, Value::Angle(self.pitch))
            .with(7, Value::Angle(self.yaw))
            .with(8, Value::Angle(self.head_yaw))
            .with(9, Value::VarInt(self.data))
            .with(10, Value::Short(self.velocity[0]))
            .with(11, Value::Short(self.velocity[1]))
            .with(12, Value::Short(self.velocity[2]))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            entity_id: fields.into_varint(0)?,
            uuid: fields.into_uuid(1)?,
            entity_type: fields.into_varint(2)?,
            x: fields.into_double(3)?,
            y: fields.into_double(4)?,
            z: fields.into_double(5)?,
            pitch: fields.into_angle(6)?,
            yaw: fields.into_angle(7)?,
            head_yaw: fields.into_angle(8)?,
            data: fields.into_varint(9)?,
            velocity: [
                fields.into_short(10)?,
                fields.into_short(11)?,
                fields.into_short(12)?,
            ],
        })
    }
}

impl Packet for ContainerSetContentS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::CONTAINER_SET_CONTENT;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::UByte(self.window_id))
            .with(1, Value::VarInt(self.state_id))
            .with(2, Value::Seq(self.slots.iter().map(slot_value).collect()))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        let slots = fields
            .into_seq(2)?
            .into_iter()
            .map(Value::into_slot)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| mismatch(&fields, 2))?;
        Ok(Self {
            window_id: fields.into_ubyte(0)?,
            state_id: fields.into_varint(1)?,
            slots,
        })
    }
}

impl Packet for ContainerSetSlotS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::CONTAINER_SET_SLOT;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::Byte(self.window_id))
            .with(1, Value::VarInt(self.state_id))
            .with(2, Value::Short(self.slot))
            .with(3, slot_value(&self.item))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            window_id: fields.into_byte(0)?,
            state_id: fields.into_varint(1)?,
            slot: fields.into_short(2)?,
            item: fields.into_slot(3)?,
        })
    }
}

impl Packet for PlayDisconnectS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::PLAY_DISCONNECT;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(0, Value::Str(self.reason.clone()))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            reason: fields.into_str(0)?,
        })
    }
}

impl Packet for KeepAliveS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::KEEP_ALIVE_CB;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(0, Value::Long(self.id))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            id: fields.into_long(0)?,
        })
    }
}

impl Packet for RemoveEntitiesS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::REMOVE_ENTITIES;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR.fields().with(
            0,
            Value::Seq(self.entity_ids.iter().copied().map(Value::VarInt).collect()),
        )
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        let entity_ids = fields
            .into_seq(0)?
            .into_iter()
            .map(Value::into_varint)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| mismatch(&fields, 0))?;
        Ok(Self { entity_ids })
    }
}

impl Packet for OpenScreenS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::OPEN_SCREEN;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::VarInt(self.window_id))
            .with(1, Value::Enum(self.kind.to_wire()))
            .with(2, Value::Str(self.title.clone()))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            window_id: fields.into_varint(0)?,
            kind: fields.enumeration(1)?,
            title: fields.into_str(2)?,
        })
    }
}

impl Packet for SpawnPositionS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::SPAWN_POSITION;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::Position(self.location))
            .with(1, Value::Float(self.angle))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            location: fields.into_position(0)?,
            angle: fields.into_float(1)?,
        })
    }
}

impl Packet for SetEntityMetadataS2c {
    const DESCRIPTOR: &'static PacketDescriptor = &descriptor::SET_ENTITY_METADATA;

    fn to_fields(&self) -> Fields {
        Self::DESCRIPTOR
            .fields()
            .with(0, Value::VarInt(self.entity_id))
            .with(1, Value::Byte(self.flags))
            .with(2, slot_value(&self.item))
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Self {
            entity_id: fields.into_varint(0)?,
            flags: fields.into_byte(1)?,
            item: fields.into_slot(2)?,
        })
    }
}
