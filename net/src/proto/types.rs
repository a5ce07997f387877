use std::{collections::BTreeMap, fmt::Display};

use super::{
    cipher::{PacketCipher, StreamDirection},
    compression::{compress, decompress},
    descriptor::Packet,
    error::{ProtoError, Result, debug_log_error},
    varint::{read_varint, read_varint_partial, varint_len, write_varint},
};

/// Maximum packet length in bytes (protocol limit).
pub const MAX_PACKET_SIZE: usize = 2_097_152;

/// Largest count a single stack may hold.
pub const MAX_STACK_SIZE: u8 = 64;

/// UUID stored as 16 raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uuid([u8; 16]);

impl Uuid {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn from_u64s(msb: u64, lsb: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&msb.to_be_bytes());
        bytes[8..].copy_from_slice(&lsb.to_be_bytes());
        Self(bytes)
    }

    /// Version 4 layout from two random words.
    #[must_use]
    pub fn random_v4(msb: u64, lsb: u64) -> Self {
        let msb = (msb & !0xF000) | 0x4000;
        let lsb = (lsb & !(0xC000_0000_0000_0000)) | 0x8000_0000_0000_0000;
        Self::from_u64s(msb, lsb)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    #[must_use]
    pub fn as_u64s(&self) -> (u64, u64) {
        let mut msb = [0u8; 8];
        let mut lsb = [0u8; 8];
        msb.copy_from_slice(&self.0[..8]);
        lsb.copy_from_slice(&self.0[8..]);
        (u64::from_be_bytes(msb), u64::from_be_bytes(lsb))
    }
}

impl Display for Uuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (msb, lsb) = self.as_u64s();
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            msb >> 32,
            (msb >> 16) & 0xFFFF,
            msb & 0xFFFF,
            lsb >> 48,
            lsb & 0xFFFF_FFFF_FFFF
        )
    }
}

/// Integer block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// A non-empty stack of one item type. Empty slots are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub item: i32,
    pub count: u8,
    pub meta: BTreeMap<String, String>,
}

impl ItemStack {
    #[must_use]
    pub fn new(item: i32, count: u8) -> Self {
        Self {
            item,
            count,
            meta: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Same item and identical metadata, so the two may share a slot.
    #[must_use]
    pub fn stacks_with(&self, other: &ItemStack) -> bool {
        self.item == other.item && self.meta == other.meta
    }

    #[must_use]
    pub fn with_count(&self, count: u8) -> Self {
        Self {
            item: self.item,
            count,
            meta: self.meta.clone(),
        }
    }
}

/// Decoded packet frame with the raw body (without ID).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketFrame {
    pub id: i32,
    pub body: Vec<u8>,
}

/// Packet decoder for length-prefixed frames.
pub struct PacketDecoder {
    buf: Vec<u8>,
    pos: usize,
    threshold: Option<usize>,
    cipher: Option<PacketCipher>,
}

/// Packet encoder for length-prefixed frames.
pub struct PacketEncoder {
    buf: Vec<u8>,
    scratch: Vec<u8>,
    threshold: Option<usize>,
    cipher: Option<PacketCipher>,
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
            threshold: None,
            cipher: None,
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    /// Compression applies to every frame decoded after this call.
    pub fn set_compression(&mut self, threshold: Option<usize>) {
        self.threshold = threshold;
    }

    /// Starts decrypting. Bytes already queued but not yet decoded were sent
    /// after the key exchange, so they are decrypted too.
    pub fn enable_encryption(&mut self, key: &[u8; 16]) {
        let mut cipher = PacketCipher::new(key, StreamDirection::Decrypt);
        cipher.apply(&mut self.buf[self.pos..]);
        self.cipher = Some(cipher);
    }

    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn queue_slice(&mut self, bytes: &[u8]) {
        let start = self.buf.len();
        self.buf.extend_from_slice(bytes);
        if let Some(cipher) = self.cipher.as_mut() {
            cipher.apply(&mut self.buf[start..]);
        }
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn try_next_packet(&mut self) -> Result<Option<PacketFrame>> {
        let data = &self.buf[self.pos..];
        let (packet_len, len_len) = match read_varint_partial(data) {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(None),
            Err(err) => {
                debug_log_error("packet length varint decode failed", &err);
                return Err(err);
            }
        };

        if packet_len < 0 {
            let err = ProtoError::NegativeLength(packet_len);
            debug_log_error("negative packet length", &err);
            return Err(err);
        }

        let packet_len = packet_len as usize;
        if packet_len > MAX_PACKET_SIZE {
            let err = ProtoError::PacketTooLarge { len: packet_len };
            debug_log_error("packet too large", &err);
            return Err(err);
        }

        let total_len = len_len + packet_len;
        if data.len() < total_len {
            return Ok(None);
        }

        let packet = &data[len_len..total_len];
        let frame = match self.threshold {
            Some(threshold) => Self::decode_compressed(packet, threshold),
            None => Self::decode_plain(packet),
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                debug_log_error("packet frame decode failed", &err);
                return Err(err);
            }
        };

        self.pos += total_len;
        self.compact_if_needed();

        Ok(Some(frame))
    }

    fn decode_plain(mut packet: &[u8]) -> Result<PacketFrame> {
        let id = read_varint(&mut packet)?;
        Ok(PacketFrame {
            id,
            body: packet.to_vec(),
        })
    }

    fn decode_compressed(mut packet: &[u8], threshold: usize) -> Result<PacketFrame> {
        let data_len = read_varint(&mut packet)?;
        if data_len < 0 {
            return Err(ProtoError::NegativeLength(data_len));
        }
        if data_len == 0 {
            return Self::decode_plain(packet);
        }

        let data_len = data_len as usize;
        if data_len < threshold {
            return Err(ProtoError::BelowThreshold {
                len: data_len,
                threshold,
            });
        }
        if data_len > MAX_PACKET_SIZE {
            return Err(ProtoError::PacketTooLarge { len: data_len });
        }

        let inflated = decompress(packet, data_len)?;
        Self::decode_plain(&inflated)
    }

    fn compact_if_needed(&mut self) {
        if self.pos == 0 {
            return;
        }

        if self.pos >= self.buf.len() / 2 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
    }
}

impl Default for PacketEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketEncoder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            scratch: Vec::new(),
            threshold: None,
            cipher: None,
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    pub fn set_compression(&mut self, threshold: Option<usize>) {
        self.threshold = threshold;
    }

    /// Encrypts every byte handed out by [`PacketEncoder::take`] from now on.
    pub fn enable_encryption(&mut self, key: &[u8; 16]) {
        self.cipher = Some(PacketCipher::new(key, StreamDirection::Encrypt));
    }

    pub fn write_packet<P: Packet>(&mut self, pkt: &P) -> Result<()> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        let result = serialize_into(&mut scratch, pkt).and_then(|()| self.append_serialized(&scratch));
        self.scratch = scratch;
        result
    }

    /// Frames an already serialized `[id][fields]` payload.
    pub fn append_serialized(&mut self, data: &[u8]) -> Result<()> {
        let Some(threshold) = self.threshold else {
            return write_frame(&mut self.buf, &[], data);
        };

        if data.len() >= threshold {
            let compressed = compress(data)?;
            let mut header = Vec::with_capacity(5);
            write_varint(&mut header, data.len() as i32);
            write_frame(&mut self.buf, &header, &compressed)
        } else {
            write_frame(&mut self.buf, &[0], data)
        }
    }

    pub fn take(&mut self) -> Vec<u8> {
        let mut out = std::mem::take(&mut self.buf);
        if let Some(cipher) = self.cipher.as_mut() {
            cipher.apply(&mut out);
        }
        out
    }
}

fn write_frame(out: &mut Vec<u8>, header: &[u8], data: &[u8]) -> Result<()> {
    let packet_len = header.len() + data.len();
    if packet_len > MAX_PACKET_SIZE {
        return Err(ProtoError::PacketTooLarge { len: packet_len });
    }

    write_varint(out, packet_len as i32);
    out.extend_from_slice(header);
    out.extend_from_slice(data);
    Ok(())
}

/// Serializes `[id][fields]` without any framing.
pub fn serialize<P: Packet>(pkt: &P) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    serialize_into(&mut out, pkt)?;
    Ok(out)
}

fn serialize_into<P: Packet>(out: &mut Vec<u8>, pkt: &P) -> Result<()> {
    let descriptor = P::DESCRIPTOR;
    write_varint(out, descriptor.id);
    descriptor.encode_body(&pkt.to_fields(), out)
}

/// Appends one uncompressed, unencrypted frame.
pub fn encode_packet<P: Packet>(out: &mut Vec<u8>, pkt: &P) -> Result<()> {
    let mut body = Vec::new();
    P::DESCRIPTOR.encode_body(&pkt.to_fields(), &mut body)?;
    encode_raw_packet(out, P::DESCRIPTOR.id, &body)
}

pub fn encode_raw_packet(out: &mut Vec<u8>, id: i32, body: &[u8]) -> Result<()> {
    let packet_len = varint_len(id) + body.len();
    if packet_len > MAX_PACKET_SIZE {
        return Err(ProtoError::PacketTooLarge { len: packet_len });
    }

    write_varint(out, packet_len as i32);
    write_varint(out, id);
    out.extend_from_slice(body);
    Ok(())
}
