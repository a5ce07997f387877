use super::{
    error::{ProtoError, Result},
    types::{BlockPos, Uuid},
    varint::{read_varint, write_varint},
};

#[inline]
pub(crate) fn take<'a>(input: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if input.len() < len {
        return Err(ProtoError::UnexpectedEof);
    }

    let (head, tail) = input.split_at(len);
    *input = tail;
    Ok(head)
}

#[inline]
fn read_array<const N: usize>(input: &mut &[u8]) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(take(input, N)?);
    Ok(out)
}

#[inline]
pub(crate) fn read_u8(input: &mut &[u8]) -> Result<u8> {
    Ok(take(input, 1)?[0])
}

#[inline]
pub(crate) fn read_bool(input: &mut &[u8]) -> Result<bool> {
    let value = read_u8(input)?;
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ProtoError::InvalidBool(other)),
    }
}

#[inline]
pub(crate) fn write_bool(out: &mut Vec<u8>, value: bool) {
    out.push(value as u8);
}

#[inline]
pub(crate) fn read_i16_be(input: &mut &[u8]) -> Result<i16> {
    Ok(i16::from_be_bytes(read_array(input)?))
}

#[inline]
pub(crate) fn read_u16_be(input: &mut &[u8]) -> Result<u16> {
    Ok(u16::from_be_bytes(read_array(input)?))
}

#[inline]
pub(crate) fn read_i32_be(input: &mut &[u8]) -> Result<i32> {
    Ok(i32::from_be_bytes(read_array(input)?))
}

#[inline]
pub(crate) fn read_i64_be(input: &mut &[u8]) -> Result<i64> {
    Ok(i64::from_be_bytes(read_array(input)?))
}

#[inline]
pub(crate) fn read_f32_be(input: &mut &[u8]) -> Result<f32> {
    Ok(f32::from_be_bytes(read_array(input)?))
}

#[inline]
pub(crate) fn read_f64_be(input: &mut &[u8]) -> Result<f64> {
    Ok(f64::from_be_bytes(read_array(input)?))
}

#[inline]
pub(crate) fn read_uuid(input: &mut &[u8]) -> Result<Uuid> {
    Ok(Uuid::from_bytes(read_array(input)?))
}

#[inline]
pub(crate) fn write_uuid(out: &mut Vec<u8>, value: &Uuid) {
    out.extend_from_slice(value.as_bytes());
}

/// Block position packed as x:26 | z:26 | y:12.
#[inline]
pub(crate) fn read_position(input: &mut &[u8]) -> Result<BlockPos> {
    let raw = read_i64_be(input)?;
    Ok(BlockPos {
        x: (raw >> 38) as i32,
        y: (raw << 52 >> 52) as i32,
        z: (raw << 26 >> 38) as i32,
    })
}

#[inline]
pub(crate) fn write_position(out: &mut Vec<u8>, pos: &BlockPos) {
    let raw = ((pos.x as i64 & 0x3FF_FFFF) << 38)
        | ((pos.z as i64 & 0x3FF_FFFF) << 12)
        | (pos.y as i64 & 0xFFF);
    out.extend_from_slice(&raw.to_be_bytes());
}

pub(crate) fn read_string_bounded(input: &mut &[u8], max_chars: usize) -> Result<String> {
    let byte_len = read_varint(input)?;
    if byte_len < 0 {
        return Err(ProtoError::NegativeLength(byte_len));
    }

    let byte_len = byte_len as usize;
    let max_bytes = max_chars.saturating_mul(4);
    if byte_len > max_bytes {
        return Err(ProtoError::LengthTooLarge {
            max: max_bytes,
            actual: byte_len,
        });
    }

    let bytes = take(input, byte_len)?;
    let s = std::str::from_utf8(bytes).map_err(|_| ProtoError::InvalidUtf8)?;

    let char_count = s.encode_utf16().count();
    if char_count > max_chars {
        return Err(ProtoError::StringTooLong {
            max: max_chars,
            actual: char_count,
        });
    }

    Ok(s.to_owned())
}

pub(crate) fn write_string_bounded(out: &mut Vec<u8>, value: &str, max_chars: usize) -> Result<()> {
    let char_count = value.encode_utf16().count();
    if char_count > max_chars {
        return Err(ProtoError::StringTooLong {
            max: max_chars,
            actual: char_count,
        });
    }

    let len = value.len();
    if len > i32::MAX as usize {
        return Err(ProtoError::LengthTooLarge {
            max: i32::MAX as usize,
            actual: len,
        });
    }

    write_varint(out, len as i32);
    out.extend_from_slice(value.as_bytes());
    Ok(())
}
