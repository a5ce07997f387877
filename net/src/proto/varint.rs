use super::error::{ProtoError, Result};

/// Largest number of bytes a 32-bit varint may occupy.
pub const VARINT_MAX_LEN: usize = 5;

#[inline]
pub fn read_varint(input: &mut &[u8]) -> Result<i32> {
    let Some((value, len)) = read_varint_partial(input)? else {
        return Err(ProtoError::UnexpectedEof);
    };
    *input = &input[len..];
    Ok(value)
}

/// Reads a varint from the front of `input` without consuming it.
///
/// Returns `Ok(None)` when the buffer ends before the final byte, which lets
/// the frame decoder wait for more data instead of failing.
#[inline]
pub(crate) fn read_varint_partial(input: &[u8]) -> Result<Option<(i32, usize)>> {
    let mut value: u32 = 0;
    for i in 0..VARINT_MAX_LEN {
        if i >= input.len() {
            return Ok(None);
        }

        let byte = input[i];
        value |= ((byte & 0x7f) as u32) << (i * 7);
        if (byte & 0x80) == 0 {
            return Ok(Some((value as i32, i + 1)));
        }
    }

    Err(ProtoError::VarIntTooLarge)
}

#[inline]
pub fn write_varint(out: &mut Vec<u8>, value: i32) {
    let mut val = value as u32;
    loop {
        if (val & 0xffffff80) == 0 {
            out.push(val as u8);
            return;
        }
        out.push((val as u8 & 0x7f) | 0x80);
        val >>= 7;
    }
}

#[inline]
pub fn varint_len(value: i32) -> usize {
    let mut val = value as u32;
    let mut count = 1;
    while (val & 0xffffff80) != 0 {
        count += 1;
        val >>= 7;
    }
    count
}

/// Writes a collection length as a varint, rejecting lengths that do not fit.
pub(crate) fn write_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    if len > i32::MAX as usize {
        return Err(ProtoError::LengthTooLarge {
            max: i32::MAX as usize,
            actual: len,
        });
    }
    write_varint(out, len as i32);
    Ok(())
}

/// Reads a collection length and checks it against the bytes still available.
///
/// Every element occupies at least one byte, so a declared count larger than
/// the remaining input can never be satisfied.
pub(crate) fn read_len(input: &mut &[u8]) -> Result<usize> {
    let len = read_varint(input)?;
    if len < 0 {
        return Err(ProtoError::NegativeLength(len));
    }
    let len = len as usize;
    if len > input.len() {
        return Err(ProtoError::LengthTooLarge {
            max: input.len(),
            actual: len,
        });
    }
    Ok(len)
}
