use super::error::BencodeError;
use super::value::{Dict, Value};
use bytes::Bytes;

const MAX_DEPTH: usize = 64;

/// Decodes a complete bencode document.
///
/// The whole input must be consumed by exactly one value; anything left over
/// is [`BencodeError::TrailingData`]. Use [`decode_prefix`] when the value is
/// followed by other data.
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let (value, consumed) = decode_prefix(data)?;

    if consumed != data.len() {
        return Err(BencodeError::TrailingData { offset: consumed });
    }

    Ok(value)
}

/// Decodes one value from the start of `data` and returns it together with
/// the number of bytes it occupied.
///
/// # Examples
///
/// ```
/// use seedling::bencode::{decode_prefix, Value};
///
/// let (value, consumed) = decode_prefix(b"4:spamtrailer").unwrap();
/// assert_eq!(value, Value::string("spam"));
/// assert_eq!(consumed, 6);
/// ```
pub fn decode_prefix(data: &[u8]) -> Result<(Value, usize), BencodeError> {
    decode_at(data, 0)
}

/// Decodes one value starting at `offset` and returns it together with the
/// offset just past its last byte.
pub fn decode_at(data: &[u8], offset: usize) -> Result<(Value, usize), BencodeError> {
    let mut pos = offset;
    let value = decode_value(data, &mut pos, 0)?;
    Ok((value, pos))
}

fn decode_value(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    if depth > MAX_DEPTH {
        return Err(BencodeError::NestingTooDeep { offset: *pos });
    }

    let Some(&tag) = data.get(*pos) else {
        return Err(BencodeError::malformed(*pos, "unexpected end of input"));
    };

    match tag {
        b'i' => decode_integer(data, pos),
        b'l' => decode_list(data, pos, depth),
        b'd' => decode_dict(data, pos, depth),
        b'0'..=b'9' => decode_bytes(data, pos).map(Value::Bytes),
        c => Err(BencodeError::malformed(
            *pos,
            format!("unexpected byte {:#04x}", c),
        )),
    }
}

fn decode_integer(data: &[u8], pos: &mut usize) -> Result<Value, BencodeError> {
    let tag_pos = *pos;
    let start = tag_pos + 1;

    let end = data[start..]
        .iter()
        .position(|&b| b == b'e')
        .map(|n| start + n)
        .ok_or_else(|| BencodeError::malformed(tag_pos, "unterminated integer"))?;

    let int_str = std::str::from_utf8(&data[start..end])
        .map_err(|_| BencodeError::malformed(start, "integer is not ascii"))?;

    if int_str.is_empty() {
        return Err(BencodeError::malformed(start, "empty integer"));
    }

    let digits = int_str.strip_prefix('-').unwrap_or(int_str);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BencodeError::malformed(
            start,
            format!("invalid integer {:?}", int_str),
        ));
    }

    if int_str.starts_with("-0") || (int_str.starts_with('0') && int_str.len() > 1) {
        return Err(BencodeError::malformed(start, "integer has leading zeros"));
    }

    let value: i64 = int_str
        .parse()
        .map_err(|_| BencodeError::malformed(start, format!("invalid integer {:?}", int_str)))?;

    *pos = end + 1;
    Ok(Value::Integer(value))
}

fn decode_bytes(data: &[u8], pos: &mut usize) -> Result<Bytes, BencodeError> {
    let start = *pos;

    let colon = data[start..]
        .iter()
        .position(|&b| b == b':')
        .map(|n| start + n)
        .ok_or_else(|| BencodeError::malformed(start, "string length without ':'"))?;

    let digits = &data[start..colon];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(BencodeError::malformed(start, "invalid string length"));
    }

    if digits.len() > 1 && digits[0] == b'0' {
        return Err(BencodeError::malformed(start, "string length has leading zeros"));
    }

    let len: usize = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| BencodeError::malformed(start, "invalid string length"))?;

    let body = colon + 1;
    let available = data.len() - body;
    if len > available {
        return Err(BencodeError::Truncated {
            offset: start,
            declared: len,
            available,
        });
    }

    *pos = body + len;
    Ok(Bytes::copy_from_slice(&data[body..body + len]))
}

fn decode_list(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    let tag_pos = *pos;
    *pos += 1;
    let mut list = Vec::new();

    loop {
        match data.get(*pos) {
            None => return Err(BencodeError::malformed(tag_pos, "unterminated list")),
            Some(b'e') => break,
            Some(_) => list.push(decode_value(data, pos, depth + 1)?),
        }
    }

    *pos += 1;
    Ok(Value::List(list))
}

fn decode_dict(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    let tag_pos = *pos;
    *pos += 1;
    let mut dict = Dict::new();

    loop {
        match data.get(*pos) {
            None => return Err(BencodeError::malformed(tag_pos, "unterminated dict")),
            Some(b'e') => break,
            Some(b'0'..=b'9') => {
                let key = decode_bytes(data, pos)?;
                if matches!(data.get(*pos), None | Some(b'e')) {
                    return Err(BencodeError::malformed(*pos, "dict key without value"));
                }
                let value = decode_value(data, pos, depth + 1)?;
                dict.insert(key, value);
            }
            Some(_) => return Err(BencodeError::malformed(*pos, "dict key is not a string")),
        }
    }

    *pos += 1;
    Ok(Value::Dict(dict))
}
