use super::error::BencodeError;
use super::value::Value;
use std::io::Write;

/// Encodes a bencode value to a byte vector.
///
/// The output follows the bencode format:
/// - Integers: `i<number>e`
/// - Byte strings: `<length>:<data>`
/// - Lists: `l<items>e`
/// - Dictionaries: `d<key><value>...e` (entries in stored order)
///
/// Dictionaries are written in the order their entries are stored, never
/// re-sorted, so a decoded document re-encodes to its original bytes.
///
/// # Errors
///
/// Returns an error if writing to the internal buffer fails.
///
/// # Examples
///
/// ```
/// use seedling::bencode::{decode, encode, Value};
///
/// assert_eq!(encode(&Value::Integer(42)).unwrap(), b"i42e");
/// assert_eq!(encode(&Value::string("hello")).unwrap(), b"5:hello");
///
/// let list = Value::List(vec![Value::Integer(1), Value::string("two")]);
/// assert_eq!(encode(&list).unwrap(), b"li1e3:twoe");
///
/// // Unsorted keys survive a round trip untouched.
/// let original = b"d4:spam4:eggs3:cow3:mooe";
/// assert_eq!(encode(&decode(original).unwrap()).unwrap(), original);
/// ```
pub fn encode(value: &Value) -> Result<Vec<u8>, BencodeError> {
    let mut buf = Vec::new();
    encode_to(value, &mut buf)?;
    Ok(buf)
}

/// Encodes a bencode value into any writer.
pub fn encode_to<W: Write>(value: &Value, writer: &mut W) -> Result<(), BencodeError> {
    match value {
        Value::Integer(i) => {
            write!(writer, "i{}e", i)?;
        }
        Value::Bytes(b) => {
            write!(writer, "{}:", b.len())?;
            writer.write_all(b)?;
        }
        Value::List(l) => {
            writer.write_all(b"l")?;
            for item in l {
                encode_to(item, writer)?;
            }
            writer.write_all(b"e")?;
        }
        Value::Dict(d) => {
            writer.write_all(b"d")?;
            for (key, val) in d.iter() {
                write!(writer, "{}:", key.len())?;
                writer.write_all(key)?;
                encode_to(val, writer)?;
            }
            writer.write_all(b"e")?;
        }
    }
    Ok(())
}
