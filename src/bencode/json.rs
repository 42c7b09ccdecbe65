use super::value::Value;
use std::fmt;

/// A JSON-like rendering of a bencode value, for diagnostics.
///
/// Strings are quoted and escaped (non-UTF-8 bytes are replaced with U+FFFD),
/// integers are bare, lists become `[...]` and dictionaries `{...}` in stored
/// key order. This is a display format only; it is never used for hashing.
///
/// # Examples
///
/// ```
/// use seedling::bencode::{decode, Json};
///
/// let value = decode(b"d3:cow3:moo4:listli1ei2eee").unwrap();
/// assert_eq!(Json(&value).to_string(), r#"{"cow":"moo","list":[1,2]}"#);
/// ```
pub struct Json<'a>(pub &'a Value);

impl fmt::Display for Json<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Bytes(b) => write_string(f, &String::from_utf8_lossy(b)),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", Json(item))?;
                }
                f.write_str("]")
            }
            Value::Dict(dict) => {
                f.write_str("{")?;
                for (i, (key, val)) in dict.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write_string(f, &String::from_utf8_lossy(key))?;
                    write!(f, ":{}", Json(val))?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
    f.write_str(&quoted)
}

/// Renders a value with [`Json`].
pub fn to_json(value: &Value) -> String {
    Json(value).to_string()
}
