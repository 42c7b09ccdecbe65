use super::error::BencodeError;
use bytes::Bytes;

/// A bencode value.
///
/// Bencode has four data types: integers, byte strings, lists, and dictionaries.
/// This enum represents any bencode value and provides methods for type-safe access.
///
/// # Examples
///
/// ```
/// use seedling::bencode::Value;
///
/// // Creating values directly
/// let int = Value::Integer(42);
/// let string = Value::string("hello");
/// let list = Value::List(vec![Value::Integer(1), Value::Integer(2)]);
///
/// // Using From implementations
/// let int: Value = 42i64.into();
/// let string: Value = "hello".into();
///
/// // Accessing values
/// assert_eq!(int.as_integer(), Some(42));
/// assert_eq!(string.as_str(), Some("hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A signed 64-bit integer.
    Integer(i64),
    /// A byte string (may or may not be valid UTF-8).
    Bytes(Bytes),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A dictionary with byte string keys, kept in the order they were decoded.
    Dict(Dict),
}

/// An order-preserving bencode dictionary.
///
/// Entries are stored as a sequence of `(key, value)` pairs in the order they
/// appeared in the source document. Decoding never re-sorts, so encoding a
/// decoded dictionary reproduces its original byte span exactly. The info-hash
/// of a torrent depends on this: it is computed over the re-encoded `info`
/// dictionary, and any reordering would change the digest.
///
/// Lookup is a linear scan and the first matching key wins. Duplicate keys are
/// undefined by the format; they are kept as-is rather than collapsed.
///
/// # Examples
///
/// ```
/// use seedling::bencode::{Dict, Value};
///
/// let mut dict = Dict::new();
/// dict.insert("spam", Value::string("eggs"));
/// dict.insert("cow", Value::string("moo"));
///
/// // Insertion order is kept.
/// let keys: Vec<&[u8]> = dict.keys().map(|k| k.as_ref()).collect();
/// assert_eq!(keys, vec![b"spam".as_slice(), b"cow".as_slice()]);
/// assert_eq!(dict.get(b"cow").and_then(|v| v.as_str()), Some("moo"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict {
    entries: Vec<(Bytes, Value)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends an entry. Existing entries with the same key are left in place.
    pub fn insert(&mut self, key: impl Into<Bytes>, value: Value) {
        self.entries.push((key.into(), value));
    }

    /// Returns the value of the first entry whose key equals `key`.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Bytes> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl FromIterator<(Bytes, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (Bytes, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Dict {
    type Item = (Bytes, Value);
    type IntoIter = std::vec::IntoIter<(Bytes, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Value {
    /// Creates a byte string value from a UTF-8 string.
    ///
    /// # Examples
    ///
    /// ```
    /// use seedling::bencode::Value;
    ///
    /// let value = Value::string("hello");
    /// assert_eq!(value.as_str(), Some("hello"));
    /// ```
    pub fn string(s: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// Returns the name of this value's variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Bytes(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    /// Returns the value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a byte string, if it is one.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value as a UTF-8 string, if it is a valid UTF-8 byte string.
    ///
    /// Returns `None` if the value is not a byte string or if the bytes are not valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Returns the value as a list, if it is one.
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the value as a dictionary reference, if it is one.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Looks up a key in this value if it is a dictionary.
    ///
    /// Returns `None` if the value is not a dictionary or if the key is not present.
    /// When a dictionary holds the same key more than once, the first entry wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use seedling::bencode::decode;
    ///
    /// let value = decode(b"d3:foo3:bare").unwrap();
    /// assert_eq!(value.get(b"foo").and_then(|v| v.as_str()), Some("bar"));
    /// assert_eq!(value.get(b"missing"), None);
    /// ```
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict()?.get(key)
    }

    /// Renders a scalar as text.
    ///
    /// Byte strings are converted lossily (invalid UTF-8 becomes U+FFFD) and
    /// integers are rendered in decimal. Lists and dictionaries are a
    /// [`BencodeError::TypeMismatch`].
    ///
    /// # Examples
    ///
    /// ```
    /// use seedling::bencode::Value;
    ///
    /// assert_eq!(Value::string("hi").to_text().unwrap(), "hi");
    /// assert_eq!(Value::Integer(-7).to_text().unwrap(), "-7");
    /// assert!(Value::List(vec![]).to_text().is_err());
    /// ```
    pub fn to_text(&self) -> Result<String, BencodeError> {
        match self {
            Value::Bytes(b) => Ok(String::from_utf8_lossy(b).into_owned()),
            Value::Integer(i) => Ok(i.to_string()),
            other => Err(BencodeError::TypeMismatch {
                expected: "string or integer",
                found: other.kind(),
            }),
        }
    }

    /// Reads a scalar as an integer.
    ///
    /// Integers are returned as-is; byte strings holding an ASCII decimal
    /// number are parsed. Anything else is a [`BencodeError::TypeMismatch`].
    ///
    /// # Examples
    ///
    /// ```
    /// use seedling::bencode::Value;
    ///
    /// assert_eq!(Value::Integer(42).to_integer().unwrap(), 42);
    /// assert_eq!(Value::string("1024").to_integer().unwrap(), 1024);
    /// assert!(Value::string("abc").to_integer().is_err());
    /// ```
    pub fn to_integer(&self) -> Result<i64, BencodeError> {
        match self {
            Value::Integer(i) => Ok(*i),
            Value::Bytes(b) => std::str::from_utf8(b)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or(BencodeError::TypeMismatch {
                    expected: "integer",
                    found: "non-numeric string",
                }),
            other => Err(BencodeError::TypeMismatch {
                expected: "integer",
                found: other.kind(),
            }),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Dict(d)
    }
}
