//! Tagged-tuple persistence with forward version migration.
//!
//! Every persistable node serialises to a JSON array `[kind, version, info]`
//! where `info` is a type-specific payload built from primitives, arrays, and
//! objects. Decoding runs the type's migrations one version at a time until
//! the payload has the current shape, then rebuilds the node.

use serde_json::{json, Value};

use crate::error::SerialError;

/// Stable wire identifiers. Never reuse or renumber these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    StringConverter = 1,
    StringMatch = 2,
    FormulaHtml = 3,
    ContentParser = 4,
    ContentLink = 5,
    PageParser = 6,
    FileLookup = 7,
}

impl ObjectKind {
    #[must_use]
    pub fn id(self) -> u64 {
        self as u64
    }

    #[must_use]
    pub fn from_id(id: u64) -> Option<Self> {
        Some(match id {
            1 => ObjectKind::StringConverter,
            2 => ObjectKind::StringMatch,
            3 => ObjectKind::FormulaHtml,
            4 => ObjectKind::ContentParser,
            5 => ObjectKind::ContentLink,
            6 => ObjectKind::PageParser,
            7 => ObjectKind::FileLookup,
            _ => return None,
        })
    }
}

pub trait Serialisable: Sized {
    const KIND: ObjectKind;
    const VERSION: u64;

    fn encode_info(&self) -> Value;

    fn decode_info(info: Value) -> Result<Self, SerialError>;

    /// Rewrite `info` from `version` to `version + 1`. Types with a single
    /// schema version keep the default.
    fn upgrade_info(version: u64, _info: Value) -> Result<Value, SerialError> {
        Err(SerialError::NoMigration {
            kind: Self::KIND,
            version,
        })
    }
}

pub fn encode<T: Serialisable>(object: &T) -> Value {
    json!([T::KIND.id(), T::VERSION, object.encode_info()])
}

pub fn decode<T: Serialisable>(value: &Value) -> Result<T, SerialError> {
    let (kind, mut version, info) = split(value)?;
    if kind != T::KIND.id() {
        return Err(SerialError::WrongKind {
            expected: T::KIND,
            found: kind,
        });
    }
    if version > T::VERSION {
        return Err(SerialError::FutureVersion {
            kind: T::KIND,
            version,
        });
    }
    let mut info = info.clone();
    while version < T::VERSION {
        info = T::upgrade_info(version, info)?;
        version += 1;
    }
    T::decode_info(info)
}

/// Kind tag of a persisted object, for dispatch over heterogeneous children.
pub fn peek_kind(value: &Value) -> Result<u64, SerialError> {
    split(value).map(|(kind, _, _)| kind)
}

fn split(value: &Value) -> Result<(u64, u64, &Value), SerialError> {
    let parts = value
        .as_array()
        .ok_or(SerialError::Malformed("serialised object is not an array"))?;
    let [kind, version, info] = parts.as_slice() else {
        return Err(SerialError::Malformed(
            "serialised object is not a [kind, version, info] triple",
        ));
    };
    let kind = kind
        .as_u64()
        .ok_or(SerialError::Malformed("object kind is not an integer"))?;
    let version = version
        .as_u64()
        .ok_or(SerialError::Malformed("object version is not an integer"))?;
    Ok((kind, version, info))
}

// Destructuring helpers shared by the decode_info implementations. Each takes
// a static description so malformed payloads name what was expected.

pub(crate) fn fields(info: Value, len: usize, what: &'static str) -> Result<Vec<Value>, SerialError> {
    match info {
        Value::Array(parts) if parts.len() == len => Ok(parts),
        _ => Err(SerialError::Malformed(what)),
    }
}

pub(crate) fn array(value: Value, what: &'static str) -> Result<Vec<Value>, SerialError> {
    match value {
        Value::Array(parts) => Ok(parts),
        _ => Err(SerialError::Malformed(what)),
    }
}

pub(crate) fn object(
    value: Value,
    what: &'static str,
) -> Result<serde_json::Map<String, Value>, SerialError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(SerialError::Malformed(what)),
    }
}

pub(crate) fn string(value: Value, what: &'static str) -> Result<String, SerialError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(SerialError::Malformed(what)),
    }
}

pub(crate) fn integer(value: &Value, what: &'static str) -> Result<u64, SerialError> {
    value.as_u64().ok_or(SerialError::Malformed(what))
}

pub(crate) fn signed(value: &Value, what: &'static str) -> Result<i64, SerialError> {
    value.as_i64().ok_or(SerialError::Malformed(what))
}

pub(crate) fn boolean(value: &Value, what: &'static str) -> Result<bool, SerialError> {
    value.as_bool().ok_or(SerialError::Malformed(what))
}

pub(crate) fn opt_integer(value: &Value, what: &'static str) -> Result<Option<u64>, SerialError> {
    if value.is_null() {
        return Ok(None);
    }
    integer(value, what).map(Some)
}

pub(crate) fn opt_signed(value: &Value, what: &'static str) -> Result<Option<i64>, SerialError> {
    if value.is_null() {
        return Ok(None);
    }
    signed(value, what).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strmatch::StringMatch;

    #[test]
    fn split_rejects_malformed() {
        assert!(decode::<StringMatch>(&json!("nope")).is_err());
        assert!(decode::<StringMatch>(&json!([2, 1])).is_err());
        assert!(decode::<StringMatch>(&json!(["2", 1, []])).is_err());
    }

    #[test]
    fn wrong_kind_is_reported() {
        let err = decode::<StringMatch>(&json!([6, 1, []])).unwrap_err();
        assert_eq!(
            err,
            SerialError::WrongKind {
                expected: ObjectKind::StringMatch,
                found: 6
            }
        );
    }

    #[test]
    fn future_versions_are_rejected() {
        let err = decode::<StringMatch>(&json!([2, 99, []])).unwrap_err();
        assert!(matches!(err, SerialError::FutureVersion { version: 99, .. }));
    }

    #[test]
    fn versionless_types_refuse_old_payloads() {
        // StringMatch has a single schema version, so anything older has no
        // migration path.
        let err = decode::<StringMatch>(&json!([2, 0, []])).unwrap_err();
        assert!(matches!(err, SerialError::NoMigration { version: 0, .. }));
    }
}
