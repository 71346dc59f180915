//! Validating predicate over extracted text: length bounds plus an exact,
//! character-class, or regex test. Failures say which clause rejected the
//! text so rule authors can see why a fragment was dropped.

use std::fmt;

use regex::Regex;
use serde_json::{json, Value};

use crate::error::{SerialError, StringMatchError};
use crate::serial::{self, ObjectKind, Serialisable};

const WIRE_FIXED: u64 = 0;
const WIRE_FLEXIBLE: u64 = 1;
const WIRE_REGEX: u64 = 2;
const WIRE_ANY: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Alpha,
    Alphanumeric,
    Numeric,
}

impl CharClass {
    fn fail_reason(self) -> &'static str {
        match self {
            CharClass::Alpha => "had non-alpha characters",
            CharClass::Alphanumeric => "had non-alphanumeric characters",
            CharClass::Numeric => "had non-numeric characters",
        }
    }

    fn label(self) -> &'static str {
        match self {
            CharClass::Alpha => "alphabetical characters",
            CharClass::Alphanumeric => "alphanumeric characters",
            CharClass::Numeric => "numeric characters",
        }
    }

    fn wire_id(self) -> u64 {
        match self {
            CharClass::Alpha => 0,
            CharClass::Alphanumeric => 1,
            CharClass::Numeric => 2,
        }
    }

    fn from_wire(id: u64) -> Option<Self> {
        Some(match id {
            0 => CharClass::Alpha,
            1 => CharClass::Alphanumeric,
            2 => CharClass::Numeric,
            _ => return None,
        })
    }

    fn is_match(self, text: &str) -> bool {
        thread_local! {
            static ALPHA: Regex = Regex::new("^[a-zA-Z]+$").unwrap();
            static ALPHANUMERIC: Regex = Regex::new(r"^[a-zA-Z\d]+$").unwrap();
            static NUMERIC: Regex = Regex::new(r"^\d+$").unwrap();
        }
        match self {
            CharClass::Alpha => ALPHA.with(|r| r.is_match(text)),
            CharClass::Alphanumeric => ALPHANUMERIC.with(|r| r.is_match(text)),
            CharClass::Numeric => NUMERIC.with(|r| r.is_match(text)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum MatchKind {
    Any,
    Fixed(String),
    Flexible(CharClass),
    Regex(Regex),
}

impl PartialEq for MatchKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MatchKind::Any, MatchKind::Any) => true,
            (MatchKind::Fixed(a), MatchKind::Fixed(b)) => a == b,
            (MatchKind::Flexible(a), MatchKind::Flexible(b)) => a == b,
            (MatchKind::Regex(a), MatchKind::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for MatchKind {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringMatch {
    kind: MatchKind,
    min_chars: Option<usize>,
    max_chars: Option<usize>,
    example_string: String,
}

impl Default for StringMatch {
    fn default() -> Self {
        StringMatch::new(MatchKind::Any, None, None, "example string")
    }
}

impl StringMatch {
    pub fn new(
        kind: MatchKind,
        min_chars: Option<usize>,
        max_chars: Option<usize>,
        example_string: impl Into<String>,
    ) -> Self {
        StringMatch {
            kind,
            min_chars,
            max_chars,
            example_string: example_string.into(),
        }
    }

    /// Unanchored regex match.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(StringMatch::new(
            MatchKind::Regex(Regex::new(pattern)?),
            None,
            None,
            "example string",
        ))
    }

    pub fn test(&self, text: &str) -> Result<(), StringMatchError> {
        let len = text.chars().count();
        if let Some(min) = self.min_chars {
            if len < min {
                return Err(StringMatchError(format!(
                    "\"{text}\" had fewer than {min} characters"
                )));
            }
        }
        if let Some(max) = self.max_chars {
            if len > max {
                return Err(StringMatchError(format!(
                    "\"{text}\" had more than {max} characters"
                )));
            }
        }
        match &self.kind {
            MatchKind::Any => Ok(()),
            MatchKind::Fixed(value) => {
                if text == value {
                    Ok(())
                } else {
                    Err(StringMatchError(format!(
                        "\"{text}\" did not exactly match \"{value}\""
                    )))
                }
            }
            MatchKind::Flexible(class) => {
                if class.is_match(text) {
                    Ok(())
                } else {
                    Err(StringMatchError(format!("\"{text}\" {}", class.fail_reason())))
                }
            }
            MatchKind::Regex(regex) => {
                if regex.is_match(text) {
                    Ok(())
                } else {
                    Err(StringMatchError(format!(
                        "\"{text}\" did not match \"{}\"",
                        regex.as_str()
                    )))
                }
            }
        }
    }
}

impl fmt::Display for StringMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let MatchKind::Fixed(value) = &self.kind {
            return f.write_str(value);
        }
        match (self.min_chars, self.max_chars) {
            (None, None) => write!(f, "any number of ")?,
            (None, Some(max)) => write!(f, "at most {max} ")?,
            (Some(min), None) => write!(f, "at least {min} ")?,
            (Some(min), Some(max)) => write!(f, "between {min} and {max} ")?,
        }
        match &self.kind {
            MatchKind::Any => return f.write_str("characters"),
            MatchKind::Flexible(class) => f.write_str(class.label())?,
            MatchKind::Regex(regex) => {
                write!(f, "characters, matching regex \"{}\"", regex.as_str())?
            }
            MatchKind::Fixed(_) => unreachable!("handled above"),
        }
        write!(f, ", such as \"{}\"", self.example_string)
    }
}

impl Serialisable for StringMatch {
    const KIND: ObjectKind = ObjectKind::StringMatch;
    const VERSION: u64 = 1;

    fn encode_info(&self) -> Value {
        let (kind, value) = match &self.kind {
            MatchKind::Any => (WIRE_ANY, Value::String(String::new())),
            MatchKind::Fixed(text) => (WIRE_FIXED, Value::String(text.clone())),
            MatchKind::Flexible(class) => (WIRE_FLEXIBLE, json!(class.wire_id())),
            MatchKind::Regex(regex) => (WIRE_REGEX, Value::String(regex.as_str().to_owned())),
        };
        json!([kind, value, self.min_chars, self.max_chars, self.example_string])
    }

    fn decode_info(info: Value) -> Result<Self, SerialError> {
        let mut parts = serial::fields(info, 5, "string match info")?;
        let example_string = serial::string(parts.pop().unwrap(), "match example string")?;
        let max_chars = serial::opt_integer(&parts.pop().unwrap(), "match max chars")?;
        let min_chars = serial::opt_integer(&parts.pop().unwrap(), "match min chars")?;
        let value = parts.pop().unwrap();
        let kind = serial::integer(&parts.pop().unwrap(), "match kind")?;

        let kind = match kind {
            WIRE_ANY => MatchKind::Any,
            WIRE_FIXED => MatchKind::Fixed(serial::string(value, "fixed match value")?),
            WIRE_FLEXIBLE => {
                let id = serial::integer(&value, "flexible match class")?;
                MatchKind::Flexible(
                    CharClass::from_wire(id)
                        .ok_or(SerialError::Malformed("unknown flexible match class"))?,
                )
            }
            WIRE_REGEX => {
                let pattern = serial::string(value, "regex match value")?;
                MatchKind::Regex(Regex::new(&pattern).map_err(|e| SerialError::BadRegex {
                    pattern,
                    message: e.to_string(),
                })?)
            }
            _ => return Err(SerialError::Malformed("unknown match kind")),
        };
        Ok(StringMatch::new(
            kind,
            min_chars.map(|n| n as usize),
            max_chars.map(|n| n as usize),
            example_string,
        ))
    }
}
