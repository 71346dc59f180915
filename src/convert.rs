//! # String conversion pipeline
//!
//! An ordered list of [`Transformation`]s applied to one extracted value.
//! The pipeline value is logically UTF-8 text; `Encode`/`Decode` straddle the
//! text/bytes boundary, so internally the value may be raw bytes between a
//! decode and the next text-needing step. A byte value must revalidate as
//! UTF-8 wherever text is next required, including at the end of the
//! pipeline.
//!
//! Any failing step abandons the whole conversion with the step's
//! human-readable form and the value it was given.

use std::fmt;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use regex::Regex;
use serde_json::{json, Value};

use crate::error::{SerialError, StringConvertError};
use crate::serial::{self, ObjectKind, Serialisable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Hex,
    Base64,
}

impl Encoding {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Hex => "hex",
            Encoding::Base64 => "base64",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "hex" => Some(Encoding::Hex),
            "base64" => Some(Encoding::Base64),
            _ => None,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Wire identifiers for the transformation kinds.
const WIRE_REMOVE_FROM_BEGINNING: u64 = 0;
const WIRE_REMOVE_FROM_END: u64 = 1;
const WIRE_PREPEND_TEXT: u64 = 2;
const WIRE_APPEND_TEXT: u64 = 3;
const WIRE_ENCODE: u64 = 4;
const WIRE_DECODE: u64 = 5;
const WIRE_CLIP_FROM_BEGINNING: u64 = 6;
const WIRE_CLIP_FROM_END: u64 = 7;
const WIRE_REVERSE: u64 = 8;
const WIRE_REGEX_SUB: u64 = 9;

/// One pipeline step. Character counts are code points, not bytes.
#[derive(Debug, Clone)]
pub enum Transformation {
    RemoveFromBeginning(usize),
    RemoveFromEnd(usize),
    PrependText(String),
    AppendText(String),
    Encode(Encoding),
    Decode(Encoding),
    ClipFromBeginning(usize),
    ClipFromEnd(usize),
    Reverse,
    RegexSub { pattern: Regex, replacement: String },
}

impl Transformation {
    pub fn regex_sub(
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Transformation::RegexSub {
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }

    fn apply(&self, value: Piped) -> Result<Piped, ()> {
        let out = match self {
            Transformation::RemoveFromBeginning(n) => {
                Piped::Text(value.into_text()?.chars().skip(*n).collect())
            }
            Transformation::RemoveFromEnd(n) => {
                let s = value.into_text()?;
                let keep = s.chars().count().saturating_sub(*n);
                Piped::Text(s.chars().take(keep).collect())
            }
            Transformation::ClipFromBeginning(n) => {
                Piped::Text(value.into_text()?.chars().take(*n).collect())
            }
            Transformation::ClipFromEnd(n) => {
                let s = value.into_text()?;
                if *n == 0 {
                    Piped::Text(String::new())
                } else {
                    let skip = s.chars().count().saturating_sub(*n);
                    Piped::Text(s.chars().skip(skip).collect())
                }
            }
            Transformation::PrependText(text) => {
                let s = value.into_text()?;
                Piped::Text(format!("{text}{s}"))
            }
            Transformation::AppendText(text) => {
                let mut s = value.into_text()?;
                s.push_str(text);
                Piped::Text(s)
            }
            Transformation::Encode(encoding) => {
                let bytes = value.into_bytes();
                Piped::Text(match encoding {
                    Encoding::Hex => hex::encode(bytes),
                    Encoding::Base64 => BASE64_STANDARD.encode(bytes),
                })
            }
            Transformation::Decode(encoding) => {
                let s = value.into_text()?;
                Piped::Bytes(match encoding {
                    Encoding::Hex => hex::decode(&s).map_err(|_| ())?,
                    Encoding::Base64 => BASE64_STANDARD.decode(&s).map_err(|_| ())?,
                })
            }
            Transformation::Reverse => Piped::Text(value.into_text()?.chars().rev().collect()),
            Transformation::RegexSub {
                pattern,
                replacement,
            } => {
                let s = value.into_text()?;
                Piped::Text(pattern.replace_all(&s, replacement.as_str()).into_owned())
            }
        };
        Ok(out)
    }
}

impl PartialEq for Transformation {
    fn eq(&self, other: &Self) -> bool {
        use Transformation::*;
        match (self, other) {
            (RemoveFromBeginning(a), RemoveFromBeginning(b)) => a == b,
            (RemoveFromEnd(a), RemoveFromEnd(b)) => a == b,
            (PrependText(a), PrependText(b)) => a == b,
            (AppendText(a), AppendText(b)) => a == b,
            (Encode(a), Encode(b)) => a == b,
            (Decode(a), Decode(b)) => a == b,
            (ClipFromBeginning(a), ClipFromBeginning(b)) => a == b,
            (ClipFromEnd(a), ClipFromEnd(b)) => a == b,
            (Reverse, Reverse) => true,
            (
                RegexSub {
                    pattern: pa,
                    replacement: ra,
                },
                RegexSub {
                    pattern: pb,
                    replacement: rb,
                },
            ) => pa.as_str() == pb.as_str() && ra == rb,
            _ => false,
        }
    }
}

impl Eq for Transformation {}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transformation::RemoveFromBeginning(n) => {
                write!(f, "remove the first {n} characters")
            }
            Transformation::RemoveFromEnd(n) => write!(f, "remove the last {n} characters"),
            Transformation::PrependText(text) => write!(f, "prepend with \"{text}\""),
            Transformation::AppendText(text) => write!(f, "append with \"{text}\""),
            Transformation::Encode(encoding) => write!(f, "encode to {encoding}"),
            Transformation::Decode(encoding) => write!(f, "decode from {encoding}"),
            Transformation::ClipFromBeginning(n) => write!(f, "take the first {n} characters"),
            Transformation::ClipFromEnd(n) => write!(f, "take the last {n} characters"),
            Transformation::Reverse => f.write_str("reverse text"),
            Transformation::RegexSub {
                pattern,
                replacement,
            } => write!(
                f,
                "regex substitution of \"{}\" with \"{replacement}\"",
                pattern.as_str()
            ),
        }
    }
}

/// The value travelling through the pipeline.
enum Piped {
    Text(String),
    Bytes(Vec<u8>),
}

impl Piped {
    /// Text for the steps that need it. Byte values must be valid UTF-8.
    fn into_text(self) -> Result<String, ()> {
        match self {
            Piped::Text(s) => Ok(s),
            Piped::Bytes(b) => String::from_utf8(b).map_err(|_| ()),
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        match self {
            Piped::Text(s) => s.into_bytes(),
            Piped::Bytes(b) => b,
        }
    }

    /// Display form for error messages and step previews.
    fn preview(&self) -> String {
        match self {
            Piped::Text(s) => s.clone(),
            Piped::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringConverter {
    transformations: Vec<Transformation>,
    example_string: String,
}

impl Default for StringConverter {
    fn default() -> Self {
        StringConverter::new(Vec::new(), "example string")
    }
}

impl StringConverter {
    pub fn new(transformations: Vec<Transformation>, example_string: impl Into<String>) -> Self {
        StringConverter {
            transformations,
            example_string: example_string.into(),
        }
    }

    #[must_use]
    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }

    #[must_use]
    pub fn example_string(&self) -> &str {
        &self.example_string
    }

    /// Human-readable form of every step, in order.
    #[must_use]
    pub fn transformation_strings(&self) -> Vec<String> {
        self.transformations.iter().map(|t| t.to_string()).collect()
    }

    pub fn convert(&self, s: &str) -> Result<String, StringConvertError> {
        self.finish(self.run(Piped::Text(s.to_owned()), None)?)
    }

    /// Runs only the first `max_steps` steps and previews the result. A
    /// mid-pipeline byte value is rendered lossily; this is a preview API.
    pub fn convert_partial(&self, s: &str, max_steps: usize) -> Result<String, StringConvertError> {
        Ok(self
            .run(Piped::Text(s.to_owned()), Some(max_steps))?
            .preview())
    }

    /// Entry point for raw digests: the value starts as bytes, so a leading
    /// `Encode` consumes the digest itself rather than any text rendering of
    /// it.
    pub fn convert_identifier(&self, bytes: &[u8]) -> Result<String, StringConvertError> {
        self.finish(self.run(Piped::Bytes(bytes.to_vec()), None)?)
    }

    fn run(&self, mut value: Piped, max_steps: Option<usize>) -> Result<Piped, StringConvertError> {
        for (i, step) in self.transformations.iter().enumerate() {
            if max_steps.is_some_and(|max| i >= max) {
                break;
            }
            let before = value.preview();
            value = step.apply(value).map_err(|()| StringConvertError {
                step: step.to_string(),
                input: before,
            })?;
        }
        Ok(value)
    }

    fn finish(&self, value: Piped) -> Result<String, StringConvertError> {
        let preview = value.preview();
        value.into_text().map_err(|()| StringConvertError {
            step: "take the final bytes as utf-8 text".to_owned(),
            input: preview,
        })
    }
}

impl Serialisable for StringConverter {
    const KIND: ObjectKind = ObjectKind::StringConverter;
    const VERSION: u64 = 1;

    fn encode_info(&self) -> Value {
        let transformations: Vec<Value> =
            self.transformations.iter().map(encode_transformation).collect();
        json!([transformations, self.example_string])
    }

    fn decode_info(info: Value) -> Result<Self, SerialError> {
        let mut parts = serial::fields(info, 2, "string converter info")?;
        let example_string = serial::string(parts.pop().unwrap(), "converter example string")?;
        let transformations = serial::array(parts.pop().unwrap(), "converter transformations")?
            .into_iter()
            .map(decode_transformation)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StringConverter::new(transformations, example_string))
    }
}

fn encode_transformation(transformation: &Transformation) -> Value {
    match transformation {
        Transformation::RemoveFromBeginning(n) => json!([WIRE_REMOVE_FROM_BEGINNING, n]),
        Transformation::RemoveFromEnd(n) => json!([WIRE_REMOVE_FROM_END, n]),
        Transformation::PrependText(text) => json!([WIRE_PREPEND_TEXT, text]),
        Transformation::AppendText(text) => json!([WIRE_APPEND_TEXT, text]),
        Transformation::Encode(encoding) => json!([WIRE_ENCODE, encoding.as_str()]),
        Transformation::Decode(encoding) => json!([WIRE_DECODE, encoding.as_str()]),
        Transformation::ClipFromBeginning(n) => json!([WIRE_CLIP_FROM_BEGINNING, n]),
        Transformation::ClipFromEnd(n) => json!([WIRE_CLIP_FROM_END, n]),
        Transformation::Reverse => json!([WIRE_REVERSE, Value::Null]),
        Transformation::RegexSub {
            pattern,
            replacement,
        } => json!([WIRE_REGEX_SUB, [pattern.as_str(), replacement]]),
    }
}

fn decode_transformation(value: Value) -> Result<Transformation, SerialError> {
    let mut parts = serial::fields(value, 2, "transformation pair")?;
    let data = parts.pop().unwrap();
    let kind = serial::integer(&parts.pop().unwrap(), "transformation kind")?;

    let count = |data: &Value| serial::integer(data, "transformation character count");
    let text = |data: Value| serial::string(data, "transformation text");
    let encoding = |data: Value| {
        let name = serial::string(data, "transformation encoding")?;
        Encoding::from_name(&name).ok_or(SerialError::Malformed("unknown encoding scheme"))
    };

    Ok(match kind {
        WIRE_REMOVE_FROM_BEGINNING => Transformation::RemoveFromBeginning(count(&data)? as usize),
        WIRE_REMOVE_FROM_END => Transformation::RemoveFromEnd(count(&data)? as usize),
        WIRE_PREPEND_TEXT => Transformation::PrependText(text(data)?),
        WIRE_APPEND_TEXT => Transformation::AppendText(text(data)?),
        WIRE_ENCODE => Transformation::Encode(encoding(data)?),
        WIRE_DECODE => Transformation::Decode(encoding(data)?),
        WIRE_CLIP_FROM_BEGINNING => Transformation::ClipFromBeginning(count(&data)? as usize),
        WIRE_CLIP_FROM_END => Transformation::ClipFromEnd(count(&data)? as usize),
        WIRE_REVERSE => Transformation::Reverse,
        WIRE_REGEX_SUB => {
            let mut pair = serial::fields(data, 2, "regex substitution pair")?;
            let replacement = serial::string(pair.pop().unwrap(), "regex replacement")?;
            let pattern = serial::string(pair.pop().unwrap(), "regex pattern")?;
            Transformation::regex_sub(&pattern, replacement).map_err(|e| {
                SerialError::BadRegex {
                    pattern,
                    message: e.to_string(),
                }
            })?
        }
        _ => return Err(SerialError::Malformed("unknown transformation kind")),
    })
}
