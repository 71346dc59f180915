//! Error set for the parsing core.
//!
//! The propagation policy is encoded in signatures: fragment-level failures
//! ([`StringConvertError`], [`StringMatchError`]) never leave the formula,
//! a [`VetoError`] is local to the document being dispatched, network errors
//! are local to the URL that produced them, and [`Cancelled`] unwinds the
//! whole invocation.

use thiserror::Error;

use crate::serial::ObjectKind;

/// A transformation step failed; the whole conversion is abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not apply \"{step}\" to \"{input}\"")]
pub struct StringConvertError {
    /// Human-readable form of the failing transformation.
    pub step: String,
    /// The pipeline value going into the failing step.
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StringMatchError(pub String);

/// A veto content parser decided to abort the current document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("vetoed by \"{name}\"")]
pub struct VetoError {
    pub name: String,
}

/// The invocation's job was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled")]
pub struct Cancelled;

/// Top-level page parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("could not convert the page text: {0}")]
    Convert(#[from] StringConvertError),
    #[error(transparent)]
    Veto(#[from] VetoError),
}

/// File lookup script failure.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("this script takes user input, media cannot be converted for it")]
    TakesUserInput,
    #[error("the file's {kind} hash is not known, so it cannot be looked up")]
    HashUnknown { kind: &'static str },
    #[error("the file is not available locally, so it cannot be looked up")]
    FileMissing,
    #[error("cannot attach a file to a GET query")]
    FileOnGet,
    #[error("bad script url \"{url}\": {message}")]
    BadUrl { url: String, message: String },
    #[error("could not convert the file identifier: {0}")]
    Convert(#[from] StringConvertError),
    #[error(transparent)]
    Network(#[from] net::NetworkError),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Persisted object could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerialError {
    #[error("expected {expected:?} but found object kind {found}")]
    WrongKind { expected: ObjectKind, found: u64 },
    #[error("unknown object kind {0}")]
    UnknownKind(u64),
    #[error("{kind:?} version {version} is newer than this build supports")]
    FutureVersion { kind: ObjectKind, version: u64 },
    #[error("no migration exists for {kind:?} version {version}")]
    NoMigration { kind: ObjectKind, version: u64 },
    #[error("malformed {0}")]
    Malformed(&'static str),
    #[error("invalid regex \"{pattern}\": {message}")]
    BadRegex { pattern: String, message: String },
}
