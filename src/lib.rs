//! # Declarative, serialisable web-page parsing
//!
//! A parse tree turns a fetched HTML document into tags, URLs, and veto
//! signals for a downstream ingester. Trees are data, not code: they persist
//! as versioned tagged tuples ([`serial`]) and older schema revisions migrate
//! forward on load.
//!
//! The pieces, smallest first: a [`StringConverter`] rewrites one extracted
//! string through an ordered transformation pipeline, and a [`StringMatch`]
//! validates it. A [`ParseFormulaHtml`] locates elements with chained
//! [`TagRule`]s and extracts one string per element. A [`ContentParser`]
//! interprets those fragments as tags, URLs, or a veto; a
//! [`ParseNodeContentLink`] follows extracted URLs through the [`net`] engine
//! and recurses. At the top sit [`PageParser`] (convert, optionally separate,
//! parse) and [`ParseRootFileLookup`] (identifier, query, parse).

pub mod content;
pub mod convert;
pub mod error;
pub mod formula;
pub mod job;
pub mod logger;
pub mod lookup;
pub mod node;
pub mod page;
pub mod serial;
pub mod strmatch;
mod util;

pub use content::{
    describe_parsable_content, describe_result, tags_from_results, urls_from_results,
    ContentDescriptor, ContentPayload, ContentResult, VetoRule,
};
pub use convert::{Encoding, StringConverter, Transformation};
pub use error::{
    Cancelled, LookupError, ParseError, SerialError, StringConvertError, StringMatchError,
    VetoError,
};
pub use formula::{HtmlContent, ParseFormulaHtml, TagRule};
pub use job::{Job, SimpleJob};
pub use lookup::{
    FileIdentifier, FileIdentifierKind, FileStore, HashKind, HashStore, MediaHandle,
    ParseRootFileLookup, QueryType,
};
pub use node::{ContentParser, ParseNode, ParseNodeContentLink};
pub use page::PageParser;
pub use strmatch::{CharClass, MatchKind, StringMatch};
