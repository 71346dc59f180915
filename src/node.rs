//! Content parsers and the recursive content-link node.
//!
//! A [`ContentParser`] interprets a formula's fragments as tags, URLs, or a
//! veto test. A [`ParseNodeContentLink`] extracts URLs instead, fetches each
//! through the network engine, and hands the fetched bodies to its children.
//! The two are held together in the [`ParseNode`] sum so a child list can mix
//! them freely.

use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use net::{NetworkEngine, NetworkError, Request};
use serde_json::{json, Value};
use url::Url;

use crate::content::{self, ContentDescriptor, ContentPayload, ContentResult, VetoRule};
use crate::error::{Cancelled, SerialError, VetoError};
use crate::formula::ParseFormulaHtml;
use crate::job::Job;
use crate::serial::{self, ObjectKind, Serialisable};

/// Pause after a failed fetch before moving to the next URL.
const FETCH_FAIL_PAUSE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentParser {
    name: String,
    payload: ContentPayload,
    formula: ParseFormulaHtml,
}

impl ContentParser {
    pub fn new(
        name: impl Into<String>,
        payload: ContentPayload,
        formula: ParseFormulaHtml,
    ) -> Self {
        ContentParser {
            name: name.into(),
            payload,
            formula,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parsable_content(&self) -> BTreeSet<ContentDescriptor> {
        BTreeSet::from([ContentDescriptor {
            name: self.name.clone(),
            payload: self.payload.clone(),
        }])
    }

    /// Interprets the formula's fragments. A veto parser never produces
    /// results: it returns nothing or fails with the veto.
    pub fn parse(&self, data: &str) -> Result<Vec<ContentResult>, VetoError> {
        let fragments = self.formula.parse(data);

        if let ContentPayload::Veto(rule) = &self.payload {
            if test_veto(rule, &fragments) {
                return Err(VetoError {
                    name: self.name.clone(),
                });
            }
            return Ok(Vec::new());
        }

        let descriptor = ContentDescriptor {
            name: self.name.clone(),
            payload: self.payload.clone(),
        };
        Ok(fragments
            .into_iter()
            .map(|fragment| (descriptor.clone(), fragment))
            .collect())
    }
}

fn test_veto(rule: &VetoRule, fragments: &[String]) -> bool {
    let present = fragments
        .iter()
        .any(|fragment| fragment.contains(&rule.search_text));
    let match_found = if rule.match_if_text_present {
        present
    } else {
        !present
    };
    rule.veto_if_matches_found == match_found
}

/// A child of a link node or lookup root: either a plain content parser or a
/// further link to follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode {
    Content(ContentParser),
    Link(ParseNodeContentLink),
}

impl ParseNode {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ParseNode::Content(parser) => parser.name(),
            ParseNode::Link(link) => link.name(),
        }
    }

    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            ParseNode::Content(_) => "content",
            ParseNode::Link(_) => "link",
        }
    }

    #[must_use]
    pub fn parsable_content(&self) -> BTreeSet<ContentDescriptor> {
        match self {
            ParseNode::Content(parser) => parser.parsable_content(),
            ParseNode::Link(link) => link.parsable_content(),
        }
    }

    /// One-line summary of what this node can produce.
    #[must_use]
    pub fn summary(&self) -> String {
        let include_veto = matches!(self, ParseNode::Content(_));
        content::describe_parsable_content(&self.parsable_content(), include_veto)
    }

    pub fn encode(&self) -> Value {
        match self {
            ParseNode::Content(parser) => serial::encode(parser),
            ParseNode::Link(link) => serial::encode(link),
        }
    }

    pub fn decode(value: &Value) -> Result<Self, SerialError> {
        let kind = serial::peek_kind(value)?;
        if kind == ObjectKind::ContentParser.id() {
            Ok(ParseNode::Content(serial::decode(value)?))
        } else if kind == ObjectKind::ContentLink.id() {
            Ok(ParseNode::Link(serial::decode(value)?))
        } else {
            Err(SerialError::UnknownKind(kind))
        }
    }
}

/// Runs every child over one document. A veto from any child abandons the
/// whole document's results; cancellation propagates.
pub(crate) fn children_content(
    engine: &dyn NetworkEngine,
    job: &dyn Job,
    children: &[ParseNode],
    data: &str,
    referral_url: &Url,
) -> Result<Vec<ContentResult>, Cancelled> {
    let mut content = Vec::new();
    for child in children {
        let child_content = match child {
            ParseNode::Link(link) => link.parse(engine, job, data, referral_url)?,
            ParseNode::Content(parser) => match parser.parse(data) {
                Ok(results) => results,
                Err(veto) => {
                    debug!("{veto}");
                    return Ok(Vec::new());
                }
            },
        };
        content.extend(child_content);
    }
    Ok(content)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNodeContentLink {
    name: String,
    formula: ParseFormulaHtml,
    children: Vec<ParseNode>,
}

impl ParseNodeContentLink {
    pub fn new(
        name: impl Into<String>,
        formula: ParseFormulaHtml,
        children: Vec<ParseNode>,
    ) -> Self {
        ParseNodeContentLink {
            name: name.into(),
            formula,
            children,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parsable_content(&self) -> BTreeSet<ContentDescriptor> {
        self.children
            .iter()
            .flat_map(ParseNode::parsable_content)
            .collect()
    }

    /// The URLs this node would follow, resolved against the referral and
    /// registered with the job. Unresolvable candidates are skipped.
    pub fn parse_urls(&self, job: &dyn Job, data: &str, referral_url: &Url) -> Vec<Url> {
        let mut urls = Vec::new();
        for basic in self.formula.parse(data) {
            match referral_url.join(&basic) {
                Ok(url) => urls.push(url),
                Err(e) => warn!("could not resolve \"{basic}\" against {referral_url}: {e}"),
            }
        }
        for url in &urls {
            job.add_url(url.as_str());
        }
        urls
    }

    /// Follows each extracted URL in order and collects whatever the children
    /// find in the fetched bodies. Failed fetches cost their URL only; a
    /// cancelled fetch ends the walk with what was already collected, and a
    /// cancelled job unwinds the invocation.
    pub fn parse(
        &self,
        engine: &dyn NetworkEngine,
        job: &dyn Job,
        data: &str,
        referral_url: &Url,
    ) -> Result<Vec<ContentResult>, Cancelled> {
        let search_urls = self.parse_urls(job, data, referral_url);

        let mut content = Vec::new();
        for search_url in search_urls {
            job.set_variable("script_status", &format!("fetching {search_url}"));

            let mut request = Request::get(search_url.as_str());
            request.referral_url = Some(referral_url.to_string());
            let mut network_job = engine.add_job(request);
            network_job.override_bandwidth();

            match network_job.wait_until_done() {
                Ok(()) => {}
                Err(NetworkError::Cancelled) => break,
                Err(NetworkError::NotFound) => {
                    job.set_variable("script_status", "404 - nothing found");
                    thread::sleep(FETCH_FAIL_PAUSE);
                    continue;
                }
                Err(e) => {
                    job.set_variable("script_status", "Network error! Details written to log.");
                    warn!("problem fetching {search_url}: {e}");
                    thread::sleep(FETCH_FAIL_PAUSE);
                    continue;
                }
            }

            let body = network_job.content();
            let linked_data = String::from_utf8_lossy(&body);
            content.extend(children_content(
                engine,
                job,
                &self.children,
                &linked_data,
                &search_url,
            )?);

            if job.is_cancelled() {
                return Err(Cancelled);
            }
        }
        Ok(content)
    }
}

impl Serialisable for ContentParser {
    const KIND: ObjectKind = ObjectKind::ContentParser;
    const VERSION: u64 = 1;

    fn encode_info(&self) -> Value {
        let additional_info = match &self.payload {
            ContentPayload::Urls { priority } => json!(priority),
            ContentPayload::Mappings { namespace } => json!(namespace),
            ContentPayload::Veto(rule) => json!([
                rule.veto_if_matches_found,
                rule.match_if_text_present,
                rule.search_text,
            ]),
        };
        json!([
            self.name,
            self.payload.wire_id(),
            serial::encode(&self.formula),
            additional_info,
        ])
    }

    fn decode_info(info: Value) -> Result<Self, SerialError> {
        let mut parts = serial::fields(info, 4, "content parser info")?;
        let additional_info = parts.pop().unwrap();
        let formula = serial::decode(&parts.pop().unwrap())?;
        let content_type = serial::integer(&parts.pop().unwrap(), "content parser type")?;
        let name = serial::string(parts.pop().unwrap(), "content parser name")?;

        let payload = match content_type {
            content::WIRE_URLS => ContentPayload::Urls {
                priority: serial::opt_signed(&additional_info, "url priority")?,
            },
            content::WIRE_MAPPINGS => ContentPayload::Mappings {
                namespace: serial::string(additional_info, "mapping namespace")?,
            },
            content::WIRE_VETO => {
                let mut rule = serial::fields(additional_info, 3, "veto rule triple")?;
                let search_text = serial::string(rule.pop().unwrap(), "veto search text")?;
                let match_if_text_present =
                    serial::boolean(&rule.pop().unwrap(), "veto match flag")?;
                let veto_if_matches_found =
                    serial::boolean(&rule.pop().unwrap(), "veto direction flag")?;
                ContentPayload::Veto(VetoRule {
                    veto_if_matches_found,
                    match_if_text_present,
                    search_text,
                })
            }
            _ => return Err(SerialError::Malformed("unknown content parser type")),
        };
        Ok(ContentParser::new(name, payload, formula))
    }
}

impl Serialisable for ParseNodeContentLink {
    const KIND: ObjectKind = ObjectKind::ContentLink;
    const VERSION: u64 = 1;

    fn encode_info(&self) -> Value {
        let children: Vec<Value> = self.children.iter().map(ParseNode::encode).collect();
        json!([self.name, serial::encode(&self.formula), children])
    }

    fn decode_info(info: Value) -> Result<Self, SerialError> {
        let mut parts = serial::fields(info, 3, "content link info")?;
        let children = serial::array(parts.pop().unwrap(), "content link children")?
            .iter()
            .map(ParseNode::decode)
            .collect::<Result<Vec<_>, _>>()?;
        let formula = serial::decode(&parts.pop().unwrap())?;
        let name = serial::string(parts.pop().unwrap(), "content link name")?;
        Ok(ParseNodeContentLink::new(name, formula, children))
    }
}
