//! File lookup scripts: turn a file identifier into an HTTP query, fetch the
//! result document, and hand it to a child tree.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use log::warn;
use net::{NetworkEngine, Request};
use serde_json::{json, Value};
use url::Url;

use crate::content::{ContentDescriptor, ContentResult};
use crate::convert::StringConverter;
use crate::error::{Cancelled, LookupError, SerialError, StringConvertError};
use crate::job::Job;
use crate::node::{children_content, ParseNode};
use crate::serial::{self, ObjectKind, Serialisable};

const WIRE_GET: u64 = 0;
const WIRE_POST: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Get,
    Post,
}

impl QueryType {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            QueryType::Get => "GET",
            QueryType::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HashKind::Md5 => "md5",
            HashKind::Sha1 => "sha1",
            HashKind::Sha256 => "sha256",
            HashKind::Sha512 => "sha512",
        }
    }
}

/// What a lookup script submits to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileIdentifierKind {
    File,
    Md5,
    Sha1,
    Sha256,
    Sha512,
    UserInput,
}

impl FileIdentifierKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FileIdentifierKind::File => "the actual file (POST only)",
            FileIdentifierKind::Md5 => "md5 hash",
            FileIdentifierKind::Sha1 => "sha1 hash",
            FileIdentifierKind::Sha256 => "sha256 hash",
            FileIdentifierKind::Sha512 => "sha512 hash",
            FileIdentifierKind::UserInput => "custom user input",
        }
    }

    fn wire_id(self) -> u64 {
        match self {
            FileIdentifierKind::File => 0,
            FileIdentifierKind::Md5 => 1,
            FileIdentifierKind::Sha1 => 2,
            FileIdentifierKind::Sha256 => 3,
            FileIdentifierKind::Sha512 => 4,
            FileIdentifierKind::UserInput => 5,
        }
    }

    fn from_wire(id: u64) -> Option<Self> {
        Some(match id {
            0 => FileIdentifierKind::File,
            1 => FileIdentifierKind::Md5,
            2 => FileIdentifierKind::Sha1,
            3 => FileIdentifierKind::Sha256,
            4 => FileIdentifierKind::Sha512,
            5 => FileIdentifierKind::UserInput,
            _ => return None,
        })
    }
}

/// A concrete identifier value, matching the script's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileIdentifier {
    File(PathBuf),
    Hash(Vec<u8>),
    UserInput(String),
}

/// The media handle a driver holds for a local file.
pub trait MediaHandle {
    /// The primary (sha256) hash.
    fn sha256(&self) -> &[u8];
    fn mime(&self) -> &str;
}

/// Translates the primary hash into other digest kinds.
pub trait HashStore {
    fn file_hashes(&self, sha256: &[u8], target: HashKind) -> Option<Vec<u8>>;
}

/// Locates the local copy of a file by its primary hash.
pub trait FileStore {
    fn file_path(&self, sha256: &[u8], mime: &str) -> Option<PathBuf>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRootFileLookup {
    name: String,
    url: String,
    query_type: QueryType,
    file_identifier_type: FileIdentifierKind,
    file_identifier_string_converter: StringConverter,
    file_identifier_arg_name: String,
    static_args: BTreeMap<String, String>,
    children: Vec<ParseNode>,
}

impl ParseRootFileLookup {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        query_type: QueryType,
        file_identifier_type: FileIdentifierKind,
        file_identifier_string_converter: StringConverter,
        file_identifier_arg_name: impl Into<String>,
        static_args: BTreeMap<String, String>,
        children: Vec<ParseNode>,
    ) -> Self {
        ParseRootFileLookup {
            name: name.into(),
            url: url.into(),
            query_type,
            file_identifier_type,
            file_identifier_string_converter,
            file_identifier_arg_name: file_identifier_arg_name.into(),
            static_args,
            children,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    #[must_use]
    pub fn uses_user_input(&self) -> bool {
        self.file_identifier_type == FileIdentifierKind::UserInput
    }

    #[must_use]
    pub fn parsable_content(&self) -> BTreeSet<ContentDescriptor> {
        self.children
            .iter()
            .flat_map(ParseNode::parsable_content)
            .collect()
    }

    /// Produces the identifier this script wants for a piece of media. User
    /// input scripts cannot be driven this way; the caller supplies the
    /// identifier directly.
    pub fn media_to_identifier(
        &self,
        media: &dyn MediaHandle,
        hashes: &dyn HashStore,
        files: &dyn FileStore,
    ) -> Result<FileIdentifier, LookupError> {
        match self.file_identifier_type {
            FileIdentifierKind::UserInput => Err(LookupError::TakesUserInput),
            FileIdentifierKind::Sha256 => Ok(FileIdentifier::Hash(media.sha256().to_vec())),
            FileIdentifierKind::Md5 | FileIdentifierKind::Sha1 | FileIdentifierKind::Sha512 => {
                let kind = match self.file_identifier_type {
                    FileIdentifierKind::Md5 => HashKind::Md5,
                    FileIdentifierKind::Sha1 => HashKind::Sha1,
                    _ => HashKind::Sha512,
                };
                hashes
                    .file_hashes(media.sha256(), kind)
                    .map(FileIdentifier::Hash)
                    .ok_or(LookupError::HashUnknown {
                        kind: kind.as_str(),
                    })
            }
            FileIdentifierKind::File => files
                .file_path(media.sha256(), media.mime())
                .map(FileIdentifier::File)
                .ok_or(LookupError::FileMissing),
        }
    }

    fn identifier_text(
        &self,
        identifier: &FileIdentifier,
    ) -> Result<String, StringConvertError> {
        match identifier {
            FileIdentifier::Hash(bytes) => self
                .file_identifier_string_converter
                .convert_identifier(bytes),
            FileIdentifier::UserInput(text) => {
                self.file_identifier_string_converter.convert(text)
            }
            FileIdentifier::File(path) => self
                .file_identifier_string_converter
                .convert(&path.to_string_lossy()),
        }
    }

    /// Builds and runs the query, returning the raw response body.
    pub fn fetch_data(
        &self,
        engine: &dyn NetworkEngine,
        job: &dyn Job,
        identifier: &FileIdentifier,
    ) -> Result<bytes::Bytes, LookupError> {
        let mut request_args = self.static_args.clone();
        if !matches!(identifier, FileIdentifier::File(_)) {
            request_args.insert(
                self.file_identifier_arg_name.clone(),
                self.identifier_text(identifier)?,
            );
        }

        let request = match self.query_type {
            QueryType::Get => {
                if matches!(identifier, FileIdentifier::File(_)) {
                    return Err(LookupError::FileOnGet);
                }
                let full_url = combine_get_url(&self.url, &request_args)?;
                job.set_variable("script_status", &format!("fetching {full_url}"));
                job.add_url(full_url.as_str());
                Request::get(full_url)
            }
            QueryType::Post => {
                let mut request = Request::post(&self.url);
                request.body = request_args.into_iter().collect();
                if let FileIdentifier::File(path) = identifier {
                    job.set_variable("script_status", "uploading file");
                    request.set_files(vec![(
                        self.file_identifier_arg_name.clone(),
                        path.clone(),
                    )]);
                } else {
                    job.set_variable("script_status", "uploading identifier");
                }
                request
            }
        };

        let mut network_job = engine.add_job(request);
        network_job.override_bandwidth();
        match network_job.wait_until_done() {
            Ok(()) => {}
            Err(net::NetworkError::NotFound) => {
                job.set_variable("script_status", "404 - nothing found");
                return Err(net::NetworkError::NotFound.into());
            }
            Err(net::NetworkError::Cancelled) => return Err(Cancelled.into()),
            Err(e) => {
                job.set_variable("script_status", "Network error!");
                warn!("problem fetching {}: {e}", self.url);
                return Err(e.into());
            }
        }
        if job.is_cancelled() {
            return Err(Cancelled.into());
        }
        Ok(network_job.content())
    }

    /// Runs the children over a fetched document, with the script URL as the
    /// referral for any links they follow.
    pub fn parse(
        &self,
        engine: &dyn NetworkEngine,
        job: &dyn Job,
        data: &str,
    ) -> Result<Vec<ContentResult>, LookupError> {
        let referral = Url::parse(&self.url).map_err(|e| LookupError::BadUrl {
            url: self.url.clone(),
            message: e.to_string(),
        })?;
        let results = children_content(engine, job, &self.children, data, &referral)?;
        if results.is_empty() {
            job.set_variable("script_status", "Did not find anything.");
        } else {
            job.set_variable("script_status", &format!("Found {} rows.", results.len()));
        }
        Ok(results)
    }

    /// The whole lookup: fetch, then parse. A failed fetch yields nothing,
    /// cancellation yields nothing with a "Cancelled!" status, and the job is
    /// finished whatever happens.
    pub fn do_query(
        &self,
        engine: &dyn NetworkEngine,
        job: &dyn Job,
        identifier: &FileIdentifier,
    ) -> Result<Vec<ContentResult>, LookupError> {
        let result = self.query(engine, job, identifier);
        job.finish();
        match result {
            Err(LookupError::Network(_)) => Ok(Vec::new()),
            Err(LookupError::Cancelled(_)) => {
                job.set_variable("script_status", "Cancelled!");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn query(
        &self,
        engine: &dyn NetworkEngine,
        job: &dyn Job,
        identifier: &FileIdentifier,
    ) -> Result<Vec<ContentResult>, LookupError> {
        let data = self.fetch_data(engine, job, identifier)?;
        let text = String::from_utf8_lossy(&data);
        self.parse(engine, job, &text)
    }
}

fn combine_get_url(
    base: &str,
    args: &BTreeMap<String, String>,
) -> Result<Url, LookupError> {
    let mut url = Url::parse(base).map_err(|e| LookupError::BadUrl {
        url: base.to_owned(),
        message: e.to_string(),
    })?;
    url.query_pairs_mut().extend_pairs(args.iter());
    Ok(url)
}

impl Serialisable for ParseRootFileLookup {
    const KIND: ObjectKind = ObjectKind::FileLookup;
    const VERSION: u64 = 2;

    fn encode_info(&self) -> Value {
        let children: Vec<Value> = self.children.iter().map(ParseNode::encode).collect();
        let query_type = match self.query_type {
            QueryType::Get => WIRE_GET,
            QueryType::Post => WIRE_POST,
        };
        json!([
            self.name,
            self.url,
            query_type,
            self.file_identifier_type.wire_id(),
            serial::encode(&self.file_identifier_string_converter),
            self.file_identifier_arg_name,
            self.static_args,
            children,
        ])
    }

    fn decode_info(info: Value) -> Result<Self, SerialError> {
        let mut parts = serial::fields(info, 8, "file lookup info")?;
        let children = serial::array(parts.pop().unwrap(), "file lookup children")?
            .iter()
            .map(ParseNode::decode)
            .collect::<Result<Vec<_>, _>>()?;
        let static_args = serial::object(parts.pop().unwrap(), "file lookup static args")?
            .into_iter()
            .map(|(key, value)| Ok((key, serial::string(value, "file lookup static arg")?)))
            .collect::<Result<BTreeMap<_, _>, SerialError>>()?;
        let file_identifier_arg_name =
            serial::string(parts.pop().unwrap(), "file identifier arg name")?;
        let file_identifier_string_converter = serial::decode(&parts.pop().unwrap())?;
        let file_identifier_type = FileIdentifierKind::from_wire(serial::integer(
            &parts.pop().unwrap(),
            "file identifier type",
        )?)
        .ok_or(SerialError::Malformed("unknown file identifier type"))?;
        let query_type = match serial::integer(&parts.pop().unwrap(), "file lookup query type")? {
            WIRE_GET => QueryType::Get,
            WIRE_POST => QueryType::Post,
            _ => return Err(SerialError::Malformed("unknown query type")),
        };
        let url = serial::string(parts.pop().unwrap(), "file lookup url")?;
        let name = serial::string(parts.pop().unwrap(), "file lookup name")?;
        Ok(ParseRootFileLookup {
            name,
            url,
            query_type,
            file_identifier_type,
            file_identifier_string_converter,
            file_identifier_arg_name,
            static_args,
            children,
        })
    }

    fn upgrade_info(version: u64, info: Value) -> Result<Value, SerialError> {
        match version {
            // v1 carried a fixed encoding enum for the identifier; it becomes
            // an equivalent string converter
            1 => {
                let mut parts = serial::fields(info, 8, "file lookup v1 info")?;
                let children = parts.pop().unwrap();
                let static_args = parts.pop().unwrap();
                let arg_name = parts.pop().unwrap();
                let encoding = serial::integer(&parts.pop().unwrap(), "file identifier encoding")?;
                let identifier_type = parts.pop().unwrap();
                let query_type = parts.pop().unwrap();
                let url = parts.pop().unwrap();
                let name = parts.pop().unwrap();

                let transformations = match encoding {
                    0 => json!([]),
                    1 => json!([[4, "hex"]]),
                    2 => json!([[4, "base64"]]),
                    _ => {
                        return Err(SerialError::Malformed(
                            "unknown file identifier encoding",
                        ))
                    }
                };
                let converter = json!([
                    ObjectKind::StringConverter.id(),
                    StringConverter::VERSION,
                    [transformations, "some hash bytes"],
                ]);
                Ok(json!([
                    name,
                    url,
                    query_type,
                    identifier_type,
                    converter,
                    arg_name,
                    static_args,
                    children,
                ]))
            }
            _ => Err(SerialError::NoMigration {
                kind: Self::KIND,
                version,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentPayload;
    use crate::convert::{Encoding, Transformation};
    use crate::formula::{HtmlContent, ParseFormulaHtml, TagRule};
    use crate::job::SimpleJob;
    use crate::node::ContentParser;
    use crate::strmatch::StringMatch;

    use std::cell::RefCell;

    struct StubMedia;

    impl MediaHandle for StubMedia {
        fn sha256(&self) -> &[u8] {
            &[0xab; 32]
        }

        fn mime(&self) -> &str {
            "image/png"
        }
    }

    struct StubStores {
        md5: Option<Vec<u8>>,
        path: Option<PathBuf>,
    }

    impl HashStore for StubStores {
        fn file_hashes(&self, _sha256: &[u8], target: HashKind) -> Option<Vec<u8>> {
            (target == HashKind::Md5).then(|| self.md5.clone()).flatten()
        }
    }

    impl FileStore for StubStores {
        fn file_path(&self, _sha256: &[u8], _mime: &str) -> Option<PathBuf> {
            self.path.clone()
        }
    }

    /// Engine that records requests and replies with one canned body.
    struct CannedEngine {
        body: &'static str,
        requests: RefCell<Vec<Request>>,
    }

    impl CannedEngine {
        fn new(body: &'static str) -> Self {
            CannedEngine {
                body,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl NetworkEngine for CannedEngine {
        fn add_job(&self, request: Request) -> Box<dyn net::NetworkJob> {
            self.requests.borrow_mut().push(request);
            Box::new(CannedJob { body: self.body })
        }
    }

    struct CannedJob {
        body: &'static str,
    }

    impl net::NetworkJob for CannedJob {
        fn wait_until_done(&mut self) -> Result<(), net::NetworkError> {
            Ok(())
        }

        fn content(&self) -> bytes::Bytes {
            bytes::Bytes::from_static(self.body.as_bytes())
        }
    }

    fn tag_child(name: &str, namespace: &str) -> ParseNode {
        ParseNode::Content(ContentParser::new(
            name,
            ContentPayload::Mappings {
                namespace: namespace.to_owned(),
            },
            ParseFormulaHtml::new(
                vec![TagRule::named("span").with_attr("class", "tag")],
                HtmlContent::Text,
                "",
                StringMatch::default(),
                StringConverter::default(),
            ),
        ))
    }

    fn hex_lookup(query_type: QueryType, kind: FileIdentifierKind) -> ParseRootFileLookup {
        ParseRootFileLookup::new(
            "booru lookup",
            "https://example.com/lookup",
            query_type,
            kind,
            StringConverter::new(vec![Transformation::Encode(Encoding::Hex)], "some hash bytes"),
            "hash",
            BTreeMap::from([("page".to_owned(), "post".to_owned())]),
            vec![tag_child("tags", "")],
        )
    }

    #[test]
    fn media_conversion_per_kind() {
        let media = StubMedia;
        let stores = StubStores {
            md5: Some(vec![1, 2, 3]),
            path: Some(PathBuf::from("/files/a.png")),
        };

        let sha = hex_lookup(QueryType::Get, FileIdentifierKind::Sha256);
        assert_eq!(
            sha.media_to_identifier(&media, &stores, &stores).unwrap(),
            FileIdentifier::Hash(vec![0xab; 32])
        );

        let md5 = hex_lookup(QueryType::Get, FileIdentifierKind::Md5);
        assert_eq!(
            md5.media_to_identifier(&media, &stores, &stores).unwrap(),
            FileIdentifier::Hash(vec![1, 2, 3])
        );

        let file = hex_lookup(QueryType::Post, FileIdentifierKind::File);
        assert_eq!(
            file.media_to_identifier(&media, &stores, &stores).unwrap(),
            FileIdentifier::File(PathBuf::from("/files/a.png"))
        );

        let user = hex_lookup(QueryType::Get, FileIdentifierKind::UserInput);
        assert!(matches!(
            user.media_to_identifier(&media, &stores, &stores),
            Err(LookupError::TakesUserInput)
        ));

        let missing = StubStores {
            md5: None,
            path: None,
        };
        assert!(matches!(
            md5.media_to_identifier(&media, &missing, &missing),
            Err(LookupError::HashUnknown { kind: "md5" })
        ));
        assert!(matches!(
            file.media_to_identifier(&media, &missing, &missing),
            Err(LookupError::FileMissing)
        ));
    }

    #[test]
    fn get_builds_the_query_string() {
        let engine = CannedEngine::new("<html></html>");
        let job = SimpleJob::new();
        let lookup = hex_lookup(QueryType::Get, FileIdentifierKind::Sha256);

        lookup
            .fetch_data(&engine, &job, &FileIdentifier::Hash(vec![0xde, 0xad]))
            .unwrap();

        let requests = engine.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, net::Method::Get);
        assert_eq!(
            requests[0].url,
            "https://example.com/lookup?hash=dead&page=post"
        );
        assert!(requests[0].body.is_empty());
        assert_eq!(job.urls(), vec![requests[0].url.clone()]);
        assert_eq!(
            job.variable("script_status").unwrap(),
            format!("fetching {}", requests[0].url)
        );
    }

    #[test]
    fn get_refuses_file_identifiers() {
        let engine = CannedEngine::new("");
        let job = SimpleJob::new();
        let lookup = hex_lookup(QueryType::Get, FileIdentifierKind::File);
        assert!(matches!(
            lookup.fetch_data(&engine, &job, &FileIdentifier::File(PathBuf::from("/f"))),
            Err(LookupError::FileOnGet)
        ));
        assert!(engine.requests.borrow().is_empty());
    }

    #[test]
    fn post_sends_form_or_file() {
        let engine = CannedEngine::new("");
        let job = SimpleJob::new();

        let lookup = hex_lookup(QueryType::Post, FileIdentifierKind::Sha256);
        lookup
            .fetch_data(&engine, &job, &FileIdentifier::Hash(vec![0xbe, 0xef]))
            .unwrap();
        {
            let requests = engine.requests.borrow();
            assert_eq!(requests[0].method, net::Method::Post);
            assert_eq!(requests[0].url, "https://example.com/lookup");
            assert_eq!(
                requests[0].body,
                vec![
                    ("hash".to_owned(), "beef".to_owned()),
                    ("page".to_owned(), "post".to_owned()),
                ]
            );
            assert!(requests[0].files.is_empty());
            assert_eq!(
                job.variable("script_status").as_deref(),
                Some("uploading identifier")
            );
        }

        let lookup = hex_lookup(QueryType::Post, FileIdentifierKind::File);
        lookup
            .fetch_data(&engine, &job, &FileIdentifier::File(PathBuf::from("/f.png")))
            .unwrap();
        let requests = engine.requests.borrow();
        assert_eq!(
            requests[1].files,
            vec![("hash".to_owned(), PathBuf::from("/f.png"))]
        );
        // the file itself is not in the form body
        assert_eq!(requests[1].body, vec![("page".to_owned(), "post".to_owned())]);
        assert_eq!(
            job.variable("script_status").as_deref(),
            Some("uploading file")
        );
    }

    #[test]
    fn do_query_parses_children() {
        let engine = CannedEngine::new(
            r#"<span class="tag">cute</span><span class="tag">landscape</span>"#,
        );
        let job = SimpleJob::new();
        let lookup = hex_lookup(QueryType::Get, FileIdentifierKind::Sha256);

        let results = lookup
            .do_query(&engine, &job, &FileIdentifier::Hash(vec![1]))
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1, "cute");
        assert_eq!(results[1].1, "landscape");
        assert!(job.is_finished());
        assert_eq!(
            job.variable("script_status").as_deref(),
            Some("Found 2 rows.")
        );
    }

    #[test]
    fn do_query_swallows_network_errors() {
        struct FailingEngine;
        struct FailingJob;

        impl net::NetworkJob for FailingJob {
            fn wait_until_done(&mut self) -> Result<(), net::NetworkError> {
                Err(net::NetworkError::Other("connection refused".to_owned()))
            }

            fn content(&self) -> bytes::Bytes {
                bytes::Bytes::new()
            }
        }

        impl NetworkEngine for FailingEngine {
            fn add_job(&self, _request: Request) -> Box<dyn net::NetworkJob> {
                Box::new(FailingJob)
            }
        }

        let job = SimpleJob::new();
        let lookup = hex_lookup(QueryType::Get, FileIdentifierKind::Sha256);
        let results = lookup
            .do_query(&FailingEngine, &job, &FileIdentifier::Hash(vec![1]))
            .unwrap();
        assert!(results.is_empty());
        assert!(job.is_finished());
        assert_eq!(
            job.variable("script_status").as_deref(),
            Some("Network error!")
        );
    }

    #[test]
    fn do_query_reports_cancellation() {
        let engine = CannedEngine::new("<html></html>");
        let job = SimpleJob::new();
        job.cancel();
        let lookup = hex_lookup(QueryType::Get, FileIdentifierKind::Sha256);
        let results = lookup
            .do_query(&engine, &job, &FileIdentifier::Hash(vec![1]))
            .unwrap();
        assert!(results.is_empty());
        assert!(job.is_finished());
        assert_eq!(job.variable("script_status").as_deref(), Some("Cancelled!"));
    }

    #[test]
    fn empty_results_set_the_status() {
        let engine = CannedEngine::new("<html><p>nothing tagged</p></html>");
        let job = SimpleJob::new();
        let lookup = hex_lookup(QueryType::Get, FileIdentifierKind::Sha256);
        let results = lookup
            .do_query(&engine, &job, &FileIdentifier::Hash(vec![1]))
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(
            job.variable("script_status").as_deref(),
            Some("Did not find anything.")
        );
    }

    #[test]
    fn serialises_and_back() {
        let lookup = hex_lookup(QueryType::Post, FileIdentifierKind::Md5);
        let value = serial::encode(&lookup);
        let back: ParseRootFileLookup = serial::decode(&value).unwrap();
        assert_eq!(back, lookup);
    }

    #[test]
    fn migrates_v1_encoding_enum() {
        #[track_caller]
        fn case(encoding: u64, expected: Vec<Transformation>) {
            let old = json!([
                ParseRootFileLookup::KIND.id(),
                1,
                [
                    "old lookup",
                    "https://example.com/lookup",
                    WIRE_GET,
                    3,
                    encoding,
                    "hash",
                    {},
                    [],
                ],
            ]);
            let migrated: ParseRootFileLookup = serial::decode(&old).unwrap();
            assert_eq!(
                migrated.file_identifier_string_converter,
                StringConverter::new(expected, "some hash bytes")
            );
            assert_eq!(migrated.file_identifier_type, FileIdentifierKind::Sha256);
        }

        case(0, vec![]);
        case(1, vec![Transformation::Encode(Encoding::Hex)]);
        case(2, vec![Transformation::Encode(Encoding::Base64)]);
    }
}
