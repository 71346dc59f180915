//! Top-level page parser: convert the whole page, optionally split it into
//! sub-documents, then run flat content parsers over the converted page.

use std::collections::BTreeSet;

use rand::RngCore;
use serde_json::{json, Value};

use crate::content::{ContentDescriptor, ContentResult};
use crate::convert::StringConverter;
use crate::error::{ParseError, SerialError};
use crate::formula::{HtmlContent, ParseFormulaHtml, TagRule};
use crate::node::ContentParser;
use crate::serial::{self, ObjectKind, Serialisable};
use crate::strmatch::StringMatch;

fn generate_parser_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn default_separation_formula() -> ParseFormulaHtml {
    ParseFormulaHtml::new(
        vec![TagRule::named("div").with_attr("class", "thumb")],
        HtmlContent::Html,
        "",
        StringMatch::default(),
        StringConverter::new(Vec::new(), "parsed information"),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParser {
    name: String,
    parser_key: String,
    string_converter: StringConverter,
    can_produce_separated_content: bool,
    separation_formula: ParseFormulaHtml,
    separated_content_parsers: Vec<ContentParser>,
    content_parsers: Vec<ContentParser>,
    example_urls: Vec<String>,
}

impl PageParser {
    pub fn new(name: impl Into<String>) -> Self {
        PageParser {
            name: name.into(),
            parser_key: generate_parser_key(),
            string_converter: StringConverter::default(),
            can_produce_separated_content: false,
            separation_formula: default_separation_formula(),
            separated_content_parsers: Vec::new(),
            content_parsers: Vec::new(),
            example_urls: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_string_converter(mut self, string_converter: StringConverter) -> Self {
        self.string_converter = string_converter;
        self
    }

    #[must_use]
    pub fn with_content_parsers(mut self, content_parsers: Vec<ContentParser>) -> Self {
        self.content_parsers = content_parsers;
        self
    }

    /// Enables the separation pass: `formula` splits the page into
    /// sub-documents and `parsers` run over each one.
    #[must_use]
    pub fn with_separation(
        mut self,
        formula: ParseFormulaHtml,
        parsers: Vec<ContentParser>,
    ) -> Self {
        self.can_produce_separated_content = true;
        self.separation_formula = formula;
        self.separated_content_parsers = parsers;
        self
    }

    #[must_use]
    pub fn with_example_urls(mut self, example_urls: Vec<String>) -> Self {
        self.example_urls = example_urls;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque identity of this parser. Cloning a parser the user means to
    /// treat as distinct should regenerate it.
    #[must_use]
    pub fn parser_key(&self) -> &str {
        &self.parser_key
    }

    pub fn regenerate_parser_key(&mut self) {
        self.parser_key = generate_parser_key();
    }

    #[must_use]
    pub fn example_urls(&self) -> &[String] {
        &self.example_urls
    }

    #[must_use]
    pub fn parsable_content(&self) -> BTreeSet<ContentDescriptor> {
        self.separated_content_parsers
            .iter()
            .chain(&self.content_parsers)
            .flat_map(ContentParser::parsable_content)
            .collect()
    }

    /// Runs the parser over one page. Returns per-sub-document result lists
    /// from the separation pass (empty when separation is off) and the flat
    /// results from the whole page.
    pub fn parse(
        &self,
        page_data: &str,
    ) -> Result<(Vec<Vec<ContentResult>>, Vec<ContentResult>), ParseError> {
        let converted = self.string_converter.convert(page_data)?;

        let mut separated_results = Vec::new();
        if self.can_produce_separated_content {
            for sub_page in self.separation_formula.parse(&converted) {
                let mut sub_results = Vec::new();
                for parser in &self.separated_content_parsers {
                    sub_results.extend(parser.parse(&sub_page)?);
                }
                separated_results.push(sub_results);
            }
        }

        let mut results = Vec::new();
        for parser in &self.content_parsers {
            results.extend(parser.parse(&converted)?);
        }

        Ok((separated_results, results))
    }
}

impl Serialisable for PageParser {
    const KIND: ObjectKind = ObjectKind::PageParser;
    const VERSION: u64 = 1;

    fn encode_info(&self) -> Value {
        let separated: Vec<Value> = self
            .separated_content_parsers
            .iter()
            .map(serial::encode)
            .collect();
        let flat: Vec<Value> = self.content_parsers.iter().map(serial::encode).collect();
        json!([
            self.name,
            self.parser_key,
            serial::encode(&self.string_converter),
            self.can_produce_separated_content,
            serial::encode(&self.separation_formula),
            separated,
            flat,
            self.example_urls,
        ])
    }

    fn decode_info(info: Value) -> Result<Self, SerialError> {
        let mut parts = serial::fields(info, 8, "page parser info")?;
        let example_urls = serial::array(parts.pop().unwrap(), "page parser example urls")?
            .into_iter()
            .map(|value| serial::string(value, "page parser example url"))
            .collect::<Result<Vec<_>, _>>()?;
        let content_parsers = decode_parsers(parts.pop().unwrap())?;
        let separated_content_parsers = decode_parsers(parts.pop().unwrap())?;
        let separation_formula = serial::decode(&parts.pop().unwrap())?;
        let can_produce_separated_content =
            serial::boolean(&parts.pop().unwrap(), "page parser separation flag")?;
        let string_converter = serial::decode(&parts.pop().unwrap())?;
        let parser_key = serial::string(parts.pop().unwrap(), "page parser key")?;
        let name = serial::string(parts.pop().unwrap(), "page parser name")?;
        Ok(PageParser {
            name,
            parser_key,
            string_converter,
            can_produce_separated_content,
            separation_formula,
            separated_content_parsers,
            content_parsers,
            example_urls,
        })
    }
}

fn decode_parsers(value: Value) -> Result<Vec<ContentParser>, SerialError> {
    serial::array(value, "content parser list")?
        .iter()
        .map(serial::decode)
        .collect()
}
