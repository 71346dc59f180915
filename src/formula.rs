//! # HTML parsing formula
//!
//! A formula walks an HTML document through an ordered chain of [`TagRule`]s,
//! narrowing a working set of elements, then pulls one string out of each
//! survivor (an attribute, the aggregated text, or the outer html). Every
//! extracted string is validated by a [`StringMatch`] and rewritten by a
//! [`StringConverter`]; a string that fails either is dropped without
//! poisoning its siblings.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use scraper::{ElementRef, Html};
use serde_json::{json, Value};

use crate::convert::StringConverter;
use crate::error::SerialError;
use crate::serial::{self, ObjectKind, Serialisable};
use crate::strmatch::StringMatch;
use crate::util::ordinal;

/// Attributes the HTML spec treats as whitespace-separated token lists.
const MULTI_VALUED_ATTRS: &[&str] = &[
    "class",
    "rel",
    "rev",
    "accept-charset",
    "headers",
    "accesskey",
];

fn is_multi_valued(attr: &str) -> bool {
    MULTI_VALUED_ATTRS.contains(&attr)
}

/// One step of the narrowing chain: tag name, required attributes, and an
/// optional zero-based pick among the matches found under each current node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    pub name: String,
    pub attrs: BTreeMap<String, String>,
    pub index: Option<usize>,
}

impl TagRule {
    pub fn named(name: impl Into<String>) -> Self {
        TagRule {
            name: name.into(),
            attrs: BTreeMap::new(),
            index: None,
        }
    }

    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn nth(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    fn matches(&self, el: &ElementRef) -> bool {
        if el.value().name() != self.name {
            return false;
        }
        self.attrs.iter().all(|(key, want)| match el.attr(key) {
            Some(have) if is_multi_valued(key) => have.split_whitespace().any(|token| token == want),
            Some(have) => have == want,
            None => false,
        })
    }
}

impl fmt::Display for TagRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            None => write!(f, "every <{}> tag", self.name)?,
            Some(index) => write!(f, "the {} <{}> tag", ordinal(index + 1), self.name)?,
        }
        if !self.attrs.is_empty() {
            let attrs: Vec<String> = self
                .attrs
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            write!(f, " with attributes {}", attrs.join(", "))?;
        }
        Ok(())
    }
}

const WIRE_CONTENT_ATTRIBUTE: u64 = 0;
const WIRE_CONTENT_TEXT: u64 = 1;
const WIRE_CONTENT_HTML: u64 = 2;

/// What to pull out of each surviving element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlContent {
    Attribute,
    Text,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFormulaHtml {
    tag_rules: Vec<TagRule>,
    content: HtmlContent,
    attribute: String,
    string_match: StringMatch,
    string_converter: StringConverter,
}

impl Default for ParseFormulaHtml {
    fn default() -> Self {
        ParseFormulaHtml::new(
            vec![TagRule::named("a")],
            HtmlContent::Attribute,
            "href",
            StringMatch::default(),
            StringConverter::new(Vec::new(), "parsed information"),
        )
    }
}

impl ParseFormulaHtml {
    pub fn new(
        tag_rules: Vec<TagRule>,
        content: HtmlContent,
        attribute: impl Into<String>,
        string_match: StringMatch,
        string_converter: StringConverter,
    ) -> Self {
        ParseFormulaHtml {
            tag_rules,
            content,
            attribute: attribute.into(),
            string_match,
            string_converter,
        }
    }

    /// Runs the formula over a document. Always yields fragments in document
    /// order; an empty result does not distinguish "nothing matched" from
    /// "everything was filtered".
    #[must_use]
    pub fn parse(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut roots = vec![document.root_element()];

        for (depth, rule) in self.tag_rules.iter().enumerate() {
            // the first rule searches the whole document, so the root element
            // itself is a candidate; later rules search strictly below their
            // node
            let skip = usize::from(depth > 0);
            let mut next = Vec::new();
            for el in &roots {
                let found: Vec<ElementRef> = el
                    .descendants()
                    .skip(skip)
                    .filter_map(ElementRef::wrap)
                    .filter(|el| rule.matches(el))
                    .collect();
                match rule.index {
                    None => next.extend(found),
                    Some(index) => next.extend(found.get(index).copied()),
                }
            }
            roots = next;
        }

        let mut fragments = Vec::new();
        for el in roots {
            let Some(raw) = self.extract(&el) else {
                continue;
            };
            if let Err(e) = self.string_match.test(&raw) {
                debug!("fragment dropped: {e}");
                continue;
            }
            match self.string_converter.convert(&raw) {
                Ok(converted) if !converted.is_empty() => fragments.push(converted),
                Ok(_) => debug!("fragment dropped: converted to nothing"),
                Err(e) => debug!("fragment dropped: {e}"),
            }
        }
        fragments
    }

    fn extract(&self, el: &ElementRef) -> Option<String> {
        match self.content {
            HtmlContent::Attribute => {
                let value = el.attr(&self.attribute)?;
                let value = if is_multi_valued(&self.attribute) {
                    value.split_whitespace().collect::<Vec<_>>().join(" ")
                } else {
                    value.to_owned()
                };
                (!value.is_empty()).then_some(value)
            }
            HtmlContent::Text => {
                let text: String = el.text().collect();
                (!text.is_empty()).then_some(text)
            }
            HtmlContent::Html => Some(el.html()),
        }
    }
}

impl fmt::Display for ParseFormulaHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = self
            .tag_rules
            .iter()
            .map(|rule| format!("get {rule}"))
            .collect();
        lines.push(match self.content {
            HtmlContent::Attribute => {
                format!("get the {} attribute of those tags", self.attribute)
            }
            HtmlContent::Text => "get the text content of those tags".to_owned(),
            HtmlContent::Html => "get the html of those tags".to_owned(),
        });
        lines.extend(self.string_converter.transformation_strings());
        f.write_str(&lines.join("\nand then "))
    }
}

fn encode_tag_rule(rule: &TagRule) -> Value {
    json!([rule.name, rule.attrs, rule.index])
}

fn decode_tag_rule(value: Value) -> Result<TagRule, SerialError> {
    let mut parts = serial::fields(value, 3, "tag rule triple")?;
    let index = serial::opt_integer(&parts.pop().unwrap(), "tag rule index")?;
    let attrs = serial::object(parts.pop().unwrap(), "tag rule attributes")?
        .into_iter()
        .map(|(key, value)| Ok((key, serial::string(value, "tag rule attribute value")?)))
        .collect::<Result<BTreeMap<_, _>, SerialError>>()?;
    let name = serial::string(parts.pop().unwrap(), "tag rule name")?;
    Ok(TagRule {
        name,
        attrs,
        index: index.map(|n| n as usize),
    })
}

impl Serialisable for ParseFormulaHtml {
    const KIND: ObjectKind = ObjectKind::FormulaHtml;
    const VERSION: u64 = 5;

    fn encode_info(&self) -> Value {
        let tag_rules: Vec<Value> = self.tag_rules.iter().map(encode_tag_rule).collect();
        let content = match self.content {
            HtmlContent::Attribute => WIRE_CONTENT_ATTRIBUTE,
            HtmlContent::Text => WIRE_CONTENT_TEXT,
            HtmlContent::Html => WIRE_CONTENT_HTML,
        };
        json!([
            tag_rules,
            content,
            self.attribute,
            serial::encode(&self.string_match),
            serial::encode(&self.string_converter),
        ])
    }

    fn decode_info(info: Value) -> Result<Self, SerialError> {
        let mut parts = serial::fields(info, 5, "html formula info")?;
        let string_converter = serial::decode(&parts.pop().unwrap())?;
        let string_match = serial::decode(&parts.pop().unwrap())?;
        let attribute = serial::string(parts.pop().unwrap(), "formula attribute")?;
        let content = match serial::integer(&parts.pop().unwrap(), "formula content kind")? {
            WIRE_CONTENT_ATTRIBUTE => HtmlContent::Attribute,
            WIRE_CONTENT_TEXT => HtmlContent::Text,
            WIRE_CONTENT_HTML => HtmlContent::Html,
            _ => return Err(SerialError::Malformed("unknown formula content kind")),
        };
        let tag_rules = serial::array(parts.pop().unwrap(), "formula tag rules")?
            .into_iter()
            .map(decode_tag_rule)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ParseFormulaHtml::new(
            tag_rules,
            content,
            attribute,
            string_match,
            string_converter,
        ))
    }

    fn upgrade_info(version: u64, info: Value) -> Result<Value, SerialError> {
        match version {
            // v1 had no culling controls at all
            1 => {
                let mut parts = serial::fields(info, 2, "html formula v1 info")?;
                let attribute = parts.pop().unwrap();
                let tag_rules = parts.pop().unwrap();
                Ok(json!([tag_rules, attribute, [0, 0, "", ""]]))
            }
            // the culling tuple becomes an equivalent string converter
            2 => {
                let mut parts = serial::fields(info, 3, "html formula v2 info")?;
                let culling = serial::fields(parts.pop().unwrap(), 4, "culling tuple")?;
                let attribute = parts.pop().unwrap();
                let tag_rules = parts.pop().unwrap();

                let append = serial::string(culling[3].clone(), "culling append")?;
                let prepend = serial::string(culling[2].clone(), "culling prepend")?;
                let cull_back = serial::signed(&culling[1], "culling back count")?;
                let cull_front = serial::signed(&culling[0], "culling front count")?;

                let mut transformations = Vec::new();
                if cull_front > 0 {
                    transformations.push(json!([6, cull_front]));
                } else if cull_front < 0 {
                    transformations.push(json!([1, -cull_front]));
                }
                if cull_back > 0 {
                    transformations.push(json!([7, cull_back]));
                } else if cull_back < 0 {
                    transformations.push(json!([0, -cull_back]));
                }
                if !prepend.is_empty() {
                    transformations.push(json!([2, prepend]));
                }
                if !append.is_empty() {
                    transformations.push(json!([3, append]));
                }
                let converter = json!([
                    ObjectKind::StringConverter.id(),
                    StringConverter::VERSION,
                    [transformations, "parsed information"],
                ]);
                Ok(json!([tag_rules, attribute, converter]))
            }
            // v4 gained a string match
            3 => {
                let mut parts = serial::fields(info, 3, "html formula v3 info")?;
                let converter = parts.pop().unwrap();
                let attribute = parts.pop().unwrap();
                let tag_rules = parts.pop().unwrap();
                let string_match = serial::encode(&StringMatch::default());
                Ok(json!([tag_rules, attribute, string_match, converter]))
            }
            // a null attribute used to mean "fetch the text instead"
            4 => {
                let mut parts = serial::fields(info, 4, "html formula v4 info")?;
                let converter = parts.pop().unwrap();
                let string_match = parts.pop().unwrap();
                let attribute = parts.pop().unwrap();
                let tag_rules = parts.pop().unwrap();
                let (content, attribute) = if attribute.is_null() {
                    (WIRE_CONTENT_TEXT, json!(""))
                } else {
                    (WIRE_CONTENT_ATTRIBUTE, attribute)
                };
                Ok(json!([tag_rules, content, attribute, string_match, converter]))
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
    use crate::convert::Transformation;
    use crate::strmatch::{CharClass, MatchKind};

    fn attribute_formula(tag_rules: Vec<TagRule>, attribute: &str) -> ParseFormulaHtml {
        ParseFormulaHtml::new(
            tag_rules,
            HtmlContent::Attribute,
            attribute,
            StringMatch::default(),
            StringConverter::default(),
        )
    }

    fn text_formula(tag_rules: Vec<TagRule>) -> ParseFormulaHtml {
        ParseFormulaHtml::new(
            tag_rules,
            HtmlContent::Text,
            "",
            StringMatch::default(),
            StringConverter::default(),
        )
    }

    const LINKS: &str =
        r#"<html><body><a href="/x">1</a><a href="/y">2</a></body></html>"#;

    #[test]
    fn attribute_extraction() {
        let formula = attribute_formula(vec![TagRule::named("a")], "href");
        assert_eq!(formula.parse(LINKS), vec!["/x", "/y"]);
    }

    #[test]
    fn indexed_selection() {
        let formula = attribute_formula(vec![TagRule::named("a").nth(1)], "href");
        assert_eq!(formula.parse(LINKS), vec!["/y"]);

        let formula = attribute_formula(vec![TagRule::named("a").nth(2)], "href");
        assert!(formula.parse(LINKS).is_empty());
    }

    #[test]
    fn index_applies_per_branch() {
        let html = r#"
            <div><span><a href="/a0">.</a><a href="/a1">.</a></span></div>
            <div><span><a href="/b0">.</a><a href="/b1">.</a></span></div>
        "#;
        let formula = attribute_formula(
            vec![TagRule::named("div"), TagRule::named("a").nth(1)],
            "href",
        );
        assert_eq!(formula.parse(html), vec!["/a1", "/b1"]);
    }

    #[test]
    fn class_attribute_matches_by_token() {
        let html = r#"<html><body>
            <div class="thumb featured">Hi</div>
            <div class="thumbnail">miss</div>
        </body></html>"#;
        let formula = text_formula(vec![TagRule::named("div").with_attr("class", "thumb")]);
        assert_eq!(formula.parse(html), vec!["Hi"]);
    }

    #[test]
    fn multi_valued_attribute_is_space_joined() {
        let html = r#"<div class="  thumb   featured ">x</div>"#;
        let formula = attribute_formula(vec![TagRule::named("div")], "class");
        assert_eq!(formula.parse(html), vec!["thumb featured"]);
    }

    #[test]
    fn plain_attributes_match_exactly() {
        let html = r#"<div data-kind="thumb featured">x</div>"#;
        let formula =
            text_formula(vec![TagRule::named("div").with_attr("data-kind", "thumb")]);
        assert!(formula.parse(html).is_empty());
    }

    #[test]
    fn missing_or_empty_attribute_produces_nothing() {
        let html = r#"<a href="">empty</a><a>none</a><a href="/ok">ok</a>"#;
        let formula = attribute_formula(vec![TagRule::named("a")], "href");
        assert_eq!(formula.parse(html), vec!["/ok"]);
    }

    #[test]
    fn text_is_aggregated_recursively() {
        let html = "<div><p>one <b>two</b></p><p>three</p></div>";
        let formula = text_formula(vec![TagRule::named("div")]);
        assert_eq!(formula.parse(html), vec!["one twothree"]);
    }

    #[test]
    fn html_content_is_outer_html() {
        let html = "<div><p>keep <b>me</b></p></div>";
        let formula = ParseFormulaHtml::new(
            vec![TagRule::named("p")],
            HtmlContent::Html,
            "",
            StringMatch::default(),
            StringConverter::default(),
        );
        assert_eq!(formula.parse(html), vec!["<p>keep <b>me</b></p>"]);
    }

    #[test]
    fn rules_chain_through_descendants() {
        let html = r#"
            <div class="entry"><ul><li><a href="/one">x</a></li></ul></div>
            <div class="other"><a href="/two">x</a></div>
        "#;
        let formula = attribute_formula(
            vec![
                TagRule::named("div").with_attr("class", "entry"),
                TagRule::named("a"),
            ],
            "href",
        );
        assert_eq!(formula.parse(html), vec!["/one"]);
    }

    #[test]
    fn failing_fragments_are_dropped_not_fatal() {
        let _log = crate::util::test_log();
        let html = r#"<a href="123">.</a><a href="abc">.</a><a href="456">.</a>"#;
        let formula = ParseFormulaHtml::new(
            vec![TagRule::named("a")],
            HtmlContent::Attribute,
            "href",
            StringMatch::new(MatchKind::Flexible(CharClass::Numeric), None, None, "1"),
            StringConverter::default(),
        );
        assert_eq!(formula.parse(html), vec!["123", "456"]);
    }

    #[test]
    fn converter_runs_after_match() {
        let formula = ParseFormulaHtml::new(
            vec![TagRule::named("a")],
            HtmlContent::Attribute,
            "href",
            StringMatch::default(),
            StringConverter::new(
                vec![Transformation::PrependText("https://example.com".to_owned())],
                "/x",
            ),
        );
        assert_eq!(
            formula.parse(LINKS),
            vec!["https://example.com/x", "https://example.com/y"]
        );
    }

    #[test]
    fn display_reads_like_a_recipe() {
        let formula = ParseFormulaHtml::new(
            vec![
                TagRule::named("div").with_attr("class", "thumb"),
                TagRule::named("a").nth(0),
            ],
            HtmlContent::Attribute,
            "href",
            StringMatch::default(),
            StringConverter::new(vec![Transformation::RemoveFromBeginning(1)], "x"),
        );
        assert_eq!(
            formula.to_string(),
            "get every <div> tag with attributes class=thumb\n\
             and then get the 1st <a> tag\n\
             and then get the href attribute of those tags\n\
             and then remove the first 1 characters"
        );
    }

    #[test]
    fn serialises_and_back() {
        let formula = ParseFormulaHtml::new(
            vec![
                TagRule::named("div").with_attr("class", "thumb").nth(2),
                TagRule::named("a"),
            ],
            HtmlContent::Attribute,
            "href",
            StringMatch::regex("^/post/").unwrap(),
            StringConverter::new(
                vec![Transformation::PrependText("https://example.com".to_owned())],
                "/post/123",
            ),
        );
        let value = serial::encode(&formula);
        let back: ParseFormulaHtml = serial::decode(&value).unwrap();
        assert_eq!(back, formula);
        assert_eq!(back.parse(LINKS), formula.parse(LINKS));
    }

    #[test]
    fn migrates_v1_to_current() {
        // oldest shape: ([rules], attribute)
        let old = json!([
            ParseFormulaHtml::KIND.id(),
            1,
            [[["a", {}, null]], "href"],
        ]);
        let migrated: ParseFormulaHtml = serial::decode(&old).unwrap();
        let expected = ParseFormulaHtml::new(
            vec![TagRule::named("a")],
            HtmlContent::Attribute,
            "href",
            StringMatch::default(),
            StringConverter::new(Vec::new(), "parsed information"),
        );
        assert_eq!(migrated, expected);
        assert_eq!(migrated.parse(LINKS), expected.parse(LINKS));
    }

    #[test]
    fn migrates_null_attribute_to_text() {
        let old = json!([
            ParseFormulaHtml::KIND.id(),
            1,
            [[["p", {}, null]], null],
        ]);
        let migrated: ParseFormulaHtml = serial::decode(&old).unwrap();
        assert_eq!(migrated.parse("<p>hello</p>"), vec!["hello"]);
    }

    #[test]
    fn migrates_culling_into_transformations() {
        // v2 culling tuple: keep 2 from the front, drop 1 from the front
        // (negative back cull), then wrap in brackets
        let old = json!([
            ParseFormulaHtml::KIND.id(),
            2,
            [[["a", {}, null]], "href", [2, -1, "[", "]"]],
        ]);
        let migrated: ParseFormulaHtml = serial::decode(&old).unwrap();
        assert_eq!(migrated.parse(LINKS), vec!["[x]", "[y]"]);
    }
}
