//! Typed view of the parts of pandoc's JSON AST the filter inspects.
//!
//! Blocks stay as [`Value`]s and are matched structurally; inline lists are
//! deserialised into [`Inline`] when their content matters (callout headers,
//! captions, citations) and serialised back when emitted.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// `[identifier, classes, key-value pairs]`
pub type Attr = (String, Vec<String>, Vec<(String, String)>);

/// `[url, title]`
pub type Target = (String, String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum QuoteType {
    SingleQuote,
    DoubleQuote,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum MathType {
    DisplayMath,
    InlineMath,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum CitationMode {
    AuthorInText,
    SuppressAuthor,
    NormalCitation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub citation_id: String,
    pub citation_prefix: Vec<Inline>,
    pub citation_suffix: Vec<Inline>,
    pub citation_mode: CitationMode,
    pub citation_note_num: i64,
    pub citation_hash: i64,
}

/// Pandoc inline element, in pandoc-types' JSON encoding (`t`/`c`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum Inline {
    Str(String),
    Emph(Vec<Inline>),
    Underline(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikeout(Vec<Inline>),
    Superscript(Vec<Inline>),
    Subscript(Vec<Inline>),
    SmallCaps(Vec<Inline>),
    Quoted(QuoteType, Vec<Inline>),
    Cite(Vec<Citation>, Vec<Inline>),
    Code(Attr, String),
    Space,
    SoftBreak,
    LineBreak,
    Math(MathType, String),
    RawInline(String, String),
    Link(Attr, Vec<Inline>, Target),
    Image(Attr, Vec<Inline>, Target),
    // block content of notes is never inspected
    Note(Vec<Value>),
    Span(Attr, Vec<Inline>),
}

impl Inline {
    /// Space-like separators between words
    pub fn is_space(&self) -> bool {
        matches!(self, Inline::Space | Inline::SoftBreak | Inline::LineBreak)
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Inline::SoftBreak | Inline::LineBreak)
    }
}

pub fn empty_attr() -> Attr {
    (String::new(), Vec::new(), Vec::new())
}

/// Tag (`t`) of an AST object, if it is one
pub fn tag(value: &Value) -> Option<&str> {
    value.get("t").and_then(Value::as_str)
}

pub fn has_tag(value: &Value, name: &str) -> bool {
    tag(value) == Some(name)
}

/// Deserialise an inline list, `None` if any element is not a known inline
pub fn inlines_from(value: &Value) -> Option<Vec<Inline>> {
    serde_json::from_value(value.clone()).ok()
}

pub fn inlines_value(inlines: &[Inline]) -> Value {
    json!(inlines)
}

/// Inline content of a `Para` or `Plain` block
pub fn block_inlines(block: &Value) -> Option<Vec<Inline>> {
    match tag(block)? {
        "Para" | "Plain" => inlines_from(block.get("c")?),
        _ => None,
    }
}

/// Content blocks of a pandoc 3 `Figure` block
pub fn figure_body(block: &Value) -> Option<&Vec<Value>> {
    if !has_tag(block, "Figure") {
        return None;
    }
    block.get("c")?.as_array()?.get(2)?.as_array()
}

pub fn raw_block(format: &str, text: impl Into<String>) -> Value {
    json!({ "t": "RawBlock", "c": [format, text.into()] })
}

pub fn raw_inline(format: &str, text: impl Into<String>) -> Inline {
    Inline::RawInline(format.to_string(), text.into())
}

pub fn plain(inlines: &[Inline]) -> Value {
    json!({ "t": "Plain", "c": inlines_value(inlines) })
}

pub fn para(inlines: &[Inline]) -> Value {
    json!({ "t": "Para", "c": inlines_value(inlines) })
}

/// Split text into `Str` words separated by `Space`
pub fn str_inlines(text: &str) -> Vec<Inline> {
    let mut inlines = Vec::new();
    for word in text.split_whitespace() {
        if !inlines.is_empty() {
            inlines.push(Inline::Space);
        }
        inlines.push(Inline::Str(word.to_string()));
    }
    inlines
}

/// Drop leading and trailing separators, turning inner breaks into spaces
pub fn trim_spaces(mut inlines: Vec<Inline>) -> Vec<Inline> {
    while inlines.first().is_some_and(Inline::is_space) {
        inlines.remove(0);
    }
    while inlines.last().is_some_and(Inline::is_space) {
        inlines.pop();
    }
    inlines
        .into_iter()
        .map(|i| if i.is_break() { Inline::Space } else { i })
        .collect()
}

/// `pandoc-api-version` of the document as (major, minor)
pub fn api_version(doc: &Value) -> Option<(u64, u64)> {
    let version = doc.get("pandoc-api-version")?.as_array()?;
    Some((version.first()?.as_u64()?, version.get(1)?.as_u64()?))
}
