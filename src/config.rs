//! Filter configuration read from the document metadata.
//!
//! Metadata comes from the YAML front matter, `--metadata` flags or a
//! `--metadata-file`, so the same setting may arrive as a string, inlines
//! or a boolean. Unusable values fall back to the defaults.

use serde_json::{Map, Value};

use crate::ast::{block_inlines, inlines_from, tag};
use crate::callout::CalloutKind;
use crate::caption::plain_text;
use crate::registry::{LabelEntry, NumberStyle};

/// Output family, from the format argument pandoc passes to filters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Latex,
    Docx,
    Html,
    Markdown,
}

impl Target {
    pub fn select(format: Option<&str>, caption_style: CaptionStyle) -> Self {
        let format = format.unwrap_or("markdown").to_ascii_lowercase();
        if format.contains("latex") || format.contains("pdf") || format == "beamer" {
            Target::Latex
        } else if format.contains("docx") {
            Target::Docx
        } else if format.starts_with("html") || format.starts_with("epub") {
            Target::Html
        } else if caption_style == CaptionStyle::Html {
            Target::Html
        } else {
            Target::Markdown
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptionStyle {
    #[default]
    Plain,
    Html,
}

/// Image format used by flattened markdown output
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FigureFormat {
    Png,
    Webp,
    Jpg,
    #[default]
    Original,
}

impl FigureFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Some(FigureFormat::Png),
            "webp" => Some(FigureFormat::Webp),
            "jpg" | "jpeg" => Some(FigureFormat::Jpg),
            "original" => Some(FigureFormat::Original),
            _ => None,
        }
    }

    pub fn extension(self) -> Option<&'static str> {
        match self {
            FigureFormat::Png => Some("png"),
            FigureFormat::Webp => Some("webp"),
            FigureFormat::Jpg => Some("jpg"),
            FigureFormat::Original => None,
        }
    }
}

/// Display name of figures or tables, e.g. `Fig.` / `Figs.`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prefix {
    pub singular: String,
    pub plural: String,
}

impl Prefix {
    fn new(singular: &str, plural: &str) -> Self {
        Prefix {
            singular: singular.to_string(),
            plural: plural.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FilterConfig {
    pub figure_prefix: Prefix,
    pub table_prefix: Prefix,
    pub numbers: NumberStyle,
    pub number_figures: bool,
    pub number_tables: bool,
    pub caption_style: CaptionStyle,
    pub visualize_captions: bool,
    pub figure_format: FigureFormat,
    pub figure_offset: u32,
    pub table_offset: u32,
    /// Labels of the other documents in a multi-file build
    pub global_labels: Vec<(String, LabelEntry)>,
    /// Host understands the `Figure` block (pandoc API 1.23 and later)
    pub native_figures: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            figure_prefix: Prefix::new("Figure", "Figures"),
            table_prefix: Prefix::new("Table", "Tables"),
            numbers: NumberStyle::default(),
            number_figures: true,
            number_tables: true,
            caption_style: CaptionStyle::Plain,
            visualize_captions: false,
            figure_format: FigureFormat::Original,
            figure_offset: 0,
            table_offset: 0,
            global_labels: Vec::new(),
            native_figures: true,
        }
    }
}

impl FilterConfig {
    /// Read the configuration from a pandoc document's `meta` map
    pub fn from_document(doc: &Value) -> Self {
        let mut config = FilterConfig::default();
        if let Some((major, minor)) = crate::ast::api_version(doc) {
            config.native_figures = (major, minor) >= (1, 23);
        }
        let Some(meta) = doc.get("meta").and_then(Value::as_object) else {
            return config;
        };

        if let Some(prefix) = meta.get("figPrefix").and_then(meta_prefix) {
            config.figure_prefix = prefix;
        }
        if let Some(prefix) = meta.get("tblPrefix").and_then(meta_prefix) {
            config.table_prefix = prefix;
        }
        if let Some(si) = meta.get("is_si").and_then(meta_bool) {
            config.numbers.si = si;
        }
        if let Some(on) = meta.get("number-figures").and_then(meta_bool) {
            config.number_figures = on;
        }
        if let Some(on) = meta.get("number-tables").and_then(meta_bool) {
            config.number_tables = on;
        }
        if let Some(style) = meta.get("caption-style").and_then(meta_text) {
            config.caption_style = match style.trim().to_ascii_lowercase().as_str() {
                "html" => CaptionStyle::Html,
                _ => CaptionStyle::Plain,
            };
        }
        if let Some(on) = meta.get("visualize-captions").and_then(meta_bool) {
            config.visualize_captions = on;
        }
        if let Some(format) = meta
            .get("figure-format")
            .and_then(meta_text)
            .and_then(|f| FigureFormat::parse(&f))
        {
            config.figure_format = format;
        }
        if let Some(offset) = meta.get("figure-offset").and_then(meta_u32) {
            config.figure_offset = offset;
        }
        if let Some(offset) = meta.get("table-offset").and_then(meta_u32) {
            config.table_offset = offset;
        }
        if let Some(labels) = meta.get("global-labels").and_then(meta_map) {
            config.global_labels = global_labels(labels);
        }
        config
    }

    pub fn prefix(&self, kind: CalloutKind) -> &Prefix {
        match kind {
            CalloutKind::Figure => &self.figure_prefix,
            CalloutKind::Table => &self.table_prefix,
        }
    }

    pub fn numbering(&self, kind: CalloutKind) -> bool {
        match kind {
            CalloutKind::Figure => self.number_figures,
            CalloutKind::Table => self.number_tables,
        }
    }

    /// Displayed form of an assigned number (`3` or `S3`)
    pub fn display_number(&self, number: u32) -> String {
        self.numbers.display(number)
    }

    /// Caption prefix such as `Figure 3.`, or `None` when numbering is off
    pub fn caption_prefix(&self, kind: CalloutKind, number: u32) -> Option<String> {
        self.numbering(kind).then(|| {
            format!(
                "{} {}.",
                self.prefix(kind).singular,
                self.display_number(number)
            )
        })
    }
}

fn meta_map(value: &Value) -> Option<&Map<String, Value>> {
    if tag(value)? != "MetaMap" {
        return None;
    }
    value.get("c")?.as_object()
}

/// Plain text of a scalar metadata value
pub fn meta_text(value: &Value) -> Option<String> {
    let content = value.get("c");
    match tag(value)? {
        "MetaString" => content?.as_str().map(str::to_string),
        "MetaInlines" => Some(plain_text(&inlines_from(content?)?)),
        "MetaBlocks" => {
            let text = content?
                .as_array()?
                .iter()
                .filter_map(block_inlines)
                .map(|inlines| plain_text(&inlines))
                .collect::<Vec<_>>()
                .join(" ");
            Some(text)
        }
        "MetaBool" => content?.as_bool().map(|b| b.to_string()),
        _ => None,
    }
}

pub fn meta_bool(value: &Value) -> Option<bool> {
    if tag(value)? == "MetaBool" {
        return value.get("c")?.as_bool();
    }
    match meta_text(value)?.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn meta_u32(value: &Value) -> Option<u32> {
    meta_text(value)?.trim().parse().ok()
}

/// `figPrefix: "Fig."` or `figPrefix: ["Fig.", "Figs."]`
fn meta_prefix(value: &Value) -> Option<Prefix> {
    if tag(value)? == "MetaList" {
        let items: Vec<String> = value
            .get("c")?
            .as_array()?
            .iter()
            .filter_map(meta_text)
            .filter(|s| !s.trim().is_empty())
            .collect();
        let singular = items.first()?;
        let plural = items.get(1).unwrap_or(singular);
        return Some(Prefix::new(singular, plural));
    }
    let text = meta_text(value)?;
    (!text.trim().is_empty()).then(|| Prefix::new(text.trim(), text.trim()))
}

/// `global-labels: {fig:x: {num: 3, file: part2}}`
fn global_labels(map: &Map<String, Value>) -> Vec<(String, LabelEntry)> {
    map.iter()
        .filter_map(|(label, entry)| {
            let entry = meta_map(entry)?;
            let number = entry.get("num").and_then(meta_u32)?;
            let source_file = entry
                .get("file")
                .and_then(meta_text)
                .filter(|f| !f.is_empty());
            Some((
                label.clone(),
                LabelEntry {
                    number,
                    source_file,
                },
            ))
        })
        .collect()
}
