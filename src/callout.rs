//! Recognition of figure and table callouts.
//!
//! A callout is a block quote whose first line carries `[!figure]` or
//! `[!table]` followed by options:
//!
//! ```text
//! > [!figure] #fig:results width=80%
//! > ![](img/results.png)
//! > **Results.** See text.
//! ```
//!
//! Anything that does not fit the expected shape is left alone.

use serde_json::Value;

use crate::ast::{Inline, block_inlines, figure_body, has_tag, trim_spaces};
use crate::caption::plain_text;
use crate::options::{CalloutOptions, parse_options};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CalloutKind {
    Figure,
    Table,
}

impl CalloutKind {
    pub fn marker(self) -> &'static str {
        match self {
            CalloutKind::Figure => "[!figure]",
            CalloutKind::Table => "[!table]",
        }
    }

    /// Kind named by the marker in a header line
    pub fn detect(header: &str) -> Option<Self> {
        let header = header.to_lowercase();
        [CalloutKind::Figure, CalloutKind::Table]
            .into_iter()
            .filter_map(|kind| header.find(kind.marker()).map(|at| (at, kind)))
            .min_by_key(|(at, _)| *at)
            .map(|(_, kind)| kind)
    }

    /// Label namespace, e.g. `fig` in `fig:results`
    pub fn namespace(self) -> &'static str {
        match self {
            CalloutKind::Figure => "fig",
            CalloutKind::Table => "tbl",
        }
    }

    pub fn from_namespace(namespace: &str) -> Option<Self> {
        match namespace.to_ascii_lowercase().as_str() {
            "fig" => Some(CalloutKind::Figure),
            "tbl" => Some(CalloutKind::Table),
            _ => None,
        }
    }
}

/// A recognised callout with its options and caption
#[derive(Clone, Debug, PartialEq)]
pub struct CalloutBlock {
    pub kind: CalloutKind,
    pub raw_header_text: String,
    pub label: Option<String>,
    pub options: CalloutOptions,
    /// Image path, figures only
    pub media_source: Option<String>,
    pub caption_rich: Vec<Inline>,
    pub caption_plain: String,
}

/// Result of recognising a callout at some position of a block list
#[derive(Clone, Debug, PartialEq)]
pub struct Recognized {
    pub callout: CalloutBlock,
    /// The pandoc `Table` block a table callout describes
    pub table: Option<Value>,
    /// Number of blocks the callout occupies (2 when the table follows the quote)
    pub span: usize,
}

/// Inline content of the quote after the header line, one entry per block
struct Body {
    segments: Vec<Vec<Inline>>,
    table: Option<Value>,
}

fn collect_body(rest: Vec<Inline>, blocks: &[Value]) -> Body {
    let mut body = Body {
        segments: vec![rest],
        table: None,
    };
    for block in blocks {
        if let Some(inlines) = block_inlines(block) {
            body.segments.push(inlines);
        } else if let Some(inner) = figure_body(block) {
            body.segments
                .extend(inner.iter().filter_map(block_inlines));
        } else if has_tag(block, "Table") && body.table.is_none() {
            body.table = Some(block.clone());
        }
    }
    body
}

/// Join segments with implied spaces
fn join_segments(segments: Vec<Vec<Inline>>) -> Vec<Inline> {
    let mut joined: Vec<Inline> = Vec::new();
    for segment in segments {
        let segment = trim_spaces(segment);
        if segment.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push(Inline::Space);
        }
        joined.extend(segment);
    }
    joined
}

/// Recognise a callout starting at `blocks[index]`
pub fn recognize(blocks: &[Value], index: usize) -> Option<Recognized> {
    let quote = blocks.get(index)?;
    if !has_tag(quote, "BlockQuote") {
        return None;
    }
    let inner = quote.get("c")?.as_array()?;
    let mut first = block_inlines(inner.first()?)?;

    let header_end = first.iter().position(Inline::is_break).unwrap_or(first.len());
    let rest = first.split_off(header_end);
    let raw_header_text = plain_text(&first);
    let kind = CalloutKind::detect(&raw_header_text)?;
    let options = parse_options(&raw_header_text, kind);
    let body = collect_body(rest, &inner[1..]);

    let (media_source, caption, table, span) = match kind {
        CalloutKind::Figure => {
            let stream = join_segments(body.segments);
            let Some(at) = stream.iter().position(|i| matches!(i, Inline::Image(..))) else {
                log::debug!("Figure callout without an image left as quote: {raw_header_text}");
                return None;
            };
            let Inline::Image(_, alt, (src, _)) = &stream[at] else {
                return None;
            };
            let mut caption = trim_spaces(stream[at + 1..].to_vec());
            if caption.is_empty() {
                caption = trim_spaces(alt.clone());
            }
            (Some(src.clone()), caption, None, 1)
        }
        CalloutKind::Table => {
            let caption = join_segments(body.segments);
            match body.table {
                Some(table) => (None, caption, Some(table), 1),
                None => match blocks.get(index + 1) {
                    Some(next) if has_tag(next, "Table") => (None, caption, Some(next.clone()), 2),
                    _ => {
                        log::debug!("Table callout not followed by a table: {raw_header_text}");
                        return None;
                    }
                },
            }
        }
    };

    let caption_plain = plain_text(&caption);
    Some(Recognized {
        callout: CalloutBlock {
            kind,
            label: options.label.clone(),
            raw_header_text,
            options,
            media_source,
            caption_rich: caption,
            caption_plain,
        },
        table,
        span,
    })
}
