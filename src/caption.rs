//! Caption views: plain text, and numbered captions with any author-typed
//! number prefix removed.

use lazy_static::lazy_static;
use regex::Regex;

use crate::ast::{Inline, MathType, QuoteType, str_inlines};
use crate::callout::CalloutKind;

lazy_static! {
    static ref FIGURE_KEYWORD: Regex = Regex::new(r"(?i)^(?:figure|figs?\.?)$").unwrap();
    static ref TABLE_KEYWORD: Regex = Regex::new(r"(?i)^(?:table|tab\.?|tbl\.?)$").unwrap();
    static ref FIGURE_GLUED: Regex =
        Regex::new(r"(?i)^(?:figure|fig\.?)S?\d+[a-z]?[.:]?$").unwrap();
    static ref TABLE_GLUED: Regex =
        Regex::new(r"(?i)^(?:table|tab\.?|tbl\.?)S?\d+[a-z]?[.:]?$").unwrap();
    static ref NUMBER: Regex = Regex::new(r"(?i)^S?\d+[a-z]?[.:]?$").unwrap();
    static ref PUNCTUATION: Regex = Regex::new(r"^[.:]$").unwrap();
}

/// How far into a caption an author-typed prefix is looked for
const MAX_PREFIX_LEAVES: usize = 8;

/// Flatten inline content to plain text.
///
/// Formatting reduces to its text, math keeps its `$` delimiters, links and
/// citations keep their display text, images and notes are dropped.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_plain(inlines, &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_plain(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Str(s) => out.push_str(s),
            Inline::Space | Inline::SoftBreak | Inline::LineBreak => out.push(' '),
            Inline::Emph(c)
            | Inline::Underline(c)
            | Inline::Strong(c)
            | Inline::Strikeout(c)
            | Inline::Superscript(c)
            | Inline::Subscript(c)
            | Inline::SmallCaps(c)
            | Inline::Span(_, c)
            | Inline::Link(_, c, _)
            | Inline::Cite(_, c) => push_plain(c, out),
            Inline::Quoted(quote, c) => {
                let mark = match quote {
                    QuoteType::SingleQuote => '\'',
                    QuoteType::DoubleQuote => '"',
                };
                out.push(mark);
                push_plain(c, out);
                out.push(mark);
            }
            Inline::Code(_, s) => out.push_str(s),
            Inline::Math(MathType::InlineMath, s) => {
                out.push('$');
                out.push_str(s);
                out.push('$');
            }
            Inline::Math(MathType::DisplayMath, s) => {
                out.push_str("$$");
                out.push_str(s);
                out.push_str("$$");
            }
            Inline::RawInline(..) | Inline::Image(..) | Inline::Note(_) => {}
        }
    }
}

/// Leading token of a caption, as seen by the prefix stripper
#[derive(Debug)]
enum Leaf<'a> {
    Word(&'a str),
    Space,
    Other,
}

fn wrapped(inline: &Inline) -> Option<&Vec<Inline>> {
    match inline {
        Inline::Strong(c) | Inline::Emph(c) | Inline::Underline(c) | Inline::Span(_, c) => Some(c),
        _ => None,
    }
}

fn wrapped_mut(inline: &mut Inline) -> Option<&mut Vec<Inline>> {
    match inline {
        Inline::Strong(c) | Inline::Emph(c) | Inline::Underline(c) | Inline::Span(_, c) => Some(c),
        _ => None,
    }
}

fn collect_leaves<'a>(inlines: &'a [Inline], leaves: &mut Vec<Leaf<'a>>) {
    for inline in inlines {
        if leaves.len() >= MAX_PREFIX_LEAVES {
            return;
        }
        match inline {
            Inline::Str(s) => leaves.push(Leaf::Word(s)),
            i if i.is_space() => leaves.push(Leaf::Space),
            i => match wrapped(i) {
                Some(children) => collect_leaves(children, leaves),
                None => leaves.push(Leaf::Other),
            },
        }
    }
}

#[derive(Clone, Copy)]
enum Expect {
    Keyword,
    Number,
}

/// Number of leading leaves forming an author-typed prefix, if there is one
fn prefix_length(leaves: &[Leaf], kind: CalloutKind) -> Option<usize> {
    let (keyword, glued) = match kind {
        CalloutKind::Figure => (&*FIGURE_KEYWORD, &*FIGURE_GLUED),
        CalloutKind::Table => (&*TABLE_KEYWORD, &*TABLE_GLUED),
    };
    let mut state = Expect::Keyword;
    let mut end = None;
    for (i, leaf) in leaves.iter().enumerate() {
        match (state, leaf) {
            (_, Leaf::Space) => continue,
            (Expect::Keyword, Leaf::Word(w)) if glued.is_match(w) => {
                end = Some(i + 1);
                break;
            }
            (Expect::Keyword, Leaf::Word(w)) if keyword.is_match(w) => state = Expect::Number,
            (Expect::Number, Leaf::Word(w)) if NUMBER.is_match(w) => {
                end = Some(i + 1);
                break;
            }
            _ => return None,
        }
    }
    let mut end = end?;
    let mut next = end;
    while matches!(leaves.get(next), Some(Leaf::Space)) {
        next += 1;
    }
    if let Some(Leaf::Word(w)) = leaves.get(next) {
        if PUNCTUATION.is_match(w) {
            end = next + 1;
        }
    }
    while matches!(leaves.get(end), Some(Leaf::Space)) {
        end += 1;
    }
    Some(end)
}

/// Remove `count` leaves from the front, deleting wrappers left empty
fn drop_leaves(inlines: &mut Vec<Inline>, count: &mut usize) {
    while *count > 0 && !inlines.is_empty() {
        if let Some(children) = wrapped_mut(&mut inlines[0]) {
            drop_leaves(children, count);
            if children.is_empty() {
                inlines.remove(0);
            } else {
                return;
            }
        } else {
            inlines.remove(0);
            *count -= 1;
        }
    }
}

/// Strip a leading "Figure N." style prefix typed by the author.
///
/// Returns whether anything was removed. The prefix may be split across
/// formatting nodes, e.g. `**Figure** 1.` or `**Fig. 1:** text`.
pub fn strip_number_prefix(inlines: &mut Vec<Inline>, kind: CalloutKind) -> bool {
    let mut leaves = Vec::new();
    collect_leaves(inlines, &mut leaves);
    let Some(mut count) = prefix_length(&leaves, kind) else {
        return false;
    };
    drop_leaves(inlines, &mut count);
    true
}

/// Caption with `prefix` in bold in front of it, author prefix removed
pub fn numbered_rich(caption: &[Inline], prefix: Option<&str>, kind: CalloutKind) -> Vec<Inline> {
    let Some(prefix) = prefix else {
        return caption.to_vec();
    };
    let mut body = caption.to_vec();
    strip_number_prefix(&mut body, kind);
    let mut inlines = vec![Inline::Strong(str_inlines(prefix))];
    if !body.is_empty() {
        inlines.push(Inline::Space);
        inlines.extend(body);
    }
    inlines
}

/// Plain-text form of [`numbered_rich`]
pub fn numbered_plain(caption: &[Inline], prefix: Option<&str>, kind: CalloutKind) -> String {
    plain_text(&numbered_rich(caption, prefix, kind))
}
