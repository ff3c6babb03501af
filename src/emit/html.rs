use serde_json::Value;

use super::table::{TableModel, matching_weights, set_caption, set_identifier, set_widths};
use super::{Emitter, Numbered, decimal};
use crate::ast::{Inline, MathType, QuoteType, raw_block};
use crate::options::{Align, Width, WrapSide};

/// `<figure>`/`<figcaption>` markup, for HTML output and for markdown
/// destined for publishing tools that keep raw HTML.
pub struct HtmlEmitter;

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Render inline content to HTML; images and notes are dropped
pub fn render_html(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_html(inlines, &mut out);
    out
}

fn wrap(tag: &str, inlines: &[Inline], out: &mut String) {
    out.push_str(&format!("<{tag}>"));
    push_html(inlines, out);
    out.push_str(&format!("</{tag}>"));
}

fn push_html(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Str(s) => out.push_str(&escape_html(s)),
            Inline::Space | Inline::SoftBreak => out.push(' '),
            Inline::LineBreak => out.push_str("<br />"),
            Inline::Emph(c) => wrap("em", c, out),
            Inline::Strong(c) => wrap("strong", c, out),
            Inline::Underline(c) => wrap("u", c, out),
            Inline::Strikeout(c) => wrap("del", c, out),
            Inline::Superscript(c) => wrap("sup", c, out),
            Inline::Subscript(c) => wrap("sub", c, out),
            Inline::SmallCaps(c) => {
                out.push_str(r#"<span class="smallcaps">"#);
                push_html(c, out);
                out.push_str("</span>");
            }
            Inline::Quoted(QuoteType::SingleQuote, c) => {
                out.push('\u{2018}');
                push_html(c, out);
                out.push('\u{2019}');
            }
            Inline::Quoted(QuoteType::DoubleQuote, c) => {
                out.push('\u{201C}');
                push_html(c, out);
                out.push('\u{201D}');
            }
            Inline::Code(_, s) => {
                out.push_str("<code>");
                out.push_str(&escape_html(s));
                out.push_str("</code>");
            }
            Inline::Math(MathType::InlineMath, s) => {
                out.push_str(&format!(r#"<span class="math inline">\({}\)</span>"#, escape_html(s)));
            }
            Inline::Math(MathType::DisplayMath, s) => {
                out.push_str(&format!(r#"<span class="math display">\[{}\]</span>"#, escape_html(s)));
            }
            Inline::RawInline(format, s) if format == "html" => out.push_str(s),
            Inline::Link(_, c, (url, _)) => {
                out.push_str(&format!(r#"<a href="{}">"#, escape_html(url)));
                push_html(c, out);
                out.push_str("</a>");
            }
            Inline::Cite(_, c) | Inline::Span(_, c) => push_html(c, out),
            Inline::RawInline(..) | Inline::Image(..) | Inline::Note(_) => {}
        }
    }
}

/// CSS width of a figure, if the option maps onto one
fn css_width(width: &Width) -> Option<String> {
    match width {
        Width::Percent(p) => Some(format!("{}%", decimal(*p))),
        Width::Full => Some("100%".to_string()),
        Width::Fraction(f) => Some(format!("{}%", decimal(f * 100.0))),
        Width::Dimension(d) if d.contains('\\') => None,
        Width::Dimension(d) => Some(d.clone()),
    }
}

fn figure_style(align: Align, wrap: Option<WrapSide>, width: Option<&Width>) -> String {
    let mut style = Vec::new();
    if let Some(width) = width.and_then(css_width) {
        style.push(format!("width: {width};"));
    }
    match wrap {
        Some(side) if side.is_left() => style.push("float: left; margin: 0 1em 1em 0;".to_string()),
        Some(_) => style.push("float: right; margin: 0 0 1em 1em;".to_string()),
        None => style.push(
            match align {
                Align::Left => "margin-left: 0; margin-right: auto;",
                Align::Right => "margin-left: auto; margin-right: 0;",
                _ => "margin-left: auto; margin-right: auto; text-align: center;",
            }
            .to_string(),
        ),
    }
    style.join(" ")
}

impl Emitter for HtmlEmitter {
    fn figure(&self, figure: &Numbered) -> Vec<Value> {
        let options = &figure.callout.options;
        let id = match figure.label() {
            "" => String::new(),
            label => format!(r#" id="{}""#, escape_html(label)),
        };
        let style = figure_style(options.align, options.wrap_side(), options.width.as_ref());
        let source = figure.callout.media_source.as_deref().unwrap_or_default();
        let html = format!(
            "<figure{id} style=\"{}\">\n\
             <img src=\"{}\" alt=\"{}\" style=\"width: 100%;\" />\n\
             <figcaption>{}</figcaption>\n\
             </figure>",
            escape_html(&style),
            escape_html(source),
            escape_html(&figure.caption_plain()),
            render_html(&figure.caption_rich()),
        );
        vec![raw_block("html", html)]
    }

    fn table(&self, table: &Numbered, block: &Value) -> Vec<Value> {
        let mut block = block.clone();
        set_caption(&mut block, &table.caption_rich());
        if let Some(label) = &table.callout.label {
            set_identifier(&mut block, label);
        }
        let columns = TableModel::from_block(&block).map_or(0, |m| m.columns());
        if let Some(weights) = matching_weights(table.callout.options.columns.as_deref(), columns) {
            set_widths(&mut block, weights);
        }
        vec![block]
    }
}
