//! Target emitters: turn a numbered callout into blocks for one output family.

mod docx;
mod html;
mod latex;
mod markdown;
pub mod table;

use serde_json::Value;

use crate::ast::Inline;
use crate::callout::CalloutBlock;
use crate::caption::{numbered_plain, numbered_rich};
use crate::config::{FilterConfig, Target};

pub use docx::DocxEmitter;
pub use html::{HtmlEmitter, render_html};
pub use latex::LatexEmitter;
pub use markdown::MarkdownEmitter;

/// A callout together with the number the registry assigned to it.
///
/// The displayed prefix is computed on demand from the configuration, so
/// switching SI numbering on or off never touches stored state.
pub struct Numbered<'a> {
    pub callout: &'a CalloutBlock,
    pub number: u32,
    pub config: &'a FilterConfig,
}

impl Numbered<'_> {
    /// `Figure 3.` style prefix, `None` when numbering is disabled
    pub fn prefix(&self) -> Option<String> {
        self.config.caption_prefix(self.callout.kind, self.number)
    }

    pub fn caption_rich(&self) -> Vec<Inline> {
        numbered_rich(
            &self.callout.caption_rich,
            self.prefix().as_deref(),
            self.callout.kind,
        )
    }

    pub fn caption_plain(&self) -> String {
        numbered_plain(
            &self.callout.caption_rich,
            self.prefix().as_deref(),
            self.callout.kind,
        )
    }

    pub fn label(&self) -> &str {
        self.callout.label.as_deref().unwrap_or_default()
    }
}

pub trait Emitter {
    /// Blocks replacing a figure callout
    fn figure(&self, figure: &Numbered) -> Vec<Value>;

    /// Blocks replacing a table callout and the pandoc `Table` it describes
    fn table(&self, table: &Numbered, block: &Value) -> Vec<Value>;
}

/// Emitter for the output family `target`
pub fn emitter_for(target: Target, config: &FilterConfig) -> Box<dyn Emitter> {
    match target {
        Target::Latex => Box::new(LatexEmitter),
        Target::Html => Box::new(HtmlEmitter),
        Target::Docx => Box::new(DocxEmitter {
            native_figures: config.native_figures,
        }),
        Target::Markdown => Box::new(MarkdownEmitter {
            visualize_captions: config.visualize_captions,
        }),
    }
}

/// Trim a number to at most four decimals, without trailing zeros
pub(crate) fn decimal(value: f64) -> String {
    let text = format!("{value:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callout::CalloutKind;
    use crate::options::CalloutOptions;

    pub(crate) fn sample(kind: CalloutKind, label: Option<&str>, options: CalloutOptions) -> CalloutBlock {
        let caption_rich = vec![
            Inline::Strong(vec![Inline::Str("Results.".into())]),
            Inline::Space,
            Inline::Str("See".into()),
            Inline::Space,
            Inline::Str("text.".into()),
        ];
        CalloutBlock {
            kind,
            raw_header_text: String::new(),
            label: label.map(str::to_string),
            options,
            media_source: (kind == CalloutKind::Figure).then(|| "img/results.png".to_string()),
            caption_plain: "Results. See text.".to_string(),
            caption_rich,
        }
    }

    #[test]
    fn test_decimal() {
        assert_eq!(decimal(0.8), "0.8");
        assert_eq!(decimal(0.25), "0.25");
        assert_eq!(decimal(1.0), "1");
        assert_eq!(decimal(1.0 / 3.0), "0.3333");
    }

    #[test]
    fn test_prefix_follows_config() {
        let callout = sample(CalloutKind::Figure, None, CalloutOptions::default());
        let mut config = FilterConfig::default();
        let numbered = Numbered {
            callout: &callout,
            number: 2,
            config: &config,
        };
        assert_eq!(numbered.caption_plain(), "Figure 2. Results. See text.");

        config.numbers.si = true;
        let numbered = Numbered {
            callout: &callout,
            number: 2,
            config: &config,
        };
        assert_eq!(numbered.caption_plain(), "Figure S2. Results. See text.");
    }
}
