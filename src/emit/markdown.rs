use serde_json::Value;

use super::table::set_caption;
use super::{Emitter, Numbered};
use crate::ast::{Inline, empty_attr, para, str_inlines};

/// Flattened markdown for digital-garden publishing.
///
/// Figures become bare `![alt](src)` references carrying the numbered
/// caption as alt text. No attributes are attached: publishing tools treat
/// attribute-bearing images as raw markup and lose track of the asset.
pub struct MarkdownEmitter {
    /// Also print the caption as a paragraph below the image
    pub visualize_captions: bool,
}

impl Emitter for MarkdownEmitter {
    fn figure(&self, figure: &Numbered) -> Vec<Value> {
        let source = figure
            .callout
            .media_source
            .clone()
            .unwrap_or_default();
        let image = Inline::Image(
            empty_attr(),
            str_inlines(&figure.caption_plain()),
            (source, String::new()),
        );
        let mut blocks = vec![para(&[image])];
        if self.visualize_captions {
            let caption = figure.caption_rich();
            if !caption.is_empty() {
                blocks.push(para(&caption));
            }
        }
        blocks
    }

    fn table(&self, table: &Numbered, block: &Value) -> Vec<Value> {
        let mut block = block.clone();
        set_caption(&mut block, &[]);
        let caption = table.caption_rich();
        if caption.is_empty() {
            return vec![block];
        }
        vec![para(&caption), block]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callout::CalloutKind;
    use crate::caption::plain_text;
    use crate::config::FilterConfig;
    use crate::emit::table::tests::three_column_table;
    use crate::emit::tests::sample;
    use crate::options::{CalloutOptions, Width};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_figure_is_plain_image_reference() {
        let options = CalloutOptions {
            width: Some(Width::Percent(50.0)),
            ..Default::default()
        };
        let callout = sample(CalloutKind::Figure, Some("fig:results"), options);
        let config = FilterConfig::default();
        let emitter = MarkdownEmitter {
            visualize_captions: false,
        };
        let blocks = emitter.figure(&Numbered {
            callout: &callout,
            number: 3,
            config: &config,
        });
        assert_eq!(blocks.len(), 1);
        let image = &blocks[0]["c"][0];
        assert_eq!(image["t"], json!("Image"));
        // no identifier, classes or key-value attributes
        assert_eq!(image["c"][0], json!(["", [], []]));
        assert_eq!(image["c"][2], json!(["img/results.png", ""]));
        let alt = crate::ast::inlines_from(&image["c"][1]).unwrap();
        assert_eq!(plain_text(&alt), "Figure 3. Results. See text.");
    }

    #[test]
    fn test_visualized_caption() {
        let callout = sample(CalloutKind::Figure, None, CalloutOptions::default());
        let config = FilterConfig::default();
        let emitter = MarkdownEmitter {
            visualize_captions: true,
        };
        let blocks = emitter.figure(&Numbered {
            callout: &callout,
            number: 1,
            config: &config,
        });
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1]["t"], json!("Para"));
        assert_eq!(blocks[1]["c"][0]["t"], json!("Strong"));
    }

    #[test]
    fn test_table_caption_paragraph() {
        let callout = sample(CalloutKind::Table, Some("tbl:data"), CalloutOptions::default());
        let config = FilterConfig::default();
        let emitter = MarkdownEmitter {
            visualize_captions: false,
        };
        let blocks = emitter.table(
            &Numbered {
                callout: &callout,
                number: 1,
                config: &config,
            },
            &three_column_table(),
        );
        assert_eq!(blocks.len(), 2);
        let caption = crate::ast::block_inlines(&blocks[0]).unwrap();
        assert_eq!(plain_text(&caption), "Table 1. Results. See text.");
        assert_eq!(blocks[1], three_column_table());
    }
}
