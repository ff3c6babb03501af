use serde_json::{Value, json};

use super::table::{TableModel, matching_weights, set_caption, set_identifier, set_widths};
use super::{Emitter, Numbered, decimal};
use crate::ast::{Attr, Inline, inlines_value, para, plain, str_inlines};
use crate::options::Width;

/// Native pandoc figures and tables, which the DOCX writer turns into
/// captioned Word objects. Raw markup would be dropped by that writer.
pub struct DocxEmitter {
    /// Emit pandoc's `Figure` block rather than a `fig:`-titled image
    pub native_figures: bool,
}

/// Image width attribute understood by the DOCX writer
fn width_attr(width: &Width) -> Option<String> {
    match width {
        Width::Percent(p) => Some(format!("{}%", decimal(*p))),
        Width::Full => Some("100%".to_string()),
        Width::Fraction(f) => Some(format!("{}%", decimal(f * 100.0))),
        Width::Dimension(d) if d.contains('\\') => None,
        Width::Dimension(d) => Some(d.clone()),
    }
}

impl Emitter for DocxEmitter {
    fn figure(&self, figure: &Numbered) -> Vec<Value> {
        let callout = &figure.callout;
        let source = callout.media_source.clone().unwrap_or_default();
        let attributes: Vec<(String, String)> = callout
            .options
            .width
            .as_ref()
            .and_then(width_attr)
            .map(|w| vec![("width".to_string(), w)])
            .unwrap_or_default();
        let caption = figure.caption_rich();
        let label = figure.label().to_string();

        if self.native_figures {
            let image_attr: Attr = (String::new(), Vec::new(), attributes);
            let image = Inline::Image(
                image_attr,
                str_inlines(&figure.caption_plain()),
                (source, String::new()),
            );
            let body = [plain(&[image])];
            let caption_blocks = if caption.is_empty() {
                json!([])
            } else {
                json!([{ "t": "Plain", "c": inlines_value(&caption) }])
            };
            vec![json!({
                "t": "Figure",
                "c": [[label, [], []], [null, caption_blocks], body]
            })]
        } else {
            let image_attr: Attr = (label, Vec::new(), attributes);
            let image = Inline::Image(image_attr, caption, (source, "fig:".to_string()));
            vec![para(&[image])]
        }
    }

    fn table(&self, table: &Numbered, block: &Value) -> Vec<Value> {
        let mut block = block.clone();
        set_caption(&mut block, &table.caption_rich());
        if let Some(label) = &table.callout.label {
            set_identifier(&mut block, label);
        }
        let options = &table.callout.options;
        let columns = TableModel::from_block(&block).map_or(0, |m| m.columns());
        if let Some(weights) = matching_weights(options.columns.as_deref(), columns) {
            let scale = options
                .width
                .as_ref()
                .and_then(Width::as_fraction)
                .unwrap_or(1.0);
            let widths: Vec<f64> = weights.iter().map(|w| w * scale).collect();
            set_widths(&mut block, &widths);
        }
        vec![block]
    }
}
