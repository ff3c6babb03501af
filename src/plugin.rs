use std::collections::VecDeque;
use std::path::Path;

use serde_json::Value;

use crate::callout::{CalloutKind, recognize};
use crate::config::FilterConfig;
use crate::emit::{Emitter, Numbered};
use crate::registry::NumberingRegistry;

pub trait PandocPlugin {
    /// Called on each position of each array in the AST, in document order.
    ///
    /// Returns the number of nodes now starting at `index` that the walk
    /// should step over, or `None` to leave the node and descend into it.
    fn rewrite(&mut self, list: &mut Vec<Value>, index: usize) -> Option<usize>;

    fn process_list(&mut self, list: &mut Vec<Value>) {
        let mut index = 0;
        while index < list.len() {
            match self.rewrite(list, index) {
                Some(step) => index += step.max(1),
                None => {
                    self.process_doc(&mut list[index]);
                    index += 1;
                }
            }
        }
    }

    /// Walk the AST below `value`, offering every node to `rewrite`
    fn process_doc(&mut self, value: &mut Value) {
        if let Some(array) = value.as_array_mut() {
            self.process_list(array);
        } else if let Some(object) = value.as_object_mut() {
            for value in object.values_mut() {
                self.process_doc(value);
            }
        }
    }
}

/// Mutable source path of an `Image` inline
pub fn image_source(node: &mut Value) -> Option<&mut String> {
    if node.get("t")?.as_str()? != "Image" {
        return None;
    }
    match node.pointer_mut("/c/2/0")? {
        Value::String(source) => Some(source),
        _ => None,
    }
}

/// Paths pandoc resolves against the working directory, not URLs
pub fn is_local(source: &str) -> bool {
    !source.contains("://") && !source.starts_with("data:")
}

/// Points local PDF figures at the raster copies exported for the
/// publishing target. Other images are published as they are.
pub struct ExtensionPass {
    extension: &'static str,
}

impl ExtensionPass {
    pub fn new(extension: &'static str) -> Self {
        ExtensionPass { extension }
    }
}

impl PandocPlugin for ExtensionPass {
    fn rewrite(&mut self, list: &mut Vec<Value>, index: usize) -> Option<usize> {
        let source = image_source(&mut list[index])?;
        let path = Path::new(source.as_str());
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && is_local(source) {
            *source = path.with_extension(self.extension).to_string_lossy().into_owned();
        }
        Some(1)
    }
}

/// First pass over the document: number every callout and record its label.
///
/// The document is left untouched; the numbers are kept in order for the
/// emission pass, which meets the same callouts in the same order.
pub struct NumberingPass<'a> {
    registry: &'a mut NumberingRegistry,
    assigned: VecDeque<(CalloutKind, u32)>,
}

impl<'a> NumberingPass<'a> {
    pub fn new(registry: &'a mut NumberingRegistry) -> Self {
        NumberingPass {
            registry,
            assigned: VecDeque::new(),
        }
    }

    pub fn into_assigned(self) -> VecDeque<(CalloutKind, u32)> {
        self.assigned
    }
}

impl PandocPlugin for NumberingPass<'_> {
    fn rewrite(&mut self, list: &mut Vec<Value>, index: usize) -> Option<usize> {
        let recognized = recognize(list, index)?;
        let callout = recognized.callout;
        let number = self.registry.assign_number(callout.kind);
        if let Some(label) = &callout.label {
            self.registry.register_label(label, number, None);
        }
        log::debug!(
            "{:?} {number} ({})",
            callout.kind,
            callout.label.as_deref().unwrap_or("unlabelled")
        );
        self.assigned.push_back((callout.kind, number));
        Some(recognized.span)
    }
}

/// Last pass: replace each callout with the target's rendering
pub struct EmissionPass<'a> {
    config: &'a FilterConfig,
    emitter: &'a dyn Emitter,
    assigned: VecDeque<(CalloutKind, u32)>,
}

impl<'a> EmissionPass<'a> {
    pub fn new(
        config: &'a FilterConfig,
        emitter: &'a dyn Emitter,
        assigned: VecDeque<(CalloutKind, u32)>,
    ) -> Self {
        EmissionPass {
            config,
            emitter,
            assigned,
        }
    }
}

impl PandocPlugin for EmissionPass<'_> {
    fn rewrite(&mut self, list: &mut Vec<Value>, index: usize) -> Option<usize> {
        let recognized = recognize(list, index)?;
        let callout = &recognized.callout;
        let number = match self.assigned.pop_front() {
            Some((kind, number)) if kind == callout.kind => number,
            _ => {
                log::warn!(
                    "Callout '{}' was not numbered; left unchanged",
                    callout.raw_header_text
                );
                return Some(recognized.span);
            }
        };
        let numbered = Numbered {
            callout,
            number,
            config: self.config,
        };
        let blocks = match &recognized.table {
            Some(table) => self.emitter.table(&numbered, table),
            None => self.emitter.figure(&numbered),
        };
        let count = blocks.len();
        list.splice(index..index + recognized.span, blocks);
        Some(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::MarkdownEmitter;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn image(src: &str) -> Value {
        json!({"t": "Image", "c": [["", [], []], [], [src, ""]]})
    }

    fn figure_callout(header: &str, src: &str) -> Value {
        json!({"t": "BlockQuote", "c": [{"t": "Para", "c": [
            {"t": "Str", "c": header},
            {"t": "SoftBreak"},
            image(src),
            {"t": "Space"},
            {"t": "Str", "c": "Caption."}
        ]}]})
    }

    fn sources(doc: &Value) -> Vec<&str> {
        doc[0]["c"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["c"][2][0].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_extension_pass() {
        let mut doc = json!([{"t": "Para", "c": [
            image("img/a.pdf"),
            image("img/B.PDF"),
            image("https://example.org/b.pdf"),
            image("img/c.webp"),
            image("img/noext"),
        ]}]);
        ExtensionPass::new("webp").process_doc(&mut doc);
        assert_eq!(
            sources(&doc),
            vec![
                "img/a.webp",
                "img/B.webp",
                "https://example.org/b.pdf",
                "img/c.webp",
                "img/noext"
            ]
        );
    }

    #[test]
    fn test_extension_pass_leaves_raster_and_vector_images() {
        let mut doc = json!([{"t": "Para", "c": [
            image("figures/photo.jpg"),
            image("figures/plot.pdf"),
            image("figures/diagram.svg"),
        ]}]);
        ExtensionPass::new("png").process_doc(&mut doc);
        assert_eq!(
            sources(&doc),
            vec!["figures/photo.jpg", "figures/plot.png", "figures/diagram.svg"]
        );
    }

    #[test]
    fn test_numbering_walks_nested_blocks() {
        let mut blocks = json!([
            figure_callout("[!figure] #fig:a", "a.png"),
            {"t": "Div", "c": [["", [], []], [figure_callout("[!figure] #fig:b", "b.png")]]},
        ]);
        let before = blocks.clone();
        let mut registry = NumberingRegistry::default();
        let mut pass = NumberingPass::new(&mut registry);
        pass.process_doc(&mut blocks);
        let assigned = pass.into_assigned();
        assert_eq!(
            assigned,
            VecDeque::from([(CalloutKind::Figure, 1), (CalloutKind::Figure, 2)])
        );
        assert_eq!(registry.lookup("fig:b").map(|e| e.number), Some(2));
        assert_eq!(blocks, before);
    }

    #[test]
    fn test_emission_replaces_callouts() {
        let mut blocks = json!([
            figure_callout("[!figure] #fig:a", "a.png"),
            {"t": "Para", "c": [{"t": "Str", "c": "Text"}]},
            figure_callout("[!figure]", "b.png"),
        ]);
        let config = FilterConfig::default();
        let emitter = MarkdownEmitter {
            visualize_captions: false,
        };
        let assigned = VecDeque::from([(CalloutKind::Figure, 4), (CalloutKind::Figure, 5)]);
        EmissionPass::new(&config, &emitter, assigned).process_doc(&mut blocks);
        assert_eq!(blocks[0]["c"][0]["t"], json!("Image"));
        assert_eq!(blocks[0]["c"][0]["c"][1][2], json!({"t": "Str", "c": "4."}));
        assert_eq!(blocks[1], json!({"t": "Para", "c": [{"t": "Str", "c": "Text"}]}));
        assert_eq!(blocks[2]["c"][0]["c"][1][2], json!({"t": "Str", "c": "5."}));
    }

    #[test]
    fn test_emission_without_number_keeps_callout() {
        let mut blocks = json!([figure_callout("[!figure]", "a.png")]);
        let before = blocks.clone();
        let config = FilterConfig::default();
        let emitter = MarkdownEmitter {
            visualize_captions: false,
        };
        EmissionPass::new(&config, &emitter, VecDeque::new()).process_doc(&mut blocks);
        assert_eq!(blocks, before);
    }
}
