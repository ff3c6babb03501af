//! Resolution of `@fig:label` / `@tbl:label` references.
//!
//! Pandoc parses these as citations. Once every callout has been numbered,
//! citations whose ids all live in the `fig:` or `tbl:` namespace are
//! replaced by text such as "Figure 3", or by a link when the label was
//! defined in another file of a multi-file build.

use serde_json::Value;

use crate::ast::{Citation, Inline, empty_attr, has_tag, str_inlines};
use crate::callout::CalloutKind;
use crate::config::FilterConfig;
use crate::plugin::PandocPlugin;
use crate::registry::{LabelEntry, NumberingRegistry};

/// Longest narrative suffix ("1a") merged into a resolved reference
const MAX_SUFFIX_CHARS: usize = 2;

/// A citation id that names a figure or table
#[derive(Debug, PartialEq)]
struct Reference<'c> {
    kind: CalloutKind,
    /// Registry key, with the namespace in lower case
    key: String,
    raw: &'c str,
}

fn reference(citation: &Citation) -> Option<Reference<'_>> {
    let raw = citation.citation_id.as_str();
    let (namespace, name) = raw.split_once(':')?;
    let kind = CalloutKind::from_namespace(namespace)?;
    if name.is_empty() {
        return None;
    }
    Some(Reference {
        kind,
        key: format!("{}:{name}", kind.namespace()),
        raw,
    })
}

/// Text of a `Str` node short enough to be a narrative suffix
fn short_suffix(node: &Value) -> Option<String> {
    if !has_tag(node, "Str") {
        return None;
    }
    let text = node.get("c")?.as_str()?;
    let short = !text.is_empty()
        && text.chars().count() <= MAX_SUFFIX_CHARS
        && text.chars().all(char::is_alphanumeric);
    short.then(|| text.to_string())
}

pub struct CrossRefResolver<'a> {
    registry: &'a NumberingRegistry,
    config: &'a FilterConfig,
}

impl<'a> CrossRefResolver<'a> {
    pub fn new(registry: &'a NumberingRegistry, config: &'a FilterConfig) -> Self {
        CrossRefResolver { registry, config }
    }

    fn number_token(&self, reference: &Reference, entry: &LabelEntry, suffix: &str) -> Inline {
        let text = format!("{}{suffix}", self.config.display_number(entry.number));
        match &entry.source_file {
            Some(file) => Inline::Link(
                empty_attr(),
                vec![Inline::Str(text)],
                (format!("{file}.md#{}", reference.key), String::new()),
            ),
            None => Inline::Str(text),
        }
    }

    /// Replacement inlines for a citation made only of references
    fn resolve(
        &self,
        citations: &[Citation],
        references: &[Reference],
        suffix: Option<&str>,
    ) -> Vec<Inline> {
        let grouped =
            references.len() > 1 && references.iter().all(|r| r.kind == references[0].kind);
        let last = references.len().saturating_sub(1);
        let mut out = Vec::new();

        for (i, (citation, reference)) in citations.iter().zip(references).enumerate() {
            if i > 0 {
                let separator = if grouped { "," } else { ";" };
                out.push(Inline::Str(separator.to_string()));
                out.push(Inline::Space);
            }
            if !citation.citation_prefix.is_empty() {
                out.extend(citation.citation_prefix.iter().cloned());
                out.push(Inline::Space);
            }
            let tail = if i == last { suffix.unwrap_or_default() } else { "" };
            match self.registry.lookup(&reference.key) {
                Some(entry) => {
                    if !grouped || i == 0 {
                        let prefix = self.config.prefix(reference.kind);
                        let word = if grouped { &prefix.plural } else { &prefix.singular };
                        out.extend(str_inlines(word));
                        out.push(Inline::Space);
                    }
                    out.push(self.number_token(reference, entry, tail));
                }
                None => {
                    log::debug!("Unresolved reference '{}'", reference.raw);
                    out.push(Inline::Str(reference.raw.to_string()));
                    if !tail.is_empty() {
                        out.push(Inline::Str(tail.to_string()));
                    }
                }
            }
            out.extend(citation.citation_suffix.iter().cloned());
        }
        out
    }
}

impl PandocPlugin for CrossRefResolver<'_> {
    fn rewrite(&mut self, list: &mut Vec<Value>, index: usize) -> Option<usize> {
        let node = list.get(index)?;
        if !has_tag(node, "Cite") {
            return None;
        }
        let Ok(Inline::Cite(citations, _)) = serde_json::from_value::<Inline>(node.clone()) else {
            return None;
        };
        let references = citations
            .iter()
            .map(reference)
            .collect::<Option<Vec<_>>>()?;
        if references.is_empty() {
            return None;
        }
        let suffix = list.get(index + 1).and_then(short_suffix);
        let replacement = self.resolve(&citations, &references, suffix.as_deref());
        let end = index + 1 + usize::from(suffix.is_some());
        let count = replacement.len();
        list.splice(
            index..end,
            replacement.iter().map(|inline| serde_json::json!(inline)),
        );
        Some(count)
    }
}
