//! A pandoc filter for Obsidian-style figure and table callouts.
//!
//! Callouts are numbered in document order, `@fig:label` / `@tbl:label`
//! citations are resolved against those numbers, and each callout is then
//! rewritten into the native construct of the output format.

pub mod ast;
pub mod callout;
pub mod caption;
pub mod config;
pub mod convert;
pub mod crossref;
pub mod emit;
pub mod error;
pub mod options;
pub mod plugin;
pub mod prescan;
pub mod registry;

use std::io::{Read, Write};
use std::path::Path;

use serde_json::Value;

use crate::config::{FilterConfig, Target};
use crate::convert::PdfToPngPass;
use crate::crossref::CrossRefResolver;
use crate::emit::emitter_for;
use crate::error::{FilterError, Result};
use crate::plugin::{EmissionPass, ExtensionPass, NumberingPass, PandocPlugin};
use crate::registry::NumberingRegistry;

/// Environment variable naming the directory for converted images
pub const TMPDIR_VAR: &str = "MANUSCRIPT_PANDOC_TMPDIR";

/// Run the filter over a pandoc JSON document in place.
///
/// `format` is the output format pandoc passes to filters. Converted images
/// are written to `tmpdir`, or the system temporary directory.
pub fn filter_document(doc: &mut Value, format: Option<&str>, tmpdir: Option<&Path>) -> Result<()> {
    if !doc.is_object() {
        return Err(FilterError::MalformedDocument("expected a JSON object".to_string()));
    }
    let config = FilterConfig::from_document(doc);
    let target = Target::select(format, config.caption_style);
    log::debug!("Output format {format:?} handled as {target:?}");

    let Some(blocks) = doc.get_mut("blocks").filter(|b| b.is_array()) else {
        return Err(FilterError::MalformedDocument("missing 'blocks' array".to_string()));
    };

    match (target, config.figure_format.extension()) {
        (Target::Docx, _) => PdfToPngPass::new(tmpdir.map(Path::to_path_buf)).process_doc(blocks),
        (Target::Markdown | Target::Html, Some(extension)) => {
            ExtensionPass::new(extension).process_doc(blocks)
        }
        _ => {}
    }

    let mut registry = NumberingRegistry::new(config.figure_offset, config.table_offset);
    registry.seed(config.global_labels.iter().cloned());
    let mut numbering = NumberingPass::new(&mut registry);
    numbering.process_doc(blocks);
    let assigned = numbering.into_assigned();

    CrossRefResolver::new(&registry, &config).process_doc(blocks);

    let emitter = emitter_for(target, &config);
    EmissionPass::new(&config, emitter.as_ref(), assigned).process_doc(blocks);
    Ok(())
}

/// Read a document from `input`, filter it and write it to `output`
pub fn run_filter<R: Read, W: Write>(
    input: R,
    output: W,
    format: Option<&str>,
    tmpdir: Option<&Path>,
) -> Result<()> {
    let mut doc: Value = serde_json::from_reader(input)?;
    filter_document(&mut doc, format, tmpdir)?;
    serde_json::to_writer(output, &doc)?;
    Ok(())
}
