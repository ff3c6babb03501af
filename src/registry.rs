//! Per-build numbering state: figure and table counters plus the label map
//! consulted when cross-references are resolved.

use std::collections::{HashMap, HashSet};

use crate::callout::CalloutKind;

/// Where a label points
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelEntry {
    pub number: u32,
    /// Output file holding the labelled element, for multi-file builds
    pub source_file: Option<String>,
}

/// Counters and labels for a single document build.
///
/// Created once per build and threaded through the passes explicitly;
/// nothing here is global.
#[derive(Debug, Default)]
pub struct NumberingRegistry {
    figures: u32,
    tables: u32,
    labels: HashMap<String, LabelEntry>,
    registered: HashSet<String>,
}

impl NumberingRegistry {
    /// Counters start after the given offsets (0 for a standalone document)
    pub fn new(figure_offset: u32, table_offset: u32) -> Self {
        NumberingRegistry {
            figures: figure_offset,
            tables: table_offset,
            ..Default::default()
        }
    }

    /// Load labels known from other documents of the same build
    pub fn seed<I>(&mut self, labels: I)
    where
        I: IntoIterator<Item = (String, LabelEntry)>,
    {
        self.labels.extend(labels);
    }

    /// Next number for `kind`; figures and tables count independently
    pub fn assign_number(&mut self, kind: CalloutKind) -> u32 {
        let counter = match kind {
            CalloutKind::Figure => &mut self.figures,
            CalloutKind::Table => &mut self.tables,
        };
        *counter += 1;
        *counter
    }

    /// Record `label`; a later registration of the same label wins
    pub fn register_label(&mut self, label: &str, number: u32, source_file: Option<String>) {
        if !self.registered.insert(label.to_string()) {
            log::warn!("Duplicate label '{label}': now refers to number {number}");
        }
        self.labels.insert(
            label.to_string(),
            LabelEntry {
                number,
                source_file,
            },
        );
    }

    pub fn lookup(&self, label: &str) -> Option<&LabelEntry> {
        self.labels.get(label)
    }
}

/// Display formatting of assigned numbers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NumberStyle {
    /// Supporting Information numbering (`S1`, `S2`, ...)
    pub si: bool,
}

impl NumberStyle {
    pub fn display(self, number: u32) -> String {
        if self.si {
            format!("S{number}")
        } else {
            number.to_string()
        }
    }
}
