//! Cross-file numbering for manuscripts split over several Markdown files.
//!
//! Each file is converted by its own pandoc run, so the filter never sees
//! the whole manuscript. A prescan over the sources gives every file the
//! number of figures and tables that come before it, and maps each label to
//! its number and output file. The filter reads offsets at the top level
//! of the metadata, so a report for one file's run is built with
//! [`PrescanReport::select`] before it is passed as `--metadata-file`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::callout::CalloutKind;
use crate::error::Result;
use crate::options::parse_options;

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct PrescanReport {
    #[serde(rename = "figure-offset", skip_serializing_if = "Option::is_none")]
    pub figure_offset: Option<u32>,
    #[serde(rename = "table-offset", skip_serializing_if = "Option::is_none")]
    pub table_offset: Option<u32>,
    pub files: Vec<FileOffsets>,
    #[serde(rename = "global-labels")]
    pub global_labels: BTreeMap<String, GlobalLabel>,
}

/// Counts of callouts in the files preceding `path`
#[derive(Debug, Serialize, PartialEq)]
pub struct FileOffsets {
    pub path: String,
    #[serde(rename = "figure-offset")]
    pub figure_offset: u32,
    #[serde(rename = "table-offset")]
    pub table_offset: u32,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct GlobalLabel {
    pub num: u32,
    /// Output file name without extension
    pub file: String,
}

impl PrescanReport {
    /// Scan one source and append it to the report.
    ///
    /// `figures` and `tables` are the running totals before this file and
    /// are advanced past it.
    fn scan_source(&mut self, path: &str, text: &str, file: &str, figures: &mut u32, tables: &mut u32) {
        self.files.push(FileOffsets {
            path: path.to_string(),
            figure_offset: *figures,
            table_offset: *tables,
        });
        for line in text.lines() {
            let Some(kind) = CalloutKind::detect(line) else {
                continue;
            };
            let counter = match kind {
                CalloutKind::Figure => &mut *figures,
                CalloutKind::Table => &mut *tables,
            };
            *counter += 1;
            if let Some(label) = parse_options(line, kind).label {
                let entry = GlobalLabel {
                    num: *counter,
                    file: file.to_string(),
                };
                if self.global_labels.insert(label.clone(), entry).is_some() {
                    log::warn!("Duplicate label '{label}' in {path}");
                }
            }
        }
    }

    /// Lift the offsets of `path` to the top level of the report.
    ///
    /// `path` matches a scanned file by full path, or by file name when it
    /// has no directory part. Returns false if nothing matched.
    pub fn select(&mut self, path: &Path) -> bool {
        let bare = path.parent().is_none_or(|p| p.as_os_str().is_empty());
        let found = self.files.iter().find(|f| {
            let scanned = Path::new(&f.path);
            scanned == path || (bare && scanned.file_name() == path.file_name())
        });
        match found {
            Some(f) => {
                self.figure_offset = Some(f.figure_offset);
                self.table_offset = Some(f.table_offset);
                true
            }
            None => false,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Scan `paths` in build order.
///
/// Unreadable files are reported and contribute no callouts.
pub fn prescan<P: AsRef<Path>>(paths: &[P], file_prefix: &str) -> PrescanReport {
    let mut report = PrescanReport::default();
    let (mut figures, mut tables) = (0, 0);
    for path in paths {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = fs::read_to_string(path).unwrap_or_else(|e| {
            log::warn!("Cannot read {}: {e}", path.display());
            String::new()
        });
        report.scan_source(
            &path.to_string_lossy(),
            &text,
            &format!("{file_prefix}{stem}"),
            &mut figures,
            &mut tables,
        );
    }
    report
}
