//! Structure of pandoc `Table` blocks, as needed by the emitters.
//!
//! `[attr, caption, colspecs, head, bodies, foot]`, with rows as
//! `[attr, cells]` and cells as `[attr, align, rowspan, colspan, blocks]`.

use serde_json::{Value, json};

use super::decimal;
use crate::ast::{Inline, block_inlines, inlines_value, tag};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColAlign {
    Left,
    Center,
    Right,
    Default,
}

impl ColAlign {
    fn from_value(value: &Value) -> Self {
        match tag(value) {
            Some("AlignLeft") => ColAlign::Left,
            Some("AlignCenter") => ColAlign::Center,
            Some("AlignRight") => ColAlign::Right,
            _ => ColAlign::Default,
        }
    }

    pub fn letter(self) -> char {
        match self {
            ColAlign::Center => 'c',
            ColAlign::Right => 'r',
            ColAlign::Left | ColAlign::Default => 'l',
        }
    }

    fn ragged(self) -> &'static str {
        match self {
            ColAlign::Center => "\\centering",
            ColAlign::Right => "\\raggedleft",
            ColAlign::Left | ColAlign::Default => "\\raggedright",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub content: Vec<Inline>,
    pub row_span: usize,
    pub col_span: usize,
}

pub type Row = Vec<Cell>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableModel {
    pub aligns: Vec<ColAlign>,
    pub head: Vec<Row>,
    pub body: Vec<Row>,
    pub foot: Vec<Row>,
}

fn cell_from(value: &Value) -> Option<Cell> {
    let parts = value.as_array()?;
    let span = |i: usize| parts.get(i).and_then(Value::as_u64).unwrap_or(1).max(1) as usize;
    let mut content: Vec<Inline> = Vec::new();
    for inlines in parts.get(4)?.as_array()?.iter().filter_map(block_inlines) {
        if !content.is_empty() && !inlines.is_empty() {
            content.push(Inline::Space);
        }
        content.extend(inlines);
    }
    Some(Cell {
        content,
        row_span: span(2),
        col_span: span(3),
    })
}

fn rows_from(rows: &Value) -> Vec<Row> {
    rows.as_array()
        .into_iter()
        .flatten()
        .filter_map(|row| row.as_array()?.get(1)?.as_array())
        .map(|cells| cells.iter().filter_map(cell_from).collect())
        .collect()
}

impl TableModel {
    /// Read a pandoc `Table` block; `None` for anything else
    pub fn from_block(block: &Value) -> Option<Self> {
        if tag(block)? != "Table" {
            return None;
        }
        let parts = block.get("c")?.as_array()?;
        let aligns = parts
            .get(2)?
            .as_array()?
            .iter()
            .map(|spec| spec.get(0).map_or(ColAlign::Default, ColAlign::from_value))
            .collect();
        let head = parts.get(3).and_then(|h| h.get(1)).map(rows_from).unwrap_or_default();
        let mut body = Vec::new();
        for section in parts.get(4)?.as_array()? {
            if let Some(rows) = section.get(2) {
                body.extend(rows_from(rows));
            }
            if let Some(rows) = section.get(3) {
                body.extend(rows_from(rows));
            }
        }
        let foot = parts.get(5).and_then(|f| f.get(1)).map(rows_from).unwrap_or_default();
        Some(TableModel {
            aligns,
            head,
            body,
            foot,
        })
    }

    pub fn columns(&self) -> usize {
        self.aligns.len()
    }
}

/// Column weights usable for a table with `columns` columns
pub fn matching_weights(weights: Option<&[f64]>, columns: usize) -> Option<&[f64]> {
    weights.filter(|w| w.len() == columns && columns > 0)
}

/// LaTeX `tabular` column specification.
///
/// With weights every column becomes a paragraph column of its share of
/// `scale` times the line width; otherwise the table's own alignments are used.
pub fn latex_colspec(aligns: &[ColAlign], weights: Option<&[f64]>, scale: f64) -> String {
    match matching_weights(weights, aligns.len()) {
        Some(weights) => aligns
            .iter()
            .zip(weights)
            .map(|(align, weight)| {
                format!(
                    ">{{{}\\arraybackslash}}p{{\\dimexpr {}\\linewidth-2\\tabcolsep\\relax}}",
                    align.ragged(),
                    decimal(weight * scale)
                )
            })
            .collect(),
        None => aligns.iter().map(|a| a.letter()).collect(),
    }
}

/// Set the caption of a native table
pub fn set_caption(table: &mut Value, inlines: &[Inline]) {
    let blocks = if inlines.is_empty() {
        json!([])
    } else {
        json!([{ "t": "Plain", "c": inlines_value(inlines) }])
    };
    if let Some(caption) = table.pointer_mut("/c/1") {
        *caption = json!([null, blocks]);
    }
}

/// Set the identifier of a native table
pub fn set_identifier(table: &mut Value, id: &str) {
    if let Some(ident) = table.pointer_mut("/c/0/0") {
        *ident = Value::String(id.to_string());
    }
}

/// Give every column an explicit relative width
pub fn set_widths(table: &mut Value, widths: &[f64]) {
    let Some(specs) = table.pointer_mut("/c/2").and_then(Value::as_array_mut) else {
        return;
    };
    if specs.len() != widths.len() {
        return;
    }
    for (spec, width) in specs.iter_mut().zip(widths) {
        if let Some(slot) = spec.get_mut(1) {
            *slot = json!({ "t": "ColWidth", "c": width });
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(text: &str) -> Value {
        json!([["", [], []], {"t": "AlignDefault"}, 1, 1, [{"t": "Plain", "c": [{"t": "Str", "c": text}]}]])
    }

    fn row(cells: &[&str]) -> Value {
        json!([["", [], []], cells.iter().map(|c| cell(c)).collect::<Vec<_>>()])
    }

    /// A three column table with one header row and two body rows
    pub(crate) fn three_column_table() -> Value {
        json!({"t": "Table", "c": [
            ["", [], []],
            [null, []],
            [
                [{"t": "AlignLeft"}, {"t": "ColWidthDefault"}],
                [{"t": "AlignCenter"}, {"t": "ColWidthDefault"}],
                [{"t": "AlignRight"}, {"t": "ColWidthDefault"}]
            ],
            [["", [], []], [row(&["Site", "Plot", "Yield"])]],
            [[["", [], []], 0, [], [row(&["A", "1", "3.2"]), row(&["B", "2", "4.1"])]]],
            [["", [], []], []]
        ]})
    }

    #[test]
    fn test_model_from_block() {
        let model = TableModel::from_block(&three_column_table()).unwrap();
        assert_eq!(
            model.aligns,
            vec![ColAlign::Left, ColAlign::Center, ColAlign::Right]
        );
        assert_eq!(model.head.len(), 1);
        assert_eq!(model.body.len(), 2);
        assert!(model.foot.is_empty());
        assert_eq!(model.body[1][2].content, vec![Inline::Str("4.1".into())]);
    }

    #[test]
    fn test_colspec_from_alignment() {
        let model = TableModel::from_block(&three_column_table()).unwrap();
        assert_eq!(latex_colspec(&model.aligns, None, 1.0), "lcr");
    }

    #[test]
    fn test_colspec_from_weights() {
        let aligns = [ColAlign::Default; 3];
        let spec = latex_colspec(&aligns, Some(&[0.25, 0.25, 0.5]), 1.0);
        assert_eq!(
            spec,
            ">{\\raggedright\\arraybackslash}p{\\dimexpr 0.25\\linewidth-2\\tabcolsep\\relax}\
             >{\\raggedright\\arraybackslash}p{\\dimexpr 0.25\\linewidth-2\\tabcolsep\\relax}\
             >{\\raggedright\\arraybackslash}p{\\dimexpr 0.5\\linewidth-2\\tabcolsep\\relax}"
        );
        // weights for a different column count are ignored
        assert_eq!(latex_colspec(&aligns, Some(&[0.5, 0.5]), 1.0), "lll");
    }

    #[test]
    fn test_native_edits() {
        let mut table = three_column_table();
        set_caption(&mut table, &[Inline::Str("Yields.".into())]);
        set_identifier(&mut table, "tbl:data");
        set_widths(&mut table, &[0.25, 0.25, 0.5]);
        assert_eq!(table.pointer("/c/0/0"), Some(&json!("tbl:data")));
        assert_eq!(
            table.pointer("/c/1"),
            Some(&json!([null, [{"t": "Plain", "c": [{"t": "Str", "c": "Yields."}]}]]))
        );
        assert_eq!(
            table.pointer("/c/2/2/1"),
            Some(&json!({"t": "ColWidth", "c": 0.5}))
        );
    }
}
