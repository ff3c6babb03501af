use serde_json::Value;

use super::table::{Cell, ColAlign, Row, TableModel, latex_colspec};
use super::{Emitter, Numbered, decimal};
use crate::ast::{Inline, plain, raw_block, raw_inline};
use crate::options::{Align, FontFamily, Width};

/// Floats for LaTeX/PDF output.
///
/// Caption inlines stay native pandoc nodes between raw LaTeX fragments,
/// so pandoc's own writer renders emphasis, math and citations in them.
pub struct LatexEmitter;

const DEFAULT_WRAP_WIDTH: &str = "0.5\\linewidth";

/// LaTeX length for a width option
pub fn latex_length(width: &Width) -> String {
    match width {
        Width::Percent(p) => format!("{}\\linewidth", decimal(p / 100.0)),
        Width::Full => "\\linewidth".to_string(),
        Width::Fraction(f) => format!("{}\\linewidth", decimal(*f)),
        Width::Dimension(d) => d.clone(),
    }
}

/// Image path as `\includegraphics` reads it
fn latex_path(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for c in source.chars() {
        match c {
            '%' | '#' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '\\' => out.push('/'),
            _ => out.push(c),
        }
    }
    out
}

/// `(caption justification, paragraph alignment command)`
fn alignment(align: Align) -> (&'static str, &'static str) {
    match align {
        Align::Left => ("raggedright", "\\raggedright"),
        Align::Right => ("raggedleft", "\\raggedleft"),
        Align::Center | Align::LeftWrap | Align::RightWrap => ("centering", "\\centering"),
    }
}

fn latex(text: impl Into<String>) -> Inline {
    raw_inline("latex", text)
}

/// `\caption*{<prefix> <caption>}\label{<label>}` as a `Plain` block
fn caption_block(numbered: &Numbered) -> Value {
    let mut inlines = vec![latex("\\caption*{")];
    inlines.extend(numbered.caption_rich());
    inlines.push(latex("}"));
    if let Some(label) = &numbered.callout.label {
        inlines.push(latex(format!("\\label{{{label}}}")));
    }
    plain(&inlines)
}

fn placement(pos: &Option<String>) -> String {
    pos.as_ref().map(|p| format!("[{p}]")).unwrap_or_default()
}

impl Emitter for LatexEmitter {
    fn figure(&self, figure: &Numbered) -> Vec<Value> {
        let options = &figure.callout.options;
        let (begin, end, graphic_width) = match options.wrap_side() {
            Some(side) => {
                let width = options
                    .width
                    .as_ref()
                    .map(latex_length)
                    .unwrap_or_else(|| DEFAULT_WRAP_WIDTH.to_string());
                (
                    format!("\\begin{{wrapfigure}}{{{}}}{{{width}}}", side.letter()),
                    "\\end{wrapfigure}".to_string(),
                    Some("\\linewidth".to_string()),
                )
            }
            None => {
                let env = if options.span_full { "figure*" } else { "figure" };
                (
                    format!("\\begin{{{env}}}{}", placement(&options.pos)),
                    format!("\\end{{{env}}}"),
                    options.width.as_ref().map(latex_length),
                )
            }
        };
        let (justification, command) = alignment(options.align);
        let source = latex_path(figure.callout.media_source.as_deref().unwrap_or_default());
        let graphic = match graphic_width {
            Some(width) => format!("\\includegraphics[width={width}]{{{source}}}"),
            None => format!("\\includegraphics{{{source}}}"),
        };
        let head = [
            begin,
            command.to_string(),
            format!("\\captionsetup{{justification={justification}}}"),
            graphic,
        ];
        vec![
            raw_block("latex", head.join("\n")),
            caption_block(figure),
            raw_block("latex", end),
        ]
    }

    fn table(&self, table: &Numbered, block: &Value) -> Vec<Value> {
        let Some(model) = TableModel::from_block(block) else {
            return vec![block.clone()];
        };
        let options = &table.callout.options;
        let env = if options.span_full { "table*" } else { "table" };
        let (justification, command) = alignment(options.align);
        let head = [
            format!("\\begin{{{env}}}{}", placement(&options.pos)),
            command.to_string(),
            format!("\\captionsetup{{justification={justification}}}"),
        ];

        let mut setup = vec!["\\begingroup".to_string()];
        if let Some(size) = &options.fontsize {
            setup.push(format!("\\{size}"));
        }
        if let Some(family) = options.family {
            setup.push(
                match family {
                    FontFamily::Sans => "\\sffamily",
                    FontFamily::Serif => "\\rmfamily",
                    FontFamily::Mono => "\\ttfamily",
                }
                .to_string(),
            );
        }
        if let Some(colsep) = &options.colsep {
            setup.push(format!("\\setlength{{\\tabcolsep}}{{{colsep}}}"));
        }
        if let Some(spacing) = options.spacing {
            setup.push(format!(
                "\\renewcommand{{\\arraystretch}}{{{}}}",
                decimal(spacing)
            ));
        }
        let scale = options
            .width
            .as_ref()
            .and_then(Width::as_fraction)
            .unwrap_or(1.0);
        let colspec = latex_colspec(&model.aligns, options.columns.as_deref(), scale);
        setup.push(format!("\\begin{{tabular}}{{{colspec}}}"));
        setup.push("\\toprule".to_string());

        let mut blocks = vec![
            raw_block("latex", head.join("\n")),
            caption_block(table),
            raw_block("latex", setup.join("\n")),
        ];
        let mut rows = RowWriter::new(&model.aligns);
        if !model.head.is_empty() {
            blocks.extend(model.head.iter().map(|row| rows.write(row)));
            blocks.push(raw_block("latex", "\\midrule"));
        }
        blocks.extend(model.body.iter().map(|row| rows.write(row)));
        if !model.foot.is_empty() {
            blocks.push(raw_block("latex", "\\midrule"));
            blocks.extend(model.foot.iter().map(|row| rows.write(row)));
        }
        blocks.push(raw_block(
            "latex",
            format!("\\bottomrule\n\\end{{tabular}}\n\\endgroup\n\\end{{{env}}}"),
        ));
        blocks
    }
}

/// Writes `tabular` rows, keeping track of cells covered by row spans
struct RowWriter<'a> {
    aligns: &'a [ColAlign],
    covered: Vec<usize>,
}

impl<'a> RowWriter<'a> {
    fn new(aligns: &'a [ColAlign]) -> Self {
        RowWriter {
            aligns,
            covered: vec![0; aligns.len()],
        }
    }

    /// Consume a column covered by a row span from an earlier row
    fn take_covered(&mut self, column: usize) -> bool {
        match self.covered.get_mut(column) {
            Some(rows) if *rows > 0 => {
                *rows -= 1;
                true
            }
            _ => false,
        }
    }

    fn cell(&mut self, cell: &Cell, column: usize) -> Vec<Inline> {
        for c in column..column + cell.col_span {
            if let Some(rows) = self.covered.get_mut(c) {
                *rows = cell.row_span - 1;
            }
        }
        if cell.col_span == 1 {
            return cell.content.clone();
        }
        let letter = self
            .aligns
            .get(column)
            .map_or('c', |a| match a {
                ColAlign::Default => 'c',
                a => a.letter(),
            });
        let mut inlines = vec![latex(format!(
            "\\multicolumn{{{}}}{{{letter}}}{{",
            cell.col_span
        ))];
        inlines.extend(cell.content.iter().cloned());
        inlines.push(latex("}"));
        inlines
    }

    fn write(&mut self, row: &Row) -> Value {
        let mut cells: Vec<Vec<Inline>> = Vec::new();
        let mut column = 0;
        for cell in row {
            while column < self.aligns.len() && self.take_covered(column) {
                cells.push(Vec::new());
                column += 1;
            }
            cells.push(self.cell(cell, column));
            column += cell.col_span;
        }
        while column < self.aligns.len() && self.take_covered(column) {
            cells.push(Vec::new());
            column += 1;
        }

        let mut inlines = Vec::new();
        for (i, cell) in cells.into_iter().enumerate() {
            if i > 0 {
                inlines.push(latex(" & "));
            }
            inlines.extend(cell);
        }
        inlines.push(latex(" \\\\"));
        plain(&inlines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{inlines_from, tag};
    use crate::callout::CalloutKind;
    use crate::caption::plain_text;
    use crate::config::FilterConfig;
    use crate::emit::table::tests::three_column_table;
    use crate::emit::tests::sample;
    use crate::options::{CalloutOptions, WrapSide};
    use pretty_assertions::assert_eq;

    fn raw_text(block: &Value) -> String {
        assert_eq!(tag(block), Some("RawBlock"));
        block["c"][1].as_str().unwrap().to_string()
    }

    fn plain_inlines(block: &Value) -> Vec<Inline> {
        inlines_from(&block["c"]).unwrap()
    }

    #[test]
    fn test_figure_with_width_and_label() {
        let options = CalloutOptions {
            label: Some("fig:results".into()),
            width: Some(Width::Percent(80.0)),
            ..Default::default()
        };
        let callout = sample(CalloutKind::Figure, Some("fig:results"), options);
        let config = FilterConfig::default();
        let blocks = LatexEmitter.figure(&Numbered {
            callout: &callout,
            number: 1,
            config: &config,
        });

        assert_eq!(blocks.len(), 3);
        let head = raw_text(&blocks[0]);
        assert!(head.starts_with("\\begin{figure}\n"));
        assert!(head.contains("\\centering"));
        assert!(head.contains("\\captionsetup{justification=centering}"));
        assert!(head.contains("\\includegraphics[width=0.8\\linewidth]{img/results.png}"));

        let caption = plain_inlines(&blocks[1]);
        assert_eq!(caption.first(), Some(&latex("\\caption*{")));
        assert_eq!(caption.last(), Some(&latex("\\label{fig:results}")));
        assert_eq!(plain_text(&caption), "Figure 1. Results. See text.");
        assert_eq!(raw_text(&blocks[2]), "\\end{figure}");
    }

    #[test]
    fn test_full_span_and_placement() {
        let options = CalloutOptions {
            span_full: true,
            pos: Some("tb".into()),
            align: Align::Left,
            width: Some(Width::Dimension("5cm".into())),
            ..Default::default()
        };
        let callout = sample(CalloutKind::Figure, None, options);
        let config = FilterConfig::default();
        let blocks = LatexEmitter.figure(&Numbered {
            callout: &callout,
            number: 4,
            config: &config,
        });
        let head = raw_text(&blocks[0]);
        assert!(head.starts_with("\\begin{figure*}[tb]"));
        assert!(head.contains("\\raggedright"));
        assert!(head.contains("justification=raggedright"));
        assert!(head.contains("\\includegraphics[width=5cm]"));
        assert_eq!(raw_text(&blocks[2]), "\\end{figure*}");
        // no label without one in the header
        assert!(!plain_inlines(&blocks[1]).iter().any(|i| matches!(i, Inline::RawInline(_, t) if t.starts_with("\\label"))));
    }

    #[test]
    fn test_image_path_escaped() {
        let mut callout = sample(CalloutKind::Figure, None, CalloutOptions::default());
        callout.media_source = Some(r"plots\50%_run#2.png".into());
        let config = FilterConfig::default();
        let blocks = LatexEmitter.figure(&Numbered {
            callout: &callout,
            number: 1,
            config: &config,
        });
        assert!(raw_text(&blocks[0]).ends_with(r"\includegraphics{plots/50\%_run\#2.png}"));
    }

    #[test]
    fn test_wrapped_figure() {
        let options = CalloutOptions {
            wrap: Some(WrapSide::Right),
            width: Some(Width::Percent(40.0)),
            ..Default::default()
        };
        let callout = sample(CalloutKind::Figure, None, options);
        let config = FilterConfig::default();
        let blocks = LatexEmitter.figure(&Numbered {
            callout: &callout,
            number: 1,
            config: &config,
        });
        let head = raw_text(&blocks[0]);
        assert!(head.starts_with("\\begin{wrapfigure}{r}{0.4\\linewidth}"));
        assert!(head.contains("\\includegraphics[width=\\linewidth]"));
        assert_eq!(raw_text(&blocks[2]), "\\end{wrapfigure}");
    }

    #[test]
    fn test_table_with_weights_and_styling() {
        let options = CalloutOptions {
            columns: Some(vec![0.25, 0.25, 0.5]),
            fontsize: Some("small".into()),
            family: Some(FontFamily::Sans),
            colsep: Some("4pt".into()),
            spacing: Some(1.2),
            ..Default::default()
        };
        let callout = sample(CalloutKind::Table, Some("tbl:data"), options);
        let config = FilterConfig::default();
        let blocks = LatexEmitter.table(
            &Numbered {
                callout: &callout,
                number: 2,
                config: &config,
            },
            &three_column_table(),
        );

        assert!(raw_text(&blocks[0]).starts_with("\\begin{table}"));
        assert_eq!(
            plain_text(&plain_inlines(&blocks[1])),
            "Table 2. Results. See text."
        );
        let setup = raw_text(&blocks[2]);
        assert!(setup.contains("\\small\n\\sffamily"));
        assert!(setup.contains("\\setlength{\\tabcolsep}{4pt}"));
        assert!(setup.contains("\\renewcommand{\\arraystretch}{1.2}"));
        assert!(setup.contains("p{\\dimexpr 0.25\\linewidth-2\\tabcolsep\\relax}"));
        assert!(setup.contains("p{\\dimexpr 0.5\\linewidth-2\\tabcolsep\\relax}"));

        // header row, midrule, two body rows, closing block
        assert_eq!(blocks.len(), 8);
        assert_eq!(raw_text(&blocks[4]), "\\midrule");
        let header = plain_inlines(&blocks[3]);
        assert_eq!(
            header,
            vec![
                Inline::Str("Site".into()),
                latex(" & "),
                Inline::Str("Plot".into()),
                latex(" & "),
                Inline::Str("Yield".into()),
                latex(" \\\\"),
            ]
        );
        assert!(raw_text(&blocks[7]).ends_with("\\end{tabular}\n\\endgroup\n\\end{table}"));
    }

    #[test]
    fn test_table_natural_alignment() {
        let callout = sample(CalloutKind::Table, None, CalloutOptions::default());
        let config = FilterConfig::default();
        let blocks = LatexEmitter.table(
            &Numbered {
                callout: &callout,
                number: 1,
                config: &config,
            },
            &three_column_table(),
        );
        assert!(raw_text(&blocks[2]).contains("\\begin{tabular}{lcr}"));
    }

    #[test]
    fn test_row_spans_leave_empty_cells() {
        let aligns = [ColAlign::Left; 3];
        let mut writer = RowWriter::new(&aligns);
        let cell = |text: &str, rows: usize, cols: usize| Cell {
            content: vec![Inline::Str(text.into())],
            row_span: rows,
            col_span: cols,
        };
        writer.write(&vec![cell("A", 2, 1), cell("B", 1, 2)]);
        let second = writer.write(&vec![cell("C", 1, 1), cell("D", 1, 1)]);
        assert_eq!(
            inlines_from(&second["c"]).unwrap(),
            vec![
                latex(" & "),
                Inline::Str("C".into()),
                latex(" & "),
                Inline::Str("D".into()),
                latex(" \\\\"),
            ]
        );
    }
}
