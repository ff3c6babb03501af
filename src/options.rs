//! Option micro-language of callout header lines.
//!
//! Each option is searched for independently, so order does not matter and
//! anything unrecognised is ignored. Invalid values leave the default.

use lazy_static::lazy_static;
use regex::Regex;

use crate::callout::CalloutKind;

lazy_static! {
    static ref FIG_LABEL: Regex = Regex::new(r"#(fig:[A-Za-z0-9_\-]+)").unwrap();
    static ref TBL_LABEL: Regex = Regex::new(r"#(tbl:[A-Za-z0-9_\-]+)").unwrap();
    static ref WIDTH: Regex = Regex::new(r"(?:^|\s)width=(\S+)").unwrap();
    static ref ALIGN: Regex = Regex::new(r"(?:^|\s)align=(\S+)").unwrap();
    static ref SPAN: Regex = Regex::new(r"(?:^|\s)span=(\S+)").unwrap();
    static ref POS: Regex = Regex::new(r"(?:^|\s)pos=(\S+)").unwrap();
    static ref WRAP: Regex = Regex::new(r"(?:^|\s)wrap=(\S+)").unwrap();
    static ref FONTSIZE: Regex = Regex::new(r"(?:^|\s)fontsize=(\S+)").unwrap();
    static ref SPACING: Regex = Regex::new(r"(?:^|\s)spacing=(\S+)").unwrap();
    static ref COLUMNS: Regex = Regex::new(r"(?:^|\s)columns=(\S+)").unwrap();
    static ref COLSEP: Regex = Regex::new(r"(?:^|\s)colsep=(\S+)").unwrap();
    static ref FAMILY: Regex = Regex::new(r"(?:^|\s)family=(\S+)").unwrap();
    static ref PERCENT: Regex = Regex::new(r"^(\d+(?:\.\d+)?)%$").unwrap();
    static ref NUMBER: Regex = Regex::new(r"^\d*\.?\d+$").unwrap();
    static ref DIMENSION: Regex = Regex::new(r"^(?:\d*\.?\d+)?\\?[A-Za-z]+$").unwrap();
    static ref LENGTH: Regex = Regex::new(r"^(\d*\.?\d+)(pt|mm|cm|em|ex|in|bp|pc)?$").unwrap();
}

/// Requested width of a figure or table
#[derive(Clone, Debug, PartialEq)]
pub enum Width {
    /// Percentage of the container width, e.g. `80%`
    Percent(f64),
    /// The whole container width (`full`, `page`)
    Full,
    /// Fraction of the container width, e.g. `0.5`
    Fraction(f64),
    /// A unit length or TeX length command (`5cm`, `0.3\textwidth`), passed
    /// through to formats that understand it
    Dimension(String),
}

impl Width {
    fn parse(value: &str) -> Option<Width> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if matches!(value.to_ascii_lowercase().as_str(), "full" | "page" | "linewidth") {
            return Some(Width::Full);
        }
        if let Some(caps) = PERCENT.captures(value) {
            let pct: f64 = caps[1].parse().ok()?;
            if pct <= 0.0 {
                return None;
            }
            if (pct - 100.0).abs() < f64::EPSILON {
                return Some(Width::Full);
            }
            return Some(Width::Percent(pct));
        }
        if NUMBER.is_match(value) {
            let fraction: f64 = value.parse().ok()?;
            return match fraction {
                f if f > 0.0 && f < 1.0 => Some(Width::Fraction(f)),
                f if (f - 1.0).abs() < f64::EPSILON => Some(Width::Full),
                _ => None,
            };
        }
        DIMENSION
            .is_match(value)
            .then(|| Width::Dimension(value.to_string()))
    }

    /// Width as a fraction of the container, when it has one
    pub fn as_fraction(&self) -> Option<f64> {
        match self {
            Width::Percent(p) => Some(p / 100.0),
            Width::Full => Some(1.0),
            Width::Fraction(f) => Some(*f),
            Width::Dimension(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
    LeftWrap,
    RightWrap,
}

/// Side of the text a wrapped figure sits on (`wrapfigure` placement)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapSide {
    Left,
    Right,
    Inside,
    Outside,
}

impl WrapSide {
    pub fn letter(self) -> char {
        match self {
            WrapSide::Left => 'l',
            WrapSide::Right => 'r',
            WrapSide::Inside => 'i',
            WrapSide::Outside => 'o',
        }
    }

    /// Inside/outside depend on the page; treat them as left/right elsewhere
    pub fn is_left(self) -> bool {
        matches!(self, WrapSide::Left | WrapSide::Inside)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontFamily {
    Sans,
    Serif,
    Mono,
}

/// Options recognised in a callout header line
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalloutOptions {
    pub label: Option<String>,
    pub width: Option<Width>,
    pub align: Align,
    pub span_full: bool,
    pub pos: Option<String>,
    pub wrap: Option<WrapSide>,
    pub fontsize: Option<String>,
    pub spacing: Option<f64>,
    pub columns: Option<Vec<f64>>,
    pub colsep: Option<String>,
    pub family: Option<FontFamily>,
}

impl CalloutOptions {
    /// Wrap side requested either by `wrap=` or a `*-wrap` alignment
    pub fn wrap_side(&self) -> Option<WrapSide> {
        self.wrap.or(match self.align {
            Align::LeftWrap => Some(WrapSide::Left),
            Align::RightWrap => Some(WrapSide::Right),
            _ => None,
        })
    }
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn parse_align(value: &str, kind: CalloutKind) -> Option<Align> {
    match value.to_ascii_lowercase().as_str() {
        "left" => Some(Align::Left),
        "center" | "centre" => Some(Align::Center),
        "right" => Some(Align::Right),
        "left-wrap" if kind == CalloutKind::Figure => Some(Align::LeftWrap),
        "right-wrap" if kind == CalloutKind::Figure => Some(Align::RightWrap),
        _ => None,
    }
}

fn parse_pos(value: &str) -> Option<String> {
    let pos: String = value.chars().filter(|c| "htbpH!".contains(*c)).collect();
    (!pos.is_empty()).then_some(pos)
}

fn parse_wrap(value: &str) -> Option<WrapSide> {
    match value {
        "l" | "L" => Some(WrapSide::Left),
        "r" | "R" => Some(WrapSide::Right),
        "i" | "I" => Some(WrapSide::Inside),
        "o" | "O" => Some(WrapSide::Outside),
        _ => None,
    }
}

fn parse_fontsize(value: &str) -> Option<String> {
    const SIZES: [&str; 10] = [
        "tiny",
        "scriptsize",
        "footnotesize",
        "small",
        "normalsize",
        "large",
        "Large",
        "LARGE",
        "huge",
        "Huge",
    ];
    let value = value.trim_start_matches('\\');
    SIZES.contains(&value).then(|| value.to_string())
}

fn parse_positive(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

fn parse_colsep(value: &str) -> Option<String> {
    let caps = LENGTH.captures(value)?;
    let unit = caps.get(2).map_or("pt", |m| m.as_str());
    Some(format!("{}{}", &caps[1], unit))
}

fn parse_family(value: &str) -> Option<FontFamily> {
    match value.to_ascii_lowercase().as_str() {
        "sans" | "sf" => Some(FontFamily::Sans),
        "serif" | "rm" => Some(FontFamily::Serif),
        "mono" | "tt" => Some(FontFamily::Mono),
        _ => None,
    }
}

/// Parse comma separated column weights, normalised to sum to 1.0
pub fn parse_columns(value: &str) -> Option<Vec<f64>> {
    let weights = value
        .split(',')
        .map(|w| parse_positive(w.trim()))
        .collect::<Option<Vec<f64>>>()?;
    normalize_weights(&weights)
}

pub fn normalize_weights(weights: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 || !total.is_finite() {
        return None;
    }
    Some(weights.iter().map(|w| w / total).collect())
}

/// Extract the options of `kind` from a header line
pub fn parse_options(text: &str, kind: CalloutKind) -> CalloutOptions {
    let label_re: &Regex = match kind {
        CalloutKind::Figure => &*FIG_LABEL,
        CalloutKind::Table => &*TBL_LABEL,
    };
    let mut options = CalloutOptions {
        label: capture(label_re, text).map(str::to_string),
        width: capture(&WIDTH, text).and_then(Width::parse),
        align: capture(&ALIGN, text)
            .and_then(|v| parse_align(v, kind))
            .unwrap_or_default(),
        span_full: capture(&SPAN, text).is_some_and(|v| v.eq_ignore_ascii_case("full")),
        pos: capture(&POS, text).and_then(parse_pos),
        wrap: None,
        ..Default::default()
    };
    match kind {
        CalloutKind::Figure => {
            options.wrap = capture(&WRAP, text).and_then(parse_wrap);
        }
        CalloutKind::Table => {
            options.fontsize = capture(&FONTSIZE, text).and_then(parse_fontsize);
            options.spacing = capture(&SPACING, text).and_then(parse_positive);
            options.columns = capture(&COLUMNS, text).and_then(parse_columns);
            options.colsep = capture(&COLSEP, text).and_then(parse_colsep);
            options.family = capture(&FAMILY, text).and_then(parse_family);
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_figure_header() {
        let options = parse_options(
            "[!figure] #fig:results width=80% align=center",
            CalloutKind::Figure,
        );
        assert_eq!(options.label.as_deref(), Some("fig:results"));
        assert_eq!(options.width, Some(Width::Percent(80.0)));
        assert_eq!(options.align, Align::Center);
        assert!(!options.span_full);
    }

    #[test]
    fn test_order_is_irrelevant() {
        let a = parse_options("[!figure] align=right #fig:a pos=ht", CalloutKind::Figure);
        let b = parse_options("[!figure] pos=ht #fig:a align=right", CalloutKind::Figure);
        assert_eq!(a, b);
        assert_eq!(a.pos.as_deref(), Some("ht"));
    }

    #[rstest]
    #[case("width=50%", Some(Width::Percent(50.0)))]
    #[case("width=100%", Some(Width::Full))]
    #[case("width=full", Some(Width::Full))]
    #[case("width=0.5", Some(Width::Fraction(0.5)))]
    #[case("width=5cm", Some(Width::Dimension("5cm".into())))]
    #[case(r"width=0.3\textwidth", Some(Width::Dimension(r"0.3\textwidth".into())))]
    #[case(r"width=\columnwidth", Some(Width::Dimension(r"\columnwidth".into())))]
    #[case("width=0%", None)]
    #[case(r#"width=5cm"onclick"#, None)]
    #[case("width=5cm;float:left", None)]
    #[case(r"width=5cm}\clearpage", None)]
    #[case("width=3", None)]
    fn test_width(#[case] header: &str, #[case] expected: Option<Width>) {
        let options = parse_options(&format!("[!figure] {header}"), CalloutKind::Figure);
        assert_eq!(options.width, expected);
    }

    #[test]
    fn test_malformed_options_keep_defaults() {
        let options = parse_options(
            "[!figure] totally=broken align=diagonal wrap=x pos=zz span=half",
            CalloutKind::Figure,
        );
        assert_eq!(options, CalloutOptions::default());
    }

    #[test]
    fn test_wrap_letters() {
        let options = parse_options("[!figure] wrap=o", CalloutKind::Figure);
        assert_eq!(options.wrap_side(), Some(WrapSide::Outside));
        let options = parse_options("[!figure] align=left-wrap", CalloutKind::Figure);
        assert_eq!(options.wrap_side(), Some(WrapSide::Left));
    }

    #[test]
    fn test_wrap_alignments_are_figure_only() {
        let options = parse_options("[!table] align=left-wrap", CalloutKind::Table);
        assert_eq!(options.align, Align::Center);
    }

    #[test]
    fn test_label_namespace_follows_kind() {
        let options = parse_options("[!table] #fig:oops", CalloutKind::Table);
        assert_eq!(options.label, None);
        let options = parse_options("[!table] #tbl:data-1", CalloutKind::Table);
        assert_eq!(options.label.as_deref(), Some("tbl:data-1"));
    }

    #[test]
    fn test_column_weights_normalised() {
        let weights = parse_columns("1,2,1").unwrap();
        assert_eq!(weights, vec![0.25, 0.5, 0.25]);
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(parse_columns("25,50,25"), parse_columns("1,2,1"));
        assert_eq!(parse_columns("1,x,1"), None);
        assert_eq!(parse_columns("0,0"), None);
    }

    #[test]
    fn test_table_styling() {
        let options = parse_options(
            "[!table] #tbl:data columns=1,1,2 fontsize=small spacing=1.2 colsep=4 family=sans",
            CalloutKind::Table,
        );
        assert_eq!(options.columns, Some(vec![0.25, 0.25, 0.5]));
        assert_eq!(options.fontsize.as_deref(), Some("small"));
        assert_eq!(options.spacing, Some(1.2));
        assert_eq!(options.colsep.as_deref(), Some("4pt"));
        assert_eq!(options.family, Some(FontFamily::Sans));
    }

    #[test]
    fn test_invalid_table_styling_ignored() {
        let options = parse_options(
            "[!table] fontsize=enormous spacing=-1 colsep=wide family=comic",
            CalloutKind::Table,
        );
        assert_eq!(options.fontsize, None);
        assert_eq!(options.spacing, None);
        assert_eq!(options.colsep, None);
        assert_eq!(options.family, None);
    }
}
