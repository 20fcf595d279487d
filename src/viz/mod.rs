//! Figures (SVG) and tables (CSV) derived from the corpus and topic models

pub mod counts;
pub mod termite;

use std::fs;
use std::path::Path;

use crate::error::{PipelineError, Result};

pub use counts::{render_bar_chart, word_counts, word_doc_counts, CountTable};
pub use termite::{termite_plot, RankTerms, SortTerms, TermiteData, TermiteOptions};

/// Escape text for use inside SVG markup
pub(crate) fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub(crate) fn svg_open(width: f64, height: f64) -> String {
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.0} {h:.0}\" font-family=\"sans-serif\">\n",
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        "<rect x=\"0\" y=\"0\" width=\"{width:.0}\" height=\"{height:.0}\" fill=\"white\"/>\n"
    ));
    svg
}

/// Write a rendered figure, creating parent directories
pub fn write_svg<P: AsRef<Path>>(svg: &str, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }
    fs::write(path, svg).map_err(|e| PipelineError::io(path, e))
}
