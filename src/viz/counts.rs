use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::corpus::{Corpus, DocWeighting, Weighting};
use crate::error::{PipelineError, Result};
use crate::viz::{svg_open, write_svg, xml_escape};

/// A word statistics table, rows sorted by count descending (ties by word).
/// Every row holds the same columns in `columns` order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<(String, Vec<f64>)>,
}

impl CountTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write as CSV with a leading `word` column
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
            }
        }
        let mut wtr = csv::Writer::from_path(path)?;
        let mut header = vec!["word"];
        header.extend(self.columns.iter().copied());
        wtr.write_record(&header)?;
        for (word, values) in &self.rows {
            let mut record = vec![word.clone()];
            record.extend(values.iter().map(|v| v.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush().map_err(|e| PipelineError::io(path, e))?;
        Ok(())
    }

    /// First `n` rows of one column
    pub fn head(&self, column: &str, n: usize) -> Vec<(&str, f64)> {
        let Some(idx) = self.columns.iter().position(|c| *c == column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .take(n)
            .map(|(w, vals)| (w.as_str(), vals[idx]))
            .collect()
    }
}

/// Word counts with `count` and `freq` columns
pub fn word_counts(corpus: &Corpus) -> CountTable {
    let counts = corpus.word_counts(Weighting::Count);
    let freqs = corpus.word_counts(Weighting::Freq);
    let rows = counts
        .into_iter()
        .zip(freqs)
        .map(|((w, c), (_, f))| (w, vec![c, f]))
        .collect();
    info!("word counts computed");
    CountTable { columns: vec!["count", "freq"], rows }
}

/// Word-document counts with `count`, `freq` and `idf` columns
pub fn word_doc_counts(corpus: &Corpus) -> CountTable {
    let counts = corpus.word_doc_counts(DocWeighting::Count);
    let freqs = corpus.word_doc_counts(DocWeighting::Freq);
    let idfs = corpus.word_doc_counts(DocWeighting::Idf);
    let rows = counts
        .into_iter()
        .zip(freqs)
        .zip(idfs)
        .map(|(((w, c), (_, f)), (_, i))| (w, vec![c, f, i]))
        .collect();
    info!("word-document counts computed");
    CountTable { columns: vec!["count", "freq", "idf"], rows }
}

/// One grey bar panel per column, first `n` words, panels share the x axis
pub fn render_bar_chart(table: &CountTable, n: usize) -> String {
    const PANEL_H: f64 = 160.0;
    const BAR_W: f64 = 18.0;
    const MARGIN_L: f64 = 70.0;
    const MARGIN_T: f64 = 20.0;
    const LABEL_H: f64 = 110.0;

    let n = n.min(table.len());
    let width = MARGIN_L + BAR_W * 1.5 * n.max(1) as f64 + 20.0;
    let height = MARGIN_T + PANEL_H * table.columns.len() as f64 + LABEL_H;
    let mut svg = svg_open(width, height);

    for (p, column) in table.columns.iter().enumerate() {
        let top = MARGIN_T + PANEL_H * p as f64;
        let values = table.head(column, n);
        let max = values.iter().map(|&(_, v)| v).fold(0.0f64, f64::max);
        let plot_h = PANEL_H - 30.0;
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\" font-weight=\"bold\">{}</text>\n",
            MARGIN_L,
            top + 12.0,
            xml_escape(column)
        ));
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"9\" text-anchor=\"end\">{}</text>\n",
            MARGIN_L - 6.0,
            top + 24.0,
            format_tick(max)
        ));
        svg.push_str(&format!(
            "<line x1=\"{x:.1}\" y1=\"{:.1}\" x2=\"{x:.1}\" y2=\"{:.1}\" stroke=\"black\"/>\n",
            top + 20.0,
            top + 20.0 + plot_h,
            x = MARGIN_L
        ));
        for (i, (_, v)) in values.iter().enumerate() {
            let h = if max > 0.0 { plot_h * v / max } else { 0.0 };
            let x = MARGIN_L + BAR_W * 0.25 + BAR_W * 1.5 * i as f64;
            svg.push_str(&format!(
                "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"grey\"/>\n",
                x,
                top + 20.0 + plot_h - h,
                BAR_W,
                h
            ));
        }
    }

    let base = MARGIN_T + PANEL_H * table.columns.len() as f64;
    for (i, (word, _)) in table.rows.iter().take(n).enumerate() {
        let x = MARGIN_L + BAR_W * 0.75 + BAR_W * 1.5 * i as f64;
        svg.push_str(&format!(
            "<text x=\"{x:.1}\" y=\"{y:.1}\" font-size=\"10\" text-anchor=\"end\" transform=\"rotate(-90 {x:.1} {y:.1})\">{}</text>\n",
            xml_escape(word),
            x = x,
            y = base + 4.0
        ));
    }
    svg.push_str("</svg>\n");
    svg
}

fn format_tick(v: f64) -> String {
    if v >= 100.0 || v == v.trunc() {
        format!("{v:.0}")
    } else {
        format!("{v:.3}")
    }
}

/// Table to `{stem}.csv`, bar chart of the top `n` to `{stem}_N{n}.svg`
pub fn write_count_outputs(table: &CountTable, data_dir: &Path, figure_dir: &Path, stem: &str, n: usize) -> Result<()> {
    table.write_csv(data_dir.join(format!("{stem}.csv")))?;
    write_svg(&render_bar_chart(table, n), figure_dir.join(format!("{stem}_N{n}.svg")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CountTable {
        CountTable {
            columns: vec!["count", "freq"],
            rows: vec![
                ("water".into(), vec![3.0, 0.5]),
                ("river".into(), vec![2.0, 1.0 / 3.0]),
                ("dam".into(), vec![1.0, 1.0 / 6.0]),
            ],
        }
    }

    #[test]
    fn head_selects_column() {
        let t = table();
        assert_eq!(t.head("count", 2), vec![("water", 3.0), ("river", 2.0)]);
        assert!(t.head("idf", 2).is_empty());
    }

    #[test]
    fn csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wc.csv");
        table().write_csv(&path).unwrap();
        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["word", "count", "freq"]);
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][0], "water");
        assert_eq!(rows[0][1].parse::<f64>().unwrap(), 3.0);
    }

    #[test]
    fn bar_chart_draws_one_bar_per_word_and_column() {
        let svg = render_bar_chart(&table(), 2);
        assert_eq!(svg.matches("fill=\"grey\"").count(), 4);
        assert!(svg.contains(">water</text>"));
        assert!(!svg.contains(">dam</text>"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
