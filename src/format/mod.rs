//! Rendering of per-country ranking tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Table border style, mirroring the styles the reports have always used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStyle {
    #[default]
    Grid,
    Simple,
    Plain,
}

impl FromStr for TableStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grid" => Ok(TableStyle::Grid),
            "simple" => Ok(TableStyle::Simple),
            "plain" => Ok(TableStyle::Plain),
            _ => Err(format!("Unknown table style: {}. Use: grid, simple, plain", s)),
        }
    }
}

impl fmt::Display for TableStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableStyle::Grid => write!(f, "grid"),
            TableStyle::Simple => write!(f, "simple"),
            TableStyle::Plain => write!(f, "plain"),
        }
    }
}

/// A selectable report column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column {
    /// 1-based display position, assigned after sorting.
    #[serde(rename = "#")]
    Position,
    #[serde(rename = "KW")]
    Keyword,
    #[serde(rename = "Init")]
    Initial,
    #[serde(rename = "Now")]
    Now,
    #[serde(rename = "UpdKW")]
    Updated,
}

/// Which columns appear, their headers, and the border style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub style: TableStyle,
    #[serde(default = "default_columns")]
    pub columns: Vec<Column>,
    #[serde(default = "default_headers")]
    pub headers: Vec<String>,
}

fn default_columns() -> Vec<Column> {
    vec![Column::Keyword, Column::Now, Column::Updated]
}

fn default_headers() -> Vec<String> {
    vec!["KW".to_string(), "Now".to_string(), "UpdKW".to_string()]
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { style: TableStyle::Grid, columns: default_columns(), headers: default_headers() }
    }
}

impl TableConfig {
    pub fn has_position_column(&self) -> bool {
        self.columns.contains(&Column::Position)
    }
}

/// One keyword's display row within a country group.
#[derive(Debug, Clone)]
pub struct RankRow {
    pub position: Option<usize>,
    pub keyword: String,
    pub initial: String,
    pub now: String,
    pub updated: String,
}

impl RankRow {
    fn cell(&self, column: Column) -> String {
        match column {
            Column::Position => self.position.map(|p| p.to_string()).unwrap_or_default(),
            Column::Keyword => self.keyword.clone(),
            Column::Initial => self.initial.clone(),
            Column::Now => self.now.clone(),
            Column::Updated => self.updated.clone(),
        }
    }
}

/// Extracts the sortable rank from a transition string: the first number
/// after its last `#`. Rows without one sort last.
pub fn current_rank(transition: &str) -> Option<u32> {
    let after_hash = transition.rsplit('#').next()?;
    if after_hash == transition {
        // No '#' at all
        return None;
    }
    after_hash.split_whitespace().next()?.parse().ok()
}

/// Sorts rows ascending by their extracted rank; unresolvable rows go last.
/// Then assigns 1-based display positions.
pub fn sort_rows(rows: &mut [RankRow]) {
    rows.sort_by_key(|row| {
        let rank = current_rank(&row.now);
        (rank.is_none(), rank.unwrap_or(u32::MAX))
    });

    for (idx, row) in rows.iter_mut().enumerate() {
        row.position = Some(idx + 1);
    }
}

/// Renders rows as a monospace table per the configured columns and style.
pub fn render(rows: &[RankRow], config: &TableConfig) -> String {
    let headers: Vec<String> = config
        .columns
        .iter()
        .enumerate()
        .map(|(i, _)| config.headers.get(i).cloned().unwrap_or_default())
        .collect();

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| config.columns.iter().map(|&col| row.cell(col)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    match config.style {
        TableStyle::Grid => render_grid(&headers, &cells, &widths),
        TableStyle::Simple => render_simple(&headers, &cells, &widths),
        TableStyle::Plain => render_plain(&headers, &cells, &widths),
    }
}

fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    let mut out = s.to_string();
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(len)));
    out
}

fn rule(widths: &[usize], fill: char) -> String {
    let mut line = String::from("+");
    for &w in widths {
        line.extend(std::iter::repeat(fill).take(w + 2));
        line.push('+');
    }
    line
}

fn bordered_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, &w) in cells.iter().zip(widths) {
        line.push(' ');
        line.push_str(&pad(cell, w));
        line.push_str(" |");
    }
    line
}

fn render_grid(headers: &[String], rows: &[Vec<String>], widths: &[usize]) -> String {
    let mut lines = Vec::new();

    lines.push(rule(widths, '-'));
    lines.push(bordered_row(headers, widths));
    lines.push(rule(widths, '='));

    for row in rows {
        lines.push(bordered_row(row, widths));
        lines.push(rule(widths, '-'));
    }

    lines.join("\n")
}

fn render_simple(headers: &[String], rows: &[Vec<String>], widths: &[usize]) -> String {
    let mut lines = Vec::new();

    lines.push(spaced_row(headers, widths));
    lines.push(
        widths.iter().map(|&w| "-".repeat(w)).collect::<Vec<_>>().join("  "),
    );

    for row in rows {
        lines.push(spaced_row(row, widths));
    }

    lines.join("\n")
}

fn render_plain(headers: &[String], rows: &[Vec<String>], widths: &[usize]) -> String {
    let mut lines = Vec::new();

    lines.push(spaced_row(headers, widths));
    for row in rows {
        lines.push(spaced_row(row, widths));
    }

    lines.join("\n")
}

fn spaced_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| pad(cell, w))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(keyword: &str, now: &str) -> RankRow {
        RankRow {
            position: None,
            keyword: keyword.to_string(),
            initial: "#1".to_string(),
            now: now.to_string(),
            updated: "01 Jan 10:00".to_string(),
        }
    }

    #[test]
    fn test_current_rank_extraction() {
        assert_eq!(current_rank("#5"), Some(5));
        assert_eq!(current_rank("#5 → #7"), Some(7));
        assert_eq!(current_rank("x → #7"), Some(7));
        assert_eq!(current_rank("x"), None);
        // Transition to not-found keeps the previous rank as sort key
        assert_eq!(current_rank("#5 → x"), Some(5));
    }

    #[test]
    fn test_sort_rows_ranks_then_unresolved() {
        let mut rows = vec![make_row("a", "#12"), make_row("b", "x"), make_row("c", "#3")];
        sort_rows(&mut rows);

        let order: Vec<&str> = rows.iter().map(|r| r.now.as_str()).collect();
        assert_eq!(order, vec!["#3", "#12", "x"]);

        let positions: Vec<usize> = rows.iter().map(|r| r.position.unwrap()).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn test_sort_rows_stable_for_ties() {
        let mut rows = vec![make_row("first", "#5"), make_row("second", "#5")];
        sort_rows(&mut rows);
        assert_eq!(rows[0].keyword, "first");
        assert_eq!(rows[1].keyword, "second");
    }

    #[test]
    fn test_render_grid_layout() {
        let mut rows = vec![make_row("translate", "#5 → #3")];
        sort_rows(&mut rows);

        let output = render(&rows, &TableConfig::default());
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("+-"));
        assert!(lines[1].contains("| KW"));
        assert!(lines[2].starts_with("+="));
        assert!(lines[3].contains("translate"));
        assert!(lines[3].contains("#5 → #3"));
        assert!(lines.last().unwrap().starts_with("+-"));
    }

    #[test]
    fn test_render_simple_layout() {
        let config = TableConfig { style: TableStyle::Simple, ..TableConfig::default() };
        let rows = vec![make_row("translate", "#5")];
        let output = render(&rows, &config);
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].contains("KW"));
        assert!(lines[1].starts_with("--"));
        assert!(lines[2].contains("translate"));
        assert!(!output.contains('|'));
    }

    #[test]
    fn test_render_plain_has_no_rules() {
        let config = TableConfig { style: TableStyle::Plain, ..TableConfig::default() };
        let rows = vec![make_row("translate", "#5")];
        let output = render(&rows, &config);
        assert_eq!(output.lines().count(), 2);
        assert!(!output.contains('-'));
    }

    #[test]
    fn test_render_position_column() {
        let config = TableConfig {
            columns: vec![Column::Position, Column::Keyword, Column::Now],
            headers: vec!["#".to_string(), "KW".to_string(), "Now".to_string()],
            ..TableConfig::default()
        };
        assert!(config.has_position_column());

        let mut rows = vec![make_row("b", "#9"), make_row("a", "#2")];
        sort_rows(&mut rows);
        let output = render(&rows, &config);

        let first_data_line = output.lines().nth(3).unwrap();
        assert!(first_data_line.contains("| 1 "));
        assert!(first_data_line.contains('a'));
    }

    #[test]
    fn test_column_serde_names() {
        let config: TableConfig = serde_json::from_str(
            r##"{"style": "grid", "columns": ["#", "KW", "Init", "Now", "UpdKW"],
                "headers": ["#", "KW", "Init", "Now", "UpdKW"]}"##,
        )
        .unwrap();
        assert_eq!(config.columns.len(), 5);
        assert_eq!(config.columns[0], Column::Position);
        assert_eq!(config.columns[4], Column::Updated);
    }

    #[test]
    fn test_table_style_parsing() {
        assert_eq!("grid".parse::<TableStyle>().unwrap(), TableStyle::Grid);
        assert_eq!("SIMPLE".parse::<TableStyle>().unwrap(), TableStyle::Simple);
        assert_eq!("plain".parse::<TableStyle>().unwrap(), TableStyle::Plain);
        assert!("fancy".parse::<TableStyle>().is_err());
    }

    #[test]
    fn test_width_counts_chars_not_bytes() {
        // The arrow is multi-byte; widths must still line up
        let mut rows = vec![make_row("a", "#5 → #7"), make_row("bb", "#1")];
        sort_rows(&mut rows);
        let output = render(&rows, &TableConfig::default());

        let lens: Vec<usize> =
            output.lines().map(|l| l.chars().count()).collect();
        assert!(lens.windows(2).all(|w| w[0] == w[1]), "ragged table:\n{}", output);
    }
}
