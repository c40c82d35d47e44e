use std::fmt::Display;

pub const NO_RESULTS: &str = "No results found.";

/// Renders rows as a left-aligned, pipe separated text table.
///
/// Each column is as wide as its longest header or cell, counted in chars.
/// Cells past the last column are ignored and missing cells render empty.
pub fn format_results<T: Display>(columns: &[String], rows: &[Vec<T>]) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().take(columns.len()).map(|v| v.to_string()).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, value) in row.iter().enumerate() {
            widths[i] = widths[i].max(value.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(cells.len() + 2);
    lines.push(render_line(&widths, columns.iter().map(String::as_str)));
    lines.push(
        widths
            .iter()
            .map(|&width| "-".repeat(width))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(render_line(&widths, row.iter().map(String::as_str)));
    }

    lines.join("\n")
}

fn render_line<'a>(widths: &[usize], mut values: impl Iterator<Item = &'a str>) -> String {
    widths
        .iter()
        .map(|&width| format!("{:<width$}", values.next().unwrap_or("")))
        .collect::<Vec<_>>()
        .join(" | ")
}
