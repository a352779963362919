//! Plain-text table rendering for validation reports and listings.

use std::fmt::Write as _;

/// Renders rows as an aligned two-space-separated table with a dashed
/// header rule. Cells are taken verbatim; embedded newlines and tabs are
/// flattened to spaces so one logical row stays one physical line.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    write_row(&mut out, headers.iter().map(|h| h.to_string()), &widths);
    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(out, "{rule}");
    for row in rows {
        write_row(&mut out, row.iter().map(|c| flatten(c)), &widths);
    }
    out
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn write_row(out: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    let mut line = String::new();
    for (idx, cell) in cells.enumerate() {
        let Some(width) = widths.get(idx) else { break };
        if idx > 0 {
            line.push_str("  ");
        }
        line.push_str(&cell);
        let padding = width.saturating_sub(cell.chars().count());
        line.extend(std::iter::repeat_n(' ', padding));
    }
    let _ = writeln!(out, "{}", line.trim_end());
}

fn flatten(cell: &str) -> String {
    if cell.contains(['\n', '\r', '\t']) {
        cell.chars()
            .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
            .collect()
    } else {
        cell.to_string()
    }
}
