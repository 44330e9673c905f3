use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::debug;

static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("invalid selector: td"));

static TH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").expect("invalid selector: th"));

/// Rows with fewer cells than this are layout noise (spacers, captions)
pub const MIN_CELLS_PER_ROW: usize = 3;

/// Element text with runs of whitespace collapsed and ends trimmed
pub fn cell_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cell texts of one row, preferring `td` and falling back to `th` when the
/// markup uses header cells for data.
pub fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    let cells: Vec<String> = row.select(&TD).map(cell_text).collect();
    if !cells.is_empty() {
        return cells;
    }
    row.select(&TH).map(cell_text).collect()
}

pub fn is_noise(cells: &[String]) -> bool {
    cells.len() < MIN_CELLS_PER_ROW || cells.iter().all(|cell| cell.is_empty())
}

/// Extract text rows from the table body, dropping noise rows.
pub fn extract_rows(body_rows: &[ElementRef<'_>]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(body_rows.len());
    let mut skipped = 0;

    for (index, row) in body_rows.iter().enumerate() {
        let cells = row_cells(*row);
        if is_noise(&cells) {
            debug!("Row {} skipped as noise: {:?}", index, cells);
            skipped += 1;
            continue;
        }
        rows.push(cells);
    }

    if skipped > 0 {
        debug!("Skipped {} noise rows out of {}", skipped, body_rows.len());
    }

    rows
}
