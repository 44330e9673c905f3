//! Header reconstruction for the station table.
//!
//! INMET renders a two-row header: the first row holds the quantity
//! ("Temperatura (°C)") with a `colspan`, the second the per-column qualifier
//! ("Inst.", "Máx.", "Mín."). Flattening pairs them into one label per data
//! column, e.g. "Temperatura (°C) - Máx.".

use std::collections::VecDeque;
use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::{debug, warn};

use super::coercion::ColumnKind;
use super::rows::cell_text;
use crate::models::HeaderCell;
use crate::parse_error::ParseError;

/// Labels used when the table carries no usable header text
pub const DEFAULT_HEADERS: &[&str] = &[
    "Data",
    "Hora",
    "Temperatura",
    "Umidade",
    "Ponto de Orvalho",
    "Pressão",
    "Vento",
    "Radiação",
    "Chuva",
];

/// The fixed 19-column INMET layout, already flattened
pub const POSITIONAL_HEADERS: &[&str] = &[
    "Data",
    "Hora",
    "Temperatura - Inst.",
    "Temperatura - Máx.",
    "Temperatura - Mín.",
    "Umidade - Inst.",
    "Umidade - Máx.",
    "Umidade - Mín.",
    "Ponto de Orvalho - Inst.",
    "Ponto de Orvalho - Máx.",
    "Ponto de Orvalho - Mín.",
    "Pressão - Inst.",
    "Pressão - Máx.",
    "Pressão - Mín.",
    "Vento - Vel.",
    "Vento - Dir.",
    "Vento - Raj.",
    "Radiação",
    "Chuva",
];

/// Upper bound on `colspan`, matching what browsers honour
const MAX_COLSPAN: usize = 1000;

static HEADER_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("invalid selector: th, td"));

static TH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").expect("invalid selector: th"));

static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("invalid selector: td"));

/// Header rows as read from the markup, before flattening
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderBlock {
    pub main: Vec<HeaderCell>,
    pub sub: Vec<String>,
    /// Number of leading table rows consumed by the header
    pub row_count: usize,
}

impl HeaderBlock {
    /// Read the leading header rows, using at most `label_rows` of them for
    /// labels.
    ///
    /// Every leading header row is counted in `row_count` so the caller skips
    /// it even when the policy ignores its labels. The first header row becomes
    /// the main header, the second (if used) the sub-header queue.
    pub fn read(rows: &[ElementRef<'_>], label_rows: usize) -> Self {
        let header_rows = leading_header_rows(rows);

        let main: Vec<HeaderCell> = header_rows
            .first()
            .map(|row| row.select(&HEADER_CELL).map(header_cell).collect())
            .unwrap_or_default();

        let sub: Vec<String> = header_rows
            .get(1)
            .filter(|_| label_rows >= 2)
            .map(|row| row.select(&HEADER_CELL).map(cell_text).collect())
            .unwrap_or_default();

        debug!(
            "Read header block: {} header rows, {} main cells, {} sub cells",
            header_rows.len(),
            main.len(),
            sub.len()
        );

        Self {
            main,
            sub,
            row_count: header_rows.len(),
        }
    }

    pub fn has_text(&self) -> bool {
        self.main.iter().any(|cell| !cell.label.is_empty())
    }
}

/// Leading rows that carry header labels.
///
/// Rows marked up as headers always count. A first row of plain `td` cells
/// counts when one of its labels classifies or it spans columns, and the row
/// after a spanning first row is its sub-header row.
fn leading_header_rows<'a>(rows: &[ElementRef<'a>]) -> Vec<ElementRef<'a>> {
    let mut header_rows: Vec<ElementRef<'a>> = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let is_header = is_marked_header_row(row)
            || match index {
                0 => looks_like_labels(row),
                1 => header_rows.first().is_some_and(|first| has_spans(first)),
                _ => false,
            };

        if !is_header {
            break;
        }
        header_rows.push(*row);
    }

    header_rows
}

fn is_marked_header_row(row: &ElementRef<'_>) -> bool {
    let in_thead = row
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| parent.value().name() == "thead");

    in_thead || (row.select(&TH).next().is_some() && row.select(&TD).next().is_none())
}

fn looks_like_labels(row: &ElementRef<'_>) -> bool {
    has_spans(row)
        || row
            .select(&HEADER_CELL)
            .map(cell_text)
            .any(|label| !label.is_empty() && ColumnKind::classify(&label).is_known())
}

fn has_spans(row: &ElementRef<'_>) -> bool {
    row.select(&HEADER_CELL).any(|cell| header_cell(cell).span > 1)
}

fn header_cell(element: ElementRef<'_>) -> HeaderCell {
    let span = element
        .value()
        .attr("colspan")
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|&span| span > 0)
        .unwrap_or(1)
        .min(MAX_COLSPAN);

    HeaderCell {
        label: cell_text(element),
        span,
    }
}

/// Pair each main header with as many sub-headers as it spans.
pub fn flatten_headers(
    main: &[HeaderCell],
    sub: &[String],
    station_id: &str,
) -> Result<Vec<String>, ParseError> {
    let mut queue: VecDeque<&String> = sub.iter().collect();
    let mut flat = Vec::with_capacity(main.len());

    for cell in main {
        if cell.span == 1 {
            flat.push(cell.label.clone());
            continue;
        }

        if queue.len() < cell.span {
            return Err(ParseError::HeaderMismatch {
                station_id: station_id.to_string(),
                label: cell.label.clone(),
                expected: cell.span,
                available: queue.len(),
            });
        }

        for sub_label in queue.drain(..cell.span) {
            flat.push(format!("{} - {}", cell.label, sub_label));
        }
    }

    if !queue.is_empty() {
        warn!(
            "Ignoring {} sub-headers not claimed by any main header: {:?}",
            queue.len(),
            queue
        );
    }

    Ok(flat)
}

/// Produce the flat label list for a header block.
///
/// A main row with sub-headers is flattened, a lone main row is used
/// verbatim, and no usable
/// header text falls back to [`DEFAULT_HEADERS`].
pub fn resolve_headers(block: &HeaderBlock, station_id: &str) -> Result<Vec<String>, ParseError> {
    if !block.has_text() {
        debug!("No header text found, using default header list");
        return Ok(default_headers());
    }

    if !block.sub.is_empty() {
        return flatten_headers(&block.main, &block.sub, station_id);
    }

    Ok(block.main.iter().map(|cell| cell.label.clone()).collect())
}

pub fn default_headers() -> Vec<String> {
    DEFAULT_HEADERS.iter().map(|s| s.to_string()).collect()
}

pub fn positional_headers() -> Vec<String> {
    POSITIONAL_HEADERS.iter().map(|s| s.to_string()).collect()
}
