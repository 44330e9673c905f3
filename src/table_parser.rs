// Station table parser
//
// Turns the INMET "Tabela de Estações" markup into typed weather records:
// - locator: finds the data table among the page's tables
// - header: rebuilds flat column labels from the merged two-row header
// - rows: pulls trimmed cell text out of the body rows
// - coercion: maps label + cell text to typed measurements

pub mod coercion;
pub mod header;
pub mod locator;
pub mod rows;

use std::str::FromStr;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

pub use coercion::ColumnKind;
pub use header::{DEFAULT_HEADERS, POSITIONAL_HEADERS};
pub use locator::{TableLocator, DEFAULT_TABLE_SELECTORS};

use crate::models::{ParsedTable, RawTable, WeatherRecord};
use crate::parse_error::ParseError;
use header::HeaderBlock;

static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("invalid selector: tr"));

/// How many of the leading header rows supply labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderPolicy {
    /// Main header with colspans plus a sub-header row
    #[default]
    TwoRow,
    /// Labels from the first header row only, used verbatim
    SingleRow,
}

impl HeaderPolicy {
    fn label_rows(self) -> usize {
        match self {
            HeaderPolicy::TwoRow => 2,
            HeaderPolicy::SingleRow => 1,
        }
    }
}

impl FromStr for HeaderPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "two-row" | "tworow" | "merged" => Ok(HeaderPolicy::TwoRow),
            "single-row" | "singlerow" | "single" => Ok(HeaderPolicy::SingleRow),
            other => Err(format!("unknown header policy: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub table_selectors: Vec<String>,
    pub header_policy: HeaderPolicy,
    /// Fall back to the fixed 19-column layout when no header label is usable
    pub positional_fallback: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            table_selectors: DEFAULT_TABLE_SELECTORS.iter().map(|s| s.to_string()).collect(),
            header_policy: HeaderPolicy::default(),
            positional_fallback: true,
        }
    }
}

/// Parser for one fixed table layout.
///
/// Holds no per-call state, so a single instance can be shared across
/// requests behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TableParser {
    locator: TableLocator,
    header_policy: HeaderPolicy,
    positional_fallback: bool,
}

impl TableParser {
    pub fn new(config: &ParserConfig) -> Result<Self, ParseError> {
        Ok(Self {
            locator: TableLocator::new(config.table_selectors.as_slice())?,
            header_policy: config.header_policy,
            positional_fallback: config.positional_fallback,
        })
    }

    pub fn header_policy(&self) -> HeaderPolicy {
        self.header_policy
    }

    /// Table selectors in the order they are tried
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.locator.selectors()
    }

    /// Locate the table and reduce it to header labels and text rows.
    #[instrument(skip(self, markup), fields(markup_size = markup.len()))]
    pub fn extract_raw(&self, markup: &str, station_id: &str) -> Result<RawTable, ParseError> {
        debug!("Parsing HTML document");
        let document = Html::parse_document(markup);

        let table = self.locator.locate(&document).ok_or_else(|| {
            error!("No data table found in HTML");
            debug!(
                "HTML preview (first 500 chars): {}",
                markup.chars().take(500).collect::<String>()
            );
            ParseError::TableNotFound {
                station_id: station_id.to_string(),
            }
        })?;

        let table_rows: Vec<ElementRef<'_>> = table.select(&ROW).collect();
        let block = HeaderBlock::read(&table_rows, self.header_policy.label_rows());
        let rows = rows::extract_rows(&table_rows[block.row_count..]);

        let mut column_headers = header::resolve_headers(&block, station_id)?;
        if self.positional_fallback && Self::needs_positional_layout(&block, &column_headers, &rows)
        {
            warn!(
                "No usable header labels for a {}-column table, using positional layout",
                POSITIONAL_HEADERS.len()
            );
            column_headers = header::positional_headers();
        }

        debug!(
            "Extracted {} columns and {} data rows",
            column_headers.len(),
            rows.len()
        );

        Ok(RawTable {
            main_headers: block.main,
            sub_headers: block.sub,
            column_headers,
            rows,
        })
    }

    /// Parse markup into typed records.
    ///
    /// Structural failures are errors; malformed cell values never are.
    #[instrument(skip(self, markup), fields(markup_size = markup.len()))]
    pub fn parse(&self, markup: &str, station_id: &str) -> Result<ParsedTable, ParseError> {
        let raw = self.extract_raw(markup, station_id)?;

        let kinds: Vec<ColumnKind> = raw
            .column_headers
            .iter()
            .map(|label| ColumnKind::classify(label))
            .collect();

        let records: Vec<WeatherRecord> = raw
            .rows
            .iter()
            .enumerate()
            .map(|(index, cells)| {
                if cells.len() > kinds.len() {
                    debug!(
                        "Row {} has {} cells for {} headers, ignoring the excess",
                        index,
                        cells.len(),
                        kinds.len()
                    );
                }
                build_record(cells, &kinds)
            })
            .collect();

        if records.is_empty() {
            warn!("Table located but no data rows survived filtering");
            return Err(ParseError::EmptyResult {
                station_id: station_id.to_string(),
                column_headers: raw.column_headers,
            });
        }

        let degenerate = records.iter().filter(|r| r.is_degenerate()).count();
        if degenerate > 0 {
            warn!("{} of {} records carry no usable field", degenerate, records.len());
        }
        debug!("Successfully parsed {} records", records.len());

        Ok(ParsedTable {
            records,
            column_headers: raw.column_headers,
        })
    }

    fn needs_positional_layout(
        block: &HeaderBlock,
        column_headers: &[String],
        rows: &[Vec<String>],
    ) -> bool {
        let labels_usable =
            block.has_text() && column_headers.iter().any(|label| ColumnKind::classify(label).is_known());
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0);

        !labels_usable && widest == POSITIONAL_HEADERS.len()
    }
}

impl Default for TableParser {
    fn default() -> Self {
        Self {
            locator: TableLocator::default(),
            header_policy: HeaderPolicy::default(),
            positional_fallback: true,
        }
    }
}

fn build_record(cells: &[String], kinds: &[ColumnKind]) -> WeatherRecord {
    let mut record = WeatherRecord::default();
    for (cell, kind) in cells.iter().zip(kinds) {
        kind.apply(cell, &mut record);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_policy_from_str() {
        assert_eq!("two-row".parse::<HeaderPolicy>(), Ok(HeaderPolicy::TwoRow));
        assert_eq!("SINGLE_ROW".parse::<HeaderPolicy>(), Ok(HeaderPolicy::SingleRow));
        assert!("three-row".parse::<HeaderPolicy>().is_err());
    }

    #[test]
    fn test_build_record_short_row_leaves_fields_unset() {
        let kinds: Vec<ColumnKind> = ["Data", "Hora", "Temperatura", "Chuva"]
            .iter()
            .map(|label| ColumnKind::classify(label))
            .collect();
        let cells = vec!["01/01/2024".to_string(), "0000".to_string(), "21,3".to_string()];

        let record = build_record(&cells, &kinds);
        assert_eq!(record.date.as_deref(), Some("01/01/2024"));
        assert!(record.temperature.is_some());
        assert!(record.rainfall.is_none());
    }

    #[test]
    fn test_build_record_ignores_excess_cells() {
        let kinds = vec![ColumnKind::Date, ColumnKind::Time, ColumnKind::Rainfall];
        let cells: Vec<String> = ["01/01/2024", "0000", "1,2", "surplus"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let record = build_record(&cells, &kinds);
        assert_eq!(record.rainfall, Some(1.2));
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_single_row_policy_uses_first_row_only() {
        let html = r#"<table>
            <thead>
              <tr><th>Data</th><th>Hora</th><th colspan="2">Chuva</th></tr>
              <tr><th>Total</th><th>Intensidade</th><th>Obs.</th></tr>
            </thead>
            <tbody><tr><td>01/01/2024</td><td>0000</td><td>0,4</td><td>ok</td></tr></tbody>
        </table>"#;
        let parser = TableParser::new(&ParserConfig {
            header_policy: HeaderPolicy::SingleRow,
            ..ParserConfig::default()
        })
        .unwrap();

        let raw = parser.extract_raw(html, "A871").unwrap();
        assert_eq!(raw.column_headers, vec!["Data", "Hora", "Chuva"]);
        assert!(raw.sub_headers.is_empty());
        assert_eq!(raw.rows.len(), 1);
        assert_eq!(raw.rows[0][0], "01/01/2024");
    }
}
