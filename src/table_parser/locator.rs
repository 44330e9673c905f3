use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::parse_error::ParseError;

/// Selector strategies tried in order: the class INMET renders, any table, then
/// class-name patterns seen on mirrors and older page versions.
pub const DEFAULT_TABLE_SELECTORS: &[&str] = &[
    "table.tabela_dados",
    "table",
    ".table",
    ".weather-table",
    "table.table",
    "div.table-responsive table",
    "#weatherTable",
    ".data-table",
    "[class*='table']",
];

static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("invalid selector: tr"));

#[derive(Debug, Clone)]
pub struct TableLocator {
    strategies: Vec<(String, Selector)>,
}

impl TableLocator {
    pub fn new<S: AsRef<str>>(selectors: &[S]) -> Result<Self, ParseError> {
        let strategies = selectors
            .iter()
            .map(|raw| {
                let raw = raw.as_ref().trim();
                Selector::parse(raw)
                    .map(|selector| (raw.to_string(), selector))
                    .map_err(|e| ParseError::InvalidSelector {
                        selector: raw.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { strategies })
    }

    /// Return the first element matched by the first strategy that yields a
    /// table with at least one row.
    pub fn locate<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        for (raw, selector) in &self.strategies {
            let found = document
                .select(selector)
                .find(|element| element.select(&ROW).next().is_some());

            if let Some(element) = found {
                debug!("Located table with selector '{}'", raw);
                return Some(element);
            }
            debug!("Selector '{}' matched no table with rows", raw);
        }
        None
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|(raw, _)| raw.as_str())
    }
}

impl Default for TableLocator {
    fn default() -> Self {
        Self {
            strategies: DEFAULT_TABLE_SELECTORS
                .iter()
                .map(|raw| {
                    let selector = Selector::parse(raw).expect("invalid built-in table selector");
                    (raw.to_string(), selector)
                })
                .collect(),
        }
    }
}
