//! Cell value coercion.
//!
//! Every function here is total: malformed, blank or placeholder cells
//! degrade to the `0.0` sentinel instead of failing the row.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::models::{MeasurementGroup, WeatherRecord, Wind};

static WIND_SPEED_AND_DIRECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:[.,]\d+)?)\s*m/s.*?(\d+(?:[.,]\d+)?)\s*°?")
        .expect("invalid regex: wind speed and direction")
});

/// Brazilian thousands grouping with a decimal comma: "1.013,2"
static GROUPED_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d{1,3}(?:\.\d{3})+,\d+$").expect("invalid regex: grouped decimal")
});

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("invalid regex: first number"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Temperature,
    Humidity,
    DewPoint,
    Pressure,
}

impl GroupField {
    fn slot_in(self, record: &mut WeatherRecord) -> &mut Option<MeasurementGroup> {
        match self {
            GroupField::Temperature => &mut record.temperature,
            GroupField::Humidity => &mut record.humidity,
            GroupField::DewPoint => &mut record.dew_point,
            GroupField::Pressure => &mut record.pressure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSlot {
    Current,
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindSlot {
    Speed,
    Direction,
    Gust,
}

/// What a column means, decided once per table from its header label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Time,
    /// A measurement group; `None` slot means the cell holds the whole group
    Group(GroupField, Option<GroupSlot>),
    Wind(Option<WindSlot>),
    Radiation,
    Rainfall,
    PassThrough(String),
}

impl ColumnKind {
    /// Classify a header label by keyword, first matching rule wins.
    pub fn classify(label: &str) -> Self {
        let lower = label.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));
        let sub_label = lower.split_once(" - ").map(|(_, sub)| sub);

        if has(&["temperatura"]) {
            ColumnKind::Group(GroupField::Temperature, sub_label.and_then(group_slot))
        } else if has(&["umidade"]) {
            ColumnKind::Group(GroupField::Humidity, sub_label.and_then(group_slot))
        } else if has(&["orvalho"]) {
            ColumnKind::Group(GroupField::DewPoint, sub_label.and_then(group_slot))
        } else if has(&["pressao", "pressão"]) {
            ColumnKind::Group(GroupField::Pressure, sub_label.and_then(group_slot))
        } else if has(&["vento"]) {
            ColumnKind::Wind(sub_label.and_then(wind_slot))
        } else if has(&["radiacao", "radiação"]) {
            ColumnKind::Radiation
        } else if has(&["chuva"]) {
            ColumnKind::Rainfall
        } else if has(&["data"]) {
            ColumnKind::Date
        } else if has(&["hora"]) {
            ColumnKind::Time
        } else {
            ColumnKind::PassThrough(normalize_key(label))
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ColumnKind::PassThrough(_))
    }

    /// Write one cell into the record according to this column's meaning.
    pub fn apply(&self, raw: &str, record: &mut WeatherRecord) {
        match self {
            ColumnKind::Date => record.date = Some(raw.to_string()),
            ColumnKind::Time => record.time = Some(raw.to_string()),
            ColumnKind::Group(field, None) => {
                *field.slot_in(record) = Some(parse_multi_value(raw));
            }
            ColumnKind::Group(field, Some(slot)) => {
                let value = parse_scalar(raw);
                let group = field.slot_in(record).get_or_insert_with(Default::default);
                match slot {
                    GroupSlot::Current => group.current = value,
                    GroupSlot::Max => group.max = value,
                    GroupSlot::Min => group.min = value,
                }
            }
            ColumnKind::Wind(None) => {
                let gust = record.wind.and_then(|wind| wind.gust);
                record.wind = Some(Wind {
                    gust,
                    ..parse_wind(raw)
                });
            }
            ColumnKind::Wind(Some(slot)) => {
                let value = parse_scalar(raw);
                let wind = record.wind.get_or_insert_with(Wind::default);
                match slot {
                    WindSlot::Speed => wind.speed = value,
                    WindSlot::Direction => wind.direction = value,
                    WindSlot::Gust => wind.gust = Some(value),
                }
            }
            ColumnKind::Radiation => record.radiation = Some(parse_scalar(raw)),
            ColumnKind::Rainfall => record.rainfall = Some(parse_scalar(raw)),
            ColumnKind::PassThrough(key) => {
                record.extra.insert(key.clone(), raw.to_string());
            }
        }
    }
}

fn group_slot(sub_label: &str) -> Option<GroupSlot> {
    if sub_label.contains("inst") || sub_label.contains("atual") {
        Some(GroupSlot::Current)
    } else if sub_label.contains("máx") || sub_label.contains("max") {
        Some(GroupSlot::Max)
    } else if sub_label.contains("mín") || sub_label.contains("min") {
        Some(GroupSlot::Min)
    } else {
        None
    }
}

fn wind_slot(sub_label: &str) -> Option<WindSlot> {
    if sub_label.contains("vel") {
        Some(WindSlot::Speed)
    } else if sub_label.contains("dir") {
        Some(WindSlot::Direction)
    } else if sub_label.contains("raj") {
        Some(WindSlot::Gust)
    } else {
        None
    }
}

/// Key for an unrecognised column: lower-cased, spaces to underscores
pub fn normalize_key(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

fn is_placeholder(value: &str) -> bool {
    matches!(value, "" | "-" | "--" | "–" | "—")
}

/// Parse one number that may use a decimal comma.
pub fn parse_decimal(raw: &str) -> f64 {
    let value = raw.trim();
    if is_placeholder(value) {
        return 0.0;
    }

    let normalized = if GROUPED_DECIMAL.is_match(value) {
        value.replace('.', "").replace(',', ".")
    } else {
        value.replace(',', ".")
    };

    match normalized.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => parsed,
        _ => {
            debug!("Unparseable numeric value '{}', using 0.0", raw);
            0.0
        }
    }
}

/// A comma is a list separator only when it cannot be a decimal comma.
fn is_comma_list(value: &str) -> bool {
    value.contains(',')
        && !GROUPED_DECIMAL.is_match(value)
        && (value.contains('.') || value.matches(',').count() >= 2 || value.contains(", "))
}

fn split_components(value: &str) -> Vec<&str> {
    if value.contains('/') {
        value.split('/').collect()
    } else if is_comma_list(value) {
        value.split(',').collect()
    } else {
        vec![value]
    }
}

/// Parse a "current/max/min" cell. A lone value fills `current` only.
pub fn parse_multi_value(raw: &str) -> MeasurementGroup {
    let parts = split_components(raw.trim());
    let at = |index: usize| parts.get(index).map_or(0.0, |part| parse_decimal(part));

    MeasurementGroup {
        current: at(0),
        max: at(1),
        min: at(2),
    }
}

/// Parse a combined wind cell such as "3.5 m/s 180°".
pub fn parse_wind(raw: &str) -> Wind {
    if let Some(captures) = WIND_SPEED_AND_DIRECTION.captures(raw) {
        return Wind {
            speed: parse_decimal(&captures[1]),
            direction: parse_decimal(&captures[2]),
            gust: None,
        };
    }

    if let Some(speed) = FIRST_NUMBER.find(raw) {
        return Wind {
            speed: parse_decimal(speed.as_str()),
            direction: 0.0,
            gust: None,
        };
    }

    Wind::default()
}

/// Parse a single reading, ignoring units and other non-numeric residue.
pub fn parse_scalar(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return 0.0;
    }

    parse_decimal(&cleaned)
}
