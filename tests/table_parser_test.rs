// Parser tests against a saved INMET station page and small hand-written tables

use weather_station_service::models::{MeasurementGroup, Wind};
use weather_station_service::parse_error::ParseError;
use weather_station_service::table_parser::{
    HeaderPolicy, ParserConfig, TableParser, DEFAULT_HEADERS, POSITIONAL_HEADERS,
};

const STATION_PAGE: &str = include_str!("fixtures/inmet_station_table.html");

fn group(current: f64, max: f64, min: f64) -> MeasurementGroup {
    MeasurementGroup { current, max, min }
}

fn table_without_headers(rows: &[&[&str]]) -> String {
    let body: String = rows
        .iter()
        .map(|cells| {
            let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
            format!("<tr>{}</tr>", tds)
        })
        .collect();
    format!("<html><body><table>{}</table></body></html>", body)
}

#[test]
fn test_station_page_headers_are_flattened() {
    let parser = TableParser::default();
    let raw = parser.extract_raw(STATION_PAGE, "A871").unwrap();

    assert_eq!(raw.main_headers.len(), 9);
    assert_eq!(raw.sub_headers.len(), 15);
    assert_eq!(raw.column_headers.len(), 19);
    assert_eq!(raw.column_headers[0], "Data");
    assert_eq!(raw.column_headers[1], "Hora (UTC)");
    assert_eq!(raw.column_headers[2], "Temperatura (°C) - Inst.");
    assert_eq!(raw.column_headers[4], "Temperatura (°C) - Mín.");
    assert_eq!(raw.column_headers[16], "Vento - Raj. (m/s)");
    assert_eq!(raw.column_headers[18], "Chuva (mm)");
}

#[test]
fn test_station_page_skips_spacer_and_footer_rows() {
    let parser = TableParser::default();
    let raw = parser.extract_raw(STATION_PAGE, "A871").unwrap();

    assert_eq!(raw.rows.len(), 3);
    assert!(raw.rows.iter().all(|row| row.len() == 19));
}

#[test]
fn test_station_page_records() {
    let parser = TableParser::default();
    let parsed = parser.parse(STATION_PAGE, "A871").unwrap();

    assert_eq!(parsed.records.len(), 3);

    let first = &parsed.records[0];
    assert_eq!(first.date.as_deref(), Some("15/10/2026"));
    assert_eq!(first.time.as_deref(), Some("1200"));
    assert_eq!(first.temperature, Some(group(24.8, 25.1, 23.9)));
    assert_eq!(first.humidity, Some(group(62.0, 65.0, 60.0)));
    assert_eq!(first.dew_point, Some(group(16.9, 17.2, 16.5)));
    assert_eq!(first.pressure, Some(group(1013.2, 1013.4, 1012.9)));
    assert_eq!(
        first.wind,
        Some(Wind {
            speed: 2.7,
            direction: 135.0,
            gust: Some(6.1)
        })
    );
    assert_eq!(first.radiation, Some(1520.4));
    assert_eq!(first.rainfall, Some(0.0));
    assert!(first.extra.is_empty());

    assert_eq!(parsed.records[1].rainfall, Some(0.2));
}

#[test]
fn test_placeholder_row_becomes_zeros() {
    let parser = TableParser::default();
    let parsed = parser.parse(STATION_PAGE, "A871").unwrap();
    let pending = &parsed.records[2];

    assert_eq!(pending.time.as_deref(), Some("1400"));
    assert_eq!(pending.temperature, Some(group(0.0, 0.0, 0.0)));
    assert_eq!(pending.pressure, Some(group(0.0, 0.0, 0.0)));
    assert_eq!(pending.radiation, Some(0.0));
    assert_eq!(pending.rainfall, Some(0.0));
}

#[test]
fn test_parsing_is_deterministic() {
    let parser = TableParser::default();
    let first = serde_json::to_string(&parser.parse(STATION_PAGE, "A871").unwrap()).unwrap();
    let second = serde_json::to_string(&parser.parse(STATION_PAGE, "A871").unwrap()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_flattening_temperature_and_rain() {
    let html = r#"<table>
        <thead>
          <tr><th colspan="3">Temperatura</th><th>Chuva</th></tr>
          <tr><th>Inst.</th><th>Máx.</th><th>Mín.</th></tr>
        </thead>
        <tbody><tr><td>21,0</td><td>23,5</td><td>19,8</td><td>0,6</td></tr></tbody>
    </table>"#;

    let parsed = TableParser::default().parse(html, "A001").unwrap();

    assert_eq!(
        parsed.column_headers,
        vec![
            "Temperatura - Inst.",
            "Temperatura - Máx.",
            "Temperatura - Mín.",
            "Chuva"
        ]
    );
    assert_eq!(parsed.records[0].temperature, Some(group(21.0, 23.5, 19.8)));
    assert_eq!(parsed.records[0].rainfall, Some(0.6));
}

#[test]
fn test_markup_without_table() {
    let html = "<html><body><p>Estação sem dados</p></body></html>";

    match TableParser::default().parse(html, "A871") {
        Err(ParseError::TableNotFound { station_id }) => assert_eq!(station_id, "A871"),
        other => panic!("Expected TableNotFound, got {:?}", other),
    }
}

#[test]
fn test_sub_header_exhaustion() {
    let html = r#"<table>
        <thead>
          <tr><th>Data</th><th colspan="3">Vento</th></tr>
          <tr><th>Vel.</th><th>Dir.</th></tr>
        </thead>
        <tbody><tr><td>01/01/2024</td><td>1</td><td>2</td><td>3</td></tr></tbody>
    </table>"#;

    match TableParser::default().parse(html, "A871") {
        Err(ParseError::HeaderMismatch {
            label,
            expected,
            available,
            ..
        }) => {
            assert_eq!(label, "Vento");
            assert_eq!(expected, 3);
            assert_eq!(available, 2);
        }
        other => panic!("Expected HeaderMismatch, got {:?}", other),
    }
}

#[test]
fn test_header_only_table_is_empty_result() {
    let html = r#"<table>
        <thead><tr><th>Data</th><th>Hora</th><th>Chuva</th></tr></thead>
        <tbody><tr><td></td><td></td><td></td></tr></tbody>
    </table>"#;

    match TableParser::default().parse(html, "A871") {
        Err(ParseError::EmptyResult { column_headers, .. }) => {
            assert_eq!(column_headers, vec!["Data", "Hora", "Chuva"]);
        }
        other => panic!("Expected EmptyResult, got {:?}", other),
    }
}

#[test]
fn test_default_headers_without_header_text() {
    let html = table_without_headers(&[&[
        "01/01/2024",
        "0000",
        "25,4/30,1/18,0",
        "61/78/55",
        "15,2",
        "1013,2",
        "3.5 m/s 180°",
        "1200",
        "0,4",
    ]]);

    let parsed = TableParser::default().parse(&html, "A871").unwrap();
    let record = &parsed.records[0];

    assert_eq!(parsed.column_headers, DEFAULT_HEADERS.to_vec());
    assert_eq!(record.temperature, Some(group(25.4, 30.1, 18.0)));
    assert_eq!(record.humidity, Some(group(61.0, 78.0, 55.0)));
    assert_eq!(record.dew_point, Some(group(15.2, 0.0, 0.0)));
    assert_eq!(record.pressure, Some(group(1013.2, 0.0, 0.0)));
    assert_eq!(
        record.wind,
        Some(Wind {
            speed: 3.5,
            direction: 180.0,
            gust: None
        })
    );
    assert_eq!(record.radiation, Some(1200.0));
    assert_eq!(record.rainfall, Some(0.4));
}

#[test]
fn test_blank_rows_dropped_partial_rows_kept() {
    let html = table_without_headers(&[&["", "", ""], &["01/01/2024", "00:00", ""]]);

    let parsed = TableParser::default().parse(&html, "A871").unwrap();

    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.records[0].date.as_deref(), Some("01/01/2024"));
    assert_eq!(parsed.records[0].time.as_deref(), Some("00:00"));
    assert_eq!(parsed.records[0].temperature, Some(group(0.0, 0.0, 0.0)));
    assert!(parsed.records[0].rainfall.is_none());
}

#[test]
fn test_positional_layout_for_unlabelled_wide_table() {
    let row: &[&str] = &[
        "15/10/2026", "1200", "24,8", "25,1", "23,9", "62", "65", "60", "16,9", "17,2", "16,5",
        "1013,2", "1013,4", "1012,9", "2,7", "135", "6,1", "1520,4", "0,0",
    ];
    let html = table_without_headers(&[row]);

    let parsed = TableParser::default().parse(&html, "A871").unwrap();
    let record = &parsed.records[0];

    assert_eq!(parsed.column_headers, POSITIONAL_HEADERS.to_vec());
    assert_eq!(record.temperature, Some(group(24.8, 25.1, 23.9)));
    assert_eq!(record.pressure, Some(group(1013.2, 1013.4, 1012.9)));
    assert_eq!(record.wind.and_then(|w| w.gust), Some(6.1));
    assert_eq!(record.radiation, Some(1520.4));
}

#[test]
fn test_positional_layout_can_be_disabled() {
    let row: Vec<String> = (0..19).map(|i| i.to_string()).collect();
    let cells: Vec<&str> = row.iter().map(String::as_str).collect();
    let html = table_without_headers(&[&cells]);

    let parser = TableParser::new(&ParserConfig {
        positional_fallback: false,
        ..ParserConfig::default()
    })
    .unwrap();
    let raw = parser.extract_raw(&html, "A871").unwrap();

    assert_eq!(raw.column_headers, DEFAULT_HEADERS.to_vec());
}

#[test]
fn test_unknown_columns_pass_through() {
    let html = r#"<table>
        <tr><th>Data</th><th>Hora</th><th>Visibilidade Horizontal</th></tr>
        <tr><td>01/01/2024</td><td>0000</td><td>10 km</td></tr>
    </table>"#;

    let parsed = TableParser::default().parse(html, "A871").unwrap();

    assert_eq!(
        parsed.records[0].extra.get("visibilidade_horizontal").map(String::as_str),
        Some("10 km")
    );
}

#[test]
fn test_custom_selector_picks_marked_table() {
    let html = r#"<html><body>
        <table><tr><td>menu</td><td>a</td><td>b</td></tr></table>
        <table id="weatherTable">
          <tr><th>Data</th><th>Hora</th><th>Chuva</th></tr>
          <tr><td>01/01/2024</td><td>0100</td><td>2,5</td></tr>
        </table>
    </body></html>"#;

    let parser = TableParser::new(&ParserConfig {
        table_selectors: vec!["#weatherTable".to_string()],
        ..ParserConfig::default()
    })
    .unwrap();
    let parsed = parser.parse(html, "A871").unwrap();

    assert_eq!(parsed.records[0].rainfall, Some(2.5));
}

#[test]
fn test_invalid_selector_rejected() {
    let result = TableParser::new(&ParserConfig {
        table_selectors: vec!["table[".to_string()],
        ..ParserConfig::default()
    });

    assert!(matches!(result, Err(ParseError::InvalidSelector { .. })));
}

#[test]
fn test_single_row_policy_on_station_page() {
    let parser = TableParser::new(&ParserConfig {
        header_policy: HeaderPolicy::SingleRow,
        ..ParserConfig::default()
    })
    .unwrap();

    let parsed = parser.parse(STATION_PAGE, "A871").unwrap();

    assert_eq!(parsed.records.len(), 3);
    assert_eq!(parsed.records[0].date.as_deref(), Some("15/10/2026"));
    assert_eq!(parsed.column_headers[2], "Temperatura (°C)");
}

#[test]
fn test_header_rows_rendered_with_td_cells() {
    let html = r#"<table>
        <tr><td>Data</td><td>Hora</td><td colspan="3">Temperatura</td><td>Chuva</td></tr>
        <tr><td>Inst.</td><td>Máx.</td><td>Mín.</td></tr>
        <tr><td>01/01/2024</td><td>0000</td><td>21,0</td><td>23,5</td><td>19,8</td><td>0,6</td></tr>
    </table>"#;

    let parsed = TableParser::default().parse(html, "A871").unwrap();

    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.records[0].date.as_deref(), Some("01/01/2024"));
    assert_eq!(parsed.records[0].temperature, Some(group(21.0, 23.5, 19.8)));
    assert_eq!(parsed.records[0].rainfall, Some(0.6));
}

#[test]
fn test_huge_colspan_is_header_mismatch() {
    let html = r#"<table>
        <thead>
          <tr><th colspan="100000000000">Temperatura</th></tr>
          <tr><th>Inst.</th></tr>
        </thead>
        <tbody><tr><td>21,0</td><td>23,5</td><td>19,8</td></tr></tbody>
    </table>"#;

    assert!(matches!(
        TableParser::default().parse(html, "A871"),
        Err(ParseError::HeaderMismatch { .. })
    ));
}
