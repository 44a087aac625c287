//! Google Sheets publisher.
//!
//! Converts the processed table into the Sheets `ValueRange` shape and
//! overwrites the destination range through the `values.update` endpoint.
//! Every published cell is transport-safe: finite numbers go as numbers,
//! booleans as booleans, everything else as strings, and missing/NaN cells
//! as the empty string. A header row of column names is prepended.

pub mod auth;

pub use auth::{CredentialStore, StoredCredentials, SPREADSHEETS_SCOPE};

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::aggregate::DailyFunnelCount;
use crate::error::{SourceError, SourceResult, TransportResult, TransportError};
use crate::export::OUTPUT_COLUMNS;

const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Destination of a publish: spreadsheet id plus named range.
#[derive(Debug, Clone)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub range: String,
}

/// Request body of `values.update`.
#[derive(Debug, Serialize)]
struct ValueRange {
    values: Vec<Vec<Value>>,
}

/// Response of `values.update`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateResponse {
    pub spreadsheet_id: Option<String>,
    pub updated_range: Option<String>,
    pub updated_rows: u64,
    pub updated_columns: u64,
    pub updated_cells: u64,
}

/// Error body the Sheets API returns on failure.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Authenticated Sheets API client.
pub struct SheetsClient {
    http: reqwest::Client,
    access_token: String,
    endpoint: String,
}

impl SheetsClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: access_token.into(),
            endpoint: SHEETS_ENDPOINT.to_string(),
        }
    }

    /// Point the client at a different API base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Overwrite `target` with `values`, returning the update summary.
    ///
    /// Values are written with `USER_ENTERED` input semantics so the sheet
    /// parses dates and numbers the way a typing user would get.
    pub async fn overwrite_range(
        &self,
        target: &SheetTarget,
        values: Vec<Vec<Value>>,
    ) -> TransportResult<UpdateResponse> {
        let url = format!(
            "{}/{}/values/{}",
            self.endpoint, target.spreadsheet_id, target.range
        );

        info!(
            spreadsheet_id = %target.spreadsheet_id,
            range = %target.range,
            rows = values.len(),
            "writing values to sheet"
        );

        let response = self
            .http
            .put(&url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&self.access_token)
            .json(&ValueRange { values })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(TransportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

/// Convert one raw cell to its transport representation.
///
/// Finite numbers become numbers, booleans become booleans, everything else
/// stays a string. Empty and NaN cells become the empty string, never a
/// literal "nan" or null token.
pub fn cell_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return json!("");
    }

    if let Ok(n) = trimmed.parse::<f64>() {
        if !n.is_finite() {
            return json!("");
        }
        if n.fract() == 0.0 && n.abs() < 9e15 {
            return json!(n as i64);
        }
        return json!(n);
    }

    match trimmed {
        "true" | "True" | "TRUE" => json!(true),
        "false" | "False" | "FALSE" => json!(false),
        _ => json!(raw),
    }
}

/// Build the publish payload straight from aggregated records.
pub fn values_from_records(records: &[DailyFunnelCount]) -> Vec<Vec<Value>> {
    let mut values: Vec<Vec<Value>> = Vec::with_capacity(records.len() + 1);
    values.push(OUTPUT_COLUMNS.iter().map(|c| json!(c)).collect());

    for r in records {
        values.push(vec![
            json!(r.channel),
            json!(r.state),
            json!(r.contract_period),
            json!(r.bandwidth),
            json!(r.nationality),
            json!(r.date.to_string()),
            json!(r.count),
        ]);
    }

    values
}

/// Build the publish payload from the durable CSV file.
///
/// The header row is published verbatim; data cells go through
/// [`cell_value`].
pub fn values_from_csv(path: &Path) -> SourceResult<Vec<Vec<Value>>> {
    let file = File::open(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut values: Vec<Vec<Value>> = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| SourceError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

        if idx == 0 {
            values.push(record.iter().map(|h| json!(h)).collect());
        } else {
            values.push(record.iter().map(cell_value).collect());
        }
    }

    if values.is_empty() {
        return Err(SourceError::EmptyTable {
            path: path.to_path_buf(),
        });
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    #[test]
    fn test_cell_value_numbers() {
        assert_eq!(cell_value("2"), json!(2));
        assert_eq!(cell_value("3.5"), json!(3.5));
        assert_eq!(cell_value("-7"), json!(-7));
    }

    #[test]
    fn test_cell_value_missing_becomes_empty_string() {
        assert_eq!(cell_value(""), json!(""));
        assert_eq!(cell_value("   "), json!(""));
        assert_eq!(cell_value("nan"), json!(""));
        assert_eq!(cell_value("NaN"), json!(""));
        assert_eq!(cell_value("inf"), json!(""));
    }

    #[test]
    fn test_cell_value_booleans() {
        assert_eq!(cell_value("true"), json!(true));
        assert_eq!(cell_value("False"), json!(false));
    }

    #[test]
    fn test_cell_value_strings_pass_through() {
        assert_eq!(cell_value("100mbps"), json!("100mbps"));
        assert_eq!(cell_value("2024-01-01"), json!("2024-01-01"));
        assert_eq!(cell_value("INSIDE SALES"), json!("INSIDE SALES"));
    }

    #[test]
    fn test_values_from_records_prepends_header() {
        let records = vec![DailyFunnelCount {
            channel: "ONLINE".into(),
            state: "A".into(),
            contract_period: "12mo".into(),
            bandwidth: "100mbps".into(),
            nationality: "John Doe".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            count: 2,
        }];

        let values = values_from_records(&records);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0][0], json!("channel"));
        assert_eq!(values[1][5], json!("2024-01-01"));
        assert_eq!(values[1][6], json!(2));
    }

    #[test]
    fn test_values_from_csv_converts_cells() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "a,b,c\nONLINE,2,nan\n").unwrap();

        let values = values_from_csv(file.path()).unwrap();
        assert_eq!(values[0], vec![json!("a"), json!("b"), json!("c")]);
        assert_eq!(values[1], vec![json!("ONLINE"), json!(2), json!("")]);
    }

    #[test]
    fn test_values_from_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            values_from_csv(file.path()),
            Err(SourceError::EmptyTable { .. })
        ));
    }
}
