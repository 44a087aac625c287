//! Stage orchestration for the two pipeline halves.
//!
//! Each stage returns a typed error and the orchestration is fail-fast:
//! aggregation never runs on an absent table, the output file is never
//! touched by a failed run, and publishing never runs on an absent file.

use std::path::Path;

use tracing::info;

use crate::aggregate::{aggregate, DailyFunnelCount};
use crate::error::PipelineResult;
use crate::export;
use crate::loader;
use crate::sheets::{self, CredentialStore, SheetTarget, SheetsClient};

/// Outcome of a process run.
#[derive(Debug)]
pub struct ProcessOutcome {
    /// Raw rows read from the report.
    pub rows_read: usize,
    /// Aggregated daily counts, sorted ascending by date.
    pub records: Vec<DailyFunnelCount>,
}

/// Load the funnel report and aggregate it into daily counts.
pub fn process_report(input: &Path) -> PipelineResult<ProcessOutcome> {
    info!(path = %input.display(), "reading funnel report");
    let table = loader::load_report(input)?;
    info!(rows = table.len(), "report loaded");

    let records = aggregate(&table)?;
    info!(records = records.len(), "report aggregated");

    Ok(ProcessOutcome {
        rows_read: table.len(),
        records,
    })
}

/// Load, aggregate, and write the processed CSV.
pub fn process_to_csv(input: &Path, output: &Path) -> PipelineResult<ProcessOutcome> {
    let outcome = process_report(input)?;

    export::write_csv(&outcome.records, output)?;
    info!(
        path = %output.display(),
        records = outcome.records.len(),
        "processed table written"
    );

    Ok(outcome)
}

/// Read a processed CSV and overwrite the destination range with it.
///
/// The CSV is read before any credential work, so a missing file fails
/// before the network is touched. Returns the number of cells updated.
pub async fn publish_csv(
    input: &Path,
    target: &SheetTarget,
    store: &CredentialStore,
) -> PipelineResult<u64> {
    let values = sheets::values_from_csv(input)?;
    info!(path = %input.display(), rows = values.len(), "publishing processed table");

    let http = reqwest::Client::new();
    let token = store.access_token(&http).await?;

    let client = SheetsClient::new(token);
    let response = client.overwrite_range(target, values).await?;

    info!(cells = response.updated_cells, "sheet updated");
    Ok(response.updated_cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    // Header carries the export's leading space on the channel column.
    const REPORT: &str = concat!(
        " Channel,Funn Status,Nationality,Blk State,",
        "Funn Monthcontractperiod,Funnel Bandwidth,Funnel SO No,Probability 90% Date\n",
        "ONLINE,Open,john doe,A,12mo,100mbps,SO-1,2024-01-01\n",
        "ONLINE,Open,JOHN DOE,A,12mo,100mbps,SO-2,2024-01-01\n",
        "ONLINE,Lost,x,A,12mo,100mbps,SO-3,2024-01-01\n",
        "RETAIL,Open,y,A,12mo,100mbps,SO-4,2024-01-01\n",
        "DEALER,Open,jane,B,24mo,300mbps,SO-5,2024-01-03\n",
    );

    #[test]
    fn test_process_to_csv_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("report.csv");
        let output = dir.path().join("daily_funnel.csv");
        std::fs::write(&input, REPORT).unwrap();

        let outcome = process_to_csv(&input, &output).unwrap();
        assert_eq!(outcome.rows_read, 5);
        assert_eq!(outcome.records.len(), 2);

        let read_back = export::read_csv(&output).unwrap();
        assert_eq!(read_back, outcome.records);
        assert_eq!(read_back[0].nationality, "John Doe");
        assert_eq!(read_back[0].count, 2);
    }

    #[test]
    fn test_missing_report_surfaces_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = process_to_csv(
            &dir.path().join("absent.csv"),
            &dir.path().join("out.csv"),
        );
        assert!(matches!(result, Err(PipelineError::Source(_))));
    }

    #[test]
    fn test_failed_aggregation_leaves_previous_output_intact() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("report.csv");
        let output = dir.path().join("daily_funnel.csv");

        std::fs::write(&output, "previous good output").unwrap();
        // Report missing the status column: aggregation must fail.
        std::fs::write(&input, "Channel,Nationality\nONLINE,x\n").unwrap();

        let result = process_to_csv(&input, &output);
        assert!(matches!(result, Err(PipelineError::Process(_))));
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "previous good output"
        );
    }
}
