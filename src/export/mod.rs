//! Durable CSV intermediate between the aggregator and the publisher.
//!
//! The processed table is written through a temp file in the destination
//! directory and renamed into place, so a run that dies mid-write leaves the
//! previous output intact. Reading the file back yields the same records.

use std::fs::File;
use std::path::Path;

use crate::aggregate::DailyFunnelCount;
use crate::error::{SinkError, SinkResult, SourceError, SourceResult};

/// Output column order, matching the [`DailyFunnelCount`] field names.
pub const OUTPUT_COLUMNS: [&str; 7] = [
    "channel",
    "state",
    "contract_period",
    "bandwidth",
    "nationality",
    "date",
    "count",
];

/// Write the aggregated table to `path` as CSV with a header row.
///
/// The write is atomic with respect to the destination: the records are
/// serialized into a temp file next to `path` and renamed over it only once
/// the serialization has completed.
pub fn write_csv(records: &[DailyFunnelCount], path: &Path) -> SinkResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let tmp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file());
        if records.is_empty() {
            // serde only emits the header row alongside the first record, so
            // an empty table writes its header explicitly.
            writer.write_record(OUTPUT_COLUMNS)?;
        }
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush().map_err(SinkError::Io)?;
    }

    tmp.persist(path).map_err(|e| SinkError::Persist {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(())
}

/// Read a processed CSV back into aggregated records.
pub fn read_csv(path: &Path) -> SourceResult<Vec<DailyFunnelCount>> {
    let file = File::open(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: DailyFunnelCount = result.map_err(|e| SourceError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(date: &str, count: u32) -> DailyFunnelCount {
        DailyFunnelCount {
            channel: "ONLINE".into(),
            state: "A".into(),
            contract_period: "12mo".into(),
            bandwidth: "100mbps".into(),
            nationality: "John Doe".into(),
            date: date.parse::<NaiveDate>().unwrap(),
            count,
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_funnel.csv");

        let records = vec![record("2024-01-01", 2), record("2024-01-03", 1)];
        write_csv(&records, &path).unwrap();

        let read_back = read_csv(&path).unwrap();
        assert_eq!(read_back, records);
    }

    #[test]
    fn test_header_row_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_csv(&[record("2024-01-01", 1)], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let header = content.lines().next().unwrap();
        assert_eq!(header, OUTPUT_COLUMNS.join(","));
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_csv(&[], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), OUTPUT_COLUMNS.join(","));
        assert!(read_csv(&path).unwrap().is_empty());
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/out.csv");

        write_csv(&[record("2024-01-01", 1)], &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_overwrite_replaces_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_csv(&[record("2024-01-01", 1), record("2024-01-02", 4)], &path).unwrap();
        write_csv(&[record("2024-02-01", 7)], &path).unwrap();

        let read_back = read_csv(&path).unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0].count, 7);
    }

    #[test]
    fn test_missing_file_is_source_error() {
        let result = read_csv(Path::new("no/such/file.csv"));
        assert!(matches!(result, Err(SourceError::Io { .. })));
    }
}
