//! Value normalization for the aggregation pipeline.

use chrono::{NaiveDate, NaiveDateTime};

use crate::loader::Cell;

/// Title-case a string: the first alphabetic character of each run is
/// uppercased, the rest of the run lowercased. Non-alphabetic characters
/// start a new run, so "o'neil-smith" becomes "O'Neil-Smith".
///
/// Idempotent: title-casing an already title-cased value is a no-op.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;

    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }

    out
}

/// Date/time formats the funnel export is known to produce in text cells.
const MILESTONE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

const MILESTONE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Coerce a milestone cell to a datetime.
///
/// Native datetime cells pass through; text cells are tried against the known
/// export formats. Anything else is treated as null and the row is later
/// dropped, matching the coercion semantics of the report pipeline.
pub fn parse_milestone(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Text(s) => {
            let s = s.trim();
            for fmt in MILESTONE_FORMATS {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(dt);
                }
            }
            for fmt in MILESTONE_DATE_FORMATS {
                if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                    return d.and_hms_opt(0, 0, 0);
                }
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case_lowercase() {
        assert_eq!(title_case("john doe"), "John Doe");
    }

    #[test]
    fn test_title_case_uppercase() {
        assert_eq!(title_case("JOHN DOE"), "John Doe");
    }

    #[test]
    fn test_title_case_idempotent() {
        let once = title_case("mALAYSIAN citizen");
        assert_eq!(title_case(&once), once);
    }

    #[test]
    fn test_title_case_non_alpha_boundaries() {
        assert_eq!(title_case("o'neil-smith"), "O'Neil-Smith");
    }

    #[test]
    fn test_title_case_empty() {
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_parse_milestone_datetime_cell() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_milestone(&Cell::DateTime(dt)), Some(dt));
    }

    #[test]
    fn test_parse_milestone_text_date() {
        let parsed = parse_milestone(&Cell::Text("2024-01-01".into())).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_parse_milestone_text_datetime() {
        let parsed = parse_milestone(&Cell::Text("2024-03-05 09:15:00".into())).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn test_parse_milestone_garbage_is_null() {
        assert_eq!(parse_milestone(&Cell::Text("pending".into())), None);
        assert_eq!(parse_milestone(&Cell::Empty), None);
        assert_eq!(parse_milestone(&Cell::Number(42.0)), None);
    }
}
