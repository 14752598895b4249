pub const CSV_SUFFIX: &str = ".csv";
pub const PARQUET_SUFFIX: &str = ".parquet";
pub const CONVERTED_PREFIX: &str = "converted/";

/// Exact, case-sensitive suffix check performed before any storage access.
pub fn is_csv_key(key: &str) -> bool {
    key.ends_with(CSV_SUFFIX)
}

/// Derives the destination key for a converted object.
///
/// Every occurrence of `.csv` is replaced, not only the trailing one, so
/// `exports.csv/day.csv` becomes `converted/exports.parquet/day.parquet`.
/// Existing destination layouts depend on this.
pub fn destination_object_key(source_key: &str) -> String {
    format!(
        "{CONVERTED_PREFIX}{}",
        source_key.replace(CSV_SUFFIX, PARQUET_SUFFIX)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_lowercase_csv_suffix() {
        assert!(is_csv_key("data/sales.csv"));
        assert!(is_csv_key(".csv"));
        assert!(!is_csv_key("notes.txt"));
        assert!(!is_csv_key("REPORT.CSV"));
        assert!(!is_csv_key("archive.csv.gz"));
        assert!(!is_csv_key("csv"));
    }

    #[test]
    fn builds_destination_key_under_converted_prefix() {
        assert_eq!(
            destination_object_key("data/sales.csv"),
            "converted/data/sales.parquet"
        );
        assert_eq!(destination_object_key("report.csv"), "converted/report.parquet");
    }

    #[test]
    fn replaces_every_csv_occurrence_in_key() {
        assert_eq!(
            destination_object_key("exports.csv/2024/day.csv"),
            "converted/exports.parquet/2024/day.parquet"
        );
    }
}
