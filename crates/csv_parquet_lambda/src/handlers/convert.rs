use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapters::object_store::ObjectStore;
use crate::encoding::{encode_parquet, parse_csv_table};
use crate::runtime::config::ConverterConfig;
use crate::runtime::contract::{
    extract_source_object, ConversionResponse, SourceObject, NOT_CSV_MESSAGE,
    STATUS_PROCESSING_ERROR, STATUS_REJECTED,
};
use crate::runtime::storage_keys::{destination_object_key, is_csv_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionErrorKind {
    InvalidInput,
    MalformedNotification,
    ReadFailure,
    DecodeFailure,
    ParseFailure,
    EncodeFailure,
    WriteFailure,
}

impl ConversionErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid-input",
            Self::MalformedNotification => "malformed-notification",
            Self::ReadFailure => "read-failure",
            Self::DecodeFailure => "decode-failure",
            Self::ParseFailure => "parse-failure",
            Self::EncodeFailure => "encode-failure",
            Self::WriteFailure => "write-failure",
        }
    }

    pub fn status_code(self) -> u16 {
        match self {
            Self::InvalidInput => STATUS_REJECTED,
            _ => STATUS_PROCESSING_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub kind: ConversionErrorKind,
    pub object_key: Option<String>,
    pub message: String,
}

impl ConversionError {
    fn new(
        kind: ConversionErrorKind,
        object_key: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            object_key: object_key.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn to_response(&self) -> ConversionResponse {
        match self.kind {
            ConversionErrorKind::InvalidInput => ConversionResponse::not_csv(),
            _ => ConversionResponse::processing_error(self.object_key.as_deref(), &self.message),
        }
    }
}

impl std::fmt::Display for ConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for ConversionError {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversionSuccess {
    pub source_bucket: String,
    pub source_key: String,
    pub destination_bucket: String,
    pub destination_key: String,
    pub rows: usize,
    pub columns: usize,
    pub artifact_bytes: usize,
}

impl ConversionSuccess {
    pub fn to_response(&self) -> ConversionResponse {
        ConversionResponse::converted(
            &self.source_key,
            &self.destination_bucket,
            &self.destination_key,
        )
    }
}

/// Runs one conversion and normalizes the outcome into the event response.
pub fn handle_conversion_event(
    event: Value,
    config: &ConverterConfig,
    store: &impl ObjectStore,
) -> ConversionResponse {
    let started_at = Instant::now();

    match convert_notification(event, config, store) {
        Ok(success) => {
            log_converter_info(
                "conversion_completed",
                json!({
                    "source_key": success.source_key.clone(),
                    "destination_bucket": success.destination_bucket.clone(),
                    "destination_key": success.destination_key.clone(),
                    "rows": success.rows,
                    "duration_ms": started_at.elapsed().as_millis(),
                }),
            );
            success.to_response()
        }
        Err(error) if error.kind == ConversionErrorKind::InvalidInput => error.to_response(),
        Err(error) => {
            log_converter_error(
                "conversion_failed",
                json!({
                    "kind": error.kind.as_str(),
                    "source_key": error.object_key.clone(),
                    "duration_ms": started_at.elapsed().as_millis(),
                    "error": error.message.clone(),
                }),
            );
            error.to_response()
        }
    }
}

/// Validates the notification, applies the CSV guard, and converts the first
/// record's object.
pub fn convert_notification(
    event: Value,
    config: &ConverterConfig,
    store: &impl ObjectStore,
) -> Result<ConversionSuccess, ConversionError> {
    let source = extract_source_object(event).map_err(|error| {
        ConversionError::new(ConversionErrorKind::MalformedNotification, None, error.message())
    })?;

    log_converter_info(
        "conversion_started",
        json!({
            "source_bucket": source.bucket.clone(),
            "source_key": source.key.clone(),
        }),
    );

    if !is_csv_key(&source.key) {
        log_converter_info(
            "conversion_skipped",
            json!({
                "source_key": source.key.clone(),
                "reason": NOT_CSV_MESSAGE,
            }),
        );
        return Err(ConversionError::new(
            ConversionErrorKind::InvalidInput,
            Some(&source.key),
            NOT_CSV_MESSAGE,
        ));
    }

    convert_source_object(&source, config, store)
}

pub fn convert_source_object(
    source: &SourceObject,
    config: &ConverterConfig,
    store: &impl ObjectStore,
) -> Result<ConversionSuccess, ConversionError> {
    let key = Some(source.key.as_str());

    let raw = store
        .read_object(&source.bucket, &source.key)
        .map_err(|error| {
            ConversionError::new(
                ConversionErrorKind::ReadFailure,
                key,
                format!("Failed to read source object: {error}"),
            )
        })?;

    let text = String::from_utf8(raw).map_err(|error| {
        ConversionError::new(
            ConversionErrorKind::DecodeFailure,
            key,
            format!("Source object is not valid UTF-8: {error}"),
        )
    })?;

    let table = parse_csv_table(&text)
        .map_err(|error| ConversionError::new(ConversionErrorKind::ParseFailure, key, error))?;
    log_converter_info(
        "csv_parsed",
        json!({
            "source_key": source.key.clone(),
            "rows": table.num_rows(),
            "columns": table.num_columns(),
        }),
    );

    let body = encode_parquet(&table)
        .map_err(|error| ConversionError::new(ConversionErrorKind::EncodeFailure, key, error))?;
    log_converter_info(
        "parquet_encoded",
        json!({
            "source_key": source.key.clone(),
            "bytes": body.len(),
        }),
    );

    let destination_key = destination_object_key(&source.key);
    store
        .write_object(&config.destination_bucket, &destination_key, &body)
        .map_err(|error| {
            ConversionError::new(
                ConversionErrorKind::WriteFailure,
                key,
                format!("Failed to write parquet object: {error}"),
            )
        })?;
    log_converter_info(
        "parquet_uploaded",
        json!({
            "destination_bucket": config.destination_bucket.clone(),
            "destination_key": destination_key.clone(),
        }),
    );

    Ok(ConversionSuccess {
        source_bucket: source.bucket.clone(),
        source_key: source.key.clone(),
        destination_bucket: config.destination_bucket.clone(),
        destination_key,
        rows: table.num_rows(),
        columns: table.num_columns(),
        artifact_bytes: body.len(),
    })
}

fn log_converter_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "converter",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_converter_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "converter",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use arrow::array::{Array, Int64Array};
    use bytes::Bytes;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    use super::*;

    struct RecordingStore {
        objects: Mutex<HashMap<(String, String), Vec<u8>>>,
        reads: Mutex<Vec<(String, String)>>,
        writes: Mutex<Vec<(String, String)>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                objects: Mutex::new(HashMap::new()),
                reads: Mutex::new(Vec::new()),
                writes: Mutex::new(Vec::new()),
            }
        }

        fn with_object(bucket: &str, key: &str, body: &[u8]) -> Self {
            let store = Self::new();
            store
                .objects
                .lock()
                .expect("poisoned mutex")
                .insert((bucket.to_string(), key.to_string()), body.to_vec());
            store
        }

        fn reads(&self) -> Vec<(String, String)> {
            self.reads.lock().expect("poisoned mutex").clone()
        }

        fn writes(&self) -> Vec<(String, String)> {
            self.writes.lock().expect("poisoned mutex").clone()
        }

        fn body(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
            self.objects
                .lock()
                .expect("poisoned mutex")
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
        }
    }

    impl ObjectStore for RecordingStore {
        fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
            self.reads
                .lock()
                .expect("poisoned mutex")
                .push((bucket.to_string(), key.to_string()));
            self.body(bucket, key)
                .ok_or_else(|| format!("NoSuchKey: {bucket}/{key}"))
        }

        fn write_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
            self.writes
                .lock()
                .expect("poisoned mutex")
                .push((bucket.to_string(), key.to_string()));
            self.objects
                .lock()
                .expect("poisoned mutex")
                .insert((bucket.to_string(), key.to_string()), body.to_vec());
            Ok(())
        }
    }

    struct RejectingWriteStore {
        source: Vec<u8>,
    }

    impl ObjectStore for RejectingWriteStore {
        fn read_object(&self, _bucket: &str, _key: &str) -> Result<Vec<u8>, String> {
            Ok(self.source.clone())
        }

        fn write_object(&self, bucket: &str, key: &str, _body: &[u8]) -> Result<(), String> {
            Err(format!("AccessDenied: {bucket}/{key}"))
        }
    }

    fn notification(bucket: &str, key: &str) -> Value {
        json!({
            "Records": [
                {
                    "eventSource": "aws:s3",
                    "s3": {
                        "bucket": { "name": bucket },
                        "object": { "key": key }
                    }
                }
            ]
        })
    }

    fn config() -> ConverterConfig {
        ConverterConfig::default()
    }

    #[test]
    fn converts_csv_into_parquet_under_converted_prefix() {
        let store = RecordingStore::with_object("landing", "data/sales.csv", b"a,b\n1,2\n3,4");

        let response =
            handle_conversion_event(notification("landing", "data/sales.csv"), &config(), &store);

        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.body,
            "Successfully converted data/sales.csv to Parquet and uploaded to pgi-parquet-output-bucket/converted/data/sales.parquet"
        );
        assert_eq!(
            store.writes(),
            vec![(
                "pgi-parquet-output-bucket".to_string(),
                "converted/data/sales.parquet".to_string()
            )]
        );

        let body = store
            .body("pgi-parquet-output-bucket", "converted/data/sales.parquet")
            .expect("parquet object should be written");
        let batches = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(body))
            .expect("parquet reader should initialize")
            .build()
            .expect("parquet reader should build")
            .collect::<Result<Vec<_>, _>>()
            .expect("parquet batches should decode");
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).name(), "a");
        assert_eq!(batch.schema().field(1).name(), "b");
        let a = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("a should be int64");
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![Some(1), Some(3)]);
    }

    #[test]
    fn rejects_non_csv_key_without_storage_access() {
        let store = RecordingStore::with_object("landing", "notes.txt", b"hello");

        let response =
            handle_conversion_event(notification("landing", "notes.txt"), &config(), &store);

        assert_eq!(response.status_code, 400);
        assert_eq!(response.body, "Uploaded file is not a CSV.");
        assert!(store.reads().is_empty());
        assert!(store.writes().is_empty());
    }

    #[test]
    fn guard_is_case_sensitive() {
        let store = RecordingStore::with_object("landing", "REPORT.CSV", b"a\n1");

        let error = convert_notification(notification("landing", "REPORT.CSV"), &config(), &store)
            .expect_err("uppercase suffix should be rejected");

        assert_eq!(error.kind, ConversionErrorKind::InvalidInput);
        assert_eq!(error.kind.status_code(), 400);
        assert!(store.reads().is_empty());
    }

    #[test]
    fn empty_notification_is_processing_error_without_io() {
        let store = RecordingStore::new();

        let response = handle_conversion_event(json!({ "Records": [] }), &config(), &store);

        assert_eq!(response.status_code, 500);
        assert_eq!(
            response.body,
            "Error processing notification: Notification contains no records"
        );
        assert!(store.reads().is_empty());
        assert!(store.writes().is_empty());
    }

    #[test]
    fn only_first_record_is_converted() {
        let store = RecordingStore::with_object("landing", "first.csv", b"x\n1\n");
        let mut event = notification("landing", "first.csv");
        event["Records"]
            .as_array_mut()
            .expect("records should be an array")
            .push(notification("landing", "second.csv")["Records"][0].clone());

        let success = convert_notification(event, &config(), &store).expect("first record converts");

        assert_eq!(success.source_key, "first.csv");
        assert_eq!(
            store.reads(),
            vec![("landing".to_string(), "first.csv".to_string())]
        );
        assert_eq!(store.writes().len(), 1);
    }

    #[test]
    fn ragged_rows_fail_without_destination_write() {
        let store = RecordingStore::with_object("landing", "bad.csv", b"a,b\n1,2\n3\n");

        let response =
            handle_conversion_event(notification("landing", "bad.csv"), &config(), &store);

        assert_eq!(response.status_code, 500);
        assert!(response.body.starts_with("Error processing file bad.csv: "));
        assert!(store.writes().is_empty());

        let error = convert_notification(notification("landing", "bad.csv"), &config(), &store)
            .expect_err("ragged csv should fail");
        assert_eq!(error.kind, ConversionErrorKind::ParseFailure);
    }

    #[test]
    fn empty_object_is_parse_failure() {
        let store = RecordingStore::with_object("landing", "report.csv", b"");

        let error = convert_notification(notification("landing", "report.csv"), &config(), &store)
            .expect_err("empty csv should fail");

        assert_eq!(error.kind, ConversionErrorKind::ParseFailure);
        assert_eq!(error.object_key.as_deref(), Some("report.csv"));
        assert_eq!(
            error.to_response().body,
            "Error processing file report.csv: CSV object has no header row"
        );
        assert!(store.writes().is_empty());
    }

    #[test]
    fn header_only_object_converts_to_empty_table() {
        let store = RecordingStore::with_object("landing", "report.csv", b"a,b\n");

        let success = convert_notification(notification("landing", "report.csv"), &config(), &store)
            .expect("header-only csv should convert");

        assert_eq!(success.rows, 0);
        assert_eq!(success.columns, 2);
        assert_eq!(success.destination_key, "converted/report.parquet");
    }

    #[test]
    fn invalid_utf8_is_decode_failure() {
        let store = RecordingStore::with_object("landing", "latin1.csv", &[0x61, 0x0a, 0xff, 0xfe]);

        let error = convert_notification(notification("landing", "latin1.csv"), &config(), &store)
            .expect_err("invalid utf-8 should fail");

        assert_eq!(error.kind, ConversionErrorKind::DecodeFailure);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn missing_source_object_is_read_failure() {
        let store = RecordingStore::new();

        let error = convert_notification(notification("landing", "gone.csv"), &config(), &store)
            .expect_err("missing object should fail");

        assert_eq!(error.kind, ConversionErrorKind::ReadFailure);
        assert!(error.message.contains("NoSuchKey"));
        assert_eq!(
            error.to_string(),
            "read-failure: Failed to read source object: NoSuchKey: landing/gone.csv"
        );
    }

    #[test]
    fn write_rejection_is_write_failure() {
        let store = RejectingWriteStore {
            source: b"a\n1\n".to_vec(),
        };

        let response = handle_conversion_event(notification("landing", "ok.csv"), &config(), &store);

        assert_eq!(response.status_code, 500);
        assert_eq!(
            response.body,
            "Error processing file ok.csv: Failed to write parquet object: AccessDenied: pgi-parquet-output-bucket/converted/ok.parquet"
        );
    }

    #[test]
    fn inner_csv_segments_are_rewritten_in_destination_key() {
        let store = RecordingStore::with_object("landing", "exports.csv/day.csv", b"a\n1\n");

        let success =
            convert_notification(notification("landing", "exports.csv/day.csv"), &config(), &store)
                .expect("conversion should succeed");

        assert_eq!(success.destination_key, "converted/exports.parquet/day.parquet");
    }

    #[test]
    fn writes_to_configured_destination_bucket() {
        let store = RecordingStore::with_object("landing", "a.csv", b"a\n1\n");
        let config = ConverterConfig {
            destination_bucket: "curated".to_string(),
        };

        let success = convert_notification(notification("landing", "a.csv"), &config, &store)
            .expect("conversion should succeed");

        assert_eq!(success.destination_bucket, "curated");
        assert!(store.body("curated", "converted/a.parquet").is_some());
    }
}
