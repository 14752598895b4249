use std::io::Cursor;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

/// Parses comma-delimited text with a header row into a single record batch.
///
/// Column types are inferred from every row. Rows whose field count differs
/// from the header fail the whole parse; there is no row-level recovery.
pub fn parse_csv_table(text: &str) -> Result<RecordBatch, String> {
    let format = Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(Cursor::new(text.as_bytes()), None)
        .map_err(|error| format!("Failed to infer CSV schema: {error}"))?;

    if schema.fields().is_empty() {
        return Err("CSV object has no header row".to_string());
    }

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(Cursor::new(text.as_bytes()))
        .map_err(|error| format!("Failed to build CSV reader: {error}"))?;

    let mut batches = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|error| format!("Failed to parse CSV rows: {error}"))?;
        batches.push(batch);
    }

    concat_batches(&schema, &batches)
        .map_err(|error| format!("Failed to assemble CSV table: {error}"))
}

/// Encodes a record batch as an in-memory Parquet file using writer defaults.
pub fn encode_parquet(batch: &RecordBatch) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))
        .map_err(|error| format!("Failed to create parquet writer: {error}"))?;
    writer
        .write(batch)
        .map_err(|error| format!("Failed to write parquet batch: {error}"))?;
    writer
        .close()
        .map_err(|error| format!("Failed to close parquet writer: {error}"))?;

    Ok(buffer)
}
