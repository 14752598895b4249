use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_OK: u16 = 200;
pub const STATUS_REJECTED: u16 = 400;
pub const STATUS_PROCESSING_ERROR: u16 = 500;

pub const NOT_CSV_MESSAGE: &str = "Uploaded file is not a CSV.";

/// Object-created notification as delivered by the storage event source.
///
/// Only the bucket name and object key of each record are modelled; every
/// other field of the payload is ignored during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Notification {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3NotificationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3NotificationRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Object {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceObject {
    pub bucket: String,
    pub key: String,
}

/// Invocation result returned to the event source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversionResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl ConversionResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    pub fn converted(source_key: &str, destination_bucket: &str, destination_key: &str) -> Self {
        Self::new(
            STATUS_OK,
            format!(
                "Successfully converted {source_key} to Parquet and uploaded to {destination_bucket}/{destination_key}"
            ),
        )
    }

    pub fn not_csv() -> Self {
        Self::new(STATUS_REJECTED, NOT_CSV_MESSAGE)
    }

    pub fn processing_error(source_key: Option<&str>, description: &str) -> Self {
        let body = match source_key {
            Some(key) => format!("Error processing file {key}: {description}"),
            None => format!("Error processing notification: {description}"),
        };
        Self::new(STATUS_PROCESSING_ERROR, body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationError {
    message: String,
}

impl NotificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for NotificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for NotificationError {}

/// Extracts the source location from the first record of a notification.
///
/// Records after the first are never examined. An empty record list or a
/// payload that does not match the notification shape is an error rather
/// than a panic.
pub fn extract_source_object(event: Value) -> Result<SourceObject, NotificationError> {
    if !event.is_object() {
        return Err(NotificationError::new("Notification payload must be a JSON object"));
    }

    let notification = serde_json::from_value::<S3Notification>(event)
        .map_err(|error| NotificationError::new(format!("Malformed notification: {error}")))?;

    let Some(record) = notification.records.into_iter().next() else {
        return Err(NotificationError::new("Notification contains no records"));
    };

    Ok(SourceObject {
        bucket: record.s3.bucket.name,
        key: record.s3.object.key,
    })
}
