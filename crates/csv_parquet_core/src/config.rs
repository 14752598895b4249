pub const DESTINATION_BUCKET_ENV: &str = "DESTINATION_BUCKET";
pub const DEFAULT_DESTINATION_BUCKET: &str = "pgi-parquet-output-bucket";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterConfig {
    pub destination_bucket: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            destination_bucket: DEFAULT_DESTINATION_BUCKET.to_string(),
        }
    }
}

impl ConverterConfig {
    /// Resolves configuration through `lookup`, falling back to defaults for
    /// unset or blank values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let destination_bucket = lookup(DESTINATION_BUCKET_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_DESTINATION_BUCKET.to_string());

        Self { destination_bucket }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}
