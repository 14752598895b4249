use aws_sdk_s3::primitives::ByteStream;
use csv_parquet_lambda::adapters::object_store::ObjectStore;
use csv_parquet_lambda::handlers::convert::handle_conversion_event;
use csv_parquet_lambda::runtime::config::ConverterConfig;
use csv_parquet_lambda::runtime::contract::ConversionResponse;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct S3ObjectStore {
    s3_client: aws_sdk_s3::Client,
}

impl ObjectStore for S3ObjectStore {
    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_object()
                    .bucket(bucket)
                    .key(object_key)
                    .send()
                    .await
                    .map_err(|error| format!("failed to read object from s3: {error}"))?;
                output
                    .body
                    .collect()
                    .await
                    .map(|data| data.into_bytes().to_vec())
                    .map_err(|error| format!("failed to stream object body from s3: {error}"))
            })
        })
    }

    fn write_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let body_bytes = body.to_vec();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_object()
                    .bucket(bucket)
                    .key(object_key)
                    .body(ByteStream::from(body_bytes))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to write object to s3: {error}"))
            })
        })
    }
}

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &ConverterConfig,
    store: &S3ObjectStore,
) -> Result<ConversionResponse, Error> {
    Ok(handle_conversion_event(event.payload, config, store))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = ConverterConfig::from_env();
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3ObjectStore {
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    };

    lambda_runtime::run(service_fn(|event| handle_request(event, &config, &store))).await
}
