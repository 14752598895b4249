pub use csv_parquet_core::{config, contract, storage_keys};
