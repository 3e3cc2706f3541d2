pub mod config;
pub mod name;
pub mod store;


pub use config::BlobConfig;
pub use name::{generate_name, parse_name, validate_key};
pub use store::{BlobError, BlobStore, ByteStream, FsBlobStore, StoredBlob};
