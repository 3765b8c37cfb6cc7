pub mod commands;
pub mod routes;

pub use commands::{UploadCsvCommand, UploadCsvError, UploadCsvResponse, UploadSummary};

pub use routes::ingest_routes;
