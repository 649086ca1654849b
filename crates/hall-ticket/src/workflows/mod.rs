pub mod ingestion;
pub mod issuance;
pub mod registry;
pub mod transient;
