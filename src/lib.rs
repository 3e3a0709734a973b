pub mod archive;
pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod fasta;
pub mod ingest;
pub mod location;
pub mod metadata;
pub mod output;
pub mod report;
