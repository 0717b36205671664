pub mod ingest_run;
pub mod job;
pub mod source;
