pub mod config;
pub mod domain;
pub mod error;
pub mod ids;
pub mod ingestion_trigger;
pub mod llm;
pub mod storage;
pub mod task_registry;
pub mod telemetry;
pub mod url_guard;

#[cfg(feature = "test-utils")]
pub mod testutil;
