//! Scopus to HAL depositor
//!
//! Turns bibliographic records exported from Scopus into TEI notices and
//! deposits them into the HAL open archive through its SWORD endpoint.
//!
//! # Features
//!
//! - **Duplicate detection**: DOI lookup, then a title query with a phrase fallback
//! - **Identity linking**: affiliations resolved against the HAL structure referential
//! - **Alias table**: curated author identities merged before linking
//! - **Dry run**: notices written to disk without any deposit
//! - **Cached**: referential lookups are cached for the whole run
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use scopus_hal::{
//!     AliasTable, Config, HalClient, LanguageTable, Pipeline, PipelineSettings, ReportSink,
//!     source::{self, InputFormat},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Arc::new(HalClient::new(Config::from_env()?)?);
//!     let settings = PipelineSettings { upload: false, ..PipelineSettings::default() };
//!     let report = ReportSink::create("out/log.csv".as_ref())?;
//!
//!     let mut pipeline =
//!         Pipeline::new(client, settings, AliasTable::new(), LanguageTable::default(), report);
//!     let records = source::open("scopus.csv".as_ref(), InputFormat::ScopusCsv)?;
//!     pipeline.run(records).await?;
//!     Ok(())
//! }
//! ```

pub mod alias;
pub mod client;
pub mod config;
pub mod dedup;
pub mod error;
pub mod linker;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod repository;
pub mod source;
pub mod tei;

pub use alias::AliasTable;
pub use client::HalClient;
pub use config::{Config, Credentials, PipelineSettings};
pub use error::{ClientError, PipelineError, SourceError, TeiError};
pub use normalize::LanguageTable;
pub use pipeline::{BatchSummary, Pipeline, ProcessedRecord};
pub use report::ReportSink;
pub use repository::{Depositor, InMemoryRepository, Repository};
