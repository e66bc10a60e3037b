//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the measurement, history and enrichment
//! ports backed by PostgreSQL via `diesel-async` with `bb8` pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types. Validation and enrichment happen in the domain.
//! - **Internal models**: row structs (`models.rs`), table definitions
//!   (`schema.rs`) and converters (`row_mapping.rs`) never leave this module.
//! - **Atomic writes**: a submission and its sub-tests share one
//!   transaction.
//!
//! # Example
//!
//! ```ignore
//! use wifi_advisor::outbound::persistence::{DbPool, DieselMeasurementRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/wifi_advisor")).await?;
//! let repo = DieselMeasurementRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_enrichment_source;
mod diesel_history_repository;
mod diesel_measurement_repository;
mod models;
mod pool;
mod row_mapping;
mod schema;

pub use diesel_enrichment_source::DieselEnrichmentSource;
pub use diesel_history_repository::DieselHistoryRepository;
pub use diesel_measurement_repository::DieselMeasurementRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
