//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Command`, `*Query`) are implemented by domain services
//! and called by request handlers. Driven ports (`*Repository`,
//! `EnrichmentSource`) are implemented by outbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod asn_lookup_query;
mod enrichment_source;
mod history_query;
mod history_repository;
mod measurement_repository;
mod submission_command;

#[cfg(test)]
pub use asn_lookup_query::MockAsnLookupQuery;
pub use asn_lookup_query::{
    AsnLookupQuery, AsnLookupRequest, AsnLookupResponse, FixtureAsnLookupQuery,
};
#[cfg(test)]
pub use enrichment_source::MockEnrichmentSource;
pub use enrichment_source::{EnrichmentSource, EnrichmentSourceError, FixtureEnrichmentSource};
#[cfg(test)]
pub use history_query::MockHistoryQuery;
pub use history_query::{
    DeviceHistoryItem, FixtureHistoryQuery, HistoryEntry, HistoryQuery, HistoryRequest,
    HistoryView, NdtHistoryItem, WebHistoryItem,
};
#[cfg(test)]
pub use history_repository::MockHistoryRepository;
pub use history_repository::{
    FixtureHistoryRepository, HistoryRepository, HistoryRepositoryError, SessionRecords,
    StoredRecord,
};
#[cfg(test)]
pub use measurement_repository::MockMeasurementRepository;
pub use measurement_repository::{
    FixtureMeasurementRepository, MeasurementRepository, MeasurementRepositoryError,
};
#[cfg(test)]
pub use submission_command::MockSubmissionCommand;
pub use submission_command::{
    DeviceVendor, FixtureSubmissionCommand, RecordSubTestRequest, RecordSubTestResponse,
    SubmissionCommand, SubmitRequest, SubmitResponse,
};
