//! Domain primitives, rules and services of the enrichment engine.
//!
//! Purpose: validate measurement submissions, enrich them with AS, vendor
//! and percentile context, and assemble a client's recent history. Nothing
//! here performs I/O directly; storage is reached through [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - AsnTable, VendorTable, PercentileScorer: read-only resolvers bundled in
//!   EnrichmentTables.
//! - validate_submission / validate_sub_test: cross-field rules.
//! - SubmissionService, HistoryService, AsnLookupService: driving port
//!   implementations.

pub mod addressing;
pub mod asn;
pub mod enrichment;
pub mod error;
pub mod measurements;
pub mod percentile;
pub mod ports;
pub mod reference_tables;
pub mod submission_rules;
pub mod vendor;

mod asn_lookup_service;
mod history_service;
mod submission_service;

pub use self::addressing::{AddressParseError, MacAddress, MacMask, PrivateIpv4};
pub use self::asn::{Asn, AsnId, AsnTable, NetworkBlock};
pub use self::asn_lookup_service::AsnLookupService;
pub use self::enrichment::EnrichmentTables;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::history_service::{DEFAULT_MAX_HISTORY_PER_CATEGORY, HistoryConfig, HistoryService};
pub use self::measurements::{
    Blocking, DeviceEntry, DnsConsistency, DnsTest, NdtTest, NewSubmission, OarcRating,
    ProtocolTest, RecordedSubmission, SessionContext, SessionId, SubTest, SubTestId,
    SubTestOwner, Submission, SubmissionBody, TcpConnect, TestCategory, TestSession, WebTest,
};
pub use self::percentile::{
    DecileBucket, Metric, ParseSaturationGateError, PercentileScorer, PercentileScores,
    SaturationGate,
};
pub use self::reference_tables::{ReferenceDistribution, ReferenceTables};
pub use self::submission_rules::{SubmissionRejection, validate_sub_test, validate_submission};
pub use self::submission_service::SubmissionService;
pub use self::vendor::{VendorRecord, VendorTable};
