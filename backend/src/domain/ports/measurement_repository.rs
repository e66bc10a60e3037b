//! Driven port for appending test sessions and sub-tests.

use async_trait::async_trait;

use crate::domain::{NewSubmission, RecordedSubmission, SubTest, SubTestId, SubTestOwner};

use super::define_port_error;

define_port_error! {
    /// Errors raised by measurement repository adapters.
    pub enum MeasurementRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "measurement repository connection failed: {message}",
        /// Insert failed during execution.
        Query { message: String } =>
            "measurement repository query failed: {message}",
        /// The session or web test named as owner does not exist.
        OwnerNotFound { owner: String } =>
            "measurement owner {owner} not found",
    }
}

/// Port for append-only measurement writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeasurementRepository: Send + Sync {
    /// Store a session with every sub-test it carries.
    ///
    /// Either every row is committed or none is.
    async fn record_submission(
        &self,
        submission: &NewSubmission,
    ) -> Result<RecordedSubmission, MeasurementRepositoryError>;

    /// Append one sub-test to an existing owner.
    async fn record_sub_test(
        &self,
        owner: SubTestOwner,
        sub_test: &SubTest,
    ) -> Result<SubTestId, MeasurementRepositoryError>;
}

/// Fixture repository that assigns identity zero and stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureMeasurementRepository;

#[async_trait]
impl MeasurementRepository for FixtureMeasurementRepository {
    async fn record_submission(
        &self,
        _submission: &NewSubmission,
    ) -> Result<RecordedSubmission, MeasurementRepositoryError> {
        Ok(RecordedSubmission {
            session_id: crate::domain::SessionId::new(0),
            sub_test_ids: Vec::new(),
            tcp_connect_ids: Vec::new(),
        })
    }

    async fn record_sub_test(
        &self,
        _owner: SubTestOwner,
        _sub_test: &SubTest,
    ) -> Result<SubTestId, MeasurementRepositoryError> {
        Ok(SubTestId::new(0))
    }
}
