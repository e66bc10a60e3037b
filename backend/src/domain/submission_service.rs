//! Submission domain service.
//!
//! Validates submissions, tags them with the client's AS and device vendors,
//! then hands them to the measurement repository in one write.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    DeviceVendor, MeasurementRepository, MeasurementRepositoryError, RecordSubTestRequest,
    RecordSubTestResponse, SubmissionCommand, SubmitRequest, SubmitResponse,
};
use crate::domain::{
    EnrichmentTables, Error, NewSubmission, SubmissionBody, validate_sub_test,
    validate_submission,
};

fn map_repository_error(error: MeasurementRepositoryError) -> Error {
    match error {
        MeasurementRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("measurement repository unavailable: {message}"))
        }
        MeasurementRepositoryError::Query { message } => {
            Error::internal(format!("measurement repository error: {message}"))
        }
        MeasurementRepositoryError::OwnerNotFound { owner } => {
            Error::not_found(format!("{owner} not found"))
        }
    }
}

/// Service implementing [`SubmissionCommand`].
#[derive(Clone)]
pub struct SubmissionService<R> {
    measurement_repo: Arc<R>,
    tables: Arc<EnrichmentTables>,
    clock: Arc<dyn Clock>,
}

impl<R> SubmissionService<R> {
    /// Create the service over a repository and the shared enrichment
    /// tables. Session timestamps come from `clock`.
    pub fn new(
        measurement_repo: Arc<R>,
        tables: Arc<EnrichmentTables>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            measurement_repo,
            tables,
            clock,
        }
    }

    fn device_vendors(&self, body: &SubmissionBody) -> Vec<DeviceVendor> {
        match body {
            SubmissionBody::Devices { devices } => devices
                .iter()
                .map(|device| DeviceVendor {
                    mac: device.mac,
                    mask: device.mask,
                    manufacturer: self.tables.resolve_vendor(device.mac, device.mask),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl<R> SubmissionCommand for SubmissionService<R>
where
    R: MeasurementRepository,
{
    async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse, Error> {
        let SubmitRequest {
            client_ip,
            submission,
        } = request;
        let category = submission.body.category();

        if let Err(rejection) = validate_submission(&submission) {
            debug!(
                %client_ip,
                %category,
                rule = rejection.rule(),
                %rejection,
                "submission rejected"
            );
            return Err(rejection.into());
        }

        let asn = self.tables.resolve_asn(client_ip);
        let devices = self.device_vendors(&submission.body);
        let new_submission = NewSubmission {
            client_ip,
            recorded_at: self.clock.utc(),
            asn,
            submission,
        };

        let recorded = self
            .measurement_repo
            .record_submission(&new_submission)
            .await
            .map_err(|err| {
                warn!(%client_ip, %category, error = %err, "failed to record submission");
                map_repository_error(err)
            })?;

        info!(
            session_id = %recorded.session_id,
            %category,
            sub_tests = recorded.sub_test_ids.len(),
            asn = ?asn,
            "submission recorded"
        );

        Ok(SubmitResponse {
            session_id: recorded.session_id,
            asn,
            devices,
        })
    }

    async fn record_sub_test(
        &self,
        request: RecordSubTestRequest,
    ) -> Result<RecordSubTestResponse, Error> {
        let RecordSubTestRequest { owner, sub_test } = request;

        if let Err(rejection) = validate_sub_test(&owner, &sub_test) {
            debug!(%owner, kind = sub_test.kind_label(), %rejection, "sub-test rejected");
            return Err(rejection.into());
        }

        let sub_test_id = self
            .measurement_repo
            .record_sub_test(owner, &sub_test)
            .await
            .map_err(map_repository_error)?;

        debug!(%owner, %sub_test_id, kind = sub_test.kind_label(), "sub-test recorded");
        Ok(RecordSubTestResponse { sub_test_id })
    }
}

#[cfg(test)]
#[path = "submission_service_tests.rs"]
mod tests;
