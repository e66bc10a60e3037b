//! Driving port for measurement submissions.
//!
//! Request handlers pass the calling client's address with the decoded
//! payload; the command validates, enriches and stores it.

use std::net::IpAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AsnId, Error, MacAddress, MacMask, SessionId, SubTest, SubTestId, SubTestOwner, Submission,
    SubmissionBody, validate_sub_test, validate_submission,
};

/// Request to store one top-level submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub client_ip: IpAddr,
    pub submission: Submission,
}

/// Vendor resolved for one submitted device.
///
/// `manufacturer` is `null` on the wire when no vendor record matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceVendor {
    pub mac: MacAddress,
    pub mask: MacMask,
    pub manufacturer: Option<String>,
}

/// Identities and enrichment assigned to a stored submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub session_id: SessionId,
    pub asn: Option<AsnId>,
    /// One entry per submitted device, in submission order. Empty for
    /// other kinds.
    pub devices: Vec<DeviceVendor>,
}

/// Request to append one sub-test to an existing owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSubTestRequest {
    pub owner: SubTestOwner,
    pub sub_test: SubTest,
}

/// Identity of an appended sub-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSubTestResponse {
    pub sub_test_id: SubTestId,
}

/// Driving port for measurement writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionCommand: Send + Sync {
    /// Validate, tag with the client's AS and store a submission.
    ///
    /// Rule violations return `ErrorCode::InvalidRequest` and write nothing.
    async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse, Error>;

    /// Validate and append a single sub-test.
    ///
    /// Returns `ErrorCode::NotFound` when the owner does not exist.
    async fn record_sub_test(
        &self,
        request: RecordSubTestRequest,
    ) -> Result<RecordSubTestResponse, Error>;
}

/// Fixture command that validates but stores nothing.
///
/// # Examples
///
/// ```rust,no_run
/// # async fn example() -> Result<(), wifi_advisor::domain::Error> {
/// use wifi_advisor::domain::ports::{FixtureSubmissionCommand, SubmissionCommand, SubmitRequest};
/// use wifi_advisor::domain::{NdtTest, SessionContext, Submission, SubmissionBody};
///
/// let request = SubmitRequest {
///     client_ip: "198.51.100.7".parse().expect("ip"),
///     submission: Submission {
///         context: SessionContext::default(),
///         body: SubmissionBody::Ndt {
///             test: NdtTest {
///                 report_id: "r-1".to_owned(),
///                 download: 10.0,
///                 upload: 2.0,
///                 avg_rtt: None,
///                 mss: None,
///                 max_rtt: None,
///                 min_rtt: None,
///                 ping: None,
///                 retransmit_rate: None,
///             },
///         },
///     },
/// };
/// let response = FixtureSubmissionCommand.submit(request).await?;
/// assert!(response.devices.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSubmissionCommand;

#[async_trait]
impl SubmissionCommand for FixtureSubmissionCommand {
    async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse, Error> {
        validate_submission(&request.submission)?;
        let devices = match &request.submission.body {
            SubmissionBody::Devices { devices } => devices
                .iter()
                .map(|device| DeviceVendor {
                    mac: device.mac,
                    mask: device.mask,
                    manufacturer: None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Ok(SubmitResponse {
            session_id: SessionId::new(0),
            asn: None,
            devices,
        })
    }

    async fn record_sub_test(
        &self,
        request: RecordSubTestRequest,
    ) -> Result<RecordSubTestResponse, Error> {
        validate_sub_test(&request.owner, &request.sub_test)?;
        Ok(RecordSubTestResponse {
            sub_test_id: SubTestId::new(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::{DeviceEntry, ErrorCode, SessionContext};

    #[rstest]
    #[tokio::test]
    async fn fixture_rejects_empty_device_batch() {
        let request = SubmitRequest {
            client_ip: "198.51.100.7".parse().expect("ip"),
            submission: Submission {
                context: SessionContext::default(),
                body: SubmissionBody::Devices { devices: vec![] },
            },
        };
        let err = FixtureSubmissionCommand
            .submit(request)
            .await
            .expect_err("empty batch");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn device_vendor_serialises_explicit_null() {
        let entry: DeviceEntry = serde_json::from_value(json!({
            "mac": "AA:BB:CC:DD:EE:FF",
            "private_ip": "192.168.1.2"
        }))
        .expect("device");
        let vendor = DeviceVendor {
            mac: entry.mac,
            mask: entry.mask,
            manufacturer: None,
        };
        let wire = serde_json::to_value(vendor).expect("serialises");
        assert_eq!(wire.get("manufacturer"), Some(&serde_json::Value::Null));
    }
}
