//! Cross-field rules applied to submissions before anything is stored.
//!
//! Each rule is a pure predicate returning `Result<(), SubmissionRejection>`
//! so it can be exercised on its own. [`validate_submission`] and
//! [`validate_sub_test`] are the entry points used by the services; they run
//! the rules that apply to the submission kind and stop at the first
//! failure.

use serde_json::json;

use super::error::Error;
use super::measurements::{
    DeviceEntry, DnsTest, NdtTest, ProtocolTest, SessionContext, SubTest, SubTestOwner,
    Submission, SubmissionBody, WebTest,
};

/// Why a submission was rejected. `Display` is the reason reported to the
/// client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionRejection {
    #[error("missing mask or mac values")]
    MacMaskUnpaired,
    #[error("some dnssec values are missing")]
    DnssecIncomplete,
    #[error("some oarc values of transaction_id are missing")]
    OarcTransactionIdIncomplete,
    #[error("some oarc values of source_port are missing")]
    OarcSourcePortIncomplete,
    #[error("some oarc values are missing")]
    OarcRatingsMissing,
    #[error("resolver_ip_oarc is missing")]
    OarcResolverMissing,
    #[error("at least one resolver ip")]
    ResolverMissing,
    #[error("protocol test batch is empty")]
    EmptyProtocolBatch,
    #[error("devices test batch is empty")]
    EmptyDeviceBatch,
    #[error("{field} must not be blank")]
    BlankField { field: &'static str },
    #[error("{field} is malformed: {reason}")]
    MalformedInput { field: &'static str, reason: String },
    #[error("a {kind} sub-test cannot belong to {owner}")]
    OwnerMismatch { kind: &'static str, owner: String },
}

impl SubmissionRejection {
    /// Stable identifier of the failed rule.
    pub const fn rule(&self) -> &'static str {
        match self {
            Self::MacMaskUnpaired => "mac_mask_pairing",
            Self::DnssecIncomplete => "dnssec_completeness",
            Self::OarcTransactionIdIncomplete
            | Self::OarcSourcePortIncomplete
            | Self::OarcRatingsMissing
            | Self::OarcResolverMissing => "oarc_completeness",
            Self::ResolverMissing => "resolver_present",
            Self::EmptyProtocolBatch | Self::EmptyDeviceBatch => "non_empty_batch",
            Self::BlankField { .. } => "non_blank_field",
            Self::MalformedInput { .. } => "malformed_input",
            Self::OwnerMismatch { .. } => "owner_kind",
        }
    }

    /// Build a malformed-input rejection.
    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            field,
            reason: reason.into(),
        }
    }
}

impl From<SubmissionRejection> for Error {
    fn from(value: SubmissionRejection) -> Self {
        Self::invalid_request(value.to_string()).with_details(json!({ "rule": value.rule() }))
    }
}

type RuleResult = Result<(), SubmissionRejection>;

/// `mac` and `mask` on the session context are both present or both absent.
pub fn check_mac_mask_pairing(context: &SessionContext) -> RuleResult {
    if context.mac.is_some() == context.mask.is_some() {
        Ok(())
    } else {
        Err(SubmissionRejection::MacMaskUnpaired)
    }
}

/// The DO flag, AD flag and RRSIG indicator are all present or all absent.
pub fn check_dnssec_triple(test: &DnsTest) -> RuleResult {
    let present = [
        test.do_flag.is_some(),
        test.ad_flag.is_some(),
        test.rrsig.is_some(),
    ];
    if present.iter().all(|p| *p) || present.iter().all(|p| !*p) {
        Ok(())
    } else {
        Err(SubmissionRejection::DnssecIncomplete)
    }
}

/// OARC fields are coherent with the OARC resolver address.
///
/// With a resolver address, every rating/deviation pair present must be
/// complete and at least one pair must be present. Without one, no rating
/// or deviation may be present.
pub fn check_oarc_family(test: &DnsTest) -> RuleResult {
    let transaction_id = (
        test.rating_transaction_id.is_some(),
        test.std_transaction_id.is_some(),
    );
    let source_port = (
        test.rating_source_port.is_some(),
        test.std_source_port.is_some(),
    );

    if test.resolver_ip_oarc.is_none() {
        let any = transaction_id.0 || transaction_id.1 || source_port.0 || source_port.1;
        return if any {
            Err(SubmissionRejection::OarcResolverMissing)
        } else {
            Ok(())
        };
    }

    if transaction_id.0 != transaction_id.1 {
        return Err(SubmissionRejection::OarcTransactionIdIncomplete);
    }
    if source_port.0 != source_port.1 {
        return Err(SubmissionRejection::OarcSourcePortIncomplete);
    }
    if !transaction_id.0 && !source_port.0 {
        return Err(SubmissionRejection::OarcRatingsMissing);
    }
    Ok(())
}

/// At least one resolver address, Android-reported or observed by the
/// Akamai whoami probe, is present.
pub fn check_resolver_present(test: &DnsTest) -> RuleResult {
    if test.dns1_android.is_some() || test.dns2_android.is_some() || test.ns_akamai.is_some() {
        Ok(())
    } else {
        Err(SubmissionRejection::ResolverMissing)
    }
}

/// Entropy estimates are finite and non-negative.
pub fn check_entropy(test: &DnsTest) -> RuleResult {
    check_optional_measure(
        "bits_of_entropy_source_port",
        test.bits_of_entropy_source_port,
    )?;
    check_optional_measure(
        "bits_of_entropy_transaction_id",
        test.bits_of_entropy_transaction_id,
    )
}

/// Throughput and latency values are finite and non-negative.
pub fn check_ndt_measures(test: &NdtTest) -> RuleResult {
    check_non_blank("report_id", &test.report_id)?;
    check_measure("download", test.download)?;
    check_measure("upload", test.upload)?;
    check_optional_measure("avg_rtt", test.avg_rtt)?;
    check_optional_measure("max_rtt", test.max_rtt)?;
    check_optional_measure("min_rtt", test.min_rtt)?;
    check_optional_measure("ping", test.ping)?;
    check_optional_measure("retransmit_rate", test.retransmit_rate)?;
    match test.mss {
        Some(mss) if mss < 0 => Err(SubmissionRejection::malformed(
            "mss",
            format!("{mss} is negative"),
        )),
        _ => Ok(()),
    }
}

fn check_measure(field: &'static str, value: f64) -> RuleResult {
    if !value.is_finite() {
        return Err(SubmissionRejection::malformed(field, "value is not finite"));
    }
    if value < 0.0 {
        return Err(SubmissionRejection::malformed(
            field,
            format!("{value} is negative"),
        ));
    }
    Ok(())
}

fn check_optional_measure(field: &'static str, value: Option<f64>) -> RuleResult {
    value.map_or(Ok(()), |v| check_measure(field, v))
}

fn check_non_blank(field: &'static str, value: &str) -> RuleResult {
    if value.trim().is_empty() {
        Err(SubmissionRejection::BlankField { field })
    } else {
        Ok(())
    }
}

fn check_protocol(test: &ProtocolTest) -> RuleResult {
    check_non_blank("protocol_name", &test.protocol_name)
}

fn check_protocol_batch(tests: &[ProtocolTest]) -> RuleResult {
    if tests.is_empty() {
        return Err(SubmissionRejection::EmptyProtocolBatch);
    }
    tests.iter().try_for_each(check_protocol)
}

fn check_device_batch(devices: &[DeviceEntry]) -> RuleResult {
    if devices.is_empty() {
        Err(SubmissionRejection::EmptyDeviceBatch)
    } else {
        Ok(())
    }
}

fn check_dns(test: &DnsTest) -> RuleResult {
    check_resolver_present(test)?;
    check_dnssec_triple(test)?;
    check_oarc_family(test)?;
    check_entropy(test)
}

fn check_web(test: &WebTest) -> RuleResult {
    check_non_blank("report_id", &test.report_id)?;
    check_non_blank("url", &test.url)
}

/// Validate a full submission. Runs the session-context rule first, then
/// the rules of the submission kind.
///
/// # Examples
/// ```
/// use wifi_advisor::domain::{
///     DnsTest, SessionContext, Submission, SubmissionBody, SubmissionRejection,
///     validate_submission,
/// };
///
/// let submission = Submission {
///     context: SessionContext::default(),
///     body: SubmissionBody::Dns { test: DnsTest::default() },
/// };
/// assert_eq!(
///     validate_submission(&submission),
///     Err(SubmissionRejection::ResolverMissing)
/// );
/// ```
pub fn validate_submission(submission: &Submission) -> RuleResult {
    check_mac_mask_pairing(&submission.context)?;
    match &submission.body {
        SubmissionBody::Protocol { tests } => check_protocol_batch(tests),
        SubmissionBody::Devices { devices } => check_device_batch(devices),
        SubmissionBody::Dns { test } => check_dns(test),
        SubmissionBody::Ndt { test } => check_ndt_measures(test),
        SubmissionBody::Web { test, .. } => check_web(test),
    }
}

/// Validate a single sub-test appended to an existing owner.
///
/// TCP-connect entries belong to a web test; every other kind belongs to a
/// session.
pub fn validate_sub_test(owner: &SubTestOwner, sub_test: &SubTest) -> RuleResult {
    let owner_fits = matches!(owner, SubTestOwner::WebTest(_))
        == matches!(sub_test, SubTest::TcpConnect(_));
    if !owner_fits {
        return Err(SubmissionRejection::OwnerMismatch {
            kind: sub_test.kind_label(),
            owner: owner.to_string(),
        });
    }

    match sub_test {
        SubTest::Protocol(test) => check_protocol(test),
        SubTest::Device(_) | SubTest::TcpConnect(_) => Ok(()),
        SubTest::Dns(test) => check_dns(test),
        SubTest::Ndt(test) => check_ndt_measures(test),
        SubTest::Web(test) => check_web(test),
    }
}

#[cfg(test)]
#[path = "submission_rules_tests.rs"]
mod tests;
