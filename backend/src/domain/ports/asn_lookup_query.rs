//! Driving port reporting which AS owns the caller's address.

use std::net::IpAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Asn, Error};

/// Request carrying the caller's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnLookupRequest {
    pub client_ip: IpAddr,
}

/// Caller address and the AS owning it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnLookupResponse {
    pub client_host: IpAddr,
    pub asn: Option<Asn>,
}

/// Driving port for AS lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AsnLookupQuery: Send + Sync {
    /// Resolve the AS owning `request.client_ip`. A miss is not an error.
    async fn lookup(&self, request: AsnLookupRequest) -> Result<AsnLookupResponse, Error>;
}

/// Fixture query that never finds an AS.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureAsnLookupQuery;

#[async_trait]
impl AsnLookupQuery for FixtureAsnLookupQuery {
    async fn lookup(&self, request: AsnLookupRequest) -> Result<AsnLookupResponse, Error> {
        Ok(AsnLookupResponse {
            client_host: request.client_ip,
            asn: None,
        })
    }
}
