//! External drug reference clients.
//!
//! Three thin wrappers around public drug-data REST APIs, each sitting on
//! the shared retrying [`ApiClient`]:
//! - RxNorm: RxCUI resolution, concept properties, related drugs, interactions
//! - OpenFDA: label text and adverse event counts
//! - DailyMed: structured product label (SPL) listings
//!
//! Services depend on the `*Api` traits, never on the concrete clients,
//! so tests substitute the mocks in [`mock`].

pub mod dailymed;
pub mod http;
#[cfg(test)]
pub(crate) mod mock;
pub mod openfda;
pub mod rxnorm;

use thiserror::Error;

pub use dailymed::{DailyMedApi, DailyMedClient, SplSummary};
pub use http::ApiClient;
pub use openfda::{AdverseEventCount, DrugLabel, OpenFdaApi, OpenFdaClient};
pub use rxnorm::{DrugConcept, InteractionData, RxNormApi, RxNormClient};

/// Failure talking to an upstream drug reference API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} response could not be decoded: {detail}")]
    Decode {
        service: &'static str,
        detail: String,
    },

    #[error("{service} unavailable after {attempts} attempts: {last}")]
    RetriesExhausted {
        service: &'static str,
        attempts: u32,
        last: String,
    },
}

impl UpstreamError {
    /// Name of the upstream service that failed.
    pub fn service(&self) -> &'static str {
        match self {
            Self::Http { service, .. }
            | Self::Status { service, .. }
            | Self::Decode { service, .. }
            | Self::RetriesExhausted { service, .. } => service,
        }
    }
}
