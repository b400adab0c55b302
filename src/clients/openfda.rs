//! OpenFDA drug endpoints (`https://api.fda.gov/drug`).
//!
//! Queries use Lucene-style `search` strings. OpenFDA answers "no
//! matches" with HTTP 404, which surfaces here as `None` / empty.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::ApiClient;
use super::UpstreamError;
use crate::config::AppConfig;

const SERVICE: &str = "OpenFDA";

/// Label sections relevant to interaction and contraindication screening.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugLabel {
    pub set_id: Option<String>,
    pub brand_names: Vec<String>,
    pub generic_names: Vec<String>,
    pub manufacturer: Option<String>,
    pub routes: Vec<String>,
    pub contraindications: Vec<String>,
    /// `warnings` and `warnings_and_cautions` sections combined.
    pub warnings: Vec<String>,
    pub boxed_warning: Vec<String>,
    pub adverse_reactions: Vec<String>,
    pub drug_interactions: Vec<String>,
    pub indications: Vec<String>,
    pub effective_time: Option<String>,
}

/// One MedDRA reaction term and how often it was reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdverseEventCount {
    pub term: String,
    pub count: u64,
}

#[async_trait]
pub trait OpenFdaApi: Send + Sync {
    /// First label matching the drug by generic or brand name.
    async fn get_drug_labeling(&self, name: &str) -> Result<Option<DrugLabel>, UpstreamError>;

    /// Most frequently reported reactions for a drug.
    async fn get_adverse_events(
        &self,
        name: &str,
        limit: u32,
    ) -> Result<Vec<AdverseEventCount>, UpstreamError>;
}

// ── Wire types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize, Default)]
struct RawLabel {
    #[serde(default)]
    set_id: Option<String>,
    #[serde(default)]
    effective_time: Option<String>,
    #[serde(default)]
    openfda: RawOpenFda,
    #[serde(default)]
    contraindications: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    warnings_and_cautions: Vec<String>,
    #[serde(default)]
    boxed_warning: Vec<String>,
    #[serde(default)]
    adverse_reactions: Vec<String>,
    #[serde(default)]
    drug_interactions: Vec<String>,
    #[serde(default)]
    indications_and_usage: Vec<String>,
}

#[derive(Deserialize, Default)]
struct RawOpenFda {
    #[serde(default)]
    brand_name: Vec<String>,
    #[serde(default)]
    generic_name: Vec<String>,
    #[serde(default)]
    manufacturer_name: Vec<String>,
    #[serde(default)]
    route: Vec<String>,
}

impl From<RawLabel> for DrugLabel {
    fn from(raw: RawLabel) -> Self {
        let mut warnings = raw.warnings;
        warnings.extend(raw.warnings_and_cautions);
        Self {
            set_id: raw.set_id,
            brand_names: raw.openfda.brand_name,
            generic_names: raw.openfda.generic_name,
            manufacturer: raw.openfda.manufacturer_name.into_iter().next(),
            routes: raw.openfda.route,
            contraindications: raw.contraindications,
            warnings,
            boxed_warning: raw.boxed_warning,
            adverse_reactions: raw.adverse_reactions,
            drug_interactions: raw.drug_interactions,
            indications: raw.indications_and_usage,
            effective_time: raw.effective_time,
        }
    }
}

// ── Client ──────────────────────────────────────────────────

pub struct OpenFdaClient {
    http: ApiClient,
    api_key: Option<String>,
}

impl OpenFdaClient {
    pub fn new(http: ApiClient, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        let http = ApiClient::new(
            SERVICE,
            &config.openfda_base_url,
            config.openfda_timeout(),
            config.http_retries,
            config.retry_delay(),
        )?;
        Ok(Self::new(http, config.openfda_api_key.clone()))
    }

    fn query(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }
}

/// Strip characters that would break out of a quoted Lucene term.
fn quote_term(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | ':' | '(' | ')'))
        .collect();
    format!("\"{cleaned}\"")
}

/// Lucene query matching a label by generic or brand name.
pub fn label_search_query(name: &str) -> String {
    let term = quote_term(name);
    format!("openfda.generic_name:{term} OR openfda.brand_name:{term}")
}

#[async_trait]
impl OpenFdaApi for OpenFdaClient {
    async fn get_drug_labeling(&self, name: &str) -> Result<Option<DrugLabel>, UpstreamError> {
        let params = self.query(vec![
            ("search", label_search_query(name)),
            ("limit", "1".into()),
        ]);
        let response: Option<Envelope<RawLabel>> =
            self.http.get_json_optional("/label.json", &params).await?;

        Ok(response
            .and_then(|r| r.results.into_iter().next())
            .map(DrugLabel::from))
    }

    async fn get_adverse_events(
        &self,
        name: &str,
        limit: u32,
    ) -> Result<Vec<AdverseEventCount>, UpstreamError> {
        let params = self.query(vec![
            (
                "search",
                format!("patient.drug.medicinalproduct:{}", quote_term(name)),
            ),
            ("count", "patient.reaction.reactionmeddrapt.exact".into()),
            ("limit", limit.clamp(1, 1000).to_string()),
        ]);
        let response: Option<Envelope<AdverseEventCount>> =
            self.http.get_json_optional("/event.json", &params).await?;

        Ok(response.map(|r| r.results).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_query_covers_generic_and_brand() {
        assert_eq!(
            label_search_query(" Aspirin "),
            r#"openfda.generic_name:"Aspirin" OR openfda.brand_name:"Aspirin""#
        );
    }

    #[test]
    fn quote_term_strips_lucene_syntax() {
        assert_eq!(quote_term(r#"war"farin:(x)"#), r#""warfarinx""#);
    }

    #[test]
    fn raw_label_merges_warning_sections() {
        let json = r#"{"results": [{
            "set_id": "abc",
            "openfda": {"brand_name": ["Coumadin"], "generic_name": ["WARFARIN SODIUM"], "manufacturer_name": ["BMS"], "route": ["ORAL"]},
            "contraindications": ["Pregnancy. Hemorrhagic tendencies."],
            "warnings": ["Bleeding risk."],
            "warnings_and_cautions": ["Tissue necrosis."],
            "boxed_warning": ["WARNING: BLEEDING RISK"]
        }]}"#;
        let envelope: Envelope<RawLabel> = serde_json::from_str(json).unwrap();
        let label: DrugLabel = envelope.results.into_iter().next().unwrap().into();
        assert_eq!(label.brand_names, vec!["Coumadin"]);
        assert_eq!(label.manufacturer.as_deref(), Some("BMS"));
        assert_eq!(label.warnings.len(), 2);
        assert_eq!(label.boxed_warning.len(), 1);
        assert!(label.adverse_reactions.is_empty());
    }

    #[test]
    fn event_counts_parse() {
        let json = r#"{"meta": {}, "results": [{"term": "NAUSEA", "count": 120}, {"term": "RASH", "count": 40}]}"#;
        let envelope: Envelope<AdverseEventCount> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.results[0].term, "NAUSEA");
        assert_eq!(envelope.results[1].count, 40);
    }
}
