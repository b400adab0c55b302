//! RxNorm REST client (`https://rxnav.nlm.nih.gov/REST`).
//!
//! RxCUI resolution, concept properties, related concepts, NDC codes and
//! the single/multi drug interaction endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::ApiClient;
use super::UpstreamError;
use crate::config::AppConfig;

const SERVICE: &str = "RxNorm";

/// Term types requested from `related.json`: brand, ingredient, clinical and branded drugs.
const RELATED_TERM_TYPES: &str = "BN IN SCD SBD";

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

/// One RxNorm concept (`conceptProperties` / `properties` objects).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugConcept {
    pub rxcui: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonym: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tty: Option<String>,
}

impl DrugConcept {
    pub fn is_brand(&self) -> bool {
        self.tty.as_deref() == Some("BN")
    }

    pub fn is_ingredient(&self) -> bool {
        matches!(self.tty.as_deref(), Some("IN") | Some("PIN") | Some("MIN"))
    }
}

/// Raw interaction payload. The single-drug endpoint fills
/// `interaction_type_group`, the list endpoint fills
/// `full_interaction_type_group`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionData {
    #[serde(default)]
    pub interaction_type_group: Vec<InteractionTypeGroup>,
    #[serde(default)]
    pub full_interaction_type_group: Vec<FullInteractionTypeGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionTypeGroup {
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub interaction_type: Vec<InteractionType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionType {
    #[serde(default)]
    pub min_concept_item: Option<MinConcept>,
    #[serde(default)]
    pub interaction_pair: Vec<InteractionPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullInteractionTypeGroup {
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub full_interaction_type: Vec<FullInteractionType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullInteractionType {
    #[serde(default)]
    pub min_concept: Vec<MinConcept>,
    #[serde(default)]
    pub interaction_pair: Vec<InteractionPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionPair {
    #[serde(default)]
    pub interaction_concept: Vec<InteractionConcept>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionConcept {
    pub min_concept_item: MinConcept,
    #[serde(default)]
    pub source_concept_item: Option<SourceConcept>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinConcept {
    pub rxcui: String,
    pub name: String,
    #[serde(default)]
    pub tty: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConcept {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl InteractionData {
    /// Every interaction pair in either response shape, with its source name.
    pub fn pairs(&self) -> impl Iterator<Item = (Option<&str>, &InteractionPair)> {
        let single = self.interaction_type_group.iter().flat_map(|group| {
            group
                .interaction_type
                .iter()
                .flat_map(|t| t.interaction_pair.iter())
                .map(move |pair| (group.source_name.as_deref(), pair))
        });
        let full = self.full_interaction_type_group.iter().flat_map(|group| {
            group
                .full_interaction_type
                .iter()
                .flat_map(|t| t.interaction_pair.iter())
                .map(move |pair| (group.source_name.as_deref(), pair))
        });
        single.chain(full)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs().next().is_none()
    }
}

// ═══════════════════════════════════════════════════════════
// Trait
// ═══════════════════════════════════════════════════════════

#[async_trait]
pub trait RxNormApi: Send + Sync {
    /// Resolve a drug name to its first RxCUI. `None` when RxNorm knows no match.
    async fn get_rxcui(&self, name: &str) -> Result<Option<String>, UpstreamError>;

    async fn search_drugs(&self, name: &str) -> Result<Vec<DrugConcept>, UpstreamError>;

    async fn get_drug_details(&self, rxcui: &str) -> Result<Option<DrugConcept>, UpstreamError>;

    async fn get_related_drugs(&self, rxcui: &str) -> Result<Vec<DrugConcept>, UpstreamError>;

    async fn get_ndcs(&self, rxcui: &str) -> Result<Vec<String>, UpstreamError>;

    /// Interactions of a single drug against everything RxNorm knows.
    async fn get_interactions(&self, rxcui: &str) -> Result<InteractionData, UpstreamError>;

    /// Interactions among a set of drugs.
    async fn get_interactions_among(&self, rxcuis: &[String])
        -> Result<InteractionData, UpstreamError>;
}

// ═══════════════════════════════════════════════════════════
// Wire envelopes
// ═══════════════════════════════════════════════════════════

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdGroupResponse {
    id_group: IdGroup,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdGroup {
    #[serde(default)]
    rxnorm_id: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrugsResponse {
    drug_group: ConceptContainer,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelatedResponse {
    related_group: ConceptContainer,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConceptContainer {
    #[serde(default)]
    concept_group: Vec<ConceptGroup>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConceptGroup {
    #[serde(default)]
    tty: Option<String>,
    #[serde(default)]
    concept_properties: Vec<DrugConcept>,
}

impl ConceptContainer {
    fn into_concepts(self) -> Vec<DrugConcept> {
        self.concept_group
            .into_iter()
            .flat_map(|group| {
                let tty = group.tty;
                group.concept_properties.into_iter().map(move |mut c| {
                    if c.tty.is_none() {
                        c.tty = tty.clone();
                    }
                    c
                })
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct PropertiesResponse {
    #[serde(default)]
    properties: Option<DrugConcept>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NdcResponse {
    #[serde(default)]
    ndc_group: Option<NdcGroup>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NdcGroup {
    #[serde(default)]
    ndc_list: Option<NdcList>,
}

#[derive(Deserialize)]
struct NdcList {
    #[serde(default)]
    ndc: Vec<String>,
}

// ═══════════════════════════════════════════════════════════
// Client
// ═══════════════════════════════════════════════════════════

pub struct RxNormClient {
    http: ApiClient,
}

impl RxNormClient {
    pub fn new(http: ApiClient) -> Self {
        Self { http }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        Ok(Self::new(ApiClient::new(
            SERVICE,
            &config.rxnorm_base_url,
            config.http_timeout(),
            config.http_retries,
            config.retry_delay(),
        )?))
    }
}

#[async_trait]
impl RxNormApi for RxNormClient {
    async fn get_rxcui(&self, name: &str) -> Result<Option<String>, UpstreamError> {
        // search=2: normalized string match, falls back to approximate
        let response: Option<IdGroupResponse> = self
            .http
            .get_json_optional(
                "/rxcui.json",
                &[("name", name.trim().to_string()), ("search", "2".into())],
            )
            .await?;

        Ok(response.and_then(|r| r.id_group.rxnorm_id.into_iter().next()))
    }

    async fn search_drugs(&self, name: &str) -> Result<Vec<DrugConcept>, UpstreamError> {
        let response: Option<DrugsResponse> = self
            .http
            .get_json_optional("/drugs.json", &[("name", name.trim().to_string())])
            .await?;

        Ok(response
            .map(|r| r.drug_group.into_concepts())
            .unwrap_or_default())
    }

    async fn get_drug_details(&self, rxcui: &str) -> Result<Option<DrugConcept>, UpstreamError> {
        let response: Option<PropertiesResponse> = self
            .http
            .get_json_optional(&format!("/rxcui/{rxcui}/properties.json"), &[])
            .await?;

        Ok(response.and_then(|r| r.properties))
    }

    async fn get_related_drugs(&self, rxcui: &str) -> Result<Vec<DrugConcept>, UpstreamError> {
        let response: Option<RelatedResponse> = self
            .http
            .get_json_optional(
                &format!("/rxcui/{rxcui}/related.json"),
                &[("tty", RELATED_TERM_TYPES.to_string())],
            )
            .await?;

        Ok(response
            .map(|r| r.related_group.into_concepts())
            .unwrap_or_default())
    }

    async fn get_ndcs(&self, rxcui: &str) -> Result<Vec<String>, UpstreamError> {
        let response: Option<NdcResponse> = self
            .http
            .get_json_optional(&format!("/rxcui/{rxcui}/ndcs.json"), &[])
            .await?;

        Ok(response
            .and_then(|r| r.ndc_group)
            .and_then(|g| g.ndc_list)
            .map(|l| l.ndc)
            .unwrap_or_default())
    }

    async fn get_interactions(&self, rxcui: &str) -> Result<InteractionData, UpstreamError> {
        let response: Option<InteractionData> = self
            .http
            .get_json_optional(
                "/interaction/interaction.json",
                &[("rxcui", rxcui.to_string())],
            )
            .await?;

        Ok(response.unwrap_or_default())
    }

    async fn get_interactions_among(
        &self,
        rxcuis: &[String],
    ) -> Result<InteractionData, UpstreamError> {
        let response: Option<InteractionData> = self
            .http
            .get_json_optional("/interaction/list.json", &[("rxcuis", rxcuis.join(" "))])
            .await?;

        Ok(response.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_RESPONSE: &str = r#"{
        "fullInteractionTypeGroup": [{
            "sourceName": "DrugBank",
            "fullInteractionType": [{
                "minConcept": [
                    {"rxcui": "11289", "name": "warfarin", "tty": "IN"},
                    {"rxcui": "1191", "name": "aspirin", "tty": "IN"}
                ],
                "interactionPair": [{
                    "interactionConcept": [
                        {"minConceptItem": {"rxcui": "11289", "name": "warfarin", "tty": "IN"},
                         "sourceConceptItem": {"id": "DB00682", "name": "Warfarin", "url": "https://go.drugbank.com/drugs/DB00682"}},
                        {"minConceptItem": {"rxcui": "1191", "name": "aspirin", "tty": "IN"},
                         "sourceConceptItem": {"id": "DB00945", "name": "Aspirin", "url": "https://go.drugbank.com/drugs/DB00945"}}
                    ],
                    "severity": "N/A",
                    "description": "The risk or severity of bleeding can be increased when Aspirin is combined with Warfarin."
                }]
            }]
        }]
    }"#;

    #[test]
    fn parses_list_interaction_shape() {
        let data: InteractionData = serde_json::from_str(LIST_RESPONSE).unwrap();
        let pairs: Vec<_> = data.pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, Some("DrugBank"));
        assert_eq!(pairs[0].1.interaction_concept.len(), 2);
        assert!(!data.is_empty());
    }

    #[test]
    fn empty_payload_has_no_pairs() {
        let data: InteractionData = serde_json::from_str("{}").unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn concept_groups_inherit_group_tty() {
        let json = r#"{"relatedGroup": {"conceptGroup": [
            {"tty": "BN", "conceptProperties": [{"rxcui": "215568", "name": "Bayer"}]},
            {"tty": "IN"}
        ]}}"#;
        let response: RelatedResponse = serde_json::from_str(json).unwrap();
        let concepts = response.related_group.into_concepts();
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].tty.as_deref(), Some("BN"));
        assert!(concepts[0].is_brand());
    }

    #[test]
    fn ndc_response_without_list_is_empty() {
        let response: NdcResponse = serde_json::from_str(r#"{"ndcGroup": {"rxcui": null}}"#).unwrap();
        assert!(response.ndc_group.and_then(|g| g.ndc_list).is_none());
    }
}
