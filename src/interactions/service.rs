use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::severity::{determine_severity, management_recommendation, InteractionSeverity};
use crate::clients::{InteractionData, RxNormApi, UpstreamError};

/// One interaction between the queried drug and another drug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub interacting_drug: String,
    pub interacting_rxcui: String,
    pub severity: InteractionSeverity,
    pub description: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clinical_effects: Vec<String>,
}

/// All interactions found for one queried drug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugInteractionCheck {
    pub drug_name: String,
    pub rxcui: String,
    pub interactions: Vec<Interaction>,
}

/// Queries RxNorm interaction endpoints and normalizes the nested response.
pub struct DrugInteractionService {
    rxnorm: Arc<dyn RxNormApi>,
}

impl DrugInteractionService {
    pub fn new(rxnorm: Arc<dyn RxNormApi>) -> Self {
        Self { rxnorm }
    }

    pub async fn check_single_drug_interactions(
        &self,
        rxcui: &str,
    ) -> Result<InteractionData, UpstreamError> {
        self.rxnorm.get_interactions(rxcui).await
    }

    /// Interactions among `rxcuis`. Fewer than two ids returns empty data without a call.
    pub async fn check_multi_drug_interactions(
        &self,
        rxcuis: &[String],
    ) -> Result<InteractionData, UpstreamError> {
        if rxcuis.len() < 2 {
            return Ok(InteractionData::default());
        }
        self.rxnorm.get_interactions_among(rxcuis).await
    }

    /// Flatten a raw RxNorm payload into one check per queried drug.
    ///
    /// In each pair the queried drug is the concept matching `primary_rxcui`,
    /// or the first concept when no primary is given. Repeated
    /// (drug, interacting drug, description) triples are dropped.
    pub fn format_interaction_results(
        data: &InteractionData,
        primary_rxcui: Option<&str>,
    ) -> Vec<DrugInteractionCheck> {
        let mut checks: IndexMap<String, DrugInteractionCheck> = IndexMap::new();
        let mut seen: HashSet<(String, String, String)> = HashSet::new();

        for (source, pair) in data.pairs() {
            let [first, second, ..] = pair.interaction_concept.as_slice() else {
                continue;
            };

            let (queried, other) = match primary_rxcui {
                Some(primary) if second.min_concept_item.rxcui == primary => (second, first),
                _ => (first, second),
            };
            let queried = &queried.min_concept_item;
            let other = &other.min_concept_item;

            let source = source.unwrap_or("RxNorm").to_string();
            let description = pair
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| format!("Interaction reported by {source}"));

            if !seen.insert((
                queried.rxcui.clone(),
                other.rxcui.clone(),
                description.clone(),
            )) {
                continue;
            }

            let severity = determine_severity(&description, pair.severity.as_deref());
            let interaction = Interaction {
                interacting_drug: other.name.clone(),
                interacting_rxcui: other.rxcui.clone(),
                severity,
                description,
                source,
                management: Some(management_recommendation(severity).to_string()),
                clinical_effects: Vec::new(),
            };

            checks
                .entry(queried.rxcui.clone())
                .or_insert_with(|| DrugInteractionCheck {
                    drug_name: queried.name.clone(),
                    rxcui: queried.rxcui.clone(),
                    interactions: Vec::new(),
                })
                .interactions
                .push(interaction);
        }

        checks.into_values().collect()
    }
}
