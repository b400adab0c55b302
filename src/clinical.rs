//! Clinical lookup orchestration.
//!
//! Combines RxNorm, OpenFDA and DailyMed into per-drug records and
//! interaction checks, with both results kept in TTL caches so repeat
//! lookups within the expiry window never reach the upstream APIs.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{CacheStats, CacheStore, MemoryCache, Sweepable};
use crate::clients::{
    AdverseEventCount, DailyMedApi, DrugConcept, OpenFdaApi, RxNormApi, SplSummary,
    UpstreamError,
};
use crate::interactions::{extract_clinical_effects, DrugInteractionCheck, DrugInteractionService};
use crate::models::Medication;
use crate::safety::{self, AllergyAlert, ContraindicationAlert, LabelSections};

#[derive(Debug, Error)]
pub enum ClinicalError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("No RxNorm concept found for '{0}'")]
    NotFound(String),

    #[error("No DailyMed label with set id '{0}'")]
    LabelNotFound(String),

    #[error("{0}")]
    InsufficientInput(String),
}

// ═══════════════════════════════════════════════════════════
// Result types
// ═══════════════════════════════════════════════════════════

/// Merged RxNorm + OpenFDA record for one drug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugInfo {
    pub rxcui: String,
    pub name: String,
    pub brand_names: Vec<String>,
    pub generic_names: Vec<String>,
    pub strength: Option<String>,
    pub dosage_form: Option<String>,
    pub route: Option<String>,
    pub ndc_codes: Vec<String>,
    pub contraindications: Vec<String>,
    /// Boxed warning first, then warnings and precautions.
    pub warnings: Vec<String>,
    pub adverse_effects: Vec<String>,
    pub drug_interactions_text: Vec<String>,
    pub indications: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

/// A payload plus whether it was served from cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cached<T> {
    pub data: T,
    pub cached: bool,
}

/// A requested drug name and the RxCUI it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDrug {
    pub name: String,
    pub rxcui: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionCheckResult {
    pub medications: Vec<ResolvedDrug>,
    pub interactions: Vec<DrugInteractionCheck>,
    /// Names with no RxCUI or whose lookup failed.
    pub unresolved: Vec<String>,
    pub cached: bool,
}

impl InteractionCheckResult {
    /// Requested name for an RxCUI, if it came from this request.
    pub fn requested_name(&self, rxcui: &str) -> Option<&str> {
        self.medications
            .iter()
            .find(|m| m.rxcui == rxcui)
            .map(|m| m.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalCacheStats {
    pub drug_info: CacheStats,
    pub interactions: CacheStats,
}

// ═══════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════

pub struct ClinicalApiService {
    rxnorm: Arc<dyn RxNormApi>,
    openfda: Arc<dyn OpenFdaApi>,
    dailymed: Arc<dyn DailyMedApi>,
    interactions: DrugInteractionService,
    drug_cache: Arc<MemoryCache<DrugInfo>>,
    interaction_cache: Arc<MemoryCache<Vec<DrugInteractionCheck>>>,
}

impl ClinicalApiService {
    pub fn new(
        rxnorm: Arc<dyn RxNormApi>,
        openfda: Arc<dyn OpenFdaApi>,
        dailymed: Arc<dyn DailyMedApi>,
        cache_ttl: Duration,
        cache_max_entries: usize,
    ) -> Self {
        Self {
            interactions: DrugInteractionService::new(rxnorm.clone()),
            rxnorm,
            openfda,
            dailymed,
            drug_cache: Arc::new(MemoryCache::new(cache_ttl, cache_max_entries)),
            interaction_cache: Arc::new(MemoryCache::new(cache_ttl, cache_max_entries)),
        }
    }

    /// Caches for the background sweeper.
    pub fn caches(&self) -> Vec<Arc<dyn Sweepable>> {
        vec![
            self.drug_cache.clone() as Arc<dyn Sweepable>,
            self.interaction_cache.clone() as Arc<dyn Sweepable>,
        ]
    }

    pub async fn get_drug_info(&self, name: &str) -> Result<Cached<DrugInfo>, ClinicalError> {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return Err(ClinicalError::InsufficientInput(
                "Drug name is required".into(),
            ));
        }

        if let Some(entry) = self.drug_cache.get(&key) {
            tracing::debug!(drug = %key, "Drug info cache hit");
            return Ok(Cached {
                data: entry.data,
                cached: true,
            });
        }

        let rxcui = self
            .rxnorm
            .get_rxcui(&key)
            .await?
            .ok_or_else(|| ClinicalError::NotFound(name.trim().to_string()))?;

        let (details, related, ndcs) = tokio::try_join!(
            self.rxnorm.get_drug_details(&rxcui),
            self.rxnorm.get_related_drugs(&rxcui),
            self.rxnorm.get_ndcs(&rxcui),
        )?;

        let label = match self.openfda.get_drug_labeling(&key).await {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!(drug = %key, error = %e, "OpenFDA label unavailable, continuing without it");
                None
            }
        };

        let info = build_drug_info(&key, rxcui, details, &related, ndcs, label);
        self.drug_cache.set(&key, info.clone());
        tracing::info!(drug = %key, rxcui = %info.rxcui, "Drug info fetched");

        Ok(Cached {
            data: info,
            cached: false,
        })
    }

    /// Interactions among the named drugs.
    ///
    /// Fewer than two names, or fewer than two that resolve to an RxCUI,
    /// returns an empty result. Only resolution calls are made in the
    /// second case.
    pub async fn check_drug_interactions(
        &self,
        names: &[String],
    ) -> Result<InteractionCheckResult, ClinicalError> {
        let names: Vec<&str> = names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();
        if names.len() < 2 {
            return Ok(InteractionCheckResult::default());
        }

        let lookups = join_all(names.iter().map(|name| self.rxnorm.get_rxcui(name))).await;

        let mut medications = Vec::new();
        let mut unresolved = Vec::new();
        for (name, lookup) in names.iter().zip(lookups) {
            match lookup {
                Ok(Some(rxcui)) => medications.push(ResolvedDrug {
                    name: name.to_string(),
                    rxcui,
                }),
                Ok(None) => {
                    tracing::warn!(drug = %name, "No RxCUI found, skipping");
                    unresolved.push(name.to_string());
                }
                Err(e) => {
                    tracing::warn!(drug = %name, error = %e, "RxCUI lookup failed, skipping");
                    unresolved.push(name.to_string());
                }
            }
        }

        let mut rxcuis: Vec<String> = medications.iter().map(|m| m.rxcui.clone()).collect();
        rxcuis.sort();
        rxcuis.dedup();
        if rxcuis.len() < 2 {
            return Ok(InteractionCheckResult {
                medications,
                interactions: Vec::new(),
                unresolved,
                cached: false,
            });
        }

        let key = rxcuis.join(",");
        if let Some(entry) = self.interaction_cache.get(&key) {
            tracing::debug!(rxcuis = %key, "Interaction cache hit");
            return Ok(InteractionCheckResult {
                medications,
                interactions: entry.data,
                unresolved,
                cached: true,
            });
        }

        let data = self
            .interactions
            .check_multi_drug_interactions(&rxcuis)
            .await
            .inspect_err(|e| tracing::error!(rxcuis = %key, error = %e, "Interaction lookup failed"))?;

        let mut interactions = DrugInteractionService::format_interaction_results(&data, None);
        for check in &mut interactions {
            for interaction in &mut check.interactions {
                interaction.clinical_effects = extract_clinical_effects(&interaction.description);
            }
        }

        self.interaction_cache.set(&key, interactions.clone());
        Ok(InteractionCheckResult {
            medications,
            interactions,
            unresolved,
            cached: false,
        })
    }

    pub async fn check_drug_pair(
        &self,
        drug1: &str,
        drug2: &str,
    ) -> Result<InteractionCheckResult, ClinicalError> {
        self.check_drug_interactions(&[drug1.to_string(), drug2.to_string()])
            .await
    }

    /// Allergy screen over each medication's drug name and active ingredient.
    pub fn check_drug_allergies(
        &self,
        medications: &[Medication],
        allergies: &[String],
    ) -> Vec<AllergyAlert> {
        safety::check_medication_allergies(medications, allergies)
    }

    /// Screen label text for each medication against the conditions.
    /// Medications whose info cannot be fetched are skipped.
    pub async fn check_contraindications(
        &self,
        medications: &[String],
        conditions: &[String],
    ) -> Vec<ContraindicationAlert> {
        if medications.is_empty() || conditions.is_empty() {
            return Vec::new();
        }

        let infos = join_all(medications.iter().map(|m| self.get_drug_info(m))).await;

        let mut fetched: Vec<(&str, DrugInfo)> = Vec::new();
        for (medication, info) in medications.iter().zip(infos) {
            match info {
                Ok(info) => fetched.push((medication.trim(), info.data)),
                Err(e) => {
                    tracing::warn!(drug = %medication, error = %e, "Skipping contraindication check");
                }
            }
        }

        let labels: Vec<LabelSections<'_>> = fetched
            .iter()
            .map(|(medication, info)| LabelSections {
                medication: *medication,
                contraindications: &info.contraindications,
                warnings: &info.warnings,
            })
            .collect();

        safety::check_contraindications(&labels, conditions)
    }

    pub async fn search_drugs(&self, name: &str) -> Result<Vec<DrugConcept>, ClinicalError> {
        let name = required(name)?;
        Ok(self.rxnorm.search_drugs(name).await?)
    }

    pub async fn get_adverse_events(
        &self,
        name: &str,
        limit: u32,
    ) -> Result<Vec<AdverseEventCount>, ClinicalError> {
        let name = required(name)?;
        Ok(self.openfda.get_adverse_events(name, limit).await?)
    }

    /// DailyMed product labels for a drug.
    pub async fn get_monographs(&self, name: &str) -> Result<Vec<SplSummary>, ClinicalError> {
        let name = required(name)?;
        Ok(self.dailymed.search_spls(name).await?)
    }

    /// One DailyMed label by set id.
    pub async fn get_monograph(&self, setid: &str) -> Result<SplSummary, ClinicalError> {
        let setid = setid.trim();
        if setid.is_empty() {
            return Err(ClinicalError::InsufficientInput("Set id is required".into()));
        }
        self.dailymed
            .get_spl(setid)
            .await?
            .ok_or_else(|| ClinicalError::LabelNotFound(setid.to_string()))
    }

    pub fn cache_stats(&self) -> ClinicalCacheStats {
        ClinicalCacheStats {
            drug_info: self.drug_cache.stats(),
            interactions: self.interaction_cache.stats(),
        }
    }

    pub fn clear_cache(&self) {
        self.drug_cache.clear();
        self.interaction_cache.clear();
        tracing::info!("Clinical caches cleared");
    }
}

fn required(name: &str) -> Result<&str, ClinicalError> {
    let name = name.trim();
    if name.is_empty() {
        Err(ClinicalError::InsufficientInput(
            "Drug name is required".into(),
        ))
    } else {
        Ok(name)
    }
}

// ═══════════════════════════════════════════════════════════
// Merging
// ═══════════════════════════════════════════════════════════

/// "aspirin 81 MG Oral Tablet" → ("81 MG", "Oral Tablet")
static CLINICAL_DRUG_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d.,]*\s*(?:MG|MCG|G|ML|UNT|MEQ|%)(?:/\S+)?)\s+(.+)$").unwrap()
});

fn build_drug_info(
    key: &str,
    rxcui: String,
    details: Option<DrugConcept>,
    related: &[DrugConcept],
    ndc_codes: Vec<String>,
    label: Option<crate::clients::DrugLabel>,
) -> DrugInfo {
    let name = details
        .map(|d| d.name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| key.to_string());

    let mut brand_names: Vec<String> = related
        .iter()
        .filter(|c| c.is_brand())
        .map(|c| c.name.clone())
        .collect();
    let mut generic_names: Vec<String> = related
        .iter()
        .filter(|c| c.is_ingredient())
        .map(|c| c.name.clone())
        .collect();

    let (strength, dosage_form) = related
        .iter()
        .filter(|c| c.tty.as_deref() == Some("SCD"))
        .find_map(|c| {
            CLINICAL_DRUG_NAME
                .captures(&c.name)
                .map(|caps| (caps[1].trim().to_string(), caps[2].trim().to_string()))
        })
        .unzip();

    let label = label.unwrap_or_default();
    merge_unique(&mut brand_names, &label.brand_names);
    merge_unique(&mut generic_names, &label.generic_names);

    let mut warnings = label.boxed_warning;
    warnings.extend(label.warnings);

    DrugInfo {
        rxcui,
        name,
        brand_names,
        generic_names,
        strength,
        dosage_form,
        route: label.routes.into_iter().next(),
        ndc_codes,
        contraindications: label.contraindications,
        warnings,
        adverse_effects: label.adverse_reactions,
        drug_interactions_text: label.drug_interactions,
        indications: label.indications,
        fetched_at: Utc::now(),
    }
}

/// Append names not already present, compared case-insensitively.
fn merge_unique(into: &mut Vec<String>, extra: &[String]) {
    let mut seen: HashSet<String> = into.iter().map(|n| n.to_lowercase()).collect();
    for name in extra {
        if seen.insert(name.to_lowercase()) {
            into.push(name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::mock::{MockDailyMed, MockOpenFda, MockRxNorm};
    use crate::clients::DrugLabel;
    use crate::models::ContraindicationSeverity;
    use std::sync::atomic::Ordering;

    fn concept(rxcui: &str, name: &str, tty: &str) -> DrugConcept {
        DrugConcept {
            rxcui: rxcui.into(),
            name: name.into(),
            synonym: None,
            tty: Some(tty.into()),
        }
    }

    fn service_with(
        rxnorm: Arc<MockRxNorm>,
        openfda: Arc<MockOpenFda>,
    ) -> ClinicalApiService {
        ClinicalApiService::new(
            rxnorm,
            openfda,
            Arc::new(MockDailyMed::new().with_spl("aspirin", "spl-1", "ASPIRIN tablet")),
            Duration::from_secs(3600),
            100,
        )
    }

    fn aspirin_label() -> DrugLabel {
        DrugLabel {
            brand_names: vec!["Bayer".into()],
            generic_names: vec!["ASPIRIN".into()],
            routes: vec!["ORAL".into()],
            contraindications: vec!["Do not use in patients with active bleeding.".into()],
            warnings: vec!["Reye's syndrome: use caution in children.".into()],
            boxed_warning: vec!["Stomach bleeding warning.".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn drug_info_is_cached_after_first_fetch() {
        let rxnorm = Arc::new(
            MockRxNorm::new()
                .with_drug("aspirin", "1191")
                .with_related(
                    "1191",
                    vec![
                        concept("1191", "aspirin", "IN"),
                        concept("215568", "Bayer", "BN"),
                        concept("243670", "aspirin 81 MG Oral Tablet", "SCD"),
                    ],
                )
                .with_ndcs("1191", &["0280-2000-10"]),
        );
        let openfda = Arc::new(MockOpenFda::new().with_label("aspirin", aspirin_label()));
        let service = service_with(rxnorm.clone(), openfda.clone());

        let first = service.get_drug_info("Aspirin ").await.unwrap();
        let calls_after_first = rxnorm.call_count();
        let second = service.get_drug_info("aspirin").await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.data, second.data);
        assert_eq!(rxnorm.call_count(), calls_after_first);
        assert_eq!(openfda.call_count(), 1);

        let info = second.data;
        assert_eq!(info.rxcui, "1191");
        assert_eq!(info.brand_names, vec!["Bayer"]);
        assert_eq!(info.generic_names, vec!["aspirin"]);
        assert_eq!(info.strength.as_deref(), Some("81 MG"));
        assert_eq!(info.dosage_form.as_deref(), Some("Oral Tablet"));
        assert_eq!(info.route.as_deref(), Some("ORAL"));
        assert_eq!(info.warnings[0], "Stomach bleeding warning.");
        assert_eq!(info.ndc_codes, vec!["0280-2000-10"]);
    }

    #[tokio::test]
    async fn label_failure_is_best_effort() {
        let rxnorm = Arc::new(MockRxNorm::new().with_drug("warfarin", "11289"));
        let openfda = Arc::new(MockOpenFda::new().failing());
        let service = service_with(rxnorm, openfda);

        let info = service.get_drug_info("warfarin").await.unwrap().data;
        assert_eq!(info.rxcui, "11289");
        assert!(info.contraindications.is_empty());
    }

    #[tokio::test]
    async fn unknown_drug_is_not_found() {
        let service = service_with(Arc::new(MockRxNorm::new()), Arc::new(MockOpenFda::new()));
        let err = service.get_drug_info("notadrug").await.unwrap_err();
        assert!(matches!(err, ClinicalError::NotFound(name) if name == "notadrug"));
    }

    #[tokio::test]
    async fn fewer_than_two_names_makes_no_calls() {
        let rxnorm = Arc::new(MockRxNorm::new().with_drug("aspirin", "1191"));
        let service = service_with(rxnorm.clone(), Arc::new(MockOpenFda::new()));

        let result = service
            .check_drug_interactions(&["aspirin".into(), "  ".into()])
            .await
            .unwrap();
        assert!(result.interactions.is_empty());
        assert!(result.medications.is_empty());
        assert_eq!(rxnorm.call_count(), 0);
    }

    #[tokio::test]
    async fn interactions_are_enriched_and_cached() {
        let rxnorm = Arc::new(
            MockRxNorm::new()
                .with_drug("warfarin", "11289")
                .with_drug("aspirin", "1191")
                .with_interaction(
                    "11289",
                    "1191",
                    "high",
                    "Increased risk of bleeding when combined.",
                ),
        );
        let service = service_with(rxnorm.clone(), Arc::new(MockOpenFda::new()));
        let names = vec!["Warfarin".to_string(), "Aspirin".to_string()];

        let first = service.check_drug_interactions(&names).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.interactions.len(), 1);
        let interaction = &first.interactions[0].interactions[0];
        assert!(interaction.clinical_effects.contains(&"Bleeding risk".to_string()));
        assert_eq!(first.requested_name("1191"), Some("Aspirin"));

        // Sorted, deduplicated RxCUIs are sent upstream.
        assert_eq!(
            *rxnorm.last_interaction_query.lock().unwrap(),
            vec!["11289".to_string(), "1191".to_string()]
        );

        let reversed = vec!["Aspirin".to_string(), "Warfarin".to_string()];
        let second = service.check_drug_interactions(&reversed).await.unwrap();
        assert!(second.cached);
        assert_eq!(rxnorm.interaction_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.interactions, first.interactions);
    }

    #[tokio::test]
    async fn unresolved_names_are_reported_and_skipped() {
        let rxnorm = Arc::new(
            MockRxNorm::new()
                .with_drug("warfarin", "11289")
                .with_drug("aspirin", "1191")
                .failing_for("ibuprofen"),
        );
        let service = service_with(rxnorm.clone(), Arc::new(MockOpenFda::new()));

        let result = service
            .check_drug_interactions(&[
                "warfarin".into(),
                "mystery".into(),
                "ibuprofen".into(),
                "aspirin".into(),
            ])
            .await
            .unwrap();
        assert_eq!(result.unresolved, vec!["mystery", "ibuprofen"]);
        assert_eq!(result.medications.len(), 2);
        assert_eq!(rxnorm.interaction_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_resolved_name_skips_interaction_call() {
        let rxnorm = Arc::new(MockRxNorm::new().with_drug("warfarin", "11289"));
        let service = service_with(rxnorm.clone(), Arc::new(MockOpenFda::new()));

        let result = service
            .check_drug_pair("warfarin", "unknown")
            .await
            .unwrap();
        assert!(result.interactions.is_empty());
        assert_eq!(result.unresolved, vec!["unknown"]);
        assert_eq!(rxnorm.interaction_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn contraindications_use_label_text() {
        let rxnorm = Arc::new(MockRxNorm::new().with_drug("aspirin", "1191"));
        let openfda = Arc::new(MockOpenFda::new().with_label("aspirin", aspirin_label()));
        let service = service_with(rxnorm, openfda);

        let alerts = service
            .check_contraindications(
                &["aspirin".into(), "unknown".into()],
                &["Bleeding".into(), "asthma".into()],
            )
            .await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].medication, "aspirin");
        assert_eq!(alerts[0].severity, ContraindicationSeverity::Absolute);
    }

    #[tokio::test]
    async fn monographs_and_events_pass_through() {
        let openfda = Arc::new(MockOpenFda::new().with_events(
            "aspirin",
            vec![AdverseEventCount {
                term: "NAUSEA".into(),
                count: 42,
            }],
        ));
        let service = service_with(Arc::new(MockRxNorm::new()), openfda);

        let spls = service.get_monographs("aspirin").await.unwrap();
        assert_eq!(spls[0].setid, "spl-1");
        let events = service.get_adverse_events("aspirin", 10).await.unwrap();
        assert_eq!(events[0].count, 42);
        assert!(matches!(
            service.search_drugs(" ").await,
            Err(ClinicalError::InsufficientInput(_))
        ));
    }

    #[tokio::test]
    async fn clear_cache_resets_stats() {
        let rxnorm = Arc::new(MockRxNorm::new().with_drug("aspirin", "1191"));
        let service = service_with(rxnorm, Arc::new(MockOpenFda::new()));
        service.get_drug_info("aspirin").await.unwrap();
        assert_eq!(service.cache_stats().drug_info.entries, 1);

        service.clear_cache();
        assert_eq!(service.cache_stats().drug_info.entries, 0);
    }
}
