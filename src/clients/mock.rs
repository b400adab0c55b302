//! In-memory upstream doubles with call counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::rxnorm::{
    FullInteractionType, FullInteractionTypeGroup, InteractionConcept, InteractionPair, MinConcept,
};
use super::{
    AdverseEventCount, DailyMedApi, DrugConcept, DrugLabel, InteractionData, OpenFdaApi,
    RxNormApi, SplSummary, UpstreamError,
};

fn unavailable(service: &'static str) -> UpstreamError {
    UpstreamError::Status {
        service,
        status: 503,
        body: "mock outage".into(),
    }
}

// ═══════════════════════════════════════════════════════════
// RxNorm
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
pub struct MockRxNorm {
    rxcuis: HashMap<String, String>,
    names: HashMap<String, String>,
    related: HashMap<String, Vec<DrugConcept>>,
    ndcs: HashMap<String, Vec<String>>,
    /// (rxcui a, rxcui b, severity, description)
    pairs: Vec<(String, String, String, String)>,
    failing_names: Vec<String>,
    pub calls: AtomicUsize,
    pub interaction_calls: AtomicUsize,
    pub last_interaction_query: Mutex<Vec<String>>,
}

impl MockRxNorm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a drug name (matched case-insensitively) with its RxCUI.
    pub fn with_drug(mut self, name: &str, rxcui: &str) -> Self {
        self.rxcuis.insert(name.to_lowercase(), rxcui.to_string());
        self.names.insert(rxcui.to_string(), name.to_lowercase());
        self
    }

    pub fn with_related(mut self, rxcui: &str, concepts: Vec<DrugConcept>) -> Self {
        self.related.insert(rxcui.to_string(), concepts);
        self
    }

    pub fn with_ndcs(mut self, rxcui: &str, ndcs: &[&str]) -> Self {
        self.ndcs
            .insert(rxcui.to_string(), ndcs.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_interaction(mut self, a: &str, b: &str, severity: &str, description: &str) -> Self {
        self.pairs.push((
            a.to_string(),
            b.to_string(),
            severity.to_string(),
            description.to_string(),
        ));
        self
    }

    /// Make RxCUI resolution for `name` fail with an upstream error.
    pub fn failing_for(mut self, name: &str) -> Self {
        self.failing_names.push(name.to_lowercase());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn concept(&self, rxcui: &str) -> MinConcept {
        MinConcept {
            rxcui: rxcui.to_string(),
            name: self.names.get(rxcui).cloned().unwrap_or_default(),
            tty: Some("IN".into()),
        }
    }

    fn interaction_data<F>(&self, include: F) -> InteractionData
    where
        F: Fn(&str, &str) -> bool,
    {
        let pairs: Vec<InteractionPair> = self
            .pairs
            .iter()
            .filter(|(a, b, _, _)| include(a, b))
            .map(|(a, b, severity, description)| InteractionPair {
                interaction_concept: vec![
                    InteractionConcept {
                        min_concept_item: self.concept(a),
                        source_concept_item: None,
                    },
                    InteractionConcept {
                        min_concept_item: self.concept(b),
                        source_concept_item: None,
                    },
                ],
                severity: Some(severity.clone()),
                description: Some(description.clone()),
            })
            .collect();

        if pairs.is_empty() {
            return InteractionData::default();
        }

        InteractionData {
            interaction_type_group: Vec::new(),
            full_interaction_type_group: vec![FullInteractionTypeGroup {
                source_name: Some("DrugBank".into()),
                full_interaction_type: vec![FullInteractionType {
                    min_concept: Vec::new(),
                    interaction_pair: pairs,
                }],
            }],
        }
    }
}

#[async_trait]
impl RxNormApi for MockRxNorm {
    async fn get_rxcui(&self, name: &str) -> Result<Option<String>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = name.trim().to_lowercase();
        if self.failing_names.contains(&key) {
            return Err(unavailable("RxNorm"));
        }
        Ok(self.rxcuis.get(&key).cloned())
    }

    async fn search_drugs(&self, name: &str) -> Result<Vec<DrugConcept>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = name.trim().to_lowercase();
        Ok(self
            .rxcuis
            .iter()
            .filter(|(n, _)| n.contains(&key))
            .map(|(n, id)| DrugConcept {
                rxcui: id.clone(),
                name: n.clone(),
                synonym: None,
                tty: Some("IN".into()),
            })
            .collect())
    }

    async fn get_drug_details(&self, rxcui: &str) -> Result<Option<DrugConcept>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.names.get(rxcui).map(|name| DrugConcept {
            rxcui: rxcui.to_string(),
            name: name.clone(),
            synonym: None,
            tty: Some("IN".into()),
        }))
    }

    async fn get_related_drugs(&self, rxcui: &str) -> Result<Vec<DrugConcept>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.related.get(rxcui).cloned().unwrap_or_default())
    }

    async fn get_ndcs(&self, rxcui: &str) -> Result<Vec<String>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.ndcs.get(rxcui).cloned().unwrap_or_default())
    }

    async fn get_interactions(&self, rxcui: &str) -> Result<InteractionData, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.interaction_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_interaction_query.lock() {
            *last = vec![rxcui.to_string()];
        }
        Ok(self.interaction_data(|a, b| a == rxcui || b == rxcui))
    }

    async fn get_interactions_among(
        &self,
        rxcuis: &[String],
    ) -> Result<InteractionData, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.interaction_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_interaction_query.lock() {
            *last = rxcuis.to_vec();
        }
        Ok(self.interaction_data(|a, b| {
            rxcuis.iter().any(|r| r == a) && rxcuis.iter().any(|r| r == b)
        }))
    }
}

// ═══════════════════════════════════════════════════════════
// OpenFDA
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
pub struct MockOpenFda {
    labels: HashMap<String, DrugLabel>,
    events: HashMap<String, Vec<AdverseEventCount>>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl MockOpenFda {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, name: &str, label: DrugLabel) -> Self {
        self.labels.insert(name.to_lowercase(), label);
        self
    }

    pub fn with_events(mut self, name: &str, events: Vec<AdverseEventCount>) -> Self {
        self.events.insert(name.to_lowercase(), events);
        self
    }

    /// Every call fails with an upstream error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OpenFdaApi for MockOpenFda {
    async fn get_drug_labeling(&self, name: &str) -> Result<Option<DrugLabel>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(unavailable("OpenFDA"));
        }
        Ok(self.labels.get(&name.trim().to_lowercase()).cloned())
    }

    async fn get_adverse_events(
        &self,
        name: &str,
        limit: u32,
    ) -> Result<Vec<AdverseEventCount>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(unavailable("OpenFDA"));
        }
        Ok(self
            .events
            .get(&name.trim().to_lowercase())
            .map(|e| e.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }
}

// ═══════════════════════════════════════════════════════════
// DailyMed
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
pub struct MockDailyMed {
    spls: HashMap<String, Vec<SplSummary>>,
    pub calls: AtomicUsize,
}

impl MockDailyMed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spl(mut self, name: &str, setid: &str, title: &str) -> Self {
        self.spls
            .entry(name.to_lowercase())
            .or_default()
            .push(SplSummary {
                setid: setid.to_string(),
                title: Some(title.to_string()),
                spl_version: Some(1),
                published_date: None,
            });
        self
    }
}

#[async_trait]
impl DailyMedApi for MockDailyMed {
    async fn search_spls(&self, drug_name: &str) -> Result<Vec<SplSummary>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .spls
            .get(&drug_name.trim().to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn get_spl(&self, setid: &str) -> Result<Option<SplSummary>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .spls
            .values()
            .flatten()
            .find(|s| s.setid == setid)
            .cloned())
    }
}
