//! DailyMed SPL listing client (`https://dailymed.nlm.nih.gov/dailymed/services/v2`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::ApiClient;
use super::UpstreamError;
use crate::config::AppConfig;

const SERVICE: &str = "DailyMed";

/// Summary of one structured product label (drug monograph).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplSummary {
    pub setid: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub spl_version: Option<u32>,
    #[serde(default)]
    pub published_date: Option<String>,
}

#[async_trait]
pub trait DailyMedApi: Send + Sync {
    async fn search_spls(&self, drug_name: &str) -> Result<Vec<SplSummary>, UpstreamError>;

    async fn get_spl(&self, setid: &str) -> Result<Option<SplSummary>, UpstreamError>;
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: serde_json::Value,
}

impl Envelope {
    /// `data` is an array on listings and may be a bare object on detail lookups.
    fn into_spls(self) -> Vec<SplSummary> {
        match self.data {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            obj @ serde_json::Value::Object(_) => {
                serde_json::from_value(obj).map(|s| vec![s]).unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }
}

pub struct DailyMedClient {
    http: ApiClient,
}

impl DailyMedClient {
    pub fn new(http: ApiClient) -> Self {
        Self { http }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        Ok(Self::new(ApiClient::new(
            SERVICE,
            &config.dailymed_base_url,
            config.http_timeout(),
            config.http_retries,
            config.retry_delay(),
        )?))
    }
}

#[async_trait]
impl DailyMedApi for DailyMedClient {
    async fn search_spls(&self, drug_name: &str) -> Result<Vec<SplSummary>, UpstreamError> {
        let response: Option<Envelope> = self
            .http
            .get_json_optional("/spls.json", &[("drug_name", drug_name.trim().to_string())])
            .await?;

        Ok(response.map(Envelope::into_spls).unwrap_or_default())
    }

    async fn get_spl(&self, setid: &str) -> Result<Option<SplSummary>, UpstreamError> {
        let response: Option<Envelope> = self
            .http
            .get_json_optional(&format!("/spls/{setid}.json"), &[])
            .await?;

        Ok(response.and_then(|r| r.into_spls().into_iter().next()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_parses_array() {
        let json = r#"{"data": [
            {"setid": "a1", "title": "ASPIRIN TABLET", "spl_version": 3, "published_date": "Jan 02, 2024"},
            {"setid": "b2", "title": "BAYER ASPIRIN"}
        ], "metadata": {"total_elements": 2}}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        let spls = envelope.into_spls();
        assert_eq!(spls.len(), 2);
        assert_eq!(spls[0].spl_version, Some(3));
        assert_eq!(spls[1].title.as_deref(), Some("BAYER ASPIRIN"));
    }

    #[test]
    fn detail_parses_object() {
        let json = r#"{"data": {"setid": "a1", "title": "ASPIRIN TABLET"}}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.into_spls()[0].setid, "a1");
    }

    #[test]
    fn missing_data_is_empty() {
        let envelope: Envelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.into_spls().is_empty());
    }
}
