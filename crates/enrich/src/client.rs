//! The enrichment collaborator and an in-process scripted implementation.
//!
//! The contract is keyed by column *titles*: the client never sees column
//! ids, and the batch code maps titles back to columns itself.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum EnrichError {
    /// Transport failure
    Network(String),
    /// The service answered with an error
    Api(String),
    /// The answer could not be understood
    Parse(String),
}

impl std::fmt::Display for EnrichError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrichError::Network(msg) => write!(f, "Network error: {}", msg),
            EnrichError::Api(msg) => write!(f, "{}", msg),
            EnrichError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for EnrichError {}

/// Field title -> discovered value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedDetails {
    pub data: HashMap<String, serde_json::Value>,
}

impl ScrapedDetails {
    /// Value for a field title, matched case-insensitively.
    pub fn field(&self, title: &str) -> Option<&serde_json::Value> {
        self.data
            .get(title)
            .or_else(|| self.data.iter().find(|(k, _)| k.eq_ignore_ascii_case(title)).map(|(_, v)| v))
    }
}

#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    /// Up to `count` company names matching `query`, best first.
    async fn identify_companies(&self, query: &str, count: usize) -> Result<Vec<String>, EnrichError>;

    /// Look up `fields` (column titles) for the company named by `key`.
    async fn scrape_company_details(
        &self,
        key: &str,
        fields: &[String],
        context: Option<&str>,
    ) -> Result<ScrapedDetails, EnrichError>;
}

/// One recorded client request.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    Identify { query: String, count: usize },
    Scrape { key: String, fields: Vec<String> },
}

/// Canned answers keyed by company name, for tests and demos.
#[derive(Default)]
pub struct ScriptedClient {
    companies: Mutex<VecDeque<Result<Vec<String>, EnrichError>>>,
    details: Mutex<HashMap<String, Result<ScrapedDetails, EnrichError>>>,
    calls: Mutex<Vec<ClientCall>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer for the next `identify_companies` call.
    pub fn push_companies(&self, answer: Result<Vec<String>, EnrichError>) {
        self.companies.lock().push_back(answer);
    }

    pub fn set_details(&self, key: &str, data: serde_json::Value) {
        let data = match data {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        self.details.lock().insert(key.to_lowercase(), Ok(ScrapedDetails { data }));
    }

    pub fn fail_details(&self, key: &str, error: EnrichError) {
        self.details.lock().insert(key.to_lowercase(), Err(error));
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().clone()
    }

    /// Keys passed to `scrape_company_details`, in call order.
    pub fn scraped_keys(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ClientCall::Scrape { key, .. } => Some(key.clone()),
                ClientCall::Identify { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl EnrichmentClient for ScriptedClient {
    async fn identify_companies(&self, query: &str, count: usize) -> Result<Vec<String>, EnrichError> {
        self.calls.lock().push(ClientCall::Identify { query: query.to_string(), count });
        self.companies.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn scrape_company_details(
        &self,
        key: &str,
        fields: &[String],
        _context: Option<&str>,
    ) -> Result<ScrapedDetails, EnrichError> {
        self.calls.lock().push(ClientCall::Scrape { key: key.to_string(), fields: fields.to_vec() });
        self.details
            .lock()
            .get(&key.to_lowercase())
            .cloned()
            .unwrap_or_else(|| Ok(ScrapedDetails::default()))
    }
}
