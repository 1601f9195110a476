use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One sample row of a dataset or stream.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// How often a source refreshes.
///
/// The API is loose about these labels, so anything that is not one of the
/// canonical three (or an obvious alias of them) is carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Freshness {
    RealTime,
    Hourly,
    #[default]
    Daily,
    Other(String),
}

impl From<String> for Freshness {
    fn from(label: String) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "real-time" | "realtime" | "real_time" => Freshness::RealTime,
            "hourly" | "1h" => Freshness::Hourly,
            "daily" | "1d" => Freshness::Daily,
            _ => Freshness::Other(label),
        }
    }
}

impl From<Freshness> for String {
    fn from(freshness: Freshness) -> Self {
        freshness.to_string()
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::RealTime => f.write_str("real-time"),
            Freshness::Hourly => f.write_str("hourly"),
            Freshness::Daily => f.write_str("daily"),
            Freshness::Other(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FieldRepr")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub type_label: String,
    pub example: serde_json::Value,
    pub description: String,
}

impl Field {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_label: String::new(),
            example: serde_json::Value::Null,
            description: String::new(),
        }
    }
}

// Catalog entries list bare field names, suggestions list full objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldRepr {
    Name(String),
    Full {
        name: String,
        #[serde(rename = "type", default)]
        type_label: String,
        #[serde(default)]
        example: serde_json::Value,
        #[serde(default)]
        description: String,
    },
}

impl From<FieldRepr> for Field {
    fn from(repr: FieldRepr) -> Self {
        match repr {
            FieldRepr::Name(name) => Field::named(name),
            FieldRepr::Full {
                name,
                type_label,
                example,
                description,
            } => Field {
                name,
                type_label,
                example,
                description,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "users")]
    pub estimated_users: u64,
    #[serde(default)]
    pub freshness: Freshness,
    pub price_per_user_day: f64,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Source {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub est_users: u64,
    #[serde(default)]
    pub freshness: Freshness,
    pub pricing_per_user_day: f64,
    #[serde(default)]
    pub sample_fields: Vec<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub query: String,
    #[serde(default)]
    pub detected_domains: Vec<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
    pub estimated_users: u64,
    pub estimated_monthly_cost: f64,
}

/// Sources sharing a domain tag, as shown under one heading.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainGroup {
    pub domain: String,
    pub sources: Vec<Source>,
}

impl PlanResponse {
    /// Groups suggested sources by domain, keeping first-seen order.
    pub fn grouped_by_domain(&self) -> Vec<DomainGroup> {
        let mut groups: Vec<DomainGroup> = Vec::new();
        for source in &self.sources {
            match groups.iter_mut().find(|g| g.domain == source.domain) {
                Some(group) => group.sources.push(source.clone()),
                None => groups.push(DomainGroup {
                    domain: source.domain.clone(),
                    sources: vec![source.clone()],
                }),
            }
        }
        groups
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub dataset_id: String,
    pub selected_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selected_fields: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub dataset_id: String,
    pub endpoint: String,
    #[serde(default)]
    pub selected_sources: Vec<String>,
    #[serde(default)]
    pub active_consents: u64,
    #[serde(default)]
    pub est_users: u64,
    #[serde(default)]
    pub updates_every: String,
    #[serde(default)]
    pub sample: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPreview {
    pub dataset: Dataset,
    #[serde(default)]
    pub sample: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSnapshot {
    #[serde(alias = "id")]
    pub dataset_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, alias = "sample_data")]
    pub rows: Vec<Row>,
}

/// A snapshot together with the time the client received it.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUpdate {
    pub snapshot: StreamSnapshot,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub ok: bool,
    #[serde(default)]
    pub demo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub api_key: String,
    #[serde(default)]
    pub note: Option<String>,
}
