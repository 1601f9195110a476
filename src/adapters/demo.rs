//! Offline marketplace serving the built-in demo data.
//!
//! Only the demo query is understood by the planner here; everything else
//! comes back as [`MarketplaceError::NoSuggestions`].

use crate::domain::model::{
    ApiKey, Catalog, Dataset, DatasetPreview, Field, Freshness, GenerateRequest,
    GenerateResponse, HealthStatus, PlanResponse, Row, Source, StreamSnapshot,
};
use crate::domain::ports::MarketplaceApi;
use crate::utils::error::{MarketplaceError, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEMO_QUERY: &str = "connect language learning to airbnb rentals";
pub const DEMO_DATASET_ID: &str = "duo_airbnb_italian";
pub const DEMO_API_HOST: &str = "http://localhost:8000";

const DEMO_ESTIMATED_USERS: u64 = 12473;
const CITIES: [&str; 7] = ["Rome", "Florence", "Venice", "Milan", "Naples", "Bologna", "Verona"];
const ACCOMMODATION_TYPES: [&str; 4] = [
    "Entire apartment",
    "Private room",
    "Shared room",
    "Hotel room",
];
const ZIP_CODES: [&str; 3] = ["94105", "90001", "95014"];

struct GeneratedStream {
    dataset_id: String,
    created_at: String,
    polls: u64,
}

pub struct DemoMarketplace {
    delay: Duration,
    counter: AtomicU64,
    streams: Mutex<HashMap<String, GeneratedStream>>,
}

impl DemoMarketplace {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            counter: AtomicU64::new(0),
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// No simulated latency.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_demo_query(query: &str) -> bool {
        query.to_lowercase().contains(DEMO_QUERY)
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for DemoMarketplace {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl MarketplaceApi for DemoMarketplace {
    async fn health(&self) -> Result<HealthStatus> {
        Ok(HealthStatus {
            ok: true,
            demo: true,
        })
    }

    async fn fetch_catalog(&self) -> Result<Catalog> {
        Ok(Catalog {
            datasets: demo_catalog(),
        })
    }

    async fn preview_dataset(&self, dataset_id: &str) -> Result<DatasetPreview> {
        let dataset = demo_catalog()
            .into_iter()
            .find(|d| d.id == dataset_id)
            .ok_or_else(|| MarketplaceError::NotFound {
                resource: format!("dataset '{}'", dataset_id),
            })?;
        let sample = sample_rows(dataset_id, 0, 5);
        Ok(DatasetPreview { dataset, sample })
    }

    async fn plan_query(&self, query: &str) -> Result<PlanResponse> {
        if !Self::is_demo_query(query) {
            return Err(MarketplaceError::NoSuggestions {
                query: query.to_string(),
            });
        }
        self.simulate_latency().await;

        Ok(PlanResponse {
            query: DEMO_QUERY.to_string(),
            detected_domains: vec!["education".to_string(), "travel".to_string()],
            sources: demo_plan_sources(),
            estimated_users: DEMO_ESTIMATED_USERS,
            estimated_monthly_cost: DEMO_ESTIMATED_USERS as f64 * 0.02 * 30.0,
        })
    }

    async fn generate_dataset(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        if request.selected_sources.is_empty() {
            return Err(MarketplaceError::EmptySelection);
        }
        let n = self.next_id();
        let stream_id = format!("ds_{:08x}", n);

        self.streams.lock().await.insert(
            stream_id.clone(),
            GeneratedStream {
                dataset_id: request.dataset_id.clone(),
                created_at: Utc::now().to_rfc3339(),
                polls: 0,
            },
        );
        tracing::debug!("Demo stream {} created for {}", stream_id, request.dataset_id);

        Ok(GenerateResponse {
            endpoint: format!("{}/v1/streams/{}", DEMO_API_HOST, stream_id),
            dataset_id: stream_id,
            selected_sources: request.selected_sources.clone(),
            active_consents: 500 + (n * 797) % 4500,
            est_users: 1000 + (n * 1931) % 9000,
            updates_every: "5s".to_string(),
            sample: sample_rows(&request.dataset_id, 0, 3),
        })
    }

    async fn get_stream(&self, stream_id: &str) -> Result<StreamSnapshot> {
        let mut streams = self.streams.lock().await;
        let stream = streams
            .get_mut(stream_id)
            .ok_or_else(|| MarketplaceError::NotFound {
                resource: format!("stream '{}'", stream_id),
            })?;
        stream.polls += 1;

        Ok(StreamSnapshot {
            dataset_id: stream_id.to_string(),
            name: None,
            description: None,
            endpoint: Some(format!("{}/v1/streams/{}", DEMO_API_HOST, stream_id)),
            created_at: Some(stream.created_at.clone()),
            updated_at: Some(Utc::now().to_rfc3339()),
            rows: sample_rows(&stream.dataset_id, stream.polls as usize, 1),
        })
    }

    async fn create_api_key(&self) -> Result<ApiKey> {
        let seed = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64 ^ self.next_id();
        Ok(ApiKey {
            api_key: format!("demo_live_{:016x}{:016x}", seed, seed.rotate_left(17)),
            note: Some("demo only".to_string()),
        })
    }
}

fn field(name: &str, type_label: &str, example: Value, description: &str) -> Field {
    Field {
        name: name.to_string(),
        type_label: type_label.to_string(),
        example,
        description: description.to_string(),
    }
}

fn demo_plan_sources() -> Vec<Source> {
    vec![
        Source {
            id: "duolingo".to_string(),
            name: "Duolingo".to_string(),
            domain: "education".to_string(),
            description: "Language learning progress data".to_string(),
            estimated_users: 50000,
            freshness: Freshness::Daily,
            price_per_user_day: 0.01,
            fields: vec![
                field("language", "string", json!("Italian"), "Language being learned"),
                field("lessons_completed", "integer", json!(127), "Total lessons completed"),
                field("streak_days", "integer", json!(42), "Current daily streak"),
                field("xp_points", "integer", json!(2540), "Experience points earned"),
                field("last_active", "timestamp", json!("2024-05-01T09:30:00Z"), "Last activity time"),
                field("learning_streak", "string", json!("42 days"), "Streak as a label"),
            ],
        },
        Source {
            id: "airbnb_italy".to_string(),
            name: "Airbnb Italy Listings".to_string(),
            domain: "travel".to_string(),
            description: "Booking data for Airbnb properties in Italy".to_string(),
            estimated_users: 3973,
            freshness: Freshness::Hourly,
            price_per_user_day: 0.025,
            fields: vec![
                field("airbnb_city", "string", json!("Florence"), "City of the booking"),
                field("accommodation_type", "string", json!("Private room"), "Type of stay"),
                field("check_in_date", "date", json!("2024-05-11"), "Check-in date"),
                field("check_out_date", "date", json!("2024-05-18"), "Check-out date"),
                field("nights_booked", "integer", json!(7), "Nights in the booking"),
                field("booking_value_usd", "float", json!(620.75), "Booking value in USD"),
                field("is_superhost", "boolean", json!(false), "Whether the host is a superhost"),
            ],
        },
    ]
}

#[allow(clippy::too_many_arguments)]
fn catalog_source(
    id: &str,
    name: &str,
    domain: &str,
    users: u64,
    freshness: &str,
    price: f64,
    description: &str,
    fields: &[&str],
) -> Source {
    Source {
        id: id.to_string(),
        name: name.to_string(),
        domain: domain.to_string(),
        description: description.to_string(),
        estimated_users: users,
        freshness: Freshness::from(freshness.to_string()),
        price_per_user_day: price,
        fields: fields.iter().map(|f| Field::named(*f)).collect(),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn demo_catalog() -> Vec<Dataset> {
    vec![
        Dataset {
            id: DEMO_DATASET_ID.to_string(),
            title: "Language Learning × Travel (Italian)".to_string(),
            domains: strings(&["education", "travel"]),
            description: "Combined dataset of Duolingo language learning progress and Airbnb bookings in Italy".to_string(),
            est_users: DEMO_ESTIMATED_USERS,
            freshness: Freshness::RealTime,
            pricing_per_user_day: 0.02,
            sample_fields: strings(&[
                "user_id", "language", "lessons_completed", "streak_days", "airbnb_city",
                "accommodation_type", "nights_booked", "booking_value_usd", "timestamp",
            ]),
            sources: vec![
                catalog_source(
                    "duolingo_italian",
                    "Duolingo Italian Learners",
                    "education",
                    8500,
                    "daily",
                    0.015,
                    "Language learning progress for Italian learners",
                    &["user_id", "language", "lessons_completed", "streak_days", "xp_points", "last_active", "learning_streak"],
                ),
                catalog_source(
                    "airbnb_italy",
                    "Airbnb Italy Listings",
                    "travel",
                    3973,
                    "hourly",
                    0.025,
                    "Booking data for Airbnb properties in Italy",
                    &["user_id", "airbnb_city", "accommodation_type", "check_in_date", "check_out_date", "nights_booked", "booking_value_usd", "is_superhost"],
                ),
            ],
        },
        Dataset {
            id: "fitness_grocery_ca".to_string(),
            title: "Fitness × Grocery (California)".to_string(),
            domains: strings(&["health", "retail"]),
            description: "Fitness tracking data correlated with grocery purchases in California".to_string(),
            est_users: 18200,
            freshness: Freshness::from("15s".to_string()),
            pricing_per_user_day: 0.018,
            sample_fields: strings(&["user_id", "steps_per_day", "avg_grocery_spend", "zip_code", "timestamp"]),
            sources: vec![],
        },
        Dataset {
            id: "streaming_ecom_global".to_string(),
            title: "Streaming × E-commerce (Global)".to_string(),
            domains: strings(&["media", "retail"]),
            description: "Music streaming activity combined with e-commerce purchase data worldwide".to_string(),
            est_users: 98000,
            freshness: Freshness::from("5m".to_string()),
            pricing_per_user_day: 0.01,
            sample_fields: strings(&["user_id", "artist", "plays_last_7d", "avg_order_value", "timestamp"]),
            sources: vec![],
        },
    ]
}

fn to_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// Deterministic sample rows; `offset` shifts the values between polls.
pub fn sample_rows(dataset_id: &str, offset: usize, count: usize) -> Vec<Row> {
    let now = Utc::now();
    (offset..offset + count)
        .map(|i| {
            let n = i as i64;
            match dataset_id {
                DEMO_DATASET_ID => {
                    let lessons = 5 + (n * 37) % 146;
                    let streak = 1 + (n * 53) % 365;
                    let nights = 1 + n % 14;
                    let booking_value = ((50.0 + ((n * 71) % 450) as f64) * nights as f64 * 100.0).round() / 100.0;
                    to_row(json!({
                        "user_id": format!("user_{}", i + 1000),
                        "language": "Italian",
                        "lessons_completed": lessons,
                        "streak_days": streak,
                        "xp_points": lessons * 10 + 10 + n % 40,
                        "last_active": (now - ChronoDuration::hours(n % 24)).to_rfc3339(),
                        "learning_streak": format!("{} days", streak),
                        "airbnb_city": CITIES[i % CITIES.len()],
                        "accommodation_type": ACCOMMODATION_TYPES[i % ACCOMMODATION_TYPES.len()],
                        "check_in_date": (now + ChronoDuration::days(1 + n % 30)).format("%Y-%m-%d").to_string(),
                        "check_out_date": (now + ChronoDuration::days(31 + n % 30)).format("%Y-%m-%d").to_string(),
                        "nights_booked": nights,
                        "booking_value_usd": booking_value,
                        "is_superhost": i % 2 == 0,
                        "timestamp": now.to_rfc3339(),
                        "estimated_fluency": format!("{}%", (lessons * 8 / 10).min(100)),
                    }))
                }
                "fitness_grocery_ca" => {
                    let zip_code = ZIP_CODES[i % ZIP_CODES.len()];
                    to_row(json!({
                        "user_id": format!("user_{}", i + 2000),
                        "steps_per_day": 3000 + (n * 1237) % 12000,
                        "avg_grocery_spend": (25.0 + ((n * 1713) % 12500) as f64 / 100.0),
                        "zip_code": zip_code,
                        "timestamp": (now - ChronoDuration::days(n % 7)).to_rfc3339(),
                    }))
                }
                _ => to_row(json!({
                    "user_id": format!("user_{}", i + 3000),
                    "sample_field": format!("Sample data {}", i + 1),
                    "value": 1 + (n * 29) % 100,
                    "timestamp": now.to_rfc3339(),
                })),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_only_demo_query_is_planned() {
        let demo = DemoMarketplace::instant();

        let plan = demo
            .plan_query("Connect language learning to Airbnb rentals")
            .await
            .unwrap();
        assert_eq!(plan.detected_domains, vec!["education", "travel"]);
        assert_eq!(plan.sources.len(), 2);
        assert_eq!(plan.estimated_users, 12473);

        let err = demo.plan_query("fitness app user behavior").await.unwrap_err();
        assert!(matches!(err, MarketplaceError::NoSuggestions { .. }));
    }

    #[tokio::test]
    async fn test_generated_stream_can_be_polled() {
        let demo = DemoMarketplace::instant();
        let response = demo
            .generate_dataset(&GenerateRequest {
                dataset_id: DEMO_DATASET_ID.to_string(),
                selected_sources: vec!["duolingo".to_string()],
                selected_fields: Default::default(),
            })
            .await
            .unwrap();

        assert_eq!(response.dataset_id, "ds_00000001");
        assert_eq!(response.endpoint, "http://localhost:8000/v1/streams/ds_00000001");
        assert_eq!(response.sample.len(), 3);

        let first = demo.get_stream(&response.dataset_id).await.unwrap();
        let second = demo.get_stream(&response.dataset_id).await.unwrap();
        assert_eq!(first.rows.len(), 1);
        assert_ne!(first.rows[0]["user_id"], second.rows[0]["user_id"]);
    }

    #[tokio::test]
    async fn test_unknown_stream_and_dataset() {
        let demo = DemoMarketplace::instant();
        assert!(matches!(
            demo.get_stream("ds_nope").await,
            Err(MarketplaceError::NotFound { .. })
        ));
        assert!(matches!(
            demo.preview_dataset("nope").await,
            Err(MarketplaceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_generate_requires_sources() {
        let demo = DemoMarketplace::instant();
        let err = demo
            .generate_dataset(&GenerateRequest {
                dataset_id: DEMO_DATASET_ID.to_string(),
                selected_sources: vec![],
                selected_fields: Default::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MarketplaceError::EmptySelection));
    }

    #[tokio::test]
    async fn test_api_keys_are_demo_keys() {
        let demo = DemoMarketplace::instant();
        let key = demo.create_api_key().await.unwrap();
        assert!(key.api_key.starts_with("demo_live_"));
    }

    #[test]
    fn test_sample_rows_keep_column_order() {
        let rows = sample_rows("fitness_grocery_ca", 0, 4);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1]["zip_code"], "90001");
        assert_eq!(rows[3]["zip_code"], "94105");
        let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(
            columns,
            vec!["user_id", "steps_per_day", "avg_grocery_spend", "zip_code", "timestamp"]
        );
    }

    #[test]
    fn test_catalog_freshness_labels() {
        let catalog = demo_catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog[0].freshness, Freshness::RealTime);
        assert_eq!(catalog[1].freshness, Freshness::Other("15s".to_string()));
        assert_eq!(catalog[0].sources[1].fields.len(), 8);
    }
}
