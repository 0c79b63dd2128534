//! Demo store API collaborator
//!
//! HTTP GET lookups for store hours, inventory and appointment slots. The
//! real service answers unknown keys with explicit sentinel fields instead
//! of errors, and the stub mirrors that for tests and offline runs.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::ToolError;

/// Store API surface consumed by the lookup tools
#[async_trait]
pub trait StoreApi: Send + Sync {
    async fn store_hours(&self, store_id: &str) -> Result<Value, ToolError>;

    async fn inventory(&self, store_id: &str, sku: &str) -> Result<Value, ToolError>;

    async fn appointment_slots(&self, store_id: &str, service: &str) -> Result<Value, ToolError>;
}

/// HTTP client for the demo store API
pub struct HttpStoreApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStoreApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::Execution(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, ToolError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Execution(format!(
                "Store API returned {} for {}",
                status, path
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))
    }
}

#[async_trait]
impl StoreApi for HttpStoreApi {
    async fn store_hours(&self, store_id: &str) -> Result<Value, ToolError> {
        self.get("/store_hours", &[("store_id", store_id)]).await
    }

    async fn inventory(&self, store_id: &str, sku: &str) -> Result<Value, ToolError> {
        self.get("/inventory", &[("store_id", store_id), ("sku", sku)])
            .await
    }

    async fn appointment_slots(&self, store_id: &str, service: &str) -> Result<Value, ToolError> {
        self.get(
            "/appointment_slots",
            &[("store_id", store_id), ("service", service)],
        )
        .await
    }
}

/// In-process stub with the demo dataset
pub struct StubStoreApi;

#[async_trait]
impl StoreApi for StubStoreApi {
    async fn store_hours(&self, store_id: &str) -> Result<Value, ToolError> {
        Ok(match store_id {
            "ST-CHI-01" => json!({
                "store_id": "ST-CHI-01", "city": "Chicago", "hours": "10:00 AM – 8:00 PM"
            }),
            "ST-AUS-02" => json!({
                "store_id": "ST-AUS-02", "city": "Austin", "hours": "10:00 AM – 9:00 PM"
            }),
            other => json!({
                "store_id": other, "hours": "Unknown (store not found)"
            }),
        })
    }

    async fn inventory(&self, store_id: &str, sku: &str) -> Result<Value, ToolError> {
        let data = match (store_id, sku) {
            ("ST-CHI-01", "SKU-HEADPHONES-01") => {
                json!({"available": true, "qty": 7, "pickup_eta": "Today"})
            }
            ("ST-CHI-01", "SKU-LAPTOP-13") => {
                json!({"available": false, "qty": 0, "pickup_eta": "3–5 days"})
            }
            _ => json!({"available": false, "qty": 0, "pickup_eta": "Unknown"}),
        };

        let mut out = json!({"store_id": store_id, "sku": sku});
        if let (Value::Object(out), Value::Object(data)) = (&mut out, data) {
            out.extend(data);
        }
        Ok(out)
    }

    async fn appointment_slots(&self, store_id: &str, service: &str) -> Result<Value, ToolError> {
        let today = chrono::Local::now().date_naive().to_string();
        Ok(json!({
            "store_id": store_id,
            "service": service,
            "slots": [
                {"date": today, "time": "11:00", "service": service},
                {"date": today, "time": "15:30", "service": service},
                {"date": today, "time": "18:10", "service": service},
            ]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_known_store() {
        let api = StubStoreApi;
        let out = api.store_hours("ST-CHI-01").await.unwrap();
        assert_eq!(out["city"], "Chicago");
    }

    #[tokio::test]
    async fn test_stub_unknown_store_is_sentinel_not_error() {
        let api = StubStoreApi;
        let out = api.store_hours("ST-NYC-99").await.unwrap();
        assert_eq!(out["hours"], "Unknown (store not found)");
    }

    #[tokio::test]
    async fn test_stub_inventory_merges_keys() {
        let api = StubStoreApi;
        let out = api.inventory("ST-CHI-01", "SKU-HEADPHONES-01").await.unwrap();
        assert_eq!(out["store_id"], "ST-CHI-01");
        assert_eq!(out["qty"], 7);
    }

    #[tokio::test]
    async fn test_stub_slots_carry_service() {
        let api = StubStoreApi;
        let out = api.appointment_slots("ST-CHI-01", "tech-support").await.unwrap();
        let slots = out["slots"].as_array().unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0]["service"], "tech-support");
    }
}
