//! HTTP client for the habit record service used by the durable store.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use habit_domain::store::{HabitRecord, HabitUpdate, NewHabitRecord, RecordService};
use habit_domain::{HabitId, StoreMode, StoreUnavailable};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const HABITS_PATH: &str = "/api/habits";

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    habits: Option<Vec<HabitRecord>>,
}

#[derive(Debug, Deserialize)]
struct HabitResponse {
    habit: HabitRecord,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Record service reached over JSON/HTTP at `{base_url}/api/habits`.
#[derive(Debug, Clone)]
pub struct HttpRecordService {
    client: Client,
    endpoint: String,
}

impl HttpRecordService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreUnavailable> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            endpoint: format!("{}{HABITS_PATH}", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RecordService for HttpRecordService {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    fn list(&self) -> Result<Vec<HabitRecord>, StoreUnavailable> {
        let response = self.client.get(&self.endpoint).send().map_err(transport)?;
        let body: ListResponse = decode(ensure_success(response)?)?;
        let records = body.habits.unwrap_or_default();
        debug!(count = records.len(), "listed habit records");
        Ok(records)
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    fn create(&self, record: &NewHabitRecord) -> Result<HabitRecord, StoreUnavailable> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(record)
            .send()
            .map_err(transport)?;
        let body: HabitResponse = decode(ensure_success(response)?)?;
        Ok(body.habit)
    }

    /// The service must answer an unknown id with `404`; that becomes `None`
    /// so the durable store can fall back to create. Any other failure status,
    /// including a `500` for a missing row, surfaces as `Remote`.
    #[instrument(skip(self), fields(endpoint = %self.endpoint, id = %update.id))]
    fn update(&self, update: &HabitUpdate) -> Result<Option<HabitRecord>, StoreUnavailable> {
        let response = self
            .client
            .put(&self.endpoint)
            .json(update)
            .send()
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: HabitResponse = decode(ensure_success(response)?)?;
        Ok(Some(body.habit))
    }

    /// `404` means nothing was deleted.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    fn delete(&self, id: &HabitId) -> Result<bool, StoreUnavailable> {
        let response = self
            .client
            .delete(&self.endpoint)
            .query(&[("id", id.as_str())])
            .send()
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let body: DeleteResponse = decode(ensure_success(response)?)?;
        Ok(body.success)
    }
}

fn transport(err: reqwest::Error) -> StoreUnavailable {
    StoreUnavailable::Transport(err.to_string())
}

fn ensure_success(response: Response) -> Result<Response, StoreUnavailable> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let raw = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&raw)
        .map(|body| body.error)
        .unwrap_or(raw);
    Err(StoreUnavailable::Remote {
        status: status.as_u16(),
        message,
    })
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreUnavailable> {
    let raw = response.text().map_err(transport)?;
    serde_json::from_str(&raw).map_err(|err| StoreUnavailable::Codec {
        mode: StoreMode::Personal,
        reason: err.to_string(),
    })
}
