use crate::api::client::{ApiClient, ApiError};
use serde::{Deserialize, Serialize};

const JOB_PREFERENCES_ENDPOINT: &str = "/auth/job-preferences/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPreferences {
    pub job_types: Vec<String>,        // "full-time", "contract", ...
    pub work_locations: Vec<String>,   // "remote", "hybrid", "onsite"
    pub company_sizes: Vec<String>,
    pub preferred_location: String,
    pub salary_min: u32,
    pub salary_max: u32,
    pub willing_to_relocate: bool,
    pub open_to_remote: bool,
    pub job_alerts: bool,
    pub weekly_digest: bool,
}

impl Default for JobPreferences {
    fn default() -> Self {
        Self {
            job_types: Vec::new(),
            work_locations: Vec::new(),
            company_sizes: Vec::new(),
            preferred_location: String::new(),
            salary_min: 50_000,
            salary_max: 150_000,
            willing_to_relocate: false,
            open_to_remote: true,
            job_alerts: true,
            weekly_digest: true,
        }
    }
}

impl JobPreferences {
    /// Adds `item` to one of the multi-select lists, or removes it if present.
    pub fn toggle(list: &mut Vec<String>, item: &str) {
        if let Some(index) = list.iter().position(|existing| existing == item) {
            list.remove(index);
        } else {
            list.push(item.to_string());
        }
    }
}

pub struct PreferencesService {
    client: ApiClient,
}

impl PreferencesService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Current preferences. Backends without the endpoint (404, or an error
    /// with an empty body) yield the defaults.
    pub async fn fetch(&self) -> Result<JobPreferences, ApiError> {
        match self.client.get(JOB_PREFERENCES_ENDPOINT).await {
            Ok(data) => {
                serde_json::from_value(data).map_err(|e| ApiError::DecodeError(e.to_string()))
            }
            Err(e) if endpoint_missing(&e) => {
                log::info!("Job preferences endpoint not found, using defaults");
                Ok(JobPreferences::default())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn save(&self, preferences: &JobPreferences) -> Result<(), ApiError> {
        self.client.post(JOB_PREFERENCES_ENDPOINT, preferences).await?;
        log::info!("Job preferences saved");
        Ok(())
    }
}

fn endpoint_missing(error: &ApiError) -> bool {
    match error {
        ApiError::ApiError { status: 404, .. } => true,
        ApiError::ApiError { body, .. } => match body {
            None => true,
            Some(serde_json::Value::Object(map)) => map.is_empty(),
            Some(_) => false,
        },
        _ => false,
    }
}
