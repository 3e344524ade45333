use crate::api::client::{ApiClient, ApiError};
use crate::api::UserRecord;
use crate::career::CareerSelection;
use crate::session::PROFILE_DETAIL_ENDPOINT;
use serde::Serialize;
use serde_json::{json, Value};

const PROFILE_UPDATE_ENDPOINT: &str = "/auth/profile/update/";
const NOTIFICATIONS_ENDPOINT: &str = "/auth/profile/notifications/";
const CHANGE_PASSWORD_ENDPOINT: &str = "/auth/change-password/";
const DELETE_ACCOUNT_ENDPOINT: &str = "/auth/delete-account/";
const ONBOARDING_ENDPOINT: &str = "/auth/onboarding/";
const STATS_ENDPOINT: &str = "/auth/stats/";

#[derive(Debug, Serialize)]
struct ChangePasswordRequest<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

#[derive(Debug, Serialize)]
struct OnboardingRequest<'a> {
    careers: Vec<Value>,
    #[serde(rename = "experienceLevel")]
    experience_level: &'a str,
    skills: &'a [String],
}

pub struct ProfileService {
    client: ApiClient,
}

impl ProfileService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn detail(&self) -> Result<UserRecord, ApiError> {
        self.client.get(PROFILE_DETAIL_ENDPOINT).await.map(UserRecord)
    }

    /// Partial update of profile fields.
    pub async fn update(&self, fields: &Value) -> Result<Value, ApiError> {
        self.client.patch(PROFILE_UPDATE_ENDPOINT, fields).await
    }

    pub async fn save_career_interests(
        &self,
        selection: &CareerSelection,
    ) -> Result<Value, ApiError> {
        self.update(&json!({ "career_interests": selection.career_names() }))
            .await
    }

    /// Flips a single notification toggle, e.g. `("job_alerts", false)`.
    pub async fn update_notifications(&self, key: &str, enabled: bool) -> Result<Value, ApiError> {
        let mut body = serde_json::Map::new();
        body.insert(key.to_string(), Value::Bool(enabled));
        self.client
            .patch(NOTIFICATIONS_ENDPOINT, &Value::Object(body))
            .await
    }

    pub async fn change_password(&self, current: &str, new: &str) -> Result<Value, ApiError> {
        let request = ChangePasswordRequest {
            old_password: current,
            new_password: new,
        };
        self.client.post(CHANGE_PASSWORD_ENDPOINT, &request).await
    }

    pub async fn delete_account(&self) -> Result<(), ApiError> {
        self.client.delete(DELETE_ACCOUNT_ENDPOINT).await?;
        log::info!("Account deleted");
        Ok(())
    }

    pub async fn complete_onboarding(
        &self,
        selection: &CareerSelection,
        experience_level: &str,
        skills: &[String],
    ) -> Result<Value, ApiError> {
        let careers = selection
            .jobs()
            .iter()
            .map(|job| json!({ "id": job.id, "name": job.name, "categoryId": job.category_id }))
            .collect();
        let request = OnboardingRequest {
            careers,
            experience_level,
            skills,
        };
        self.client.post(ONBOARDING_ENDPOINT, &request).await
    }

    pub async fn stats(&self) -> Result<Value, ApiError> {
        self.client.get(STATS_ENDPOINT).await
    }
}
