pub mod api;
pub mod career;
pub mod services;
pub mod session;
pub mod settings;
pub mod storage;

use anyhow::Context;
use api::client::ApiClient;
use services::{
    AssistantService, JobSearchProfile, JobSearchService, PreferencesService, ProfileService,
};
use session::{AuthSession, SessionStatus};
use settings::ClientSettings;
use storage::TokenStore;

/// Everything a running client needs, owned in one place.
pub struct App {
    pub settings: ClientSettings,
    pub session: AuthSession,
    jobs: JobSearchService,
}

impl App {
    /// Builds the configured token store and HTTP client, then restores any
    /// persisted session.
    pub async fn bootstrap(settings: ClientSettings) -> anyhow::Result<Self> {
        let backend = settings
            .build_store()
            .context("failed to open token storage")?;
        let client = ApiClient::with_timeout(
            settings.api_base_url(),
            TokenStore::new(backend),
            settings.request_timeout(),
        )
        .context("failed to build HTTP client")?;

        let cache = settings
            .build_cache_store()
            .context("failed to open job cache")?;
        let jobs = JobSearchService::new(settings.jobs.clone(), cache)
            .context("failed to build job search client")?;

        let session = AuthSession::new(client);
        let status = session.initialize().await;
        log::info!("Session restored: {:?}", status);

        Ok(Self {
            settings,
            session,
            jobs,
        })
    }

    pub fn client(&self) -> &ApiClient {
        self.session.client()
    }

    pub fn profile(&self) -> ProfileService {
        ProfileService::new(self.client().clone())
    }

    pub fn preferences(&self) -> PreferencesService {
        PreferencesService::new(self.client().clone())
    }

    pub fn assistant(&self) -> AssistantService {
        AssistantService::new(self.client().clone())
    }

    pub fn jobs(&self) -> &JobSearchService {
        &self.jobs
    }

    /// Search profile for the signed-in user, if any.
    pub fn job_profile(&self) -> Option<JobSearchProfile> {
        self.session.user().map(|user| JobSearchProfile::from_user(&user))
    }
}

pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load or create default settings
    let settings = settings::load_settings().unwrap_or_else(|e| {
        log::warn!("Could not load settings, using defaults: {}", e);
        ClientSettings::default().with_env_overrides()
    });
    log::info!("API base URL: {}", settings.api_base_url());

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async {
        let app = App::bootstrap(settings).await?;
        match app.session.status() {
            SessionStatus::Authenticated => {
                let email = app
                    .session
                    .user()
                    .and_then(|user| user.email().map(str::to_string))
                    .unwrap_or_default();
                log::info!("Signed in as {}", email);
            }
            status => log::info!("Session status: {:?}", status),
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::StorageSettings;
    use wiremock::MockServer;

    #[tokio::test]
    async fn test_bootstrap_with_empty_store_is_anonymous() {
        let server = MockServer::start().await;
        let mut settings = ClientSettings::default();
        settings.api.origin = Some(server.uri());
        settings.storage = StorageSettings {
            backend: Some("memory".to_string()),
            path: None,
        };

        let app = App::bootstrap(settings).await.unwrap();
        assert_eq!(app.session.status(), SessionStatus::Anonymous);
        assert!(app.client().base_url().ends_with("/api"));
        assert!(app.job_profile().is_none());
        assert!(!app.jobs().has_provider());
        assert_eq!(app.jobs().fetch_jobs(None).await.len(), 2);
    }
}
