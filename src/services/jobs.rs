//! Opportunities feed
//!
//! Searches third-party job boards (Adzuna, then Jooble and CareerJet while
//! fewer than ten listings have come back), caches results per search, and
//! ranks listings against the user's profile. Provider requests are counted
//! per calendar day and skipped once a board's daily limit is spent. When no
//! board is configured or nothing comes back, a small static list is served.

use crate::api::UserRecord;
use crate::settings::JobSearchSettings;
use crate::storage::{KeyValueStore, StorageError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const CACHE_PREFIX: &str = "job_cache_";
pub const RATE_LIMIT_PREFIX: &str = "rate_limit_";
const CACHE_INDEX_KEY: &str = "job_cache_index";
const BOOKMARKS_KEY: &str = "bookmarked_jobs";

const USER_AGENT: &str = "CareerForge-Client/1.0";
const RESULTS_PER_PAGE: u32 = 20;
const ENOUGH_JOBS: usize = 10;
const TOP_MATCHES: usize = 10;
const MAX_KEYWORDS: usize = 5;
const MAX_SKILL_KEYWORDS: usize = 3;
const MAX_EXTRACTED_SKILLS: usize = 5;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

const DEFAULT_KEYWORDS: [&str; 4] = ["software", "marketing", "manager", "analyst"];

const KEYWORD_MAP: [(&str, &[&str]); 6] = [
    (
        "Software Development",
        &["software engineer", "developer", "programmer", "frontend", "backend"],
    ),
    (
        "Data Science",
        &["data scientist", "data analyst", "machine learning", "data engineer"],
    ),
    (
        "UI/UX Design",
        &["ux designer", "ui designer", "product designer", "graphic designer"],
    ),
    (
        "Digital Marketing",
        &["digital marketing", "marketing manager", "seo specialist", "content marketing"],
    ),
    (
        "Product Management",
        &["product manager", "product owner", "project manager"],
    ),
    (
        "Sales & Business Development",
        &["sales manager", "business development", "account manager"],
    ),
];

const COMMON_SKILLS: [&str; 37] = [
    "JavaScript", "Python", "Java", "React", "Node.js", "SQL", "AWS", "Docker",
    "TypeScript", "Angular", "Vue.js", "MongoDB", "PostgreSQL", "Redis",
    "Kubernetes", "Git", "HTML", "CSS", "Figma", "Sketch", "Adobe XD",
    "Photoshop", "Illustrator", "SEO", "Google Analytics", "Facebook Ads",
    "Content Marketing", "Social Media", "Email Marketing", "Salesforce",
    "HubSpot", "Tableau", "Power BI", "Excel", "R", "TensorFlow", "PyTorch",
];

#[derive(Error, Debug)]
pub enum JobSearchError {
    #[error("Request failed: {0}")]
    RequestError(String),
    #[error("{provider} API error: {status}")]
    ProviderError { provider: &'static str, status: u16 },
    #[error("Invalid response body: {0}")]
    DecodeError(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSource {
    Adzuna,
    Jooble,
    CareerJet,
    Fallback,
}

impl JobSource {
    const PROVIDERS: [JobSource; 3] = [JobSource::Adzuna, JobSource::Jooble, JobSource::CareerJet];

    pub fn key(self) -> &'static str {
        match self {
            JobSource::Adzuna => "adzuna",
            JobSource::Jooble => "jooble",
            JobSource::CareerJet => "careerjet",
            JobSource::Fallback => "fallback",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            JobSource::Adzuna => "Adzuna",
            JobSource::Jooble => "Jooble",
            JobSource::CareerJet => "CareerJet",
            JobSource::Fallback => "Fallback",
        }
    }

    fn quality_bonus(self) -> u32 {
        match self {
            JobSource::Adzuna => 2,
            JobSource::Jooble => 1,
            _ => 0,
        }
    }
}

/// A listing normalized across providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub description: String,
    pub apply_url: Option<String>,
    pub posted: String,
    pub skills: Vec<String>,
    pub source: JobSource,
    pub logo: String,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<u32>,
}

/// The parts of a user profile that drive search and ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSearchProfile {
    pub career_interests: Vec<String>,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub experience_level: Option<String>,
    pub remote_work_preference: bool,
}

impl JobSearchProfile {
    /// Reads fields from the nested `profile` object first, then the top level.
    pub fn from_user(user: &UserRecord) -> Self {
        let lookup = |name: &str| {
            user.0
                .pointer(&format!("/profile/{}", name))
                .filter(|value| !value.is_null())
                .or_else(|| user.get(name))
        };
        let text = |name: &str| {
            lookup(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let list = |name: &str| -> Vec<String> {
            lookup(name)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            career_interests: list("career_interests"),
            skills: list("skills"),
            location: text("location"),
            experience_level: text("experience_level"),
            remote_work_preference: lookup("remote_work_preference")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    fn experience(&self) -> &str {
        self.experience_level.as_deref().unwrap_or("mid")
    }
}

/// Query derived from a profile. Also the cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub keywords: String,
    pub location: String,
    pub experience: String,
    pub remote: bool,
}

impl SearchParams {
    pub fn for_profile(profile: Option<&JobSearchProfile>) -> Self {
        let default_profile = JobSearchProfile::default();
        let profile = profile.unwrap_or(&default_profile);

        let mut keywords: Vec<String> = Vec::new();
        for interest in &profile.career_interests {
            match KEYWORD_MAP.iter().find(|(name, _)| name == interest) {
                Some((_, terms)) => keywords.extend(terms.iter().map(|term| term.to_string())),
                // Career names from the catalog are usable search terms as-is.
                None => keywords.push(interest.to_lowercase()),
            }
        }
        keywords.extend(profile.skills.iter().take(MAX_SKILL_KEYWORDS).cloned());
        if keywords.is_empty() {
            keywords = DEFAULT_KEYWORDS.iter().map(|term| term.to_string()).collect();
        }
        keywords.truncate(MAX_KEYWORDS);

        Self {
            keywords: keywords.join(" OR "),
            location: profile.location.clone().unwrap_or_else(|| "remote".to_string()),
            experience: profile.experience().to_string(),
            remote: profile.remote_work_preference,
        }
    }

    fn cache_key(&self) -> String {
        format!(
            "{}{}_{}_{}",
            CACHE_PREFIX, self.keywords, self.location, self.experience
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedJobs {
    data: Vec<JobListing>,
    timestamp: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DisplayName {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdzunaResponse {
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdzunaJob {
    id: Value,
    title: String,
    company: Option<DisplayName>,
    location: Option<DisplayName>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    contract_type: Option<String>,
    description: Option<String>,
    redirect_url: Option<String>,
    created: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JoobleResponse {
    jobs: Vec<JoobleJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JoobleJob {
    id: Value,
    title: String,
    company: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    #[serde(rename = "type")]
    job_type: Option<String>,
    snippet: Option<String>,
    link: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CareerJetResponse {
    jobs: Vec<CareerJetJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CareerJetJob {
    jobid: Value,
    jobtitle: String,
    company: Option<String>,
    locations: Option<String>,
    salary: Option<String>,
    contracttype: Option<String>,
    jobdescription: Option<String>,
    url: Option<String>,
    date: Option<String>,
}

pub struct JobSearchService {
    http: reqwest::Client,
    settings: JobSearchSettings,
    store: Arc<dyn KeyValueStore>,
}

impl JobSearchService {
    pub fn new(
        settings: JobSearchSettings,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, JobSearchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| JobSearchError::RequestError(e.to_string()))?;

        Ok(Self {
            http,
            settings,
            store,
        })
    }

    /// Whether at least one job board has credentials.
    pub fn has_provider(&self) -> bool {
        JobSource::PROVIDERS
            .iter()
            .any(|source| self.is_configured(*source))
    }

    /// Top matches for `profile`. Never fails: provider and cache errors are
    /// logged and the static list is served instead.
    pub async fn fetch_jobs(&self, profile: Option<&JobSearchProfile>) -> Vec<JobListing> {
        self.fetch_jobs_at(profile, Utc::now()).await
    }

    pub async fn fetch_jobs_at(
        &self,
        profile: Option<&JobSearchProfile>,
        now: DateTime<Utc>,
    ) -> Vec<JobListing> {
        if !self.has_provider() {
            log::info!("No job board configured, serving static listings");
            return fallback_jobs(profile);
        }

        let params = SearchParams::for_profile(profile);
        if let Some(cached) = self.cached_jobs(&params, now) {
            if !cached.is_empty() {
                log::info!("Using {} cached jobs", cached.len());
                return process_jobs(cached, profile);
            }
        }

        let jobs = self.fetch_from_providers(&params, now).await;
        if jobs.is_empty() {
            log::warn!("No jobs returned by any board, serving static listings");
            return fallback_jobs(profile);
        }

        log::info!("Fetched {} jobs", jobs.len());
        self.store_cached_jobs(&params, &jobs, now);
        process_jobs(jobs, profile)
    }

    async fn fetch_from_providers(
        &self,
        params: &SearchParams,
        now: DateTime<Utc>,
    ) -> Vec<JobListing> {
        let mut all_jobs = Vec::new();

        for source in JobSource::PROVIDERS {
            if all_jobs.len() >= ENOUGH_JOBS {
                break;
            }
            if !self.is_configured(source) {
                continue;
            }
            if !self.within_rate_limit(source, now) {
                log::info!("{} daily limit reached, skipping", source.display_name());
                continue;
            }

            match self.fetch_from(source, params, now).await {
                Ok(jobs) => {
                    log::debug!("{} returned {} jobs", source.display_name(), jobs.len());
                    all_jobs.extend(jobs);
                    self.record_request(source, now);
                }
                Err(e) => log::warn!("{} API failed: {}", source.display_name(), e),
            }
        }

        dedupe_jobs(all_jobs)
    }

    async fn fetch_from(
        &self,
        source: JobSource,
        params: &SearchParams,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobListing>, JobSearchError> {
        match source {
            JobSource::Adzuna => self.fetch_from_adzuna(params, now).await,
            JobSource::Jooble => self.fetch_from_jooble(params, now).await,
            JobSource::CareerJet => self.fetch_from_careerjet(params, now).await,
            JobSource::Fallback => Ok(Vec::new()),
        }
    }

    fn is_configured(&self, source: JobSource) -> bool {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        match source {
            JobSource::Adzuna => {
                present(&self.settings.adzuna.app_id) && present(&self.settings.adzuna.app_key)
            }
            JobSource::Jooble => present(&self.settings.jooble.api_key),
            JobSource::CareerJet => present(&self.settings.careerjet.affiliate_id),
            JobSource::Fallback => false,
        }
    }

    async fn fetch_from_adzuna(
        &self,
        params: &SearchParams,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobListing>, JobSearchError> {
        let adzuna = &self.settings.adzuna;
        let (Some(app_id), Some(app_key)) = (&adzuna.app_id, &adzuna.app_key) else {
            return Err(JobSearchError::NotConfigured("Adzuna"));
        };
        let url = format!(
            "{}/{}/search/1",
            adzuna.base_url.trim_end_matches('/'),
            adzuna.country
        );
        log::debug!("Fetching from Adzuna: {}", url);

        let per_page = RESULTS_PER_PAGE.to_string();
        let request = self.http.get(&url).query(&[
            ("app_id", app_id.as_str()),
            ("app_key", app_key.as_str()),
            ("what", params.keywords.as_str()),
            ("where", params.location.as_str()),
            ("results_per_page", per_page.as_str()),
            ("sort_by", "relevance"),
        ]);
        let data: AdzunaResponse = self.send(JobSource::Adzuna, request).await?;

        Ok(data
            .results
            .into_iter()
            .map(|job| {
                let company = job.company.and_then(|company| company.display_name);
                let description = job.description.unwrap_or_default();
                JobListing {
                    id: format!("adzuna_{}", id_string(&job.id)),
                    title: job.title,
                    logo: logo_for(company.as_deref()),
                    company: company.unwrap_or_else(|| "Company Name".to_string()),
                    location: job
                        .location
                        .and_then(|location| location.display_name)
                        .unwrap_or_else(|| params.location.clone()),
                    salary: format_salary(job.salary_min, job.salary_max),
                    job_type: non_empty(job.contract_type)
                        .unwrap_or_else(|| "Full-time".to_string()),
                    skills: extract_skills(&description),
                    description,
                    apply_url: job.redirect_url,
                    posted: format_posted(job.created.as_deref(), now),
                    source: JobSource::Adzuna,
                    match_score: None,
                }
            })
            .collect())
    }

    async fn fetch_from_jooble(
        &self,
        params: &SearchParams,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobListing>, JobSearchError> {
        let jooble = &self.settings.jooble;
        let Some(api_key) = &jooble.api_key else {
            return Err(JobSearchError::NotConfigured("Jooble"));
        };
        let url = format!("{}/{}", jooble.base_url.trim_end_matches('/'), api_key);
        log::debug!("Fetching from Jooble");

        let request = self.http.post(&url).json(&json!({
            "keywords": params.keywords,
            "location": params.location,
            "page": 1,
        }));
        let data: JoobleResponse = self.send(JobSource::Jooble, request).await?;

        Ok(data
            .jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| {
                let id = match id_string(&job.id) {
                    id if id.is_empty() => index.to_string(),
                    id => id,
                };
                let company = non_empty(job.company);
                let description = job.snippet.unwrap_or_default();
                JobListing {
                    id: format!("jooble_{}", id),
                    title: job.title,
                    logo: logo_for(company.as_deref()),
                    company: company.unwrap_or_else(|| "Company Name".to_string()),
                    location: non_empty(job.location).unwrap_or_else(|| params.location.clone()),
                    salary: non_empty(job.salary)
                        .unwrap_or_else(|| "Salary not specified".to_string()),
                    job_type: non_empty(job.job_type).unwrap_or_else(|| "Full-time".to_string()),
                    skills: extract_skills(&description),
                    description,
                    apply_url: job.link,
                    posted: format_posted(job.updated.as_deref(), now),
                    source: JobSource::Jooble,
                    match_score: None,
                }
            })
            .collect())
    }

    async fn fetch_from_careerjet(
        &self,
        params: &SearchParams,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobListing>, JobSearchError> {
        let careerjet = &self.settings.careerjet;
        let Some(affiliate_id) = &careerjet.affiliate_id else {
            return Err(JobSearchError::NotConfigured("CareerJet"));
        };
        log::debug!("Fetching from CareerJet");

        let page_size = RESULTS_PER_PAGE.to_string();
        let request = self.http.get(&careerjet.base_url).query(&[
            ("affid", affiliate_id.as_str()),
            ("keywords", params.keywords.as_str()),
            ("location", params.location.as_str()),
            ("pagesize", page_size.as_str()),
            ("page", "1"),
            ("sort", "relevance"),
            ("contracttype", "p"),
        ]);
        let data: CareerJetResponse = self.send(JobSource::CareerJet, request).await?;

        Ok(data
            .jobs
            .into_iter()
            .map(|job| {
                let company = non_empty(job.company);
                let description = job.jobdescription.unwrap_or_default();
                JobListing {
                    id: format!("careerjet_{}", id_string(&job.jobid)),
                    title: job.jobtitle,
                    logo: logo_for(company.as_deref()),
                    company: company.unwrap_or_else(|| "Company Name".to_string()),
                    location: non_empty(job.locations).unwrap_or_else(|| params.location.clone()),
                    salary: non_empty(job.salary)
                        .unwrap_or_else(|| "Salary not specified".to_string()),
                    job_type: non_empty(job.contracttype)
                        .unwrap_or_else(|| "Full-time".to_string()),
                    skills: extract_skills(&description),
                    description,
                    apply_url: job.url,
                    posted: format_posted(job.date.as_deref(), now),
                    source: JobSource::CareerJet,
                    match_score: None,
                }
            })
            .collect())
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        source: JobSource,
        request: reqwest::RequestBuilder,
    ) -> Result<T, JobSearchError> {
        let response = request
            .send()
            .await
            .map_err(|e| JobSearchError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JobSearchError::ProviderError {
                provider: source.display_name(),
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| JobSearchError::DecodeError(e.to_string()))
    }

    fn cached_jobs(&self, params: &SearchParams, now: DateTime<Utc>) -> Option<Vec<JobListing>> {
        let key = params.cache_key();
        let raw = match self.store.get_item(&key) {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("Cache read error: {}", e);
                return None;
            }
        };

        let cached: CachedJobs = match serde_json::from_str(&raw) {
            Ok(cached) => cached,
            Err(e) => {
                log::warn!("Discarding unreadable cache entry: {}", e);
                self.forget_cache_entry(&key);
                return None;
            }
        };

        let ttl_ms = i64::try_from(self.settings.cache_ttl_secs)
            .unwrap_or(i64::MAX / 1000)
            .saturating_mul(1000);
        if now.timestamp_millis() - cached.timestamp < ttl_ms {
            Some(cached.data)
        } else {
            log::debug!("Cache entry expired: {}", key);
            self.forget_cache_entry(&key);
            None
        }
    }

    fn store_cached_jobs(&self, params: &SearchParams, jobs: &[JobListing], now: DateTime<Utc>) {
        if let Err(e) = self.try_store_cached_jobs(params, jobs, now) {
            log::warn!("Cache write error: {}", e);
        }
    }

    fn try_store_cached_jobs(
        &self,
        params: &SearchParams,
        jobs: &[JobListing],
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let key = params.cache_key();
        let entry = serde_json::to_string(&CachedJobs {
            data: jobs.to_vec(),
            timestamp: now.timestamp_millis(),
        })?;

        // Oldest entries go first once the index is full.
        let mut index = self.cache_index()?;
        index.retain(|existing| existing != &key);
        index.push(key.clone());
        let overflow = index.len().saturating_sub(self.settings.cache_max_entries.max(1));
        let evicted: Vec<String> = index.drain(..overflow).collect();

        self.store.multi_set(&[
            (key.as_str(), entry),
            (CACHE_INDEX_KEY, serde_json::to_string(&index)?),
        ])?;
        if !evicted.is_empty() {
            let evicted: Vec<&str> = evicted.iter().map(String::as_str).collect();
            self.store.multi_remove(&evicted)?;
        }
        Ok(())
    }

    fn cache_index(&self) -> Result<Vec<String>, StorageError> {
        match self.store.get_item(CACHE_INDEX_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn forget_cache_entry(&self, key: &str) {
        let result = self.cache_index().and_then(|mut index| {
            index.retain(|existing| existing != key);
            self.store.multi_remove(&[key])?;
            self.store
                .set_item(CACHE_INDEX_KEY, serde_json::to_string(&index)?)
        });
        if let Err(e) = result {
            log::warn!("Failed to drop cache entry {}: {}", key, e);
        }
    }

    /// Drops every cached search. Bookmarks and rate-limit counters stay.
    pub fn clear_cache(&self) -> Result<(), StorageError> {
        let index = self.cache_index()?;
        let mut keys: Vec<&str> = index.iter().map(String::as_str).collect();
        keys.push(CACHE_INDEX_KEY);
        self.store.multi_remove(&keys)?;
        log::info!("Job cache cleared ({} entries)", index.len());
        Ok(())
    }

    fn rate_limit_key(source: JobSource, now: DateTime<Utc>) -> String {
        format!(
            "{}{}_{}",
            RATE_LIMIT_PREFIX,
            source.key(),
            now.date_naive().format("%Y-%m-%d")
        )
    }

    fn daily_limit(&self, source: JobSource) -> u32 {
        match source {
            JobSource::Adzuna => self.settings.adzuna.daily_limit,
            JobSource::Jooble => self.settings.jooble.daily_limit,
            JobSource::CareerJet => self.settings.careerjet.daily_limit,
            JobSource::Fallback => 0,
        }
    }

    /// Requests made to `source` on the calendar day of `now`.
    pub fn requests_today(
        &self,
        source: JobSource,
        now: DateTime<Utc>,
    ) -> Result<u32, StorageError> {
        let raw = self.store.get_item(&Self::rate_limit_key(source, now))?;
        Ok(raw.and_then(|count| count.trim().parse().ok()).unwrap_or(0))
    }

    fn within_rate_limit(&self, source: JobSource, now: DateTime<Utc>) -> bool {
        match self.requests_today(source, now) {
            Ok(count) => count < self.daily_limit(source),
            Err(e) => {
                log::warn!("Rate limit check failed, allowing request: {}", e);
                true
            }
        }
    }

    fn record_request(&self, source: JobSource, now: DateTime<Utc>) {
        let result = self.requests_today(source, now).and_then(|count| {
            self.store
                .set_item(&Self::rate_limit_key(source, now), (count + 1).to_string())
        });
        if let Err(e) = result {
            log::warn!("Rate limit update error: {}", e);
        }
    }

    pub fn bookmarks(&self) -> Result<Vec<JobListing>, StorageError> {
        match self.store.get_item(BOOKMARKS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Bookmarks `job`, or removes it if already bookmarked. Returns whether
    /// the job is bookmarked afterwards.
    pub fn toggle_bookmark(&self, job: &JobListing) -> Result<bool, StorageError> {
        let mut bookmarks = self.bookmarks()?;
        let bookmarked = match bookmarks.iter().position(|saved| saved.id == job.id) {
            Some(index) => {
                bookmarks.remove(index);
                false
            }
            None => {
                bookmarks.push(job.clone());
                true
            }
        };
        self.store
            .set_item(BOOKMARKS_KEY, serde_json::to_string(&bookmarks)?)?;
        Ok(bookmarked)
    }
}

/// Scores every listing, best first, and keeps the top ten.
pub fn process_jobs(jobs: Vec<JobListing>, profile: Option<&JobSearchProfile>) -> Vec<JobListing> {
    let mut scored: Vec<JobListing> = jobs
        .into_iter()
        .map(|mut job| {
            job.match_score = Some(match_score(&job, profile));
            job
        })
        .collect();
    scored.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    scored.truncate(TOP_MATCHES);
    scored
}

/// 0-100 fit of `job` for `profile`. Without a profile every job scores 75.
pub fn match_score(job: &JobListing, profile: Option<&JobSearchProfile>) -> u32 {
    let Some(profile) = profile else {
        return 75;
    };

    let mut score = 50;

    let job_text = format!("{} {}", job.title, job.description).to_lowercase();
    for skill in &profile.skills {
        let skill = skill.to_lowercase();
        let listed = job
            .skills
            .iter()
            .any(|job_skill| job_skill.to_lowercase().contains(&skill));
        if job_text.contains(&skill) || listed {
            score += 10;
        }
    }
    score = score.min(90);

    let title = job.title.to_lowercase();
    let senior = title.contains("senior");
    let junior = title.contains("junior");
    score += match profile.experience() {
        "entry" if junior || title.contains("entry") => 15,
        "mid" if !senior && !junior => 15,
        "mid" if junior => 10,
        "senior" if senior => 15,
        _ => 0,
    };

    let mentions_remote = job.location.to_lowercase().contains("remote")
        || job.description.to_lowercase().contains("remote");
    if profile.remote_work_preference && mentions_remote {
        score += 5;
    }

    score += job.source.quality_bonus();
    score.min(100)
}

/// Well-known skills named in `description`, at most five.
pub fn extract_skills(description: &str) -> Vec<String> {
    let description = description.to_lowercase();
    COMMON_SKILLS
        .iter()
        .filter(|skill| mentions_word(&description, &skill.to_lowercase()))
        .take(MAX_EXTRACTED_SKILLS)
        .map(|skill| skill.to_string())
        .collect()
}

/// `"$50k - $76k"`, `"$80k+"`, `"Up to $120k"`. Zero counts as absent.
pub fn format_salary(min: Option<f64>, max: Option<f64>) -> String {
    let thousands = |value: f64| (value / 1000.0).round() as i64;
    match (min.filter(|v| *v > 0.0), max.filter(|v| *v > 0.0)) {
        (Some(min), Some(max)) => format!("${}k - ${}k", thousands(min), thousands(max)),
        (Some(min), None) => format!("${}k+", thousands(min)),
        (None, Some(max)) => format!("Up to ${}k", thousands(max)),
        (None, None) => "Salary not specified".to_string(),
    }
}

/// Relative age of a posting, e.g. `"3 days ago"`.
pub fn format_posted(date: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(posted) = date.and_then(parse_posted_date) else {
        return "Recently posted".to_string();
    };

    let diff_ms = (now - posted).num_milliseconds().abs();
    let days = (diff_ms + DAY_MS - 1) / DAY_MS;
    match days {
        1 => "1 day ago".to_string(),
        d if d < 7 => format!("{} days ago", d),
        d if d < 14 => "1 week ago".to_string(),
        d if d < 30 => format!("{} weeks ago", d / 7),
        d => format!("{} months ago", d / 30),
    }
}

fn parse_posted_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&date));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| Utc.from_utc_datetime(&date))
}

/// Keeps the first listing per (title, company), case-insensitively.
pub fn dedupe_jobs(jobs: Vec<JobListing>) -> Vec<JobListing> {
    let mut seen = HashSet::new();
    jobs.into_iter()
        .filter(|job| {
            seen.insert(format!(
                "{}_{}",
                job.title.to_lowercase(),
                job.company.to_lowercase()
            ))
        })
        .collect()
}

/// Static listings used when no board is configured or all come back empty.
pub fn fallback_jobs(profile: Option<&JobSearchProfile>) -> Vec<JobListing> {
    let experience = profile.map(JobSearchProfile::experience).unwrap_or("mid");
    let (title, salary) = match experience {
        "entry" => ("Junior Software Engineer", "$70k - $90k"),
        "senior" => ("Senior Software Engineer", "$120k - $160k"),
        _ => ("Software Engineer", "$90k - $120k"),
    };

    vec![
        JobListing {
            id: "fallback_1".to_string(),
            title: title.to_string(),
            company: "Tech Company".to_string(),
            location: "Remote".to_string(),
            salary: salary.to_string(),
            job_type: "Full-time".to_string(),
            description: "Join our team to build amazing software products.".to_string(),
            apply_url: Some("https://careers.google.com/".to_string()),
            posted: "2 days ago".to_string(),
            skills: vec!["JavaScript".into(), "React".into(), "Node.js".into()],
            source: JobSource::Fallback,
            logo: "T".to_string(),
            match_score: Some(85),
        },
        JobListing {
            id: "fallback_2".to_string(),
            title: "Product Manager".to_string(),
            company: "Innovation Corp".to_string(),
            location: "San Francisco, CA".to_string(),
            salary: "$100k - $140k".to_string(),
            job_type: "Full-time".to_string(),
            description: "Lead product development and strategy.".to_string(),
            apply_url: Some("https://jobs.apple.com/".to_string()),
            posted: "1 week ago".to_string(),
            skills: vec!["Product Strategy".into(), "Analytics".into(), "Leadership".into()],
            source: JobSource::Fallback,
            logo: "I".to_string(),
            match_score: Some(80),
        },
    ]
}

/// `needle` occurs in `haystack` with no letter or digit on either side.
fn mentions_word(haystack: &str, needle: &str) -> bool {
    let is_word = |c: Option<char>| c.is_some_and(char::is_alphanumeric);
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !is_word(before) && !is_word(after)
    })
}

fn id_string(id: &Value) -> String {
    match id {
        Value::String(id) => id.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn logo_for(company: Option<&str>) -> String {
    company
        .and_then(|company| company.chars().next())
        .map(String::from)
        .unwrap_or_else(|| "C".to_string())
}
