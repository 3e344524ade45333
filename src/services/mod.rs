//! Typed wrappers over the backend endpoints the app screens call.
//!
//! Every backend call goes through [`ApiClient`](crate::api::client::ApiClient),
//! so bearer attachment and refresh-on-401 apply uniformly. The job search in
//! [`jobs`] talks to third-party boards directly.

pub mod assistant;
pub mod jobs;
pub mod preferences;
pub mod profile;

pub use assistant::AssistantService;
pub use jobs::{JobListing, JobSearchProfile, JobSearchService};
pub use preferences::{JobPreferences, PreferencesService};
pub use profile::ProfileService;
