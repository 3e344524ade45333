//! Career catalog and compatibility rules
//!
//! Static data bundled with the client. The compatibility table decides which
//! careers a user may pick together; it is a plain adjacency list.

mod catalog;

pub use catalog::{
    additional_skills, all_jobs, categories, category_by_id, experience_levels, job_by_id,
    jobs_by_category, jobs_by_skill, CareerCategory, CareerJob, ExperienceLevel, JobRef,
};

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

pub const MAX_CAREER_SELECTIONS: usize = 3;

static COMPATIBILITY: Lazy<HashMap<String, HashSet<String>>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../data/compatibility.json"))
        .expect("bundled compatibility table is valid JSON")
});

static NO_MATCHES: Lazy<HashSet<String>> = Lazy::new(HashSet::new);

/// Careers listed as combinable with `job_id`. Unlisted careers get the empty
/// default list.
pub fn compatible_with(job_id: &str) -> &'static HashSet<String> {
    COMPATIBILITY.get(job_id).unwrap_or(&NO_MATCHES)
}

/// Whether `candidate` may join `selected`. Every selected career must list
/// the candidate, be listed by it, or both must have empty lists.
pub fn is_compatible<S: AsRef<str>>(candidate: &str, selected: &[S]) -> bool {
    let candidate_list = compatible_with(candidate);
    selected.iter().all(|current| {
        let current = current.as_ref();
        let current_list = compatible_with(current);
        candidate_list.contains(current)
            || current_list.contains(candidate)
            || (candidate_list.is_empty() && current_list.is_empty())
    })
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("You can only select up to {0} career interests.")]
    LimitReached(usize),
    #[error("{0} doesn't align well with your current selections.")]
    Incompatible(String),
    #[error("Unknown career: {0}")]
    UnknownCareer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Added,
    Removed,
}

/// The careers a user has picked, in pick order.
#[derive(Debug, Clone, Default)]
pub struct CareerSelection {
    selected: Vec<JobRef>,
}

impl CareerSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a selection from the profile's `career_interests`, which may
    /// hold job names or ids. Unknown entries are dropped.
    pub fn from_interests<S: AsRef<str>>(interests: &[S]) -> Self {
        let selected = all_jobs()
            .iter()
            .filter(|job| {
                interests
                    .iter()
                    .any(|interest| interest.as_ref() == job.name || interest.as_ref() == job.id)
            })
            .take(MAX_CAREER_SELECTIONS)
            .cloned()
            .collect();
        Self { selected }
    }

    pub fn toggle(&mut self, job_id: &str) -> Result<SelectionChange, SelectionError> {
        if let Some(index) = self.selected.iter().position(|job| job.id == job_id) {
            self.selected.remove(index);
            return Ok(SelectionChange::Removed);
        }

        let job = job_by_id(job_id)
            .ok_or_else(|| SelectionError::UnknownCareer(job_id.to_string()))?;

        if self.selected.len() >= MAX_CAREER_SELECTIONS {
            return Err(SelectionError::LimitReached(MAX_CAREER_SELECTIONS));
        }
        if !is_compatible(job_id, &self.ids()) {
            return Err(SelectionError::Incompatible(job.name.clone()));
        }

        self.selected.push(job.clone());
        Ok(SelectionChange::Added)
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.selected.iter().any(|job| job.id == job_id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.selected.iter().map(|job| job.id.as_str()).collect()
    }

    /// Names as the profile update endpoint expects them.
    pub fn career_names(&self) -> Vec<String> {
        self.selected.iter().map(|job| job.name.clone()).collect()
    }

    pub fn jobs(&self) -> &[JobRef] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
