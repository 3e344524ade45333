use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareerJob {
    pub id: String,
    pub name: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareerCategory {
    pub id: String,
    pub name: String,
    pub jobs: Vec<CareerJob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceLevel {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// A job flattened out of its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRef {
    pub id: String,
    pub name: String,
    pub skills: Vec<String>,
    pub category_id: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
struct CatalogData {
    categories: Vec<CareerCategory>,
    experience_levels: Vec<ExperienceLevel>,
    additional_skills: Vec<String>,
}

static CATALOG: Lazy<CatalogData> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../data/careers.json"))
        .expect("bundled career catalog is valid JSON")
});

static ALL_JOBS: Lazy<Vec<JobRef>> = Lazy::new(|| {
    CATALOG
        .categories
        .iter()
        .flat_map(|category| {
            category.jobs.iter().map(move |job| JobRef {
                id: job.id.clone(),
                name: job.name.clone(),
                skills: job.skills.clone(),
                category_id: category.id.clone(),
                category: category.name.clone(),
            })
        })
        .collect()
});

pub fn categories() -> &'static [CareerCategory] {
    &CATALOG.categories
}

pub fn experience_levels() -> &'static [ExperienceLevel] {
    &CATALOG.experience_levels
}

pub fn additional_skills() -> &'static [String] {
    &CATALOG.additional_skills
}

pub fn all_jobs() -> &'static [JobRef] {
    &ALL_JOBS
}

pub fn job_by_id(job_id: &str) -> Option<&'static JobRef> {
    ALL_JOBS.iter().find(|job| job.id == job_id)
}

pub fn category_by_id(category_id: &str) -> Option<&'static CareerCategory> {
    CATALOG.categories.iter().find(|category| category.id == category_id)
}

pub fn jobs_by_category(category_id: &str) -> &'static [CareerJob] {
    category_by_id(category_id)
        .map(|category| category.jobs.as_slice())
        .unwrap_or(&[])
}

/// Jobs with a skill containing `skill`, case-insensitively.
pub fn jobs_by_skill(skill: &str) -> Vec<&'static JobRef> {
    let needle = skill.to_lowercase();
    ALL_JOBS
        .iter()
        .filter(|job| {
            job.skills
                .iter()
                .any(|job_skill| job_skill.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        assert_eq!(categories().len(), 13);
        assert_eq!(experience_levels().len(), 5);
        assert!(additional_skills().iter().any(|skill| skill == "Rust"));
        assert_eq!(
            all_jobs().len(),
            categories().iter().map(|category| category.jobs.len()).sum::<usize>()
        );
    }

    #[test]
    fn test_job_by_id_carries_category() {
        let job = job_by_id("data-scientist").unwrap();
        assert_eq!(job.name, "Data Scientist");
        assert_eq!(job.category_id, "technology");
        assert_eq!(job.category, "Technology & Engineering");
        assert!(job_by_id("wizard").is_none());
    }

    #[test]
    fn test_jobs_by_category() {
        assert_eq!(jobs_by_category("education-training").len(), 10);
        assert!(jobs_by_category("missing").is_empty());
        assert_eq!(category_by_id("creative-media").unwrap().name, "Creative & Media");
    }

    #[test]
    fn test_jobs_by_skill_is_case_insensitive_substring() {
        let jobs = jobs_by_skill("tensorflow");
        let ids: Vec<&str> = jobs.iter().map(|job| job.id.as_str()).collect();
        assert!(ids.contains(&"data-scientist"));
        assert!(ids.contains(&"ai-ml-engineer"));
        assert!(!ids.contains(&"nurse"));
    }
}
