pub mod client;
pub mod jwt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bearer credentials issued by the backend. Both values are opaque to the
/// client apart from the expiry claim read in [`jwt`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// The authenticated user's profile as returned by the backend. The shape is
/// not validated; fields are read on demand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRecord(pub Value);

impl UserRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn email(&self) -> Option<&str> {
        self.get("email").and_then(Value::as_str)
    }

    /// `profile.career_interests`, empty when absent.
    pub fn career_interests(&self) -> Vec<String> {
        self.0
            .pointer("/profile/career_interests")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Shallow merge: top-level keys of `partial` overwrite existing ones.
    pub fn merged(&self, partial: &Value) -> UserRecord {
        let mut base = match &self.0 {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        if let Value::Object(update) = partial {
            for (key, value) in update {
                base.insert(key.clone(), value.clone());
            }
        }
        UserRecord(Value::Object(base))
    }
}

/// Body of a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub tokens: TokenPair,
    pub user: UserRecord,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_career_interests_missing_profile() {
        let user = UserRecord(json!({ "email": "user@example.com" }));
        assert!(user.career_interests().is_empty());
        assert_eq!(user.email(), Some("user@example.com"));
    }

    #[test]
    fn test_career_interests_present() {
        let user = UserRecord(json!({
            "profile": { "career_interests": ["Data Analyst", "Economist"] }
        }));
        assert_eq!(user.career_interests(), vec!["Data Analyst", "Economist"]);
    }

    #[test]
    fn test_merged_overwrites_top_level_keys() {
        let user = UserRecord(json!({ "first_name": "Ada", "profile": { "bio": "x" } }));
        let merged = user.merged(&json!({ "first_name": "Grace" }));
        assert_eq!(merged.get("first_name"), Some(&json!("Grace")));
        assert_eq!(merged.get("profile"), Some(&json!({ "bio": "x" })));
    }

    #[test]
    fn test_token_pair_debug_hides_values() {
        let pair = TokenPair {
            access: "secret-access".to_string(),
            refresh: "secret-refresh".to_string(),
        };
        let rendered = format!("{:?}", pair);
        assert!(!rendered.contains("secret"));
    }
}
