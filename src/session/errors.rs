use crate::api::client::ApiError;
use serde::Serialize;
use serde_json::{Map, Value};

const GENERAL_KEY: &str = "general";

/// Why a session operation failed, in the shape forms consume: either
/// field-keyed messages (mirroring backend validation responses) or one
/// general message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AuthFailure {
    Fields(Map<String, Value>),
    Message(String),
}

impl AuthFailure {
    pub fn general(message: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(GENERAL_KEY.to_string(), Value::String(message.into()));
        AuthFailure::Fields(fields)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            AuthFailure::Fields(fields) => fields.get(name),
            AuthFailure::Message(_) => None,
        }
    }

    /// The single message to show when no field can be highlighted.
    pub fn general_message(&self) -> Option<&str> {
        match self {
            AuthFailure::Fields(fields) => fields.get(GENERAL_KEY).and_then(Value::as_str),
            AuthFailure::Message(message) => Some(message),
        }
    }

    pub(crate) fn from_login_error(error: &ApiError) -> Self {
        let Some(Value::Object(body)) = error.body() else {
            return AuthFailure::Message(error.to_string());
        };

        if let Some(errors) = body.get("non_field_errors") {
            let message = errors
                .get(0)
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .unwrap_or("Invalid credentials");
            return AuthFailure::general(message);
        }

        for field in ["email", "password"] {
            if let Some(messages) = body.get(field) {
                let mut fields = Map::new();
                fields.insert(field.to_string(), messages.clone());
                return AuthFailure::Fields(fields);
            }
        }

        if let Some(detail) = body.get("detail") {
            let message = match detail {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            return AuthFailure::general(message);
        }

        AuthFailure::Fields(body.clone())
    }

    pub(crate) fn from_register_error(error: &ApiError) -> Self {
        match error.body() {
            Some(Value::Object(body)) => AuthFailure::Fields(body.clone()),
            _ => AuthFailure::Message(error.to_string()),
        }
    }
}

/// `{success: true}` or `{success: false, error}` for callers that want the
/// serialized shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AuthFailure>,
}

impl<T> From<Result<T, AuthFailure>> for AuthOutcome {
    fn from(result: Result<T, AuthFailure>) -> Self {
        match result {
            Ok(_) => AuthOutcome {
                success: true,
                error: None,
            },
            Err(error) => AuthOutcome {
                success: false,
                error: Some(error),
            },
        }
    }
}
