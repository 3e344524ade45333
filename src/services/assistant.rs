use crate::api::client::{ApiClient, ApiError};
use crate::api::UserRecord;
use serde::Serialize;
use serde_json::{json, Value};

const CONVERSATIONS_ENDPOINT: &str = "/ai/chat/conversations/";
const GENERATE_ROADMAP_ENDPOINT: &str = "/ai/generate-roadmap/";

const DEFAULT_CONVERSATION_TITLE: &str = "Career Chat";
const DEFAULT_TIMEFRAME: &str = "6 months";

/// Context sent alongside chat messages so the assistant can tailor answers.
#[derive(Debug, Clone, Serialize)]
pub struct ChatContext {
    pub user_profile: ChatProfile,
    pub conversation_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatProfile {
    pub name: String,
    pub career_level: String,
    pub industry: String,
}

impl ChatContext {
    pub fn for_user(user: Option<&UserRecord>) -> Self {
        let text = |pointer: &str, fallback: &str| {
            user.and_then(|user| user.0.pointer(pointer))
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };

        Self {
            user_profile: ChatProfile {
                name: text("/first_name", "User"),
                career_level: text("/profile/career_level", "Not specified"),
                industry: text("/profile/industry", "Not specified"),
            },
            conversation_type: "career_guidance".to_string(),
        }
    }
}

/// A sent message and the assistant's reply.
#[derive(Debug, Clone)]
pub struct ChatExchange {
    pub user_message: Value,
    pub ai_response: Value,
}

pub struct AssistantService {
    client: ApiClient,
}

impl AssistantService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn conversations(&self) -> Result<Vec<Value>, ApiError> {
        let response = self.client.get(CONVERSATIONS_ENDPOINT).await?;
        Ok(list_field(response, "conversations"))
    }

    pub async fn messages(&self, conversation_id: i64) -> Result<Vec<Value>, ApiError> {
        let response = self
            .client
            .get(&conversation_endpoint(conversation_id))
            .await?;
        Ok(list_field(response, "messages"))
    }

    /// Starts a conversation and returns the backend's `conversation` object.
    pub async fn create_conversation(&self, context: &ChatContext) -> Result<Value, ApiError> {
        let body = json!({
            "title": DEFAULT_CONVERSATION_TITLE,
            "initial_message": { "context": context },
        });
        let mut response = self.client.post(CONVERSATIONS_ENDPOINT, &body).await?;
        match response.get_mut("conversation") {
            Some(conversation) => Ok(conversation.take()),
            None => Err(ApiError::DecodeError("missing conversation".to_string())),
        }
    }

    pub async fn send_message(
        &self,
        conversation_id: i64,
        message: &str,
        context: &ChatContext,
    ) -> Result<ChatExchange, ApiError> {
        let body = json!({ "message": message.trim(), "context": context });
        let mut response = self
            .client
            .post(&conversation_endpoint(conversation_id), &body)
            .await?;

        let user_message = response.get_mut("user_message").map(Value::take);
        let ai_response = response.get_mut("ai_response").map(Value::take);
        match (user_message, ai_response) {
            (Some(user_message), Some(ai_response)) => Ok(ChatExchange {
                user_message,
                ai_response,
            }),
            _ => Err(ApiError::DecodeError("unexpected chat response shape".to_string())),
        }
    }

    /// Asks the assistant for a learning roadmap; `timeframe` defaults to six
    /// months.
    pub async fn generate_roadmap(
        &self,
        goal: &str,
        timeframe: Option<&str>,
    ) -> Result<Value, ApiError> {
        let body = json!({
            "goal": goal.trim(),
            "timeframe": timeframe.unwrap_or(DEFAULT_TIMEFRAME),
        });
        let mut response = self.client.post(GENERATE_ROADMAP_ENDPOINT, &body).await?;
        Ok(response
            .get_mut("roadmap")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}

fn conversation_endpoint(conversation_id: i64) -> String {
    format!("{}{}/", CONVERSATIONS_ENDPOINT, conversation_id)
}

fn list_field(mut response: Value, field: &str) -> Vec<Value> {
    match response.get_mut(field).map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TokenStore;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_for(server: &MockServer) -> AssistantService {
        AssistantService::new(ApiClient::new(
            format!("{}/api", server.uri()),
            TokenStore::in_memory(),
        ))
    }

    #[test]
    fn test_context_falls_back_when_profile_is_sparse() {
        let context = ChatContext::for_user(None);
        assert_eq!(context.user_profile.name, "User");
        assert_eq!(context.user_profile.industry, "Not specified");

        let user = UserRecord(json!({ "first_name": "Ada", "profile": { "industry": "Tech" } }));
        let context = ChatContext::for_user(Some(&user));
        assert_eq!(context.user_profile.name, "Ada");
        assert_eq!(context.user_profile.industry, "Tech");
        assert_eq!(context.user_profile.career_level, "Not specified");
    }

    #[tokio::test]
    async fn test_conversations_missing_list_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ai/chat/conversations/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        assert!(service_for(&server).conversations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_messages_for_conversation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ai/chat/conversations/12/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{ "id": 1, "content": "hi" }, { "id": 2, "content": "hello" }]
            })))
            .mount(&server)
            .await;

        assert_eq!(service_for(&server).messages(12).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_send_message_returns_both_sides() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/chat/conversations/3/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user_message": { "id": 10, "content": "How do I start?" },
                "ai_response": { "id": 11, "content": "Begin with SQL." }
            })))
            .mount(&server)
            .await;

        let exchange = service_for(&server)
            .send_message(3, "  How do I start?  ", &ChatContext::for_user(None))
            .await
            .unwrap();
        assert_eq!(exchange.ai_response["content"], "Begin with SQL.");
    }

    #[tokio::test]
    async fn test_create_conversation_extracts_conversation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/chat/conversations/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "conversation": { "id": 5, "title": "Career Chat" }
            })))
            .mount(&server)
            .await;

        let conversation = service_for(&server)
            .create_conversation(&ChatContext::for_user(None))
            .await
            .unwrap();
        assert_eq!(conversation["id"], 5);
    }

    #[tokio::test]
    async fn test_generate_roadmap_default_timeframe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/generate-roadmap/"))
            .and(body_json(json!({ "goal": "Become a data engineer", "timeframe": "6 months" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "message": "Roadmap generated successfully",
                "roadmap": { "title": "Data Engineering", "phases": [] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let roadmap = service_for(&server)
            .generate_roadmap(" Become a data engineer ", None)
            .await
            .unwrap();
        assert_eq!(roadmap["title"], "Data Engineering");
        server.verify().await;
    }
}
