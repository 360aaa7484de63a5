use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::json,
};

use switchboard_platforms::{Error, PlatformInstance, PlatformType, Result};

/// Thin Dify chat API client for one application.
#[derive(Debug)]
pub struct DifyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Secret<String>,
}

/// Reply to a blocking chat-message call.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatAnswer {
    /// Raw answer payload. Usually a string; occasionally an array (a known
    /// upstream quirk shaping deals with).
    pub answer: serde_json::Value,
    /// Continuity token for follow-up turns.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl DifyClient {
    /// Build a client from an instance record. Incomplete credentials
    /// degrade the client instead of failing at startup.
    pub fn from_instance(http: reqwest::Client, instance: &PlatformInstance) -> Result<Self> {
        if instance.credentials.base_url.is_empty() {
            return Err(Error::not_configured(
                PlatformType::Dify,
                format!("instance '{}' has no base url", instance.id),
            ));
        }
        if instance.credentials.token_is_empty() {
            return Err(Error::not_configured(
                PlatformType::Dify,
                format!("instance '{}' has no api key", instance.id),
            ));
        }
        Ok(Self {
            http,
            base_url: instance.credentials.base_url.trim_end_matches('/').to_string(),
            api_key: instance.credentials.token.clone(),
        })
    }

    /// Send one user turn and wait for the full answer.
    ///
    /// `conversation_id` attaches the continuity token from a previous turn;
    /// `None` starts a fresh, stateless turn.
    pub async fn send_chat_message(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        user: &str,
    ) -> Result<ChatAnswer> {
        let mut payload = json!({
            "query": query,
            "user": user,
            "inputs": {},
            "response_mode": "blocking",
        });
        if let Some(token) = conversation_id.filter(|t| !t.is_empty())
            && let Some(obj) = payload.as_object_mut()
        {
            obj.insert(
                "conversation_id".into(),
                serde_json::Value::String(token.into()),
            );
        }

        let url = format!("{}/chat-messages", self.base_url);
        let resp = self
            .http
            .post(url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::transport(PlatformType::Dify, "chat message", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::api(PlatformType::Dify, status.as_u16(), body));
        }
        resp.json::<ChatAnswer>()
            .await
            .map_err(|e| Error::transport(PlatformType::Dify, "chat message", e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use switchboard_platforms::InstanceCredentials;

    use super::*;

    fn instance(base_url: &str) -> PlatformInstance {
        PlatformInstance {
            id: "ai-1".into(),
            platform: PlatformType::Dify,
            display_name: "Support AI".into(),
            credentials: InstanceCredentials {
                base_url: base_url.into(),
                token: Secret::new("app-key".into()),
                app_id: Some("app-1".into()),
                ..Default::default()
            },
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn fresh_turn_omits_conversation_id() {
        let mut server = mockito::Server::new_async().await;
        // Exact body match: proves conversation_id is absent on fresh turns.
        let mock = server
            .mock("POST", "/chat-messages")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "query": "hello",
                "user": "42",
                "inputs": {},
                "response_mode": "blocking",
            })))
            .with_status(200)
            .with_body(r#"{"answer":"hi there","conversation_id":"conv-1"}"#)
            .create_async()
            .await;

        let client =
            DifyClient::from_instance(reqwest::Client::new(), &instance(&server.url())).unwrap();
        let answer = client.send_chat_message("hello", None, "42").await.unwrap();
        assert_eq!(answer.answer, serde_json::json!("hi there"));
        assert_eq!(answer.conversation_id.as_deref(), Some("conv-1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn continuity_token_attached_when_present() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat-messages")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "conversation_id": "conv-1",
            })))
            .with_status(200)
            .with_body(r#"{"answer":"again","conversation_id":"conv-1"}"#)
            .create_async()
            .await;

        let client =
            DifyClient::from_instance(reqwest::Client::new(), &instance(&server.url())).unwrap();
        client
            .send_chat_message("more", Some("conv-1"), "42")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_error_maps_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat-messages")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let client =
            DifyClient::from_instance(reqwest::Client::new(), &instance(&server.url())).unwrap();
        let err = client
            .send_chat_message("hello", None, "42")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
    }

    #[test]
    fn missing_api_key_degrades() {
        let mut inst = instance("http://localhost");
        inst.credentials.token = Secret::new(String::new());
        let err = DifyClient::from_instance(reqwest::Client::new(), &inst).unwrap_err();
        assert!(matches!(err, Error::NotConfigured { .. }));
    }
}
