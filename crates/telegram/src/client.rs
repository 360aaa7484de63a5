use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, de::DeserializeOwned},
    serde_json::json,
};

use switchboard_platforms::{Error, PlatformInstance, PlatformType, Result};

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Thin Telegram Bot API client for one bot instance.
#[derive(Debug)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: Secret<String>,
}

/// Bot identity as reported by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

/// Current webhook registration as reported by `getWebhookInfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookInfo {
    pub url: String,
    #[serde(default)]
    pub pending_update_count: i64,
    #[serde(default)]
    pub last_error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl TelegramClient {
    /// Build a client from an instance record. Fails with `NotConfigured`
    /// when the bot token is missing, so callers degrade instead of issuing
    /// doomed requests.
    pub fn from_instance(http: reqwest::Client, instance: &PlatformInstance) -> Result<Self> {
        if instance.credentials.token_is_empty() {
            return Err(Error::not_configured(
                PlatformType::Telegram,
                format!("instance '{}' has no bot token", instance.id),
            ));
        }
        let base_url = if instance.credentials.base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            instance.credentials.base_url.clone()
        };
        Ok(Self {
            http,
            base_url,
            token: instance.credentials.token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url.trim_end_matches('/'),
            self.token.expose_secret(),
            method
        )
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: serde_json::Value) -> Result<T> {
        let resp = self
            .http
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::transport(PlatformType::Telegram, method, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::transport(PlatformType::Telegram, method, e))?;
        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|_| {
            Error::api(PlatformType::Telegram, status.as_u16(), body.clone())
        })?;
        if !parsed.ok {
            return Err(Error::api(
                PlatformType::Telegram,
                status.as_u16(),
                parsed
                    .description
                    .unwrap_or_else(|| "unknown bot api error".into()),
            ));
        }
        parsed.result.ok_or_else(|| {
            Error::api(
                PlatformType::Telegram,
                status.as_u16(),
                format!("{method}: ok response without result"),
            )
        })
    }

    /// Verify credentials and fetch the bot identity.
    pub async fn get_me(&self) -> Result<BotIdentity> {
        self.call("getMe", json!({})).await
    }

    /// Send a text message to a chat. `parse_mode` is passed through when
    /// set ("Markdown", "HTML"); plain text otherwise.
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<()> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode
            && let Some(obj) = payload.as_object_mut()
        {
            obj.insert("parse_mode".into(), serde_json::Value::String(mode.into()));
        }
        self.call::<serde_json::Value>("sendMessage", payload)
            .await
            .map(|_| ())
    }

    /// Register the webhook URL for this bot, with an optional secret token
    /// echoed back by Telegram on every delivery.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<()> {
        let mut payload = json!({ "url": url });
        if let Some(secret) = secret_token
            && let Some(obj) = payload.as_object_mut()
        {
            obj.insert(
                "secret_token".into(),
                serde_json::Value::String(secret.into()),
            );
        }
        self.call::<bool>("setWebhook", payload).await.map(|_| ())
    }

    pub async fn get_webhook_info(&self) -> Result<WebhookInfo> {
        self.call("getWebhookInfo", json!({})).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use switchboard_platforms::InstanceCredentials;

    use super::*;

    fn instance(base_url: &str) -> PlatformInstance {
        PlatformInstance {
            id: "bot-1".into(),
            platform: PlatformType::Telegram,
            display_name: "Support Bot".into(),
            credentials: InstanceCredentials {
                base_url: base_url.into(),
                token: Secret::new("123:ABC".into()),
                ..Default::default()
            },
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn missing_token_degrades_to_not_configured() {
        let mut inst = instance("");
        inst.credentials.token = Secret::new(String::new());
        let err = TelegramClient::from_instance(reqwest::Client::new(), &inst).unwrap_err();
        assert!(matches!(err, Error::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn get_me_parses_identity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:ABC/getMe")
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{"id":42,"username":"support_bot","first_name":"Support"}}"#)
            .create_async()
            .await;

        let client =
            TelegramClient::from_instance(reqwest::Client::new(), &instance(&server.url()))
                .unwrap();
        let me = client.get_me().await.unwrap();
        assert_eq!(me.id, 42);
        assert_eq!(me.username.as_deref(), Some("support_bot"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn bot_api_error_surfaces_description() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:ABC/sendMessage")
            .with_status(400)
            .with_body(r#"{"ok":false,"description":"Bad Request: chat not found"}"#)
            .create_async()
            .await;

        let client =
            TelegramClient::from_instance(reqwest::Client::new(), &instance(&server.url()))
                .unwrap();
        let err = client.send_message("7", "hello", None).await.unwrap_err();
        match err {
            Error::Api {
                platform, status, body, ..
            } => {
                assert_eq!(platform, PlatformType::Telegram);
                assert_eq!(status, 400);
                assert!(body.contains("chat not found"));
            },
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn webhook_registration_roundtrip() {
        let mut server = mockito::Server::new_async().await;
        let set = server
            .mock("POST", "/bot123:ABC/setWebhook")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "url": "https://bridge.example.com/webhooks/telegram/bot-1",
                "secret_token": "s3cret",
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":true}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/bot123:ABC/getWebhookInfo")
            .with_status(200)
            .with_body(
                r#"{"ok":true,"result":{"url":"https://bridge.example.com/webhooks/telegram/bot-1","pending_update_count":0}}"#,
            )
            .create_async()
            .await;

        let client =
            TelegramClient::from_instance(reqwest::Client::new(), &instance(&server.url()))
                .unwrap();
        client
            .set_webhook(
                "https://bridge.example.com/webhooks/telegram/bot-1",
                Some("s3cret"),
            )
            .await
            .unwrap();
        let info = client.get_webhook_info().await.unwrap();
        assert_eq!(info.pending_update_count, 0);
        assert!(info.url.ends_with("/webhooks/telegram/bot-1"));
        set.assert_async().await;
    }

    #[tokio::test]
    async fn send_message_includes_parse_mode() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:ABC/sendMessage")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "chat_id": "7",
                "parse_mode": "Markdown",
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{"message_id":1}}"#)
            .create_async()
            .await;

        let client =
            TelegramClient::from_instance(reqwest::Client::new(), &instance(&server.url()))
                .unwrap();
        client
            .send_message("7", "*hi*", Some("Markdown"))
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
