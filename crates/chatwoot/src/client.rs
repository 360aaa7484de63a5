use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    serde_json::json,
};

use switchboard_platforms::{Error, PlatformInstance, PlatformType, Result};

/// Thin Chatwoot REST client for one account.
#[derive(Debug)]
pub struct ChatwootClient {
    http: reqwest::Client,
    base_url: String,
    token: Secret<String>,
    account_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Inbox {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub channel_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct PayloadList<T> {
    payload: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ContactEnvelope {
    payload: ContactPayload,
}

#[derive(Debug, Deserialize)]
struct ContactPayload {
    contact: Contact,
}

/// Custom attributes filed onto created contacts/conversations so agents can
/// see where a conversation came from.
#[derive(Debug, Clone, Serialize)]
pub struct SourceAttributes {
    pub platform: String,
    pub chat_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl ChatwootClient {
    /// Build a client from an instance record. Incomplete credentials
    /// degrade the client instead of failing at startup.
    pub fn from_instance(http: reqwest::Client, instance: &PlatformInstance) -> Result<Self> {
        if instance.credentials.base_url.is_empty() {
            return Err(Error::not_configured(
                PlatformType::Chatwoot,
                format!("instance '{}' has no base url", instance.id),
            ));
        }
        if instance.credentials.token_is_empty() {
            return Err(Error::not_configured(
                PlatformType::Chatwoot,
                format!("instance '{}' has no access token", instance.id),
            ));
        }
        let Some(account_id) = instance.credentials.account_id.clone() else {
            return Err(Error::not_configured(
                PlatformType::Chatwoot,
                format!("instance '{}' has no account id", instance.id),
            ));
        };
        Ok(Self {
            http,
            base_url: instance.credentials.base_url.trim_end_matches('/').to_string(),
            token: instance.credentials.token.clone(),
            account_id,
        })
    }

    fn account_url(&self, path: &str) -> String {
        format!("{}/api/v1/accounts/{}{path}", self.base_url, self.account_id)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T> {
        let resp = builder
            .header("api_access_token", self.token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::transport(PlatformType::Chatwoot, context, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::api(PlatformType::Chatwoot, status.as_u16(), body));
        }
        resp.json::<T>()
            .await
            .map_err(|e| Error::transport(PlatformType::Chatwoot, context, e))
    }

    /// Fetch the account record. Used as the connection probe.
    pub async fn get_account(&self) -> Result<Account> {
        let url = format!("{}/api/v1/accounts/{}", self.base_url, self.account_id);
        self.request(self.http.get(url), "get account").await
    }

    pub async fn list_inboxes(&self) -> Result<Vec<Inbox>> {
        let list: PayloadList<Inbox> = self
            .request(self.http.get(self.account_url("/inboxes")), "list inboxes")
            .await?;
        Ok(list.payload)
    }

    /// Create an API-channel inbox.
    pub async fn create_inbox(&self, name: &str) -> Result<Inbox> {
        let payload = json!({
            "name": name,
            "channel": { "type": "api" },
        });
        self.request(
            self.http.post(self.account_url("/inboxes")).json(&payload),
            "create inbox",
        )
        .await
    }

    /// Look up an existing conversation by the stable source id the bridge
    /// assigns at creation. This is the idempotency half of
    /// find-before-create.
    pub async fn find_conversation_by_source_id(
        &self,
        inbox_id: i64,
        source_id: &str,
    ) -> Result<Option<Conversation>> {
        let url = self.account_url("/conversations");
        let envelope: DataEnvelope<PayloadList<Conversation>> = self
            .request(
                self.http
                    .get(url)
                    .query(&[("inbox_id", inbox_id.to_string()), ("source_id", source_id.into())]),
                "find conversation",
            )
            .await?;
        Ok(envelope.data.payload.into_iter().next())
    }

    pub async fn create_contact(
        &self,
        inbox_id: i64,
        name: &str,
        identifier: &str,
        attributes: &SourceAttributes,
    ) -> Result<Contact> {
        let payload = json!({
            "inbox_id": inbox_id,
            "name": name,
            "identifier": identifier,
            "custom_attributes": attributes,
        });
        let envelope: ContactEnvelope = self
            .request(
                self.http.post(self.account_url("/contacts")).json(&payload),
                "create contact",
            )
            .await?;
        Ok(envelope.payload.contact)
    }

    pub async fn create_conversation(
        &self,
        inbox_id: i64,
        contact_id: i64,
        source_id: &str,
        attributes: &SourceAttributes,
    ) -> Result<Conversation> {
        let payload = json!({
            "inbox_id": inbox_id,
            "contact_id": contact_id,
            "source_id": source_id,
            "custom_attributes": attributes,
        });
        self.request(
            self.http
                .post(self.account_url("/conversations"))
                .json(&payload),
            "create conversation",
        )
        .await
    }

    /// Post a message into a conversation. `incoming` messages render as the
    /// contact speaking; `outgoing` as an agent.
    pub async fn create_message(
        &self,
        conversation_id: i64,
        content: &str,
        message_type: &str,
        private: bool,
    ) -> Result<()> {
        let payload = json!({
            "content": content,
            "message_type": message_type,
            "private": private,
        });
        let url = self.account_url(&format!("/conversations/{conversation_id}/messages"));
        self.request::<serde_json::Value>(self.http.post(url).json(&payload), "create message")
            .await
            .map(|_| ())
    }
}
