//! Outbound Platform API Client
//!
//! Thin wrapper over the Web API methods this service calls. The [`ChatApi`]
//! trait is the seam the sync pipeline depends on, so tests can substitute a
//! recording double for the live client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Errors from outbound platform API calls.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The platform answered with `ok: false`; carries the API error code
    /// (e.g., `"already_in_channel"`).
    #[error("API error: {0}")]
    Api(String),

    #[error("Malformed API response: {0}")]
    Malformed(String),
}

/// Basic user state as reported by the platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub deleted: bool,
}

/// The outbound API surface the sync pipeline needs.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Current member ids of a usergroup.
    async fn usergroup_members(&self, usergroup: &str) -> Result<Vec<String>, SlackError>;

    /// Replace a usergroup's member list. The API replaces the full list,
    /// it does not append.
    async fn set_usergroup_members(
        &self,
        usergroup: &str,
        members: &[String],
    ) -> Result<(), SlackError>;

    /// Fetch a user's current state.
    async fn user_info(&self, user: &str) -> Result<UserInfo, SlackError>;

    /// Invite a user to a channel.
    async fn invite_to_channel(&self, channel: &str, user: &str) -> Result<(), SlackError>;

    /// Open (or reuse) a direct-message conversation, returning its channel id.
    async fn open_dm(&self, user: &str) -> Result<String, SlackError>;

    /// Post a message to a channel.
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError>;
}

/// Web API client backed by `reqwest`.
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    /// Create a client for the given API base URL and bot token.
    pub fn new(base_url: &str, token: &str) -> Result<Self, SlackError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// POST a Web API method and return the parsed response body.
    ///
    /// An `ok: false` answer becomes [`SlackError::Api`] carrying the
    /// platform's error code.
    async fn call(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, SlackError> {
        let url = format!("{}/{}", self.base_url, method);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let value: serde_json::Value = resp.json().await?;
        if value["ok"].as_bool() == Some(true) {
            Ok(value)
        } else {
            let code = value["error"].as_str().unwrap_or("unknown_error");
            Err(SlackError::Api(code.to_string()))
        }
    }
}

#[async_trait]
impl ChatApi for SlackClient {
    async fn usergroup_members(&self, usergroup: &str) -> Result<Vec<String>, SlackError> {
        let value = self
            .call(
                "usergroups.users.list",
                &serde_json::json!({ "usergroup": usergroup }),
            )
            .await?;

        let users = value["users"]
            .as_array()
            .ok_or_else(|| SlackError::Malformed("missing users array".into()))?;

        Ok(users
            .iter()
            .filter_map(|u| u.as_str().map(str::to_string))
            .collect())
    }

    async fn set_usergroup_members(
        &self,
        usergroup: &str,
        members: &[String],
    ) -> Result<(), SlackError> {
        // The API takes the full replacement list as a comma-separated string.
        self.call(
            "usergroups.users.update",
            &serde_json::json!({
                "usergroup": usergroup,
                "users": members.join(","),
            }),
        )
        .await
        .map(|_| ())
    }

    async fn user_info(&self, user: &str) -> Result<UserInfo, SlackError> {
        let value = self
            .call("users.info", &serde_json::json!({ "user": user }))
            .await?;

        let user = value
            .get("user")
            .cloned()
            .ok_or_else(|| SlackError::Malformed("missing user object".into()))?;

        serde_json::from_value(user).map_err(|e| SlackError::Malformed(e.to_string()))
    }

    async fn invite_to_channel(&self, channel: &str, user: &str) -> Result<(), SlackError> {
        self.call(
            "conversations.invite",
            &serde_json::json!({ "channel": channel, "users": user }),
        )
        .await
        .map(|_| ())
    }

    async fn open_dm(&self, user: &str) -> Result<String, SlackError> {
        let value = self
            .call("conversations.open", &serde_json::json!({ "users": user }))
            .await?;

        value["channel"]["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SlackError::Malformed("missing channel id".into()))
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        self.call(
            "chat.postMessage",
            &serde_json::json!({ "channel": channel, "text": text }),
        )
        .await
        .map(|_| ())
    }
}
