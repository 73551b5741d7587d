//! Inbound Event Payloads
//!
//! Serde types for the events-API envelope and the membership events this
//! service acts on. Everything here is transient, built once per request.

use serde::Deserialize;

/// Top-level webhook payload.
///
/// `challenge` is only present on URL-verification handshakes; `event` is
/// only present on event callbacks.
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub challenge: Option<String>,
    pub event: Option<InboundEvent>,
}

impl EventEnvelope {
    /// Whether this payload is a URL-verification handshake.
    #[must_use]
    pub fn is_handshake(&self) -> bool {
        self.kind == "url_verification" && self.challenge.is_some()
    }
}

/// A single event from the envelope's `event` field.
#[derive(Debug, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: Option<EventUser>,
}

/// The user a membership event refers to.
#[derive(Debug, Clone, Deserialize)]
pub struct EventUser {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
    /// Tri-state: only an explicit `false` marks a full (unrestricted)
    /// member. Absence does not count as `false`.
    pub is_restricted: Option<bool>,
}

impl InboundEvent {
    /// The affected user, if this event should trigger a membership sync.
    ///
    /// `team_join` always qualifies. `user_change` qualifies only when the
    /// user is alive and explicitly unrestricted (guest accounts and
    /// deactivations must not be synced into groups).
    #[must_use]
    pub fn actionable_user(&self) -> Option<&EventUser> {
        let user = self.user.as_ref()?;
        match self.kind.as_str() {
            "team_join" => Some(user),
            "user_change" if !user.deleted && user.is_restricted == Some(false) => Some(user),
            _ => None,
        }
    }
}
