//! Membership Sync Pipeline
//!
//! Applies an accepted membership event: deduplicates near-simultaneous
//! repeats, resolves the target usergroups, updates each group's member list
//! sequentially, and optionally invites the user to channels and sends a
//! welcome message.
//!
//! Every outbound failure is caught per call and downgraded to a structured
//! entry in the response; nothing here retries. Duplicate deliveries are
//! handled by the dedup window plus the fact that the group add is itself
//! idempotent (an existing member is never re-added).

pub mod dedup;

use std::collections::HashMap;
use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::api::AppState;
use crate::config::CleanupPolicy;
use crate::slack::SlackError;

/// Per-usergroup update outcome. Response-shaping only, never stored.
#[derive(Debug, Serialize)]
pub struct MembershipResult {
    pub usergroup: String,
    pub ok: bool,
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MembershipResult {
    fn updated(usergroup: &str) -> Self {
        Self {
            usergroup: usergroup.to_string(),
            ok: true,
            updated: true,
            reason: None,
            error: None,
        }
    }

    fn unchanged(usergroup: &str, reason: &str) -> Self {
        Self {
            usergroup: usergroup.to_string(),
            ok: true,
            updated: false,
            reason: Some(reason.to_string()),
            error: None,
        }
    }

    fn failed(usergroup: &str, error: String) -> Self {
        Self {
            usergroup: usergroup.to_string(),
            ok: false,
            updated: false,
            reason: None,
            error: Some(error),
        }
    }
}

/// Overall outcome of processing one webhook call. Serialized with
/// camelCase keys (`userId`, `ugResults`) for external consumers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ug_results: Vec<MembershipResult>,
}

impl SyncOutcome {
    /// An event acknowledged without side effects.
    #[must_use]
    pub fn skipped(user_id: Option<&str>, reason: &str) -> Self {
        Self {
            ok: true,
            user_id: user_id.map(str::to_string),
            skipped: Some(true),
            reason: Some(reason.to_string()),
            warning: None,
            ug_results: Vec::new(),
        }
    }

    /// A success-shaped response for a degraded (misconfigured or
    /// stale-identity) case.
    #[must_use]
    pub fn warning(user_id: &str, warning: &str) -> Self {
        Self {
            ok: true,
            user_id: Some(user_id.to_string()),
            skipped: None,
            reason: None,
            warning: Some(warning.to_string()),
            ug_results: Vec::new(),
        }
    }

    fn completed(user_id: &str, ug_results: Vec<MembershipResult>) -> Self {
        Self {
            ok: true,
            user_id: Some(user_id.to_string()),
            skipped: None,
            reason: None,
            warning: None,
            ug_results,
        }
    }
}

/// Run the full sync pipeline for one user.
pub async fn process_user(state: &AppState, user_id: &str) -> SyncOutcome {
    let now_ms = chrono::Utc::now().timestamp_millis();
    if !state.dedup.check_and_stamp(user_id, now_ms) {
        info!(user_id = %user_id, "Skipping recently processed user");
        return SyncOutcome::skipped(Some(user_id), "recently_processed");
    }

    let config = &state.config;
    if config.usergroup_ids.is_empty() {
        warn!("No usergroups configured; acknowledging without syncing");
        return SyncOutcome::warning(user_id, "no_usergroups_configured");
    }

    // Liveness check: never touch memberships for a deleted identity.
    // A fetch failure is non-fatal; proceed optimistically.
    match state.api.user_info(user_id).await {
        Ok(user) if user.deleted => {
            warn!(user_id = %user_id, "User reported deleted by the platform");
            return SyncOutcome::warning(user_id, "user_deleted");
        }
        Ok(_) => {}
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to fetch user info, proceeding");
        }
    }

    // Sequential on purpose: each group's fetch-then-write must not race a
    // concurrent write to the same group from this request.
    let mut results = Vec::with_capacity(config.usergroup_ids.len());
    for usergroup in &config.usergroup_ids {
        results.push(update_group(state, usergroup, user_id).await);
    }

    // Invites and the welcome message only fire when something actually
    // changed; repeat deliveries after the dedup window stay silent.
    if results.iter().any(|r| r.updated) {
        invite_to_channels(state, user_id).await;
        if config.send_welcome {
            send_welcome(state, user_id, &results).await;
        }
    }

    SyncOutcome::completed(user_id, results)
}

/// Add `user_id` to a single usergroup, if not already present.
async fn update_group(state: &AppState, usergroup: &str, user_id: &str) -> MembershipResult {
    let current = match state.api.usergroup_members(usergroup).await {
        Ok(members) => members,
        Err(e) => {
            warn!(usergroup = %usergroup, error = %e, "Failed to list usergroup members");
            return MembershipResult::failed(usergroup, e.to_string());
        }
    };

    if current.iter().any(|m| m == user_id) {
        return MembershipResult::unchanged(usergroup, "already a member");
    }

    let mut members = clean_member_list(
        current,
        state.config.bot_user_id.as_deref(),
        state.config.cleanup_policy,
    );
    members.push(user_id.to_string());

    // The update is a full replace of the member list.
    match state.api.set_usergroup_members(usergroup, &members).await {
        Ok(()) => {
            info!(usergroup = %usergroup, user_id = %user_id, "Added user to usergroup");
            MembershipResult::updated(usergroup)
        }
        Err(e) => {
            warn!(usergroup = %usergroup, error = %e, "Failed to update usergroup members");
            MembershipResult::failed(usergroup, e.to_string())
        }
    }
}

/// Strip ids that must not be written back into a member list, deduplicating
/// defensively. Order of surviving entries is preserved.
fn clean_member_list(
    members: Vec<String>,
    bot_user_id: Option<&str>,
    policy: CleanupPolicy,
) -> Vec<String> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|id| {
            if Some(id.as_str()) == bot_user_id {
                return false;
            }
            if policy == CleanupPolicy::AllInvalid && !looks_like_user_id(id) {
                return false;
            }
            seen.insert(id.clone())
        })
        .collect()
}

/// Platform user ids start with `U` or `W` followed by at least two
/// uppercase alphanumerics.
fn looks_like_user_id(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some('U' | 'W'))
        && id.len() >= 3
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Invite the user to every configured channel. Already-present is success.
async fn invite_to_channels(state: &AppState, user_id: &str) {
    for channel in &state.config.channel_ids {
        match state.api.invite_to_channel(channel, user_id).await {
            Ok(()) => {
                info!(channel = %channel, user_id = %user_id, "Invited user to channel");
            }
            Err(SlackError::Api(code)) if code == "already_in_channel" => {}
            Err(e) => {
                warn!(channel = %channel, user_id = %user_id, error = %e, "Channel invite failed");
            }
        }
    }
}

/// Open a DM and post the one-time welcome message. Failures are logged and
/// do not change the overall response.
async fn send_welcome(state: &AppState, user_id: &str, results: &[MembershipResult]) {
    let joined: Vec<&str> = results
        .iter()
        .filter(|r| r.updated)
        .map(|r| r.usergroup.as_str())
        .collect();
    let text = welcome_text(&joined, &state.config.usergroup_descriptions);

    match state.api.open_dm(user_id).await {
        Ok(channel) => {
            if let Err(e) = state.api.post_message(&channel, &text).await {
                warn!(user_id = %user_id, error = %e, "Failed to send welcome message");
            } else {
                info!(user_id = %user_id, "Sent welcome message");
            }
        }
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to open welcome DM");
        }
    }
}

/// Welcome text listing the joined groups by their configured descriptions,
/// falling back to the raw usergroup id.
fn welcome_text(joined: &[&str], descriptions: &HashMap<String, String>) -> String {
    let names: Vec<&str> = joined
        .iter()
        .map(|id| descriptions.get(*id).map_or(*id, String::as_str))
        .collect();

    format!(
        "Welcome aboard! You've been added to: {}.",
        names.join(", ")
    )
}
