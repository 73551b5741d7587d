//! Concierge Server
//!
//! Webhook endpoint that syncs new workspace members into predefined Slack
//! usergroups, optionally inviting them to channels and sending a welcome
//! message.

pub mod api;
pub mod config;
pub mod slack;
pub mod sync;
pub mod webhook;
