//! Inbound Webhook Endpoint
//!
//! Signature verification, payload parsing, and the event handler for the
//! platform's membership-event callbacks.

pub mod events;
pub mod handlers;
pub mod signing;
