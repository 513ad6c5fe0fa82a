//! Flowdeck — terminal UI for managing named flows stored as MQTT retained
//! messages.
//!
//! A flow exists exactly when the broker holds a non-empty retained message
//! on `flows/{id}/name`, where the id is the percent-encoded flow name. This
//! crate connects to the broker over websocket, mirrors that retained state
//! into a tab row, and publishes retained messages to create or delete flows.
//! The broker is the source of truth; the UI is a derived, ephemeral view.

pub mod cli;
pub mod core;
#[doc(hidden)]
pub mod tui;
