//! Event router: decodes stream messages and applies them to the view store.

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::debug;

use crate::model::{Action, StreamEvent, TriggerRow};
use crate::store::{Insertion, ViewStore};

/// What routing an event did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A create added a new entry at the head.
    Inserted(i64),
    /// A create for an id already present refreshed that entry.
    Refreshed(i64),
    /// An update overwrote title and content of a known entry.
    Updated(i64),
    /// An update for an unknown id; the store is unchanged.
    Missed(i64),
}

impl RouteOutcome {
    pub fn id(self) -> i64 {
        match self {
            RouteOutcome::Inserted(id)
            | RouteOutcome::Refreshed(id)
            | RouteOutcome::Updated(id)
            | RouteOutcome::Missed(id) => id,
        }
    }

    /// Whether the store changed.
    pub fn changed(self) -> bool {
        !matches!(self, RouteOutcome::Missed(_))
    }
}

/// Decodes one stream message.
///
/// Accepts the `{"action", "newsletter"}` envelope and the flat trigger row
/// `{"operation": "INSERT" | "UPDATE", "id", ...}`.
///
/// # Errors
/// Returns an error if the data is not JSON or matches neither shape.
pub fn decode(data: &str) -> Result<StreamEvent> {
    let value: Value = serde_json::from_str(data.trim()).context("stream message is not JSON")?;

    if value.get("action").is_some() {
        return serde_json::from_value(value).context("invalid stream event envelope");
    }

    if value.get("operation").is_some() {
        let row: TriggerRow = serde_json::from_value(value).context("invalid trigger row")?;
        let action = row.operation.parse::<Action>().map_err(|e| anyhow!(e))?;
        return Ok(StreamEvent {
            action,
            newsletter: row.newsletter,
        });
    }

    Err(anyhow!(
        "stream message has neither an 'action' nor an 'operation' field"
    ))
}

/// Applies one event to the store.
pub fn route(store: &mut ViewStore, event: StreamEvent) -> RouteOutcome {
    let id = event.newsletter.id;
    match event.action {
        Action::Create => match store.insert_front(event.newsletter) {
            Insertion::Inserted => RouteOutcome::Inserted(id),
            Insertion::Refreshed => RouteOutcome::Refreshed(id),
        },
        Action::Update => {
            if store.apply_update(&event.newsletter) {
                RouteOutcome::Updated(id)
            } else {
                debug!(id, "update for unknown newsletter dropped");
                RouteOutcome::Missed(id)
            }
        }
    }
}
