//! Flow model: id derivation, topic handling and the ordered flow board.
//!
//! A flow exists exactly when the broker holds a non-empty retained message
//! on `flows/{id}/name`. The id is the percent-encoded flow name, so the
//! board never needs a separate registry: the retained topic space *is* the
//! registry, and `FlowBoard` is a derived, ephemeral view of it.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Subscription filter covering every flow-name topic (single level wildcard
/// over the flow id).
pub const FLOW_NAME_FILTER: &str = "flows/+/name";

/// Characters escaped when deriving a flow id from its name. Matches the
/// JavaScript `encodeURIComponent` charset: alphanumerics and `- _ . ! ~ * ' ( )`
/// pass through, everything else is percent-escaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Derive the flow id for a name. Deterministic; distinct names that encode
/// differently always yield distinct ids.
pub fn flow_id(name: &str) -> String {
    utf8_percent_encode(name, URI_COMPONENT).to_string()
}

/// Build the retained-name topic for a flow id.
pub fn flow_name_topic(id: &str) -> String {
    format!("flows/{id}/name")
}

/// Extract the flow id from a `flows/{id}/name` topic. Returns `None` for
/// topics outside the namespace and for ids spanning more than one topic
/// level (the `+` wildcard can never deliver those).
pub fn parse_flow_topic(topic: &str) -> Option<&str> {
    let id = topic.strip_prefix("flows/")?.strip_suffix("/name")?;
    if id.contains('/') {
        return None;
    }
    Some(id)
}

/// Whether a character may appear in a flow name. This is the dialog
/// keystroke filter: letters, digits, underscore and space only.
pub fn is_allowed_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ' '
}

/// Whether a submitted name is acceptable: non-blank and made entirely of
/// allowed characters.
pub fn is_valid_flow_name(name: &str) -> bool {
    !name.trim().is_empty() && name.chars().all(is_allowed_name_char)
}

/// A retained publish to be handed to the broker link. Kept as plain data so
/// message construction stays testable without a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowPublish {
    pub topic: String,
    pub payload: String,
    pub retained: bool,
}

/// Retained publish that creates (or renames) a flow.
pub fn create_flow_message(name: &str) -> FlowPublish {
    FlowPublish {
        topic: flow_name_topic(&flow_id(name)),
        payload: name.to_string(),
        retained: true,
    }
}

/// Retained empty publish that deletes a flow. The broker clears the retained
/// value and echoes the empty payload to every subscriber, including us.
pub fn delete_flow_message(id: &str) -> FlowPublish {
    FlowPublish {
        topic: flow_name_topic(id),
        payload: String::new(),
        retained: true,
    }
}

/// A single live flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    pub id: String,
    pub name: String,
}

/// Ordered view of the flows currently known from retained messages.
///
/// Invariants: at most one entry per id, entries sorted lexicographically by
/// id. All mutations come from the inbound message path — creation and
/// deletion are both observed from the broker, never applied optimistically.
#[derive(Debug, Default)]
pub struct FlowBoard {
    flows: Vec<Flow>,
    /// Id of a flow we just asked the broker to create; consumed to select
    /// the matching tab once the creation is echoed back.
    desired: Option<String>,
}

impl FlowBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Flow> {
        self.flows.get(idx)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.flows.iter().position(|f| f.id == id)
    }

    /// Mark an id as the pending creation target.
    pub fn set_desired(&mut self, id: String) {
        self.desired = Some(id);
    }

    #[cfg(test)]
    pub fn desired(&self) -> Option<&str> {
        self.desired.as_deref()
    }

    /// Apply a non-empty retained name for an id: insert a new flow or rename
    /// the existing one, keeping the board sorted. Returns the flow's position
    /// when it was the pending creation target, so the caller can select it.
    pub fn apply_named(&mut self, id: &str, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }

        match self.flows.iter_mut().find(|f| f.id == id) {
            Some(flow) => {
                flow.name = name.to_string();
            }
            None => {
                log::info!("Adding flow, id='{id}' name='{name}'");
                self.flows.push(Flow {
                    id: id.to_string(),
                    name: name.to_string(),
                });
                self.sort();
            }
        }

        if self.desired.as_deref() == Some(id) {
            self.desired = None;
            return self.position(id);
        }
        None
    }

    /// Apply an empty retained payload for an id: the broker cleared the
    /// retained name, so the flow is gone. Returns whether a flow was removed.
    pub fn apply_cleared(&mut self, id: &str) -> bool {
        let before = self.flows.len();
        self.flows.retain(|f| f.id != id);
        self.flows.len() != before
    }

    /// Drop every flow, keeping the desired marker. The board is a derived
    /// view: after a reconnect the broker re-delivers the full retained set,
    /// so starting from empty is how stale entries (flows deleted while the
    /// link was down) get swept out.
    pub fn clear(&mut self) {
        self.flows.clear();
    }

    fn sort(&mut self) {
        self.flows.sort_by(|a, b| a.id.cmp(&b.id));
    }
}
