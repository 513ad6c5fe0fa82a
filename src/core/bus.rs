use flume::{Receiver, Sender};

/// Commands sent from the UI thread to the broker link task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    /// Publish a retained name for a new flow. Contains the flow name.
    CreateFlow(String),
    /// Publish a retained empty payload clearing a flow. Contains the flow id.
    DeleteFlow(String),
    /// Restart the connection attempt cycle after backoff exhaustion.
    Retry,
    /// Graceful shutdown: disconnect cleanly and do not reconnect.
    Shutdown,
}

/// Events sent from the broker link task back to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Connection established and the flow-name subscription is in place.
    Connected,
    /// Connection lost unexpectedly; reconnection with backoff is underway.
    Disconnected { reason: String },
    /// Reconnect attempts exhausted; the link idles until `Retry`.
    Exhausted,
    /// A non-empty retained name arrived for a flow id.
    FlowNamed { id: String, name: String },
    /// An empty retained payload arrived: the flow was deleted.
    FlowCleared { id: String },
    /// A publish could not be handed to the broker.
    PublishFailed { topic: String, reason: String },
}

/// Holder passed into the UI loop containing the receiving side from the link
/// and the sending side to it.
#[derive(Debug, Clone)]
pub struct Bus {
    pub link_rx: Receiver<LinkEvent>,
    pub cmd_tx: Sender<LinkCommand>,
}

impl Bus {
    pub fn new(link_rx: Receiver<LinkEvent>, cmd_tx: Sender<LinkCommand>) -> Self {
        Self { link_rx, cmd_tx }
    }
}
