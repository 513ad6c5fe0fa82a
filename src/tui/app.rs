use chrono::{DateTime, Local};

use crate::core::{
    bus::LinkEvent,
    flows::{self, Flow, FlowBoard},
};

/// Connection state shown in the status bar. A broker that cannot be reached
/// must never look like an empty-but-healthy page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting,
    Connected,
    Reconnecting,
    Exhausted,
}

/// Entry under the cursor in the tab row. Flows are tracked by id, not by
/// position, so broker-driven insertions and removals that re-sort the board
/// never retarget the user's active tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tab {
    Flow(String),
    /// The trailing `[+]` pseudo-tab that opens the creation dialog.
    NewFlow,
}

/// State of the modal new-flow dialog.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NewFlowDialog {
    pub input: String,
}

pub struct App {
    pub board: FlowBoard,
    pub active: Tab,
    pub dialog: Option<NewFlowDialog>,
    pub link: LinkStatus,
    pub error: Option<String>,
    pub last_event: Option<DateTime<Local>>,
}

impl App {
    pub fn new() -> Self {
        Self {
            board: FlowBoard::new(),
            active: Tab::NewFlow,
            dialog: None,
            link: LinkStatus::Connecting,
            error: None,
            last_event: None,
        }
    }

    /// Number of entries in the tab row, including the `[+]` pseudo-tab.
    pub fn tab_count(&self) -> usize {
        self.board.len() + 1
    }

    /// Position of the active tab in the row, resolved at render time.
    /// The `[+]` pseudo-tab is always last.
    pub fn selected_index(&self) -> usize {
        match &self.active {
            Tab::Flow(id) => self.board.position(id).unwrap_or(self.board.len()),
            Tab::NewFlow => self.board.len(),
        }
    }

    /// Whether the cursor sits on the `[+]` pseudo-tab. That tab never
    /// becomes an active flow tab; activating it opens the dialog instead.
    pub fn on_new_flow_tab(&self) -> bool {
        self.selected_index() == self.board.len()
    }

    pub fn selected_flow(&self) -> Option<&Flow> {
        match &self.active {
            Tab::Flow(id) => self.board.position(id).and_then(|pos| self.board.get(pos)),
            Tab::NewFlow => None,
        }
    }

    fn select_index(&mut self, idx: usize) {
        self.active = match self.board.get(idx) {
            Some(flow) => Tab::Flow(flow.id.clone()),
            None => Tab::NewFlow,
        };
    }

    pub fn next(&mut self) {
        let idx = (self.selected_index() + 1) % self.tab_count();
        self.select_index(idx);
    }

    pub fn prev(&mut self) {
        let idx = match self.selected_index() {
            0 => self.tab_count() - 1,
            n => n - 1,
        };
        self.select_index(idx);
    }

    pub fn open_dialog(&mut self) {
        self.dialog = Some(NewFlowDialog::default());
    }

    pub fn cancel_dialog(&mut self) {
        self.dialog = None;
    }

    /// Feed a typed character into the dialog input. Characters outside the
    /// allowed name charset are rejected and leave the buffer unchanged.
    /// Returns whether the character was accepted.
    pub fn dialog_input_char(&mut self, c: char) -> bool {
        let Some(dialog) = self.dialog.as_mut() else {
            return false;
        };
        if !flows::is_allowed_name_char(c) {
            return false;
        }
        dialog.input.push(c);
        true
    }

    pub fn dialog_backspace(&mut self) {
        if let Some(dialog) = self.dialog.as_mut() {
            dialog.input.pop();
        }
    }

    /// Submit the dialog. On a valid name the desired-flow marker is set (the
    /// tab is selected only once the broker echoes the creation back), the
    /// dialog closes and the name to publish is returned. An invalid name
    /// keeps the dialog open.
    pub fn submit_dialog(&mut self) -> Option<String> {
        let name = self.dialog.as_ref()?.input.clone();
        if !flows::is_valid_flow_name(&name) {
            self.error = Some("Flow name must be non-empty (letters, digits, _ and space)".into());
            return None;
        }
        self.board.set_desired(flows::flow_id(&name));
        self.dialog = None;
        self.error = None;
        Some(name)
    }

    /// Request deletion of the selected flow. Returns the flow id to publish
    /// the retained empty payload for. The tab is *not* removed here; it
    /// disappears when the broker echoes the cleared retained value.
    pub fn request_delete(&mut self) -> Option<String> {
        self.selected_flow().map(|f| f.id.clone())
    }

    /// Apply an event from the broker link.
    pub fn apply_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => {
                self.link = LinkStatus::Connected;
                self.error = None;
                // The subscription re-delivers the full retained set, so the
                // board restarts from empty and flows deleted while the link
                // was down never resurface. The active flow is re-marked as
                // desired so its tab is reselected when its name comes back.
                if let Tab::Flow(id) = &self.active {
                    self.board.set_desired(id.clone());
                }
                self.board.clear();
                self.active = Tab::NewFlow;
            }
            LinkEvent::Disconnected { reason } => {
                self.link = LinkStatus::Reconnecting;
                log::warn!("link disconnected: {reason}");
            }
            LinkEvent::Exhausted => {
                self.link = LinkStatus::Exhausted;
                self.error = Some("Broker unreachable, press 'r' to retry".into());
            }
            LinkEvent::FlowNamed { id, name } => {
                if self.board.apply_named(&id, &name).is_some() {
                    self.active = Tab::Flow(id);
                }
                self.last_event = Some(Local::now());
            }
            LinkEvent::FlowCleared { id } => {
                let was_active = matches!(&self.active, Tab::Flow(active) if *active == id);
                let old_pos = self.board.position(&id);
                if self.board.apply_cleared(&id) && was_active {
                    // Selection falls to the flow that slid into the removed
                    // slot, or the [+] tab when none is left.
                    self.select_index(old_pos.unwrap_or(0));
                }
                self.last_event = Some(Local::now());
            }
            LinkEvent::PublishFailed { topic, reason } => {
                self.error = Some(format!("Publish to {topic} failed: {reason}"));
            }
        }
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.error = Some(msg.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with_flows(flows: &[(&str, &str)]) -> App {
        let mut app = App::new();
        for (id, name) in flows {
            app.board.apply_named(id, name);
        }
        app.select_index(0);
        app
    }

    #[test]
    fn test_navigation_wraps_over_new_flow_tab() {
        let mut app = app_with_flows(&[("a", "A"), ("b", "B")]);
        assert_eq!(app.tab_count(), 3);
        assert_eq!(app.selected_index(), 0);
        app.next();
        app.next();
        assert!(app.on_new_flow_tab());
        app.next();
        assert_eq!(app.selected_index(), 0);
        app.prev();
        assert!(app.on_new_flow_tab());
    }

    #[test]
    fn test_selection_survives_board_churn() {
        let mut app = app_with_flows(&[("mmm", "Mid"), ("zzz", "Last")]);
        app.next();
        assert_eq!(app.selected_flow().unwrap().id, "zzz");

        // A flow sorting before the cursor arrives: selection keeps pointing
        // at the same flow, not the same position.
        app.apply_event(LinkEvent::FlowNamed {
            id: "aaa".to_string(),
            name: "First".to_string(),
        });
        assert_eq!(app.selected_flow().unwrap().id, "zzz");
        assert_eq!(app.selected_index(), 2);

        // Same for a removal before the cursor.
        app.apply_event(LinkEvent::FlowCleared {
            id: "aaa".to_string(),
        });
        assert_eq!(app.selected_flow().unwrap().id, "zzz");
        assert_eq!(app.selected_index(), 1);
    }

    #[test]
    fn test_dialog_filters_characters() {
        let mut app = App::new();
        app.open_dialog();
        assert!(app.dialog_input_char('M'));
        assert!(app.dialog_input_char('y'));
        assert!(app.dialog_input_char(' '));
        assert!(!app.dialog_input_char('$'));
        assert_eq!(app.dialog.as_ref().unwrap().input, "My ");
        app.dialog_backspace();
        assert_eq!(app.dialog.as_ref().unwrap().input, "My");
    }

    #[test]
    fn test_submit_sets_desired_and_closes() {
        let mut app = App::new();
        app.open_dialog();
        for c in "My Flow".chars() {
            app.dialog_input_char(c);
        }
        let name = app.submit_dialog().unwrap();
        assert_eq!(name, "My Flow");
        assert!(app.dialog.is_none());
        assert_eq!(app.board.desired(), Some("My%20Flow"));
    }

    #[test]
    fn test_submit_blank_name_refused() {
        let mut app = App::new();
        app.open_dialog();
        app.dialog_input_char(' ');
        assert_eq!(app.submit_dialog(), None);
        assert!(app.dialog.is_some());
        assert!(app.error.is_some());
    }

    #[test]
    fn test_echoed_creation_selects_tab() {
        let mut app = app_with_flows(&[("aaa", "First")]);
        app.board.set_desired("bbb".to_string());
        app.apply_event(LinkEvent::FlowNamed {
            id: "bbb".to_string(),
            name: "Mine".to_string(),
        });
        assert_eq!(app.selected_index(), 1);
        assert_eq!(app.selected_flow().unwrap().id, "bbb");
    }

    #[test]
    fn test_delete_waits_for_broker_echo() {
        let mut app = app_with_flows(&[("demo", "Demo Flow")]);
        let id = app.request_delete().unwrap();
        assert_eq!(id, "demo");
        // Still present until the cleared retained value comes back.
        assert_eq!(app.board.len(), 1);
        app.apply_event(LinkEvent::FlowCleared { id });
        assert_eq!(app.board.len(), 0);
        assert!(app.on_new_flow_tab());
    }

    #[test]
    fn test_delete_on_new_flow_tab_is_noop() {
        let mut app = App::new();
        assert!(app.on_new_flow_tab());
        assert_eq!(app.request_delete(), None);
    }

    #[test]
    fn test_reconnect_sweeps_stale_flows() {
        let mut app = app_with_flows(&[("gone", "Deleted While Down"), ("kept", "Kept")]);
        app.next();
        assert_eq!(app.selected_flow().unwrap().id, "kept");

        // Reconnect: board restarts from the re-delivered retained set.
        app.apply_event(LinkEvent::Connected);
        assert!(app.board.is_empty());

        // Only "kept" still has a retained name; "gone" never resurfaces and
        // the previously active tab is reselected.
        app.apply_event(LinkEvent::FlowNamed {
            id: "kept".to_string(),
            name: "Kept".to_string(),
        });
        assert_eq!(app.board.len(), 1);
        assert_eq!(app.selected_flow().unwrap().id, "kept");
    }

    #[test]
    fn test_exhausted_link_surfaces_error() {
        let mut app = App::new();
        app.apply_event(LinkEvent::Exhausted);
        assert_eq!(app.link, LinkStatus::Exhausted);
        assert!(app.error.is_some());
    }
}
