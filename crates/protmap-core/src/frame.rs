//! Size signals from embedded sub-views to the view hosting them.
//!
//! The host loop feeds every inbound cross-frame message into [`FrameBus::dispatch`].
//! A mounted view holds a [`FrameRegistration`] for as long as it is mounted; dropping
//! the view drops the registration and the bus forgets it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;

use crate::query::ViewId;

pub const RESIZE_MESSAGE_TYPE: &str = "resize-panel";
pub const DEFAULT_PANEL_HEIGHT: u32 = 600;
pub const STRUCTURE_PANEL: &str = "panel1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("view {0} already holds a frame registration")]
    AlreadyRegistered(ViewId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeSignal {
    pub panel: String,
    pub height: u32,
}

impl ResizeSignal {
    /// Accepts `{type: "resize-panel", panel, height}`. A missing or non-positive
    /// height falls back to the default; any other shape is not a resize signal.
    pub fn parse(message: &Value) -> Option<Self> {
        let object = message.as_object()?;
        if object.get("type").and_then(Value::as_str) != Some(RESIZE_MESSAGE_TYPE) {
            return None;
        }
        let panel = object.get("panel").and_then(Value::as_str)?.trim();
        if panel.is_empty() {
            return None;
        }
        let height = object
            .get("height")
            .and_then(Value::as_f64)
            .filter(|height| height.is_finite() && *height >= 1.0)
            .map_or(DEFAULT_PANEL_HEIGHT, clamp_height);
        Some(Self {
            panel: panel.to_string(),
            height,
        })
    }

    pub fn parse_str(raw: &str) -> Option<Self> {
        serde_json::from_str::<Value>(raw)
            .ok()
            .as_ref()
            .and_then(Self::parse)
    }
}

// Callers pass finite heights >= 1.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_height(height: f64) -> u32 {
    height.round().min(f64::from(u32::MAX)) as u32
}

#[derive(Debug, Default)]
struct BusState {
    listeners: BTreeMap<ViewId, BTreeMap<String, u32>>,
}

/// Single-threaded registry of frame listeners, one per mounted view.
#[derive(Debug, Clone, Default)]
pub struct FrameBus {
    state: Rc<RefCell<BusState>>,
}

impl FrameBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, view: ViewId) -> Result<FrameRegistration, FrameError> {
        let mut state = self.state.borrow_mut();
        if state.listeners.contains_key(&view) {
            return Err(FrameError::AlreadyRegistered(view));
        }
        state.listeners.insert(view, BTreeMap::new());
        tracing::debug!(
            view = %view,
            listeners = state.listeners.len(),
            "frame listener registered"
        );
        Ok(FrameRegistration {
            view,
            state: Rc::clone(&self.state),
        })
    }

    /// Delivers `message` to every listener. Returns how many listeners took it; 0
    /// for anything that is not a resize signal.
    pub fn dispatch(&self, message: &Value) -> usize {
        let Some(signal) = ResizeSignal::parse(message) else {
            return 0;
        };
        let mut state = self.state.borrow_mut();
        for heights in state.listeners.values_mut() {
            heights.insert(signal.panel.clone(), signal.height);
        }
        state.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

/// A view's live subscription. Unregisters on drop.
#[derive(Debug)]
pub struct FrameRegistration {
    view: ViewId,
    state: Rc<RefCell<BusState>>,
}

impl FrameRegistration {
    pub fn view(&self) -> ViewId {
        self.view
    }

    /// Last reported height for `panel`, or the default before any report.
    pub fn height(&self, panel: &str) -> u32 {
        self.state
            .borrow()
            .listeners
            .get(&self.view)
            .and_then(|heights| heights.get(panel).copied())
            .unwrap_or(DEFAULT_PANEL_HEIGHT)
    }
}

impl Drop for FrameRegistration {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.listeners.remove(&self.view);
            tracing::debug!(view = %self.view, "frame listener released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resize_updates_height_for_the_named_panel() {
        let bus = FrameBus::new();
        let registration = bus.register(ViewId::mint()).expect("register");
        assert_eq!(registration.height(STRUCTURE_PANEL), DEFAULT_PANEL_HEIGHT);

        let delivered =
            bus.dispatch(&json!({"type": "resize-panel", "panel": "panel1", "height": 812}));
        assert_eq!(delivered, 1);
        assert_eq!(registration.height(STRUCTURE_PANEL), 812);
        assert_eq!(registration.height("panel2"), DEFAULT_PANEL_HEIGHT);
    }

    #[test]
    fn other_message_shapes_are_ignored() {
        let bus = FrameBus::new();
        let registration = bus.register(ViewId::mint()).expect("register");
        for message in [
            json!({"type": "scroll", "panel": "panel1", "height": 10}),
            json!({"panel": "panel1", "height": 10}),
            json!({"type": "resize-panel", "height": 10}),
            json!("resize-panel"),
            json!(null),
        ] {
            assert_eq!(bus.dispatch(&message), 0);
        }
        assert_eq!(registration.height(STRUCTURE_PANEL), DEFAULT_PANEL_HEIGHT);
    }

    #[test]
    fn missing_or_zero_height_falls_back_to_default() {
        let zero =
            ResizeSignal::parse(&json!({"type": "resize-panel", "panel": "panel1", "height": 0}));
        assert_eq!(zero.map(|signal| signal.height), Some(DEFAULT_PANEL_HEIGHT));
        let missing = ResizeSignal::parse_str(r#"{"type":"resize-panel","panel":"panel1"}"#);
        assert_eq!(missing.map(|signal| signal.height), Some(DEFAULT_PANEL_HEIGHT));
        let fractional = ResizeSignal::parse(
            &json!({"type": "resize-panel", "panel": "panel1", "height": 640.6}),
        );
        assert_eq!(fractional.map(|signal| signal.height), Some(641));
    }

    #[test]
    fn registration_is_released_on_drop() {
        let bus = FrameBus::new();
        let view = ViewId::mint();
        {
            let _registration = bus.register(view).expect("register");
            assert_eq!(bus.listener_count(), 1);
            assert_eq!(bus.register(view).err(), Some(FrameError::AlreadyRegistered(view)));
        }
        assert_eq!(bus.listener_count(), 0);
        assert!(bus.register(view).is_ok());
    }

    #[test]
    fn repeated_mounts_do_not_accumulate_listeners() {
        let bus = FrameBus::new();
        for _ in 0..5 {
            let registration = bus.register(ViewId::mint()).expect("register");
            drop(registration);
        }
        assert_eq!(bus.listener_count(), 0);
    }
}
