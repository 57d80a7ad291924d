//! Marker interaction state machines
//!
//! Distinguishes "dragging to select text across a marker" from "activating
//! the marker". Each bound marker owns one explicit state record; rebinding
//! replaces the registration atomically, so repeated style or trigger
//! changes never accumulate handlers.

use crate::config::{CLICK_MAX_PRESS, DRAG_RESET_DELAY};
use crate::services::settings::{AnnotationTrigger, PopupCloseMode};
use std::collections::HashMap;
use std::time::Instant;

/// Pointer events the host forwards from a marker element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Down,
    Up,
    Click,
    Enter,
}

/// Per-marker drag state
#[derive(Debug, Default)]
struct MarkerState {
    pressed_at: Option<Instant>,
    released_at: Option<Instant>,
}

impl MarkerState {
    fn pointer_down(&mut self, now: Instant) {
        self.pressed_at = Some(now);
        self.released_at = None;
    }

    fn pointer_up(&mut self, now: Instant) {
        self.released_at = Some(now);
    }

    /// Dragging while the button is down, and for a short linger after
    /// release so the click that ends a drag is not taken as activation.
    fn is_dragging(&self, now: Instant) -> bool {
        match (self.pressed_at, self.released_at) {
            (Some(_), None) => true,
            (Some(_), Some(released)) => now.duration_since(released) < DRAG_RESET_DELAY,
            _ => false,
        }
    }

    /// A click activates only when it follows a short press.
    fn click_was_quick(&self, now: Instant) -> bool {
        self.pressed_at
            .map(|pressed| now.duration_since(pressed) <= CLICK_MAX_PRESS)
            .unwrap_or(false)
    }
}

/// One marker's active registration
#[derive(Debug)]
struct Binding {
    trigger: AnnotationTrigger,
    state: MarkerState,
}

/// Owns every marker's event registration and drag state.
#[derive(Debug, Default)]
pub struct InteractionController {
    bindings: HashMap<String, Binding>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a marker. An existing registration for the same marker is
    /// replaced wholesale, drag state included.
    pub fn bind(&mut self, annotation_id: &str, trigger: AnnotationTrigger) {
        self.bindings.insert(
            annotation_id.to_string(),
            Binding {
                trigger,
                state: MarkerState::default(),
            },
        );
    }

    /// Release a marker's registration.
    pub fn unbind(&mut self, annotation_id: &str) {
        self.bindings.remove(annotation_id);
    }

    /// Re-register every marker with a new trigger, e.g. after a settings
    /// save. Drag state resets with the registration.
    pub fn rebind_all(&mut self, trigger: AnnotationTrigger) {
        for binding in self.bindings.values_mut() {
            binding.trigger = trigger;
            binding.state = MarkerState::default();
        }
    }

    pub fn is_bound(&self, annotation_id: &str) -> bool {
        self.bindings.contains_key(annotation_id)
    }

    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }

    /// Feed one pointer event through a marker's state machine.
    ///
    /// Returns `true` when the event activates the marker, i.e. the host
    /// should open the annotation detail surface.
    pub fn handle(
        &mut self,
        annotation_id: &str,
        event: PointerEvent,
        now: Instant,
        selection_active: bool,
    ) -> bool {
        let Some(binding) = self.bindings.get_mut(annotation_id) else {
            return false;
        };

        match event {
            PointerEvent::Down => {
                binding.state.pointer_down(now);
                false
            }
            PointerEvent::Up => {
                binding.state.pointer_up(now);
                false
            }
            PointerEvent::Click => {
                binding.trigger == AnnotationTrigger::Click
                    && !selection_active
                    && binding.state.click_was_quick(now)
            }
            PointerEvent::Enter => {
                binding.trigger == AnnotationTrigger::Hover
                    && !selection_active
                    && !binding.state.is_dragging(now)
            }
        }
    }
}

/// Explicit open/close state for the annotation detail popup.
#[derive(Debug, Default)]
pub struct PopupState {
    open: bool,
    dragging: bool,
}

impl PopupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.open = true;
        self.dragging = false;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.dragging = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The host reports popup drag start/end so outside clicks that end a
    /// drag do not dismiss it.
    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    /// Whether a click outside the popup should close it under the given
    /// close mode. Clicks on a marker are exempt: they are opening a popup,
    /// not dismissing one.
    pub fn should_close_on_outside_click(
        &self,
        mode: PopupCloseMode,
        target_inside_popup: bool,
        target_is_marker: bool,
    ) -> bool {
        self.open
            && mode == PopupCloseMode::ClickOutside
            && !target_inside_popup
            && !self.dragging
            && !target_is_marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const ID: &str = "a1";

    fn controller(trigger: AnnotationTrigger) -> InteractionController {
        let mut controller = InteractionController::new();
        controller.bind(ID, trigger);
        controller
    }

    #[test]
    fn test_quick_click_activates() {
        let mut c = controller(AnnotationTrigger::Click);
        let t0 = Instant::now();

        assert!(!c.handle(ID, PointerEvent::Down, t0, false));
        assert!(!c.handle(ID, PointerEvent::Up, t0 + Duration::from_millis(80), false));
        assert!(c.handle(ID, PointerEvent::Click, t0 + Duration::from_millis(90), false));
    }

    #[test]
    fn test_long_press_click_is_suppressed() {
        let mut c = controller(AnnotationTrigger::Click);
        let t0 = Instant::now();

        c.handle(ID, PointerEvent::Down, t0, false);
        c.handle(ID, PointerEvent::Up, t0 + Duration::from_millis(400), false);
        // 400ms press reads as a drag-to-select, not a click.
        assert!(!c.handle(ID, PointerEvent::Click, t0 + Duration::from_millis(410), false));
    }

    #[test]
    fn test_click_with_active_selection_is_suppressed() {
        let mut c = controller(AnnotationTrigger::Click);
        let t0 = Instant::now();

        c.handle(ID, PointerEvent::Down, t0, false);
        c.handle(ID, PointerEvent::Up, t0 + Duration::from_millis(10), true);
        assert!(!c.handle(ID, PointerEvent::Click, t0 + Duration::from_millis(20), true));
    }

    #[test]
    fn test_click_without_press_is_suppressed() {
        let mut c = controller(AnnotationTrigger::Click);
        assert!(!c.handle(ID, PointerEvent::Click, Instant::now(), false));
    }

    #[test]
    fn test_hover_activates_when_idle() {
        let mut c = controller(AnnotationTrigger::Hover);
        assert!(c.handle(ID, PointerEvent::Enter, Instant::now(), false));
    }

    #[test]
    fn test_hover_during_drag_is_suppressed() {
        let mut c = controller(AnnotationTrigger::Hover);
        let t0 = Instant::now();

        c.handle(ID, PointerEvent::Down, t0, false);
        // Button still down.
        assert!(!c.handle(ID, PointerEvent::Enter, t0 + Duration::from_millis(10), false));

        // Released, but inside the linger window.
        c.handle(ID, PointerEvent::Up, t0 + Duration::from_millis(20), false);
        assert!(!c.handle(ID, PointerEvent::Enter, t0 + Duration::from_millis(40), false));

        // Past the linger window the marker is hoverable again.
        assert!(c.handle(ID, PointerEvent::Enter, t0 + Duration::from_millis(120), false));
    }

    #[test]
    fn test_hover_with_active_selection_is_suppressed() {
        let mut c = controller(AnnotationTrigger::Hover);
        assert!(!c.handle(ID, PointerEvent::Enter, Instant::now(), true));
    }

    #[test]
    fn test_trigger_mismatch_does_not_activate() {
        let mut c = controller(AnnotationTrigger::Click);
        assert!(!c.handle(ID, PointerEvent::Enter, Instant::now(), false));

        let mut c = controller(AnnotationTrigger::Hover);
        let t0 = Instant::now();
        c.handle(ID, PointerEvent::Down, t0, false);
        c.handle(ID, PointerEvent::Up, t0 + Duration::from_millis(10), false);
        assert!(!c.handle(ID, PointerEvent::Click, t0 + Duration::from_millis(20), false));
    }

    #[test]
    fn test_rebind_replaces_registration() {
        let mut c = controller(AnnotationTrigger::Click);
        let t0 = Instant::now();

        c.handle(ID, PointerEvent::Down, t0, false);

        // Rebinding (same marker, new trigger) replaces handler and state.
        c.bind(ID, AnnotationTrigger::Click);
        assert_eq!(c.bound_count(), 1);
        // The earlier press no longer counts.
        assert!(!c.handle(ID, PointerEvent::Click, t0 + Duration::from_millis(10), false));
    }

    #[test]
    fn test_rebind_all_switches_trigger() {
        let mut c = InteractionController::new();
        c.bind("a1", AnnotationTrigger::Click);
        c.bind("a2", AnnotationTrigger::Click);

        c.rebind_all(AnnotationTrigger::Hover);

        assert_eq!(c.bound_count(), 2);
        assert!(c.handle("a1", PointerEvent::Enter, Instant::now(), false));
        assert!(c.handle("a2", PointerEvent::Enter, Instant::now(), false));
    }

    #[test]
    fn test_unbound_marker_ignores_events() {
        let mut c = InteractionController::new();
        assert!(!c.handle("ghost", PointerEvent::Click, Instant::now(), false));
        assert!(!c.is_bound("ghost"));
    }

    #[test]
    fn test_popup_close_policy() {
        let mut popup = PopupState::new();
        popup.open();

        // click-outside mode closes on a true outside click
        assert!(popup.should_close_on_outside_click(PopupCloseMode::ClickOutside, false, false));
        // ... but not when the click lands inside the popup
        assert!(!popup.should_close_on_outside_click(PopupCloseMode::ClickOutside, true, false));
        // ... or on another marker
        assert!(!popup.should_close_on_outside_click(PopupCloseMode::ClickOutside, false, true));
        // ... or while the popup is being dragged
        popup.set_dragging(true);
        assert!(!popup.should_close_on_outside_click(PopupCloseMode::ClickOutside, false, false));
        popup.set_dragging(false);

        // x-only mode never closes from outside clicks
        assert!(!popup.should_close_on_outside_click(PopupCloseMode::XOnly, false, false));

        popup.close();
        assert!(!popup.is_open());
        assert!(!popup.should_close_on_outside_click(PopupCloseMode::ClickOutside, false, false));
    }
}
