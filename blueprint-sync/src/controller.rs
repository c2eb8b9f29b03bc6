//! Two-way binding between canonical blueprint text and its structural form.
//!
//! Text flows into the form through debounced rebuilds; structural edits
//! flow back out as serialized text pushed to the canonical owner. A push
//! always comes back as a text arrival (its echo), which the
//! internal-update flag absorbs so it never triggers a rebuild.
//!
//! The controller does no I/O and reads no clock: callers pass the current
//! instant and drive the timer through [`SyncController::deadline`] and
//! [`SyncController::fire_timer`].

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::debounce::Debounce;
use crate::document::{MutationEvent, MutationObserver, StructuralDocument};

/// Which side currently drives propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// In sync, nothing pending.
    Idle,
    /// New text arrived; a rebuild of the form is scheduled.
    TextDriven,
    /// A structural edit was pushed and its echo is outstanding.
    StructureDriven,
    /// Raw text editing is active; the form is neither rebuilt nor observed.
    Suspended,
}

/// Text-side bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// The current source-of-truth text.
    pub canonical_text: String,
    /// Text the current form was built from or last pushed from.
    pub last_pushed_text: Option<String>,
    /// Set when the next text arrival is the echo of a structural push.
    pub internal_update: bool,
}

/// Reconciles canonical text with the form held by a [`StructuralDocument`].
pub struct SyncController<D: StructuralDocument> {
    document: D,
    form: Option<Form<D::Handle>>,
    attached: Option<u64>,
    generation: u64,
    mutations: mpsc::UnboundedSender<MutationEvent>,
    state: SyncState,
    mode: SyncMode,
    timer: Debounce<String>,
    forced: bool,
    rebuilds: u64,
}

struct Form<H> {
    handle: H,
    generation: u64,
}

impl<D: StructuralDocument> SyncController<D> {
    /// Create a controller with no form yet.
    ///
    /// Observers attached to forms post their events to `mutations`.
    pub fn new(
        document: D,
        debounce: Duration,
        mutations: mpsc::UnboundedSender<MutationEvent>,
    ) -> Self {
        Self {
            document,
            form: None,
            attached: None,
            generation: 0,
            mutations,
            state: SyncState::default(),
            mode: SyncMode::Idle,
            timer: Debounce::new(debounce),
            forced: false,
            rebuilds: 0,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Text-side state.
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// The current canonical text.
    pub fn canonical_text(&self) -> &str {
        &self.state.canonical_text
    }

    /// How many times the form has been rebuilt.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// When the pending rebuild is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// The structural document.
    pub fn document(&self) -> &D {
        &self.document
    }

    /// Whether a form currently exists.
    pub fn has_form(&self) -> bool {
        self.form.is_some()
    }

    /// New canonical text arrived from the owner.
    pub fn text_arrived(&mut self, text: String, now: Instant) {
        if self.state.internal_update {
            // Echo of our own push.
            self.state.internal_update = false;
            self.state.last_pushed_text = Some(text.clone());
            self.state.canonical_text = text;
            self.mode = SyncMode::Idle;
            tracing::trace!("structural echo absorbed");
            return;
        }

        self.state.canonical_text = text;

        if self.mode == SyncMode::Suspended {
            return;
        }

        if !self.forced
            && self.form.is_some()
            && self.state.last_pushed_text.as_deref() == Some(self.state.canonical_text.as_str())
        {
            if self.timer.cancel().is_some() {
                tracing::debug!("text reverted to current form, rebuild cancelled");
            }
            self.mode = SyncMode::Idle;
            self.attached = self.form.as_ref().map(|f| f.generation);
            return;
        }

        self.mode = SyncMode::TextDriven;
        self.attached = None;
        self.timer.schedule(self.state.canonical_text.clone(), now);
    }

    /// Rebuild the form if the pending rebuild is due. Returns whether it ran.
    pub fn fire_timer(&mut self, now: Instant) -> bool {
        match self.timer.fire(now) {
            Some(text) => {
                self.rebuild(text);
                true
            }
            None => false,
        }
    }

    fn rebuild(&mut self, text: String) {
        self.forced = false;
        self.attached = None;
        if let Some(old) = self.form.take() {
            self.document.destroy(old.handle);
        }

        match self.document.construct(&text) {
            Ok(handle) => {
                self.generation += 1;
                let observer = MutationObserver::new(self.generation, self.mutations.clone());
                self.document.observe(&handle, observer);
                self.form = Some(Form {
                    handle,
                    generation: self.generation,
                });
                self.attached = Some(self.generation);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to build structural form");
            }
        }

        self.rebuilds += 1;
        self.state.last_pushed_text = Some(text);
        self.mode = SyncMode::Idle;
        tracing::debug!(rebuilds = self.rebuilds, generation = self.generation, "structural form rebuilt");
    }

    /// A form reported a change.
    ///
    /// Returns the serialized text to push to the canonical owner, which must
    /// feed it back through [`text_arrived`](Self::text_arrived) next.
    pub fn mutation_observed(&mut self, event: MutationEvent) -> Option<String> {
        if self.attached != Some(event.generation) {
            tracing::trace!(generation = event.generation, "mutation from detached form ignored");
            return None;
        }
        let form = self.form.as_ref()?;

        let text = match self.document.serialize(&form.handle) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(error = %e, "serializing structural form failed");
                return None;
            }
        };
        if text.trim().is_empty() || text == self.state.canonical_text {
            return None;
        }

        self.state.internal_update = true;
        self.mode = SyncMode::StructureDriven;
        tracing::debug!(chars = text.len(), "pushing structural edit");
        Some(text)
    }

    /// Switch to raw text editing: no rebuilds, no observation.
    pub fn enter_raw_editing(&mut self) {
        self.timer.cancel();
        self.forced = false;
        self.attached = None;
        self.mode = SyncMode::Suspended;
    }

    /// A raw edit replaces the canonical text.
    ///
    /// Outside raw editing this is an ordinary text arrival.
    pub fn raw_edit(&mut self, text: String, now: Instant) {
        if self.mode == SyncMode::Suspended {
            self.state.canonical_text = text;
        } else {
            self.text_arrived(text, now);
        }
    }

    /// Leave raw editing; exactly one rebuild from the canonical text follows.
    pub fn leave_raw_editing(&mut self, now: Instant) {
        if self.mode != SyncMode::Suspended {
            return;
        }
        self.mode = SyncMode::TextDriven;
        self.forced = true;
        self.timer.schedule(self.state.canonical_text.clone(), now);
    }

    /// Disconnect the observer, cancel the pending rebuild and destroy the
    /// form. Returns the document.
    pub fn teardown(mut self) -> D {
        self.timer.cancel();
        self.attached = None;
        if let Some(form) = self.form.take() {
            self.document.destroy(form.handle);
        }
        tracing::debug!(rebuilds = self.rebuilds, "sync controller torn down");
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryDocument;

    const DELAY: Duration = Duration::from_millis(100);

    struct Harness {
        ctl: SyncController<MemoryDocument>,
        doc: MemoryDocument,
        events: mpsc::UnboundedReceiver<MutationEvent>,
        now: Instant,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, events) = mpsc::unbounded_channel();
            let doc = MemoryDocument::new();
            Self {
                ctl: SyncController::new(doc.clone(), DELAY, tx),
                doc,
                events,
                now: Instant::now(),
            }
        }

        fn advance(&mut self, ms: u64) {
            self.now += Duration::from_millis(ms);
            self.ctl.fire_timer(self.now);
        }

        fn arrive(&mut self, text: &str) {
            self.ctl.text_arrived(text.to_string(), self.now);
        }

        /// Deliver queued mutation events the way the sync loop does,
        /// re-entering pushed text immediately.
        fn pump(&mut self) -> Vec<String> {
            let mut pushed = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                if let Some(text) = self.ctl.mutation_observed(event) {
                    pushed.push(text.clone());
                    self.ctl.text_arrived(text, self.now);
                }
            }
            pushed
        }
    }

    #[test]
    fn arrival_schedules_one_debounced_rebuild() {
        let mut h = Harness::new();
        h.arrive("Begin Object A");
        assert_eq!(h.ctl.mode(), SyncMode::TextDriven);
        h.advance(50);
        h.arrive("Begin Object AB");
        h.advance(60);
        assert_eq!(h.ctl.rebuild_count(), 0);
        h.advance(40);
        assert_eq!(h.ctl.rebuild_count(), 1);
        assert_eq!(h.doc.current_text().as_deref(), Some("Begin Object AB"));
        assert_eq!(h.ctl.mode(), SyncMode::Idle);
        assert_eq!(
            h.ctl.state().last_pushed_text.as_deref(),
            Some("Begin Object AB")
        );
    }

    #[test]
    fn structural_edit_is_pushed_and_echo_absorbed() {
        let mut h = Harness::new();
        h.arrive("Begin Object A");
        h.advance(100);

        assert!(h.doc.edit("Begin Object A edited"));
        let pushed = h.pump();
        assert_eq!(pushed, vec!["Begin Object A edited"]);
        assert_eq!(h.ctl.mode(), SyncMode::Idle);
        assert!(!h.ctl.state().internal_update);
        assert_eq!(h.ctl.canonical_text(), "Begin Object A edited");

        h.advance(500);
        assert_eq!(h.ctl.rebuild_count(), 1);
        assert_eq!(h.doc.constructions(), 1);
    }

    #[test]
    fn mutation_matching_canonical_text_is_ignored() {
        let mut h = Harness::new();
        h.arrive("Begin Object A");
        h.advance(100);
        assert!(h.doc.edit("Begin Object A"));
        assert!(h.pump().is_empty());
        assert!(h.doc.edit("   "));
        assert!(h.pump().is_empty());
        assert!(!h.ctl.state().internal_update);
    }

    #[test]
    fn serialization_failure_keeps_canonical_text() {
        let mut h = Harness::new();
        h.arrive("Begin Object A");
        h.advance(100);
        h.doc.fail_serialization(true);
        assert!(h.doc.edit("Begin Object B"));
        assert!(h.pump().is_empty());
        assert_eq!(h.ctl.canonical_text(), "Begin Object A");
        assert_eq!(h.ctl.mode(), SyncMode::Idle);
    }

    #[test]
    fn arrival_equal_to_last_pushed_cancels_pending_rebuild() {
        let mut h = Harness::new();
        h.arrive("Begin Object A");
        h.advance(100);

        h.arrive("Begin Object B");
        assert!(h.ctl.deadline().is_some());
        h.arrive("Begin Object A");
        assert_eq!(h.ctl.deadline(), None);
        assert_eq!(h.ctl.mode(), SyncMode::Idle);
        h.advance(500);
        assert_eq!(h.ctl.rebuild_count(), 1);

        // The observer is back after the no-op return to idle.
        assert!(h.doc.edit("Begin Object C"));
        assert_eq!(h.pump(), vec!["Begin Object C"]);
    }

    #[test]
    fn observer_detached_while_rebuild_pending() {
        let mut h = Harness::new();
        h.arrive("Begin Object A");
        h.advance(100);

        h.arrive("Begin Object B");
        assert!(h.doc.edit("Begin Object stale"));
        assert!(h.pump().is_empty());
        h.advance(100);
        assert_eq!(h.doc.current_text().as_deref(), Some("Begin Object B"));
    }

    #[test]
    fn events_from_destroyed_form_are_ignored() {
        let mut h = Harness::new();
        h.arrive("Begin Object A");
        h.advance(100);
        let stale = MutationEvent {
            generation: h.doc.live_generation().unwrap(),
        };
        h.arrive("Begin Object B");
        h.advance(100);
        assert_eq!(h.ctl.mutation_observed(stale), None);
    }

    #[test]
    fn flag_is_consumed_by_the_next_arrival_only() {
        let mut h = Harness::new();
        h.arrive("Begin Object A");
        h.advance(100);
        assert!(h.doc.edit("Begin Object B"));
        let event = h.events.try_recv().unwrap();
        let pushed = h.ctl.mutation_observed(event).unwrap();
        assert!(h.ctl.state().internal_update);
        assert_eq!(h.ctl.mode(), SyncMode::StructureDriven);

        h.arrive(&pushed);
        assert!(!h.ctl.state().internal_update);
        // A later genuine change rebuilds.
        h.arrive("Begin Object C");
        h.advance(100);
        assert_eq!(h.ctl.rebuild_count(), 2);
    }

    #[test]
    fn raw_editing_suspends_and_rebuilds_once_on_leave() {
        let mut h = Harness::new();
        h.arrive("Begin Object A");
        h.advance(100);

        h.arrive("Begin Object pending");
        h.ctl.enter_raw_editing();
        assert_eq!(h.ctl.mode(), SyncMode::Suspended);
        assert_eq!(h.ctl.deadline(), None);

        h.ctl.raw_edit("Begin Object raw 1".into(), h.now);
        h.ctl.raw_edit("Begin Object raw 2".into(), h.now);
        assert!(h.doc.edit("Begin Object ignored"));
        assert!(h.pump().is_empty());
        h.advance(500);
        assert_eq!(h.ctl.rebuild_count(), 1);

        h.ctl.leave_raw_editing(h.now);
        h.advance(100);
        assert_eq!(h.ctl.rebuild_count(), 2);
        assert_eq!(h.doc.current_text().as_deref(), Some("Begin Object raw 2"));
    }

    #[test]
    fn leaving_raw_editing_rebuilds_even_without_edits() {
        let mut h = Harness::new();
        h.arrive("Begin Object A");
        h.advance(100);
        h.ctl.enter_raw_editing();
        h.ctl.leave_raw_editing(h.now);
        h.advance(20);
        h.arrive("Begin Object A");
        h.advance(100);
        assert_eq!(h.ctl.rebuild_count(), 2);
        h.advance(500);
        assert_eq!(h.ctl.rebuild_count(), 2);
    }

    #[test]
    fn teardown_destroys_form_and_cancels_timer() {
        let mut h = Harness::new();
        h.arrive("Begin Object A");
        h.advance(100);
        h.arrive("Begin Object B");
        let doc = h.ctl.teardown();
        assert_eq!(doc.live_forms(), 0);
        assert_eq!(doc.constructions(), 1);
        assert!(!doc.edit("Begin Object C"));
    }
}
