use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crate::error::Result;
use crate::events::{GateEvent, GateSink};
use crate::provider::BoardProvider;

/// Tracks whether the selected board needs user fields.
///
/// The flag is written only by `on_board_selection_changed`. When recomputations
/// run on the listener thread a late one for an older selection can land after a
/// newer one; readers may briefly see a stale value.
pub struct RequirementTracker {
    required: AtomicBool,
    sink: Arc<dyn GateSink>,
}

impl RequirementTracker {
    pub fn new(sink: Arc<dyn GateSink>) -> Self {
        Self {
            required: AtomicBool::new(false),
            sink,
        }
    }

    pub fn is_required(&self) -> bool {
        self.required.load(Ordering::Acquire)
    }

    /// Re-query the provider and refresh the flag. On provider error the previous
    /// value is kept.
    pub fn on_board_selection_changed(&self, provider: &dyn BoardProvider) -> Result<bool> {
        let fields = provider.selected_board_user_fields()?;
        let required = !fields.is_empty();
        let previous = self.required.swap(required, Ordering::AcqRel);
        tracing::debug!(required, previous, fields = fields.len(), "user field requirement");
        self.sink.emit(GateEvent::MenuChanged {
            upload_with_configuration: required,
        });
        Ok(required)
    }

    /// Subscribe to selection changes and recompute on a worker thread until the
    /// provider drops its senders.
    pub fn listen(self: &Arc<Self>, provider: Arc<dyn BoardProvider>) -> JoinHandle<()> {
        let rx = provider.subscribe();
        let tracker = Arc::clone(self);
        std::thread::spawn(move || {
            for _snapshot in rx {
                if let Err(e) = tracker.on_board_selection_changed(provider.as_ref()) {
                    tracing::warn!("failed to refresh user field requirement: {e}");
                }
            }
        })
    }
}
