use std::sync::Arc;

use crate::board::{BoardIdentity, UserField, fields_fingerprint};
use crate::cache::FieldCache;
use crate::dialog::FieldsDialog;
use crate::events::{GateEvent, GateSink};
use crate::failure::UploadFailure;
use crate::messages::{MessageService, USER_FIELDS_NOT_FOUND};
use crate::provider::BoardProvider;
use crate::tracker::RequirementTracker;

/// Decides per upload attempt whether user fields are in place, prompting for
/// them when they are not.
///
/// Cache and validity are only touched through `&mut self`, so one gate
/// evaluation always finishes before the next starts.
pub struct UploadGate {
    provider: Arc<dyn BoardProvider>,
    tracker: Arc<RequirementTracker>,
    dialog: Box<dyn FieldsDialog>,
    messages: Arc<dyn MessageService>,
    sink: Arc<dyn GateSink>,
    cache: FieldCache,
    // Fields were confirmed (dialog or pre-flight) since the last
    // configuration-related failure. Not tied to an identity; the cache lookup is.
    fields_confirmed: bool,
}

impl UploadGate {
    pub fn new(
        provider: Arc<dyn BoardProvider>,
        tracker: Arc<RequirementTracker>,
        dialog: Box<dyn FieldsDialog>,
        messages: Arc<dyn MessageService>,
        sink: Arc<dyn GateSink>,
    ) -> Self {
        Self {
            provider,
            tracker,
            dialog,
            messages,
            sink,
            cache: FieldCache::new(),
            fields_confirmed: false,
        }
    }

    pub fn current_identity(&self) -> Option<BoardIdentity> {
        BoardIdentity::resolve(&self.provider.boards_config())
    }

    pub fn is_required(&self) -> bool {
        self.tracker.is_required()
    }

    pub fn fields_confirmed(&self) -> bool {
        self.fields_confirmed
    }

    pub fn cache(&self) -> &FieldCache {
        &self.cache
    }

    /// `true` when the upload may go ahead. `force_open` always shows the
    /// dialog unless the board/port cannot be identified.
    pub fn check_before_upload(&mut self, force_open: bool) -> bool {
        let Some(identity) = self.current_identity() else {
            tracing::debug!("no board identity; upload gated");
            return false;
        };

        if !force_open
            && (!self.is_required() || (self.cache.contains(&identity) && self.fields_confirmed))
        {
            return true;
        }

        self.prompt(&identity)
    }

    fn prompt(&mut self, identity: &BoardIdentity) -> bool {
        let presented = match self.cache.get(identity) {
            Some(cached) => cached,
            None => match self.provider.selected_board_user_fields() {
                Ok(defs) => defs,
                Err(e) => {
                    tracing::warn!(%identity, "failed to query user fields: {e}");
                    return false;
                }
            },
        };

        self.sink.emit(GateEvent::DialogOpened {
            identity: identity.to_string(),
            fields: presented.len(),
        });
        let result = match self.dialog.open(presented) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(%identity, "user fields dialog failed: {e}");
                None
            }
        };
        let Some(values) = result else {
            self.sink.emit(GateEvent::DialogCancelled {
                identity: identity.to_string(),
            });
            return false;
        };

        let fingerprint = fields_fingerprint(&values);
        tracing::info!(%identity, %fingerprint, "user fields confirmed");
        self.cache.put(identity, &values);
        self.fields_confirmed = true;
        self.sink.emit(GateEvent::FieldsConfirmed {
            identity: identity.to_string(),
            fingerprint,
        });
        true
    }

    /// Final check right before dispatching an upload. Never opens the dialog.
    pub fn check_fields_for_upload(&mut self) -> bool {
        if !self.is_required() || !self.fields().is_empty() {
            self.fields_confirmed = true;
            return true;
        }
        self.messages.error(&USER_FIELDS_NOT_FOUND);
        self.fields_confirmed = false;
        false
    }

    /// Cached values for the current board, empty when there are none.
    pub fn fields(&self) -> Vec<UserField> {
        self.current_identity()
            .and_then(|id| self.cache.get(&id))
            .unwrap_or_default()
    }

    /// Feed back a failed upload. Upload-stage failures while fields are
    /// required force the dialog on the next attempt.
    pub fn notify_failed(&mut self, failure: &UploadFailure) {
        if self.is_required() && failure.kind.implicates_configuration() {
            tracing::debug!(kind = ?failure.kind, "resetting user field validity");
            self.fields_confirmed = false;
            self.sink.emit(GateEvent::ValidityReset {
                reason: failure.message.clone(),
            });
        }
    }
}
