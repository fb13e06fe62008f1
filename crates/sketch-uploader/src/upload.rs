use std::path::Path;
use std::sync::Arc;

use crate::core_service::{CompileOptions, CoreService, UploadOptions};
use crate::events::{GateEvent, GateSink};
use crate::failure::UploadFailure;
use crate::gate::UploadGate;
use crate::provider::BoardProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// The gate or the selection stopped the upload before the tool ran.
    Blocked,
    Failed(UploadFailure),
}

/// Drives one upload attempt through the gate and the core service.
pub struct Uploader {
    gate: UploadGate,
    core: Box<dyn CoreService>,
    provider: Arc<dyn BoardProvider>,
    sink: Arc<dyn GateSink>,
    verbose: bool,
}

impl Uploader {
    pub fn new(
        gate: UploadGate,
        core: Box<dyn CoreService>,
        provider: Arc<dyn BoardProvider>,
        sink: Arc<dyn GateSink>,
    ) -> Self {
        Self {
            gate,
            core,
            provider,
            sink,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn gate(&self) -> &UploadGate {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut UploadGate {
        &mut self.gate
    }

    /// Compile only. Does not consult user fields.
    pub fn verify(&mut self, sketch: &Path) -> UploadOutcome {
        let cfg = self.provider.boards_config();
        let Some(fqbn) = cfg.fqbn() else {
            tracing::warn!("no board selected; nothing to verify against");
            return UploadOutcome::Blocked;
        };
        let opts = CompileOptions {
            sketch: sketch.to_path_buf(),
            fqbn: fqbn.to_string(),
            verbose: self.verbose,
        };
        match self.core.compile(&opts) {
            Ok(()) => UploadOutcome::Uploaded,
            Err(f) => UploadOutcome::Failed(f),
        }
    }

    /// `using_configuration` forces the field dialog even when cached values are valid.
    pub fn upload(&mut self, sketch: &Path, using_configuration: bool) -> UploadOutcome {
        if !self.gate.check_before_upload(using_configuration) {
            return UploadOutcome::Blocked;
        }

        let cfg = self.provider.boards_config();
        let (Some(fqbn), Some(port)) = (cfg.fqbn(), cfg.port_address()) else {
            return UploadOutcome::Blocked;
        };
        let (fqbn, port) = (fqbn.to_string(), port.to_string());

        if !self.gate.check_fields_for_upload() {
            return UploadOutcome::Blocked;
        }

        self.sink.emit(GateEvent::UploadStarted {
            identity: self
                .gate
                .current_identity()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            sketch: sketch.display().to_string(),
        });

        let result = self
            .core
            .compile(&CompileOptions {
                sketch: sketch.to_path_buf(),
                fqbn: fqbn.clone(),
                verbose: self.verbose,
            })
            .and_then(|()| {
                self.core.upload(&UploadOptions {
                    sketch: sketch.to_path_buf(),
                    fqbn,
                    port,
                    user_fields: self.gate.fields(),
                    verbose: self.verbose,
                })
            });

        match result {
            Ok(()) => {
                tracing::info!(sketch = %sketch.display(), "upload finished");
                self.sink.emit(GateEvent::UploadFinished {
                    ok: true,
                    error: None,
                });
                UploadOutcome::Uploaded
            }
            Err(failure) => {
                tracing::warn!(kind = ?failure.kind, "upload failed: {failure}");
                self.gate.notify_failed(&failure);
                self.sink.emit(GateEvent::UploadFinished {
                    ok: false,
                    error: Some(failure.to_string()),
                });
                UploadOutcome::Failed(failure)
            }
        }
    }
}
