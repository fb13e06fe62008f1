use std::sync::{Mutex, mpsc};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// The "Upload Using Configuration" entry should be enabled or shown as a placeholder.
    MenuChanged {
        upload_with_configuration: bool,
    },
    DialogOpened {
        identity: String,
        fields: usize,
    },
    DialogCancelled {
        identity: String,
    },
    FieldsConfirmed {
        identity: String,
        fingerprint: String,
    },
    ValidityReset {
        reason: String,
    },
    UploadStarted {
        identity: String,
        sketch: String,
    },
    ToolLog {
        line: String,
    },
    UploadFinished {
        ok: bool,
        error: Option<String>,
    },
}

pub trait GateSink: Send + Sync {
    fn emit(&self, ev: GateEvent);
}

#[derive(Default)]
pub struct StdoutSink {
    started_at: Mutex<Option<Instant>>,
}

impl GateSink for StdoutSink {
    fn emit(&self, ev: GateEvent) {
        match ev {
            GateEvent::MenuChanged {
                upload_with_configuration,
            } => {
                let state = if upload_with_configuration {
                    "enabled"
                } else {
                    "placeholder"
                };
                println!("MENU: upload-with-configuration {state}");
            }
            GateEvent::DialogOpened { identity, fields } => {
                println!("FIELDS: {identity} ({fields} requested)");
            }
            GateEvent::DialogCancelled { identity } => {
                println!("FIELDS: {identity} cancelled");
            }
            GateEvent::FieldsConfirmed {
                identity,
                fingerprint,
            } => {
                println!("FIELDS: {identity} confirmed [{fingerprint}]");
            }
            GateEvent::ValidityReset { reason } => {
                println!("FIELDS: re-confirmation required ({reason})");
            }
            GateEvent::UploadStarted { identity, sketch } => {
                if let Ok(mut g) = self.started_at.lock() {
                    *g = Some(Instant::now());
                }
                println!("UPLOAD: {sketch} -> {identity}");
            }
            GateEvent::ToolLog { line } => {
                println!("  {line}");
            }
            GateEvent::UploadFinished { ok, error } => {
                let elapsed_ms = self
                    .started_at
                    .lock()
                    .ok()
                    .and_then(|mut g| g.take())
                    .map(|t| t.elapsed().as_millis())
                    .unwrap_or_default();
                if ok {
                    println!("DONE: ok ({elapsed_ms}ms)");
                } else {
                    println!(
                        "FAIL: ({elapsed_ms}ms) {}",
                        error.unwrap_or_default()
                    );
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<GateEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<GateEvent>) -> Self {
        Self { tx }
    }
}

impl GateSink for ChannelSink {
    fn emit(&self, ev: GateEvent) {
        let _ = self.tx.send(ev);
    }
}

/// Drops everything; handy where only the return values matter.
pub struct NullSink;

impl GateSink for NullSink {
    fn emit(&self, _ev: GateEvent) {}
}
