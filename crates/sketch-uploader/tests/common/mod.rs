#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, mpsc};

use sketch_uploader::board::{BoardsConfig, UserField};
use sketch_uploader::core_service::{CompileOptions, CoreService, UploadOptions};
use sketch_uploader::dialog::FieldsDialog;
use sketch_uploader::events::NullSink;
use sketch_uploader::failure::UploadFailure;
use sketch_uploader::gate::UploadGate;
use sketch_uploader::messages::{LocalizedMessage, MessageService};
use sketch_uploader::provider::{BoardDefinition, BoardProvider, StaticBoardProvider};
use sketch_uploader::tracker::RequirementTracker;

pub enum Reply {
    /// Set these values (by field name) and confirm.
    Confirm(Vec<(&'static str, &'static str)>),
    Cancel,
    /// Scribble over every value, then cancel.
    TamperThenCancel,
}

/// Scripted dialog that records what it was shown.
#[derive(Clone, Default)]
pub struct ScriptedDialog {
    pub shown: Arc<Mutex<Vec<Vec<UserField>>>>,
    replies: Arc<Mutex<VecDeque<Reply>>>,
}

impl ScriptedDialog {
    pub fn reply(&self, r: Reply) {
        self.replies.lock().unwrap().push_back(r);
    }

    pub fn opened(&self) -> usize {
        self.shown.lock().unwrap().len()
    }

    pub fn last_shown(&self) -> Vec<UserField> {
        self.shown.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl FieldsDialog for ScriptedDialog {
    fn open(&mut self, mut fields: Vec<UserField>) -> sketch_uploader::Result<Option<Vec<UserField>>> {
        self.shown.lock().unwrap().push(fields.clone());
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Cancel);
        match reply {
            Reply::Confirm(values) => {
                for (name, value) in values {
                    if let Some(f) = fields.iter_mut().find(|f| f.name == name) {
                        f.value = value.to_string();
                    }
                }
                Ok(Some(fields))
            }
            Reply::Cancel => Ok(None),
            Reply::TamperThenCancel => {
                for f in &mut fields {
                    f.value = "tampered".into();
                }
                Ok(None)
            }
        }
    }
}

/// Dialog whose terminal never comes up.
pub struct BrokenDialog;

impl FieldsDialog for BrokenDialog {
    fn open(&mut self, _fields: Vec<UserField>) -> sketch_uploader::Result<Option<Vec<UserField>>> {
        Err(sketch_uploader::Error::msg("terminal unavailable"))
    }
}

/// Provider with a fixed selection whose field query always fails.
pub struct BrokenProvider {
    pub selection: BoardsConfig,
}

impl BoardProvider for BrokenProvider {
    fn boards_config(&self) -> BoardsConfig {
        self.selection.clone()
    }

    fn selected_board_user_fields(&self) -> sketch_uploader::Result<Vec<UserField>> {
        Err(sketch_uploader::Error::msg("board list unavailable"))
    }

    fn subscribe(&self) -> mpsc::Receiver<BoardsConfig> {
        mpsc::channel().1
    }
}

#[derive(Clone, Default)]
pub struct RecordingMessages {
    pub errors: Arc<Mutex<Vec<&'static str>>>,
}

impl MessageService for RecordingMessages {
    fn error(&self, message: &LocalizedMessage) {
        self.errors.lock().unwrap().push(message.key);
    }
}

/// Core service that records calls and fails uploads on demand.
#[derive(Clone, Default)]
pub struct FakeCore {
    pub compiles: Arc<Mutex<Vec<CompileOptions>>>,
    pub uploads: Arc<Mutex<Vec<UploadOptions>>>,
    pub compile_failures: Arc<Mutex<VecDeque<UploadFailure>>>,
    pub upload_failures: Arc<Mutex<VecDeque<UploadFailure>>>,
}

impl FakeCore {
    pub fn fail_next_upload(&self, f: UploadFailure) {
        self.upload_failures.lock().unwrap().push_back(f);
    }

    pub fn fail_next_compile(&self, f: UploadFailure) {
        self.compile_failures.lock().unwrap().push_back(f);
    }
}

impl CoreService for FakeCore {
    fn compile(&mut self, opts: &CompileOptions) -> Result<(), UploadFailure> {
        self.compiles.lock().unwrap().push(opts.clone());
        match self.compile_failures.lock().unwrap().pop_front() {
            Some(f) => Err(f),
            None => Ok(()),
        }
    }

    fn upload(&mut self, opts: &UploadOptions) -> Result<(), UploadFailure> {
        self.uploads.lock().unwrap().push(opts.clone());
        match self.upload_failures.lock().unwrap().pop_front() {
            Some(f) => Err(f),
            None => Ok(()),
        }
    }
}

pub fn boards() -> Vec<BoardDefinition> {
    vec![
        BoardDefinition {
            fqbn: "X:avr:uno".into(),
            name: "Uno WiFi".into(),
            user_fields: vec![UserField {
                tool_id: "avrdude".into(),
                ..UserField::new("password", "Password", true)
            }],
        },
        BoardDefinition {
            fqbn: "X:avr:nano".into(),
            name: "Nano".into(),
            user_fields: Vec::new(),
        },
        BoardDefinition {
            fqbn: "X:esp32:ota".into(),
            name: "ESP32 OTA".into(),
            user_fields: vec![
                UserField::new("host", "Host", false),
                UserField::new("token", "", true),
            ],
        },
    ]
}

pub struct Harness {
    pub provider: Arc<StaticBoardProvider>,
    pub tracker: Arc<RequirementTracker>,
    pub dialog: ScriptedDialog,
    pub messages: RecordingMessages,
    pub gate: UploadGate,
}

impl Harness {
    pub fn new(selection: BoardsConfig) -> Self {
        let provider = Arc::new(StaticBoardProvider::new(boards(), selection));
        let tracker = Arc::new(RequirementTracker::new(Arc::new(NullSink)));
        tracker.on_board_selection_changed(provider.as_ref()).unwrap();
        let dialog = ScriptedDialog::default();
        let messages = RecordingMessages::default();
        let gate = UploadGate::new(
            provider.clone(),
            tracker.clone(),
            Box::new(dialog.clone()),
            Arc::new(messages.clone()),
            Arc::new(NullSink),
        );
        Self {
            provider,
            tracker,
            dialog,
            messages,
            gate,
        }
    }

    pub fn uno() -> Self {
        Self::new(BoardsConfig::new("X:avr:uno", "/dev/ttyUSB0"))
    }

    /// Change the selection and recompute the requirement flag synchronously.
    pub fn select(&self, fqbn: &str, port: &str) {
        self.provider.select(fqbn, port);
        self.tracker
            .on_board_selection_changed(self.provider.as_ref())
            .unwrap();
    }
}
