mod common;

use std::path::Path;
use std::sync::{Arc, mpsc};

use common::{FakeCore, Harness, Reply};
use sketch_uploader::board::BoardsConfig;
use sketch_uploader::events::{ChannelSink, GateEvent};
use sketch_uploader::failure::{FailureKind, UploadFailure};
use sketch_uploader::upload::{UploadOutcome, Uploader};

fn uploader(h: Harness) -> (Uploader, common::ScriptedDialog, FakeCore, mpsc::Receiver<GateEvent>) {
    let (tx, rx) = mpsc::channel();
    let core = FakeCore::default();
    let dialog = h.dialog.clone();
    let up = Uploader::new(
        h.gate,
        Box::new(core.clone()),
        h.provider.clone(),
        Arc::new(ChannelSink::new(tx)),
    );
    (up, dialog, core, rx)
}

#[test]
fn upload_passes_cached_fields_to_the_tool() {
    let (mut up, dialog, core, rx) = uploader(Harness::uno());
    dialog.reply(Reply::Confirm(vec![("password", "secret")]));

    let outcome = up.upload(Path::new("/sketches/Blink"), false);
    assert_eq!(outcome, UploadOutcome::Uploaded);

    let uploads = core.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].fqbn, "X:avr:uno");
    assert_eq!(uploads[0].port, "/dev/ttyUSB0");
    assert_eq!(uploads[0].user_fields[0].name, "password");
    assert_eq!(uploads[0].user_fields[0].value, "secret");
    assert_eq!(core.compiles.lock().unwrap().len(), 1);

    let events: Vec<GateEvent> = rx.try_iter().collect();
    assert!(events.contains(&GateEvent::UploadFinished {
        ok: true,
        error: None
    }));
}

#[test]
fn cancelled_dialog_blocks_without_running_the_tool() {
    let (mut up, dialog, core, _rx) = uploader(Harness::uno());
    dialog.reply(Reply::Cancel);

    assert_eq!(up.upload(Path::new("/sketches/Blink"), false), UploadOutcome::Blocked);
    assert!(core.compiles.lock().unwrap().is_empty());
    assert!(core.uploads.lock().unwrap().is_empty());
}

#[test]
fn upload_error_forces_dialog_on_next_attempt() {
    let (mut up, dialog, core, _rx) = uploader(Harness::uno());
    dialog.reply(Reply::Confirm(vec![("password", "wrong")]));
    core.fail_next_upload(UploadFailure::new(FailureKind::Upload, "authentication failed"));

    let outcome = up.upload(Path::new("/sketches/Blink"), false);
    assert!(matches!(outcome, UploadOutcome::Failed(ref f) if f.kind == FailureKind::Upload));
    assert!(!up.gate().fields_confirmed());

    dialog.reply(Reply::Confirm(vec![("password", "right")]));
    assert_eq!(up.upload(Path::new("/sketches/Blink"), false), UploadOutcome::Uploaded);
    assert_eq!(dialog.opened(), 2);
    assert_eq!(dialog.last_shown()[0].value, "wrong");
    assert_eq!(core.uploads.lock().unwrap()[1].user_fields[0].value, "right");
}

#[test]
fn compile_error_does_not_force_dialog() {
    let (mut up, dialog, core, _rx) = uploader(Harness::uno());
    dialog.reply(Reply::Confirm(vec![("password", "secret")]));
    core.fail_next_compile(UploadFailure::new(FailureKind::Compile, "missing semicolon"));

    let outcome = up.upload(Path::new("/sketches/Blink"), false);
    assert!(matches!(outcome, UploadOutcome::Failed(ref f) if f.kind == FailureKind::Compile));
    assert!(core.uploads.lock().unwrap().is_empty());

    assert_eq!(up.upload(Path::new("/sketches/Blink"), false), UploadOutcome::Uploaded);
    assert_eq!(dialog.opened(), 1);
}

#[test]
fn using_configuration_always_prompts() {
    let (mut up, dialog, _core, _rx) = uploader(Harness::uno());
    dialog.reply(Reply::Confirm(vec![("password", "secret")]));
    assert_eq!(up.upload(Path::new("/sketches/Blink"), false), UploadOutcome::Uploaded);

    dialog.reply(Reply::Confirm(vec![]));
    assert_eq!(up.upload(Path::new("/sketches/Blink"), true), UploadOutcome::Uploaded);
    assert_eq!(dialog.opened(), 2);
}

#[test]
fn board_without_fields_uploads_without_prompt() {
    let h = Harness::new(BoardsConfig::new("X:avr:nano", "/dev/ttyUSB0"));
    let (mut up, dialog, core, _rx) = uploader(h);
    assert_eq!(up.upload(Path::new("/sketches/Blink"), false), UploadOutcome::Uploaded);
    assert_eq!(dialog.opened(), 0);
    assert!(core.uploads.lock().unwrap()[0].user_fields.is_empty());
}

#[test]
fn verify_only_compiles() {
    let (mut up, dialog, core, _rx) = uploader(Harness::uno());
    assert_eq!(up.verify(Path::new("/sketches/Blink")), UploadOutcome::Uploaded);
    assert_eq!(dialog.opened(), 0);
    assert_eq!(core.compiles.lock().unwrap()[0].fqbn, "X:avr:uno");
    assert!(core.uploads.lock().unwrap().is_empty());
}
