use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::provider::StaticBoardProvider;
use crate::tracker::RequirementTracker;
use crate::upload::{UploadOutcome, Uploader};

const HELP: &str = "\
commands:
  select <fqbn> <port>   change the board/port selection
  upload                 upload the sketch (prompts for fields when needed)
  upload-configure       upload, always showing the field dialog
  verify                 compile only
  fields                 show cached fields for the current board
  status                 show gate state
  help                   this text
  quit                   leave the session";

/// Line-oriented session that keeps one gate alive across uploads.
pub struct Session {
    uploader: Uploader,
    provider: Arc<StaticBoardProvider>,
    tracker: Arc<RequirementTracker>,
    sketch: PathBuf,
}

impl Session {
    pub fn new(
        uploader: Uploader,
        provider: Arc<StaticBoardProvider>,
        tracker: Arc<RequirementTracker>,
        sketch: PathBuf,
    ) -> Self {
        Self {
            uploader,
            provider,
            tracker,
            sketch,
        }
    }

    pub fn uploader(&self) -> &Uploader {
        &self.uploader
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        writeln!(out, "sketch: {}  (type 'help' for commands)", self.sketch.display())?;
        for line in input.lines() {
            let line = line?;
            let mut words = line.split_whitespace();
            let Some(cmd) = words.next() else {
                continue;
            };
            match cmd {
                "quit" | "exit" => break,
                "help" => writeln!(out, "{HELP}")?,
                "select" => {
                    let (Some(fqbn), Some(port)) = (words.next(), words.next()) else {
                        writeln!(out, "usage: select <fqbn> <port>")?;
                        continue;
                    };
                    self.provider.select(fqbn, port);
                    // Recompute now; the next command must see the new requirement.
                    if let Err(e) = self.tracker.on_board_selection_changed(self.provider.as_ref()) {
                        writeln!(out, "failed to read user fields for {fqbn}: {e}")?;
                    }
                    writeln!(out, "selected {fqbn} on {port}")?;
                }
                "upload" => self.upload(false, out)?,
                "upload-configure" => self.upload(true, out)?,
                "verify" => {
                    let sketch = self.sketch.clone();
                    let outcome = self.uploader.verify(&sketch);
                    report(out, "verify", &outcome)?;
                }
                "fields" => self.print_fields(out)?,
                "status" => self.print_status(out)?,
                other => writeln!(out, "unknown command '{other}' (try 'help')")?,
            }
        }
        Ok(())
    }

    fn upload<W: Write>(&mut self, using_configuration: bool, out: &mut W) -> Result<()> {
        let sketch = self.sketch.clone();
        let outcome = self.uploader.upload(&sketch, using_configuration);
        report(out, "upload", &outcome)
    }

    fn print_fields<W: Write>(&self, out: &mut W) -> Result<()> {
        let gate = self.uploader.gate();
        let Some(identity) = gate.current_identity() else {
            writeln!(out, "no board/port selected")?;
            return Ok(());
        };
        let fields = gate.fields();
        if fields.is_empty() {
            writeln!(out, "{identity}: no cached fields")?;
            return Ok(());
        }
        if let Some(at) = gate.cache().confirmed_at(&identity) {
            writeln!(out, "{identity}: confirmed {}", at.format("%Y-%m-%d %H:%M:%S"))?;
        }
        for f in &fields {
            let shown = if f.secret { "********" } else { f.value.as_str() };
            writeln!(out, "  {} = {shown}", f.display_label())?;
        }
        Ok(())
    }

    fn print_status<W: Write>(&self, out: &mut W) -> Result<()> {
        let gate = self.uploader.gate();
        let identity = gate
            .current_identity()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "<unresolved>".into());
        writeln!(out, "board: {identity}")?;
        writeln!(out, "fields required: {}", gate.is_required())?;
        writeln!(out, "fields confirmed: {}", gate.fields_confirmed())?;
        writeln!(out, "cached boards: {}", gate.cache().len())?;
        Ok(())
    }
}

fn report<W: Write>(out: &mut W, what: &str, outcome: &UploadOutcome) -> Result<()> {
    match outcome {
        UploadOutcome::Uploaded => writeln!(out, "{what}: ok")?,
        UploadOutcome::Blocked => writeln!(out, "{what}: not started")?,
        UploadOutcome::Failed(f) => writeln!(out, "{what}: failed: {f}")?,
    }
    Ok(())
}
