use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, mpsc};

use serde::Deserialize;

use crate::board::UserField;
use crate::events::{GateEvent, GateSink};
use crate::failure::{FailureKind, UploadFailure};
use crate::log_sanitize::sanitize_tool_line;

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub sketch: PathBuf,
    pub fqbn: String,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub sketch: PathBuf,
    pub fqbn: String,
    pub port: String,
    pub user_fields: Vec<UserField>,
    pub verbose: bool,
}

/// Builds and flashes sketches. Failures come back tagged with their stage.
pub trait CoreService: Send {
    fn compile(&mut self, opts: &CompileOptions) -> Result<(), UploadFailure>;
    fn upload(&mut self, opts: &UploadOptions) -> Result<(), UploadFailure>;
}

fn default_program() -> String {
    "arduino-cli".into()
}

fn default_compile_args() -> Vec<String> {
    ["compile", "--fqbn", "{fqbn}", "{sketch}"]
        .map(String::from)
        .to_vec()
}

fn default_upload_args() -> Vec<String> {
    ["upload", "--fqbn", "{fqbn}", "--port", "{port}", "{sketch}"]
        .map(String::from)
        .to_vec()
}

fn default_field_flag() -> String {
    "--upload-field".into()
}

fn default_verbose_flag() -> String {
    "--verbose".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_compile_args")]
    pub compile_args: Vec<String>,
    #[serde(default = "default_upload_args")]
    pub upload_args: Vec<String>,
    /// Each user field is passed as `<field_flag> name=value`.
    #[serde(default = "default_field_flag")]
    pub field_flag: String,
    #[serde(default = "default_verbose_flag")]
    pub verbose_flag: String,
    pub verbose: bool,
    pub dry_run: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            compile_args: default_compile_args(),
            upload_args: default_upload_args(),
            field_flag: default_field_flag(),
            verbose_flag: default_verbose_flag(),
            verbose: false,
            dry_run: false,
        }
    }
}

/// Runs the configured command line tool for each compile/upload.
pub struct CommandCoreService {
    cfg: ToolConfig,
    sink: Arc<dyn GateSink>,
}

impl CommandCoreService {
    pub fn new(cfg: ToolConfig, sink: Arc<dyn GateSink>) -> Self {
        Self { cfg, sink }
    }

    pub fn compile_command(&self, opts: &CompileOptions) -> Command {
        let mut cmd = Command::new(&self.cfg.program);
        let sketch = opts.sketch.display().to_string();
        for a in &self.cfg.compile_args {
            cmd.arg(expand(a, &sketch, &opts.fqbn, ""));
        }
        if opts.verbose && !self.cfg.verbose_flag.is_empty() {
            cmd.arg(&self.cfg.verbose_flag);
        }
        cmd
    }

    pub fn upload_command(&self, opts: &UploadOptions) -> Command {
        let mut cmd = Command::new(&self.cfg.program);
        let sketch = opts.sketch.display().to_string();
        for a in &self.cfg.upload_args {
            cmd.arg(expand(a, &sketch, &opts.fqbn, &opts.port));
        }
        if opts.verbose && !self.cfg.verbose_flag.is_empty() {
            cmd.arg(&self.cfg.verbose_flag);
        }
        for f in &opts.user_fields {
            cmd.arg(&self.cfg.field_flag);
            cmd.arg(format!("{}={}", f.name, f.value));
        }
        cmd
    }

    fn log(&self, line: String) {
        self.sink.emit(GateEvent::ToolLog { line });
    }

    // Stream stdout+stderr line by line; the last non-empty line becomes the
    // failure detail when the tool exits non-zero.
    fn run(&self, mut cmd: Command, stage: FailureKind, secrets: &[&str]) -> Result<(), UploadFailure> {
        if self.cfg.dry_run {
            let shown = sanitize_tool_line(&format!("{cmd:?}"), secrets);
            self.log(format!("DRY-RUN: {shown}"));
            return Ok(());
        }
        tracing::debug!(program = %self.cfg.program, ?stage, "running tool");

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                UploadFailure::new(
                    FailureKind::Connection,
                    format!("failed to start '{}': {e}", self.cfg.program),
                )
            })?;

        let (tx, rx) = mpsc::channel::<String>();
        if let Some(out) = child.stdout.take() {
            let tx = tx.clone();
            std::thread::spawn(move || forward_lines(out, tx));
        }
        if let Some(err) = child.stderr.take() {
            let tx = tx.clone();
            std::thread::spawn(move || forward_lines(err, tx));
        }
        drop(tx);

        let mut last = String::new();
        for raw in rx {
            let line = sanitize_tool_line(&raw, secrets);
            if line.trim().is_empty() {
                continue;
            }
            last = line.clone();
            self.log(line);
        }

        let status = child
            .wait()
            .map_err(|e| UploadFailure::new(stage, format!("wait failed: {e}")))?;
        if status.success() {
            return Ok(());
        }
        let detail = if last.is_empty() {
            format!("{} exited with {status}", self.cfg.program)
        } else {
            last
        };
        Err(UploadFailure::new(stage, detail))
    }
}

fn forward_lines<R: Read>(stream: R, tx: mpsc::Sender<String>) {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if tx.send(line).is_err() {
            break;
        }
    }
}

fn expand(arg: &str, sketch: &str, fqbn: &str, port: &str) -> String {
    arg.replace("{sketch}", sketch)
        .replace("{fqbn}", fqbn)
        .replace("{port}", port)
}

impl CoreService for CommandCoreService {
    fn compile(&mut self, opts: &CompileOptions) -> Result<(), UploadFailure> {
        let cmd = self.compile_command(opts);
        self.run(cmd, FailureKind::Compile, &[])
    }

    fn upload(&mut self, opts: &UploadOptions) -> Result<(), UploadFailure> {
        let secrets: Vec<&str> = opts
            .user_fields
            .iter()
            .filter(|f| f.secret)
            .map(|f| f.value.as_str())
            .collect();
        let cmd = self.upload_command(opts);
        self.run(cmd, FailureKind::Upload, &secrets)
    }
}
