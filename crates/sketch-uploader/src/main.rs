use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sketch_uploader::config::ConfigDoc;
use sketch_uploader::core_service::{CommandCoreService, ToolConfig};
use sketch_uploader::dialog::{self, DialogConfig, DialogMode};
use sketch_uploader::events::{GateSink, StdoutSink};
use sketch_uploader::gate::UploadGate;
use sketch_uploader::messages::ConsoleMessages;
use sketch_uploader::provider::{BoardProvider, StaticBoardProvider};
use sketch_uploader::session::Session;
use sketch_uploader::tracker::RequirementTracker;
use sketch_uploader::upload::{UploadOutcome, Uploader};
use sketch_uploader::{Error, Result};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the identity (fqbn|port) of the selected board
    Identity {
        /// Path to a TOML config
        config: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List the user fields the selected board requires
    Fields {
        /// Path to a TOML config
        config: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Compile a sketch for the selected board
    Verify {
        /// Path to a TOML config
        config: PathBuf,
        /// Sketch directory or .ino file
        sketch: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Compile and upload a sketch, asking for user fields when the board needs them
    Upload {
        /// Path to a TOML config
        config: PathBuf,
        /// Sketch directory or .ino file
        sketch: PathBuf,
        /// Always show the field dialog ("Upload Using Configuration")
        #[arg(long)]
        configure: bool,
        /// Answer a user field non-interactively (name=value, repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
        /// Print the tool invocations without running them
        #[arg(long)]
        dry_run: bool,
    },
    /// Interactive session keeping entered fields across uploads
    Session {
        /// Path to a TOML config
        config: PathBuf,
        /// Sketch directory or .ino file
        sketch: PathBuf,
        #[arg(long = "field")]
        fields: Vec<String>,
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    match args.cmd {
        Command::Identity { config, json } => cmd_identity(&config, json),
        Command::Fields { config, json } => cmd_fields(&config, json),
        Command::Verify {
            config,
            sketch,
            dry_run,
        } => cmd_verify(&config, &sketch, dry_run),
        Command::Upload {
            config,
            sketch,
            configure,
            fields,
            dry_run,
        } => cmd_upload(&config, &sketch, configure, &fields, dry_run),
        Command::Session {
            config,
            sketch,
            fields,
            dry_run,
        } => cmd_session(&config, &sketch, &fields, dry_run),
    }
}

fn load(path: &Path) -> Result<ConfigDoc> {
    let doc = sketch_uploader::config::load(path)?;
    sketch_uploader::logging::init(&doc.section("log")?)?;
    Ok(doc)
}

fn cmd_identity(path: &Path, json: bool) -> Result<()> {
    let doc = load(path)?;
    let provider = StaticBoardProvider::from_doc(&doc)?;
    let cfg = provider.boards_config();
    let identity = sketch_uploader::board::BoardIdentity::resolve(&cfg);
    if json {
        let v = serde_json::json!({
            "identity": identity,
            "fqbn": cfg.fqbn(),
            "port": cfg.port_address(),
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }
    match identity {
        Some(id) => println!("{id}"),
        None => return Err(Error::msg("board or port not selected")),
    }
    Ok(())
}

fn cmd_fields(path: &Path, json: bool) -> Result<()> {
    let doc = load(path)?;
    let provider = StaticBoardProvider::from_doc(&doc)?;
    let fields = provider.selected_board_user_fields()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
        return Ok(());
    }
    if fields.is_empty() {
        println!("selected board requires no user fields");
    }
    for f in &fields {
        let secret = if f.secret { " (secret)" } else { "" };
        println!("{:<16} {}{secret}", f.name, f.display_label());
    }
    Ok(())
}

struct Wiring {
    provider: Arc<StaticBoardProvider>,
    tracker: Arc<RequirementTracker>,
    uploader: Uploader,
}

fn wire(doc: &ConfigDoc, field_args: &[String], dry_run: bool) -> Result<Wiring> {
    let sink: Arc<dyn GateSink> = Arc::new(StdoutSink::default());
    let provider = Arc::new(StaticBoardProvider::from_doc(doc)?);
    let tracker = Arc::new(RequirementTracker::new(sink.clone()));
    tracker.on_board_selection_changed(provider.as_ref())?;

    let mut dialog_cfg: DialogConfig = doc.section("dialog")?;
    let overrides = dialog::parse_field_assignments(field_args)?;
    if !overrides.is_empty() {
        dialog_cfg.mode = DialogMode::Preset;
        dialog_cfg.values.extend(overrides);
    }

    let mut tool: ToolConfig = doc.section("tool")?;
    tool.dry_run |= dry_run;
    let verbose = tool.verbose;

    let gate = UploadGate::new(
        provider.clone(),
        tracker.clone(),
        dialog::from_config(&dialog_cfg),
        Arc::new(ConsoleMessages),
        sink.clone(),
    );
    let core = Box::new(CommandCoreService::new(tool, sink.clone()));
    let uploader = Uploader::new(gate, core, provider.clone(), sink).with_verbose(verbose);
    Ok(Wiring {
        provider,
        tracker,
        uploader,
    })
}

fn outcome_to_result(outcome: UploadOutcome) -> Result<()> {
    match outcome {
        UploadOutcome::Uploaded => Ok(()),
        UploadOutcome::Blocked => Err(Error::msg("upload not started")),
        UploadOutcome::Failed(f) => Err(Error::msg(f.to_string())),
    }
}

fn cmd_verify(path: &Path, sketch: &Path, dry_run: bool) -> Result<()> {
    let doc = load(path)?;
    let mut w = wire(&doc, &[], dry_run)?;
    outcome_to_result(w.uploader.verify(sketch))
}

fn cmd_upload(
    path: &Path,
    sketch: &Path,
    configure: bool,
    field_args: &[String],
    dry_run: bool,
) -> Result<()> {
    let doc = load(path)?;
    let mut w = wire(&doc, field_args, dry_run)?;
    outcome_to_result(w.uploader.upload(sketch, configure))
}

fn cmd_session(path: &Path, sketch: &Path, field_args: &[String], dry_run: bool) -> Result<()> {
    let doc = load(path)?;
    let w = wire(&doc, field_args, dry_run)?;
    let provider: Arc<dyn BoardProvider> = w.provider.clone();
    let _listener = w.tracker.listen(provider);

    let mut session = Session::new(w.uploader, w.provider, w.tracker, sketch.to_path_buf());
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    session.run(stdin.lock(), &mut stdout)
}
