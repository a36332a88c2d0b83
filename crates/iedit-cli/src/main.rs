mod config;
mod model;
mod report;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use config::{Config, PolicyKind};
use iedit_core::authority::ChangeAuthority;
use iedit_core::{segment, AutoApply, Editor, Interactive, NumericShield};
use model::CommandModel;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "iedit")]
#[command(about = "Improve LaTeX prose with a language model, leaving numbers and math alone", long_about = None)]
struct Cli {
    /// Config file (default: ~/.iedit.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output; repeat for more detail
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Propose and apply edits to .tex files or directories of them
    Edit {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        segmentation: SegmentArgs,

        /// Program that reads a prompt on stdin and answers on stdout
        ///
        /// The value is split on whitespace and quotes are not interpreted.
        /// For arguments that contain spaces, list the words with
        /// command = [...] in the [model] table of the config file instead.
        #[arg(long, value_name = "COMMAND")]
        model_cmd: Option<String>,

        /// Seconds to wait for each model answer
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Apply every proposal without asking
        #[arg(short, long)]
        yes: bool,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },
    /// Print the units a file is split into, as JSON
    Segment {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[command(flatten)]
        segmentation: SegmentArgs,
    },
    /// Print the shielded text of a file and its placeholder map, as JSON
    Shield {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Copy a .bak backup back over the file it was made from
    Restore {
        #[arg(value_name = "BACKUP")]
        backup: PathBuf,
    },
}

#[derive(Args)]
struct SegmentArgs {
    /// How to split documents into units
    #[arg(long, value_enum)]
    policy: Option<PolicyKind>,

    /// Editable lines per unit (windowed policy)
    #[arg(long)]
    window: Option<usize>,

    /// Context lines on each side of a unit (windowed policy)
    #[arg(long)]
    context: Option<usize>,
}

impl SegmentArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(policy) = self.policy {
            config.segmentation.policy = policy;
        }
        if let Some(window) = self.window {
            config.segmentation.window = window;
        }
        if let Some(context) = self.context {
            config.segmentation.context = context;
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Edit {
            paths,
            segmentation,
            model_cmd,
            timeout,
            yes,
            recursive,
        } => {
            segmentation.apply(&mut config);
            if let Some(command) = model_cmd {
                config.model.command = command.split_whitespace().map(String::from).collect();
            }
            if let Some(secs) = timeout {
                config.model.timeout_secs = secs;
            }
            config.auto_apply |= yes;
            config.recursive |= recursive;
            config.validate_for_edit()?;

            let model = CommandModel::new(&config.model.command, config.model.timeout())
                .context("model command is empty")?;
            let authority: Box<dyn ChangeAuthority> = if config.auto_apply {
                Box::new(AutoApply)
            } else {
                Box::new(Interactive::stdio())
            };

            let mut editor = Editor::new(config.policy(), Box::new(model), authority);
            let batch = editor.process_paths(&paths, config.recursive);
            report::print_batch(&batch);

            if !batch.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Segment { path, segmentation } => {
            segmentation.apply(&mut config);
            config.validate()?;
            let text = read_source(&path)?;
            let units = segment(&text, config.policy());
            println!("{}", serde_json::to_string_pretty(&units)?);
        }
        Commands::Shield { path } => {
            let text = read_source(&path)?;
            let mut shield = NumericShield::new();
            let shielded = shield.shield(&text);
            let output = serde_json::json!({
                "text": shielded,
                "placeholders": shield.map(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Restore { backup } => {
            let target = iedit_core::restore_backup(&backup)?;
            println!("Restored {}", target.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
