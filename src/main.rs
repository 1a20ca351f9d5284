mod backup;
mod cli;
mod codes;
mod config;
mod confirm;
mod form;
mod projector;
mod store;
mod sync;
mod transcript;
mod user;

use anyhow::Result;
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "staffdesk", about = "Manage staff accounts on a user store")]
pub struct Args {
    #[arg(
        short = 'c',
        long = "command",
        value_name = "CMD",
        action = clap::ArgAction::Append,
        help = "Run a console command and exit (repeatable), e.g. -c '/list ana'"
    )]
    pub commands: Vec<String>,

    #[arg(long, env = "STAFFDESK_API_URL", help = "Base URL of the user store")]
    pub base_url: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Auto-confirm deletes in -c mode")]
    pub yes: bool,

    #[arg(long, help = "JSON array of time records to include in backups")]
    pub records: Option<PathBuf>,

    #[arg(long, help = "Session transcripts directory")]
    pub transcripts_dir: Option<PathBuf>,

    #[arg(long, help = "Verbose output (print store errors)")]
    pub verbose: bool,

    #[arg(long, help = "Debug output (print settings)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    // CLI/env base URL wins over config files
    if let Some(base_url) = &args.base_url {
        cfg.api.base_url = Some(base_url.clone());
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!(
            "Invalid configuration ({} errors)",
            errors.len()
        ));
    }

    let base_url = cfg.base_url().unwrap_or_default().to_string();

    if args.debug {
        eprintln!("[DEBUG] Base URL: {}", base_url);
        eprintln!("[DEBUG] Timeout: {} ms", cfg.api.timeout_ms());
        eprintln!(
            "[DEBUG] Form defaults: {} / {}",
            cfg.defaults.currency(),
            cfg.defaults.country()
        );
        eprintln!("[DEBUG] Backup dir: {:?}", cfg.backup.dir);
    }

    let root = std::env::current_dir()?;
    let transcripts_dir = args
        .transcripts_dir
        .clone()
        .unwrap_or_else(|| root.join(".staffdesk").join("sessions"));
    std::fs::create_dir_all(&transcripts_dir)?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let transcript_path = transcripts_dir.join(format!("{}.jsonl", session_id));
    let transcript = transcript::Transcript::new(&transcript_path, &session_id, &base_url)?;

    let timeout = Duration::from_millis(cfg.api.timeout_ms());
    let store = store::HttpUserStore::new(&base_url, timeout);
    let one_shot = !args.commands.is_empty();
    let confirmer = confirm::Confirmer::new(one_shot, args.yes);

    let ctx = cli::Context {
        args,
        config: cfg,
        session_id,
        transcript: RefCell::new(transcript),
        sync: RefCell::new(sync::SyncCoordinator::new(Box::new(store))),
        form: RefCell::new(form::FormState::new()),
        confirmer,
    };

    cli::load_users(&ctx);

    if one_shot {
        cli::run_once(&ctx, &ctx.args.commands)
    } else {
        cli::run_repl(ctx)
    }
}
