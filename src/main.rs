use anyhow::Result;
use clap::{Parser, Subcommand};

use owlwatch::config::Config;
use owlwatch::gate::{Clock, RunKey, Slot, StateStore, SystemClock};
use owlwatch::RunOptions;

#[derive(Parser)]
#[command(
    name = "owlwatch",
    about = "Scheduled security-posture digests with idempotent run gating",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one gated digest: render, post to webhooks, record completion
    Run {
        /// Run slot (am or pm); overrides OWLWATCH_RUN_SLOT
        #[arg(long)]
        slot: Option<String>,

        /// Render the artifact but skip posting and state writes
        #[arg(long)]
        dry_run: bool,

        /// Bypass the run gate and overwrite an existing artifact
        #[arg(long, short)]
        force: bool,
    },

    /// Render the Markdown artifact only (no gate, no posting)
    Render {
        /// Date to render (YYYY-MM-DD). Default: today in the configured zone
        #[arg(long, short)]
        date: Option<String>,

        /// Run slot (am or pm)
        #[arg(long)]
        slot: Option<String>,

        /// Overwrite an existing artifact
        #[arg(long, short)]
        force: bool,

        /// Write to this path instead of the output directory layout
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Inspect recorded run state
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Subcommand)]
enum StateAction {
    /// List all recorded runs
    List,

    /// Show the record for one run key (YYYY-MM-DD:AM)
    Show {
        /// Run key to look up
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::from_env()?;

    match cli.command {
        Commands::Run {
            slot,
            dry_run,
            force,
        } => {
            let slot = match slot {
                Some(s) => Some(s.parse::<Slot>()?),
                None => None,
            };
            let opts = RunOptions {
                slot,
                dry_run,
                force,
            };
            let outcome = owlwatch::run_digest(&cfg, &opts, &SystemClock).await?;

            if outcome.skipped && outcome.artifact.is_none() {
                println!("Already posted: {}", outcome.key);
            } else if let Some(artifact) = &outcome.artifact {
                if outcome.delivered > 0 {
                    println!(
                        "Posted {} to {} webhook(s). Artifact saved: {}",
                        outcome.key,
                        outcome.delivered,
                        artifact.display()
                    );
                } else {
                    println!("Rendered {} (not posted). Artifact: {}", outcome.key, artifact.display());
                }
                if !outcome.state_recorded && outcome.delivered > 0 {
                    eprintln!("warning: completion not recorded, a future run may post a duplicate");
                }
            }
        }
        Commands::Render {
            date,
            slot,
            force,
            output,
        } => {
            let slot = match slot {
                Some(s) => s.parse()?,
                None => cfg.slot,
            };
            let date = match date {
                Some(d) => chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                    .map_err(|_| anyhow::anyhow!("invalid date format, use YYYY-MM-DD"))?,
                None => SystemClock.now_utc().with_timezone(&cfg.tz).date_naive(),
            };
            let target = owlwatch::render_digest(&cfg, date, slot, force, output.map(Into::into))?;
            println!("Rendered {} {} to {}", date, slot, target.display());
        }
        Commands::State { action } => {
            let pool = owlwatch::storage::open_pool(&cfg.state_db)?;
            let store = owlwatch::gate::SqliteStore::new(pool);

            match action {
                StateAction::List => {
                    let records = store.list()?;
                    if records.is_empty() {
                        println!("No recorded runs.");
                    } else {
                        println!("{:<16} | {:<10} | Completed at", "Run key", "Status");
                        println!("{:-<16}-|-{:-<10}-|-{:-<25}", "", "", "");
                        for rec in records {
                            let completed = rec
                                .completed_at
                                .map(|t| t.to_rfc3339())
                                .unwrap_or_else(|| "-".to_string());
                            println!(
                                "{:<16} | {:<10} | {}",
                                rec.run_key,
                                rec.status.as_str(),
                                completed
                            );
                        }
                    }
                }
                StateAction::Show { key } => {
                    let key: RunKey = key.parse()?;
                    match store.load(&key)? {
                        Some(rec) => {
                            println!("Run key:      {}", rec.run_key);
                            println!("Status:       {}", rec.status.as_str());
                            println!(
                                "Completed at: {}",
                                rec.completed_at
                                    .map(|t| t.to_rfc3339())
                                    .unwrap_or_else(|| "-".to_string())
                            );
                        }
                        None => println!("No record for {} (run is pending).", key),
                    }
                }
            }
        }
    }

    Ok(())
}
