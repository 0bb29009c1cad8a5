use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;

use comment_sieve::config::Config;
use comment_sieve::moderator::Moderator;
use comment_sieve::store::{self, DynStore, ModerationStore, seed};
use comment_sieve::{Comment, RequestContext};

/// Chainable spam validation for comments
#[derive(Debug, Parser)]
#[command(name = "comment-sieve")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        env = "COMMENT_SIEVE_CONFIG",
        default_value = "/etc/comment-sieve/config.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Moderate a JSON comment read from FILE or stdin
    Check {
        file: Option<PathBuf>,
        /// Do not log the disposition for history scoring
        #[arg(long)]
        no_record: bool,
    },
    /// List the configured validator chain
    Validators,
    /// Import blacklists from a TOML seed file
    Import { file: PathBuf },
    /// Manage blacklists
    #[command(subcommand)]
    Blacklist(BlacklistCommand),
    /// Manage blacklist phrases
    #[command(subcommand)]
    Phrase(PhraseCommand),
    /// Ban addresses or CIDR ranges
    Ban {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Lift a ban
    Unban { address: String },
    /// List banned addresses
    Banned,
}

#[derive(Debug, Subcommand)]
enum BlacklistCommand {
    Add {
        name: String,
        #[arg(long, default_value_t = 1.0)]
        weight: f64,
    },
    Remove {
        name: String,
    },
    Weight {
        name: String,
        weight: f64,
    },
    List,
}

#[derive(Debug, Subcommand)]
enum PhraseCommand {
    Add { blacklist: String, phrase: String },
    Remove { blacklist: String, phrase: String },
}

#[derive(Deserialize)]
struct CheckInput {
    comment: Comment,
    #[serde(default)]
    request: RequestContext,
}

fn setup_logging(verbosity: u8, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_input(file: Option<&PathBuf>) -> anyhow::Result<String> {
    let mut text = String::new();
    match file {
        Some(path) => {
            text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
        }
        None => {
            std::io::stdin().read_to_string(&mut text)?;
        }
    }
    Ok(text)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.log_json);

    let cfg_path = cli.config.to_string_lossy().into_owned();
    let cfg = Config::from_file(&cfg_path).with_context(|| format!("loading {cfg_path}"))?;
    let store: DynStore = store::open(&cfg.db_path)
        .await
        .with_context(|| format!("opening store {}", cfg.db_path))?;

    match cli.command {
        Commands::Check { file, no_record } => {
            let input: CheckInput = serde_json::from_str(&read_input(file.as_ref())?)
                .context("parsing comment JSON")?;
            let moderator = Moderator::from_config(&cfg, store).await?;
            let moderator = if no_record {
                moderator.with_history(false)
            } else {
                moderator
            };
            let decision = moderator.moderate(&input.comment, &input.request).await;
            let output = serde_json::json!({
                "verdict": decision.verdict,
                "score": decision.score,
                "is_public": decision.is_public(),
                "scores": decision.scores,
                "failed": decision.failed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Validators => {
            let moderator = Moderator::from_config(&cfg, store).await?;
            for name in moderator.chain().validator_names() {
                println!("{name}");
            }
        }
        Commands::Import { file } => {
            let path = file.to_string_lossy();
            let seed = seed::SeedFile::from_file(&path)?;
            let count = seed::import(store.as_ref(), &seed).await?;
            println!(
                "Imported {} blacklist(s), {count} phrase(s).",
                seed.blacklist.len()
            );
        }
        Commands::Blacklist(cmd) => match cmd {
            BlacklistCommand::Add { name, weight } => {
                store.add_blacklist(&name, weight).await?;
                tracing::info!(blacklist = %name, "Added blacklist");
            }
            BlacklistCommand::Remove { name } => {
                store.remove_blacklist(&name).await?;
                tracing::info!(blacklist = %name, "Removed blacklist");
            }
            BlacklistCommand::Weight { name, weight } => {
                store.set_blacklist_weight(&name, weight).await?;
            }
            BlacklistCommand::List => {
                for list in store.list_blacklists().await? {
                    println!("{} (weight {}): {}", list.name, list.weight, list.phrases.join(", "));
                }
            }
        },
        Commands::Phrase(cmd) => match cmd {
            PhraseCommand::Add { blacklist, phrase } => {
                store.add_phrase(&blacklist, &phrase).await?;
            }
            PhraseCommand::Remove { blacklist, phrase } => {
                store.remove_phrase(&blacklist, &phrase).await?;
            }
        },
        Commands::Ban { addresses } => {
            let report = store::ban_addresses(store.as_ref(), &addresses).await?;
            println!("{report}");
        }
        Commands::Unban { address } => {
            store.unban_ip(&address).await?;
            tracing::info!(%address, "Lifted ban");
        }
        Commands::Banned => {
            for address in store.list_banned_ips().await? {
                println!("{address}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ban_requires_address() {
        assert!(Cli::try_parse_from(["comment-sieve", "ban"]).is_err());
        let cli = Cli::try_parse_from(["comment-sieve", "ban", "10.0.0.1", "10.0.0.0/8"]).unwrap();
        assert!(matches!(cli.command, Commands::Ban { addresses } if addresses.len() == 2));
    }
}
