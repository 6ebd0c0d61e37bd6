use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;

use gerrit_owners::cli::{ChangeTarget, OutputMode, TerminalPresenter, session_options};
use gerrit_owners::utils::StdEnvProvider;
use gerrit_owners::{
    ApplyReport, ApprovalVerdict, Configuration, FindOwnersSession, SubmitOutcome,
    configuration_status, determine_config_dir,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory path
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Args)]
struct ChangeArgs {
    /// Change URL (https://host/c/project/+/123) or change id when --server is given
    change: String,

    /// Gerrit server, used when CHANGE is a change id (defaults to the configured server)
    #[arg(short, long)]
    server: Option<String>,

    /// Ask the server for debug messages and print them
    #[arg(long)]
    debug: bool,

    /// Compute owners for this patchset instead of the current one
    #[arg(short, long)]
    patchset: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the owners report of a change
    Show {
        #[command(flatten)]
        change: ChangeArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the owners report and pick reviewers interactively
    Review {
        #[command(flatten)]
        change: ChangeArgs,
    },
    /// Add or remove reviewers without prompting
    Apply {
        #[command(flatten)]
        change: ChangeArgs,

        /// Email to add as a reviewer (repeatable)
        #[arg(short, long)]
        add: Vec<String>,

        /// Email of a reviewer to remove (repeatable)
        #[arg(short, long)]
        remove: Vec<String>,
    },
    /// Check whether the change has owner approval. Exits non-zero when it is missing
    Check {
        #[command(flatten)]
        change: ChangeArgs,
    },
    /// Submit the change, or review owners first when the change requires it
    Submit {
        #[command(flatten)]
        change: ChangeArgs,
    },
    /// Configuration management commands
    Configuration {
        #[command(subcommand)]
        configuration_command: ConfigurationCommands,
    },
}

#[derive(Subcommand)]
enum ConfigurationCommands {
    /// Show the configuration in use
    Status,
}

fn print_apply_summary(applied: &ApplyReport) {
    for email in &applied.added {
        println!("➕ Added {}", email);
    }
    for email in &applied.removed {
        println!("➖ Removed {}", email);
    }
    for (email, error) in &applied.add_failures {
        println!("❌ Could not add {}: {}", email, error);
    }
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli.verbose.log_level_filter();
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Off)
        .filter(Some("gerrit_owners"), log_level)
        .init();

    let env = StdEnvProvider;
    let config_dir = determine_config_dir(cli.config_dir, &env)?;
    let configuration = Configuration::from_dir(&config_dir)?;

    let connect = |args: &ChangeArgs| -> Result<_> {
        let target = ChangeTarget::resolve(&args.change, args.server.as_deref(), &configuration)?;
        let gerrit = target.connect(&configuration, &env)?;
        let options = session_options(&configuration, args.debug, args.patchset);
        Ok((gerrit, options))
    };

    match cli.command {
        Commands::Show { change, json } => {
            let (gerrit, options) = connect(&change)?;
            let mode = if json { OutputMode::Json } else { OutputMode::Text };
            let mut presenter = TerminalPresenter::new(mode, false);
            FindOwnersSession::new(&gerrit, &mut presenter, options, gerrit.change_url())
                .show()
                .await?;
        }
        Commands::Review { change } => {
            let (gerrit, options) = connect(&change)?;
            let mut presenter = TerminalPresenter::new(OutputMode::Text, true);
            let applied =
                FindOwnersSession::new(&gerrit, &mut presenter, options, gerrit.change_url())
                    .run()
                    .await?;
            applied.iter().for_each(print_apply_summary);
        }
        Commands::Apply {
            change,
            add,
            remove,
        } => {
            if add.is_empty() && remove.is_empty() {
                bail!("Nothing to apply. Pass --add and/or --remove");
            }
            let (gerrit, options) = connect(&change)?;
            let mut presenter = TerminalPresenter::new(OutputMode::Text, false);
            let applied =
                FindOwnersSession::new(&gerrit, &mut presenter, options, gerrit.change_url())
                    .apply_emails(&add, &remove)
                    .await?;
            print_apply_summary(&applied);
            if applied.has_failures() {
                bail!("Some reviewer changes failed");
            }
        }
        Commands::Check { change } => {
            let (gerrit, options) = connect(&change)?;
            let mut presenter = TerminalPresenter::new(OutputMode::Text, false);
            let verdict =
                FindOwnersSession::new(&gerrit, &mut presenter, options, gerrit.change_url())
                    .check()
                    .await?;
            match verdict {
                ApprovalVerdict::Missing => {
                    bail!("{} for {}", verdict.description(), gerrit.change_url())
                }
                _ => println!("✅ {}", verdict.description()),
            }
        }
        Commands::Submit { change } => {
            let (gerrit, options) = connect(&change)?;
            let mut presenter = TerminalPresenter::new(OutputMode::Text, true);
            let outcome =
                FindOwnersSession::new(&gerrit, &mut presenter, options, gerrit.change_url())
                    .submit_with_gate()
                    .await?;
            match outcome {
                SubmitOutcome::Submitted(submitted) => {
                    println!("✅ Change {} is {:?}", submitted.number, submitted.status)
                }
                SubmitOutcome::Gated(applied) => {
                    applied.iter().for_each(print_apply_summary);
                    println!("ℹ️  Change not submitted. Submit again once owners approved it.");
                }
            }
        }
        Commands::Configuration {
            configuration_command,
        } => match configuration_command {
            ConfigurationCommands::Status => {
                println!("{}", configuration_status(&config_dir, &configuration))
            }
        },
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Build with --features cli to use the CLI.");
}
