//! # GASBENCH
//!
//! ```bash
//! # Snapshot a deployed collection both ways and diff them
//! GASBENCH_RPC_URL=http://127.0.0.1:8545 gasbench compare
//!
//! # Whitelist of the local signers plus 1000 synthetic members
//! gasbench whitelist --input signers.txt --generated 1000 -o whitelist.json
//!
//! # No node needed
//! RUST_LOG=debug gasbench simulate --transfers 500
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use clap::{Parser, Subcommand};
use gasbench::config::{HarnessConfig, DEFAULT_CONFIG_FILE};
use gasbench::error::{HarnessError, HarnessResult};
use gasbench::tasks::{self, DirectOutcome, SimulationParams};
use gasbench_chain::{Retrying, RpcClient};
use gasbench_snapshot::serialize::{render, write_file};
use gasbench_snapshot::{OwnershipSnapshot, Progress};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "gasbench", version, about = "Ownership snapshots and Merkle whitelists for gas benchmarks")]
struct Cli {
    /// Path to the TOML config.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve every owner with batched `ownerOf` calls.
    OwnersDirect {
        /// Write the artifact here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Concurrent calls per batch.
        #[arg(long)]
        batch_size: Option<usize>,
        /// Read owners at this block instead of the latest.
        #[arg(long)]
        at_block: Option<u64>,
    },
    /// Replay the Transfer history.
    OwnersReplay {
        /// Write the artifact here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// First block to scan.
        #[arg(long)]
        from_block: Option<u64>,
        /// Last block to scan.
        #[arg(long)]
        to_block: Option<u64>,
    },
    /// Run both builders at one block and fail on any disagreement.
    Compare,
    /// Build the Merkle root and every member's proof.
    Whitelist {
        /// One member address per line.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Synthetic members to append.
        #[arg(long)]
        generated: Option<usize>,
        /// Seed for the synthetic members.
        #[arg(long)]
        seed: Option<u64>,
        /// Write the JSON artifact here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Mint, transfer and burn on a simulated collection, then check both builders.
    Simulate {
        /// Distinct holders.
        #[arg(long, default_value_t = 6)]
        holders: usize,
        /// Tokens minted to each holder.
        #[arg(long, default_value_t = 40)]
        per_holder: u64,
        /// Random transfers.
        #[arg(long, default_value_t = 300)]
        transfers: usize,
        /// Random burns.
        #[arg(long, default_value_t = 0)]
        burns: usize,
        /// Number tokens from 0 instead of 1.
        #[arg(long)]
        zero_based: bool,
        /// Schedule seed.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> HarnessResult<()> {
    let config = HarnessConfig::load(&cli.config)?.with_env_overrides();

    match cli.command {
        Command::OwnersDirect {
            output,
            batch_size,
            at_block,
        } => {
            let client = connect(&config)?;
            let mut direct = config.direct_config();
            if let Some(batch_size) = batch_size {
                direct = direct.with_batch_size(batch_size);
            }
            if let Some(block) = at_block {
                direct = direct.with_at_block(block);
            }

            let (sender, receiver) = crossbeam_channel::bounded::<Progress>(64);
            let reporter = thread::spawn(move || {
                for progress in receiver {
                    eprint!("\rProcessed: {}/{}", progress.resolved, progress.total);
                }
                eprintln!();
            });
            let snapshot = tasks::owners_direct(&client, direct, Some(sender)).await;
            let _ = reporter.join();

            emit_snapshot(&snapshot?, output.as_deref())
        }
        Command::OwnersReplay {
            output,
            from_block,
            to_block,
        } => {
            let client = connect(&config)?;
            let mut replay = config.replay_config();
            if let Some(block) = from_block {
                replay = replay.with_from_block(block);
            }
            if let Some(block) = to_block {
                replay = replay.with_to_block(block);
            }

            let snapshot = tasks::owners_replay(&client, replay).await?;
            emit_snapshot(&snapshot, output.as_deref())
        }
        Command::Compare => {
            let client = connect(&config)?;
            let comparison = tasks::compare(&client, config.direct_config(), config.replay_config()).await?;
            for discrepancy in &comparison.discrepancies {
                println!("{discrepancy:?}");
            }
            if comparison.is_consistent() {
                println!(
                    "{} tokens at block {}, builders agree",
                    comparison.direct.len(),
                    comparison.block
                );
                Ok(())
            } else {
                Err(HarnessError::Mismatch(comparison.discrepancies.len()))
            }
        }
        Command::Whitelist {
            input,
            generated,
            seed,
            output,
        } => {
            let section = &config.whitelist;
            let input = input.or_else(|| section.input.clone());
            let members = tasks::load_whitelist(
                input.as_deref(),
                generated.unwrap_or(section.generated),
                seed.unwrap_or(section.seed),
            )?;
            let json = tasks::whitelist(&members)?.to_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    info!(path = %path.display(), "wrote whitelist artifact");
                }
                None => println!("{json}"),
            }
            Ok(())
        }
        Command::Simulate {
            holders,
            per_holder,
            transfers,
            burns,
            zero_based,
            seed,
        } => {
            let params = SimulationParams {
                first_token_id: u64::from(!zero_based),
                holders,
                per_holder,
                transfers,
                burns,
                seed,
                batch_size: config.direct_config().batch_size,
            };
            let report = tasks::simulate(&params).await?;
            print!("{}", render(&report.replay));
            for (owner, tokens) in tasks::holdings(&report.replay) {
                info!(%owner, tokens = ?tokens, "holdings");
            }
            info!(events = report.events, max_in_flight = report.max_in_flight, "simulation finished");

            match report.direct {
                DirectOutcome::Matched => Ok(()),
                DirectOutcome::RejectedBurned(token_id) => {
                    info!(token_id, "direct build stopped at a burned token; replay excludes it");
                    Ok(())
                }
                DirectOutcome::Diverged(discrepancies) => Err(HarnessError::Mismatch(discrepancies.len())),
            }
        }
    }
}

fn connect(config: &HarnessConfig) -> HarnessResult<Retrying<RpcClient>> {
    let rpc = config.rpc_config()?;
    info!(url = %rpc.rpc_url, contract = %rpc.contract_address, "connecting");
    Ok(Retrying::new(RpcClient::new(rpc)?, config.retry_policy()))
}

fn emit_snapshot(snapshot: &OwnershipSnapshot, output: Option<&Path>) -> HarnessResult<()> {
    match output {
        Some(path) => {
            write_file(path, snapshot)?;
            info!(path = %path.display(), tokens = snapshot.len(), "wrote snapshot");
        }
        None => print!("{}", render(snapshot)),
    }
    Ok(())
}
