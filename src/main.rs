//! newpayload-gate CLI entry point

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::B256;
use clap::{Args, Parser, Subcommand, ValueEnum};
use eyre::WrapErr;
use newpayload_gate::{
    chainspec::AdmissionChainSpec,
    config::AdmissionConfig,
    engine::{
        header::compute_payload_header,
        senders::{SenderCache, SenderRecovery},
        version::{by_number, NewPayloadVersion},
        NewPayloadRequest, PayloadAdmission, PayloadParameter,
    },
    provider::{DiscardSync, EmptyChain, RejectingExecutor},
    version::version_string,
};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "newpayload-gate",
    version = version_string(),
    about = "Engine API newPayload admission tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the block hash a payload should claim.
    Hash(HashArgs),
    /// Run a payload through the admission gates against an empty local chain.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct HashArgs {
    /// Execution payload JSON file.
    #[arg(long)]
    payload: PathBuf,
    /// Parent beacon block root committed in Cancun and later headers.
    #[arg(long)]
    parent_beacon_block_root: Option<B256>,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Built-in network name or path to a genesis JSON file.
    #[arg(long, default_value = "mainnet")]
    chain: String,
    /// `newPayload` method version.
    #[arg(long, value_enum)]
    version: MethodVersion,
    /// Execution payload JSON file.
    #[arg(long)]
    payload: PathBuf,
    /// JSON array of expected blob versioned hashes.
    #[arg(long)]
    versioned_hashes: Option<PathBuf>,
    #[arg(long)]
    parent_beacon_block_root: Option<B256>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodVersion {
    V1,
    V2,
    V3,
    V4,
}

impl MethodVersion {
    fn variant(self) -> eyre::Result<&'static dyn NewPayloadVersion> {
        let number = match self {
            Self::V1 => 1,
            Self::V2 => 2,
            Self::V3 => 3,
            Self::V4 => 4,
        };
        by_number(number).ok_or_else(|| eyre::eyre!("unknown newPayload version {number}"))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:?}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> eyre::Result<i32> {
    match cli.command {
        Command::Hash(args) => hash(args),
        Command::Check(args) => check(args),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> eyre::Result<T> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("Failed to parse {}", path.display()))
}

fn hash(args: HashArgs) -> eyre::Result<i32> {
    let payload: PayloadParameter = read_json(&args.payload)?;
    let claimed = payload.block_hash;
    let request = NewPayloadRequest {
        payload,
        versioned_hashes: None,
        parent_beacon_block_root: args.parent_beacon_block_root,
    };
    let header = compute_payload_header(&request).wrap_err("Failed to reconstruct header")?;

    let output = json!({
        "blockHash": header.hash(),
        "claimedBlockHash": claimed,
        "matches": header.hash() == claimed,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(0)
}

fn check(args: CheckArgs) -> eyre::Result<i32> {
    let chain_spec = AdmissionChainSpec::parse(&args.chain)?;
    let variant = args.version.variant()?;
    let payload: PayloadParameter = read_json(&args.payload)?;
    let versioned_hashes: Option<Vec<B256>> =
        args.versioned_hashes.as_deref().map(read_json::<Vec<B256>>).transpose()?;

    let config = AdmissionConfig::from_env();
    let senders = SenderRecovery::inline(SenderCache::new(config.sender_cache_size));
    let mut admission = PayloadAdmission::new(
        chain_spec,
        EmptyChain,
        DiscardSync,
        RejectingExecutor::new("offline check does not execute blocks"),
        senders,
        &config,
    );

    info!(
        target: "newpayload_gate::cli",
        method = variant.method(),
        number = payload.block_number,
        hash = %payload.block_hash,
        "Checking payload"
    );
    let request = NewPayloadRequest {
        payload,
        versioned_hashes,
        parent_beacon_block_root: args.parent_beacon_block_root,
    };
    match admission.new_payload(variant, request) {
        Ok(status) => {
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(0)
        }
        Err(err) => {
            let output = json!({ "error": err.to_error_object() });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(2)
        }
    }
}
