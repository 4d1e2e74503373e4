use std::{path::PathBuf, process::ExitCode, str::FromStr};

use alloy_primitives::{Address, U256};
use allocation_guard_types::{ActionKind, AllocationIntent, Selector};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use intent_signer::{sign_intent, signed_envelope, signing_key_from_file, signing_key_from_hex};
use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Sign an allocation intent as the agent and print the result as JSON.
///
/// `minAmountOut` and `priceAtSign` are always zero from the CLI; integrations that need them
/// use the library directly.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Wallet user the funds belong to.
    #[arg(long)]
    user: Address,

    /// Target protocol contract.
    #[arg(long)]
    protocol: Address,

    /// Amount in the stable asset's smallest unit (decimal or 0x-hex).
    #[arg(long)]
    amount: U256,

    /// Absolute unix deadline.
    #[arg(long, conflicts_with = "ttl_secs")]
    deadline: Option<u64>,

    /// Deadline relative to now, used when --deadline is absent.
    #[arg(long, default_value_t = 3600)]
    ttl_secs: u64,

    /// Replay nonce, unique per user.
    #[arg(long)]
    nonce: U256,

    #[arg(long, env = "CHAIN_ID", default_value_t = 8453)]
    chain_id: u64,

    /// Agent private key (hex string, 0x...).
    #[arg(long, env = "AGENT_PRIVATE_KEY", conflicts_with = "private_key_path")]
    private_key: Option<String>,

    /// Path to a file containing the agent private key.
    #[arg(long, env = "AGENT_PRIVATE_KEY_PATH", conflicts_with = "private_key")]
    private_key_path: Option<PathBuf>,

    /// Action kind for the envelope: deposit, rebalance or withdraw. Must match the kind the
    /// guard has registered for the selector.
    #[arg(long, value_parser = parse_kind, default_value = "deposit")]
    kind: ActionKind,

    /// 4-byte protocol selector for the envelope (0x-hex).
    #[arg(long, value_parser = parse_selector, default_value = "0x617ba037")]
    selector: Selector,

    /// Also print the encoded submission envelope.
    #[arg(long)]
    envelope: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    digest_hash: String,
    signature: String,
    signer_address: String,
    params: AllocationIntent,
    #[serde(skip_serializing_if = "Option::is_none")]
    envelope: Option<String>,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{}", json!({ "error": format!("{err:#}") }));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String> {
    let key = match (&cli.private_key, &cli.private_key_path) {
        (Some(raw), _) => signing_key_from_hex(raw)?,
        (None, Some(path)) => signing_key_from_file(path)?,
        (None, None) => {
            return Err(anyhow!(
                "missing agent key: provide --private-key or --private-key-path (or set AGENT_PRIVATE_KEY)"
            ))
        }
    };

    let deadline = match cli.deadline {
        Some(deadline) => deadline,
        None => {
            let now = u64::try_from(OffsetDateTime::now_utc().unix_timestamp())
                .context("system clock is before the unix epoch")?;
            now.saturating_add(cli.ttl_secs)
        }
    };

    let intent = AllocationIntent {
        user: cli.user,
        protocol: cli.protocol,
        amount: cli.amount,
        min_amount_out: U256::ZERO,
        deadline,
        nonce: cli.nonce,
        price_at_sign: U256::ZERO,
        chain_id: cli.chain_id,
    };
    debug!(?intent, "signing intent");

    let (signed, envelope) = if cli.envelope {
        let (signed, bytes) = signed_envelope(intent.clone(), cli.kind, cli.selector, &key)
            .map_err(|err| anyhow!("signing failed: {err}"))?;
        (signed, Some(format!("0x{}", hex::encode(bytes))))
    } else {
        let signed = sign_intent(&intent, &key).map_err(|err| anyhow!("signing failed: {err}"))?;
        (signed, None)
    };
    info!(signer = %signed.signer, digest = %signed.digest, "intent signed");

    let output = Output {
        digest_hash: signed.digest.to_string(),
        signature: format!("0x{}", hex::encode(signed.signature)),
        signer_address: signed.signer.to_checksum(None),
        params: intent,
        envelope,
    };
    serde_json::to_string_pretty(&output).context("failed serialising output")
}

fn parse_selector(raw: &str) -> Result<Selector> {
    let bytes = hex::decode(raw.trim_start_matches("0x")).context("selector is not valid hex")?;
    Selector::try_from(bytes.as_slice()).map_err(|_| anyhow!("selector must be exactly 4 bytes"))
}

fn parse_kind(raw: &str) -> Result<ActionKind> {
    ActionKind::from_str(raw).map_err(|err| anyhow!(err))
}
