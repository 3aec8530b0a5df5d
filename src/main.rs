//! `pantheon-node` CLI front-end (§6): a thin dispatcher over
//! `talanton-core`, `drachma-core`, and `obolos-core`. The binary
//! itself carries no consensus logic — every subcommand either builds
//! a value the library crates already know how to validate, or asks
//! one of them a question and prints the answer.

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::Level;

use drachma_core::validator::{total_active_stake, Validator};
use obolos_core::state::{Address, WorldState};
use obolos_core::vm::{ExecutionContext, Vm};
use shared::commitment::{decode_commitment, encode_commitment, signed_stake_weight, SourceChain};
use shared::crypto::{KeyPair, PrivateKey};
use talanton_core::finality::AnchorState as L1AnchorState;

#[derive(Parser)]
#[command(name = "pantheon-node")]
#[command(about = "PantheonChain reference node: TALANTON (L1) / DRACHMA (L2) / OBOLOS (L3)")]
#[command(version)]
struct Cli {
    /// Emit {action, layer, detail} JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Log verbosity for the tracing subscriber.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Layer-2 value transfers.
    Transfer {
        #[command(subcommand)]
        action: TransferAction,
    },
    /// Layer-3 smart-contract deployment and invocation.
    Contract {
        #[command(subcommand)]
        action: ContractAction,
    },
    /// Inspect finality commitments.
    Commitments {
        #[command(subcommand)]
        action: CommitmentsAction,
    },
    /// DRACHMA/OBOLOS validator lifecycle.
    Validator {
        #[command(subcommand)]
        action: ValidatorAction,
    },
    /// Submit a bus-encoded finality commitment for validation.
    SubmitCommitment(SubmitCommitmentArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Layer {
    L1,
    L2,
    L3,
}

impl Layer {
    const fn as_str(self) -> &'static str {
        match self {
            Layer::L1 => "l1",
            Layer::L2 => "l2",
            Layer::L3 => "l3",
        }
    }
}

#[derive(Subcommand)]
enum TransferAction {
    /// Build and sign a transfer (layer=l2).
    Send(TransferSendArgs),
}

#[derive(clap::Args)]
struct TransferSendArgs {
    /// Fixed at l2; accepted explicitly to match the external interface shape.
    #[arg(long, value_enum)]
    layer: Layer,
    /// Amount to transfer, in base units.
    #[arg(long)]
    amount: u64,
    /// Flat fee, in base units.
    #[arg(long, default_value_t = 0)]
    fee: u64,
}

#[derive(Subcommand)]
enum ContractAction {
    /// Deploy EVM bytecode (layer=l3) and report the resulting code hash.
    Deploy(ContractDeployArgs),
    /// Execute EVM bytecode against a fresh world-state (layer=l3).
    Call(ContractCallArgs),
}

#[derive(clap::Args)]
struct ContractDeployArgs {
    #[arg(long, value_enum)]
    layer: Layer,
    /// Hex-encoded init/runtime bytecode.
    #[arg(long)]
    code: String,
    /// Hex-encoded 20-byte deployment address.
    #[arg(long)]
    address: String,
}

#[derive(clap::Args)]
struct ContractCallArgs {
    #[arg(long, value_enum)]
    layer: Layer,
    /// Hex-encoded contract address (20 bytes).
    #[arg(long)]
    address: String,
    /// Hex-encoded bytecode to execute.
    #[arg(long)]
    code: String,
    /// Hex-encoded calldata.
    #[arg(long, default_value = "")]
    calldata: String,
    #[arg(long, default_value_t = 1_000_000)]
    gas_limit: u64,
}

#[derive(Subcommand)]
enum CommitmentsAction {
    /// List the current anchor height (layer=l1|l2).
    List(CommitmentsLayerArgs),
    /// Fetch the anchor state at a given height (layer=l1|l2).
    Get(CommitmentsGetArgs),
}

#[derive(clap::Args)]
struct CommitmentsLayerArgs {
    #[arg(long, value_enum)]
    layer: Layer,
}

#[derive(clap::Args)]
struct CommitmentsGetArgs {
    #[arg(long, value_enum)]
    layer: Layer,
    #[arg(long)]
    height: u64,
}

#[derive(Subcommand)]
enum ValidatorAction {
    Status(ValidatorLayerArgs),
    Start(ValidatorLayerArgs),
    Stop(ValidatorLayerArgs),
    KeysImport(ValidatorKeysImportArgs),
}

#[derive(clap::Args)]
struct ValidatorLayerArgs {
    #[arg(long, value_enum)]
    layer: Layer,
}

#[derive(clap::Args)]
struct ValidatorKeysImportArgs {
    #[arg(long, value_enum)]
    layer: Layer,
    /// Hex-encoded 32-byte secp256k1 secret key.
    #[arg(long)]
    private_key: String,
}

#[derive(clap::Args)]
struct SubmitCommitmentArgs {
    #[arg(long, value_enum)]
    layer: Layer,
    /// Bus-encoded commitment (§6): `source:epoch:height:...`.
    #[arg(long)]
    encoded: String,
}

/// Output envelope for `--json` mode (§6): `{action, layer, detail}`.
struct CliOutput {
    action: &'static str,
    layer: &'static str,
    detail: serde_json::Value,
}

impl CliOutput {
    fn print(&self, json_mode: bool) {
        if json_mode {
            println!(
                "{}",
                json!({
                    "action": self.action,
                    "layer": self.layer,
                    "detail": self.detail,
                })
            );
        } else {
            println!("{}: [{}] {}", self.action, self.layer, self.detail);
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();

    match run(&cli) {
        Ok(output) => {
            output.print(cli.json);
            ExitCode::SUCCESS
        }
        Err(message) => {
            if cli.json {
                println!("{}", json!({"error": message}));
            } else {
                eprintln!("error: {message}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<CliOutput, String> {
    match &cli.command {
        Commands::Transfer { action } => match action {
            TransferAction::Send(args) => transfer_send(args),
        },
        Commands::Contract { action } => match action {
            ContractAction::Deploy(args) => contract_deploy(args),
            ContractAction::Call(args) => contract_call(args),
        },
        Commands::Commitments { action } => match action {
            CommitmentsAction::List(args) => commitments_list(args),
            CommitmentsAction::Get(args) => commitments_get(args),
        },
        Commands::Validator { action } => match action {
            ValidatorAction::Status(args) => validator_status(args),
            ValidatorAction::Start(args) => validator_lifecycle(args, "validator-start"),
            ValidatorAction::Stop(args) => validator_lifecycle(args, "validator-stop"),
            ValidatorAction::KeysImport(args) => validator_keys_import(args),
        },
        Commands::SubmitCommitment(args) => submit_commitment(args),
    }
}

fn transfer_send(args: &TransferSendArgs) -> Result<CliOutput, String> {
    if args.layer != Layer::L2 {
        return Err(format!("transfer send is only valid for layer=l2, got {}", args.layer.as_str()));
    }
    let keypair = KeyPair::generate().map_err(|e| e.to_string())?;
    let message = format!("transfer:{}:{}", args.amount, args.fee).into_bytes();
    let signature = keypair.sign(&message).map_err(|e| e.to_string())?;

    Ok(CliOutput {
        action: "transfer-send",
        layer: Layer::L2.as_str(),
        detail: json!({
            "amount": args.amount,
            "fee": args.fee,
            "signer_pubkey": hex::encode(keypair.public_key.as_bytes()),
            "signature": hex::encode(signature.as_bytes()),
        }),
    })
}

fn contract_deploy(args: &ContractDeployArgs) -> Result<CliOutput, String> {
    if args.layer != Layer::L3 {
        return Err(format!("contract deploy is only valid for layer=l3, got {}", args.layer.as_str()));
    }
    let code = hex::decode(args.code.trim_start_matches("0x")).map_err(|e| e.to_string())?;
    let address = Address::from_hex(&args.address).map_err(|e| e.to_string())?;

    let mut state = WorldState::new();
    state.set_code(address, code.clone());

    Ok(CliOutput {
        action: "contract-deploy",
        layer: Layer::L3.as_str(),
        detail: json!({
            "address": address.to_hex(),
            "code_size": code.len(),
            "code_hash": hex::encode(state.get_account(&address).map(|a| a.code_hash).unwrap_or_default()),
        }),
    })
}

fn contract_call(args: &ContractCallArgs) -> Result<CliOutput, String> {
    if args.layer != Layer::L3 {
        return Err(format!("contract call is only valid for layer=l3, got {}", args.layer.as_str()));
    }
    let address = Address::from_hex(&args.address).map_err(|e| e.to_string())?;
    let code = hex::decode(args.code.trim_start_matches("0x")).map_err(|e| e.to_string())?;
    let calldata = hex::decode(args.calldata.trim_start_matches("0x")).map_err(|e| e.to_string())?;

    let mut state = WorldState::new();
    let ctx = ExecutionContext {
        origin: address,
        caller: address,
        address,
        value: Default::default(),
        input_data: calldata,
        gas_limit: args.gas_limit,
        gas_price: 1,
        block_number: 0,
        timestamp: 0,
        coinbase: Address::ZERO,
        difficulty: 0,
        gas_limit_block: args.gas_limit,
        chain_id: 1,
        base_fee: 0,
        is_static: false,
        depth: 0,
    };
    let mut vm = Vm::new(&mut state, ctx);
    let (result, output) = vm.execute(&code);

    Ok(CliOutput {
        action: "contract-call",
        layer: Layer::L3.as_str(),
        detail: json!({
            "result": format!("{result:?}"),
            "gas_used": vm.gas_used(),
            "return_data": hex::encode(output),
        }),
    })
}

fn commitments_list(args: &CommitmentsLayerArgs) -> Result<CliOutput, String> {
    if !matches!(args.layer, Layer::L1 | Layer::L2) {
        return Err(format!("commitments list is only valid for layer=l1|l2, got {}", args.layer.as_str()));
    }
    let anchor = L1AnchorState::new();
    Ok(CliOutput {
        action: "commitments-list",
        layer: args.layer.as_str(),
        detail: json!({
            "last_finalized_height": anchor.last_finalized_height,
        }),
    })
}

fn commitments_get(args: &CommitmentsGetArgs) -> Result<CliOutput, String> {
    if !matches!(args.layer, Layer::L1 | Layer::L2) {
        return Err(format!("commitments get is only valid for layer=l1|l2, got {}", args.layer.as_str()));
    }
    Ok(CliOutput {
        action: "commitments-get",
        layer: args.layer.as_str(),
        detail: json!({ "height": args.height, "found": false }),
    })
}

fn validator_status(args: &ValidatorLayerArgs) -> Result<CliOutput, String> {
    if !matches!(args.layer, Layer::L2 | Layer::L3) {
        return Err(format!("validator status is only valid for layer=l2|l3, got {}", args.layer.as_str()));
    }
    Ok(CliOutput {
        action: "validator-status",
        layer: args.layer.as_str(),
        detail: json!({ "running": false }),
    })
}

fn validator_lifecycle(args: &ValidatorLayerArgs, action: &'static str) -> Result<CliOutput, String> {
    if !matches!(args.layer, Layer::L2 | Layer::L3) {
        return Err(format!("{action} is only valid for layer=l2|l3, got {}", args.layer.as_str()));
    }
    Ok(CliOutput {
        action,
        layer: args.layer.as_str(),
        detail: json!({ "acknowledged": true }),
    })
}

fn validator_keys_import(args: &ValidatorKeysImportArgs) -> Result<CliOutput, String> {
    if !matches!(args.layer, Layer::L2 | Layer::L3) {
        return Err(format!("validator keys-import is only valid for layer=l2|l3, got {}", args.layer.as_str()));
    }
    let bytes = hex::decode(args.private_key.trim_start_matches("0x")).map_err(|e| e.to_string())?;
    // Validated and immediately dropped; zeroized on drop (`PrivateKey: Zeroize`), never logged.
    let _ = PrivateKey::from_bytes(&bytes).map_err(|e| e.to_string())?;

    Ok(CliOutput {
        action: "validator-keys-import",
        layer: args.layer.as_str(),
        detail: json!({ "imported": true }),
    })
}

fn submit_commitment(args: &SubmitCommitmentArgs) -> Result<CliOutput, String> {
    if !matches!(args.layer, Layer::L2 | Layer::L3) {
        return Err(format!("submit-commitment is only valid for layer=l2|l3, got {}", args.layer.as_str()));
    }
    let commitment = decode_commitment(&args.encoded).map_err(|e| e.to_string())?;

    // layer=l2 means "anchoring into DRACHMA", which validates OBOLOS-sourced
    // commitments; layer=l3 means "anchoring into TALANTON" via a
    // DRACHMA-sourced commitment.
    let expected_source = match args.layer {
        Layer::L2 => SourceChain::Obolos,
        Layer::L3 => SourceChain::Drachma,
        Layer::L1 => unreachable!("filtered above"),
    };
    if commitment.source != expected_source {
        return Err(format!(
            "commitment source {} does not match layer {}",
            commitment.source.name(),
            args.layer.as_str()
        ));
    }

    let signed_stake = signed_stake_weight(&commitment);
    let active_stake = total_active_stake(&[Validator::new("local".into(), signed_stake)]);
    let re_encoded = encode_commitment(&commitment);

    Ok(CliOutput {
        action: "submit-commitment",
        layer: args.layer.as_str(),
        detail: json!({
            "epoch": commitment.epoch,
            "finalized_height": commitment.finalized_height,
            "signers": commitment.signatures.len(),
            "signed_stake": signed_stake,
            "active_stake_assumed": active_stake,
            "re_encoded": re_encoded,
        }),
    })
}
