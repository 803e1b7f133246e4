// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Shard Devnet Node
//!
//! Entry point for the `shard-node` binary. Parses CLI arguments,
//! initializes logging, loads the devnet from the data directory, executes
//! one command, and persists the result.
//!
//! A typical session:
//!
//! ```text
//! shard-node init
//! shard-node deploy-registry --from 0
//! shard-node mint --registry <REG> --id 0
//! shard-node deploy-vault --from 0
//! shard-node approve-all --registry <REG> --operator <VAULT>
//! shard-node fractionalize --vault <VAULT> --registry <REG> --id 0 --shares 1000000
//! shard-node transfer-shares --vault <VAULT> --to 1 --shares 100000
//! shard-node list --vault <VAULT> --price 100
//! shard-node buy --from 2 --vault <VAULT>
//! shard-node withdraw --from 1 --vault <VAULT> --shares 100000
//! ```

mod cli;
mod devnet;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::Path;

use shard_contracts::vault::{Vault, VaultPhase};
use shard_protocol::config::{DevnetConfig, NATIVE_DECIMALS, NATIVE_SYMBOL, SHARE_DECIMALS};
use shard_protocol::units::{format_units, parse_units};
use shard_protocol::{Address, AssetId};

use cli::{Commands, ShardNodeCli};
use devnet::Devnet;
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = ShardNodeCli::parse();
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&cli.log_format),
    );

    let data_dir = cli.data_dir.as_path();
    match cli.command {
        Commands::Init(args) => init_devnet(data_dir, args),
        Commands::Accounts => list_accounts(data_dir),
        Commands::DeployRegistry(args) => deploy_registry(data_dir, args),
        Commands::Mint(args) => mint(data_dir, args),
        Commands::ApproveAll(args) => approve_all(data_dir, args),
        Commands::DeployVault(args) => deploy_vault(data_dir, args),
        Commands::Fractionalize(args) => fractionalize(data_dir, args),
        Commands::List(args) => list_for_sale(data_dir, args),
        Commands::Buy(args) => buy(data_dir, args),
        Commands::Withdraw(args) => withdraw(data_dir, args),
        Commands::TransferShares(args) => transfer_shares(data_dir, args),
        Commands::OwnerOf(args) => owner_of(data_dir, args),
        Commands::Status(args) => vault_status(data_dir, args),
        Commands::Balance(args) => balance(data_dir, args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn native(amount: &str) -> Result<u128> {
    parse_units(amount, NATIVE_DECIMALS).with_context(|| format!("invalid amount: {}", amount))
}

fn shares(amount: &str) -> Result<u128> {
    parse_units(amount, SHARE_DECIMALS).with_context(|| format!("invalid share amount: {}", amount))
}

fn address(input: &str) -> Result<Address> {
    input
        .trim()
        .parse()
        .with_context(|| format!("invalid address: {}", input))
}

fn fmt_native(amount: u128) -> String {
    format!("{} {}", format_units(amount, NATIVE_DECIMALS), NATIVE_SYMBOL)
}

/// Runs `call` against the devnet in `data_dir` and persists on success.
fn with_devnet<T, F>(data_dir: &Path, call: F) -> Result<T>
where
    F: FnOnce(&mut Devnet) -> Result<T>,
{
    let mut devnet = Devnet::open(data_dir)?;
    let value = call(&mut devnet)?;
    devnet.commit()?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Creates a fresh devnet and prints its accounts.
fn init_devnet(data_dir: &Path, args: cli::InitArgs) -> Result<()> {
    let config = DevnetConfig {
        account_count: args.accounts,
        initial_balance: native(&args.balance)?,
    };
    let devnet = Devnet::init(data_dir, config, args.force)?;

    println!("Devnet initialized.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Accounts       : {}", devnet.accounts().len());
    println!("  Balance each   : {}", fmt_native(devnet.config().initial_balance));
    print_accounts(&devnet);
    Ok(())
}

fn list_accounts(data_dir: &Path) -> Result<()> {
    let devnet = Devnet::open(data_dir)?;
    print_accounts(&devnet);
    Ok(())
}

fn print_accounts(devnet: &Devnet) {
    for (i, account) in devnet.accounts().iter().enumerate() {
        println!(
            "  [{:>2}] {}  {}",
            i,
            account,
            fmt_native(devnet.chain.native_balance(account))
        );
    }
}

fn deploy_registry(data_dir: &Path, args: cli::DeployRegistryArgs) -> Result<()> {
    let registry = with_devnet(data_dir, |d| {
        let from = d.resolve(&args.from)?;
        Ok(d.chain.deploy_registry(from, &args.name, &args.symbol)?)
    })?;
    println!("{}", registry);
    Ok(())
}

fn mint(data_dir: &Path, args: cli::MintArgs) -> Result<()> {
    with_devnet(data_dir, |d| {
        let from = d.resolve(&args.from)?;
        let to = match &args.to {
            Some(to) => d.resolve(to)?,
            None => from,
        };
        d.chain
            .mint_asset(from, address(&args.registry)?, to, args.id)?;
        println!("minted asset {} to {}", args.id, to);
        Ok(())
    })
}

fn approve_all(data_dir: &Path, args: cli::ApproveAllArgs) -> Result<()> {
    with_devnet(data_dir, |d| {
        let from = d.resolve(&args.from)?;
        let operator = d.resolve(&args.operator)?;
        d.chain
            .set_approval_for_all(from, address(&args.registry)?, operator, !args.revoke)?;
        println!(
            "{} {} as operator for {}",
            if args.revoke { "revoked" } else { "approved" },
            operator,
            from
        );
        Ok(())
    })
}

fn deploy_vault(data_dir: &Path, args: cli::DeployVaultArgs) -> Result<()> {
    let vault = with_devnet(data_dir, |d| {
        let from = d.resolve(&args.from)?;
        Ok(d.chain.deploy_vault(from, &args.name, &args.symbol)?)
    })?;
    println!("{}", vault);
    Ok(())
}

fn fractionalize(data_dir: &Path, args: cli::FractionalizeArgs) -> Result<()> {
    with_devnet(data_dir, |d| {
        let from = d.resolve(&args.from)?;
        let total = shares(&args.shares)?;
        d.chain.fractionalize(
            from,
            address(&args.vault)?,
            address(&args.registry)?,
            args.id,
            total,
        )?;
        println!(
            "fractionalized asset {} into {} shares",
            args.id,
            format_units(total, SHARE_DECIMALS)
        );
        Ok(())
    })
}

fn list_for_sale(data_dir: &Path, args: cli::ListArgs) -> Result<()> {
    with_devnet(data_dir, |d| {
        let from = d.resolve(&args.from)?;
        let price = native(&args.price)?;
        d.chain.list_for_sale(from, address(&args.vault)?, price)?;
        println!("listed for {}", fmt_native(price));
        Ok(())
    })
}

fn buy(data_dir: &Path, args: cli::BuyArgs) -> Result<()> {
    with_devnet(data_dir, |d| {
        let from = d.resolve(&args.from)?;
        let vault = address(&args.vault)?;
        let value = match &args.value {
            Some(value) => native(value)?,
            None => d.chain.vault(&vault)?.sale_price(),
        };
        d.chain.buy(from, vault, value)?;
        println!("{} bought the asset for {}", from, fmt_native(value));
        Ok(())
    })
}

fn withdraw(data_dir: &Path, args: cli::WithdrawArgs) -> Result<()> {
    with_devnet(data_dir, |d| {
        let from = d.resolve(&args.from)?;
        let amount = shares(&args.shares)?;
        let payout = d
            .chain
            .withdraw_proceeds(from, address(&args.vault)?, amount)?;
        println!(
            "burned {} shares for {}",
            format_units(amount, SHARE_DECIMALS),
            fmt_native(payout)
        );
        Ok(())
    })
}

fn transfer_shares(data_dir: &Path, args: cli::TransferSharesArgs) -> Result<()> {
    with_devnet(data_dir, |d| {
        let from = d.resolve(&args.from)?;
        let to = d.resolve(&args.to)?;
        let amount = shares(&args.shares)?;
        d.chain
            .transfer_shares(from, address(&args.vault)?, to, amount)?;
        println!(
            "sent {} shares from {} to {}",
            format_units(amount, SHARE_DECIMALS),
            from,
            to
        );
        Ok(())
    })
}

fn owner_of(data_dir: &Path, args: cli::OwnerOfArgs) -> Result<()> {
    let devnet = Devnet::open(data_dir)?;
    let id: AssetId = args.id;
    println!("{}", devnet.chain.owner_of(&address(&args.registry)?, id)?);
    Ok(())
}

/// JSON view of a vault. Amounts are decimal strings; JSON numbers cannot
/// carry 128-bit values portably.
#[derive(Debug, Serialize)]
struct VaultStatus {
    address: Address,
    admin: Address,
    name: String,
    symbol: String,
    phase: VaultPhase,
    is_fractionalized: bool,
    is_for_sale: bool,
    sale_price: String,
    registry: Option<Address>,
    asset_id: Option<String>,
    buyer: Option<Address>,
    minted_supply: String,
    total_supply: String,
    holders: usize,
    escrow: String,
    created_at: String,
    updated_at: String,
}

impl VaultStatus {
    fn new(vault: &Vault, escrow: u128) -> Self {
        let asset = vault.locked_asset();
        Self {
            address: vault.address,
            admin: vault.admin(),
            name: vault.shares().name.clone(),
            symbol: vault.shares().symbol.clone(),
            phase: vault.phase(),
            is_fractionalized: vault.is_fractionalized(),
            is_for_sale: vault.is_for_sale(),
            sale_price: format_units(vault.sale_price(), NATIVE_DECIMALS),
            registry: asset.map(|a| a.registry),
            asset_id: asset.map(|a| a.id.to_string()),
            buyer: vault.buyer(),
            minted_supply: format_units(vault.minted_supply(), SHARE_DECIMALS),
            total_supply: format_units(vault.total_supply(), SHARE_DECIMALS),
            holders: vault.shares().holder_count(),
            escrow: format_units(escrow, NATIVE_DECIMALS),
            created_at: vault.created_at.to_rfc3339(),
            updated_at: vault.updated_at.to_rfc3339(),
        }
    }
}

fn vault_status(data_dir: &Path, args: cli::StatusArgs) -> Result<()> {
    let devnet = Devnet::open(data_dir)?;
    let address = address(&args.vault)?;
    let vault = devnet.chain.vault(&address)?;
    let status = VaultStatus::new(vault, devnet.chain.native_balance(&address));
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn balance(data_dir: &Path, args: cli::BalanceArgs) -> Result<()> {
    let devnet = Devnet::open(data_dir)?;
    let account = devnet.resolve(&args.account)?;
    println!("{}  {}", account, fmt_native(devnet.chain.native_balance(&account)));
    if let Some(vault) = &args.vault {
        let vault = devnet.chain.vault(&address(vault)?)?;
        println!(
            "  {} {}",
            format_units(vault.balance_of(&account), SHARE_DECIMALS),
            vault.shares().symbol
        );
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("shard-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol   {}", shard_protocol::config::PROTOCOL_VERSION);
}
