//! # CLI Interface
//!
//! Defines the command-line argument structure for `shard-node` using
//! `clap` derive. Every vault and registry operation is a subcommand that
//! loads the devnet from the data directory, runs one call, and persists
//! the result.
//!
//! Accounts are given either as a devnet account index (`0`, `1`, ...) or as
//! a `0x`-prefixed address. Native amounts and share quantities are decimal
//! strings in whole units (`100`, `0.5`) scaled by 18 decimals.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use shard_protocol::config::{DEFAULT_VAULT_NAME, DEFAULT_VAULT_SYMBOL, DEVNET_ACCOUNT_COUNT};

/// Shard devnet node.
///
/// Runs a local chain of fractional ownership vaults. State lives in a sled
/// database under the data directory and survives between invocations.
#[derive(Parser, Debug)]
#[command(
    name = "shard-node",
    about = "Shard fractional ownership devnet",
    version,
    propagate_version = true
)]
pub struct ShardNodeCli {
    /// Path to the devnet data directory.
    #[arg(long, short = 'd', global = true, env = "SHARD_DATA_DIR", default_value = ".shard")]
    pub data_dir: PathBuf,

    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "SHARD_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Shard node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a fresh devnet with funded accounts.
    Init(InitArgs),
    /// List the devnet accounts and their native balances.
    Accounts,
    /// Deploy a non-fungible asset registry.
    DeployRegistry(DeployRegistryArgs),
    /// Mint an asset in a registry.
    Mint(MintArgs),
    /// Grant or revoke an operator over all of an account's assets.
    ApproveAll(ApproveAllArgs),
    /// Deploy a fractional ownership vault.
    DeployVault(DeployVaultArgs),
    /// Lock an asset in a vault and mint its shares.
    Fractionalize(FractionalizeArgs),
    /// List a vault's asset for sale.
    List(ListArgs),
    /// Buy a vault's asset at its listed price.
    Buy(BuyArgs),
    /// Burn shares for a slice of the sale proceeds.
    Withdraw(WithdrawArgs),
    /// Transfer vault shares.
    TransferShares(TransferSharesArgs),
    /// Print the owner of an asset.
    OwnerOf(OwnerOfArgs),
    /// Print a vault's state as JSON.
    Status(StatusArgs),
    /// Print an account's native balance, and its shares in a vault.
    Balance(BalanceArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Number of accounts to fund at genesis.
    #[arg(long, default_value_t = DEVNET_ACCOUNT_COUNT)]
    pub accounts: usize,

    /// Native balance of each account, in whole units.
    #[arg(long, default_value = "10000")]
    pub balance: String,

    /// Replace an existing devnet in the data directory.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `deploy-registry` subcommand.
#[derive(Args, Debug)]
pub struct DeployRegistryArgs {
    /// Deployer and minter.
    #[arg(long, default_value = "0")]
    pub from: String,

    /// Collection name.
    #[arg(long, default_value = "Valuable NFT")]
    pub name: String,

    /// Collection symbol.
    #[arg(long, default_value = "NFT")]
    pub symbol: String,
}

/// Arguments for the `mint` subcommand.
#[derive(Args, Debug)]
pub struct MintArgs {
    /// The registry's minter.
    #[arg(long, default_value = "0")]
    pub from: String,

    /// Registry address.
    #[arg(long)]
    pub registry: String,

    /// Recipient of the asset. Defaults to the minter.
    #[arg(long)]
    pub to: Option<String>,

    /// Asset id.
    #[arg(long, default_value_t = 0)]
    pub id: u128,
}

/// Arguments for the `approve-all` subcommand.
#[derive(Args, Debug)]
pub struct ApproveAllArgs {
    /// Asset owner.
    #[arg(long, default_value = "0")]
    pub from: String,

    /// Registry address.
    #[arg(long)]
    pub registry: String,

    /// Operator to approve, usually a vault.
    #[arg(long)]
    pub operator: String,

    /// Revoke instead of grant.
    #[arg(long)]
    pub revoke: bool,
}

/// Arguments for the `deploy-vault` subcommand.
#[derive(Args, Debug)]
pub struct DeployVaultArgs {
    /// Deployer; becomes the vault admin.
    #[arg(long, default_value = "0")]
    pub from: String,

    /// Share token name.
    #[arg(long, default_value = DEFAULT_VAULT_NAME)]
    pub name: String,

    /// Share token symbol.
    #[arg(long, default_value = DEFAULT_VAULT_SYMBOL)]
    pub symbol: String,
}

/// Arguments for the `fractionalize` subcommand.
#[derive(Args, Debug)]
pub struct FractionalizeArgs {
    /// Vault admin.
    #[arg(long, default_value = "0")]
    pub from: String,

    /// Vault address.
    #[arg(long)]
    pub vault: String,

    /// Registry of the asset to lock.
    #[arg(long)]
    pub registry: String,

    /// Asset id.
    #[arg(long, default_value_t = 0)]
    pub id: u128,

    /// Share supply to mint, in whole shares.
    #[arg(long, default_value = "1000000")]
    pub shares: String,
}

/// Arguments for the `list` subcommand.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Vault admin.
    #[arg(long, default_value = "0")]
    pub from: String,

    /// Vault address.
    #[arg(long)]
    pub vault: String,

    /// Asking price in whole native units.
    #[arg(long)]
    pub price: String,
}

/// Arguments for the `buy` subcommand.
#[derive(Args, Debug)]
pub struct BuyArgs {
    /// Buyer.
    #[arg(long)]
    pub from: String,

    /// Vault address.
    #[arg(long)]
    pub vault: String,

    /// Payment in whole native units. Defaults to the listed price.
    #[arg(long)]
    pub value: Option<String>,
}

/// Arguments for the `withdraw` subcommand.
#[derive(Args, Debug)]
pub struct WithdrawArgs {
    /// Shareholder.
    #[arg(long)]
    pub from: String,

    /// Vault address.
    #[arg(long)]
    pub vault: String,

    /// Shares to burn, in whole shares.
    #[arg(long)]
    pub shares: String,
}

/// Arguments for the `transfer-shares` subcommand.
#[derive(Args, Debug)]
pub struct TransferSharesArgs {
    /// Current holder.
    #[arg(long, default_value = "0")]
    pub from: String,

    /// Vault address.
    #[arg(long)]
    pub vault: String,

    /// Recipient.
    #[arg(long)]
    pub to: String,

    /// Shares to send, in whole shares.
    #[arg(long)]
    pub shares: String,
}

/// Arguments for the `owner-of` subcommand.
#[derive(Args, Debug)]
pub struct OwnerOfArgs {
    /// Registry address.
    #[arg(long)]
    pub registry: String,

    /// Asset id.
    #[arg(long, default_value_t = 0)]
    pub id: u128,
}

/// Arguments for the `status` subcommand.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Vault address.
    #[arg(long)]
    pub vault: String,
}

/// Arguments for the `balance` subcommand.
#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Account to inspect.
    pub account: String,

    /// Also print the account's shares in this vault.
    #[arg(long)]
    pub vault: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        ShardNodeCli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = ShardNodeCli::try_parse_from([
            "shard-node",
            "list",
            "--vault",
            "0x0000000000000000000000000000000000000001",
            "--price",
            "100",
            "--data-dir",
            "/tmp/shard",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/shard"));
        match cli.command {
            Commands::List(args) => {
                assert_eq!(args.from, "0");
                assert_eq!(args.price, "100");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn deploy_vault_defaults_to_standard_metadata() {
        let cli = ShardNodeCli::try_parse_from(["shard-node", "deploy-vault"]).unwrap();
        match cli.command {
            Commands::DeployVault(args) => {
                assert_eq!(args.name, DEFAULT_VAULT_NAME);
                assert_eq!(args.symbol, DEFAULT_VAULT_SYMBOL);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
