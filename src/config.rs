//! Configuration module for the bridge service
//!
//! This module handles all configuration loading from TOML files,
//! environment variables, and provides structured configuration types.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// Solana endpoint, nonce and release settings
    #[serde(default)]
    pub solana: SolanaConfig,

    /// Sui endpoint and bridge package deployment
    #[serde(default)]
    pub sui: SuiConfig,

    /// Attestation enclave
    #[serde(default = "default_enclave")]
    pub enclave: ServiceConfig,

    /// Solver
    #[serde(default = "default_solver")]
    pub solver: ServiceConfig,

    /// Threshold signature polling
    #[serde(default)]
    pub threshold: ThresholdConfig,

    /// User key storage
    #[serde(default)]
    pub wallet: WalletConfig,

    /// API keys
    #[serde(default)]
    pub auth: AuthConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaConfig {
    #[serde(default = "default_solana_rpc_url")]
    pub rpc_url: String,

    /// Seed mixed with the wallet address to derive its nonce account
    #[serde(default = "default_nonce_seed")]
    pub nonce_seed: String,

    /// Fee budgeted for the nonce create transaction
    #[serde(default = "default_tx_fee_lamports")]
    pub tx_fee_lamports: u64,

    #[serde(default = "default_blockhash_retry_attempts")]
    pub blockhash_retry_attempts: u32,

    #[serde(default = "default_blockhash_retry_delay_ms")]
    pub blockhash_retry_delay_ms: u64,

    /// Custodial (dWallet) address that owns the release token account
    #[serde(default)]
    pub custodian: String,

    /// Token mint released on Solana by burn flows
    #[serde(default)]
    pub release_mint: String,

    #[serde(default = "default_release_decimals")]
    pub release_decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiConfig {
    #[serde(default = "default_sui_rpc_url")]
    pub rpc_url: String,

    #[serde(default = "default_sui_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_gas_budget")]
    pub gas_budget: u64,

    #[serde(default)]
    pub bridge_package: String,

    #[serde(default = "default_bridge_module")]
    pub bridge_module: String,

    #[serde(default)]
    pub dwallet_package: String,

    #[serde(default = "default_dwallet_module")]
    pub dwallet_module: String,

    /// Shared bridge state object
    #[serde(default)]
    pub bridge_object: String,
}

/// Enclave or solver endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub url: String,

    pub timeout_secs: u64,

    /// Retries on network-level failure
    #[serde(default = "default_service_retries")]
    pub retries: usize,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Directory holding `<userId>/solana.json` and `<userId>/sui.key`
    #[serde(default = "default_keystore_dir")]
    pub keystore_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
}

/// One API key, stored only as the hex SHA-256 of the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    pub user_id: String,
    pub token_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Emit JSON log lines
    #[serde(default)]
    pub json_logs: bool,
}

// Default value functions
fn default_bind_addr() -> String { "0.0.0.0:8080".to_string() }
fn default_solana_rpc_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_nonce_seed() -> String { crate::nonce_manager::DEFAULT_NONCE_SEED.to_string() }
fn default_tx_fee_lamports() -> u64 { crate::nonce_manager::DEFAULT_CREATE_FEE_LAMPORTS }
fn default_blockhash_retry_attempts() -> u32 { 3 }
fn default_blockhash_retry_delay_ms() -> u64 { 500 }
fn default_release_decimals() -> u8 { 6 }
fn default_sui_rpc_url() -> String { "https://fullnode.testnet.sui.io:443".to_string() }
fn default_sui_timeout_secs() -> u64 { 30 }
fn default_gas_budget() -> u64 { 50_000_000 }
fn default_bridge_module() -> String { "bridge".to_string() }
fn default_dwallet_module() -> String { "dwallet".to_string() }
fn default_service_retries() -> usize { 2 }
fn default_max_polls() -> u32 { crate::sui::DEFAULT_MAX_POLLS }
fn default_poll_interval_ms() -> u64 { crate::sui::DEFAULT_POLL_INTERVAL_MS }
fn default_keystore_dir() -> PathBuf { PathBuf::from("keystore") }
fn default_true() -> bool { true }

fn default_enclave() -> ServiceConfig {
    ServiceConfig {
        url: "http://localhost:3001".to_string(),
        timeout_secs: 10,
        retries: default_service_retries(),
    }
}

fn default_solver() -> ServiceConfig {
    ServiceConfig {
        url: "http://localhost:3002".to_string(),
        timeout_secs: 30,
        retries: default_service_retries(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            solana: SolanaConfig::default(),
            sui: SuiConfig::default(),
            enclave: default_enclave(),
            solver: default_solver(),
            threshold: ThresholdConfig::default(),
            wallet: WalletConfig::default(),
            auth: AuthConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_solana_rpc_url(),
            nonce_seed: default_nonce_seed(),
            tx_fee_lamports: default_tx_fee_lamports(),
            blockhash_retry_attempts: default_blockhash_retry_attempts(),
            blockhash_retry_delay_ms: default_blockhash_retry_delay_ms(),
            custodian: String::new(),
            release_mint: String::new(),
            release_decimals: default_release_decimals(),
        }
    }
}

impl Default for SuiConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_sui_rpc_url(),
            timeout_secs: default_sui_timeout_secs(),
            gas_budget: default_gas_budget(),
            bridge_package: String::new(),
            bridge_module: default_bridge_module(),
            dwallet_package: String::new(),
            dwallet_module: default_dwallet_module(),
            bridge_object: String::new(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            max_polls: default_max_polls(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keystore_dir: default_keystore_dir(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing config file {path}"))?;
        Ok(config)
    }

    /// Load configuration with `.env` and `BRIDGE_*` environment overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `BRIDGE_*` overrides from `lookup`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("BRIDGE_SOLANA_RPC_URL") {
            self.solana.rpc_url = v;
        }
        if let Some(v) = lookup("BRIDGE_SUI_RPC_URL") {
            self.sui.rpc_url = v;
        }
        if let Some(v) = lookup("BRIDGE_ENCLAVE_URL") {
            self.enclave.url = v;
        }
        if let Some(v) = lookup("BRIDGE_SOLVER_URL") {
            self.solver.url = v;
        }
        if let Some(v) = lookup("BRIDGE_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = lookup("BRIDGE_KEYSTORE_DIR") {
            self.wallet.keystore_dir = PathBuf::from(v);
        }
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.solana.blockhash_retry_attempts == 0 {
            bail!("solana.blockhash_retry_attempts must be at least 1");
        }
        if self.threshold.max_polls == 0 {
            bail!("threshold.max_polls must be at least 1");
        }
        Pubkey::from_str(&self.solana.custodian)
            .with_context(|| format!("solana.custodian {:?} is not a pubkey", self.solana.custodian))?;
        Pubkey::from_str(&self.solana.release_mint).with_context(|| {
            format!("solana.release_mint {:?} is not a pubkey", self.solana.release_mint)
        })?;

        for (name, url) in [
            ("solana.rpc_url", &self.solana.rpc_url),
            ("sui.rpc_url", &self.sui.rpc_url),
            ("enclave.url", &self.enclave.url),
            ("solver.url", &self.solver.url),
        ] {
            if url.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }

        for (name, id) in [
            ("sui.bridge_package", &self.sui.bridge_package),
            ("sui.dwallet_package", &self.sui.dwallet_package),
            ("sui.bridge_object", &self.sui.bridge_object),
        ] {
            crate::sui::ObjectId::parse(id)
                .with_context(|| format!("{name} {id:?} is not a 0x-hex id"))?;
        }
        Ok(())
    }

    pub fn custodian(&self) -> anyhow::Result<Pubkey> {
        Ok(Pubkey::from_str(&self.solana.custodian)?)
    }

    pub fn release_mint(&self) -> anyhow::Result<Pubkey> {
        Ok(Pubkey::from_str(&self.solana.release_mint)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
        [solana]
        custodian = "11111111111111111111111111111112"
        release_mint = "So11111111111111111111111111111111111111112"

        [sui]
        bridge_package = "0xb1"
        dwallet_package = "0xd2"
        bridge_object = "0xbeef"

        [[auth.api_keys]]
        user_id = "alice"
        token_sha256 = "00"
    "#;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: Config = toml::from_str(VALID).unwrap();

        assert_eq!(config.enclave.timeout(), Duration::from_secs(10));
        assert_eq!(config.solver.timeout(), Duration::from_secs(30));
        assert_eq!(config.threshold.max_polls, 40);
        assert_eq!(config.threshold.poll_interval_ms, 3_000);
        assert_eq!(config.solana.tx_fee_lamports, 5_000);
        assert_eq!(config.auth.api_keys.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_and_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID.as_bytes()).unwrap();
        let mut config = Config::from_file(file.path().to_str().unwrap()).unwrap();

        config.apply_env_overrides(|key| match key {
            "BRIDGE_ENCLAVE_URL" => Some("http://enclave:9000".to_string()),
            "BRIDGE_KEYSTORE_DIR" => Some("/var/keys".to_string()),
            _ => None,
        });

        assert_eq!(config.enclave.url, "http://enclave:9000");
        assert_eq!(config.wallet.keystore_dir, PathBuf::from("/var/keys"));
        assert_eq!(config.solver.url, "http://localhost:3002");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base: Config = toml::from_str(VALID).unwrap();

        let mut c = base.clone();
        c.threshold.max_polls = 0;
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.solana.blockhash_retry_attempts = 0;
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.solana.custodian = "not-a-key".to_string();
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.sui.bridge_package = "b1".to_string();
        assert!(c.validate().is_err());

        let mut c = base;
        c.solver.url = " ".to_string();
        assert!(c.validate().is_err());
    }
}
