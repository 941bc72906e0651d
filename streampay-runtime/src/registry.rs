//! Static token/network registry.
//!
//! Loaded once at process start (TOML file or the built-in local
//! deployment) and shared read-only behind an `Arc` afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::IntentError;
use crate::types::TokenDescriptor;
use crate::validation::{checksum, is_valid_address, parse_address};

pub const MAX_TOKEN_DECIMALS: u8 = 36;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    pub core_contract: Address,
    pub swap_router: Address,
    pub pool_manager: Address,
    /// Keyed by upper-cased symbol.
    pub tokens: BTreeMap<String, TokenInfo>,
}

impl NetworkConfig {
    pub fn token(&self, symbol: &str) -> Option<&TokenInfo> {
        self.tokens.get(&symbol.trim().to_uppercase())
    }

    pub fn token_by_address(&self, address: &Address) -> Option<&TokenInfo> {
        self.tokens.values().find(|t| &t.address == address)
    }

    /// Resolve a symbol (case-insensitive) or a literal address. An unlisted
    /// address resolves with unknown decimals.
    pub fn resolve_token(&self, symbol_or_address: &str) -> Result<TokenDescriptor, IntentError> {
        let raw = symbol_or_address.trim();
        if raw.starts_with("0x") || raw.starts_with("0X") {
            let address = parse_address("token", raw)?;
            let decimals = self.token_by_address(&address).map(|info| info.decimals);
            if decimals.is_none() {
                tracing::debug!(
                    token = %checksum(&address),
                    network = %self.name,
                    "unlisted token address, decimals unknown"
                );
            }
            return Ok(TokenDescriptor {
                symbol_or_address: checksum(&address),
                address,
                decimals,
            });
        }

        self.token(raw)
            .map(|info| TokenDescriptor {
                symbol_or_address: info.symbol.clone(),
                address: info.address,
                decimals: Some(info.decimals),
            })
            .ok_or_else(|| IntentError::UnresolvedToken {
                token: raw.to_string(),
                network: self.name.clone(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    active: String,
    networks: BTreeMap<String, NetworkConfig>,
}

// ── File format ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RegistryFile {
    active: String,
    networks: BTreeMap<String, NetworkFile>,
}

#[derive(Deserialize)]
struct NetworkFile {
    chain_id: u64,
    core_contract: String,
    swap_router: String,
    pool_manager: String,
    #[serde(default)]
    tokens: BTreeMap<String, TokenFile>,
}

#[derive(Deserialize)]
struct TokenFile {
    address: String,
    decimals: u8,
}

fn config_address(network: &str, field: &str, value: &str) -> Result<Address, IntentError> {
    if !is_valid_address(value) {
        return Err(IntentError::ConfigError(format!(
            "networks.{network}.{field}: '{value}' is not an address"
        )));
    }
    let address = parse_address(field, value)
        .map_err(|e| IntentError::ConfigError(format!("networks.{network}.{field}: {e}")))?;
    if address == Address::ZERO {
        return Err(IntentError::ConfigError(format!(
            "networks.{network}.{field}: zero address is not a deployment"
        )));
    }
    Ok(address)
}

impl Registry {
    pub fn from_toml_str(input: &str) -> Result<Self, IntentError> {
        let file: RegistryFile = toml::from_str(input)?;
        let mut networks = BTreeMap::new();

        for (name, net) in file.networks {
            let mut tokens = BTreeMap::new();
            for (symbol, token) in net.tokens {
                let key = symbol.trim().to_uppercase();
                if token.decimals > MAX_TOKEN_DECIMALS {
                    return Err(IntentError::ConfigError(format!(
                        "networks.{name}.tokens.{symbol}: {} decimals exceeds {MAX_TOKEN_DECIMALS}",
                        token.decimals
                    )));
                }
                let address = config_address(&name, &format!("tokens.{symbol}"), &token.address)?;
                let info = TokenInfo {
                    symbol: key.clone(),
                    address,
                    decimals: token.decimals,
                };
                if tokens.insert(key, info).is_some() {
                    return Err(IntentError::ConfigError(format!(
                        "networks.{name}: duplicate token symbol '{symbol}'"
                    )));
                }
            }

            let config = NetworkConfig {
                core_contract: config_address(&name, "core_contract", &net.core_contract)?,
                swap_router: config_address(&name, "swap_router", &net.swap_router)?,
                pool_manager: config_address(&name, "pool_manager", &net.pool_manager)?,
                chain_id: net.chain_id,
                name: name.clone(),
                tokens,
            };
            networks.insert(name, config);
        }

        if !networks.contains_key(&file.active) {
            return Err(IntentError::ConfigError(format!(
                "active network '{}' is not defined",
                file.active
            )));
        }

        Ok(Self {
            active: file.active,
            networks,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, IntentError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            IntentError::ConfigError(format!("Failed to read registry {}: {e}", path.display()))
        })?;
        let registry = Self::from_toml_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            active = %registry.active,
            networks = registry.networks.len(),
            "registry loaded"
        );
        Ok(registry)
    }

    /// Built-in registry for a local development chain (Hardhat/Anvil
    /// deterministic deployment addresses).
    pub fn local_dev() -> Self {
        Self::from_toml_str(LOCAL_DEV_REGISTRY).expect("built-in registry is valid")
    }

    /// Switch the active deployment.
    pub fn with_active(mut self, network: &str) -> Result<Self, IntentError> {
        if !self.networks.contains_key(network) {
            return Err(IntentError::ConfigError(format!(
                "network '{network}' is not defined in the registry"
            )));
        }
        self.active = network.to_string();
        Ok(self)
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn active(&self) -> &NetworkConfig {
        // Presence is checked on construction and in `with_active`.
        &self.networks[&self.active]
    }

    pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.get(name)
    }

    pub fn networks(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.networks.values()
    }

    /// Every symbol known on any network, upper-cased and de-duplicated.
    pub fn known_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .networks
            .values()
            .flat_map(|n| n.tokens.keys().cloned())
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }
}

const LOCAL_DEV_REGISTRY: &str = r#"
active = "local"

[networks.local]
chain_id = 31337
core_contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
swap_router = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
pool_manager = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"

[networks.local.tokens.USDC]
address = "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9"
decimals = 6

[networks.local.tokens.WETH]
address = "0xDc64a140Aa3E981100a9becA4E685f962f0cF6C9"
decimals = 18

[networks.local.tokens.DAI]
address = "0x5FC8d32690cc91D4c39d9d3abcBD16989F875707"
decimals = 18
"#;
