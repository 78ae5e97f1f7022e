//! Facilitator server configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. an optional TOML file, with `$VAR` / `${VAR}` expansion in its text
//! 2. environment variables (a `.env` file is loaded into the environment by
//!    the binary before this runs)
//! 3. built-in defaults for anything still unset
//!
//! The merged values are then validated into a [`FacilitatorConfig`]. Any
//! invalid or missing required value is a [`ConfigError`] and the server does
//! not start.
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 3402
//! network = "avalanche-fuji"
//! avalanche_rpc_endpoint = "https://api.avax-test.network/ext/bc/C/rpc"
//! receiver_address = "0x..."
//! private_key = "$FACILITATOR_PRIVATE_KEY"
//! cors_origins = ["http://localhost:3000"]
//! verification_policy = "lenient"
//! tx_receipt_timeout_secs = 60
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the configuration file (default: `config.toml`)
//! - `HOST`, `PORT` - Bind address and port (default: `0.0.0.0:3402`)
//! - `NETWORK` - `avalanche` or `avalanche-fuji` (default: `avalanche-fuji`)
//! - `AVALANCHE_RPC_ENDPOINT` - HTTP(S) JSON-RPC URL
//! - `RECEIVER_ADDRESS` - Address payments must be made to
//! - `PRIVATE_KEY` - Hex private key of the account that submits settlements
//! - `CORS_ORIGINS` - Comma-separated allowed origins (empty allows any)
//! - `VERIFICATION_POLICY` - `lenient` or `strict`
//! - `TX_RECEIPT_TIMEOUT_SECS` - Default receipt wait bound

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use avax402_evm::{AvalancheNetwork, VerificationPolicy};
use serde::Deserialize;
use url::Url;

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3402;

/// Default receipt wait bound, in seconds.
pub const DEFAULT_TX_RECEIPT_TIMEOUT_SECS: u64 = 60;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// A required setting has no value.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    /// A setting has a value that does not validate.
    #[error("invalid `{key}`: {reason}")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// What was wrong.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl fmt::Display) -> Self {
        Self::Invalid {
            key,
            reason: reason.to_string(),
        }
    }
}

/// Raw contents of the TOML config file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Bind address.
    pub host: Option<IpAddr>,
    /// Bind port.
    pub port: Option<u16>,
    /// Network identifier.
    pub network: Option<String>,
    /// JSON-RPC endpoint.
    pub avalanche_rpc_endpoint: Option<String>,
    /// Payment receiver.
    pub receiver_address: Option<String>,
    /// Settlement signer key.
    pub private_key: Option<String>,
    /// Allowed CORS origins.
    pub cors_origins: Option<Vec<String>>,
    /// `lenient` or `strict`.
    pub verification_policy: Option<String>,
    /// Default receipt wait bound.
    pub tx_receipt_timeout_secs: Option<u64>,
    /// Block confirmations required before a receipt counts.
    pub confirmations: Option<u64>,
}

/// Validated facilitator configuration.
#[derive(Clone)]
pub struct FacilitatorConfig {
    /// Bind address.
    pub host: IpAddr,
    /// Bind port.
    pub port: u16,
    /// Network payments are accepted on.
    pub network: AvalancheNetwork,
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Address payments must be made to.
    pub receiver: Address,
    /// Account that submits settlements and pays gas.
    pub signer: PrivateKeySigner,
    /// Allowed CORS origins; empty allows any.
    pub cors_origins: Vec<String>,
    /// How much is checked before accepting a payment.
    pub verification_policy: VerificationPolicy,
    /// Receipt wait bound when a requirement gives none.
    pub receipt_timeout: Duration,
    /// Block confirmations required before a receipt counts.
    pub confirmations: u64,
}

impl fmt::Debug for FacilitatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacilitatorConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("network", &self.network)
            .field("rpc_url", &self.rpc_url.as_str())
            .field("receiver", &self.receiver)
            .field("signer", &self.signer.address())
            .field("cors_origins", &self.cors_origins)
            .field("verification_policy", &self.verification_policy)
            .field("receipt_timeout", &self.receipt_timeout)
            .field("confirmations", &self.confirmations)
            .finish()
    }
}

impl FacilitatorConfig {
    /// Loads configuration from the process environment and the file at
    /// `path`, or at `$CONFIG`, or at [`DEFAULT_CONFIG_PATH`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable or malformed, or any
    /// setting fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env = |key: &str| std::env::var(key).ok();
        let path = path.map_or_else(
            || PathBuf::from(env("CONFIG").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned())),
            Path::to_path_buf,
        );
        Self::load_with(&path, env)
    }

    /// Like [`load`](Self::load) with an explicit path and environment lookup.
    ///
    /// A missing file is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on any read, parse or validation failure.
    pub fn load_with<E>(path: &Path, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            String::new()
        };
        let file: ConfigFile = toml::from_str(&expand_env_vars(&content, &env))?;
        Self::from_sources(file, &env)
    }

    /// Merges `file` with environment overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any setting is missing or invalid.
    pub fn from_sources<E>(file: ConfigFile, env: &E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let host = match var("HOST") {
            Some(host) => host.parse::<IpAddr>().map_err(|e| ConfigError::invalid("HOST", e))?,
            None => file.host.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        };
        let port = match var("PORT") {
            Some(port) => port.parse::<u16>().map_err(|e| ConfigError::invalid("PORT", e))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };
        let network = match var("NETWORK").or(file.network) {
            Some(network) => {
                AvalancheNetwork::from_str(&network).map_err(|e| ConfigError::invalid("NETWORK", e))?
            }
            None => AvalancheNetwork::Fuji,
        };
        let rpc_url = var("AVALANCHE_RPC_ENDPOINT")
            .or(file.avalanche_rpc_endpoint)
            .ok_or(ConfigError::Missing("AVALANCHE_RPC_ENDPOINT"))
            .and_then(|url| parse_rpc_url(&url))?;
        let receiver = var("RECEIVER_ADDRESS")
            .or(file.receiver_address)
            .ok_or(ConfigError::Missing("RECEIVER_ADDRESS"))
            .and_then(|addr| parse_receiver(&addr))?;
        let signer = var("PRIVATE_KEY")
            .or(file.private_key)
            .ok_or(ConfigError::Missing("PRIVATE_KEY"))
            .and_then(|key| parse_private_key(&key))?;
        let cors_origins = var("CORS_ORIGINS").map_or_else(
            || file.cors_origins.unwrap_or_default(),
            |origins| split_origins(&origins),
        );
        let verification_policy = match var("VERIFICATION_POLICY").or(file.verification_policy) {
            Some(policy) => policy
                .parse::<VerificationPolicy>()
                .map_err(|e| ConfigError::invalid("VERIFICATION_POLICY", e))?,
            None => VerificationPolicy::default(),
        };
        let receipt_timeout_secs = match var("TX_RECEIPT_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid("TX_RECEIPT_TIMEOUT_SECS", e))?,
            None => file
                .tx_receipt_timeout_secs
                .unwrap_or(DEFAULT_TX_RECEIPT_TIMEOUT_SECS),
        };
        if receipt_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "TX_RECEIPT_TIMEOUT_SECS",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            host,
            port,
            network,
            rpc_url,
            receiver,
            signer,
            cors_origins,
            verification_policy,
            receipt_timeout: Duration::from_secs(receipt_timeout_secs),
            confirmations: file.confirmations.unwrap_or(1).max(1),
        })
    }
}

fn parse_rpc_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::invalid("AVALANCHE_RPC_ENDPOINT", e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::invalid(
            "AVALANCHE_RPC_ENDPOINT",
            format!("unsupported scheme `{other}`, expected http or https"),
        )),
    }
}

fn hex_body<'a>(raw: &'a str, key: &'static str, bytes: usize) -> Result<&'a str, ConfigError> {
    let body = raw
        .strip_prefix("0x")
        .ok_or_else(|| ConfigError::invalid(key, "must start with 0x"))?;
    if body.len() != bytes * 2 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConfigError::invalid(
            key,
            format!("expected {bytes} bytes of hex"),
        ));
    }
    Ok(body)
}

fn parse_receiver(raw: &str) -> Result<Address, ConfigError> {
    hex_body(raw, "RECEIVER_ADDRESS", 20)?;
    raw.parse()
        .map_err(|e| ConfigError::invalid("RECEIVER_ADDRESS", e))
}

fn parse_private_key(raw: &str) -> Result<PrivateKeySigner, ConfigError> {
    let body = hex_body(raw, "PRIVATE_KEY", 32)?;
    // The key itself never appears in the error.
    body.parse()
        .map_err(|_| ConfigError::invalid("PRIVATE_KEY", "not a valid secp256k1 private key"))
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Expands `$VAR` and `${VAR}` patterns using `env`.
///
/// Unresolved variables are left as-is.
fn expand_env_vars<E>(input: &str, env: &E) -> String
where
    E: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.next_if_eq(&'{').is_some();
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match env(&name).filter(|_| !name.is_empty()) {
            Some(value) => result.push_str(&value),
            None => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const RECEIVER: &str = "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB2";

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("AVALANCHE_RPC_ENDPOINT", "https://api.avax-test.network/ext/bc/C/rpc"),
            ("RECEIVER_ADDRESS", RECEIVER),
            ("PRIVATE_KEY", KEY),
        ]
    }

    fn from_env(pairs: &[(&str, &str)]) -> Result<FacilitatorConfig, ConfigError> {
        FacilitatorConfig::from_sources(ConfigFile::default(), &env(pairs))
    }

    #[test]
    fn defaults_apply_when_only_required_settings_are_given() {
        let config = from_env(&required()).unwrap();
        assert_eq!(config.port, 3402);
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.network, AvalancheNetwork::Fuji);
        assert_eq!(config.verification_policy, VerificationPolicy::Lenient);
        assert_eq!(config.receipt_timeout, Duration::from_secs(60));
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.receiver, RECEIVER.parse::<Address>().unwrap());
    }

    #[test]
    fn missing_private_key_is_reported() {
        let pairs: Vec<_> = required()
            .into_iter()
            .filter(|(k, _)| *k != "PRIVATE_KEY")
            .collect();
        assert!(matches!(
            from_env(&pairs),
            Err(ConfigError::Missing("PRIVATE_KEY"))
        ));
    }

    #[test]
    fn rejects_non_http_rpc_and_unprefixed_values() {
        let mut pairs = required();
        pairs[0] = ("AVALANCHE_RPC_ENDPOINT", "ws://localhost:9650");
        assert!(matches!(
            from_env(&pairs),
            Err(ConfigError::Invalid { key: "AVALANCHE_RPC_ENDPOINT", .. })
        ));

        let mut pairs = required();
        pairs[1] = ("RECEIVER_ADDRESS", "BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB2");
        assert!(matches!(
            from_env(&pairs),
            Err(ConfigError::Invalid { key: "RECEIVER_ADDRESS", .. })
        ));

        let mut pairs = required();
        pairs[2] = ("PRIVATE_KEY", &KEY[2..]);
        assert!(matches!(
            from_env(&pairs),
            Err(ConfigError::Invalid { key: "PRIVATE_KEY", .. })
        ));
    }

    #[test]
    fn unknown_network_is_invalid() {
        let mut pairs = required();
        pairs.push(("NETWORK", "base"));
        assert!(matches!(
            from_env(&pairs),
            Err(ConfigError::Invalid { key: "NETWORK", .. })
        ));
    }

    #[test]
    fn env_overrides_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            port = 8080
            network = "avalanche-fuji"
            cors_origins = ["https://a.example"]
            verification_policy = "strict"
            "#,
        )
        .unwrap();
        let mut pairs = required();
        pairs.extend([
            ("PORT", "9000"),
            ("NETWORK", "avalanche"),
            ("CORS_ORIGINS", "https://b.example, https://c.example,"),
        ]);
        let config = FacilitatorConfig::from_sources(file, &env(&pairs)).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.network, AvalancheNetwork::Mainnet);
        assert_eq!(config.cors_origins, ["https://b.example", "https://c.example"]);
        assert_eq!(config.verification_policy, VerificationPolicy::Strict);
    }

    #[test]
    fn zero_receipt_timeout_is_invalid() {
        let mut pairs = required();
        pairs.push(("TX_RECEIPT_TIMEOUT_SECS", "0"));
        assert!(from_env(&pairs).is_err());
    }

    #[test]
    fn expands_plain_and_braced_variables() {
        let lookup = env(&[("KEY", "value"), ("OTHER", "x")]);
        assert_eq!(expand_env_vars("a = \"$KEY\"", &lookup), "a = \"value\"");
        assert_eq!(expand_env_vars("${OTHER}-$KEY", &lookup), "x-value");
        assert_eq!(expand_env_vars("$MISSING ${NOPE}", &lookup), "$MISSING ${NOPE}");
        assert_eq!(expand_env_vars("cost $5", &lookup), "cost $5");
    }

    #[test]
    fn debug_does_not_leak_the_key() {
        let config = from_env(&required()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains(&KEY[2..]));
    }

    #[test]
    fn missing_file_is_treated_as_empty() {
        let config = FacilitatorConfig::load_with(
            Path::new("/nonexistent/avax402/config.toml"),
            env(&required()),
        )
        .unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
