//! Configuration loading for the dice orchestrator.
//!
//! TOML files with `${VAR}` environment substitution, `DICE_`-prefixed
//! environment overrides, and validation before anything touches the chain.

use std::env;
use std::path::Path;
use thiserror::Error;

pub mod types;

pub use types::{ChainSettings, Config, OutcomeSettings, SignerSettings, SubmissionSettings};

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("file not found: {0}")]
	FileNotFound(String),

	#[error("parse error: {0}")]
	ParseError(String),

	#[error("validation error: {0}")]
	ValidationError(String),

	#[error("environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("io error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "DICE_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let mut config = if let Some(file_path) = &self.file_path {
			self.load_from_file(file_path).await?
		} else {
			return Err(ConfigError::FileNotFound(
				"no configuration file specified".to_string(),
			));
		};

		self.apply_env_overrides(&mut config);

		validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<Config, ConfigError> {
		let content = tokio::fs::read_to_string(file_path).await.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				ConfigError::FileNotFound(file_path.to_string())
			} else {
				ConfigError::IoError(e)
			}
		})?;

		let substituted_content = self.substitute_env_vars(&content)?;

		let config: Config = toml::from_str(&substituted_content)
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		Ok(config)
	}

	/// Replaces `${VAR_NAME}` patterns with the environment variable's value.
	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let mut result = content.to_string();

		let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static pattern");

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value = env::var(var_name)
				.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			result = result.replace(full_match, &env_value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut Config) {
		if let Ok(rpc_url) = env::var(format!("{}RPC_URL", self.env_prefix)) {
			config.chain.rpc_url = rpc_url;
		}

		if let Ok(contract) = env::var(format!("{}CONTRACT", self.env_prefix)) {
			config.chain.contract = contract;
		}

		if let Ok(private_key) = env::var(format!("{}PRIVATE_KEY", self.env_prefix)) {
			config.signer.private_key = private_key;
		}
	}
}

fn is_hex_string(s: &str, expected_len: usize) -> bool {
	match s.strip_prefix("0x") {
		Some(hex) => hex.len() == expected_len && hex.chars().all(|c| c.is_ascii_hexdigit()),
		None => false,
	}
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
	if !config.chain.rpc_url.starts_with("http://") && !config.chain.rpc_url.starts_with("https://")
	{
		return Err(ConfigError::ValidationError(format!(
			"rpc_url must be an http(s) endpoint, got '{}'",
			config.chain.rpc_url
		)));
	}

	if !is_hex_string(&config.chain.contract, 40) {
		return Err(ConfigError::ValidationError(
			"contract must be a 0x-prefixed 20-byte hex address".to_string(),
		));
	}

	if !is_hex_string(&config.signer.private_key, 64) {
		return Err(ConfigError::ValidationError(
			"private_key must be a 0x-prefixed 32-byte hex key".to_string(),
		));
	}

	if config.submission.confirmation_timeout_secs == 0 {
		return Err(ConfigError::ValidationError(
			"submission.confirmation_timeout_secs must be non-zero".to_string(),
		));
	}

	if config.submission.poll_interval_secs == 0 {
		return Err(ConfigError::ValidationError(
			"submission.poll_interval_secs must be non-zero".to_string(),
		));
	}

	if config.outcome.max_wait_secs == 0 {
		return Err(ConfigError::ValidationError(
			"outcome.max_wait_secs must be non-zero".to_string(),
		));
	}

	if config.outcome.poll_interval_secs == 0 {
		return Err(ConfigError::ValidationError(
			"outcome.poll_interval_secs must be non-zero".to_string(),
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	const CONTRACT: &str = "0xA936953aDD9E88fd32990Dbe62D83AbE84ba5226";
	const PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn base_toml() -> String {
		format!(
			r#"
[chain]
rpc_url = "https://sepolia.base.org"
chain_id = 84532
contract = "{CONTRACT}"

[signer]
private_key = "{PRIVATE_KEY}"
"#
		)
	}

	fn write_config(content: &str) -> NamedTempFile {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	fn valid_config() -> Config {
		Config {
			chain: ChainSettings {
				rpc_url: "https://sepolia.base.org".to_string(),
				chain_id: 84532,
				contract: CONTRACT.to_string(),
			},
			signer: SignerSettings {
				private_key: PRIVATE_KEY.to_string(),
			},
			submission: SubmissionSettings::default(),
			outcome: OutcomeSettings::default(),
		}
	}

	#[tokio::test]
	async fn loads_minimal_config_with_defaults() {
		let file = write_config(&base_toml());

		let config = ConfigLoader::new().with_file(file.path()).load().await.unwrap();

		assert_eq!(config.chain.chain_id, 84532);
		assert_eq!(config.submission.confirmations, 1);
		assert_eq!(config.outcome.initial_delay_secs, 30);
		assert_eq!(config.outcome.max_wait_secs, 600);
	}

	#[tokio::test]
	async fn loads_explicit_schedule_sections() {
		let toml = format!(
			"{}\n[outcome]\ninitial_delay_secs = 5\npoll_interval_secs = 2\nmax_wait_secs = 60\n",
			base_toml()
		);
		let file = write_config(&toml);

		let config = ConfigLoader::new().with_file(file.path()).load().await.unwrap();

		assert_eq!(config.outcome.initial_delay_secs, 5);
		assert_eq!(
			config.outcome.max_wait(),
			std::time::Duration::from_secs(60)
		);
	}

	#[tokio::test]
	async fn substitutes_environment_variables() {
		std::env::set_var("DICE_TEST_SUBST_KEY", PRIVATE_KEY);
		let toml = base_toml().replace(PRIVATE_KEY, "${DICE_TEST_SUBST_KEY}");
		let file = write_config(&toml);

		let config = ConfigLoader::new().with_file(file.path()).load().await.unwrap();

		assert_eq!(config.signer.private_key, PRIVATE_KEY);
	}

	#[tokio::test]
	async fn missing_substitution_variable_is_an_error() {
		let toml = base_toml().replace(PRIVATE_KEY, "${DICE_TEST_UNSET_VARIABLE}");
		let file = write_config(&toml);

		let err = ConfigLoader::new().with_file(file.path()).load().await.unwrap_err();
		assert!(matches!(err, ConfigError::EnvVarNotFound(name) if name == "DICE_TEST_UNSET_VARIABLE"));
	}

	#[tokio::test]
	async fn env_prefix_overrides_file_values() {
		std::env::set_var("DICE_TEST_OVR_RPC_URL", "https://other.example.org");
		let file = write_config(&base_toml());

		let config = ConfigLoader::new()
			.with_file(file.path())
			.with_env_prefix("DICE_TEST_OVR_")
			.load()
			.await
			.unwrap();

		assert_eq!(config.chain.rpc_url, "https://other.example.org");
	}

	#[tokio::test]
	async fn missing_file_is_reported_as_such() {
		let err = ConfigLoader::new()
			.with_file("/nonexistent/dice.toml")
			.load()
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::FileNotFound(_)));
	}

	#[test]
	fn rejects_non_http_rpc_url() {
		let mut config = valid_config();
		config.chain.rpc_url = "wss://sepolia.base.org".to_string();
		assert!(matches!(
			validate_config(&config),
			Err(ConfigError::ValidationError(_))
		));
	}

	#[test]
	fn rejects_malformed_contract_address() {
		let mut config = valid_config();
		config.chain.contract = "0x1234".to_string();
		assert!(validate_config(&config).is_err());

		config.chain.contract = CONTRACT.trim_start_matches("0x").to_string();
		assert!(validate_config(&config).is_err());
	}

	#[test]
	fn rejects_zero_budgets() {
		let mut config = valid_config();
		config.outcome.max_wait_secs = 0;
		assert!(validate_config(&config).is_err());

		let mut config = valid_config();
		config.submission.confirmation_timeout_secs = 0;
		assert!(validate_config(&config).is_err());
	}

	#[test]
	fn accepts_a_well_formed_config() {
		assert!(validate_config(&valid_config()).is_ok());
	}
}
