//! Configuration for stitchctl

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use stitch_proposal::{ProtocolConfig, SigningIdentity};

/// Main CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Protocol constants passed to the builders
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Signing identity
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Where the signing identity lives on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// MSP id of the signer
    #[serde(default)]
    pub msp_id: String,

    /// PEM certificate file
    #[serde(default)]
    pub cert_path: String,

    /// PEM private key file
    #[serde(default)]
    pub key_path: String,

    /// Optional PEM TLS client certificate file
    #[serde(default)]
    pub tls_cert_path: String,
}

impl IdentityConfig {
    /// Read the certificate and key files.
    pub fn load(&self) -> Result<SigningIdentity> {
        if self.msp_id.is_empty() || self.cert_path.is_empty() || self.key_path.is_empty() {
            anyhow::bail!("identity.msp_id, identity.cert_path and identity.key_path must be configured");
        }
        let cert = std::fs::read_to_string(&self.cert_path)
            .with_context(|| format!("reading certificate {}", self.cert_path))?;
        let key = std::fs::read_to_string(&self.key_path)
            .with_context(|| format!("reading private key {}", self.key_path))?;
        Ok(SigningIdentity::from_pem(self.msp_id.as_str(), cert, key)?)
    }

    /// TLS client certificate PEM, when configured.
    pub fn tls_cert(&self) -> Result<Option<String>> {
        if self.tls_cert_path.is_empty() {
            return Ok(None);
        }
        let pem = std::fs::read_to_string(&self.tls_cert_path)
            .with_context(|| format!("reading TLS certificate {}", self.tls_cert_path))?;
        Ok(Some(pem))
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&CliConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with STITCH_ prefix. Field names contain
        // underscores, so sections are split on a double underscore.
        builder = builder.add_source(
            config::Environment::with_prefix("STITCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
