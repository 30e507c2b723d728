use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use crate::optimizer::PackingConfig;
use crate::types::Dims3;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            optimizer: OptimizerConfig::from_env(),
            catalog: CatalogConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "PARCEL_PACKER_API_HOST";
    const PORT_VAR: &'static str = "PARCEL_PACKER_API_PORT";

    fn from_env() -> Self {
        Self::from_raw(env_string(Self::HOST_VAR), env_string(Self::PORT_VAR))
    }

    fn from_raw(host: Option<String>, port: Option<String>) -> Self {
        let default_ip = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let (bind_ip, display_host) = match host {
            Some(host_value) => match host_value.parse::<IpAddr>() {
                Ok(ip) => (ip, host_value),
                Err(err) => {
                    tracing::warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                        Self::HOST_VAR,
                        host_value,
                        err,
                        Self::DEFAULT_HOST
                    );
                    (default_ip, Self::DEFAULT_HOST.to_string())
                }
            },
            None => (default_ip, Self::DEFAULT_HOST.to_string()),
        };

        let port = match port {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    tracing::warn!(
                        "⚠️ {} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    tracing::warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Configuration for parcel packing and quote limits.
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    packing: PackingConfig,
}

impl OptimizerConfig {
    const MAX_UNITS_VAR: &'static str = "PARCEL_PACKER_MAX_UNITS";
    const DEFAULT_LENGTH_VAR: &'static str = "PARCEL_PACKER_DEFAULT_LENGTH_CM";
    const DEFAULT_WIDTH_VAR: &'static str = "PARCEL_PACKER_DEFAULT_WIDTH_CM";
    const DEFAULT_HEIGHT_VAR: &'static str = "PARCEL_PACKER_DEFAULT_HEIGHT_CM";
    const DEFAULT_WEIGHT_VAR: &'static str = "PARCEL_PACKER_DEFAULT_WEIGHT_GRAMS";
    const PADDING_CM_VAR: &'static str = "PARCEL_PACKER_FALLBACK_PADDING_CM";
    const PADDING_GRAMS_VAR: &'static str = "PARCEL_PACKER_FALLBACK_PADDING_GRAMS";

    fn from_env() -> Self {
        let defaults = PackingConfig::default();

        let positive = |value: u64| value > 0;
        let any = |_: u64| true;

        let max_units = load_u64(
            Self::MAX_UNITS_VAR,
            defaults.max_units,
            positive,
            "must be greater than 0",
        );
        let length = load_u64(
            Self::DEFAULT_LENGTH_VAR,
            defaults.unit_defaults.dims.length,
            positive,
            "must be at least 1 cm",
        );
        let width = load_u64(
            Self::DEFAULT_WIDTH_VAR,
            defaults.unit_defaults.dims.width,
            positive,
            "must be at least 1 cm",
        );
        let height = load_u64(
            Self::DEFAULT_HEIGHT_VAR,
            defaults.unit_defaults.dims.height,
            positive,
            "must be at least 1 cm",
        );
        let weight = load_u64(
            Self::DEFAULT_WEIGHT_VAR,
            defaults.unit_defaults.weight_grams,
            positive,
            "must be at least 1 g",
        );
        let padding_cm = load_u64(
            Self::PADDING_CM_VAR,
            defaults.fallback_padding_cm,
            any,
            "must be a whole number",
        );
        let padding_grams = load_u64(
            Self::PADDING_GRAMS_VAR,
            defaults.fallback_padding_grams,
            any,
            "must be a whole number",
        );

        let packing = PackingConfig::builder()
            .default_dims(Dims3::new(length, width, height))
            .default_weight_grams(weight)
            .fallback_padding_cm(padding_cm)
            .fallback_padding_grams(padding_grams)
            .max_units(max_units)
            .build();

        Self { packing }
    }

    /// Creates a configuration from explicit values.
    pub fn new(packing: PackingConfig) -> Self {
        Self { packing }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
    }

    /// Maximum number of units a single quote may expand to.
    pub fn max_units(&self) -> u64 {
        self.packing.max_units
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::new(PackingConfig::default())
    }
}

/// Configuration for the initial box catalog.
#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    path: Option<PathBuf>,
}

impl CatalogConfig {
    const PATH_VAR: &'static str = "PARCEL_PACKER_CATALOG_PATH";

    fn from_env() -> Self {
        Self {
            path: env_string(Self::PATH_VAR).map(PathBuf::from),
        }
    }

    /// File with the initial catalog, if configured.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            tracing::warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name,
                err
            );
            None
        }
    }
}

fn load_u64(
    var_name: &str,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
) -> u64 {
    parse_u64_or_default(env_string(var_name), var_name, default, validator, invalid_hint)
}

fn parse_u64_or_default(
    raw: Option<String>,
    var_name: &str,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<u64>() {
        Ok(value) if validator(value) => {
            if value != default {
                tracing::info!("⚙️ {} = {} (default {}).", var_name, value, default);
            }
            value
        }
        Ok(_) => {
            tracing::warn!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name,
                raw,
                invalid_hint,
                default
            );
            default
        }
        Err(err) => {
            tracing::warn!(
                "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                var_name,
                raw,
                err,
                default
            );
            default
        }
    }
}
