use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use log::{info, warn};

use crate::free_space::{FitPolicy, SplitRule};
use crate::optimizer::PackingConfig;
use crate::ordering::OrderingKey;
use crate::units::{LengthUnit, conversion_factor};

/// Reads a configuration variable; `None` when unset or blank.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            optimizer: OptimizerConfig::from_env(),
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
    const HOST_VAR: &'static str = "SLAB_OPTIMIZER_API_HOST";
    const PORT_VAR: &'static str = "SLAB_OPTIMIZER_API_PORT";

    fn from_env() -> Self {
        Self::from_lookup(&env_string)
    }

    fn from_lookup(lookup: Lookup<'_>) -> Self {
        let host_value =
            lookup(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match lookup(Self::PORT_VAR) {
            Some(raw) => parse_port(&raw).unwrap_or_else(|reason| {
                warn!(
                    "{} ('{}') {}. Using {}.",
                    Self::PORT_VAR,
                    raw,
                    reason,
                    Self::DEFAULT_PORT
                );
                Self::DEFAULT_PORT
            }),
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

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            display_host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
        }
    }
}

/// Default packing configuration of the service.
///
/// Requests may override every field per call.
#[derive(Clone, Debug, Default)]
pub struct OptimizerConfig {
    packing: PackingConfig,
}

impl OptimizerConfig {
    const SLAB_WIDTH_VAR: &'static str = "SLAB_OPTIMIZER_SLAB_WIDTH";
    const SLAB_HEIGHT_VAR: &'static str = "SLAB_OPTIMIZER_SLAB_HEIGHT";
    const KERF_VAR: &'static str = "SLAB_OPTIMIZER_KERF";
    const UNIT_FACTOR_VAR: &'static str = "SLAB_OPTIMIZER_UNIT_FACTOR";
    const PART_UNIT_VAR: &'static str = "SLAB_OPTIMIZER_PART_UNIT";
    const SLAB_UNIT_VAR: &'static str = "SLAB_OPTIMIZER_SLAB_UNIT";
    const ORDERING_KEY_VAR: &'static str = "SLAB_OPTIMIZER_ORDERING_KEY";
    const FIT_POLICY_VAR: &'static str = "SLAB_OPTIMIZER_FIT_POLICY";
    const SPLIT_RULE_VAR: &'static str = "SLAB_OPTIMIZER_SPLIT_RULE";
    const ALLOW_ROTATION_VAR: &'static str = "SLAB_OPTIMIZER_ALLOW_ROTATION";

    fn from_env() -> Self {
        Self::from_lookup(&env_string)
    }

    fn from_lookup(lookup: Lookup<'_>) -> Self {
        let slab_width = load_f64_with_notice(
            lookup,
            Self::SLAB_WIDTH_VAR,
            PackingConfig::DEFAULT_SLAB_WIDTH,
            |value| value.is_finite() && value > 0.0,
            "must be greater than 0",
            "Custom slab width",
        );

        let slab_height = load_f64_with_notice(
            lookup,
            Self::SLAB_HEIGHT_VAR,
            PackingConfig::DEFAULT_SLAB_HEIGHT,
            |value| value.is_finite() && value > 0.0,
            "must be greater than 0",
            "Custom slab length",
        );

        let kerf = load_f64_with_notice(
            lookup,
            Self::KERF_VAR,
            PackingConfig::DEFAULT_KERF,
            |value| value.is_finite() && value >= 0.0,
            "must not be negative",
            "Custom kerf changes every part footprint",
        );

        let unit_factor = if lookup(Self::UNIT_FACTOR_VAR).is_some() {
            load_f64_with_notice(
                lookup,
                Self::UNIT_FACTOR_VAR,
                PackingConfig::DEFAULT_UNIT_FACTOR,
                |value| value.is_finite() && value > 0.0,
                "must be greater than 0",
                "Custom unit factor, parts and slab must agree on it",
            )
        } else {
            unit_factor_from_units(
                load_enum(lookup, Self::PART_UNIT_VAR, LengthUnit::parse),
                load_enum(lookup, Self::SLAB_UNIT_VAR, LengthUnit::parse),
            )
        };

        let ordering_key = load_enum(lookup, Self::ORDERING_KEY_VAR, OrderingKey::parse)
            .unwrap_or_default();
        let fit_policy =
            load_enum(lookup, Self::FIT_POLICY_VAR, FitPolicy::parse).unwrap_or_default();
        let split_rule =
            load_enum(lookup, Self::SPLIT_RULE_VAR, SplitRule::parse).unwrap_or_default();

        let allow_rotation = lookup(Self::ALLOW_ROTATION_VAR)
            .and_then(|raw| parse_bool(&raw, Self::ALLOW_ROTATION_VAR))
            .unwrap_or(PackingConfig::DEFAULT_ALLOW_ROTATION);

        let packing = PackingConfig::builder()
            .slab(slab_width, slab_height)
            .kerf(kerf)
            .unit_factor(unit_factor)
            .ordering_key(ordering_key)
            .fit_policy(fit_policy)
            .split_rule(split_rule)
            .allow_rotation(allow_rotation)
            .build();

        Self { packing }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
    }
}

impl From<PackingConfig> for OptimizerConfig {
    fn from(packing: PackingConfig) -> Self {
        Self { packing }
    }
}

/// Unit factor from named units; parts default to feet and the slab to inches.
pub(crate) fn unit_factor_from_units(part: Option<LengthUnit>, slab: Option<LengthUnit>) -> f64 {
    match (part, slab) {
        (None, None) => PackingConfig::DEFAULT_UNIT_FACTOR,
        (part, slab) => conversion_factor(
            part.unwrap_or(LengthUnit::Feet),
            slab.unwrap_or(LengthUnit::Inches),
        ),
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
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_port(raw: &str) -> Result<u16, String> {
    match raw.parse::<u16>() {
        Ok(0) => Err("must not be 0".to_string()),
        Ok(value) => Ok(value),
        Err(err) => Err(format!("could not be parsed: {err}")),
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_enum<T>(lookup: Lookup<'_>, var_name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let raw = lookup(var_name)?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!(
            "{} contains unknown value '{}'. Using default value.",
            var_name, raw
        );
    }
    parsed
}

fn load_f64_with_notice(
    lookup: Lookup<'_>,
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    match lookup(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if !validator(value) {
                    warn!(
                        "{} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        info!("{} ({} = {}).", notice, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}
