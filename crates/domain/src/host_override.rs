use crate::errors::DomainError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Value side of an operator override: an address record or an alias record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OverrideValue {
    Address(Ipv4Addr),
    Alias(String),
}

impl OverrideValue {
    /// Anything that parses as an IP literal is an address; everything else is
    /// taken as the alias target. Address records are IPv4 only.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DomainError::InvalidRecord("empty override value".to_string()));
        }

        match value.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => Ok(Self::Address(addr)),
            Ok(IpAddr::V6(addr)) => Err(DomainError::InvalidRecord(format!(
                "address overrides must be IPv4, got {}",
                addr
            ))),
            Err(_) => {
                let target = normalize_hostname(value)?;
                Ok(Self::Alias(target))
            }
        }
    }

    pub fn record_type(&self) -> &'static str {
        match self {
            Self::Address(_) => "A",
            Self::Alias(_) => "CNAME",
        }
    }
}

impl fmt::Display for OverrideValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(addr) => write!(f, "{}", addr),
            Self::Alias(target) => write!(f, "{}", target),
        }
    }
}

/// One `hostname=value` pair supplied by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostnameOverride {
    pub hostname: String,
    pub value: OverrideValue,
}

impl HostnameOverride {
    pub fn new(hostname: &str, value: &str) -> Result<Self, DomainError> {
        Ok(Self {
            hostname: normalize_hostname(hostname)?,
            value: OverrideValue::parse(value)?,
        })
    }

    pub fn is_address(&self) -> bool {
        matches!(self.value, OverrideValue::Address(_))
    }
}

impl FromStr for HostnameOverride {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hostname, value) = s.split_once('=').ok_or_else(|| {
            DomainError::InvalidRecord(format!("expected hostname=value, got '{}'", s))
        })?;
        Self::new(hostname, value)
    }
}

impl fmt::Display for HostnameOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.hostname, self.value)
    }
}

/// Lowercases, strips one trailing dot and checks label lengths.
pub fn normalize_hostname(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    let without_dot = trimmed.strip_suffix('.').unwrap_or(trimmed);

    if without_dot.is_empty() {
        return Err(DomainError::InvalidHostname(format!("'{}' is empty", name)));
    }
    if without_dot.len() > MAX_NAME_LEN {
        return Err(DomainError::InvalidHostname(format!(
            "'{}' exceeds {} characters",
            name, MAX_NAME_LEN
        )));
    }

    for label in without_dot.split('.') {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(DomainError::InvalidHostname(format!(
                "'{}' has an invalid label",
                name
            )));
        }
        if label.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(DomainError::InvalidHostname(format!(
                "'{}' contains whitespace",
                name
            )));
        }
    }

    Ok(without_dot.to_ascii_lowercase())
}
