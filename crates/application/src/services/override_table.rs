use dnsproxy_domain::host_override::normalize_hostname;
use dnsproxy_domain::{DomainError, HostnameOverride, OverrideValue};
use hickory_proto::rr::rdata::{A, CNAME};
use hickory_proto::rr::{Name, RData, Record};
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Built-in route answered even when no override is configured.
pub const SENTINEL_HOSTNAME: &str = "local";
pub const SENTINEL_ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 0);

const OVERRIDE_TTL: u32 = 3600;

/// Hostname to fixed answer record.
///
/// Filled before serving starts and read-only afterwards. Lookups pick the
/// most specific registered name that equals the query name or is one of its
/// parent domains.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    records: HashMap<String, Record>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every entry, then the `local` sentinel last so it always wins.
    pub fn from_overrides<'a, I>(entries: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = &'a HostnameOverride>,
    {
        let mut table = Self::new();
        for entry in entries {
            table.register_override(entry)?;
        }
        table.register_sentinel()?;
        Ok(table)
    }

    /// Stores `record` under `hostname`, replacing any earlier registration.
    pub fn register(&mut self, hostname: &str, record: Record) -> Result<(), DomainError> {
        let key = normalize_hostname(hostname)?;
        self.records.insert(key, record);
        Ok(())
    }

    pub fn register_override(&mut self, entry: &HostnameOverride) -> Result<(), DomainError> {
        let record = build_record(entry)?;
        self.register(&entry.hostname, record)
    }

    pub fn register_sentinel(&mut self) -> Result<(), DomainError> {
        let sentinel = HostnameOverride {
            hostname: SENTINEL_HOSTNAME.to_string(),
            value: OverrideValue::Address(SENTINEL_ADDRESS),
        };
        self.register_override(&sentinel)
    }

    pub fn lookup(&self, name: &Name) -> Option<&Record> {
        self.lookup_str(&name.to_ascii())
    }

    pub fn lookup_str(&self, name: &str) -> Option<&Record> {
        let name = name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase();
        let mut candidate = name.as_str();

        loop {
            if candidate.is_empty() {
                return None;
            }
            if let Some(record) = self.records.get(candidate) {
                return Some(record);
            }
            match candidate.split_once('.') {
                Some((_, parent)) => candidate = parent,
                None => return None,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}

/// A record for IPv4 values, a CNAME pointing at the value otherwise.
pub fn build_record(entry: &HostnameOverride) -> Result<Record, DomainError> {
    let owner = fqdn(&entry.hostname)?;
    let rdata = match &entry.value {
        OverrideValue::Address(addr) => RData::A(A(*addr)),
        OverrideValue::Alias(target) => RData::CNAME(CNAME(fqdn(target)?)),
    };
    Ok(Record::from_rdata(owner, OVERRIDE_TTL, rdata))
}

fn fqdn(hostname: &str) -> Result<Name, DomainError> {
    let mut name = Name::from_ascii(hostname)
        .map_err(|e| DomainError::InvalidHostname(format!("{}: {}", hostname, e)))?;
    name.set_fqdn(true);
    Ok(name)
}
