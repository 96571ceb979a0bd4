//! Validated host addresses and fleet targets

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a DNS hostname
const MAX_HOSTNAME_LEN: usize = 253;
/// Maximum length of a single hostname label
const MAX_LABEL_LEN: usize = 63;

/// Errors produced while validating a host address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid host address {input:?}: {reason}")]
pub struct AddrError {
    /// The rejected input
    pub input: String,
    /// Why it was rejected
    pub reason: &'static str,
}

impl AddrError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// A syntactically valid host identifier: an IPv4/IPv6 literal or an
/// RFC 1123 hostname.
///
/// Holding a `HostAddr` means the value contains no whitespace, quotes,
/// separators or other shell metacharacters, so executors can hand it to a
/// transport without further escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostAddr(String);

impl HostAddr {
    /// Validate and wrap a host identifier
    ///
    /// # Errors
    /// Returns `AddrError` if `input` is neither an IP literal nor a
    /// well-formed hostname.
    pub fn parse(input: &str) -> Result<Self, AddrError> {
        if input.is_empty() {
            return Err(AddrError::new(input, "address is empty"));
        }

        // Canonical form, so `FE80::1` and `fe80::1` compare equal
        if let Ok(ip) = input.parse::<IpAddr>() {
            return Ok(Self(ip.to_string()));
        }

        validate_hostname(input)?;
        Ok(Self(input.to_ascii_lowercase()))
    }

    /// Borrow the address as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the address is an IP literal rather than a hostname
    #[must_use]
    pub fn is_ip(&self) -> bool {
        self.0.parse::<IpAddr>().is_ok()
    }
}

fn validate_hostname(input: &str) -> Result<(), AddrError> {
    if input.len() > MAX_HOSTNAME_LEN {
        return Err(AddrError::new(input, "hostname longer than 253 characters"));
    }

    let mut all_numeric = true;

    for label in input.split('.') {
        if label.is_empty() {
            return Err(AddrError::new(input, "empty hostname label"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(AddrError::new(input, "hostname label longer than 63 characters"));
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return Err(AddrError::new(
                input,
                "hostnames may only contain letters, digits, '-' and '.'",
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(AddrError::new(input, "hostname label starts or ends with '-'"));
        }
        if !label.bytes().all(|b| b.is_ascii_digit()) {
            all_numeric = false;
        }
    }

    // "300.1.1.1" is a broken IP literal, not a hostname
    if all_numeric {
        return Err(AddrError::new(input, "malformed IP address"));
    }

    Ok(())
}

impl TryFrom<String> for HostAddr {
    type Error = AddrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HostAddr> for String {
    fn from(addr: HostAddr) -> Self {
        addr.0
    }
}

impl AsRef<str> for HostAddr {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single remotely controllable machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Display name, e.g. `Lab-PC-01`
    pub name: String,
    /// Network address the power command is sent to
    pub address: HostAddr,
}

impl Target {
    /// Create a target from a name and an already validated address
    pub fn new(name: impl Into<String>, address: HostAddr) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }

    /// `name (address)`, the form used in audit records and status messages
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} ({})", self.name, self.address)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}
