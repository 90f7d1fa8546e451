//! Device identifiers.
//!
//! A device is identified by the source IP address of its multicast
//! datagrams. The port is deliberately not part of the identity: extenders
//! send from ephemeral ports that change across reboots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Identifier for one upstream video source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(IpAddr);

impl DeviceId {
    /// Wrap a source address.
    #[must_use]
    pub fn new(addr: IpAddr) -> Self {
        Self(addr)
    }

    /// Return the source address.
    #[must_use]
    pub fn addr(&self) -> IpAddr {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<IpAddr>().map(Self)
    }
}

impl From<IpAddr> for DeviceId {
    fn from(addr: IpAddr) -> Self {
        Self(addr)
    }
}

impl From<DeviceId> for IpAddr {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}
