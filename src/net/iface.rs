//! Network interface lookup.
//!
//! Maps logical interface names from the configuration to the OS interface
//! index and a usable IPv4 source address. The binding table is built once
//! per server start; names that fail to resolve are left out, and dials for
//! them proceed without forcing an interface.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

use serde::Serialize;

use crate::error::{Error, Result};

/// Resolved egress parameters for one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceBinding {
    /// Interface name as configured
    pub name: String,
    /// OS interface index
    pub index: u32,
    /// First non-loopback IPv4 address of the interface
    pub source_ip: Option<Ipv4Addr>,
}

/// An interface as reported by the OS.
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceInfo {
    /// Interface name
    pub name: String,
    /// OS interface index
    pub index: u32,
    /// Assigned IP addresses
    pub addresses: Vec<IpAddr>,
}

/// Looks up interfaces by name.
pub trait InterfaceResolver: Send + Sync {
    /// Resolve `name` to its index and source address.
    fn resolve(&self, name: &str) -> Result<InterfaceBinding>;
}

/// Resolver backed by the OS interface table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl SystemInterfaces {
    /// List all interfaces that carry at least one IP address.
    pub fn list(&self) -> Result<Vec<InterfaceInfo>> {
        let mut interfaces: Vec<InterfaceInfo> = Vec::new();

        for (name, addr) in sys::interface_addresses()? {
            let Some(addr) = addr else { continue };
            match interfaces.iter_mut().find(|i| i.name == name) {
                Some(info) => info.addresses.push(addr),
                None => {
                    let index = sys::interface_index(&name).unwrap_or(0);
                    interfaces.push(InterfaceInfo {
                        name,
                        index,
                        addresses: vec![addr],
                    });
                }
            }
        }

        interfaces.sort_by_key(|i| i.index);
        Ok(interfaces)
    }
}

impl InterfaceResolver for SystemInterfaces {
    fn resolve(&self, name: &str) -> Result<InterfaceBinding> {
        let index = sys::interface_index(name)
            .map_err(|e| Error::interface(format!("{}: {}", name, e)))?;

        // An interface without readable addresses is still bindable by index.
        let source_ip = match sys::interface_addresses() {
            Ok(addrs) => addrs
                .into_iter()
                .filter(|(n, _)| n == name)
                .find_map(|(_, addr)| match addr {
                    Some(IpAddr::V4(v4)) if !v4.is_loopback() => Some(v4),
                    _ => None,
                }),
            Err(e) => {
                tracing::debug!("Cannot read addresses of {}: {}", name, e);
                None
            }
        };

        Ok(InterfaceBinding {
            name: name.to_string(),
            index,
            source_ip,
        })
    }
}

/// Logical interface name to resolved binding, fixed for one server run.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    entries: HashMap<String, InterfaceBinding>,
}

impl BindingTable {
    /// Resolve every non-empty name. Failures are logged and skipped.
    pub fn build<'a, I>(names: I, resolver: &dyn InterfaceResolver) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries = HashMap::new();

        for name in names {
            if name.is_empty() || entries.contains_key(name) {
                continue;
            }
            match resolver.resolve(name) {
                Ok(binding) => {
                    tracing::debug!(
                        "Interface {} -> index {}, source {:?}",
                        name,
                        binding.index,
                        binding.source_ip
                    );
                    entries.insert(name.to_string(), binding);
                }
                Err(e) => {
                    tracing::warn!("Interface {} unavailable, dialing unbound: {}", name, e);
                }
            }
        }

        Self { entries }
    }

    /// Binding for a logical interface name.
    pub fn get(&self, name: &str) -> Option<&InterfaceBinding> {
        self.entries.get(name)
    }

    /// Number of resolved interfaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no interface resolved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
mod sys {
    use std::ffi::{CStr, CString};
    use std::io;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use std::ptr;

    pub fn interface_index(name: &str) -> io::Result<u32> {
        let c_name = CString::new(name)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name contains NUL"))?;
        let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
        if index == 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(index)
        }
    }

    /// All (interface name, address) pairs; non-IP entries carry `None`.
    pub fn interface_addresses() -> io::Result<Vec<(String, Option<IpAddr>)>> {
        let mut head: *mut libc::ifaddrs = ptr::null_mut();
        if unsafe { libc::getifaddrs(&mut head) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut out = Vec::new();
        let mut cursor = head;
        while !cursor.is_null() {
            let entry = unsafe { &*cursor };
            if !entry.ifa_name.is_null() {
                let name = unsafe { CStr::from_ptr(entry.ifa_name) }
                    .to_string_lossy()
                    .into_owned();
                let addr = unsafe { sockaddr_ip(entry.ifa_addr) };
                out.push((name, addr));
            }
            cursor = entry.ifa_next;
        }

        unsafe { libc::freeifaddrs(head) };
        Ok(out)
    }

    unsafe fn sockaddr_ip(sa: *const libc::sockaddr) -> Option<IpAddr> {
        if sa.is_null() {
            return None;
        }
        match i32::from((*sa).sa_family) {
            libc::AF_INET => {
                let sin = &*(sa as *const libc::sockaddr_in);
                Some(IpAddr::V4(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr))))
            }
            libc::AF_INET6 => {
                let sin6 = &*(sa as *const libc::sockaddr_in6);
                Some(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)))
            }
            _ => None,
        }
    }
}

#[cfg(not(unix))]
mod sys {
    use std::io;
    use std::net::IpAddr;

    pub fn interface_index(_name: &str) -> io::Result<u32> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "interface lookup is not supported on this platform",
        ))
    }

    pub fn interface_addresses() -> io::Result<Vec<(String, Option<IpAddr>)>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedInterfaces;

    impl InterfaceResolver for FixedInterfaces {
        fn resolve(&self, name: &str) -> Result<InterfaceBinding> {
            match name {
                "en0" => Ok(InterfaceBinding {
                    name: name.into(),
                    index: 4,
                    source_ip: Some(Ipv4Addr::new(192, 168, 1, 20)),
                }),
                "utun3" => Ok(InterfaceBinding {
                    name: name.into(),
                    index: 12,
                    source_ip: None,
                }),
                _ => Err(Error::interface(format!("{}: no such interface", name))),
            }
        }
    }

    #[test]
    fn test_binding_table_skips_empty_and_unknown() {
        let table = BindingTable::build(["en0", "", "missing0", "utun3"], &FixedInterfaces);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("en0").map(|b| b.index), Some(4));
        assert_eq!(table.get("utun3").and_then(|b| b.source_ip), None);
        assert!(table.get("missing0").is_none());
        assert!(table.get("").is_none());
    }

    #[test]
    fn test_binding_table_deduplicates() {
        let table = BindingTable::build(["en0", "en0", "en0"], &FixedInterfaces);
        assert_eq!(table.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_unknown_interface() {
        let result = SystemInterfaces.resolve("definitely-not-an-iface0");
        assert!(result.is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_system_loopback_has_no_source_ip() {
        let binding = SystemInterfaces.resolve("lo").unwrap();
        assert!(binding.index > 0);
        assert_eq!(binding.source_ip, None);
    }
}
