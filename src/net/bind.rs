//! Egress interface binding.
//!
//! Forcing a socket onto an interface is platform specific: Apple systems
//! take the interface index through `IP_BOUND_IF` / `IPV6_BOUND_IF`, Linux
//! takes the device name through `SO_BINDTODEVICE`. Platforms with neither
//! fall back to binding the source address only.

use std::fmt::Debug;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use socket2::SockRef;

use super::iface::InterfaceBinding;

/// Forces an outbound socket to leave through a specific interface.
pub trait EgressBinder: Send + Sync + Debug {
    /// Apply the interface option to `socket` before it connects to `target`.
    fn bind_interface(
        &self,
        socket: &SockRef<'_>,
        target: SocketAddr,
        binding: &InterfaceBinding,
    ) -> io::Result<()>;
}

/// Binds by interface index (`IP_BOUND_IF` / `IPV6_BOUND_IF`).
#[cfg(any(target_os = "macos", target_os = "ios"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundIfBinder;

#[cfg(any(target_os = "macos", target_os = "ios"))]
impl EgressBinder for BoundIfBinder {
    fn bind_interface(
        &self,
        socket: &SockRef<'_>,
        target: SocketAddr,
        binding: &InterfaceBinding,
    ) -> io::Result<()> {
        let index = std::num::NonZeroU32::new(binding.index);
        if target.is_ipv6() {
            socket.bind_device_by_index_v6(index)
        } else {
            socket.bind_device_by_index_v4(index)
        }
    }
}

/// Binds by device name (`SO_BINDTODEVICE`).
#[cfg(any(target_os = "linux", target_os = "android"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceBinder;

#[cfg(any(target_os = "linux", target_os = "android"))]
impl EgressBinder for DeviceBinder {
    fn bind_interface(
        &self,
        socket: &SockRef<'_>,
        _target: SocketAddr,
        binding: &InterfaceBinding,
    ) -> io::Result<()> {
        // One option covers both address families.
        socket.bind_device(Some(binding.name.as_bytes()))
    }
}

/// Leaves interface selection to the routing table; only the source
/// address is bound by the dialer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceOnlyBinder;

impl EgressBinder for SourceOnlyBinder {
    fn bind_interface(
        &self,
        _socket: &SockRef<'_>,
        _target: SocketAddr,
        _binding: &InterfaceBinding,
    ) -> io::Result<()> {
        Ok(())
    }
}

/// The binder for the platform this crate was built for.
pub fn platform_binder() -> Arc<dyn EgressBinder> {
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        Arc::new(BoundIfBinder)
    }
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        Arc::new(DeviceBinder)
    }
    #[cfg(not(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "linux",
        target_os = "android"
    )))]
    {
        Arc::new(SourceOnlyBinder)
    }
}
