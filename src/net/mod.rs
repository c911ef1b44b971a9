//! Interface resolution and interface-bound outbound dialing.

pub mod bind;
pub mod dial;
pub mod iface;

pub use bind::{platform_binder, EgressBinder, SourceOnlyBinder};
pub use dial::{BoundDialer, Dialer};
pub use iface::{BindingTable, InterfaceBinding, InterfaceInfo, InterfaceResolver, SystemInterfaces};
