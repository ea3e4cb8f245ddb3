//! # TwinCAT ADS for Rust
//!
//! A Rust-native client for Beckhoff's ADS/AMS protocol over TCP, with no
//! dependency on the TwinCAT router or `TcAdsDll.dll`.
//!
//! This crate is a facade over two sub-crates:
//!
//! - [`core`] - wire-format primitives, command payloads, and frame I/O.
//! - [`client`] - the connected client: multiplexed transport, symbol and
//!   type resolution, device notifications, auto-reconnect.

pub use adstc_client as client;
pub use adstc_core as core;

pub use adstc_client::{
    Client, ClientError, ClientOptions, ConnectionState, Locator, Notification, PlcValue,
    Subscription, SubscriptionOptions, Symbol, TypeDescriptor, TypeKind,
};
pub use adstc_core::{AmsAddr, AmsNetId, ReturnCode};
