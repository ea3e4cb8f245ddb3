//! A multiplexed ADS/AMS client for TwinCAT PLCs.
//!
//! One long-lived TCP connection carries any number of interleaved
//! requests, correlated by invoke id, plus server-pushed device
//! notifications. On top of that transport sit the symbol and data-type
//! caches, a name resolver for paths like `MAIN.sensors[2].temperature`,
//! a typed value codec, and an optional auto-reconnect flow that replays
//! subscriptions transparently.
//!
//! ```no_run
//! use adstc_client::{Client, ClientOptions};
//!
//! # async fn demo() -> Result<(), adstc_client::ClientError> {
//! let opts = ClientOptions::new("172.16.17.10:48898", "172.16.17.10.1.1".parse().unwrap());
//! let client = Client::connect(opts).await?;
//!
//! let value = client.read_value("MAIN.motor.speed").await?;
//! println!("speed = {value:?}");
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod notify;
pub mod options;
pub mod resolve;
pub mod state;
pub mod symbols;
mod transport;
pub mod types;
pub mod value;

pub use client::{Client, DeviceInfo, Subscription, SubscriptionOptions};
pub use error::{ClientError, ErrorCategory};
pub use notify::Notification;
pub use options::{AMS_TCP_PORT, ClientOptions, DEFAULT_SOURCE_PORT, DEFAULT_TARGET_PORT};
pub use resolve::Locator;
pub use state::ConnectionState;
pub use symbols::Symbol;
pub use types::{ArrayDim, Field, TypeDescriptor, TypeKind};
pub use value::{PlcValue, decode_value, encode_value};
