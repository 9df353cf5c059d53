//! # bluetti-ble
//!
//! A Rust client library for polling Bluetti power stations over Bluetooth
//! Low Energy.
//!
//! Bluetti devices speak a Modbus RTU dialect over a vendor GATT service:
//! requests are written to one characteristic, responses arrive as chunked
//! notifications on another. This library connects on a fixed schedule,
//! reads the device's register blocks one command at a time, and publishes
//! the decoded fields as a [`Snapshot`].
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - One in-flight request, correlated with notification bytes
//! - Checksum, exception-frame and link-noise detection
//! - Connection released on every exit path of a poll cycle
//! - Register maps for AC200M, AC300 and EB3A
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "ble")]
//! # async fn run() -> Result<(), bluetti_ble::Error> {
//! use bluetti_ble::{BleDiscovery, PollConfig, Poller};
//!
//! let discovery = BleDiscovery::new().await?;
//! let config = PollConfig::new("AA:BB:CC:DD:EE:FF", "AC3002235000123456");
//! let (mut snapshots, _task) = Poller::new(discovery, config).spawn();
//!
//! while snapshots.changed().await.is_ok() {
//!     if let Some(snapshot) = snapshots.borrow().as_ref() {
//!         println!("battery: {:?}", snapshot.get("total_battery_percent"));
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Commands and frame codec (CRC, exceptions, link noise)
//! - [`correlator`] - Single pending request fed by notification chunks
//! - [`transport`] - Transport and discovery traits, BLE implementation
//! - [`session`] - Connection lifecycle for one poll cycle
//! - [`catalog`] - Device models, register maps and field decoding
//! - [`poller`] - Poll cycles and the fixed-interval scheduler
//! - [`types`] - Snapshots and field values

pub mod catalog;
pub mod config;
pub mod correlator;
pub mod error;
pub mod poller;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use catalog::{DeviceModel, Field, FieldKind, build_device};
pub use config::PollConfig;
pub use correlator::{Correlator, ResponseHandle};
pub use error::{DecodeError, Error, FrameError, Result};
pub use poller::Poller;
pub use protocol::{Command, FunctionCode};
pub use session::{Session, SessionState};
#[cfg(feature = "ble")]
pub use transport::{BleDiscovery, BleTransport};
pub use transport::{Discovery, NotificationSink, Transport};
pub use types::{FieldValue, Snapshot};
