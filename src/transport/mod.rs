//! Transport layer for Bluetti communication.
//!
//! This module provides the abstraction over the physical link. The
//! Bluetooth Low Energy implementation lives behind the `ble` feature.

#[cfg(feature = "ble")]
pub mod ble;
#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;

use crate::error::Result;

/// GATT service exposing the Modbus characteristics.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_ff00_0000_1000_8000_0080_5f9b_34fb);

/// Characteristic delivering response notifications.
pub const NOTIFY_UUID: Uuid = Uuid::from_u128(0x0000_ff01_0000_1000_8000_0080_5f9b_34fb);

/// Characteristic accepting request frames.
pub const WRITE_UUID: Uuid = Uuid::from_u128(0x0000_ff02_0000_1000_8000_0080_5f9b_34fb);

/// Callback receiving raw notification chunks.
///
/// Invoked from the transport's own task, concurrently with writers.
pub type NotificationSink = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Trait for transport implementations.
pub trait Transport: Send {
    /// Connects to the device.
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Routes notifications of `characteristic` to `sink`.
    fn subscribe(
        &mut self,
        characteristic: Uuid,
        sink: NotificationSink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Writes data to `characteristic`.
    fn write(
        &mut self,
        characteristic: Uuid,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Disconnects from the device.
    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;
}

/// Resolves a device address to a transport that can reach it.
pub trait Discovery: Send + Sync {
    /// Transport produced for a resolved device.
    type Transport: Transport + 'static;

    /// Looks up `address`, returning `None` if the device is not reachable.
    fn resolve<'a>(
        &'a self,
        address: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Self::Transport>> + Send + 'a>>;
}

#[cfg(feature = "ble")]
pub use ble::{BleDiscovery, BleTransport};
