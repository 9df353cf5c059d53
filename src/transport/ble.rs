//! Bluetooth Low Energy transport implementation.
//!
//! Bluetti devices expose a vendor GATT service (`0xff00`) with one
//! characteristic for request writes and one for response notifications.
//! Notifications are forwarded from a background task to the subscribed
//! sink.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bluest::{Adapter, Characteristic, Device, Service};
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::{Discovery, NotificationSink, SERVICE_UUID, Transport};

/// Default time to scan for an advertising device.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

fn link_error(message: impl Into<String>) -> Error {
    Error::Link {
        message: message.into(),
    }
}

fn matches_address(device: &Device, address: &str) -> bool {
    device.id().to_string().eq_ignore_ascii_case(address)
}

/// Resolves BLE addresses through the default adapter.
#[derive(Clone)]
pub struct BleDiscovery {
    adapter: Adapter,
    scan_timeout: Duration,
}

impl BleDiscovery {
    /// Opens the default adapter and waits for it to become available.
    ///
    /// # Errors
    ///
    /// Returns an error if no adapter exists or it cannot be powered.
    pub async fn new() -> Result<Self> {
        let adapter = Adapter::default()
            .await
            .ok_or_else(|| link_error("default adapter not found"))?;
        adapter.wait_available().await?;

        Ok(Self {
            adapter,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        })
    }

    /// Sets how long to scan for an advertising device.
    #[must_use]
    pub const fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    async fn find(&self, address: &str) -> Result<Option<Device>> {
        if let Some(device) = self
            .adapter
            .connected_devices()
            .await?
            .into_iter()
            .find(|d| matches_address(d, address))
        {
            return Ok(Some(device));
        }

        let services = [SERVICE_UUID];
        let mut scan = self.adapter.scan(&services).await?;
        let found = tokio::time::timeout(self.scan_timeout, async {
            while let Some(advertising) = scan.next().await {
                if matches_address(&advertising.device, address) {
                    return Some(advertising.device);
                }
            }
            None
        })
        .await
        .unwrap_or(None);

        Ok(found)
    }
}

impl Discovery for BleDiscovery {
    type Transport = BleTransport;

    fn resolve<'a>(
        &'a self,
        address: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Self::Transport>> + Send + 'a>> {
        Box::pin(async move {
            match self.find(address).await {
                Ok(Some(device)) => Some(BleTransport::new(self.adapter.clone(), device)),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!("device lookup failed for {}: {}", address, e);
                    None
                }
            }
        })
    }
}

/// BLE transport for one Bluetti device.
pub struct BleTransport {
    adapter: Adapter,
    device: Device,
    service: Option<Service>,
    characteristics: HashMap<Uuid, Characteristic>,
    notify_task: Option<JoinHandle<()>>,
}

impl BleTransport {
    /// Creates a transport for an already discovered device.
    #[must_use]
    pub fn new(adapter: Adapter, device: Device) -> Self {
        Self {
            adapter,
            device,
            service: None,
            characteristics: HashMap::new(),
            notify_task: None,
        }
    }

    async fn characteristic(&mut self, uuid: Uuid) -> Result<Characteristic> {
        if let Some(characteristic) = self.characteristics.get(&uuid) {
            return Ok(characteristic.clone());
        }

        let service = self.service.as_ref().ok_or(Error::NotConnected)?;
        let characteristic = service
            .discover_characteristics_with_uuid(uuid)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| link_error(format!("characteristic {uuid} not found")))?;

        self.characteristics.insert(uuid, characteristic.clone());
        Ok(characteristic)
    }
}

impl Transport for BleTransport {
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.service.is_some() {
                return Ok(());
            }

            tracing::info!("connecting to {}", self.device.id());
            self.adapter.connect_device(&self.device).await?;

            let service = self
                .device
                .discover_services_with_uuid(SERVICE_UUID)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| link_error("device does not expose the Bluetti service"))?;
            self.service = Some(service);

            tracing::info!("connected to {}", self.device.id());
            Ok(())
        })
    }

    fn subscribe(
        &mut self,
        characteristic: Uuid,
        sink: NotificationSink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let characteristic = self.characteristic(characteristic).await?;
            let (ready_tx, ready_rx) = oneshot::channel();

            let task = tokio::spawn(async move {
                let mut stream = match characteristic.notify().await {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while let Some(item) = stream.next().await {
                    match item {
                        Ok(data) => sink(&data),
                        Err(e) => {
                            tracing::warn!("notification error: {}", e);
                            break;
                        }
                    }
                }
                tracing::debug!("notification stream ended");
            });
            if let Some(previous) = self.notify_task.replace(task) {
                previous.abort();
            }

            ready_rx
                .await
                .map_err(|_| link_error("notification task ended before subscribing"))??;
            Ok(())
        })
    }

    fn write(
        &mut self,
        characteristic: Uuid,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let characteristic = self.characteristic(characteristic).await?;
            tracing::trace!("TX: {}", hex::encode(&data));
            characteristic.write(&data).await?;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if let Some(task) = self.notify_task.take() {
                task.abort();
            }
            self.characteristics.clear();
            self.service = None;

            if self.device.is_connected().await {
                tracing::info!("disconnecting from {}", self.device.id());
                self.adapter.disconnect_device(&self.device).await?;
            }
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.service.is_some()
    }
}
