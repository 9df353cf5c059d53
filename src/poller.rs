//! Poll cycle orchestration and scheduling.
//!
//! A [`Poller`] runs one cycle per tick: resolve the device, open a
//! [`Session`], issue the model's polling commands in order and merge the
//! decoded fields into a [`Snapshot`]. Cycles never fail; an unusable cycle
//! yields `None` and the last published snapshot stays current.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::catalog::{DeviceModel, build_device};
use crate::config::PollConfig;
use crate::error::{Error, FrameError, Result};
use crate::protocol::Command;
use crate::session::Session;
use crate::transport::Discovery;
use crate::types::Snapshot;

/// Polls one device through a [`Discovery`] implementation.
pub struct Poller<D> {
    discovery: D,
    config: PollConfig,
    model: Option<DeviceModel>,
}

impl<D: Discovery + 'static> Poller<D> {
    /// Creates a poller, looking up the device model from the configured name.
    #[must_use]
    pub fn new(discovery: D, config: PollConfig) -> Self {
        let model = build_device(config.address.clone(), &config.name);
        if model.is_none() {
            tracing::warn!("no device model matches name {:?}", config.name);
        }

        Self {
            discovery,
            config,
            model,
        }
    }

    /// Returns the device model, if the name was recognized.
    #[must_use]
    pub const fn model(&self) -> Option<&DeviceModel> {
        self.model.as_ref()
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Runs one poll cycle with the model's polling commands.
    pub async fn run_cycle(&self) -> Option<Snapshot> {
        let Some(model) = &self.model else {
            tracing::error!("device type not found: {}", self.config.name);
            return None;
        };
        self.run_commands(model.polling_commands()).await
    }

    /// Runs one poll cycle issuing `commands` in order.
    ///
    /// Returns `None` if the device is unknown, cannot be resolved, or the
    /// connection cannot be opened in time. Otherwise returns every field
    /// decoded before the cycle ended, which may be none at all.
    pub async fn run_commands(&self, commands: &[Command]) -> Option<Snapshot> {
        tracing::debug!("polling data");
        let Some(model) = &self.model else {
            tracing::error!("device type not found: {}", self.config.name);
            return None;
        };

        let Some(transport) = self.discovery.resolve(&self.config.address).await else {
            tracing::error!("device not available: {}", self.config.address);
            return None;
        };

        let mut session = Session::new(transport, &self.config);
        let outcome = AssertUnwindSafe(self.poll(&mut session, model, commands))
            .catch_unwind()
            .await;
        session.close().await;

        outcome.unwrap_or_else(|_| {
            tracing::error!("poll cycle panicked");
            None
        })
    }

    async fn poll(
        &self,
        session: &mut Session<D::Transport>,
        model: &DeviceModel,
        commands: &[Command],
    ) -> Option<Snapshot> {
        if !self.open(session).await {
            return None;
        }

        let mut snapshot = Snapshot::new();
        for command in commands {
            let result = session.send(command).await.and_then(|response| {
                model
                    .decode_response(command, &response)
                    .map_err(Error::from)
            });

            match result {
                Ok(fields) => {
                    tracing::debug!("parsed {} fields from {}", fields.len(), command);
                    snapshot.merge(fields);
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("skipping {}: {}", command, e);
                }
                Err(e) => {
                    tracing::warn!("abandoning cycle after {}: {}", command, e);
                    break;
                }
            }
        }

        Some(snapshot)
    }

    /// Opens `session` within the connect timeout.
    async fn open(&self, session: &mut Session<D::Transport>) -> bool {
        match tokio::time::timeout(self.config.connect_timeout, session.open()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!("{}", e);
                false
            }
            Err(_) => {
                tracing::error!("polling timed out connecting to {}", self.config.address);
                false
            }
        }
    }

    /// Writes a raw value to a writable field in a dedicated session.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is unknown or read-only, the device
    /// cannot be reached in time, or the acknowledgement does not echo the
    /// request.
    pub async fn write_field(&self, field: &str, value: u16) -> Result<()> {
        let model = self.model.as_ref().ok_or_else(|| Error::UnknownDevice {
            name: self.config.name.clone(),
        })?;
        let command = model.write_command(field, value)?;

        let transport = self
            .discovery
            .resolve(&self.config.address)
            .await
            .ok_or_else(|| Error::DeviceUnavailable {
                address: self.config.address.clone(),
            })?;

        let mut session = Session::new(transport, &self.config);
        let result = async {
            tokio::time::timeout(self.config.connect_timeout, session.open())
                .await
                .map_err(|_| {
                    Error::Connection(Box::new(Error::timeout(self.config.connect_timeout)))
                })??;
            session.send(&command).await
        }
        .await;
        session.close().await;

        let echo = result?;
        if echo != *command.as_bytes() {
            tracing::trace!("unexpected write echo: {}", hex::encode(&echo));
            return Err(FrameError::EchoMismatch.into());
        }

        tracing::info!("set {} to {}", field, value);
        Ok(())
    }

    /// Polls on the configured interval until the receiver is dropped.
    ///
    /// Only successful cycles are published; a failed cycle leaves the
    /// previous snapshot in place.
    pub async fn run(self, tx: watch::Sender<Option<Snapshot>>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = tx.closed() => break,
                _ = interval.tick() => {}
            }

            match self.run_cycle().await {
                Some(snapshot) => {
                    if tx.send(Some(snapshot)).is_err() {
                        break;
                    }
                }
                None => tracing::debug!("keeping previous snapshot"),
            }
        }

        tracing::debug!("poller stopped");
    }

    /// Spawns [`Poller::run`] on the current runtime.
    ///
    /// Returns a receiver of the latest snapshot, `None` until the first
    /// successful cycle.
    #[must_use]
    pub fn spawn(self) -> (watch::Receiver<Option<Snapshot>>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(self.run(tx));
        (rx, task)
    }
}
