//! Connection lifecycle for one poll cycle.
//!
//! A [`Session`] owns the transport for the duration of a cycle: it connects,
//! routes notifications into a [`Correlator`], sends commands one at a time
//! and releases the link exactly once. A session dropped without
//! [`Session::close`] disconnects in the background.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use uuid::Uuid;

use crate::config::PollConfig;
use crate::correlator::Correlator;
use crate::error::{Error, Result};
use crate::protocol::{Command, frame};
use crate::transport::{NotificationSink, Transport};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet connected.
    Idle,
    /// Connecting and subscribing.
    Connecting,
    /// Ready to send commands.
    Subscribed,
    /// Writing a request.
    Requesting,
    /// Waiting for the response to the last request.
    AwaitingResponse,
    /// Releasing the link.
    Disconnecting,
    /// Link released.
    Closed,
}

/// A single connection to a device.
pub struct Session<T: Transport + 'static> {
    transport: Option<T>,
    correlator: Arc<Correlator>,
    state: SessionState,
    write_characteristic: Uuid,
    notify_characteristic: Uuid,
    response_timeout: Duration,
}

impl<T: Transport + 'static> Session<T> {
    /// Creates an idle session over `transport`.
    #[must_use]
    pub fn new(transport: T, config: &PollConfig) -> Self {
        Self {
            transport: Some(transport),
            correlator: Arc::new(Correlator::new()),
            state: SessionState::Idle,
            write_characteristic: config.write_characteristic,
            notify_characteristic: config.notify_characteristic,
            response_timeout: config.response_timeout,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Connects and subscribes the correlator to response notifications.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the device cannot be reached or the
    /// subscription fails. The session must still be closed.
    pub async fn open(&mut self) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        self.state = SessionState::Connecting;

        transport
            .connect()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let correlator = Arc::clone(&self.correlator);
        let sink: NotificationSink = Arc::new(move |chunk: &[u8]| correlator.on_bytes(chunk));
        transport
            .subscribe(self.notify_characteristic, sink)
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        self.state = SessionState::Subscribed;
        tracing::debug!("session subscribed to {}", self.notify_characteristic);
        Ok(())
    }

    /// Sends `command` and waits for its validated response frame.
    ///
    /// # Errors
    ///
    /// - [`Error::TransportFault`] if the link is gone, the write fails or
    ///   the link reports a bad connection; the session should be abandoned
    /// - [`Error::Frame`] on checksum or length errors
    /// - [`Error::DeviceRejected`] on a Modbus exception reply
    /// - [`Error::ResponseTimeout`] if no complete response arrives in time
    pub async fn send(&mut self, command: &Command) -> Result<Bytes> {
        if self.state != SessionState::Subscribed {
            return Err(Error::NotConnected);
        }
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        if !transport.is_connected() {
            return Err(Error::TransportFault(Box::new(Error::NotConnected)));
        }

        self.state = SessionState::Requesting;
        let handle = self.correlator.begin_request(command.clone());
        tracing::debug!("requesting {}", command);

        let request = frame::encode(command);
        tracing::trace!("TX {}: {}", command, hex::encode(&request));
        if let Err(e) = transport.write(self.write_characteristic, request).await {
            self.state = SessionState::Subscribed;
            return Err(Error::TransportFault(Box::new(e)));
        }

        self.state = SessionState::AwaitingResponse;
        let result = Correlator::await_result(handle, self.response_timeout).await;
        self.state = SessionState::Subscribed;

        match result {
            Ok(response) => {
                tracing::debug!("got {} bytes for {}", response.len(), command);
                Ok(response)
            }
            Err(Error::BadConnectionLink) => {
                Err(Error::TransportFault(Box::new(Error::BadConnectionLink)))
            }
            Err(e) => Err(e),
        }
    }

    /// Releases the link.
    ///
    /// Disconnects at most once; later calls do nothing. Safe after a
    /// failed or interrupted [`Session::open`].
    pub async fn close(&mut self) {
        let Some(mut transport) = self.transport.take() else {
            return;
        };

        self.state = SessionState::Disconnecting;
        if let Err(e) = transport.disconnect().await {
            tracing::warn!("disconnect failed: {}", e);
        }
        self.state = SessionState::Closed;
    }
}

impl<T: Transport + 'static> Drop for Session<T> {
    fn drop(&mut self) {
        let Some(mut transport) = self.transport.take() else {
            return;
        };

        tracing::warn!("session dropped while open, disconnecting in background");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = transport.disconnect().await {
                        tracing::warn!("background disconnect failed: {}", e);
                    }
                });
            }
            Err(_) => tracing::error!("no runtime to disconnect on, link leaked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;
    use crate::transport::mock::{MockTransport, Reply};
    use crate::transport::{NOTIFY_UUID, WRITE_UUID};

    const READ_43: &str = "010304005000013be2";

    fn config() -> PollConfig {
        PollConfig::new("AA:BB:CC:DD:EE:FF", "AC3002235000123456")
            .response_timeout(Duration::from_millis(500))
    }

    fn command() -> Command {
        Command::read_holding_registers(43, 2)
    }

    #[tokio::test]
    async fn test_open_send_close() {
        let transport = MockTransport::with_replies([Reply::frame(READ_43)]);
        let mut session = Session::new(transport.clone(), &config());
        assert_eq!(session.state(), SessionState::Idle);

        session.open().await.unwrap();
        assert_eq!(session.state(), SessionState::Subscribed);

        let response = session.send(&command()).await.unwrap();
        assert_eq!(response.as_ref(), hex::decode(READ_43).unwrap());
        assert_eq!(session.state(), SessionState::Subscribed);

        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);

        let state = transport.state();
        assert_eq!(state.writes.len(), 1);
        assert_eq!(state.writes[0].0, WRITE_UUID);
        assert_eq!(state.writes[0].1, command().as_bytes().clone());
        assert_eq!(state.disconnect_calls, 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let transport = MockTransport::default();
        let mut session = Session::new(transport.clone(), &config());
        session.open().await.unwrap();

        session.close().await;
        session.close().await;
        drop(session);

        assert_eq!(transport.state().disconnect_calls, 1);
    }

    #[tokio::test]
    async fn test_open_fails_on_subscribe() {
        let transport = MockTransport::default();
        transport.state().fail_subscribe = true;
        let mut session = Session::new(transport.clone(), &config());

        let err = session.open().await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert_eq!(session.state(), SessionState::Connecting);

        session.close().await;
        assert_eq!(transport.state().connect_calls, 1);
        assert_eq!(transport.state().disconnect_calls, 1);
    }

    #[tokio::test]
    async fn test_send_before_open() {
        let mut session = Session::new(MockTransport::default(), &config());
        assert!(matches!(
            session.send(&command()).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_send_after_link_lost() {
        let transport = MockTransport::with_replies([Reply::frame(READ_43)]);
        let mut session = Session::new(transport.clone(), &config());
        session.open().await.unwrap();
        transport.state().connected = false;

        let err = session.send(&command()).await.unwrap_err();
        assert!(matches!(&err, Error::TransportFault(inner) if matches!(**inner, Error::NotConnected)));
        assert!(!err.is_recoverable());
        assert!(transport.state().writes.is_empty());

        session.close().await;
        assert_eq!(transport.state().disconnect_calls, 1);
    }

    #[tokio::test]
    async fn test_chunked_response() {
        let frame = hex::decode(READ_43).unwrap();
        let transport = MockTransport::with_replies([Reply::Chunks(vec![
            frame[..4].to_vec(),
            frame[4..].to_vec(),
        ])]);
        let mut session = Session::new(transport, &config());
        session.open().await.unwrap();

        let response = session.send(&command()).await.unwrap();
        assert_eq!(response.as_ref(), frame.as_slice());
        session.close().await;
    }

    #[tokio::test]
    async fn test_outcome_mapping() {
        let mut corrupt = hex::decode(READ_43).unwrap();
        corrupt[3] ^= 0x10;
        let transport = MockTransport::with_replies([
            Reply::Chunks(vec![corrupt]),
            Reply::frame("018302c0f1"),
            Reply::Chunks(vec![b"AT+NAME?\r".to_vec()]),
            Reply::WriteError,
        ]);
        let mut session = Session::new(transport, &config());
        session.open().await.unwrap();

        let err = session.send(&command()).await.unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::ChecksumMismatch { .. })));
        assert!(err.is_recoverable());

        let err = session.send(&command()).await.unwrap_err();
        assert!(matches!(err, Error::DeviceRejected { code: 0x02, .. }));
        assert!(err.is_recoverable());

        let err = session.send(&command()).await.unwrap_err();
        assert!(matches!(&err, Error::TransportFault(inner) if matches!(**inner, Error::BadConnectionLink)));
        assert!(!err.is_recoverable());

        let err = session.send(&command()).await.unwrap_err();
        assert!(matches!(err, Error::TransportFault(_)));

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_session_usable() {
        let transport = MockTransport::with_replies([Reply::Silent, Reply::frame(READ_43)]);
        let mut session = Session::new(transport, &config());
        session.open().await.unwrap();

        let err = session.send(&command()).await.unwrap_err();
        assert!(matches!(err, Error::ResponseTimeout { timeout_ms: 500 }));
        assert_eq!(session.state(), SessionState::Subscribed);

        assert!(session.send(&command()).await.is_ok());
        session.close().await;
    }

    #[tokio::test]
    async fn test_drop_without_close_disconnects() {
        let transport = MockTransport::default();
        let mut session = Session::new(transport.clone(), &config());
        session.open().await.unwrap();
        drop(session);

        for _ in 0..10 {
            if transport.state().disconnect_calls == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.state().disconnect_calls, 1);
    }

    #[tokio::test]
    async fn test_custom_characteristics() {
        let config = config().characteristics(NOTIFY_UUID, WRITE_UUID);
        let transport = MockTransport::with_replies([Reply::frame(READ_43)]);
        let mut session = Session::new(transport.clone(), &config);
        session.open().await.unwrap();
        session.send(&command()).await.unwrap();
        session.close().await;

        assert_eq!(transport.state().writes[0].0, NOTIFY_UUID);
    }
}
