//! Request/response correlation over the notification channel.
//!
//! BLE notifications carry no request id, so the correlator tracks exactly
//! one pending command. Notification chunks are accumulated until the
//! command's response length is reached, an exception frame is recognized,
//! or the link reports out-of-band noise. The outcome is handed to the
//! waiting sender through a one-shot channel.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::sync::oneshot;

use crate::error::{Error, FrameError, Result};
use crate::protocol::{Command, frame};

/// Outcome delivered to the waiting caller.
type Outcome = Result<Bytes>;

/// The single in-flight request.
#[derive(Debug)]
struct PendingRequest {
    command: Command,
    buffer: BytesMut,
    /// `None` once the result has been settled.
    slot: Option<oneshot::Sender<Outcome>>,
}

impl PendingRequest {
    fn settle(&mut self, outcome: Outcome) {
        if let Some(slot) = self.slot.take() {
            // The receiver may already be gone after a timeout.
            let _ = slot.send(outcome);
        }
    }

    const fn is_settled(&self) -> bool {
        self.slot.is_none()
    }
}

/// Awaitable result of one request.
#[derive(Debug)]
pub struct ResponseHandle {
    rx: oneshot::Receiver<Outcome>,
}

/// Correlates notification bytes with the pending command.
#[derive(Debug, Default)]
pub struct Correlator {
    pending: Mutex<Option<PendingRequest>>,
}

impl Correlator {
    /// Creates a correlator with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingRequest>> {
        // State is consistent after every statement, so a poisoned lock is usable.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts tracking `command`, replacing any previous request.
    ///
    /// A replaced request that never settled is dropped together with its
    /// buffered bytes; its handle then reports the channel as closed.
    pub fn begin_request(&self, command: Command) -> ResponseHandle {
        let (tx, rx) = oneshot::channel();
        let capacity = command.expected_response_len();
        let previous = self.lock().replace(PendingRequest {
            command,
            buffer: BytesMut::with_capacity(capacity),
            slot: Some(tx),
        });

        if let Some(previous) = previous.filter(|p| !p.is_settled()) {
            tracing::debug!(
                "discarding unsettled request {} with {} buffered bytes",
                previous.command,
                previous.buffer.len()
            );
        }

        ResponseHandle { rx }
    }

    /// Feeds one notification chunk.
    ///
    /// Ignored when nothing is pending or the pending result has settled.
    pub fn on_bytes(&self, chunk: &[u8]) {
        let mut guard = self.lock();
        let Some(pending) = guard.as_mut().filter(|p| !p.is_settled()) else {
            tracing::trace!("ignoring unexpected notification: {}", hex::encode(chunk));
            return;
        };

        tracing::trace!("RX notification: {}", hex::encode(chunk));

        if frame::is_bad_connection(chunk) {
            pending.settle(Err(Error::BadConnectionLink));
            return;
        }

        let expected = pending.command.expected_response_len();
        let got = pending.buffer.len() + chunk.len();
        if got > expected {
            pending.settle(Err(FrameError::Overrun { expected, got }.into()));
            return;
        }

        pending.buffer.extend_from_slice(chunk);

        if pending.buffer.len() == expected {
            let outcome = frame::validate(&pending.buffer, &pending.command).map_err(Error::from);
            pending.settle(outcome);
        } else if frame::is_exception_frame(&pending.buffer, &pending.command) {
            let code = frame::exception_code(&pending.buffer);
            let command = pending.command.to_string();
            pending.settle(Err(Error::DeviceRejected { command, code }));
        }
    }

    /// Returns true if a request is pending and not yet settled.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.lock().as_ref().is_some_and(|p| !p.is_settled())
    }

    /// Returns the number of bytes buffered for the pending request.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.lock().as_ref().map_or(0, |p| p.buffer.len())
    }

    /// Waits for the result of `handle` for at most `timeout`.
    ///
    /// Timing out settles nothing: a response completing afterwards is
    /// dropped unread, or discarded by the next `begin_request`.
    pub async fn await_result(handle: ResponseHandle, timeout: Duration) -> Result<Bytes> {
        match tokio::time::timeout(timeout, handle.rx).await {
            Ok(Ok(outcome)) => outcome,
            // A closed channel means a newer request replaced this one.
            Ok(Err(_)) | Err(_) => Err(Error::timeout(timeout)),
        }
    }
}
