//! Scripted in-memory transport for tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::{Discovery, NotificationSink, Transport};

/// What the device does in answer to one write.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Deliver these notification chunks, one task yield apart.
    Chunks(Vec<Vec<u8>>),
    /// Never answer.
    Silent,
    /// Fail the write itself.
    WriteError,
    /// Panic inside the write.
    Panic,
}

impl Reply {
    pub fn frame(hex_frame: &str) -> Self {
        Self::Chunks(vec![hex::decode(hex_frame).unwrap()])
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    pub fail_connect: bool,
    pub hang_connect: bool,
    pub connected: bool,
    pub fail_subscribe: bool,
    pub replies: VecDeque<Reply>,
    pub connect_calls: usize,
    pub disconnect_calls: usize,
    pub writes: Vec<(Uuid, Bytes)>,
}

/// Transport whose behaviour is driven by a shared [`MockState`].
#[derive(Clone, Default)]
pub struct MockTransport {
    pub state: Arc<Mutex<MockState>>,
    sink: Option<NotificationSink>,
}

impl MockTransport {
    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        let transport = Self::default();
        transport.state().replies.extend(replies);
        transport
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let (fail, hang) = {
                let mut state = self.state();
                state.connect_calls += 1;
                (state.fail_connect, state.hang_connect)
            };
            if hang {
                std::future::pending::<()>().await;
            }
            if fail {
                return Err(Error::Link {
                    message: "device out of range".into(),
                });
            }
            self.state().connected = true;
            Ok(())
        })
    }

    fn subscribe(
        &mut self,
        _characteristic: Uuid,
        sink: NotificationSink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.state().fail_subscribe {
                return Err(Error::Link {
                    message: "notify not permitted".into(),
                });
            }
            self.sink = Some(sink);
            Ok(())
        })
    }

    fn write(
        &mut self,
        characteristic: Uuid,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let reply = {
                let mut state = self.state();
                state.writes.push((characteristic, data));
                state.replies.pop_front().unwrap_or(Reply::Silent)
            };

            match reply {
                Reply::WriteError => Err(Error::Link {
                    message: "write failed".into(),
                }),
                Reply::Panic => panic!("transport exploded"),
                Reply::Silent => Ok(()),
                Reply::Chunks(chunks) => {
                    if let Some(sink) = self.sink.clone() {
                        tokio::spawn(async move {
                            for chunk in chunks {
                                tokio::task::yield_now().await;
                                sink(&chunk);
                            }
                        });
                    }
                    Ok(())
                }
            }
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            {
                let mut state = self.state();
                state.disconnect_calls += 1;
                state.connected = false;
            }
            self.sink = None;
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }
}

/// Discovery handing out clones of one mock transport.
pub struct MockDiscovery {
    pub transport: Option<MockTransport>,
}

impl Discovery for MockDiscovery {
    type Transport = MockTransport;

    fn resolve<'a>(
        &'a self,
        _address: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Self::Transport>> + Send + 'a>> {
        Box::pin(async move { self.transport.clone() })
    }
}
