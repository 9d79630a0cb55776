use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use listkit_core::{AppError, AppResult};
use serde_json::Value;
use tokio::sync::{Mutex, Notify};

use crate::{HttpTransport, Notification, Notifier, TransportRequest};

/// Transport replaying scripted responses and recording every request.
pub(crate) struct FakeTransport {
    responses: Mutex<VecDeque<AppResult<Value>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl FakeTransport {
    pub(crate) fn scripted(responses: Vec<AppResult<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: TransportRequest) -> AppResult<Value> {
        self.requests.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Internal("no scripted response left".to_owned())))
    }
}

/// Transport whose first request blocks until [`GatedTransport::release`].
pub(crate) struct GatedTransport {
    gate: Notify,
    responses: Vec<Value>,
    calls: Mutex<usize>,
}

impl GatedTransport {
    pub(crate) fn new(responses: Vec<Value>) -> Self {
        Self {
            gate: Notify::new(),
            responses,
            calls: Mutex::new(0),
        }
    }

    pub(crate) fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl HttpTransport for GatedTransport {
    async fn send(&self, _request: TransportRequest) -> AppResult<Value> {
        let index = {
            let mut calls = self.calls.lock().await;
            let index = *calls;
            *calls += 1;
            index
        };
        if index == 0 {
            self.gate.notified().await;
        }

        self.responses
            .get(index)
            .cloned()
            .ok_or_else(|| AppError::Internal("no scripted response left".to_owned()))
    }
}

/// Notifier that records notifications.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notifications: std::sync::Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(crate) fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|notifications| notifications.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(notification);
        }
    }
}

/// Collects formatted log output of the code run inside [`LogCapture::run`].
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<std::sync::Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub(crate) fn run<T>(&self, action: impl FnOnce() -> T) -> T {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        tracing::subscriber::with_default(subscriber, action)
    }

    pub(crate) fn output(&self) -> String {
        self.buffer
            .lock()
            .map(|buffer| String::from_utf8_lossy(&buffer).into_owned())
            .unwrap_or_default()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.extend_from_slice(bytes);
        }
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
