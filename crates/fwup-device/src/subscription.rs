//! Cancellable event stream handle.
//!
//! A stream is a worker thread pushing [`StreamMessage`]s through an mpsc
//! channel. The consumer owns the [`Subscription`]; the producer owns the
//! [`EventSink`]. Releasing the subscription flips a shared cancel flag so the
//! producer can stop, and drops the receiver so nothing it sends afterwards is
//! ever observed.

use fwup_error::TransportError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// Progress report emitted while the device prepares the update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmwarePrepareEvent {
    pub progress: f64,
    #[serde(default)]
    pub displayed_on_device: bool,
}

impl FirmwarePrepareEvent {
    pub fn new(progress: f64, displayed_on_device: bool) -> Self {
        Self {
            progress,
            displayed_on_device,
        }
    }
}

/// One item delivered by an event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Next(FirmwarePrepareEvent),
    Complete,
    Error(TransportError),
}

impl StreamMessage {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamMessage::Next(_))
    }
}

/// Consumer half of an event stream.
///
/// At most one terminal message is ever returned; after it (or after
/// [`Subscription::unsubscribe`]) every read yields `None`.
#[derive(Debug)]
pub struct Subscription {
    label: String,
    rx: Option<Receiver<StreamMessage>>,
    cancel: Arc<AtomicBool>,
}

impl Subscription {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Non-blocking read.
    pub fn try_next(&mut self) -> Option<StreamMessage> {
        let result = self.rx.as_ref()?.try_recv();
        match result {
            Ok(msg) => Some(self.observe(msg)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.producer_vanished()),
        }
    }

    /// Wait up to `timeout` for the next message.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<StreamMessage> {
        let result = self.rx.as_ref()?.recv_timeout(timeout);
        match result {
            Ok(msg) => Some(self.observe(msg)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.producer_vanished()),
        }
    }

    /// Release the stream. Idempotent.
    pub fn unsubscribe(&mut self) {
        if self.rx.take().is_some() {
            self.cancel.store(true, Ordering::SeqCst);
            log::debug!("{}: subscription released", self.label);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }

    fn observe(&mut self, msg: StreamMessage) -> StreamMessage {
        if msg.is_terminal() {
            self.unsubscribe();
        }
        msg
    }

    fn producer_vanished(&mut self) -> StreamMessage {
        log::warn!("{}: event stream closed without completing", self.label);
        self.unsubscribe();
        StreamMessage::Error(TransportError::Protocol(format!(
            "{} stream closed without completing",
            self.label
        )))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Producer half of an event stream.
///
/// `complete` and `error` consume the sink, so a producer cannot emit more
/// than one terminal message.
#[derive(Debug)]
pub struct EventSink {
    tx: Sender<StreamMessage>,
    cancel: Arc<AtomicBool>,
}

impl EventSink {
    /// Emit a progress event. Returns `false` once the consumer is gone.
    pub fn next(&self, event: FirmwarePrepareEvent) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.tx.send(StreamMessage::Next(event)).is_ok()
    }

    pub fn complete(self) {
        if !self.is_cancelled() {
            let _ = self.tx.send(StreamMessage::Complete);
        }
    }

    pub fn error(self, err: TransportError) {
        if !self.is_cancelled() {
            let _ = self.tx.send(StreamMessage::Error(err));
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }
}

/// Create a connected sink/subscription pair.
pub fn channel(label: impl Into<String>) -> (EventSink, Subscription) {
    let (tx, rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let sink = EventSink {
        tx,
        cancel: Arc::clone(&cancel),
    };
    let sub = Subscription {
        label: label.into(),
        rx: Some(rx),
        cancel,
    };
    (sink, sub)
}

/// Run `producer` on a worker thread and hand back the consumer half.
pub fn spawn_stream<F>(label: impl Into<String>, producer: F) -> Subscription
where
    F: FnOnce(EventSink) + Send + 'static,
{
    let (sink, sub) = channel(label);
    std::thread::spawn(move || producer(sink));
    sub
}
