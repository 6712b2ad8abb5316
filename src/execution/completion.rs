//! # Completion Handles
//!
//! A [`CompletionHandle`] carries a method call's result back to the caller.
//! `success` and `failure` consume the handle, so a second completion cannot be
//! written. A handle dropped without a result still answers the caller, with
//! [`BridgeError::HandleDropped`], and logs the contract violation.
//!
//! ```rust
//! use bridge_core::execution::CompletionHandle;
//! use uuid::Uuid;
//!
//! let (handle, mut receiver) = CompletionHandle::channel("pick-image", Uuid::new_v4());
//! handle.success("content://media/7");
//! assert_eq!(
//!     receiver.try_result().unwrap().unwrap(),
//!     serde_json::json!("content://media/7")
//! );
//! ```

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::BridgeError;

/// Result of a method call as seen by Rust callers
pub type MethodResult = Result<serde_json::Value, BridgeError>;

/// Wire form of a method result: `{"ok": value}` or `{"error": code, "message": text}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodReply {
    Ok { ok: serde_json::Value },
    Error { error: String, message: String },
}

impl MethodReply {
    pub fn is_ok(&self) -> bool {
        matches!(self, MethodReply::Ok { .. })
    }

    /// Error code, if this is an error reply
    pub fn error_code(&self) -> Option<&str> {
        match self {
            MethodReply::Ok { .. } => None,
            MethodReply::Error { error, .. } => Some(error),
        }
    }
}

impl From<MethodResult> for MethodReply {
    fn from(result: MethodResult) -> Self {
        match result {
            Ok(ok) => MethodReply::Ok { ok },
            Err(e) => MethodReply::Error {
                error: e.code().to_string(),
                message: e.to_string(),
            },
        }
    }
}

type ResultCallback = Box<dyn FnOnce(MethodResult) + Send + 'static>;

// The mutex only makes the handle `Sync` so it can sit in the shared slot; it is never contended
enum CompletionSink {
    Channel(oneshot::Sender<MethodResult>),
    Callback(Mutex<ResultCallback>),
}

/// Single-use completion handle for one method call
pub struct CompletionHandle {
    method: String,
    call_id: Uuid,
    sink: Option<CompletionSink>,
    delivered: Arc<AtomicBool>,
}

impl CompletionHandle {
    /// Create a handle backed by a one-shot channel
    pub fn channel(method: impl Into<String>, call_id: Uuid) -> (Self, CompletionReceiver) {
        let (tx, rx) = oneshot::channel();
        let handle = Self::with_sink(method.into(), call_id, CompletionSink::Channel(tx));
        (handle, CompletionReceiver { inner: rx })
    }

    /// Create a handle that invokes `callback` with the result
    pub fn from_callback<F>(method: impl Into<String>, call_id: Uuid, callback: F) -> Self
    where
        F: FnOnce(MethodResult) + Send + 'static,
    {
        Self::with_sink(
            method.into(),
            call_id,
            CompletionSink::Callback(Mutex::new(Box::new(callback))),
        )
    }

    /// Create a handle that invokes `callback` with the wire-form reply
    pub fn from_reply_callback<F>(method: impl Into<String>, call_id: Uuid, callback: F) -> Self
    where
        F: FnOnce(MethodReply) + Send + 'static,
    {
        Self::from_callback(method, call_id, move |result| {
            callback(MethodReply::from(result))
        })
    }

    fn with_sink(method: String, call_id: Uuid, sink: CompletionSink) -> Self {
        Self {
            method,
            call_id,
            sink: Some(sink),
            delivered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    /// Observer that reports whether this handle has delivered its result
    pub fn probe(&self) -> CompletionProbe {
        CompletionProbe {
            delivered: Arc::clone(&self.delivered),
        }
    }

    pub fn success(self, value: impl Into<serde_json::Value>) {
        self.complete(Ok(value.into()));
    }

    pub fn failure(self, error: BridgeError) {
        self.complete(Err(error));
    }

    pub fn complete(mut self, result: MethodResult) {
        self.deliver(result);
    }

    fn deliver(&mut self, result: MethodResult) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        self.delivered.store(true, Ordering::Release);

        debug!(
            method = %self.method,
            call_id = %self.call_id,
            success = result.is_ok(),
            "Delivering method result"
        );

        match sink {
            CompletionSink::Channel(tx) => {
                if tx.send(result).is_err() {
                    debug!(
                        method = %self.method,
                        call_id = %self.call_id,
                        "Caller stopped waiting before the result arrived"
                    );
                }
            }
            CompletionSink::Callback(callback) => (callback.into_inner())(result),
        }
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        if self.sink.is_some() {
            error!(
                method = %self.method,
                call_id = %self.call_id,
                "Completion handle dropped without a result"
            );
            self.deliver(Err(BridgeError::HandleDropped));
        }
    }
}

impl fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("method", &self.method)
            .field("call_id", &self.call_id)
            .field("delivered", &self.delivered.load(Ordering::Acquire))
            .finish()
    }
}

/// Read-only view of whether a handle has completed
#[derive(Debug, Clone)]
pub struct CompletionProbe {
    delivered: Arc<AtomicBool>,
}

impl CompletionProbe {
    pub fn is_completed(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }
}

/// Receiving side of [`CompletionHandle::channel`]; resolves to the method result
#[derive(Debug)]
pub struct CompletionReceiver {
    inner: oneshot::Receiver<MethodResult>,
}

impl CompletionReceiver {
    /// Non-blocking check; `None` while the operation is still outstanding
    pub fn try_result(&mut self) -> Option<MethodResult> {
        match self.inner.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(BridgeError::HandleDropped)),
        }
    }

    /// Block the current thread until the result arrives. Not for use inside a runtime.
    pub fn blocking_wait(self) -> MethodResult {
        self.inner
            .blocking_recv()
            .unwrap_or(Err(BridgeError::HandleDropped))
    }
}

impl Future for CompletionReceiver {
    type Output = MethodResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(BridgeError::HandleDropped)))
    }
}
