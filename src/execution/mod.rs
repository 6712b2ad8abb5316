//! # Execution Module
//!
//! Method dispatch and asynchronous continuation.
//!
//! A [`MethodCall`] enters through the [`MethodDispatcher`], which selects a
//! [`CommandHandler`] by method name. Synchronous handlers answer the caller's
//! [`CompletionHandle`] immediately. Deferred handlers park it in the
//! [`PendingOperationSlot`] and start an external flow; the host later reports
//! the flow's outcome to the [`ContinuationRouter`], which completes the parked
//! handle exactly once.

pub mod command;
pub mod command_handlers;
pub mod command_router;
pub mod completion;
pub mod continuation_router;
pub mod pending_slot;

pub use command::{BridgeContext, CommandArguments, CommandHandler, CompletionMode, MethodCall};
pub use command_handlers::{PickImageHandler, SocketIssueWarningHandler};
pub use command_router::{DispatchRecord, DispatchStatus, DispatcherStats, MethodDispatcher};
pub use completion::{
    CompletionHandle, CompletionProbe, CompletionReceiver, MethodReply, MethodResult,
};
pub use continuation_router::{
    ContinuationRouter, ContinuationStats, Delivery, DiscardReason, ParkedOperation,
};
pub use pending_slot::{
    PendingMetrics, PendingOperationSlot, PendingRegistration, RequestToken, SlotOccupied,
};
