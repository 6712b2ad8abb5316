//! # Host Platform Interfaces
//!
//! The bridge never talks to the operating system directly. Deferred flows are
//! launched through an [`ExternalFlowLauncher`] and notifications are posted
//! through a [`NotificationSink`]; the host implements both.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::constants::{picker, result_codes};

/// Action requested from the host when launching an external flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FlowAction {
    /// Let the user pick content of the filtered type from any provider
    GetContent,
    /// Pick an item from a specific collection
    Pick { collection_uri: String },
    /// Present a chooser over the primary request and its alternatives
    Chooser { title: String },
}

impl FlowAction {
    /// Action string the host platform understands
    pub fn host_action(&self) -> &'static str {
        match self {
            FlowAction::GetContent => picker::ACTION_GET_CONTENT,
            FlowAction::Pick { .. } => picker::ACTION_PICK,
            FlowAction::Chooser { .. } => picker::ACTION_CHOOSER,
        }
    }
}

/// A single launchable request (primary or alternative)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowIntent {
    pub action: FlowAction,
    pub data_type_filter: String,
}

/// External flow launch request handed to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRequest {
    pub action: FlowAction,
    pub data_type_filter: String,
    pub request_token: i32,
    /// Primary request wrapped by a chooser
    pub primary: Option<FlowIntent>,
    /// Additional requests offered alongside the primary one
    pub alternatives: Vec<FlowIntent>,
}

/// How an external flow concluded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FlowOutcome {
    Selected { resource: String },
    Cancelled,
    Failed { cause: String },
}

impl FlowOutcome {
    /// Interpret a host `(result_code, payload)` pair
    pub fn from_result_code(result_code: i32, payload: Option<String>) -> Self {
        match (result_code, payload) {
            (result_codes::RESULT_OK, Some(resource)) if !resource.is_empty() => {
                FlowOutcome::Selected { resource }
            }
            (result_codes::RESULT_OK, _) => FlowOutcome::Failed {
                cause: "flow reported success without a resource".to_string(),
            },
            (result_codes::RESULT_CANCELED, _) => FlowOutcome::Cancelled,
            (code, payload) => FlowOutcome::Failed {
                cause: match payload {
                    Some(detail) => format!("flow failed with result code {code}: {detail}"),
                    None => format!("flow failed with result code {code}"),
                },
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FlowOutcome::Selected { .. } => "selected",
            FlowOutcome::Cancelled => "cancelled",
            FlowOutcome::Failed { .. } => "failed",
        }
    }
}

/// Intent fired when the user taps a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentIntent {
    pub request_code: i32,
    pub content_type: String,
    pub extras: HashMap<String, serde_json::Value>,
}

/// Notification posted through the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: i32,
    pub channel_id: String,
    pub title: String,
    pub text: String,
    pub small_icon: String,
    pub color: u32,
    pub ongoing: bool,
    pub content_intent: Option<ContentIntent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("no activity can handle the request")]
    NoHandler,
    #[error("host is detached: {0}")]
    HostDetached(String),
    #[error("launch rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("notification channel not found: {0}")]
    UnknownChannel(String),
    #[error("notifications are disabled")]
    Disabled,
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Starts long-lived host flows; the result arrives later through
/// [`ContinuationRouter::on_flow_result`](crate::execution::ContinuationRouter::on_flow_result).
pub trait ExternalFlowLauncher: Send + Sync {
    /// Accept or reject the request. Acceptance means a result will (probably) follow.
    fn launch(&self, request: FlowRequest) -> Result<(), LaunchError>;
}

/// Posts notifications on the host
pub trait NotificationSink: Send + Sync {
    fn post(&self, notification: Notification) -> Result<(), NotifyError>;
}
