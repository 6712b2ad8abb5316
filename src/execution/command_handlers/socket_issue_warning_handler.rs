//! Socket Issue Warning Handler
//!
//! Synchronous command: posts the ongoing "could not connect" notification on
//! the channel named by the `CHANNEL_ID` argument and acknowledges with `""`.

use serde_json::json;
use std::collections::HashMap;

use crate::constants::{methods, socket_warning};
use crate::error::{BridgeError, BridgeResult};
use crate::execution::command::{BridgeContext, CommandArguments, CommandHandler, CompletionMode};
use crate::execution::completion::CompletionHandle;
use crate::logging::log_error;
use crate::platform::{ContentIntent, Notification};

#[derive(Debug, Default)]
pub struct SocketIssueWarningHandler;

impl SocketIssueWarningHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn build_notification(channel_id: &str) -> Notification {
        let extras = HashMap::from([
            ("id".to_string(), json!(-2)),
            ("chatGuid".to_string(), json!("-2")),
        ]);

        Notification {
            notification_id: socket_warning::NOTIFICATION_ID,
            channel_id: channel_id.to_string(),
            title: socket_warning::TITLE.to_string(),
            text: socket_warning::TEXT.to_string(),
            small_icon: socket_warning::SMALL_ICON.to_string(),
            color: socket_warning::COLOR,
            ongoing: true,
            content_intent: Some(ContentIntent {
                request_code: socket_warning::CONTENT_REQUEST_CODE,
                content_type: socket_warning::CONTENT_TYPE.to_string(),
                extras,
            }),
        }
    }

    fn post_warning(context: &BridgeContext, arguments: &CommandArguments) -> BridgeResult<()> {
        let channel_id = arguments.require_str(socket_warning::CHANNEL_ID_ARGUMENT)?;
        context
            .notifier()
            .post(Self::build_notification(channel_id))
            .map_err(|e| {
                log_error(
                    "socket_issue_warning_handler",
                    "post_notification",
                    &e.to_string(),
                    Some(channel_id),
                );
                BridgeError::subsystem(e.to_string())
            })
    }
}

impl CommandHandler for SocketIssueWarningHandler {
    fn method_name(&self) -> &str {
        methods::CREATE_SOCKET_ISSUE_WARNING
    }

    fn completion_mode(&self) -> CompletionMode {
        CompletionMode::Synchronous
    }

    fn handle(
        &self,
        context: &BridgeContext,
        arguments: &CommandArguments,
        completion: CompletionHandle,
    ) {
        completion.complete(Self::post_warning(context, arguments).map(|()| json!("")));
    }
}
