use parking_lot::Mutex;
use std::sync::Arc;

use crate::execution::MethodReply;
use crate::platform::{
    ExternalFlowLauncher, FlowRequest, LaunchError, Notification, NotificationSink, NotifyError,
};

/// Flow launcher that records requests and optionally rejects them
#[derive(Debug, Default)]
pub struct RecordingFlowLauncher {
    requests: Mutex<Vec<FlowRequest>>,
    failure: Mutex<Option<LaunchError>>,
}

impl RecordingFlowLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher that rejects every request with `error`
    pub fn failing(error: LaunchError) -> Self {
        let launcher = Self::new();
        launcher.set_failure(Some(error));
        launcher
    }

    pub fn set_failure(&self, error: Option<LaunchError>) {
        *self.failure.lock() = error;
    }

    /// Every request seen so far, including rejected ones
    pub fn requests(&self) -> Vec<FlowRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<FlowRequest> {
        self.requests.lock().last().cloned()
    }
}

impl ExternalFlowLauncher for RecordingFlowLauncher {
    fn launch(&self, request: FlowRequest) -> Result<(), LaunchError> {
        self.requests.lock().push(request);
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Notification sink that records posted notifications and optionally rejects them
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    posted: Mutex<Vec<Notification>>,
    failure: Mutex<Option<NotifyError>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: NotifyError) -> Self {
        let sink = Self::new();
        sink.set_failure(Some(error));
        sink
    }

    pub fn set_failure(&self, error: Option<NotifyError>) {
        *self.failure.lock() = error;
    }

    /// Notifications that were accepted
    pub fn posted(&self) -> Vec<Notification> {
        self.posted.lock().clone()
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn post(&self, notification: Notification) -> Result<(), NotifyError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.posted.lock().push(notification);
        Ok(())
    }
}

/// Collects wire replies handed to `invoke` callbacks
#[derive(Debug, Clone, Default)]
pub struct ReplyCollector {
    replies: Arc<Mutex<Vec<MethodReply>>>,
}

impl ReplyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback that appends its reply to this collector
    pub fn callback(&self) -> impl FnOnce(MethodReply) + Send + 'static {
        let replies = Arc::clone(&self.replies);
        move |reply| replies.lock().push(reply)
    }

    pub fn replies(&self) -> Vec<MethodReply> {
        self.replies.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.replies.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.lock().is_empty()
    }

    /// The one reply received; panics unless exactly one arrived
    pub fn single(&self) -> MethodReply {
        let replies = self.replies.lock();
        assert_eq!(
            replies.len(),
            1,
            "expected exactly one reply, got {replies:?}"
        );
        replies[0].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::FlowAction;
    use serde_json::json;

    fn request() -> FlowRequest {
        FlowRequest {
            action: FlowAction::GetContent,
            data_type_filter: "image/*".to_string(),
            request_token: 1,
            primary: None,
            alternatives: Vec::new(),
        }
    }

    #[test]
    fn test_failing_launcher_still_records() {
        let launcher = RecordingFlowLauncher::failing(LaunchError::NoHandler);
        assert_eq!(launcher.launch(request()), Err(LaunchError::NoHandler));
        assert_eq!(launcher.requests().len(), 1);

        launcher.set_failure(None);
        assert!(launcher.launch(request()).is_ok());
        assert_eq!(launcher.last_request().unwrap().request_token, 1);
    }

    #[test]
    fn test_reply_collector() {
        let collector = ReplyCollector::new();
        assert!(collector.is_empty());
        (collector.callback())(MethodReply::Ok { ok: json!("") });
        assert_eq!(collector.single(), MethodReply::Ok { ok: json!("") });
    }
}
