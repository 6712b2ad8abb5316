//! Pick Image Handler
//!
//! Deferred command: parks the caller's completion handle under the picker
//! request token and launches the host's image chooser. The result arrives
//! later through the continuation router.

use tracing::{error, info, warn};

use crate::config::PickerConfig;
use crate::constants::{methods, picker};
use crate::error::BridgeError;
use crate::execution::command::{BridgeContext, CommandArguments, CommandHandler, CompletionMode};
use crate::execution::completion::CompletionHandle;
use crate::execution::pending_slot::SlotOccupied;
use crate::platform::{FlowAction, FlowIntent, FlowRequest};

#[derive(Debug, Default)]
pub struct PickImageHandler;

impl PickImageHandler {
    pub fn new() -> Self {
        Self
    }

    /// Chooser over "get content" with a direct pick from the image collection as alternative
    pub fn build_request(config: &PickerConfig) -> FlowRequest {
        FlowRequest {
            action: FlowAction::Chooser {
                title: config.chooser_title.clone(),
            },
            data_type_filter: config.data_type_filter.clone(),
            request_token: config.request_token,
            primary: Some(FlowIntent {
                action: FlowAction::GetContent,
                data_type_filter: config.data_type_filter.clone(),
            }),
            alternatives: vec![FlowIntent {
                action: FlowAction::Pick {
                    collection_uri: picker::EXTERNAL_IMAGES_URI.to_string(),
                },
                data_type_filter: config.data_type_filter.clone(),
            }],
        }
    }
}

impl CommandHandler for PickImageHandler {
    fn method_name(&self) -> &str {
        methods::PICK_IMAGE
    }

    fn completion_mode(&self) -> CompletionMode {
        CompletionMode::Deferred
    }

    fn handle(
        &self,
        context: &BridgeContext,
        _arguments: &CommandArguments,
        completion: CompletionHandle,
    ) {
        let request = Self::build_request(&context.config().picker);
        let token = request.request_token;
        let call_id = completion.call_id();

        // Park before launching: the host may deliver the result from inside launch()
        let parked = match context.continuations().park(token, completion) {
            Ok(parked) => parked,
            Err(SlotOccupied { token, handle }) => {
                warn!(
                    call_id = %call_id,
                    request_token = token,
                    "Image picker already in progress - rejecting call"
                );
                handle.failure(BridgeError::AlreadyPending { token });
                return;
            }
        };

        match context.flow_launcher().launch(request) {
            Ok(()) => {
                info!(
                    call_id = %call_id,
                    request_token = token,
                    registration_id = %parked.registration_id,
                    "Image picker launched"
                );
            }
            Err(e) => {
                error!(
                    call_id = %call_id,
                    request_token = token,
                    error = %e,
                    "Image picker could not be launched"
                );
                context
                    .continuations()
                    .abandon(parked, BridgeError::ExternalFlowUnavailable(e.to_string()));
            }
        }
    }
}
