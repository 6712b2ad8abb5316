//! Command Handlers Module
//!
//! Handlers for the method names the bridge answers out of the box. Each one
//! implements [`CommandHandler`](super::command::CommandHandler) and is
//! registered with the [`MethodDispatcher`](super::command_router::MethodDispatcher).

pub mod pick_image_handler;
pub mod socket_issue_warning_handler;

pub use pick_image_handler::PickImageHandler;
pub use socket_issue_warning_handler::SocketIssueWarningHandler;
