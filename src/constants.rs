//! # Bridge Constants
//!
//! Method names, request tokens and host result codes shared by the dispatcher,
//! the handlers and the continuation router.

/// Method names accepted across the dispatch boundary
pub mod methods {
    pub const PICK_IMAGE: &str = "pick-image";
    pub const CREATE_SOCKET_ISSUE_WARNING: &str = "create-socket-issue-warning";
}

/// Request tokens echoed back by the host when an external flow concludes
pub mod request_tokens {
    pub const PICK_IMAGE: i32 = 1000;
}

/// Activity result codes reported by the host platform
pub mod result_codes {
    pub const RESULT_OK: i32 = -1;
    pub const RESULT_CANCELED: i32 = 0;
    pub const RESULT_FIRST_USER: i32 = 1;
}

/// Values used by the socket issue warning notification
pub mod socket_warning {
    pub const NOTIFICATION_ID: i32 = 1000;
    pub const CONTENT_REQUEST_CODE: i32 = 4000;
    pub const CONTENT_TYPE: &str = "SocketErrorOpen";
    pub const TITLE: &str = "Could not connect";
    pub const TEXT: &str = "Your server may be offline";
    pub const SMALL_ICON: &str = "ic_stat_icon";
    pub const COLOR: u32 = 4_888_294;
    pub const CHANNEL_ID_ARGUMENT: &str = "CHANNEL_ID";
}

/// Host actions and content locations used by the image picker
pub mod picker {
    pub const ACTION_GET_CONTENT: &str = "android.intent.action.GET_CONTENT";
    pub const ACTION_PICK: &str = "android.intent.action.PICK";
    pub const ACTION_CHOOSER: &str = "android.intent.action.CHOOSER";
    pub const EXTERNAL_IMAGES_URI: &str = "content://media/external/images/media";
}
