//! # Bridge Replay
//!
//! Drives a [`MethodBridge`] from a JSON script and prints what happens as JSON
//! lines. The host side is played by recording doubles, so the script decides
//! when (and whether) external flows report back.
//!
//! ```json
//! [
//!   {"call": {"method": "pick-image"}},
//!   {"flow_result": {"result_code": -1, "payload": "content://media/external/images/media/7"}},
//!   {"call": {"method": "create-socket-issue-warning", "arguments": {"CHANNEL_ID": "errors"}}},
//!   {"sleep_ms": 50},
//!   "expire",
//!   "shutdown"
//! ]
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bridge_core::config::ConfigManager;
use bridge_core::execution::{MethodReply, RequestToken};
use bridge_core::logging::init_structured_logging;
use bridge_core::test_helpers::{RecordingFlowLauncher, RecordingNotificationSink};
use bridge_core::MethodBridge;

#[derive(Parser)]
#[command(name = "bridge-replay")]
#[command(about = "Replay a scripted sequence of method calls and host events")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Script file; reads stdin when omitted
    script: Option<PathBuf>,

    /// Configuration directory (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Override the pending timeout
    #[arg(long)]
    pending_timeout_ms: Option<u64>,

    /// Emit bridge logs
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Step {
    Call {
        method: String,
        #[serde(default)]
        arguments: Value,
    },
    FlowResult {
        /// Defaults to the configured picker token
        token: Option<RequestToken>,
        result_code: i32,
        payload: Option<String>,
    },
    SleepMs(u64),
    Expire,
    Shutdown,
}

type ReplyLog = Arc<Mutex<Vec<(usize, MethodReply)>>>;

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        init_structured_logging();
    }

    let steps = read_script(cli.script.as_ref())?;

    let manager = ConfigManager::load_from_directory(cli.config_dir.clone())
        .context("failed to load bridge configuration")?;
    let mut config = manager.config().clone();
    if let Some(timeout_ms) = cli.pending_timeout_ms {
        config = config.with_pending_timeout(Duration::from_millis(timeout_ms));
    }
    // No runtime here: deadlines are enforced by "expire" steps
    config = config.with_deadline_tasks(false);

    let launcher = Arc::new(RecordingFlowLauncher::new());
    let notifier = Arc::new(RecordingNotificationSink::new());
    let bridge = MethodBridge::with_default_handlers(
        config,
        Arc::clone(&launcher) as _,
        Arc::clone(&notifier) as _,
    )
    .context("failed to build bridge")?;

    let replies: ReplyLog = Arc::new(Mutex::new(Vec::new()));
    let mut calls = 0usize;
    let mut launched = 0usize;
    let mut posted = 0usize;

    for (index, step) in steps.into_iter().enumerate() {
        let outcome = run_step(&bridge, step, &replies, &mut calls);
        emit(json!({"step": index, "event": "step", "outcome": outcome}))?;

        let requests = launcher.requests();
        for request in &requests[launched..] {
            emit(json!({"step": index, "event": "flow_launched", "request": request}))?;
        }
        launched = requests.len();

        let notifications = notifier.posted();
        for notification in &notifications[posted..] {
            emit(json!({"step": index, "event": "notification", "notification": notification}))?;
        }
        posted = notifications.len();

        for (call, reply) in replies.lock().drain(..) {
            emit(json!({"step": index, "event": "reply", "call": call, "reply": reply}))?;
        }
    }

    emit(json!({
        "event": "summary",
        "pending": bridge.slot().pending_tokens(),
        "history": bridge.dispatcher().history(),
    }))?;
    Ok(())
}

fn read_script(path: Option<&PathBuf>) -> Result<Vec<Step>> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read script from stdin")?;
            raw
        }
    };
    serde_json::from_str(&raw).context("script must be a JSON array of steps")
}

fn run_step(bridge: &MethodBridge, step: Step, replies: &ReplyLog, calls: &mut usize) -> Value {
    match step {
        Step::Call { method, arguments } => {
            let call = *calls;
            *calls += 1;
            let sink = Arc::clone(replies);
            let status = bridge.invoke_json(&method, arguments, move |reply| {
                sink.lock().push((call, reply));
            });
            json!({"call": call, "method": method, "status": status})
        }
        Step::FlowResult {
            token,
            result_code,
            payload,
        } => {
            let token = token.unwrap_or(bridge.config().picker.request_token);
            let delivery = bridge.on_flow_result(token, result_code, payload);
            json!({"token": token, "delivery": format!("{delivery:?}")})
        }
        Step::SleepMs(ms) => {
            std::thread::sleep(Duration::from_millis(ms));
            json!({"slept_ms": ms})
        }
        Step::Expire => json!({"expired": bridge.expire_overdue()}),
        Step::Shutdown => json!({"failed": bridge.shutdown()}),
    }
}

fn emit(line: Value) -> Result<()> {
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}
