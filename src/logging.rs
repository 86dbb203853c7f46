use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

static DEBUG_FROM_ENV: OnceLock<bool> = OnceLock::new();
static DEBUG_FORCED: AtomicBool = AtomicBool::new(false);

fn debug_enabled() -> bool {
    if DEBUG_FORCED.load(Ordering::Relaxed) {
        return true;
    }
    *DEBUG_FROM_ENV.get_or_init(|| {
        std::env::var("JIRA_HARVEST_DEBUG")
            .ok()
            .map(|v| {
                let normalized = v.trim().to_ascii_lowercase();
                normalized == "1" || normalized == "true" || normalized == "yes"
            })
            .unwrap_or(false)
    })
}

/// Turns on debug output regardless of `JIRA_HARVEST_DEBUG`.
pub fn enable_debug() {
    DEBUG_FORCED.store(true, Ordering::Relaxed);
}

fn ts() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

pub fn debug(message: impl AsRef<str>) {
    if debug_enabled() {
        eprintln!("{} [DEBUG] {}", ts(), message.as_ref());
    }
}

pub fn info(message: impl AsRef<str>) {
    eprintln!("{} [INFO] {}", ts(), message.as_ref());
}

pub fn warn(message: impl AsRef<str>) {
    eprintln!("{} [WARN] {}", ts(), message.as_ref());
}

pub fn error(message: impl AsRef<str>) {
    eprintln!("{} [ERROR] {}", ts(), message.as_ref());
}
