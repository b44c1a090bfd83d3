use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Story Station";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-file upload cap (1 MiB). Oversized files are skipped, not truncated.
pub const MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Pause between consecutive files in a batch, in seconds. A static
/// rate-limit courtesy toward the hosted service, not adaptive.
pub const DEFAULT_INTER_FILE_DELAY_SECS: u64 = 10;

/// Generation model requested from the hosted service.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Environment variable consulted for the API credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "story_station=info"
}

/// Get the application data directory (~/StoryStation/)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("StoryStation")
}

/// Default location of the analysis archive.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("story_station.db")
}

/// Resolve the API credential.
///
/// The configured secret (environment) is preferred over an explicitly
/// supplied key, and blank values count as absent. The resolved key is
/// returned to the caller only — it is never logged or persisted.
pub fn resolve_api_key(explicit: Option<&str>) -> Option<String> {
    let configured = std::env::var(API_KEY_ENV).ok();
    resolve_api_key_from(configured.as_deref(), explicit)
}

fn resolve_api_key_from(configured: Option<&str>, explicit: Option<&str>) -> Option<String> {
    [configured, explicit]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .map(str::to_string)
}
