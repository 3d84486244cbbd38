use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "clinical-safety";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum audit log entries kept in memory; the oldest half is discarded on overflow.
pub const AUDIT_LOG_CAPACITY: usize = 1000;

/// Environment variable naming a directory of reference tables.
pub const REFERENCE_DIR_ENV: &str = "CLINICAL_SAFETY_REFERENCE_DIR";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "clinical_safety=info".to_string()
}

/// Default location of override tables: `<data dir>/clinical-safety/reference`.
pub fn default_reference_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_NAME).join("reference"))
}

/// Directory to load reference tables from, if any. The environment variable
/// wins; the default location is used only when it exists. `None` means the
/// bundled tables.
pub fn reference_data_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(REFERENCE_DIR_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    default_reference_dir().filter(|dir| dir.is_dir())
}
