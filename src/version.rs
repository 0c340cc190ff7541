// Build-time package identity

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// `User-Agent` sent to the Kubernetes API, e.g. `kmonitor/0.3.0`.
pub fn user_agent() -> String {
    format!("{}/{}", NAME, VERSION)
}
