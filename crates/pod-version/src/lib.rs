/// The current version of `pod`, as reported by `pod --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
