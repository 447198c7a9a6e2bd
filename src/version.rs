//! Build identity of the binary.

use std::sync::OnceLock;

const DEFAULT_NAME: &str = "newpayload-gate";

static VERSION: OnceLock<String> = OnceLock::new();

/// `newpayload-gate/v<version>-<short sha>`.
pub fn version_string() -> &'static str {
    VERSION.get_or_init(|| {
        let sha = option_env!("VERGEN_GIT_SHA_SHORT").unwrap_or("unknown");
        format!("{DEFAULT_NAME}/v{}-{sha}", env!("CARGO_PKG_VERSION"))
    })
}
