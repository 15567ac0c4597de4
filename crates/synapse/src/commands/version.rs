use serde_json::{json, Value};

/// Build identity, printed in the same JSON shape as every other command
pub fn run() -> Value {
    json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "embedder": if cfg!(feature = "fastembed") { "fastembed" } else { "none" },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_package_version() {
        let out = run();
        assert_eq!(out["name"], "synapse");
        assert_eq!(out["version"], env!("CARGO_PKG_VERSION"));
        assert!(out["embedder"].is_string());
    }
}
