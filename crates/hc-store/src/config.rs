use std::fs;
use std::path::Path;

use hc_core::HypercubeConfig;

use crate::error::{Result, StoreError};

/// Parse a TOML hypercube config. Missing keys take their defaults, unknown
/// keys are rejected, and the result is validated.
pub fn parse_config(text: &str) -> Result<HypercubeConfig> {
    let config: HypercubeConfig =
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
    config
        .validate()
        .map_err(|e| StoreError::Config(e.to_string()))?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<HypercubeConfig> {
    let text = fs::read_to_string(path)?;
    let config = parse_config(&text).map_err(|e| match e {
        StoreError::Config(msg) => StoreError::Config(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_core::OutOfBoundsPolicy;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(parse_config("").unwrap(), HypercubeConfig::default());
    }

    #[test]
    fn test_full_config() {
        let cfg = parse_config(
            r#"
            compression_ratio = 0.2
            max_cells = 4096
            out_of_bounds = "clamp"
            gradient_step = 1e-6

            [constants]
            c = 299792458.0
            g = 9.81
            "#,
        )
        .unwrap();
        assert_eq!(cfg.compression_ratio, 0.2);
        assert_eq!(cfg.max_cells, Some(4096));
        assert_eq!(cfg.out_of_bounds, OutOfBoundsPolicy::Clamp);
        assert_eq!(cfg.gradient_step, 1e-6);
        assert_eq!(cfg.constants.get("g"), Some(&9.81));
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_values() {
        assert!(matches!(
            parse_config("compresion_ratio = 0.2"),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            parse_config("compression_ratio = 1.5"),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            parse_config("out_of_bounds = \"wrap\""),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hypercube.toml");
        fs::write(&path, "compression_ratio = 0.5\n").unwrap();
        assert_eq!(load_config(&path).unwrap().compression_ratio, 0.5);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(load_config(&missing), Err(StoreError::Io(_))));
    }
}
