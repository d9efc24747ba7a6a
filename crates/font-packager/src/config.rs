//! Packager configuration.

use serde::Deserialize;

/// Configuration of a [`FontPackager`](crate::FontPackager).
///
/// Can be embedded into the host configuration, e.g. as `{ "production": true }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct PackagerConfig {
    /// Whether fonts are minified. If not set, all assets pass through unmodified.
    pub production: bool,
}

impl PackagerConfig {
    /// Creates a configuration for production builds, in which fonts are minified.
    pub fn production() -> Self {
        Self { production: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializing_config() {
        let config: PackagerConfig = serde_json::from_str(r#"{ "production": true }"#).unwrap();
        assert_eq!(config, PackagerConfig::production());

        let config: PackagerConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.production);

        let err = serde_json::from_str::<PackagerConfig>(r#"{ "production": "yes" }"#).unwrap_err();
        assert!(err.is_data(), "{err}");
    }
}
