use std::path::{Path, PathBuf};

use cct_tx::Header;
use cct_types::AssetTypeRegistry;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Chaincode configuration, usually read from a TOML file.
///
/// ```toml
/// dynamic_asset_types = true
/// asset_types = "assets.json"
///
/// [header]
/// name = "library-cc"
/// version = "1.0.0"
/// orgs = ["org1MSP"]
///
/// [log]
/// level = "debug"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaincodeConfig {
    pub header: Header,
    /// Register `createAssetType`, `updateAssetType` and `deleteAssetType`.
    pub dynamic_asset_types: bool,
    /// JSON file with the static asset type definitions.
    pub asset_types: Option<PathBuf>,
    pub log: LogConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl ChaincodeConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a file. A relative `asset_types` path is resolved against
    /// the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = read(path)?;
        let mut config = Self::from_toml_str(&text)?;
        if let (Some(types), Some(dir)) = (&config.asset_types, path.parent()) {
            if types.is_relative() {
                config.asset_types = Some(dir.join(types));
            }
        }
        Ok(config)
    }

    /// The static asset types named by `asset_types`.
    pub fn load_asset_types(&self) -> SdkResult<AssetTypeRegistry> {
        let path = self
            .asset_types
            .as_ref()
            .ok_or_else(|| SdkError::Config("no asset_types file configured".into()))?;
        Ok(AssetTypeRegistry::from_json(&read(path)?)?)
    }
}

fn read(path: &Path) -> SdkResult<String> {
    std::fs::read_to_string(path).map_err(|source| SdkError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PERSON: &str = r#"[{"tag":"person","props":[{"tag":"id","isKey":true,"dataType":"string"}]}]"#;

    #[test]
    fn default_config() {
        let c = ChaincodeConfig::default();
        assert!(!c.dynamic_asset_types);
        assert!(c.asset_types.is_none());
        assert_eq!(c.log.level, "info");
        assert!(c.header.orgs.is_empty());
    }

    #[test]
    fn parses_toml() {
        let c = ChaincodeConfig::from_toml_str(
            r#"
            dynamic_asset_types = true

            [header]
            name = "library-cc"
            version = "1.0.0"
            orgs = ["org1MSP", "org2MSP"]

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        assert!(c.dynamic_asset_types);
        assert_eq!(c.header.name, "library-cc");
        assert_eq!(c.header.orgs.len(), 2);
        assert_eq!(c.header.title, "");
        assert_eq!(c.log.level, "debug");
    }

    #[test]
    fn missing_sections_take_defaults() {
        let c = ChaincodeConfig::from_toml_str("").unwrap();
        assert_eq!(c, ChaincodeConfig::default());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = ChaincodeConfig::from_toml_str("dynamic_asset_types = [").unwrap_err();
        assert!(matches!(err, SdkError::Toml(_)));
    }

    #[test]
    fn from_file_resolves_asset_types_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("assets.json"), PERSON).unwrap();
        let path = dir.path().join("chaincode.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "asset_types = \"assets.json\"").unwrap();
        writeln!(file, "[header]\nname = \"cc\"").unwrap();
        drop(file);

        let c = ChaincodeConfig::from_file(&path).unwrap();
        assert_eq!(c.asset_types.as_deref(), Some(dir.path().join("assets.json").as_path()));
        let types = c.load_asset_types().unwrap();
        assert!(types.contains("person"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ChaincodeConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SdkError::Io { .. }));
    }

    #[test]
    fn asset_types_require_a_path() {
        let err = ChaincodeConfig::default().load_asset_types().unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }
}
