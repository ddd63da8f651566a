use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Version of this core, reported by `getHeader`.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identification of the deployed chaincode, returned by `getHeader`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Header {
    pub name: String,
    pub version: String,
    pub title: String,
    /// Organizations taking part in the network.
    pub orgs: Vec<String>,
}

impl Header {
    pub fn to_json(&self) -> Json {
        let mut json = serde_json::json!({
            "name": self.name,
            "version": self.version,
            "title": self.title,
            "orgs": self.orgs,
        });
        json["ccCoreVersion"] = Json::String(CORE_VERSION.to_string());
        json
    }
}
