use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::scheme::EmbedScheme;
use crate::vidsrc_api::DEFAULT_ENDPOINT;
use crate::CatalogError;

/// Source catalog as written in a JSON config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub scheme: EmbedScheme,
    pub hosts: Vec<String>,
    /// Manifest lookup endpoint; absent means embed only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_api: Option<String>,
}

impl CatalogConfig {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl Default for CatalogConfig {
    /// Built-in providers, most reliable first.
    fn default() -> Self {
        Self {
            providers: vec![
                ProviderConfig {
                    name: "vidsrc_cc".into(),
                    scheme: EmbedScheme::VidsrcCc,
                    hosts: vec!["vidsrc.cc".into(), "vidsrc.xyz".into()],
                    manifest_api: Some(DEFAULT_ENDPOINT.into()),
                },
                ProviderConfig {
                    name: "godrive_player".into(),
                    scheme: EmbedScheme::GodrivePlayer,
                    hosts: vec!["godriveplayer.com".into()],
                    manifest_api: None,
                },
                ProviderConfig {
                    name: "embed_su".into(),
                    scheme: EmbedScheme::EmbedSu,
                    hosts: vec!["multiembed.mov".into(), "embed.su".into()],
                    manifest_api: None,
                },
            ],
        }
    }
}
