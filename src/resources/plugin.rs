use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::jenkins::Jenkins;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginDependency {
    pub optional: bool,
    pub short_name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Plugin {
    pub active: bool,
    pub backup_version: Option<String>,
    pub bundled: bool,
    pub deleted: bool,
    pub downgradable: bool,
    pub enabled: bool,
    pub has_update: bool,
    pub long_name: String,
    pub pinned: bool,
    pub short_name: String,
    pub supports_dynamic_load: String,
    pub url: Option<String>,
    pub version: String,
    /// Only filled in when polled with `depth >= 2`.
    pub dependencies: Vec<PluginDependency>,
}

/// Snapshot of `GET /pluginManager/api/json?depth=<n>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginResponse {
    pub plugins: Vec<Plugin>,
}

/// Installed plugins, as reported by the plugin manager.
#[derive(Debug, Clone)]
pub struct Plugins {
    raw: PluginResponse,
    base: String,
    depth: u32,
    jenkins: Jenkins,
}

impl Plugins {
    pub fn new(jenkins: Jenkins, depth: u32) -> Self {
        Self {
            raw: PluginResponse::default(),
            base: "/pluginManager".to_string(),
            depth,
            jenkins,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn raw(&self) -> &PluginResponse {
        &self.raw
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.raw.plugins
    }

    pub fn count(&self) -> usize {
        self.raw.plugins.len()
    }

    /// Finds a plugin by its short or long name.
    pub fn contains(&self, name: &str) -> Option<&Plugin> {
        self.raw
            .plugins
            .iter()
            .find(|plugin| plugin.short_name == name || plugin.long_name == name)
    }

    /// Plugins that are both enabled and loaded.
    pub fn active(&self) -> impl Iterator<Item = &Plugin> {
        self.raw
            .plugins
            .iter()
            .filter(|plugin| plugin.active && plugin.enabled)
    }

    pub async fn poll(&mut self) -> Result<u16> {
        let depth = self.depth.to_string();
        self.jenkins
            .poll_into(&self.base, &[("depth", depth.as_str())], &mut self.raw)
            .await
    }
}
