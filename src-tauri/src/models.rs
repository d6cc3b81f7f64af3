use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One application the driver can cycle to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub name: String,
    pub package_name: String,
    /// Opaque image reference (URI or `data:` URI); `None` renders a fallback glyph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub launchable: bool,
}

impl AppInfo {
    pub fn new(name: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package_name: package_name.into(),
            icon: None,
            launchable: true,
        }
    }
}

/// The single persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCyclerConfig {
    pub apps: Vec<AppInfo>,
    pub service_enabled: bool,
    pub auto_start_on_boot: bool,
}

impl Default for AppCyclerConfig {
    fn default() -> Self {
        Self {
            apps: Vec::new(),
            service_enabled: false,
            auto_start_on_boot: true,
        }
    }
}

impl AppCyclerConfig {
    pub fn contains(&self, package_name: &str) -> bool {
        self.apps.iter().any(|app| app.package_name == package_name)
    }
}

/// Drops repeated package names, keeping the first occurrence. Returns how many were removed.
pub fn dedup_by_package(apps: &mut Vec<AppInfo>) -> usize {
    let before = apps.len();
    let mut seen = HashSet::new();
    apps.retain(|app| seen.insert(app.package_name.clone()));
    before - apps.len()
}

/// What the webview needs to render the home screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclerSnapshot {
    pub config: AppCyclerConfig,
    pub current_index: usize,
    pub service_active: bool,
}
