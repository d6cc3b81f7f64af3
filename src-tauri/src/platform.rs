//! Capability contract for the head unit's native side.
//!
//! Package enumeration, intent launching and the accessibility service live in
//! an Android plugin outside this crate. [`Platform`] is resolved once at
//! startup; every call site matches on it instead of probing for the plugin.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{error::PlatformError, models::AppCyclerConfig};

/// One entry as reported by the platform's package manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledApp {
    pub app_name: String,
    pub package_name: String,
    #[serde(default)]
    pub icon_base64: Option<String>,
    pub launchable: bool,
}

pub trait PlatformBridge: Send + Sync {
    fn installed_apps(&self) -> Result<Vec<InstalledApp>, PlatformError>;

    /// Brings `package_name` to the foreground. `Ok(false)` means the platform refused.
    fn launch_app(&self, package_name: &str) -> Result<bool, PlatformError>;

    /// Whether the accessibility listener is currently running.
    fn service_status(&self) -> Result<bool, PlatformError>;

    fn accessibility_permission(&self) -> Result<bool, PlatformError>;

    /// Opens the system accessibility settings. Completion is observed later
    /// through [`PlatformBridge::accessibility_permission`].
    fn request_accessibility_permission(&self) -> Result<(), PlatformError>;

    fn set_auto_start(&self, enabled: bool) -> Result<(), PlatformError>;

    fn get_config(&self) -> Result<Option<AppCyclerConfig>, PlatformError>;

    fn save_config(&self, config: &AppCyclerConfig) -> Result<(), PlatformError>;
}

#[derive(Clone, Default)]
pub enum Platform {
    Available(Arc<dyn PlatformBridge>),
    #[default]
    Unavailable,
}

impl Platform {
    pub fn available(bridge: impl PlatformBridge + 'static) -> Self {
        Self::Available(Arc::new(bridge))
    }

    pub fn bridge(&self) -> Option<&dyn PlatformBridge> {
        match self {
            Self::Available(bridge) => Some(bridge.as_ref()),
            Self::Unavailable => None,
        }
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(_) => f.write_str("Platform::Available"),
            Self::Unavailable => f.write_str("Platform::Unavailable"),
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::{sync::Mutex, time::Duration};

    use super::*;

    /// Scriptable bridge that records every call it receives.
    #[derive(Default)]
    pub(crate) struct FakeBridge {
        pub apps: Mutex<Option<Vec<InstalledApp>>>,
        pub launch_result: Mutex<Option<bool>>,
        pub service_active: Mutex<Option<bool>>,
        pub permission_granted: Mutex<Option<bool>>,
        pub stored_config: Mutex<Option<AppCyclerConfig>>,
        /// Blocks `launch_app` after it is recorded, like a slow intent round trip.
        pub launch_delay: Mutex<Option<Duration>>,
        pub calls: Mutex<Vec<String>>,
    }

    fn scripted<T: Clone>(
        slot: &Mutex<Option<T>>,
        method: &'static str,
    ) -> Result<T, PlatformError> {
        slot.lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PlatformError::Call {
                method,
                message: "scripted failure".into(),
            })
    }

    impl FakeBridge {
        pub(crate) fn new() -> Self {
            Self {
                apps: Mutex::new(Some(Vec::new())),
                launch_result: Mutex::new(Some(true)),
                service_active: Mutex::new(Some(false)),
                permission_granted: Mutex::new(Some(false)),
                ..Self::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn launches(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|call| call.strip_prefix("launch:").map(str::to_string))
                .collect()
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    impl PlatformBridge for FakeBridge {
        fn installed_apps(&self) -> Result<Vec<InstalledApp>, PlatformError> {
            self.record("installed_apps");
            scripted(&self.apps, "getInstalledApps")
        }

        fn launch_app(&self, package_name: &str) -> Result<bool, PlatformError> {
            self.record(format!("launch:{package_name}"));
            let delay = *self.launch_delay.lock().unwrap();
            if let Some(delay) = delay {
                std::thread::sleep(delay);
            }
            scripted(&self.launch_result, "launchApp")
        }

        fn service_status(&self) -> Result<bool, PlatformError> {
            self.record("service_status");
            scripted(&self.service_active, "checkServiceStatus")
        }

        fn accessibility_permission(&self) -> Result<bool, PlatformError> {
            self.record("accessibility_permission");
            scripted(&self.permission_granted, "checkAccessibilityPermission")
        }

        fn request_accessibility_permission(&self) -> Result<(), PlatformError> {
            self.record("request_accessibility_permission");
            Ok(())
        }

        fn set_auto_start(&self, enabled: bool) -> Result<(), PlatformError> {
            self.record(format!("set_auto_start:{enabled}"));
            Ok(())
        }

        fn get_config(&self) -> Result<Option<AppCyclerConfig>, PlatformError> {
            self.record("get_config");
            Ok(self.stored_config.lock().unwrap().clone())
        }

        fn save_config(&self, config: &AppCyclerConfig) -> Result<(), PlatformError> {
            self.record("save_config");
            *self.stored_config.lock().unwrap() = Some(config.clone());
            Ok(())
        }
    }

    pub(crate) fn platform() -> (Arc<FakeBridge>, Platform) {
        let bridge = Arc::new(FakeBridge::new());
        let platform = Platform::Available(Arc::clone(&bridge) as Arc<dyn PlatformBridge>);
        (bridge, platform)
    }
}
