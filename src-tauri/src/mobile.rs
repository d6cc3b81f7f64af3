//! Android side of the platform bridge, reached through Tauri's mobile plugin API.
//!
//! The Kotlin plugin is shipped separately; when it is not bundled the
//! registration fails and the app runs against [`Platform::Unavailable`].

use log::{info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tauri::{
    plugin::{Builder, PluginApi, PluginHandle, TauriPlugin},
    Manager, Wry,
};

use crate::{
    error::PlatformError,
    models::AppCyclerConfig,
    platform::{InstalledApp, Platform, PlatformBridge},
};

const PLUGIN_NAME: &str = "app-cycler-bridge";
#[cfg(target_os = "android")]
const ANDROID_PACKAGE: &str = "com.appcycler.bridge";
#[cfg(target_os = "android")]
const ANDROID_CLASS: &str = "AppCyclerPlugin";

#[derive(Deserialize)]
struct InstalledAppsResponse {
    apps: Vec<InstalledApp>,
}

#[derive(Deserialize)]
struct LaunchResponse {
    success: bool,
}

#[derive(Deserialize)]
struct ServiceStatusResponse {
    active: bool,
}

#[derive(Deserialize)]
struct PermissionResponse {
    granted: bool,
}

#[derive(Deserialize)]
struct ConfigResponse {
    #[serde(default)]
    config: Option<AppCyclerConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LaunchArgs<'a> {
    package_name: &'a str,
}

#[derive(Serialize)]
struct AutoStartArgs {
    enabled: bool,
}

#[derive(Serialize)]
struct SaveConfigArgs<'a> {
    config: &'a AppCyclerConfig,
}

pub struct MobileBridge {
    handle: PluginHandle<Wry>,
}

impl MobileBridge {
    fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        payload: impl Serialize,
    ) -> Result<T, PlatformError> {
        self.handle
            .run_mobile_plugin(method, payload)
            .map_err(|err| PlatformError::Call {
                method,
                message: err.to_string(),
            })
    }

    fn fire(&self, method: &'static str, payload: impl Serialize) -> Result<(), PlatformError> {
        self.call::<serde_json::Value>(method, payload).map(|_| ())
    }
}

impl PlatformBridge for MobileBridge {
    fn installed_apps(&self) -> Result<Vec<InstalledApp>, PlatformError> {
        self.call::<InstalledAppsResponse>("getInstalledApps", ())
            .map(|resp| resp.apps)
    }

    fn launch_app(&self, package_name: &str) -> Result<bool, PlatformError> {
        self.call::<LaunchResponse>("launchApp", LaunchArgs { package_name })
            .map(|resp| resp.success)
    }

    fn service_status(&self) -> Result<bool, PlatformError> {
        self.call::<ServiceStatusResponse>("checkServiceStatus", ())
            .map(|resp| resp.active)
    }

    fn accessibility_permission(&self) -> Result<bool, PlatformError> {
        self.call::<PermissionResponse>("checkAccessibilityPermission", ())
            .map(|resp| resp.granted)
    }

    fn request_accessibility_permission(&self) -> Result<(), PlatformError> {
        self.fire("requestAccessibilityPermission", ())
    }

    fn set_auto_start(&self, enabled: bool) -> Result<(), PlatformError> {
        self.fire("setAutoStart", AutoStartArgs { enabled })
    }

    fn get_config(&self) -> Result<Option<AppCyclerConfig>, PlatformError> {
        self.call::<ConfigResponse>("getConfig", ())
            .map(|resp| resp.config)
    }

    fn save_config(&self, config: &AppCyclerConfig) -> Result<(), PlatformError> {
        self.fire("saveConfig", SaveConfigArgs { config })
    }
}

/// Registers the bridge plugin and manages the resolved [`Platform`].
pub fn init() -> TauriPlugin<Wry> {
    Builder::new(PLUGIN_NAME)
        .setup(|app, api| {
            let platform = register(api);
            info!("platform bridge resolved: {platform:?}");
            app.manage(platform);
            Ok(())
        })
        .build()
}

#[cfg(target_os = "android")]
fn register(api: PluginApi<Wry, ()>) -> Platform {
    match api.register_android_plugin(ANDROID_PACKAGE, ANDROID_CLASS) {
        Ok(handle) => Platform::available(MobileBridge { handle }),
        Err(err) => {
            warn!("android bridge plugin unavailable: {err}");
            Platform::Unavailable
        }
    }
}

#[cfg(not(target_os = "android"))]
fn register(_api: PluginApi<Wry, ()>) -> Platform {
    warn!("no platform bridge for this mobile target");
    Platform::Unavailable
}
