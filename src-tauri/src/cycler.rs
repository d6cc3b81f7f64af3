//! Owned state for the cycle list, service flags and rotation cursor.
//!
//! Every mutation writes the whole record through to the [`ConfigStore`].
//! Nothing here returns an error to the caller for store or platform trouble;
//! those are logged and surfaced as [`Notice`]s.
//!
//! Operations that reach the platform are split into a step that runs under
//! the cycler lock and a platform call that runs after it is released (see
//! `session`). The `&mut self` conveniences below chain both steps for a
//! single owner.

use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    config::ConfigStore,
    error::{AppError, PlatformError, Result},
    launcher,
    models::{dedup_by_package, AppCyclerConfig, AppInfo, CyclerSnapshot},
    notice::{Notice, Notifier},
    platform::Platform,
};

/// How long the preview waits before pretending the user granted the permission.
pub const SIMULATED_GRANT_DELAY: Duration = Duration::from_millis(1500);

/// How a permission request will complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionFlow {
    /// The system settings were opened; the status poll observes the grant.
    AwaitingPlatform,
    /// No platform: grant request `generation` after `delay`.
    Simulated { generation: u64, delay: Duration },
    /// The settings surface could not be opened.
    Failed,
}

/// First half of a permission request, produced under the lock.
#[derive(Debug, Clone)]
pub enum PermissionStart {
    Ready(PermissionFlow),
    /// Open the system settings through `platform`, then report back with
    /// [`AppCycler::settings_opened`].
    OpenSettings { platform: Platform, generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceToggle {
    Disabled,
    PermissionRequested(PermissionFlow),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CycleOutcome {
    NoApps,
    Launched {
        index: usize,
        package_name: String,
        success: bool,
    },
}

/// The entry the cursor moved to; launched once the lock is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub index: usize,
    pub package_name: String,
}

impl LaunchTarget {
    pub fn launch(self, platform: &Platform, notifier: &dyn Notifier) -> CycleOutcome {
        let success = launcher::launch(platform, &self.package_name, notifier);
        CycleOutcome::Launched {
            index: self.index,
            package_name: self.package_name,
            success,
        }
    }
}

/// One reading of the platform's view of the service. `None` fields were not available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub active: Option<bool>,
    pub permission_granted: Option<bool>,
}

pub struct AppCycler {
    config: AppCyclerConfig,
    current_index: usize,
    reported_active: Option<bool>,
    /// Generation of the outstanding permission request, if any.
    pending_grant: Option<u64>,
    last_generation: u64,
    store: Arc<dyn ConfigStore>,
    platform: Platform,
    notifier: Arc<dyn Notifier>,
}

impl AppCycler {
    /// Reads the persisted record, falling back to the default on absence or corruption.
    pub fn load(
        store: Arc<dyn ConfigStore>,
        platform: Platform,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let config = match store.load() {
            Ok(Some(mut config)) => {
                let dropped = dedup_by_package(&mut config.apps);
                if dropped > 0 {
                    warn!("dropped {dropped} duplicate apps from saved config");
                }
                config
            }
            Ok(None) => AppCyclerConfig::default(),
            Err(err) => {
                warn!("failed to load config, using defaults: {err}");
                AppCyclerConfig::default()
            }
        };
        debug!("loaded config with {} apps", config.apps.len());

        Self {
            config,
            current_index: 0,
            reported_active: None,
            pending_grant: None,
            last_generation: 0,
            store,
            platform,
            notifier,
        }
    }

    pub fn config(&self) -> &AppCyclerConfig {
        &self.config
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    pub fn permission_pending(&self) -> bool {
        self.pending_grant.is_some()
    }

    /// Enabled in config and, when the platform has reported, running there too.
    pub fn service_active(&self) -> bool {
        self.config.service_enabled && self.reported_active.unwrap_or(true)
    }

    pub fn snapshot(&self) -> CyclerSnapshot {
        CyclerSnapshot {
            config: self.config.clone(),
            current_index: self.current_index,
            service_active: self.service_active(),
        }
    }

    /// Replaces the cycle list and restarts rotation from the first entry.
    pub fn update_apps(&mut self, mut apps: Vec<AppInfo>) {
        let dropped = dedup_by_package(&mut apps);
        if dropped > 0 {
            warn!("ignored {dropped} duplicate apps in cycle list update");
        }
        self.config.apps = apps;
        self.current_index = 0;
        self.persist();
    }

    /// Appends `app` unless its package is already in the list.
    pub fn add_app(&mut self, app: AppInfo) -> bool {
        if self.config.contains(&app.package_name) {
            self.notifier.notify(Notice::destructive(
                "App Already Added",
                "This app is already in your cycle list",
            ));
            return false;
        }

        let name = app.name.clone();
        let mut apps = self.config.apps.clone();
        apps.push(app);
        self.update_apps(apps);
        self.notifier.notify(Notice::info(
            "App Added",
            format!("{name} added to cycle list"),
        ));
        true
    }

    pub fn remove_app(&mut self, package_name: &str) -> bool {
        let Some(position) = self
            .config
            .apps
            .iter()
            .position(|app| app.package_name == package_name)
        else {
            return false;
        };
        let mut apps = self.config.apps.clone();
        let removed = apps.remove(position);
        self.update_apps(apps);
        self.notifier.notify(Notice::info(
            "App Removed",
            format!("{} removed from cycle list", removed.name),
        ));
        true
    }

    /// Moves the entry at `from` so it ends up at `to`.
    pub fn move_app(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.config.apps.len();
        if from >= len || to >= len {
            return Err(AppError::InvalidMove { from, to, len });
        }
        if from == to {
            return Ok(());
        }
        let mut apps = self.config.apps.clone();
        let app = apps.remove(from);
        apps.insert(to, app);
        self.update_apps(apps);
        Ok(())
    }

    /// Disables directly; enabling only starts the permission flow.
    pub fn toggle_service_enabled(&mut self) -> ServiceToggle {
        if self.disable_service() {
            return ServiceToggle::Disabled;
        }
        ServiceToggle::PermissionRequested(self.request_permission())
    }

    /// Turns the service off and cancels any outstanding request.
    /// Returns `false` when there was nothing to disable.
    pub fn disable_service(&mut self) -> bool {
        if !self.config.service_enabled && self.pending_grant.is_none() {
            return false;
        }
        self.pending_grant = None;
        self.config.service_enabled = false;
        self.persist();
        info!("accessibility service disabled");
        true
    }

    pub fn request_permission(&mut self) -> PermissionFlow {
        match self.begin_permission_request() {
            PermissionStart::Ready(flow) => flow,
            PermissionStart::OpenSettings {
                platform,
                generation,
            } => {
                let opened = open_settings(&platform);
                self.settings_opened(generation, opened)
            }
        }
    }

    /// Registers a new request. Any earlier request's grant is ignored from here on.
    pub fn begin_permission_request(&mut self) -> PermissionStart {
        self.last_generation += 1;
        let generation = self.last_generation;
        self.pending_grant = Some(generation);

        if self.platform.bridge().is_none() {
            self.notifier.notify(Notice::info(
                "Accessibility Settings",
                "This would open Android's accessibility settings in the real app",
            ));
            return PermissionStart::Ready(PermissionFlow::Simulated {
                generation,
                delay: SIMULATED_GRANT_DELAY,
            });
        }

        PermissionStart::OpenSettings {
            platform: self.platform.clone(),
            generation,
        }
    }

    pub fn settings_opened(
        &mut self,
        generation: u64,
        opened: std::result::Result<(), PlatformError>,
    ) -> PermissionFlow {
        match opened {
            Ok(()) => {
                self.notifier.notify(Notice::info(
                    "Accessibility Service",
                    "Please enable the App Cycler accessibility service in settings",
                ));
                PermissionFlow::AwaitingPlatform
            }
            Err(err) => {
                warn!("failed to open accessibility settings: {err}");
                if self.pending_grant == Some(generation) {
                    self.pending_grant = None;
                }
                self.notifier.notify(Notice::destructive(
                    "Accessibility Settings",
                    "Could not open accessibility settings",
                ));
                PermissionFlow::Failed
            }
        }
    }

    /// Enables the service if `generation` is still the outstanding request.
    pub fn complete_permission_grant(&mut self, generation: u64) -> bool {
        if self.pending_grant != Some(generation) {
            debug!("ignoring grant for stale permission request {generation}");
            return false;
        }
        self.grant();
        true
    }

    fn grant(&mut self) {
        self.pending_grant = None;
        self.config.service_enabled = true;
        self.persist();
        info!("accessibility permission granted");
        self.notifier.notify(Notice::info(
            "Accessibility Service",
            "App Cycler service enabled",
        ));
    }

    pub fn toggle_auto_start(&mut self) {
        let enabled = self.flip_auto_start();
        forward_auto_start(&self.platform, enabled);
    }

    /// Flips and persists the preference, returning the new value.
    pub fn flip_auto_start(&mut self) -> bool {
        self.config.auto_start_on_boot = !self.config.auto_start_on_boot;
        self.persist();
        self.config.auto_start_on_boot
    }

    /// Advances the cursor by one (wrapping) and launches the app it lands on.
    ///
    /// The cursor does not roll back when the launch fails; the next call moves
    /// past the failed entry.
    pub fn cycle_to_next_app(&mut self) -> CycleOutcome {
        match self.advance() {
            Some(target) => target.launch(&self.platform, self.notifier.as_ref()),
            None => CycleOutcome::NoApps,
        }
    }

    /// Moves the cursor without launching. `None` when the list is empty.
    pub fn advance(&mut self) -> Option<LaunchTarget> {
        if self.config.apps.is_empty() {
            self.notifier.notify(Notice::destructive(
                "No apps configured",
                "Add apps to your cycle list first",
            ));
            return None;
        }

        let next_index = (self.current_index + 1) % self.config.apps.len();
        self.current_index = next_index;
        let next = &self.config.apps[next_index];

        self.notifier.notify(Notice::info(
            "App Cycled",
            format!("Cycling to: {}", next.name),
        ));
        Some(LaunchTarget {
            index: next_index,
            package_name: next.package_name.clone(),
        })
    }

    /// Entry point for the steering-wheel button. Presses are ignored while the service is inactive.
    pub fn press_mode_button(&mut self) -> Option<CycleOutcome> {
        if !self.accepts_mode_press() {
            return None;
        }
        Some(self.cycle_to_next_app())
    }

    pub fn accepts_mode_press(&self) -> bool {
        if !self.service_active() {
            info!("service not active, Mode button press ignored");
            return false;
        }
        debug!("Mode button pressed");
        true
    }

    /// Folds a platform status reading into local state.
    /// Returns whether anything the UI shows changed.
    pub fn apply_status(&mut self, report: StatusReport) -> bool {
        let before = (self.config.service_enabled, self.service_active());

        if let Some(active) = report.active {
            if self.reported_active != Some(active) {
                debug!("platform reports service active={active}");
            }
            self.reported_active = Some(active);
        }

        match report.permission_granted {
            Some(true) if self.pending_grant.is_some() => self.grant(),
            Some(false) if self.config.service_enabled && self.pending_grant.is_none() => {
                info!("accessibility permission revoked, disabling service");
                self.config.service_enabled = false;
                self.persist();
                self.notifier.notify(Notice::destructive(
                    "Accessibility Service Disabled",
                    "The accessibility permission was revoked in system settings",
                ));
            }
            _ => {}
        }

        before != (self.config.service_enabled, self.service_active())
    }

    pub fn status_notice(&self) -> Notice {
        if self.service_active() {
            Notice::info(
                "Service Active",
                "App Cycler is currently active and monitoring SWC button presses",
            )
        } else {
            Notice::destructive(
                "Service Inactive",
                "App Cycler service is not currently active. Enable accessibility service to use it.",
            )
        }
    }

    /// Discards the persisted record, returns to the first-launch default and
    /// re-arms the boot trigger on the platform.
    pub fn reset(&mut self) {
        let auto_start = self.clear_to_default();
        forward_auto_start(&self.platform, auto_start);
    }

    /// The in-lock half of [`AppCycler::reset`]. Returns the default auto-start value.
    pub fn clear_to_default(&mut self) -> bool {
        if let Err(err) = self.store.clear() {
            warn!("failed to clear saved config: {err}");
        }
        self.config = AppCyclerConfig::default();
        self.current_index = 0;
        self.pending_grant = None;
        self.reported_active = None;
        self.notifier.notify(Notice::info(
            "Settings Reset",
            "All settings have been reset to default",
        ));
        self.config.auto_start_on_boot
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.config) {
            warn!("failed to save config: {err}");
        }
    }
}

/// Asks the platform to open its accessibility settings.
pub fn open_settings(platform: &Platform) -> std::result::Result<(), PlatformError> {
    match platform.bridge() {
        Some(bridge) => bridge.request_accessibility_permission(),
        None => Err(PlatformError::Unsupported("requestAccessibilityPermission")),
    }
}

/// Hands the boot-trigger preference to the platform; failures are only logged.
pub fn forward_auto_start(platform: &Platform, enabled: bool) {
    if let Some(bridge) = platform.bridge() {
        if let Err(err) = bridge.set_auto_start(enabled) {
            warn!("failed to forward auto-start preference: {err}");
        }
    }
}
