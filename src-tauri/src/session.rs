//! Shared cycler plus the flows that reach the platform.
//!
//! Bridge calls can block for as long as the platform takes to answer, so none
//! of them run while the cycler lock is held: state changes happen under the
//! lock and the platform call follows once the guard is dropped.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use log::{debug, warn};

use crate::{
    cycler::{
        self, AppCycler, CycleOutcome, LaunchTarget, PermissionFlow, PermissionStart,
        ServiceToggle, StatusReport,
    },
    models::CyclerSnapshot,
    notice::Notifier,
    platform::Platform,
};

/// How often the platform's service status is re-read.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(3);

pub type SharedCycler = Arc<Mutex<AppCycler>>;

pub fn shared(cycler: AppCycler) -> SharedCycler {
    Arc::new(Mutex::new(cycler))
}

/// Locks the cycler, recovering from a poisoned lock since the state is always left consistent.
pub fn lock(shared: &SharedCycler) -> MutexGuard<'_, AppCycler> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// Cursor movement taken under the lock, launched after it is released.
struct Advance {
    target: Option<LaunchTarget>,
    platform: Platform,
    notifier: Arc<dyn Notifier>,
}

impl Advance {
    fn take(cycler: &mut AppCycler) -> Self {
        Self {
            target: cycler.advance(),
            platform: cycler.platform().clone(),
            notifier: cycler.notifier(),
        }
    }

    fn launch(self) -> CycleOutcome {
        match self.target {
            Some(target) => target.launch(&self.platform, self.notifier.as_ref()),
            None => CycleOutcome::NoApps,
        }
    }
}

/// Advances the rotation and launches the next app.
pub fn cycle_next(shared: &SharedCycler) -> CycleOutcome {
    let advance = Advance::take(&mut lock(shared));
    advance.launch()
}

/// Mode button entry point; `None` while the service is inactive.
pub fn press_mode_button(shared: &SharedCycler) -> Option<CycleOutcome> {
    let advance = {
        let mut cycler = lock(shared);
        if !cycler.accepts_mode_press() {
            return None;
        }
        Advance::take(&mut cycler)
    };
    Some(advance.launch())
}

/// Flips the boot preference and forwards it; returns the new value.
pub fn toggle_auto_start(shared: &SharedCycler) -> bool {
    let (enabled, platform) = {
        let mut cycler = lock(shared);
        (cycler.flip_auto_start(), cycler.platform().clone())
    };
    cycler::forward_auto_start(&platform, enabled);
    enabled
}

pub fn reset(shared: &SharedCycler) {
    let (auto_start, platform) = {
        let mut cycler = lock(shared);
        (cycler.clear_to_default(), cycler.platform().clone())
    };
    cycler::forward_auto_start(&platform, auto_start);
}

/// Registers a permission request and opens the system settings if there is a platform.
pub fn start_permission(shared: &SharedCycler) -> PermissionFlow {
    let start = lock(shared).begin_permission_request();
    match start {
        PermissionStart::Ready(flow) => flow,
        PermissionStart::OpenSettings {
            platform,
            generation,
        } => {
            let opened = cycler::open_settings(&platform);
            lock(shared).settings_opened(generation, opened)
        }
    }
}

/// Synchronous half of the UI switch: disables, or starts a permission request.
pub fn start_toggle(shared: &SharedCycler) -> ServiceToggle {
    if lock(shared).disable_service() {
        return ServiceToggle::Disabled;
    }
    ServiceToggle::PermissionRequested(start_permission(shared))
}

/// Runs the permission flow to completion.
///
/// The simulated path grants after its delay. The platform path returns as
/// soon as the settings surface is open; [`reconcile_once`] completes it.
pub async fn request_permission(shared: SharedCycler) -> PermissionFlow {
    let flow = start_permission(&shared);
    finish_flow(&shared, flow).await;
    flow
}

/// Toggle wired to the UI switch: disabling is immediate, enabling goes through the permission flow.
pub async fn toggle_service(shared: SharedCycler) -> ServiceToggle {
    let toggle = start_toggle(&shared);
    if let ServiceToggle::PermissionRequested(flow) = toggle {
        finish_flow(&shared, flow).await;
    }
    toggle
}

/// Waits out a simulated grant. Returns whether it enabled the service.
pub async fn finish_flow(shared: &SharedCycler, flow: PermissionFlow) -> bool {
    match flow {
        PermissionFlow::Simulated { generation, delay } => {
            tokio::time::sleep(delay).await;
            lock(shared).complete_permission_grant(generation)
        }
        PermissionFlow::AwaitingPlatform | PermissionFlow::Failed => false,
    }
}

/// Reads the platform's view of the service without holding the cycler lock.
pub fn read_status(platform: &Platform) -> StatusReport {
    let Some(bridge) = platform.bridge() else {
        return StatusReport::default();
    };

    let active = bridge
        .service_status()
        .map_err(|err| warn!("service status check failed: {err}"))
        .ok();
    let permission_granted = bridge
        .accessibility_permission()
        .map_err(|err| warn!("permission check failed: {err}"))
        .ok();

    StatusReport {
        active,
        permission_granted,
    }
}

/// One poll tick. Returns the new snapshot when the reading changed what the UI shows.
pub fn reconcile_once(shared: &SharedCycler) -> Option<CyclerSnapshot> {
    let platform = lock(shared).platform().clone();
    let report = read_status(&platform);

    let mut cycler = lock(shared);
    if cycler.apply_status(report) {
        Some(cycler.snapshot())
    } else {
        None
    }
}

/// Status poll loop. Each tick is independent; `on_change` hears about every tick that changed state.
pub async fn run_status_poll<F>(shared: SharedCycler, interval: Duration, on_change: F)
where
    F: Fn(CyclerSnapshot) + Send + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    debug!("status poll every {interval:?}");

    loop {
        ticker.tick().await;
        if let Some(snapshot) = reconcile_once(&shared) {
            on_change(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::{
        config::MemoryConfigStore,
        cycler::SIMULATED_GRANT_DELAY,
        models::AppInfo,
        notice::RecordingNotifier,
        platform::fake,
    };

    fn cycler(platform: Platform) -> SharedCycler {
        shared(AppCycler::load(
            Arc::new(MemoryConfigStore::new()),
            platform,
            Arc::new(RecordingNotifier::new()),
        ))
    }

    fn abc() -> Vec<AppInfo> {
        vec![
            AppInfo::new("A", "pkg.a"),
            AppInfo::new("B", "pkg.b"),
            AppInfo::new("C", "pkg.c"),
        ]
    }

    fn enabled(shared: &SharedCycler) -> bool {
        lock(shared).config().service_enabled
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_permission_grants_after_delay() {
        let shared = cycler(Platform::Unavailable);
        let task = tokio::spawn(toggle_service(shared.clone()));

        tokio::time::sleep(SIMULATED_GRANT_DELAY / 2).await;
        assert!(!enabled(&shared));

        let toggle = task.await.unwrap();
        assert!(matches!(
            toggle,
            ServiceToggle::PermissionRequested(PermissionFlow::Simulated {
                delay: SIMULATED_GRANT_DELAY,
                ..
            })
        ));
        assert!(enabled(&shared));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_simulated_grant_does_not_complete_a_newer_request() {
        let shared = cycler(Platform::Unavailable);

        let first = tokio::spawn(toggle_service(shared.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(toggle_service(shared.clone()).await, ServiceToggle::Disabled);

        tokio::time::sleep(Duration::from_millis(900)).await;
        let second = tokio::spawn(toggle_service(shared.clone()));

        // The first request's timer has fired by now.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!enabled(&shared));
        assert!(lock(&shared).permission_pending());

        first.await.unwrap();
        second.await.unwrap();
        assert!(enabled(&shared));
    }

    #[tokio::test(start_paused = true)]
    async fn platform_permission_is_completed_by_poll() {
        let (bridge, platform) = fake::platform();
        let shared = cycler(platform);

        assert_eq!(
            request_permission(shared.clone()).await,
            PermissionFlow::AwaitingPlatform
        );
        assert!(!enabled(&shared));

        let changes = Arc::new(Mutex::new(Vec::new()));
        let poll = tokio::spawn(run_status_poll(shared.clone(), STATUS_POLL_INTERVAL, {
            let changes = Arc::clone(&changes);
            move |snapshot| changes.lock().unwrap().push(snapshot)
        }));
        tokio::time::sleep(STATUS_POLL_INTERVAL).await;
        assert!(!enabled(&shared));
        assert!(changes.lock().unwrap().is_empty());

        *bridge.permission_granted.lock().unwrap() = Some(true);
        *bridge.service_active.lock().unwrap() = Some(true);
        tokio::time::sleep(STATUS_POLL_INTERVAL * 2).await;
        {
            let cycler = lock(&shared);
            assert!(cycler.config().service_enabled);
            assert!(cycler.service_active());
        }
        poll.abort();

        let changes = changes.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].service_active);
    }

    #[test]
    fn reconcile_reports_only_ticks_that_change_state() {
        let (bridge, platform) = fake::platform();
        *bridge.service_active.lock().unwrap() = Some(true);
        *bridge.permission_granted.lock().unwrap() = Some(true);
        let shared = cycler(platform);

        assert_eq!(start_permission(&shared), PermissionFlow::AwaitingPlatform);
        let snapshot = reconcile_once(&shared).expect("grant should be reported");
        assert!(snapshot.config.service_enabled);
        assert!(snapshot.service_active);
        assert_eq!(reconcile_once(&shared), None);

        *bridge.permission_granted.lock().unwrap() = Some(false);
        let snapshot = reconcile_once(&shared).expect("revocation should be reported");
        assert!(!snapshot.config.service_enabled);
        assert!(!snapshot.service_active);
    }

    #[test]
    fn reconcile_tolerates_failing_checks() {
        let (bridge, platform) = fake::platform();
        *bridge.service_active.lock().unwrap() = None;
        *bridge.permission_granted.lock().unwrap() = None;
        assert_eq!(read_status(&platform), StatusReport::default());

        let shared = cycler(platform);
        assert_eq!(reconcile_once(&shared), None);
        assert!(!lock(&shared).service_active());
    }

    #[test]
    fn unavailable_platform_reports_nothing() {
        assert_eq!(read_status(&Platform::Unavailable), StatusReport::default());
    }

    #[test]
    fn slow_launch_does_not_hold_the_cycler_lock() {
        let (bridge, platform) = fake::platform();
        *bridge.launch_delay.lock().unwrap() = Some(Duration::from_millis(800));
        let shared = cycler(platform);
        lock(&shared).update_apps(abc());

        let worker = {
            let shared = shared.clone();
            std::thread::spawn(move || cycle_next(&shared))
        };

        let waiting = Instant::now();
        while bridge.launches().is_empty() {
            assert!(waiting.elapsed() < Duration::from_secs(5), "launch never started");
            std::thread::sleep(Duration::from_millis(1));
        }

        let started = Instant::now();
        let snapshot = lock(&shared).snapshot();
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(snapshot.current_index, 1);

        assert_eq!(
            worker.join().unwrap(),
            CycleOutcome::Launched {
                index: 1,
                package_name: "pkg.b".into(),
                success: true,
            }
        );
    }

    #[test]
    fn mode_press_is_dropped_while_inactive() {
        let (bridge, platform) = fake::platform();
        let shared = cycler(platform);
        lock(&shared).update_apps(abc());

        assert_eq!(press_mode_button(&shared), None);
        assert!(bridge.launches().is_empty());
    }

    #[test]
    fn auto_start_and_reset_reach_the_platform() {
        let (bridge, platform) = fake::platform();
        let shared = cycler(platform);

        assert!(!toggle_auto_start(&shared));
        assert!(bridge.calls().contains(&"set_auto_start:false".to_string()));

        reset(&shared);
        assert!(lock(&shared).config().auto_start_on_boot);
        assert_eq!(
            bridge.calls().last().map(String::as_str),
            Some("set_auto_start:true")
        );
    }
}
