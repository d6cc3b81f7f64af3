use std::sync::Arc;

use tauri::{AppHandle, Emitter, State};

use crate::{
    catalog,
    cycler::{CycleOutcome, ServiceToggle},
    error::AppError,
    help::{self, HelpContent},
    models::{AppInfo, CyclerSnapshot},
    notice::{LogNotifier, Notice, Notifier},
    session::{self, lock, SharedCycler},
    state::AppState,
};

pub const NOTICE_EVENT: &str = "app-cycler://notice";
pub const STATE_CHANGED_EVENT: &str = "app-cycler://state-changed";

/// Forwards notices to the webview as toast events, falling back to the log.
pub struct EventNotifier {
    handle: AppHandle,
    fallback: LogNotifier,
}

impl EventNotifier {
    pub fn new(handle: AppHandle) -> Self {
        Self {
            handle,
            fallback: LogNotifier,
        }
    }
}

impl Notifier for EventNotifier {
    fn notify(&self, notice: Notice) {
        if let Err(err) = self.handle.emit(NOTICE_EVENT, &notice) {
            log::warn!("failed to emit notice event: {err}");
            self.fallback.notify(notice);
        }
    }
}

/// Emits a fresh snapshot so the webview picks up changes it did not ask for.
pub fn emit_state_changed(app_handle: &AppHandle, snapshot: CyclerSnapshot) {
    if let Err(err) = app_handle.emit(STATE_CHANGED_EVENT, snapshot) {
        log::warn!("failed to emit state change: {err}");
    }
}

/// Runs work that reaches the platform off the async runtime's workers.
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tauri::async_runtime::spawn_blocking(work)
        .await
        .map_err(|err| AppError::Task(err.to_string()))
}

fn cycler_of(state: &State<'_, AppState>) -> SharedCycler {
    Arc::clone(&state.cycler)
}

#[tauri::command]
pub fn get_snapshot(state: State<'_, AppState>) -> CyclerSnapshot {
    lock(&state.cycler).snapshot()
}

#[tauri::command]
pub async fn list_installed_apps(
    query: Option<String>,
    state: State<'_, AppState>,
) -> Result<Vec<AppInfo>, AppError> {
    let (platform, selected) = {
        let cycler = lock(&state.cycler);
        (cycler.platform().clone(), cycler.config().apps.clone())
    };
    let notifier = Arc::clone(&state.notifier);

    let installed = blocking(move || catalog::list_apps(&platform, notifier.as_ref())).await?;
    Ok(catalog::selectable_apps(
        &installed,
        &selected,
        query.as_deref().unwrap_or_default(),
    ))
}

#[tauri::command]
pub fn add_app(app: AppInfo, state: State<'_, AppState>) -> CyclerSnapshot {
    let mut cycler = lock(&state.cycler);
    cycler.add_app(app);
    cycler.snapshot()
}

#[tauri::command]
pub fn remove_app(package_name: String, state: State<'_, AppState>) -> CyclerSnapshot {
    let mut cycler = lock(&state.cycler);
    cycler.remove_app(&package_name);
    cycler.snapshot()
}

#[tauri::command]
pub fn move_app(
    from: usize,
    to: usize,
    state: State<'_, AppState>,
) -> Result<CyclerSnapshot, AppError> {
    let mut cycler = lock(&state.cycler);
    cycler.move_app(from, to)?;
    Ok(cycler.snapshot())
}

#[tauri::command]
pub fn update_apps(apps: Vec<AppInfo>, state: State<'_, AppState>) -> CyclerSnapshot {
    let mut cycler = lock(&state.cycler);
    cycler.update_apps(apps);
    cycler.snapshot()
}

/// Returns immediately; the webview hears about the grant through [`STATE_CHANGED_EVENT`].
#[tauri::command]
pub async fn toggle_service(
    app_handle: AppHandle,
    state: State<'_, AppState>,
) -> Result<CyclerSnapshot, AppError> {
    let cycler = cycler_of(&state);

    let toggle = blocking({
        let cycler = Arc::clone(&cycler);
        move || session::start_toggle(&cycler)
    })
    .await?;

    if let ServiceToggle::PermissionRequested(flow) = toggle {
        let cycler = Arc::clone(&cycler);
        tauri::async_runtime::spawn(async move {
            if session::finish_flow(&cycler, flow).await {
                let snapshot = lock(&cycler).snapshot();
                emit_state_changed(&app_handle, snapshot);
            }
        });
    }

    Ok(lock(&cycler).snapshot())
}

#[tauri::command]
pub async fn toggle_auto_start(state: State<'_, AppState>) -> Result<CyclerSnapshot, AppError> {
    let cycler = cycler_of(&state);
    blocking(move || {
        session::toggle_auto_start(&cycler);
        lock(&cycler).snapshot()
    })
    .await
}

#[tauri::command]
pub async fn cycle_next_app(state: State<'_, AppState>) -> Result<CycleOutcome, AppError> {
    let cycler = cycler_of(&state);
    blocking(move || session::cycle_next(&cycler)).await
}

#[tauri::command]
pub async fn press_mode_button(
    state: State<'_, AppState>,
) -> Result<Option<CycleOutcome>, AppError> {
    let cycler = cycler_of(&state);
    blocking(move || session::press_mode_button(&cycler)).await
}

#[tauri::command]
pub fn service_status_notice(state: State<'_, AppState>) -> Notice {
    lock(&state.cycler).status_notice()
}

#[tauri::command]
pub async fn reset_settings(state: State<'_, AppState>) -> Result<CyclerSnapshot, AppError> {
    let cycler = cycler_of(&state);
    blocking(move || {
        session::reset(&cycler);
        lock(&cycler).snapshot()
    })
    .await
}

#[tauri::command]
pub fn help_content() -> HelpContent {
    help::help_content()
}
