pub mod catalog;
pub mod config;
pub mod cycler;
pub mod error;
pub mod help;
pub mod launcher;
pub mod models;
pub mod notice;
pub mod platform;
pub mod session;

#[cfg(feature = "shell")]
mod commands;
#[cfg(all(feature = "shell", desktop))]
mod hotkey;
#[cfg(all(feature = "shell", mobile))]
mod mobile;
#[cfg(feature = "shell")]
mod state;

#[cfg(feature = "shell")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::Arc;

    use commands::{
        add_app, cycle_next_app, emit_state_changed, get_snapshot, help_content,
        list_installed_apps, move_app, press_mode_button, remove_app, reset_settings,
        service_status_notice, toggle_auto_start, toggle_service, update_apps, EventNotifier,
    };
    use config::{ConfigStore, MirroredConfigStore};
    use cycler::AppCycler;
    use log::info;
    use notice::Notifier;
    use platform::Platform;
    use session::STATUS_POLL_INTERVAL;
    use state::AppState;
    use tauri::Manager;

    let builder = tauri::Builder::default();
    #[cfg(desktop)]
    let builder = builder.plugin(tauri_plugin_global_shortcut::Builder::new().build());
    #[cfg(mobile)]
    let builder = builder.plugin(mobile::init());

    builder
        .invoke_handler(tauri::generate_handler![
            get_snapshot,
            list_installed_apps,
            add_app,
            remove_app,
            move_app,
            update_apps,
            toggle_service,
            toggle_auto_start,
            cycle_next_app,
            press_mode_button,
            service_status_notice,
            reset_settings,
            help_content
        ])
        .setup(|app| {
            let handle = app.handle().clone();
            let platform = app
                .try_state::<Platform>()
                .map(|platform| platform.inner().clone())
                .unwrap_or_default();
            info!("starting with {platform:?}");

            let local = config::store_in(app.path().app_config_dir().ok())?;
            let store: Arc<dyn ConfigStore> =
                Arc::new(MirroredConfigStore::new(local, platform.clone()));
            let notifier: Arc<dyn Notifier> = Arc::new(EventNotifier::new(handle.clone()));

            let cycler = session::shared(AppCycler::load(store, platform, notifier.clone()));
            app.manage(AppState::new(Arc::clone(&cycler), notifier));

            let poll_handle = handle.clone();
            tauri::async_runtime::spawn(session::run_status_poll(
                Arc::clone(&cycler),
                STATUS_POLL_INTERVAL,
                move |snapshot| emit_state_changed(&poll_handle, snapshot),
            ));

            #[cfg(desktop)]
            desktop::setup(app, &handle)?;

            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

#[cfg(all(feature = "shell", desktop))]
mod desktop {
    use std::sync::Arc;

    use log::warn;
    use tauri::{menu::MenuBuilder, tray::TrayIconBuilder, App, AppHandle, Manager};

    use crate::{
        hotkey::{bind_mode_hotkey, MODE_BUTTON_HOTKEY},
        session,
        state::AppState,
    };

    const MAIN_WINDOW_LABEL: &str = "main";
    const TRAY_ID: &str = "main-tray";
    const MENU_SHOW: &str = "tray-show";
    const MENU_MODE: &str = "tray-mode";
    const MENU_QUIT: &str = "tray-quit";

    /// Desktop preview: a shortcut and a tray entry stand in for the Mode button.
    pub(crate) fn setup(app: &App, handle: &AppHandle) -> tauri::Result<()> {
        let state = app.state::<AppState>();
        if let Err(err) = bind_mode_hotkey(handle, &state, MODE_BUTTON_HOTKEY) {
            warn!("failed to register global shortcut {MODE_BUTTON_HOTKEY}: {err}");
        }

        let tray_menu = MenuBuilder::new(app)
            .text(MENU_SHOW, "Show window")
            .text(MENU_MODE, "Press Mode button")
            .separator()
            .text(MENU_QUIT, "Quit")
            .build()?;

        let tray_builder = if let Some(icon) = app.default_window_icon().cloned() {
            TrayIconBuilder::with_id(TRAY_ID).icon(icon)
        } else {
            TrayIconBuilder::with_id(TRAY_ID)
        };

        tray_builder
            .menu(&tray_menu)
            .tooltip("App Cycler")
            .on_menu_event(|app_handle, event| match event.id().as_ref() {
                MENU_SHOW => show_window(app_handle),
                MENU_MODE => {
                    let cycler = Arc::clone(&app_handle.state::<AppState>().cycler);
                    tauri::async_runtime::spawn_blocking(move || {
                        session::press_mode_button(&cycler)
                    });
                }
                MENU_QUIT => app_handle.exit(0),
                _ => {}
            })
            .build(app)?;

        Ok(())
    }

    fn show_window(app_handle: &AppHandle) {
        if let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) {
            let _ = window.show();
            let _ = window.set_focus();
        }
    }
}
