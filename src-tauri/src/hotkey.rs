use std::sync::Arc;

use tauri::AppHandle;
use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

use crate::{session, state::AppState};

/// Shortcut that stands in for the steering-wheel Mode button in desktop previews.
pub const MODE_BUTTON_HOTKEY: &str = "Alt+M";

pub fn bind_mode_hotkey(
    app_handle: &AppHandle,
    state: &AppState,
    hotkey: &str,
) -> Result<(), String> {
    if hotkey.trim().is_empty() {
        return Err("hotkey must not be empty".into());
    }

    let mut current_hotkey = state
        .registered_hotkey
        .lock()
        .map_err(|_| "hotkey state is poisoned".to_string())?;

    if let Some(previous) = current_hotkey.as_deref() {
        if let Err(err) = app_handle.global_shortcut().unregister(previous) {
            log::warn!("failed to unregister previous hotkey {previous}: {err}");
        }
    }

    let hotkey_string = hotkey.trim().to_string();
    let cycler = Arc::clone(&state.cycler);
    app_handle
        .global_shortcut()
        .on_shortcut(hotkey_string.as_str(), move |_app_handle, _, event| {
            if event.state == ShortcutState::Pressed {
                log::debug!("simulated Mode button press");
                let cycler = Arc::clone(&cycler);
                tauri::async_runtime::spawn_blocking(move || session::press_mode_button(&cycler));
            }
        })
        .map_err(|err| err.to_string())?;

    *current_hotkey = Some(hotkey_string);
    Ok(())
}
