use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use log::{debug, warn};

use crate::{
    models::AppInfo,
    notice::{Notice, Notifier},
    platform::{InstalledApp, Platform},
};

/// Offered when the package manager cannot be reached (web preview, desktop, plugin missing).
const STATIC_CATALOG: &[(&str, &str)] = &[
    ("Google Maps", "com.google.android.apps.maps"),
    ("Spotify", "com.spotify.music"),
    ("Waze", "com.waze"),
    ("YouTube", "com.google.android.youtube"),
    ("Podcast Addict", "com.bambuna.podcastaddict"),
    ("VLC Media Player", "org.videolan.vlc"),
    ("Uber", "com.ubercab"),
    ("Audible", "com.audible.application"),
    ("Netflix", "com.netflix.mediaclient"),
    ("Weather", "com.weather.forecast"),
    ("Apple Music", "com.apple.android.music"),
    ("Pandora", "com.pandora.android"),
    ("SiriusXM", "com.sirius"),
    ("iHeartRadio", "com.clearchannel.iheartradio.controller"),
    ("Amazon Music", "com.amazon.mp3"),
    ("Google Play Music", "com.google.android.music"),
    ("SoundCloud", "com.soundcloud.android"),
    ("Tidal", "com.aspiro.tidal"),
];

pub fn static_catalog() -> Vec<AppInfo> {
    STATIC_CATALOG
        .iter()
        .map(|(name, package)| AppInfo::new(*name, *package))
        .collect()
}

/// Everything the platform reports as launchable, or the static catalog.
///
/// Never fails: a bridge error is replaced by the static catalog and a warning notice.
pub fn list_apps(platform: &Platform, notifier: &dyn Notifier) -> Vec<AppInfo> {
    let Some(bridge) = platform.bridge() else {
        return static_catalog();
    };

    match bridge.installed_apps() {
        Ok(installed) => {
            let apps = from_installed(installed);
            debug!("platform reported {} launchable apps", apps.len());
            apps
        }
        Err(err) => {
            warn!("failed to enumerate installed apps: {err}");
            notifier.notify(Notice::destructive(
                "Error loading apps",
                "Could not load installed applications, showing defaults",
            ));
            static_catalog()
        }
    }
}

fn from_installed(installed: Vec<InstalledApp>) -> Vec<AppInfo> {
    let mut seen = HashSet::new();
    let mut apps: Vec<AppInfo> = installed
        .into_iter()
        .filter(|entry| entry.launchable)
        .filter(|entry| !entry.package_name.trim().is_empty())
        .filter(|entry| seen.insert(entry.package_name.clone()))
        .map(|entry| {
            let name = if entry.app_name.trim().is_empty() {
                entry.package_name.clone()
            } else {
                entry.app_name.trim().to_string()
            };
            AppInfo {
                name,
                icon: entry.icon_base64.as_deref().and_then(icon_data_uri),
                package_name: entry.package_name,
                launchable: true,
            }
        })
        .collect();

    apps.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    apps
}

/// Turns a bare base64 PNG payload into a `data:` URI; invalid payloads yield `None`.
fn icon_data_uri(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("data:") {
        return Some(trimmed.to_string());
    }
    if BASE64.decode(trimmed).is_err() {
        warn!("discarding undecodable app icon");
        return None;
    }
    Some(format!("data:image/png;base64,{trimmed}"))
}

/// Catalog entries the selector dialog should offer: not yet in the cycle list,
/// and matching `query` against name or package (case-insensitive).
pub fn selectable_apps(catalog: &[AppInfo], selected: &[AppInfo], query: &str) -> Vec<AppInfo> {
    let needle = query.trim().to_lowercase();
    catalog
        .iter()
        .filter(|app| {
            !selected
                .iter()
                .any(|chosen| chosen.package_name == app.package_name)
        })
        .filter(|app| {
            needle.is_empty()
                || app.name.to_lowercase().contains(&needle)
                || app.package_name.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{notice::RecordingNotifier, platform::fake};

    fn installed(name: &str, package: &str, launchable: bool) -> InstalledApp {
        InstalledApp {
            app_name: name.into(),
            package_name: package.into(),
            icon_base64: None,
            launchable,
        }
    }

    #[test]
    fn unavailable_platform_uses_static_catalog_silently() {
        let notifier = RecordingNotifier::new();
        let apps = list_apps(&Platform::Unavailable, &notifier);
        assert_eq!(apps.len(), 18);
        assert!(apps.iter().all(|app| app.launchable));
        assert!(notifier.notices().is_empty());
    }

    #[test]
    fn bridge_failure_falls_back_with_warning() {
        let (bridge, platform) = fake::platform();
        *bridge.apps.lock().unwrap() = None;
        let notifier = RecordingNotifier::new();

        let apps = list_apps(&platform, &notifier);
        assert_eq!(apps, static_catalog());
        assert_eq!(notifier.titles(), vec!["Error loading apps"]);
    }

    #[test]
    fn platform_results_are_filtered_deduped_and_sorted() {
        let (bridge, platform) = fake::platform();
        let mut waze = installed("waze", "com.waze", true);
        waze.icon_base64 = Some("iVBORw0KGgo=".into());
        *bridge.apps.lock().unwrap() = Some(vec![
            installed("Spotify", "com.spotify.music", true),
            waze,
            installed("Settings", "com.android.settings", false),
            installed("Spotify Copy", "com.spotify.music", true),
            installed("", "org.videolan.vlc", true),
        ]);

        let apps = list_apps(&platform, &RecordingNotifier::new());
        let names: Vec<_> = apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["org.videolan.vlc", "Spotify", "waze"]);
        assert_eq!(
            apps[2].icon.as_deref(),
            Some("data:image/png;base64,iVBORw0KGgo=")
        );
    }

    #[test]
    fn invalid_icons_are_dropped() {
        assert_eq!(icon_data_uri("not base64 !!"), None);
        assert_eq!(icon_data_uri("   "), None);
        assert_eq!(
            icon_data_uri("data:image/webp;base64,AAAA").as_deref(),
            Some("data:image/webp;base64,AAAA")
        );
    }

    #[test]
    fn selector_hides_chosen_apps_and_matches_query() {
        let catalog = static_catalog();
        let chosen = vec![AppInfo::new("Spotify", "com.spotify.music")];

        let music = selectable_apps(&catalog, &chosen, "MUSIC");
        assert!(music.iter().all(|a| a.package_name != "com.spotify.music"));
        assert!(music.iter().any(|a| a.name == "Apple Music"));
        assert!(music.iter().any(|a| a.name == "Amazon Music"));

        let by_package = selectable_apps(&catalog, &chosen, "videolan");
        assert_eq!(by_package.len(), 1);
        assert_eq!(by_package[0].name, "VLC Media Player");

        assert_eq!(selectable_apps(&catalog, &chosen, "").len(), catalog.len() - 1);
    }
}
