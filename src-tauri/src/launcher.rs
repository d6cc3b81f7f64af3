use log::{info, warn};

use crate::{
    notice::{Notice, Notifier},
    platform::Platform,
};

/// Asks the platform to bring `package_name` to the foreground.
///
/// Without a platform the launch is simulated and reported as a success.
pub fn launch(platform: &Platform, package_name: &str, notifier: &dyn Notifier) -> bool {
    let Some(bridge) = platform.bridge() else {
        info!("[simulated] would launch {package_name}");
        notifier.notify(Notice::info(
            "App Launch Simulated",
            format!("Would launch: {package_name}"),
        ));
        return true;
    };

    match bridge.launch_app(package_name) {
        Ok(true) => {
            info!("launched {package_name}");
            true
        }
        Ok(false) => {
            warn!("platform refused to launch {package_name}");
            notifier.notify(launch_failed(package_name));
            false
        }
        Err(err) => {
            warn!("failed to launch {package_name}: {err}");
            notifier.notify(launch_failed(package_name));
            false
        }
    }
}

fn launch_failed(package_name: &str) -> Notice {
    Notice::destructive("Launch Failed", format!("Could not launch {package_name}"))
}
