use std::sync::{Arc, Mutex};

use crate::{notice::Notifier, session::SharedCycler};

pub struct AppState {
    pub cycler: SharedCycler,
    pub notifier: Arc<dyn Notifier>,
    pub registered_hotkey: Arc<Mutex<Option<String>>>,
}

impl AppState {
    pub fn new(cycler: SharedCycler, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            cycler,
            notifier,
            registered_hotkey: Arc::new(Mutex::new(None)),
        }
    }
}
