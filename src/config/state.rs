// Application state module
// Shared by every connection on both listeners

use std::time::Duration;

use chrono::{DateTime, Local};

use super::types::Config;
use crate::objects::{ObjectNamespace, StorageLocation};

/// Application state
pub struct AppState {
    pub config: Config,
    pub objects: ObjectNamespace,
    pub started_at: DateTime<Local>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let location = StorageLocation::from_config(config.objects.storage_dir.as_deref());
        let idle_timeout =
            (config.objects.idle_timeout > 0).then_some(Duration::from_secs(config.objects.idle_timeout));

        Self {
            config: config.clone(),
            objects: ObjectNamespace::new(location, config.objects.mailbox_capacity, idle_timeout),
            started_at: Local::now(),
        }
    }
}
