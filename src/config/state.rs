// Application state module
// Shared, read-only state handed to every connection

use super::types::Config;
use crate::send::Sender;
use std::io;

/// Application state
pub struct AppState {
    pub config: Config,
    pub sender: Sender,
}

impl AppState {
    /// Build the sender for the configured root
    ///
    /// Fails if the root cannot be made absolute (e.g. the working directory is gone).
    pub fn new(config: &Config) -> io::Result<Self> {
        Ok(Self {
            config: config.clone(),
            sender: Sender::new(config.send.clone())?,
        })
    }

    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }

    pub fn access_log_format(&self) -> &str {
        &self.config.logging.access_log_format
    }
}
