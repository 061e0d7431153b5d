use std::time::Duration;

const RECEIVE_BUFFER_DEFAULT: usize = 8 * 1024;
const EXPIRED_TIME_S_DEFAULT: u64 = 2 * 60;
const EXPIRED_TIME_MS_DEFAULT: u64 = EXPIRED_TIME_S_DEFAULT * 1000;
const TIMEOUT_MS_DEFAULT: u64 = 3 * EXPIRED_TIME_MS_DEFAULT;

/// Tunables for one [`crate::session::SessionContext`]. Defaults match the
/// source's hardcoded constants (`RECEIVE_BUFFER_DEFAULT`,
/// `EXPIRED_TIME_MS_DEFAULT`, `TIMEOUT_MS_DEFAULT`) rather than inventing new
/// ones.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Initial capacity of the receive-side sliding buffer.
    pub receive_buffer_size: usize,
    /// How long a session may sit idle before the keep-alive manager fires
    /// its "expired" notification.
    pub keep_alive_expired: Duration,
    /// How long past that before the harder "timeout" notification fires.
    /// Always `3 * keep_alive_expired` unless set independently.
    pub keep_alive_timeout: Duration,
    /// Largest single-frame payload this session will accept, in bytes.
    /// `None` means unbounded — the source never imposed one either.
    pub max_frame_size: Option<usize>,
}

impl SessionConfig {
    /// Set the expiry in one call and derive the timeout as `3x`, matching
    /// `KeepAliveManager::SetExpiredTimeSec`.
    pub fn with_keep_alive_expired_secs(mut self, secs: u64) -> Self {
        self.keep_alive_expired = Duration::from_secs(secs);
        self.keep_alive_timeout = self.keep_alive_expired * 3;
        self
    }

    pub fn with_receive_buffer_size(mut self, size: usize) -> Self {
        self.receive_buffer_size = size;
        self
    }

    pub fn with_max_frame_size(mut self, size: Option<usize>) -> Self {
        self.max_frame_size = size;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            receive_buffer_size: RECEIVE_BUFFER_DEFAULT,
            keep_alive_expired: Duration::from_millis(EXPIRED_TIME_MS_DEFAULT),
            keep_alive_timeout: Duration::from_millis(TIMEOUT_MS_DEFAULT),
            max_frame_size: None,
        }
    }
}
