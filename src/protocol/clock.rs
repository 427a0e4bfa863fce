use std::time::SystemTime;

pub type UnixTime = u64;

/// It returns the current timestamp, in seconds, using the system clock.
pub fn current_timestamp() -> UnixTime {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
