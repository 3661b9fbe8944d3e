//! Host implementation of device control
//!
//! A restart exits the process with [`RESTART_EXIT_CODE`]; the supervisor
//! that launched keyguard is expected to relaunch it.

use std::time::Duration;

use super::DeviceControl;

/// Exit status signalling "restart me" to a supervisor (EX_TEMPFAIL).
pub const RESTART_EXIT_CODE: i32 = 75;

#[derive(Debug, Clone, Default)]
pub struct HostDevice;

impl HostDevice {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceControl for HostDevice {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn request_restart(&mut self) {
        std::process::exit(RESTART_EXIT_CODE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_pause_blocks_for_duration() {
        let mut device = HostDevice::new();
        let start = Instant::now();
        device.pause(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
