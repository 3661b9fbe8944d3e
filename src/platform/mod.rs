//! Device primitives keyguard depends on but does not implement
//!
//! - [`DeviceControl`]: cooldown pause and device restart
//! - [`CloudLink`]: force a cloud disconnect and query connection diagnostics
//!
//! [`HostDevice`] implements [`DeviceControl`] for hosted builds.

mod host;

pub use host::{HostDevice, RESTART_EXIT_CODE};

use std::time::Duration;

/// Control over the device's execution.
pub trait DeviceControl {
    /// Block the caller for `duration`.
    fn pause(&mut self, duration: Duration);

    /// Reboot the device.
    ///
    /// Real implementations never return. Test doubles may, and callers
    /// must then carry on as if the restart is pending.
    fn request_restart(&mut self);
}

impl<D: DeviceControl + ?Sized> DeviceControl for &mut D {
    fn pause(&mut self, duration: Duration) {
        (**self).pause(duration)
    }

    fn request_restart(&mut self) {
        (**self).request_restart()
    }
}

/// System diagnostics a link may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticId {
    /// Error code of the last failed cloud connection attempt
    CloudConnectionError,
}

/// Handle on the cloud connection.
pub trait CloudLink {
    /// Drop the cloud connection and stop retrying.
    fn disconnect(&mut self);

    /// Read a diagnostic value. `None` when the firmware does not support
    /// the query or has no value, which is not an error.
    fn diagnostic(&self, id: DiagnosticId) -> Option<i32>;
}

impl<L: CloudLink + ?Sized> CloudLink for &mut L {
    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn diagnostic(&self, id: DiagnosticId) -> Option<i32> {
        (**self).diagnostic(id)
    }
}
