//! Configuration loading
//!
//! One JSON file describes the live slot, the backup medium and the
//! reconcile/monitor tuning. Every optional field has a serde default and
//! the whole file is validated before anything touches a medium.

mod errors;
mod settings;

pub use errors::{ConfigError, ConfigErrorCode, ConfigResult};
pub use settings::{BackendConfig, KeyguardConfig, LiveSlotConfig};
