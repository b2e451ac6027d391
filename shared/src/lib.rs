//! Hardware-independent core of the temperature reporter.
//!
//! Everything the device decides lives here: what the display shows, when
//! the device connects, provisions or restarts, and what gets uploaded. The
//! firmware crate only supplies the platform traits.

pub mod button;
pub mod canvas;
pub mod config;
pub mod connectivity;
pub mod device;
pub mod device_id;
pub mod display;
pub mod ds18b20;
pub mod onewire;
pub mod provisioning;
pub mod readings;
pub mod reporting;
pub mod watchdog;
