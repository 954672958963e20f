use thiserror::Error;

pub type Result<T, E = ThermError> = core::result::Result<T, E>;

/// The only hard failure in this crate. Per-sensor read glitches (bad CRC,
/// vanished device node, malformed record) are never errors; the sensor is
/// simply absent from that cycle's results.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThermError {
    #[error("invalid temperature unit: {0} (expected celsius or fahrenheit)")]
    InvalidUnit(String),
}
