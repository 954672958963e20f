//! w1-therm: DS18B20 temperature readings over the Linux 1-Wire sysfs interface
//!
//! This crate talks to the kernel's `w1-gpio`/`w1-therm` drivers through the
//! sysfs directory they expose. It enumerates attached DS18B20 sensors, parses
//! their raw `w1_slave` records, and returns readings in the unit fixed at
//! construction. Nothing is cached: every query re-scans the bus, so a reading
//! always reflects current bus conditions.

mod types;
pub use types::{SensorSerial, TempUnit, TemperatureReading, NO_READING};

mod error;
pub use error::{Result, ThermError};

mod parse;

mod bus;
pub use bus::W1Bus;
