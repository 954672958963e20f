use crate::error::ThermError;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sentinel returned by the compatibility query wrappers when no usable
/// reading exists. Well below the DS18B20's -55 C floor.
pub const NO_READING: f64 = -100.0;

/// Serial number of one DS18B20 on the bus, as sysfs names it
/// (e.g. "28-0316a4da7bff").
///
/// Produced by enumeration; the device it names may detach at any time, so a
/// serial is not a liveness guarantee.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorSerial(String);

impl SensorSerial {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SensorSerial {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SensorSerial {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SensorSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output unit, fixed once at bus construction and applied to every reading.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempUnit {
    Celsius,
    Fahrenheit,
}

impl TempUnit {
    /// Convert a Celsius value into this unit. No rounding; presentation
    /// rounding belongs to the caller.
    pub fn convert(self, celsius: f64) -> f64 {
        match self {
            TempUnit::Celsius => celsius,
            TempUnit::Fahrenheit => celsius * 1.8 + 32.0,
        }
    }
}

impl FromStr for TempUnit {
    type Err = ThermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(TempUnit::Celsius),
            "f" | "fahrenheit" => Ok(TempUnit::Fahrenheit),
            other => Err(ThermError::InvalidUnit(other.to_string())),
        }
    }
}

/// One converted reading paired with the sensor it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub serial: SensorSerial,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fahrenheit_conversion() {
        assert_eq!(TempUnit::Fahrenheit.convert(0.0), 32.0);
        assert_eq!(TempUnit::Fahrenheit.convert(23.562), 74.4116);
        assert_eq!(TempUnit::Fahrenheit.convert(-40.0), -40.0);
    }

    #[test]
    fn celsius_is_identity() {
        for c in [-55.0, 0.0, 23.562, 125.0] {
            assert_eq!(TempUnit::Celsius.convert(c), c);
        }
    }

    #[test]
    fn unit_from_str() {
        assert_eq!("celsius".parse::<TempUnit>(), Ok(TempUnit::Celsius));
        assert_eq!("Fahrenheit".parse::<TempUnit>(), Ok(TempUnit::Fahrenheit));
        assert_eq!(" F ".parse::<TempUnit>(), Ok(TempUnit::Fahrenheit));
        assert!("kelvin".parse::<TempUnit>().is_err());
    }
}
