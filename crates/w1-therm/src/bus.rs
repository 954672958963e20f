use crate::parse::parse_w1_record;
use crate::types::{SensorSerial, TempUnit, TemperatureReading, NO_READING};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// Where the kernel's w1 subsystem exposes bus devices.
const SYSFS_ROOT: &str = "/sys/bus/w1/devices";

/// DS18B20 family code prefix on device names.
const FAMILY_PREFIX: &str = "28-";

/// Filename of the raw record under each device directory.
const SLAVE_FILE: &str = "w1_slave";

/// Handle on the 1-Wire bus, fixed to one output unit.
///
/// The handle is immutable after construction and holds no other state:
/// every query re-enumerates the bus and re-reads each device node, so
/// results always reflect current bus conditions. Callers polling tightly
/// pay a fresh directory scan per call. Reads block without timeout; a
/// stalled device node stalls the query (wrap your own timeout if needed).
pub struct W1Bus {
    root: PathBuf,
    unit: TempUnit,
}

impl W1Bus {
    /// Open the bus at the standard sysfs root.
    ///
    /// Loads the `w1-gpio` and `w1-therm` kernel modules as a best-effort,
    /// one-time side effect. Activation failure (no modprobe, no permission,
    /// modules built in) is logged and otherwise ignored; it is not retried.
    pub fn new(unit: TempUnit) -> Self {
        activate_drivers();
        Self {
            root: PathBuf::from(SYSFS_ROOT),
            unit,
        }
    }

    /// Open the bus at an explicit root without touching kernel modules.
    /// Intended for tests and non-standard overlays.
    pub fn with_root(root: impl Into<PathBuf>, unit: TempUnit) -> Self {
        Self {
            root: root.into(),
            unit,
        }
    }

    pub fn unit(&self) -> TempUnit {
        self.unit
    }

    /// Serial numbers of all DS18B20 sensors currently on the bus, in
    /// directory order (no ordering guarantee). An empty or missing sysfs
    /// root yields an empty list, never an error.
    pub fn list_sensors(&self) -> Vec<SensorSerial> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(root = %self.root.display(), error = %e, "w1 sysfs root not readable");
                return Vec::new();
            }
        };
        let mut serials = Vec::new();
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(FAMILY_PREFIX) {
                    serials.push(SensorSerial::from(name));
                }
            }
        }
        serials
    }

    /// First sensor in enumeration order with a usable record this cycle,
    /// converted to the configured unit.
    pub fn read_first(&self) -> Option<TemperatureReading> {
        for serial in self.list_sensors() {
            if let Some(celsius) = self.read_celsius(&serial) {
                return Some(TemperatureReading {
                    serial,
                    value: self.unit.convert(celsius),
                });
            }
        }
        None
    }

    /// Converted readings for every sensor whose record validated this
    /// cycle, in enumeration order. Sensors that failed CRC or vanished
    /// mid-cycle are omitted, not padded.
    pub fn read_all(&self) -> Vec<TemperatureReading> {
        let mut readings = Vec::new();
        for serial in self.list_sensors() {
            if let Some(celsius) = self.read_celsius(&serial) {
                readings.push(TemperatureReading {
                    value: self.unit.convert(celsius),
                    serial,
                });
            }
        }
        readings
    }

    /// Reading for one sensor by serial number. `None` covers both "not
    /// attached" and "attached but failed validation this cycle".
    pub fn read_by_serial(&self, serial: &str) -> Option<f64> {
        self.read_all()
            .into_iter()
            .find(|r| r.serial.as_str() == serial)
            .map(|r| r.value)
    }

    /// [`read_first`](Self::read_first) with the original driver's sentinel
    /// contract: [`NO_READING`] instead of `None`.
    pub fn read_first_or_sentinel(&self) -> f64 {
        self.read_first().map_or(NO_READING, |r| r.value)
    }

    /// [`read_by_serial`](Self::read_by_serial) with the original driver's
    /// sentinel contract: [`NO_READING`] instead of `None`.
    pub fn read_by_serial_or_sentinel(&self, serial: &str) -> f64 {
        self.read_by_serial(serial).unwrap_or(NO_READING)
    }

    /// Raw Celsius for one sensor, or `None` for any per-sensor failure:
    /// node gone (enumeration race), unreadable file, CRC `NO`, garbled
    /// record. None of these abort a multi-sensor query.
    fn read_celsius(&self, serial: &SensorSerial) -> Option<f64> {
        let path = self.slave_path(serial);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(sensor = %serial, error = %e, "sensor node unreadable this cycle");
                return None;
            }
        };
        let celsius = parse_w1_record(&raw);
        if celsius.is_none() {
            debug!(sensor = %serial, "record failed validation this cycle");
        }
        celsius
    }

    fn slave_path(&self, serial: &SensorSerial) -> PathBuf {
        self.root.join(serial.as_str()).join(SLAVE_FILE)
    }
}

/// Load the w1 bus and thermal sensor modules. Fire-and-forget: already
/// loaded or built-in modules make modprobe a no-op, and hosts where this
/// fails may still have a live bus from boot config.
fn activate_drivers() {
    for module in ["w1-gpio", "w1-therm"] {
        match Command::new("modprobe").arg(module).status() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(module, %status, "modprobe exited nonzero"),
            Err(e) => warn!(module, error = %e, "could not run modprobe"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::TempDir;

    const SERIAL_A: &str = "28-000004d5c1aa";
    const SERIAL_B: &str = "28-000004d5c1bb";

    fn fake_bus() -> Result<TempDir> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("w1_bus_master1"))?;
        Ok(dir)
    }

    fn add_sensor(dir: &TempDir, serial: &str, record: &str) -> Result<()> {
        let node = dir.path().join(serial);
        fs::create_dir(&node)?;
        fs::write(node.join(SLAVE_FILE), record)?;
        Ok(())
    }

    fn valid_record(millideg: i64) -> String {
        format!(
            "5c 01 4b 46 7f ff 0c 10 a3 : crc=a3 YES\n\
             5c 01 4b 46 7f ff 0c 10 a3 t={millideg}\n"
        )
    }

    const BAD_CRC: &str = "5c 01 4b 46 7f ff 0c 10 a3 : crc=a3 NO\n\
                           5c 01 4b 46 7f ff 0c 10 a3 t=23562\n";

    #[test]
    fn list_skips_non_family_entries() -> Result<()> {
        let dir = fake_bus()?;
        add_sensor(&dir, SERIAL_A, &valid_record(23562))?;
        let bus = W1Bus::with_root(dir.path(), TempUnit::Celsius);
        let serials = bus.list_sensors();
        assert_eq!(serials, vec![SensorSerial::from(SERIAL_A)]);
        Ok(())
    }

    #[test]
    fn list_on_missing_root_is_empty() {
        let bus = W1Bus::with_root("/nonexistent/w1/devices", TempUnit::Celsius);
        assert!(bus.list_sensors().is_empty());
    }

    #[test]
    fn read_all_omits_crc_failures() -> Result<()> {
        let dir = fake_bus()?;
        add_sensor(&dir, SERIAL_A, &valid_record(23562))?;
        add_sensor(&dir, SERIAL_B, BAD_CRC)?;
        let bus = W1Bus::with_root(dir.path(), TempUnit::Celsius);

        assert_eq!(bus.list_sensors().len(), 2);
        let readings = bus.read_all();
        assert_eq!(
            readings,
            vec![TemperatureReading {
                serial: SensorSerial::from(SERIAL_A),
                value: 23.562,
            }]
        );
        assert_eq!(bus.read_by_serial(SERIAL_B), None);
        assert_eq!(bus.read_by_serial_or_sentinel(SERIAL_B), NO_READING);
        assert_eq!(bus.read_first().map(|r| r.value), Some(23.562));
        Ok(())
    }

    #[test]
    fn fahrenheit_applies_to_every_query() -> Result<()> {
        let dir = fake_bus()?;
        add_sensor(&dir, SERIAL_A, &valid_record(23562))?;
        add_sensor(&dir, SERIAL_B, BAD_CRC)?;
        let bus = W1Bus::with_root(dir.path(), TempUnit::Fahrenheit);

        let readings = bus.read_all();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 74.4116);
        assert_eq!(bus.read_by_serial(SERIAL_A), Some(74.4116));
        assert_eq!(bus.read_first_or_sentinel(), 74.4116);
        Ok(())
    }

    #[test]
    fn empty_bus_yields_sentinel() -> Result<()> {
        let dir = fake_bus()?;
        let bus = W1Bus::with_root(dir.path(), TempUnit::Celsius);
        assert!(bus.read_first().is_none());
        assert_eq!(bus.read_first_or_sentinel(), NO_READING);
        assert!(bus.read_all().is_empty());
        assert_eq!(bus.read_by_serial_or_sentinel(SERIAL_A), NO_READING);
        Ok(())
    }

    #[test]
    fn negative_reading_survives_pipeline() -> Result<()> {
        let dir = fake_bus()?;
        add_sensor(&dir, SERIAL_A, &valid_record(-1250))?;
        let bus = W1Bus::with_root(dir.path(), TempUnit::Celsius);
        assert_eq!(bus.read_by_serial(SERIAL_A), Some(-1.25));
        Ok(())
    }

    #[test]
    fn queries_see_bus_changes_between_calls() -> Result<()> {
        let dir = fake_bus()?;
        add_sensor(&dir, SERIAL_A, &valid_record(20000))?;
        let bus = W1Bus::with_root(dir.path(), TempUnit::Celsius);
        assert_eq!(bus.read_all().len(), 1);

        // Sensor detaches; the next query must not remember it.
        fs::remove_dir_all(dir.path().join(SERIAL_A))?;
        assert!(bus.read_all().is_empty());
        assert_eq!(bus.read_by_serial_or_sentinel(SERIAL_A), NO_READING);
        Ok(())
    }
}
