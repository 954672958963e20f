//! Parser for the kernel's two-line `w1_slave` record:
//!
//! ```text
//! 4b 01 4b 46 7f ff 0c 10 d8 : crc=d8 YES
//! 4b 01 4b 46 7f ff 0c 10 d8 t=20687
//! ```
//!
//! Line 1 ends with the CRC verdict; line 2 carries the raw temperature in
//! millidegrees Celsius after `t=`.

/// Extract the Celsius value from a raw record, or `None` if the record is
/// unusable this cycle (CRC `NO`, missing `t=`, truncated or garbled
/// payload). Transient bus noise is expected; a single bad record must never
/// abort a polling caller, so every failure mode collapses to `None`.
pub(crate) fn parse_w1_record(raw: &str) -> Option<f64> {
    let mut lines = raw.lines();
    let crc_line = lines.next()?;
    if !crc_line.trim().ends_with("YES") {
        return None;
    }
    let data_line = lines.next()?;
    let pos = data_line.find("t=")?;
    let millideg: i64 = data_line[pos + 2..].trim().parse().ok()?;
    Some(millideg as f64 / 1000.0)
}
