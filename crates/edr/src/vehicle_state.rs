//! Vehicle-state sensor: CAN-bus style telemetry saved as one CSV per event
//!
//! Unlike frame sensors this one appends every windowed sample as a row of a
//! single `vehicle_state.csv`, in buffer order.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Local};
use contracts::{SensorKind, StateField, VehicleKinematics, VehicleTelemetry};
use observability::metrics as edr_metrics;
use tracing::debug;

use crate::buffer::{Admission, BufferSettings, SaveSnapshot};
use crate::error::{EdrError, Result};
use crate::sensor::{BufferedCounts, EdrSensor, SensorHandle};

/// Buffer rate of the vehicle-state sensor (Hz)
pub const VEHICLE_STATE_RATE_HZ: f64 = 100.0;

pub const VEHICLE_STATE_FILE: &str = "vehicle_state.csv";

const DATE_TIME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S%.6f";

/// Pre-event rows carry 0 in the `Event Trigger` column, post-event rows 100
const PRE_EVENT_MARK: u8 = 0;
const POST_EVENT_MARK: u8 = 100;

pub struct VehicleStateSensor {
    handle: SensorHandle<VehicleTelemetry>,
}

impl VehicleStateSensor {
    /// `settings` supplies the event window; the rate is fixed at 100 Hz
    pub fn new(settings: BufferSettings) -> Self {
        Self {
            handle: SensorHandle::new(
                SensorKind::VehicleState,
                settings.with_rate(VEHICLE_STATE_RATE_HZ),
            ),
        }
    }

    pub fn handle(&self) -> SensorHandle<VehicleTelemetry> {
        self.handle.clone()
    }

    /// Derive a telemetry row from raw kinematics and buffer it
    pub fn generate_data(&self, timestamp: f64, kinematics: &VehicleKinematics) -> Admission {
        self.handle
            .on_data(timestamp, VehicleTelemetry::from_kinematics(kinematics))
    }
}

impl EdrSensor for VehicleStateSensor {
    fn id(&self) -> &str {
        ""
    }

    fn kind(&self) -> &SensorKind {
        self.handle.kind()
    }

    fn extension(&self) -> &str {
        ".csv"
    }

    fn on_event_trigger(&self, timestamp: f64) {
        self.handle.on_trigger(timestamp);
    }

    fn clear_event(&self) {
        self.handle.clear();
    }

    fn save(&self, event_dir: &Path) -> Result<usize> {
        let Some(snapshot) = self.handle.lock().begin_save() else {
            return Ok(0);
        };

        let dir = event_dir.join(self.kind().dir_name());
        let result = write_csv(&dir, &snapshot);
        self.handle.lock().end_save();

        if let Ok(rows) = result {
            edr_metrics::record_samples_written(self.kind().dir_name(), rows);
        }
        result
    }

    fn buffered(&self) -> BufferedCounts {
        self.handle.counts()
    }
}

fn write_csv(dir: &Path, snapshot: &SaveSnapshot<VehicleTelemetry>) -> Result<usize> {
    fs::create_dir_all(dir).map_err(|e| EdrError::io(dir, e))?;
    let path = dir.join(VEHICLE_STATE_FILE);
    let file = File::create(&path).map_err(|e| EdrError::io(&path, e))?;
    let mut writer = BufWriter::new(file);

    write_rows(&mut writer, snapshot).map_err(|e| EdrError::io(&path, e))?;

    debug!(path = %path.display(), rows = snapshot.samples.len(), "vehicle state written");
    Ok(snapshot.samples.len())
}

fn write_rows(
    writer: &mut impl Write,
    snapshot: &SaveSnapshot<VehicleTelemetry>,
) -> std::io::Result<()> {
    write!(writer, "Date-Time,Timestamp,Offset,Event Trigger")?;
    for field in StateField::ALL {
        write!(writer, ",{}", field.header())?;
    }
    writeln!(writer)?;

    let event_ts = snapshot.window.event_timestamp;
    for sample in &snapshot.samples {
        let offset = sample.offset_from(event_ts);
        let mark = if offset < 0.0 {
            PRE_EVENT_MARK
        } else {
            POST_EVENT_MARK
        };
        write!(
            writer,
            "{},{:?},{:?},{}",
            format_date_time(sample.timestamp),
            sample.timestamp,
            offset,
            mark
        )?;
        for field in StateField::ALL {
            match sample.payload.get(field) {
                Some(value) => write!(writer, ",{value}")?,
                None => write!(writer, ",")?,
            }
        }
        writeln!(writer)?;
    }

    writer.flush()
}

/// Local date-time of an epoch timestamp, empty when out of range
fn format_date_time(timestamp: f64) -> String {
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
        .map(|utc| {
            utc.with_timezone(&Local)
                .format(DATE_TIME_FORMAT)
                .to_string()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ControlInput, StateValue, Vector3};
    use tempfile::tempdir;

    fn kinematics(speed_x: f64) -> VehicleKinematics {
        VehicleKinematics {
            local_velocity: Vector3::new(speed_x, 0.0, 0.0),
            control: ControlInput {
                throttle: 0.5,
                hand_brake: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_date_time_format() {
        let formatted = format_date_time(1_700_000_000.25);
        // local timezone varies; check the shape
        assert_eq!(formatted.len(), "2023-11-14-22-13-20.250000".len());
        assert!(formatted.ends_with(".250000"));
    }

    #[test]
    fn test_csv_layout() {
        let dir = tempdir().unwrap();
        let sensor = VehicleStateSensor::new(BufferSettings::new(1.0, 1.0, 0.0));
        assert!(sensor.generate_data(100.0, &kinematics(10.0)).is_accepted());
        sensor.on_event_trigger(100.5);
        sensor.generate_data(101.0, &kinematics(20.0));

        let rows = sensor.save(dir.path()).unwrap();
        assert_eq!(rows, 2);

        let text =
            fs::read_to_string(dir.path().join("vehicle-state").join(VEHICLE_STATE_FILE)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        let header: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(header[..4], ["Date-Time", "Timestamp", "Offset", "Event Trigger"]);
        assert_eq!(header.len(), 4 + StateField::ALL.len());
        assert!(header.contains(&"Speed (km/h)"));
        assert!(header.contains(&"Service Brake"));

        let first: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(first[1], "100.0");
        assert_eq!(first[2], "-0.5");
        assert_eq!(first[3], "0");
        let speed_col = header.iter().position(|h| *h == "Speed (km/h)").unwrap();
        assert_eq!(first[speed_col], "36.0");
        let brake_col = header.iter().position(|h| *h == "Service Brake").unwrap();
        assert_eq!(first[brake_col], "True");
        // no GNSS fix: empty cells
        let lat_col = header.iter().position(|h| *h == "Latitude").unwrap();
        assert_eq!(first[lat_col], "");

        let second: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(second[3], "100");
    }

    #[test]
    fn test_rate_fixed_at_100hz() {
        let sensor = VehicleStateSensor::new(BufferSettings::new(1.0, 1.0, 1.0));
        assert!(sensor.generate_data(0.0, &kinematics(1.0)).is_accepted());
        assert_eq!(
            sensor.generate_data(0.005, &kinematics(1.0)),
            Admission::RateLimited
        );
        assert!(sensor.generate_data(0.01, &kinematics(1.0)).is_accepted());
        assert_eq!(sensor.handle().lock().capacity(), 100);
    }

    #[test]
    fn test_telemetry_values_pass_through() {
        let sensor = VehicleStateSensor::new(BufferSettings::new(1.0, 1.0, 0.0));
        sensor.generate_data(0.0, &kinematics(10.0));
        let handle = sensor.handle();
        let buffer = handle.lock();
        let sample = buffer.pre_event().next().unwrap();
        assert_eq!(
            sample.payload.get(StateField::AcceleratorPedal),
            Some(StateValue::Number(50.0))
        );
    }
}
