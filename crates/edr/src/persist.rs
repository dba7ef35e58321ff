//! Payload serialization to disk
//!
//! Every payload stored in a frame-style sensor knows how to write itself as
//! a single file. Images become PNG, point clouds binary PLY, perception
//! snapshots pretty-printed JSON.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ImageData, ImageFormat, PerceptionSnapshot, PointCloudData};
use serde::Serialize;
use tracing::debug;

use crate::buffer::SaveSnapshot;
use crate::error::{EdrError, Result};

/// A payload that can persist itself as one file
pub trait Persist {
    fn save_to_disk(&self, path: &Path) -> Result<()>;
}

impl Persist for ImageData {
    fn save_to_disk(&self, path: &Path) -> Result<()> {
        let expected = self.width as usize * self.height as usize * self.format.bytes_per_pixel();
        if self.data.len() < expected {
            return Err(EdrError::encode(
                path,
                format!("image buffer holds {} bytes, expected {expected}", self.data.len()),
            ));
        }

        let (pixels, color) = match self.format {
            ImageFormat::Rgb8 => (self.data.to_vec(), image::ColorType::Rgb8),
            ImageFormat::Rgba8 => (self.data.to_vec(), image::ColorType::Rgba8),
            ImageFormat::Bgra8 => {
                let mut rgba = self.data.to_vec();
                for chunk in rgba.chunks_exact_mut(4) {
                    chunk.swap(0, 2); // B <-> R
                }
                (rgba, image::ColorType::Rgba8)
            }
        };

        image::save_buffer(path, &pixels[..expected], self.width, self.height, color)
            .map_err(|e| EdrError::encode(path, e))
    }
}

impl Persist for PointCloudData {
    fn save_to_disk(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| EdrError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        write_ply(&mut writer, self).map_err(|e| EdrError::io(path, e))
    }
}

fn write_ply(writer: &mut impl Write, pc: &PointCloudData) -> std::io::Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "element vertex {}", pc.num_points)?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    // stride 16 = x, y, z, intensity
    if pc.point_stride >= 16 {
        writeln!(writer, "property float intensity")?;
    }
    writeln!(writer, "end_header")?;

    let len = (pc.num_points as usize * pc.point_stride as usize).min(pc.data.len());
    writer.write_all(&pc.data[..len])?;
    writer.flush()
}

impl Persist for PerceptionSnapshot {
    fn save_to_disk(&self, path: &Path) -> Result<()> {
        write_pretty_json(path, self)
    }
}

/// Write `value` as JSON with 4-space indentation
pub fn write_pretty_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| EdrError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| EdrError::encode(path, e))?;
    writer.flush().map_err(|e| EdrError::io(path, e))
}

/// `{id}_{timestamp:19.8}_{±offset:.8}{ext}`; the id prefix is omitted for
/// sensors without an id.
///
/// The timestamp is right-aligned to 19 characters, so small (simulation)
/// timestamps are space padded.
pub fn frame_file_name(sensor_id: &str, timestamp: f64, offset: f64, ext: &str) -> String {
    let prefix = if sensor_id.is_empty() {
        String::new()
    } else {
        format!("{sensor_id}_")
    };
    format!("{prefix}{timestamp:19.8}_{offset:+.8}{ext}")
}

/// `base/<kind>/<id>`, or `base/<kind>` for sensors without an id
pub fn sensor_dir(event_dir: &Path, kind_dir: &str, sensor_id: &str) -> PathBuf {
    let dir = event_dir.join(kind_dir);
    if sensor_id.is_empty() {
        dir
    } else {
        dir.join(sensor_id)
    }
}

/// Write every sample of a snapshot into `dir`, one file each.
pub fn write_frames<P: Persist>(
    dir: &Path,
    sensor_id: &str,
    ext: &str,
    snapshot: &SaveSnapshot<P>,
) -> Result<usize> {
    fs::create_dir_all(dir).map_err(|e| EdrError::io(dir, e))?;

    let event_ts = snapshot.window.event_timestamp;
    for sample in &snapshot.samples {
        let name = frame_file_name(sensor_id, sample.timestamp, sample.offset_from(event_ts), ext);
        sample.payload.save_to_disk(&dir.join(name))?;
    }

    debug!(
        dir = %dir.display(),
        files = snapshot.samples.len(),
        "frames written"
    );
    Ok(snapshot.samples.len())
}

impl<P: Persist> SaveSnapshot<P> {
    /// Write into `event_dir/<kind_dir>/<sensor_id>` (see [`sensor_dir`])
    pub fn write(
        &self,
        event_dir: &Path,
        kind_dir: &str,
        sensor_id: &str,
        ext: &str,
    ) -> Result<usize> {
        let dir = sensor_dir(event_dir, kind_dir, sensor_id);
        write_frames(&dir, sensor_id, ext, self)
    }
}
