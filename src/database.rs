//! Read-only access to the per-slice feature database.
//!
//! Tables used:
//! ```text
//! images(image_id, camera_id, name)
//! cameras(camera_id, model, width, height, params)   params: packed f64
//! keypoints(image_id, rows, cols, data)              data: packed f32, rows x cols
//! ```
use std::path::{Path, PathBuf};

use glam::Vec2;
use rusqlite::{Connection, OpenFlags, params};

use crate::error::{ConvertError, Result};
use crate::types::{CameraId, CameraParams, ImageId};

/// The queries the converter needs from a feature database.
pub trait FeatureDatabase {
    /// Database id of the image with exactly this file name.
    fn lookup_image_id(&self, name: &str) -> Result<ImageId>;

    /// Camera row of the camera used by `image_id`.
    fn camera_params(&self, image_id: ImageId) -> Result<CameraParams>;

    /// Keypoint locations of `image_id` in stored order.
    fn keypoints(&self, image_id: ImageId) -> Result<Vec<Vec2>>;
}

/// A database file on disk. Every query opens its own read-only connection.
#[derive(Debug, Clone)]
pub struct SliceDatabase {
    path: PathBuf,
}

impl SliceDatabase {
    pub fn new(path: impl AsRef<Path>) -> SliceDatabase {
        SliceDatabase {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection> {
        log::trace!("opening {}", self.path.display());
        Ok(Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }
}

/// Collects all rows and insists on exactly one.
fn exactly_one<T>(rows: Vec<T>, what: impl FnOnce() -> String) -> Result<T> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (Some(row), 1) => Ok(row),
        _ => Err(ConvertError::NotFound {
            what: what(),
            rows: count,
        }),
    }
}

impl FeatureDatabase for SliceDatabase {
    fn lookup_image_id(&self, name: &str) -> Result<ImageId> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT image_id FROM images WHERE name=?1;")?;
        let rows = stmt
            .query_map(params![name], |row| row.get::<_, ImageId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        exactly_one(rows, || format!("image named '{}'", name))
    }

    fn camera_params(&self, image_id: ImageId) -> Result<CameraParams> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare("SELECT camera_id FROM images WHERE image_id=?1;")?;
        let rows = stmt
            .query_map(params![image_id], |row| row.get::<_, CameraId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let camera_id = exactly_one(rows, || format!("camera of image {}", image_id))?;

        let mut stmt =
            conn.prepare("SELECT model, width, height, params FROM cameras WHERE camera_id=?1;")?;
        let rows = stmt
            .query_map(params![camera_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let (model, width, height, blob) =
            exactly_one(rows, || format!("camera {}", camera_id))?;

        Ok(CameraParams {
            camera_id,
            model,
            width,
            height,
            params: decode_f64_blob(&blob, &format!("params of camera {}", camera_id))?,
        })
    }

    fn keypoints(&self, image_id: ImageId) -> Result<Vec<Vec2>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT rows, cols, data FROM keypoints WHERE image_id=?1;")?;
        let rows = stmt
            .query_map(params![image_id], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, Option<Vec<u8>>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let (num_rows, num_cols, blob) =
            exactly_one(rows, || format!("keypoints of image {}", image_id))?;
        decode_keypoints(
            num_rows as usize,
            num_cols as usize,
            blob.as_deref().unwrap_or_default(),
            &format!("keypoints of image {}", image_id),
        )
    }
}

/// Decodes a packed little-endian `f64` array.
pub fn decode_f64_blob(blob: &[u8], what: &str) -> Result<Vec<f64>> {
    if blob.len() % 8 != 0 {
        return Err(ConvertError::InvalidBlob {
            what: what.to_string(),
            reason: format!("{} bytes is not a multiple of 8", blob.len()),
        });
    }
    Ok(blob
        .chunks_exact(8)
        .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .collect())
}

/// Decodes a packed little-endian `f32` matrix of `rows x cols` and keeps the
/// first two columns of every row as `(x, y)`.
pub fn decode_keypoints(rows: usize, cols: usize, blob: &[u8], what: &str) -> Result<Vec<Vec2>> {
    if rows == 0 {
        return Ok(Vec::new());
    }
    if cols < 2 {
        return Err(ConvertError::InvalidBlob {
            what: what.to_string(),
            reason: format!("need at least 2 columns, found {}", cols),
        });
    }
    let expected = rows * cols * 4;
    if blob.len() != expected {
        return Err(ConvertError::InvalidBlob {
            what: what.to_string(),
            reason: format!(
                "{} x {} f32 values need {} bytes, found {}",
                rows,
                cols,
                expected,
                blob.len()
            ),
        });
    }
    let values: Vec<f32> = blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(values
        .chunks_exact(cols)
        .map(|row| Vec2::new(row[0], row[1]))
        .collect())
}
