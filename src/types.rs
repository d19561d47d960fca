use crate::error::{ConvertError, Result};

pub type ImageId = u32;
pub type CameraId = u32;
pub type PointId = u64;

/// Camera model written for every camera; NVM only carries one radial term.
pub const CAMERA_MODEL_NAME: &str = "SIMPLE_RADIAL";

/// Reprojection error written for every point, no error is computed.
pub const POINT_ERROR_PLACEHOLDER: u32 = 1;

/// Camera row as stored in the feature database.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraParams {
    pub camera_id: CameraId,
    pub model: i64,
    pub width: u32,
    pub height: u32,
    pub params: Vec<f64>,
}

/// One `cameras.txt` entry of the simple radial model.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRecord {
    pub camera_id: CameraId,
    pub width: u32,
    pub height: u32,
    pub focal: f64,
    pub cx: f64,
    pub cy: f64,
    pub distortion: f64,
}

impl CameraRecord {
    /// Combines the focal length and radial distortion estimated by NVM with the
    /// principal point stored in the database.
    ///
    /// NVM and COLMAP use opposite signs for the radial coefficient.
    pub fn from_nvm(db_camera: &CameraParams, focal: f64, nvm_radial: f64) -> Result<CameraRecord> {
        if db_camera.params.len() < 3 {
            return Err(ConvertError::InvalidBlob {
                what: format!("params of camera {}", db_camera.camera_id),
                reason: format!(
                    "expected at least 3 values (f, cx, cy), found {}",
                    db_camera.params.len()
                ),
            });
        }
        Ok(CameraRecord {
            camera_id: db_camera.camera_id,
            width: db_camera.width,
            height: db_camera.height,
            focal,
            cx: db_camera.params[1],
            cy: db_camera.params[2],
            distortion: -nvm_radial,
        })
    }

    /// Whether two images sharing a camera agree on the NVM estimated terms.
    pub fn same_intrinsics(&self, other: &CameraRecord) -> bool {
        self.focal == other.focal && self.distortion == other.distortion
    }
}
