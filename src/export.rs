//! Writes the COLMAP text model.
//!
//! ```text
//! cameras.txt   CAMERA_ID MODEL WIDTH HEIGHT f cx cy k
//! images.txt    IMAGE_ID QW QX QY QZ TX TY TZ CAMERA_ID NAME
//!               (X Y POINT3D_ID)*        one triple per database keypoint
//! points3D.txt  POINT3D_ID X Y Z R G B ERROR (IMAGE_ID POINT2D_IDX)*
//! ```
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use glam::Vec2;
use indicatif::ProgressIterator;
use serde::Serialize;

use crate::database::FeatureDatabase;
use crate::error::{ConvertError, Result};
use crate::io::{StagedFile, persist_all};
use crate::nvm::{NvmImage, NvmModel, NvmPoint};
use crate::pose::nvm_to_colmap_translation;
use crate::reconcile::{ImageIndexMap, KeypointAssociations, resolve_track};
use crate::types::{CAMERA_MODEL_NAME, CameraId, CameraRecord, ImageId, POINT_ERROR_PLACEHOLDER, PointId};

pub const CAMERAS_FILE: &str = "cameras.txt";
pub const IMAGES_FILE: &str = "images.txt";
pub const POINTS_FILE: &str = "points3D.txt";

/// Keypoint slot without a 3D point.
pub const UNMATCHED_POINT_ID: i64 = -1;

/// What a finished export wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub images: usize,
    pub cameras: usize,
    pub points: usize,
    pub observations: usize,
    pub keypoints: usize,
    pub associated_keypoints: usize,
}

pub fn write_camera_line<W: Write>(w: &mut W, camera: &CameraRecord) -> std::io::Result<()> {
    writeln!(
        w,
        "{} {} {} {} {:.6} {:.6} {:.6} {:.6}",
        camera.camera_id,
        CAMERA_MODEL_NAME,
        camera.width,
        camera.height,
        camera.focal,
        camera.cx,
        camera.cy,
        camera.distortion
    )
}

/// Pose line followed by the keypoint line of one image.
pub fn write_image_lines<W: Write>(
    w: &mut W,
    image_id: ImageId,
    camera_id: CameraId,
    image: &NvmImage,
    keypoints: &[Vec2],
    associations: Option<&HashMap<u32, PointId>>,
) -> std::io::Result<()> {
    let t = nvm_to_colmap_translation(&image.quaternion, &image.center);
    let [qw, qx, qy, qz] = &image.quaternion_text;
    writeln!(
        w,
        "{} {} {} {} {} {:.6} {:.6} {:.6} {} {}",
        image_id, qw, qx, qy, qz, t.x, t.y, t.z, camera_id, image.name
    )?;

    let line = keypoints
        .iter()
        .enumerate()
        .map(|(kp_idx, kp)| {
            let point_id = associations
                .and_then(|table| table.get(&(kp_idx as u32)))
                .map_or(UNMATCHED_POINT_ID, |&id| id as i64);
            format!("{:.6} {:.6} {}", kp.x, kp.y, point_id)
        })
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(w, "{}", line)
}

pub fn write_point_line<W: Write>(
    w: &mut W,
    point_id: PointId,
    point: &NvmPoint,
    track: &[(ImageId, u32)],
) -> std::io::Result<()> {
    let [r, g, b] = point.color;
    write!(
        w,
        "{} {:.3} {:.3} {:.3} {} {} {} {}",
        point_id,
        point.position.x,
        point.position.y,
        point.position.z,
        r,
        g,
        b,
        POINT_ERROR_PLACEHOLDER
    )?;
    for (image_id, kp_idx) in track {
        write!(w, " {} {}", image_id, kp_idx)?;
    }
    writeln!(w)
}

/// Every association of an image must point at an existing database keypoint.
fn check_keypoint_range(
    image: &NvmImage,
    num_keypoints: usize,
    associations: Option<&HashMap<u32, PointId>>,
) -> Result<()> {
    let Some(table) = associations else {
        return Ok(());
    };
    match table
        .iter()
        .filter(|&(&kp_idx, _)| kp_idx as usize >= num_keypoints)
        .min_by_key(|&(&kp_idx, _)| kp_idx)
    {
        Some((&keypoint_index, &point_id)) => Err(ConvertError::KeypointOutOfRange {
            line: image.line,
            image_name: image.name.clone(),
            keypoint_index,
            num_keypoints,
            point_id,
        }),
        None => Ok(()),
    }
}

/// Converts `model` into the three text files inside `output_dir`.
///
/// The files are staged next to their targets and only renamed into place once
/// every record was written; on error the directory is left untouched.
pub fn export_model<D: FeatureDatabase + ?Sized>(
    model: &NvmModel,
    db: &D,
    output_dir: &Path,
) -> Result<ExportStats> {
    let index_map = ImageIndexMap::build(&model.images, db)?;
    log::info!("resolved {} image ids", index_map.len());

    let associations = KeypointAssociations::build(model.points_with_ids(), &index_map)?;
    log::info!(
        "{} observations associated with keypoints",
        associations.total()
    );

    let mut stats = ExportStats {
        images: model.images.len(),
        points: model.points.len(),
        observations: model.num_observations(),
        associated_keypoints: associations.total(),
        ..Default::default()
    };

    let mut points_file = StagedFile::create(output_dir, POINTS_FILE)?;
    for (point_id, point) in model
        .points_with_ids()
        .progress_count(model.points.len() as u64)
    {
        let track = resolve_track(point_id, point, &index_map)?;
        write_point_line(&mut points_file, point_id, point, &track)?;
    }
    log::info!("exported {} points", stats.points);

    let mut images_file = StagedFile::create(output_dir, IMAGES_FILE)?;
    let mut cameras_file = StagedFile::create(output_dir, CAMERAS_FILE)?;
    let mut written_cameras: HashMap<CameraId, CameraRecord> = HashMap::new();
    for (image_index, (image, &image_id)) in model
        .images
        .iter()
        .zip(index_map.ids())
        .enumerate()
        .progress_count(model.images.len() as u64)
    {
        let db_camera = db.camera_params(image_id)?;
        let camera = CameraRecord::from_nvm(&db_camera, image.focal, image.radial_distortion)?;
        match written_cameras.get(&camera.camera_id) {
            Some(first) if !first.same_intrinsics(&camera) => log::warn!(
                "camera {} is shared by {} but its NVM intrinsics differ (f {} vs {}, k {} vs {}); keeping the first",
                camera.camera_id,
                image.name,
                first.focal,
                camera.focal,
                first.distortion,
                camera.distortion
            ),
            Some(_) => {}
            None => {
                write_camera_line(&mut cameras_file, &camera)?;
                written_cameras.insert(camera.camera_id, camera.clone());
            }
        }

        let keypoints = db.keypoints(image_id)?;
        let image_associations = associations.for_image(image_index);
        check_keypoint_range(image, keypoints.len(), image_associations)?;
        log::debug!(
            "{} (id {}): {} keypoints, {} associated",
            image.name,
            image_id,
            keypoints.len(),
            image_associations.map_or(0, HashMap::len)
        );
        write_image_lines(
            &mut images_file,
            image_id,
            camera.camera_id,
            image,
            &keypoints,
            image_associations,
        )?;
        stats.keypoints += keypoints.len();
    }
    stats.cameras = written_cameras.len();

    persist_all(vec![points_file, images_file, cameras_file])?;
    log::info!(
        "exported {} images with {} cameras to {}",
        stats.images,
        stats.cameras,
        output_dir.display()
    );
    Ok(stats)
}
