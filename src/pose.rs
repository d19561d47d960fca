use nalgebra as na;

/// Translation of the COLMAP world-to-camera transform for an NVM pose.
///
/// NVM stores the rotation `R` (world to camera) and the camera center `C` in
/// world coordinates. COLMAP stores the same rotation together with
/// `t = -R * C`.
pub fn nvm_to_colmap_translation(
    q_wxyz: &na::Quaternion<f64>,
    center: &na::Vector3<f64>,
) -> na::Vector3<f64> {
    let rotation = na::UnitQuaternion::from_quaternion(*q_wxyz);
    -(rotation * center)
}

/// Camera center for a COLMAP pose, `C = -R^T * t`.
pub fn colmap_to_nvm_center(
    q_wxyz: &na::Quaternion<f64>,
    translation: &na::Vector3<f64>,
) -> na::Vector3<f64> {
    let rotation = na::UnitQuaternion::from_quaternion(*q_wxyz);
    -(rotation.inverse() * translation)
}
