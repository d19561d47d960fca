mod common;

use nvm_to_model::ConvertError;
use nvm_to_model::nvm::{NvmObservation, parse_nvm, read_nvm};

#[test]
fn test_parse_two_images() {
    let model = parse_nvm(common::TWO_IMAGE_NVM.as_bytes()).unwrap();
    assert_eq!(model.images.len(), 2);
    assert_eq!(model.points.len(), 1);
    assert_eq!(model.num_observations(), 2);

    let img1 = &model.images[1];
    assert_eq!(img1.name, "img1");
    assert_eq!(img1.focal, 790.25);
    assert_eq!(img1.quaternion_text, ["1", "0", "0", "0"]);
    assert_eq!(img1.center, nalgebra::Vector3::new(1.0, -2.0, 0.5));
    assert_eq!(img1.radial_distortion, -0.1);

    let point = &model.points[0];
    assert_eq!(point.color, [255, 128, 0]);
    assert_eq!(
        point.observations,
        vec![
            NvmObservation {
                image_index: 0,
                keypoint_index: 3,
                x: 1.0,
                y: 2.0
            },
            NvmObservation {
                image_index: 1,
                keypoint_index: 7,
                x: 3.0,
                y: 4.0
            },
        ]
    );
    let ids: Vec<u64> = model.points_with_ids().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![0]);
}

#[test]
fn test_quaternion_text_kept_verbatim() {
    let content = "NVM_V3\n1\na.jpg 500 0.70710678 0.0 -0.70710678 1e-9 0 0 0 0 0\n0\n";
    let model = parse_nvm(content.as_bytes()).unwrap();
    assert_eq!(
        model.images[0].quaternion_text,
        ["0.70710678", "0.0", "-0.70710678", "1e-9"]
    );
    assert_eq!(model.images[0].quaternion.w, 0.70710678);
}

#[test]
fn test_multiple_blank_lines_before_point_count() {
    let content = "NVM_V3\n1\na.jpg 500 1 0 0 0 0 0 0 0 0\n\n\n  \n1\n1 2 3 4 5 6 0\n";
    let model = parse_nvm(content.as_bytes()).unwrap();
    assert_eq!(model.points.len(), 1);
    assert!(model.points[0].observations.is_empty());
}

#[test]
fn test_camera_record_field_count() {
    let content = "NVM_V3\n1\na.jpg 500 1 0 0 0 0 0 0 0\n0\n";
    let err = parse_nvm(content.as_bytes()).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedRecord { line: 3, .. }));
}

#[test]
fn test_observation_count_mismatch() {
    // declares 2 observations, carries one
    let content = "NVM_V3\n1\na.jpg 500 1 0 0 0 0 0 0 0 0\n1\n0 0 0 1 2 3 2 0 4 1.0 2.0\n";
    let err = parse_nvm(content.as_bytes()).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedRecord { line: 5, .. }));
}

#[test]
fn test_too_few_point_records() {
    let content = "NVM_V3\n1\na.jpg 500 1 0 0 0 0 0 0 0 0\n2\n0 0 0 1 2 3 0\n";
    let err = parse_nvm(content.as_bytes()).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedRecord { .. }));
}

#[test]
fn test_missing_camera_records() {
    let content = "NVM_V3\n3\na.jpg 500 1 0 0 0 0 0 0 0 0\n";
    assert!(parse_nvm(content.as_bytes()).is_err());
}

#[test]
fn test_non_numeric_fields() {
    let bad_focal = "NVM_V3\n1\na.jpg f 1 0 0 0 0 0 0 0 0\n0\n";
    assert!(matches!(
        parse_nvm(bad_focal.as_bytes()),
        Err(ConvertError::MalformedRecord { line: 3, .. })
    ));

    let bad_color = "NVM_V3\n1\na.jpg 500 1 0 0 0 0 0 0 0 0\n1\n0 0 0 300 2 3 0\n";
    assert!(parse_nvm(bad_color.as_bytes()).is_err());

    let bad_count = "NVM_V3\nmany\n";
    assert!(matches!(
        parse_nvm(bad_count.as_bytes()),
        Err(ConvertError::MalformedRecord { line: 2, .. })
    ));
}

#[test]
fn test_empty_input() {
    assert!(parse_nvm("".as_bytes()).is_err());
}

#[test]
fn test_read_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slice0.nvm");
    std::fs::write(&path, common::TWO_IMAGE_NVM).unwrap();
    let model = read_nvm(&path).unwrap();
    assert_eq!(model.images[0].name, "img0");
    assert!(read_nvm(dir.path().join("nope.nvm")).is_err());
}

#[test]
fn test_observation_count_overflow() {
    // 2^62 observations times 4 fields does not fit in usize
    let content = "NVM_V3\n1\na.jpg 500 1 0 0 0 0 0 0 0.1 0\n1\n0 0 0 1 2 3 4611686018427387904\n";
    let err = parse_nvm(content.as_bytes()).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedRecord { line: 5, .. }));
}

#[test]
fn test_huge_declared_counts() {
    let images = "NVM_V3\n100000000000000000\na.jpg 500 1 0 0 0 0 0 0 0.1 0\n";
    let err = parse_nvm(images.as_bytes()).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedRecord { line: 4, .. }));

    let points = "NVM_V3\n1\na.jpg 500 1 0 0 0 0 0 0 0.1 0\n1000000000\n0 0 0 1 2 3 0\n";
    let err = parse_nvm(points.as_bytes()).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedRecord { line: 6, .. }));
}

#[test]
fn test_record_line_numbers() {
    let model = parse_nvm(common::TWO_IMAGE_NVM.as_bytes()).unwrap();
    assert_eq!(model.images[0].line, 4);
    assert_eq!(model.images[1].line, 5);
    assert_eq!(model.points[0].line, 8);
}
