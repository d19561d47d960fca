#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};

pub struct TestImage<'a> {
    pub image_id: u32,
    pub camera_id: u32,
    pub name: &'a str,
    pub keypoints: &'a [(f32, f32)],
}

pub struct TestCamera {
    pub camera_id: u32,
    pub width: u32,
    pub height: u32,
    pub params: [f64; 4],
}

pub fn create_database(path: &Path, cameras: &[TestCamera], images: &[TestImage]) -> PathBuf {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE cameras (camera_id INTEGER PRIMARY KEY, model INTEGER, width INTEGER, height INTEGER, params BLOB);
         CREATE TABLE images (image_id INTEGER PRIMARY KEY, name TEXT, camera_id INTEGER);
         CREATE TABLE keypoints (image_id INTEGER, rows INTEGER, cols INTEGER, data BLOB);",
    )
    .unwrap();
    for cam in cameras {
        let blob: Vec<u8> = cam.params.iter().flat_map(|v| v.to_le_bytes()).collect();
        conn.execute(
            "INSERT INTO cameras VALUES (?1, 2, ?2, ?3, ?4)",
            params![cam.camera_id, cam.width, cam.height, blob],
        )
        .unwrap();
    }
    for img in images {
        conn.execute(
            "INSERT INTO images VALUES (?1, ?2, ?3)",
            params![img.image_id, img.name, img.camera_id],
        )
        .unwrap();
        let blob: Vec<u8> = img
            .keypoints
            .iter()
            .flat_map(|(x, y)| [x.to_le_bytes(), y.to_le_bytes()])
            .flatten()
            .collect();
        conn.execute(
            "INSERT INTO keypoints VALUES (?1, ?2, 2, ?3)",
            params![img.image_id, img.keypoints.len() as u32, blob],
        )
        .unwrap();
    }
    path.to_path_buf()
}

/// Keypoints `(i, 10 * i)` for `i in 0..n`.
pub fn grid_keypoints(n: usize) -> Vec<(f32, f32)> {
    (0..n).map(|i| (i as f32, 10.0 * i as f32)).collect()
}

/// Two images `img0` (id 5) and `img1` (id 9) with their own cameras.
pub fn two_image_database(path: &Path, kps0: &[(f32, f32)], kps1: &[(f32, f32)]) -> PathBuf {
    create_database(
        path,
        &[
            TestCamera {
                camera_id: 1,
                width: 640,
                height: 480,
                params: [500.0, 320.0, 240.0, 0.0],
            },
            TestCamera {
                camera_id: 2,
                width: 1024,
                height: 768,
                params: [800.0, 512.0, 384.0, 0.0],
            },
        ],
        &[
            TestImage {
                image_id: 5,
                camera_id: 1,
                name: "img0",
                keypoints: kps0,
            },
            TestImage {
                image_id: 9,
                camera_id: 2,
                name: "img1",
                keypoints: kps1,
            },
        ],
    )
}

pub const TWO_IMAGE_NVM: &str = "NVM_V3

2
img0 510.5 1 0 0 0 1 2 3 0.05 0
img1 790.25 1 0 0 0 1 -2 0.5 -0.1 0

1
0.5 1.5 2.5 255 128 0 2 0 3 1.0 2.0 1 7 3.0 4.0

0
";
