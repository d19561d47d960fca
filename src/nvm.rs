//! Strict reader for NVM reconstructions.
//!
//! ```text
//! NVM_V3
//! <N>
//! <file name> <focal> <qw> <qx> <qy> <qz> <cx> <cy> <cz> <radial distortion> 0   (N times)
//!
//! <M>
//! <x> <y> <z> <r> <g> <b> <k> [<image index> <feature index> <x> <y>]*k         (M times)
//! ```
//! Only the first model of the file is read.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use nalgebra as na;

use crate::error::{ConvertError, Result};
use crate::types::PointId;

const CAMERA_FIELDS: usize = 11;
const POINT_FIXED_FIELDS: usize = 7;
const OBSERVATION_FIELDS: usize = 4;
/// Counts come from the file, records are only trusted once read.
const MAX_PREALLOCATED_RECORDS: usize = 1 << 16;

/// One camera record. Its position in [`NvmModel::images`] is the NVM image index.
#[derive(Debug, Clone, PartialEq)]
pub struct NvmImage {
    pub name: String,
    pub focal: f64,
    /// Rotation as `(w, x, y, z)`.
    pub quaternion: na::Quaternion<f64>,
    /// The quaternion components exactly as written in the file.
    pub quaternion_text: [String; 4],
    /// Camera center in world coordinates.
    pub center: na::Vector3<f64>,
    pub radial_distortion: f64,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NvmObservation {
    pub image_index: usize,
    pub keypoint_index: u32,
    pub x: f64,
    pub y: f64,
}

/// One 3D point record. Its position in [`NvmModel::points`] is its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NvmPoint {
    pub position: na::Vector3<f64>,
    pub color: [u8; 3],
    pub observations: Vec<NvmObservation>,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NvmModel {
    pub images: Vec<NvmImage>,
    pub points: Vec<NvmPoint>,
}

impl NvmModel {
    pub fn num_observations(&self) -> usize {
        self.points.iter().map(|p| p.observations.len()).sum()
    }

    /// Points paired with their output ids.
    pub fn points_with_ids(&self) -> impl Iterator<Item = (PointId, &NvmPoint)> {
        self.points
            .iter()
            .enumerate()
            .map(|(idx, p)| (idx as PointId, p))
    }
}

/// Reads an NVM file from disk.
pub fn read_nvm(path: impl AsRef<Path>) -> Result<NvmModel> {
    let file = File::open(path.as_ref())?;
    log::debug!("reading {}", path.as_ref().display());
    parse_nvm(BufReader::new(file))
}

/// Line reader that remembers 1-based line numbers.
struct NumberedLines<R> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> NumberedLines<R> {
    fn new(reader: R) -> Self {
        NumberedLines { reader, line_no: 0 }
    }

    fn next_line(&mut self) -> Result<Option<(usize, String)>> {
        let mut buf = String::new();
        if self.reader.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some((self.line_no, buf)))
    }

    fn next_non_blank(&mut self) -> Result<Option<(usize, String)>> {
        while let Some((no, line)) = self.next_line()? {
            if !line.trim().is_empty() {
                return Ok(Some((no, line)));
            }
        }
        Ok(None)
    }

    fn require(&mut self, what: &str) -> Result<(usize, String)> {
        self.next_line()?
            .ok_or_else(|| ConvertError::malformed(self.line_no + 1, format!("missing {}", what)))
    }

    fn require_non_blank(&mut self, what: &str) -> Result<(usize, String)> {
        self.next_non_blank()?
            .ok_or_else(|| ConvertError::malformed(self.line_no + 1, format!("missing {}", what)))
    }
}

fn parse_field<T: FromStr>(line: usize, token: &str, name: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| ConvertError::malformed(line, format!("invalid {} '{}'", name, token)))
}

/// Parses an NVM model from any buffered reader.
pub fn parse_nvm<R: BufRead>(reader: R) -> Result<NvmModel> {
    let mut lines = NumberedLines::new(reader);

    let (_, header) = lines.require("header")?;
    log::debug!("NVM header: {}", header.trim());

    let (no, count) = lines.require_non_blank("image count")?;
    let num_images: usize = parse_field(no, count.trim(), "image count")?;
    let mut images = Vec::with_capacity(num_images.min(MAX_PREALLOCATED_RECORDS));
    for _ in 0..num_images {
        let (no, line) = lines.require("camera record")?;
        images.push(parse_image(no, &line)?);
    }

    let (no, count) = lines.require_non_blank("point count")?;
    let num_points: usize = parse_field(no, count.trim(), "point count")?;
    let mut points = Vec::with_capacity(num_points.min(MAX_PREALLOCATED_RECORDS));
    for _ in 0..num_points {
        let (no, line) = lines.require("point record")?;
        points.push(parse_point(no, &line)?);
    }

    if let Some((no, _)) = lines.next_non_blank()? {
        log::debug!("ignoring NVM content from line {} on", no);
    }

    Ok(NvmModel { images, points })
}

fn parse_image(line_no: usize, line: &str) -> Result<NvmImage> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != CAMERA_FIELDS {
        return Err(ConvertError::malformed(
            line_no,
            format!(
                "camera record needs {} fields, found {}",
                CAMERA_FIELDS,
                tokens.len()
            ),
        ));
    }
    let num = |idx: usize, name: &str| parse_field::<f64>(line_no, tokens[idx], name);
    let quaternion = na::Quaternion::new(num(2, "qw")?, num(3, "qx")?, num(4, "qy")?, num(5, "qz")?);
    Ok(NvmImage {
        name: tokens[0].to_string(),
        focal: num(1, "focal length")?,
        quaternion,
        quaternion_text: [
            tokens[2].to_string(),
            tokens[3].to_string(),
            tokens[4].to_string(),
            tokens[5].to_string(),
        ],
        center: na::Vector3::new(num(6, "cx")?, num(7, "cy")?, num(8, "cz")?),
        radial_distortion: num(9, "radial distortion")?,
        line: line_no,
    })
}

fn parse_point(line_no: usize, line: &str) -> Result<NvmPoint> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < POINT_FIXED_FIELDS {
        return Err(ConvertError::malformed(
            line_no,
            format!(
                "point record needs at least {} fields, found {}",
                POINT_FIXED_FIELDS,
                tokens.len()
            ),
        ));
    }
    let num_observations: usize = parse_field(line_no, tokens[6], "observation count")?;
    let trailing = tokens.len() - POINT_FIXED_FIELDS;
    if num_observations.checked_mul(OBSERVATION_FIELDS) != Some(trailing) {
        return Err(ConvertError::malformed(
            line_no,
            format!(
                "point declares {} observations but carries {} trailing fields",
                num_observations, trailing
            ),
        ));
    }

    let position: na::Vector3<f64> = na::Vector3::new(
        parse_field(line_no, tokens[0], "x")?,
        parse_field(line_no, tokens[1], "y")?,
        parse_field(line_no, tokens[2], "z")?,
    );
    let color: [u8; 3] = [
        parse_field(line_no, tokens[3], "red")?,
        parse_field(line_no, tokens[4], "green")?,
        parse_field(line_no, tokens[5], "blue")?,
    ];
    let observations = tokens[POINT_FIXED_FIELDS..]
        .chunks_exact(OBSERVATION_FIELDS)
        .map(|obs| -> Result<NvmObservation> {
            Ok(NvmObservation {
                image_index: parse_field(line_no, obs[0], "image index")?,
                keypoint_index: parse_field(line_no, obs[1], "feature index")?,
                x: parse_field(line_no, obs[2], "measurement x")?,
                y: parse_field(line_no, obs[3], "measurement y")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NvmPoint {
        position,
        color,
        observations,
        line: line_no,
    })
}
