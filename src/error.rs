use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Everything that can abort a conversion run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A lookup returned zero or several rows where exactly one was required.
    #[error("{what}: expected exactly one row, found {rows}")]
    NotFound { what: String, rows: usize },

    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error(
        "line {line}: keypoint {keypoint_index} of image index {image_index} is already associated \
         with point {existing_point}, refusing second association with point {point_id}"
    )]
    DuplicateAssociation {
        line: usize,
        image_index: usize,
        keypoint_index: u32,
        existing_point: u64,
        point_id: u64,
    },

    #[error(
        "line {line}: point {point_id} observes image index {image_index}, but only {num_images} images exist"
    )]
    UnknownImageIndex {
        line: usize,
        point_id: u64,
        image_index: usize,
        num_images: usize,
    },

    #[error(
        "line {line}: image {image_name} has {num_keypoints} keypoints in the database, \
         but keypoint {keypoint_index} is associated with point {point_id}"
    )]
    KeypointOutOfRange {
        line: usize,
        image_name: String,
        keypoint_index: u32,
        num_keypoints: usize,
        point_id: u64,
    },

    #[error("invalid blob for {what}: {reason}")]
    InvalidBlob { what: String, reason: String },
}

impl ConvertError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        ConvertError::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}
