use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::database::FeatureDatabase;
use crate::error::{ConvertError, Result};
use crate::nvm::{NvmImage, NvmPoint};
use crate::types::{ImageId, PointId};

/// NVM image index to database image id, in NVM file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageIndexMap {
    db_ids: Vec<ImageId>,
}

impl ImageIndexMap {
    /// Looks up every NVM image name in the database.
    ///
    /// Fails on the first name without exactly one database row.
    pub fn build<D: FeatureDatabase + ?Sized>(images: &[NvmImage], db: &D) -> Result<ImageIndexMap> {
        let db_ids = images
            .iter()
            .map(|image| -> Result<ImageId> {
                let id = db.lookup_image_id(&image.name)?;
                log::trace!("{} -> image id {}", image.name, id);
                Ok(id)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ImageIndexMap { db_ids })
    }

    pub fn from_ids(db_ids: Vec<ImageId>) -> ImageIndexMap {
        ImageIndexMap { db_ids }
    }

    pub fn get(&self, image_index: usize) -> Option<ImageId> {
        self.db_ids.get(image_index).copied()
    }

    pub fn len(&self) -> usize {
        self.db_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db_ids.is_empty()
    }

    pub fn ids(&self) -> &[ImageId] {
        &self.db_ids
    }
}

/// Per NVM image index, the 3D point each observed keypoint belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeypointAssociations {
    per_image: Vec<HashMap<u32, PointId>>,
}

impl KeypointAssociations {
    pub fn new(num_images: usize) -> KeypointAssociations {
        KeypointAssociations {
            per_image: vec![HashMap::new(); num_images],
        }
    }

    /// Walks every observation of every point, in file order.
    pub fn build<'a>(
        points: impl IntoIterator<Item = (PointId, &'a NvmPoint)>,
        index_map: &ImageIndexMap,
    ) -> Result<KeypointAssociations> {
        let mut associations = KeypointAssociations::new(index_map.len());
        for (point_id, point) in points {
            for obs in &point.observations {
                associations.insert(obs.image_index, obs.keypoint_index, point_id, point.line)?;
            }
        }
        Ok(associations)
    }

    /// Records `keypoint_index -> point_id` for one image. `line` is the NVM line
    /// of the point record, reported on failure.
    ///
    /// A keypoint can belong to one point only.
    pub fn insert(
        &mut self,
        image_index: usize,
        keypoint_index: u32,
        point_id: PointId,
        line: usize,
    ) -> Result<()> {
        let num_images = self.per_image.len();
        let table = self
            .per_image
            .get_mut(image_index)
            .ok_or(ConvertError::UnknownImageIndex {
                line,
                point_id,
                image_index,
                num_images,
            })?;
        match table.entry(keypoint_index) {
            Entry::Occupied(existing) => Err(ConvertError::DuplicateAssociation {
                line,
                image_index,
                keypoint_index,
                existing_point: *existing.get(),
                point_id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(point_id);
                Ok(())
            }
        }
    }

    pub fn point_of(&self, image_index: usize, keypoint_index: u32) -> Option<PointId> {
        self.per_image
            .get(image_index)
            .and_then(|table| table.get(&keypoint_index).copied())
    }

    /// Associations of one image, `None` for unknown indices.
    pub fn for_image(&self, image_index: usize) -> Option<&HashMap<u32, PointId>> {
        self.per_image.get(image_index)
    }

    pub fn total(&self) -> usize {
        self.per_image.iter().map(HashMap::len).sum()
    }
}

/// Database image id and keypoint index of every observation of a point.
pub fn resolve_track(
    point_id: PointId,
    point: &NvmPoint,
    index_map: &ImageIndexMap,
) -> Result<Vec<(ImageId, u32)>> {
    point
        .observations
        .iter()
        .map(|obs| {
            index_map
                .get(obs.image_index)
                .map(|image_id| (image_id, obs.keypoint_index))
                .ok_or(ConvertError::UnknownImageIndex {
                    line: point.line,
                    point_id,
                    image_index: obs.image_index,
                    num_images: index_map.len(),
                })
        })
        .collect()
}
