use std::ops::Index;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    coordinates::{BoundingBox, CoordinateSystem, Stretching},
    errors::SGError,
    iterators::grid_iterator::HashGridIterator,
    serialization::{self, SerializationFormat},
    storage::grid_point::GridPoint,
};

///
/// Owns the points of a sparse grid. Sequence numbers are positions in the
/// point list; `map` resolves point content to its sequence number.
///
/// Invariants: `map[points[i]] == i` for every `i` and no two stored points
/// share content, as long as callers guard plain [`insert`](Self::insert) with
/// [`is_containing`](Self::is_containing). Leaf flags are only valid right
/// after [`recalc_leaf_property`](Self::recalc_leaf_property).
///
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "StorageSnapshot", into = "StorageSnapshot")]
pub struct HashGridStorage
{
    pub(crate) dimension: usize,
    pub(crate) points: Vec<GridPoint>,
    pub(crate) map: FxHashMap<GridPoint, usize>,
    pub(crate) algorithmic_dimensions: Vec<usize>,
    pub(crate) coordinate_system: CoordinateSystem,
    pub(crate) has_boundary: bool,
}

impl HashGridStorage
{
    /// Empty storage over the unit hypercube.
    pub fn new(dimension: usize) -> Self
    {
        Self::with_coordinate_system(CoordinateSystem::BoundingBox(BoundingBox::with_dim(dimension)))
    }

    /// Empty storage whose dimension is taken from `coordinate_system`.
    pub fn with_coordinate_system(coordinate_system: CoordinateSystem) -> Self
    {
        let dimension = coordinate_system.dimension();
        Self
        {
            dimension,
            points: Vec::new(),
            map: FxHashMap::default(),
            algorithmic_dimensions: (0..dimension).collect(),
            coordinate_system,
            has_boundary: false,
        }
    }

    pub fn with_bounding_box(bounding_box: BoundingBox) -> Self
    {
        Self::with_coordinate_system(CoordinateSystem::BoundingBox(bounding_box))
    }

    pub fn with_stretching(stretching: Stretching) -> Self
    {
        Self::with_coordinate_system(CoordinateSystem::Stretching(stretching))
    }

    #[inline]
    pub fn dimension(&self) -> usize
    {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.points.is_empty()
    }

    #[inline(always)]
    pub fn has_boundary(&self) -> bool
    {
        self.has_boundary
    }

    ///
    /// With boundary, ancestor insertion climbs from level one to both
    /// level-zero points of the same dimension.
    ///
    pub fn set_has_boundary(&mut self, has_boundary: bool)
    {
        self.has_boundary = has_boundary;
    }

    #[inline]
    pub fn get(&self, seq: usize) -> Option<&GridPoint>
    {
        self.points.get(seq)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GridPoint>
    {
        self.points.iter()
    }

    ///
    /// Return the real coordinates for each node...
    ///
    pub fn points(&self) -> PointIterator<'_>
    {
        PointIterator::new(self)
    }

    /// Cursor positioned on the level-one root.
    pub fn iterator(&self) -> HashGridIterator<'_>
    {
        HashGridIterator::new(self)
    }

    #[inline]
    pub fn sequence_number(&self, point: &GridPoint) -> Option<usize>
    {
        self.map.get(point).copied()
    }

    #[inline]
    pub fn is_containing(&self, point: &GridPoint) -> bool
    {
        self.map.contains_key(point)
    }

    ///
    /// Appends `point` and returns its sequence number. Does not deduplicate:
    /// inserting content that is already stored breaks the map/list
    /// consistency, so check [`is_containing`](Self::is_containing) first.
    ///
    pub fn insert(&mut self, mut point: GridPoint) -> usize
    {
        debug_assert_eq!(point.dimension(), self.dimension, "grid point dimension does not match storage");
        // make sure our is_inner flag is up-to-date...
        point.flags.update_is_inner(&point.level);
        let seq = self.points.len();
        self.map.insert(point.clone(), seq);
        self.points.push(point);
        seq
    }

    ///
    /// Inserts `point` (if missing) together with every missing hierarchical
    /// ancestor in every dimension, recursively, and returns the sequence
    /// numbers of all points created by this call. Calling it again with the
    /// same point inserts nothing.
    ///
    pub fn insert_with_ancestors(&mut self, point: &GridPoint) -> Vec<usize>
    {
        let mut inserted = Vec::new();
        self.insert_ancestors_recursive(point.clone(), &mut inserted);
        inserted
    }

    fn insert_ancestors_recursive(&mut self, mut point: GridPoint, inserted: &mut Vec<usize>)
    {
        if !self.is_containing(&point)
        {
            tracing::trace!(point = %point, "inserting grid point");
            inserted.push(self.insert(point.clone()));
        }
        for d in 0..self.dimension
        {
            let (level, index) = point.get(d);
            match level
            {
                0 => continue,
                1 if !self.has_boundary => continue,
                1 =>
                {
                    for boundary_index in 0..2
                    {
                        point.set(d, 0, boundary_index);
                        self.insert_missing_ancestor(&point, inserted);
                    }
                }
                _ =>
                {
                    point.move_to_parent(d);
                    self.insert_missing_ancestor(&point, inserted);
                }
            }
            point.set(d, level, index);
        }
    }

    fn insert_missing_ancestor(&mut self, ancestor: &GridPoint, inserted: &mut Vec<usize>)
    {
        if !self.is_containing(ancestor)
        {
            let mut ancestor = ancestor.clone();
            ancestor.set_leaf(false);
            self.insert_ancestors_recursive(ancestor, inserted);
        }
    }

    ///
    /// Replaces the point at `pos` and returns the old one. Out-of-range
    /// positions are a no-op and return `None`.
    ///
    pub fn update(&mut self, mut point: GridPoint, pos: usize) -> Option<GridPoint>
    {
        if pos >= self.points.len()
        {
            return None;
        }
        point.flags.update_is_inner(&point.level);
        let old = std::mem::replace(&mut self.points[pos], point.clone());
        if self.map.get(&old) == Some(&pos)
        {
            self.map.remove(&old);
        }
        self.map.insert(point, pos);
        Some(old)
    }

    pub fn delete_last(&mut self) -> Option<GridPoint>
    {
        let point = self.points.pop()?;
        if self.map.get(&point) == Some(&self.points.len())
        {
            self.map.remove(&point);
        }
        Some(point)
    }

    ///
    /// Removes the points at the given sequence numbers. The list is sorted
    /// ascending and the k-th removal targets position `original - k` of the
    /// shrinking list. Afterwards the survivors are resequenced, the map is
    /// rebuilt and leaf flags are recomputed.
    ///
    /// Returns the pre-deletion sequence number of every surviving point,
    /// indexed by its new sequence number. Nothing is removed if any
    /// position is invalid.
    ///
    pub fn delete_points(&mut self, indices: &[usize]) -> Result<Vec<usize>, SGError>
    {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        let len = self.points.len();
        for (k, &original) in sorted.iter().enumerate()
        {
            if original < k || original >= len
            {
                return Err(SGError::InvalidIndex { index: original, len });
            }
        }
        let mut old_indices: Vec<usize> = (0..len).collect();
        for (k, &original) in sorted.iter().enumerate()
        {
            old_indices.remove(original - k);
        }
        let mut old_points = std::mem::take(&mut self.points);
        self.points = old_indices.iter().map(|&i| std::mem::take(&mut old_points[i])).collect();
        self.generate_map();
        self.recalc_leaf_property();
        tracing::debug!(removed = sorted.len(), remaining = self.points.len(), "deleted grid points");
        Ok(old_indices)
    }

    pub fn clear(&mut self)
    {
        self.points.clear();
        self.map.clear();
    }

    pub fn number_of_inner_points(&self) -> usize
    {
        self.points.iter().filter(|p| p.is_inner_point()).count()
    }

    pub(crate) fn generate_map(&mut self)
    {
        let mut map = FxHashMap::default();
        map.reserve(self.points.len());
        for (i, point) in self.points.iter().enumerate()
        {
            map.insert(point.clone(), i);
        }
        self.map = map;
    }

    ///
    /// A point is a leaf iff none of its children is stored, in any
    /// dimension. The children of a level-zero coordinate are the level-one
    /// root of that dimension.
    ///
    pub fn recalc_leaf_property(&mut self)
    {
        let mut point = GridPoint::default();
        let mut num_leaves = 0;
        for seq in 0..self.points.len()
        {
            point.assign(&self.points[seq]);
            let mut is_leaf = true;
            for dim in 0..self.dimension
            {
                let (level, index) = point.get(dim);
                // Check if this point has any children. If not it is a leaf.
                // A boundary node only has the level-1 child.
                let has_left = point.move_to_left_child(dim) && self.map.contains_key(&point);
                point.set(dim, level, index);
                let has_right = level > 0 && point.move_to_right_child(dim) && self.map.contains_key(&point);
                point.set(dim, level, index);
                is_leaf = !has_left && !has_right;
                if !is_leaf
                {
                    break;
                }
            }
            num_leaves += is_leaf as usize;
            self.points[seq].set_leaf(is_leaf);
        }
        tracing::debug!(points = self.points.len(), leaves = num_leaves, "recalculated leaf property");
    }

    pub fn algorithmic_dimensions(&self) -> &[usize]
    {
        &self.algorithmic_dimensions
    }

    pub fn set_algorithmic_dimensions(&mut self, dimensions: Vec<usize>) -> Result<(), SGError>
    {
        if dimensions.len() > self.dimension
        {
            return Err(SGError::AlgorithmicDimensionsExceedDimension { requested: dimensions.len(), dimension: self.dimension });
        }
        if let Some(&value) = dimensions.iter().find(|&&d| d >= self.dimension)
        {
            return Err(SGError::InvalidAlgorithmicDimension { value, dimension: self.dimension });
        }
        self.algorithmic_dimensions = dimensions;
        Ok(())
    }

    #[inline]
    pub fn coordinate_system(&self) -> &CoordinateSystem
    {
        &self.coordinate_system
    }

    pub fn uses_stretching(&self) -> bool
    {
        matches!(self.coordinate_system, CoordinateSystem::Stretching(_))
    }

    pub fn bounding_box(&self) -> Option<&BoundingBox>
    {
        match &self.coordinate_system
        {
            CoordinateSystem::BoundingBox(bb) => Some(bb),
            CoordinateSystem::Stretching(_) => None,
        }
    }

    pub fn stretching(&self) -> Option<&Stretching>
    {
        match &self.coordinate_system
        {
            CoordinateSystem::Stretching(s) => Some(s),
            CoordinateSystem::BoundingBox(_) => None,
        }
    }

    /// Replaces the active coordinate system, whichever variant it was.
    pub fn set_bounding_box(&mut self, bounding_box: BoundingBox) -> Result<(), SGError>
    {
        self.set_coordinate_system(CoordinateSystem::BoundingBox(bounding_box))
    }

    /// Replaces the active coordinate system, whichever variant it was.
    pub fn set_stretching(&mut self, stretching: Stretching) -> Result<(), SGError>
    {
        self.set_coordinate_system(CoordinateSystem::Stretching(stretching))
    }

    pub fn set_coordinate_system(&mut self, coordinate_system: CoordinateSystem) -> Result<(), SGError>
    {
        if coordinate_system.dimension() != self.dimension
        {
            return Err(SGError::DimensionMismatch { expected: self.dimension, actual: coordinate_system.dimension() });
        }
        tracing::debug!(discriminator = coordinate_system.discriminator(), "switching coordinate system");
        self.coordinate_system = coordinate_system;
        Ok(())
    }

    #[inline]
    pub fn get_coordinate(&self, point: &GridPoint, dim: usize) -> f64
    {
        let (level, index) = point.get(dim);
        self.coordinate_system.coordinate(dim, level, index)
    }

    pub fn get_coordinates(&self, point: &GridPoint) -> Vec<f64>
    {
        (0..self.dimension).map(|d| self.get_coordinate(point, d)).collect()
    }

    pub fn to_bytes(&self, format: SerializationFormat) -> Result<Vec<u8>, SGError>
    {
        serialization::serialize(self, format)
    }

    pub fn from_bytes(data: &[u8], format: SerializationFormat) -> Result<Self, SGError>
    {
        serialization::deserialize(data, format)
    }
}

impl Index<usize> for HashGridStorage
{
    type Output = GridPoint;

    #[inline]
    fn index(&self, seq: usize) -> &Self::Output {
        &self.points[seq]
    }
}

impl<'a> IntoIterator for &'a HashGridStorage
{
    type Item = &'a GridPoint;
    type IntoIter = std::slice::Iter<'a, GridPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

pub struct PointIterator<'a> {
    storage: &'a HashGridStorage,
    current_seq: usize,
}
impl<'a> PointIterator<'a>
{
    pub fn new(storage: &'a HashGridStorage) -> Self
    {
        Self { storage, current_seq: 0 }
    }
}

impl Iterator for PointIterator<'_> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        let point = self.storage.points.get(self.current_seq)?;
        self.current_seq += 1;
        Some(self.storage.get_coordinates(point))
    }
}

///
/// Serde representation of a storage; the map is rebuilt on load.
///
#[derive(Serialize, Deserialize)]
struct StorageSnapshot
{
    dimension: usize,
    points: Vec<GridPoint>,
    algorithmic_dimensions: Vec<usize>,
    coordinate_system: CoordinateSystem,
    has_boundary: bool,
}

impl From<HashGridStorage> for StorageSnapshot
{
    fn from(storage: HashGridStorage) -> Self {
        Self
        {
            dimension: storage.dimension,
            points: storage.points,
            algorithmic_dimensions: storage.algorithmic_dimensions,
            coordinate_system: storage.coordinate_system,
            has_boundary: storage.has_boundary,
        }
    }
}

impl TryFrom<StorageSnapshot> for HashGridStorage
{
    type Error = SGError;

    fn try_from(snapshot: StorageSnapshot) -> Result<Self, Self::Error> {
        if snapshot.coordinate_system.dimension() != snapshot.dimension
        {
            return Err(SGError::DimensionMismatch { expected: snapshot.dimension, actual: snapshot.coordinate_system.dimension() });
        }
        for point in &snapshot.points
        {
            if point.dimension() != snapshot.dimension
            {
                return Err(SGError::DimensionMismatch { expected: snapshot.dimension, actual: point.dimension() });
            }
            point.validate()?;
        }
        let mut storage = Self::with_coordinate_system(snapshot.coordinate_system);
        storage.set_algorithmic_dimensions(snapshot.algorithmic_dimensions)?;
        storage.has_boundary = snapshot.has_boundary;
        storage.points = snapshot.points;
        storage.generate_map();
        if storage.map.len() != storage.points.len()
        {
            let duplicate = storage.points.iter().enumerate()
                .find(|&(i, p)| storage.map.get(p) != Some(&i))
                .map(|(_, p)| p.to_string())
                .unwrap_or_default();
            return Err(SGError::DuplicatePoint(duplicate));
        }
        for point in &mut storage.points
        {
            point.flags.update_is_inner(&point.level);
        }
        Ok(storage)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::generators;

    fn five_points() -> HashGridStorage
    {
        let mut storage = HashGridStorage::new(1);
        for (l, i) in [(1, 1), (2, 1), (2, 3), (3, 1), (3, 3)]
        {
            storage.insert(GridPoint::new(&[l], &[i]));
        }
        storage
    }

    fn assert_consistent(storage: &HashGridStorage)
    {
        assert_eq!(storage.map.len(), storage.len());
        for (i, point) in storage.iter().enumerate()
        {
            assert_eq!(storage.sequence_number(point), Some(i));
        }
    }

    fn assert_ancestor_closure(storage: &HashGridStorage)
    {
        for point in storage
        {
            for d in 0..storage.dimension()
            {
                match point.level(d)
                {
                    0 => {}
                    1 if !storage.has_boundary() => {}
                    1 =>
                    {
                        let mut boundary = point.clone();
                        boundary.set(d, 0, 0);
                        assert!(storage.is_containing(&boundary), "missing left boundary of {point}");
                        boundary.set(d, 0, 1);
                        assert!(storage.is_containing(&boundary), "missing right boundary of {point}");
                    }
                    _ => assert!(storage.is_containing(&point.parent(d).unwrap()), "missing parent of {point} in {d}"),
                }
            }
        }
    }

    #[test]
    fn insert_assigns_sequence_numbers()
    {
        let storage = five_points();
        assert_eq!(storage.len(), 5);
        assert_eq!(storage.sequence_number(&GridPoint::new(&[2], &[3])), Some(2));
        assert_eq!(storage.sequence_number(&GridPoint::new(&[2], &[5])), None);
        assert!(storage[4].is_leaf());
        assert_consistent(&storage);
    }

    #[test]
    fn guarded_inserts_stay_unique()
    {
        let mut storage = HashGridStorage::new(2);
        for _ in 0..3
        {
            for point in [GridPoint::new(&[1, 1], &[1, 1]), GridPoint::new(&[2, 1], &[3, 1])]
            {
                if !storage.is_containing(&point)
                {
                    storage.insert(point);
                }
            }
        }
        assert_eq!(storage.len(), 2);
        assert_consistent(&storage);
    }

    #[test]
    fn insert_with_ancestors_without_boundary()
    {
        let mut storage = HashGridStorage::new(2);
        let inserted = storage.insert_with_ancestors(&GridPoint::new(&[3, 2], &[5, 3]));
        // levels (l0, l1) with l0 <= 3, l1 <= 2 along the two parent chains
        assert_eq!(inserted.len(), 6);
        assert_eq!(inserted[0], 0);
        assert!(storage.is_containing(&GridPoint::new(&[1, 1], &[1, 1])));
        assert!(storage.is_containing(&GridPoint::new(&[2, 2], &[3, 3])));
        assert!(storage.is_containing(&GridPoint::new(&[3, 1], &[5, 1])));
        assert!(!storage.is_containing(&GridPoint::new(&[0, 1], &[0, 1])));
        assert!(storage[0].is_leaf());
        assert!(!storage[1].is_leaf());
        assert_ancestor_closure(&storage);
        assert_consistent(&storage);
    }

    #[test]
    fn insert_with_ancestors_with_boundary()
    {
        let mut storage = HashGridStorage::new(2);
        storage.set_has_boundary(true);
        storage.insert_with_ancestors(&GridPoint::new(&[2, 2], &[1, 1]));
        // {0, 0, 1, 2} x {0, 0, 1, 2} level combinations with both boundary indices at level zero
        assert_eq!(storage.len(), 16);
        assert!(storage.is_containing(&GridPoint::new(&[1, 0], &[1, 1])));
        assert!(storage.is_containing(&GridPoint::new(&[1, 1], &[1, 1])));
        assert!(storage.is_containing(&GridPoint::new(&[2, 1], &[1, 1])));
        assert!(storage.is_containing(&GridPoint::new(&[0, 0], &[0, 1])));
        assert!(storage.is_containing(&GridPoint::new(&[0, 2], &[1, 1])));
        assert_ancestor_closure(&storage);
        assert_consistent(&storage);
    }

    #[test]
    fn insert_with_ancestors_is_idempotent()
    {
        let mut storage = HashGridStorage::new(3);
        storage.set_has_boundary(true);
        let point = GridPoint::new(&[3, 1, 2], &[7, 1, 3]);
        let first = storage.insert_with_ancestors(&point);
        let size = storage.len();
        assert_eq!(first.len(), size);
        assert!(storage.insert_with_ancestors(&point).is_empty());
        assert_eq!(storage.len(), size);
        storage.insert_with_ancestors(&GridPoint::new(&[2, 2, 1], &[1, 3, 1]));
        assert_ancestor_closure(&storage);
        assert_consistent(&storage);
    }

    #[test]
    fn update_replaces_content_in_place()
    {
        let mut storage = five_points();
        let old = storage.update(GridPoint::new(&[4], &[1]), 3).unwrap();
        assert_eq!(old, GridPoint::new(&[3], &[1]));
        assert!(!storage.is_containing(&old));
        assert_eq!(storage.sequence_number(&GridPoint::new(&[4], &[1])), Some(3));
        assert!(storage.update(GridPoint::new(&[4], &[3]), 5).is_none());
        assert_eq!(storage.len(), 5);
        assert_consistent(&storage);
    }

    #[test]
    fn delete_last_pops()
    {
        let mut storage = five_points();
        assert_eq!(storage.delete_last(), Some(GridPoint::new(&[3], &[3])));
        assert_eq!(storage.len(), 4);
        assert!(!storage.is_containing(&GridPoint::new(&[3], &[3])));
        assert_consistent(&storage);
        storage.clear();
        assert!(storage.delete_last().is_none());
    }

    #[test]
    fn delete_points_reports_old_sequence_numbers()
    {
        let mut storage = five_points();
        let remap = storage.delete_points(&[3, 1]).unwrap();
        assert_eq!(storage.len(), 3);
        assert_eq!(remap, vec![0, 2, 4]);
        assert_eq!(storage[1], GridPoint::new(&[2], &[3]));
        assert_eq!(storage[2], GridPoint::new(&[3], &[3]));
        assert_consistent(&storage);
        // leaves were recomputed: (1,1) still has (2,3) as child, (3,3) lost its parent (2,1)
        assert!(!storage[0].is_leaf());
        assert!(storage[1].is_leaf());
        assert!(storage[2].is_leaf());
    }

    #[test]
    fn delete_points_with_repeated_positions_shifts()
    {
        let mut storage = five_points();
        // the second removal of 2 targets position 2 - 1 of the shrunk list
        let remap = storage.delete_points(&[2, 2]).unwrap();
        assert_eq!(remap, vec![0, 3, 4]);
        assert_consistent(&storage);
    }

    #[test]
    fn delete_points_rejects_invalid_positions()
    {
        let mut storage = five_points();
        assert!(matches!(storage.delete_points(&[1, 5]), Err(SGError::InvalidIndex { index: 5, len: 5 })));
        assert!(matches!(storage.delete_points(&[0, 0]), Err(SGError::InvalidIndex { index: 0, .. })));
        assert_eq!(storage.len(), 5);
        assert_eq!(storage.delete_points(&[]).unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn leaves_of_full_1d_grid_with_boundary()
    {
        let level = 4;
        let mut storage = HashGridStorage::new(1);
        generators::full_with_boundaries(&mut storage, level).unwrap();
        for point in storage.iter_mut_for_test()
        {
            point.set_leaf(false);
        }
        storage.recalc_leaf_property();
        for point in &storage
        {
            assert_eq!(point.is_leaf(), point.level(0) == level, "{point}");
        }
        assert_eq!(storage.number_of_inner_points(), (1 << level) - 1);
    }

    #[test]
    fn inner_point_count()
    {
        let mut storage = HashGridStorage::new(2);
        storage.set_has_boundary(true);
        storage.insert_with_ancestors(&GridPoint::new(&[1, 1], &[1, 1]));
        assert_eq!(storage.len(), 9);
        assert_eq!(storage.number_of_inner_points(), 1);
    }

    #[test]
    fn algorithmic_dimensions_are_validated()
    {
        let mut storage = HashGridStorage::new(3);
        assert_eq!(storage.algorithmic_dimensions(), &[0, 1, 2]);
        storage.set_algorithmic_dimensions(vec![2, 0]).unwrap();
        assert_eq!(storage.algorithmic_dimensions(), &[2, 0]);
        assert!(matches!(storage.set_algorithmic_dimensions(vec![0, 1, 2, 0]), Err(SGError::AlgorithmicDimensionsExceedDimension { requested: 4, dimension: 3 })));
        assert!(matches!(storage.set_algorithmic_dimensions(vec![3]), Err(SGError::InvalidAlgorithmicDimension { value: 3, .. })));
        assert_eq!(storage.algorithmic_dimensions(), &[2, 0]);
    }

    #[test]
    fn coordinate_system_switches_exclusively()
    {
        use crate::coordinates::{DiscreteStretching1D, Stretching};
        let mut storage = HashGridStorage::new(1);
        assert!(storage.bounding_box().is_some());
        storage.set_stretching(Stretching::Discrete(vec![DiscreteStretching1D::new(vec![0.0, 0.3, 1.0]).unwrap()])).unwrap();
        assert!(storage.uses_stretching());
        assert!(storage.bounding_box().is_none());
        assert_eq!(storage.get_coordinates(&GridPoint::new(&[1], &[1])), vec![0.3]);
        storage.set_bounding_box(BoundingBox::new(&[0.0], &[2.0]).unwrap()).unwrap();
        assert!(storage.stretching().is_none());
        assert_eq!(storage.get_coordinates(&GridPoint::new(&[1], &[1])), vec![1.0]);
        assert!(matches!(storage.set_bounding_box(BoundingBox::with_dim(2)), Err(SGError::DimensionMismatch { expected: 1, actual: 2 })));
    }

    #[test]
    fn copies_are_independent()
    {
        let mut original = five_points();
        let mut copy = original.clone();
        copy.insert(GridPoint::new(&[4], &[1]));
        copy.delete_points(&[0]).unwrap();
        assert_eq!(original.len(), 5);
        assert_eq!(original[0], GridPoint::new(&[1], &[1]));
        original.delete_last();
        assert_eq!(copy.len(), 5);
        assert!(copy.is_containing(&GridPoint::new(&[3], &[3])));
        assert_consistent(&original);
        assert_consistent(&copy);
    }

    #[test]
    fn real_coordinates_of_points()
    {
        let mut storage = HashGridStorage::with_bounding_box(BoundingBox::new(&[-1.0, 0.0], &[1.0, 4.0]).unwrap());
        storage.insert(GridPoint::new(&[1, 2], &[1, 3]));
        storage.insert(GridPoint::new(&[0, 0], &[1, 0]));
        let coordinates: Vec<_> = storage.points().collect();
        assert_eq!(coordinates, vec![vec![0.0, 3.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn snapshot_rebuild_rejects_duplicates_and_invalid_points()
    {
        let mut storage = five_points();
        storage.insert(GridPoint::new(&[2], &[3]));
        let result = HashGridStorage::try_from(StorageSnapshot::from(storage));
        assert!(matches!(result, Err(SGError::DuplicatePoint(ref p)) if p == "(2, 3)"));

        let mut storage = five_points();
        storage.insert(GridPoint::new(&[3], &[4]));
        let result = HashGridStorage::try_from(StorageSnapshot::from(storage));
        assert!(matches!(result, Err(SGError::InvalidGridPoint { level: 3, index: 4 })));

        let rebuilt = HashGridStorage::try_from(StorageSnapshot::from(five_points())).unwrap();
        assert_consistent(&rebuilt);
    }

    impl HashGridStorage
    {
        fn iter_mut_for_test(&mut self) -> std::slice::IterMut<'_, GridPoint>
        {
            self.points.iter_mut()
        }
    }
}
