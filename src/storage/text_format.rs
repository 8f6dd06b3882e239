//! Versioned text format of a [`HashGridStorage`].
//!
//! ```text
//! <version> <dimension> <point count>
//! <coordinate system payload>
//! <one line per point>
//! ```
//!
//! | version | coordinate payload                | leaf flag | distributions |
//! |---------|-----------------------------------|-----------|---------------|
//! | 1       | none (unit cube)                  | no        | no            |
//! | 2       | none (unit cube)                  | yes       | no            |
//! | 3       | bounding box, no discriminator    | yes       | no            |
//! | 4       | bounding box, no discriminator    | no        | no            |
//! | 5       | discriminator + payload           | yes       | no            |
//! | 6       | discriminator + payload           | yes       | yes           |
//! | 8       | legacy number, layout of 5        | yes       | no            |

use std::{io::{BufRead, Write}, str::FromStr};

use crate::{
    coordinates::{BoundingBox, CoordinateSystem},
    errors::SGError,
    storage::{grid_point::GridPoint, hash_grid_storage::HashGridStorage},
    utilities::token_reader::TokenReader,
};

/// Version written by default.
pub const SERIALIZATION_VERSION: u32 = 6;

/// Largest dimension accepted from a grid description.
pub const MAX_DIMENSION: usize = 1 << 16;

/// Newer than [`SERIALIZATION_VERSION`] but still accepted: files carrying it
/// use the version 5 layout.
pub const GRANDFATHERED_LEGACY_VERSION: u32 = 8;

pub(crate) fn is_supported(version: u32) -> bool
{
    (1..=SERIALIZATION_VERSION).contains(&version) || version == GRANDFATHERED_LEGACY_VERSION
}

pub(crate) fn stores_leaf_flag(version: u32) -> bool
{
    !matches!(version, 1 | 4)
}

pub(crate) fn stores_distributions(version: u32) -> bool
{
    version >= 6 && version != GRANDFATHERED_LEGACY_VERSION
}

fn check_version(version: u32) -> Result<(), SGError>
{
    if is_supported(version)
    {
        Ok(())
    }
    else
    {
        Err(SGError::UnsupportedVersion { version, supported: SERIALIZATION_VERSION })
    }
}

fn read_no_payload<R: BufRead>(_reader: &mut TokenReader<R>, dimension: usize) -> Result<CoordinateSystem, SGError>
{
    Ok(CoordinateSystem::BoundingBox(BoundingBox::with_dim(dimension)))
}

fn read_flat_bounding_box<R: BufRead>(reader: &mut TokenReader<R>, dimension: usize) -> Result<CoordinateSystem, SGError>
{
    Ok(CoordinateSystem::BoundingBox(BoundingBox::read_text(reader, dimension)?))
}

fn read_tagged<R: BufRead>(reader: &mut TokenReader<R>, dimension: usize) -> Result<CoordinateSystem, SGError>
{
    CoordinateSystem::read_text(reader, dimension)
}

fn read_coordinate_system<R: BufRead>(reader: &mut TokenReader<R>, dimension: usize, version: u32) -> Result<CoordinateSystem, SGError>
{
    match version
    {
        1 | 2 => read_no_payload(reader, dimension),
        3 | 4 => read_flat_bounding_box(reader, dimension),
        _ => read_tagged(reader, dimension),
    }
}

fn write_coordinate_system<W: Write>(writer: &mut W, coordinate_system: &CoordinateSystem, version: u32) -> Result<(), SGError>
{
    match (version, coordinate_system)
    {
        (1 | 2, CoordinateSystem::BoundingBox(bb)) if bb.is_unit_cube() => Ok(()),
        (1 | 2, _) => Err(SGError::IncompatibleVersion { version, reason: "a coordinate system other than the unit cube" }),
        (3 | 4, CoordinateSystem::BoundingBox(bb)) => bb.write_text(writer),
        (3 | 4, CoordinateSystem::Stretching(_)) => Err(SGError::IncompatibleVersion { version, reason: "a stretching" }),
        _ => coordinate_system.write_text(writer),
    }
}

impl HashGridStorage
{
    ///
    /// Writes the storage in the text format of `version` (1 to
    /// [`SERIALIZATION_VERSION`]).
    ///
    pub fn serialize<W: Write>(&self, writer: &mut W, version: u32) -> Result<(), SGError>
    {
        if version == GRANDFATHERED_LEGACY_VERSION
        {
            return Err(SGError::UnsupportedVersion { version, supported: SERIALIZATION_VERSION });
        }
        check_version(version)?;
        writeln!(writer, "{} {} {}", version, self.dimension, self.points.len())?;
        write_coordinate_system(writer, &self.coordinate_system, version)?;
        for point in &self.points
        {
            point.write_text(writer, version)?;
        }
        Ok(())
    }

    pub fn to_text(&self, version: u32) -> Result<String, SGError>
    {
        let mut buffer = Vec::new();
        self.serialize(&mut buffer, version)?;
        String::from_utf8(buffer).map_err(|_| SGError::SerializationFailed)
    }

    ///
    /// Reads a storage written by [`serialize`](Self::serialize) in any
    /// supported version. Formats without leaf flags get them recomputed.
    ///
    /// Boundary mode is not part of the format: it is switched on iff a
    /// parsed point has a level-zero coordinate. A boundary-mode storage
    /// holding only inner points reads back without it; call
    /// [`set_has_boundary`](Self::set_has_boundary) to restore it.
    ///
    /// Every point must be a valid coordinate and occur only once.
    ///
    pub fn parse_grid_description<R: BufRead>(reader: R) -> Result<Self, SGError>
    {
        let mut tokens = TokenReader::new(reader);
        let version: u32 = tokens.parse("format version")?;
        check_version(version)?;
        if version == GRANDFATHERED_LEGACY_VERSION
        {
            tracing::warn!(version, "reading grandfathered legacy grid format");
        }
        let dimension: usize = tokens.parse("dimension")?;
        if dimension > MAX_DIMENSION
        {
            return Err(SGError::DimensionTooLarge { dimension, max: MAX_DIMENSION });
        }
        // bounds the loop only, never used to preallocate
        let count: usize = tokens.parse("point count")?;
        let coordinate_system = read_coordinate_system(&mut tokens, dimension, version)?;

        let mut storage = HashGridStorage::with_coordinate_system(coordinate_system);
        for _ in 0..count
        {
            let point = GridPoint::read_text(&mut tokens, dimension, version)?;
            if storage.is_containing(&point)
            {
                return Err(SGError::DuplicatePoint(point.to_string()));
            }
            storage.insert(point);
        }
        storage.has_boundary = storage.points.iter().any(|p| !p.is_inner_point());
        if !stores_leaf_flag(version)
        {
            tracing::warn!(version, "grid format has no leaf flags, recomputing");
            storage.recalc_leaf_property();
        }
        tracing::debug!(version, dimension, points = count, "parsed grid description");
        Ok(storage)
    }
}

impl FromStr for HashGridStorage
{
    type Err = SGError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_grid_description(s.as_bytes())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::coordinates::{AnalyticStretching1D, DiscreteStretching1D, Stretching, StretchingTransform};
    use crate::generators;
    use crate::storage::grid_point::DistributionType;
    use approx::assert_relative_eq;

    fn assert_same_points(a: &HashGridStorage, b: &HashGridStorage)
    {
        assert_eq!(a.dimension(), b.dimension());
        assert_eq!(a.len(), b.len());
        for (seq, (p, q)) in a.iter().zip(b.iter()).enumerate()
        {
            assert_eq!(p, q);
            assert_eq!(p.is_leaf(), q.is_leaf());
            assert_eq!(b.sequence_number(q), Some(seq));
        }
    }

    #[test]
    fn round_trip_with_bounding_box()
    {
        let mut bb = BoundingBox::new(&[-1.0, 0.5], &[3.0, 0.75]).unwrap();
        bb.set_dirichlet(1, true, true);
        let mut storage = HashGridStorage::with_bounding_box(bb.clone());
        generators::regular(&mut storage, 3).unwrap();
        let mut p = GridPoint::new(&[4, 1], &[9, 1]);
        p.set_distribution(0, DistributionType::Normal);
        storage.insert(p);

        let text = storage.to_text(SERIALIZATION_VERSION).unwrap();
        let parsed: HashGridStorage = text.parse().unwrap();
        assert_same_points(&storage, &parsed);
        assert_eq!(parsed.coordinate_system().discriminator(), CoordinateSystem::BOUNDING_BOX);
        let parsed_bb = parsed.bounding_box().unwrap();
        for d in 0..2
        {
            assert_relative_eq!(parsed_bb.lower[d], bb.lower[d]);
            assert_relative_eq!(parsed_bb.upper[d], bb.upper[d]);
        }
        assert_eq!(parsed_bb.dirichlet_lower, bb.dirichlet_lower);
        assert_eq!(parsed.iter().last().unwrap().distribution(0), DistributionType::Normal);
        assert!(!parsed.has_boundary());
    }

    #[test]
    fn round_trip_with_analytic_stretching()
    {
        let stretching = Stretching::Analytic(vec![
            AnalyticStretching1D::new(0.1, 10.0, StretchingTransform::Log).unwrap(),
            AnalyticStretching1D::new(-2.0, 2.0, StretchingTransform::Sinh { x0: 0.3, xsi: 0.7 }).unwrap(),
        ]);
        let mut storage = HashGridStorage::with_stretching(stretching.clone());
        generators::full_with_boundaries(&mut storage, 2).unwrap();
        let text = storage.to_text(5).unwrap();
        let parsed = HashGridStorage::parse_grid_description(text.as_bytes()).unwrap();
        assert_same_points(&storage, &parsed);
        assert_eq!(parsed.coordinate_system().discriminator(), CoordinateSystem::ANALYTIC_STRETCHING);
        assert_eq!(parsed.stretching(), Some(&stretching));
        assert!(parsed.has_boundary());
        for (p, q) in storage.iter().zip(parsed.iter())
        {
            let (a, b) = (storage.get_coordinates(p), parsed.get_coordinates(q));
            for d in 0..2
            {
                assert_relative_eq!(a[d], b[d], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn round_trip_with_discrete_stretching()
    {
        let stretching = Stretching::Discrete(vec![DiscreteStretching1D::new(vec![0.0, 0.05, 0.2, 0.6, 1.0]).unwrap()]);
        let mut storage = HashGridStorage::with_stretching(stretching);
        generators::full(&mut storage, 3).unwrap();
        let text = storage.to_text(6).unwrap();
        assert!(text.starts_with("6 1 7\n2\n"));
        let parsed: HashGridStorage = text.parse().unwrap();
        assert_same_points(&storage, &parsed);
        assert_eq!(parsed.coordinate_system(), storage.coordinate_system());
    }

    #[test]
    fn version_one_recomputes_leaves()
    {
        let text = "1 1 3\n1 1\n2 1\n2 3\n";
        let storage: HashGridStorage = text.parse().unwrap();
        assert_eq!(storage.len(), 3);
        assert!(!storage[0].is_leaf());
        assert!(storage[1].is_leaf());
        assert!(storage[2].is_leaf());
        assert_eq!(storage.bounding_box(), Some(&BoundingBox::with_dim(1)));
    }

    #[test]
    fn version_two_keeps_stored_leaf_flags()
    {
        let text = "2 1 2\n1 1 1\n2 1 0\n";
        let storage: HashGridStorage = text.parse().unwrap();
        assert!(storage[0].is_leaf());
        assert!(!storage[1].is_leaf());
    }

    #[test]
    fn flat_bounding_box_versions()
    {
        let v3 = "3 2 1\n0 2 0 0\n-1 1 1 0\n1 1 1 1 0\n";
        let storage: HashGridStorage = v3.parse().unwrap();
        assert_eq!(storage.bounding_box().unwrap().upper, vec![2.0, 1.0]);
        assert_eq!(storage.bounding_box().unwrap().dirichlet_lower, vec![false, true]);
        assert!(!storage[0].is_leaf());

        let v4 = "4 2 1\n0 2 0 0\n-1 1 1 0\n1 1 1 1\n";
        let storage: HashGridStorage = v4.parse().unwrap();
        assert!(storage[0].is_leaf());
        assert_eq!(storage.get_coordinates(&storage[0]), vec![1.0, 0.0]);
    }

    #[test]
    fn writing_old_versions()
    {
        let mut storage = HashGridStorage::new(1);
        storage.insert(GridPoint::new(&[1], &[1]));
        assert_eq!(storage.to_text(1).unwrap(), "1 1 1\n1 1\n");
        assert_eq!(storage.to_text(4).unwrap(), "4 1 1\n0 1 0 0\n1 1\n");
        assert_eq!(storage.to_text(5).unwrap(), "5 1 1\n0\n0 1 0 0\n1 1 1\n");

        storage.set_bounding_box(BoundingBox::new(&[0.0], &[2.0]).unwrap()).unwrap();
        assert!(matches!(storage.to_text(2), Err(SGError::IncompatibleVersion { version: 2, .. })));
        storage.set_stretching(Stretching::Discrete(vec![DiscreteStretching1D::new(vec![0.0, 1.0]).unwrap()])).unwrap();
        assert!(matches!(storage.to_text(3), Err(SGError::IncompatibleVersion { version: 3, .. })));
        assert!(matches!(storage.to_text(GRANDFATHERED_LEGACY_VERSION), Err(SGError::UnsupportedVersion { .. })));
    }

    #[test]
    fn rejects_unknown_versions()
    {
        for version in [0, 7, 9, 42]
        {
            let text = format!("{version} 1 0\n0\n0 1 0 0\n");
            assert!(matches!(text.parse::<HashGridStorage>(), Err(SGError::UnsupportedVersion { version: v, .. }) if v == version));
        }
    }

    #[test]
    fn accepts_grandfathered_version()
    {
        let text = format!("{GRANDFATHERED_LEGACY_VERSION} 1 2\n0\n0 4 0 0\n1 1 0\n2 3 1\n");
        let storage: HashGridStorage = text.parse().unwrap();
        assert_eq!(storage.len(), 2);
        assert!(!storage[0].is_leaf());
        assert_eq!(storage.get_coordinates(&storage[1]), vec![3.0]);
    }

    #[test]
    fn malformed_input()
    {
        assert!(matches!("6 1 2\n0\n0 1 0 0\n1 1 1\n".parse::<HashGridStorage>(), Err(SGError::UnexpectedEndOfInput(_))));
        assert!(matches!("6 1 1\n5\n".parse::<HashGridStorage>(), Err(SGError::UnknownCoordinateSystem(5))));
        assert!(matches!("6 1 1\n0\n0 1 0 0\nx 1 1\n".parse::<HashGridStorage>(), Err(SGError::InvalidToken { .. })));
    }

    #[test]
    fn oversized_header_is_an_error()
    {
        let huge_count = format!("6 1 {}\n0\n0 1 0 0\n", usize::MAX);
        assert!(matches!(huge_count.parse::<HashGridStorage>(), Err(SGError::UnexpectedEndOfInput(_))));
        let huge_dimension = format!("1 {} 0\n", usize::MAX);
        assert!(matches!(huge_dimension.parse::<HashGridStorage>(), Err(SGError::DimensionTooLarge { .. })));
        let huge_dimension = format!("6 {} 0\n0\n", MAX_DIMENSION + 1);
        assert!(matches!(huge_dimension.parse::<HashGridStorage>(), Err(SGError::DimensionTooLarge { .. })));
    }

    #[test]
    fn invalid_point_coordinates_are_rejected()
    {
        assert!(matches!("6 1 1\n0\n0 1 0 0\n70 1 1 0\n".parse::<HashGridStorage>(), Err(SGError::LevelTooLarge { level: 70, .. })));
        assert!(matches!("6 1 1\n0\n0 1 0 0\n32 1 1 0\n".parse::<HashGridStorage>(), Err(SGError::LevelTooLarge { level: 32, .. })));
        assert!(matches!("6 1 1\n0\n0 1 0 0\n2 2 1 0\n".parse::<HashGridStorage>(), Err(SGError::InvalidGridPoint { level: 2, index: 2 })));
        assert!(matches!("6 1 1\n0\n0 1 0 0\n2 5 1 0\n".parse::<HashGridStorage>(), Err(SGError::InvalidGridPoint { level: 2, index: 5 })));
        assert!(matches!("2 1 1\n0 2 1\n".parse::<HashGridStorage>(), Err(SGError::InvalidGridPoint { level: 0, index: 2 })));
        let deepest = format!("6 1 1\n0\n0 1 0 0\n31 {} 1 0\n", (1_u32 << 31) - 1);
        let storage: HashGridStorage = deepest.parse().unwrap();
        assert_relative_eq!(storage.get_coordinates(&storage[0])[0], 1.0 - 1.0 / (1_u64 << 31) as f64);
    }

    #[test]
    fn duplicate_points_are_rejected()
    {
        let text = "6 1 2\n0\n0 1 0 0\n1 1 1 0\n1 1 1 0\n";
        assert!(matches!(text.parse::<HashGridStorage>(), Err(SGError::DuplicatePoint(_))));
        // leaf flag and distribution do not make a point distinct
        let text = "6 1 2\n0\n0 1 0 0\n1 1 1 0\n1 1 0 2\n";
        assert!(matches!(text.parse::<HashGridStorage>(), Err(SGError::DuplicatePoint(_))));
    }

    #[test]
    fn boundary_mode_follows_parsed_points()
    {
        let mut storage = HashGridStorage::new(1);
        storage.set_has_boundary(true);
        storage.insert(GridPoint::new(&[2], &[1]));
        let parsed: HashGridStorage = storage.to_text(SERIALIZATION_VERSION).unwrap().parse().unwrap();
        assert!(!parsed.has_boundary());

        storage.insert(GridPoint::new(&[0], &[1]));
        let mut parsed: HashGridStorage = storage.to_text(SERIALIZATION_VERSION).unwrap().parse().unwrap();
        assert!(parsed.has_boundary());
        parsed.insert_with_ancestors(&GridPoint::new(&[1], &[1]));
        assert!(parsed.is_containing(&GridPoint::new(&[0], &[0])));
    }
}
