use std::{fmt::Display, hash::{Hash, Hasher}, io::{BufRead, Write}};

use bitfield_struct::bitfield;
use serde::{Deserialize, Serialize};

use crate::{errors::SGError, storage::text_format, utilities::token_reader::TokenReader};

/// Deepest level whose indices still fit into a `u32`.
pub const MAX_LEVEL: u8 = 31;

#[bitfield(u8, new=false)]
#[derive(Serialize, Deserialize, PartialEq, Eq)]
pub struct GridPointFlags
{
    pub is_leaf: bool,
    pub is_inner: bool,
    #[bits(6)]
    pub _empty: u8
}

impl GridPointFlags
{
    pub fn new(level: &[u8], is_leaf: bool) -> Self
    {
        let mut r = Self::default();
        r.set_is_leaf(is_leaf);
        r.set_is_inner(!level.contains(&0));
        r
    }
    /// update `is_inner` flag...
    pub fn update_is_inner(&mut self, level: &[u8])
    {
        self.set_is_inner(!level.contains(&0));
    }
}

///
/// Probability distribution attached to one dimension of a grid point. Only
/// carried along as metadata; the storage never interprets it.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionType
{
    #[default]
    Uniform,
    UniformBoundary,
    Normal,
    Lognormal,
}

impl DistributionType
{
    pub fn code(&self) -> u8
    {
        match self
        {
            DistributionType::Uniform => 0,
            DistributionType::UniformBoundary => 1,
            DistributionType::Normal => 2,
            DistributionType::Lognormal => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self>
    {
        match code
        {
            0 => Some(DistributionType::Uniform),
            1 => Some(DistributionType::UniformBoundary),
            2 => Some(DistributionType::Normal),
            3 => Some(DistributionType::Lognormal),
            _ => None,
        }
    }
}

///
/// Position of `index` at `level` on the unit interval. Level zero maps index
/// 0 to the left and index 1 to the right boundary.
///
#[inline]
pub fn unit_position(level: u8, index: u32) -> f64
{
    index as f64 / (1_u64 << level) as f64
}

///
/// A coordinate is valid if `index` is 0 or 1 at level zero, and odd and
/// below `2^level` for `1 <= level <= MAX_LEVEL`.
///
#[inline]
pub fn is_valid_coordinate(level: u8, index: u32) -> bool
{
    match level
    {
        0 => index <= 1,
        l if l > MAX_LEVEL => false,
        l => index % 2 == 1 && (index as u64) < (1_u64 << l),
    }
}

///
/// A multi-dimensional hierarchical grid point: one `(level, index)` pair per
/// dimension. Two points are equal iff all pairs match; the leaf flag and the
/// distribution metadata are not part of the identity.
///
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct GridPoint
{
    pub(crate) level: Vec<u8>,
    pub(crate) index: Vec<u32>,
    pub(crate) flags: GridPointFlags,
    #[serde(default)]
    pub(crate) distribution: Option<Vec<DistributionType>>,
}

impl Hash for GridPoint
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.index.hash(state);
    }
}

impl Default for GridPoint
{
    fn default() -> Self {
        Self { level: vec![], index: vec![], flags: GridPointFlags(0), distribution: None }
    }
}

impl PartialOrd for GridPoint
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(std::cmp::Ord::cmp(self, other))
    }
}

impl Ord for GridPoint
{
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index.cmp(&other.index).then(self.level.cmp(&other.level))
    }
}

impl PartialEq for GridPoint
{
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.index == other.index
    }
}
impl Eq for GridPoint{}

impl Display for GridPoint
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for d in 0..self.dimension()
        {
            if d > 0
            {
                write!(f, " ")?;
            }
            write!(f, "({}, {})", self.level[d], self.index[d])?;
        }
        Ok(())
    }
}

impl GridPoint
{
    ///
    /// Creates a point from per-dimension levels and indices. New points are
    /// leaves until the storage recomputes the property.
    ///
    pub fn new(level: &[u8], index: &[u32]) -> Self
    {
        debug_assert_eq!(level.len(), index.len(), "level and index must have the same dimension");
        let flags = GridPointFlags::new(level, true);
        Self { level: level.to_vec(), index: index.to_vec(), flags, distribution: None }
    }

    ///
    /// Like [`new`](Self::new), but rejects mismatched lengths and invalid
    /// `(level, index)` pairs.
    ///
    pub fn try_new(level: &[u8], index: &[u32]) -> Result<Self, SGError>
    {
        if level.len() != index.len()
        {
            return Err(SGError::DimensionMismatch { expected: level.len(), actual: index.len() });
        }
        let point = Self::new(level, index);
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<(), SGError>
    {
        if self.level.len() != self.index.len()
        {
            return Err(SGError::DimensionMismatch { expected: self.level.len(), actual: self.index.len() });
        }
        if let Some(distribution) = &self.distribution
        {
            if distribution.len() != self.level.len()
            {
                return Err(SGError::DimensionMismatch { expected: self.level.len(), actual: distribution.len() });
            }
        }
        for (&level, &index) in self.level.iter().zip(self.index.iter())
        {
            if level > MAX_LEVEL
            {
                return Err(SGError::LevelTooLarge { level, max: MAX_LEVEL });
            }
            if !is_valid_coordinate(level, index)
            {
                return Err(SGError::InvalidGridPoint { level, index });
            }
        }
        Ok(())
    }

    /// The level-one point `(1, 1)` in every dimension.
    pub fn root_point(dimension: usize) -> Self
    {
        Self::new(&vec![1; dimension], &vec![1; dimension])
    }

    /// The left level-zero corner `(0, 0)` in every dimension.
    pub fn zero_index(dimension: usize) -> Self
    {
        Self::new(&vec![0; dimension], &vec![0; dimension])
    }

    #[inline]
    pub fn dimension(&self) -> usize
    {
        self.level.len()
    }

    #[inline]
    pub fn get(&self, dim: usize) -> (u8, u32)
    {
        (self.level[dim], self.index[dim])
    }

    #[inline]
    pub fn set(&mut self, dim: usize, level: u8, index: u32)
    {
        self.level[dim] = level;
        self.index[dim] = index;
        self.flags.update_is_inner(&self.level);
    }

    #[inline]
    pub fn level(&self, dim: usize) -> u8
    {
        self.level[dim]
    }

    #[inline]
    pub fn index(&self, dim: usize) -> u32
    {
        self.index[dim]
    }

    pub fn levels(&self) -> &[u8]
    {
        &self.level
    }

    pub fn indices(&self) -> &[u32]
    {
        &self.index
    }

    ///
    /// Overwrites this point with `other`, reusing the allocations.
    ///
    pub fn assign(&mut self, other: &GridPoint)
    {
        self.level.clone_from(&other.level);
        self.index.clone_from(&other.index);
        self.flags = other.flags;
        self.distribution.clone_from(&other.distribution);
    }

    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }

    pub fn set_leaf(&mut self, is_leaf: bool)
    {
        self.flags.set_is_leaf(is_leaf);
    }

    ///
    /// This is an inner point if no level is zero...
    ///
    pub fn is_inner_point(&self) -> bool
    {
        self.flags.is_inner()
    }

    pub fn distribution(&self, dim: usize) -> DistributionType
    {
        self.distribution.as_ref().map_or(DistributionType::Uniform, |d| d[dim])
    }

    pub fn set_distribution(&mut self, dim: usize, distribution: DistributionType)
    {
        let dimension = self.dimension();
        self.distribution.get_or_insert_with(|| vec![DistributionType::Uniform; dimension])[dim] = distribution;
    }

    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }

    #[inline]
    pub fn level_max(&self) -> u8
    {
        *self.level.iter().max().unwrap_or(&0)
    }

    pub fn level_min(&self) -> u8
    {
        *self.level.iter().min().unwrap_or(&0)
    }

    ///
    /// Moves the point to its hierarchical parent in direction `dim`. The
    /// parent of a level-one point is the left level-zero boundary; level-zero
    /// points have no parent and are left untouched (returns `false`).
    ///
    pub fn move_to_parent(&mut self, dim: usize) -> bool
    {
        match self.level[dim]
        {
            0 => false,
            1 =>
            {
                self.set(dim, 0, 0);
                true
            }
            l =>
            {
                self.set(dim, l - 1, (self.index[dim] >> 1) | 1);
                true
            }
        }
    }

    ///
    /// Both children of a level-zero coordinate are the level-one root.
    /// Points at `MAX_LEVEL` have no children; the point is left untouched
    /// and `false` is returned.
    ///
    pub fn move_to_left_child(&mut self, dim: usize) -> bool
    {
        self.move_to_child(dim, false)
    }

    pub fn move_to_right_child(&mut self, dim: usize) -> bool
    {
        self.move_to_child(dim, true)
    }

    fn move_to_child(&mut self, dim: usize, right: bool) -> bool
    {
        let (l, i) = self.get(dim);
        let child = match l
        {
            0 => Some(1),
            l if l >= MAX_LEVEL => None,
            _ if right => i.checked_mul(2).and_then(|i| i.checked_add(1)),
            _ => i.checked_mul(2).and_then(|i| i.checked_sub(1)),
        };
        match child
        {
            Some(index) =>
            {
                self.set(dim, l + 1, index);
                true
            }
            None => false,
        }
    }

    pub fn parent(&self, dim: usize) -> Option<GridPoint>
    {
        let mut r = self.clone();
        r.move_to_parent(dim).then_some(r)
    }

    pub fn left_child(&self, dim: usize) -> Option<GridPoint>
    {
        let mut r = self.clone();
        r.move_to_left_child(dim).then_some(r)
    }

    pub fn right_child(&self, dim: usize) -> Option<GridPoint>
    {
        let mut r = self.clone();
        r.move_to_right_child(dim).then_some(r)
    }

    ///
    /// returns an index with the top level in direction dim
    ///
    pub fn root(&self, dim: usize) -> GridPoint
    {
        let mut r = self.clone();
        r.set(dim, 1, 1);
        r
    }

    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        self.level.iter().zip(self.index.iter()).map(|(&l, &i)| unit_position(l, i)).collect()
    }

    ///
    /// Writes the point as one line: `level index` per dimension, then the
    /// leaf bit and the distribution codes if `version` stores them.
    ///
    pub fn write_text<W: Write>(&self, writer: &mut W, version: u32) -> Result<(), SGError>
    {
        for d in 0..self.dimension()
        {
            if d > 0
            {
                write!(writer, " ")?;
            }
            write!(writer, "{} {}", self.level[d], self.index[d])?;
        }
        if text_format::stores_leaf_flag(version)
        {
            write!(writer, " {}", self.is_leaf() as u8)?;
        }
        if text_format::stores_distributions(version)
        {
            for d in 0..self.dimension()
            {
                write!(writer, " {}", self.distribution(d).code())?;
            }
        }
        writeln!(writer)?;
        Ok(())
    }

    pub(crate) fn read_text<R: BufRead>(reader: &mut TokenReader<R>, dimension: usize, version: u32) -> Result<Self, SGError>
    {
        let mut level = vec![0_u8; dimension];
        let mut index = vec![0_u32; dimension];
        for d in 0..dimension
        {
            level[d] = reader.parse("grid point level")?;
            index[d] = reader.parse("grid point index")?;
            if level[d] > MAX_LEVEL
            {
                return Err(SGError::LevelTooLarge { level: level[d], max: MAX_LEVEL });
            }
            if !is_valid_coordinate(level[d], index[d])
            {
                return Err(SGError::InvalidGridPoint { level: level[d], index: index[d] });
            }
        }
        let mut point = GridPoint::new(&level, &index);
        if text_format::stores_leaf_flag(version)
        {
            point.set_leaf(reader.parse_flag("grid point leaf flag")?);
        }
        if text_format::stores_distributions(version)
        {
            for d in 0..dimension
            {
                let code: u8 = reader.parse("grid point distribution")?;
                let distribution = DistributionType::from_code(code)
                    .ok_or_else(|| SGError::InvalidToken { token: code.to_string(), expected: "grid point distribution" })?;
                if distribution != DistributionType::Uniform
                {
                    point.set_distribution(d, distribution);
                }
            }
        }
        Ok(point)
    }
}
