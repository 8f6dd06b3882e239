pub mod bounding_box;
pub mod stretching;

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::{errors::SGError, storage::grid_point::unit_position, utilities::token_reader::TokenReader};
pub use bounding_box::BoundingBox;
pub use stretching::{AnalyticStretching1D, DiscreteStretching1D, Stretching, StretchingTransform};

///
/// Geometric domain of a grid: exactly one of a bounding box or a stretching.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CoordinateSystem
{
    BoundingBox(BoundingBox),
    Stretching(Stretching),
}

impl Default for CoordinateSystem
{
    fn default() -> Self {
        CoordinateSystem::BoundingBox(BoundingBox::default())
    }
}

impl CoordinateSystem
{
    pub const BOUNDING_BOX: u32 = 0;
    pub const ANALYTIC_STRETCHING: u32 = 1;
    pub const DISCRETE_STRETCHING: u32 = 2;

    pub fn dimension(&self) -> usize
    {
        match self
        {
            CoordinateSystem::BoundingBox(bb) => bb.dimension(),
            CoordinateSystem::Stretching(s) => s.dimension(),
        }
    }

    ///
    /// Real coordinate of `(level, index)` in direction `dim`.
    ///
    #[inline]
    pub fn coordinate(&self, dim: usize, level: u8, index: u32) -> f64
    {
        match self
        {
            CoordinateSystem::BoundingBox(bb) => bb.to_real_coordinate_1d(dim, unit_position(level, index)),
            CoordinateSystem::Stretching(s) => s.coordinate(dim, level, index),
        }
    }

    pub fn lower(&self, dim: usize) -> f64
    {
        match self
        {
            CoordinateSystem::BoundingBox(bb) => bb.lower[dim],
            CoordinateSystem::Stretching(s) => s.lower(dim),
        }
    }

    pub fn upper(&self, dim: usize) -> f64
    {
        match self
        {
            CoordinateSystem::BoundingBox(bb) => bb.upper[dim],
            CoordinateSystem::Stretching(s) => s.upper(dim),
        }
    }

    pub fn discriminator(&self) -> u32
    {
        match self
        {
            CoordinateSystem::BoundingBox(_) => Self::BOUNDING_BOX,
            CoordinateSystem::Stretching(s) if s.is_discrete() => Self::DISCRETE_STRETCHING,
            CoordinateSystem::Stretching(_) => Self::ANALYTIC_STRETCHING,
        }
    }

    ///
    /// Discriminator line followed by the payload of the active variant.
    ///
    pub fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), SGError>
    {
        writeln!(writer, "{}", self.discriminator())?;
        match self
        {
            CoordinateSystem::BoundingBox(bb) => bb.write_text(writer),
            CoordinateSystem::Stretching(s) => s.write_text(writer),
        }
    }

    pub(crate) fn read_text<R: BufRead>(reader: &mut TokenReader<R>, dimension: usize) -> Result<Self, SGError>
    {
        let discriminator: u32 = reader.parse("coordinate system discriminator")?;
        match discriminator
        {
            Self::BOUNDING_BOX => Ok(CoordinateSystem::BoundingBox(BoundingBox::read_text(reader, dimension)?)),
            Self::ANALYTIC_STRETCHING => Ok(CoordinateSystem::Stretching(Stretching::read_analytic(reader, dimension)?)),
            Self::DISCRETE_STRETCHING => Ok(CoordinateSystem::Stretching(Stretching::read_discrete(reader, dimension)?)),
            other => Err(SGError::UnknownCoordinateSystem(other)),
        }
    }
}
