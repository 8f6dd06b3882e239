use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::{errors::SGError, utilities::token_reader::TokenReader};

///
/// Axis-aligned domain: one `[lower, upper]` interval per dimension plus
/// Dirichlet flags for both ends.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox
{
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub dirichlet_lower: Vec<bool>,
    pub dirichlet_upper: Vec<bool>,
}

impl Default for BoundingBox
{
    #[inline]
    fn default() -> Self {
        Self { lower: vec![], upper: vec![], dirichlet_lower: vec![], dirichlet_upper: vec![] }
    }
}

impl BoundingBox
{
    pub fn new(lower: &[f64], upper: &[f64]) -> Result<Self, SGError>
    {
        if lower.len() != upper.len()
        {
            return Err(SGError::DimensionMismatch { expected: lower.len(), actual: upper.len() });
        }
        for (dim, (&l, &u)) in lower.iter().zip(upper.iter()).enumerate()
        {
            // written so that NaN bounds are rejected too
            if !(l < u)
            {
                return Err(SGError::InvalidBoundingBox { dim, lower: l, upper: u });
            }
        }
        let num_inputs = lower.len();
        Ok(Self { lower: lower.to_vec(), upper: upper.to_vec(), dirichlet_lower: vec![false; num_inputs], dirichlet_upper: vec![false; num_inputs] })
    }

    /// The unit hypercube without Dirichlet boundaries.
    pub fn with_dim(num_inputs: usize) -> Self
    {
        Self { lower: vec![0.0; num_inputs], upper: vec![1.0; num_inputs], dirichlet_lower: vec![false; num_inputs], dirichlet_upper: vec![false; num_inputs] }
    }

    #[inline]
    pub fn dimension(&self) -> usize
    {
        self.lower.len()
    }

    pub fn set_dirichlet(&mut self, dim: usize, lower: bool, upper: bool)
    {
        self.dirichlet_lower[dim] = lower;
        self.dirichlet_upper[dim] = upper;
    }

    pub fn is_unit_cube(&self) -> bool
    {
        self.lower.iter().all(|&l| l == 0.0) && self.upper.iter().all(|&u| u == 1.0)
            && !self.dirichlet_lower.contains(&true) && !self.dirichlet_upper.contains(&true)
    }

    #[inline]
    pub fn width(&self, dim: usize) -> f64
    {
        self.upper[dim] - self.lower[dim]
    }

    ///
    /// Volume of hypercube (width(dim1)*...*width(dim_n))
    ///
    #[inline]
    pub fn volume(&self) -> f64
    {
        (0..self.dimension()).map(|d| self.width(d)).product()
    }

    #[inline]
    pub fn to_unit_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        point.iter().enumerate().map(|(i, &x)| (x - self.lower[i]) / self.width(i)).collect()
    }

    #[inline]
    pub fn to_real_coordinate_1d(&self, dim: usize, unit: f64) -> f64
    {
        self.lower[dim] + self.width(dim) * unit
    }

    #[inline]
    pub fn to_real_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        point.iter().enumerate().map(|(i, &u)| self.to_real_coordinate_1d(i, u)).collect()
    }

    #[inline]
    pub fn contains(&self, point: &[f64]) -> bool
    {
        point.iter().enumerate().all(|(d, &x)| self.lower[d] <= x && x <= self.upper[d])
    }

    ///
    /// One line per dimension: `lower upper dirichlet_lower dirichlet_upper`.
    ///
    pub fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), SGError>
    {
        for d in 0..self.dimension()
        {
            writeln!(writer, "{} {} {} {}", self.lower[d], self.upper[d], self.dirichlet_lower[d] as u8, self.dirichlet_upper[d] as u8)?;
        }
        Ok(())
    }

    pub(crate) fn read_text<R: BufRead>(reader: &mut TokenReader<R>, dimension: usize) -> Result<Self, SGError>
    {
        let mut lower = vec![0.0; dimension];
        let mut upper = vec![0.0; dimension];
        let mut dirichlet = vec![(false, false); dimension];
        for d in 0..dimension
        {
            lower[d] = reader.parse("bounding box lower bound")?;
            upper[d] = reader.parse("bounding box upper bound")?;
            dirichlet[d] = (reader.parse_flag("bounding box dirichlet flag")?, reader.parse_flag("bounding box dirichlet flag")?);
        }
        let mut bounding_box = Self::new(&lower, &upper)?;
        for (d, (l, u)) in dirichlet.into_iter().enumerate()
        {
            bounding_box.set_dirichlet(d, l, u);
        }
        Ok(bounding_box)
    }
}
