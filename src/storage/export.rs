use num_traits::Float;
use rayon::prelude::*;

use crate::storage::hash_grid_storage::HashGridStorage;

///
/// Scalar type of the flat arrays handed to vectorized evaluation kernels.
///
pub trait EvalScalar: Float + Send + Sync
{
    /// A value whose bit pattern has only the sign bit set.
    fn sign_mask() -> Self;
    fn from_f64(value: f64) -> Self;
}

impl EvalScalar for f64
{
    #[inline]
    fn sign_mask() -> Self {
        f64::from_bits(0x8000_0000_0000_0000)
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }
}

impl EvalScalar for f32
{
    #[inline]
    fn sign_mask() -> Self {
        f32::from_bits(0x8000_0000)
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

///
/// Row-major `rows x cols` arrays: row = sequence number, column = dimension.
/// `level` holds `2^l`, `index` holds `i`.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LevelIndexArrays<T>
{
    pub level: Vec<T>,
    pub index: Vec<T>,
    pub max_level: u8,
    pub rows: usize,
    pub cols: usize,
}

///
/// Row-major arrays for the masked evaluation of modified linear bases.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModEvalArrays<T>
{
    pub level: Vec<T>,
    pub index: Vec<T>,
    pub mask: Vec<T>,
    pub offset: Vec<T>,
    pub rows: usize,
    pub cols: usize,
}

///
/// `(level', index', mask, offset)` of one `(level, index)` coordinate. The
/// cases are tested in order: level one, left extrapolation (`index == 1`),
/// right extrapolation (`index == 2^level - 1`), interior.
///
#[inline]
pub fn mod_eval_entry<T: EvalScalar>(level: u8, index: u32) -> (T, T, T, T)
{
    let two_pow_level = (1_u64 << level) as f64;
    if level == 1
    {
        (T::zero(), T::zero(), T::zero(), T::one())
    }
    else if index == 1
    {
        (T::from_f64(-two_pow_level), T::zero(), T::zero(), T::from_f64(2.0))
    }
    else if index as u64 == (1_u64 << level) - 1
    {
        (T::from_f64(two_pow_level), T::from_f64(index as f64), T::zero(), T::one())
    }
    else
    {
        (T::from_f64(two_pow_level), T::from_f64(index as f64), T::sign_mask(), T::one())
    }
}

impl HashGridStorage
{
    pub fn get_level_index_arrays_for_eval<T: EvalScalar>(&self) -> LevelIndexArrays<T>
    {
        let cols = self.dimension;
        let rows = self.len();
        let mut level = vec![T::zero(); rows * cols];
        let mut index = vec![T::zero(); rows * cols];
        if cols > 0
        {
            level.par_chunks_mut(cols).zip(index.par_chunks_mut(cols)).zip(self.points.par_iter())
                .for_each(|((level_row, index_row), point)|
                {
                    for d in 0..cols
                    {
                        let (l, i) = point.get(d);
                        level_row[d] = T::from_f64((1_u64 << l) as f64);
                        index_row[d] = T::from_f64(i as f64);
                    }
                });
        }
        LevelIndexArrays { level, index, max_level: self.get_max_level(), rows, cols }
    }

    /// `2^-l` per point and dimension, the integral of a hat function.
    pub fn get_level_for_integral<T: EvalScalar>(&self) -> Vec<T>
    {
        let cols = self.dimension;
        let mut level = vec![T::zero(); self.len() * cols];
        if cols > 0
        {
            level.par_chunks_mut(cols).zip(self.points.par_iter())
                .for_each(|(row, point)|
                {
                    for d in 0..cols
                    {
                        row[d] = T::from_f64(1.0 / (1_u64 << point.level(d)) as f64);
                    }
                });
        }
        level
    }

    pub fn get_level_index_mask_arrays_for_mod_eval<T: EvalScalar>(&self) -> ModEvalArrays<T>
    {
        let cols = self.dimension;
        let rows = self.len();
        let mut level = vec![T::zero(); rows * cols];
        let mut index = vec![T::zero(); rows * cols];
        let mut mask = vec![T::zero(); rows * cols];
        let mut offset = vec![T::zero(); rows * cols];
        if cols > 0
        {
            level.par_chunks_mut(cols)
                .zip(index.par_chunks_mut(cols))
                .zip(mask.par_chunks_mut(cols))
                .zip(offset.par_chunks_mut(cols))
                .zip(self.points.par_iter())
                .for_each(|((((level_row, index_row), mask_row), offset_row), point)|
                {
                    for d in 0..cols
                    {
                        let (l, i) = point.get(d);
                        (level_row[d], index_row[d], mask_row[d], offset_row[d]) = mod_eval_entry(l, i);
                    }
                });
        }
        ModEvalArrays { level, index, mask, offset, rows, cols }
    }

    pub fn get_max_level(&self) -> u8
    {
        self.points.par_iter().map(|p| p.level_max()).max().unwrap_or(0)
    }

    /// Real coordinates of every point, row-major.
    pub fn get_coordinate_arrays(&self) -> Vec<f64>
    {
        let cols = self.dimension;
        let mut coordinates = vec![0.0; self.len() * cols];
        if cols > 0
        {
            coordinates.par_chunks_mut(cols).zip(self.points.par_iter())
                .for_each(|(row, point)|
                {
                    for (d, x) in row.iter_mut().enumerate()
                    {
                        *x = self.get_coordinate(point, d);
                    }
                });
        }
        coordinates
    }
}
