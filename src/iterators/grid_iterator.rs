use crate::storage::{grid_point::GridPoint, hash_grid_storage::HashGridStorage};

///
/// Cursor over a stored grid. Every move updates the current point and
/// returns whether the new position is present in the storage.
///
pub trait GridIteratorT
{
    fn point(&self) -> &GridPoint;
    fn point_index(&self, dim: usize) -> u32;
    fn index(&self) -> Option<usize>;
    fn reset_to_level_zero(&mut self) -> bool;
    fn reset_to_left_level_zero(&mut self, dim: usize) -> bool;
    fn reset_to_right_level_zero(&mut self, dim: usize) -> bool;
    fn reset_to_level_one(&mut self, dim: usize) -> bool;
    fn left_child(&mut self, dim: usize) -> bool;
    fn right_child(&mut self, dim: usize) -> bool;
    fn up(&mut self, dim: usize) -> bool;
    fn is_inner_point(&self) -> bool;
    fn is_leaf(&self) -> bool;
}

pub struct HashGridIterator<'a>
{
    pub(crate) storage: &'a HashGridStorage,
    index: GridPoint,
    seq: Option<usize>,
}

impl<'a> HashGridIterator<'a>
{
    pub fn new(storage: &'a HashGridStorage) -> Self
    {
        let point = GridPoint::root_point(storage.dimension());
        let seq = storage.sequence_number(&point);
        Self { storage, index: point, seq }
    }

    pub fn set_point(&mut self, point: &GridPoint)
    {
        self.index.assign(point);
        self.seq = self.storage.sequence_number(&self.index);
    }

    #[inline(always)]
    pub fn seq(&self) -> Option<usize>
    {
        self.seq
    }

    #[inline]
    fn lookup(&mut self) -> bool
    {
        self.seq = self.storage.sequence_number(&self.index);
        self.seq.is_some()
    }

    ///
    /// Moves to the left neighbour on the same level (`index - 2`).
    ///
    pub fn step_left(&mut self, dim: usize) -> bool
    {
        let (l, i) = self.index.get(dim);
        if i < 2
        {
            self.seq = None;
            return false;
        }
        self.index.set(dim, l, i - 2);
        self.lookup()
    }

    pub fn step_right(&mut self, dim: usize) -> bool
    {
        let (l, i) = self.index.get(dim);
        match i.checked_add(2)
        {
            Some(i) => self.index.set(dim, l, i),
            None =>
            {
                self.seq = None;
                return false;
            }
        }
        self.lookup()
    }

    pub fn has_left_child(&mut self, dim: usize) -> bool
    {
        let (l, i) = self.index.get(dim);
        let found = self.index.move_to_left_child(dim) && self.storage.is_containing(&self.index);
        self.index.set(dim, l, i);
        found
    }

    pub fn has_right_child(&mut self, dim: usize) -> bool
    {
        let (l, i) = self.index.get(dim);
        let found = self.index.move_to_right_child(dim) && self.storage.is_containing(&self.index);
        self.index.set(dim, l, i);
        found
    }

    ///
    /// True if the current point is a leaf and has no stored child in `dim`.
    ///
    pub fn hint(&mut self, dim: usize) -> bool
    {
        self.is_leaf() && !self.has_left_child(dim) && !self.has_right_child(dim)
    }
}

impl GridIteratorT for HashGridIterator<'_>
{
    #[inline(always)]
    fn point(&self) -> &GridPoint
    {
        &self.index
    }

    #[inline(always)]
    fn point_index(&self, dim: usize) -> u32
    {
        self.index.index(dim)
    }

    fn index(&self) -> Option<usize>
    {
        self.seq
    }

    fn reset_to_level_zero(&mut self) -> bool
    {
        for dim in 0..self.index.dimension()
        {
            self.index.set(dim, 0, 0);
        }
        self.lookup()
    }

    fn reset_to_left_level_zero(&mut self, dim: usize) -> bool
    {
        self.index.set(dim, 0, 0);
        self.lookup()
    }

    fn reset_to_right_level_zero(&mut self, dim: usize) -> bool
    {
        self.index.set(dim, 0, 1);
        self.lookup()
    }

    fn reset_to_level_one(&mut self, dim: usize) -> bool
    {
        self.index.set(dim, 1, 1);
        self.lookup()
    }

    fn left_child(&mut self, dim: usize) -> bool
    {
        if !self.index.move_to_left_child(dim)
        {
            self.seq = None;
            return false;
        }
        self.lookup()
    }

    fn right_child(&mut self, dim: usize) -> bool
    {
        if !self.index.move_to_right_child(dim)
        {
            self.seq = None;
            return false;
        }
        self.lookup()
    }

    fn up(&mut self, dim: usize) -> bool
    {
        if !self.index.move_to_parent(dim)
        {
            self.seq = None;
            return false;
        }
        self.lookup()
    }

    fn is_inner_point(&self) -> bool
    {
        self.index.is_inner_point()
    }

    fn is_leaf(&self) -> bool
    {
        match self.seq
        {
            Some(seq) => self.storage[seq].is_leaf(),
            None => true,
        }
    }
}
