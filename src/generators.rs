use crate::{errors::SGError, storage::{grid_point::{GridPoint, MAX_LEVEL}, hash_grid_storage::HashGridStorage}};

fn check_empty(storage: &HashGridStorage, level: u8) -> Result<(), SGError>
{
    if !storage.is_empty()
    {
        return Err(SGError::StorageNotEmpty(storage.len()));
    }
    if level > MAX_LEVEL
    {
        return Err(SGError::LevelTooLarge { level, max: MAX_LEVEL });
    }
    Ok(())
}

///
/// Generates a regular sparse grid of level `level`, without boundaries.
/// A point is part of the grid iff `|l|_1 <= level + dim - 1`.
///
pub fn regular(storage: &mut HashGridStorage, level: u8) -> Result<(), SGError>
{
    check_empty(storage, level)?;
    let dim = storage.dimension();
    if dim == 0 || level == 0
    {
        return Ok(());
    }
    let mut point = GridPoint::root_point(dim);
    for l in 1..=level
    {
        for i in (1..(1_u32 << l)).step_by(2)
        {
            point.set(0, l, i);
            storage.insert(point.clone());
        }
    }
    let n = level as u32;
    // Generate grid points in all other dimensions:
    // loop dim times over intermediate grid, take all grid points and
    // modify them in current dimension d
    for d in 1..dim
    {
        let ngrids = storage.len();
        for g in 0..ngrids
        {
            let mut point = storage[g].clone();
            // level in dimension d is still one here
            let level_sum = point.level_sum() - 1;
            let mut first = true;
            let mut l = 1_u8;
            while l as u32 + level_sum <= n + dim as u32 - 1
            {
                for i in (1..(1_u32 << l)).step_by(2)
                {
                    point.set(d, l, i);
                    if first
                    {
                        storage.update(point.clone(), g);
                        first = false;
                    }
                    else
                    {
                        storage.insert(point.clone());
                    }
                }
                l += 1;
            }
        }
    }
    storage.recalc_leaf_property();
    tracing::debug!(dim, level, points = storage.len(), "generated regular sparse grid");
    Ok(())
}

///
/// Generates a full grid of `2^level - 1` points per dimension, without boundaries.
///
pub fn full(storage: &mut HashGridStorage, level: u8) -> Result<(), SGError>
{
    check_empty(storage, level)?;
    let nodes: Vec<(u8, u32)> = (1..=level)
        .flat_map(|l| (1..(1_u32 << l)).step_by(2).map(move |i| (l, i)))
        .collect();
    tensor_product(storage, &nodes);
    tracing::debug!(level, points = storage.len(), "generated full grid");
    Ok(())
}

///
/// Generates a full grid of level `level` including both level-zero boundary
/// points in every dimension. The storage is switched to boundary mode.
///
pub fn full_with_boundaries(storage: &mut HashGridStorage, level: u8) -> Result<(), SGError>
{
    check_empty(storage, level)?;
    let nodes: Vec<(u8, u32)> = [(0, 0), (0, 1)].into_iter()
        .chain((1..=level).flat_map(|l| (1..(1_u32 << l)).step_by(2).map(move |i| (l, i))))
        .collect();
    storage.set_has_boundary(true);
    tensor_product(storage, &nodes);
    tracing::debug!(level, points = storage.len(), "generated full grid with boundaries");
    Ok(())
}

///
/// Inserts every combination of the one-dimensional `nodes` across all
/// dimensions, expanding one dimension at a time.
///
fn tensor_product(storage: &mut HashGridStorage, nodes: &[(u8, u32)])
{
    let dim = storage.dimension();
    if dim == 0 || nodes.is_empty()
    {
        return;
    }
    let mut point = GridPoint::root_point(dim);
    for &(l, i) in nodes
    {
        point.set(0, l, i);
        storage.insert(point.clone());
    }
    for d in 1..dim
    {
        let ngrids = storage.len();
        for g in 0..ngrids
        {
            let mut point = storage[g].clone();
            for (k, &(l, i)) in nodes.iter().enumerate()
            {
                point.set(d, l, i);
                if k == 0
                {
                    storage.update(point.clone(), g);
                }
                else
                {
                    storage.insert(point.clone());
                }
            }
        }
    }
    storage.recalc_leaf_property();
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn assert_unique(storage: &HashGridStorage)
    {
        for (i, point) in storage.iter().enumerate()
        {
            assert_eq!(storage.sequence_number(point), Some(i), "{point}");
        }
    }

    #[test]
    fn regular_1d_has_all_levels()
    {
        for level in 1..6
        {
            let mut storage = HashGridStorage::new(1);
            regular(&mut storage, level).unwrap();
            assert_eq!(storage.len(), (1 << level) - 1);
            assert_unique(&storage);
        }
    }

    #[test]
    fn regular_2d_level_3()
    {
        let mut storage = HashGridStorage::new(2);
        regular(&mut storage, 3).unwrap();
        assert_eq!(storage.len(), 17);
        assert_unique(&storage);
        assert!(storage.iter().all(|p| p.level_sum() <= 4));
        let leaves = storage.iter().filter(|p| p.is_leaf()).count();
        assert_eq!(leaves, storage.iter().filter(|p| p.level_sum() == 4).count());
    }

    #[test]
    fn regular_3d_level_3()
    {
        let mut storage = HashGridStorage::new(3);
        regular(&mut storage, 3).unwrap();
        assert_eq!(storage.len(), 31);
        assert_unique(&storage);
    }

    #[test]
    fn full_grids()
    {
        let mut storage = HashGridStorage::new(2);
        full(&mut storage, 2).unwrap();
        assert_eq!(storage.len(), 9);
        assert!(!storage.has_boundary());
        assert_unique(&storage);

        let mut storage = HashGridStorage::new(2);
        full_with_boundaries(&mut storage, 2).unwrap();
        assert_eq!(storage.len(), 25);
        assert!(storage.has_boundary());
        assert_eq!(storage.number_of_inner_points(), 9);
        assert_unique(&storage);
    }

    #[test]
    fn generators_require_empty_storage()
    {
        let mut storage = HashGridStorage::new(2);
        regular(&mut storage, 2).unwrap();
        assert!(matches!(full(&mut storage, 2), Err(SGError::StorageNotEmpty(5))));
        let mut storage = HashGridStorage::new(1);
        assert!(matches!(regular(&mut storage, 32), Err(SGError::LevelTooLarge { level: 32, .. })));
    }
}
