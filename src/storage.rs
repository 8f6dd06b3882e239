pub mod export;
pub mod grid_point;
pub mod hash_grid_storage;
pub mod text_format;

pub use grid_point::{DistributionType, GridPoint};
pub use hash_grid_storage::HashGridStorage;
