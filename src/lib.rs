pub mod coordinates;
pub mod errors;
pub mod generators;
pub mod iterators;
pub mod serialization;
pub mod storage;
pub(crate) mod utilities;

pub use errors::SGError;
pub use storage::{GridPoint, HashGridStorage};
