use thiserror::Error;

///
/// Errors raised by the grid storage, its coordinate systems and the
/// serialization layers.
///
#[derive(Debug, Error)]
pub enum SGError
{
    #[error("algorithmic dimensions ({requested}) exceed grid dimension ({dimension})")]
    AlgorithmicDimensionsExceedDimension { requested: usize, dimension: usize },
    #[error("algorithmic dimension {value} is not a valid dimension of a {dimension}-dimensional grid")]
    InvalidAlgorithmicDimension { value: usize, dimension: usize },
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("invalid bounding box in dimension {dim}: lower {lower} must be below upper {upper}")]
    InvalidBoundingBox { dim: usize, lower: f64, upper: f64 },
    #[error("invalid stretching: {0}")]
    InvalidStretching(String),
    #[error("unknown stretching kind '{0}'")]
    UnknownStretchingKind(String),
    #[error("unsupported grid format version {version} (newest supported is {supported})")]
    UnsupportedVersion { version: u32, supported: u32 },
    #[error("grid format version {version} cannot represent {reason}")]
    IncompatibleVersion { version: u32, reason: &'static str },
    #[error("unknown coordinate system discriminator {0}")]
    UnknownCoordinateSystem(u32),
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEndOfInput(&'static str),
    #[error("invalid token '{token}' while reading {expected}")]
    InvalidToken { token: String, expected: &'static str },
    #[error("invalid index {index} for a grid of {len} points")]
    InvalidIndex { index: usize, len: usize },
    #[error("level {level} exceeds the maximum level {max}")]
    LevelTooLarge { level: u8, max: u8 },
    #[error("invalid grid point coordinate (level {level}, index {index})")]
    InvalidGridPoint { level: u8, index: u32 },
    #[error("grid point {0} occurs more than once")]
    DuplicatePoint(String),
    #[error("dimension {dimension} exceeds the maximum readable dimension {max}")]
    DimensionTooLarge { dimension: usize, max: usize },
    #[error("grid generators expect an empty storage, found {0} points")]
    StorageNotEmpty(usize),
    #[error("serialization failed")]
    SerializationFailed,
    #[error("deserialization failed")]
    DeserializationFailed,
    #[error("LZ4 decompression failed")]
    LZ4DecompressionFailed,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
