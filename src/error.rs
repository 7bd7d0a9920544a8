/// All the ways reading or writing a vector tile can fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Truncated or otherwise invalid protobuf data: bad wire type for a
    /// known field, duplicated singular fields, unpaired tag indexes.
    #[error("malformed vector tile: {0}")]
    MalformedWire(String),

    /// Layer version outside the supported set.
    #[error("4.1. Layers: unsupported version {0}, supported versions are 1, 2 and 3")]
    UnsupportedVersion(u32),

    /// A property value accessor was called for the wrong value kind.
    #[error("property value is of type {actual}, not {requested}")]
    Type {
        requested: &'static str,
        actual: &'static str,
    },

    /// A key or value index does not fit the layer's tables.
    #[error("index {index} is out of range for the layer's {table} table")]
    OutOfRange { index: u32, table: &'static str },

    /// Violation of the geometry encoding rules of spec 4.3.
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// Semantic overflow, e.g. more points in a linestring than a command
    /// integer can count.
    #[error("format violation: {0}")]
    Format(String),
}

impl From<quick_protobuf::Error> for Error {
    fn from(error: quick_protobuf::Error) -> Error {
        Error::MalformedWire(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
