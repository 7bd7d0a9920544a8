//! Shared data model types used by both the reading and the writing side.

/// The geometry type as specified in the vector tile spec (4.3.4).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GeomType {
    Unknown = 0,
    Point = 1,
    Linestring = 2,
    Polygon = 3,
    Spline = 4,
}

impl GeomType {
    pub(crate) fn from_raw(raw: i32) -> Option<GeomType> {
        match raw {
            0 => Some(GeomType::Unknown),
            1 => Some(GeomType::Point),
            2 => Some(GeomType::Linestring),
            3 => Some(GeomType::Polygon),
            4 => Some(GeomType::Spline),
            _ => None,
        }
    }

    /// Human-readable name of the geometry type, for debug output.
    pub fn name(self) -> &'static str {
        match self {
            GeomType::Unknown => "unknown",
            GeomType::Point => "point",
            GeomType::Linestring => "linestring",
            GeomType::Polygon => "polygon",
            GeomType::Spline => "spline",
        }
    }
}

/// Classification of a polygon ring derived from the sign of its area.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RingType {
    Outer,
    Inner,
    /// The ring's area is zero.
    Invalid,
}

/// A point in tile coordinates.
///
/// `z` is only meaningful for layers with three dimensions and stays 0
/// everywhere else.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Point {
        Point { x, y, z: 0 }
    }

    pub fn new_3d(x: i32, y: i32, z: i32) -> Point {
        Point { x, y, z }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Point {
        Point::new(x, y)
    }
}

impl From<(i32, i32, i32)> for Point {
    fn from((x, y, z): (i32, i32, i32)) -> Point {
        Point::new_3d(x, y, z)
    }
}

const INVALID_INDEX: u32 = u32::MAX;

/// An index into a layer's key or value table.
///
/// A default-constructed index is invalid and never matches a table entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexValue(u32);

impl IndexValue {
    pub fn new(value: u32) -> IndexValue {
        IndexValue(value)
    }

    pub fn invalid() -> IndexValue {
        IndexValue(INVALID_INDEX)
    }

    pub fn is_valid(self) -> bool {
        self.0 != INVALID_INDEX
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for IndexValue {
    fn default() -> IndexValue {
        IndexValue::invalid()
    }
}

impl From<u32> for IndexValue {
    fn from(value: u32) -> IndexValue {
        IndexValue::new(value)
    }
}

/// A key index paired with a value index, as stored in a feature's tags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexValuePair {
    key: IndexValue,
    value: IndexValue,
}

impl IndexValuePair {
    pub fn new(key: IndexValue, value: IndexValue) -> IndexValuePair {
        IndexValuePair { key, value }
    }

    pub fn is_valid(self) -> bool {
        self.key.is_valid() && self.value.is_valid()
    }

    pub fn key(self) -> IndexValue {
        self.key
    }

    pub fn value(self) -> IndexValue {
        self.value
    }
}

/// A typed property value used when building layers.
///
/// `Map` and `List` carry indexes into the owning layer's key/value tables,
/// so nested values have to be interned before the map or list referencing
/// them is added.
///
/// Only `PartialEq`: the float variants keep IEEE comparison semantics, so
/// `Value` cannot promise the reflexivity `Eq` requires. Value tables
/// deduplicate on the encoded bytes instead, where two NaNs with the same
/// bit pattern do compare equal.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    Float(f32),
    Double(f64),
    Int(i64),
    UInt(u64),
    SInt(i64),
    Bool(bool),
    Map(Vec<(IndexValue, IndexValue)>),
    List(Vec<IndexValue>),
}
