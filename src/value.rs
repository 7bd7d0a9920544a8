//! Property values and the machinery to materialize them into caller types.
//!
//! A [`PropertyValue`] is a view over one encoded `Value` message from a
//! layer's value table. It parses its tag lazily; typed accessors validate
//! the kind on every call. Map and list values do not duplicate payload:
//! they carry packed indexes into the owning layer's tables and resolve
//! them through a non-owning layer handle.

use std::collections::HashMap;

use quick_protobuf::BytesReader;

use crate::error::{Error, Result};
use crate::read::Layer;
use crate::wire::{split_key, PackedU32, WIRE_FIXED32, WIRE_FIXED64, WIRE_LEN, WIRE_VARINT};

/// The property value kind as specified in the vector tile spec (4.4).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueType {
    String = 1,
    Float = 2,
    Double = 3,
    Int = 4,
    Uint = 5,
    Sint = 6,
    Bool = 7,
    Map = 8,
    List = 9,
}

impl ValueType {
    fn from_field(field: u32) -> Option<ValueType> {
        match field {
            1 => Some(ValueType::String),
            2 => Some(ValueType::Float),
            3 => Some(ValueType::Double),
            4 => Some(ValueType::Int),
            5 => Some(ValueType::Uint),
            6 => Some(ValueType::Sint),
            7 => Some(ValueType::Bool),
            8 => Some(ValueType::Map),
            9 => Some(ValueType::List),
            _ => None,
        }
    }

    fn wire_type(self) -> u32 {
        match self {
            ValueType::String | ValueType::Map | ValueType::List => WIRE_LEN,
            ValueType::Float => WIRE_FIXED32,
            ValueType::Double => WIRE_FIXED64,
            ValueType::Int | ValueType::Uint | ValueType::Sint | ValueType::Bool => WIRE_VARINT,
        }
    }

    /// Human-readable name of the value kind, for debug output.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Int => "int",
            ValueType::Uint => "uint",
            ValueType::Sint => "sint",
            ValueType::Bool => "bool",
            ValueType::Map => "map",
            ValueType::List => "list",
        }
    }
}

/// A view of a single encoded property value. Does not own any data.
#[derive(Copy, Clone, Debug)]
pub struct PropertyValue<'l, 't> {
    data: &'t [u8],
    layer: Option<&'l Layer<'t>>,
}

impl<'l, 't> PropertyValue<'l, 't> {
    /// Wraps an encoded value message that contains no map or list values.
    /// Values obtained from a layer's value table keep the layer handle and
    /// can resolve nested maps and lists.
    pub fn new(data: &'t [u8]) -> PropertyValue<'l, 't> {
        PropertyValue { data, layer: None }
    }

    pub(crate) fn with_layer(data: &'t [u8], layer: &'l Layer<'t>) -> PropertyValue<'l, 't> {
        PropertyValue {
            data,
            layer: Some(layer),
        }
    }

    /// The raw encoded bytes this view was constructed with.
    pub fn data(&self) -> &'t [u8] {
        self.data
    }

    /// The kind of this value.
    ///
    /// Fails with [`Error::Format`] if the tag is missing or the tag/wire
    /// type pairing is not one of the nine legal ones.
    pub fn kind(&self) -> Result<ValueType> {
        let mut reader = BytesReader::from_bytes(self.data);
        if reader.is_eof() {
            return Err(Error::Format("missing tag in property value".to_string()));
        }
        let (field, wire) = split_key(reader.next_tag(self.data)?);
        match ValueType::from_field(field) {
            Some(kind) if kind.wire_type() == wire => Ok(kind),
            _ => Err(Error::Format("illegal property value type".to_string())),
        }
    }

    fn get<T>(
        &self,
        requested: ValueType,
        read: impl Fn(&mut BytesReader, &'t [u8]) -> quick_protobuf::Result<T>,
    ) -> Result<T> {
        let mut reader = BytesReader::from_bytes(self.data);
        let mut found = None;
        while !reader.is_eof() {
            let key = reader.next_tag(self.data)?;
            let (field, wire) = split_key(key);
            if field == requested as u32 {
                if wire != requested.wire_type() {
                    return Err(Error::Format("illegal property value type".to_string()));
                }
                found = Some(read(&mut reader, self.data)?);
            } else {
                reader.read_unknown(self.data, key)?;
            }
        }
        found.ok_or_else(|| Error::Type {
            requested: requested.name(),
            actual: self.kind().map(ValueType::name).unwrap_or("unknown"),
        })
    }

    pub fn string_value(&self) -> Result<&'t str> {
        self.get(ValueType::String, |r, b| r.read_string(b))
    }

    pub fn float_value(&self) -> Result<f32> {
        self.get(ValueType::Float, |r, b| r.read_float(b))
    }

    pub fn double_value(&self) -> Result<f64> {
        self.get(ValueType::Double, |r, b| r.read_double(b))
    }

    pub fn int_value(&self) -> Result<i64> {
        self.get(ValueType::Int, |r, b| r.read_int64(b))
    }

    pub fn uint_value(&self) -> Result<u64> {
        self.get(ValueType::Uint, |r, b| r.read_uint64(b))
    }

    pub fn sint_value(&self) -> Result<i64> {
        self.get(ValueType::Sint, |r, b| r.read_sint64(b))
    }

    pub fn bool_value(&self) -> Result<bool> {
        self.get(ValueType::Bool, |r, b| r.read_bool(b))
    }

    pub fn map_value(&self) -> Result<PropertyMap<'l, 't>> {
        let indexes = self.get(ValueType::Map, |r, b| r.read_bytes(b))?;
        PropertyMap::new(self.owning_layer()?, indexes)
    }

    pub fn list_value(&self) -> Result<PropertyList<'l, 't>> {
        let indexes = self.get(ValueType::List, |r, b| r.read_bytes(b))?;
        PropertyList::new(self.owning_layer()?, indexes)
    }

    fn owning_layer(&self) -> Result<&'l Layer<'t>> {
        self.layer.ok_or_else(|| {
            Error::Format("map or list value without an owning layer".to_string())
        })
    }
}

/// Property values are equal if they contain the same encoded data.
impl PartialEq for PropertyValue<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for PropertyValue<'_, '_> {}

/// A map value: packed pairs of key/value indexes into the owning layer's
/// tables (spec 4.4).
#[derive(Copy, Clone)]
pub struct PropertyMap<'l, 't> {
    layer: &'l Layer<'t>,
    indexes: &'t [u8],
    len: usize,
}

impl<'l, 't> PropertyMap<'l, 't> {
    pub(crate) fn new(layer: &'l Layer<'t>, indexes: &'t [u8]) -> Result<PropertyMap<'l, 't>> {
        let n = PackedU32::count(indexes)?;
        if n % 2 != 0 {
            return Err(Error::MalformedWire(
                "unpaired property key/value indexes (spec 4.4)".to_string(),
            ));
        }
        Ok(PropertyMap {
            layer,
            indexes,
            len: n / 2,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Calls `func` for every entry in order. Returning `false` from the
    /// callback stops the iteration early; the early stop is reported as
    /// `Ok(false)`.
    pub fn for_each_property<F>(&self, mut func: F) -> Result<bool>
    where
        F: FnMut(&'t str, PropertyValue<'l, 't>) -> Result<bool>,
    {
        let mut it = PackedU32::new(self.indexes);
        while let Some(key_index) = it.next().transpose()? {
            let value_index = match it.next().transpose()? {
                Some(vi) => vi,
                None => {
                    return Err(Error::MalformedWire(
                        "unpaired property key/value indexes (spec 4.4)".to_string(),
                    ))
                }
            };
            let key = self.layer.key(key_index.into())?;
            let value = self.layer.value(value_index.into())?;
            if !func(key, value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// A list value: packed value indexes into the owning layer's value table.
#[derive(Copy, Clone)]
pub struct PropertyList<'l, 't> {
    layer: &'l Layer<'t>,
    indexes: &'t [u8],
    len: usize,
}

impl<'l, 't> PropertyList<'l, 't> {
    pub(crate) fn new(layer: &'l Layer<'t>, indexes: &'t [u8]) -> Result<PropertyList<'l, 't>> {
        let len = PackedU32::count(indexes)?;
        Ok(PropertyList {
            layer,
            indexes,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Calls `func` for every value in order. Returning `false` stops the
    /// iteration early; the early stop is reported as `Ok(false)`.
    pub fn for_each_value<F>(&self, mut func: F) -> Result<bool>
    where
        F: FnMut(PropertyValue<'l, 't>) -> Result<bool>,
    {
        let mut it = PackedU32::new(self.indexes);
        while let Some(index) = it.next().transpose()? {
            if !func(self.layer.value(index.into())?)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Dispatches a property value to the method matching its kind.
///
/// All methods return [`Visitor::Output`]; `visit_sint` falls back to
/// `visit_int` unless overridden.
pub trait Visitor {
    type Output;

    fn visit_string(&mut self, value: &str) -> Self::Output;
    fn visit_float(&mut self, value: f32) -> Self::Output;
    fn visit_double(&mut self, value: f64) -> Self::Output;
    fn visit_int(&mut self, value: i64) -> Self::Output;
    fn visit_uint(&mut self, value: u64) -> Self::Output;
    fn visit_bool(&mut self, value: bool) -> Self::Output;
    fn visit_map(&mut self, value: PropertyMap<'_, '_>) -> Self::Output;
    fn visit_list(&mut self, value: PropertyList<'_, '_>) -> Self::Output;

    fn visit_sint(&mut self, value: i64) -> Self::Output {
        self.visit_int(value)
    }
}

/// Applies `visitor` to the payload of `value`, invoking exactly one of the
/// visitor's methods.
pub fn apply_visitor<V: Visitor>(
    visitor: &mut V,
    value: &PropertyValue<'_, '_>,
) -> Result<V::Output> {
    match value.kind()? {
        ValueType::String => Ok(visitor.visit_string(value.string_value()?)),
        ValueType::Float => Ok(visitor.visit_float(value.float_value()?)),
        ValueType::Double => Ok(visitor.visit_double(value.double_value()?)),
        ValueType::Int => Ok(visitor.visit_int(value.int_value()?)),
        ValueType::Uint => Ok(visitor.visit_uint(value.uint_value()?)),
        ValueType::Sint => Ok(visitor.visit_sint(value.sint_value()?)),
        ValueType::Bool => Ok(visitor.visit_bool(value.bool_value()?)),
        ValueType::Map => Ok(visitor.visit_map(value.map_value()?)),
        ValueType::List => Ok(visitor.visit_list(value.list_value()?)),
    }
}

/// Conversion target for [`convert_property_value`]. Implement this for
/// your own variant type; maps and lists recurse through it.
pub trait FromProperty: Sized {
    fn from_string(value: &str) -> Self;
    fn from_float(value: f32) -> Self;
    fn from_double(value: f64) -> Self;
    /// Also receives sint values.
    fn from_int(value: i64) -> Self;
    fn from_uint(value: u64) -> Self;
    fn from_bool(value: bool) -> Self;
    fn from_map(value: HashMap<String, Self>) -> Self;
    fn from_list(value: Vec<Self>) -> Self;
}

/// Converts a property value into a caller-defined variant type.
pub fn convert_property_value<T: FromProperty>(value: &PropertyValue<'_, '_>) -> Result<T> {
    match value.kind()? {
        ValueType::String => Ok(T::from_string(value.string_value()?)),
        ValueType::Float => Ok(T::from_float(value.float_value()?)),
        ValueType::Double => Ok(T::from_double(value.double_value()?)),
        ValueType::Int => Ok(T::from_int(value.int_value()?)),
        ValueType::Uint => Ok(T::from_uint(value.uint_value()?)),
        ValueType::Sint => Ok(T::from_int(value.sint_value()?)),
        ValueType::Bool => Ok(T::from_bool(value.bool_value()?)),
        ValueType::Map => Ok(T::from_map(create_properties_map(&value.map_value()?)?)),
        ValueType::List => Ok(T::from_list(create_properties_list(&value.list_value()?)?)),
    }
}

/// Materializes a map value into a `HashMap` of caller-defined variants.
pub fn create_properties_map<T: FromProperty>(
    map: &PropertyMap<'_, '_>,
) -> Result<HashMap<String, T>> {
    let mut out = HashMap::with_capacity(map.len());
    map.for_each_property(|key, value| {
        out.insert(key.to_string(), convert_property_value(&value)?);
        Ok(true)
    })?;
    Ok(out)
}

/// Materializes a list value into a `Vec` of caller-defined variants.
pub fn create_properties_list<T: FromProperty>(
    list: &PropertyList<'_, '_>,
) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(list.len());
    list.for_each_value(|value| {
        out.push(convert_property_value(&value)?);
        Ok(true)
    })?;
    Ok(out)
}
