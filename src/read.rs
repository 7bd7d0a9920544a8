//! Reading side: tile, layer and feature views over an externally owned
//! buffer. Nothing in here copies payload bytes; every view stays valid
//! exactly as long as the buffer it was created from.

use quick_protobuf::BytesReader;

use crate::common::{GeomType, IndexValue, IndexValuePair};
use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::value::PropertyValue;
use crate::wire::{
    feature_fields, layer_fields, split_key, tile_fields, PackedU32, WIRE_LEN, WIRE_VARINT,
};

fn expect_wire(what: &str, wire: u32, expected: u32) -> Result<()> {
    if wire != expected {
        return Err(Error::MalformedWire(format!(
            "unexpected wire type {wire} for {what}"
        )));
    }
    Ok(())
}

/// A view of a serialized vector tile.
#[derive(Copy, Clone, Debug)]
pub struct Tile<'t> {
    data: &'t [u8],
}

impl<'t> Tile<'t> {
    pub fn new(data: &'t [u8]) -> Tile<'t> {
        Tile { data }
    }

    pub fn data(&self) -> &'t [u8] {
        self.data
    }

    /// Iterates the layers in wire order.
    pub fn layers(&self) -> Layers<'t> {
        Layers {
            raw: RawLayers::new(self.data),
        }
    }

    /// Number of layers. This only scans the tile's field structure, so it
    /// also works on tiles whose layers fail to parse.
    pub fn count_layers(&self) -> Result<usize> {
        let mut raw = RawLayers::new(self.data);
        let mut n = 0;
        while raw.next().transpose()?.is_some() {
            n += 1;
        }
        Ok(n)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(RawLayers::new(self.data).next().transpose()?.is_none())
    }

    /// The `index`-th layer, or `None` if there are fewer layers.
    pub fn get_layer(&self, index: usize) -> Result<Option<Layer<'t>>> {
        self.layers().nth(index).transpose()
    }

    /// The first layer with the given name, or `None`.
    pub fn get_layer_by_name(&self, name: &str) -> Result<Option<Layer<'t>>> {
        for layer in self.layers() {
            let layer = layer?;
            if layer.name() == name {
                return Ok(Some(layer));
            }
        }
        Ok(None)
    }
}

/// Iterator over the raw byte ranges of a tile's layer fields.
struct RawLayers<'t> {
    data: &'t [u8],
    reader: BytesReader,
}

impl<'t> RawLayers<'t> {
    fn new(data: &'t [u8]) -> RawLayers<'t> {
        RawLayers {
            data,
            reader: BytesReader::from_bytes(data),
        }
    }
}

impl<'t> Iterator for RawLayers<'t> {
    type Item = Result<&'t [u8]>;

    fn next(&mut self) -> Option<Result<&'t [u8]>> {
        loop {
            if self.reader.is_eof() {
                return None;
            }
            let key = match self.reader.next_tag(self.data) {
                Ok(key) => key,
                Err(e) => return Some(Err(e.into())),
            };
            let (field, wire) = split_key(key);
            if field == tile_fields::LAYERS {
                if let Err(e) = expect_wire("a tile layer", wire, WIRE_LEN) {
                    return Some(Err(e));
                }
                return Some(self.reader.read_bytes(self.data).map_err(Error::from));
            }
            if let Err(e) = self.reader.read_unknown(self.data, key) {
                return Some(Err(e.into()));
            }
        }
    }
}

/// Iterator over the parsed layers of a tile.
pub struct Layers<'t> {
    raw: RawLayers<'t>,
}

impl<'t> Iterator for Layers<'t> {
    type Item = Result<Layer<'t>>;

    fn next(&mut self) -> Option<Result<Layer<'t>>> {
        self.raw.next().map(|data| Layer::parse(data?))
    }
}

/// A view of one layer of a vector tile.
#[derive(Clone, Debug)]
pub struct Layer<'t> {
    data: &'t [u8],
    name: &'t str,
    version: u32,
    extent: u32,
    dimensions: u32,
    keys: Vec<&'t str>,
    values: Vec<&'t [u8]>,
    features: Vec<&'t [u8]>,
}

impl<'t> Layer<'t> {
    pub(crate) fn parse(data: &'t [u8]) -> Result<Layer<'t>> {
        let mut reader = BytesReader::from_bytes(data);
        let mut name = None;
        let mut version = None;
        let mut extent = None;
        let mut dimensions = None;
        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut features = Vec::new();

        while !reader.is_eof() {
            let key = reader.next_tag(data)?;
            let (field, wire) = split_key(key);
            match field {
                layer_fields::NAME => {
                    expect_wire("the layer name", wire, WIRE_LEN)?;
                    name = Some(reader.read_string(data)?);
                }
                layer_fields::FEATURES => {
                    expect_wire("a layer feature", wire, WIRE_LEN)?;
                    features.push(reader.read_bytes(data)?);
                }
                layer_fields::KEYS => {
                    expect_wire("a layer key", wire, WIRE_LEN)?;
                    keys.push(reader.read_string(data)?);
                }
                layer_fields::VALUES => {
                    expect_wire("a layer value", wire, WIRE_LEN)?;
                    values.push(reader.read_bytes(data)?);
                }
                layer_fields::EXTENT => {
                    expect_wire("the layer extent", wire, WIRE_VARINT)?;
                    extent = Some(reader.read_uint32(data)?);
                }
                layer_fields::DIMENSIONS => {
                    expect_wire("the layer dimensions", wire, WIRE_VARINT)?;
                    dimensions = Some(reader.read_uint32(data)?);
                }
                layer_fields::VERSION => {
                    expect_wire("the layer version", wire, WIRE_VARINT)?;
                    version = Some(reader.read_uint32(data)?);
                }
                _ => reader.read_unknown(data, key)?,
            }
        }

        let version = version.unwrap_or(1);
        if !(1..=3).contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(Error::MalformedWire(
                    "layer has no name (spec 4.1)".to_string(),
                ))
            }
        };
        let dimensions = dimensions.unwrap_or(2);
        match dimensions {
            2 => {}
            3 if version == 3 => {}
            _ => {
                return Err(Error::MalformedWire(format!(
                    "layer \"{name}\" declares {dimensions} dimensions, which version {version} does not support"
                )))
            }
        }

        log::trace!(
            "parsed layer {:?}: version {}, {} features, {} keys, {} values",
            name,
            version,
            features.len(),
            keys.len(),
            values.len()
        );

        Ok(Layer {
            data,
            name,
            version,
            extent: extent.unwrap_or(4096),
            dimensions,
            keys,
            values,
            features,
        })
    }

    /// The raw bytes of this layer, e.g. for
    /// [`TileBuilder::add_existing_layer`](crate::write::TileBuilder::add_existing_layer).
    pub fn data(&self) -> &'t [u8] {
        self.data
    }

    pub fn name(&self) -> &'t str {
        self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn extent(&self) -> u32 {
        self.extent
    }

    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The key table in wire order.
    pub fn key_table(&self) -> &[&'t str] {
        &self.keys
    }

    /// The value table in wire order.
    pub fn value_table<'l>(&'l self) -> impl Iterator<Item = PropertyValue<'l, 't>> {
        self.values
            .iter()
            .map(|data| PropertyValue::with_layer(data, self))
    }

    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Looks up a key by index.
    pub fn key(&self, index: IndexValue) -> Result<&'t str> {
        self.keys
            .get(index.value() as usize)
            .copied()
            .ok_or(Error::OutOfRange {
                index: index.value(),
                table: "key",
            })
    }

    /// Looks up a value by index.
    pub fn value<'l>(&'l self, index: IndexValue) -> Result<PropertyValue<'l, 't>> {
        self.values
            .get(index.value() as usize)
            .map(|data| PropertyValue::with_layer(data, self))
            .ok_or(Error::OutOfRange {
                index: index.value(),
                table: "value",
            })
    }

    /// Iterates the features in wire order. Iteration is restartable by
    /// calling this again.
    pub fn features<'l>(&'l self) -> Features<'l, 't> {
        Features {
            layer: self,
            inner: self.features.iter(),
        }
    }

    /// The first feature carrying the given id, or `None`.
    pub fn get_feature_by_id<'l>(&'l self, id: u64) -> Result<Option<Feature<'l, 't>>> {
        for feature in self.features() {
            let feature = feature?;
            if feature.id() == id {
                return Ok(Some(feature));
            }
        }
        Ok(None)
    }

    /// Calls `func` for every feature in order. Returning `false` from the
    /// callback stops the iteration early; the early stop is reported as
    /// `Ok(false)`.
    pub fn for_each_feature<'l, F>(&'l self, mut func: F) -> Result<bool>
    where
        F: FnMut(Feature<'l, 't>) -> Result<bool>,
    {
        for feature in self.features() {
            if !func(feature?)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Iterator over the features of a layer.
pub struct Features<'l, 't> {
    layer: &'l Layer<'t>,
    inner: std::slice::Iter<'l, &'t [u8]>,
}

impl<'l, 't> Iterator for Features<'l, 't> {
    type Item = Result<Feature<'l, 't>>;

    fn next(&mut self) -> Option<Result<Feature<'l, 't>>> {
        self.inner
            .next()
            .map(|data| Feature::parse(self.layer, data))
    }
}

/// A view of one feature of a layer.
pub struct Feature<'l, 't> {
    layer: &'l Layer<'t>,
    data: &'t [u8],
    id: Option<u64>,
    geom_type: GeomType,
    geometry: &'t [u8],
    knots: &'t [u8],
    tags: &'t [u8],
    num_properties: usize,
    cursor: PackedU32<'t>,
}

impl<'l, 't> Feature<'l, 't> {
    fn parse(layer: &'l Layer<'t>, data: &'t [u8]) -> Result<Feature<'l, 't>> {
        let mut reader = BytesReader::from_bytes(data);
        let mut id = None;
        let mut geom_type = GeomType::Unknown;
        let mut geometry = None;
        let mut knots = None;
        let mut tags = None;

        while !reader.is_eof() {
            let key = reader.next_tag(data)?;
            let (field, wire) = split_key(key);
            match field {
                feature_fields::ID => {
                    expect_wire("the feature id", wire, WIRE_VARINT)?;
                    id = Some(reader.read_uint64(data)?);
                }
                feature_fields::TAGS => {
                    expect_wire("the feature tags", wire, WIRE_LEN)?;
                    if tags.is_some() {
                        return Err(Error::MalformedWire(
                            "feature has more than one tags field".to_string(),
                        ));
                    }
                    tags = Some(reader.read_bytes(data)?);
                }
                feature_fields::TYPE => {
                    expect_wire("the feature type", wire, WIRE_VARINT)?;
                    let raw = reader.read_int32(data)?;
                    geom_type = GeomType::from_raw(raw).ok_or_else(|| {
                        Error::MalformedWire(format!(
                            "unknown geometry type {raw} in feature (spec 4.3.4)"
                        ))
                    })?;
                }
                feature_fields::GEOMETRY => {
                    expect_wire("the feature geometry", wire, WIRE_LEN)?;
                    if geometry.is_some() {
                        return Err(Error::MalformedWire(
                            "feature has more than one geometry field".to_string(),
                        ));
                    }
                    geometry = Some(reader.read_bytes(data)?);
                }
                feature_fields::KNOTS => {
                    expect_wire("the feature knots", wire, WIRE_LEN)?;
                    knots = Some(reader.read_bytes(data)?);
                }
                _ => reader.read_unknown(data, key)?,
            }
        }

        let geometry = geometry.ok_or_else(|| {
            Error::MalformedWire("feature has no geometry field (spec 4.2)".to_string())
        })?;

        let tags = tags.unwrap_or(&[]);
        let num_indexes = PackedU32::count(tags)?;
        if num_indexes % 2 != 0 {
            return Err(Error::MalformedWire(
                "unpaired property key/value indexes (spec 4.4)".to_string(),
            ));
        }

        Ok(Feature {
            layer,
            data,
            id,
            geom_type,
            geometry,
            knots: knots.unwrap_or(&[]),
            tags,
            num_properties: num_indexes / 2,
            cursor: PackedU32::new(tags),
        })
    }

    /// The raw bytes of this feature.
    pub fn data(&self) -> &'t [u8] {
        self.data
    }

    /// The feature id; 0 if none was encoded.
    pub fn id(&self) -> u64 {
        self.id.unwrap_or(0)
    }

    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    pub fn geometry_type(&self) -> GeomType {
        self.geom_type
    }

    /// The geometry of this feature, ready for the decoder functions in
    /// [`crate::geometry`].
    pub fn geometry(&self) -> Geometry<'t> {
        Geometry::new(
            self.geometry,
            self.knots,
            self.geom_type,
            self.layer.dimensions(),
        )
    }

    pub fn num_properties(&self) -> usize {
        self.num_properties
    }

    /// `true` if the feature has no properties.
    pub fn is_empty(&self) -> bool {
        self.num_properties == 0
    }

    /// Advances the property cursor and returns the next key/value pair,
    /// resolved against the layer tables.
    pub fn next_property(&mut self) -> Result<Option<Property<'l, 't>>> {
        match self.next_property_indexes()? {
            None => Ok(None),
            Some(pair) => {
                let key = self.layer.key(pair.key())?;
                let value = self.layer.value(pair.value())?;
                Ok(Some(Property { key, value }))
            }
        }
    }

    /// Advances the property cursor and returns the next raw index pair.
    pub fn next_property_indexes(&mut self) -> Result<Option<IndexValuePair>> {
        let key_index = match self.cursor.next().transpose()? {
            None => return Ok(None),
            Some(ki) => ki,
        };
        let value_index = self.cursor.next().transpose()?.ok_or_else(|| {
            Error::MalformedWire("unpaired property key/value indexes (spec 4.4)".to_string())
        })?;
        Ok(Some(IndexValuePair::new(
            key_index.into(),
            value_index.into(),
        )))
    }

    /// Rewinds the property cursor to the first property.
    pub fn reset_properties(&mut self) {
        self.cursor = PackedU32::new(self.tags);
    }

    /// Calls `func` for every property in order, without touching the
    /// cursor. Returning `false` from the callback stops the iteration
    /// early; the early stop is reported as `Ok(false)`.
    pub fn for_each_property<F>(&self, mut func: F) -> Result<bool>
    where
        F: FnMut(&'t str, PropertyValue<'l, 't>) -> Result<bool>,
    {
        let mut it = PackedU32::new(self.tags);
        while let Some(key_index) = it.next().transpose()? {
            let value_index = it.next().transpose()?.ok_or_else(|| {
                Error::MalformedWire(
                    "unpaired property key/value indexes (spec 4.4)".to_string(),
                )
            })?;
            let key = self.layer.key(key_index.into())?;
            let value = self.layer.value(value_index.into())?;
            if !func(key, value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// One resolved key/value pair of a feature.
pub struct Property<'l, 't> {
    key: &'t str,
    value: PropertyValue<'l, 't>,
}

impl<'l, 't> Property<'l, 't> {
    pub fn key(&self) -> &'t str {
        self.key
    }

    pub fn value(&self) -> PropertyValue<'l, 't> {
        self.value
    }
}
