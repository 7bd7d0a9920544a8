//! Writing side: tile, layer and feature builders.
//!
//! The builders mirror the wire layout: a feature builder accumulates its
//! command and tag streams privately and only makes them visible in the
//! layer on `commit()`, so a rollback never leaves partial bytes behind.
//! `commit()` and `rollback()` consume the builder; sequences like
//! rollback-after-commit do not type-check.

use std::collections::HashMap;

use crate::common::{GeomType, IndexValue, Point, Value};
use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::read::{Feature, Layer};
use crate::wire::{
    command_integer, emit, emit_len_field, emit_varint, encode_zigzag32, feature_fields,
    layer_fields, make_key, tile_fields, COMMAND_CLOSE_PATH, COMMAND_LINE_TO, COMMAND_MOVE_TO,
    MAX_COMMAND_COUNT, WIRE_FIXED32, WIRE_FIXED64, WIRE_LEN, WIRE_VARINT,
};

/// Encodes a [`Value`] as a vector tile `Value` message.
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    match value {
        Value::String(v) => emit(&mut buf, |w| {
            w.write_with_tag(make_key(1, WIRE_LEN), |w| w.write_string(v))
        }),
        Value::Float(v) => emit(&mut buf, |w| {
            w.write_with_tag(make_key(2, WIRE_FIXED32), |w| w.write_float(*v))
        }),
        Value::Double(v) => emit(&mut buf, |w| {
            w.write_with_tag(make_key(3, WIRE_FIXED64), |w| w.write_double(*v))
        }),
        Value::Int(v) => emit(&mut buf, |w| {
            w.write_with_tag(make_key(4, WIRE_VARINT), |w| w.write_int64(*v))
        }),
        Value::UInt(v) => emit(&mut buf, |w| {
            w.write_with_tag(make_key(5, WIRE_VARINT), |w| w.write_uint64(*v))
        }),
        Value::SInt(v) => emit(&mut buf, |w| {
            w.write_with_tag(make_key(6, WIRE_VARINT), |w| w.write_sint64(*v))
        }),
        Value::Bool(v) => emit(&mut buf, |w| {
            w.write_with_tag(make_key(7, WIRE_VARINT), |w| w.write_bool(*v))
        }),
        Value::Map(entries) => {
            let mut packed = Vec::with_capacity(entries.len() * 2);
            for (key, value) in entries {
                emit_varint(&mut packed, u64::from(key.value()));
                emit_varint(&mut packed, u64::from(value.value()));
            }
            emit_len_field(&mut buf, 8, &packed);
        }
        Value::List(entries) => {
            let mut packed = Vec::with_capacity(entries.len());
            for value in entries {
                emit_varint(&mut packed, u64::from(value.value()));
            }
            emit_len_field(&mut buf, 9, &packed);
        }
    }
    buf
}

/// Builds one layer of a vector tile: metadata, the interned key and value
/// tables, and an append-only region of committed features.
pub struct LayerBuilder {
    name: String,
    version: u32,
    extent: u32,
    dimensions: u32,
    keys: Vec<String>,
    key_index: HashMap<String, u32>,
    values: Vec<Vec<u8>>,
    value_index: HashMap<Vec<u8>, u32>,
    features: Vec<u8>,
    num_features: u32,
}

impl LayerBuilder {
    /// A new layer with version 2, extent 4096 and two dimensions.
    pub fn new(name: impl Into<String>) -> LayerBuilder {
        LayerBuilder {
            name: name.into(),
            version: 2,
            extent: 4096,
            dimensions: 2,
            keys: Vec::new(),
            key_index: HashMap::new(),
            values: Vec::new(),
            value_index: HashMap::new(),
            features: Vec::new(),
            num_features: 0,
        }
    }

    /// A new layer with explicit version, extent and dimensions. Three
    /// dimensions require version 3.
    pub fn with_params(
        name: impl Into<String>,
        version: u32,
        extent: u32,
        dimensions: u32,
    ) -> Result<LayerBuilder> {
        if !(1..=3).contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }
        match dimensions {
            2 => {}
            3 if version == 3 => {}
            _ => {
                return Err(Error::Format(format!(
                    "{dimensions} dimensions are not supported with layer version {version}"
                )))
            }
        }
        let mut layer = LayerBuilder::new(name);
        layer.version = version;
        layer.extent = extent;
        layer.dimensions = dimensions;
        Ok(layer)
    }

    /// A new empty layer with the name, version, extent and dimensions of an
    /// existing layer.
    pub fn from_layer(layer: &Layer<'_>) -> LayerBuilder {
        let mut builder = LayerBuilder::new(layer.name());
        builder.version = layer.version();
        builder.extent = layer.extent();
        builder.dimensions = layer.dimensions();
        builder
    }

    pub fn name(&self) -> &str {
        &self.name
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

    pub fn num_features(&self) -> u32 {
        self.num_features
    }

    /// Interns a key, returning the existing index if the key was added
    /// before.
    pub fn add_key(&mut self, key: &str) -> IndexValue {
        if let Some(&index) = self.key_index.get(key) {
            return IndexValue::new(index);
        }
        self.add_key_without_dup_check(key)
    }

    /// Appends a key unconditionally. Meant for batch-ingesting a known
    /// unique vocabulary without the lookup.
    pub fn add_key_without_dup_check(&mut self, key: &str) -> IndexValue {
        let index = self.keys.len() as u32;
        self.keys.push(key.to_string());
        self.key_index.entry(key.to_string()).or_insert(index);
        IndexValue::new(index)
    }

    /// Interns a value, returning the existing index if an equally encoded
    /// value was added before.
    pub fn add_value(&mut self, value: &Value) -> IndexValue {
        self.add_value_data(&encode_value(value))
    }

    /// Appends a value unconditionally.
    pub fn add_value_without_dup_check(&mut self, value: &Value) -> IndexValue {
        self.add_value_data_without_dup_check(&encode_value(value))
    }

    /// Interns an already encoded value message, e.g. one copied from
    /// another layer via [`PropertyValue::data`](crate::value::PropertyValue::data).
    pub fn add_value_data(&mut self, data: &[u8]) -> IndexValue {
        if let Some(&index) = self.value_index.get(data) {
            return IndexValue::new(index);
        }
        self.add_value_data_without_dup_check(data)
    }

    /// Appends an already encoded value message unconditionally.
    pub fn add_value_data_without_dup_check(&mut self, data: &[u8]) -> IndexValue {
        let index = self.values.len() as u32;
        self.values.push(data.to_vec());
        self.value_index.entry(data.to_vec()).or_insert(index);
        IndexValue::new(index)
    }

    /// Copies a feature from another layer: geometry and knots verbatim,
    /// properties re-interned into this layer's tables.
    pub fn add_feature(&mut self, feature: &Feature<'_, '_>) -> Result<()> {
        let geometry = feature.geometry();
        let mut builder = GeometryFeatureBuilder::new(self, &geometry);
        if feature.has_id() {
            builder.set_id(feature.id());
        }
        feature.for_each_property(|key, value| {
            builder.add_property_data(key, value.data());
            Ok(true)
        })?;
        builder.commit()
    }

    fn append_feature(&mut self, body: &[u8]) {
        emit_len_field(&mut self.features, layer_fields::FEATURES, body);
        self.num_features += 1;
    }

    fn estimated_size(&self) -> usize {
        let keys: usize = self.keys.iter().map(|k| k.len() + 2).sum();
        let values: usize = self.values.iter().map(|v| v.len() + 2).sum();
        self.name.len() + self.features.len() + keys + values + 32
    }

    fn build(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.estimated_size());
        emit(&mut buf, |w| {
            w.write_with_tag(make_key(layer_fields::VERSION, WIRE_VARINT), |w| {
                w.write_uint32(self.version)
            })
        });
        emit(&mut buf, |w| {
            w.write_with_tag(make_key(layer_fields::NAME, WIRE_LEN), |w| {
                w.write_string(&self.name)
            })
        });
        emit(&mut buf, |w| {
            w.write_with_tag(make_key(layer_fields::EXTENT, WIRE_VARINT), |w| {
                w.write_uint32(self.extent)
            })
        });
        if self.dimensions != 2 {
            emit(&mut buf, |w| {
                w.write_with_tag(make_key(layer_fields::DIMENSIONS, WIRE_VARINT), |w| {
                    w.write_uint32(self.dimensions)
                })
            });
        }
        buf.extend_from_slice(&self.features);
        for key in &self.keys {
            emit(&mut buf, |w| {
                w.write_with_tag(make_key(layer_fields::KEYS, WIRE_LEN), |w| {
                    w.write_string(key)
                })
            });
        }
        for value in &self.values {
            emit_len_field(&mut buf, layer_fields::VALUES, value);
        }
        buf
    }
}

enum LayerSlot<'a> {
    New(LayerBuilder),
    /// Raw bytes of an already encoded layer, copied verbatim at serialize
    /// time.
    Existing(&'a [u8]),
}

/// Builds a vector tile from new and existing layers.
#[derive(Default)]
pub struct TileBuilder<'a> {
    layers: Vec<LayerSlot<'a>>,
}

impl<'a> TileBuilder<'a> {
    pub fn new() -> TileBuilder<'a> {
        TileBuilder { layers: Vec::new() }
    }

    pub fn add_layer(&mut self, layer: LayerBuilder) {
        self.layers.push(LayerSlot::New(layer));
    }

    /// Adds an existing layer; its bytes are copied over unchanged when the
    /// tile is serialized and must stay alive until then.
    pub fn add_existing_layer(&mut self, layer: &Layer<'a>) {
        self.add_existing_layer_data(layer.data());
    }

    /// Like [`add_existing_layer`](TileBuilder::add_existing_layer), from
    /// raw encoded layer bytes.
    pub fn add_existing_layer_data(&mut self, data: &'a [u8]) {
        self.layers.push(LayerSlot::Existing(data));
    }

    /// Serializes the tile, appending to `buffer`.
    pub fn serialize_into(&self, buffer: &mut Vec<u8>) {
        let estimated: usize = self
            .layers
            .iter()
            .map(|slot| match slot {
                LayerSlot::New(layer) => layer.estimated_size() + 4,
                LayerSlot::Existing(data) => data.len() + 4,
            })
            .sum();
        buffer.reserve(estimated);

        for slot in &self.layers {
            match slot {
                LayerSlot::New(layer) => {
                    emit_len_field(buffer, tile_fields::LAYERS, &layer.build())
                }
                LayerSlot::Existing(data) => emit_len_field(buffer, tile_fields::LAYERS, data),
            }
        }

        log::debug!(
            "serialized tile with {} layers into {} bytes",
            self.layers.len(),
            buffer.len()
        );
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.serialize_into(&mut buffer);
        buffer
    }
}

/// Shared feature assembly: accumulates the command stream and the tag
/// index stream and appends the finished feature to the layer exactly once.
struct FeatureCore<'l> {
    layer: &'l mut LayerBuilder,
    id: Option<u64>,
    geom_type: GeomType,
    geometry: Vec<u8>,
    knots: Vec<u8>,
    tags: Vec<u32>,
    cursor: Point,
    num_points: u32,
    has_geometry: bool,
    finished: bool,
}

impl<'l> FeatureCore<'l> {
    fn new(layer: &'l mut LayerBuilder, geom_type: GeomType) -> FeatureCore<'l> {
        FeatureCore {
            layer,
            id: None,
            geom_type,
            geometry: Vec::new(),
            knots: Vec::new(),
            tags: Vec::new(),
            cursor: Point::default(),
            num_points: 0,
            has_geometry: false,
            finished: false,
        }
    }

    fn set_id(&mut self, id: u64) {
        assert!(
            self.tags.is_empty(),
            "set_id() must be called before adding properties"
        );
        self.id = Some(id);
    }

    fn assert_geometry_open(&self) {
        assert!(
            self.tags.is_empty(),
            "geometry must be complete before properties are added"
        );
    }

    fn push_command(&mut self, id: u32, count: u32) {
        emit_varint(&mut self.geometry, u64::from(command_integer(id, count)));
    }

    fn push_point(&mut self, p: Point) {
        emit_varint(
            &mut self.geometry,
            u64::from(encode_zigzag32(p.x.wrapping_sub(self.cursor.x))),
        );
        emit_varint(
            &mut self.geometry,
            u64::from(encode_zigzag32(p.y.wrapping_sub(self.cursor.y))),
        );
        if self.layer.dimensions() == 3 {
            emit_varint(
                &mut self.geometry,
                u64::from(encode_zigzag32(p.z.wrapping_sub(self.cursor.z))),
            );
        }
        self.cursor = p;
    }

    fn add_property(&mut self, key: &str, value: &Value) {
        let key_index = self.layer.add_key(key);
        let value_index = self.layer.add_value(value);
        self.add_property_indexes(key_index, value_index);
    }

    fn add_property_data(&mut self, key: &str, data: &[u8]) {
        let key_index = self.layer.add_key(key);
        let value_index = self.layer.add_value_data(data);
        self.add_property_indexes(key_index, value_index);
    }

    fn add_property_indexes(&mut self, key: IndexValue, value: IndexValue) {
        assert_eq!(self.num_points, 0, "not enough calls to set_point()");
        self.tags.push(key.value());
        self.tags.push(value.value());
    }

    fn do_commit(&mut self) -> Result<()> {
        self.finished = true;
        if !self.has_geometry {
            return Err(Error::Geometry(
                "cannot commit a feature without geometry".to_string(),
            ));
        }
        if self.num_points > 0 {
            return Err(Error::Geometry(
                "geometry has fewer points than expected".to_string(),
            ));
        }
        self.write_to_layer();
        Ok(())
    }

    fn do_rollback(&mut self) {
        self.finished = true;
    }

    fn write_to_layer(&mut self) {
        let mut body =
            Vec::with_capacity(self.geometry.len() + self.knots.len() + self.tags.len() * 2 + 16);
        if let Some(id) = self.id {
            emit(&mut body, |w| {
                w.write_with_tag(make_key(feature_fields::ID, WIRE_VARINT), |w| {
                    w.write_uint64(id)
                })
            });
        }
        emit(&mut body, |w| {
            w.write_with_tag(make_key(feature_fields::TYPE, WIRE_VARINT), |w| {
                w.write_int32(self.geom_type as i32)
            })
        });
        emit_len_field(&mut body, feature_fields::GEOMETRY, &self.geometry);
        if !self.knots.is_empty() {
            emit_len_field(&mut body, feature_fields::KNOTS, &self.knots);
        }
        if !self.tags.is_empty() {
            let mut packed = Vec::with_capacity(self.tags.len() * 2);
            for tag in &self.tags {
                emit_varint(&mut packed, u64::from(*tag));
            }
            emit_len_field(&mut body, feature_fields::TAGS, &packed);
        }
        self.layer.append_feature(&body);
    }
}

impl Drop for FeatureCore<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if self.has_geometry && self.num_points == 0 {
            // complete geometry, so the feature commits implicitly
            self.write_to_layer();
        } else if !std::thread::panicking() {
            panic!("feature builder dropped without commit() or rollback()");
        }
    }
}

/// Builds a point or multipoint feature.
pub struct PointFeatureBuilder<'l> {
    core: FeatureCore<'l>,
}

impl<'l> PointFeatureBuilder<'l> {
    pub fn new(layer: &'l mut LayerBuilder) -> PointFeatureBuilder<'l> {
        PointFeatureBuilder {
            core: FeatureCore::new(layer, GeomType::Point),
        }
    }

    /// Sets the feature id. Optional; features without an id are encoded
    /// without the field.
    pub fn set_id(&mut self, id: u64) {
        self.core.set_id(id);
    }

    /// Adds a single point geometry.
    pub fn add_point(&mut self, p: impl Into<Point>) -> Result<()> {
        self.add_points(1)?;
        self.set_point(p)
    }

    /// Declares a multipoint geometry with `count` points; every point has
    /// to be supplied with [`set_point`](PointFeatureBuilder::set_point).
    pub fn add_points(&mut self, count: u32) -> Result<()> {
        self.core.assert_geometry_open();
        assert!(!self.core.has_geometry, "points can only be added once");
        if count == 0 {
            return Err(Error::Geometry(
                "a point geometry needs at least one point".to_string(),
            ));
        }
        if count > MAX_COMMAND_COUNT {
            return Err(Error::Format(
                "a multipoint can not contain more than 2^29 points".to_string(),
            ));
        }
        self.core.has_geometry = true;
        self.core.num_points = count;
        self.core.push_command(COMMAND_MOVE_TO, count);
        Ok(())
    }

    pub fn set_point(&mut self, p: impl Into<Point>) -> Result<()> {
        self.core.assert_geometry_open();
        assert!(self.core.num_points > 0, "too many calls to set_point()");
        self.core.num_points -= 1;
        let p = p.into();
        self.core.push_point(p);
        Ok(())
    }

    pub fn add_points_from<P: Into<Point> + Copy>(&mut self, points: &[P]) -> Result<()> {
        if points.len() > MAX_COMMAND_COUNT as usize {
            return Err(Error::Format(
                "a multipoint can not contain more than 2^29 points".to_string(),
            ));
        }
        self.add_points(points.len() as u32)?;
        for p in points {
            self.set_point(*p)?;
        }
        Ok(())
    }

    /// Adds a property, interning key and value in the layer tables.
    pub fn add_property(&mut self, key: &str, value: &Value) {
        self.core.add_property(key, value);
    }

    /// Adds a property from already interned indexes.
    pub fn add_property_indexes(&mut self, key: IndexValue, value: IndexValue) {
        self.core.add_property_indexes(key, value);
    }

    /// Appends the feature to the layer.
    pub fn commit(mut self) -> Result<()> {
        self.core.do_commit()
    }

    /// Discards the feature; the layer is unchanged.
    pub fn rollback(mut self) {
        self.core.do_rollback()
    }
}

/// Builds a linestring or multilinestring feature.
pub struct LinestringFeatureBuilder<'l> {
    core: FeatureCore<'l>,
    start_line: bool,
}

impl<'l> LinestringFeatureBuilder<'l> {
    pub fn new(layer: &'l mut LayerBuilder) -> LinestringFeatureBuilder<'l> {
        LinestringFeatureBuilder {
            core: FeatureCore::new(layer, GeomType::Linestring),
            start_line: false,
        }
    }

    pub fn set_id(&mut self, id: u64) {
        self.core.set_id(id);
    }

    /// Declares a linestring with `count` points. May be called again for
    /// further strands once the previous strand is complete.
    pub fn add_linestring(&mut self, count: u32) -> Result<()> {
        self.core.assert_geometry_open();
        assert_eq!(
            self.core.num_points, 0,
            "linestring has fewer points than expected"
        );
        if count < 2 {
            return Err(Error::Geometry(
                "a linestring needs at least two points".to_string(),
            ));
        }
        if count > MAX_COMMAND_COUNT {
            return Err(Error::Format(
                "a linestring can not contain more than 2^29 points".to_string(),
            ));
        }
        self.core.has_geometry = true;
        self.core.num_points = count;
        self.start_line = true;
        Ok(())
    }

    /// Supplies the next point of the current strand. Zero-length segments
    /// are rejected.
    pub fn set_point(&mut self, p: impl Into<Point>) -> Result<()> {
        self.core.assert_geometry_open();
        assert!(self.core.num_points > 0, "too many calls to set_point()");
        let p = p.into();
        if self.start_line {
            self.core.num_points -= 1;
            self.core.push_command(COMMAND_MOVE_TO, 1);
            self.core.push_point(p);
            self.core.push_command(COMMAND_LINE_TO, self.core.num_points);
            self.start_line = false;
        } else {
            if p == self.core.cursor {
                return Err(Error::Geometry(
                    "zero-length segment in linestring".to_string(),
                ));
            }
            self.core.num_points -= 1;
            self.core.push_point(p);
        }
        Ok(())
    }

    pub fn add_linestring_from<P: Into<Point> + Copy>(&mut self, points: &[P]) -> Result<()> {
        if points.len() > MAX_COMMAND_COUNT as usize {
            return Err(Error::Format(
                "a linestring can not contain more than 2^29 points".to_string(),
            ));
        }
        self.add_linestring(points.len() as u32)?;
        for p in points {
            self.set_point(*p)?;
        }
        Ok(())
    }

    pub fn add_property(&mut self, key: &str, value: &Value) {
        self.core.add_property(key, value);
    }

    pub fn add_property_indexes(&mut self, key: IndexValue, value: IndexValue) {
        self.core.add_property_indexes(key, value);
    }

    pub fn commit(mut self) -> Result<()> {
        self.core.do_commit()
    }

    pub fn rollback(mut self) {
        self.core.do_rollback()
    }
}

/// Builds a polygon or multipolygon feature, ring by ring.
pub struct PolygonFeatureBuilder<'l> {
    core: FeatureCore<'l>,
    first_point: Point,
    start_ring: bool,
}

impl<'l> PolygonFeatureBuilder<'l> {
    pub fn new(layer: &'l mut LayerBuilder) -> PolygonFeatureBuilder<'l> {
        PolygonFeatureBuilder {
            core: FeatureCore::new(layer, GeomType::Polygon),
            first_point: Point::default(),
            start_ring: false,
        }
    }

    pub fn set_id(&mut self, id: u64) {
        self.core.set_id(id);
    }

    /// Declares a ring with `count` points, the last one equal to the
    /// first. Either supply all `count` points with
    /// [`set_point`](PolygonFeatureBuilder::set_point), or `count - 1`
    /// points followed by [`close_ring`](PolygonFeatureBuilder::close_ring).
    pub fn add_ring(&mut self, count: u32) -> Result<()> {
        self.core.assert_geometry_open();
        assert_eq!(self.core.num_points, 0, "ring has fewer points than expected");
        if count < 4 {
            return Err(Error::Geometry(
                "a ring needs at least four points".to_string(),
            ));
        }
        if count > MAX_COMMAND_COUNT {
            return Err(Error::Format(
                "a ring can not contain more than 2^29 points".to_string(),
            ));
        }
        self.core.has_geometry = true;
        self.core.num_points = count;
        self.start_ring = true;
        Ok(())
    }

    /// Supplies the next point of the current ring. The final point must
    /// equal the ring's first point; zero-length segments are rejected.
    pub fn set_point(&mut self, p: impl Into<Point>) -> Result<()> {
        self.core.assert_geometry_open();
        assert!(self.core.num_points > 0, "too many calls to set_point()");
        let p = p.into();
        if self.start_ring {
            self.first_point = p;
            self.core.num_points -= 1;
            self.core.push_command(COMMAND_MOVE_TO, 1);
            self.core.push_point(p);
            self.core
                .push_command(COMMAND_LINE_TO, self.core.num_points - 1);
            self.start_ring = false;
        } else if self.core.num_points == 1 {
            if p != self.first_point {
                return Err(Error::Geometry(
                    "a ring's last point must equal its first point".to_string(),
                ));
            }
            self.core.num_points -= 1;
            // spec 4.3.3.3 "A ClosePath command MUST have a command count of 1"
            self.core.push_command(COMMAND_CLOSE_PATH, 1);
        } else {
            if p == self.core.cursor {
                return Err(Error::Geometry("zero-length segment in ring".to_string()));
            }
            self.core.num_points -= 1;
            self.core.push_point(p);
        }
        Ok(())
    }

    /// Closes the current ring in place of its final point.
    pub fn close_ring(&mut self) {
        self.core.assert_geometry_open();
        assert_eq!(
            self.core.num_points, 1,
            "close_ring() replaces exactly the final point of a ring"
        );
        self.core.push_command(COMMAND_CLOSE_PATH, 1);
        self.core.num_points = 0;
    }

    /// Adds a complete ring, the last point equal to the first.
    pub fn add_ring_from<P: Into<Point> + Copy>(&mut self, points: &[P]) -> Result<()> {
        if points.len() > MAX_COMMAND_COUNT as usize {
            return Err(Error::Format(
                "a ring can not contain more than 2^29 points".to_string(),
            ));
        }
        self.add_ring(points.len() as u32)?;
        for p in points {
            self.set_point(*p)?;
        }
        Ok(())
    }

    pub fn add_property(&mut self, key: &str, value: &Value) {
        self.core.add_property(key, value);
    }

    pub fn add_property_indexes(&mut self, key: IndexValue, value: IndexValue) {
        self.core.add_property_indexes(key, value);
    }

    pub fn commit(mut self) -> Result<()> {
        self.core.do_commit()
    }

    pub fn rollback(mut self) {
        self.core.do_rollback()
    }
}

/// Builds a feature from an already encoded geometry, e.g. one taken from
/// a parsed feature. Properties may be added immediately because the
/// geometry is supplied atomically.
pub struct GeometryFeatureBuilder<'l> {
    core: FeatureCore<'l>,
}

impl<'l> GeometryFeatureBuilder<'l> {
    pub fn new(layer: &'l mut LayerBuilder, geometry: &Geometry<'_>) -> GeometryFeatureBuilder<'l> {
        let mut core = FeatureCore::new(layer, geometry.geom_type());
        core.geometry = geometry.data().to_vec();
        core.knots = geometry.knots().to_vec();
        core.has_geometry = true;
        GeometryFeatureBuilder { core }
    }

    pub fn set_id(&mut self, id: u64) {
        self.core.set_id(id);
    }

    pub fn add_property(&mut self, key: &str, value: &Value) {
        self.core.add_property(key, value);
    }

    /// Adds a property whose value is an already encoded value message.
    pub fn add_property_data(&mut self, key: &str, data: &[u8]) {
        self.core.add_property_data(key, data);
    }

    pub fn add_property_indexes(&mut self, key: IndexValue, value: IndexValue) {
        self.core.add_property_indexes(key, value);
    }

    pub fn commit(mut self) -> Result<()> {
        self.core.do_commit()
    }

    pub fn rollback(mut self) {
        self.core.do_rollback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::Tile;

    #[test]
    fn key_interning_is_idempotent() {
        let mut layer = LayerBuilder::new("test");

        let ki1 = layer.add_key_without_dup_check("key1");
        let ki2 = layer.add_key("key2");
        let ki3 = layer.add_key("key1");

        assert_ne!(ki1, ki2);
        assert_eq!(ki1, ki3);
    }

    #[test]
    fn value_interning_is_idempotent() {
        let mut layer = LayerBuilder::new("test");

        let vi1 = layer.add_value_without_dup_check(&Value::String("value1".to_string()));
        let vi2 = layer.add_value_without_dup_check(&Value::String("value2".to_string()));
        let vi3 = layer.add_value(&Value::String("value1".to_string()));
        let vi4 = layer.add_value(&Value::Int(19));
        let vi5 = layer.add_value(&Value::Double(19.0));
        let vi6 = layer.add_value(&Value::Int(22));
        let vi7 = layer.add_value(&Value::Int(19));

        assert_ne!(vi1, vi2);
        assert_eq!(vi1, vi3);
        assert_ne!(vi1, vi4);
        assert_ne!(vi1, vi5);
        assert_ne!(vi1, vi6);
        assert_ne!(vi4, vi5);
        assert_ne!(vi4, vi6);
        assert_eq!(vi4, vi7);
    }

    #[test]
    fn layer_version_is_validated() {
        assert!(matches!(
            LayerBuilder::with_params("test", 0, 4096, 2),
            Err(Error::UnsupportedVersion(0))
        ));
        assert!(matches!(
            LayerBuilder::with_params("test", 4, 4096, 2),
            Err(Error::UnsupportedVersion(4))
        ));
        // three dimensions need version 3
        assert!(matches!(
            LayerBuilder::with_params("test", 2, 4096, 3),
            Err(Error::Format(_))
        ));
        assert!(LayerBuilder::with_params("test", 3, 4096, 3).is_ok());
    }

    #[test]
    fn commit_without_geometry_fails() {
        let mut layer = LayerBuilder::new("test");

        let builder = PointFeatureBuilder::new(&mut layer);
        assert!(matches!(builder.commit(), Err(Error::Geometry(_))));

        let mut builder = PointFeatureBuilder::new(&mut layer);
        builder.set_id(2);
        assert!(matches!(builder.commit(), Err(Error::Geometry(_))));

        assert_eq!(layer.num_features(), 0);
    }

    #[test]
    fn commit_with_missing_points_fails() {
        let mut layer = LayerBuilder::new("test");
        let mut builder = LinestringFeatureBuilder::new(&mut layer);
        builder.add_linestring(3).unwrap();
        builder.set_point((1, 1)).unwrap();
        builder.set_point((2, 2)).unwrap();
        assert!(matches!(builder.commit(), Err(Error::Geometry(_))));
        assert_eq!(layer.num_features(), 0);
    }

    #[test]
    fn commit_and_implicit_commit() {
        let mut layer = LayerBuilder::new("test");

        {
            let mut builder = PointFeatureBuilder::new(&mut layer);
            builder.set_id(1);
            builder.add_point((10, 10)).unwrap();
            builder.commit().unwrap();
        }

        {
            let mut builder = PointFeatureBuilder::new(&mut layer);
            builder.set_id(2);
            builder.add_point((10, 10)).unwrap();
            builder.add_property("foo", &Value::String("bar".to_string()));
            builder.commit().unwrap();
        }

        {
            // implicit commit on drop after a complete geometry
            let mut builder = PointFeatureBuilder::new(&mut layer);
            builder.set_id(3);
            builder.add_point((10, 10)).unwrap();
        }

        let mut tile = TileBuilder::new();
        tile.add_layer(layer);
        let data = tile.serialize();

        let tile = Tile::new(&data);
        let layer = tile.get_layer(0).unwrap().unwrap();
        assert_eq!(layer.num_features(), 3);
        let ids: Vec<u64> = layer
            .features()
            .map(|f| f.unwrap().id())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn rollback_discards_the_feature() {
        let mut layer = LayerBuilder::new("test");

        {
            let mut builder = PointFeatureBuilder::new(&mut layer);
            builder.set_id(1);
            builder.add_point((10, 10)).unwrap();
            builder.commit().unwrap();
        }

        {
            // rollback before geometry
            let mut builder = PointFeatureBuilder::new(&mut layer);
            builder.set_id(2);
            builder.rollback();
        }

        {
            // rollback after geometry
            let mut builder = PointFeatureBuilder::new(&mut layer);
            builder.set_id(2);
            builder.add_point((20, 20)).unwrap();
            builder.rollback();
        }

        {
            // rollback after properties
            let mut builder = PointFeatureBuilder::new(&mut layer);
            builder.set_id(2);
            builder.add_point((20, 20)).unwrap();
            builder.add_property("foo", &Value::String("bar".to_string()));
            builder.rollback();
        }

        {
            let mut builder = PointFeatureBuilder::new(&mut layer);
            builder.set_id(3);
            builder.add_point((30, 30)).unwrap();
        }

        let mut tile = TileBuilder::new();
        tile.add_layer(layer);
        let data = tile.serialize();

        let tile = Tile::new(&data);
        let layer = tile.get_layer(0).unwrap().unwrap();
        let ids: Vec<u64> = layer.features().map(|f| f.unwrap().id()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    #[should_panic(expected = "dropped without commit")]
    fn dropping_without_geometry_panics() {
        let mut layer = LayerBuilder::new("test");
        let mut builder = PointFeatureBuilder::new(&mut layer);
        builder.set_id(2);
        drop(builder);
    }

    #[test]
    fn zero_length_segments_are_rejected() {
        let mut layer = LayerBuilder::new("test");

        let mut builder = LinestringFeatureBuilder::new(&mut layer);
        builder.add_linestring(3).unwrap();
        builder.set_point((1, 1)).unwrap();
        assert!(matches!(
            builder.set_point((1, 1)),
            Err(Error::Geometry(_))
        ));
        builder.rollback();

        let mut builder = PolygonFeatureBuilder::new(&mut layer);
        builder.add_ring(4).unwrap();
        builder.set_point((0, 0)).unwrap();
        builder.set_point((1, 1)).unwrap();
        assert!(matches!(
            builder.set_point((1, 1)),
            Err(Error::Geometry(_))
        ));
        builder.rollback();
    }

    #[test]
    fn short_geometries_are_rejected() {
        let mut layer = LayerBuilder::new("test");

        let mut builder = LinestringFeatureBuilder::new(&mut layer);
        assert!(matches!(
            builder.add_linestring(1),
            Err(Error::Geometry(_))
        ));
        builder.rollback();

        let mut builder = PolygonFeatureBuilder::new(&mut layer);
        assert!(matches!(builder.add_ring(3), Err(Error::Geometry(_))));
        builder.rollback();
    }

    #[test]
    fn ring_must_close_on_its_first_point() {
        let mut layer = LayerBuilder::new("test");
        let mut builder = PolygonFeatureBuilder::new(&mut layer);
        builder.add_ring(4).unwrap();
        builder.set_point((0, 0)).unwrap();
        builder.set_point((4, 0)).unwrap();
        builder.set_point((4, 4)).unwrap();
        assert!(matches!(
            builder.set_point((1, 1)),
            Err(Error::Geometry(_))
        ));
        builder.rollback();
    }
}
