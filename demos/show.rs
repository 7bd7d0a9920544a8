//! show - dump the contents of a vector tile.
//!
//! Usage: show [-l] [-t] TILE-FILE [LAYER-NUM|LAYER-NAME]
//!
//!   -l   only print a layer overview with feature counts
//!   -t   also print the key/value tables

use std::env;
use std::fs;
use std::process::ExitCode;

use vtile::common::{IndexValue, Point, RingType};
use vtile::geometry::{decode_geometry, GeomHandler};
use vtile::read::{Layer, Tile};
use vtile::value::{apply_visitor, PropertyList, PropertyMap, PropertyValue, Visitor};

#[derive(Default)]
struct PrintGeometry {
    line: String,
}

impl PrintGeometry {
    fn flush(&mut self, suffix: &str) {
        if self.line.ends_with(',') {
            self.line.pop();
        }
        println!("{}){}", self.line, suffix);
        self.line.clear();
    }

    fn push_point(&mut self, p: Point) {
        self.line.push_str(&format!("{} {},", p.x, p.y));
    }
}

impl GeomHandler for PrintGeometry {
    type Output = ();

    fn points_point(&mut self, p: Point) {
        println!("      POINT({},{})", p.x, p.y);
    }

    fn linestring_begin(&mut self, count: u32) {
        self.line = format!("      LINESTRING[count={count}](");
    }

    fn linestring_point(&mut self, p: Point) {
        self.push_point(p);
    }

    fn linestring_end(&mut self) {
        self.flush("");
    }

    fn ring_begin(&mut self, count: u32) {
        self.line = format!("      RING[count={count}](");
    }

    fn ring_point(&mut self, p: Point) {
        self.push_point(p);
    }

    fn ring_end(&mut self, ring_type: RingType) {
        let label = match ring_type {
            RingType::Outer => "[OUTER]",
            RingType::Inner => "[INNER]",
            RingType::Invalid => "[INVALID]",
        };
        self.flush(label);
    }

    fn controlpoints_begin(&mut self, count: u32) {
        self.line = format!("      SPLINE[count={count}](");
    }

    fn controlpoints_point(&mut self, p: Point) {
        self.push_point(p);
    }

    fn controlpoints_end(&mut self) {
        self.flush("");
    }

    fn knots_begin(&mut self, count: u32) {
        self.line = format!("      knots[count={count}](");
    }

    fn knots_value(&mut self, value: f64) {
        self.line.push_str(&format!("{value},"));
    }

    fn knots_end(&mut self) {
        self.flush("");
    }

    fn finish(self) {}
}

struct PrintValue;

impl Visitor for PrintValue {
    type Output = String;

    fn visit_string(&mut self, value: &str) -> String {
        format!("{value:?}")
    }

    fn visit_float(&mut self, value: f32) -> String {
        value.to_string()
    }

    fn visit_double(&mut self, value: f64) -> String {
        value.to_string()
    }

    fn visit_int(&mut self, value: i64) -> String {
        value.to_string()
    }

    fn visit_uint(&mut self, value: u64) -> String {
        value.to_string()
    }

    fn visit_bool(&mut self, value: bool) -> String {
        value.to_string()
    }

    fn visit_map(&mut self, value: PropertyMap<'_, '_>) -> String {
        format!("\"property_map - size: {}\"", value.len())
    }

    fn visit_list(&mut self, value: PropertyList<'_, '_>) -> String {
        format!("\"property_list - size: {}\"", value.len())
    }
}

fn format_value(value: &PropertyValue<'_, '_>) -> vtile::error::Result<String> {
    apply_visitor(&mut PrintValue, value)
}

fn print_layer(
    layer: &Layer<'_>,
    layer_num: usize,
    print_tables: bool,
) -> vtile::error::Result<()> {
    println!("=============================================================");
    println!("layer: {layer_num}");
    println!("  name: {}", layer.name());
    println!("  version: {}", layer.version());
    println!("  extent: {}", layer.extent());

    if print_tables {
        println!("  keys:");
        for (n, key) in layer.key_table().iter().enumerate() {
            println!("    {n}: {key}");
        }
        println!("  values:");
        for n in 0..layer.num_values() {
            let value = layer.value(IndexValue::new(n as u32))?;
            println!("    {n}: {} [{}]", format_value(&value)?, value.kind()?.name());
        }
    }

    let mut feature_num = 0;
    layer.for_each_feature(|mut feature| {
        println!("  feature: {feature_num}");
        if feature.has_id() {
            println!("    id: {}", feature.id());
        } else {
            println!("    id: (none)");
        }
        println!("    geomtype: {}", feature.geometry_type().name());
        println!("    geometry:");
        decode_geometry(&feature.geometry(), PrintGeometry::default())?;
        println!("    properties:");
        while let Some(property) = feature.next_property()? {
            println!("      {}={}", property.key(), format_value(&property.value())?);
        }
        feature_num += 1;
        Ok(true)
    })?;

    Ok(())
}

fn print_layer_overview(layer: &Layer<'_>) {
    println!("{} {}", layer.name(), layer.num_features());
}

fn run(args: &[String]) -> Result<bool, Box<dyn std::error::Error>> {
    let mut overview = false;
    let mut print_tables = false;
    let mut positional: Vec<&str> = Vec::new();

    for arg in args {
        match arg.as_str() {
            "-l" | "--layers" => overview = true,
            "-t" | "--tables" => print_tables = true,
            other => positional.push(other),
        }
    }

    if positional.is_empty() || positional.len() > 2 {
        return Ok(false);
    }

    let data = fs::read(positional[0])?;
    let tile = Tile::new(&data);

    if let Some(wanted) = positional.get(1) {
        let layer = match wanted.parse::<usize>() {
            Ok(num) => tile.get_layer(num)?,
            Err(_) => tile.get_layer_by_name(wanted)?,
        };
        match layer {
            Some(layer) if overview => print_layer_overview(&layer),
            Some(layer) => print_layer(&layer, 0, print_tables)?,
            None => eprintln!("no such layer: {wanted}"),
        }
        return Ok(true);
    }

    for (layer_num, layer) in tile.layers().enumerate() {
        let layer = layer?;
        if overview {
            print_layer_overview(&layer);
        } else {
            print_layer(&layer, layer_num, print_tables)?;
        }
    }

    Ok(true)
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("Usage: show [-l] [-t] TILE-FILE [LAYER-NUM|LAYER-NAME]");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
