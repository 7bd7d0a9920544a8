use vtile::common::Value;
use vtile::write::{LayerBuilder, LinestringFeatureBuilder, PointFeatureBuilder, TileBuilder};

use std::fs::File;
use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut layer = LayerBuilder::new("example");

    let mut poi = PointFeatureBuilder::new(&mut layer);
    poi.set_id(1234);
    poi.add_point((2048, 2048))?;
    poi.add_property("kind", &Value::String("fountain".to_string()));
    poi.commit()?;

    let mut road = LinestringFeatureBuilder::new(&mut layer);
    road.add_linestring_from(&[(10, 20), (30, 40)])?;
    road.add_property("length", &Value::Float(4.0));
    road.commit()?;

    let mut tile = TileBuilder::new();
    tile.add_layer(layer);

    let mut file = File::create("example.mvt")?;
    file.write_all(&tile.serialize())?;

    Ok(())
}
