//! Zero-copy reading and writing of Mapbox vector tiles.
//!
//! The reading side hands out borrowed views over a caller-owned buffer and
//! never copies payload bytes; the writing side assembles tiles through
//! tile/layer/feature builders with explicit commit and rollback.
//!
//! ```
//! use vtile::common::Value;
//! use vtile::read::Tile;
//! use vtile::write::{LayerBuilder, PointFeatureBuilder, TileBuilder};
//!
//! # fn main() -> vtile::error::Result<()> {
//! let mut layer = LayerBuilder::new("poi");
//! let mut feature = PointFeatureBuilder::new(&mut layer);
//! feature.set_id(17);
//! feature.add_point((2048, 2048))?;
//! feature.add_property("kind", &Value::String("fountain".to_string()));
//! feature.commit()?;
//!
//! let mut builder = TileBuilder::new();
//! builder.add_layer(layer);
//! let data = builder.serialize();
//!
//! let tile = Tile::new(&data);
//! let layer = tile.get_layer_by_name("poi")?.expect("layer exists");
//! assert_eq!(layer.num_features(), 1);
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod error;
pub mod geometry;
pub mod read;
pub mod value;
mod wire;
pub mod write;
