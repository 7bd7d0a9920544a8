//! Low-level helpers on top of quick_protobuf: field keys, zig-zag 32,
//! command integers and lazy views over packed repeated payloads.

use quick_protobuf::{BytesReader, Writer};

use crate::error::{Error, Result};

pub(crate) const WIRE_VARINT: u32 = 0;
pub(crate) const WIRE_FIXED64: u32 = 1;
pub(crate) const WIRE_LEN: u32 = 2;
pub(crate) const WIRE_FIXED32: u32 = 5;

pub(crate) mod tile_fields {
    pub const LAYERS: u32 = 3;
}

pub(crate) mod layer_fields {
    pub const NAME: u32 = 1;
    pub const FEATURES: u32 = 2;
    pub const KEYS: u32 = 3;
    pub const VALUES: u32 = 4;
    pub const EXTENT: u32 = 5;
    pub const DIMENSIONS: u32 = 6;
    pub const VERSION: u32 = 15;
}

pub(crate) mod feature_fields {
    pub const ID: u32 = 1;
    pub const TAGS: u32 = 2;
    pub const TYPE: u32 = 3;
    pub const GEOMETRY: u32 = 4;
    pub const KNOTS: u32 = 5;
}

/// Splits a raw field key into `(field number, wire type)`.
pub(crate) fn split_key(key: u32) -> (u32, u32) {
    (key >> 3, key & 0x7)
}

pub(crate) fn make_key(field: u32, wire_type: u32) -> u32 {
    (field << 3) | wire_type
}

/// All coordinate deltas use zig-zag with 32-bit semantics (spec 4.3.2).
pub(crate) fn decode_zigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

pub(crate) fn encode_zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub(crate) const COMMAND_MOVE_TO: u32 = 1;
pub(crate) const COMMAND_LINE_TO: u32 = 2;
pub(crate) const COMMAND_CLOSE_PATH: u32 = 7;

/// The highest count a command integer can carry (spec 4.3.1).
pub(crate) const MAX_COMMAND_COUNT: u32 = u32::MAX >> 3;

pub(crate) fn command_integer(id: u32, count: u32) -> u32 {
    (id & 0x7) | (count << 3)
}

pub(crate) fn command_id(command: u32) -> u32 {
    command & 0x7
}

pub(crate) fn command_count(command: u32) -> u32 {
    command >> 3
}

/// Lazy iterator over a packed repeated uint32 payload.
pub(crate) struct PackedU32<'a> {
    bytes: &'a [u8],
    reader: BytesReader,
}

impl<'a> PackedU32<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> PackedU32<'a> {
        PackedU32 {
            bytes,
            reader: BytesReader::from_bytes(bytes),
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.reader.is_eof()
    }

    /// Number of varints in the payload.
    pub(crate) fn count(bytes: &'a [u8]) -> Result<usize> {
        let mut it = PackedU32::new(bytes);
        let mut n = 0;
        while it.next().transpose()?.is_some() {
            n += 1;
        }
        Ok(n)
    }
}

impl<'a> Iterator for PackedU32<'a> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Result<u32>> {
        if self.reader.is_eof() {
            return None;
        }
        Some(self.reader.read_uint32(self.bytes).map_err(Error::from))
    }
}

/// Lazy iterator over a packed repeated double payload (little-endian
/// fixed64 values, as used by the spline knots field).
pub(crate) struct PackedF64<'a> {
    chunks: std::slice::ChunksExact<'a, u8>,
}

impl<'a> PackedF64<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Result<PackedF64<'a>> {
        if bytes.len() % 8 != 0 {
            return Err(Error::MalformedWire(
                "packed double payload is not a multiple of 8 bytes".to_string(),
            ));
        }
        Ok(PackedF64 {
            chunks: bytes.chunks_exact(8),
        })
    }

    pub(crate) fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl<'a> Iterator for PackedF64<'a> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.chunks.next().map(|c| {
            f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
        })
    }
}

/// Runs a write closure against a Vec-backed protobuf writer. Writing into
/// memory cannot fail, so this is the one place write errors are swallowed.
pub(crate) fn emit<F>(buf: &mut Vec<u8>, write: F)
where
    F: FnOnce(&mut Writer<&mut Vec<u8>>) -> quick_protobuf::Result<()>,
{
    let mut writer = Writer::new(buf);
    write(&mut writer).expect("writing to an in-memory buffer cannot fail");
}

pub(crate) fn emit_varint(buf: &mut Vec<u8>, value: u64) {
    emit(buf, |w| w.write_varint(value));
}

/// Appends a length-delimited field with an already encoded payload.
pub(crate) fn emit_len_field(buf: &mut Vec<u8>, field: u32, payload: &[u8]) {
    emit(buf, |w| {
        w.write_varint(u64::from(make_key(field, WIRE_LEN)))?;
        w.write_bytes(payload)
    });
}
