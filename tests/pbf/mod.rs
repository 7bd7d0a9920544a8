//! Helpers to assemble tile buffers byte by byte, including deliberately
//! malformed ones the library's writer would refuse to produce.

pub fn push_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

pub fn push_key(buf: &mut Vec<u8>, field: u32, wire_type: u32) {
    push_varint(buf, u64::from((field << 3) | wire_type));
}

pub fn push_varint_field(buf: &mut Vec<u8>, field: u32, value: u64) {
    push_key(buf, field, 0);
    push_varint(buf, value);
}

pub fn push_len_field(buf: &mut Vec<u8>, field: u32, payload: &[u8]) {
    push_key(buf, field, 2);
    push_varint(buf, payload.len() as u64);
    buf.extend_from_slice(payload);
}

pub fn push_string_field(buf: &mut Vec<u8>, field: u32, value: &str) {
    push_len_field(buf, field, value.as_bytes());
}

pub fn packed_u32(values: &[u32]) -> Vec<u8> {
    let mut buf = Vec::new();
    for v in values {
        push_varint(&mut buf, u64::from(*v));
    }
    buf
}

pub fn packed_f64(values: &[f64]) -> Vec<u8> {
    let mut buf = Vec::new();
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

/// An encoded string `Value` message.
pub fn string_value(value: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    push_string_field(&mut buf, 1, value);
    buf
}

/// A feature message from its parts. `geometry` is the packed command
/// stream; `tags` the packed index stream.
pub fn feature(id: Option<u64>, geom_type: Option<i32>, geometry: Option<&[u32]>, tags: &[u32]) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(id) = id {
        push_varint_field(&mut buf, 1, id);
    }
    if !tags.is_empty() {
        push_len_field(&mut buf, 2, &packed_u32(tags));
    }
    if let Some(geom_type) = geom_type {
        push_varint_field(&mut buf, 3, geom_type as u64);
    }
    if let Some(geometry) = geometry {
        push_len_field(&mut buf, 4, &packed_u32(geometry));
    }
    buf
}

/// A version 2 layer named "hello" with the given features, keys and
/// encoded values.
pub fn layer(features: &[Vec<u8>], keys: &[&str], values: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    push_varint_field(&mut buf, 15, 2);
    push_string_field(&mut buf, 1, "hello");
    push_varint_field(&mut buf, 5, 4096);
    for feature in features {
        push_len_field(&mut buf, 2, feature);
    }
    for key in keys {
        push_string_field(&mut buf, 3, key);
    }
    for value in values {
        push_len_field(&mut buf, 4, value);
    }
    buf
}

pub fn tile(layers: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    for layer in layers {
        push_len_field(&mut buf, 3, layer);
    }
    buf
}
