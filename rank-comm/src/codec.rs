//! f64 slices on the wire: little-endian, eight bytes per element.

use crate::Error;

const WIDTH: usize = std::mem::size_of::<f64>();

pub fn encode(values: &[f64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * WIDTH);
    for value in values {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf
}

pub fn decode(bytes: &[u8]) -> Result<Vec<f64>, Error> {
    if bytes.len() % WIDTH != 0 {
        return Err(Error::MalformedPayload(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(WIDTH)
        .map(|chunk| {
            let mut raw = [0u8; WIDTH];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect())
}
