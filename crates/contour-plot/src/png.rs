//! PNG encoding for RGBA image data (colour type 6, 8 bits per channel).

use std::io::Write;

use crate::error::{RenderError, Result};

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Encode RGBA pixels (4 bytes per pixel, top row first) as a PNG.
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    if pixels.len() != width * height * 4 {
        return Err(RenderError::Encode(format!(
            "expected {} bytes for {}x{} RGBA, got {}",
            width * height * 4,
            width,
            height,
            pixels.len()
        )));
    }
    let w = u32::try_from(width).map_err(|_| RenderError::Encode("image too wide".to_string()))?;
    let h = u32::try_from(height).map_err(|_| RenderError::Encode("image too tall".to_string()))?;

    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&w.to_be_bytes());
    ihdr_data.extend_from_slice(&h.to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(6); // color type (RGBA)
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    let idat_data = deflate_idat_rgba(pixels, width, height)
        .map_err(|e| RenderError::Encode(format!("IDAT compression failed: {}", e)))?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Length, type, data, then CRC over type and data.
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

fn deflate_idat_rgba(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let stride = width * 4;
    let mut uncompressed = Vec::with_capacity(height * (1 + stride));
    for row in pixels.chunks_exact(stride.max(1)).take(height) {
        uncompressed.push(0); // filter type: none
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_png_header_and_ihdr() {
        let pixels = vec![255u8; 3 * 2 * 4];
        let png = create_png(&pixels, 3, 2).unwrap();
        assert_eq!(&png[0..8], &PNG_SIGNATURE);
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 3);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 2);
        assert_eq!(png[24], 8);
        assert_eq!(png[25], 6);
        assert_eq!(&png[png.len() - 8..png.len() - 4], b"IEND");
    }

    #[test]
    fn test_chunk_crc() {
        let mut buf = Vec::new();
        write_chunk(&mut buf, b"IEND", &[]);
        // Well-known CRC of an empty IEND chunk
        assert_eq!(&buf[8..12], &[0xAE, 0x42, 0x60, 0x82]);
    }

    #[test]
    fn test_idat_inflates_to_filtered_rows() {
        let pixels: Vec<u8> = (0..16).collect();
        let compressed = deflate_idat_rgba(&pixels, 2, 2).unwrap();
        let mut decoder = flate2::read::ZlibDecoder::new(&compressed[..]);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw).unwrap();
        assert_eq!(raw.len(), 18);
        assert_eq!(raw[0], 0);
        assert_eq!(&raw[1..9], &pixels[0..8]);
        assert_eq!(raw[9], 0);
    }

    #[test]
    fn test_rejects_short_buffer() {
        assert!(matches!(create_png(&[0u8; 4], 2, 2), Err(RenderError::Encode(_))));
    }
}
