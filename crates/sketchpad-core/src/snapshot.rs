//! Encoding rasters to PNG data URLs and back.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use tiny_skia::{ColorU8, IntSize, Pixmap};

/// Prefix of every snapshot produced by [`to_data_url`].
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Snapshot codec errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Not a base64 data URL")]
    InvalidDataUrl,
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("PNG encoding error: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("Image decoding error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Invalid image dimensions {0}x{1}")]
    Dimensions(u32, u32),
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Encode straight-alpha RGBA pixels as PNG.
pub fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> SnapshotResult<Vec<u8>> {
    if width == 0 || height == 0 || rgba_data.len() != width as usize * height as usize * 4 {
        return Err(SnapshotError::Dimensions(width, height));
    }

    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgba_data)?;
    }

    Ok(png_data)
}

/// Encode a pixmap as PNG.
pub fn encode_pixmap(pixmap: &Pixmap) -> SnapshotResult<Vec<u8>> {
    encode_png(&pixmap_to_rgba(pixmap), pixmap.width(), pixmap.height())
}

/// Decode PNG bytes into a premultiplied pixmap.
pub fn decode_png(bytes: &[u8]) -> SnapshotResult<Pixmap> {
    let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?.to_rgba8();
    let (width, height) = image.dimensions();
    let size = IntSize::from_wh(width, height).ok_or(SnapshotError::Dimensions(width, height))?;

    let mut data = image.into_raw();
    for px in data.chunks_exact_mut(4) {
        let premultiplied = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        px[0] = premultiplied.red();
        px[1] = premultiplied.green();
        px[2] = premultiplied.blue();
        px[3] = premultiplied.alpha();
    }

    Pixmap::from_vec(data, size).ok_or(SnapshotError::Dimensions(width, height))
}

/// Straight-alpha RGBA bytes of a pixmap.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    rgba
}

/// Wrap PNG bytes in a `data:` URL.
pub fn to_data_url(png_data: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png_data))
}

/// Extract the bytes of a base64 `data:` URL.
pub fn from_data_url(url: &str) -> SnapshotResult<Vec<u8>> {
    let rest = url.trim().strip_prefix("data:").ok_or(SnapshotError::InvalidDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(SnapshotError::InvalidDataUrl)?;
    if !header.ends_with(";base64") {
        return Err(SnapshotError::InvalidDataUrl);
    }
    Ok(STANDARD.decode(payload)?)
}

/// Decode a PNG data URL straight into a pixmap.
pub fn decode_data_url(url: &str) -> SnapshotResult<Pixmap> {
    decode_png(&from_data_url(url)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pixmap() -> Pixmap {
        let mut pixmap = Pixmap::new(4, 3).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(10, 20, 30, 255));
        pixmap
    }

    #[test]
    fn test_data_url_prefix() {
        let png = encode_pixmap(&sample_pixmap()).unwrap();
        let url = to_data_url(&png);
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));
        assert_eq!(from_data_url(&url).unwrap(), png);
    }

    #[test]
    fn test_decode_restores_pixels() {
        let original = sample_pixmap();
        let decoded = decode_data_url(&to_data_url(&encode_pixmap(&original).unwrap())).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 3);
        assert_eq!(decoded.data(), original.data());
    }

    #[test]
    fn test_transparent_pixels_survive() {
        let mut pixmap = Pixmap::new(2, 1).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(255, 0, 0, 128));
        let decoded = decode_png(&encode_pixmap(&pixmap).unwrap()).unwrap();
        let px = decoded.pixel(0, 0).unwrap().demultiply();
        assert_eq!(px.alpha(), 128);
        assert!(px.red() >= 254);
    }

    #[test]
    fn test_rejects_non_data_url() {
        assert!(matches!(from_data_url("hello"), Err(SnapshotError::InvalidDataUrl)));
        assert!(matches!(
            from_data_url("data:image/png,abc"),
            Err(SnapshotError::InvalidDataUrl)
        ));
        assert!(matches!(
            from_data_url("data:image/png;base64,@@@"),
            Err(SnapshotError::Base64(_))
        ));
    }

    #[test]
    fn test_corrupt_png_is_an_error() {
        let url = to_data_url(b"definitely not a png");
        assert!(matches!(decode_data_url(&url), Err(SnapshotError::Decode(_))));
    }

    #[test]
    fn test_encode_rejects_bad_dimensions() {
        assert!(matches!(encode_png(&[0; 8], 0, 2), Err(SnapshotError::Dimensions(0, 2))));
        assert!(matches!(encode_png(&[0; 7], 1, 2), Err(SnapshotError::Dimensions(1, 2))));
    }
}
