//! Content normalization and hashing.
//!
//! Decodes arbitrary raster encodings into one canonical form so that
//! identity is decided by what an image *shows*, not how it was saved: the
//! EXIF orientation tag is applied, the pixels are converted to 8-bit RGB,
//! and any alpha channel is dropped. The content hash is a SHA3-256 digest
//! over the canonical pixels plus the image dimensions, which makes it
//! invariant across JPEG/PNG/WEBP re-encodes of the same pixels and keeps
//! same-byte-layout images of different aspect ratios apart.

use std::fmt;
use std::io::Cursor;

use image::DynamicImage;
use sha3::{Digest, Sha3_256};

use crate::error::{DedupError, Result};

/// SHA3-256 digest of an image's canonical pixel content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex form, always 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An image reduced to its canonical pixel matrix.
///
/// Always 8-bit RGB after orientation correction. Derived on demand and
/// discarded after hashing, never persisted.
#[derive(Debug, Clone)]
pub struct DecodedRaster {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl DecodedRaster {
    /// Canonicalize an already-decoded (and orientation-corrected) image.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        Self {
            width: rgb.width(),
            height: rgb.height(),
            channels: 3,
            pixels: rgb.into_raw(),
        }
    }

    /// Digest the canonical pixels together with the image dimensions.
    ///
    /// Dimensions enter the digest in fixed-width form (big-endian u32
    /// width, big-endian u32 height, one channel byte) after the pixel
    /// bytes.
    pub fn content_hash(&self) -> ContentHash {
        let mut hasher = Sha3_256::new();
        hasher.update(&self.pixels);
        hasher.update(self.width.to_be_bytes());
        hasher.update(self.height.to_be_bytes());
        hasher.update([self.channels]);
        ContentHash(hasher.finalize().into())
    }
}

/// Decode image bytes and apply the EXIF orientation tag.
///
/// Supports JPEG, PNG, GIF, and WebP. Fails with [`DedupError::Decode`] for
/// corrupt or unsupported input; absent or unreadable EXIF data is treated
/// as "already upright".
pub fn decode_oriented(image_data: &[u8]) -> Result<DynamicImage> {
    let image =
        image::load_from_memory(image_data).map_err(|e| DedupError::Decode(e.to_string()))?;
    Ok(apply_orientation(image, read_orientation(image_data)))
}

/// Decode, canonicalize, and return the raster in one step.
pub fn normalize(image_data: &[u8]) -> Result<DecodedRaster> {
    let image = decode_oriented(image_data)?;
    Ok(DecodedRaster::from_image(&image))
}

/// Compute the content hash of encoded image bytes.
pub fn content_hash(image_data: &[u8]) -> Result<ContentHash> {
    Ok(normalize(image_data)?.content_hash())
}

/// Read the EXIF orientation value (1..=8), defaulting to 1 (upright).
fn read_orientation(image_data: &[u8]) -> u32 {
    let mut cursor = Cursor::new(image_data);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Undo the capture-time transform named by an EXIF orientation value.
fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    fn encode_png(image: &DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_content_hash_hex_matches_raw_bytes() {
        let hash = content_hash(&encode_png(&gradient(16, 16))).unwrap();
        assert_eq!(hash.to_hex().len(), 64);
        assert_eq!(hex::encode(hash.as_bytes()), hash.to_hex());
    }

    #[test]
    fn test_content_hash_deterministic() {
        let png = encode_png(&gradient(32, 24));
        assert_eq!(content_hash(&png).unwrap(), content_hash(&png).unwrap());
    }

    #[test]
    fn test_single_pixel_change_avalanches() {
        let base = gradient(32, 24);
        let mut altered = base.to_rgb8();
        altered.get_pixel_mut(7, 5)[0] ^= 1;

        let h1 = content_hash(&encode_png(&base)).unwrap();
        let h2 = content_hash(&encode_png(&DynamicImage::ImageRgb8(altered))).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_dimensions_are_part_of_identity() {
        // Same 48 pixel bytes, different shapes
        let wide = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 2, Rgb([9, 9, 9])));
        let square = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])));

        let r1 = DecodedRaster::from_image(&wide);
        let r2 = DecodedRaster::from_image(&square);
        assert_eq!(r1.pixels, r2.pixels);
        assert_ne!(r1.content_hash(), r2.content_hash());
    }

    #[test]
    fn test_alpha_is_ignored() {
        let opaque = DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 6, Rgba([10, 20, 30, 255])));
        let translucent =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 6, Rgba([10, 20, 30, 128])));

        assert_eq!(
            DecodedRaster::from_image(&opaque).content_hash(),
            DecodedRaster::from_image(&translucent).content_hash()
        );
    }

    #[test]
    fn test_decode_failure_is_decode_error() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(matches!(err, DedupError::Decode(_)));
    }

    #[test]
    fn test_plain_png_reads_as_upright() {
        assert_eq!(read_orientation(&encode_png(&gradient(8, 8))), 1);
    }

    #[test]
    fn test_apply_orientation_mapping() {
        let image = gradient(10, 20);

        assert_eq!(
            apply_orientation(image.clone(), 3).to_rgb8(),
            image.rotate180().to_rgb8()
        );
        assert_eq!(
            apply_orientation(image.clone(), 6).to_rgb8(),
            image.rotate90().to_rgb8()
        );
        // Unknown values pass through untouched
        assert_eq!(
            apply_orientation(image.clone(), 0).to_rgb8(),
            image.to_rgb8()
        );
        assert_eq!(
            apply_orientation(image.clone(), 42).to_rgb8(),
            image.to_rgb8()
        );
    }

    #[test]
    fn test_raster_is_rgb8() {
        let raster = normalize(&encode_png(&gradient(5, 7))).unwrap();
        assert_eq!(raster.channels, 3);
        assert_eq!(raster.pixels.len(), 5 * 7 * 3);
        assert_eq!((raster.width, raster.height), (5, 7));
    }
}
