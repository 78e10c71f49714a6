//! Perceptual fingerprinting for near-duplicate detection.
//!
//! Computes a 64-bit difference hash (dHash): the image is downscaled to a
//! 9x8 grayscale grid and each bit records whether a pixel is brighter than
//! its right neighbor. The sign of the luminance gradient survives
//! re-encoding, resizing, and mild color quantization, while structural and
//! compositional changes flip many bits at once.
//!
//! Fingerprinting is best-effort: an image that cannot be decoded simply has
//! no fingerprint, and near-duplicate detection is skipped for it.

use std::fmt;

use image::{imageops::FilterType, DynamicImage};

use crate::normalize;

/// Downscale grid: 9 columns so each of the 8 rows yields 8 comparisons.
const GRID_WIDTH: u32 = 9;
const GRID_HEIGHT: u32 = 8;

/// A 64-bit perceptual fingerprint.
///
/// Rendered as a 16-character zero-padded hex string for storage and
/// comparison (see [`crate::similarity`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Hex form, always 16 characters, zero-padded.
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    /// Parse the 16-character hex form. `None` for any other shape.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        if hex_str.len() != 16 {
            return None;
        }
        u64::from_str_radix(hex_str, 16).ok().map(Self)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Compute the fingerprint of encoded image bytes.
///
/// Applies the same orientation correction as content hashing, so a rotated
/// re-save fingerprints like its upright original.
///
/// # Returns
///
/// The fingerprint, or `None` if the bytes do not decode. Absence is not an
/// error: the caller proceeds without near-duplicate detection.
pub fn fingerprint(image_data: &[u8]) -> Option<Fingerprint> {
    match normalize::decode_oriented(image_data) {
        Ok(image) => Some(fingerprint_image(&image)),
        Err(err) => {
            tracing::debug!(error = %err, "image not fingerprintable");
            None
        }
    }
}

/// Compute the fingerprint of an already-decoded image.
pub fn fingerprint_image(image: &DynamicImage) -> Fingerprint {
    let gray = image
        .resize_exact(GRID_WIDTH, GRID_HEIGHT, FilterType::Lanczos3)
        .to_luma8();

    let mut bits = 0u64;
    for y in 0..GRID_HEIGHT {
        for x in 0..GRID_WIDTH - 1 {
            bits <<= 1;
            if gray.get_pixel(x, y)[0] > gray.get_pixel(x + 1, y)[0] {
                bits |= 1;
            }
        }
    }

    Fingerprint(bits)
}
