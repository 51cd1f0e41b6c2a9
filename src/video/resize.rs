//! JPEG rescaling
//!
//! A frame is decoded once and then resized once per distinct target, so
//! the cost is shared by every viewer asking for the same size.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use super::frame::Resolution;
use crate::error::{ProtocolError, Result};

/// Resize one JPEG to every target
///
/// CPU bound. Run it on a blocking thread.
pub fn rescale(jpeg: &[u8], targets: &[Resolution], quality: u8) -> Result<Vec<(Resolution, Bytes)>> {
    let image = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)
        .map_err(|e| ProtocolError::UndecodableFrame(e.to_string()))?;

    targets
        .iter()
        .map(|&target| Ok((target, resize_one(&image, target, quality)?)))
        .collect()
}

fn resize_one(image: &DynamicImage, target: Resolution, quality: u8) -> Result<Bytes> {
    let resized = image
        .resize_exact(target.width, target.height, FilterType::Triangle)
        .to_rgb8();

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder
        .encode_image(&resized)
        .map_err(|e| ProtocolError::UndecodableFrame(e.to_string()))?;

    Ok(Bytes::from(out))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GenericImageView, ImageBuffer, Rgb};

    /// A small gradient JPEG
    pub(crate) fn sample_jpeg(width: u32, height: u32) -> Bytes {
        let image = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
        });
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, 90);
        encoder.encode_image(&image).unwrap();
        Bytes::from(out)
    }

    pub(crate) fn dimensions(jpeg: &[u8]) -> (u32, u32) {
        image::load_from_memory(jpeg).unwrap().dimensions()
    }

    #[test]
    fn test_rescale_targets() {
        let jpeg = sample_jpeg(64, 48);
        let small = Resolution::new(32, 24).unwrap();
        let square = Resolution::new(16, 16).unwrap();

        let out = rescale(&jpeg, &[small, square], 80).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0, small);
        assert_eq!(dimensions(&out[0].1), (32, 24));
        assert_eq!(out[1].0, square);
        assert_eq!(dimensions(&out[1].1), (16, 16));
    }

    #[test]
    fn test_rescale_undecodable() {
        let err = rescale(b"not a jpeg", &[Resolution::new(8, 8).unwrap()], 80).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Protocol(ProtocolError::UndecodableFrame(_))
        ));
    }
}
