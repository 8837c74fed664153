//! Camera observation.
use crate::{error::SimError, types::RawImage};
use anyhow::Result;
use drive_core::Obs;
use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::{Array3, ArrayView3};
use std::{path::Path, sync::Arc};

/// Camera frame of shape `height × width × 3`.
///
/// The three channels are the color channels of the simulator image in the
/// order they were delivered (BGR for BGRA input). The pixel data is shared
/// between clones.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraObs {
    frame: Arc<Array3<u8>>,
}

impl CameraObs {
    /// Builds an observation from a BGRA image by dropping the alpha channel.
    ///
    /// If `size` (width, height) differs from the image size, the frame is
    /// resized with bilinear filtering.
    pub fn from_raw(raw: &RawImage, size: Option<(u32, u32)>) -> Result<Self> {
        let (w, h) = (raw.width, raw.height);
        let expected = (w * h * 4) as usize;
        if raw.raw_data.len() != expected {
            return Err(SimError::InvalidImage {
                expected,
                actual: raw.raw_data.len(),
            }
            .into());
        }

        let data: Vec<u8> = raw
            .raw_data
            .chunks_exact(4)
            .flat_map(|px| px[..3].iter().copied())
            .collect();

        let (data, w, h) = match size {
            Some((nw, nh)) if (nw, nh) != (w, h) => {
                let img = RgbImage::from_raw(w, h, data).ok_or(SimError::InvalidImage {
                    expected: (w * h * 3) as usize,
                    actual: 0,
                })?;
                (
                    imageops::resize(&img, nw, nh, FilterType::Triangle).into_raw(),
                    nw,
                    nh,
                )
            }
            _ => (data, w, h),
        };

        Ok(Self {
            frame: Arc::new(Array3::from_shape_vec((h as usize, w as usize, 3), data)?),
        })
    }

    /// Black frame.
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            frame: Arc::new(Array3::zeros((height, width, 3))),
        }
    }

    pub fn height(&self) -> usize {
        self.frame.dim().0
    }

    pub fn width(&self) -> usize {
        self.frame.dim().1
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.frame.view()
    }

    /// Pixel values scaled to `[0, 1]`.
    pub fn to_normalized(&self) -> Array3<f32> {
        self.frame.mapv(|v| v as f32 / 255.0)
    }

    /// Returns `true` if both observations share the same pixel storage.
    pub fn shares_frame(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.frame, &other.frame)
    }

    /// Writes the frame as a PNG file, converting BGR to RGB.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let (h, w, _) = self.frame.dim();
        let img = RgbImage::from_fn(w as u32, h as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            image::Rgb([
                self.frame[[y, x, 2]],
                self.frame[[y, x, 1]],
                self.frame[[y, x, 0]],
            ])
        });
        img.save(path)?;
        Ok(())
    }
}

impl Obs for CameraObs {}

#[cfg(feature = "candle")]
impl drive_candle_agent::TensorObs for CameraObs {
    fn to_tensor(&self, device: &candle_core::Device) -> candle_core::Result<candle_core::Tensor> {
        let (h, w, c) = self.frame.dim();
        let data: Vec<f32> = self.frame.iter().map(|&v| v as f32 / 255.0).collect();
        candle_core::Tensor::from_vec(data, (h, w, c), device)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    fn raw_image(width: u32, height: u32) -> RawImage {
        let raw_data = (0..width * height)
            .flat_map(|i| [10, 20, (i % 256) as u8, 255])
            .collect();
        RawImage {
            frame: 0,
            width,
            height,
            raw_data,
        }
    }

    #[test]
    fn test_drop_alpha() {
        let obs = CameraObs::from_raw(&raw_image(4, 2), None).unwrap();
        assert_eq!((obs.height(), obs.width()), (2, 4));
        let view = obs.view();
        assert_eq!(view[[0, 0, 0]], 10);
        assert_eq!(view[[0, 0, 1]], 20);
        assert_eq!(view[[1, 3, 2]], 7);
    }

    #[test]
    fn test_resize() {
        let obs = CameraObs::from_raw(&raw_image(8, 6), Some((4, 3))).unwrap();
        assert_eq!((obs.height(), obs.width()), (3, 4));
        assert_eq!(obs.view()[[1, 1, 0]], 10);
    }

    #[test]
    fn test_invalid_length() {
        let mut raw = raw_image(4, 2);
        raw.raw_data.pop();
        let err = CameraObs::from_raw(&raw, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SimError>(),
            Some(SimError::InvalidImage { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn test_normalized_and_shared() {
        let obs = CameraObs::from_raw(&raw_image(2, 2), None).unwrap();
        let copy = obs.clone();
        assert!(obs.shares_frame(&copy));
        let x = obs.to_normalized();
        assert!((x[[0, 0, 1]] - 20.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_save_png() {
        let dir = TempDir::new("camera_obs").unwrap();
        let path = dir.path().join("frame.png");
        CameraObs::from_raw(&raw_image(4, 2), None)
            .unwrap()
            .save_png(&path)
            .unwrap();
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (4, 2));
        assert_eq!(img.get_pixel(0, 0).0, [0, 20, 10]);
    }
}
