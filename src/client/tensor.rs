//! Flat tensor to image reconstruction

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{HousingError, Result};

/// Flattened values plus a row-major shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        let tensor = Self { shape, values };
        tensor.check_len()?;
        Ok(tensor)
    }

    fn check_len(&self) -> Result<()> {
        let expected = self
            .shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| HousingError::Tensor(format!("shape {:?} overflows", self.shape)))?;
        if self.shape.is_empty() || expected != self.values.len() {
            return Err(HousingError::Tensor(format!(
                "shape {:?} needs {} values, got {}",
                self.shape,
                expected,
                self.values.len()
            )));
        }
        Ok(())
    }

    /// `(height, width, channels)` after dropping leading unit dimensions
    pub fn image_dims(&self) -> Result<(u32, u32, usize)> {
        let mut dims: &[usize] = &self.shape;
        while dims.len() > 3 && dims[0] == 1 {
            dims = &dims[1..];
        }

        let (h, w, c) = match *dims {
            [h, w] => (h, w, 1),
            [h, w, c] if c == 1 || c == 3 => (h, w, c),
            _ => {
                return Err(HousingError::Tensor(format!(
                    "shape {:?} is not an [H, W], [H, W, 1] or [H, W, 3] image",
                    self.shape
                )))
            }
        };

        let to_u32 = |v: usize| {
            u32::try_from(v)
                .map_err(|_| HousingError::Tensor(format!("dimension {} too large", v)))
        };
        Ok((to_u32(h)?, to_u32(w)?, c))
    }

    /// Build an 8-bit image. Values saturate instead of wrapping modulo 256:
    /// 300 becomes 255 (a wrapping cast would give 44) and -4 becomes 0.
    /// Integer values in `0..=255` come back unchanged.
    pub fn to_image(&self) -> Result<DynamicImage> {
        self.check_len()?;
        let (height, width, channels) = self.image_dims()?;
        let pixels: Vec<u8> = self.values.iter().map(|&v| v as u8).collect();

        let image = if channels == 3 {
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        } else {
            GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        };
        image.ok_or_else(|| {
            HousingError::Tensor(format!("buffer does not fit shape {:?}", self.shape))
        })
    }

    /// Write the tensor as a JPEG
    pub fn save_jpeg(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.to_image()?.save_with_format(path, ImageFormat::Jpeg)?;
        Ok(())
    }
}
