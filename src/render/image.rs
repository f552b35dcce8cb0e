//! Images.
//!
//! Decoded on the CPU with the `image` crate, uploaded nearest-filtered.

use macroquad::texture::{FilterMode, Texture2D};

use super::RenderError;

pub struct Image {
    texture: Texture2D,
    width: u32,
    height: u32,
}

impl Image {
    /// Decode an image file to RGBA8 and upload it.
    pub fn load(path: &str) -> Result<Self, RenderError> {
        let decoded = image::open(path)
            .map_err(|source| RenderError::ImageFile {
                path: path.to_string(),
                source,
            })?
            .to_rgba8();
        let (width, height) = decoded.dimensions();

        let texture = Texture2D::from_rgba8(width as u16, height as u16, decoded.as_raw());
        texture.set_filter(FilterMode::Nearest);

        Ok(Self {
            texture,
            width,
            height,
        })
    }

    pub fn texture(&self) -> &Texture2D {
        &self.texture
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
