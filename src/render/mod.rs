//! Rendering abstraction
//!
//! The narrow interface the engine core draws through:
//! - `Shader`: a GLSL program with the standard uniform set and a cached
//!   pipeline variant per draw-flag combination
//! - `Shape`: an uploaded triangle mesh
//! - `VertexBuilder`: stateful vertex accumulator for building shapes
//! - `Image`: a decoded, nearest-filtered texture
//! - `DrawCall`: the transient per-submission record an entity's draw
//!   callback fills in and submits
//!
//! Setup failures (missing shader files, compile errors, bad images) are
//! fatal and surface as `RenderError`; nothing here retries.

mod image;
mod shader;
mod shape;

pub use image::Image;
pub use shader::{Shader, SHADER_MAX_IMAGES};
pub use shape::{Shape, VertexBuilder};

use macroquad::math::{vec4, Mat4, Vec4};
use thiserror::Error;

/// Fatal setup failure in the render layer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot read shader file {path}: {source}")]
    ShaderFile {
        path: String,
        source: std::io::Error,
    },
    #[error("shader compile/link failed: {0:?}")]
    ShaderCompile(macroquad::Error),
    #[error("cannot load image {path}: {source}")]
    ImageFile {
        path: String,
        source: ::image::ImageError,
    },
}

/// Parameters for a single draw submission. The environment hands every
/// entity a fresh default record; the entity's draw callback mutates it and
/// submits through `Shader::draw`.
pub struct DrawCall<'a> {
    pub shape: Option<&'a Shape>,
    pub image: Option<&'a Image>,

    pub model: Mat4,
    pub color: Vec4,
    /// Texture-coordinate transform: offset in xy, scale in zw.
    pub tex_rect: Vec4,

    pub depth_test: bool,
    pub depth_write: bool,
    pub cull_backfaces: bool,
}

impl Default for DrawCall<'_> {
    fn default() -> Self {
        Self {
            shape: None,
            image: None,
            model: Mat4::IDENTITY,
            color: vec4(1.0, 1.0, 1.0, 1.0),
            tex_rect: vec4(0.0, 0.0, 1.0, 1.0),
            depth_test: true,
            depth_write: false,
            cull_backfaces: true,
        }
    }
}
