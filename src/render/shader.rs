//! Shader programs.
//!
//! A `Shader` wraps one GLSL vertex/fragment pair loaded from disk, with
//! the standard uniform set (`P`, `V`, `M`, `Color`, `TexRect`,
//! `use_image`, `tex`). The backend bakes depth/cull state into its
//! pipelines at creation, so the shader compiles one pipeline variant per
//! draw-flag combination up front and picks one per submission.
//!
//! The shader also carries a bank of image slots for frequently used
//! textures; dropping the shader drops everything it owns.

use std::collections::HashMap;
use std::fs;

use macroquad::material::{
    gl_use_default_material, gl_use_material, load_material, Material, MaterialParams,
};
use macroquad::math::Mat4;
use macroquad::miniquad::{
    Comparison, CullFace, PipelineParams, ShaderSource, UniformDesc, UniformType,
};
use macroquad::models::draw_mesh;

use super::{DrawCall, Image, RenderError};

/// Image slots a shader carries.
pub const SHADER_MAX_IMAGES: usize = 128;

/// (depth test, depth write, backface culling)
type PipelineKey = (bool, bool, bool);

pub struct Shader {
    variants: HashMap<PipelineKey, Material>,
    images: Vec<Option<Image>>,
}

impl Shader {
    /// Load and compile `<name>.vert` + `<name>.frag`. Compiles every
    /// pipeline variant eagerly so all setup failures surface here.
    pub fn load(name: &str) -> Result<Self, RenderError> {
        let vertex_src = read_source(&format!("{name}.vert"))?;
        let fragment_src = read_source(&format!("{name}.frag"))?;

        let mut variants = HashMap::new();
        for depth_test in [false, true] {
            for depth_write in [false, true] {
                for cull in [false, true] {
                    let key = (depth_test, depth_write, cull);
                    variants.insert(key, compile_variant(&vertex_src, &fragment_src, key)?);
                }
            }
        }

        Ok(Self {
            variants,
            images: (0..SHADER_MAX_IMAGES).map(|_| None).collect(),
        })
    }

    /// Push the projection matrix to every pipeline variant.
    pub fn set_projection(&self, projection: Mat4) {
        for material in self.variants.values() {
            material.set_uniform("P", projection);
        }
    }

    /// Push the view matrix to every pipeline variant.
    pub fn set_view(&self, view: Mat4) {
        for material in self.variants.values() {
            material.set_uniform("V", view);
        }
    }

    /// Submit one draw call. A call without a shape is a caller bug and is
    /// dropped.
    pub fn draw(&self, call: &DrawCall) {
        let Some(shape) = call.shape else {
            debug_assert!(false, "draw call without a shape");
            return;
        };

        let material = &self.variants[&(call.depth_test, call.depth_write, call.cull_backfaces)];
        material.set_uniform("M", call.model);
        material.set_uniform("Color", call.color);
        material.set_uniform("TexRect", call.tex_rect);
        match call.image {
            Some(image) => {
                material.set_texture("tex", image.texture().clone());
                material.set_uniform("use_image", 1.0f32);
            }
            None => material.set_uniform("use_image", 0.0f32),
        }

        gl_use_material(material);
        draw_mesh(shape.mesh());
        gl_use_default_material();
    }

    /// Store an image in a slot, returning whatever the slot held.
    pub fn store_image(&mut self, slot: usize, image: Image) -> Option<Image> {
        self.images[slot].replace(image)
    }

    /// Borrow the image in a slot, if any.
    pub fn image(&self, slot: usize) -> Option<&Image> {
        self.images[slot].as_ref()
    }
}

fn read_source(path: &str) -> Result<String, RenderError> {
    fs::read_to_string(path).map_err(|source| RenderError::ShaderFile {
        path: path.to_string(),
        source,
    })
}

fn compile_variant(
    vertex_src: &str,
    fragment_src: &str,
    (depth_test, depth_write, cull): PipelineKey,
) -> Result<Material, RenderError> {
    load_material(
        ShaderSource::Glsl {
            vertex: vertex_src,
            fragment: fragment_src,
        },
        MaterialParams {
            pipeline_params: PipelineParams {
                depth_test: if depth_test {
                    Comparison::LessOrEqual
                } else {
                    Comparison::Always
                },
                depth_write,
                cull_face: if cull { CullFace::Back } else { CullFace::Nothing },
                ..Default::default()
            },
            uniforms: vec![
                UniformDesc::new("P", UniformType::Mat4),
                UniformDesc::new("V", UniformType::Mat4),
                UniformDesc::new("M", UniformType::Mat4),
                UniformDesc::new("Color", UniformType::Float4),
                UniformDesc::new("TexRect", UniformType::Float4),
                UniformDesc::new("use_image", UniformType::Float1),
            ],
            textures: vec!["tex".to_string()],
        },
    )
    .map_err(RenderError::ShaderCompile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_shader_file_is_reported() {
        let result = Shader::load("no/such/shader");
        assert!(matches!(result, Err(RenderError::ShaderFile { .. })));
    }
}
