//! Shapes and the vertex builder.
//!
//! A vertex carries position, texture coordinate, color and normal (the
//! 13-float layout; the position's w component is implied 1). The builder
//! keeps current texcoord/color/normal state and stamps them onto every
//! vertex pushed, the way immediate-mode geometry code reads.

use macroquad::color::Color;
use macroquad::math::{Vec2, Vec3};
use macroquad::models::{Mesh, Vertex};

/// An uploadable triangle mesh. Triangle lists only.
pub struct Shape {
    mesh: Mesh,
}

impl Shape {
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertices.len()
    }
}

/// Accumulates vertices for a `Shape`.
pub struct VertexBuilder {
    vertices: Vec<Vertex>,
    texcoord: Vec2,
    color: Color,
    normal: Vec3,
}

impl VertexBuilder {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            texcoord: Vec2::ZERO,
            color: Color::new(0.0, 0.0, 0.0, 0.0),
            normal: Vec3::ZERO,
        }
    }

    /// Set the texture coordinate stamped onto subsequent vertices.
    pub fn texcoord(&mut self, texcoord: Vec2) {
        self.texcoord = texcoord;
    }

    /// Set the color stamped onto subsequent vertices.
    pub fn color(&mut self, color: Color) {
        self.color = color;
    }

    /// Set the normal stamped onto subsequent vertices.
    pub fn normal(&mut self, normal: Vec3) {
        self.normal = normal;
    }

    /// Push one vertex at `position` with the current attribute state.
    pub fn vertex(&mut self, position: Vec3) {
        self.vertices.push(Vertex {
            position,
            uv: self.texcoord,
            color: rgba8(self.color),
            normal: self.normal.extend(0.0),
        });
    }

    /// Number of vertices pushed so far.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Finish the shape. Vertex count must fit the index type and be a
    /// multiple of three (triangle list).
    pub fn build(self) -> Shape {
        debug_assert!(self.len() <= u16::MAX as usize, "shape exceeds index range");
        debug_assert!(self.len() % 3 == 0, "triangle list with a partial triangle");
        let indices = (0..self.vertices.len() as u16).collect();
        Shape {
            mesh: Mesh {
                vertices: self.vertices,
                indices,
                texture: None,
            },
        }
    }
}

impl Default for VertexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn rgba8(color: Color) -> [u8; 4] {
    [
        (color.r * 255.0) as u8,
        (color.g * 255.0) as u8,
        (color.b * 255.0) as u8,
        (color.a * 255.0) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use macroquad::math::{vec2, vec3};

    use super::*;

    #[test]
    fn test_builder_stamps_current_attributes() {
        let mut buf = VertexBuilder::new();
        buf.color(Color::new(1.0, 0.0, 0.0, 1.0));
        buf.texcoord(vec2(0.25, 0.75));
        buf.normal(vec3(0.0, 1.0, 0.0));
        buf.vertex(vec3(1.0, 2.0, 3.0));
        buf.vertex(vec3(4.0, 5.0, 6.0));
        buf.vertex(vec3(7.0, 8.0, 9.0));
        assert_eq!(buf.len(), 3);

        let shape = buf.build();
        let vertex = &shape.mesh().vertices[0];
        assert_eq!(vertex.position, vec3(1.0, 2.0, 3.0));
        assert_eq!(vertex.uv, vec2(0.25, 0.75));
        assert_eq!(vertex.color, [255, 0, 0, 255]);
        assert_eq!(vertex.normal.truncate(), vec3(0.0, 1.0, 0.0));
        assert_eq!(shape.mesh().indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_attribute_state_carries_between_vertices() {
        let mut buf = VertexBuilder::new();
        buf.color(Color::new(0.0, 1.0, 0.0, 1.0));
        buf.vertex(vec3(0.0, 0.0, 0.0));
        buf.vertex(vec3(1.0, 0.0, 0.0));
        buf.vertex(vec3(0.0, 1.0, 0.0));

        let shape = buf.build();
        for vertex in &shape.mesh().vertices {
            assert_eq!(vertex.color, [0, 255, 0, 255]);
        }
    }
}
