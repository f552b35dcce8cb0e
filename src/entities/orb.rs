//! Orb
//!
//! A floating banded sphere. The shape is generated once at init: each
//! latitude ring becomes a thin quad band, giving the orb its striped look.
//! Orbs are static scenery until something sends them `Damage`, at which
//! point they flag themselves for the destroy sweep.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use log::debug;
use macroquad::color::WHITE;
use macroquad::math::{vec2, vec4, Mat4, Vec3};

use super::player::direction;
use crate::engine::entity::{
    Entity, EntityBehavior, EntityState, Message, Payload, FLAG_STATIC,
};
use crate::render::{DrawCall, Shader, Shape, VertexBuilder};

const RINGS: usize = 12;
const STEPS: usize = 50;
/// Half the angular width of one band.
const BAND_HALF_WIDTH: f32 = FRAC_PI_2 / 96.0;

pub struct OrbData {
    pub shape: Shape,
}

pub struct OrbBehavior;

impl EntityBehavior for OrbBehavior {
    fn init(&self, entity: &mut Entity) {
        entity.radius = 1.0;
        entity.flags |= FLAG_STATIC;
        let shape = build_shape();
        debug!("orb shape built ({} vertices)", shape.vertex_count());
        entity.data = Payload::Orb(OrbData { shape });
    }

    fn draw<'a>(&self, entity: &'a mut Entity, shader: &'a Shader, mut call: DrawCall<'a>) {
        let Payload::Orb(orb) = &entity.data else {
            return;
        };
        call.shape = Some(&orb.shape);
        call.image = shader.image(0);
        call.color = vec4(0.0, 1.0, 1.0, 1.0);
        call.cull_backfaces = false;
        call.model =
            Mat4::from_translation(entity.pos) * Mat4::from_scale(Vec3::splat(entity.radius));
        shader.draw(&call);
    }

    fn receive(&self, entity: &mut Entity, _sender: Option<&Entity>, message: &Message) {
        if let Message::Damage(_) = message {
            entity.state = EntityState::Destroy;
        }
    }
}

/// Build the banded unit sphere.
pub fn build_shape() -> Shape {
    let mut buf = VertexBuilder::new();
    buf.color(WHITE);

    for i in 1..=RINGS {
        let p = i as f32 * PI / (RINGS as f32 + 1.0) - FRAC_PI_2;

        for j in 0..STEPS {
            let y1 = j as f32 * TAU / STEPS as f32;
            let y2 = (j + 1) as f32 * TAU / STEPS as f32;

            let p1 = p + BAND_HALF_WIDTH;
            let p2 = p - BAND_HALF_WIDTH;

            // Two triangles per band segment, normals pointing outward.
            for (yaw, pitch) in [(y1, p1), (y1, p2), (y2, p1), (y1, p2), (y2, p2), (y2, p1)] {
                let v = direction(yaw, pitch);
                buf.texcoord(vec2(yaw / TAU, (pitch + FRAC_PI_2) / PI));
                buf.normal(v);
                buf.vertex(v);
            }
        }
    }

    buf.build()
}
