//! Player
//!
//! The player is an ordinary entity whose payload carries the camera
//! orientation. Movement is mouse-look plus horizontal WASD flight with
//! Space/Shift for vertical motion; the view matrix is rebuilt from the
//! entity position and the yaw/pitch pair every frame.

use std::f32::consts::{FRAC_PI_2, TAU};

use log::debug;
use macroquad::color::{GRAY, WHITE};
use macroquad::math::{vec3, Mat4, Vec3};
use macroquad::shapes::draw_line;
use macroquad::text::draw_text;
use macroquad::window::{screen_height, screen_width};

use crate::engine::entity::{Entity, EntityArena, EntityBehavior, EntityId, EntityKind, Message, Payload};
use crate::engine::environment::{EnvState, Environment};

/// The player's caller-assigned entity id.
pub const PLAYER_ENTITY_ID: u32 = 0;

/// How far a swing reaches when the player attacks.
const ATTACK_RANGE: f32 = 10.0;

/// Camera orientation, stored as the player entity's payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerData {
    pub yaw: f32,
    pub pitch: f32,
}

pub struct PlayerBehavior;

impl EntityBehavior for PlayerBehavior {
    fn init(&self, entity: &mut Entity) {
        entity.data = Payload::Player(PlayerData::default());
    }

    fn update(&self, entity: &mut Entity, env: &mut Environment) {
        let speed = env.config().controls.move_speed;
        let sensitivity = env.config().controls.mouse_sensitivity;
        let input = env.input;

        let Payload::Player(player) = &mut entity.data else {
            return;
        };

        player.yaw = (player.yaw - sensitivity * input.mouse_delta.x).rem_euclid(TAU);
        player.pitch = (player.pitch + sensitivity * input.mouse_delta.y)
            .clamp(-FRAC_PI_2, FRAC_PI_2);

        let (sy, cy) = player.yaw.sin_cos();
        let forward = vec3(sy, 0.0, cy);
        let right = vec3(cy, 0.0, -sy);

        if input.forward {
            entity.pos -= forward * speed;
        }
        if input.back {
            entity.pos += forward * speed;
        }
        if input.left {
            entity.pos -= right * speed;
        }
        if input.right {
            entity.pos += right * speed;
        }
        if input.ascend {
            entity.pos.y += speed;
        }
        if input.descend {
            entity.pos.y -= speed;
        }

        if input.attack {
            if let Some((target, dist)) = nearest_orb(env, entity.pos) {
                if dist <= ATTACK_RANGE {
                    env.send_message(target, Some(env.player()), &Message::Damage(1.0));
                }
            }
        }
    }

    fn save(&self, entity: &mut Entity, _env: &mut Environment) {
        if let Payload::Player(player) = &entity.data {
            debug!(
                "player pose at save: pos ({:.2} {:.2} {:.2}) yaw {:.3} pitch {:.3}",
                entity.pos.x, entity.pos.y, entity.pos.z, player.yaw, player.pitch
            );
        }
    }
}

/// Create the player singleton. Called once per environment.
pub fn create(arena: &mut EntityArena) -> EntityId {
    arena.create(PLAYER_ENTITY_ID, EntityKind::Player, Vec3::ZERO)
}

/// Unit view direction for a yaw/pitch pair.
pub fn direction(yaw: f32, pitch: f32) -> Vec3 {
    let (sy, cy) = yaw.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    vec3(cp * sy, sp, cp * cy).normalize()
}

/// View matrix for the player's current pose.
pub fn view_matrix(entity: &Entity) -> Mat4 {
    let Payload::Player(player) = &entity.data else {
        return Mat4::IDENTITY;
    };
    let dir = direction(player.yaw, player.pitch);
    Mat4::look_to_rh(entity.pos, -dir, Vec3::Y)
}

/// 2D HUD overlay: crosshair plus a status line. Drawn every frame, in or
/// out of the running state.
pub fn draw_overlay(entity: &Entity, state: EnvState, entity_count: usize) {
    let cx = screen_width() / 2.0;
    let cy = screen_height() / 2.0;
    draw_line(cx - 8.0, cy, cx + 8.0, cy, 1.0, WHITE);
    draw_line(cx, cy - 8.0, cx, cy + 8.0, 1.0, WHITE);

    draw_text(
        &format!("{state:?}  entities: {entity_count}"),
        12.0,
        screen_height() - 16.0,
        20.0,
        GRAY,
    );
    if let Payload::Player(player) = &entity.data {
        draw_text(
            &format!(
                "pos ({:.1} {:.1} {:.1})  yaw {:.2}",
                entity.pos.x, entity.pos.y, entity.pos.z, player.yaw
            ),
            12.0,
            screen_height() - 36.0,
            20.0,
            GRAY,
        );
    }
}

/// Closest live orb to `from`, if any.
fn nearest_orb(env: &Environment, from: Vec3) -> Option<(EntityId, f32)> {
    let mut best: Option<(EntityId, f32)> = None;
    for &id in env.entities() {
        let Some(entity) = env.arena().get(id) else {
            continue;
        };
        if entity.kind != EntityKind::Orb {
            continue;
        }
        let dist = entity.pos.distance(from);
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((id, dist));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_at_rest_points_along_z() {
        let dir = direction(0.0, 0.0);
        assert!((dir - vec3(0.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_direction_pitch_up_points_along_y() {
        let dir = direction(0.0, FRAC_PI_2);
        assert!((dir - vec3(0.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_view_matrix_maps_eye_to_origin() {
        let mut arena = EntityArena::new();
        let id = create(&mut arena);
        let entity = arena.get_mut(id).unwrap();
        entity.pos = vec3(3.0, 4.0, 5.0);

        let view = view_matrix(entity);
        let eye = view * entity.pos.extend(1.0);
        assert!(eye.truncate().length() < 1e-4);
        arena.release(id);
    }
}
