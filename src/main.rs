//! GARNET: a small real-time 3D engine skeleton.
//!
//! One window, one environment, one frame loop:
//! poll events -> environment update -> environment draw -> commit.
//! The interesting machinery is the entity lifecycle in `engine`; the
//! window and render layers are thin wrappers over the backend.

mod config;
mod engine;
mod entities;
mod input;
mod render;
mod window;

use log::{error, info, warn};
use macroquad::color::Color;
use macroquad::input::KeyCode;
use macroquad::math::vec3;
use macroquad::window::Conf;

use engine::{EntityKind, Environment};
use render::{Image, Shader};
use window::{Window, WindowEvent};

fn window_conf() -> Conf {
    let config = config::get();
    Conf {
        window_title: config.window.title.clone(),
        window_width: config.window.width,
        window_height: config.window.height,
        window_resizable: true,
        high_dpi: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::get().clone();
    let mut window = Window::new();

    let mut shader = match Shader::load("assets/shaders/default") {
        Ok(shader) => shader,
        Err(err) => {
            error!("render setup failed: {err}");
            return;
        }
    };
    match Image::load("assets/textures/orb.png") {
        Ok(image) => {
            info!("orb texture loaded ({}x{})", image.width(), image.height());
            shader.store_image(0, image);
        }
        Err(err) => warn!("orb texture unavailable: {err}"),
    }

    let clear = Color::new(
        config.clear_color[0],
        config.clear_color[1],
        config.clear_color[2],
        config.clear_color[3],
    );

    let mut env = Environment::new(config);
    let (width, height) = window.size();
    env.attach_shader(shader, width, height);

    // A ring of orbs around the spawn point.
    for i in 0..6 {
        let angle = i as f32 / 6.0 * std::f32::consts::TAU;
        env.spawn(
            EntityKind::Orb,
            vec3(angle.cos() * 8.0, 0.0, angle.sin() * 8.0),
        );
    }

    window.grab_mouse(true);

    while window.is_open() {
        window.begin_frame(clear);

        for event in window.poll_events() {
            match event {
                WindowEvent::Key {
                    key: KeyCode::Escape,
                    pressed: true,
                } => window.request_close(),
                WindowEvent::Key {
                    key: KeyCode::F5,
                    pressed: true,
                } => env.request_unload(),
                _ => {}
            }
            env.handle_event(&event);
        }

        env.update();
        env.draw();

        window.commit().await;
    }

    info!("shutting down");
}
