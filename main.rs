mod camera;
mod cloud;
mod cluster;
mod color;
mod config;
mod director;
mod error;
mod fade;
mod galaxy;
mod hint;
mod images;
mod lod;
mod render;
mod rings;
mod session;
mod trajectory;

use std::time::{Duration, Instant};

use clap::Parser;
use glam::Vec2;
use log::info;
use minifb::{Key, MouseButton, MouseMode, Window, WindowOptions};

use crate::camera::ndc_from_pixel;
use crate::config::Args;
use crate::director::AnimationState;
use crate::error::{SceneError, SceneResult};
use crate::render::Renderer;
use crate::session::{FrameInput, Presentation, SceneSession};

const TITLE: &str = "Galaxy";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    let (width, height) = (config.width, config.height);
    let idle_title = format!("{TITLE} - {}", config.hint_label);

    let mut window = open_window(width, height)?;
    window.set_title(&idle_title);
    let mut renderer = Renderer::new(width, height, config.fog_density);
    let mut session = SceneSession::new(config, rand::rng());
    let mut presentation = MinifbPresentation;
    let mut pointer = PointerTracker::default();

    let mut last_frame = Instant::now();
    let mut shown_state = AnimationState::Idle;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let now = Instant::now();
        let mut dt = (now - last_frame).as_secs_f32();
        if dt > 0.1 {
            dt = 0.1;
        }
        last_frame = now;

        let input = pointer.sample(&window, width, height);
        session.tick(dt, &input, &mut presentation);

        if session.state() != shown_state {
            shown_state = session.state();
            info!("animation state: {shown_state:?}");
            if shown_state == AnimationState::Idle {
                window.set_title(&idle_title);
            } else {
                window.set_title(TITLE);
            }
        }

        renderer.render(&session);
        window.update_with_buffer(renderer.color_buffer(), width, height)?;
    }

    session.shutdown();
    Ok(())
}

fn open_window(width: usize, height: usize) -> SceneResult<Window> {
    let mut window = Window::new(
        TITLE,
        width,
        height,
        WindowOptions {
            resize: false,
            scale: minifb::Scale::X1,
            ..WindowOptions::default()
        },
    )?;
    window.limit_update_rate(Some(Duration::from_micros(16_600)));
    Ok(window)
}

/// minifb cannot switch display modes once the window exists.
struct MinifbPresentation;

impl Presentation for MinifbPresentation {
    fn request_fullscreen(&mut self) -> SceneResult<()> {
        Err(SceneError::FullscreenUnavailable)
    }
}

/// Turns minifb's polled mouse state into per-frame clicks, drags and wheel steps.
#[derive(Default)]
struct PointerTracker {
    was_down: bool,
    last: Option<(f32, f32)>,
}

impl PointerTracker {
    fn sample(&mut self, window: &Window, width: usize, height: usize) -> FrameInput {
        let mut input = FrameInput {
            viewport_height: height as f32,
            ..FrameInput::default()
        };
        let position = window.get_mouse_pos(MouseMode::Discard);
        let down = window.get_mouse_down(MouseButton::Left);

        if let Some((x, y)) = position {
            if down && !self.was_down {
                input.click = Some(ndc_from_pixel(x, y, width as f32, height as f32));
            }
            if down && self.was_down {
                if let Some((last_x, last_y)) = self.last {
                    input.motion.drag = Vec2::new(x - last_x, y - last_y);
                }
            }
        }
        if let Some((_, scroll)) = window.get_scroll_wheel() {
            if scroll != 0.0 {
                input.motion.scroll = scroll.signum();
            }
        }

        self.was_down = down;
        self.last = position;
        input
    }
}
