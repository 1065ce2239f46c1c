use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

use crate::cloud::PointCloud;
use crate::color::Color;

#[derive(Clone, Copy, Debug)]
pub struct GalaxyParameters {
    pub count: usize,
    pub arms: u32,
    pub radius: f32,
    pub spin: f32,
    pub randomness: f32,
    /// Exponent applied to the uniform radius draw; high values push samples to the rim.
    pub randomness_power: f32,
    /// Samples closer than this to the centre belong to the core void.
    pub inner_cutoff: f32,
    /// Probability that a core sample is dropped.
    pub core_discard: f32,
    pub inside_color: Color,
    pub outside_color: Color,
    pub min_brightness: f32,
}

impl GalaxyParameters {
    pub const DEFAULT: Self = Self {
        count: 100_000,
        arms: 6,
        radius: 100.0,
        spin: 0.5,
        randomness: 0.2,
        randomness_power: 20.0,
        inner_cutoff: 30.0,
        core_discard: 0.7,
        inside_color: Color::from_hex(0xff66ff),
        outside_color: Color::from_hex(0x66ffff),
        min_brightness: 0.7,
    };

    pub const CLUSTER: Self = Self {
        inside_color: Color::from_hex(0xd63ed6),
        outside_color: Color::from_hex(0x48b8b8),
        ..Self::DEFAULT
    };
}

impl Default for GalaxyParameters {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SpiralSample {
    pub radius: f32,
    pub position: Vec3,
}

/// Vertical jitter is half the horizontal jitter.
pub fn spiral_sample<R: Rng + ?Sized>(
    params: &GalaxyParameters,
    index: usize,
    rng: &mut R,
) -> SpiralSample {
    let arms = params.arms.max(1) as usize;
    let radius = rng.random::<f32>().powf(params.randomness_power) * params.radius;
    let branch_angle = (index % arms) as f32 / arms as f32 * TAU;
    let spin_angle = radius * params.spin;
    let spread = params.randomness * radius;
    let jitter_x = (rng.random::<f32>() - 0.5) * spread;
    let jitter_y = (rng.random::<f32>() - 0.5) * spread * 0.5;
    let jitter_z = (rng.random::<f32>() - 0.5) * spread;
    let angle = branch_angle + spin_angle;
    SpiralSample {
        radius,
        position: Vec3::new(
            angle.cos() * radius + jitter_x,
            jitter_y,
            angle.sin() * radius + jitter_z,
        ),
    }
}

pub fn gradient_color<R: Rng + ?Sized>(params: &GalaxyParameters, radius: f32, rng: &mut R) -> Color {
    let t = if params.radius > 0.0 {
        radius / params.radius
    } else {
        0.0
    };
    let brightness = params.min_brightness + (1.0 - params.min_brightness) * rng.random::<f32>();
    Color::lerp(params.inside_color, params.outside_color, t) * brightness
}

/// Core samples are dropped with `core_discard` probability and not replaced.
/// If every draw was dropped the last one is kept, so a non-zero count never
/// yields an empty cloud.
pub fn generate_galaxy<R: Rng + ?Sized>(params: &GalaxyParameters, rng: &mut R) -> PointCloud {
    let mut cloud = PointCloud::with_capacity(params.count);
    let mut last_dropped = None;
    for index in 0..params.count {
        let sample = spiral_sample(params, index, rng);
        if sample.radius < params.inner_cutoff && rng.random::<f32>() < params.core_discard {
            last_dropped = Some(sample);
            continue;
        }
        let color = gradient_color(params, sample.radius, rng);
        cloud.push(sample.position, color);
    }
    if let (true, Some(sample)) = (cloud.is_empty(), last_dropped) {
        let color = gradient_color(params, sample.radius, rng);
        cloud.push(sample.position, color);
    }
    cloud
}

#[derive(Clone, Debug)]
pub struct StarField {
    cloud: PointCloud,
    draw_range: usize,
}

impl StarField {
    pub fn visible(&self) -> &[Vec3] {
        &self.cloud.positions()[..self.draw_range]
    }

    pub fn draw_range(&self) -> usize {
        self.draw_range
    }

    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    pub fn is_revealed(&self) -> bool {
        self.draw_range == self.cloud.len()
    }

    pub fn reveal_all(&mut self) {
        self.draw_range = self.cloud.len();
    }
}

pub fn generate_star_field<R: Rng + ?Sized>(
    count: usize,
    extent: f32,
    initial_fraction: f32,
    rng: &mut R,
) -> StarField {
    let cloud: PointCloud = (0..count)
        .map(|_| {
            let position = Vec3::new(
                (rng.random::<f32>() - 0.5) * extent,
                (rng.random::<f32>() - 0.5) * extent,
                (rng.random::<f32>() - 0.5) * extent,
            );
            (position, Color::WHITE)
        })
        .collect();
    let draw_range = ((count as f32 * initial_fraction.clamp(0.0, 1.0)) as usize).min(count);
    StarField { cloud, draw_range }
}

#[derive(Clone, Copy, Debug)]
pub struct Nebula {
    pub position: Vec3,
    pub color: Color,
    pub scale: f32,
}

pub fn generate_nebulae<R: Rng + ?Sized>(count: usize, spread: f32, rng: &mut R) -> Vec<Nebula> {
    (0..count)
        .map(|_| {
            let hue = rng.random::<f32>() * 360.0;
            Nebula {
                color: Color::from_hsl(hue, 0.8, 0.5),
                scale: 100.0,
                position: Vec3::new(
                    (rng.random::<f32>() - 0.5) * spread,
                    (rng.random::<f32>() - 0.5) * spread,
                    (rng.random::<f32>() - 0.5) * spread,
                ),
            }
        })
        .collect()
}
