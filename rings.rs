use std::f32::consts::{PI, TAU};

use glam::{EulerRot, Mat4, Vec3};

use crate::director::REFERENCE_TICK_HZ;

pub trait TextMeasure {
    fn advance(&self, ch: char) -> f32;

    fn width(&self, text: &str) -> f32 {
        text.chars().map(|ch| self.advance(ch)).sum()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GlyphAdvanceMeasure {
    pub font_size: f32,
}

impl GlyphAdvanceMeasure {
    fn is_cjk(ch: char) -> bool {
        matches!(ch as u32,
            0x4E00..=0x9FFF | 0x3040..=0x309F | 0x30A0..=0x30FF | 0xAC00..=0xD7AF)
    }
}

impl TextMeasure for GlyphAdvanceMeasure {
    fn advance(&self, ch: char) -> f32 {
        let em = if Self::is_cjk(ch) {
            1.0
        } else if ch.is_ascii() {
            0.6
        } else {
            0.9
        };
        em * self.font_size
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RingStyle {
    pub font_size: f32,
    pub padding: &'static str,
    pub base_radius: f32,
    pub radius_step: f32,
    /// Texture pixels per world unit of circumference.
    pub circumference_scale: f32,
    pub height: f32,
    /// Orbit speed in radians per second.
    pub orbit_speed: f32,
    pub initial_angle: f32,
    pub tilt_amplitude: f32,
    pub roll_amplitude: f32,
    pub pitch_amplitude: f32,
    pub tilt_phase: f32,
    pub roll_phase: f32,
    pub pitch_phase: f32,
    pub tilt_speed: f32,
    pub roll_speed: f32,
    pub pitch_speed: f32,
    pub bob_amplitude: f32,
}

impl RingStyle {
    pub const DEFAULT: Self = Self {
        font_size: 180.0,
        padding: "   ",
        base_radius: 11.0,
        radius_step: 5.0,
        circumference_scale: 180.0,
        height: 1.0,
        orbit_speed: 0.008 * REFERENCE_TICK_HZ,
        initial_angle: 0.15 * PI * 0.5,
        tilt_amplitude: PI / 3.0,
        roll_amplitude: PI / 6.0,
        pitch_amplitude: PI / 8.0,
        tilt_phase: TAU,
        roll_phase: TAU,
        pitch_phase: TAU,
        tilt_speed: 0.0,
        roll_speed: 0.0,
        pitch_speed: 0.0,
        bob_amplitude: 0.3,
    };

    pub fn radius(&self, index: usize) -> f32 {
        self.base_radius + self.radius_step * index as f32
    }
}

impl Default for RingStyle {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphSpan {
    pub ch: char,
    pub start: f32,
    pub width: f32,
}

#[derive(Clone, Debug)]
pub struct RingSpec {
    pub text: String,
    pub radius: f32,
    pub repeated_text: String,
    pub repeat_count: usize,
    pub circumference: f32,
    pub tiled_width: f32,
    /// Texture repeats across the cylinder, `tiled_width / circumference`.
    pub tiling: f32,
    unit_width: f32,
    glyphs: Vec<GlyphSpan>,
}

impl RingSpec {
    pub fn glyph_at(&self, u: f32) -> Option<char> {
        if self.unit_width <= 0.0 || self.tiled_width <= 0.0 {
            return None;
        }
        let strip = (u * self.tiling).rem_euclid(1.0) * self.tiled_width;
        let offset = strip.rem_euclid(self.unit_width);
        self.glyphs
            .iter()
            .find(|glyph| offset >= glyph.start && offset < glyph.start + glyph.width)
            .map(|glyph| glyph.ch)
            .filter(|ch| !ch.is_whitespace())
    }
}

/// Empty or zero-width labels fall back to one untiled copy, tiling 1.
pub fn layout_ring(label: &str, radius: f32, style: &RingStyle, measure: &dyn TextMeasure) -> RingSpec {
    let unit = format!("{label}{}", style.padding);
    let unit_width = measure.width(&unit);
    let circumference = TAU * radius * style.circumference_scale;

    let mut glyphs = Vec::with_capacity(unit.chars().count());
    let mut cursor = 0.0;
    for ch in unit.chars() {
        let width = measure.advance(ch);
        glyphs.push(GlyphSpan { ch, start: cursor, width });
        cursor += width;
    }

    let repeat_count = if unit_width > 0.0 {
        (circumference / unit_width).ceil() as usize
    } else {
        0
    };
    let tiled_width = unit_width * repeat_count as f32;

    if label.is_empty() || repeat_count == 0 || tiled_width.round() < 1.0 {
        return RingSpec {
            text: label.to_owned(),
            radius,
            repeated_text: unit,
            repeat_count: 1,
            circumference,
            tiled_width: unit_width.max(0.0),
            tiling: 1.0,
            unit_width,
            glyphs,
        };
    }

    RingSpec {
        text: label.to_owned(),
        radius,
        repeated_text: unit.repeat(repeat_count),
        repeat_count,
        circumference,
        tiled_width,
        tiling: tiled_width / circumference,
        unit_width,
        glyphs,
    }
}

#[derive(Clone, Debug)]
pub struct TextRing {
    spec: RingSpec,
    style: RingStyle,
    index: usize,
    count: usize,
    angle_offset: f32,
    elapsed: f32,
    rotation: Vec3,
    vertical_offset: f32,
    billboard_yaw: f32,
    shimmer: f32,
}

impl TextRing {
    pub fn new(spec: RingSpec, style: RingStyle, index: usize, count: usize) -> Self {
        let mut ring = Self {
            spec,
            style,
            index,
            count: count.max(1),
            angle_offset: style.initial_angle,
            elapsed: 0.0,
            rotation: Vec3::ZERO,
            vertical_offset: 0.0,
            billboard_yaw: PI / 2.0,
            shimmer: 1.0,
        };
        ring.apply_wobble();
        ring
    }

    pub fn shimmer(&self) -> f32 {
        self.shimmer
    }

    pub fn billboard_yaw(&self) -> f32 {
        self.billboard_yaw
    }

    pub fn update(&mut self, dt: f32, camera: Vec3) {
        let dt = dt.max(0.0);
        self.elapsed += dt;
        self.angle_offset += self.style.orbit_speed * dt;
        self.apply_wobble();
        self.shimmer = 0.7 + 0.3 * ((1.5 * self.elapsed + self.index as f32).sin() + 1.0) / 2.0;

        let centre = self.group_transform().transform_point3(Vec3::ZERO);
        let direction = (camera - centre).normalize_or_zero();
        self.billboard_yaw = direction.x.atan2(direction.z);
    }

    fn apply_wobble(&mut self) {
        let s = &self.style;
        let t = self.elapsed;
        let tilt = (t * s.tilt_speed + s.tilt_phase).sin() * s.tilt_amplitude;
        let roll = (t * s.roll_speed + s.roll_phase).cos() * s.roll_amplitude;
        let pitch = (t * s.pitch_speed + s.pitch_phase).sin() * s.pitch_amplitude;
        let base_pitch = self.index as f32 / self.count as f32 * PI;
        self.rotation = Vec3::new(base_pitch + tilt, self.angle_offset + pitch, roll);
        self.vertical_offset = (t * s.tilt_speed * 0.7 + s.tilt_phase).sin() * s.bob_amplitude;
    }

    pub fn group_transform(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, self.vertical_offset, 0.0))
            * Mat4::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn world_transform(&self) -> Mat4 {
        self.group_transform() * Mat4::from_rotation_y(self.billboard_yaw)
    }

    /// World-space vertical strokes where glyphs cover the cylinder, sampled at
    /// `samples` angles.
    pub fn glyph_strokes(&self, samples: usize) -> Vec<(Vec3, Vec3)> {
        let transform = self.world_transform();
        let radius = self.spec.radius;
        let half = self.style.height * 0.5;
        (0..samples)
            .filter_map(|i| {
                let u = i as f32 / samples as f32;
                self.spec.glyph_at(u)?;
                let theta = u * TAU;
                let x = radius * theta.sin();
                let z = radius * theta.cos();
                Some((
                    transform.transform_point3(Vec3::new(x, -half, z)),
                    transform.transform_point3(Vec3::new(x, half, z)),
                ))
            })
            .collect()
    }
}
