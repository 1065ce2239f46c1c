use glam::Vec3;
use log::debug;
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicBezier {
    pub p0: Vec3,
    pub p1: Vec3,
    pub p2: Vec3,
    pub p3: Vec3,
}

impl CubicBezier {
    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// Point at parameter `t`, clamped to [0, 1].
    pub fn point(&self, t: f32) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        let it = 1.0 - t;
        let b0 = it * it * it;
        let b1 = 3.0 * it * it * t;
        let b2 = 3.0 * it * t * t;
        let b3 = t * t * t;
        self.p0 * b0 + self.p1 * b1 + self.p2 * b2 + self.p3 * b3
    }
}

fn spread<R: Rng + ?Sized>(rng: &mut R, half_width: f32) -> f32 {
    -half_width + rng.random::<f32>() * half_width * 2.0
}

pub fn random_curve<R: Rng + ?Sized>(rng: &mut R) -> CubicBezier {
    let start = Vec3::new(
        -200.0 + rng.random::<f32>() * 100.0,
        spread(rng, 100.0),
        spread(rng, 100.0),
    );
    let far_control = Vec3::new(
        600.0 + rng.random::<f32>() * 200.0,
        start.y + spread(rng, 100.0),
        start.z + spread(rng, 100.0),
    );
    let near_control = Vec3::new(
        start.x + 200.0 + rng.random::<f32>() * 100.0,
        start.y + spread(rng, 50.0),
        start.z + spread(rng, 50.0),
    );
    let end = Vec3::new(
        far_control.x - 200.0 + rng.random::<f32>() * 100.0,
        far_control.y + spread(rng, 50.0),
        far_control.z + spread(rng, 50.0),
    );
    CubicBezier::new(start, near_control, end, far_control)
}

#[derive(Clone, Copy, Debug)]
pub struct ShootingStarStyle {
    /// Soft cap on concurrently active stars.
    pub cap: usize,
    pub spawn_probability: f64,
    pub min_speed: f32,
    pub max_speed: f32,
    pub max_life: u32,
    /// Ticks spent fading in and fading out.
    pub fade_ticks: u32,
    pub trail_length: usize,
    pub trail_step: f32,
}

impl ShootingStarStyle {
    pub const DEFAULT: Self = Self {
        cap: 3,
        spawn_probability: 0.02,
        min_speed: 0.001,
        max_speed: 0.002,
        max_life: 300,
        fade_ticks: 30,
        trail_length: 100,
        trail_step: 0.01,
    };
}

impl Default for ShootingStarStyle {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Debug)]
pub struct Trajectory {
    curve: CubicBezier,
    speed: f32,
    steps: u32,
    trail: Vec<Vec3>,
    trail_step: f32,
}

impl Trajectory {
    pub fn new(curve: CubicBezier, speed: f32, trail_length: usize, trail_step: f32) -> Self {
        let mut trajectory = Self {
            curve,
            speed,
            steps: 0,
            trail: vec![curve.p0; trail_length.max(1)],
            trail_step,
        };
        trajectory.rebuild_trail();
        trajectory
    }

    pub fn progress(&self) -> f32 {
        self.steps as f32 * self.speed
    }

    pub fn head(&self) -> Vec3 {
        self.curve.point(self.progress())
    }

    pub fn trail(&self) -> &[Vec3] {
        &self.trail
    }

    /// Moves one step along the curve; `false` once the path is used up.
    pub fn advance(&mut self) -> bool {
        self.steps += 1;
        if self.progress() >= 1.0 {
            return false;
        }
        self.rebuild_trail();
        true
    }

    fn rebuild_trail(&mut self) {
        let progress = self.progress();
        for (j, point) in self.trail.iter_mut().enumerate() {
            let t = (progress - j as f32 * self.trail_step).max(0.0);
            *point = self.curve.point(t);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StarStatus {
    Active,
    Expired,
}

#[derive(Clone, Debug)]
pub struct ShootingStar {
    trajectory: Trajectory,
    life: u32,
    max_life: u32,
    fade_ticks: u32,
}

impl ShootingStar {
    pub fn new(curve: CubicBezier, speed: f32, style: &ShootingStarStyle) -> Self {
        Self {
            trajectory: Trajectory::new(curve, speed, style.trail_length, style.trail_step),
            life: 0,
            max_life: style.max_life,
            fade_ticks: style.fade_ticks.max(1),
        }
    }

    pub fn spawn<R: Rng + ?Sized>(style: &ShootingStarStyle, rng: &mut R) -> Self {
        let speed = if style.max_speed > style.min_speed {
            rng.random_range(style.min_speed..style.max_speed)
        } else {
            style.min_speed
        };
        Self::new(random_curve(rng), speed, style)
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Triangular ramp: fade in, hold, fade out towards `max_life`.
    ///
    /// Removal is driven by progress alone, so a slow star may linger at zero
    /// opacity for a few ticks after its fade-out.
    pub fn opacity(&self) -> f32 {
        let fade = self.fade_ticks as f32;
        if self.life < self.fade_ticks {
            self.life as f32 / fade
        } else if self.life > self.max_life.saturating_sub(self.fade_ticks) {
            (self.max_life as f32 - self.life as f32).max(0.0) / fade
        } else {
            1.0
        }
    }

    pub fn advance(&mut self) -> StarStatus {
        self.life += 1;
        if self.trajectory.advance() {
            StarStatus::Active
        } else {
            StarStatus::Expired
        }
    }
}

#[derive(Debug)]
pub struct ShootingStarField {
    style: ShootingStarStyle,
    stars: Vec<ShootingStar>,
}

impl ShootingStarField {
    pub fn new(style: ShootingStarStyle) -> Self {
        Self {
            style,
            stars: Vec::with_capacity(style.cap),
        }
    }

    pub fn stars(&self) -> &[ShootingStar] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn spawn<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let star = ShootingStar::spawn(&self.style, rng);
        self.stars.push(star);
        debug!("shooting star spawned, {} active", self.len());
    }

    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.stars.retain_mut(|star| star.advance() == StarStatus::Active);
        if self.stars.len() < self.style.cap && rng.random_bool(self.style.spawn_probability) {
            self.spawn(rng);
        }
    }
}
