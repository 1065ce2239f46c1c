use std::f32::consts::PI;

use glam::Vec3;
use log::info;

use crate::camera::{Camera, Ray, Sphere};
use crate::color::Color;
use crate::fade::{FadeRegistry, FadeRole};

/// Rates below were tuned against one update per display refresh at this rate.
pub const REFERENCE_TICK_HZ: f32 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    IntroPlaying,
    SteadyState,
}

#[derive(Clone, Copy, Debug)]
pub struct FlightPlan {
    /// Normalised progress gained per second.
    pub rate: f32,
    pub descend_end: f32,
    pub retreat_end: f32,
    pub finish: f32,
    pub retreat_z: f32,
    pub final_position: Vec3,
}

impl FlightPlan {
    pub const DEFAULT: Self = Self {
        rate: 0.00101 * REFERENCE_TICK_HZ,
        descend_end: 0.2,
        retreat_end: 0.75,
        finish: 1.15,
        retreat_z: 160.0,
        final_position: Vec3::new(-40.0, 100.0, 100.0),
    };
}

impl Default for FlightPlan {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Four-phase camera path: descend to the disk plane, pull back along z, then
/// an eased climb to the final pose.
#[derive(Clone, Copy, Debug)]
pub struct CameraFlight {
    plan: FlightPlan,
    start: Vec3,
    level: Vec3,
    retreat: Vec3,
    progress: f32,
}

impl CameraFlight {
    pub fn new(start: Vec3, plan: FlightPlan) -> Self {
        Self {
            plan,
            start,
            level: Vec3::new(start.x, 0.0, start.z),
            retreat: Vec3::new(start.x, 0.0, plan.retreat_z),
            progress: 0.0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.plan.finish
    }

    pub fn position_at(&self, progress: f32) -> Vec3 {
        let plan = &self.plan;
        if progress < plan.descend_end {
            let t = progress / plan.descend_end;
            self.start.lerp(self.level, t)
        } else if progress < plan.retreat_end {
            let t = (progress - plan.descend_end) / (plan.retreat_end - plan.descend_end);
            self.level.lerp(self.retreat, t)
        } else if progress < plan.finish {
            let t = (progress - plan.retreat_end) / (plan.finish - plan.retreat_end);
            let eased = 0.5 - 0.5 * (PI * t).cos();
            self.retreat.lerp(plan.final_position, eased)
        } else {
            plan.final_position
        }
    }

    pub fn advance(&mut self, dt: f32) -> Vec3 {
        self.progress += self.plan.rate * dt.max(0.0);
        self.position_at(self.progress)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FadePlan {
    pub idle_opacity: f32,
    /// Opacity gained per second once the intro has started.
    pub rate: f32,
}

impl FadePlan {
    pub const DEFAULT: Self = Self {
        idle_opacity: 0.1,
        rate: 0.025 * REFERENCE_TICK_HZ,
    };
}

impl Default for FadePlan {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug)]
pub struct AnimationDirector {
    state: AnimationState,
    plan: FlightPlan,
    fade_plan: FadePlan,
    flight: Option<CameraFlight>,
    fade: f32,
}

impl AnimationDirector {
    pub fn new(plan: FlightPlan, fade_plan: FadePlan) -> Self {
        Self {
            state: AnimationState::Idle,
            plan,
            fade_plan,
            flight: None,
            fade: fade_plan.idle_opacity,
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn fade(&self) -> f32 {
        self.fade
    }

    pub fn flight(&self) -> Option<&CameraFlight> {
        self.flight.as_ref()
    }

    /// `true` exactly once per session, for the first click that hits `central`.
    pub fn handle_click(&mut self, ray: &Ray, central: &Sphere, camera_position: Vec3) -> bool {
        if self.state != AnimationState::Idle || ray.intersect_sphere(central).is_none() {
            return false;
        }
        info!("intro started from {camera_position}");
        self.state = AnimationState::IntroPlaying;
        self.flight = Some(CameraFlight::new(camera_position, self.plan));
        true
    }

    /// Advances the fade and the flight. Returns the new state on a transition.
    pub fn update(&mut self, dt: f32, camera: &mut Camera) -> Option<AnimationState> {
        if self.state == AnimationState::Idle {
            self.fade = self.fade_plan.idle_opacity;
            return None;
        }
        if self.fade < 1.0 {
            self.fade = (self.fade + self.fade_plan.rate * dt.max(0.0)).min(1.0);
        }

        let flight = self.flight.as_mut()?;
        camera.position = flight.advance(dt);
        camera.target = Vec3::ZERO;
        if !flight.is_complete() {
            return None;
        }
        camera.position = self.plan.final_position;
        self.flight = None;
        self.state = AnimationState::SteadyState;
        info!("intro flight complete");
        Some(self.state)
    }

    pub fn apply_opacity_policy(&self, registry: &mut FadeRegistry) {
        let idle = self.state == AnimationState::Idle;
        for entry in registry.entries_mut() {
            let material = &mut entry.material;
            match (entry.role, idle) {
                (FadeRole::Participant, true) => {
                    material.opacity = self.fade_plan.idle_opacity;
                    material.transparent = true;
                }
                (FadeRole::Participant, false) => {
                    material.opacity = self.fade;
                    material.transparent = true;
                }
                (FadeRole::Pinned | FadeRole::Backdrop, _) => {
                    material.opacity = 1.0;
                    material.transparent = false;
                }
                (FadeRole::Hint, idle) => material.visible = idle,
            }
            if !idle || entry.role == FadeRole::Pinned {
                material.tint = Color::WHITE;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fade::{MaterialState, ObjectId};
    use pretty_assertions::assert_eq;

    fn central() -> Sphere {
        Sphere {
            center: Vec3::ZERO,
            radius: 10.0,
        }
    }

    fn aimed_at_centre(from: Vec3) -> Ray {
        Ray::new(from, -from)
    }

    #[test]
    fn flight_phase_boundaries() {
        let start = Vec3::new(0.0, 20.0, 30.0);
        let flight = CameraFlight::new(start, FlightPlan::DEFAULT);
        assert_eq!(flight.position_at(0.0), start);
        assert!((flight.position_at(0.1) - Vec3::new(0.0, 10.0, 30.0)).length() < 1e-4);
        assert!((flight.position_at(0.2) - Vec3::new(0.0, 0.0, 30.0)).length() < 1e-4);
        assert!((flight.position_at(0.75) - Vec3::new(0.0, 0.0, 160.0)).length() < 1e-3);
        // the last phase is eased, so its midpoint is exactly halfway
        let mid = flight.position_at(0.95);
        assert!((mid - Vec3::new(-20.0, 50.0, 130.0)).length() < 1e-2);
        assert_eq!(flight.position_at(2.0), Vec3::new(-40.0, 100.0, 100.0));
    }

    #[test]
    fn flight_duration_follows_wall_clock() {
        let mut flight = CameraFlight::new(Vec3::new(0.0, 20.0, 30.0), FlightPlan::DEFAULT);
        let seconds = 1.15 / FlightPlan::DEFAULT.rate;
        let mut elapsed = 0.0;
        while !flight.is_complete() {
            flight.advance(1.0 / 30.0);
            elapsed += 1.0 / 30.0;
        }
        assert!((elapsed - seconds).abs() <= 2.0 / 30.0);
    }

    #[test]
    fn intro_starts_once() {
        let mut director = AnimationDirector::new(FlightPlan::DEFAULT, FadePlan::DEFAULT);
        let eye = Vec3::new(0.0, 20.0, 30.0);
        assert!(director.handle_click(&aimed_at_centre(eye), &central(), eye));
        assert!(!director.handle_click(&aimed_at_centre(eye), &central(), eye));
        assert_eq!(director.state(), AnimationState::IntroPlaying);
    }

    #[test]
    fn missing_click_does_nothing() {
        let mut director = AnimationDirector::new(FlightPlan::DEFAULT, FadePlan::DEFAULT);
        let eye = Vec3::new(0.0, 20.0, 30.0);
        let away = Ray::new(eye, Vec3::Y);
        assert!(!director.handle_click(&away, &central(), eye));
        assert_eq!(director.state(), AnimationState::Idle);
        assert!(director.flight().is_none());
    }

    #[test]
    fn flight_ends_in_steady_state_at_final_pose() {
        let mut director = AnimationDirector::new(FlightPlan::DEFAULT, FadePlan::DEFAULT);
        let mut camera = Camera::new(Vec3::new(0.0, 20.0, 30.0), 1.0);
        let eye = camera.position;
        director.handle_click(&aimed_at_centre(eye), &central(), eye);

        let mut transitions = Vec::new();
        for _ in 0..2_000 {
            if let Some(state) = director.update(1.0 / 60.0, &mut camera) {
                transitions.push(state);
            }
        }
        assert_eq!(transitions, vec![AnimationState::SteadyState]);
        assert_eq!(camera.position, Vec3::new(-40.0, 100.0, 100.0));
        assert_eq!(camera.target, Vec3::ZERO);
        assert_eq!(director.fade(), 1.0);
        assert!(!director.handle_click(&aimed_at_centre(camera.position), &central(), camera.position));
    }

    fn registry() -> FadeRegistry {
        let mut registry = FadeRegistry::default();
        registry.register(ObjectId::Galaxy, FadeRole::Participant, MaterialState::OPAQUE);
        registry.register(ObjectId::TextRing(0), FadeRole::Pinned, MaterialState::translucent(0.5));
        registry.register(ObjectId::HintIcon, FadeRole::Hint, MaterialState::translucent(0.6));
        registry.register(ObjectId::StarField, FadeRole::Backdrop, MaterialState::translucent(0.7));
        registry
    }

    #[test]
    fn idle_policy_dims_participants_only() {
        let director = AnimationDirector::new(FlightPlan::DEFAULT, FadePlan::DEFAULT);
        let mut registry = registry();
        director.apply_opacity_policy(&mut registry);
        assert_eq!(registry.material(ObjectId::Galaxy).unwrap().opacity, 0.1);
        assert!(registry.material(ObjectId::Galaxy).unwrap().transparent);
        assert_eq!(registry.opacity(ObjectId::TextRing(0)), 1.0);
        assert_eq!(registry.opacity(ObjectId::HintIcon), 0.6);
        assert_eq!(registry.opacity(ObjectId::StarField), 1.0);
    }

    #[test]
    fn steady_policy_follows_fade_and_resets_tint() {
        let mut director = AnimationDirector::new(FlightPlan::DEFAULT, FadePlan::DEFAULT);
        let mut camera = Camera::new(Vec3::new(0.0, 20.0, 30.0), 1.0);
        let eye = camera.position;
        director.handle_click(&aimed_at_centre(eye), &central(), eye);
        director.update(0.1, &mut camera);

        let mut registry = registry();
        registry.material_mut(ObjectId::Galaxy).unwrap().tint = Color::new(1.0, 0.0, 0.0);
        director.apply_opacity_policy(&mut registry);

        let galaxy = registry.material(ObjectId::Galaxy).unwrap();
        assert!((galaxy.opacity - director.fade()).abs() < 1e-6);
        assert!(director.fade() > 0.1 && director.fade() < 1.0);
        assert_eq!(galaxy.tint, Color::WHITE);
        assert_eq!(registry.opacity(ObjectId::HintIcon), 0.0);
        assert_eq!(registry.opacity(ObjectId::TextRing(0)), 1.0);
        assert!(!registry.material(ObjectId::TextRing(0)).unwrap().transparent);
    }
}
