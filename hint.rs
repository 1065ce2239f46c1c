use glam::Vec3;

/// Pulsing "press here" affordance shown while the scene is idle.
#[derive(Clone, Copy, Debug)]
pub struct HintPulse {
    anchor: Vec3,
    facing: Vec3,
    elapsed: f32,
}

/// Everything the renderer needs to draw the hint for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HintPose {
    pub icon_position: Vec3,
    pub facing: Vec3,
    pub ring_scale: f32,
    pub ring_opacity: f32,
    pub label_opacity: f32,
    pub label_height: f32,
}

impl HintPulse {
    pub const ANCHOR: Vec3 = Vec3::new(1.5, 1.5, 15.0);

    /// An icon at `anchor` facing `look_at`.
    pub fn new(anchor: Vec3, look_at: Vec3) -> Self {
        Self {
            anchor,
            facing: (look_at - anchor).normalize_or_zero(),
            elapsed: 0.0,
        }
    }

    pub fn advance(&mut self, dt: f32) -> HintPose {
        self.elapsed += dt.max(0.0);
        self.pose()
    }

    pub fn pose(&self) -> HintPose {
        let t = self.elapsed;
        let beat = (2.5 * t).sin();
        HintPose {
            icon_position: self.anchor - self.facing * (beat * 1.5),
            facing: self.facing,
            ring_scale: 1.0 + 0.1 * beat,
            ring_opacity: 0.5 + 0.2 * beat,
            label_opacity: 0.7 + 0.3 * (3.0 * t).sin(),
            label_height: 15.0 + 0.5 * (2.0 * t).sin(),
        }
    }
}

impl Default for HintPulse {
    fn default() -> Self {
        Self::new(Self::ANCHOR, Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn rest_pose_sits_on_the_anchor() {
        let pose = HintPulse::default().pose();
        assert_eq!(pose.icon_position, HintPulse::ANCHOR);
        assert_eq!(pose.ring_scale, 1.0);
        assert_eq!(pose.label_height, 15.0);
    }

    #[test]
    fn bob_backs_away_from_the_planet_on_the_upbeat() {
        let mut hint = HintPulse::default();
        let pose = hint.advance(PI / 5.0);
        let offset = pose.icon_position - HintPulse::ANCHOR;
        assert!((offset.length() - 1.5).abs() < 1e-4);
        assert!(offset.normalize().dot(pose.facing) < -0.999);
        assert!(pose.icon_position.length() > HintPulse::ANCHOR.length());
        assert!((pose.ring_scale - 1.1).abs() < 1e-5);
        assert!((pose.ring_opacity - 0.7).abs() < 1e-5);
    }

    #[test]
    fn pulses_stay_in_range() {
        let mut hint = HintPulse::default();
        for _ in 0..600 {
            let pose = hint.advance(1.0 / 60.0);
            assert!((0.399..=1.001).contains(&pose.label_opacity));
            assert!((0.299..=0.701).contains(&pose.ring_opacity));
            assert!((14.499..=15.501).contains(&pose.label_height));
        }
    }
}
