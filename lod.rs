use glam::Vec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Representation {
    Near,
    Far,
}

/// Near iff any point, offset by `origin`, lies strictly within `threshold` of the camera.
pub fn select_representation(
    points: &[Vec3],
    origin: Vec3,
    camera: Vec3,
    threshold: f32,
) -> Representation {
    let threshold_sq = threshold * threshold;
    let near = points
        .iter()
        .any(|p| (*p + origin).distance_squared(camera) < threshold_sq);
    if near {
        Representation::Near
    } else {
        Representation::Far
    }
}

/// With `exit_distance == enter_distance` this is the plain threshold rule.
/// A larger exit distance keeps a cluster near until the camera backs off past it.
#[derive(Clone, Copy, Debug)]
pub struct LodSwitch {
    enter_distance: f32,
    exit_distance: f32,
    current: Representation,
}

impl LodSwitch {
    pub fn new(enter_distance: f32, exit_distance: f32) -> Self {
        Self {
            enter_distance,
            exit_distance: exit_distance.max(enter_distance),
            current: Representation::Far,
        }
    }

    pub fn current(&self) -> Representation {
        self.current
    }

    /// Returns the new representation only when it differs from the last frame's.
    pub fn update(&mut self, points: &[Vec3], origin: Vec3, camera: Vec3) -> Option<Representation> {
        let threshold = match self.current {
            Representation::Near => self.exit_distance,
            Representation::Far => self.enter_distance,
        };
        let selected = select_representation(points, origin, camera, threshold);
        if selected == self.current {
            return None;
        }
        self.current = selected;
        Some(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tiny_cluster() -> Vec<Vec3> {
        vec![
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::new(0.0, 0.5, 0.0),
        ]
    }

    #[test]
    fn selection_depends_only_on_distance() {
        let points = tiny_cluster();
        let origin = Vec3::new(40.0, 0.0, 0.0);
        assert_eq!(
            select_representation(&points, origin, origin + Vec3::Z * 5.0, 10.0),
            Representation::Near
        );
        assert_eq!(
            select_representation(&points, origin, origin + Vec3::Z * 50.0, 10.0),
            Representation::Far
        );
    }

    #[test]
    fn moving_away_flips_exactly_once() {
        let points = tiny_cluster();
        let origin = Vec3::new(0.0, 0.0, -20.0);
        let mut lod = LodSwitch::new(10.0, 10.0);
        assert_eq!(lod.update(&points, origin, origin + Vec3::Z * 5.0), Some(Representation::Near));

        let mut changes = Vec::new();
        let mut distance = 5.0;
        while distance <= 50.0 {
            if let Some(change) = lod.update(&points, origin, origin + Vec3::Z * distance) {
                changes.push(change);
            }
            distance += 0.5;
        }
        assert_eq!(changes, vec![Representation::Far]);
    }

    #[test]
    fn motion_inside_one_zone_changes_nothing() {
        let points = tiny_cluster();
        let mut lod = LodSwitch::new(10.0, 10.0);
        for step in 0..40 {
            let camera = Vec3::new(30.0 + step as f32, 5.0, 0.0);
            assert_eq!(lod.update(&points, Vec3::ZERO, camera), None);
        }
        assert_eq!(lod.current(), Representation::Far);
    }

    #[test]
    fn hysteresis_suppresses_boundary_flicker() {
        let points = vec![Vec3::ZERO];
        let mut plain = LodSwitch::new(10.0, 10.0);
        let mut banded = LodSwitch::new(10.0, 12.0);
        let mut plain_changes = 0;
        let mut banded_changes = 0;
        for step in 0..20 {
            let distance = if step % 2 == 0 { 9.9 } else { 10.1 };
            let camera = Vec3::new(distance, 0.0, 0.0);
            plain_changes += plain.update(&points, Vec3::ZERO, camera).is_some() as usize;
            banded_changes += banded.update(&points, Vec3::ZERO, camera).is_some() as usize;
        }
        assert_eq!(plain_changes, 20);
        assert_eq!(banded_changes, 1);
    }
}
