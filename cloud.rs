use glam::Vec3;

use crate::color::Color;

/// Positions with exactly one colour per position.
///
/// Only generators build clouds; once handed to a scene object they are read-only.
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
    positions: Vec<Vec3>,
    colors: Vec<Color>,
}

impl PointCloud {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, position: Vec3, color: Color) {
        self.positions.push(position);
        self.colors.push(color);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn iter(&self) -> impl Iterator<Item = (Vec3, Color)> + '_ {
        self.positions.iter().copied().zip(self.colors.iter().copied())
    }

    /// Arithmetic mean of all positions, `None` for an empty cloud.
    pub fn centroid(&self) -> Option<Vec3> {
        if self.positions.is_empty() {
            return None;
        }
        let sum: Vec3 = self.positions.iter().copied().sum();
        Some(sum / self.positions.len() as f32)
    }

    pub fn translate(&mut self, offset: Vec3) {
        for position in &mut self.positions {
            *position += offset;
        }
    }

    pub fn bounding_radius(&self) -> f32 {
        self.positions
            .iter()
            .map(|p| p.length())
            .fold(0.0, f32::max)
    }
}

impl FromIterator<(Vec3, Color)> for PointCloud {
    fn from_iter<I: IntoIterator<Item = (Vec3, Color)>>(iter: I) -> Self {
        let mut cloud = PointCloud::default();
        for (position, color) in iter {
            cloud.push(position, color);
        }
        cloud
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_of_empty_cloud_is_none() {
        assert!(PointCloud::default().centroid().is_none());
    }

    #[test]
    fn centroid_is_mean_position() {
        let cloud: PointCloud = [
            (Vec3::new(2.0, 0.0, 0.0), Color::WHITE),
            (Vec3::new(0.0, 4.0, 0.0), Color::WHITE),
            (Vec3::new(1.0, 2.0, 6.0), Color::WHITE),
        ]
        .into_iter()
        .collect();
        let centroid = cloud.centroid().unwrap();
        assert!((centroid - Vec3::new(1.0, 2.0, 2.0)).length() < 1e-6);
        assert_eq!(cloud.iter().count(), 3);
    }
}
