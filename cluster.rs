use glam::Vec3;
use log::debug;
use rand::Rng;

use crate::cloud::PointCloud;
use crate::color::Color;
use crate::galaxy::{gradient_color, spiral_sample, GalaxyParameters};
use crate::images::LoadedImage;
use crate::lod::{LodSwitch, Representation};

#[derive(Clone, Copy, Debug)]
pub struct ClusterBudget {
    /// Per-image budget with a single image.
    pub high: usize,
    /// Per-image budget from six images upwards.
    pub low: usize,
    /// Ceiling on the sum over all images.
    pub global_cap: usize,
}

impl ClusterBudget {
    pub const DEFAULT: Self = Self {
        high: 15_000,
        low: 4_000,
        global_cap: 100_000,
    };

    pub fn per_image(&self, image_count: usize) -> usize {
        let mut budget = match image_count {
            0 | 1 => self.high,
            n if n >= 6 => self.low,
            n => {
                let t = (n - 1) as f64 / 5.0;
                (self.high as f64 * (1.0 - t) + self.low as f64 * t).floor() as usize
            }
        };
        if image_count > 0 && budget * image_count > self.global_cap {
            budget = self.global_cap / image_count;
        }
        budget
    }
}

impl Default for ClusterBudget {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug)]
pub struct ImageCluster {
    source: String,
    budget: usize,
    near: PointCloud,
    far: PointCloud,
    centroid: Vec3,
    bounding_radius: f32,
    image: Option<LoadedImage>,
    lod: LodSwitch,
}

impl ImageCluster {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Points this cluster was allowed to sample, before core rejection.
    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    pub fn cloud(&self, representation: Representation) -> &PointCloud {
        match representation {
            Representation::Near => &self.near,
            Representation::Far => &self.far,
        }
    }

    pub fn representation(&self) -> Representation {
        self.lod.current()
    }

    pub fn is_presentable(&self) -> bool {
        self.image.is_some()
    }

    /// Returns the tint the near points take from the image.
    pub fn attach_image(&mut self, image: LoadedImage) -> Color {
        let tint = Color::lerp(Color::WHITE, image.mean_color, 0.5);
        self.image = Some(image);
        tint
    }

    pub fn update_lod(&mut self, camera: Vec3) -> Option<Representation> {
        let changed = self.lod.update(self.near.positions(), self.centroid, camera);
        if let Some(representation) = changed {
            debug!("cluster {} switched to {:?}", self.source, representation);
        }
        changed
    }
}

/// Every core sample is rejected. `None` when no sample survives.
pub fn generate_cluster<R: Rng + ?Sized>(
    source: &str,
    group: usize,
    budget: usize,
    params: &GalaxyParameters,
    lod: LodSwitch,
    rng: &mut R,
) -> Option<ImageCluster> {
    let mut far = PointCloud::with_capacity(budget);
    for i in 0..budget {
        let sample = spiral_sample(params, group * budget + i, rng);
        if sample.radius < params.inner_cutoff {
            continue;
        }
        far.push(sample.position, gradient_color(params, sample.radius, rng));
    }
    let centroid = far.centroid()?;
    far.translate(-centroid);

    let near: PointCloud = far.positions().iter().map(|p| (*p, Color::WHITE)).collect();
    let bounding_radius = near.bounding_radius();
    Some(ImageCluster {
        source: source.to_string(),
        budget,
        near,
        far,
        centroid,
        bounding_radius,
        image: None,
        lod,
    })
}
