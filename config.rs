//! Command-line arguments and the scene configuration they produce.

use clap::Parser;
use glam::Vec3;
use log::warn;

use crate::cluster::ClusterBudget;
use crate::director::{FadePlan, FlightPlan};
use crate::galaxy::GalaxyParameters;
use crate::images::{decode_image_list, image_list_from_query, split_image_list};
use crate::rings::RingStyle;
use crate::trajectory::ShootingStarStyle;

#[derive(Parser, Debug)]
#[command(name = "galaxy-scene", version, about = "Animated galaxy scene with image clusters")]
pub struct Args {
    /// Window width in pixels
    #[arg(long, default_value_t = 960)]
    pub width: usize,

    /// Window height in pixels
    #[arg(long, default_value_t = 540)]
    pub height: usize,

    /// Encoded image list (Base64 of a comma separated list, may be percent-escaped)
    #[arg(long, conflicts_with_all = ["query", "images"])]
    pub id: Option<String>,

    /// Query string carrying the encoded image list in its `id` parameter
    #[arg(long, conflicts_with = "images")]
    pub query: Option<String>,

    /// Plain comma separated list of image paths
    #[arg(long)]
    pub images: Option<String>,

    /// Label for an orbiting text ring (repeat for more rings)
    #[arg(long = "ring-text")]
    pub ring_text: Vec<String>,

    /// Distance at which a near cluster switches back to far (defaults to the
    /// switch-in distance)
    #[arg(long)]
    pub lod_exit_distance: Option<f32>,
}

impl Args {
    /// Image sources named on the command line. Undecodable input yields none.
    pub fn image_sources(&self) -> Vec<String> {
        let decoded = if let Some(id) = &self.id {
            decode_image_list(id)
        } else if let Some(query) = &self.query {
            image_list_from_query(query)
        } else if let Some(images) = &self.images {
            Ok(split_image_list(images))
        } else {
            Ok(Vec::new())
        };
        decoded.unwrap_or_else(|err| {
            warn!("ignoring image list: {err}");
            Vec::new()
        })
    }

    pub fn into_config(self) -> SceneConfig {
        let defaults = SceneConfig::default();
        let image_sources = self.image_sources();
        let lod_exit_distance = self
            .lod_exit_distance
            .unwrap_or(defaults.lod_distance)
            .max(defaults.lod_distance);
        let ring_labels = if self.ring_text.is_empty() {
            defaults.ring_labels.clone()
        } else {
            self.ring_text
        };
        SceneConfig {
            width: self.width.max(1),
            height: self.height.max(1),
            image_sources,
            ring_labels,
            lod_exit_distance,
            ..defaults
        }
    }
}

/// Every tunable of a scene session.
#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub width: usize,
    pub height: usize,
    pub image_sources: Vec<String>,
    pub ring_labels: Vec<String>,
    pub hint_label: String,
    pub galaxy: GalaxyParameters,
    pub cluster: GalaxyParameters,
    pub budget: ClusterBudget,
    pub lod_distance: f32,
    pub lod_exit_distance: f32,
    pub star_count: usize,
    pub star_extent: f32,
    pub star_initial_fraction: f32,
    pub nebula_count: usize,
    pub nebula_spread: f32,
    pub central_radius: f32,
    pub central_glow_scale: f32,
    pub central_glow_opacity: f32,
    pub camera_start: Vec3,
    pub fog_density: f32,
    pub flight: FlightPlan,
    pub fade: FadePlan,
    pub shooting_stars: ShootingStarStyle,
    pub rings: RingStyle,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 540,
            image_sources: Vec::new(),
            ring_labels: vec!["Hello, galaxy ❤".to_owned()],
            hint_label: "Click the planet".to_owned(),
            galaxy: GalaxyParameters::DEFAULT,
            cluster: GalaxyParameters::CLUSTER,
            budget: ClusterBudget::DEFAULT,
            lod_distance: 10.0,
            lod_exit_distance: 10.0,
            star_count: 20_000,
            star_extent: 900.0,
            star_initial_fraction: 0.1,
            nebula_count: 15,
            nebula_spread: 175.0,
            central_radius: 10.0,
            central_glow_scale: 8.0,
            central_glow_opacity: 0.25,
            camera_start: Vec3::new(0.0, 20.0, 30.0),
            fog_density: 0.0015,
            flight: FlightPlan::DEFAULT,
            fade: FadePlan::DEFAULT,
            shooting_stars: ShootingStarStyle::DEFAULT,
            rings: RingStyle::DEFAULT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("galaxy-scene").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_the_scene_constants() {
        let config = parse(&[]).into_config();
        assert_eq!((config.width, config.height), (960, 540));
        assert!(config.image_sources.is_empty());
        assert_eq!(config.ring_labels.len(), 1);
        assert_eq!(config.lod_exit_distance, config.lod_distance);
    }

    #[test]
    fn encoded_id_is_decoded() {
        let id = base64::engine::general_purpose::STANDARD.encode("a.png, b.png");
        let config = parse(&["--id", &id]).into_config();
        assert_eq!(config.image_sources, vec!["a.png", "b.png"]);
    }

    #[test]
    fn undecodable_id_degrades_to_no_images() {
        let config = parse(&["--id", "***"]).into_config();
        assert!(config.image_sources.is_empty());
    }

    #[test]
    fn ring_labels_and_hysteresis() {
        let config = parse(&[
            "--images", "x.png,,y.png",
            "--ring-text", "one",
            "--ring-text", "two",
            "--lod-exit-distance", "4",
        ])
        .into_config();
        assert_eq!(config.image_sources, vec!["x.png", "y.png"]);
        assert_eq!(config.ring_labels, vec!["one", "two"]);
        assert_eq!(config.lod_exit_distance, 10.0);
    }

    #[test]
    fn conflicting_sources_are_rejected() {
        let result = Args::try_parse_from(["galaxy-scene", "--id", "x", "--images", "a.png"]);
        assert!(result.is_err());
    }
}
