//! One running scene: every piece of animated state plus the per-frame driver.

use glam::{Vec2, Vec3};
use log::{debug, info, warn};
use rand::Rng;

use crate::camera::{Camera, OrbitControls, PointerMotion, Sphere};
use crate::cloud::PointCloud;
use crate::cluster::{generate_cluster, ImageCluster};
use crate::config::SceneConfig;
use crate::director::{AnimationDirector, AnimationState};
use crate::error::SceneResult;
use crate::fade::{FadeRegistry, FadeRole, MaterialState, ObjectId};
use crate::galaxy::{generate_galaxy, generate_nebulae, generate_star_field, Nebula, StarField};
use crate::hint::{HintPose, HintPulse};
use crate::images::ImageLoader;
use crate::lod::LodSwitch;
use crate::rings::{layout_ring, GlyphAdvanceMeasure, TextRing};
use crate::trajectory::ShootingStarField;

/// Host capabilities the scene asks for but cannot rely on.
pub trait Presentation {
    fn request_fullscreen(&mut self) -> SceneResult<()>;
}

/// Pointer input gathered by the host for one frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    /// Click position in normalised device coordinates.
    pub click: Option<Vec2>,
    pub motion: PointerMotion,
    pub viewport_height: f32,
}

pub struct SceneSession<R: Rng> {
    config: SceneConfig,
    rng: R,
    camera: Camera,
    controls: OrbitControls,
    director: AnimationDirector,
    hint: HintPulse,
    hint_pose: HintPose,
    fade: FadeRegistry,
    central: Sphere,
    galaxy: PointCloud,
    star_field: StarField,
    nebulae: Vec<Nebula>,
    clusters: Vec<ImageCluster>,
    shooting_stars: ShootingStarField,
    rings: Vec<TextRing>,
    loader: ImageLoader,
    elapsed: f32,
    closed: bool,
}

impl<R: Rng> SceneSession<R> {
    /// Generates all geometry and starts loading the configured images.
    pub fn new(config: SceneConfig, mut rng: R) -> Self {
        let aspect = config.width as f32 / config.height.max(1) as f32;
        let camera = Camera::new(config.camera_start, aspect);
        let mut fade = FadeRegistry::default();
        let idle = MaterialState::translucent(config.fade.idle_opacity);

        fade.register(ObjectId::CentralObject, FadeRole::Pinned, MaterialState::OPAQUE);
        fade.register(ObjectId::CentralGlow, FadeRole::Pinned, MaterialState::OPAQUE);

        let galaxy = generate_galaxy(&config.galaxy, &mut rng);
        if galaxy.is_empty() {
            warn!("galaxy generation produced no points");
        } else {
            info!("galaxy generated with {} of {} points", galaxy.len(), config.galaxy.count);
        }
        fade.register(ObjectId::Galaxy, FadeRole::Participant, idle);

        let star_field = generate_star_field(
            config.star_count,
            config.star_extent,
            config.star_initial_fraction,
            &mut rng,
        );
        debug!("star field: {} of {} stars visible", star_field.draw_range(), star_field.len());
        fade.register(ObjectId::StarField, FadeRole::Backdrop, MaterialState::OPAQUE);

        let nebulae = generate_nebulae(config.nebula_count, config.nebula_spread, &mut rng);
        for index in 0..nebulae.len() {
            fade.register(ObjectId::Nebula(index), FadeRole::Participant, idle);
        }

        let image_count = config.image_sources.len();
        let budget = config.budget.per_image(image_count);
        info!("Number of images: {image_count}, points per image: {budget}");

        let mut loader = ImageLoader::new();
        let mut clusters = Vec::with_capacity(image_count);
        for (group, source) in config.image_sources.iter().enumerate() {
            let lod = LodSwitch::new(config.lod_distance, config.lod_exit_distance);
            let Some(cluster) = generate_cluster(source, group, budget, &config.cluster, lod, &mut rng)
            else {
                warn!("no points survived for image {source}, skipping it");
                continue;
            };
            if let Err(err) = loader.spawn(clusters.len(), source.clone()) {
                warn!("could not start loading {source}: {err}");
            }
            fade.register(ObjectId::Cluster(clusters.len()), FadeRole::Participant, idle);
            clusters.push(cluster);
        }

        let measure = GlyphAdvanceMeasure {
            font_size: config.rings.font_size,
        };
        let ring_count = config.ring_labels.len();
        let rings: Vec<TextRing> = config
            .ring_labels
            .iter()
            .enumerate()
            .map(|(index, label)| {
                let spec = layout_ring(label, config.rings.radius(index), &config.rings, &measure);
                debug!(
                    "ring {:?}: {} repeats over {:.0}px, {} glyphs, tiling {:.3}",
                    spec.text,
                    spec.repeat_count,
                    spec.circumference,
                    spec.repeated_text.chars().count(),
                    spec.tiling
                );
                TextRing::new(spec, config.rings, index, ring_count)
            })
            .collect();
        for index in 0..rings.len() {
            fade.register(ObjectId::TextRing(index), FadeRole::Pinned, MaterialState::OPAQUE);
        }

        let hint = HintPulse::default();
        fade.register(ObjectId::HintIcon, FadeRole::Hint, MaterialState::translucent(0.5));
        fade.register(ObjectId::HintLabel, FadeRole::Hint, MaterialState::translucent(0.7));

        let mut shooting_stars = ShootingStarField::new(config.shooting_stars);
        shooting_stars.spawn(&mut rng);

        let director = AnimationDirector::new(config.flight, config.fade);
        director.apply_opacity_policy(&mut fade);
        info!("scene ready with {} faded objects", fade.len());

        Self {
            central: Sphere {
                center: Vec3::ZERO,
                radius: config.central_radius,
            },
            hint_pose: hint.pose(),
            config,
            rng,
            camera,
            controls: OrbitControls::default(),
            director,
            hint,
            fade,
            galaxy,
            star_field,
            nebulae,
            clusters,
            shooting_stars,
            rings,
            loader,
            elapsed: 0.0,
            closed: false,
        }
    }

    /// Advances the scene by `dt` seconds.
    pub fn tick(&mut self, dt: f32, input: &FrameInput, presentation: &mut dyn Presentation) {
        if self.closed {
            return;
        }
        let dt = dt.max(0.0);
        self.elapsed += dt;

        self.attach_loaded_images();

        if self.director.state() == AnimationState::Idle {
            self.hint_pose = self.hint.advance(dt);
            if let Some(icon) = self.fade.material_mut(ObjectId::HintIcon) {
                icon.opacity = self.hint_pose.ring_opacity;
            }
            if let Some(label) = self.fade.material_mut(ObjectId::HintLabel) {
                label.opacity = self.hint_pose.label_opacity;
            }
        }

        if let Some(ndc) = input.click {
            self.handle_click(ndc, presentation);
        }

        if self.director.update(dt, &mut self.camera) == Some(AnimationState::SteadyState) {
            debug!("orbit controls enabled, fade at {:.2}", self.director.fade());
            self.controls.enabled = true;
        }
        if self.director.flight().is_none() {
            self.controls
                .update(&mut self.camera, dt, input.motion, input.viewport_height);
        }

        self.director.apply_opacity_policy(&mut self.fade);

        let eye = self.camera.position;
        for cluster in self.clusters.iter_mut().filter(|c| c.is_presentable()) {
            cluster.update_lod(eye);
        }

        self.shooting_stars.tick(&mut self.rng);

        for (index, ring) in self.rings.iter_mut().enumerate() {
            ring.update(dt, eye);
            if let Some(material) = self.fade.material_mut(ObjectId::TextRing(index)) {
                material.opacity = ring.shimmer();
            }
        }
    }

    fn attach_loaded_images(&mut self) {
        for outcome in self.loader.drain() {
            match (outcome.result, self.clusters.get_mut(outcome.group)) {
                (Ok(image), Some(cluster)) => {
                    info!("loaded {} ({}x{})", outcome.source, image.width, image.height);
                    let tint = cluster.attach_image(image);
                    if let Some(material) = self.fade.material_mut(ObjectId::Cluster(outcome.group)) {
                        material.tint = tint;
                    }
                }
                (Ok(_), None) => debug!("dropping image for unknown cluster {}", outcome.group),
                (Err(err), _) => warn!("image {} not shown: {err}", outcome.source),
            }
        }
    }

    fn handle_click(&mut self, ndc: Vec2, presentation: &mut dyn Presentation) {
        let ray = self.camera.ray_from_ndc(ndc);
        match self.director.state() {
            AnimationState::Idle => {
                if !self.director.handle_click(&ray, &self.central, self.camera.position) {
                    return;
                }
                if let Err(err) = presentation.request_fullscreen() {
                    warn!("continuing without fullscreen: {err}");
                }
                self.controls.enabled = false;
                if !self.star_field.is_revealed() {
                    self.star_field.reveal_all();
                    debug!("star field revealed, {} stars", self.star_field.len());
                }
            }
            AnimationState::SteadyState => {
                let focus = self
                    .clusters
                    .iter()
                    .filter(|cluster| cluster.is_presentable())
                    .filter_map(|cluster| {
                        let bounds = Sphere {
                            center: cluster.centroid(),
                            radius: cluster.bounding_radius(),
                        };
                        ray.intersect_sphere(&bounds).map(|distance| (distance, cluster))
                    })
                    .min_by(|a, b| a.0.total_cmp(&b.0));
                if let Some((_, cluster)) = focus {
                    info!("focusing {}", cluster.source());
                    self.controls.target = cluster.centroid();
                }
            }
            AnimationState::IntroPlaying => {}
        }
    }

    /// Cancels outstanding image loads. Later ticks do nothing.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        let pending = self.loader.pending();
        self.loader.shutdown();
        self.closed = true;
        info!("scene session closed after {:.1}s, {pending} image loads cancelled", self.elapsed);
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn state(&self) -> AnimationState {
        self.director.state()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn fade(&self) -> &FadeRegistry {
        &self.fade
    }

    pub fn central(&self) -> &Sphere {
        &self.central
    }

    pub fn galaxy(&self) -> &PointCloud {
        &self.galaxy
    }

    pub fn star_field(&self) -> &StarField {
        &self.star_field
    }

    pub fn nebulae(&self) -> &[Nebula] {
        &self.nebulae
    }

    pub fn clusters(&self) -> &[ImageCluster] {
        &self.clusters
    }

    pub fn shooting_stars(&self) -> &ShootingStarField {
        &self.shooting_stars
    }

    pub fn rings(&self) -> &[TextRing] {
        &self.rings
    }

    pub fn hint_pose(&self) -> &HintPose {
        &self.hint_pose
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}
