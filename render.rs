//! Software renderer for the scene: additive point splats, polylines and a
//! rasterised central planet.

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec2, Vec3, Vec4};
use rand::Rng;

use crate::cluster::ImageCluster;
use crate::color::Color;
use crate::fade::ObjectId;
use crate::lod::Representation;
use crate::session::SceneSession;

const MAX_GLOW_RADIUS: f32 = 160.0;
const RING_SAMPLES: usize = 384;

const PLANET_STOPS: [(f32, u32); 8] = [
    (0.0, 0xf8bbd0),
    (0.12, 0xf48fb1),
    (0.22, 0xf06292),
    (0.35, 0xffffff),
    (0.5, 0xe1aaff),
    (0.62, 0xa259f7),
    (0.75, 0xb2ff59),
    (1.0, 0x3fd8c7),
];

const TRAIL_COLOR: Color = Color::from_hex(0x99eaff);
const HINT_COLOR: Color = Color::from_hex(0xffb3de);

#[derive(Clone, Copy, Debug)]
struct Projected {
    screen: Vec2,
    depth: f32,
    /// Distance along the view axis.
    distance: f32,
}

pub struct Renderer {
    width: usize,
    height: usize,
    color: Vec<u32>,
    depth: Vec<f32>,
    fog_density: f32,
    planet: Mesh,
}

impl Renderer {
    pub fn new(width: usize, height: usize, fog_density: f32) -> Self {
        Self {
            width,
            height,
            color: vec![0; width * height],
            depth: vec![f32::INFINITY; width * height],
            fog_density,
            planet: Mesh::uv_sphere(48, 24),
        }
    }

    pub fn color_buffer(&self) -> &[u32] {
        &self.color
    }

    fn begin_frame(&mut self) {
        self.color.fill(Color::BLACK.to_u32());
        self.depth.fill(f32::INFINITY);
    }

    pub fn render<R: Rng>(&mut self, scene: &SceneSession<R>) {
        self.begin_frame();
        let camera = scene.camera();
        let vp = camera.view_projection();
        let focal = self.height as f32 * 0.5 / (camera.fov_y * 0.5).tan();
        let fade = scene.fade();
        let config = scene.config();

        let stars = fade.opacity(ObjectId::StarField);
        for position in scene.star_field().visible() {
            self.draw_point(*position, &vp, focal, 0.7, Color::WHITE * (0.7 * stars));
        }

        for (index, nebula) in scene.nebulae().iter().enumerate() {
            let opacity = fade.opacity(ObjectId::Nebula(index)) * 0.6;
            self.draw_glow(nebula.position, &vp, focal, nebula.scale, nebula.color * opacity);
        }

        let galaxy = fade.opacity(ObjectId::Galaxy);
        for (position, color) in scene.galaxy().iter() {
            self.draw_point(position, &vp, focal, 0.35, color * galaxy);
        }

        let planet = Mat4::from_translation(scene.central().center)
            * facing(scene.central().center, camera.position)
            * Mat4::from_scale(Vec3::splat(scene.central().radius));
        self.draw_planet(&planet, &vp, camera.position, scene.elapsed() * 0.5);

        let glow = fade.opacity(ObjectId::CentralGlow) * config.central_glow_opacity;
        self.draw_glow(
            scene.central().center,
            &vp,
            focal,
            config.central_glow_scale,
            Color::WHITE * (0.8 * glow),
        );

        for (index, cluster) in scene.clusters().iter().enumerate() {
            if !cluster.is_presentable() {
                continue;
            }
            let id = ObjectId::Cluster(index);
            self.draw_cluster(cluster, fade.opacity(id), fade.tint(id), &vp, focal);
        }

        for (index, ring) in scene.rings().iter().enumerate() {
            let color = Color::WHITE * fade.opacity(ObjectId::TextRing(index));
            for (bottom, top) in ring.glyph_strokes(RING_SAMPLES) {
                self.draw_segment(bottom, top, &vp, color);
            }
        }

        for star in scene.shooting_stars().stars() {
            let opacity = star.opacity();
            let trail = star.trajectory().trail();
            let trail_color = TRAIL_COLOR * (0.7 * opacity);
            for pair in trail.windows(2) {
                self.draw_segment(pair[0], pair[1], &vp, trail_color);
            }
            self.draw_glow(star.trajectory().head(), &vp, focal, 3.0, Color::WHITE * opacity);
        }

        self.draw_hint(scene, &vp);
    }

    fn draw_hint<R: Rng>(&mut self, scene: &SceneSession<R>, vp: &Mat4) {
        let fade = scene.fade();
        let icon = fade.opacity(ObjectId::HintIcon);
        let label = fade.opacity(ObjectId::HintLabel);
        if icon <= 0.0 && label <= 0.0 {
            return;
        }
        let pose = scene.hint_pose();
        let side = pose.facing.cross(Vec3::Y).normalize_or_zero();
        let up = side.cross(pose.facing);
        let radius = 1.9 * pose.ring_scale;
        let ring_color = HINT_COLOR * icon;
        let circle: Vec<Vec3> = (0..=32)
            .map(|i| {
                let angle = i as f32 / 32.0 * TAU;
                pose.icon_position + (side * angle.cos() + up * angle.sin()) * radius
            })
            .collect();
        for pair in circle.windows(2) {
            self.draw_segment(pair[0], pair[1], vp, ring_color);
        }
        let tip = pose.icon_position;
        let tail = tip - up * 2.5;
        self.draw_segment(tail, tip, vp, Color::WHITE * icon);
        self.draw_segment(tip, tip - up * 0.8 + side * 0.6, vp, Color::WHITE * icon);
        self.draw_segment(tip, tip - up * 0.8 - side * 0.6, vp, Color::WHITE * icon);

        let centre = Vec3::new(0.0, pose.label_height, 0.0);
        self.draw_segment(centre - side * 8.0, centre + side * 8.0, vp, Color::WHITE * label);
    }

    fn project_point(&self, position: Vec3, vp: &Mat4) -> Option<Projected> {
        let clip = *vp * position.extend(1.0);
        if clip.w < 0.001 {
            return None;
        }
        let inv_w = 1.0 / clip.w;
        let ndc_z = clip.z * inv_w;
        if !(-1.0..=1.0).contains(&ndc_z) {
            return None;
        }
        let screen_x = (clip.x * inv_w * 0.5 + 0.5) * (self.width as f32 - 1.0);
        let screen_y = (1.0 - (clip.y * inv_w * 0.5 + 0.5)) * (self.height as f32 - 1.0);
        Some(Projected {
            screen: Vec2::new(screen_x, screen_y),
            depth: ndc_z * 0.5 + 0.5,
            distance: clip.w,
        })
    }

    /// Fraction of a sample left visible by exponential-squared fog.
    fn fog(&self, distance: f32) -> f32 {
        let d = self.fog_density * distance;
        (-(d * d)).exp()
    }

    fn add_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        let base = Color::from_u32(self.color[idx]);
        self.color[idx] = base.blend_additive(color).to_u32();
    }

    fn splat(&mut self, center: Vec2, radius: f32, color: Color) {
        if radius < 0.75 {
            let coverage = (radius / 0.75).max(0.2);
            self.add_pixel(center.x as i32, center.y as i32, color * coverage);
            return;
        }
        let r = radius.ceil() as i32;
        let cx = center.x as i32;
        let cy = center.y as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                let d = ((dx * dx + dy * dy) as f32).sqrt() / radius;
                if d <= 1.0 {
                    let falloff = 1.0 - d;
                    self.add_pixel(cx + dx, cy + dy, color * (falloff * falloff));
                }
            }
        }
    }

    fn draw_point(&mut self, position: Vec3, vp: &Mat4, focal: f32, size: f32, color: Color) {
        let Some(p) = self.project_point(position, vp) else { return };
        let radius = (size * focal / p.distance).min(6.0);
        self.splat(p.screen, radius, color * self.fog(p.distance));
    }

    /// Depth-tested opaque point, used for the near representation of clusters.
    fn draw_cluster(&mut self, cluster: &ImageCluster, opacity: f32, tint: Color, vp: &Mat4, focal: f32) {
        if opacity <= 0.0 {
            return;
        }
        let representation = cluster.representation();
        let origin = cluster.centroid();
        for (local, color) in cluster.cloud(representation).iter() {
            let color = color * tint * opacity;
            match representation {
                Representation::Near => self.draw_solid_point(local + origin, vp, focal, 0.9, color),
                Representation::Far => self.draw_point(local + origin, vp, focal, 0.9, color),
            }
        }
    }

    fn draw_solid_point(&mut self, position: Vec3, vp: &Mat4, focal: f32, size: f32, color: Color) {
        let Some(p) = self.project_point(position, vp) else { return };
        let r = (size * focal / p.distance).clamp(0.5, 12.0) as i32;
        let packed = (color * self.fog(p.distance)).to_u32();
        let (cx, cy) = (p.screen.x as i32, p.screen.y as i32);
        for y in (cy - r).max(0)..=(cy + r).min(self.height as i32 - 1) {
            for x in (cx - r).max(0)..=(cx + r).min(self.width as i32 - 1) {
                let idx = y as usize * self.width + x as usize;
                if p.depth < self.depth[idx] {
                    self.depth[idx] = p.depth;
                    self.color[idx] = packed;
                }
            }
        }
    }

    fn draw_glow(&mut self, position: Vec3, vp: &Mat4, focal: f32, scale: f32, color: Color) {
        let Some(p) = self.project_point(position, vp) else { return };
        let radius = (0.5 * scale * focal / p.distance).min(MAX_GLOW_RADIUS);
        self.splat(p.screen, radius, color);
    }

    fn draw_segment(&mut self, start: Vec3, end: Vec3, vp: &Mat4, color: Color) {
        let (Some(a), Some(b)) = (self.project_point(start, vp), self.project_point(end, vp)) else {
            return;
        };
        let color = color * self.fog((a.distance + b.distance) * 0.5);
        self.draw_line(a.screen, b.screen, color);
    }

    fn draw_line(&mut self, start: Vec2, end: Vec2, color: Color) {
        let mut x0 = start.x as i32;
        let mut y0 = start.y as i32;
        let x1 = end.x as i32;
        let y1 = end.y as i32;
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        // Off-screen segments still walk every pixel; bail out on absurd lengths.
        if dx > 4 * self.width as i32 || -dy > 4 * self.height as i32 {
            return;
        }
        loop {
            self.add_pixel(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn draw_planet(&mut self, transform: &Mat4, vp: &Mat4, eye: Vec3, time: f32) {
        let mut transformed = Vec::with_capacity(self.planet.vertices.len());
        for (position, uv) in self.planet.vertices.iter().zip(&self.planet.uvs) {
            let world = transform.transform_point3(*position);
            let clip = *vp * world.extend(1.0);
            if clip.w < 0.001 {
                transformed.push(None);
                continue;
            }
            let inv_w = 1.0 / clip.w;
            let ndc = Vec4::new(clip.x * inv_w, clip.y * inv_w, clip.z * inv_w, 1.0);
            if !(-1.0..=1.0).contains(&ndc.z) {
                transformed.push(None);
                continue;
            }
            transformed.push(Some(VertexOut {
                screen: Vec3::new(
                    (ndc.x * 0.5 + 0.5) * (self.width as f32 - 1.0),
                    (1.0 - (ndc.y * 0.5 + 0.5)) * (self.height as f32 - 1.0),
                    ndc.z,
                ),
                world,
                uv: *uv,
                inv_w,
            }));
        }

        for triangle in 0..self.planet.indices.len() {
            let indices = self.planet.indices[triangle];
            let Some(v0) = transformed[indices[0]] else { continue };
            let Some(v1) = transformed[indices[1]] else { continue };
            let Some(v2) = transformed[indices[2]] else { continue };
            let view_dir = (eye - v0.world).normalize_or_zero();
            let normal = (v1.world - v0.world).cross(v2.world - v0.world);
            if normal.dot(view_dir) <= 0.0 {
                continue;
            }
            self.rasterize_triangle(&v0, &v1, &v2, time);
        }
    }

    fn rasterize_triangle(&mut self, v0: &VertexOut, v1: &VertexOut, v2: &VertexOut, time: f32) {
        let min_x = v0.screen.x.min(v1.screen.x).min(v2.screen.x).floor().max(0.0) as i32;
        let max_x = v0.screen.x.max(v1.screen.x).max(v2.screen.x).ceil().min(self.width as f32 - 1.0) as i32;
        let min_y = v0.screen.y.min(v1.screen.y).min(v2.screen.y).floor().max(0.0) as i32;
        let max_y = v0.screen.y.max(v1.screen.y).max(v2.screen.y).ceil().min(self.height as f32 - 1.0) as i32;
        if min_x > max_x || min_y > max_y {
            return;
        }
        let area = edge(v0.screen, v1.screen, v2.screen);
        if area.abs() < 1e-4 {
            return;
        }
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
                let w0 = edge(v1.screen, v2.screen, p) / area;
                let w1 = edge(v2.screen, v0.screen, p) / area;
                let w2 = edge(v0.screen, v1.screen, p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let w_sum = v0.inv_w * w0 + v1.inv_w * w1 + v2.inv_w * w2;
                if w_sum <= 0.0 {
                    continue;
                }
                let ndc_depth = (v0.screen.z * v0.inv_w * w0
                    + v1.screen.z * v1.inv_w * w1
                    + v2.screen.z * v2.inv_w * w2)
                    / w_sum;
                let depth = ndc_depth * 0.5 + 0.5;
                let idx = y as usize * self.width + x as usize;
                if depth >= self.depth[idx] {
                    continue;
                }
                self.depth[idx] = depth;
                let uv = (v0.uv * (v0.inv_w * w0) + v1.uv * (v1.inv_w * w1) + v2.uv * (v2.inv_w * w2))
                    / w_sum;
                self.color[idx] = planet_color(uv, time).to_u32();
            }
        }
    }
}

/// Model rotation that turns local +Z towards `target`.
fn facing(position: Vec3, target: Vec3) -> Mat4 {
    let forward = (target - position).normalize_or_zero();
    if forward == Vec3::ZERO {
        return Mat4::IDENTITY;
    }
    let right = Vec3::Y.cross(forward).try_normalize().unwrap_or(Vec3::X);
    let up = forward.cross(right);
    Mat4::from_cols(right.extend(0.0), up.extend(0.0), forward.extend(0.0), Vec4::W)
}

/// Radial pastel gradient with an animated twist and a faint warm ripple.
fn planet_color(uv: Vec2, time: f32) -> Color {
    let angle = (uv - Vec2::splat(0.5)).length() * 3.0;
    let twist = (angle * 3.0 + time).sin() * 0.1;
    let uv = uv + Vec2::new((time * 0.5).sin(), (time * 0.5).cos()) * twist;

    let radial = (uv - Vec2::splat(0.5)).length();
    let t = ((radial - 0.125) / 0.375).clamp(0.0, 1.0);
    let mut color = Color::from_hex(PLANET_STOPS[PLANET_STOPS.len() - 1].1);
    for pair in PLANET_STOPS.windows(2) {
        let (start, from) = pair[0];
        let (end, to) = pair[1];
        if t <= end {
            let local = if end > start { (t - start) / (end - start) } else { 0.0 };
            color = Color::lerp(Color::from_hex(from), Color::from_hex(to), local);
            break;
        }
    }

    let noise = (uv.x * 10.0 + time).sin() * (uv.y * 10.0 + time).sin() * 0.1;
    color + Color::new(0.8, 0.4, 0.2) * noise
}

fn edge(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}

#[derive(Clone, Copy, Debug)]
struct VertexOut {
    screen: Vec3,
    world: Vec3,
    uv: Vec2,
    inv_w: f32,
}

/// Unit sphere with texture coordinates.
struct Mesh {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<[usize; 3]>,
}

impl Mesh {
    fn uv_sphere(segments: usize, rings: usize) -> Self {
        let mut vertices = Vec::with_capacity((segments + 1) * (rings + 1));
        let mut uvs = Vec::with_capacity(vertices.capacity());
        let mut indices = Vec::with_capacity(segments * rings * 2);
        for y in 0..=rings {
            let v = y as f32 / rings as f32;
            let theta = v * PI;
            for x in 0..=segments {
                let u = x as f32 / segments as f32;
                let phi = u * TAU;
                vertices.push(Vec3::new(
                    -phi.cos() * theta.sin(),
                    theta.cos(),
                    phi.sin() * theta.sin(),
                ));
                uvs.push(Vec2::new(u, 1.0 - v));
            }
        }
        let stride = segments + 1;
        for y in 0..rings {
            for x in 0..segments {
                let i0 = y * stride + x;
                let i1 = i0 + 1;
                let i2 = i0 + stride;
                let i3 = i2 + 1;
                indices.push([i0, i2, i1]);
                indices.push([i1, i2, i3]);
            }
        }
        Self {
            vertices,
            uvs,
            indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::cluster::generate_cluster;
    use crate::config::SceneConfig;
    use crate::galaxy::GalaxyParameters;
    use crate::images::LoadedImage;
    use crate::lod::LodSwitch;
    use rand::{rngs::StdRng, SeedableRng};

    fn small_scene() -> SceneSession<StdRng> {
        let config = SceneConfig {
            width: 160,
            height: 90,
            galaxy: GalaxyParameters {
                count: 500,
                ..GalaxyParameters::DEFAULT
            },
            star_count: 500,
            ..SceneConfig::default()
        };
        SceneSession::new(config, StdRng::seed_from_u64(3))
    }

    #[test]
    fn planet_fills_the_centre_of_the_frame() {
        let scene = small_scene();
        let mut renderer = Renderer::new(160, 90, 0.0015);
        renderer.render(&scene);
        let centre = renderer.color_buffer()[45 * 160 + 80];
        assert_ne!(centre, 0);
        assert!(renderer.depth[45 * 160 + 80] < 1.0);
    }

    #[test]
    fn points_behind_the_camera_are_culled() {
        let scene = small_scene();
        let renderer = Renderer::new(160, 90, 0.0015);
        let vp = scene.camera().view_projection();
        let behind = scene.camera().position * 2.0;
        assert!(renderer.project_point(behind, &vp).is_none());
        assert!(renderer.project_point(Vec3::ZERO, &vp).is_some());
    }

    #[test]
    fn fog_dims_with_distance() {
        let renderer = Renderer::new(4, 4, 0.0015);
        assert_eq!(renderer.fog(0.0), 1.0);
        assert!(renderer.fog(300.0) < renderer.fog(30.0));
    }

    #[test]
    fn sphere_faces_outwards() {
        let mesh = Mesh::uv_sphere(8, 4);
        for [a, b, c] in &mesh.indices {
            let (a, b, c) = (mesh.vertices[*a], mesh.vertices[*b], mesh.vertices[*c]);
            let normal = (b - a).cross(c - a);
            if normal.length_squared() > 1e-8 {
                assert!(normal.dot(a + b + c) > 0.0);
            }
        }
    }

    fn frame_energy(renderer: &Renderer) -> (usize, f32) {
        let lit = renderer.color_buffer().iter().filter(|&&c| c != 0).count();
        let energy: f32 = renderer
            .color_buffer()
            .iter()
            .map(|&c| {
                let color = Color::from_u32(c);
                color.r + color.g + color.b
            })
            .sum();
        (lit, energy)
    }

    #[test]
    fn near_cluster_follows_fade_and_tint() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut cluster = generate_cluster(
            "heart.png",
            0,
            2_000,
            &GalaxyParameters::CLUSTER,
            LodSwitch::new(10.0, 10.0),
            &mut rng,
        )
        .expect("some samples survive");
        cluster.attach_image(LoadedImage::new(4, 4, Color::WHITE));
        let point = cluster.cloud(Representation::Near).positions()[0] + cluster.centroid();
        let mut camera = Camera::new(point + Vec3::new(0.0, 0.0, 3.0), 160.0 / 90.0);
        camera.target = point;
        cluster.update_lod(camera.position);
        assert_eq!(cluster.representation(), Representation::Near);

        let vp = camera.view_projection();
        let focal = 90.0 * 0.5 / (camera.fov_y * 0.5).tan();
        let draw = |opacity: f32, tint: Color| {
            let mut renderer = Renderer::new(160, 90, 0.0015);
            renderer.begin_frame();
            renderer.draw_cluster(&cluster, opacity, tint, &vp, focal);
            frame_energy(&renderer)
        };

        let (full_lit, full) = draw(1.0, Color::WHITE);
        let (_, dimmed) = draw(0.25, Color::WHITE);
        let (hidden_lit, _) = draw(0.0, Color::WHITE);
        let (_, red) = draw(1.0, Color::new(1.0, 0.0, 0.0));
        assert!(full_lit > 0);
        assert!(dimmed < full * 0.5, "dimmed {dimmed} vs full {full}");
        assert_eq!(hidden_lit, 0);
        assert!(red < full);
    }
}
