//! Objects whose opacity the animation director drives, registered once at creation.

use crate::color::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectId {
    CentralObject,
    CentralGlow,
    HintIcon,
    HintLabel,
    StarField,
    Galaxy,
    Nebula(usize),
    Cluster(usize),
    TextRing(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FadeRole {
    Participant,
    /// Always fully opaque: the central object, its glow and the text rings.
    Pinned,
    Hint,
    Backdrop,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialState {
    pub opacity: f32,
    pub transparent: bool,
    pub tint: Color,
    pub visible: bool,
}

impl MaterialState {
    pub const OPAQUE: Self = Self {
        opacity: 1.0,
        transparent: false,
        tint: Color::WHITE,
        visible: true,
    };

    pub fn translucent(opacity: f32) -> Self {
        Self {
            opacity,
            transparent: true,
            ..Self::OPAQUE
        }
    }
}

#[derive(Clone, Debug)]
pub struct FadeEntry {
    pub id: ObjectId,
    pub role: FadeRole,
    pub material: MaterialState,
}

#[derive(Clone, Debug, Default)]
pub struct FadeRegistry {
    entries: Vec<FadeEntry>,
}

impl FadeRegistry {
    pub fn register(&mut self, id: ObjectId, role: FadeRole, material: MaterialState) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) {
            entry.role = role;
            entry.material = material;
            return;
        }
        self.entries.push(FadeEntry { id, role, material });
    }

    pub fn material(&self, id: ObjectId) -> Option<&MaterialState> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.material)
    }

    pub fn material_mut(&mut self, id: ObjectId) -> Option<&mut MaterialState> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .map(|entry| &mut entry.material)
    }

    /// Opacity as drawn: zero for hidden or unknown objects, and opaque
    /// materials ignore their opacity value.
    pub fn opacity(&self, id: ObjectId) -> f32 {
        match self.material(id) {
            Some(material) if !material.visible => 0.0,
            Some(material) if material.transparent => material.opacity,
            Some(_) => 1.0,
            None => 0.0,
        }
    }

    pub fn tint(&self, id: ObjectId) -> Color {
        self.material(id).map_or(Color::WHITE, |material| material.tint)
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut FadeEntry> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
