//! Garments made of textured body parts, optionally draped as cloth.

use cgmath::Vector3;

use crate::{
    data_structures::{instance::Instance, mesh::Mesh},
    simulation::cloth::{Cloth, ClothConfig},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GarmentKind {
    Shirt,
    Pants,
    Jacket,
}

impl GarmentKind {
    /// Default `(width, height)` of the garment panel.
    pub fn size(self) -> (f32, f32) {
        match self {
            GarmentKind::Shirt => (20.0, 15.0),
            GarmentKind::Pants => (30.0, 20.0),
            GarmentKind::Jacket => (25.0, 18.0),
        }
    }

    pub fn texture(self) -> &'static str {
        match self {
            GarmentKind::Shirt => "shirt.png",
            GarmentKind::Pants => "pants.png",
            GarmentKind::Jacket => "jacket.png",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GarmentKind::Shirt => "shirt",
            GarmentKind::Pants => "pants",
            GarmentKind::Jacket => "jacket",
        }
    }
}

/// One garment panel placed on a character. Rotations are in degrees.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyPart {
    pub kind: GarmentKind,
    pub position: Vector3<f32>,
    pub scale: f32,
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub texture: String,
}

impl BodyPart {
    pub fn new(kind: GarmentKind, position: Vector3<f32>) -> Self {
        Self {
            kind,
            position,
            scale: 1.0,
            rotation_x: 0.0,
            rotation_y: 0.0,
            texture: kind.texture().to_string(),
        }
    }

    pub fn with_rotation(mut self, rotation_x: f32, rotation_y: f32) -> Self {
        self.rotation_x = rotation_x;
        self.rotation_y = rotation_y;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn instance(&self) -> Instance {
        Instance::from_euler_deg(self.position, self.scale, self.rotation_x, self.rotation_y)
    }

    /// Textured panel in local space, centred on the origin and facing +z.
    pub fn mesh(&self) -> Mesh {
        let (width, height) = self.kind.size();
        let mut mesh = Mesh::quad(width, height);
        mesh.name = self.kind.name().to_string();
        mesh
    }

    /// The panel as cloth in world space, hanging from its top edge.
    pub fn cloth(&self, cols: u32, rows: u32, config: ClothConfig) -> Cloth {
        let (width, height) = self.kind.size();
        let mut cloth = Cloth::grid(width * self.scale, height * self.scale, cols, rows, config);
        cloth.pin_top_row();
        let instance = self.instance();
        // the cloth hangs below y = 0; the panel's top edge is at +height / 2
        let top = instance.transform_vector(Vector3::new(0.0, height * self.scale / 2.0, 0.0));
        cloth.place(instance.rotation, instance.position + top);
        cloth
    }
}

#[derive(Clone, Debug, Default)]
pub struct Outfit {
    pub parts: Vec<BodyPart>,
    cloths: Vec<Cloth>,
}

impl Outfit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, part: BodyPart) -> &mut Self {
        self.parts.push(part);
        self
    }

    /// Every part as a world-space mesh.
    pub fn meshes(&self) -> Vec<Mesh> {
        self.parts
            .iter()
            .map(|part| {
                let mut mesh = part.mesh();
                mesh.transform(&part.instance().to_matrix());
                mesh
            })
            .collect()
    }

    /// Replace the rigid panels by simulated cloth, one per part.
    pub fn drape(&mut self, cols: u32, rows: u32, config: ClothConfig) -> &[Cloth] {
        self.cloths = self
            .parts
            .iter()
            .map(|part| part.cloth(cols, rows, config))
            .collect();
        log::debug!("Draped {} garments", self.cloths.len());
        &self.cloths
    }

    pub fn cloths(&self) -> &[Cloth] {
        &self.cloths
    }

    pub fn is_draped(&self) -> bool {
        !self.cloths.is_empty()
    }

    /// Step all draped cloths. Does nothing before [`Outfit::drape`].
    pub fn update(&mut self, dt: f32) {
        for cloth in &mut self.cloths {
            cloth.step(dt);
        }
    }

    /// Draped cloths as meshes, falling back to the rigid panels when not draped.
    pub fn current_meshes(&self) -> Vec<Mesh> {
        if self.cloths.is_empty() {
            return self.meshes();
        }
        self.cloths
            .iter()
            .zip(&self.parts)
            .map(|(cloth, part)| {
                let mut mesh = cloth.to_mesh();
                mesh.name = part.kind.name().to_string();
                mesh
            })
            .collect()
    }
}
