//! Skeletal animation: bones, keyframed clips and random poses.
//!
//! A pose is one local [`Instance`] per bone, relative to the bone's parent.
//! Bones are stored parents first, so world transforms are computed in a
//! single forward pass.

use cgmath::{
    Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Quaternion, Rad, Rotation3, SquareMatrix,
    Transform, Vector3,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::data_structures::instance::Instance;

#[derive(Clone, Debug, PartialEq)]
pub enum Keyframes {
    Translation(Vec<Vector3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
    Scale(Vec<Vector3<f32>>),
    Other,
}

impl Keyframes {
    pub fn len(&self) -> usize {
        match self {
            Keyframes::Translation(v) => v.len(),
            Keyframes::Rotation(v) => v.len(),
            Keyframes::Scale(v) => v.len(),
            Keyframes::Other => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AnimationError {
    #[error("{timestamps} timestamps but {keyframes} keyframes")]
    LengthMismatch { timestamps: usize, keyframes: usize },
    #[error("timestamp {0} is smaller than the one before it")]
    UnsortedTimestamps(usize),
    #[error("bone {bone} refers to parent {parent}, parents must come first")]
    InvalidParent { bone: usize, parent: usize },
    #[error("pose has {got} transforms, skeleton has {expected} bones")]
    PoseSize { expected: usize, got: usize },
    #[error("no bone with index {0}")]
    UnknownBone(usize),
    #[error("rest transform of bone {0} cannot be inverted")]
    SingularBone(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    /// Rest transform relative to the parent.
    pub rest: Instance,
}

impl Bone {
    pub fn new(name: &str, parent: Option<usize>, rest: Instance) -> Self {
        Self {
            name: name.to_string(),
            parent,
            rest,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Result<Self, AnimationError> {
        for (bone, b) in bones.iter().enumerate() {
            if let Some(parent) = b.parent {
                if parent >= bone {
                    return Err(AnimationError::InvalidParent { bone, parent });
                }
            }
        }
        Ok(Self { bones })
    }

    /// A straight chain of `count` bones, each `length` above its parent.
    pub fn chain(count: usize, length: f32) -> Self {
        let bones = (0..count)
            .map(|i| {
                let (parent, offset) = if i == 0 { (None, 0.0) } else { (Some(i - 1), length) };
                Bone::new(
                    &format!("bone{i}"),
                    parent,
                    Instance::from(Vector3::new(0.0, offset, 0.0)),
                )
            })
            .collect();
        Self { bones }
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn rest_pose(&self) -> Vec<Instance> {
        self.bones.iter().map(|b| b.rest).collect()
    }

    /// Model space transform of every bone for a pose of local transforms.
    pub fn world_transforms(&self, pose: &[Instance]) -> Result<Vec<Instance>, AnimationError> {
        if pose.len() != self.bones.len() {
            return Err(AnimationError::PoseSize {
                expected: self.bones.len(),
                got: pose.len(),
            });
        }
        let mut world: Vec<Instance> = Vec::with_capacity(pose.len());
        for (bone, local) in self.bones.iter().zip(pose) {
            let transform = match bone.parent {
                Some(parent) => &world[parent] * local,
                None => *local,
            };
            world.push(transform);
        }
        Ok(world)
    }
}

/// Keyframes for one property of one bone.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub keyframes: Keyframes,
    pub timestamps: Vec<f32>,
}

/// A clip evaluated at one point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Translation(Vector3<f32>),
    Rotation(Quaternion<f32>),
    Scale(Vector3<f32>),
}

impl AnimationClip {
    pub fn new(name: &str, timestamps: Vec<f32>, keyframes: Keyframes) -> Result<Self, AnimationError> {
        if !matches!(keyframes, Keyframes::Other) && timestamps.len() != keyframes.len() {
            return Err(AnimationError::LengthMismatch {
                timestamps: timestamps.len(),
                keyframes: keyframes.len(),
            });
        }
        if let Some(i) = timestamps.windows(2).position(|w| w[1] < w[0]) {
            return Err(AnimationError::UnsortedTimestamps(i + 1));
        }
        Ok(Self {
            name: name.to_string(),
            keyframes,
            timestamps,
        })
    }

    pub fn duration(&self) -> f32 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Value at time `t`, clamped to the first and last keyframe.
    ///
    /// Translations and scales are interpolated linearly, rotations with
    /// slerp. `None` for empty clips and [`Keyframes::Other`].
    pub fn sample(&self, t: f32) -> Option<Sample> {
        if self.keyframes.is_empty() {
            return None;
        }
        let (i, j, f) = self.bracket(t);
        let sample = match &self.keyframes {
            Keyframes::Translation(v) => Sample::Translation(v[i] + (v[j] - v[i]) * f),
            Keyframes::Scale(v) => Sample::Scale(v[i] + (v[j] - v[i]) * f),
            Keyframes::Rotation(q) => {
                Sample::Rotation(q[i].normalize().slerp(q[j].normalize(), f))
            }
            Keyframes::Other => return None,
        };
        Some(sample)
    }

    /// Keyframes around `t` and the blend factor between them. NaN maps to the first keyframe.
    fn bracket(&self, t: f32) -> (usize, usize, f32) {
        let n = self.timestamps.len();
        let last = n - 1;
        if t.is_nan() || t <= self.timestamps[0] {
            return (0, 0, 0.0);
        }
        if t >= self.timestamps[last] {
            return (last, last, 0.0);
        }
        let j = self.timestamps.partition_point(|&s| s <= t);
        let i = j - 1;
        let span = self.timestamps[j] - self.timestamps[i];
        let f = if span > 0.0 {
            (t - self.timestamps[i]) / span
        } else {
            0.0
        };
        (i, j, f)
    }
}

/// Clips bound to the bones they move.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Animation {
    pub name: String,
    pub channels: Vec<(usize, AnimationClip)>,
}

impl Animation {
    pub fn duration(&self) -> f32 {
        self.channels
            .iter()
            .filter_map(|(_, c)| c.timestamps.last().copied())
            .fold(0.0, f32::max)
    }

    /// Local pose at time `t`. Properties without a channel keep their rest value.
    pub fn pose_at(&self, skeleton: &Skeleton, t: f32) -> Result<Vec<Instance>, AnimationError> {
        let mut pose = skeleton.rest_pose();
        for (bone, clip) in &self.channels {
            let local = pose.get_mut(*bone).ok_or(AnimationError::UnknownBone(*bone))?;
            match clip.sample(t) {
                Some(Sample::Translation(v)) => local.position = v,
                Some(Sample::Rotation(q)) => local.rotation = q,
                Some(Sample::Scale(s)) => local.scale = s,
                None => {}
            }
        }
        Ok(pose)
    }
}

/// Rest pose with every bone rotated by up to `max_angle` about each axis
/// and moved by up to `max_offset` along each axis.
pub fn random_pose(skeleton: &Skeleton, seed: u64, max_angle: Deg<f32>, max_offset: f32) -> Vec<Instance> {
    let mut rng = StdRng::seed_from_u64(seed);
    random_pose_with(skeleton, &mut rng, max_angle, max_offset)
}

fn random_pose_with(
    skeleton: &Skeleton,
    rng: &mut StdRng,
    max_angle: Deg<f32>,
    max_offset: f32,
) -> Vec<Instance> {
    let angle = Rad::from(max_angle).0.abs();
    let offset = max_offset.abs();
    let mut uniform = |limit: f32| {
        if limit > 0.0 { rng.random_range(-limit..=limit) } else { 0.0 }
    };
    skeleton
        .bones()
        .iter()
        .map(|bone| {
            let rotation = Quaternion::from_angle_z(Rad(uniform(angle)))
                * Quaternion::from_angle_y(Rad(uniform(angle)))
                * Quaternion::from_angle_x(Rad(uniform(angle)));
            let shift = Vector3::new(uniform(offset), uniform(offset), uniform(offset));
            Instance {
                position: bone.rest.position + shift,
                rotation: bone.rest.rotation * rotation,
                scale: bone.rest.scale,
            }
        })
        .collect()
}

pub const RANDOM_MAX_ANGLE: Deg<f32> = Deg(36.0);
pub const RANDOM_MAX_OFFSET: f32 = 0.1;

/// `frames` random poses spread evenly over `duration`, as translation and
/// rotation channels for every bone.
pub fn random_clip(skeleton: &Skeleton, frames: usize, duration: f32, seed: u64) -> Animation {
    let frames = frames.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let poses: Vec<Vec<Instance>> = (0..frames)
        .map(|_| random_pose_with(skeleton, &mut rng, RANDOM_MAX_ANGLE, RANDOM_MAX_OFFSET))
        .collect();
    let timestamps: Vec<f32> = (0..frames)
        .map(|i| {
            if frames == 1 {
                0.0
            } else {
                duration * i as f32 / (frames - 1) as f32
            }
        })
        .collect();

    let mut channels = Vec::with_capacity(skeleton.len() * 2);
    for (bone, b) in skeleton.bones().iter().enumerate() {
        let translations = poses.iter().map(|p| p[bone].position).collect();
        let rotations = poses.iter().map(|p| p[bone].rotation).collect();
        channels.push((
            bone,
            AnimationClip {
                name: format!("{}.translation", b.name),
                keyframes: Keyframes::Translation(translations),
                timestamps: timestamps.clone(),
            },
        ));
        channels.push((
            bone,
            AnimationClip {
                name: format!("{}.rotation", b.name),
                keyframes: Keyframes::Rotation(rotations),
                timestamps: timestamps.clone(),
            },
        ));
    }
    Animation {
        name: format!("random-{seed}"),
        channels,
    }
}

/// Points rigidly attached to bones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkinnedPoints {
    /// Positions in model space at the rest pose.
    pub points: Vec<Vector3<f32>>,
    pub bone_of: Vec<usize>,
}

impl SkinnedPoints {
    /// Attach every point to the bone whose rest position is closest.
    pub fn bind_nearest(skeleton: &Skeleton, points: Vec<Vector3<f32>>) -> Result<Self, AnimationError> {
        let rest = skeleton.world_transforms(&skeleton.rest_pose())?;
        let bone_of = points
            .iter()
            .map(|p| {
                rest.iter()
                    .enumerate()
                    .map(|(i, t)| (i, (t.position - p).magnitude2()))
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map_or(0, |(i, _)| i)
            })
            .collect();
        Ok(Self { points, bone_of })
    }

    /// Move every point with its bone from the rest pose into `pose`.
    pub fn apply(&self, skeleton: &Skeleton, pose: &[Instance]) -> Result<Vec<Vector3<f32>>, AnimationError> {
        let rest = skeleton.world_transforms(&skeleton.rest_pose())?;
        let posed = skeleton.world_transforms(pose)?;
        let mut skin: Vec<Option<Matrix4<f32>>> = vec![None; skeleton.len()];
        self.points
            .iter()
            .zip(&self.bone_of)
            .map(|(p, &bone)| {
                if bone >= skeleton.len() {
                    return Err(AnimationError::UnknownBone(bone));
                }
                let matrix = match skin[bone] {
                    Some(m) => m,
                    None => {
                        let inverse_rest = rest[bone]
                            .to_matrix()
                            .invert()
                            .ok_or(AnimationError::SingularBone(bone))?;
                        let m = posed[bone].to_matrix() * inverse_rest;
                        skin[bone] = Some(m);
                        m
                    }
                };
                Ok(matrix.transform_point(Point3::from_vec(*p)).to_vec())
            })
            .collect()
    }
}
