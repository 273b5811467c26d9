//! Skeleton description captured once at model load: bone names and rest transforms.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::data::{BoneTransform, LivePose};

/// One bone as extracted by the host's model loader.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BoneInfo {
    pub name: String,
    /// Local transform at load time. Never mutated afterwards.
    pub rest: BoneTransform,
}

/// Bones sorted by name, with a name index. Rest transforms are immutable.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "Vec<BoneInfo>", into = "Vec<BoneInfo>")]
pub struct Skeleton {
    bones: Vec<BoneInfo>,
    index: HashMap<String, usize>,
}

impl From<Vec<BoneInfo>> for Skeleton {
    fn from(bones: Vec<BoneInfo>) -> Self {
        Skeleton::new(bones)
    }
}

impl From<Skeleton> for Vec<BoneInfo> {
    fn from(s: Skeleton) -> Self {
        s.bones
    }
}

impl Skeleton {
    /// Build from loader output. Later duplicates of a name are dropped; non-finite rest
    /// components are sanitized.
    pub fn new(bones: Vec<BoneInfo>) -> Self {
        let mut unique: Vec<BoneInfo> = Vec::with_capacity(bones.len());
        let mut seen: HashSet<String> = HashSet::with_capacity(bones.len());
        for mut bone in bones {
            if !seen.insert(bone.name.clone()) {
                log::warn!("skeleton: duplicate bone name '{}' ignored", bone.name);
                continue;
            }
            bone.rest = bone.rest.sanitized();
            unique.push(bone);
        }
        unique.sort_by(|a, b| a.name.cmp(&b.name));
        let index = unique
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        Self {
            bones: unique,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn contains(&self, bone: &str) -> bool {
        self.index.contains_key(bone)
    }

    pub fn bone(&self, bone: &str) -> Option<&BoneInfo> {
        self.index.get(bone).map(|&i| &self.bones[i])
    }

    /// Rest transform of `bone`; identity for unknown bones.
    pub fn rest(&self, bone: &str) -> BoneTransform {
        self.bone(bone).map(|b| b.rest).unwrap_or_default()
    }

    pub fn bones(&self) -> &[BoneInfo] {
        &self.bones
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bones.iter().map(|b| b.name.as_str())
    }

    /// Full rest pose.
    pub fn rest_pose(&self) -> LivePose {
        self.bones
            .iter()
            .map(|b| (b.name.clone(), b.rest))
            .collect()
    }
}
