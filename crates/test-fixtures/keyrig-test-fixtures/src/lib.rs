use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    skeletons: HashMap<String, String>,
    animations: HashMap<String, AnimationEntry>,
}

/// An animation document, optionally pinned to the skeleton it was authored for.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnimationEntry {
    Path(String),
    Detailed {
        path: String,
        #[serde(default)]
        skeleton: Option<String>,
    },
}

impl AnimationEntry {
    fn as_path(&self) -> &str {
        match self {
            AnimationEntry::Path(path) => path,
            AnimationEntry::Detailed { path, .. } => path,
        }
    }

    fn skeleton(&self) -> Option<&str> {
        match self {
            AnimationEntry::Path(_) => None,
            AnimationEntry::Detailed { skeleton, .. } => skeleton.as_deref(),
        }
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Bone lists with rest transforms, as a model loader would extract them.
pub mod skeletons {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.skeletons.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.skeletons, "skeleton", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.skeletons, "skeleton", name)?;
        super::load_json(rel)
    }
}

/// Interchange animation documents.
pub mod animations {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.animations.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.animations, "animation", name)?;
        read_to_string(entry.as_path())
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.animations, "animation", name)?;
        super::load_json(entry.as_path())
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let entry = lookup(&MANIFEST.animations, "animation", name)?;
        Ok(resolve_path(entry.as_path()))
    }

    /// Skeleton fixture key the animation targets, if pinned.
    pub fn skeleton_key(name: &str) -> Result<Option<String>> {
        let entry = lookup(&MANIFEST.animations, "animation", name)?;
        Ok(entry.skeleton().map(str::to_string))
    }
}
