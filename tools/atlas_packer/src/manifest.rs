//! Sprite manifest

use anyhow::{bail, Context, Result};
use kite_engine::packer::BinRect;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

/// One sprite to pack
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpriteEntry {
    pub name: String,
    pub width: i32,
    pub height: i32,
    /// Overrides the page rotation policy for this sprite
    #[serde(default)]
    pub allow_rotation: Option<bool>,
}

impl SpriteEntry {
    pub fn to_rect(&self) -> BinRect {
        let rect = BinRect::new(self.width, self.height).with_tag(self.name.clone());
        match self.allow_rotation {
            Some(allow) => rect.with_allow_rotation(allow),
            None => rect,
        }
    }
}

/// Parsed `[[sprite]]` list
#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "sprite")]
    pub sprites: Vec<SpriteEntry>,
}

impl Manifest {
    pub fn parse(contents: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(contents).context("Invalid sprite manifest")?;
        let mut names = BTreeSet::new();
        for sprite in &manifest.sprites {
            if sprite.width <= 0 || sprite.height <= 0 {
                bail!("Sprite '{}' has a non-positive size {}x{}", sprite.name, sprite.width, sprite.height);
            }
            if !names.insert(sprite.name.as_str()) {
                bail!("Sprite '{}' is listed twice", sprite.name);
            }
        }
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse manifest {}", path.display()))
    }
}
