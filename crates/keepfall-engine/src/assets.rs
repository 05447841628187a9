//! Asset registry.
//!
//! Built once at startup and passed by reference. Every key resolves to a
//! path under the asset root; keys whose file is missing are kept as
//! placeholders so the simulation never sees a load failure.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use keepfall_gameplay::Item;

/// Sprite sheet of the player.
pub const PLAYER_SHEET: &str = "sprites/player";
/// Sprite sheet of the candle enemy.
pub const CANDLE_SHEET: &str = "sprites/candle";
/// Tile wall texture.
pub const BLOCK_TEXTURE: &str = "tiles/block";
/// Ladder texture.
pub const LADDER_TEXTURE: &str = "tiles/ladder";
/// Chest sprite.
pub const CHEST_SPRITE: &str = "props/chest";
/// Door sprite.
pub const DOOR_SPRITE: &str = "props/door";

/// File extension appended to asset keys.
const ASSET_EXTENSION: &str = "png";

/// Asset loading status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    /// File present under the root
    Loaded,
    /// File missing; a placeholder stands in
    Placeholder,
}

/// One registered asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// Lookup key
    pub key: String,
    /// Resolved path
    pub path: PathBuf,
    /// Whether the file was found
    pub status: AssetStatus,
}

/// Maps asset keys to files under a root directory.
#[derive(Debug)]
pub struct AssetRegistry {
    root: PathBuf,
    entries: HashMap<String, AssetEntry>,
    placeholder: AssetEntry,
}

impl AssetRegistry {
    /// An empty registry over `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            placeholder: AssetEntry {
                key: String::from("placeholder"),
                path: root.join("placeholder").with_extension(ASSET_EXTENSION),
                status: AssetStatus::Placeholder,
            },
            root,
            entries: HashMap::new(),
        }
    }

    /// Registry over `root` with every key the game uses.
    #[must_use]
    pub fn with_standard_assets(root: impl Into<PathBuf>) -> Self {
        let mut registry = Self::new(root);
        for key in Self::standard_keys() {
            registry.register(&key);
        }
        info!(
            "Asset registry: {} loaded, {} placeholders under {}",
            registry.loaded_count(),
            registry.placeholder_count(),
            registry.root.display()
        );
        registry
    }

    /// Sprite, tile, prop and item icon keys.
    #[must_use]
    pub fn standard_keys() -> Vec<String> {
        let items = [
            Item::SMALL_HEALTH_POTION,
            Item::SMALL_MANA_POTION,
            Item::HealthAmulet { bonus: 0 },
            Item::DamageAmulet { bonus: 0 },
        ];
        [
            PLAYER_SHEET,
            CANDLE_SHEET,
            BLOCK_TEXTURE,
            LADDER_TEXTURE,
            CHEST_SPRITE,
            DOOR_SPRITE,
        ]
        .into_iter()
        .chain(items.iter().map(Item::icon_key))
        .map(String::from)
        .collect()
    }

    /// Resolve and record one key.
    pub fn register(&mut self, key: &str) -> &AssetEntry {
        let path = self.root.join(key).with_extension(ASSET_EXTENSION);
        let status = if path.is_file() {
            debug!("Asset {} -> {}", key, path.display());
            AssetStatus::Loaded
        } else {
            warn!("Asset {} missing at {}, using placeholder", key, path.display());
            AssetStatus::Placeholder
        };
        self.entries
            .entry(key.to_string())
            .or_insert(AssetEntry {
                key: key.to_string(),
                path,
                status,
            })
    }

    /// Entry for a key; unknown keys get the placeholder.
    #[must_use]
    pub fn get(&self, key: &str) -> &AssetEntry {
        self.entries.get(key).unwrap_or(&self.placeholder)
    }

    /// Asset root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys whose file was found.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.count(AssetStatus::Loaded)
    }

    /// Keys standing in with a placeholder.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.count(AssetStatus::Placeholder)
    }

    fn count(&self, status: AssetStatus) -> usize {
        self.entries.values().filter(|e| e.status == status).count()
    }
}
