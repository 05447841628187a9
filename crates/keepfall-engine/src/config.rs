//! Engine configuration.
//!
//! Read from `keepfall.toml`. Missing or broken files fall back to defaults;
//! the optional attack table is a separate RON document.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use keepfall_common::KeepfallResult;
use keepfall_gameplay::{
    AttackTable, ChaseConfig, CharacterTuning, CombatConfig, LevelConfig, PhysicsConfig,
    SightConfig,
};

/// Configuration file name.
pub const CONFIG_FILE: &str = "keepfall.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Session ===
    /// Level seed (None = random)
    pub seed: Option<u64>,
    /// Length of a headless session in seconds
    pub session_seconds: f32,
    /// Simulated frames per second
    pub target_fps: u32,
    /// Largest delta handed to the simulation
    pub max_frame_delta: f32,

    // === Assets ===
    /// Directory asset keys are resolved against
    pub asset_root: PathBuf,
    /// RON file overriding attack parameters
    pub attack_table: Option<PathBuf>,

    // === Debug ===
    /// Log the developer overlay periodically
    pub show_debug_overlay: bool,
    /// Seconds between overlay dumps
    pub debug_overlay_interval: f32,

    // === Gameplay ===
    /// Level layout
    pub level: LevelConfig,
    /// Character movement
    pub physics: PhysicsConfig,
    /// Combat timers and costs
    pub combat: CombatConfig,
    /// Line-of-sight sampling
    pub sight: SightConfig,
    /// Enemy AI
    pub chase: ChaseConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            session_seconds: 60.0,
            target_fps: 60,
            max_frame_delta: 0.25,

            asset_root: PathBuf::from("assets"),
            attack_table: None,

            show_debug_overlay: false,
            debug_overlay_interval: 1.0,

            level: LevelConfig::default(),
            physics: PhysicsConfig::default(),
            combat: CombatConfig::default(),
            sight: SightConfig::default(),
            chase: ChaseConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.target_fps = self.target_fps.clamp(10, 240);
        self.max_frame_delta = self.max_frame_delta.clamp(0.001, 0.5);
        self.session_seconds = self.session_seconds.max(0.0);
        self.debug_overlay_interval = self.debug_overlay_interval.max(0.1);

        self.level.cols = self.level.cols.max(1);
        self.level.rows = self.level.rows.max(1);
        self.level.chest_spawn_chance = self.level.chest_spawn_chance.clamp(0.0, 1.0);
        self.level.candle_spawn_chance = self.level.candle_spawn_chance.clamp(0.0, 1.0);

        self.sight.step = self.sight.step.max(0.5);
        self.sight.probe_half_extent = self.sight.probe_half_extent.max(0.0);
    }

    /// Configured seed, or a fresh random one.
    #[must_use]
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| fastrand::u64(..))
    }

    /// Character tuning with the attack table applied.
    pub fn tuning(&self) -> KeepfallResult<CharacterTuning> {
        let attacks = match &self.attack_table {
            Some(path) => load_attack_table(path)?,
            None => AttackTable::default(),
        };
        Ok(CharacterTuning {
            physics: self.physics.clone(),
            combat: self.combat.clone(),
            sight: self.sight,
            attacks,
        })
    }
}

/// Read an attack table from RON.
///
/// A missing file logs a warning and yields the shipped table; a malformed
/// one is an error.
pub fn load_attack_table(path: &Path) -> KeepfallResult<AttackTable> {
    if !path.exists() {
        warn!("Attack table {} not found, using shipped values", path.display());
        return Ok(AttackTable::default());
    }
    let source = fs::read_to_string(path)?;
    let table = AttackTable::from_ron(&source)?;
    info!("Loaded attack table from {}", path.display());
    Ok(table)
}
