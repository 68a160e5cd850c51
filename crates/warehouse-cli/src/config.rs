//! Configuration Vault – reads/writes `~/.warehouse/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use warehouse_hal::{SharedFloor, SimRobot};
use warehouse_perception::{PhysicalRangeConverter, RangeConverter, VirtualRangeConverter, WarehouseMap};
use warehouse_runtime::{LocaliserConfig, DEFAULT_MAX_ITERATIONS};
use warehouse_types::{Direction, GridPoint};

/// How simulated robots turn raw sensor distances into open/blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    /// Distances are already in grid cells.
    #[default]
    Virtual,
    /// Distances come from the optical sensor, in centimetres.
    Physical,
}

impl std::fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConverterKind::Virtual => write!(f, "virtual"),
            ConverterKind::Physical => write!(f, "physical"),
        }
    }
}

impl std::str::FromStr for ConverterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "virtual" => Ok(ConverterKind::Virtual),
            "physical" => Ok(ConverterKind::Physical),
            other => Err(format!("unknown converter {other:?}")),
        }
    }
}

/// One simulated robot and its hidden starting pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSpec {
    pub name: String,
    pub start_x: i32,
    pub start_y: i32,
    /// World heading at power-on (`north`, `east`, `south` or `west`).
    pub heading: Direction,
}

impl RobotSpec {
    fn new(name: &str, x: i32, y: i32, heading: Direction) -> Self {
        Self {
            name: name.to_string(),
            start_x: x,
            start_y: y,
            heading,
        }
    }

    pub fn start(&self) -> GridPoint {
        GridPoint::new(self.start_x, self.start_y)
    }
}

/// Persisted user configuration stored in `~/.warehouse/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Floor plan, northernmost row first: `.` free, `#` obstacle.
    #[serde(default = "default_floor_plan")]
    pub floor_plan: Vec<String>,

    #[serde(default)]
    pub converter: ConverterKind,

    #[serde(default = "default_physical_threshold_cm")]
    pub physical_threshold_cm: f32,

    #[serde(default = "default_virtual_threshold_cells")]
    pub virtual_threshold_cells: f32,

    /// Side of one grid cell, used when simulating physical readings.
    #[serde(default = "default_cell_size_cm")]
    pub cell_size_cm: f32,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Fixes the exploration tie-break for reproducible runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default = "default_robots")]
    pub robots: Vec<RobotSpec>,
}

fn default_floor_plan() -> Vec<String> {
    WarehouseMap::default_warehouse().to_rows()
}
fn default_physical_threshold_cm() -> f32 {
    25.0
}
fn default_virtual_threshold_cells() -> f32 {
    1.0
}
fn default_cell_size_cm() -> f32 {
    30.0
}
fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}
fn default_robots() -> Vec<RobotSpec> {
    vec![
        RobotSpec::new("alpha", 0, 0, Direction::Left),
        RobotSpec::new("bravo", 11, 7, Direction::Left),
        RobotSpec::new("charlie", 0, 7, Direction::Left),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            floor_plan: default_floor_plan(),
            converter: ConverterKind::default(),
            physical_threshold_cm: default_physical_threshold_cm(),
            virtual_threshold_cells: default_virtual_threshold_cells(),
            cell_size_cm: default_cell_size_cm(),
            max_iterations: default_max_iterations(),
            seed: None,
            robots: default_robots(),
        }
    }
}

impl Config {
    /// Parse the floor plan into a map.
    pub fn build_map(&self) -> Result<WarehouseMap, String> {
        WarehouseMap::from_rows(self.floor_plan.as_slice()).map_err(|e| format!("Invalid floor plan: {}", e))
    }

    pub fn localiser_config(&self) -> LocaliserConfig {
        LocaliserConfig {
            max_iterations: self.max_iterations,
            seed: self.seed,
        }
    }

    /// Place every configured robot on one shared copy of `world`, so a
    /// parked robot is an obstacle for the rest of the fleet.
    pub fn spawn_robots(&self, world: &WarehouseMap) -> Result<Vec<SimRobot>, String> {
        let floor: SharedFloor = Arc::new(RwLock::new(world.clone()));
        self.robots
            .iter()
            .map(|spec| {
                if !world.is_passable(spec.start()) {
                    return Err(format!("Robot {} starts on a blocked cell {}", spec.name, spec.start()));
                }
                let (converter, cell_size): (Box<dyn RangeConverter>, f32) = match self.converter {
                    ConverterKind::Virtual => (
                        Box::new(VirtualRangeConverter {
                            threshold_cells: self.virtual_threshold_cells,
                        }),
                        1.0,
                    ),
                    ConverterKind::Physical => (
                        Box::new(PhysicalRangeConverter {
                            threshold_cm: self.physical_threshold_cm,
                        }),
                        self.cell_size_cm,
                    ),
                };
                Ok(SimRobot::on_floor(spec.name.clone(), floor.clone(), spec.start(), spec.heading)
                    .with_converter(converter, cell_size))
            })
            .collect()
    }
}

/// Return the path to `~/.warehouse/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".warehouse").join("config.toml")
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `WAREHOUSE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `WAREHOUSE_MAX_ITERATIONS` | `max_iterations` |
/// | `WAREHOUSE_SEED` | `seed` |
/// | `WAREHOUSE_CONVERTER` | `converter` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("WAREHOUSE_MAX_ITERATIONS")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.max_iterations = n;
    }
    if let Ok(v) = std::env::var("WAREHOUSE_SEED")
        && let Ok(seed) = v.parse::<u64>()
    {
        cfg.seed = Some(seed);
    }
    if let Ok(v) = std::env::var("WAREHOUSE_CONVERTER")
        && let Ok(kind) = v.parse::<ConverterKind>()
    {
        cfg.converter = kind;
    }
}

/// Save the config to a specific path, creating its directory if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Owner-only directory (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Owner-only file (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
