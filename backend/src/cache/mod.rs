//! Process-wide caches: the parsed dashboard state and the layout registry.
//!
//! The dashboard state is parsed once per process and shared read-only.
//! Layout templates are saved to disk and matched automatically against
//! new staggered files by their `"<Label> Region"` headers.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::logs::log_warning;
use crate::datasets::DashboardState;
use crate::error::{PipelineResult, RegistryError, RegistryResult};
use crate::models::{RawGrid, StaggeredBlockLayout};
use crate::transform::detect_layout;
use crate::validation::parse_layout;

/// Directory where layouts are stored (relative to current dir)
pub const DEFAULT_LAYOUT_DIR: &str = ".passboard/layouts";

/// Minimum share of a template's blocks that must be found in a grid.
const MIN_COMPATIBILITY: f64 = 0.5;

static STATE: OnceCell<Arc<DashboardState>> = OnceCell::new();

/// The dashboard state, parsed on first call.
///
/// `data_dir` only matters on the first call; later calls return the same
/// state whatever they pass.
pub fn shared_state(data_dir: Option<&Path>) -> PipelineResult<Arc<DashboardState>> {
    STATE
        .get_or_try_init(|| -> PipelineResult<Arc<DashboardState>> {
            let state = match data_dir {
                Some(dir) => DashboardState::from_dir(dir)?,
                None => DashboardState::builtin()?,
            };
            Ok(Arc::new(state))
        })
        .map(Arc::clone)
}

/// A stored layout with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLayout {
    pub id: String,
    pub name: String,
    pub layout: StaggeredBlockLayout,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub use_count: u32,
}

/// Registry of block layouts, one JSON file per layout
pub struct LayoutRegistry {
    registry_dir: PathBuf,
    layouts: HashMap<String, StoredLayout>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_LAYOUT_DIR)
    }

    /// Open a registry in `dir`, loading any layouts already there.
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut registry = Self {
            registry_dir: dir.as_ref().to_path_buf(),
            layouts: HashMap::new(),
        };
        registry.load_all();
        registry
    }

    fn load_all(&mut self) {
        let entries = match fs::read_dir(&self.registry_dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let loaded = fs::read_to_string(&path)
                .map_err(RegistryError::from)
                .and_then(|content| Ok(serde_json::from_str::<StoredLayout>(&content)?));
            match loaded {
                Ok(stored) => {
                    self.layouts.insert(stored.id.clone(), stored);
                }
                Err(e) => log_warning(format!("Skipping {}: {}", path.display(), e)),
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.registry_dir
    }

    /// All layouts, oldest first.
    pub fn list(&self) -> Vec<&StoredLayout> {
        let mut layouts: Vec<&StoredLayout> = self.layouts.values().collect();
        layouts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        layouts
    }

    pub fn get(&self, id: &str) -> RegistryResult<&StoredLayout> {
        self.layouts
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Layouts whose blocks are found in `grid`, best match first.
    ///
    /// A block counts as found when header detection puts a block with the
    /// same label at the same column.
    pub fn find_compatible(&self, grid: &RawGrid) -> Vec<(&StoredLayout, f64)> {
        let mut compatible: Vec<(&StoredLayout, f64)> = self
            .list()
            .into_iter()
            .map(|stored| (stored, compatibility(&stored.layout, grid)))
            .filter(|(_, score)| *score > MIN_COMPATIBILITY)
            .collect();

        compatible.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.use_count.cmp(&a.0.use_count))
        });
        compatible
    }

    /// Save a layout under a new id.
    pub fn save(&mut self, layout: StaggeredBlockLayout, name: &str) -> RegistryResult<String> {
        layout.check().map_err(RegistryError::InvalidTemplate)?;
        fs::create_dir_all(&self.registry_dir)?;

        let mut id = generate_id(name);
        while self.layouts.contains_key(&id) {
            id.push('x');
        }

        let stored = StoredLayout {
            id: id.clone(),
            name: name.to_string(),
            layout,
            created_at: Utc::now(),
            last_used: None,
            use_count: 0,
        };
        self.write(&stored)?;
        self.layouts.insert(id.clone(), stored);
        Ok(id)
    }

    /// Import a layout from a JSON file, validated against the layout schema.
    pub fn import(&mut self, path: &Path, name: Option<&str>) -> RegistryResult<String> {
        let content = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let layout = parse_layout(&value).map_err(|e| RegistryError::InvalidTemplate(e.to_string()))?;

        let name = name.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("imported")
        });
        self.save(layout, name)
    }

    /// Bump the usage counters of a layout and persist them.
    pub fn record_use(&mut self, id: &str) -> RegistryResult<()> {
        let stored = self
            .layouts
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        stored.last_used = Some(Utc::now());
        stored.use_count = stored.use_count.saturating_add(1);

        let snapshot = stored.clone();
        self.write(&snapshot)
    }

    pub fn delete(&mut self, id: &str) -> RegistryResult<()> {
        if self.layouts.remove(id).is_none() {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        fs::remove_file(self.path_for(id))?;
        Ok(())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.registry_dir.join(format!("{}.json", id))
    }

    fn write(&self, stored: &StoredLayout) -> RegistryResult<()> {
        let content = serde_json::to_string_pretty(stored)?;
        fs::write(self.path_for(&stored.id), content)?;
        Ok(())
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Share of `layout`'s blocks that header detection finds in `grid`.
fn compatibility(layout: &StaggeredBlockLayout, grid: &RawGrid) -> f64 {
    if layout.blocks.is_empty() {
        return 0.0;
    }

    let detected = detect_layout(grid, layout.block_width);
    let found = layout
        .blocks
        .iter()
        .filter(|block| {
            detected.blocks.iter().any(|d| {
                d.offset == block.offset && d.label.eq_ignore_ascii_case(block.label.trim())
            })
        })
        .count();

    found as f64 / layout.blocks.len() as f64
}

/// `"East Coast v2"` → `"east-coast-v2-1718000000000"`
fn generate_id(name: &str) -> String {
    let slug = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let slug = if slug.is_empty() { "layout".to_string() } else { slug };
    format!("{}-{}", slug, Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockSpec;
    use crate::parser::parse_grid;
    use tempfile::tempdir;

    fn staggered() -> RawGrid {
        parse_grid(
            "Central Region,,,,,,\nOutlet,Pass,Fail,,Sabah Region,,\nMT,4,2,,Outlet,Pass,Fail\n,,,,KK,6,2\n",
            ',',
        )
        .unwrap()
    }

    fn two_blocks() -> StaggeredBlockLayout {
        StaggeredBlockLayout::new(vec![BlockSpec::new(0, "Central"), BlockSpec::new(4, "Sabah")])
    }

    #[test]
    fn test_generate_id_slug() {
        let id = generate_id("East Coast  v2!");
        assert!(id.starts_with("east-coast-v2-"));
        assert!(generate_id("***").starts_with("layout-"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let id = {
            let mut registry = LayoutRegistry::with_dir(dir.path());
            registry.save(two_blocks(), "Two regions").unwrap()
        };

        let registry = LayoutRegistry::with_dir(dir.path());
        let stored = registry.get(&id).unwrap();
        assert_eq!(stored.name, "Two regions");
        assert_eq!(stored.layout, two_blocks());
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn test_save_rejects_overlap() {
        let dir = tempdir().unwrap();
        let mut registry = LayoutRegistry::with_dir(dir.path());
        let bad = StaggeredBlockLayout::new(vec![BlockSpec::new(0, "A"), BlockSpec::new(1, "B")]);
        assert!(matches!(
            registry.save(bad, "bad"),
            Err(RegistryError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_find_compatible() {
        let dir = tempdir().unwrap();
        let mut registry = LayoutRegistry::with_dir(dir.path());
        let matching = registry.save(two_blocks(), "match").unwrap();
        registry
            .save(
                StaggeredBlockLayout::new(vec![BlockSpec::new(0, "Johor"), BlockSpec::new(8, "Perak")]),
                "other",
            )
            .unwrap();

        let found = registry.find_compatible(&staggered());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.id, matching);
        assert!((found[0].1 - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_import_validates() {
        let dir = tempdir().unwrap();
        let mut registry = LayoutRegistry::with_dir(dir.path().join("layouts"));

        let good = dir.path().join("east.json");
        fs::write(&good, r#"{"blocks":[{"offset":0,"label":"East Coast"}]}"#).unwrap();
        let id = registry.import(&good, None).unwrap();
        assert_eq!(registry.get(&id).unwrap().name, "east");

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"blockWidth":1,"blocks":[]}"#).unwrap();
        assert!(matches!(
            registry.import(&bad, None),
            Err(RegistryError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_record_use_and_delete() {
        let dir = tempdir().unwrap();
        let mut registry = LayoutRegistry::with_dir(dir.path());
        let id = registry.save(two_blocks(), "two").unwrap();

        registry.record_use(&id).unwrap();
        let reloaded = LayoutRegistry::with_dir(dir.path());
        assert_eq!(reloaded.get(&id).unwrap().use_count, 1);
        assert!(reloaded.get(&id).unwrap().last_used.is_some());

        registry.delete(&id).unwrap();
        assert!(matches!(registry.get(&id), Err(RegistryError::NotFound(_))));
        assert!(registry.delete(&id).is_err());
        assert!(!dir.path().join(format!("{}.json", id)).exists());
    }

    #[test]
    fn test_shared_state_is_memoized() {
        let first = shared_state(None).unwrap();
        let second = shared_state(None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
