use indexmap::IndexMap;

use crate::core::{Point, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::interaction::PointerKind;
use crate::render::{RegionId, RegionScene, SurfaceBackend};

/// Recorded state of one region in a `MemorySurface`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRegion {
    pub name: String,
    pub parent: Option<RegionId>,
    pub scene: RegionScene,
    pub position: Option<Point>,
    pub visible: bool,
    pub listeners: Vec<PointerKind>,
    pub render_count: usize,
}

/// Headless surface used by tests and server-side rendering.
///
/// It keeps the full region tree in memory and still validates every scene so
/// tests catch invalid geometry without a real backend.
#[derive(Debug, Default)]
pub struct MemorySurface {
    regions: IndexMap<RegionId, MemoryRegion>,
    next_id: u64,
    container: Option<Viewport>,
    pub created_count: usize,
    pub removed_count: usize,
}

impl MemorySurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_container_size(width: u32, height: u32) -> Self {
        Self {
            container: Some(Viewport::new(width, height)),
            ..Self::default()
        }
    }

    /// Simulates the host container being resized.
    pub fn set_container_size(&mut self, size: Option<Viewport>) {
        self.container = size;
    }

    #[must_use]
    pub fn region(&self, id: RegionId) -> Option<&MemoryRegion> {
        self.regions.get(&id)
    }

    #[must_use]
    pub fn region_named(&self, name: &str) -> Option<&MemoryRegion> {
        self.regions.values().find(|region| region.name == name)
    }

    #[must_use]
    pub fn live_region_count(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.regions.values().map(|region| region.listeners.len()).sum()
    }

    fn region_mut(&mut self, id: RegionId) -> ChartResult<&mut MemoryRegion> {
        self.regions
            .get_mut(&id)
            .ok_or_else(|| ChartError::InvalidData(format!("unknown region id {}", id.raw())))
    }
}

impl SurfaceBackend for MemorySurface {
    fn create_region(&mut self, parent: Option<RegionId>, name: &str) -> ChartResult<RegionId> {
        if let Some(parent) = parent {
            self.region_mut(parent)?;
        }
        let id = RegionId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.regions.insert(
            id,
            MemoryRegion {
                name: name.to_owned(),
                parent,
                scene: RegionScene::default(),
                position: None,
                visible: true,
                listeners: Vec::new(),
                render_count: 0,
            },
        );
        self.created_count += 1;
        Ok(id)
    }

    fn remove_region(&mut self, region: RegionId) -> ChartResult<()> {
        if self.regions.values().any(|r| r.parent == Some(region)) {
            return Err(ChartError::InvalidData(format!(
                "region {} still has children",
                region.raw()
            )));
        }
        self.regions
            .shift_remove(&region)
            .ok_or_else(|| ChartError::InvalidData(format!("unknown region id {}", region.raw())))?;
        self.removed_count += 1;
        Ok(())
    }

    fn render_region(&mut self, region: RegionId, scene: &RegionScene) -> ChartResult<()> {
        scene.validate()?;
        let entry = self.region_mut(region)?;
        entry.scene = scene.clone();
        entry.render_count += 1;
        Ok(())
    }

    fn set_region_position(&mut self, region: RegionId, x: f64, y: f64) -> ChartResult<()> {
        self.region_mut(region)?.position = Some(Point::new(x, y));
        Ok(())
    }

    fn set_region_visible(&mut self, region: RegionId, visible: bool) -> ChartResult<()> {
        self.region_mut(region)?.visible = visible;
        Ok(())
    }

    fn attach_listener(&mut self, region: RegionId, kind: PointerKind) -> ChartResult<()> {
        self.region_mut(region)?.listeners.push(kind);
        Ok(())
    }

    fn detach_listener(&mut self, region: RegionId, kind: PointerKind) -> ChartResult<()> {
        let entry = self.region_mut(region)?;
        if let Some(index) = entry.listeners.iter().position(|k| *k == kind) {
            entry.listeners.remove(index);
        }
        Ok(())
    }

    fn container_size(&self) -> Option<Viewport> {
        self.container
    }
}
