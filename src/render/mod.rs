mod memory_surface;
mod primitives;
mod scene;
mod surface;

pub use memory_surface::{MemoryRegion, MemorySurface};
pub use primitives::{Color, LinePrimitive, RectPrimitive, TextHAlign, TextPrimitive};
pub use scene::RegionScene;
pub use surface::{DrawingSurfaceHandle, ListenerId, Region, RegionId, SurfaceBackend};
