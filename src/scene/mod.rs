//! Scene access
//!
//! The coverage core never owns the scene. It reads shadow casters and the
//! panel through [`SceneProvider`], which [`Scene`] implements for callers that
//! have no scene graph of their own (and for tests).

mod bake;
mod bounds;
mod graph;
mod mesh;
mod transform;

pub(crate) use bake::local_up;
pub use bake::{top_face_normal, BakedMesh};
pub use bounds::Aabb;
pub use graph::Scene;
pub use mesh::MeshData;
pub use transform::Transform;

use glam::Mat4;

/// Stable identity of a scene node. Panels are cached by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// A node's geometry as seen by the depth passes.
#[derive(Debug, Clone, Copy)]
pub struct Renderable<'a> {
    /// Node identity.
    pub id: NodeId,
    /// Fully composed local-to-world transform.
    pub world: Mat4,
    /// Local-space geometry.
    pub mesh: &'a MeshData,
    /// Whether the node blocks sunlight.
    pub casts_shadow: bool,
}

impl Renderable<'_> {
    /// World-space bounds.
    pub fn world_aabb(&self) -> Aabb {
        self.mesh.aabb().transformed(&self.world)
    }
}

/// Read-only view of a scene graph.
pub trait SceneProvider {
    /// Every node that has geometry.
    fn renderables(&self) -> Vec<Renderable<'_>>;

    /// Look up one node by id.
    fn renderable(&self, id: NodeId) -> Option<Renderable<'_>> {
        self.renderables().into_iter().find(|r| r.id == id)
    }

    /// Nodes flagged as shadow casters.
    fn shadow_casters(&self) -> Vec<Renderable<'_>> {
        self.renderables()
            .into_iter()
            .filter(|r| r.casts_shadow)
            .collect()
    }
}
