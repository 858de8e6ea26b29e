//! A minimal hierarchical scene.

use super::{MeshData, NodeId, Renderable, SceneProvider, Transform};
use glam::Mat4;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Node {
    transform: Transform,
    parent: Option<NodeId>,
    mesh: Option<Arc<MeshData>>,
    casts_shadow: bool,
}

/// Scene graph of transformed meshes with parent/child relationships.
///
/// Node ids are never reused, so a removed panel's id cannot alias a new node.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeId, Node>,
    next_id: u64,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Add a shadow-casting mesh node at the root.
    pub fn add_mesh(&mut self, mesh: Arc<MeshData>, transform: Transform) -> NodeId {
        self.insert(Node {
            transform,
            parent: None,
            mesh: Some(mesh),
            casts_shadow: true,
        })
    }

    /// Add a geometry-less grouping node at the root.
    pub fn add_group(&mut self, transform: Transform) -> NodeId {
        self.insert(Node {
            transform,
            parent: None,
            mesh: None,
            casts_shadow: false,
        })
    }

    /// Reparent `child`. Returns false if either node is missing or the
    /// change would create a cycle.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> bool {
        if !self.nodes.contains_key(&child) {
            return false;
        }
        if let Some(parent) = parent {
            if !self.nodes.contains_key(&parent) {
                return false;
            }
            let mut cursor = Some(parent);
            while let Some(id) = cursor {
                if id == child {
                    return false;
                }
                cursor = self.nodes.get(&id).and_then(|n| n.parent);
            }
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = parent;
        }
        true
    }

    /// Replace a node's local transform.
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    /// Flag a node as blocking (or not blocking) sunlight.
    pub fn set_casts_shadow(&mut self, id: NodeId, casts_shadow: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.casts_shadow = casts_shadow;
                true
            }
            None => false,
        }
    }

    /// A node's local transform.
    pub fn transform(&self, id: NodeId) -> Option<Transform> {
        self.nodes.get(&id).map(|n| n.transform)
    }

    /// A node's parent.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Direct children of a node.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent == Some(id))
            .map(|(&child, _)| child)
            .collect()
    }

    /// Composed local-to-world matrix of a node.
    pub fn world_transform(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.nodes.get(&id)?;
        let mut world = node.transform.to_matrix();
        while let Some(parent) = node.parent {
            node = self.nodes.get(&parent)?;
            world = node.transform.to_matrix() * world;
        }
        Some(world)
    }

    /// Remove a node and its whole subtree.
    ///
    /// Returns every removed id so the owner can drop cached coverage for
    /// panels that no longer exist.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        if !self.nodes.contains_key(&id) {
            return Vec::new();
        }
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(current));
            self.nodes.remove(&current);
            removed.push(current);
        }
        removed
    }

    /// Whether a node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl SceneProvider for Scene {
    fn renderables(&self) -> Vec<Renderable<'_>> {
        self.nodes
            .iter()
            .filter_map(|(&id, node)| {
                let mesh = node.mesh.as_deref()?;
                Some(Renderable {
                    id,
                    world: self.world_transform(id)?,
                    mesh,
                    casts_shadow: node.casts_shadow,
                })
            })
            .collect()
    }

    fn renderable(&self, id: NodeId) -> Option<Renderable<'_>> {
        let node = self.nodes.get(&id)?;
        Some(Renderable {
            id,
            world: self.world_transform(id)?,
            mesh: node.mesh.as_deref()?,
            casts_shadow: node.casts_shadow,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn cube() -> Arc<MeshData> {
        Arc::new(MeshData::cuboid(Vec3::ONE))
    }

    #[test]
    fn test_parent_child_world_transform() {
        let mut scene = Scene::new();
        let parent = scene.add_group(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        let child = scene.add_mesh(cube(), Transform::from_position(Vec3::new(0.0, 2.0, 0.0)));
        assert!(scene.set_parent(child, Some(parent)));

        let world = scene.world_transform(child).unwrap();
        let eps = 1e-5;
        assert!((world.transform_point3(Vec3::ZERO) - Vec3::new(1.0, 2.0, 0.0)).length() < eps);
    }

    #[test]
    fn test_cycles_rejected() {
        let mut scene = Scene::new();
        let a = scene.add_group(Transform::identity());
        let b = scene.add_group(Transform::identity());
        assert!(scene.set_parent(b, Some(a)));
        assert!(!scene.set_parent(a, Some(b)));
        assert!(!scene.set_parent(a, Some(a)));
        assert_eq!(scene.parent(a), None);
    }

    #[test]
    fn test_remove_subtree() {
        let mut scene = Scene::new();
        let root = scene.add_group(Transform::identity());
        let child = scene.add_mesh(cube(), Transform::identity());
        let grandchild = scene.add_mesh(cube(), Transform::identity());
        let other = scene.add_mesh(cube(), Transform::identity());
        scene.set_parent(child, Some(root));
        scene.set_parent(grandchild, Some(child));

        let mut removed = scene.remove(root);
        removed.sort();
        assert_eq!(removed, vec![root, child, grandchild]);
        assert_eq!(scene.len(), 1);
        assert!(scene.contains(other));
        assert!(scene.remove(root).is_empty());
    }

    #[test]
    fn test_provider_skips_groups_and_filters_casters() {
        let mut scene = Scene::new();
        scene.add_group(Transform::identity());
        let a = scene.add_mesh(cube(), Transform::identity());
        let b = scene.add_mesh(cube(), Transform::identity());
        scene.set_casts_shadow(b, false);

        assert_eq!(scene.renderables().len(), 2);
        let casters: Vec<_> = scene.shadow_casters().iter().map(|r| r.id).collect();
        assert_eq!(casters, vec![a]);
        assert!(scene.renderable(b).is_some());
    }

    #[test]
    fn test_ids_not_reused() {
        let mut scene = Scene::new();
        let a = scene.add_mesh(cube(), Transform::identity());
        scene.remove(a);
        let b = scene.add_mesh(cube(), Transform::identity());
        assert_ne!(a, b);
    }
}
