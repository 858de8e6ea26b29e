//! World-baked geometry snapshots
//!
//! Each computation copies the geometry it rasterizes into world space, so the
//! passes never see the live hierarchy and never depend on how many nodes it
//! has. A [`BakedMesh`] lives for a single computation.

use super::{Aabb, Renderable};
use crate::core::vertex::VertexPN;
use glam::{Mat3, Mat4, Vec3};

/// Flat, world-space triangle soup of one or more scene nodes.
#[derive(Debug, Clone, Default)]
pub struct BakedMesh {
    vertices: Vec<VertexPN>,
    indices: Vec<u32>,
    bounds: Aabb,
    sources: usize,
}

impl BakedMesh {
    /// Bake a single node.
    pub fn bake(renderable: &Renderable<'_>) -> Self {
        let mut baked = Self::default();
        baked.append(renderable);
        baked
    }

    /// Bake several nodes into one flat collection.
    pub fn flatten<'a, 'r: 'a>(renderables: impl IntoIterator<Item = &'a Renderable<'r>>) -> Self {
        let mut baked = Self::default();
        for renderable in renderables {
            baked.append(renderable);
        }
        baked
    }

    /// Append a node's geometry, transformed into world space.
    pub fn append(&mut self, renderable: &Renderable<'_>) {
        let world = renderable.world;
        let mesh = renderable.mesh;
        let normal_matrix = normal_matrix(&world);
        let base = self.vertices.len() as u32;

        if mesh.has_normals() {
            self.vertices.extend(
                mesh.positions()
                    .iter()
                    .zip(mesh.normals())
                    .map(|(&p, &n)| {
                        VertexPN::new(
                            world.transform_point3(p).to_array(),
                            (normal_matrix * n).normalize_or_zero().to_array(),
                        )
                    }),
            );
            self.indices
                .extend(mesh.indices().iter().map(|&i| base + i));
        } else {
            // No usable normals: emit unshared vertices with flat face normals.
            let flip = winding_sign(&world);
            for tri in mesh.triangles() {
                let corners = tri.map(|p| world.transform_point3(p));
                let normal = ((corners[1] - corners[0]).cross(corners[2] - corners[0]) * flip)
                    .normalize_or_zero();
                let start = self.vertices.len() as u32;
                self.vertices.extend(
                    corners.map(|c| VertexPN::new(c.to_array(), normal.to_array())),
                );
                self.indices.extend([start, start + 1, start + 2]);
            }
        }

        self.bounds = self.bounds.merge(&renderable.world_aabb());
        self.sources += 1;
    }

    /// World-space vertices.
    pub fn vertices(&self) -> &[VertexPN] {
        &self.vertices
    }

    /// Triangle indices into [`Self::vertices`].
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// World-space bounds of everything baked so far.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Number of nodes baked into this mesh.
    pub fn source_count(&self) -> usize {
        self.sources
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether there is nothing to rasterize.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate triangles as world-space vertex triples.
    pub fn triangles(&self) -> impl Iterator<Item = [VertexPN; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            ]
        })
    }
}

/// World-space normal of the face that best matches the node's own up axis.
///
/// Every triangle's geometric normal is taken from the cross product of its
/// world-space corners; the one most aligned with the node's local +Y (carried
/// through the normal matrix) is the sun-facing top face. Mirroring transforms
/// are compensated so normals keep pointing out of the solid. Returns `None`
/// when the mesh has no non-degenerate triangle.
pub fn top_face_normal(renderable: &Renderable<'_>) -> Option<Vec3> {
    let world = renderable.world;
    let up = (normal_matrix(&world) * Vec3::Y).normalize_or_zero();
    let up = if up == Vec3::ZERO { Vec3::Y } else { up };
    let flip = winding_sign(&world);

    renderable
        .mesh
        .triangles()
        .filter_map(|tri| {
            let [a, b, c] = tri.map(|p| world.transform_point3(p));
            let normal = (b - a).cross(c - a) * flip;
            let normal = normal.try_normalize()?;
            Some(normal)
        })
        .max_by(|x, y| x.dot(up).total_cmp(&y.dot(up)))
}

/// Local +Y of a node in world space, used when no top face can be found.
pub(crate) fn local_up(world: &Mat4) -> Vec3 {
    (normal_matrix(world) * Vec3::Y)
        .try_normalize()
        .unwrap_or(Vec3::Y)
}

fn normal_matrix(world: &Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(*world);
    if linear.determinant().abs() <= f32::EPSILON {
        linear
    } else {
        linear.inverse().transpose()
    }
}

fn winding_sign(world: &Mat4) -> f32 {
    if world.determinant() < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MeshData, NodeId};
    use glam::Quat;

    fn renderable(mesh: &MeshData, world: Mat4) -> Renderable<'_> {
        Renderable {
            id: NodeId(0),
            world,
            mesh,
            casts_shadow: true,
        }
    }

    #[test]
    fn test_bake_applies_world_transform() {
        let mesh = MeshData::cuboid(Vec3::ONE);
        let world = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let baked = BakedMesh::bake(&renderable(&mesh, world));

        assert_eq!(baked.vertices().len(), 24);
        assert_eq!(baked.triangle_count(), 12);
        assert!((baked.bounds().center() - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);
        assert!(baked.vertices().iter().all(|v| v.position[0] >= 9.5 - 1e-5));
    }

    #[test]
    fn test_flatten_offsets_indices() {
        let mesh = MeshData::cuboid(Vec3::ONE);
        let a = renderable(&mesh, Mat4::IDENTITY);
        let b = renderable(&mesh, Mat4::from_translation(Vec3::Y * 5.0));
        let baked = BakedMesh::flatten([&a, &b]);

        assert_eq!(baked.source_count(), 2);
        assert_eq!(baked.vertices().len(), 48);
        assert_eq!(*baked.indices().iter().max().unwrap(), 47);
        assert!((baked.bounds().max.y - 5.5).abs() < 1e-5);
    }

    #[test]
    fn test_flat_normals_without_vertex_normals() {
        let mesh = MeshData::new(
            vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), Vec3::X],
            Vec::new(),
            vec![0, 1, 2],
        );
        let baked = BakedMesh::bake(&renderable(&mesh, Mat4::IDENTITY));
        for v in baked.vertices() {
            assert!((Vec3::from(v.normal) - Vec3::Y).length() < 1e-5);
        }
    }

    #[test]
    fn test_top_face_of_tilted_panel() {
        let mesh = MeshData::panel(1.6, 1.0, 0.04);
        let tilt = Quat::from_rotation_x(-30f32.to_radians());
        let world = Mat4::from_rotation_translation(tilt, Vec3::new(0.0, 3.0, 0.0));
        let normal = top_face_normal(&renderable(&mesh, world)).unwrap();

        let expected = tilt * Vec3::Y;
        assert!((normal - expected).length() < 1e-4, "{normal} vs {expected}");
    }

    #[test]
    fn test_top_face_ignores_scale_and_mirroring() {
        let mesh = MeshData::panel(2.0, 1.0, 0.05);
        let world = Mat4::from_scale(Vec3::new(-3.0, 1.0, 0.5));
        let normal = top_face_normal(&renderable(&mesh, world)).unwrap();
        assert!((normal - Vec3::Y).length() < 1e-5, "{normal}");
    }

    #[test]
    fn test_top_face_none_for_empty_mesh() {
        let mesh = MeshData::default();
        assert!(top_face_normal(&renderable(&mesh, Mat4::IDENTITY)).is_none());
        assert_eq!(local_up(&Mat4::IDENTITY), Vec3::Y);
    }
}
