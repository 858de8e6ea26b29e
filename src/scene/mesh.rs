//! CPU-side triangle meshes
//!
//! Scene nodes carry their geometry as plain position/normal/index arrays; the
//! depth passes bake world-space copies of these on every computation.

use super::Aabb;
use glam::Vec3;

/// An indexed triangle mesh in local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
    aabb: Aabb,
}

impl MeshData {
    /// Create a mesh from positions, optional per-vertex normals and indices.
    ///
    /// Normals are ignored unless there is exactly one per position; meshes
    /// without usable normals get flat face normals when baked. Triangles that
    /// reference missing vertices are dropped, as is a trailing partial
    /// triangle.
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let vertex_count = positions.len() as u32;
        let indices: Vec<u32> = indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| i < vertex_count))
            .flatten()
            .copied()
            .collect();
        let normals = if normals.len() == positions.len() {
            normals
        } else {
            Vec::new()
        };
        let aabb = Aabb::from_points(positions.iter().copied());

        Self {
            positions,
            normals,
            indices,
            aabb,
        }
    }

    /// Axis-aligned box centered at the origin with flat-shaded faces.
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        // (normal, tangent u, tangent v) for each face; u x v = normal keeps CCW winding.
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in faces {
            let base = positions.len() as u32;
            let center = normal * h;
            let du = u * h;
            let dv = v * h;
            positions.extend([
                center - du - dv,
                center + du - dv,
                center + du + dv,
                center - du + dv,
            ]);
            normals.extend([normal; 4]);
            indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(positions, normals, indices)
    }

    /// A solar panel: a thin slab whose top face (+Y) is the sun-facing plane.
    pub fn panel(width: f32, depth: f32, thickness: f32) -> Self {
        Self::cuboid(Vec3::new(width, thickness, depth))
    }

    /// A single upward-facing quad in the XZ plane.
    pub fn quad(width: f32, depth: f32) -> Self {
        let hw = width / 2.0;
        let hd = depth / 2.0;
        Self::new(
            vec![
                Vec3::new(-hw, 0.0, hd),
                Vec3::new(hw, 0.0, hd),
                Vec3::new(hw, 0.0, -hd),
                Vec3::new(-hw, 0.0, -hd),
            ],
            vec![Vec3::Y; 4],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    /// Vertex positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Per-vertex normals, empty when the mesh has none.
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Triangle indices.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Whether per-vertex normals are present.
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate triangles as local-space corner triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.positions[tri[0] as usize],
                self.positions[tri[1] as usize],
                self.positions[tri[2] as usize],
            ]
        })
    }

    /// Local-space bounds.
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_counts_and_bounds() {
        let mesh = MeshData::cuboid(Vec3::new(2.0, 1.0, 4.0));
        assert_eq!(mesh.positions().len(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.aabb().min, Vec3::new(-1.0, -0.5, -2.0));
        assert_eq!(mesh.aabb().max, Vec3::new(1.0, 0.5, 2.0));
    }

    #[test]
    fn test_cuboid_winding_matches_normals() {
        let mesh = MeshData::cuboid(Vec3::ONE);
        for (tri, idx) in mesh.triangles().zip(mesh.indices().chunks_exact(3)) {
            let face = (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize();
            let stored = mesh.normals()[idx[0] as usize];
            assert!(face.dot(stored) > 0.999, "face {face} vs normal {stored}");
        }
    }

    #[test]
    fn test_quad_faces_up() {
        let mesh = MeshData::quad(1.0, 1.0);
        for tri in mesh.triangles() {
            let face = (tri[1] - tri[0]).cross(tri[2] - tri[0]);
            assert!(face.y > 0.0);
        }
    }

    #[test]
    fn test_invalid_indices_dropped() {
        let mesh = MeshData::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Z],
            Vec::new(),
            vec![0, 1, 2, 0, 1, 7, 2],
        );
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.has_normals());
    }
}
