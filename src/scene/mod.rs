//! Scene data owned once per render and shared read-only by every worker thread (§5): the
//! triangle mesh, its kd-tree, the material table, and the light list.

mod obj_loader;

pub use obj_loader::{ObjLoadError, load_obj};

use crate::geometry::{Ray, TexturePoint, WorldBox, WorldTriangle, WorldVector};
use crate::kdtree::{Hit, KdTree, KdTreeBuildError, KdTreeBuildParams};
use crate::light::Light;
use crate::material::{MaterialHandle, MaterialTable};

/// Flattened triangle soup. Per §9's resolved open question, instancing is not modelled: a
/// scene with multiple meshes is flattened into one world-space triangle list before the
/// kd-tree is built.
#[derive(Clone, Debug)]
pub struct TriangleMesh {
    triangles: Vec<WorldTriangle>,
    /// Per-triangle, per-vertex shading normals. Falls back to the geometric normal (flat
    /// shading) for triangles whose source format did not supply vertex normals.
    normals: Vec<[WorldVector; 3]>,
    uvs: Vec<[TexturePoint; 3]>,
}

impl TriangleMesh {
    pub fn new(
        triangles: Vec<WorldTriangle>,
        normals: Vec<[WorldVector; 3]>,
        uvs: Vec<[TexturePoint; 3]>,
    ) -> Self {
        debug_assert_eq!(triangles.len(), normals.len());
        debug_assert_eq!(triangles.len(), uvs.len());
        TriangleMesh { triangles, normals, uvs }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangles(&self) -> &[WorldTriangle] {
        &self.triangles
    }

    pub fn triangle(&self, index: u32) -> &WorldTriangle {
        &self.triangles[index as usize]
    }

    pub fn shading_normals(&self, index: u32) -> [WorldVector; 3] {
        self.normals[index as usize]
    }

    pub fn uvs(&self, index: u32) -> [TexturePoint; 3] {
        self.uvs[index as usize]
    }

    pub fn bounds(&self) -> WorldBox {
        self.triangles
            .iter()
            .map(|t| t.bounds())
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| WorldBox::new(Default::default(), Default::default()))
    }
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub mesh: TriangleMesh,
    pub kdtree: KdTree,
    pub materials: MaterialTable,
    /// Material assigned to each triangle, parallel to `mesh.triangles()`.
    pub triangle_materials: Vec<MaterialHandle>,
    pub lights: Vec<Light>,
}

impl Scene {
    pub fn build(
        mesh: TriangleMesh,
        materials: MaterialTable,
        triangle_materials: Vec<MaterialHandle>,
        lights: Vec<Light>,
        kdtree_params: &KdTreeBuildParams,
    ) -> Result<Self, KdTreeBuildError> {
        debug_assert_eq!(mesh.triangle_count(), triangle_materials.len());
        let kdtree = KdTree::build(mesh.triangles(), kdtree_params)?;
        Ok(Scene {
            mesh,
            kdtree,
            materials,
            triangle_materials,
            lights,
        })
    }

    pub fn intersect(&self, ray: &Ray, t_max: f32) -> Option<Hit> {
        self.kdtree.intersect(self.mesh.triangles(), ray, t_max)
    }

    pub fn material_for_triangle(&self, triangle_index: u32) -> MaterialHandle {
        self.triangle_materials[triangle_index as usize]
    }
}
