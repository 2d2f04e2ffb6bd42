//! Derives the per-hit shading context from a kd-tree [`Hit`]: interpolated shading normal,
//! UV, and the tangent frame BSDFs and delta scattering operate in.

use crate::bsdf::{Bsdf, Frame};
use crate::geometry::{TexturePoint, WorldPoint, WorldVector, offset_ray_origin};
use crate::kdtree::Hit;
use crate::material::{Material, MaterialHandle};
use crate::scene::Scene;

/// Everything the path integrator needs at a surface hit: the shading frame to transform
/// `wo`/`wi` into local space, the material to scatter off, and the geometric normal the
/// continuation ray is offset along for self-intersection avoidance (§4.8: "Ray-origin offset
/// on each continuation uses the geometric normal").
///
/// Ray differentials (`dpdx`, `dpdy`) for texture-footprint filtering are not tracked: the
/// integrator never samples textures directly (materials carry constant reflectances), so
/// there is no consumer for them in this core. See `DESIGN.md`.
pub struct ShadingContext {
    pub position: WorldPoint,
    pub geometric_normal: WorldVector,
    pub shading_normal: WorldVector,
    pub uv: TexturePoint,
    pub frame: Frame,
    pub material_handle: MaterialHandle,
    pub triangle_index: u32,
}

impl ShadingContext {
    pub fn from_hit(scene: &Scene, hit: &Hit) -> ShadingContext {
        let triangle = scene.mesh.triangle(hit.triangle_index);
        let weights = (1.0 - hit.b1 - hit.b2, hit.b1, hit.b2);

        let position = WorldPoint::from(
            triangle[0].coords * weights.0 + triangle[1].coords * weights.1 + triangle[2].coords * weights.2,
        );

        let geometric_normal = triangle.normal().normalize();

        let vertex_normals = scene.mesh.shading_normals(hit.triangle_index);
        let shading_normal = (vertex_normals[0] * weights.0
            + vertex_normals[1] * weights.1
            + vertex_normals[2] * weights.2)
            .normalize();
        // Keep the shading normal on the same side as the geometric one; interpolated vertex
        // normals can otherwise flip across silhouette edges on coarse meshes.
        let shading_normal = if shading_normal.dot(&geometric_normal) < 0.0 {
            -shading_normal
        } else {
            shading_normal
        };

        let vertex_uvs = scene.mesh.uvs(hit.triangle_index);
        let uv = TexturePoint::new(
            vertex_uvs[0].x * weights.0 + vertex_uvs[1].x * weights.1 + vertex_uvs[2].x * weights.2,
            vertex_uvs[0].y * weights.0 + vertex_uvs[1].y * weights.1 + vertex_uvs[2].y * weights.2,
        );

        let material_handle = scene.material_for_triangle(hit.triangle_index);

        ShadingContext {
            position,
            geometric_normal,
            shading_normal,
            uv,
            frame: Frame::from_normal(shading_normal),
            material_handle,
            triangle_index: hit.triangle_index,
        }
    }

    pub fn material<'a>(&self, scene: &'a Scene) -> &'a Material {
        scene.materials.get(self.material_handle)
    }

    pub fn bsdf(&self, scene: &Scene) -> Option<Bsdf> {
        self.material(scene).finite_bsdf()
    }

    /// Offsets a continuation ray's origin along the geometric normal, oriented to the same
    /// side as `direction`.
    pub fn offset_origin(&self, direction: WorldVector) -> WorldPoint {
        let n = if self.geometric_normal.dot(&direction) < 0.0 {
            -self.geometric_normal
        } else {
            self.geometric_normal
        };
        offset_ray_origin(self.position, n)
    }
}
