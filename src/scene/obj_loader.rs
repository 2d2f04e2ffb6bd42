//! Minimal OBJ loader (§6 External Interfaces: "OBJ via standard indexed vertex/normal/UV
//! attribs"). STL and PLY parsing are external collaborators the core never touches directly
//! (§1); this loader exists so the CLI binary has something to hand the core.

use std::path::Path;

use thiserror::Error;
use wavefront_obj::obj;

use crate::geometry::{TexturePoint, WorldPoint, WorldTriangle, WorldVector};

use super::TriangleMesh;

#[derive(Debug, Error)]
pub enum ObjLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: obj::ParseError,
    },
    #[error("mesh has {0} triangles, exceeding the 2^30-1 capacity limit")]
    TooManyTriangles(usize),
}

const MAX_TRIANGLE_COUNT: usize = (1 << 30) - 1;

pub fn load_obj(path: impl AsRef<Path>) -> Result<TriangleMesh, ObjLoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ObjLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let obj_set = obj::parse(text).map_err(|source| ObjLoadError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let mut triangles = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();

    for object in &obj_set.objects {
        let vertex = |index: usize| -> WorldPoint {
            let v = object.vertices[index];
            WorldPoint::new(v.x as f32, v.y as f32, v.z as f32)
        };
        let normal = |index: usize| -> WorldVector {
            let n = object.normals[index];
            WorldVector::new(n.x as f32, n.y as f32, n.z as f32)
        };
        let uv = |index: usize| -> TexturePoint {
            let t = object.tex_vertices[index];
            TexturePoint::new(t.u as f32, t.v as f32)
        };

        for geometry in &object.geometry {
            for shape in &geometry.shapes {
                let obj::Primitive::Triangle(a, b, c) = shape.primitive else {
                    continue;
                };

                triangles.push(WorldTriangle::new(
                    vertex(a.0),
                    vertex(b.0),
                    vertex(c.0),
                ));

                let tri_normals = match (a.2, b.2, c.2) {
                    (Some(na), Some(nb), Some(nc)) => [normal(na), normal(nb), normal(nc)],
                    _ => {
                        let flat = triangles.last().unwrap().normal().normalize();
                        [flat, flat, flat]
                    }
                };
                normals.push(tri_normals);

                let tri_uvs = match (a.1, b.1, c.1) {
                    (Some(ta), Some(tb), Some(tc)) => [uv(ta), uv(tb), uv(tc)],
                    _ => [TexturePoint::origin(); 3],
                };
                uvs.push(tri_uvs);
            }
        }
    }

    if triangles.len() > MAX_TRIANGLE_COUNT {
        return Err(ObjLoadError::TooManyTriangles(triangles.len()));
    }

    Ok(TriangleMesh::new(triangles, normals, uvs))
}
