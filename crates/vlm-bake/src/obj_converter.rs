use crate::error::BakeError;
use crate::mesh::{Face, Mesh};
use crate::types::BakeObject;
use glam::Vec3;
use std::path::Path;

/// Load an OBJ file, merge all objects/groups and return a triangulated mesh.
///
/// OBJ texture coordinates become the projected UVs. Positions stay shared
/// between faces (no per-corner vertex splitting) so vertex adjacency
/// survives UV seams.
pub fn load_mesh(path: &Path) -> Result<Mesh, BakeError> {
    let load_options = tobj::LoadOptions {
        triangulate: true,
        single_index: false,
        ..Default::default()
    };

    let (models, _materials) =
        tobj::load_obj(path, &load_options).map_err(|e| BakeError::ObjParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if models.is_empty() {
        return Err(BakeError::Validation(format!(
            "OBJ file has no geometry: {}",
            path.display()
        )));
    }

    if models.len() > 1 {
        log::debug!(
            "OBJ contains {} objects/groups, all geometry will be merged",
            models.len()
        );
    }

    let mesh = merge_models(&models).map_err(|message| BakeError::ObjParse {
        path: path.to_path_buf(),
        message,
    })?;

    if mesh.is_empty() {
        return Err(BakeError::Validation(format!(
            "Mesh has no faces: {}",
            path.display()
        )));
    }

    Ok(mesh)
}

/// Load an OBJ file as a static bake object named after the file.
pub fn load_object(path: &Path) -> Result<BakeObject, BakeError> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| BakeError::Validation(format!("Invalid filename: {}", path.display())))?
        .to_string();
    let mesh = load_mesh(path)?;
    let mut object = BakeObject::new(name, mesh);
    object.collection = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    Ok(object)
}

/// Merge all tobj models into one mesh.
fn merge_models(models: &[tobj::Model]) -> Result<Mesh, String> {
    let mut mesh = Mesh::default();

    for model in models {
        let m = &model.mesh;
        if m.positions.is_empty() {
            continue;
        }

        let offset = mesh.positions.len() as u32;
        let vert_count = m.positions.len() / 3;
        mesh.positions.extend(
            m.positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
        );

        let has_uvs = !m.texcoords.is_empty() && m.texcoord_indices.len() == m.indices.len();
        if !has_uvs {
            log::warn!(
                "Mesh '{}' has no UV coordinates, using default (0.0, 0.0)",
                model.name
            );
        }

        for (t, tri) in m.indices.chunks_exact(3).enumerate() {
            let mut verts = [0u32; 3];
            let mut uv = [[0.0f32; 2]; 3];
            for k in 0..3 {
                let v = tri[k];
                if v as usize >= vert_count {
                    return Err(format!("vertex index {} out of range in '{}'", v, model.name));
                }
                verts[k] = v + offset;
                if has_uvs {
                    let ti = m.texcoord_indices[t * 3 + k] as usize;
                    if let Some(tc) = m.texcoords.get(ti * 2..ti * 2 + 2) {
                        uv[k] = [tc[0], tc[1]];
                    }
                }
            }
            mesh.faces.push(Face::new(verts, uv, 0));
        }
    }

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_merge_empty_models() {
        let models: Vec<tobj::Model> = Vec::new();
        let mesh = merge_models(&models).unwrap();
        assert!(mesh.is_empty());
        assert!(mesh.positions.is_empty());
    }

    #[test]
    fn test_load_quad_shares_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
             vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
             f 1/1 2/2 3/3 4/4\n",
        )
        .unwrap();
        let object = load_object(&path).unwrap();
        assert_eq!(object.name, "quad");
        assert_eq!(object.mesh.positions.len(), 4);
        assert_eq!(object.mesh.triangle_count(), 2);
        assert_eq!(object.mesh.faces[0].uv[1], [1.0, 0.0]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_mesh(Path::new("/nonexistent/none.obj"));
        assert!(matches!(result, Err(BakeError::ObjParse { .. })));
    }
}
