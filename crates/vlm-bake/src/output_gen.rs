use crate::error::BakeError;
use crate::identifier::{self, clean_filename, vpx_identifier};
use crate::types::BakeObject;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Name of the manifest listing every exported bake.
pub const MANIFEST_NAME: &str = "bakes.txt";

/// Write a bake result as OBJ: nested UVs as texture coordinates and fade
/// weights as vertex colors.
pub fn write_obj(object: &BakeObject, path: &Path) -> Result<(), BakeError> {
    let mesh = &object.mesh;
    let mut file = BufWriter::new(fs::File::create(path)?);

    writeln!(file, "# Generated by vlm-bake - do not edit")?;
    writeln!(
        file,
        "# {} ({}, nestmap {}, hdr range {})",
        object.name,
        object.bake_type.as_str(),
        object.nestmap,
        object.hdr_range
    )?;
    writeln!(file, "o {}", vpx_identifier(&object.name))?;

    // Fade weights are set per vertex, so any loop of a vertex will do.
    let mut weight = vec![1.0f32; mesh.positions.len()];
    for face in &mesh.faces {
        for k in 0..3 {
            if let Some(w) = weight.get_mut(face.verts[k] as usize) {
                *w = face.color[k];
            }
        }
    }
    for (p, w) in mesh.positions.iter().zip(&weight) {
        writeln!(file, "v {} {} {} {} {} {}", p.x, p.y, p.z, w, w, w)?;
    }
    for face in &mesh.faces {
        for uv in &face.nested_uv {
            writeln!(file, "vt {} {}", uv[0], uv[1])?;
        }
    }
    for (i, face) in mesh.faces.iter().enumerate() {
        let t = i * 3 + 1;
        writeln!(
            file,
            "f {}/{} {}/{} {}/{}",
            face.verts[0] + 1,
            t,
            face.verts[1] + 1,
            t + 1,
            face.verts[2] + 1,
            t + 2
        )?;
    }
    file.flush()?;
    Ok(())
}

/// One manifest line: identifier, nestmap, bake type, HDR range, sync
/// lights and sync transform, tab separated.
fn manifest_line(object: &BakeObject) -> String {
    let sync_light: Vec<String> = object.sync_light.iter().map(|l| vpx_identifier(l)).collect();
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        vpx_identifier(&object.name),
        object.nestmap,
        object.bake_type.as_str(),
        object.hdr_range,
        sync_light.join(","),
        object.sync_trans.as_deref().map(vpx_identifier).unwrap_or_default()
    )
}

/// Write the manifest of all exported objects, sorted by name.
pub fn write_manifest(objects: &[BakeObject], out_dir: &Path) -> Result<PathBuf, BakeError> {
    let path = out_dir.join(MANIFEST_NAME);
    let mut file = fs::File::create(&path)?;

    writeln!(file, "# Generated by vlm-bake - do not edit")?;
    writeln!(file, "# identifier\tnestmap\ttype\thdr_range\tsync_light\tsync_trans")?;

    let mut sorted: Vec<&BakeObject> = objects.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    for object in sorted {
        writeln!(file, "{}", manifest_line(object))?;
    }
    Ok(path)
}

/// Export every object as OBJ plus the manifest. Fails before writing
/// anything if two objects map to the same script identifier.
pub fn write_export(objects: &[BakeObject], out_dir: &Path) -> Result<Vec<PathBuf>, BakeError> {
    identifier::check_collisions(objects.iter().map(|o| o.name.as_str()))?;
    fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(objects.len() + 1);
    for object in objects {
        let path = out_dir.join(format!("{}.obj", clean_filename(&object.name)));
        log::debug!("Writing {}", path.display());
        write_obj(object, &path)?;
        written.push(path);
    }
    written.push(write_manifest(objects, out_dir)?);
    log::info!("Exported {} bakes to {}", objects.len(), out_dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::quad;
    use crate::obj_converter;
    use crate::types::BakeType;

    fn nested_quad(name: &str) -> BakeObject {
        let mut object = BakeObject::new(name, quad(0.0, 0.0, 1.0, 1.0, 0));
        for face in &mut object.mesh.faces {
            face.nested_uv = face.uv.map(|uv| [uv[0] * 0.5, uv[1] * 0.25]);
        }
        object.nestmap = 2;
        object
    }

    #[test]
    fn test_write_obj_uses_nested_uvs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        let object = nested_quad("Parts.BM.Environment");
        write_obj(&object, &path).unwrap();

        let reloaded = obj_converter::load_mesh(&path).unwrap();
        assert_eq!(reloaded.triangle_count(), 2);
        assert_eq!(reloaded.positions.len(), 4);
        for (a, b) in reloaded.faces.iter().zip(&object.mesh.faces) {
            assert_eq!(a.verts, b.verts);
            assert_eq!(a.uv, b.nested_uv);
        }
    }

    #[test]
    fn test_write_obj_vertex_colors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faded.obj");
        let mut object = nested_quad("faded");
        object.mesh.faces[1].color = [1.0, 1.0, 0.0];
        write_obj(&object, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("o VLM_faded"));
        // Vertex 3 is only used by the faded loop.
        assert!(content.contains("v 0 1 0 0 0 0"));
        assert!(content.contains("v 1 0 0 1 1 1"));
    }

    #[test]
    fn test_manifest_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut lm = nested_quad("VLM.Parts.LM.Inserts");
        lm.bake_type = BakeType::Lightmap;
        lm.hdr_range = 2.5;
        lm.sync_light = vec!["L1".to_string(), "L2".to_string()];
        let bm = nested_quad("Parts.BM.Environment");

        let path = write_manifest(&[lm, bm], dir.path()).unwrap();
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "VLM_Parts_BM_Environment\t2\tstatic\t1\t\t");
        assert_eq!(lines[1], "VLM_Parts_LM_Inserts\t2\tlightmap\t2.5\tVLM_L1,VLM_L2\t");
    }

    #[test]
    fn test_export_rejects_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let objects = [nested_quad("Parts.BM"), nested_quad("Parts_BM")];
        let result = write_export(&objects, dir.path());
        assert!(matches!(result, Err(BakeError::IdentifierCollision { .. })));
        assert!(!dir.path().join(MANIFEST_NAME).exists());
    }

    #[test]
    fn test_export_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let objects = [nested_quad("a"), nested_quad("b")];
        let written = write_export(&objects, dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|p| p.is_file()));
    }
}
