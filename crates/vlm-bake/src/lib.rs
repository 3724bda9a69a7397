/// Error types for the bake stages.
pub mod error;

/// Core type definitions: configuration, bake objects, scenarios.
pub mod types;

/// Cache file names and script identifiers.
pub mod identifier;

/// Triangle mesh with projected and nested UVs.
pub mod mesh;

/// OBJ to bake object conversion.
pub mod obj_converter;

/// Boundary with the external renderer.
pub mod render;

/// On-disk stage cache.
pub mod cache;

/// Render-group partitioning.
pub mod group;

/// Lighting scenario derivation.
pub mod scenario;

/// Per-scenario light influence maps.
pub mod influence;

/// Lightmap pruning.
pub mod prune;

/// UV island extraction and island masks.
pub mod island;

/// Island nesting onto texture pages.
pub mod nest;

/// Nestmap compositing and output.
pub mod nestmap;

/// Output file generation (OBJ + manifest).
pub mod output_gen;

/// Bake stage orchestration.
pub mod pipeline;

pub use error::BakeError;
pub use nest::{nest, NestOutcome, NestSettings};
pub use pipeline::Bake;
pub use prune::{prune, PruneOutcome};
pub use render::{Renderer, UvMaskRenderer};
pub use types::{BakeConfig, BakeObject, BakeStep, BakeType, HdrImage};

use std::fs;
use std::path::{Path, PathBuf};

/// Load every `.obj` of a directory as a bake object, sorted by file name.
pub fn load_objects(dir: &Path) -> Result<Vec<BakeObject>, BakeError> {
    let mut files = collect_files(dir, "obj");
    files.sort();
    if files.is_empty() {
        return Err(BakeError::MissingInput(format!(
            "no OBJ file in {}",
            dir.display()
        )));
    }
    let objects = files
        .iter()
        .map(|path| {
            log::info!("Loading {}", path.display());
            obj_converter::load_object(path)
        })
        .collect::<Result<Vec<_>, _>>()?;
    identifier::check_collisions(objects.iter().map(|o| o.name.as_str()))?;
    Ok(objects)
}

/// Partition the objects of a directory into render groups, using masks
/// rasterized from their projected UVs. Group masks are cached.
pub fn group_objects(dir: &Path, config: &BakeConfig) -> Result<Vec<BakeObject>, BakeError> {
    config.validate()?;
    let paths = cache::BakePaths::new(config)?;
    let mut objects = load_objects(dir)?;
    group::compute_render_groups(&mut objects, config, &paths, &mut UvMaskRenderer)?;
    Ok(objects)
}

/// Outcome of pruning a single mesh.
#[derive(Debug, Clone)]
pub struct PruneReport {
    pub object: BakeObject,
    pub outcome: PruneOutcome,
    pub discarded: bool,
    /// Written OBJ, `None` when discarded.
    pub output: Option<PathBuf>,
}

/// Prune one lightmap mesh against the cached renders of `scenario` and
/// write the result to the export directory.
pub fn prune_mesh(
    input: &Path,
    scenario: &str,
    n_groups: usize,
    config: &BakeConfig,
) -> Result<PruneReport, BakeError> {
    config.validate()?;
    let paths = cache::BakePaths::new(config)?;
    let mut object = obj_converter::load_object(input)?;
    let (pw, ph) = config.prune_size();
    object.mesh.subdivide_long_edges(
        config.render_aspect_ratio,
        config.cut_threshold,
        config.subdivide_passes,
    );

    let vmap = prune::build_visibility_map(&object.mesh, pw, ph);
    let influence = influence::InfluenceMap::load(&paths, scenario, n_groups, pw, ph)?;
    let outcome = prune::prune(&mut object.mesh, &vmap, &influence, config.lm_threshold)?;
    let discarded = prune::should_discard(&object.mesh, outcome.hdr_range, config.lm_threshold);

    object.name = format!("{}.LM.{}", object.name, scenario);
    object.bake_type = BakeType::Lightmap;
    object.lighting = scenario.to_string();
    object.hdr_range = outcome.hdr_range;

    let output = if discarded {
        None
    } else {
        fs::create_dir_all(paths.export_dir())?;
        let path = paths
            .export_dir()
            .join(format!("{}.obj", identifier::clean_filename(&object.name)));
        // Nested UVs are not computed yet, export the projected ones.
        let mut exported = object.clone();
        for face in &mut exported.mesh.faces {
            face.nested_uv = face.uv;
        }
        output_gen::write_obj(&exported, &path)?;
        Some(path)
    };
    Ok(PruneReport {
        object,
        outcome,
        discarded,
        output,
    })
}

/// Nest the objects of a directory, then write them with nested UVs and an
/// occupancy preview of every page to the export directory.
pub fn nest_objects(dir: &Path, config: &BakeConfig) -> Result<(Vec<BakeObject>, NestOutcome), BakeError> {
    config.validate()?;
    let paths = cache::BakePaths::new(config)?;
    let mut objects = load_objects(dir)?;
    let (render_w, render_h) = config.render_size();
    let page = config.page_size();
    let outcome = nest::nest(
        &mut objects,
        &NestSettings {
            source_width: render_w,
            source_height: render_h,
            page_width: page,
            page_height: page,
            padding: config.nest_padding,
            first_id: 0,
        },
    )?;

    paths.create_dirs()?;
    output_gen::write_export(&objects, &paths.export_dir())?;
    for layout in &outcome.pages {
        cache::save_ldr(&paths.nestmap(layout.id, "png"), &occupancy(layout))?;
    }
    Ok((objects, outcome))
}

/// Page preview with every island in a shade of gray.
fn occupancy(layout: &nest::PageLayout) -> HdrImage {
    let mut image = HdrImage::new(layout.width, layout.height);
    for (i, placed) in layout.islands.iter().enumerate() {
        let shade = 0.4 + 0.6 * ((i * 7) % 10) as f32 / 9.0;
        let p = placed.placement;
        for (lx, ly) in placed.mask.pixels() {
            let (x, y) = placed.mask.place_pixel(p.orientation, p.x, p.y, lx, ly);
            image.set(x, y, [shade, shade, shade, 1.0]);
        }
    }
    image
}

/// Collect files with a given extension from a directory (non-recursive).
fn collect_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let matches = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if matches {
                files.push(path);
            }
        }
    }
    files
}
