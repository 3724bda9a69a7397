//! Nestmap textures.
//!
//! Results are nested in two sets so that HDR lightmaps never share a page
//! with display-ready LDR content, then every page is composited by copying
//! render pixels island by island.

use std::collections::HashMap;

use crate::cache::{self, BakePaths};
use crate::error::BakeError;
use crate::nest::{nest, NestOutcome, NestSettings, PageLayout};
use crate::types::{BakeConfig, BakeObject, BakeType, HdrImage};

/// Group renders loaded on demand, keyed by scenario and render group.
#[derive(Debug, Default)]
pub struct RenderCache {
    paths: Option<BakePaths>,
    images: HashMap<(String, u32), Option<HdrImage>>,
}

impl RenderCache {
    /// Renders read from the bake directory.
    pub fn new(paths: BakePaths) -> Self {
        Self {
            paths: Some(paths),
            images: HashMap::new(),
        }
    }

    /// Renders provided by the caller only.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scenario: &str, group: u32, image: HdrImage) {
        self.images.insert((scenario.to_string(), group), Some(image));
    }

    /// Render of `group` lit by `scenario`, `None` when it was never rendered.
    pub fn get(&mut self, scenario: &str, group: u32) -> Result<Option<&HdrImage>, BakeError> {
        let key = (scenario.to_string(), group);
        if !self.images.contains_key(&key) {
            let image = match &self.paths {
                Some(paths) => {
                    let path = paths.group_render(scenario, group as usize);
                    if path.is_file() {
                        Some(cache::load_hdr(&path)?)
                    } else {
                        None
                    }
                }
                None => None,
            };
            self.images.insert(key.clone(), image);
        }
        Ok(self.images.get(&key).and_then(|i| i.as_ref()))
    }
}

/// Factor applied to an object's render pixels so HDR lightmaps fit `[0, 1]`.
pub fn brightness(object: &BakeObject) -> f32 {
    if object.bake_type == BakeType::Lightmap && object.hdr_range > 1.0 {
        1.0 / object.hdr_range
    } else {
        1.0
    }
}

/// Whether an object belongs in the LDR nestmap set.
pub fn is_ldr(object: &BakeObject) -> bool {
    object.bake_type == BakeType::Active || object.hdr_range <= 1.0
}

/// Copy the pixels of every island placed on `layout` from its render.
///
/// `objects` must be the slice the layout was nested from.
pub fn composite_page(
    layout: &PageLayout,
    objects: &[BakeObject],
    renders: &mut RenderCache,
) -> Result<HdrImage, BakeError> {
    let mut page = HdrImage::new(layout.width, layout.height);
    for placed in &layout.islands {
        let object = objects
            .get(placed.object_index)
            .filter(|o| o.name == placed.object)
            .ok_or_else(|| {
                BakeError::Consistency(format!(
                    "island of {} does not match object #{}",
                    placed.object, placed.object_index
                ))
            })?;
        let scale = brightness(object);
        let Some(render) = renders.get(&object.lighting, placed.mask.material)? else {
            log::warn!(
                "No render for {} group {}, island of {} left black",
                object.lighting,
                placed.mask.material,
                object.name
            );
            continue;
        };
        let p = placed.placement;
        let [ox, oy] = placed.mask.origin;
        for (lx, ly) in placed.mask.pixels() {
            let (sx, sy) = (ox + lx as i64, oy + ly as i64);
            if sx < 0 || sy < 0 {
                continue;
            }
            let c = render.get(sx as u32, sy as u32);
            let (dx, dy) = placed.mask.place_pixel(p.orientation, p.x, p.y, lx, ly);
            page.set(dx, dy, [c[0] * scale, c[1] * scale, c[2] * scale, c[3]]);
        }
    }
    Ok(page)
}

/// Page counts of a nestmap run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestmapSummary {
    pub ldr_pages: usize,
    pub hdr_pages: usize,
    pub splits: Vec<String>,
}

/// Nest the LDR and HDR sets of `results` and return their layouts.
///
/// The HDR page ids continue after the LDR ones. Results come back LDR set
/// first, split objects appended to their set.
pub fn nest_results(
    results: &mut Vec<BakeObject>,
    config: &BakeConfig,
) -> Result<(Vec<PageLayout>, NestmapSummary), BakeError> {
    let (render_w, render_h) = config.render_size();
    let page = config.page_size();
    let settings = NestSettings {
        source_width: render_w,
        source_height: render_h,
        page_width: page,
        page_height: page,
        padding: config.nest_padding,
        first_id: 0,
    };

    let (mut ldr, mut hdr): (Vec<BakeObject>, Vec<BakeObject>) =
        std::mem::take(results).into_iter().partition(is_ldr);
    log::info!("Nesting {} LDR and {} HDR bakes", ldr.len(), hdr.len());
    let ldr_outcome: NestOutcome = nest(&mut ldr, &settings)?;
    let hdr_outcome = nest(
        &mut hdr,
        &NestSettings {
            first_id: ldr_outcome.page_count(),
            ..settings
        },
    )?;

    let summary = NestmapSummary {
        ldr_pages: ldr_outcome.page_count(),
        hdr_pages: hdr_outcome.page_count(),
        splits: ldr_outcome
            .splits
            .iter()
            .chain(&hdr_outcome.splits)
            .cloned()
            .collect(),
    };
    // HDR islands index into the HDR set, which now follows the LDR one.
    let mut hdr_pages = hdr_outcome.pages;
    for placed in hdr_pages.iter_mut().flat_map(|p| p.islands.iter_mut()) {
        placed.object_index += ldr.len();
    }
    results.extend(ldr);
    results.extend(hdr);
    let pages = ldr_outcome.pages.into_iter().chain(hdr_pages).collect();
    Ok((pages, summary))
}

/// Write one composited page as EXR, PNG and optionally WebP.
pub fn save_page(paths: &BakePaths, id: usize, image: &HdrImage, webp: bool) -> Result<(), BakeError> {
    cache::save_exr(&paths.nestmap(id, "exr"), image)?;
    cache::save_ldr(&paths.nestmap(id, "png"), image)?;
    if webp {
        cache::save_ldr(&paths.nestmap(id, "webp"), image)?;
    }
    Ok(())
}
