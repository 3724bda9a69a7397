//! Bake stages.
//!
//! A [`Bake`] owns the inputs and the intermediate state of a project and
//! runs the stages in order: render groups, group renders, bake meshes,
//! nestmaps and export. Each stage caches its outputs on disk and returns
//! the [`BakeStep`] it completed; a stage fails if the previous one has not
//! run yet.

use std::collections::HashMap;

use glam::Vec3;
use rayon::prelude::*;

use crate::cache::{self, BakePaths};
use crate::error::BakeError;
use crate::group::{self, AlphaMask};
use crate::influence::InfluenceMap;
use crate::mesh::Mesh;
use crate::nest::PageLayout;
use crate::nestmap::{self, NestmapSummary, RenderCache};
use crate::output_gen;
use crate::prune::{self, build_visibility_map};
use crate::render::Renderer;
use crate::scenario::derive_scenarios;
use crate::types::{
    Aoi, BakeCollection, BakeConfig, BakeObject, BakeStep, BakeType, LightCollection,
    LightingScenario,
};

/// Whether an area of influence touches an opaque pixel of a group mask.
pub fn aoi_touches(aoi: &Aoi, mask: &AlphaMask, threshold: f32) -> bool {
    let (w, h) = (mask.width as f32, mask.height as f32);
    (0..mask.height).any(|y| {
        (0..mask.width).any(|x| {
            mask.get(x as i64, y as i64) > threshold
                && aoi.contains([(x as f32 + 0.5) / w, (y as f32 + 0.5) / h])
        })
    })
}

/// A solid bake mesh before it is instantiated per scenario.
#[derive(Debug, Clone)]
struct BakeMesh {
    name: String,
    collection: String,
    mesh: Mesh,
    /// Object whose transform the bake follows.
    sync: Option<String>,
    translucent: bool,
    playfield: bool,
}

impl BakeMesh {
    fn bake_type(&self) -> BakeType {
        if self.translucent {
            BakeType::Active
        } else if self.playfield {
            BakeType::Playfield
        } else {
            BakeType::Static
        }
    }
}

/// State of a bake project.
#[derive(Debug)]
pub struct Bake {
    pub config: BakeConfig,
    pub paths: BakePaths,
    /// Bake camera position, used for back face removal and face sorting.
    pub camera: Vec3,
    pub collections: Vec<BakeCollection>,
    pub light_collections: Vec<LightCollection>,
    pub scenarios: Vec<LightingScenario>,
    /// Padded mask of each render group.
    pub group_masks: Vec<AlphaMask>,
    /// Bake results, filled by the mesh stage.
    pub results: Vec<BakeObject>,
    /// Nestmap pages, filled by the nestmap stage.
    pub pages: Vec<PageLayout>,
    pub nestmaps: NestmapSummary,
    pub last_step: Option<BakeStep>,
}

impl Bake {
    /// Check the preconditions of a bake. Nothing is written yet.
    pub fn new(
        config: BakeConfig,
        collections: Vec<BakeCollection>,
        light_collections: Vec<LightCollection>,
        camera: Vec3,
    ) -> Result<Self, BakeError> {
        config.validate()?;
        let paths = BakePaths::new(&config)?;
        if collections.iter().all(|c| c.objects.is_empty()) {
            return Err(BakeError::MissingInput("no object to bake".to_string()));
        }
        Ok(Self {
            config,
            paths,
            camera,
            collections,
            light_collections,
            scenarios: Vec::new(),
            group_masks: Vec::new(),
            results: Vec::new(),
            pages: Vec::new(),
            nestmaps: NestmapSummary::default(),
            last_step: None,
        })
    }

    fn require(&self, step: BakeStep) -> Result<(), BakeError> {
        if self.last_step.is_some_and(|s| s >= step) {
            Ok(())
        } else {
            Err(BakeError::MissingInput(format!(
                "the {} stage must be run first",
                step.as_str()
            )))
        }
    }

    pub fn objects(&self) -> impl Iterator<Item = &BakeObject> {
        self.collections.iter().flat_map(|c| c.objects.iter())
    }

    /// Render slot of every rendered object. Slots `0..n_groups` are the
    /// render groups; ungrouped objects that are still baked (movable ones)
    /// get a slot of their own after them.
    fn slot_table(&self) -> HashMap<String, u32> {
        let mut slots = HashMap::new();
        let mut solo = self.group_masks.len() as u32;
        for object in self.objects().filter(|o| !o.indirect_only) {
            let slot = if object.render_group >= 0 {
                object.render_group as u32
            } else {
                solo += 1;
                solo - 1
            };
            slots.insert(object.name.clone(), slot);
        }
        slots
    }

    /// Number of renders per scenario.
    pub fn slot_count(&self) -> usize {
        let solo = self
            .objects()
            .filter(|o| !o.indirect_only && o.render_group < 0)
            .count();
        self.group_masks.len() + solo
    }

    /// Partition the objects into render groups and derive the scenarios.
    pub fn compute_groups(&mut self, renderer: &mut dyn Renderer) -> Result<BakeStep, BakeError> {
        let counts: Vec<usize> = self.collections.iter().map(|c| c.objects.len()).collect();
        let mut all: Vec<BakeObject> = self
            .collections
            .iter_mut()
            .flat_map(|c| std::mem::take(&mut c.objects))
            .collect();
        let result = group::compute_render_groups(&mut all, &self.config, &self.paths, renderer);
        let mut rest = all.into_iter();
        for (collection, n) in self.collections.iter_mut().zip(counts) {
            collection.objects = rest.by_ref().take(n).collect();
        }
        self.group_masks = result?;

        self.scenarios = derive_scenarios(&self.light_collections, self.slot_count());
        log::info!(
            "{} render groups, {} lighting scenarios",
            self.group_masks.len(),
            self.scenarios.len()
        );
        self.last_step = Some(BakeStep::Groups);
        Ok(BakeStep::Groups)
    }

    /// Render every slot for every scenario, reusing cached renders.
    ///
    /// A lightmap scenario with an area of influence skips the groups its
    /// ellipse does not reach; they count as unlit afterwards.
    pub fn render_all_groups(&mut self, renderer: &mut dyn Renderer) -> Result<BakeStep, BakeError> {
        self.require(BakeStep::Groups)?;
        self.paths.create_dirs()?;
        let (width, height) = self.config.render_size();
        let table = self.slot_table();
        let mut slots: Vec<Vec<&BakeObject>> = vec![Vec::new(); self.slot_count()];
        for object in self.objects() {
            if let Some(&slot) = table.get(&object.name) {
                if let Some(members) = slots.get_mut(slot as usize) {
                    members.push(object);
                }
            }
        }

        let (mut rendered, mut cached, mut skipped) = (0usize, 0usize, 0usize);
        for scenario in &self.scenarios {
            log::info!("Rendering {} ({} slots)", scenario.name, slots.len());
            for (slot, members) in slots.iter().enumerate() {
                if members.is_empty() {
                    continue;
                }
                let path = self.paths.group_render(&scenario.name, slot);
                if !self.config.force && cache::is_cached(&path, width, height) {
                    cached += 1;
                    continue;
                }
                if let (true, Some(aoi), Some(mask)) =
                    (scenario.is_lightmap(), scenario.aoi, self.group_masks.get(slot))
                {
                    if !aoi_touches(&aoi, mask, self.config.mask_threshold) {
                        log::debug!("{} does not reach group {}, skipped", scenario.name, slot);
                        skipped += 1;
                        continue;
                    }
                }
                let image = renderer.render_scenario(members, scenario, width, height)?;
                cache::save_exr(&path, &image)?;
                rendered += 1;
            }
        }
        log::info!(
            "{} renders done, {} cached, {} outside of light influence",
            rendered,
            cached,
            skipped
        );
        self.last_step = Some(BakeStep::Renders);
        Ok(BakeStep::Renders)
    }

    fn build_bake_meshes(&self) -> Vec<BakeMesh> {
        let slots = self.slot_table();
        let mut bakes = Vec::new();
        for collection in &self.collections {
            let objects: Vec<&BakeObject> = collection
                .objects
                .iter()
                .filter(|o| !o.indirect_only)
                .collect();
            let units: Vec<(String, Vec<&BakeObject>, Option<String>)> = if collection.split {
                objects
                    .iter()
                    .map(|o| (o.name.clone(), vec![*o], Some(o.name.clone())))
                    .collect()
            } else {
                let sync = objects.iter().find(|o| o.movable).map(|o| o.name.clone());
                vec![(collection.name.clone(), objects, sync)]
            };

            for (name, members, sync) in units {
                let mut mesh = Mesh::default();
                for object in members {
                    let mut part = object.mesh.clone();
                    part.set_material(slots.get(&object.name).copied().unwrap_or(0));
                    mesh.merge(&part);
                }
                if mesh.is_empty() {
                    log::warn!("Bake {} has no geometry, skipped", name);
                    continue;
                }
                // Moving bakes may turn their back faces towards the camera.
                if sync.is_none() {
                    let removed = mesh.remove_backfaces(
                        self.camera,
                        self.config.backface_limit_angle,
                        self.config.keep_reflection_faces,
                    );
                    if removed > 0 {
                        log::debug!("{}: {} back faces removed", name, removed);
                    }
                }
                let cut = mesh.subdivide_long_edges(
                    self.config.render_aspect_ratio,
                    self.config.cut_threshold,
                    self.config.subdivide_passes,
                );
                if cut > 0 {
                    log::debug!("{}: {} long edges split", name, cut);
                }
                let translucent = !collection.opaque;
                mesh.sort_faces_by_distance(self.camera, translucent);
                log::info!("Bake mesh {} has {} faces", name, mesh.triangle_count());
                bakes.push(BakeMesh {
                    name,
                    collection: collection.name.clone(),
                    mesh,
                    sync,
                    translucent,
                    playfield: collection.playfield,
                });
            }
        }
        bakes
    }

    /// Build the solid bakes of every solid scenario and the pruned
    /// lightmaps of every lightmap scenario.
    pub fn create_bake_meshes(&mut self) -> Result<BakeStep, BakeError> {
        self.require(BakeStep::Renders)?;
        let bakes = self.build_bake_meshes();
        let mut results = Vec::new();

        for bake in &bakes {
            for scenario in self.scenarios.iter().filter(|s| !s.is_lightmap()) {
                let mut result =
                    BakeObject::new(format!("{}.BM.{}", bake.name, scenario.name), bake.mesh.clone());
                result.collection = bake.collection.clone();
                result.bake_type = bake.bake_type();
                result.lighting = scenario.name.clone();
                result.sync_trans = bake.sync.clone();
                results.push(result);
            }
        }

        // Lightmaps of opaque, non-moving bakes are merged together.
        let mut lightmaps: Vec<BakeMesh> = Vec::new();
        let mut opaque: Option<usize> = None;
        for bake in bakes {
            match opaque {
                Some(i) if !bake.translucent && bake.sync.is_none() => {
                    let merged = &mut lightmaps[i];
                    merged.mesh.merge(&bake.mesh);
                    merged.collection = format!("{};{}", merged.collection, bake.collection);
                }
                None if !bake.translucent && bake.sync.is_none() => {
                    opaque = Some(lightmaps.len());
                    lightmaps.push(bake);
                }
                _ => lightmaps.push(bake),
            }
        }

        let (pw, ph) = self.config.prune_size();
        let vmaps: Vec<_> = lightmaps
            .par_iter()
            .map(|bake| build_visibility_map(&bake.mesh, pw, ph))
            .collect();
        let n_slots = self.slot_count();
        let threshold = self.config.lm_threshold;

        for scenario in self.scenarios.iter().filter(|s| s.is_lightmap()) {
            let influence = InfluenceMap::load(&self.paths, &scenario.name, n_slots, pw, ph)?;
            for (bake, vmap) in lightmaps.iter().zip(&vmaps) {
                let mut mesh = bake.mesh.clone();
                let total = mesh.triangle_count();
                let outcome = prune::prune(&mut mesh, vmap, &influence, threshold)?;
                if prune::should_discard(&mesh, outcome.hdr_range, threshold) {
                    log::debug!("{} discarded for {}", bake.name, scenario.name);
                    continue;
                }
                log::info!(
                    "{:>6} faces out of {:>6} kept (HDR range: {:>5.2}) for {} in {}",
                    outcome.kept,
                    total,
                    outcome.hdr_range,
                    bake.name,
                    scenario.name
                );
                let mut result = BakeObject::new(format!("{}.LM.{}", bake.name, scenario.name), mesh);
                result.collection = bake.collection.clone();
                result.bake_type = BakeType::Lightmap;
                result.lighting = scenario.name.clone();
                result.hdr_range = outcome.hdr_range;
                result.sync_light = scenario.lights.clone();
                result.sync_trans = bake.sync.clone();
                results.push(result);
            }
        }

        self.results = results;
        self.last_step = Some(BakeStep::Meshes);
        Ok(BakeStep::Meshes)
    }

    /// Nest the results and write one texture per page.
    pub fn render_nestmaps(&mut self) -> Result<BakeStep, BakeError> {
        self.require(BakeStep::Meshes)?;
        self.paths.create_dirs()?;
        let (pages, summary) = nestmap::nest_results(&mut self.results, &self.config)?;
        let mut renders = RenderCache::new(self.paths.clone());
        for page in &pages {
            let image = nestmap::composite_page(page, &self.results, &mut renders)?;
            nestmap::save_page(&self.paths, page.id, &image, self.config.save_webp)?;
            log::debug!("Nestmap {} is {}x{}", page.id, page.width, page.height);
        }
        log::info!(
            "{} LDR and {} HDR nestmaps, {} objects split",
            summary.ldr_pages,
            summary.hdr_pages,
            summary.splits.len()
        );
        self.pages = pages;
        self.nestmaps = summary;
        self.last_step = Some(BakeStep::Nestmaps);
        Ok(BakeStep::Nestmaps)
    }

    /// Write the results and their manifest to the export directory.
    pub fn export(&mut self) -> Result<BakeStep, BakeError> {
        self.require(BakeStep::Nestmaps)?;
        output_gen::write_export(&self.results, &self.paths.export_dir())?;
        self.last_step = Some(BakeStep::Export);
        Ok(BakeStep::Export)
    }

    /// Run every stage.
    pub fn run_all(&mut self, renderer: &mut dyn Renderer) -> Result<BakeStep, BakeError> {
        self.compute_groups(renderer)?;
        self.render_all_groups(renderer)?;
        self.create_bake_meshes()?;
        self.render_nestmaps()?;
        self.export()
    }
}
