use std::path::PathBuf;

use crate::error::BakeError;
use crate::mesh::Mesh;

/// Largest nestmap page edge accepted.
pub const MAX_TEX_SIZE: u32 = 8192;

/// Configuration shared by all bake stages.
#[derive(Debug, Clone)]
pub struct BakeConfig {
    /// Saved project file. `None` for an unsaved project, which cannot bake.
    pub project_path: Option<PathBuf>,
    /// Height of the light renders in pixels (default: 4096).
    pub render_height: u32,
    /// Render width divided by render height (default: 0.5).
    pub render_aspect_ratio: f32,
    /// Height of the object masks used for render-group partitioning (default: 1024).
    pub mask_height: u32,
    /// Height of the visibility and influence maps used for pruning (default: 256).
    pub prune_height: u32,
    /// Maximum nestmap page edge in pixels (default: 4096, at most 8192).
    pub tex_size: u32,
    /// Minimum pixel gap kept around every packed island (default: 3).
    pub nest_padding: u32,
    /// Influence below this value is treated as unlit (default: 0.02).
    pub lm_threshold: f32,
    /// Mask alpha above this value counts as opaque (default: 0).
    pub mask_threshold: f32,
    /// Re-render even when a cached render exists.
    pub force: bool,
    /// Also write WebP copies of the nestmaps (default: true).
    pub save_webp: bool,
    /// Back faces turned away from the camera by more than this angle (degrees)
    /// are removed. 90 or more disables the removal (default: 90).
    pub backface_limit_angle: f32,
    /// Keep back faces that are visible through the playfield reflection.
    pub keep_reflection_faces: bool,
    /// Projected edge length from which bake mesh edges are split (default: 0.1).
    pub cut_threshold: f32,
    /// Maximum number of edge splitting passes, 0 disables it (default: 8).
    pub subdivide_passes: u32,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            project_path: None,
            render_height: 4096,
            render_aspect_ratio: 0.5,
            mask_height: 1024,
            prune_height: 256,
            tex_size: 4096,
            nest_padding: 3,
            lm_threshold: 0.02,
            mask_threshold: 0.0,
            force: false,
            save_webp: true,
            backface_limit_angle: 90.0,
            keep_reflection_faces: false,
            cut_threshold: 0.1,
            subdivide_passes: 8,
        }
    }
}

impl BakeConfig {
    fn size_for_height(&self, height: u32) -> (u32, u32) {
        let width = (height as f32 * self.render_aspect_ratio) as u32;
        (width.max(1), height.max(1))
    }

    /// Light render size `(width, height)`.
    pub fn render_size(&self) -> (u32, u32) {
        self.size_for_height(self.render_height)
    }

    /// Object mask size used by the partitioner.
    pub fn mask_size(&self) -> (u32, u32) {
        self.size_for_height(self.mask_height)
    }

    /// Visibility and influence map size, never larger than the renders.
    pub fn prune_size(&self) -> (u32, u32) {
        self.size_for_height(self.prune_height.min(self.render_height))
    }

    /// Dilation applied to object masks so that two objects sharing a group
    /// stay at least two render pixels apart.
    pub fn mask_padding(&self) -> u32 {
        let render_height = self.render_height.max(1);
        (self.mask_height * 2).div_ceil(render_height)
    }

    /// Effective nestmap page edge.
    pub fn page_size(&self) -> u32 {
        self.tex_size.clamp(1, MAX_TEX_SIZE)
    }

    /// Root directory of every cached artifact, next to the project file.
    pub fn bake_dir(&self) -> Result<PathBuf, BakeError> {
        let project = self.project_path.as_ref().ok_or(BakeError::UnsavedProject)?;
        let stem = project
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or(BakeError::UnsavedProject)?;
        let parent = project.parent().map(PathBuf::from).unwrap_or_default();
        Ok(parent.join(format!("{} - Bakes", stem)))
    }

    /// Check ranges before any stage starts.
    pub fn validate(&self) -> Result<(), BakeError> {
        if self.render_height == 0 || self.mask_height == 0 || self.prune_height == 0 {
            return Err(BakeError::Validation(
                "render, mask and prune heights must be non-zero".to_string(),
            ));
        }
        if !(self.render_aspect_ratio.is_finite() && self.render_aspect_ratio > 0.0) {
            return Err(BakeError::Validation(format!(
                "render aspect ratio must be positive, got {}",
                self.render_aspect_ratio
            )));
        }
        if self.tex_size == 0 {
            return Err(BakeError::Validation("texture size must be non-zero".to_string()));
        }
        if !(self.cut_threshold.is_finite() && self.cut_threshold > 0.0) {
            return Err(BakeError::Validation(format!(
                "edge cut threshold must be positive, got {}",
                self.cut_threshold
            )));
        }
        if !(self.lm_threshold.is_finite() && self.lm_threshold >= 0.0) {
            return Err(BakeError::Validation(format!(
                "lightmap threshold must be a non-negative number, got {}",
                self.lm_threshold
            )));
        }
        Ok(())
    }
}

/// How a bake result is blended by the real-time renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeType {
    /// Opaque, non-movable base bake.
    Static,
    /// Translucent bake, drawn back to front.
    Active,
    /// Additive light contribution.
    Lightmap,
    /// Playfield bake, rendered with table reflections.
    Playfield,
}

impl BakeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BakeType::Static => "static",
            BakeType::Active => "active",
            BakeType::Lightmap => "lightmap",
            BakeType::Playfield => "playfield",
        }
    }
}

/// A mesh plus everything the bake stages attach to it.
#[derive(Debug, Clone)]
pub struct BakeObject {
    /// Unique object name.
    pub name: String,
    /// Name of the bake collection it comes from.
    pub collection: String,
    /// Triangulated geometry with projected and nested UVs.
    pub mesh: Mesh,
    /// Render group, -1 until partitioned (stays -1 for movable objects).
    pub render_group: i32,
    /// Blending mode of the result.
    pub bake_type: BakeType,
    /// Lighting scenario the object was baked for.
    pub lighting: String,
    /// Maximum channel value of its renders, 1.0 for solid bakes.
    pub hdr_range: f32,
    /// Nestmap page id, -1 until nested.
    pub nestmap: i32,
    /// Pixel origin of its first island on its nestmap page.
    pub nestmap_offset: [u32; 2],
    /// Movable objects are rendered on their own, never grouped.
    pub movable: bool,
    /// Only affects rendering indirectly (reflections, shadows).
    pub indirect_only: bool,
    /// Lights whose state drives this lightmap at runtime.
    pub sync_light: Vec<String>,
    /// Table element whose transform this bake follows.
    pub sync_trans: Option<String>,
}

impl BakeObject {
    /// A static object with default metadata.
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            collection: String::new(),
            mesh,
            render_group: -1,
            bake_type: BakeType::Static,
            lighting: String::new(),
            hdr_range: 1.0,
            nestmap: -1,
            nestmap_offset: [0, 0],
            movable: false,
            indirect_only: false,
            sync_light: Vec::new(),
            sync_trans: None,
        }
    }

    /// Whether the partitioner leaves this object ungrouped.
    pub fn is_ungrouped(&self) -> bool {
        self.movable || self.indirect_only
    }
}

/// A user-authored set of objects baked together.
#[derive(Debug, Clone)]
pub struct BakeCollection {
    pub name: String,
    pub objects: Vec<BakeObject>,
    /// One bake per object instead of a single merged bake.
    pub split: bool,
    /// Opaque collections get their lightmaps merged together.
    pub opaque: bool,
    /// Baked as the playfield.
    pub playfield: bool,
}

/// Whether a scenario is the base lighting or an isolated light contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    /// World lighting, opaque, never pruned.
    Solid,
    /// Light group or single light on a black background, prunable.
    Lightmap,
}

/// Screen-space area of influence of a light, as an ellipse in normalized
/// render coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aoi {
    pub center: [f32; 2],
    pub radius: [f32; 2],
}

impl Aoi {
    /// Whether the normalized point lies inside the ellipse.
    pub fn contains(&self, p: [f32; 2]) -> bool {
        if self.radius[0] <= 0.0 || self.radius[1] <= 0.0 {
            return false;
        }
        let dx = (p[0] - self.center[0]) / self.radius[0];
        let dy = (p[1] - self.center[1]) / self.radius[1];
        dx * dx + dy * dy <= 1.0
    }
}

/// One lighting configuration rendered and baked as a unit.
#[derive(Debug, Clone)]
pub struct LightingScenario {
    pub name: String,
    pub kind: ScenarioKind,
    /// Source light collection, `None` for the environment.
    pub light_collection: Option<String>,
    /// Contributing lights.
    pub lights: Vec<String>,
    /// One material per render group, `VLM.{scenario}.RG{group}`.
    pub materials: Vec<String>,
    /// Optional screen-space area of influence used to skip group renders.
    pub aoi: Option<Aoi>,
}

impl LightingScenario {
    pub fn is_lightmap(&self) -> bool {
        self.kind == ScenarioKind::Lightmap
    }
}

/// A user-authored light grouping, input of scenario derivation.
#[derive(Debug, Clone)]
pub struct LightCollection {
    pub name: String,
    pub lights: Vec<String>,
    /// All lights baked together as one scenario instead of one per light.
    pub group_mode: bool,
    /// Hidden collections are not baked.
    pub hidden: bool,
    /// Optional area of influence shared by the scenarios of this collection.
    pub aoi: Option<Aoi>,
}

/// Floating-point RGBA image, row 0 is `v = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 4]>,
}

impl HdrImage {
    /// A transparent black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; width as usize * height as usize],
        }
    }

    /// Pixel at `(x, y)`, transparent black outside the image.
    pub fn get(&self, x: u32, y: u32) -> [f32; 4] {
        if x >= self.width || y >= self.height {
            return [0.0; 4];
        }
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: [f32; 4]) {
        if x < self.width && y < self.height {
            self.pixels[y as usize * self.width as usize + x as usize] = value;
        }
    }
}

/// Last completed bake stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BakeStep {
    Groups,
    Renders,
    Meshes,
    Nestmaps,
    Export,
}

impl BakeStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BakeStep::Groups => "groups",
            BakeStep::Renders => "renders",
            BakeStep::Meshes => "meshes",
            BakeStep::Nestmaps => "nestmaps",
            BakeStep::Export => "export",
        }
    }
}
