//! Render-group partitioning.
//!
//! Objects are assigned to groups such that no two objects of a group
//! overlap on screen. Overlap is tested on low resolution alpha masks that
//! are first grown by a few pixels, so members of different groups also
//! keep a small gap. Each group keeps the per-pixel maximum of its members'
//! masks.

use crate::cache::{self, BakePaths};
use crate::error::BakeError;
use crate::render::Renderer;
use crate::types::{BakeConfig, BakeObject};
use vlm_raster::Coverage;

/// Single channel alpha buffer, row 0 is `v = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMask {
    pub width: u32,
    pub height: u32,
    pub alpha: Vec<f32>,
}

impl AlphaMask {
    /// A fully transparent mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: vec![0.0; width as usize * height as usize],
        }
    }

    /// Opaque where the coverage buffer is set.
    pub fn from_coverage(coverage: &Coverage) -> Self {
        let (width, height) = (coverage.width(), coverage.height());
        let mut alpha = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                alpha.push(if coverage.get(x, y) { 1.0 } else { 0.0 });
            }
        }
        Self {
            width,
            height,
            alpha,
        }
    }

    /// Alpha at `(x, y)`, 0 outside the mask.
    pub fn get(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0.0;
        }
        self.alpha[y as usize * self.width as usize + x as usize]
    }

    /// Whether any pixel is above `threshold`.
    pub fn any_above(&self, threshold: f32) -> bool {
        self.alpha.iter().any(|&a| a > threshold)
    }

    /// Grow the mask by compositing it over itself shifted one pixel up,
    /// down, left and right, `padding` times.
    ///
    /// Each shift is composited onto the result of the previous one, so a
    /// pass grows the mask by one pixel in every direction, diagonals
    /// included.
    pub fn padded(&self, padding: u32) -> AlphaMask {
        let mut current = self.clone();
        for _ in 0..padding {
            for (dx, dy) in [(0i64, 1i64), (0, -1), (1, 0), (-1, 0)] {
                let source = current.clone();
                for y in 0..self.height as i64 {
                    for x in 0..self.width as i64 {
                        let s = source.get(x - dx, y - dy);
                        let i = y as usize * self.width as usize + x as usize;
                        let d = current.alpha[i];
                        current.alpha[i] = s + d * (1.0 - s);
                    }
                }
            }
        }
        current
    }

    /// Whether both masks have a pixel above `threshold` at the same place.
    pub fn overlaps(&self, other: &AlphaMask, threshold: f32) -> bool {
        self.alpha
            .iter()
            .zip(other.alpha.iter())
            .any(|(&a, &b)| a > threshold && b > threshold)
    }

    /// Per-pixel maximum with another mask of the same size.
    pub fn max_assign(&mut self, other: &AlphaMask) {
        for (a, &b) in self.alpha.iter_mut().zip(other.alpha.iter()) {
            *a = a.max(b);
        }
    }
}

/// Result of a partition: a group id per object and a mask per group.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Group of each object, -1 for objects without a mask.
    pub groups: Vec<i32>,
    /// Combined padded mask of each group.
    pub masks: Vec<AlphaMask>,
}

impl Partition {
    pub fn group_count(&self) -> usize {
        self.masks.len()
    }
}

/// Assign a group to every object from its padded mask.
///
/// `preassigned` holds, for each object, a group it must keep (>= 0) or -1.
/// Objects without a mask are left at their preassigned value. The others
/// are processed in order; even objects scan existing groups first to last,
/// odd objects last to first, and join the first group they do not overlap,
/// or open a new one.
pub fn assign_groups(
    masks: &[Option<AlphaMask>],
    preassigned: &[i32],
    width: u32,
    height: u32,
    threshold: f32,
) -> Partition {
    let mut groups: Vec<i32> = (0..masks.len())
        .map(|i| preassigned.get(i).copied().unwrap_or(-1))
        .collect();
    let mut group_masks: Vec<AlphaMask> = Vec::new();

    // Fixed groups are laid down first so the others avoid them.
    for (mask, &group) in masks.iter().zip(groups.iter()) {
        if let (Some(mask), true) = (mask, group >= 0) {
            while group_masks.len() <= group as usize {
                group_masks.push(AlphaMask::new(width, height));
            }
            group_masks[group as usize].max_assign(mask);
        }
    }

    for (index, mask) in masks.iter().enumerate() {
        let Some(mask) = mask else {
            continue;
        };
        if groups[index] >= 0 {
            continue;
        }
        let candidates: Vec<usize> = if index % 2 == 0 {
            (0..group_masks.len()).collect()
        } else {
            (0..group_masks.len()).rev().collect()
        };
        let found = candidates
            .into_iter()
            .find(|&g| !group_masks[g].overlaps(mask, threshold));
        let group = match found {
            Some(g) => {
                group_masks[g].max_assign(mask);
                g
            }
            None => {
                group_masks.push(mask.clone());
                group_masks.len() - 1
            }
        };
        log::debug!("Object #{} assigned to group {}", index, group);
        groups[index] = group as i32;
    }

    Partition {
        groups,
        masks: group_masks,
    }
}

/// Render (or reuse) every object mask, partition the objects and persist
/// the group masks.
///
/// Movable and indirect-only objects are skipped and keep group -1. Objects
/// already carrying a group keep it. Returns the padded mask of each group.
pub fn compute_render_groups(
    objects: &mut [BakeObject],
    config: &BakeConfig,
    paths: &BakePaths,
    renderer: &mut dyn Renderer,
) -> Result<Vec<AlphaMask>, BakeError> {
    let (width, height) = config.mask_size();
    let padding = config.mask_padding();
    paths.create_dirs()?;

    log::info!(
        "Evaluating render groups for {} objects (mask {}x{}, padding {} pixels)",
        objects.len(),
        width,
        height,
        padding
    );

    let mut masks = Vec::with_capacity(objects.len());
    for object in objects.iter_mut() {
        if object.is_ungrouped() {
            object.render_group = -1;
            masks.push(None);
            continue;
        }
        let path = paths.object_mask(&object.name);
        let cached = if config.force {
            None
        } else {
            cache::load_mask(&path, width, height)?
        };
        let mask = match cached {
            Some(mask) => mask,
            None => {
                log::debug!("Rendering mask of {}", object.name);
                let mask = renderer.render_mask(object, width, height)?;
                cache::save_mask(&path, &mask)?;
                mask
            }
        };
        if !mask.any_above(config.mask_threshold) {
            log::warn!("{} is not visible from the bake camera", object.name);
        }
        masks.push(Some(mask.padded(padding)));
    }

    let preassigned: Vec<i32> = objects.iter().map(|o| o.render_group).collect();
    let partition = assign_groups(&masks, &preassigned, width, height, config.mask_threshold);

    for (object, &group) in objects.iter_mut().zip(partition.groups.iter()) {
        object.render_group = group;
    }
    for (i, mask) in partition.masks.iter().enumerate() {
        cache::save_mask(&paths.group_mask(i), mask)?;
    }

    log::info!(
        "{} objects split into {} render groups",
        objects.len(),
        partition.group_count()
    );
    Ok(partition.masks)
}
