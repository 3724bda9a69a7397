//! Nesting of UV islands onto texture pages.
//!
//! Every island is discretized at the source render resolution (see
//! [`IslandMask`]) and placed on a page with a bottom-left search over a
//! per-column skyline of free spans. Placements are always at integer pixel
//! offsets, so the nested texture is a pixel exact copy of the renders.
//!
//! Objects are never spread over several pages: the islands of an object
//! are placed together, and an object too large for one page is split into
//! several objects first.

use std::cmp::Reverse;

use rayon::prelude::*;

use crate::error::BakeError;
use crate::island::{extract_islands, ColumnSpans, IslandMask, Orientation};
use crate::types::BakeObject;

/// Sizes used by one nesting run.
#[derive(Debug, Clone, Copy)]
pub struct NestSettings {
    /// Resolution of the renders the islands are cut from.
    pub source_width: u32,
    pub source_height: u32,
    /// Page size before cropping.
    pub page_width: u32,
    pub page_height: u32,
    /// Gap kept around each island, in pixels.
    pub padding: u32,
    /// Nestmap id of the first page.
    pub first_id: usize,
}

/// Where an island ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Page index within the run.
    pub page: usize,
    pub x: u32,
    pub y: u32,
    pub orientation: Orientation,
}

/// An island on a page, with what is needed to copy its pixels.
#[derive(Debug, Clone)]
pub struct PlacedIsland {
    /// Index of the object in the nested slice.
    pub object_index: usize,
    pub object: String,
    pub mask: IslandMask,
    pub placement: Placement,
}

/// A finished page, cropped to the placed islands.
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// Nestmap id.
    pub id: usize,
    pub width: u32,
    pub height: u32,
    pub islands: Vec<PlacedIsland>,
}

#[derive(Debug, Clone, Default)]
pub struct NestOutcome {
    pub pages: Vec<PageLayout>,
    /// Names of the objects created by splitting oversized objects.
    pub splits: Vec<String>,
}

impl NestOutcome {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Free space of a page, as sorted half-open free spans per column.
/// Neighbouring spans of a column are never adjacent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    width: u32,
    height: u32,
    free: Vec<Vec<(u32, u32)>>,
}

impl Page {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            free: vec![vec![(0, height)]; width as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Lowest `y` at which a mask with `columns` fits with its first column
    /// at `x`, or `None` if it does not fit at that `x`.
    pub fn find_y(&self, x: u32, columns: &ColumnSpans) -> Option<u32> {
        if x as usize + columns.len() > self.free.len() {
            return None;
        }
        let mut y = 0u32;
        'raise: loop {
            for (c, spans) in columns.iter().enumerate() {
                let free = &self.free[x as usize + c];
                for &(s, e) in spans {
                    let needed = e - s;
                    let fit = free
                        .iter()
                        .find(|&&(fs, fe)| fe >= y + e && fe - fs >= needed)?;
                    if fit.0 > y + s {
                        y = fit.0 - s;
                        continue 'raise;
                    }
                }
            }
            return Some(y);
        }
    }

    /// Bottom-left search over the given orientations, then over `x`.
    pub fn find_position(
        &self,
        mask: &IslandMask,
        order: &[Orientation],
    ) -> Option<(u32, u32, Orientation)> {
        for &orientation in order {
            let (w, _) = mask.size(orientation);
            if w > self.width {
                continue;
            }
            let columns = mask.columns(orientation);
            for x in 0..=(self.width - w) {
                if let Some(y) = self.find_y(x, columns) {
                    return Some((x, y, orientation));
                }
            }
        }
        None
    }

    /// Remove the footprint of a mask placed at `(x, y)` from the free spans.
    pub fn carve(&mut self, x: u32, y: u32, columns: &ColumnSpans) {
        for (c, spans) in columns.iter().enumerate() {
            let Some(free) = self.free.get_mut(x as usize + c) else {
                continue;
            };
            for &(s, e) in spans {
                let (lo, hi) = (y + s, y + e);
                let Some(i) = free.iter().position(|&(fs, fe)| fs <= lo && fe >= hi) else {
                    continue;
                };
                let (fs, fe) = free.remove(i);
                let mut at = i;
                if fs < lo {
                    free.insert(at, (fs, lo));
                    at += 1;
                }
                if hi < fe {
                    free.insert(at, (hi, fe));
                }
            }
        }
    }

    /// Give back the footprint of a mask carved at `(x, y)`.
    pub fn restore(&mut self, x: u32, y: u32, columns: &ColumnSpans) {
        for (c, spans) in columns.iter().enumerate() {
            let Some(free) = self.free.get_mut(x as usize + c) else {
                continue;
            };
            for &(s, e) in spans {
                let (mut lo, mut hi) = (y + s, y + e);
                let mut at = free.partition_point(|&(_, fe)| fe <= lo);
                if at > 0 && free[at - 1].1 == lo {
                    at -= 1;
                    lo = free.remove(at).0;
                }
                if at < free.len() && free[at].0 == hi {
                    hi = free.remove(at).1;
                }
                free.insert(at, (lo, hi));
            }
        }
    }

    /// Whether a page cell is still free.
    pub fn is_free(&self, x: u32, y: u32) -> bool {
        self.free
            .get(x as usize)
            .is_some_and(|spans| spans.iter().any(|&(s, e)| s <= y && y < e))
    }
}

/// Islands of one object, in extraction order.
#[derive(Debug, Clone, Default)]
struct ObjectIslands {
    faces: Vec<Vec<u32>>,
    masks: Vec<IslandMask>,
}

impl ObjectIslands {
    fn pixels(&self) -> usize {
        self.masks.iter().map(|m| m.pixel_count).sum()
    }
}

/// An island placement before the page list is final.
#[derive(Debug, Clone, Copy)]
struct Staged {
    object: usize,
    island: usize,
    x: u32,
    y: u32,
    orientation: Orientation,
}

fn prepare(object: &BakeObject, settings: &NestSettings) -> Result<ObjectIslands, BakeError> {
    let faces = extract_islands(&object.mesh);
    let masks: Vec<IslandMask> = faces
        .par_iter()
        .map(|island| {
            IslandMask::compute(
                &object.mesh,
                island,
                settings.source_width,
                settings.source_height,
                settings.padding,
            )
        })
        .collect();

    let empty = Page::new(settings.page_width, settings.page_height);
    for (i, mask) in masks.iter().enumerate() {
        if empty.find_position(mask, &Orientation::ALL).is_none() {
            return Err(BakeError::UnplaceableIsland {
                object: object.name.clone(),
                island: i,
                width: mask.width,
                height: mask.height,
                page_width: settings.page_width,
                page_height: settings.page_height,
            });
        }
    }
    Ok(ObjectIslands { faces, masks })
}

/// Place `items` on `page`, largest first. With `partial`, islands that do
/// not fit are skipped; otherwise the first misfit undoes the set and the
/// page is left as it was.
fn place_all(
    page: &mut Page,
    items: &[(usize, usize)],
    islands: &[ObjectIslands],
    partial: bool,
) -> Option<Vec<Staged>> {
    let mut items = items.to_vec();
    items.sort_by_key(|&(o, i)| Reverse(islands[o].masks[i].pixel_count));
    let mut staged = Vec::with_capacity(items.len());
    for (object, island) in items {
        let mask = &islands[object].masks[island];
        let order = Orientation::search_order(mask.width, mask.height);
        match page.find_position(mask, &order) {
            Some((x, y, orientation)) => {
                page.carve(x, y, mask.columns(orientation));
                staged.push(Staged {
                    object,
                    island,
                    x,
                    y,
                    orientation,
                });
            }
            None if partial => continue,
            None => {
                for s in staged.iter().rev() {
                    let mask = &islands[s.object].masks[s.island];
                    page.restore(s.x, s.y, mask.columns(s.orientation));
                }
                return None;
            }
        }
    }
    Some(staged)
}

fn items_of(objects: &[usize], islands: &[ObjectIslands]) -> Vec<(usize, usize)> {
    objects
        .iter()
        .flat_map(|&o| (0..islands[o].masks.len()).map(move |i| (o, i)))
        .collect()
}

/// Objects taken greedily, largest first, until a page worth of pixels.
fn priority_group(pending: &[usize], islands: &[ObjectIslands], budget: usize) -> Vec<usize> {
    let mut group = Vec::new();
    let mut total = 0;
    for &o in pending {
        let pixels = islands[o].pixels();
        if !group.is_empty() && total + pixels > budget {
            break;
        }
        group.push(o);
        total += pixels;
    }
    group
}

fn split_name(objects: &[BakeObject], base: &str) -> String {
    (1..)
        .map(|n| format!("{}.{:03}", base, n))
        .find(|name| objects.iter().all(|o| &o.name != name))
        .unwrap_or_else(|| format!("{}.split", base))
}

/// Move the islands `moved` of object `source` into a new object. Returns
/// the index of the new object; its islands are in the order of `moved`.
fn split_object(
    objects: &mut Vec<BakeObject>,
    islands: &mut Vec<ObjectIslands>,
    source: usize,
    moved: &[usize],
) -> usize {
    let n_faces = objects[source].mesh.faces.len();
    let mut to_split = vec![false; n_faces];
    for &i in moved {
        for &f in &islands[source].faces[i] {
            to_split[f as usize] = true;
        }
    }
    // New face index on each side; retain_faces preserves face order.
    let mut new_index = vec![0u32; n_faces];
    let (mut a, mut b) = (0u32, 0u32);
    for (f, &s) in to_split.iter().enumerate() {
        let counter = if s { &mut a } else { &mut b };
        new_index[f] = *counter;
        *counter += 1;
    }
    let remap = |faces: &[u32]| -> Vec<u32> { faces.iter().map(|&f| new_index[f as usize]).collect() };

    let mut split = objects[source].clone();
    split.name = split_name(objects, &objects[source].name);
    split.mesh.retain_faces(&to_split);
    let keep: Vec<bool> = to_split.iter().map(|&s| !s).collect();
    objects[source].mesh.retain_faces(&keep);

    let old = std::mem::take(&mut islands[source]);
    let mut split_islands = ObjectIslands::default();
    for &i in moved {
        split_islands.faces.push(remap(&old.faces[i]));
        split_islands.masks.push(old.masks[i].clone());
    }
    let mut rest = ObjectIslands::default();
    for (i, (faces, mask)) in old.faces.into_iter().zip(old.masks).enumerate() {
        if !moved.contains(&i) {
            rest.faces.push(remap(&faces));
            rest.masks.push(mask);
        }
    }
    islands[source] = rest;

    log::info!(
        "{} does not fit a single page, moving {} of its islands to {}",
        objects[source].name,
        moved.len(),
        split.name
    );
    objects.push(split);
    islands.push(split_islands);
    objects.len() - 1
}

/// Pack the islands of `objects` onto pages and rewrite their nested UVs.
///
/// On success every object with faces has a nestmap id in
/// `first_id..first_id + page_count` and all of its islands on that page.
/// Objects may be split; the new objects are appended to `objects` and
/// named in [`NestOutcome::splits`].
pub fn nest(objects: &mut Vec<BakeObject>, settings: &NestSettings) -> Result<NestOutcome, BakeError> {
    if settings.page_width == 0 || settings.page_height == 0 {
        return Err(BakeError::Validation("nestmap page size must be non-zero".to_string()));
    }
    let mut islands = objects
        .iter()
        .map(|o| prepare(o, settings))
        .collect::<Result<Vec<_>, _>>()?;
    log::info!(
        "Nesting {} islands of {} objects on {}x{} pages",
        islands.iter().map(|i| i.masks.len()).sum::<usize>(),
        objects.len(),
        settings.page_width,
        settings.page_height
    );

    let budget = settings.page_width as usize * settings.page_height as usize;
    let mut pending: Vec<usize> = (0..objects.len())
        .filter(|&o| !islands[o].masks.is_empty())
        .collect();
    let mut pages: Vec<(Page, Vec<Staged>)> = Vec::new();
    let mut splits = Vec::new();

    while !pending.is_empty() {
        pending.sort_by_key(|&o| Reverse(islands[o].pixels()));
        let mut group = priority_group(&pending, &islands, budget);
        let mut split_source = None;

        let (mut page, mut staged) = loop {
            let mut page = Page::new(settings.page_width, settings.page_height);
            if let Some(staged) = place_all(&mut page, &items_of(&group, &islands), &islands, false) {
                break (page, staged);
            }
            if group.len() > 1 {
                group.pop();
                continue;
            }
            let source = group[0];
            let staged = place_all(&mut page, &items_of(&group, &islands), &islands, true)
                .ok_or_else(|| BakeError::Consistency("partial packing failed".to_string()))?;
            if staged.is_empty() {
                return Err(BakeError::Consistency(format!(
                    "no island of {} fits an empty page",
                    objects[source].name
                )));
            }
            let moved: Vec<usize> = staged.iter().map(|s| s.island).collect();
            let split = split_object(objects, &mut islands, source, &moved);
            splits.push(objects[split].name.clone());
            let staged = staged
                .into_iter()
                .enumerate()
                .map(|(i, s)| Staged {
                    object: split,
                    island: i,
                    ..s
                })
                .collect();
            group = vec![split];
            split_source = Some(source);
            break (page, staged);
        };

        // Fill what is left with whole objects.
        for &o in &pending {
            if group.contains(&o) || split_source == Some(o) {
                continue;
            }
            if let Some(more) = place_all(&mut page, &items_of(&[o], &islands), &islands, false) {
                staged.extend(more);
                group.push(o);
            }
        }
        log::debug!(
            "Page {}: {} islands of {} objects",
            settings.first_id + pages.len(),
            staged.len(),
            group.len()
        );
        pending.retain(|o| !group.contains(o));
        pages.push((page, staged));
    }

    finish(objects, &islands, pages, settings, splits)
}

fn finish(
    objects: &mut [BakeObject],
    islands: &[ObjectIslands],
    pages: Vec<(Page, Vec<Staged>)>,
    settings: &NestSettings,
    splits: Vec<String>,
) -> Result<NestOutcome, BakeError> {
    // Every object on exactly one page, with all of its faces placed.
    let mut object_page: Vec<Option<usize>> = vec![None; objects.len()];
    let mut placed_faces = vec![0usize; objects.len()];
    for (p, (_, staged)) in pages.iter().enumerate() {
        for s in staged {
            match object_page[s.object] {
                Some(q) if q != p => {
                    return Err(BakeError::Consistency(format!(
                        "{} has islands on pages {} and {}",
                        objects[s.object].name, q, p
                    )));
                }
                _ => object_page[s.object] = Some(p),
            }
            placed_faces[s.object] += islands[s.object].faces[s.island].len();
        }
    }
    for (o, object) in objects.iter().enumerate() {
        if placed_faces[o] != object.mesh.faces.len() {
            return Err(BakeError::Consistency(format!(
                "{} has {} faces but {} were nested",
                object.name,
                object.mesh.faces.len(),
                placed_faces[o]
            )));
        }
    }

    for object in objects.iter_mut() {
        object.nestmap = -1;
    }
    let (sw, sh) = (settings.source_width, settings.source_height);
    let mut layouts = Vec::with_capacity(pages.len());
    for (p, (page, staged)) in pages.into_iter().enumerate() {
        let id = settings.first_id + p;
        let (mut width, mut height) = (1u32, 1u32);
        for s in &staged {
            let (w, h) = islands[s.object].masks[s.island].size(s.orientation);
            width = width.max(s.x + w);
            height = height.max(s.y + h);
        }
        let width = width.min(page.width());
        let height = height.min(page.height());

        let mut placed = Vec::with_capacity(staged.len());
        for s in &staged {
            let mask = &islands[s.object].masks[s.island];
            let object = &mut objects[s.object];
            if object.nestmap != id as i32 {
                object.nestmap = id as i32;
                object.nestmap_offset = [s.x, s.y];
            }
            for &f in &islands[s.object].faces[s.island] {
                let face = &mut object.mesh.faces[f as usize];
                for k in 0..3 {
                    let local = mask.local(face.uv[k], sw, sh);
                    let q = mask.place_point(s.orientation, s.x, s.y, local);
                    face.nested_uv[k] = [q[0] / width as f32, q[1] / height as f32];
                }
            }
            placed.push(PlacedIsland {
                object_index: s.object,
                object: object.name.clone(),
                mask: mask.clone(),
                placement: Placement {
                    page: p,
                    x: s.x,
                    y: s.y,
                    orientation: s.orientation,
                },
            });
        }
        layouts.push(PageLayout {
            id,
            width,
            height,
            islands: placed,
        });
    }
    Ok(NestOutcome {
        pages: layouts,
        splits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::quad;

    fn square(size: u32) -> IslandMask {
        IslandMask::from_columns([0, 0], size, size, 0, vec![vec![(0, size)]; size as usize])
    }

    #[test]
    fn test_find_y_on_empty_page() {
        let page = Page::new(8, 8);
        assert_eq!(page.find_y(0, square(3).columns(Orientation::Identity)), Some(0));
        assert_eq!(page.find_y(6, square(3).columns(Orientation::Identity)), None);
    }

    #[test]
    fn test_carve_and_stack() {
        let mut page = Page::new(8, 8);
        let mask = square(3);
        let cols = mask.columns(Orientation::Identity);
        page.carve(0, 0, cols);
        assert!(!page.is_free(2, 2));
        assert!(page.is_free(3, 0));
        assert_eq!(page.find_y(0, cols), Some(3));
        assert_eq!(page.find_y(1, cols), Some(3));
        assert_eq!(page.find_y(3, cols), Some(0));
    }

    #[test]
    fn test_restore_undoes_carve() {
        let mut page = Page::new(8, 8);
        let l = IslandMask::from_columns([0, 0], 3, 3, 0, vec![vec![(0, 3)], vec![(0, 1)], vec![(0, 1)]]);
        page.carve(1, 2, l.columns(Orientation::Identity));
        let before = page.clone();
        let mask = square(2);
        page.carve(4, 0, mask.columns(Orientation::Identity));
        page.carve(2, 3, mask.columns(Orientation::Identity));
        page.restore(2, 3, mask.columns(Orientation::Identity));
        page.restore(4, 0, mask.columns(Orientation::Identity));
        assert_eq!(page, before);
        page.restore(1, 2, l.columns(Orientation::Identity));
        assert_eq!(page, Page::new(8, 8));
    }

    #[test]
    fn test_failed_set_leaves_page_untouched() {
        let islands = vec![ObjectIslands {
            faces: vec![Vec::new(); 3],
            masks: vec![square(3), square(3), square(3)],
        }];
        let mut page = Page::new(6, 3);
        page.carve(0, 0, &vec![vec![(0, 1)]]);
        let before = page.clone();
        // Only one of the three fits next to the carved cell.
        assert!(place_all(&mut page, &[(0, 0), (0, 1), (0, 2)], &islands, false).is_none());
        assert_eq!(page, before);
        let staged = place_all(&mut page, &[(0, 0), (0, 1), (0, 2)], &islands, true).unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!((staged[0].x, staged[0].y), (1, 0));
        assert!(!page.is_free(2, 1));
        assert!(page.is_free(4, 1));
    }

    #[test]
    fn test_find_y_uses_holes() {
        let mut page = Page::new(4, 10);
        // Occupy rows [0, 2) and [5, 10) of column 0.
        page.carve(0, 0, &vec![vec![(0, 2), (5, 10)]]);
        let tall = vec![vec![(0, 3)]];
        assert_eq!(page.find_y(0, &tall), Some(2));
        let too_tall = vec![vec![(0, 4)]];
        assert_eq!(page.find_y(0, &too_tall), None);
    }

    #[test]
    fn test_find_y_interlocks_shapes() {
        // L shape: full first column, bottom row.
        let l = IslandMask::from_columns([0, 0], 3, 3, 0, vec![vec![(0, 3)], vec![(0, 1)], vec![(0, 1)]]);
        let mut page = Page::new(3, 4);
        page.carve(0, 0, l.columns(Orientation::Identity));
        // A 2x2 block fits in the notch of the L.
        assert_eq!(page.find_y(1, square(2).columns(Orientation::Identity)), Some(1));
    }

    #[test]
    fn test_find_position_rotates_long_islands() {
        let page = Page::new(4, 10);
        let long = IslandMask::from_columns([0, 0], 8, 2, 0, vec![vec![(0, 2)]; 8]);
        let order = Orientation::search_order(long.width, long.height);
        let (x, y, o) = page.find_position(&long, &order).unwrap();
        assert_eq!((x, y), (0, 0));
        assert_eq!(o, Orientation::Rotate90);
    }

    fn settings(page: u32, padding: u32) -> NestSettings {
        NestSettings {
            source_width: 64,
            source_height: 64,
            page_width: page,
            page_height: page,
            padding,
            first_id: 0,
        }
    }

    #[test]
    fn test_nest_two_objects_one_page() {
        let mut objects = vec![
            BakeObject::new("a", quad(0.0, 0.0, 0.25, 0.25, 0)),
            BakeObject::new("b", quad(0.5, 0.5, 0.75, 0.75, 0)),
        ];
        let outcome = nest(&mut objects, &settings(64, 1)).unwrap();
        assert_eq!(outcome.page_count(), 1);
        assert!(outcome.splits.is_empty());
        assert!(objects.iter().all(|o| o.nestmap == 0));
        // 16 px islands plus 1 px padding on each side.
        assert_eq!(outcome.pages[0].islands[0].mask.width, 18);
        for face in objects.iter().flat_map(|o| o.mesh.faces.iter()) {
            for uv in face.nested_uv {
                assert!((0.0..=1.0).contains(&uv[0]) && (0.0..=1.0).contains(&uv[1]));
            }
        }
    }

    #[test]
    fn test_nest_offsets_ids() {
        let mut objects = vec![BakeObject::new("a", quad(0.0, 0.0, 0.25, 0.25, 0))];
        let s = NestSettings {
            first_id: 3,
            ..settings(64, 1)
        };
        let outcome = nest(&mut objects, &s).unwrap();
        assert_eq!(outcome.pages[0].id, 3);
        assert_eq!(objects[0].nestmap, 3);
    }

    #[test]
    fn test_nest_crops_page() {
        let mut objects = vec![BakeObject::new("a", quad(0.0, 0.0, 0.25, 0.125, 0))];
        let outcome = nest(&mut objects, &settings(64, 1)).unwrap();
        let page = &outcome.pages[0];
        // 16x8 island padded to 18x10, stood up since it is wider than tall.
        assert_eq!((page.width, page.height), (10, 18));
    }

    #[test]
    fn test_unplaceable_island() {
        let mut objects = vec![BakeObject::new("big", quad(0.0, 0.0, 1.0, 1.0, 0))];
        let err = nest(&mut objects, &settings(32, 1)).unwrap_err();
        assert!(matches!(err, BakeError::UnplaceableIsland { island: 0, .. }));
        // Nothing was touched.
        assert_eq!(objects[0].nestmap, -1);
    }

    #[test]
    fn test_empty_object_is_ignored() {
        let mut objects = vec![BakeObject::new("empty", crate::mesh::Mesh::default())];
        let outcome = nest(&mut objects, &settings(32, 1)).unwrap();
        assert_eq!(outcome.page_count(), 0);
        assert_eq!(objects[0].nestmap, -1);
    }

    #[test]
    fn test_fill_skips_object_that_does_not_fit() {
        let big = BakeObject::new("big", quad(0.0, 0.0, 30.0 / 64.0, 30.0 / 64.0, 0));
        // Ten 8 px squares: nine fit around the big island, the tenth does not.
        let mut tiles = crate::mesh::Mesh::default();
        for k in 0..10 {
            let u = 8.0 * (k % 8) as f32 / 64.0;
            let v = 0.625 + 8.0 * (k / 8) as f32 / 64.0;
            tiles.merge(&quad(u, v, u + 6.0 / 64.0, v + 6.0 / 64.0, 0));
        }
        let tiles = BakeObject::new("tiles", tiles);
        let small = BakeObject::new("small", quad(0.875, 0.0, 0.875 + 6.0 / 64.0, 6.0 / 64.0, 0));
        let mut objects = vec![big, tiles, small];

        let outcome = nest(&mut objects, &settings(40, 1)).unwrap();
        assert_eq!(outcome.page_count(), 2);
        assert_eq!(objects[0].nestmap, 0);
        assert_eq!(objects[1].nestmap, 1);
        // Fits only where the tiles were tried and taken back.
        assert_eq!(objects[2].nestmap, 0);
        assert_eq!(outcome.pages[0].islands.len(), 2);
        assert_eq!(outcome.pages[1].islands.len(), 10);
        for page in &outcome.pages {
            for placed in &page.islands {
                assert_eq!(objects[placed.object_index].name, placed.object);
            }
        }
    }

    #[test]
    fn test_split_oversized_object() {
        // Two 30 px islands on a 40 px page: one per page.
        let mut mesh = quad(0.0, 0.0, 30.0 / 64.0, 30.0 / 64.0, 0);
        mesh.merge(&quad(0.5, 0.5, 0.5 + 30.0 / 64.0, 0.5 + 30.0 / 64.0, 0));
        let mut objects = vec![BakeObject::new("Playfield", mesh)];
        let outcome = nest(&mut objects, &settings(40, 1)).unwrap();
        assert_eq!(outcome.page_count(), 2);
        assert_eq!(outcome.splits, vec!["Playfield.001".to_string()]);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].mesh.faces.len(), 2);
        assert_eq!(objects[1].mesh.faces.len(), 2);
        assert_ne!(objects[0].nestmap, objects[1].nestmap);
        assert_eq!(objects[0].mesh.positions.len(), 4);
    }
}
