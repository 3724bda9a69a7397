use crate::cache::{self, BakePaths};
use crate::error::BakeError;
use crate::types::HdrImage;
use vlm_raster::{luma, max_channel, max_pool};

/// How strongly a lighting scenario lights each pixel of the prune grid.
///
/// Every render group with a render gets a luma channel; the global
/// channels hold the maximum over all groups.
#[derive(Debug, Clone)]
pub struct InfluenceMap {
    pub width: u32,
    pub height: u32,
    /// Luma of each render group, `None` for groups without a render.
    pub groups: Vec<Option<Vec<f32>>>,
    /// Maximum luma over all groups.
    pub global_luma: Vec<f32>,
    /// Maximum color channel over all groups, used for HDR range detection.
    pub global_max: Vec<f32>,
}

impl InfluenceMap {
    /// An influence map with no light at all.
    pub fn new(width: u32, height: u32, n_groups: usize) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            groups: vec![None; n_groups],
            global_luma: vec![0.0; n],
            global_max: vec![0.0; n],
        }
    }

    /// Downscale a group render with a max filter and accumulate it.
    pub fn add_group(&mut self, group: usize, render: &HdrImage) {
        let pooled = max_pool(
            &render.pixels,
            render.width,
            render.height,
            self.width,
            self.height,
        );
        let group_luma: Vec<f32> = pooled.iter().map(|&rgb| luma(rgb)).collect();
        for (i, &rgb) in pooled.iter().enumerate() {
            self.global_luma[i] = self.global_luma[i].max(group_luma[i]);
            self.global_max[i] = self.global_max[i].max(max_channel(rgb));
        }
        if self.groups.len() <= group {
            self.groups.resize(group + 1, None);
        }
        self.groups[group] = Some(group_luma);
    }

    /// Luma of `group` at flat pixel `index`, 0 when the group was not rendered.
    pub fn group_luma(&self, group: usize, index: usize) -> f32 {
        self.groups
            .get(group)
            .and_then(|g| g.as_ref())
            .and_then(|g| g.get(index).copied())
            .unwrap_or(0.0)
    }

    /// Build the influence map of a scenario from its cached group renders.
    ///
    /// Missing renders count as no influence (their group was skipped).
    pub fn load(
        paths: &BakePaths,
        scenario: &str,
        n_groups: usize,
        width: u32,
        height: u32,
    ) -> Result<Self, BakeError> {
        let mut map = Self::new(width, height, n_groups);
        for group in 0..n_groups {
            let path = paths.group_render(scenario, group);
            if !path.is_file() {
                log::debug!("No render for {} group {}, assuming no influence", scenario, group);
                continue;
            }
            let render = cache::load_hdr(&path)?;
            map.add_group(group, &render);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_group_accumulates_global() {
        let mut map = InfluenceMap::new(1, 1, 2);
        let mut red = HdrImage::new(2, 2);
        red.set(1, 1, [3.0, 0.0, 0.0, 1.0]);
        let mut green = HdrImage::new(2, 2);
        green.set(0, 0, [0.0, 1.0, 0.0, 1.0]);
        map.add_group(0, &red);
        map.add_group(1, &green);

        assert!((map.group_luma(0, 0) - 0.897).abs() < 1e-5);
        assert!((map.group_luma(1, 0) - 0.587).abs() < 1e-5);
        assert!((map.global_luma[0] - 0.897).abs() < 1e-5);
        assert_eq!(map.global_max[0], 3.0);
    }

    #[test]
    fn test_missing_group_has_no_influence() {
        let map = InfluenceMap::new(2, 2, 3);
        assert_eq!(map.group_luma(1, 0), 0.0);
        assert_eq!(map.group_luma(9, 0), 0.0);
    }

    #[test]
    fn test_load_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BakePaths::from_root(dir.path());
        paths.create_dirs().unwrap();
        let mut render = HdrImage::new(4, 4);
        render.set(3, 3, [0.0, 0.0, 2.0, 1.0]);
        cache::save_exr(&paths.group_render("GI", 1), &render).unwrap();

        let map = InfluenceMap::load(&paths, "GI", 2, 2, 2).unwrap();
        assert!(map.groups[0].is_none());
        assert!((map.group_luma(1, 3) - 0.228).abs() < 1e-5);
        assert_eq!(map.global_max[3], 2.0);
        assert_eq!(map.global_max[0], 0.0);
    }
}
