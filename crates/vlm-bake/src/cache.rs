//! On-disk stage cache.
//!
//! Every artifact lives under the bake directory next to the project file:
//!
//! ```text
//! {project} - Bakes/
//!     Masks/{object}.png
//!     Masks/Mask - Group {n} (Padded LD).png
//!     Renders/{scenario} - Group {n}.exr
//!     Export/Nestmap {id}.exr|png|webp
//! ```
//!
//! A cached file is valid when it exists and has the expected size. There
//! is no content hashing. Image files are stored top row first while the
//! in-memory buffers start at `v = 0`, so rows are flipped on both load and
//! save.

use crate::error::BakeError;
use crate::group::AlphaMask;
use crate::identifier::clean_filename;
use crate::types::{BakeConfig, HdrImage};
use image::{DynamicImage, ImageBuffer, Rgba, Rgba32FImage, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Locations of the cached artifacts of one project.
#[derive(Debug, Clone)]
pub struct BakePaths {
    root: PathBuf,
}

impl BakePaths {
    /// Paths for the project of `config`. Fails for an unsaved project.
    pub fn new(config: &BakeConfig) -> Result<Self, BakeError> {
        Ok(Self {
            root: config.bake_dir()?,
        })
    }

    /// Paths rooted at an explicit directory.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn masks_dir(&self) -> PathBuf {
        self.root.join("Masks")
    }

    pub fn renders_dir(&self) -> PathBuf {
        self.root.join("Renders")
    }

    pub fn export_dir(&self) -> PathBuf {
        self.root.join("Export")
    }

    /// Create the cache directories if needed.
    pub fn create_dirs(&self) -> Result<(), BakeError> {
        fs::create_dir_all(self.masks_dir())?;
        fs::create_dir_all(self.renders_dir())?;
        fs::create_dir_all(self.export_dir())?;
        Ok(())
    }

    pub fn object_mask(&self, object: &str) -> PathBuf {
        self.masks_dir().join(format!("{}.png", clean_filename(object)))
    }

    pub fn group_mask(&self, group: usize) -> PathBuf {
        self.masks_dir()
            .join(format!("Mask - Group {} (Padded LD).png", group))
    }

    pub fn group_render(&self, scenario: &str, group: usize) -> PathBuf {
        self.renders_dir()
            .join(format!("{} - Group {}.exr", clean_filename(scenario), group))
    }

    pub fn nestmap(&self, id: usize, extension: &str) -> PathBuf {
        self.export_dir()
            .join(format!("Nestmap {}.{}", id, extension))
    }
}

fn image_error(path: &Path, e: impl ToString) -> BakeError {
    BakeError::Image {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn open(path: &Path) -> Result<DynamicImage, BakeError> {
    image::open(path).map_err(|e| image_error(path, e))
}

/// Load a cached mask, `None` when missing or of another size.
pub fn load_mask(path: &Path, width: u32, height: u32) -> Result<Option<AlphaMask>, BakeError> {
    if !path.is_file() {
        return Ok(None);
    }
    let img = open(path)?.into_rgba8();
    if img.dimensions() != (width, height) {
        log::debug!(
            "Ignoring cached mask {} ({}x{} instead of {}x{})",
            path.display(),
            img.width(),
            img.height(),
            width,
            height
        );
        return Ok(None);
    }
    let img = image::imageops::flip_vertical(&img);
    Ok(Some(AlphaMask {
        width,
        height,
        alpha: img.pixels().map(|p| p[3] as f32 / 255.0).collect(),
    }))
}

/// Save a mask as a white PNG whose alpha channel holds the mask.
pub fn save_mask(path: &Path, mask: &AlphaMask) -> Result<(), BakeError> {
    let img: RgbaImage = ImageBuffer::from_fn(mask.width, mask.height, |x, y| {
        let a = mask.get(x as i64, y as i64).clamp(0.0, 1.0);
        Rgba([255, 255, 255, (a * 255.0).round() as u8])
    });
    let img = image::imageops::flip_vertical(&img);
    img.save(path).map_err(|e| image_error(path, e))
}

/// Whether an image exists at `path` with the given size. Only the header
/// is read.
pub fn is_cached(path: &Path, width: u32, height: u32) -> bool {
    path.is_file() && image::image_dimensions(path).is_ok_and(|dim| dim == (width, height))
}

/// Load a floating-point render.
pub fn load_hdr(path: &Path) -> Result<HdrImage, BakeError> {
    let img = open(path)?.into_rgba32f();
    let img = image::imageops::flip_vertical(&img);
    let (width, height) = img.dimensions();
    Ok(HdrImage {
        width,
        height,
        pixels: img.pixels().map(|p| p.0).collect(),
    })
}

fn to_rgba32f(img: &HdrImage) -> Rgba32FImage {
    ImageBuffer::from_fn(img.width, img.height, |x, y| {
        Rgba(img.get(x, img.height - 1 - y))
    })
}

fn to_rgba8(img: &HdrImage) -> RgbaImage {
    ImageBuffer::from_fn(img.width, img.height, |x, y| {
        let p = img.get(x, img.height - 1 - y);
        Rgba(p.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
    })
}

/// Save a floating-point image as OpenEXR.
pub fn save_exr(path: &Path, img: &HdrImage) -> Result<(), BakeError> {
    DynamicImage::ImageRgba32F(to_rgba32f(img))
        .save(path)
        .map_err(|e| image_error(path, e))
}

/// Save an 8-bit copy (PNG or WebP, chosen by extension), channels clamped to `[0, 1]`.
pub fn save_ldr(path: &Path, img: &HdrImage) -> Result<(), BakeError> {
    to_rgba8(img).save(path).map_err(|e| image_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_layout() {
        let paths = BakePaths::from_root("/t/demo - Bakes");
        assert_eq!(
            paths.group_render("Inserts - L1", 2),
            PathBuf::from("/t/demo - Bakes/Renders/Inserts - L1 - Group 2.exr")
        );
        assert_eq!(
            paths.group_mask(0),
            PathBuf::from("/t/demo - Bakes/Masks/Mask - Group 0 (Padded LD).png")
        );
        assert_eq!(
            paths.object_mask("Ramp/Left"),
            PathBuf::from("/t/demo - Bakes/Masks/Ramp_Left.png")
        );
        assert_eq!(
            paths.nestmap(3, "webp"),
            PathBuf::from("/t/demo - Bakes/Export/Nestmap 3.webp")
        );
    }

    #[test]
    fn test_unsaved_project() {
        assert!(matches!(
            BakePaths::new(&BakeConfig::default()),
            Err(BakeError::UnsavedProject)
        ));
    }

    #[test]
    fn test_mask_roundtrip_keeps_orientation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        let mut mask = AlphaMask::new(4, 3);
        mask.alpha[0] = 1.0; // (0, 0)
        mask.alpha[4 * 2 + 3] = 0.5; // (3, 2)
        save_mask(&path, &mask).unwrap();

        let loaded = load_mask(&path, 4, 3).unwrap().unwrap();
        assert_eq!(loaded.get(0, 0), 1.0);
        assert!((loaded.get(3, 2) - 0.5).abs() < 0.01);
        assert_eq!(loaded.get(0, 2), 0.0);

        // The file itself is stored top row first.
        let raw = image::open(&path).unwrap().into_rgba8();
        assert_eq!(raw.get_pixel(0, 2)[3], 255);
    }

    #[test]
    fn test_mask_size_mismatch_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        save_mask(&path, &AlphaMask::new(4, 4)).unwrap();
        assert!(load_mask(&path, 8, 8).unwrap().is_none());
        assert!(load_mask(&dir.path().join("none.png"), 4, 4).unwrap().is_none());
    }

    #[test]
    fn test_exr_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.exr");
        let mut img = HdrImage::new(3, 2);
        img.set(2, 1, [4.5, 0.25, 0.0, 1.0]);
        save_exr(&path, &img).unwrap();

        let loaded = load_hdr(&path).unwrap();
        assert_eq!((loaded.width, loaded.height), (3, 2));
        assert_eq!(loaded.get(2, 1), [4.5, 0.25, 0.0, 1.0]);
        assert_eq!(loaded.get(0, 0), [0.0; 4]);
        assert!(is_cached(&path, 3, 2));
        assert!(!is_cached(&path, 2, 2));
        assert!(!is_cached(&dir.path().join("none.exr"), 3, 2));
    }

    #[test]
    fn test_save_ldr_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        let mut img = HdrImage::new(2, 2);
        img.set(0, 0, [2.0, 0.5, 0.0, 1.0]);
        save_ldr(&path, &img).unwrap();
        let raw = image::open(&path).unwrap().into_rgba8();
        assert_eq!(raw.get_pixel(0, 1).0, [255, 128, 0, 255]);
    }
}
