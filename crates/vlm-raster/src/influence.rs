/// Rec. 601 luma of a linear RGB triple.
#[inline]
pub fn luma(rgb: [f32; 3]) -> f32 {
    0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]
}

/// Largest of the three color channels.
#[inline]
pub fn max_channel(rgb: [f32; 3]) -> f32 {
    rgb[0].max(rgb[1]).max(rgb[2])
}

/// Max-filter downscale of an RGBA render to `dst_w x dst_h`.
///
/// Each destination pixel takes the per-channel maximum of the alpha
/// premultiplied source pixels in its `nx x ny` kernel, where
/// `nx = src_w / dst_w` and `ny = src_h / dst_h` (integer division, at
/// least 1). Source pixels outside the render are ignored. `src` holds
/// `src_w * src_h` pixels, row-major.
pub fn max_pool(src: &[[f32; 4]], src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Vec<[f32; 3]> {
    let mut dst = vec![[0.0f32; 3]; dst_w as usize * dst_h as usize];
    if dst_w == 0 || dst_h == 0 || src.len() < src_w as usize * src_h as usize {
        return dst;
    }
    let nx = (src_w / dst_w).max(1);
    let ny = (src_h / dst_h).max(1);

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let mut t = [0.0f32; 3];
            for ky in 0..ny {
                let sy = dy * ny + ky;
                if sy >= src_h {
                    break;
                }
                for kx in 0..nx {
                    let sx = dx * nx + kx;
                    if sx >= src_w {
                        break;
                    }
                    let p = src[sy as usize * src_w as usize + sx as usize];
                    for c in 0..3 {
                        t[c] = t[c].max(p[3] * p[c]);
                    }
                }
            }
            dst[dy as usize * dst_w as usize + dx as usize] = t;
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_weights() {
        assert!((luma([1.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((luma([1.0, 0.0, 0.0]) - 0.299).abs() < 1e-6);
    }

    #[test]
    fn test_max_channel() {
        assert_eq!(max_channel([0.2, 3.5, 1.0]), 3.5);
    }

    #[test]
    fn test_max_pool_takes_kernel_max() {
        // 4x2 source pooled into 2x1.
        let src = vec![
            [0.1, 0.0, 0.0, 1.0],
            [0.9, 0.0, 0.0, 1.0],
            [0.0, 0.2, 0.0, 1.0],
            [0.0, 0.0, 0.0, 1.0],
            [0.3, 0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0, 1.0],
            [0.0, 0.7, 0.0, 1.0],
            [0.0, 0.0, 5.0, 1.0],
        ];
        let dst = max_pool(&src, 4, 2, 2, 1);
        assert_eq!(dst.len(), 2);
        assert_eq!(dst[0], [0.9, 0.0, 0.0]);
        assert_eq!(dst[1], [0.0, 0.7, 5.0]);
    }

    #[test]
    fn test_max_pool_premultiplies_alpha() {
        let src = vec![[2.0, 2.0, 2.0, 0.5]];
        let dst = max_pool(&src, 1, 1, 1, 1);
        assert_eq!(dst[0], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_max_pool_short_input_is_black() {
        let dst = max_pool(&[], 4, 4, 2, 2);
        assert!(dst.iter().all(|p| *p == [0.0; 3]));
    }
}
