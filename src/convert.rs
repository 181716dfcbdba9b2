//! NV12 <-> packed RGB24 conversion
//!
//! Pixel-level conversion used by the conversion drawing strategy. RGB data
//! is 4 bytes per pixel: byte 0 blue, byte 1 green, byte 2 red, byte 3
//! unused.
//!
//! The forward direction decodes limited-range video levels with 601-style
//! coefficients; the inverse encodes with limited-range BT.709 coefficients.
//! The two matrices are not exact inverses of each other; the asymmetry is
//! inherited behavior and kept as-is, so round trips drift by a small
//! amount rather than reproducing bytes exactly.
//!
//! Both directions work from a private copy of their source: the buffers
//! handed in typically sit in uncached mappings, and repeated reads through
//! those are far slower than one bulk copy.

use alloc::vec::Vec;

fn clamp_rgb(val: f32) -> u8 {
    if val < 0.0 {
        return 0;
    }
    if val > 255.0 {
        return 255;
    }
    val as u8
}

/// Convert an NV12 image to packed RGB24
///
/// Processes two luma rows at a time against their shared chroma row; when
/// `height` is odd the trailing row is converted with the single-row
/// formula. Byte 3 of each RGB pixel is left untouched.
///
/// `luma` must cover `luma_stride * (height - 1) + width` bytes, `chroma`
/// `chroma_stride * (ceil(height / 2) - 1) + 2 * ceil(width / 2)`, and
/// `rgb` `rgb_stride * (height - 1) + width * 4`.
#[allow(clippy::too_many_arguments)]
pub fn nv12_to_rgb24(
    luma: &[u8],
    chroma: &[u8],
    width: u32,
    height: u32,
    luma_stride: u32,
    chroma_stride: u32,
    rgb: &mut [u8],
    rgb_stride: u32,
) {
    let width = width as usize;
    let luma_stride = luma_stride as usize;
    let chroma_stride = chroma_stride as usize;
    let rgb_stride = rgb_stride as usize;

    let luma: Vec<u8> = luma.to_vec();
    let chroma: Vec<u8> = chroma.to_vec();

    for i in 0..(height as usize) / 2 {
        let y0_row = i * 2 * luma_stride;
        let y1_row = y0_row + luma_stride;
        let uv_row = i * chroma_stride;
        let rgb0_row = i * 2 * rgb_stride;
        let rgb1_row = rgb0_row + rgb_stride;

        for j in 0..width {
            // Convert a 1x2 pixel block sharing one chroma sample.
            let y0 = 1.164 * (f32::from(luma[y0_row + j]) - 16.0);
            let y1 = 1.164 * (f32::from(luma[y1_row + j]) - 16.0);

            let cb = f32::from(chroma[uv_row + (j & !1)]) - 128.0;
            let cr = f32::from(chroma[uv_row + (j | 1)]) - 128.0;

            let r = 1.793 * cr;
            let g = -0.213 * cb - 0.533 * cr;
            let b = 2.112 * cb;

            rgb[rgb0_row + j * 4 + 2] = clamp_rgb(y0 + r);
            rgb[rgb1_row + j * 4 + 2] = clamp_rgb(y1 + r);

            rgb[rgb0_row + j * 4 + 1] = clamp_rgb(y0 + g);
            rgb[rgb1_row + j * 4 + 1] = clamp_rgb(y1 + g);

            rgb[rgb0_row + j * 4] = clamp_rgb(y0 + b);
            rgb[rgb1_row + j * 4] = clamp_rgb(y1 + b);
        }
    }

    if height % 2 == 1 {
        // Trailing row without a partner; single-pixel formula.
        let y_row = (height as usize - 1) * luma_stride;
        let uv_row = (height as usize / 2) * chroma_stride;
        let rgb_row = (height as usize - 1) * rgb_stride;

        for j in 0..width {
            let y0 = 1.164 * (f32::from(luma[y_row + j]) - 16.0);

            let cb = f32::from(chroma[uv_row + (j & !1)]) - 128.0;
            let cr = f32::from(chroma[uv_row + (j | 1)]) - 128.0;

            let r = 1.793 * cr;
            let g = -0.213 * cb - 0.533 * cr;
            let b = 2.112 * cb;

            rgb[rgb_row + j * 4 + 2] = clamp_rgb(y0 + r);
            rgb[rgb_row + j * 4 + 1] = clamp_rgb(y0 + g);
            rgb[rgb_row + j * 4] = clamp_rgb(y0 + b);
        }
    }
}

/// Convert packed RGB24 to NV12
///
/// Luma is computed per pixel over the full image. The chroma sample of
/// each 2x2 block sits between the top and bottom pixel, so interior rows
/// average the two pixels' contributions; when `height` is odd the trailing
/// row takes the single-row formula.
///
/// Slice requirements match [`nv12_to_rgb24`] with `luma` and `chroma` as
/// the destinations.
#[allow(clippy::too_many_arguments)]
pub fn rgb24_to_nv12(
    rgb: &[u8],
    width: u32,
    height: u32,
    rgb_stride: u32,
    luma: &mut [u8],
    chroma: &mut [u8],
    luma_stride: u32,
    chroma_stride: u32,
) {
    let width = width as usize;
    let chroma_width = width.div_ceil(2);
    let luma_stride = luma_stride as usize;
    let chroma_stride = chroma_stride as usize;
    let rgb_stride = rgb_stride as usize;

    let rgb: Vec<u8> = rgb.to_vec();

    for i in 0..height as usize {
        let rgb_row = i * rgb_stride;
        let y_row = i * luma_stride;

        for j in 0..width {
            let yf = 0.183 * f32::from(rgb[rgb_row + j * 4 + 2])
                + 0.614 * f32::from(rgb[rgb_row + j * 4 + 1])
                + 0.062 * f32::from(rgb[rgb_row + j * 4])
                + 16.0;
            luma[y_row + j] = yf as u8;
        }
    }

    for i in 0..(height as usize) / 2 {
        let rgb0_row = i * 2 * rgb_stride;
        let rgb1_row = rgb0_row + rgb_stride;
        let uv_row = i * chroma_stride;

        for j in 0..chroma_width {
            let r0 = f32::from(rgb[rgb0_row + j * 8 + 2]);
            let r1 = f32::from(rgb[rgb1_row + j * 8 + 2]);
            let g0 = f32::from(rgb[rgb0_row + j * 8 + 1]);
            let g1 = f32::from(rgb[rgb1_row + j * 8 + 1]);
            let b0 = f32::from(rgb[rgb0_row + j * 8]);
            let b1 = f32::from(rgb[rgb1_row + j * 8]);

            let uf = -0.101 / 2.0 * (r0 + r1) - 0.339 / 2.0 * (g0 + g1)
                + 0.439 / 2.0 * (b0 + b1)
                + 128.0;
            let vf = 0.439 / 2.0 * (r0 + r1) - 0.339 / 2.0 * (g0 + g1) - 0.040 / 2.0 * (b0 + b1)
                + 128.0;

            chroma[uv_row + j * 2] = uf as u8;
            chroma[uv_row + j * 2 + 1] = vf as u8;
        }
    }

    if height % 2 == 1 {
        // The last row has no partner to average with; take its values
        // directly.
        let rgb_row = (height as usize - 1) * rgb_stride;
        let uv_row = (height as usize / 2) * chroma_stride;

        for j in 0..chroma_width {
            let r = f32::from(rgb[rgb_row + j * 8 + 2]);
            let g = f32::from(rgb[rgb_row + j * 8 + 1]);
            let b = f32::from(rgb[rgb_row + j * 8]);

            let uf = -0.101 * r - 0.339 * g + 0.439 * b + 128.0;
            let vf = 0.439 * r - 0.339 * g - 0.040 * b + 128.0;

            chroma[uv_row + j * 2] = uf as u8;
            chroma[uv_row + j * 2 + 1] = vf as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_video_black_decodes_to_rgb_black() {
        let luma = vec![16u8; 4 * 2];
        let chroma = vec![128u8; 4];
        let mut rgb = vec![0xEEu8; 4 * 4 * 2];

        nv12_to_rgb24(&luma, &chroma, 4, 2, 4, 4, &mut rgb, 16);

        for px in rgb.chunks(4) {
            assert_eq!(&px[..3], &[0, 0, 0]);
            // Byte 3 is never written.
            assert_eq!(px[3], 0xEE);
        }
    }

    #[test]
    fn test_video_white_decodes_near_full_scale() {
        let luma = vec![235u8; 4 * 2];
        let chroma = vec![128u8; 4];
        let mut rgb = vec![0u8; 4 * 4 * 2];

        nv12_to_rgb24(&luma, &chroma, 4, 2, 4, 4, &mut rgb, 16);

        // 1.164 * (235 - 16) = 254.9, truncated.
        for px in rgb.chunks(4) {
            assert_eq!(&px[..3], &[254, 254, 254]);
        }
    }

    #[test]
    fn test_solid_red_encodes_to_expected_yuv() {
        // 2x2 all-red: every chroma average collapses to the single-pixel
        // value.
        let mut rgb = vec![0u8; 2 * 8];
        for px in rgb.chunks_mut(4) {
            px[2] = 255;
        }
        let mut luma = vec![0u8; 4];
        let mut chroma = vec![0u8; 2];

        rgb24_to_nv12(&rgb, 2, 2, 8, &mut luma, &mut chroma, 2, 2);

        // Y = 0.183 * 255 + 16 = 62.6; U = 128 - 0.101 * 255 = 102.2;
        // V = 128 + 0.439 * 255 = 239.9.
        assert_eq!(luma, vec![62; 4]);
        assert_eq!(chroma, vec![102, 239]);
    }

    #[test]
    fn test_chroma_pairs_share_one_sample() {
        // One chroma sample covering a 2x2 block with strong blue cast.
        let luma = vec![128u8; 2 * 2];
        let chroma = vec![200u8, 128u8]; // Cb = +72, Cr = 0
        let mut rgb = vec![0u8; 2 * 8];

        nv12_to_rgb24(&luma, &chroma, 2, 2, 2, 2, &mut rgb, 8);

        // y' = 1.164 * 112 = 130.3; b = y' + 2.112 * 72 = 282.4 -> clamped.
        for px in rgb.chunks(4) {
            assert_eq!(px[0], 255);
            assert_eq!(px[2], 130); // red unaffected by Cb
        }
    }

    #[test]
    fn test_odd_height_converts_trailing_row() {
        let height = 3u32;
        // Chroma plane has ceil(3/2) = 2 rows.
        let luma = vec![100u8; 2 * 3];
        let chroma = vec![128u8; 2 * 2];
        let mut rgb = vec![0u8; 3 * 8];

        nv12_to_rgb24(&luma, &chroma, 2, height, 2, 2, &mut rgb, 8);

        // All rows neutral gray: 1.164 * 84 = 97.7.
        for px in rgb.chunks(4) {
            assert_eq!(&px[..3], &[97, 97, 97]);
        }
    }

    #[test]
    fn test_odd_height_encode_uses_single_row_chroma() {
        let mut rgb = vec![0u8; 3 * 8];
        for px in rgb.chunks_mut(4) {
            px[0] = 255; // blue
        }
        let mut luma = vec![0u8; 2 * 3];
        let mut chroma = vec![0u8; 2 * 2];

        rgb24_to_nv12(&rgb, 2, 3, 8, &mut luma, &mut chroma, 2, 2);

        // U = 128 + 0.439 * 255 = 239.9 on both the averaged and the
        // trailing single row.
        assert_eq!(chroma[0], 239);
        assert_eq!(chroma[2], 239);
    }

    #[test]
    fn test_round_trip_drift_is_bounded() {
        // Neutral-chroma ramp; the 601-decode/709-encode pair is not an
        // exact inverse, so allow a small drift but no more.
        let width = 16u32;
        let height = 4u32;
        let mut luma = vec![0u8; 16 * 4];
        for (i, y) in luma.iter_mut().enumerate() {
            *y = 20 + ((i * 13) % 210) as u8;
        }
        let chroma = vec![128u8; 16 * 2];

        let mut rgb = vec![0u8; 16 * 4 * 4];
        nv12_to_rgb24(&luma, &chroma, width, height, 16, 16, &mut rgb, 64);

        let mut luma_out = vec![0u8; 16 * 4];
        let mut chroma_out = vec![0u8; 16 * 2];
        rgb24_to_nv12(&rgb, width, height, 64, &mut luma_out, &mut chroma_out, 16, 16);

        for (before, after) in luma.iter().zip(&luma_out) {
            assert!(
                before.abs_diff(*after) <= 2,
                "luma drift {before} -> {after}"
            );
        }
        // The coefficient mismatch lands almost entirely in Cr (the decode
        // and encode green weights differ), so chroma gets a wider but
        // still hard bound.
        for (before, after) in chroma.iter().zip(&chroma_out) {
            assert!(
                before.abs_diff(*after) <= 16,
                "chroma drift {before} -> {after}"
            );
        }
    }
}
