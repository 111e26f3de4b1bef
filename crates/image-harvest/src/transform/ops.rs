//! Pixel operations behind each transformation step.
//!
//! All operations are pure and keep the channel layout of their input,
//! except `color_convert`. Inputs with 16-bit or float samples are reduced
//! to 8-bit first.

use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Pixel};

use super::params::{ColorSpace, FlipAxis};

/// Scale to exactly `width` x `height`; aspect ratio is not preserved.
pub fn resize(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    img.resize_exact(width, height, FilterType::Triangle)
}

/// Remap into a new color space.
///
/// HSV output packs hue as degrees / 2 (0..180), saturation and value as
/// 0..255, into the three channels of an RGB buffer.
pub fn color_convert(img: &DynamicImage, space: ColorSpace) -> DynamicImage {
    match space {
        ColorSpace::Gray => DynamicImage::ImageLuma8(img.to_luma8()),
        ColorSpace::Hsv => {
            let mut rgb = img.to_rgb8();
            for px in rgb.pixels_mut() {
                let [r, g, b] = px.0;
                let (h, s, v) = rgb_to_hsv(r, g, b);
                px.0 = [
                    to_u8(h / 2.0),
                    to_u8(s * 255.0),
                    to_u8(v * 255.0),
                ];
            }
            DynamicImage::ImageRgb8(rgb)
        }
    }
}

/// Gaussian smoothing. `kernel` is an odd size; sigma follows the usual
/// `0.3 * ((k - 1) / 2 - 1) + 0.8` rule. Kernels of 1 or less are identity.
pub fn gaussian_blur(img: &DynamicImage, kernel: u32) -> DynamicImage {
    if kernel <= 1 {
        return img.clone();
    }
    let sigma = 0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    img.blur(sigma)
}

/// Rotate counter-clockwise by `degrees` about the center. The canvas keeps
/// its size: corners leaving it are clipped, uncovered areas are zero.
pub fn rotate(img: &DynamicImage, degrees: f32) -> DynamicImage {
    if degrees.rem_euclid(360.0) == 0.0 {
        return img.clone();
    }
    match eight_bit(img) {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(rotate_buffer(&buf, degrees)),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(rotate_buffer(&buf, degrees)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(rotate_buffer(&buf, degrees)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(rotate_buffer(&buf, degrees)),
        other => other,
    }
}

/// Multiply every color sample by `factor`, take the absolute value, round
/// and clip to 0..255. Alpha is left untouched.
pub fn scale_intensity(img: &DynamicImage, factor: f32) -> DynamicImage {
    let scale = |v: u8| to_u8((v as f32 * factor).abs());
    match eight_bit(img) {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(map_color(buf, 1, scale)),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(map_color(buf, 1, scale)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(map_color(buf, 3, scale)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(map_color(buf, 3, scale)),
        other => other,
    }
}

/// Scale saturation in HSV space and clip. Grayscale input is returned as is.
pub fn adjust_saturation(img: &DynamicImage, factor: f32) -> DynamicImage {
    if !img.color().has_color() {
        return img.clone();
    }
    let saturate = |rgb: &mut [u8]| {
        let (h, s, v) = rgb_to_hsv(rgb[0], rgb[1], rgb[2]);
        let (r, g, b) = hsv_to_rgb(h, (s * factor).clamp(0.0, 1.0), v);
        rgb[0] = r;
        rgb[1] = g;
        rgb[2] = b;
    };
    match eight_bit(img) {
        DynamicImage::ImageRgb8(mut buf) => {
            buf.pixels_mut().for_each(|px| saturate(&mut px.0));
            DynamicImage::ImageRgb8(buf)
        }
        DynamicImage::ImageRgba8(mut buf) => {
            buf.pixels_mut().for_each(|px| saturate(&mut px.0[..3]));
            DynamicImage::ImageRgba8(buf)
        }
        other => other,
    }
}

/// Mirror along the given axis or axes.
pub fn flip(img: &DynamicImage, axis: FlipAxis) -> DynamicImage {
    match axis {
        FlipAxis::Vertical => img.flipv(),
        FlipAxis::Horizontal => img.fliph(),
        FlipAxis::Both => img.rotate180(),
    }
}

/// Reduce to one of the four 8-bit layouts, keeping alpha and color-ness.
fn eight_bit(img: &DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => img.clone(),
        _ => {
            let color = img.color();
            match (color.has_color(), color.has_alpha()) {
                (false, false) => DynamicImage::ImageLuma8(img.to_luma8()),
                (false, true) => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
                (true, false) => DynamicImage::ImageRgb8(img.to_rgb8()),
                (true, true) => DynamicImage::ImageRgba8(img.to_rgba8()),
            }
        }
    }
}

/// Apply `f` to the first `color_channels` samples of every pixel.
fn map_color<P>(
    mut buf: ImageBuffer<P, Vec<u8>>,
    color_channels: usize,
    f: impl Fn(u8) -> u8,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    for px in buf.pixels_mut() {
        for c in px.channels_mut().iter_mut().take(color_channels) {
            *c = f(*c);
        }
    }
    buf
}

/// Inverse-map every destination pixel to its nearest source pixel.
fn rotate_buffer<P>(buf: &ImageBuffer<P, Vec<u8>>, degrees: f32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = buf.dimensions();
    let mut out: ImageBuffer<P, Vec<u8>> = ImageBuffer::new(w, h);
    let cx = (w / 2) as f32;
    let cy = (h / 2) as f32;
    let (sin, cos) = degrees.to_radians().sin_cos();

    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let sx = (cos * dx - sin * dy + cx).round();
            let sy = (sin * dx + cos * dy + cy).round();
            if sx >= 0.0 && sy >= 0.0 && (sx as u32) < w && (sy as u32) < h {
                out.put_pixel(x, y, *buf.get_pixel(sx as u32, sy as u32));
            }
        }
    }
    out
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Returns hue in degrees (0..360), saturation and value in 0..1.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };
    (h, s, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let hp = (h / 60.0).rem_euclid(6.0);
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    (
        to_u8((r + m) * 255.0),
        to_u8((g + m) * 255.0),
        to_u8((b + m) * 255.0),
    )
}
