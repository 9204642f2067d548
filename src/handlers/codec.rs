//! Shared encode/decode primitives used by the pair handlers.
//!
//! Alpha handling lives here so every handler applies the same rule: targets
//! without transparency support (JPEG, TIFF as written here, merged PDF
//! pages) get sources flattened onto an opaque white background; PNG and SVG
//! targets pass alpha through untouched.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Internal codec-level error; handlers stringify it into `Failure` records.
#[derive(Debug, Error)]
pub(crate) enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("TIFF decode error: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("SVG parse error: {0}")]
    Svg(String),
    #[error("PDF assembly error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("{0}")]
    Unsupported(String),
}

/// Percent complete after `done` of `total` units, rounded to the nearest
/// integer. A zero total reports 100 (nothing to do is done).
pub(crate) fn unit_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round() as u8
}

/// Flatten an image onto an opaque white background, yielding RGB.
///
/// Fully opaque images are converted without blending.
pub(crate) fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb.clone(),
        DynamicImage::ImageRgba8(rgba) => flatten_rgba(rgba),
        other if other.color().has_alpha() => flatten_rgba(&other.to_rgba8()),
        other => other.to_rgb8(),
    }
}

fn flatten_rgba(rgba: &RgbaImage) -> RgbImage {
    let (w, h) = rgba.dimensions();
    let mut out = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
    for (x, y, px) in rgba.enumerate_pixels() {
        let a = px[3] as u16;
        if a == 0 {
            continue;
        }
        let blend = |c: u8| -> u8 { ((c as u16 * a + 255 * (255 - a)) / 255) as u8 };
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

/// Write `img` to `path` as a JPEG, flattening alpha first.
pub(crate) fn write_jpeg(img: &DynamicImage, path: &Path, quality: u8) -> Result<(), CodecError> {
    let rgb = flatten_onto_white(img);
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    encoder.encode_image(&rgb)?;
    debug!("wrote jpeg {}", path.display());
    Ok(())
}

/// JPEG-encode `img` into memory. Used by merge staging and PDF embedding.
pub(crate) fn encode_jpeg_bytes(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let rgb = flatten_onto_white(img);
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(&rgb)?;
    Ok(buf)
}

/// Write `img` to `path` as a PNG, alpha preserved.
pub(crate) fn write_png(img: &DynamicImage, path: &Path) -> Result<(), CodecError> {
    img.save_with_format(path, ImageFormat::Png)?;
    debug!("wrote png {}", path.display());
    Ok(())
}

/// Write `img` to `path` as a TIFF, flattening alpha first.
pub(crate) fn write_tiff(img: &DynamicImage, path: &Path) -> Result<(), CodecError> {
    let rgb = flatten_onto_white(img);
    rgb.save_with_format(path, ImageFormat::Tiff)?;
    debug!("wrote tiff {}", path.display());
    Ok(())
}

/// Decode every frame of a TIFF file, in directory order.
///
/// `image::open` only exposes the first IFD, so multi-frame sources go
/// through the `tiff` decoder directly.
pub(crate) fn decode_tiff_frames(path: &Path) -> Result<Vec<DynamicImage>, CodecError> {
    use tiff::decoder::Decoder;

    let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
    let mut frames = Vec::new();
    loop {
        let (width, height) = decoder.dimensions()?;
        let color = decoder.colortype()?;
        let data = decoder.read_image()?;
        frames.push(tiff_frame_to_image(width, height, color, data)?);
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }
    debug!("decoded {} tiff frame(s) from {}", frames.len(), path.display());
    Ok(frames)
}

fn tiff_frame_to_image(
    width: u32,
    height: u32,
    color: tiff::ColorType,
    data: tiff::decoder::DecodingResult,
) -> Result<DynamicImage, CodecError> {
    use tiff::decoder::DecodingResult;
    use tiff::ColorType;

    let bad_buffer = || CodecError::Unsupported("TIFF frame buffer size mismatch".into());

    // 16-bit samples are downconverted; the conversion targets are all 8-bit.
    let bytes: Vec<u8> = match data {
        DecodingResult::U8(v) => v,
        DecodingResult::U16(v) => v.into_iter().map(|s| (s >> 8) as u8).collect(),
        _ => {
            return Err(CodecError::Unsupported(
                "unsupported TIFF sample format (expected 8- or 16-bit unsigned)".into(),
            ))
        }
    };

    let img = match color {
        ColorType::RGB(8) | ColorType::RGB(16) => {
            image::RgbImage::from_raw(width, height, bytes)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(bad_buffer)?
        }
        ColorType::RGBA(8) | ColorType::RGBA(16) => {
            image::RgbaImage::from_raw(width, height, bytes)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(bad_buffer)?
        }
        ColorType::Gray(8) | ColorType::Gray(16) => {
            image::GrayImage::from_raw(width, height, bytes)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(bad_buffer)?
        }
        ColorType::GrayA(8) | ColorType::GrayA(16) => {
            image::GrayAlphaImage::from_raw(width, height, bytes)
                .map(DynamicImage::ImageLumaA8)
                .ok_or_else(bad_buffer)?
        }
        other => {
            return Err(CodecError::Unsupported(format!(
                "unsupported TIFF colour type: {other:?}"
            )))
        }
    };
    Ok(img)
}

/// Count the frames of a TIFF by walking the IFD chain, without decoding
/// pixel data. Used for progress unit totals before any conversion starts.
pub(crate) fn count_tiff_frames(path: &Path) -> Result<usize, CodecError> {
    use tiff::decoder::Decoder;

    let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
    let mut count = 1usize;
    while decoder.more_images() {
        decoder.next_image()?;
        count += 1;
    }
    Ok(count)
}

/// Parse and rasterise an SVG file at the requested DPI.
///
/// The SVG's intrinsic size is defined at `base_ppi` (CSS: 96 px/in), so the
/// raster scale is `dpi / base_ppi`, capped so neither edge exceeds
/// `max_edge`.
pub(crate) fn rasterize_svg(
    path: &Path,
    dpi: u32,
    base_ppi: u32,
    max_edge: u32,
) -> Result<DynamicImage, CodecError> {
    use resvg::{tiny_skia, usvg};

    let data = std::fs::read(path)?;
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(&data, &options)
        .map_err(|e| CodecError::Svg(e.to_string()))?;

    let size = tree.size();
    let mut scale = dpi as f32 / base_ppi.max(1) as f32;
    let longest = size.width().max(size.height());
    if longest * scale > max_edge as f32 {
        scale = max_edge as f32 / longest;
    }

    let width = ((size.width() * scale).ceil() as u32).max(1);
    let height = ((size.height() * scale).ceil() as u32).max(1);
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CodecError::Svg("zero-sized SVG canvas".into()))?;

    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let mut raw = Vec::with_capacity((width * height * 4) as usize);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let rgba = RgbaImage::from_raw(width, height, raw)
        .ok_or_else(|| CodecError::Svg("pixmap buffer size mismatch".into()))?;
    Ok(DynamicImage::ImageRgba8(rgba))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(unit_percent(0, 3), 0);
        assert_eq!(unit_percent(1, 3), 33);
        assert_eq!(unit_percent(2, 3), 67);
        assert_eq!(unit_percent(3, 3), 100);
        assert_eq!(unit_percent(0, 0), 100);
    }

    #[test]
    fn flatten_blends_transparent_pixels_onto_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0])); // fully transparent
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 255])); // opaque black
        let rgb = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn flatten_passes_opaque_rgb_through() {
        let rgb = RgbImage::from_pixel(3, 3, Rgb([10, 20, 30]));
        let out = flatten_onto_white(&DynamicImage::ImageRgb8(rgb.clone()));
        assert_eq!(out, rgb);
    }

    #[test]
    fn jpeg_bytes_start_with_soi_marker() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([200, 10, 10])));
        let bytes = encode_jpeg_bytes(&img, 95).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "missing JPEG SOI marker");
    }

    #[test]
    fn frame_count_matches_full_decode() {
        use tiff::encoder::{colortype::RGB8, TiffEncoder};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tif");
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let px: Vec<u8> = [1u8, 2, 3].repeat(4);
        encoder.write_image::<RGB8>(2, 2, &px).unwrap();
        encoder.write_image::<RGB8>(2, 2, &px).unwrap();
        encoder.write_image::<RGB8>(2, 2, &px).unwrap();

        assert_eq!(count_tiff_frames(&path).unwrap(), 3);
        assert_eq!(decode_tiff_frames(&path).unwrap().len(), 3);
    }

    #[test]
    fn rasterize_svg_honours_intrinsic_size_and_dpi() {
        let dir = tempfile::tempdir().unwrap();
        let svg = dir.path().join("box.svg");
        std::fs::write(
            &svg,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="96" height="48">
                 <rect width="96" height="48" fill="#ff0000"/>
               </svg>"##,
        )
        .unwrap();
        // 96 px at 96 ppi is one inch; at 300 dpi that inch is 300 px.
        let img = rasterize_svg(&svg, 300, 96, 12_000).unwrap();
        assert_eq!(img.width(), 300);
        assert_eq!(img.height(), 150);
    }

    #[test]
    fn rasterize_svg_caps_longest_edge() {
        let dir = tempfile::tempdir().unwrap();
        let svg = dir.path().join("wide.svg");
        std::fs::write(
            &svg,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="1000" height="10">
                 <rect width="1000" height="10" fill="#00ff00"/>
               </svg>"##,
        )
        .unwrap();
        let img = rasterize_svg(&svg, 600, 96, 2000).unwrap();
        assert!(img.width() <= 2000, "width {} exceeds cap", img.width());
    }

    #[test]
    fn invalid_svg_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let svg = dir.path().join("broken.svg");
        std::fs::write(&svg, "this is not xml").unwrap();
        assert!(matches!(
            rasterize_svg(&svg, 300, 96, 12_000),
            Err(CodecError::Svg(_))
        ));
    }
}
