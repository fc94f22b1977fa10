//! Read the pixel density an image file declares about itself.
//!
//! Only the two metadata blocks that matter in practice are understood: the
//! PNG `pHYs` chunk and the JPEG JFIF `APP0` segment.

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const INCHES_PER_METRE: f64 = 0.0254;
const CM_PER_INCH: f64 = 2.54;

/// Horizontal DPI declared by the image, if any.
pub fn detect_dpi(data: &[u8]) -> Option<u32> {
    if data.starts_with(PNG_SIGNATURE) {
        png_dpi(&data[PNG_SIGNATURE.len()..])
    } else if data.starts_with(&[0xFF, 0xD8]) {
        jfif_dpi(&data[2..])
    } else {
        None
    }
}

fn be_u16(bytes: &[u8]) -> Option<u16> {
    Some(u16::from_be_bytes(bytes.get(..2)?.try_into().ok()?))
}

fn be_u32(bytes: &[u8]) -> Option<u32> {
    Some(u32::from_be_bytes(bytes.get(..4)?.try_into().ok()?))
}

fn to_dpi(value: f64) -> Option<u32> {
    let dpi = value.round();
    (dpi >= 1.0 && dpi <= u32::MAX as f64).then_some(dpi as u32)
}

fn png_dpi(mut chunks: &[u8]) -> Option<u32> {
    // length(4) type(4) data(length) crc(4)
    while chunks.len() >= 12 {
        let len = be_u32(chunks)? as usize;
        let kind = &chunks[4..8];
        let body = chunks.get(8..8 + len)?;
        match kind {
            b"pHYs" if len >= 9 => {
                // Unit 1 is metres; unit 0 only gives an aspect ratio.
                if body[8] != 1 {
                    return None;
                }
                return to_dpi(be_u32(body)? as f64 * INCHES_PER_METRE);
            }
            // pHYs must precede the image data.
            b"IDAT" | b"IEND" => return None,
            _ => {}
        }
        chunks = chunks.get(12 + len..)?;
    }
    None
}

fn jfif_dpi(mut segments: &[u8]) -> Option<u32> {
    loop {
        if segments.len() < 4 || segments[0] != 0xFF {
            return None;
        }
        let marker = segments[1];
        // Start of scan: no more header segments.
        if marker == 0xDA {
            return None;
        }
        let len = be_u16(&segments[2..])? as usize;
        let body = segments.get(4..2 + len)?;
        if marker == 0xE0 && body.len() >= 12 && body.starts_with(b"JFIF\0") {
            // JFIF\0, version(2), units(1), x density(2), y density(2)
            let density = be_u16(&body[8..])? as f64;
            return match body[7] {
                1 => to_dpi(density),
                2 => to_dpi(density * CM_PER_INCH),
                _ => None,
            };
        }
        segments = segments.get(2 + len..)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_with_phys(ppm: u32, unit: u8) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        // IHDR, contents irrelevant here.
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&[0; 13]);
        data.extend_from_slice(&[0; 4]);
        // pHYs
        data.extend_from_slice(&9u32.to_be_bytes());
        data.extend_from_slice(b"pHYs");
        data.extend_from_slice(&ppm.to_be_bytes());
        data.extend_from_slice(&ppm.to_be_bytes());
        data.push(unit);
        data.extend_from_slice(&[0; 4]);
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(b"IEND");
        data.extend_from_slice(&[0; 4]);
        data
    }

    fn jpeg_with_jfif(units: u8, density: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[1, 1, units]);
        data.extend_from_slice(&density.to_be_bytes());
        data.extend_from_slice(&density.to_be_bytes());
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        data
    }

    #[test]
    fn test_png_phys_in_metres() {
        // 11811 px/m is the usual encoding of 300 dpi.
        assert_eq!(detect_dpi(&png_with_phys(11811, 1)), Some(300));
        assert_eq!(detect_dpi(&png_with_phys(2835, 1)), Some(72));
    }

    #[test]
    fn test_png_without_unit() {
        assert_eq!(detect_dpi(&png_with_phys(1, 0)), None);
    }

    #[test]
    fn test_png_without_phys() {
        let mut img = image::RgbImage::new(4, 4);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageOutputFormat::Png)
            .unwrap();
        assert_eq!(detect_dpi(buf.get_ref()), None);
    }

    #[test]
    fn test_jfif_density() {
        assert_eq!(detect_dpi(&jpeg_with_jfif(1, 96)), Some(96));
        assert_eq!(detect_dpi(&jpeg_with_jfif(2, 118)), Some(300));
        assert_eq!(detect_dpi(&jpeg_with_jfif(0, 1)), None);
    }

    #[test]
    fn test_unknown_and_truncated_input() {
        assert_eq!(detect_dpi(b"GIF89a"), None);
        assert_eq!(detect_dpi(&[]), None);
        let truncated = png_with_phys(11811, 1);
        assert_eq!(detect_dpi(&truncated[..20]), None);
    }
}
