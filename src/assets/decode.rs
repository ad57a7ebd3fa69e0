use std::io::Cursor;

use base64::Engine as _;
use image::ImageDecoder as _;

use crate::foundation::{
    core::RasterImage,
    error::{MarkerError, MarkerResult},
};

const DATA_URL_PNG_PREFIX: &str = "data:image/png;base64,";

/// Decodes to straight RGBA8 with any EXIF orientation applied, as browsers display it.
pub fn decode_image(bytes: &[u8]) -> MarkerResult<RasterImage> {
    let decode_err = |e: image::ImageError| {
        MarkerError::image_decode(format!("decode image from memory: {e}"))
    };
    let mut decoder = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MarkerError::image_decode(format!("detect image format: {e}")))?
        .into_decoder()
        .map_err(decode_err)?;
    let orientation = decoder.orientation().map_err(decode_err)?;
    let mut dyn_img = image::DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    dyn_img.apply_orientation(orientation);
    let rgba = dyn_img.to_rgba8();
    RasterImage::try_from(rgba).map_err(|e| MarkerError::image_decode(e.to_string()))
}

/// Payload bytes of a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> MarkerResult<Vec<u8>> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| MarkerError::image_decode("data url must start with 'data:'"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| MarkerError::image_decode("data url has no ',' separator"))?;
    if !meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        return Err(MarkerError::image_decode(
            "only base64-encoded data urls are supported",
        ));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| MarkerError::image_decode(format!("data url payload: {e}")))
}

pub fn png_data_url(png: &[u8]) -> String {
    let mut out = String::from(DATA_URL_PNG_PREFIX);
    base64::engine::general_purpose::STANDARD.encode_string(png, &mut out);
    out
}

pub fn encode_png(img: &RasterImage) -> MarkerResult<Vec<u8>> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img.to_rgba_image())
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| MarkerError::encode(format!("write png: {e}")))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8;

    fn png_1x1(px: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_raw(1, 1, px.to_vec()).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_image_png_keeps_straight_alpha() {
        let prepared = decode_image(&png_1x1([100, 50, 200, 128])).unwrap();
        assert_eq!(prepared.width(), 1);
        assert_eq!(prepared.height(), 1);
        assert_eq!(prepared.as_rgba8(), &[100, 50, 200, 128]);
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for &b in data {
            crc ^= u32::from(b);
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
            }
        }
        !crc
    }

    /// Inserts an `eXIf` chunk carrying only an Orientation tag right after IHDR.
    fn with_exif_orientation(png: &[u8], orientation: u16) -> Vec<u8> {
        let mut exif = b"MM\0*\0\0\0\x08".to_vec();
        exif.extend_from_slice(&1u16.to_be_bytes());
        exif.extend_from_slice(&0x0112u16.to_be_bytes());
        exif.extend_from_slice(&3u16.to_be_bytes());
        exif.extend_from_slice(&1u32.to_be_bytes());
        exif.extend_from_slice(&orientation.to_be_bytes());
        exif.extend_from_slice(&[0, 0]);
        exif.extend_from_slice(&0u32.to_be_bytes());

        let mut chunk = b"eXIf".to_vec();
        chunk.extend_from_slice(&exif);
        let crc = crc32(&chunk);

        // 8-byte signature, then IHDR: 4 len + 4 type + 13 data + 4 crc.
        let ihdr_end = 8 + 25;
        let mut out = png[..ihdr_end].to_vec();
        out.extend_from_slice(&(exif.len() as u32).to_be_bytes());
        out.extend_from_slice(&chunk);
        out.extend_from_slice(&crc.to_be_bytes());
        out.extend_from_slice(&png[ihdr_end..]);
        out
    }

    #[test]
    fn decode_image_applies_exif_orientation() {
        let red = Rgba8::opaque(255, 0, 0);
        let blue = Rgba8::opaque(0, 0, 255);
        let img = image::RgbaImage::from_fn(2, 1, |x, _| {
            let c = if x == 0 { red } else { blue };
            image::Rgba([c.r, c.g, c.b, c.a])
        });
        let png = encode_png(&RasterImage::try_from(img).unwrap()).unwrap();

        // Orientation 6: display rotated 90 degrees clockwise.
        let rotated = decode_image(&with_exif_orientation(&png, 6)).unwrap();
        assert_eq!((rotated.width(), rotated.height()), (1, 2));
        assert_eq!(rotated.pixel(0, 0), Some(red));
        assert_eq!(rotated.pixel(0, 1), Some(blue));

        let upright = decode_image(&with_exif_orientation(&png, 1)).unwrap();
        assert_eq!((upright.width(), upright.height()), (2, 1));
        assert_eq!(upright.pixel(0, 0), Some(red));
    }

    #[test]
    fn decode_image_garbage_is_decode_error() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, MarkerError::ImageDecode(_)));
    }

    #[test]
    fn data_url_round_trip() {
        let png = png_1x1([1, 2, 3, 255]);
        let url = png_data_url(&png);
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_url(&url).unwrap(), png);
    }

    #[test]
    fn data_url_rejects_missing_base64_marker() {
        assert!(decode_data_url("data:text/plain,hello").is_err());
        assert!(decode_data_url("http://example.com/a.png").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
    }

    #[test]
    fn encode_png_decodes_back_to_same_pixels() {
        let img = RasterImage::filled(3, 2, Rgba8::opaque(10, 20, 30)).unwrap();
        let png = encode_png(&img).unwrap();
        assert_eq!(decode_image(&png).unwrap(), img);
    }
}
