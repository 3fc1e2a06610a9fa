use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// A decoded raster image owned by the invoice model. Constructed only
/// through the validating loaders, so a held asset is always displayable.
/// Serialized as a `data:` URI on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    mime: String,
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl ImageAsset {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image file: {}", path.display()))?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mime = sniff_image_mime(&bytes)?;
        let decoded = image::load_from_memory(&bytes)
            .with_context(|| format!("failed to decode {} image", mime))?;
        Ok(Self {
            mime,
            width: decoded.width(),
            height: decoded.height(),
            bytes,
        })
    }

    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| anyhow!("expected a data: URI"))?;
        let (head, payload) = rest
            .split_once(',')
            .ok_or_else(|| anyhow!("malformed data URI (missing payload)"))?;
        if !head.ends_with(";base64") {
            return Err(anyhow!("expected a base64-encoded data URI"));
        }
        let bytes = BASE64
            .decode(payload.trim())
            .with_context(|| "invalid base64 payload in data URI")?;
        Self::from_bytes(bytes)
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

fn sniff_image_mime(bytes: &[u8]) -> Result<String> {
    let kind = infer::get(bytes).ok_or_else(|| anyhow!("unrecognized image data"))?;
    let mime = kind.mime_type();
    if !mime.starts_with("image/") {
        return Err(anyhow!("not an image (detected '{}')", mime));
    }
    Ok(mime.to_string())
}

impl Serialize for ImageAsset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.data_uri())
    }
}

impl<'de> Deserialize<'de> for ImageAsset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        ImageAsset::from_data_uri(&uri).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) fn test_png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    let pixel = image::Rgba([40u8, 90, 200, 255]);
    let buffer = image::RgbaImage::from_pixel(width, height, pixel);
    image::DynamicImage::ImageRgba8(buffer)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .expect("encode png");
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_bytes_round_trip_through_data_uri() {
        let asset = ImageAsset::from_bytes(test_png(3, 2)).unwrap();
        assert_eq!(asset.mime(), "image/png");
        assert_eq!(asset.width(), 3);
        assert_eq!(asset.height(), 2);

        let restored = ImageAsset::from_data_uri(&asset.data_uri()).unwrap();
        assert_eq!(restored, asset);
    }

    #[test]
    fn rejects_non_image_payloads() {
        assert!(ImageAsset::from_bytes(b"%PDF-1.4 not an image".to_vec()).is_err());
        assert!(ImageAsset::from_data_uri("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(ImageAsset::from_data_uri("nonsense").is_err());
    }

    #[test]
    fn truncated_image_fails_to_decode() {
        let mut bytes = test_png(4, 4);
        bytes.truncate(bytes.len() / 2);
        assert!(ImageAsset::from_bytes(bytes).is_err());
    }
}
