use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::ImageFormat;

/// An uploaded photo as a self-describing payload: format tag plus base64 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime_type: String,
    data: String,
}

const HINT_ONLY_MIMES: &[&str] = &["image/heic", "image/heif"];

impl ImagePayload {
    pub fn from_data_url(url: &str) -> Result<Self> {
        let Some(rest) = url.trim().strip_prefix("data:") else {
            bail!("image data URL must start with 'data:'");
        };
        let Some((meta, data)) = rest.split_once(',') else {
            bail!("image data URL is missing the ',' separator");
        };
        let Some(mime_type) = meta.strip_suffix(";base64") else {
            bail!("image data URL must be base64 encoded");
        };
        let mime_type = mime_type.trim();
        if mime_type.is_empty() {
            bail!("image data URL has no mime type");
        }
        let data = data.trim();
        if data.is_empty() {
            bail!("image data URL carries no data");
        }
        let decoded = BASE64
            .decode(data.as_bytes())
            .context("image data is not valid base64")?;
        if decoded.is_empty() {
            bail!("image data URL carries no data");
        }
        Ok(Self {
            mime_type: mime_type.to_ascii_lowercase(),
            data: data.to_string(),
        })
    }

    /// The format sniffed from the bytes wins. `mime_hint` is only consulted for
    /// HEIC/HEIF, which the sniffer does not know, and only when the bytes carry an
    /// ISO media `ftyp` box. Anything else is rejected.
    pub fn from_bytes(bytes: &[u8], mime_hint: Option<&str>) -> Result<Self> {
        if bytes.is_empty() {
            bail!("image is empty");
        }
        let hint = mime_hint
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| HINT_ONLY_MIMES.contains(&value.as_str()))
            .filter(|_| bytes.get(4..8) == Some(b"ftyp".as_slice()));
        let Some(mime_type) = sniff_mime(bytes).or(hint) else {
            bail!("not a recognized image format");
        };
        Ok(Self {
            mime_type,
            data: BASE64.encode(bytes),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        Self::from_bytes(&bytes, mime_for_path(path))
            .with_context(|| format!("invalid image {}", path.display()))
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn decoded_len(&self) -> usize {
        // base64 length minus padding, scaled back to bytes
        let padding = self.data.bytes().rev().take_while(|byte| *byte == b'=').count();
        (self.data.len() / 4) * 3 - padding.min(2)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<String> {
    let format = image::guess_format(bytes).ok()?;
    let mime = match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => return None,
    };
    Some(mime.to_string())
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::ImagePayload;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn data_url_is_split_into_mime_and_data() -> anyhow::Result<()> {
        let payload = ImagePayload::from_data_url("data:image/PNG;base64,aGVsbG8=")?;
        assert_eq!(payload.mime_type(), "image/png");
        assert_eq!(payload.data(), "aGVsbG8=");
        assert_eq!(payload.decoded_len(), 5);
        assert_eq!(payload.to_data_url(), "data:image/png;base64,aGVsbG8=");
        Ok(())
    }

    #[test]
    fn malformed_data_urls_are_rejected() {
        for raw in [
            "",
            "image/png;base64,aGVsbG8=",
            "data:image/png;base64",
            "data:image/png,aGVsbG8=",
            "data:;base64,aGVsbG8=",
            "data:image/png;base64,",
            "data:image/png;base64,@@@not-base64@@@",
        ] {
            assert!(ImagePayload::from_data_url(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn empty_bytes_are_rejected() {
        assert!(ImagePayload::from_bytes(&[], Some("image/png")).is_err());
    }

    #[test]
    fn bytes_without_hint_are_sniffed() -> anyhow::Result<()> {
        let payload = ImagePayload::from_bytes(PNG_MAGIC, None)?;
        assert_eq!(payload.mime_type(), "image/png");
        assert!(ImagePayload::from_bytes(b"plain text", None).is_err());
        assert!(ImagePayload::from_bytes(b"plain text", Some("text/plain")).is_err());
        assert!(ImagePayload::from_bytes(b"plain text", Some("image/jpeg")).is_err());
        assert!(ImagePayload::from_bytes(b"plain text", Some("image/heic")).is_err());
        Ok(())
    }

    #[test]
    fn sniffed_format_wins_over_extension() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let jpg = temp.path().join("fridge.JPG");
        fs::write(&jpg, PNG_MAGIC)?;
        assert_eq!(ImagePayload::from_path(&jpg)?.mime_type(), "image/png");

        // HEIC cannot be sniffed, so the extension decides
        let heic = temp.path().join("fridge.heic");
        fs::write(&heic, b"\0\0\0\x18ftypheic")?;
        assert_eq!(ImagePayload::from_path(&heic)?.mime_type(), "image/heic");

        for name in ["notes.txt", "notes.jpg"] {
            let text = temp.path().join(name);
            fs::write(&text, b"milk, eggs")?;
            let err = ImagePayload::from_path(&text).err().map(|err| format!("{err:#}"));
            assert!(err.unwrap_or_default().contains("not a recognized image format"), "{name}");
        }

        let bare = temp.path().join("fridge");
        fs::write(&bare, PNG_MAGIC)?;
        assert_eq!(ImagePayload::from_path(&bare)?.mime_type(), "image/png");

        let empty = temp.path().join("empty.png");
        fs::write(&empty, b"")?;
        assert!(ImagePayload::from_path(&empty).is_err());
        Ok(())
    }
}
