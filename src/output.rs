//! Saving rendered images to disk.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use tracing::info;

use crate::error::{GenerateError, Result};
use crate::render::RenderedImage;

/// Container format for saved images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Bmp => "bmp",
        }
    }

    /// Guesses the format from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref().extension()?.to_str()?.parse().ok()
    }

    fn as_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "bmp" => Ok(ImageFormat::Bmp),
            other => Err(GenerateError::invalid(
                "format",
                format!("unsupported image format `{other}`, expected PNG, JPEG or BMP"),
            )),
        }
    }
}

/// Places relative paths in `default_dir`, keeping only their file name. Absolute paths are
/// returned unchanged.
pub fn resolve_output_path(path: impl AsRef<Path>, default_dir: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match path.file_name() {
        Some(name) => default_dir.as_ref().join(name),
        None => default_dir.as_ref().join(path),
    }
}

/// `<prefix>_<yyyyMMddHHmmssfff>.<ext>` in local time.
pub fn timestamped_file_name(prefix: &str, format: ImageFormat) -> String {
    let timestamp = Local::now().format("%Y%m%d%H%M%S%3f");
    format!("{prefix}_{timestamp}.{}", format.extension())
}

/// Writes `image` to `path`, creating parent directories as needed.
///
/// `path` is used as given; callers resolve relative paths with [`resolve_output_path`]
/// first. Returns the path written.
pub fn save_image(
    image: &RenderedImage,
    path: impl AsRef<Path>,
    format: ImageFormat,
) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() || path.file_name().is_none() {
        return Err(GenerateError::invalid("path", "file path cannot be empty"));
    }

    let output_error =
        |source: image::ImageError| GenerateError::Output { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| output_error(image::ImageError::IoError(err)))?;
    }

    let buffer = image
        .to_rgb_image()
        .ok_or_else(|| GenerateError::invalid("image", "pixel buffer does not match dimensions"))?;
    buffer.save_with_format(path, format.as_image_format()).map_err(output_error)?;

    info!(path = %path.display(), %format, width = image.width(), "image saved");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::SymbolGrid;
    use crate::render::PixelRenderer;

    fn sample() -> RenderedImage {
        let grid = SymbolGrid::from_fn(8, 8, |x, y| x == y);
        PixelRenderer::default().render(&grid).unwrap()
    }

    #[test]
    fn test_resolve_output_path() {
        let dir = Path::new("generated");
        assert_eq!(resolve_output_path("code.png", dir), dir.join("code.png"));
        assert_eq!(resolve_output_path("nested/code.png", dir), dir.join("code.png"));

        let absolute = std::env::temp_dir().join("code.png");
        assert_eq!(resolve_output_path(&absolute, dir), absolute);
    }

    #[test]
    fn test_timestamped_file_name_shape() {
        let name = timestamped_file_name("QRCode", ImageFormat::Png);
        let stamp = name.strip_prefix("QRCode_").unwrap().strip_suffix(".png").unwrap();
        assert_eq!(stamp.len(), 17);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JPEG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_path("a/b.BMP"), Some(ImageFormat::Bmp));
        assert_eq!(ImageFormat::from_path("a/b.gif"), None);
        assert!("tiff".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn test_save_each_format() {
        let dir = tempfile::tempdir().unwrap();
        for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Bmp] {
            let path = dir.path().join("out").join(format!("code.{}", format.extension()));
            let written = save_image(&sample(), &path, format).unwrap();
            assert_eq!(written, path);

            let decoded = image::open(&path).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (8, 8));
        }
    }

    #[test]
    fn test_save_rejects_empty_path() {
        let err = save_image(&sample(), "", ImageFormat::Png).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidArgument { param: "path", .. }));
    }
}
