//! Page rasterization through an external renderer.

use super::{ContentExtractor, ExtractedContent, ExtractedDocument, ExtractorKind, PageSelection};
use crate::error::{EngineError, ExtractError};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// File name prefix for rendered pages inside the work directory
const PAGE_PREFIX: &str = "page";

/// Renders PDF pages to PNG files.
///
/// Implementations must be shareable across worker threads; one
/// instance serves the whole run.
pub trait Rasterizer: Send + Sync {
    /// Render the selected pages of `pdf` into `out_dir`.
    ///
    /// Returns the PNG paths in page order.
    fn render(
        &self,
        pdf: &Path,
        pages: PageSelection,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError>;

    /// Check that the renderer can run at all
    fn check_available(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Human-readable name for logs
    fn name(&self) -> &str;
}

/// Rasterizer backed by poppler's `pdftoppm`
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(binary: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            binary: binary.into(),
            dpi,
        }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm", 150)
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn render(
        &self,
        pdf: &Path,
        pages: PageSelection,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        // Pages left by an earlier run into the same directory would be
        // picked up as this document's pages
        clear_rendered_pages(out_dir)?;

        let mut command = Command::new(&self.binary);
        command.arg("-png").arg("-r").arg(self.dpi.to_string());
        if let Some(limit) = pages.limit() {
            command.arg("-f").arg("1").arg("-l").arg(limit.to_string());
        }
        command.arg(pdf).arg(out_dir.join(PAGE_PREFIX));

        tracing::debug!(pdf = %pdf.display(), dpi = self.dpi, "rendering with pdftoppm");

        let output = command.output().map_err(|e| ExtractError::Conversion {
            path: pdf.to_path_buf(),
            reason: format!("failed to run {}: {}", self.binary.display(), e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Conversion {
                path: pdf.to_path_buf(),
                reason: format!("pdftoppm exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let rendered = collect_rendered_pages(out_dir).map_err(|source| ExtractError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;

        if rendered.is_empty() {
            return Err(ExtractError::Conversion {
                path: pdf.to_path_buf(),
                reason: "no pages were rendered".to_string(),
            });
        }

        Ok(rendered)
    }

    fn check_available(&self) -> Result<(), EngineError> {
        // pdftoppm -v exits non-zero on some poppler builds; spawning is enough
        Command::new(&self.binary)
            .arg("-v")
            .output()
            .map(|_| ())
            .map_err(|e| EngineError::Unavailable {
                tool: self.binary.display().to_string(),
                reason: e.to_string(),
            })
    }

    fn name(&self) -> &str {
        "pdftoppm"
    }
}

fn clear_rendered_pages(dir: &Path) -> Result<(), ExtractError> {
    let io_error = |source| ExtractError::Io {
        path: dir.to_path_buf(),
        source,
    };

    for stale in collect_rendered_pages(dir).map_err(io_error)? {
        std::fs::remove_file(&stale).map_err(io_error)?;
    }
    Ok(())
}

/// Find `page-<n>.png` files in `dir`, ordered by page number.
///
/// pdftoppm zero-pads the page number to the width of the page count,
/// so lexical order is not reliable.
fn collect_rendered_pages(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut pages: Vec<(u32, PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(number) = page_number(name) else {
            continue;
        };
        pages.push((number, path));
    }

    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

fn page_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// Raster-image extraction strategy
pub struct RasterExtractor {
    rasterizer: Arc<dyn Rasterizer>,
    pages: PageSelection,
}

impl RasterExtractor {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, pages: PageSelection) -> Self {
        Self { rasterizer, pages }
    }

    /// Render and decode pages; shared with the OCR strategy.
    pub(crate) fn render_paths(
        &self,
        pdf: &Path,
        workdir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let mut paths = self.rasterizer.render(pdf, self.pages, workdir)?;
        if let Some(limit) = self.pages.limit() {
            paths.truncate(limit);
        }
        Ok(paths)
    }
}

impl ContentExtractor for RasterExtractor {
    fn extract(&self, pdf: &Path, workdir: &Path) -> Result<ExtractedDocument, ExtractError> {
        let paths = self.render_paths(pdf, workdir)?;

        let pages = paths
            .iter()
            .map(|path| {
                image::open(path)
                    .map(|image| ExtractedContent::RasterImage(image.to_rgba8()))
                    .map_err(|e| ExtractError::Conversion {
                        path: pdf.to_path_buf(),
                        reason: format!("cannot decode rendered page {}: {}", path.display(), e),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ExtractedDocument::new(pdf, pages))
    }

    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Raster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    /// Writes solid pages without touching the PDF
    struct SolidRasterizer {
        page_count: usize,
    }

    impl Rasterizer for SolidRasterizer {
        fn render(
            &self,
            _pdf: &Path,
            pages: PageSelection,
            out_dir: &Path,
        ) -> Result<Vec<PathBuf>, ExtractError> {
            let count = pages.limit().unwrap_or(self.page_count).min(self.page_count);
            (1..=count)
                .map(|n| {
                    let path = out_dir.join(format!("page-{:02}.png", n));
                    let shade = (n * 40) as u8;
                    RgbaImage::from_pixel(4, 3, Rgba([shade, shade, shade, 255]))
                        .save(&path)
                        .unwrap();
                    Ok(path)
                })
                .collect()
        }

        fn name(&self) -> &str {
            "solid"
        }
    }

    #[test]
    fn page_numbers_parse_padded_names() {
        assert_eq!(page_number("page-1.png"), Some(1));
        assert_eq!(page_number("page-007.png"), Some(7));
        assert_eq!(page_number("page-1.txt"), None);
        assert_eq!(page_number("other-1.png"), None);
    }

    #[test]
    fn rendered_pages_sort_numerically() {
        let dir = TempDir::new().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pages = collect_rendered_pages(dir.path()).unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(names, vec!["page-1.png", "page-2.png", "page-10.png"]);
    }

    #[test]
    fn extractor_decodes_first_page_only_by_default() {
        let dir = TempDir::new().unwrap();
        let extractor = RasterExtractor::new(
            Arc::new(SolidRasterizer { page_count: 3 }),
            PageSelection::First,
        );

        let document = extractor.extract(Path::new("/docs/a.pdf"), dir.path()).unwrap();

        assert_eq!(document.page_count(), 1);
        let image = document.pages[0].as_image().unwrap();
        assert_eq!(image.dimensions(), (4, 3));
    }

    #[test]
    fn extractor_decodes_all_pages_when_selected() {
        let dir = TempDir::new().unwrap();
        let extractor = RasterExtractor::new(
            Arc::new(SolidRasterizer { page_count: 3 }),
            PageSelection::All,
        );

        let document = extractor.extract(Path::new("/docs/a.pdf"), dir.path()).unwrap();

        assert_eq!(document.page_count(), 3);
        assert_eq!(document.pages[2].as_image().unwrap().get_pixel(0, 0)[0], 120);
    }

    /// Stand-in for pdftoppm: the "pdf" holds a page count and each page
    /// becomes an empty `<prefix>-<n>.png`
    #[cfg(unix)]
    fn scripted_pdftoppm(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("pdftoppm");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             while [ $# -gt 2 ]; do shift; done\n\
             count=$(cat \"$1\")\n\
             i=1\n\
             while [ $i -le $count ]; do : > \"$2-$i.png\"; i=$((i+1)); done\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn rerender_into_same_directory_drops_old_pages() {
        let bin = TempDir::new().unwrap();
        let docs = TempDir::new().unwrap();
        let workdir = TempDir::new().unwrap();
        let rasterizer = PdftoppmRasterizer::new(scripted_pdftoppm(bin.path()), 72);

        let longer = docs.path().join("longer.pdf");
        let shorter = docs.path().join("shorter.pdf");
        std::fs::write(&longer, "3").unwrap();
        std::fs::write(&shorter, "2").unwrap();

        let first = rasterizer.render(&longer, PageSelection::All, workdir.path()).unwrap();
        assert_eq!(first.len(), 3);

        let second = rasterizer.render(&shorter, PageSelection::All, workdir.path()).unwrap();
        assert_eq!(second.len(), 2);
        assert!(!workdir.path().join("page-3.png").exists());
    }

    #[test]
    fn missing_binary_is_a_conversion_error() {
        let dir = TempDir::new().unwrap();
        let rasterizer = PdftoppmRasterizer::new("/nonexistent/bin/pdftoppm", 72);

        let result = rasterizer.render(Path::new("/docs/a.pdf"), PageSelection::First, dir.path());

        assert!(matches!(result, Err(ExtractError::Conversion { .. })));
        assert!(rasterizer.check_available().is_err());
    }
}
