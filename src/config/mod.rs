//! # Config Module
//!
//! Run settings read from a JSON file and overridden by CLI flags.
//!
//! Every key is optional. Keys left out fall back to
//! [`PipelineConfig::default`], except `from`, `to` and `result`, which
//! must come from the file or the command line.
//!
//! ```json
//! { "from": "input/from", "to": "input/to", "result": "output",
//!   "extractor": "embedded-text", "comparator": "char-diff" }
//! ```

use crate::core::comparator::{ComparatorKind, EmbeddingModelKind};
use crate::core::extract::{ExtractorKind, PageSelection};
use crate::core::pipeline::PipelineConfig;
use crate::error::CompareToolError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application folder under the platform config directory
pub const APP_DIR: &str = "pdf-pair-compare";
/// Settings file name inside [`APP_DIR`]
pub const SETTINGS_FILE: &str = "config.json";

/// Partial run settings, as found in a settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    pub from: Option<PathBuf>,
    pub to: Option<PathBuf>,
    pub result: Option<PathBuf>,
    pub only_diff_text: Option<bool>,
    pub extractor: Option<ExtractorKind>,
    pub comparator: Option<ComparatorKind>,
    pub pages: Option<PageSelection>,
    pub extension: Option<String>,
    pub workers: Option<usize>,
    pub languages: Option<Vec<String>>,
    pub dpi: Option<u32>,
    pub html: Option<bool>,
    pub keep_intermediate: Option<bool>,
    pub sort: Option<bool>,
    pub pixel_tolerance: Option<u8>,
    pub embedding_model: Option<EmbeddingModelKind>,
    pub pdftoppm_path: Option<PathBuf>,
    pub tesseract_path: Option<PathBuf>,
}

impl Settings {
    /// Read settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, CompareToolError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CompareToolError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            CompareToolError::Config(format!("invalid settings in {}: {}", path.display(), e))
        })
    }

    /// Load `explicit` if given, else the default settings file if it
    /// exists, else empty settings
    pub fn discover(explicit: Option<&Path>) -> Result<Self, CompareToolError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "using default settings file");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Overlay `overrides` on top of these settings; set keys win
    pub fn merge(self, overrides: Settings) -> Settings {
        Settings {
            from: overrides.from.or(self.from),
            to: overrides.to.or(self.to),
            result: overrides.result.or(self.result),
            only_diff_text: overrides.only_diff_text.or(self.only_diff_text),
            extractor: overrides.extractor.or(self.extractor),
            comparator: overrides.comparator.or(self.comparator),
            pages: overrides.pages.or(self.pages),
            extension: overrides.extension.or(self.extension),
            workers: overrides.workers.or(self.workers),
            languages: overrides.languages.or(self.languages),
            dpi: overrides.dpi.or(self.dpi),
            html: overrides.html.or(self.html),
            keep_intermediate: overrides.keep_intermediate.or(self.keep_intermediate),
            sort: overrides.sort.or(self.sort),
            pixel_tolerance: overrides.pixel_tolerance.or(self.pixel_tolerance),
            embedding_model: overrides.embedding_model.or(self.embedding_model),
            pdftoppm_path: overrides.pdftoppm_path.or(self.pdftoppm_path),
            tesseract_path: overrides.tesseract_path.or(self.tesseract_path),
        }
    }

    /// Resolve into a validated pipeline configuration
    pub fn into_pipeline_config(self) -> Result<PipelineConfig, CompareToolError> {
        let defaults = PipelineConfig::default();

        let config = PipelineConfig {
            from: required(self.from, "from")?,
            to: required(self.to, "to")?,
            result: required(self.result, "result")?,
            extractor: self.extractor.unwrap_or(defaults.extractor),
            comparator: self.comparator.unwrap_or(defaults.comparator),
            pages: self.pages.unwrap_or(defaults.pages),
            extension: self.extension.unwrap_or(defaults.extension),
            workers: self.workers.unwrap_or(defaults.workers),
            only_diff_text: self.only_diff_text.unwrap_or(defaults.only_diff_text),
            languages: self.languages.unwrap_or(defaults.languages),
            dpi: self.dpi.unwrap_or(defaults.dpi),
            html: self.html.unwrap_or(defaults.html),
            keep_intermediate: self.keep_intermediate.unwrap_or(defaults.keep_intermediate),
            sort: self.sort.unwrap_or(defaults.sort),
            pixel_tolerance: self.pixel_tolerance.unwrap_or(defaults.pixel_tolerance),
            embedding_model: self.embedding_model.unwrap_or(defaults.embedding_model),
            pdftoppm_path: self.pdftoppm_path.unwrap_or(defaults.pdftoppm_path),
            tesseract_path: self.tesseract_path.unwrap_or(defaults.tesseract_path),
        };

        config.validate()?;
        Ok(config)
    }
}

/// `<config dir>/pdf-pair-compare/config.json`, if the platform has one
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
}

fn required(value: Option<PathBuf>, key: &str) -> Result<PathBuf, CompareToolError> {
    value.ok_or_else(|| {
        CompareToolError::Config(format!(
            "'{}' directory is required (settings file or command line)",
            key
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dirs_only() -> Settings {
        Settings {
            from: Some(PathBuf::from("in/from")),
            to: Some(PathBuf::from("in/to")),
            result: Some(PathBuf::from("out")),
            ..Settings::default()
        }
    }

    #[test]
    fn parses_camel_case_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "from": "input/from",
                "to": "input/to",
                "result": "output",
                "onlyDiffText": true,
                "extractor": "embedded-text",
                "comparator": "char-diff",
                "pages": "all",
                "keepIntermediate": true,
                "pixelTolerance": 4,
                "embeddingModel": "thumbnail"
            }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.from, Some(PathBuf::from("input/from")));
        assert_eq!(settings.only_diff_text, Some(true));
        assert_eq!(settings.extractor, Some(ExtractorKind::EmbeddedText));
        assert_eq!(settings.comparator, Some(ComparatorKind::CharDiff));
        assert_eq!(settings.pages, Some(PageSelection::All));
        assert_eq!(settings.keep_intermediate, Some(true));
        assert_eq!(settings.pixel_tolerance, Some(4));
        assert_eq!(settings.workers, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "form": "typo" }"#).unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(CompareToolError::Config(_))
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = Settings::discover(Some(Path::new("/nonexistent/config.json")));
        assert!(matches!(result, Err(CompareToolError::Config(_))));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let file = Settings {
            workers: Some(2),
            html: Some(true),
            ..dirs_only()
        };
        let cli = Settings {
            workers: Some(8),
            result: Some(PathBuf::from("elsewhere")),
            ..Settings::default()
        };

        let merged = file.merge(cli);

        assert_eq!(merged.workers, Some(8));
        assert_eq!(merged.html, Some(true));
        assert_eq!(merged.result, Some(PathBuf::from("elsewhere")));
        assert_eq!(merged.from, Some(PathBuf::from("in/from")));
    }

    #[test]
    fn missing_directories_are_config_errors() {
        let settings = Settings {
            result: None,
            ..dirs_only()
        };

        let err = settings.into_pipeline_config().unwrap_err();
        assert!(err.to_string().contains("'result'"));
    }

    #[test]
    fn defaults_fill_unset_keys() {
        let config = dirs_only().into_pipeline_config().unwrap();

        assert_eq!(config.extractor, ExtractorKind::EmbeddedText);
        assert_eq!(config.comparator, ComparatorKind::CharDiff);
        assert_eq!(config.pages, PageSelection::First);
        assert_eq!(config.extension, ".pdf");
        assert_eq!(config.dpi, 150);
    }

    #[test]
    fn incompatible_strategies_fail_validation() {
        let settings = Settings {
            extractor: Some(ExtractorKind::Raster),
            comparator: Some(ComparatorKind::CharDiff),
            ..dirs_only()
        };

        assert!(matches!(
            settings.into_pipeline_config(),
            Err(CompareToolError::Config(_))
        ));
    }
}
