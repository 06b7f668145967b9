//! CLIP ViT-B/32 image embeddings through fastembed (ONNX runtime).
//!
//! Only built with the `clip` feature. The model is downloaded and loaded
//! by [`EmbeddingModel::load`] and dropped again by `unload`.

use super::EmbeddingModel;
use crate::error::{CompareError, EngineError};
use fastembed::{ImageEmbedding, ImageEmbeddingModel, ImageInitOptions};
use image::RgbaImage;
use std::sync::Mutex;

/// CLIP image embedder shared by all workers
pub struct ClipEmbedder {
    model: Mutex<Option<ImageEmbedding>>,
}

impl ClipEmbedder {
    pub fn new() -> Self {
        Self {
            model: Mutex::new(None),
        }
    }
}

impl Default for ClipEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for ClipEmbedder {
    fn load(&self) -> Result<(), EngineError> {
        let mut guard = self
            .model
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.is_none() {
            let options = ImageInitOptions::new(ImageEmbeddingModel::ClipVitB32);
            let model = ImageEmbedding::try_new(options)
                .map_err(|e| EngineError::ModelLoad(format!("CLIP init failed: {e}")))?;
            *guard = Some(model);
            tracing::info!("CLIP ViT-B/32 loaded");
        }
        Ok(())
    }

    fn embed(&self, image: &RgbaImage) -> Result<Vec<f32>, CompareError> {
        // fastembed reads images from disk
        let file = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|e| CompareError::Model(e.to_string()))?;
        image
            .save(file.path())
            .map_err(|e| CompareError::Model(e.to_string()))?;

        let mut guard = self
            .model
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let model = guard
            .as_mut()
            .ok_or_else(|| CompareError::Model("CLIP model is not loaded".to_string()))?;

        let mut results = model
            .embed(vec![file.path().to_path_buf()], None)
            .map_err(|e| CompareError::Model(e.to_string()))?;
        results
            .pop()
            .ok_or_else(|| CompareError::Model("no embedding returned".to_string()))
    }

    fn unload(&self) {
        let mut guard = self
            .model
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.take().is_some() {
            tracing::debug!("CLIP model released");
        }
    }

    fn name(&self) -> &str {
        "clip-vit-b32"
    }
}
