//! JinaBERT encoder using the Candle ML framework.

use super::config::JinaBertConfig;
use super::tokenizer::TokenizerHandle;
use super::traits::Embedder;
use crate::error::EmbeddingError;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Activation, VarBuilder};
use candle_transformers::models::jina_bert::{BertModel, Config, PositionEmbeddingType};
use std::path::Path;
use tracing::{debug, info};

/// JinaBERT embedding model.
///
/// Mean-pools the last hidden layer and L2-normalizes the result. Texts are
/// run through the model one at a time so padding never enters the mean pool;
/// recipe texts are short enough that batching buys little on CPU.
pub struct JinaBertEmbedder {
    model: BertModel,
    tokenizer: TokenizerHandle,
    config: JinaBertConfig,
    device: Device,
}

impl JinaBertEmbedder {
    /// Loads weights and tokenizer from disk.
    pub fn from_files(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        config: JinaBertConfig,
    ) -> Result<Self, EmbeddingError> {
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        let model_bytes = std::fs::read(model_path).map_err(|e| {
            EmbeddingError::ModelLoad(format!("Failed to read {}: {}", model_path.display(), e))
        })?;
        let tokenizer_bytes = std::fs::read(tokenizer_path).map_err(|e| {
            EmbeddingError::TokenizerUnavailable(format!(
                "Failed to read {}: {}",
                tokenizer_path.display(),
                e
            ))
        })?;

        let tokenizer = TokenizerHandle::from_bytes(tokenizer_bytes, config.max_position_embeddings)?;
        Self::from_bytes(model_bytes, tokenizer, config)
    }

    /// Creates the model from safetensors bytes and a configured tokenizer.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::ModelLoad` if the weights cannot be loaded.
    pub fn from_bytes(
        model_bytes: Vec<u8>,
        tokenizer: TokenizerHandle,
        config: JinaBertConfig,
    ) -> Result<Self, EmbeddingError> {
        info!(
            "Loading embedding model '{}' ({:.2}MB)",
            config.model_id,
            model_bytes.len() as f64 / 1_000_000.0
        );

        let device = Self::select_device();
        let model = Self::create_model(model_bytes, tokenizer.vocab_size(), &config, &device)?;

        Ok(Self {
            model,
            tokenizer,
            config,
            device,
        })
    }

    /// Returns a reference to the config.
    pub fn config(&self) -> &JinaBertConfig {
        &self.config
    }

    /// Selects the best available compute device: CUDA, then Metal, then CPU.
    pub fn select_device() -> Device {
        if let Ok(cuda_device) = Device::new_cuda(0) {
            info!("Using CUDA GPU");
            return cuda_device;
        }

        if let Ok(metal_device) = Device::new_metal(0) {
            info!("Using Metal GPU");
            return metal_device;
        }

        info!("Using CPU");
        Device::Cpu
    }

    fn create_model(
        model_bytes: Vec<u8>,
        vocab_size: usize,
        config: &JinaBertConfig,
        device: &Device,
    ) -> Result<BertModel, EmbeddingError> {
        let model_config = Config::new(
            vocab_size,
            config.hidden_size,
            config.num_hidden_layers,
            config.num_attention_heads,
            config.intermediate_size,
            Activation::Gelu,
            config.max_position_embeddings,
            2,     // type_vocab_size
            0.02,  // initializer_range
            1e-12, // layer_norm_eps
            0,     // pad_token_id
            PositionEmbeddingType::Alibi,
        );

        if model_bytes.len() < 8 {
            return Err(EmbeddingError::ModelLoad(
                "Model file too small".to_string(),
            ));
        }

        // candle's jina_bert hardcodes F32 for the ALiBi bias, so weights must match.
        let vb = VarBuilder::from_buffered_safetensors(model_bytes, DType::F32, device)
            .map_err(|e| EmbeddingError::ModelLoad(format!("Failed to create VarBuilder: {}", e)))?;

        BertModel::new(vb, &model_config)
            .map_err(|e| EmbeddingError::ModelLoad(format!("Failed to create BertModel: {}", e)))
    }

    fn embed_tokens(&self, token_ids: Vec<u32>) -> Result<Vec<f32>, EmbeddingError> {
        let len = token_ids.len();
        let input = Tensor::from_vec(token_ids, len, &self.device)
            .map_err(|e| EmbeddingError::TensorCreation(format!("Failed to create tensor: {}", e)))?
            .unsqueeze(0)
            .map_err(|e| EmbeddingError::TensorCreation(format!("Failed to unsqueeze: {}", e)))?;

        // [1, seq_len] -> [1, seq_len, hidden_size]
        let hidden = self
            .model
            .forward(&input)
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Forward pass failed: {}", e)))?;

        let (_n_sentence, n_tokens, _hidden_size) = hidden
            .dims3()
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to get dims: {}", e)))?;

        // [1, seq_len, hidden_size] -> [hidden_size]
        let mut pooled = hidden
            .sum(1)
            .and_then(|t| t.affine(1.0 / n_tokens as f64, 0.0))
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Mean pooling failed: {}", e)))?;

        super::l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

impl Embedder for JinaBertEmbedder {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn embedding_dim(&self) -> usize {
        self.config.hidden_size
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!("Encoding batch of {} texts", texts.len());
        texts
            .iter()
            .map(|text| {
                let tokens = self.tokenizer.tokenize(text)?;
                self.embed_tokens(tokens)
            })
            .collect()
    }
}
