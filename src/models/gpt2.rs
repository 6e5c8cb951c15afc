//! GPT-2 text-generation pipeline on candle.
//!
//! The decoder is small enough to express directly with `candle_nn`
//! building blocks; weights load from the stock `model.safetensors`.

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Embedding, LayerNorm, VarBuilder};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use serde::Deserialize;
use std::path::Path;
use tokenizers::Tokenizer;

use super::TextGenerator;
use crate::config::GenerationConfig;
use crate::error::{InnovationError, Result};

/// Subset of the Hugging Face `config.json` needed to build the decoder
#[derive(Debug, Clone, Deserialize)]
pub struct Gpt2Config {
    pub vocab_size: usize,
    pub n_positions: usize,
    pub n_embd: usize,
    pub n_layer: usize,
    pub n_head: usize,
    #[serde(default = "default_layer_norm_epsilon")]
    pub layer_norm_epsilon: f64,
    #[serde(default)]
    pub eos_token_id: Option<u32>,
}

fn default_layer_norm_epsilon() -> f64 {
    1e-5
}

/// GPT-2 stores its projections as Conv1D: weight is [in, out]
#[derive(Debug, Clone)]
struct Conv1D {
    weight: Tensor,
    bias: Tensor,
}

impl Conv1D {
    fn load(in_dim: usize, out_dim: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let weight = vb.get((in_dim, out_dim), "weight")?;
        let bias = vb.get(out_dim, "bias")?;
        Ok(Self { weight, bias })
    }
}

impl Module for Conv1D {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        xs.broadcast_matmul(&self.weight)?.broadcast_add(&self.bias)
    }
}

#[derive(Debug, Clone)]
struct Attention {
    c_attn: Conv1D,
    c_proj: Conv1D,
    n_head: usize,
    head_dim: usize,
}

impl Attention {
    fn load(cfg: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            c_attn: Conv1D::load(cfg.n_embd, 3 * cfg.n_embd, vb.pp("c_attn"))?,
            c_proj: Conv1D::load(cfg.n_embd, cfg.n_embd, vb.pp("c_proj"))?,
            n_head: cfg.n_head,
            head_dim: cfg.n_embd / cfg.n_head,
        })
    }

    /// `cache` holds keys and values of earlier positions and is extended in place
    fn forward(
        &self,
        xs: &Tensor,
        mask: Option<&Tensor>,
        cache: &mut Option<(Tensor, Tensor)>,
    ) -> candle_core::Result<Tensor> {
        let (b, t, c) = xs.dims3()?;
        let qkv = self.c_attn.forward(xs)?;
        let split = |offset: usize| -> candle_core::Result<Tensor> {
            qkv.narrow(2, offset, c)?
                .reshape((b, t, self.n_head, self.head_dim))?
                .transpose(1, 2)?
                .contiguous()
        };
        let q = split(0)?;
        let mut k = split(c)?;
        let mut v = split(2 * c)?;
        if let Some((prev_k, prev_v)) = cache.as_ref() {
            k = Tensor::cat(&[prev_k, &k], 2)?;
            v = Tensor::cat(&[prev_v, &v], 2)?;
        }
        *cache = Some((k.clone(), v.clone()));

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let att = (q.matmul(&k.t()?)? * scale)?;
        let att = match mask {
            Some(mask) => att.broadcast_add(mask)?,
            None => att,
        };
        let att = candle_nn::ops::softmax_last_dim(&att)?;
        let ys = att.matmul(&v)?.transpose(1, 2)?.reshape((b, t, c))?;
        self.c_proj.forward(&ys)
    }
}

#[derive(Debug, Clone)]
struct Mlp {
    c_fc: Conv1D,
    c_proj: Conv1D,
}

impl Mlp {
    fn load(cfg: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            c_fc: Conv1D::load(cfg.n_embd, 4 * cfg.n_embd, vb.pp("c_fc"))?,
            c_proj: Conv1D::load(4 * cfg.n_embd, cfg.n_embd, vb.pp("c_proj"))?,
        })
    }
}

impl Module for Mlp {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        // gelu() is the tanh approximation GPT-2 was trained with
        self.c_proj.forward(&self.c_fc.forward(xs)?.gelu()?)
    }
}

#[derive(Debug, Clone)]
struct Block {
    ln_1: LayerNorm,
    attn: Attention,
    ln_2: LayerNorm,
    mlp: Mlp,
}

impl Block {
    fn load(cfg: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            ln_1: candle_nn::layer_norm(cfg.n_embd, cfg.layer_norm_epsilon, vb.pp("ln_1"))?,
            attn: Attention::load(cfg, vb.pp("attn"))?,
            ln_2: candle_nn::layer_norm(cfg.n_embd, cfg.layer_norm_epsilon, vb.pp("ln_2"))?,
            mlp: Mlp::load(cfg, vb.pp("mlp"))?,
        })
    }

    fn forward(
        &self,
        xs: &Tensor,
        mask: Option<&Tensor>,
        cache: &mut Option<(Tensor, Tensor)>,
    ) -> candle_core::Result<Tensor> {
        let xs = (xs + self.attn.forward(&self.ln_1.forward(xs)?, mask, cache)?)?;
        &xs + self.mlp.forward(&self.ln_2.forward(&xs)?)?
    }
}

/// Per-layer keys and values for one decoding run
#[derive(Debug, Clone, Default)]
pub struct KvCache {
    layers: Vec<Option<(Tensor, Tensor)>>,
}

impl KvCache {
    pub fn new(n_layer: usize) -> Self {
        Self {
            layers: vec![None; n_layer],
        }
    }

    /// Number of positions already processed
    pub fn len(&self) -> usize {
        self.layers
            .first()
            .and_then(|l| l.as_ref())
            .map(|(k, _)| k.dim(2).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoder-only transformer with the LM head tied to the token embedding
#[derive(Debug, Clone)]
pub struct Gpt2Model {
    wte: Embedding,
    wpe: Embedding,
    blocks: Vec<Block>,
    ln_f: LayerNorm,
    n_positions: usize,
    device: Device,
}

impl Gpt2Model {
    pub fn load(cfg: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        // LM-head re-exports nest the decoder under "transformer."; the stock checkpoint does not
        let vb = if vb.contains_tensor("transformer.wte.weight") {
            vb.pp("transformer")
        } else {
            vb
        };
        let wte = candle_nn::embedding(cfg.vocab_size, cfg.n_embd, vb.pp("wte"))?;
        let wpe = candle_nn::embedding(cfg.n_positions, cfg.n_embd, vb.pp("wpe"))?;
        let blocks = (0..cfg.n_layer)
            .map(|i| Block::load(cfg, vb.pp(format!("h.{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let ln_f = candle_nn::layer_norm(cfg.n_embd, cfg.layer_norm_epsilon, vb.pp("ln_f"))?;
        Ok(Self {
            wte,
            wpe,
            blocks,
            ln_f,
            n_positions: cfg.n_positions,
            device: vb.device().clone(),
        })
    }

    pub fn new_cache(&self) -> KvCache {
        KvCache::new(self.blocks.len())
    }

    /// Logits for the token following `input_ids` ([1, t]).
    ///
    /// `input_ids` continue the sequence already held in `cache`; after the
    /// prompt only the newest token needs to be fed.
    pub fn next_token_logits(
        &self,
        input_ids: &Tensor,
        cache: &mut KvCache,
    ) -> candle_core::Result<Tensor> {
        let (_b, t) = input_ids.dims2()?;
        let offset = cache.len();
        if offset + t > self.n_positions {
            candle_core::bail!(
                "sequence of {} tokens exceeds the {} model positions",
                offset + t,
                self.n_positions
            );
        }
        let positions =
            Tensor::arange(offset as u32, (offset + t) as u32, &self.device)?.unsqueeze(0)?;
        let mut xs = self
            .wte
            .forward(input_ids)?
            .broadcast_add(&self.wpe.forward(&positions)?)?;
        let mask = if t > 1 {
            Some(causal_mask(t, offset, &self.device)?)
        } else {
            None
        };
        for (block, layer_cache) in self.blocks.iter().zip(cache.layers.iter_mut()) {
            xs = block.forward(&xs, mask.as_ref(), layer_cache)?;
        }
        let last = self.ln_f.forward(&xs)?.narrow(1, t - 1, 1)?.squeeze(1)?;
        last.matmul(&self.wte.embeddings().t()?)?.squeeze(0)
    }

    /// Sample a continuation of `prompt_ids`; the result includes the prompt.
    ///
    /// Stops at `params.max_length` total tokens (capped by the model's
    /// positions) or when `eos` is sampled.
    pub fn sample(
        &self,
        prompt_ids: &[u32],
        params: &GenerationConfig,
        seed: u64,
        eos: Option<u32>,
    ) -> candle_core::Result<Vec<u32>> {
        if prompt_ids.is_empty() {
            candle_core::bail!("cannot sample from an empty prompt");
        }
        let sampling = if params.top_k > 0 {
            Sampling::TopKThenTopP {
                k: params.top_k,
                p: params.top_p,
                temperature: params.temperature,
            }
        } else {
            Sampling::TopP {
                p: params.top_p,
                temperature: params.temperature,
            }
        };
        let mut processor = LogitsProcessor::from_sampling(seed, sampling);
        let limit = params.max_length.min(self.n_positions);
        let mut tokens = prompt_ids.to_vec();
        let mut cache = self.new_cache();
        let mut fed = 0;
        while tokens.len() < limit {
            let input = Tensor::new(&tokens[fed..], &self.device)?.unsqueeze(0)?;
            fed = tokens.len();
            let logits = self
                .next_token_logits(&input, &mut cache)?
                .to_dtype(DType::F32)?;
            let next = processor.sample(&logits)?;
            if Some(next) == eos {
                break;
            }
            tokens.push(next);
        }
        Ok(tokens)
    }
}

/// Additive mask for `t` new queries attending to `offset + t` keys
fn causal_mask(t: usize, offset: usize, device: &Device) -> candle_core::Result<Tensor> {
    let width = offset + t;
    let mask: Vec<f32> = (0..t)
        .flat_map(|i| {
            (0..width).map(move |j| if j > i + offset { f32::NEG_INFINITY } else { 0.0 })
        })
        .collect();
    Tensor::from_slice(&mask, (t, width), device)
}

/// Tokenizer + decoder, invoked like a text-generation pipeline
pub struct Gpt2Pipeline {
    model: Gpt2Model,
    tokenizer: Tokenizer,
    config: Gpt2Config,
    name: String,
}

impl Gpt2Pipeline {
    /// Build from a directory holding config.json, tokenizer.json and model.safetensors
    pub fn from_files(
        name: impl Into<String>,
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
        device: &Device,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let config_str =
            std::fs::read_to_string(config_path).context("Failed to read config.json")?;
        let config: Gpt2Config =
            serde_json::from_str(&config_str).context("Failed to parse config.json")?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)?
        };
        let model = Gpt2Model::load(&config, vb)?;

        Ok(Self {
            model,
            tokenizer,
            config,
            name: name.into(),
        })
    }
}

impl TextGenerator for Gpt2Pipeline {
    fn generate(&self, prompt: &str, params: &GenerationConfig, seed: u64) -> Result<Vec<String>> {
        let encoding = self
            .tokenizer
            .encode(prompt, false)
            .map_err(|e| generation_error(format!("Tokenization failed: {e}")))?;
        let prompt_ids = encoding.get_ids();
        if prompt_ids.is_empty() {
            return Err(generation_error("prompt produced no tokens"));
        }
        tracing::debug!(
            "Generating with {} (prompt_tokens={}, max_length={})",
            self.name,
            prompt_ids.len(),
            params.max_length
        );

        (0..params.num_return_sequences)
            .map(|i| {
                let tokens = self
                    .model
                    .sample(
                        prompt_ids,
                        params,
                        seed.wrapping_add(i as u64),
                        self.config.eos_token_id,
                    )
                    .map_err(|e| generation_error(e.to_string()))?;
                self.tokenizer
                    .decode(&tokens, true)
                    .map_err(|e| generation_error(format!("Decoding failed: {e}")))
            })
            .collect()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn generation_error(message: impl Into<String>) -> InnovationError {
    InnovationError::Generation {
        message: message.into(),
    }
}
