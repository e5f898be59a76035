//! Text embedding providers for semantic matching.
//!
//! The engine only needs `embed(texts) -> vectors`. Providers are built once
//! at startup and shared behind an `Arc`.

use crate::config::EmbeddingConfig;
use crate::model::EmbeddingError;
use fxhash::hash64;
use serde_json::{Value, json};
use std::time::Duration;

pub trait EmbeddingProvider: Send + Sync {
    /// One vector per input text, in input order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Cosine similarity; 0.0 for empty, zero-norm or differently sized vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub(crate) fn l2_normalize_in_place(v: &mut [f32]) {
    let norm = v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm > 0.0 {
        let inv = 1.0 / norm as f32;
        for x in v.iter_mut() {
            *x *= inv;
        }
    }
}

/// Offline embedder: hashed character trigrams, L2-normalized.
///
/// Deterministic and dependency-free at runtime. Similar spellings land
/// close together, which is enough to rank retailer listings when no model
/// endpoint is available.
pub struct NgramHashEmbedder {
    dimensions: usize,
}

impl NgramHashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimensions];
        let padded: Vec<char> = format!("  {}  ", text.to_lowercase()).chars().collect();
        for gram in padded.windows(3) {
            let key: String = gram.iter().collect();
            let slot = (hash64(key.as_bytes()) % self.dimensions as u64) as usize;
            v[slot] += 1.0;
        }
        l2_normalize_in_place(&mut v);
        v
    }
}

impl EmbeddingProvider for NgramHashEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Remote embeddings over HTTP (OpenAI / Hugging Face style endpoints).
///
/// Uses the blocking reqwest client, so call it from a blocking thread
/// (the orchestrator runs matching under `spawn_blocking`).
pub struct ApiEmbedder {
    url: String,
    auth_header: Option<String>,
    model: Option<String>,
    timeout: Duration,
}

impl ApiEmbedder {
    pub fn from_config(cfg: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let url = cfg
            .api_url
            .clone()
            .ok_or_else(|| EmbeddingError::NotConfigured("api_url is missing".into()))?;
        Ok(Self {
            url,
            auth_header: cfg.api_auth_header.clone(),
            model: cfg.api_model.clone(),
            timeout: Duration::from_secs(cfg.timeout_seconds),
        })
    }
}

impl EmbeddingProvider for ApiEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        // The client lives only for this call so it is never dropped on an async worker.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let mut payload = json!({ "input": texts });
        if let Some(model) = &self.model {
            payload["model"] = json!(model);
        }

        let mut request = client.post(&self.url).json(&payload);
        if let Some(auth) = &self.auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        let response = request
            .send()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(EmbeddingError::Request(format!(
                "status {}",
                response.status()
            )));
        }
        let body: Value = response
            .json()
            .map_err(|e| EmbeddingError::Response(e.to_string()))?;

        let vectors = parse_embeddings(body)?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

/// Accepts `{"data":[{"embedding":[..]}]}`, `{"embeddings":[[..]]}` or a bare array.
fn parse_embeddings(value: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_collection(embeddings);
            }
            if let Some(Value::Array(items)) = map.remove("data") {
                return items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(mut obj) => obj
                            .remove("embedding")
                            .ok_or_else(|| {
                                EmbeddingError::Response("missing `embedding` in data item".into())
                            })
                            .and_then(parse_vector),
                        _ => Err(EmbeddingError::Response(
                            "unexpected entry inside `data`".into(),
                        )),
                    })
                    .collect();
            }
            Err(EmbeddingError::Response("unsupported response shape".into()))
        }
        other => parse_collection(other),
    }
}

fn parse_collection(value: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    match value {
        Value::Array(items) if items.iter().all(|i| matches!(i, Value::Array(_))) => {
            items.into_iter().map(parse_vector).collect()
        }
        other => parse_vector(other).map(|v| vec![v]),
    }
}

fn parse_vector(value: Value) -> Result<Vec<f32>, EmbeddingError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| {
                entry
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| EmbeddingError::Response(format!("non-numeric value {entry}")))
            })
            .collect(),
        other => Err(EmbeddingError::Response(format!(
            "embedding must be an array, got {other}"
        ))),
    }
}
