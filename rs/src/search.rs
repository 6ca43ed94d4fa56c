//! Semantic matching of free-text role descriptions to employees
//!
//! The pipeline only depends on the [`SemanticMatcher`] contract. [`SearchEngine`]
//! implements it with FastEmbed-rs over a persisted [`EmployeeIndex`] of
//! profile embeddings, using the all-MiniLM-L6-v2 sentence transformer.

use crate::constants::EMBEDDING_MODEL_NAME;
use crate::models::{Employee, EmployeeId};
use anyhow::{Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// An employee matched to a free-text query
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    pub employee_id: EmployeeId,

    /// Similarity between the query and the employee profile, higher is closer
    pub relevance: f64,
}

impl SemanticMatch {
    pub fn new(employee_id: impl Into<EmployeeId>, relevance: f64) -> Self {
        Self {
            employee_id: employee_id.into(),
            relevance,
        }
    }
}

/// Nearest-neighbour text matching over employee profiles
#[async_trait::async_trait]
pub trait SemanticMatcher: Send + Sync {
    /// Up to `k` employees most relevant to `text`, best first
    async fn search(&self, text: &str, k: usize) -> Result<Vec<SemanticMatch>>;
}

/// One indexed employee profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub employee_id: EmployeeId,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Persisted embeddings of every employee profile
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmployeeIndex {
    /// Model the embeddings were produced with
    pub model: String,
    pub entries: Vec<IndexEntry>,
}

impl EmployeeIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the embeddings came from the model queries are embedded with
    pub fn matches_model(&self) -> bool {
        self.is_empty() || self.model == EMBEDDING_MODEL_NAME
    }

    /// Rank entries by cosine similarity to an embedded query
    ///
    /// Entries whose dimension differs from the query are left out. Ties keep
    /// index order.
    pub fn nearest(&self, query_embedding: &[f32], k: usize) -> Vec<SemanticMatch> {
        let (comparable, skipped): (Vec<&IndexEntry>, Vec<&IndexEntry>) = self
            .entries
            .iter()
            .partition(|entry| entry.embedding.len() == query_embedding.len());
        if !skipped.is_empty() {
            tracing::warn!(
                "Skipped {} of {} index entries without {}-dimensional embeddings; rebuild with `teammate build-index`",
                skipped.len(),
                self.entries.len(),
                query_embedding.len()
            );
        }

        let mut matches: Vec<SemanticMatch> = comparable
            .into_iter()
            .map(|entry| SemanticMatch {
                employee_id: entry.employee_id.clone(),
                relevance: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        matches.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        matches.truncate(k);
        matches
    }
}

/// Semantic search engine
///
/// Wraps FastEmbed-rs to embed employee profiles and queries.
/// Thread-safe and async-ready.
pub struct SearchEngine {
    /// The embedding model (wrapped for thread safety)
    model: Arc<RwLock<Option<TextEmbedding>>>,

    /// Profiles searched by [`SemanticMatcher::search`]
    index: EmployeeIndex,
}

impl SearchEngine {
    /// Create a new search engine over an index
    ///
    /// The model will be loaded lazily on first use to optimize startup time.
    pub fn new(index: EmployeeIndex) -> Self {
        if !index.matches_model() {
            tracing::warn!(
                "Employee index was built with {:?} but queries use {:?}; rebuild with `teammate build-index`",
                index.model,
                EMBEDDING_MODEL_NAME
            );
        }
        Self {
            model: Arc::new(RwLock::new(None)),
            index,
        }
    }

    pub fn index(&self) -> &EmployeeIndex {
        &self.index
    }

    /// Initialize the embedding model
    ///
    /// This is called automatically on first embedding, but can be called explicitly
    /// to control when the model loading happens (e.g., during startup).
    pub async fn initialize(&self) -> Result<()> {
        let mut model_guard = self.model.write().await;

        if model_guard.is_none() {
            tracing::info!("Loading FastEmbed model: {}", EMBEDDING_MODEL_NAME);
            let start = std::time::Instant::now();

            let model = TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(true),
            )
            .context("Failed to initialize FastEmbed model")?;

            tracing::info!("Model loaded in {:?}", start.elapsed());

            *model_guard = Some(model);
        }

        Ok(())
    }

    /// Embed a batch of texts
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.initialize().await?;

        let mut model_guard = self.model.write().await;
        let model = model_guard
            .as_mut()
            .context("Embedding model is not loaded")?;

        model
            .embed(texts, None)
            .context("Failed to generate embeddings")
    }

    /// Get embedding for a single text
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .context("Failed to generate embedding")
    }

    /// Embed every employee profile into a fresh index
    pub async fn build_index(&self, employees: &[Employee]) -> Result<EmployeeIndex> {
        let texts: Vec<String> = employees.iter().map(Employee::profile_text).collect();
        if texts.is_empty() {
            return Ok(EmployeeIndex {
                model: EMBEDDING_MODEL_NAME.to_string(),
                entries: Vec::new(),
            });
        }

        tracing::info!("Embedding {} employee profiles", texts.len());
        let start = std::time::Instant::now();
        let embeddings = self.embed_batch(texts.clone()).await?;
        tracing::info!("Embedded profiles in {:?}", start.elapsed());

        let entries = employees
            .iter()
            .zip(texts)
            .zip(embeddings)
            .map(|((employee, text), embedding)| IndexEntry {
                employee_id: employee.id.clone(),
                text,
                embedding,
            })
            .collect();

        Ok(EmployeeIndex {
            model: EMBEDDING_MODEL_NAME.to_string(),
            entries,
        })
    }
}

#[async_trait::async_trait]
impl SemanticMatcher for SearchEngine {
    async fn search(&self, text: &str, k: usize) -> Result<Vec<SemanticMatch>> {
        // Nothing to rank, so avoid loading the model
        if self.index.is_empty() || k == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embed_text(text).await?;
        let matches = self.index.nearest(&query_embedding, k);
        tracing::debug!("Semantic search {:?} matched {} employees", text, matches.len());
        Ok(matches)
    }
}

/// Calculate cosine similarity between two embeddings
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Embeddings must have the same length");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot_product / (norm_a * norm_b)) as f64
    }
}
