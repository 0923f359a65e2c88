//! Exact in-memory vector index.

use ndarray::{Array2, ArrayView1, Axis};
use tracing::debug;

use crate::engine::Embedder;
use crate::error::IndexError;

/// A search hit: chunk ordinal and squared Euclidean distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Brute-force index over a dense `rows x dimension` matrix.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Array2<f32>,
}

impl FlatIndex {
    /// Build from one row per chunk. Every row must have `expected_dimension` components.
    pub fn build(rows: Vec<Vec<f32>>, expected_dimension: usize) -> Result<Self, IndexError> {
        if rows.is_empty() {
            return Err(IndexError::Empty);
        }
        if let Some(row) = rows.iter().find(|r| r.len() != expected_dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: expected_dimension,
                actual: row.len(),
            });
        }

        let count = rows.len();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let vectors = Array2::from_shape_vec((count, expected_dimension), flat).map_err(|_| {
            IndexError::DimensionMismatch {
                expected: expected_dimension,
                actual: 0,
            }
        })?;

        debug!(rows = count, dimension = expected_dimension, "built flat index");
        Ok(Self { vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.nrows() == 0
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    /// The `top_k` nearest rows, ascending by distance with ties broken by lower index.
    ///
    /// `top_k` is clamped to `[1, len]`.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }

        let query = ArrayView1::from(query);
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(index, row)| {
                let diff = &row - &query;
                Neighbor {
                    index,
                    distance: diff.dot(&diff),
                }
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.index.cmp(&b.index))
        });
        neighbors.truncate(top_k.clamp(1, self.len()));
        Ok(neighbors)
    }
}

/// Embed `texts` in batches of `batch_size`, preserving order.
pub fn embed_in_batches<E: Embedder + ?Sized>(
    embedder: &E,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, IndexError> {
    let mut embeddings = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = embedder.embed(batch)?;
        if vectors.len() != batch.len() {
            return Err(IndexError::CountMismatch {
                chunks: batch.len(),
                embeddings: vectors.len(),
            });
        }
        embeddings.extend(vectors);
    }
    Ok(embeddings)
}
