use super::{Vectorizer, VectorizerError, VectorizerResult};
use crate::projection::Embeddings;
use crate::registry::Backend;
use rayon::prelude::*;

const BAG_OF_WORDS_ID: &str = "bow";
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Feature-hashing bag-of-words embedder.
///
/// Tokens are lowercase alphanumeric runs hashed with FNV-1a into
/// `dimension` buckets; rows are L2-normalized. An empty document maps to
/// the zero vector.
#[derive(Debug, Clone)]
pub struct BagOfWordsVectorizer {
    dimension: usize,
}

impl BagOfWordsVectorizer {
    pub fn new(dimension: usize) -> VectorizerResult<Self> {
        if dimension == 0 {
            return Err(VectorizerError::Backend(
                "bag-of-words dimension must be positive".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn embed_one(&self, document: &str) -> Vec<f32> {
        let mut row = vec![0.0_f32; self.dimension];
        for token in document
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let bucket = fnv1a(&token.to_lowercase()) % self.dimension as u64;
            row[bucket as usize] += 1.0;
        }

        let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|v| *v /= norm);
        }
        row
    }
}

impl Backend for BagOfWordsVectorizer {
    fn backend_id(&self) -> &str {
        BAG_OF_WORDS_ID
    }
}

impl Vectorizer for BagOfWordsVectorizer {
    fn embed(&self, documents: &[&str]) -> VectorizerResult<Embeddings> {
        if documents.is_empty() {
            return Ok(Embeddings::empty(self.dimension));
        }
        let rows: Vec<Vec<f32>> = documents
            .par_iter()
            .map(|document| self.embed_one(document))
            .collect();
        Ok(Embeddings::from_rows(rows)?)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}
