//! 嵌入向量生成
//!
//! [`EmbeddingProvider`] 抽象了特征提取；默认实现 [`BagOfWordsEmbedding`] 是
//! 归一化词频直方图，不是真正的语义嵌入，只用于无模型场景下的近似检索。

use std::collections::HashMap;

pub type Embedding = Vec<f64>;

/// 默认向量维度
pub const EMBEDDING_DIMENSIONS: usize = 100;

pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Embedding;
    fn similarity(&self, a: &[f64], b: &[f64]) -> f64 {
        cosine_similarity(a, b)
    }
}

pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn magnitude(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// 余弦相似度；任一向量为零向量时返回 0.0
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let norm_a = magnitude(a);
    let norm_b = magnitude(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot_product(a, b) / (norm_a * norm_b)
}

/// 词频直方图嵌入
///
/// 文本小写后按空白切分，按首次出现顺序取前 `dimensions` 个不同的词，
/// 第 i 维为第 i 个词的出现次数除以总词数，其余维度为 0。
#[derive(Debug, Clone)]
pub struct BagOfWordsEmbedding {
    dimensions: usize,
}

impl BagOfWordsEmbedding {
    pub fn new() -> Self {
        Self {
            dimensions: EMBEDDING_DIMENSIONS,
        }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for BagOfWordsEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for BagOfWordsEmbedding {
    fn name(&self) -> &str {
        "bag_of_words"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Embedding {
        let mut embedding = vec![0.0; self.dimensions];

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        if words.is_empty() {
            return embedding;
        }

        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &word in &words {
            let count = counts.entry(word).or_insert(0);
            if *count == 0 {
                order.push(word);
            }
            *count += 1;
        }

        let total = words.len() as f64;
        for (slot, word) in embedding.iter_mut().zip(order.iter()) {
            *slot = counts[word] as f64 / total;
        }

        embedding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = BagOfWordsEmbedding::new();
        let embedding = embedder.embed("");
        assert_eq!(embedding.len(), EMBEDDING_DIMENSIONS);
        assert!(embedding.iter().all(|v| *v == 0.0));

        let whitespace = embedder.embed("   \n\t ");
        assert!(whitespace.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_first_seen_order_frequencies() {
        let embedder = BagOfWordsEmbedding::new();
        let embedding = embedder.embed("The cat saw the dog");
        assert_eq!(embedding[0], 2.0 / 5.0);
        assert_eq!(embedding[1], 1.0 / 5.0);
        assert_eq!(embedding[2], 1.0 / 5.0);
        assert_eq!(embedding[3], 1.0 / 5.0);
        assert!(embedding[4..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_embedding_is_deterministic() {
        let embedder = BagOfWordsEmbedding::new();
        let text = "to be or not to be that is the question whether tis nobler";
        let a = embedder.embed(text);
        let b = embedder.embed(text);
        assert_eq!(
            a.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            b.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_only_first_hundred_unique_words() {
        let embedder = BagOfWordsEmbedding::new();
        let text: Vec<String> = (0..150).map(|i| format!("w{}", i)).collect();
        let embedding = embedder.embed(&text.join(" "));
        assert_eq!(embedding.len(), EMBEDDING_DIMENSIONS);
        assert!(embedding.iter().all(|v| (*v - 1.0 / 150.0).abs() < 1e-12));
    }

    #[test]
    fn test_zero_vector_similarity_is_zero() {
        let embedder = BagOfWordsEmbedding::new();
        let zero = embedder.embed("");
        let other = embedder.embed("hello world");
        assert_eq!(cosine_similarity(&zero, &other), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
        assert_eq!(embedder.similarity(&other, &zero), 0.0);
    }

    #[test]
    fn test_identical_text_similarity_is_one() {
        let embedder = BagOfWordsEmbedding::new();
        let a = embedder.embed("I love pizza");
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_dimensions() {
        let embedder = BagOfWordsEmbedding::with_dimensions(2);
        assert_eq!(embedder.embed("a b c").len(), 2);
        assert_eq!(embedder.dimensions(), 2);
        assert_eq!(embedder.name(), "bag_of_words");
    }
}
