use std::collections::HashSet;

use micarag_core::traits::Reranker;

/// Share of distinct query words that occur in the passage. A stand-in for
/// the cross-encoder in tests and on machines without model files.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalReranker;

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl Reranker for LexicalReranker {
    fn score(&self, query: &str, passages: &[&str]) -> micarag_core::Result<Vec<f32>> {
        let query_words = words(query);
        if query_words.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }
        Ok(passages
            .iter()
            .map(|p| {
                let passage_words = words(p);
                let hits = query_words.iter().filter(|w| passage_words.contains(*w)).count();
                hits as f32 / query_words.len() as f32
            })
            .collect())
    }
}
