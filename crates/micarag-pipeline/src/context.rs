use micarag_core::types::Candidate;

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Citation tag the generator is asked to reproduce.
pub fn source_tag(c: &Candidate) -> String {
    format!("[SOURCE: {} | chunk {}]", c.chunk.title, c.chunk.chunk_id)
}

/// Grounding text for the generator: one tagged block per candidate, in
/// the given order.
pub fn assemble(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .map(|c| format!("{}\n{}", source_tag(c), c.chunk.text))
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}
