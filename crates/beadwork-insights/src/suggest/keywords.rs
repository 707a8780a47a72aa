use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};

/// Tokens excluded from keyword extraction.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was",
        "one", "our", "out", "has", "have", "this", "that", "with", "from", "they", "will",
        "would", "there", "their", "what", "when", "where", "which", "while", "about",
        "should", "could", "into", "more", "some", "than", "then", "them", "these", "those",
        "been", "being", "does", "doing", "during", "each", "other", "over", "under",
        "very", "also", "just", "only", "because", "after", "before", "between", "both",
        "its", "it's", "any", "how", "why", "who", "whom", "such", "same", "too", "own",
        "add", "fix", "use", "new", "make", "need", "needs", "support", "update", "allow",
    ]
    .into_iter()
    .collect()
});

/// Minimum token length retained.
const MIN_TOKEN_LEN: usize = 3;

/// Lowercase, strip non-word characters, drop stop words and short
/// tokens, deduplicate.
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    let mut keywords = BTreeSet::new();
    for token in lowered.split(|c: char| !c.is_alphanumeric() && c != '_') {
        if token.len() < MIN_TOKEN_LEN || STOP_WORDS.contains(token) {
            continue;
        }
        keywords.insert(token.to_string());
    }
    keywords
}

/// Keywords from the fields duplicate detection compares.
pub fn issue_keywords(issue: &beadwork_core::Issue) -> BTreeSet<String> {
    let mut keywords = extract_keywords(&issue.title);
    keywords.extend(extract_keywords(&issue.description));
    keywords
}
