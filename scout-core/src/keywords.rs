//! Query keyword extraction

use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "his", "how", "its", "may", "new", "now", "old", "see", "two",
    "who", "did", "get", "let", "put", "say", "she", "too", "use", "what", "when", "where",
    "which", "while", "with", "from", "this", "that", "these", "those", "there", "their",
    "them", "then", "than", "have", "been", "being", "into", "about", "also", "does", "some",
    "such", "only", "over", "very", "just", "should", "would", "could", "will", "shall",
    "show", "find", "look", "give", "tell", "me", "please", "file", "files",
];

/// Tokenize a free-text query into search keywords.
///
/// Splits on anything that is not a word character or `-`, lower-cases,
/// drops tokens of two characters or fewer and stop words, and keeps the
/// first occurrence of each token.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .map(|token| token.trim_matches('-'))
        .filter(|token| token.chars().count() > 2)
        .filter(|token| !STOP_WORDS.contains(token))
        .filter(|token| seen.insert(token.to_string()))
        .map(ToString::to_string)
        .collect()
}

/// Whitespace-separated query words longer than three characters, lower-cased
/// and deduplicated. These feed the secondary text-overlap term.
pub fn query_words(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 3)
        .filter(|w| seen.insert(w.to_string()))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_lowercase_keywords_in_order() {
        let keywords = extract_keywords("Find the Docker configuration for the API gateway");
        assert_eq!(keywords, vec!["docker", "configuration", "api", "gateway"]);
    }

    #[test]
    fn keeps_hyphenated_tokens() {
        let keywords = extract_keywords("docker-compose setup, docker-compose!");
        assert_eq!(keywords, vec!["docker-compose", "setup"]);
    }

    #[test]
    fn drops_short_tokens_and_stop_words() {
        assert!(extract_keywords("is it on a ci by me").is_empty());
        assert_eq!(extract_keywords("how is auth done"), vec!["auth", "done"]);
    }

    #[test]
    fn extraction_is_pure() {
        let q = "Kubernetes deployment manifests and Helm charts";
        assert_eq!(extract_keywords(q), extract_keywords(q));
    }

    #[test]
    fn query_words_require_more_than_three_chars() {
        assert_eq!(
            query_words("Docker config for the app, docker!"),
            vec!["docker", "config"]
        );
    }
}
