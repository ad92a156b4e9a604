//! Policy-domain keyword detection.

/// Flags queries that touch company policy.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    /// Build from the configured keyword list. Blank entries are ignored.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True iff at least one keyword occurs in `query`, ignoring case.
    pub fn classify(&self, query: &str) -> bool {
        let lowered = query.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}
