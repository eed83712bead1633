/// How a stderr line is recorded in the job log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Error,
    Info,
}

/// Decides whether a stderr line reads as an error. Purely cosmetic: the exit code alone decides
/// whether a command succeeded.
pub trait LineClassifier: Send + Sync {
    fn classify(&self, line: &str) -> LineKind;
}

/// Flags a line as an error when its lowercase form contains any of the keywords.
#[derive(Clone, Debug)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|keyword| keyword.into().to_lowercase())
                .collect(),
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(["error", "fail"])
    }
}

impl LineClassifier for KeywordClassifier {
    fn classify(&self, line: &str) -> LineKind {
        let line = line.to_lowercase();
        if self.keywords.iter().any(|keyword| line.contains(keyword.as_str())) {
            LineKind::Error
        } else {
            LineKind::Info
        }
    }
}
