//! Query-string builder with scalar and bracketed-array encodings.

/// Ordered list of query pairs. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// `key=value`
    pub fn scalar(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// `key=value` when `value` is present.
    pub fn scalar_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.scalar(key, v),
            None => self,
        }
    }

    /// `key[]=value` with `value` forwarded verbatim, commas included.
    pub fn array_joined(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(v) = value {
            self.pairs.push((format!("{key}[]"), v.to_string()));
        }
        self
    }

    /// `key[]=v1&key[]=v2`, one pair per comma-separated item.
    pub fn array(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(v) = value {
            let name = format!("{key}[]");
            for item in split_ids(v) {
                self.pairs.push((name.clone(), item));
            }
        }
        self
    }

    /// Replace every pair named `key` with a single `key=value`.
    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.retain(|(k, _)| k != key);
        self.scalar(key, value)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// Split a comma-separated list, trimming items and dropping empties.
pub fn split_ids(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
