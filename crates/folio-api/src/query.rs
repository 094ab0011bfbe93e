// List query parameters.
//
// The backend's filter convention (Ransack-style `q[...]` keys plus
// `page`/`per_page`) is forwarded verbatim; this builder only names the
// keys the console actually uses.

/// Query parameters for list endpoints.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pairs: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// `page=` — 1-based page number.
    pub fn page(mut self, page: u32) -> Self {
        self.pairs.push(("page".into(), page.to_string()));
        self
    }

    /// `per_page=` — page size.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.pairs.push(("per_page".into(), per_page.to_string()));
        self
    }

    /// `q[name_cont]=` — substring match on the name column.
    pub fn name_contains(mut self, needle: &str) -> Self {
        self.pairs.push(("q[name_cont]".into(), needle.to_owned()));
        self
    }

    /// `q[publish_eq]=` — exact match on the publish flag.
    pub fn publish_eq(mut self, published: bool) -> Self {
        self.pairs
            .push(("q[publish_eq]".into(), published.to_string()));
        self
    }

    /// `q[s]=` — sort expression, e.g. `"name asc"`.
    pub fn sort(mut self, expr: &str) -> Self {
        self.pairs.push(("q[s]".into(), expr.to_owned()));
        self
    }

    /// `search=` — free-text term used by the autocomplete endpoints.
    pub fn search(mut self, term: &str) -> Self {
        self.pairs.push(("search".into(), term.to_owned()));
        self
    }

    /// Any other key, forwarded as-is.
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.pairs.push((key.to_owned(), value.to_owned()));
        self
    }

    /// The accumulated pairs, in insertion order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ransack_keys() {
        let q = ListQuery::new()
            .page(2)
            .per_page(10)
            .name_contains("dune")
            .publish_eq(true)
            .sort("name asc");
        let pairs = q.pairs();
        assert_eq!(pairs[0], ("page".into(), "2".into()));
        assert_eq!(pairs[2], ("q[name_cont]".into(), "dune".into()));
        assert_eq!(pairs[3], ("q[publish_eq]".into(), "true".into()));
        assert_eq!(pairs[4], ("q[s]".into(), "name asc".into()));
    }
}
