//! Route parameters captured while matching a request path.

/// Ordered name/value pairs bound by `:name` and `*name` segments.
///
/// Each name is written at most once per match; later writes for a name
/// already present are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    /// Create an empty parameter store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value` unless the name is already bound.
    ///
    /// Returns `false` if the name was already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.entries.iter().any(|(k, _)| *k == name) {
            return false;
        }
        self.entries.push((name, value.into()));
        true
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v.as_str()))
    }

    /// Iterate over the parameters in the order they appear in the path.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}
