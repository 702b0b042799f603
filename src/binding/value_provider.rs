//! Value Providers
//!
//! Sources of raw request values, looked up by field name.

use http::{HeaderMap, Uri};
use std::collections::HashMap;

/// Values found for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueProviderResult {
    values: Vec<String>,
}

impl ValueProviderResult {
    /// No value was supplied.
    pub fn none() -> Self {
        Self::default()
    }

    /// Result holding the given values.
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Whether no value was supplied.
    pub fn is_none(&self) -> bool {
        self.values.is_empty()
    }

    /// The first supplied value.
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// All supplied values.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Number of supplied values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value was supplied.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<&str> for ValueProviderResult {
    fn from(value: &str) -> Self {
        Self::new(vec![value.to_string()])
    }
}

/// Request value source.
pub trait ValueProvider: Send + Sync {
    /// Values for `key`; [`ValueProviderResult::none`] when the key is missing.
    fn get_value(&self, key: &str) -> ValueProviderResult;

    /// Whether any value exists under `key`.
    fn contains_prefix(&self, key: &str) -> bool {
        !self.get_value(key).is_none()
    }
}

/// Query string values. Key lookup is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct QueryValueProvider {
    pairs: Vec<(String, String)>,
}

impl QueryValueProvider {
    /// Parse a form-urlencoded query string, with or without a leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Self { pairs }
    }

    /// Parse the query of a request URI.
    pub fn from_uri(uri: &Uri) -> Self {
        Self::parse(uri.query().unwrap_or_default())
    }
}

impl ValueProvider for QueryValueProvider {
    fn get_value(&self, key: &str) -> ValueProviderResult {
        ValueProviderResult::new(
            self.pairs
                .iter()
                .filter(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, value)| value.clone())
                .collect(),
        )
    }
}

/// Request header values.
#[derive(Debug, Clone, Default)]
pub struct HeaderValueProvider {
    headers: HeaderMap,
}

impl HeaderValueProvider {
    /// Create provider over request headers.
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }
}

impl ValueProvider for HeaderValueProvider {
    fn get_value(&self, key: &str) -> ValueProviderResult {
        // Non-ASCII header values cannot carry a token; they are skipped.
        ValueProviderResult::new(
            self.headers
                .get_all(key)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .map(str::to_string)
                .collect(),
        )
    }
}

/// Route template values.
#[derive(Debug, Clone, Default)]
pub struct RouteValueProvider {
    values: HashMap<String, String>,
}

impl RouteValueProvider {
    /// Create empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route value.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteValueProvider {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |provider, (name, value)| provider.with_value(name, value))
    }
}

impl ValueProvider for RouteValueProvider {
    fn get_value(&self, key: &str) -> ValueProviderResult {
        match self.values.get(&key.to_ascii_lowercase()) {
            Some(value) => ValueProviderResult::from(value.as_str()),
            None => ValueProviderResult::none(),
        }
    }
}

/// Providers consulted in order; the first with a value wins.
#[derive(Default)]
pub struct CompositeValueProvider {
    providers: Vec<Box<dyn ValueProvider>>,
}

impl CompositeValueProvider {
    /// Create empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider.
    pub fn with_provider(mut self, provider: impl ValueProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Route, then query, then header values of a request.
    pub fn from_request<B>(request: &http::Request<B>, route: RouteValueProvider) -> Self {
        Self::new()
            .with_provider(route)
            .with_provider(QueryValueProvider::from_uri(request.uri()))
            .with_provider(HeaderValueProvider::new(request.headers().clone()))
    }
}

impl ValueProvider for CompositeValueProvider {
    fn get_value(&self, key: &str) -> ValueProviderResult {
        self.providers
            .iter()
            .map(|provider| provider.get_value(key))
            .find(|result| !result.is_none())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for CompositeValueProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeValueProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}
