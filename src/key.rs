//! Rate limit key construction.

/// Identity under which one independent rate budget is tracked.
///
/// A key pairs a client identity (API key, remote address) with the resource
/// being limited (route, endpoint group). Two requests share a budget exactly
/// when their keys compare equal. Keys are immutable once constructed; how
/// they are derived from a request is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    /// Who is making the request.
    pub client: String,
    /// What they are requesting.
    pub resource: String,
}

impl RateLimitKey {
    /// Create a new key from a client identity and a resource.
    pub fn new(client: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            resource: resource.into(),
        }
    }
}

impl std::fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.client, self.resource)
    }
}
