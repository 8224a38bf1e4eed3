use url::Url;

use crate::parameters::Parameters;

/// A URI split into its base (scheme, authority, path) and query parameters.
///
/// Composes authorization redirects and parses callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    base: Url,
    parameters: Parameters,
}

impl UrlParts {
    /// Combines a base URI with query parameters.
    pub fn new(base: Url, parameters: Parameters) -> Self {
        Self { base, parameters }
    }

    /// Appends `parameters` to the query of `base`.
    pub fn compose(base: Url, parameters: Parameters) -> Url {
        Self::new(base, parameters).build()
    }

    /// Parses a URI string, see [`UrlParts::from_url`].
    pub fn parse(uri: &str) -> Result<Self, url::ParseError> {
        Url::parse(uri).map(|url| Self::from_url(&url))
    }

    /// Splits a URI into base and query parameters.
    ///
    /// The fragment is dropped. When a parameter is repeated, its first value wins.
    pub fn from_url(url: &Url) -> Self {
        let mut parameters = Parameters::new();
        for (name, value) in url.query_pairs() {
            if !parameters.contains(&name) {
                parameters.insert(name, value);
            }
        }

        let mut base = url.clone();
        base.set_query(None);
        base.set_fragment(None);

        Self { base, parameters }
    }

    /// The path component.
    pub fn path(&self) -> &str {
        self.base.path()
    }

    /// The base URI, without query nor fragment.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The query parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Builds the full URI, appending the parameters to any query the base already has.
    pub fn build(&self) -> Url {
        let mut url = self.base.clone();
        if !self.parameters.is_empty() {
            url.query_pairs_mut().extend_pairs(self.parameters.iter());
        }
        url
    }
}
