use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (`mailto:`, `data:` and friends), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// The set of URLs eligible for mirroring: everything on the start URL's host
///
/// Hosts are compared case-insensitively and the effective port (explicit or
/// scheme default) must match, so `http://example.com` and
/// `http://example.com:8080` are different sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostScope {
    host: String,
    port: Option<u16>,
}

impl HostScope {
    /// Builds the scope for a start URL, or None if the URL has no host
    pub fn new(start: &Url) -> Option<Self> {
        let host = extract_domain(start)?;
        Some(Self {
            host,
            port: start.port_or_known_default(),
        })
    }

    /// Returns the lowercase host this scope covers
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns true if `url` lives on the same host as the start URL
    pub fn contains(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => {
                host.eq_ignore_ascii_case(&self.host) && url.port_or_known_default() == self.port
            }
            None => false,
        }
    }
}

/// Returns the directory name a mirror of `start` is written under
///
/// This is the lowercase host, with `_<port>` appended when the URL carries an
/// explicit non-default port.
pub fn root_dir_name(start: &Url) -> Option<String> {
    let host = extract_domain(start)?;
    Some(match start.port() {
        Some(port) => format!("{}_{}", host, port),
        None => host,
    })
}
