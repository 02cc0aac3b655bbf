use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur while validating the API base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a non-local host would send the bearer token in cleartext.
    #[error("Insecure base URL: HTTPS required (except localhost)")]
    Insecure,
    /// The URL carries a query or fragment, which endpoint paths cannot be appended to.
    #[error("Base URL must not contain a query or fragment")]
    HasQuery,
}

/// Validates the base URL every API request is built on.
///
/// HTTPS is required. Plain HTTP is accepted only for loopback hosts
/// (`localhost`, `127.0.0.1`, `::1`) so a development server or a test mock
/// can be used without leaking the bearer token over the network.
///
/// # Examples
///
/// ```
/// use taskflow::util::validate_base_url;
///
/// assert!(validate_base_url("https://api.example.com").is_ok());
/// assert!(validate_base_url("http://localhost:8080").is_ok());
/// assert!(validate_base_url("http://api.example.com").is_err());
/// assert!(validate_base_url("ftp://example.com").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlValidationError::HasQuery);
    }

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback_host(&url) => {
            tracing::debug!(base_url = %url, "Using plain HTTP base URL (loopback only)");
            Ok(url)
        }
        "http" => Err(UrlValidationError::Insecure),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

fn is_loopback_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    host_for_parse
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_accepted() {
        let url = validate_base_url("https://api.example.com").unwrap();
        assert_eq!(url.host_str(), Some("api.example.com"));
        assert!(validate_base_url("https://api.example.com:8443/v1/").is_ok());
    }

    #[test]
    fn test_loopback_http_accepted() {
        assert!(validate_base_url("http://localhost:8080").is_ok());
        assert!(validate_base_url("http://127.0.0.1:3000").is_ok());
        assert!(validate_base_url("http://[::1]:3000").is_ok());
    }

    #[test]
    fn test_remote_http_rejected() {
        assert!(matches!(
            validate_base_url("http://api.example.com"),
            Err(UrlValidationError::Insecure)
        ));
        assert!(matches!(
            validate_base_url("http://192.168.1.10:8080"),
            Err(UrlValidationError::Insecure)
        ));
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_base_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_base_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_unparsable_rejected() {
        assert!(matches!(
            validate_base_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_query_rejected() {
        assert!(matches!(
            validate_base_url("https://api.example.com/?x=1"),
            Err(UrlValidationError::HasQuery)
        ));
    }
}
