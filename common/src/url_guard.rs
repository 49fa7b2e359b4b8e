//! SSRF guard shared by every component that fetches a user-supplied URL
//! (content extraction, link discovery). Rejects anything that isn't a
//! plain public HTTP(S) endpoint.

use std::net::IpAddr;

use tracing::warn;
use url::Url;

use crate::error::AppError;

/// Returns the sanitized host (non-alphanumerics replaced with `_`) on
/// success, or `AppError::Validation` if the URL targets a disallowed
/// scheme or network range.
pub fn ensure_url_allowed(url: &Url) -> Result<String, AppError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            warn!(%url, %scheme, "rejected url with unsupported scheme");
            return Err(AppError::validation("unsupported URL scheme"));
        }
    }

    let Some(host) = url.host_str() else {
        warn!(%url, "rejected url missing host");
        return Err(AppError::validation("URL is missing a host component"));
    };

    if host.eq_ignore_ascii_case("localhost") {
        warn!(%url, host, "rejected url pointing at localhost");
        return Err(AppError::validation("URL host is not allowed"));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        let is_disallowed = match ip {
            IpAddr::V4(v4) => v4.is_private() || v4.is_link_local(),
            IpAddr::V6(v6) => v6.is_unique_local() || v6.is_unicast_link_local(),
        };

        if ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || is_disallowed {
            warn!(%url, host, %ip, "rejected url pointing at a restricted network range");
            return Err(AppError::validation("URL host is not allowed"));
        }
    }

    Ok(host.replace(|c: char| !c.is_alphanumeric(), "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_scheme() {
        let url = Url::parse("ftp://example.com").expect("url");
        assert!(ensure_url_allowed(&url).is_err());
    }

    #[test]
    fn rejects_localhost_and_private_ranges() {
        assert!(ensure_url_allowed(&Url::parse("http://localhost/x").unwrap()).is_err());
        assert!(ensure_url_allowed(&Url::parse("http://192.168.1.10/x").unwrap()).is_err());
        assert!(ensure_url_allowed(&Url::parse("http://127.0.0.1/x").unwrap()).is_err());
    }

    #[test]
    fn allows_public_domain_and_sanitizes() {
        let sanitized = ensure_url_allowed(&Url::parse("https://sub.example.com/path").unwrap())
            .expect("allowed");
        assert_eq!(sanitized, "sub_example_com");
    }
}
