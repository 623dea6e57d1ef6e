//! Submission validation, including the image-URL SSRF defenses named in
//! spec.md §4.5: scheme allowlist, no RFC1918/loopback/link-local targets.

use domain_model::event::DisasterType;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("latitude/longitude out of range")]
    InvalidCoordinate,
    #[error("disaster type is not recognized")]
    UnrecognizedType,
    #[error("image_url scheme must be http or https")]
    ImageUrlSchemeNotAllowed,
    #[error("image_url resolves to a private, loopback, or link-local address")]
    ImageUrlTargetsPrivateNetwork,
    #[error("image_url is not a valid URL")]
    ImageUrlMalformed,
    #[error("description exceeds maximum length")]
    DescriptionTooLong,
}

pub const MAX_DESCRIPTION_LEN: usize = 5_000;

pub fn validate_coordinate(lat: f64, lon: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinate)
    }
}

pub fn validate_disaster_type(raw: &str) -> Result<DisasterType, ValidationError> {
    match raw {
        "wildfire" => Ok(DisasterType::Wildfire),
        "earthquake" => Ok(DisasterType::Earthquake),
        "flood" => Ok(DisasterType::Flood),
        "hurricane" => Ok(DisasterType::Hurricane),
        "tornado" => Ok(DisasterType::Tornado),
        "volcano" => Ok(DisasterType::Volcano),
        "drought" => Ok(DisasterType::Drought),
        "weather_alert" => Ok(DisasterType::WeatherAlert),
        "other" => Ok(DisasterType::Other),
        _ => Err(ValidationError::UnrecognizedType),
    }
}

pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.len() > MAX_DESCRIPTION_LEN {
        Err(ValidationError::DescriptionTooLong)
    } else {
        Ok(())
    }
}

/// SSRF defenses on the submitted image URL: only http(s), host must parse
/// as a public IP literal or be a hostname (left to DNS — we cannot resolve
/// synchronously here, so hostname-form URLs are accepted and the HTTP
/// client is expected to enforce no-redirect-to-private-IP at fetch time).
/// IP-literal hosts are checked directly against RFC1918/loopback/link-local
/// ranges.
pub fn validate_image_url(raw: &str) -> Result<(), ValidationError> {
    let url = url_parse(raw).ok_or(ValidationError::ImageUrlMalformed)?;

    if url.scheme != "http" && url.scheme != "https" {
        return Err(ValidationError::ImageUrlSchemeNotAllowed);
    }

    if let Ok(ip) = url.host.parse::<IpAddr>() {
        if is_private_or_local(ip) {
            return Err(ValidationError::ImageUrlTargetsPrivateNetwork);
        }
    }

    Ok(())
}

fn is_private_or_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

struct ParsedUrl {
    scheme: String,
    host: String,
}

/// Minimal scheme://host[:port][/path] parser. Not a general-purpose URL
/// parser — it only needs to pull out scheme and host for the SSRF check.
/// Bracketed IPv6 hosts (`[::1]:8080`) are unwrapped before any `:port`
/// splitting, so the literal's own colons aren't mistaken for a port
/// separator.
fn url_parse(raw: &str) -> Option<ParsedUrl> {
    let (scheme, rest) = raw.split_once("://")?;
    let host_and_rest = rest.split(['/', '?', '#']).next().unwrap_or(rest);

    let host = if let Some(bracketed) = host_and_rest.strip_prefix('[') {
        let (ipv6, _) = bracketed.split_once(']')?;
        ipv6.to_string()
    } else {
        host_and_rest.rsplit_once(':').map(|(h, _)| h).unwrap_or(host_and_rest).to_string()
    };

    if host.is_empty() {
        return None;
    }
    Some(ParsedUrl {
        scheme: scheme.to_lowercase(),
        host,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_scheme() {
        assert_eq!(validate_image_url("file:///etc/passwd"), Err(ValidationError::ImageUrlSchemeNotAllowed));
    }

    #[test]
    fn rejects_loopback_ip_literal() {
        assert_eq!(
            validate_image_url("http://127.0.0.1/image.png"),
            Err(ValidationError::ImageUrlTargetsPrivateNetwork)
        );
    }

    #[test]
    fn rejects_bracketed_ipv6_loopback() {
        assert_eq!(
            validate_image_url("http://[::1]/image.png"),
            Err(ValidationError::ImageUrlTargetsPrivateNetwork)
        );
    }

    #[test]
    fn rejects_bracketed_ipv6_loopback_with_port() {
        assert_eq!(
            validate_image_url("http://[::1]:8080/image.png"),
            Err(ValidationError::ImageUrlTargetsPrivateNetwork)
        );
    }

    #[test]
    fn rejects_rfc1918_ip_literal() {
        assert_eq!(
            validate_image_url("http://10.0.0.5/image.png"),
            Err(ValidationError::ImageUrlTargetsPrivateNetwork)
        );
    }

    #[test]
    fn accepts_public_https_url() {
        assert!(validate_image_url("https://images.example.com/photo.jpg").is_ok());
    }

    #[test]
    fn accepts_public_ip_literal() {
        assert!(validate_image_url("http://8.8.8.8/image.png").is_ok());
    }
}
