//! Embedding tokens into clone URLs and keeping them out of output

use url::Url;

use crate::{Error, Result};

/// Username GitLab accepts alongside a personal access token
pub const TOKEN_USERNAME: &str = "oauth2";

/// Return `url` with `oauth2:{token}` credentials for HTTP(S) git transport
pub fn authenticated_url(url: &str, token: &str) -> Result<String> {
    let mut parsed =
        Url::parse(url).map_err(|e| Error::Config(format!("Invalid clone URL {}: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "Clone URL must use http or https, got {}",
            parsed.scheme()
        )));
    }

    parsed
        .set_username(TOKEN_USERNAME)
        .and_then(|_| parsed.set_password(Some(token)))
        .map_err(|_| Error::Config(format!("Cannot add credentials to {}", url)))?;

    Ok(parsed.to_string())
}

/// Password embedded in a URL, if any
pub fn url_password(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.password().map(str::to_string))
        .filter(|p| !p.is_empty())
}

/// Replace every occurrence of each secret with `***`
pub fn redact<S: AsRef<str>>(text: &str, secrets: &[S]) -> String {
    secrets
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .fold(text.to_string(), |acc, secret| acc.replace(secret, "***"))
}
