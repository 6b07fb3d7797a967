use crate::error::EngineError;
use url::Url;

/// Path segment the server's REST root lives under.
pub const SERVICE_ROOT: &str = "artifactory";

fn invalid(url: &str, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidUrl {
        url: url.to_string(),
        reason: reason.into(),
    }
}

/// Cut `input` back to `<scheme>://<host>[/<prefix>]/artifactory/`.
///
/// Query and fragment are dropped. Applying it twice gives the same result.
pub fn sanitize_url(input: &str) -> Result<String, EngineError> {
    let mut url = Url::parse(input.trim()).map_err(|e| invalid(input, e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid(input, "missing host"));
    }

    let segments: Vec<String> = url
        .path_segments()
        .ok_or_else(|| invalid(input, "URL cannot carry a path"))?
        .map(str::to_string)
        .collect();
    let marker = segments
        .iter()
        .position(|s| s == SERVICE_ROOT)
        .ok_or_else(|| invalid(input, format!("path does not contain '/{}'", SERVICE_ROOT)))?;

    let mut path = String::from("/");
    for segment in &segments[..marker] {
        if !segment.is_empty() {
            path.push_str(segment);
            path.push('/');
        }
    }
    path.push_str(SERVICE_ROOT);
    path.push('/');

    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn truncates_after_marker() {
        assert_eq!(
            sanitize_url("https://host/artifactory/sub/path").unwrap(),
            "https://host/artifactory/"
        );
        assert_eq!(
            sanitize_url("https://host/artifactory").unwrap(),
            "https://host/artifactory/"
        );
        assert_eq!(
            sanitize_url("http://host:8081/ctx/artifactory/api/repositories?x=1#top").unwrap(),
            "http://host:8081/ctx/artifactory/"
        );
    }

    #[test]
    fn rejects_missing_marker_scheme_or_host() {
        for input in [
            "https://host/no-marker",
            "https://host/artifactoryx/",
            "host/artifactory/",
            "file:///artifactory/",
            "mailto:user@artifactory",
            "",
        ] {
            assert!(
                matches!(sanitize_url(input), Err(EngineError::InvalidUrl { .. })),
                "{input}"
            );
        }
    }

    proptest! {
        #[test]
        fn idempotent(
            scheme in prop_oneof![Just("http"), Just("https")],
            host in "[a-z]{1,8}(\\.[a-z]{2,3})?",
            prefix in proptest::collection::vec("[a-z0-9-]{1,6}", 0..3),
            suffix in proptest::collection::vec("[a-z0-9_-]{1,6}", 0..3),
        ) {
            let mut path = prefix.clone();
            path.push(SERVICE_ROOT.to_string());
            path.extend(suffix);
            let input = format!("{}://{}/{}", scheme, host, path.join("/"));

            let once = sanitize_url(&input).unwrap();
            prop_assert!(once.ends_with("/artifactory/"));
            prop_assert_eq!(sanitize_url(&once).unwrap(), once);
        }
    }
}
