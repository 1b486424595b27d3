use axum::http::{HeaderMap, Method};

use crate::config::ApiConfig;

/// Structural view of an inbound request. Built once per call, discarded
/// after dispatch. No semantic validation happens here; membership and
/// permission checks live in the resolver and gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRequest {
    /// First path segment after the base path. `None` when the path is bare.
    pub resource: Option<String>,
    /// Second path segment, when present.
    pub action_from_url: Option<String>,
    /// Value of the reserved action query parameter, when present.
    pub action_from_query: Option<String>,
    pub verb: Method,
    pub auth_token: Option<String>,
}

pub fn classify(
    method: &Method,
    path: &str,
    query: Option<&str>,
    headers: &HeaderMap,
    cfg: &ApiConfig,
) -> ClassifiedRequest {
    let mut trimmed = path.trim_matches('/');

    // Strip the configured base path prefix, if any
    let base = cfg.base_path.trim_matches('/');
    if !base.is_empty() {
        if trimmed == base {
            trimmed = "";
        } else if let Some(rest) = trimmed.strip_prefix(base) {
            trimmed = rest.strip_prefix('/').unwrap_or(trimmed);
        }
    }

    let mut segments = trimmed.split('/').filter(|s| !s.is_empty());
    let resource = segments.next().map(str::to_string);
    let action_from_url = segments.next().map(str::to_string);

    let action_from_query = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(name, _)| name == cfg.action_param.as_str())
            .map(|(_, value)| value.into_owned())
    });

    let auth_token = headers
        .get(cfg.auth_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    ClassifiedRequest {
        resource,
        action_from_url,
        action_from_query,
        verb: method.clone(),
        auth_token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn cfg() -> ApiConfig {
        AppConfig::from_env().api
    }

    #[test]
    fn splits_resource_and_action() {
        let headers = HeaderMap::new();
        let req = classify(&Method::GET, "/users/activate", Some("id=5"), &headers, &cfg());
        assert_eq!(req.resource.as_deref(), Some("users"));
        assert_eq!(req.action_from_url.as_deref(), Some("activate"));
        assert_eq!(req.action_from_query, None);
        assert_eq!(req.verb, Method::GET);
    }

    #[test]
    fn reads_action_query_parameter() {
        let headers = HeaderMap::new();
        let req = classify(
            &Method::GET,
            "/users",
            Some("action=verify&id=5"),
            &headers,
            &cfg(),
        );
        assert_eq!(req.action_from_url, None);
        assert_eq!(req.action_from_query.as_deref(), Some("verify"));
    }

    #[test]
    fn empty_path_has_no_resource() {
        let headers = HeaderMap::new();
        let req = classify(&Method::GET, "/", None, &headers, &cfg());
        assert_eq!(req.resource, None);
        assert_eq!(req.action_from_url, None);
    }

    #[test]
    fn strips_base_path() {
        let mut config = cfg();
        config.base_path = "api".into();
        let headers = HeaderMap::new();

        let req = classify(&Method::GET, "/api/users/delete", None, &headers, &config);
        assert_eq!(req.resource.as_deref(), Some("users"));
        assert_eq!(req.action_from_url.as_deref(), Some("delete"));

        let bare = classify(&Method::GET, "/api", None, &headers, &config);
        assert_eq!(bare.resource, None);
    }

    #[test]
    fn extracts_auth_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-API-KEY", "secret-1".parse().unwrap());
        let req = classify(&Method::POST, "/users", None, &headers, &cfg());
        assert_eq!(req.auth_token.as_deref(), Some("secret-1"));
    }
}
