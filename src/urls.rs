use url::Url;

use crate::config::CrudAction;

/// Builds the URL of a controller action
pub trait UrlBuilder: Send + Sync {
    fn build_url(&self, action: CrudAction, params: &[(&str, &str)]) -> String;
}

/// Default [`UrlBuilder`]: `<base>/<action>?<urlencoded params>`
#[derive(Debug, Clone)]
pub struct RouteUrls {
    base: String,
}

impl RouteUrls {
    /// `base` is the path the controller router is nested under, e.g. `/posts`
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }
}

impl UrlBuilder for RouteUrls {
    fn build_url(&self, action: CrudAction, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}/{action}", self.base);
        if !params.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

/// Which return URL an item link carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnTo<'u> {
    /// No return parameter
    Omit,
    /// Come back to the page the link is rendered on
    #[default]
    CurrentPage,
    Url(&'u str),
}

// Any fixed base works: only the origin of the resolved URL is compared
const RELATIVE_BASE: &str = "http://relative.invalid/";

/// Whether a user-supplied return URL may be redirected to.
///
/// Relative paths must stay on the current origin (`/posts`, `edit?id=1`),
/// which rules out scheme-relative (`//evil.test`) and backslash tricks
/// (`/\evil.test`). Absolute URLs are accepted only when their origin is
/// listed in `allowed_origins`.
#[must_use]
pub fn is_allowed_return_url(candidate: &str, allowed_origins: &[String]) -> bool {
    if candidate.is_empty() || candidate.chars().any(char::is_control) {
        return false;
    }

    if let Ok(absolute) = Url::parse(candidate) {
        let origin = absolute.origin();
        return origin.is_tuple()
            && allowed_origins.iter().any(|allowed| {
                Url::parse(allowed).is_ok_and(|allowed| allowed.origin() == origin)
            });
    }

    let Ok(base) = Url::parse(RELATIVE_BASE) else {
        return false;
    };
    base.join(candidate)
        .is_ok_and(|resolved| resolved.origin() == base.origin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_without_params() {
        let urls = RouteUrls::new("/posts/");
        assert_eq!(urls.build_url(CrudAction::List, &[]), "/posts/list");
    }

    #[test]
    fn test_build_url_encodes_params() {
        let urls = RouteUrls::new("/posts");
        let url = urls.build_url(
            CrudAction::Edit,
            &[("id", "7"), ("returnUrl", "/posts/list?Post[title]=a b")],
        );
        assert_eq!(
            url,
            "/posts/edit?id=7&returnUrl=%2Fposts%2Flist%3FPost%5Btitle%5D%3Da+b"
        );
    }

    #[test]
    fn test_relative_paths_allowed() {
        assert!(is_allowed_return_url("/posts/list?page=2", &[]));
        assert!(is_allowed_return_url("list", &[]));
        assert!(is_allowed_return_url("../dashboard", &[]));
    }

    #[test]
    fn test_offsite_urls_rejected() {
        for candidate in [
            "https://evil.test/phish",
            "//evil.test/phish",
            "/\\evil.test",
            "javascript:alert(1)",
            "",
            "/posts\r\nSet-Cookie: x=1",
        ] {
            assert!(!is_allowed_return_url(candidate, &[]), "{candidate}");
        }
    }

    #[test]
    fn test_allow_listed_origin() {
        let allowed = vec!["https://admin.example.com".to_string()];
        assert!(is_allowed_return_url("https://admin.example.com/posts", &allowed));
        assert!(!is_allowed_return_url("https://admin.example.com.evil.test/", &allowed));
        assert!(!is_allowed_return_url("http://admin.example.com/posts", &allowed));
    }
}
