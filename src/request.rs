//! The read-only view of one inbound request.
//!
//! Parameters use the bracket convention of HTML forms, so `Post[title]=Hi`
//! is available as `{"Post": {"title": "Hi"}}` and a model's submitted values
//! can be taken as one map.

use axum::{
    body::to_bytes,
    extract::{FromRequest, OriginalUri, Request},
    http::{HeaderMap, header},
};
use serde_json::{Map, Value};

use crate::errors::ControllerError;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Query and body parameters, the AJAX indicator and the URL of one request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    query: Map<String, Value>,
    body: Map<String, Value>,
    ajax: bool,
    url: String,
}

impl RequestContext {
    /// Build a context for `url` (path and query string). Query parameters
    /// are parsed from the URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let query = url
            .split_once('?')
            .map(|(_, query)| parse_urlencoded(query.as_bytes()))
            .unwrap_or_default();
        Self {
            query,
            url,
            ..Self::default()
        }
    }

    /// Use urlencoded form data as the body
    #[must_use]
    pub fn with_form_body(mut self, body: &str) -> Self {
        self.body = parse_urlencoded(body.as_bytes());
        self
    }

    /// Use a JSON object as the body
    #[must_use]
    pub fn with_json_body(mut self, body: Map<String, Value>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub const fn with_ajax(mut self, ajax: bool) -> Self {
        self.ajax = ajax;
        self
    }

    #[must_use]
    pub fn query(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    /// Scalar query parameter
    #[must_use]
    pub fn query_str(&self, name: &str) -> Option<&str> {
        self.query.get(name).and_then(Value::as_str)
    }

    /// Nested query parameters (`name[key]=...`)
    #[must_use]
    pub fn query_map(&self, name: &str) -> Option<&Map<String, Value>> {
        self.query.get(name).and_then(Value::as_object)
    }

    #[must_use]
    pub fn body(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    #[must_use]
    pub fn body_str(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn body_map(&self, name: &str) -> Option<&Map<String, Value>> {
        self.body.get(name).and_then(Value::as_object)
    }

    /// Whether the request was sent by script (XHR or htmx)
    #[must_use]
    pub const fn is_ajax(&self) -> bool {
        self.ajax
    }

    /// Path and query of the current request
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn is_ajax_request(headers: &HeaderMap) -> bool {
    let requested_with = headers
        .get("x-requested-with")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"));
    requested_with || headers.contains_key("hx-request")
}

impl<S> FromRequest<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ControllerError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        // nested routers see a stripped path; links need the full one
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        let url = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), ToString::to_string);
        let context = Self::new(url).with_ajax(is_ajax_request(&parts.headers));

        let bytes = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| ControllerError::bad_request(format!("Could not read request body: {e}")))?;
        if bytes.is_empty() {
            return Ok(context);
        }

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if content_type.starts_with("application/json") {
            let body: Map<String, Value> = serde_json::from_slice(&bytes)
                .map_err(|e| ControllerError::bad_request(format!("Invalid JSON body: {e}")))?;
            Ok(context.with_json_body(body))
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            Ok(Self {
                body: parse_urlencoded(&bytes),
                ..context
            })
        } else {
            tracing::debug!(content_type, "Ignoring request body of unsupported type");
            Ok(context)
        }
    }
}

/// Parse `a=1&Post[title]=x&tags[]=y` into nested JSON values
#[must_use]
pub fn parse_urlencoded(input: &[u8]) -> Map<String, Value> {
    let mut params = Map::new();
    for (name, value) in url::form_urlencoded::parse(input) {
        insert_nested(&mut params, &name, Value::String(value.into_owned()));
    }
    params
}

/// Split `Post[author][name]` into `["Post", "author", "name"]` and `tags[]`
/// into `["tags", ""]`. Malformed brackets keep the whole name as one key.
fn split_param_name(name: &str) -> Vec<&str> {
    let Some(open) = name.find('[') else {
        return vec![name];
    };
    if open == 0 || !name.ends_with(']') {
        return vec![name];
    }

    let mut path = vec![&name[..open]];
    let mut rest = &name[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return vec![name];
        };
        path.push(&stripped[..close]);
        rest = &stripped[close + 1..];
    }
    if rest.is_empty() { path } else { vec![name] }
}

fn insert_nested(params: &mut Map<String, Value>, name: &str, value: Value) {
    let path = split_param_name(name);
    // `tags[]=a&tags[]=b` collects into an array under `tags`
    let (append, path) = match path.split_last() {
        Some((last, rest)) if last.is_empty() && !rest.is_empty() => (true, rest),
        _ => (false, path.as_slice()),
    };
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = params;
    for key in parents {
        let entry = current
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        // a scalar parameter of the same name wins over the nested form
        let Value::Object(map) = entry else {
            return;
        };
        current = map;
    }

    if append {
        let entry = current
            .entry((*last).to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(value);
        }
    } else {
        current.insert((*last).to_string(), value);
    }
}
