use hyper::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// An incoming HTTP request with the fields the translation needs.
/// Built by the server from the raw hyper request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeRequest {
    /// The request target as received, e.g. `/test?test-value=42`
    pub original_url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// None if the request had no body
    pub body: Option<Value>,
}

/// What the router receives: the API Gateway proxy event shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub request_context: RequestContext,
    pub headers: HashMap<String, String>,
    pub query_string_parameters: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub resource_path: String,
    pub http_method: String,
}

/// Projects the request into the event shape. Nothing is parsed or normalized here.
/// A missing body stays missing, defaults only apply on the response side.
pub fn to_event(request: &NativeRequest) -> Event {
    Event {
        request_context: RequestContext {
            resource_path: request.original_url.clone(),
            http_method: request.method.clone(),
        },
        headers: request.headers.clone(),
        query_string_parameters: request.query.clone(),
        body: request.body.clone(),
    }
}

/// Flattens the header map. Repeated headers are joined with `, `.
pub(crate) fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(headers.keys_len());

    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        match map.entry(name.as_str().to_owned()) {
            Entry::Occupied(mut entry) => {
                let joined: &mut String = entry.get_mut();
                joined.push_str(", ");
                joined.push_str(&value);
            }
            Entry::Vacant(entry) => {
                entry.insert(value.into_owned());
            }
        }
    }

    map
}

/// Decodes a query string. The last value wins for repeated keys.
pub(crate) fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

/// An empty body is no body, JSON is parsed and anything else is passed on as text.
pub(crate) fn parse_body(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }

    match serde_json::from_slice(bytes) {
        Ok(v) => Some(v),
        Err(_) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;
    use serde_json::json;

    const USER_AGENT: &str =
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/60.0.3112.101 Safari/537.36";

    fn patch_request() -> NativeRequest {
        NativeRequest {
            original_url: "http://www.example.com/test?test-value=42".to_owned(),
            method: "PATCH".to_owned(),
            headers: HashMap::from([
                ("content-type".to_owned(), "application/json".to_owned()),
                ("user-agent".to_owned(), USER_AGENT.to_owned()),
            ]),
            query: HashMap::from([("test-value".to_owned(), "42".to_owned())]),
            body: Some(json!({"a": {"b": {"c": [1, 2, 3], "d": 42}}, "e": 42})),
        }
    }

    #[test]
    fn event_mirrors_the_request() {
        let req = patch_request();

        let event = to_event(&req);

        assert_eq!(
            event,
            Event {
                request_context: RequestContext {
                    resource_path: req.original_url.clone(),
                    http_method: req.method.clone(),
                },
                headers: req.headers.clone(),
                query_string_parameters: req.query.clone(),
                body: req.body.clone(),
            }
        );
        // the request is left as it was
        assert_eq!(req, patch_request());
    }

    #[test]
    fn event_uses_proxy_field_names() {
        let event = to_event(&patch_request());

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "requestContext": {
                    "resourcePath": "http://www.example.com/test?test-value=42",
                    "httpMethod": "PATCH"
                },
                "headers": {
                    "content-type": "application/json",
                    "user-agent": USER_AGENT
                },
                "queryStringParameters": {"test-value": "42"},
                "body": {"a": {"b": {"c": [1, 2, 3], "d": 42}}, "e": 42}
            })
        );
    }

    #[test]
    fn missing_body_stays_missing() {
        let req = NativeRequest {
            original_url: "/".to_owned(),
            method: "GET".to_owned(),
            ..Default::default()
        };

        let event = to_event(&req);

        assert_eq!(event.body, None);
        assert!(serde_json::to_value(&event).unwrap().get("body").is_none());
        assert!(event.headers.is_empty());
        assert!(event.query_string_parameters.is_empty());
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.insert("x-id", HeaderValue::from_static("7"));

        let map = header_map(&headers);

        assert_eq!(map["accept"], "text/html, application/json");
        assert_eq!(map["x-id"], "7");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn query_is_decoded() {
        let query = parse_query("test-value=42&name=a%20b&flag&dup=1&dup=2");

        assert_eq!(query["test-value"], "42");
        assert_eq!(query["name"], "a b");
        assert_eq!(query["flag"], "");
        assert_eq!(query["dup"], "2");
    }

    #[test]
    fn body_parsing() {
        assert_eq!(parse_body(b""), None);
        assert_eq!(parse_body(br#"{"e":42}"#), Some(json!({"e": 42})));
        assert_eq!(parse_body(b"plain text"), Some(json!("plain text")));
    }
}
