//! Request data extraction
//!
//! Flattens the parts of an HTTP exchange the audit payload needs into plain
//! string maps.

use axum::extract::Query;
use http::{header::CONTENT_TYPE, HeaderMap, Uri};
use std::collections::BTreeMap;

/// Request headers, multiple values joined with `,`
pub fn headers(map: &HeaderMap) -> BTreeMap<String, String> {
    map.keys()
        .map(|name| {
            let value = map
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            (name.as_str().to_string(), value)
        })
        .collect()
}

/// Query parameters, multiple values for one name joined with `,`
///
/// A query string that cannot be decoded yields no parameters.
pub fn query_params(uri: &Uri) -> BTreeMap<String, String> {
    let pairs = match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(pairs)) => pairs,
        Err(e) => {
            tracing::debug!("Ignoring undecodable query string {:?}: {}", uri.query(), e);
            return BTreeMap::new();
        }
    };

    let mut params: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in pairs {
        params
            .entry(name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    params
}

/// Path below the context path the service is mounted at
///
/// `/case-api/case/1` under `/case-api` is `/case/1`. Paths outside the
/// context path are returned unchanged.
pub fn request_path<'a>(path: &'a str, context_path: &str) -> &'a str {
    let context_path = context_path.trim_end_matches('/');
    if context_path.is_empty() {
        return path;
    }

    match path.strip_prefix(context_path) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Decode a captured body using the `charset` of its `Content-Type`
///
/// UTF-8 is assumed when no charset is declared. Latin-1 and ASCII bodies
/// are decoded byte for byte; anything else is decoded lossily as UTF-8.
pub fn decode_body(bytes: &[u8], headers: &HeaderMap) -> String {
    match charset(headers).as_deref() {
        None | Some("utf-8") | Some("utf8") => String::from_utf8_lossy(bytes).into_owned(),
        Some("iso-8859-1") | Some("latin1") | Some("us-ascii") => {
            bytes.iter().map(|&b| b as char).collect()
        }
        Some(other) => {
            tracing::debug!("Unsupported body charset {}, decoding as UTF-8", other);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn charset(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_headers_join_multiple_values() {
        let mut map = HeaderMap::new();
        map.append("test-header", HeaderValue::from_static("some-value"));
        map.append("accept", HeaderValue::from_static("application/json"));
        map.append("accept", HeaderValue::from_static("text/plain"));

        let headers = headers(&map);
        assert_eq!(headers["test-header"], "some-value");
        assert_eq!(headers["accept"], "application/json,text/plain");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_query_params() {
        let uri: Uri = "/case/1234/details?param1=abc&tag=a&tag=b&empty=".parse().unwrap();
        let params = query_params(&uri);

        assert_eq!(params["param1"], "abc");
        assert_eq!(params["tag"], "a,b");
        assert_eq!(params["empty"], "");
    }

    #[test]
    fn test_query_params_are_percent_decoded() {
        let uri: Uri = "/search?name=John%20Smith&q=a%2Cb".parse().unwrap();
        let params = query_params(&uri);

        assert_eq!(params["name"], "John Smith");
        assert_eq!(params["q"], "a,b");
    }

    #[test]
    fn test_no_query_string() {
        let uri: Uri = "/case/1234/details".parse().unwrap();
        assert!(query_params(&uri).is_empty());
    }

    #[test]
    fn test_request_path_strips_context_path() {
        assert_eq!(request_path("/case-api/case/1", "/case-api"), "/case/1");
        assert_eq!(request_path("/case-api/case/1", "/case-api/"), "/case/1");
        assert_eq!(request_path("/case-api", "/case-api"), "/");
        assert_eq!(request_path("/case-apiary/x", "/case-api"), "/case-apiary/x");
        assert_eq!(request_path("/case/1", ""), "/case/1");
    }

    #[test]
    fn test_decode_body_charsets() {
        let mut headers = HeaderMap::new();
        assert_eq!(decode_body("héllo".as_bytes(), &headers), "héllo");

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=ISO-8859-1"),
        );
        assert_eq!(decode_body(&[0x68, 0xe9], &headers), "hé");

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=\"UTF-8\""),
        );
        assert_eq!(decode_body(br#"{"a":1}"#, &headers), r#"{"a":1}"#);
    }
}
