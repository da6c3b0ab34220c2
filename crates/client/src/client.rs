//! People API HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required).
//! Every request goes through `send`, which attaches credentials for
//! authenticated calls and maps failed responses to [`ClientError`].

use log::{debug, warn};
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::ACCEPT;
use reqwest::Method;
use serde_json::{Map, Value};
use url::Url;

use crate::config::{ClientConfig, Credentials};
use crate::error::{ClientError, ClientResult};
use crate::schema::{Link, Location, Schema};

const USER_AGENT: &str = concat!("people-client/", env!("CARGO_PKG_VERSION"));
const SCHEMA_ACCEPT: &str = "application/coreapi+json, application/json";

/// Parameter mapping for an action: name to JSON scalar.
pub type Params = Map<String, Value>;

/// Whether a request carries the configured basic-auth credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Basic,
    Anonymous,
}

/// People API client (blocking).
#[derive(Clone)]
pub struct PeopleClient {
    http: reqwest::blocking::Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

/// Link parameters sorted by destination.
#[derive(Debug, Default)]
struct EncodedParams {
    path: Vec<(String, String)>,
    query: Vec<(String, String)>,
    form: Map<String, Value>,
    body: Option<Value>,
}

impl PeopleClient {
    /// Create a client with an explicit config.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let base_url = parse_base_url(&config.base_url)?;

        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            credentials: config.credentials,
        })
    }

    /// Replace the credentials used for authenticated calls.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Fetch the schema document from `<base>/schema`.
    pub fn schema(&self, auth: Auth) -> ClientResult<Schema> {
        let url = self.endpoint("schema")?;
        debug!("fetching schema from {}", url);

        let req = self.http.get(url.clone()).header(ACCEPT, SCHEMA_ACCEPT);
        let body = self
            .send(req, auth)?
            .text()
            .map_err(|e| ClientError::Network(format!("Failed to read schema: {}", e)))?;

        Schema::parse(url, &body)
    }

    /// Fetch a fresh schema and dispatch `[resource, action]` against it.
    pub fn invoke(
        &self,
        resource: &str,
        action: &str,
        auth: Auth,
        params: Params,
    ) -> ClientResult<Value> {
        debug!("invoking {}.{}", resource, action);
        let schema = self.schema(auth)?;
        self.action(&schema, &[resource, action], auth, params)
    }

    /// Dispatch the link at `keys` in an already-fetched schema.
    pub fn action(
        &self,
        schema: &Schema,
        keys: &[&str],
        auth: Auth,
        params: Params,
    ) -> ClientResult<Value> {
        let link = schema.link(keys)?;
        let req = self.build_request(schema.url(), &link, params)?;
        decode_json(self.send(req, auth)?)
    }

    /// Plain GET of `<base>/<path>`, bypassing the schema.
    pub fn get(&self, path: &str, auth: Auth) -> ClientResult<Value> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        decode_json(self.send(self.http.get(url), auth)?)
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        let raw = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| ClientError::Url(format!("{}: {}", raw, e)))
    }

    fn build_request(
        &self,
        schema_url: &Url,
        link: &Link,
        params: Params,
    ) -> ClientResult<RequestBuilder> {
        let method = parse_method(&link.action)?;
        let encoded = encode_params(link, &method, params)?;
        let url = expand_url(schema_url, &link.url, &encoded.path, &encoded.query)?;
        debug!("{} {}", method, url);

        let mut req = self.http.request(method, url);
        if let Some(body) = encoded.body {
            req = req.json(&body);
        } else if !encoded.form.is_empty() {
            if link.is_form_encoded() {
                let pairs = encoded
                    .form
                    .iter()
                    .map(|(name, value)| -> ClientResult<(String, String)> {
                        Ok((name.clone(), scalar_text(name, value)?))
                    })
                    .collect::<ClientResult<Vec<_>>>()?;
                req = req.form(&pairs);
            } else {
                req = req.json(&Value::Object(encoded.form));
            }
        }

        Ok(req)
    }

    fn authorize(&self, req: RequestBuilder, auth: Auth) -> ClientResult<RequestBuilder> {
        match auth {
            Auth::Anonymous => Ok(req),
            Auth::Basic => {
                let creds = self.credentials.as_ref().ok_or(ClientError::NotAuthenticated)?;
                Ok(req.basic_auth(&creds.username, Some(&creds.password)))
            }
        }
    }

    fn send(&self, req: RequestBuilder, auth: Auth) -> ClientResult<Response> {
        let response = self
            .authorize(req, auth)?
            .send()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let url = response.url().clone();
            let body = error_body(response.text());
            warn!("{} returned HTTP {}", url, status);
            return Err(classify_status(status, body));
        }

        Ok(response)
    }
}

// ── Free functions ──────────────────────────────────────────────────

fn parse_base_url(raw: &str) -> ClientResult<Url> {
    let url = Url::parse(raw).map_err(|e| ClientError::Url(format!("{}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Url(format!("{}: not a base URL", raw)));
    }
    Ok(url)
}

fn parse_method(action: &str) -> ClientResult<Method> {
    let action = if action.is_empty() { "get" } else { action };
    Method::from_bytes(action.to_ascii_uppercase().as_bytes())
        .map_err(|_| ClientError::Schema(format!("Invalid link action '{}'", action)))
}

/// Body of a failed response; a read failure is reported in its place.
fn error_body<E: std::fmt::Display>(read: Result<String, E>) -> String {
    match read {
        Ok(body) => body,
        Err(e) => {
            warn!("failed to read error response body: {}", e);
            format!("<unreadable response body: {}>", e)
        }
    }
}

fn classify_status(status: u16, body: String) -> ClientError {
    match status {
        401 | 403 => ClientError::Auth { status, body },
        400 | 422 => ClientError::Validation(body),
        _ => ClientError::Http { status, body },
    }
}

/// Check `params` against the link's fields and sort them by location.
/// Null values count as absent.
fn encode_params(link: &Link, method: &Method, params: Params) -> ClientResult<EncodedParams> {
    for field in link.fields.iter().filter(|f| f.required) {
        if params.get(&field.name).map_or(true, Value::is_null) {
            return Err(ClientError::Validation(format!(
                "Missing required parameter '{}' for {}",
                field.name, link.url,
            )));
        }
    }

    let mut encoded = EncodedParams::default();
    for (name, value) in params {
        let field = link.field(&name).ok_or_else(|| {
            ClientError::Validation(format!("Unknown parameter '{}' for {}", name, link.url))
        })?;
        if value.is_null() {
            continue;
        }

        let location = match field.location() {
            Location::Unspecified if *method == Method::GET || *method == Method::DELETE => {
                Location::Query
            }
            Location::Unspecified => Location::Form,
            other => other,
        };

        match location {
            Location::Path => {
                let text = scalar_text(&name, &value)?;
                encoded.path.push((name, text));
            }
            Location::Query => {
                let text = scalar_text(&name, &value)?;
                encoded.query.push((name, text));
            }
            Location::Body => encoded.body = Some(value),
            Location::Form | Location::Unspecified => {
                encoded.form.insert(name, value);
            }
        }
    }

    if encoded.body.is_some() && !encoded.form.is_empty() {
        let form: Vec<&str> = encoded.form.keys().map(String::as_str).collect();
        return Err(ClientError::Validation(format!(
            "{} sends a whole-body parameter; cannot also send form parameters ({})",
            link.url,
            form.join(", "),
        )));
    }

    Ok(encoded)
}

/// Fill `{name}` templates, resolve against the schema URL, append query pairs.
fn expand_url(
    base: &Url,
    template: &str,
    path: &[(String, String)],
    query: &[(String, String)],
) -> ClientResult<Url> {
    let mut expanded = template.to_string();
    for (name, value) in path {
        expanded = expanded.replace(&format!("{{{}}}", name), &urlencoding::encode(value));
    }
    if let (Some(open), Some(close)) = (expanded.find('{'), expanded.find('}')) {
        if open < close {
            return Err(ClientError::Validation(format!(
                "Missing path parameter '{}' for {}",
                &expanded[open + 1..close],
                template,
            )));
        }
    }

    let mut url = base
        .join(&expanded)
        .map_err(|e| ClientError::Url(format!("{}: {}", expanded, e)))?;

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }

    Ok(url)
}

/// Render a scalar for a URL or form body.
fn scalar_text(name: &str, value: &Value) -> ClientResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ClientError::Validation(format!(
            "Parameter '{}' must be a string, number, or boolean",
            name,
        ))),
    }
}

/// Decode a JSON response body; an empty body (204 No Content) is `null`.
fn decode_json(response: Response) -> ClientResult<Value> {
    let text = response
        .text()
        .map_err(|e| ClientError::Network(format!("Failed to read response body: {}", e)))?;

    let trimmed = text.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(trimmed).map_err(|e| {
        let excerpt: String = trimmed.chars().take(200).collect();
        ClientError::Parse(format!("{} (body: {})", e, excerpt))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use serde_json::json;

    fn link(url: &str, action: &str, fields: &[(&str, bool, &str)]) -> Link {
        Link {
            url: url.into(),
            action: action.into(),
            encoding: String::new(),
            fields: fields
                .iter()
                .map(|(name, required, location)| Field {
                    name: (*name).into(),
                    required: *required,
                    location: (*location).into(),
                })
                .collect(),
            title: None,
            description: None,
        }
    }

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    fn base() -> Url {
        Url::parse("http://localhost:8000/schema").unwrap()
    }

    #[test]
    fn test_missing_required_parameter() {
        let link = link("/attributes/", "post", &[("key", true, "form"), ("value", true, "form")]);

        let err = encode_params(&link, &Method::POST, params(json!({ "key": "education" })))
            .unwrap_err();
        assert!(
            matches!(err, ClientError::Validation(ref m) if m.contains("'value'")),
            "got {:?}",
            err,
        );

        // Null does not satisfy a required field
        let err = encode_params(&link, &Method::POST, params(json!({ "key": "a", "value": null })))
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_unknown_parameter() {
        let link = link("/transfers/", "post", &[("amount", true, "form")]);
        let err = encode_params(&link, &Method::POST, params(json!({ "amount": 5, "memo": "x" })))
            .unwrap_err();
        assert!(err.to_string().contains("Unknown parameter 'memo'"), "got {}", err);
    }

    #[test]
    fn test_optional_null_is_dropped() {
        let fields = [("text", true, "form"), ("callback", false, "form")];
        let link = link("/queries/", "post", &fields);
        let encoded =
            encode_params(&link, &Method::POST, params(json!({ "text": "hi", "callback": null })))
                .unwrap();
        assert_eq!(Value::Object(encoded.form), json!({ "text": "hi" }));
    }

    #[test]
    fn test_unspecified_location_follows_method() {
        let get = link("/search/", "get", &[("q", false, "")]);
        let encoded = encode_params(&get, &Method::GET, params(json!({ "q": "cats" }))).unwrap();
        assert_eq!(encoded.query, vec![("q".to_string(), "cats".to_string())]);
        assert!(encoded.form.is_empty());

        let post = link("/search/", "post", &[("q", false, "")]);
        let encoded = encode_params(&post, &Method::POST, params(json!({ "q": "cats" }))).unwrap();
        assert!(encoded.query.is_empty());
        assert_eq!(encoded.form["q"], "cats");
    }

    #[test]
    fn test_body_location() {
        let link = link("/bulk/", "post", &[("data", true, "body")]);
        let encoded =
            encode_params(&link, &Method::POST, params(json!({ "data": [1, 2] }))).unwrap();
        assert_eq!(encoded.body, Some(json!([1, 2])));
    }

    #[test]
    fn test_body_and_form_conflict() {
        let fields = [("data", true, "body"), ("note", false, "form")];
        let conflicting = link("/bulk/", "post", &fields);

        let args = params(json!({ "data": [1], "note": "x" }));
        let err = encode_params(&conflicting, &Method::POST, args).unwrap_err();
        assert!(
            matches!(err, ClientError::Validation(ref m) if m.contains("note")),
            "got {:?}",
            err,
        );

        // Query parameters may accompany a body
        let with_query = link("/bulk/", "post", &[("data", true, "body"), ("dry", false, "query")]);
        let args = params(json!({ "data": [1], "dry": true }));
        let encoded = encode_params(&with_query, &Method::POST, args).unwrap();
        assert_eq!(encoded.query, vec![("dry".to_string(), "true".to_string())]);
    }

    #[test]
    fn test_expand_url() {
        let path = vec![("id".to_string(), "a b/c".to_string())];
        let url = expand_url(&base(), "/attributes/{id}/", &path, &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/attributes/a%20b%2Fc/");

        let query = vec![("page".to_string(), "2".to_string())];
        let url = expand_url(&base(), "/queries/", &[], &query).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/queries/?page=2");

        let url = expand_url(&base(), "https://other.example/x/", &[], &[]).unwrap();
        assert_eq!(url.host_str(), Some("other.example"));
    }

    #[test]
    fn test_expand_url_unfilled_template() {
        let err = expand_url(&base(), "/ratings/{id}/", &[], &[]).unwrap_err();
        assert!(err.to_string().contains("'id'"), "got {}", err);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text("a", &json!("x")).unwrap(), "x");
        assert_eq!(scalar_text("a", &json!(42)).unwrap(), "42");
        assert_eq!(scalar_text("a", &json!(true)).unwrap(), "true");
        assert!(scalar_text("a", &json!({ "id": 1 })).is_err());
    }

    #[test]
    fn test_classify_status() {
        let empty = String::new;
        assert!(matches!(classify_status(401, empty()), ClientError::Auth { status: 401, .. }));
        assert!(matches!(classify_status(403, empty()), ClientError::Auth { status: 403, .. }));
        assert!(matches!(
            classify_status(400, "bad".into()),
            ClientError::Validation(ref m) if m == "bad"
        ));
        assert!(matches!(classify_status(422, empty()), ClientError::Validation(_)));
        assert!(matches!(classify_status(404, empty()), ClientError::Http { status: 404, .. }));
    }

    #[test]
    fn test_error_body_reports_read_failure() {
        assert_eq!(error_body::<String>(Ok("Not found.".into())), "Not found.");

        let body = error_body(Err("connection reset"));
        assert!(body.contains("connection reset"), "body: {}", body);

        let err = classify_status(502, error_body(Err("connection reset")));
        assert!(err.to_string().contains("unreadable response body"), "message: {}", err);
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("post").unwrap(), Method::POST);
        assert_eq!(parse_method("").unwrap(), Method::GET);
        assert_eq!(parse_method("delete").unwrap(), Method::DELETE);
        assert!(parse_method("not a method").is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let err = PeopleClient::new(ClientConfig::new("not a url")).err().unwrap();
        assert!(matches!(err, ClientError::Url(_)), "got {:?}", err);

        let err = PeopleClient::new(ClientConfig::new("mailto:people@example.com")).err().unwrap();
        assert!(matches!(err, ClientError::Url(_)), "got {:?}", err);
    }

    #[test]
    fn test_client_from_in_memory_config() {
        let config = ClientConfig::new("http://localhost:8000").with_credentials("alice", "secret");
        let client = PeopleClient::new(config).unwrap();

        assert_eq!(client.base_url().as_str(), "http://localhost:8000/");
        let creds = client.credentials().unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "secret");

        let client = client.with_credentials(Credentials::new("bob", "hunter2"));
        assert_eq!(client.credentials().unwrap().username, "bob");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = PeopleClient::new(ClientConfig::new("http://localhost:8000/api/")).unwrap();
        assert_eq!(
            client.endpoint("schema").unwrap().as_str(),
            "http://localhost:8000/api/schema",
        );
    }

    #[test]
    fn test_authenticated_call_without_credentials() {
        // Fails before any request is sent, so no server is needed
        let client = PeopleClient::new(ClientConfig::new("http://127.0.0.1:9")).unwrap();
        let err = client.get("profile", Auth::Basic).unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated), "got {:?}", err);
        assert!(err.is_auth());
    }
}
