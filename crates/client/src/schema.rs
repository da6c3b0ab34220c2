//! Core JSON schema documents.
//!
//! The server describes its API as a tree of named nodes whose leaves are
//! links (`"_type": "link"`). A link is addressed by its key path, e.g.
//! `["attributes", "read"]`. Keys starting with `_` are metadata.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// A fetched schema document.
#[derive(Debug, Clone)]
pub struct Schema {
    url: Url,
    title: Option<String>,
    root: serde_json::Map<String, Value>,
}

/// A single remote action.
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    /// Absolute or schema-relative URL, may contain `{field}` templates
    pub url: String,
    /// Lowercase HTTP method
    #[serde(default = "default_action")]
    pub action: String,
    /// Request body encoding; empty means JSON
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_action() -> String {
    "get".to_string()
}

/// A parameter accepted by a link.
#[derive(Debug, Clone, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub location: String,
}

/// Where a field's value goes in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Path,
    Query,
    Form,
    Body,
    /// Not given: query for GET/DELETE, form otherwise
    Unspecified,
}

impl Field {
    pub fn location(&self) -> Location {
        match self.location.as_str() {
            "path" => Location::Path,
            "query" => Location::Query,
            "form" | "formData" => Location::Form,
            "body" => Location::Body,
            _ => Location::Unspecified,
        }
    }
}

impl Link {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_form_encoded(&self) -> bool {
        self.encoding == "application/x-www-form-urlencoded"
    }
}

impl Schema {
    /// Decode a schema document fetched from `url`.
    pub fn parse(url: Url, body: &str) -> ClientResult<Self> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| ClientError::Parse(format!("Schema is not valid JSON: {}", e)))?;
        Self::from_value(url, value)
    }

    pub fn from_value(url: Url, value: Value) -> ClientResult<Self> {
        let Value::Object(root) = value else {
            return Err(ClientError::Parse("Schema document must be a JSON object".into()));
        };

        if let Some(kind) = root.get("_type").and_then(Value::as_str) {
            if kind != "document" {
                return Err(ClientError::Parse(format!("Expected a document, got '{}'", kind)));
            }
        }

        let meta = root.get("_meta");
        let url = match meta.and_then(|m| m["url"].as_str()) {
            Some(meta_url) => url
                .join(meta_url)
                .map_err(|e| ClientError::Url(format!("{}: {}", meta_url, e)))?,
            None => url,
        };
        let title = meta.and_then(|m| m["title"].as_str()).map(String::from);

        Ok(Self { url, title, root })
    }

    /// URL that relative link URLs resolve against.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Look up the link at `keys`.
    pub fn link(&self, keys: &[&str]) -> ClientResult<Link> {
        let path = keys.join(".");
        let mut node = &self.root;

        let Some((last, parents)) = keys.split_last() else {
            return Err(ClientError::Schema("Empty link path".into()));
        };

        for key in parents {
            node = match node.get(*key) {
                Some(Value::Object(child)) if !key.starts_with('_') => child,
                _ => {
                    return Err(ClientError::Schema(format!(
                        "No such resource '{}' (looking up {})",
                        key, path,
                    )))
                }
            };
        }

        let leaf = node
            .get(*last)
            .filter(|v| v.get("_type").and_then(Value::as_str) == Some("link"))
            .ok_or_else(|| ClientError::Schema(format!("No such action '{}'", path)))?;

        Link::deserialize(leaf)
            .map_err(|e| ClientError::Parse(format!("Malformed link {}: {}", path, e)))
    }

    /// Key paths of every link in the document, sorted by key.
    pub fn link_paths(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        collect_links(&self.root, &mut Vec::new(), &mut out);
        out
    }
}

fn collect_links(
    node: &serde_json::Map<String, Value>,
    prefix: &mut Vec<String>,
    out: &mut Vec<Vec<String>>,
) {
    for (key, child) in node {
        if key.starts_with('_') {
            continue;
        }
        let Value::Object(obj) = child else { continue };
        prefix.push(key.clone());
        if obj.get("_type").and_then(Value::as_str) == Some("link") {
            out.push(prefix.clone());
        } else {
            collect_links(obj, prefix, out);
        }
        prefix.pop();
    }
}
