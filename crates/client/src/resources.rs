//! Typed wrappers, one per remote resource.
//!
//! Each wrapper borrows the client and turns its arguments into the
//! parameter mapping the schema expects. Results are the server's JSON,
//! untouched.

use log::warn;
use serde_json::{json, Value};

use crate::client::{Auth, Params, PeopleClient};
use crate::error::{ClientError, ClientResult};

/// Response pattern that accepts any answer.
pub const ANY_RESPONSE: &str = ".*";

/// Reference to a remote object: its id, or the object as returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectRef {
    Id(String),
    Object(Value),
}

impl ObjectRef {
    /// The referenced id as a string.
    pub fn id(&self) -> ClientResult<String> {
        match self {
            ObjectRef::Id(id) => Ok(id.clone()),
            ObjectRef::Object(Value::String(id)) => Ok(id.clone()),
            ObjectRef::Object(obj) => match obj.get("id") {
                Some(Value::String(id)) => Ok(id.clone()),
                Some(Value::Number(n)) => Ok(n.to_string()),
                _ => Err(ClientError::Validation("Referenced object has no 'id'".into())),
            },
        }
    }
}

impl From<&str> for ObjectRef {
    fn from(id: &str) -> Self {
        ObjectRef::Id(id.to_string())
    }
}

impl From<String> for ObjectRef {
    fn from(id: String) -> Self {
        ObjectRef::Id(id)
    }
}

impl From<Value> for ObjectRef {
    fn from(obj: Value) -> Self {
        ObjectRef::Object(obj)
    }
}

impl From<&Value> for ObjectRef {
    fn from(obj: &Value) -> Self {
        ObjectRef::Object(obj.clone())
    }
}

/// Options for creating a query.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Pattern a response must match to be accepted
    pub regex: String,
    /// URL the response is POSTed to
    pub callback: Option<String>,
    /// Price paid per response, in cents
    pub bid: u64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            regex: ANY_RESPONSE.to_string(),
            callback: None,
            bid: 1,
        }
    }
}

impl QueryOptions {
    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = regex.into();
        self
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    pub fn with_bid(mut self, bid: u64) -> Self {
        self.bid = bid;
        self
    }
}

// ── Shared plumbing ─────────────────────────────────────────────────

#[derive(Clone, Copy)]
struct Resource<'a> {
    client: &'a PeopleClient,
    name: &'static str,
}

impl Resource<'_> {
    fn call(&self, action: &str, params: Value) -> ClientResult<Value> {
        self.client.invoke(self.name, action, Auth::Basic, into_params(params))
    }

    fn list(&self) -> ClientResult<Value> {
        self.call("list", json!({}))
    }

    fn read(&self, id: &str) -> ClientResult<Value> {
        self.call("read", json!({ "id": id }))
    }

    fn destroy(&self, id: &str) -> ClientResult<Value> {
        self.call("destroy", json!({ "id": id }))
    }
}

fn into_params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

impl PeopleClient {
    pub fn users(&self) -> Users<'_> {
        Users(Resource { client: self, name: "users" })
    }

    pub fn deposits(&self) -> Deposits<'_> {
        Deposits(Resource { client: self, name: "deposits" })
    }

    pub fn transfers(&self) -> Transfers<'_> {
        Transfers(Resource { client: self, name: "transfers" })
    }

    pub fn attributes(&self) -> Attributes<'_> {
        Attributes(Resource { client: self, name: "attributes" })
    }

    pub fn queries(&self) -> Queries<'_> {
        Queries(Resource { client: self, name: "queries" })
    }

    pub fn responses(&self) -> Responses<'_> {
        Responses(Resource { client: self, name: "responses" })
    }

    pub fn ratings(&self) -> Ratings<'_> {
        Ratings(Resource { client: self, name: "ratings" })
    }
}

// ── Users ───────────────────────────────────────────────────────────

/// Accounts: email, username, balance.
pub struct Users<'a>(Resource<'a>);

impl Users<'_> {
    /// Register a new account. Needs no credentials.
    pub fn create(&self, email: &str, username: &str, password: &str) -> ClientResult<Value> {
        let params = json!({ "email": email, "username": username, "password": password });
        self.0.client.invoke(self.0.name, "create", Auth::Anonymous, into_params(params))
    }

    /// Details of the authenticated user (`GET /profile`).
    pub fn profile(&self) -> ClientResult<Value> {
        self.0.client.get("profile", Auth::Basic)
    }
}

// ── Deposits ────────────────────────────────────────────────────────

/// Money paid into the user's account.
pub struct Deposits<'a>(Resource<'a>);

impl Deposits<'_> {
    pub fn list(&self) -> ClientResult<Value> {
        self.0.list()
    }

    pub fn read(&self, id: &str) -> ClientResult<Value> {
        self.0.read(id)
    }

    /// Charge a card. The profile must have a Stripe account registered
    /// on the server first.
    pub fn create(&self, stripe_token: &str, amount: u64) -> ClientResult<Value> {
        self.0.call("create", json!({ "stripeToken": stripe_token, "amount": amount }))
    }
}

// ── Transfers ───────────────────────────────────────────────────────

/// Money paid out of the user's account.
pub struct Transfers<'a>(Resource<'a>);

impl Transfers<'_> {
    pub fn list(&self) -> ClientResult<Value> {
        self.0.list()
    }

    pub fn read(&self, id: &str) -> ClientResult<Value> {
        self.0.read(id)
    }

    /// `amount` in cents.
    pub fn create(&self, amount: u64) -> ClientResult<Value> {
        self.0.call("create", json!({ "amount": amount }))
    }
}

// ── Attributes ──────────────────────────────────────────────────────

/// Key/value facts on a profile, e.g. `education` = `UC Berkeley`.
pub struct Attributes<'a>(Resource<'a>);

impl Attributes<'_> {
    pub fn list(&self) -> ClientResult<Value> {
        self.0.list()
    }

    pub fn read(&self, id: &str) -> ClientResult<Value> {
        self.0.read(id)
    }

    pub fn create(&self, key: &str, value: &str) -> ClientResult<Value> {
        self.0.call("create", json!({ "key": key, "value": value }))
    }

    pub fn destroy(&self, id: &str) -> ClientResult<Value> {
        self.0.destroy(id)
    }
}

// ── Queries ─────────────────────────────────────────────────────────

/// Questions posted for people to answer.
pub struct Queries<'a>(Resource<'a>);

impl Queries<'_> {
    pub fn list(&self) -> ClientResult<Value> {
        self.0.list()
    }

    pub fn read(&self, id: &str) -> ClientResult<Value> {
        self.0.read(id)
    }

    pub fn create(&self, text: &str, options: &QueryOptions) -> ClientResult<Value> {
        self.0.call("create", json!({
            "text": text,
            "regex": options.regex,
            "callback": options.callback,
            "bid": options.bid,
        }))
    }

    /// Take an unanswered query compatible with the current user.
    ///
    /// Every failure is reported as [`ClientError::NoQueries`]; the
    /// underlying error is kept as its source.
    pub fn get(&self) -> ClientResult<Value> {
        self.0.call("get", json!({})).map_err(|e| {
            warn!("queries.get failed: {}", e);
            ClientError::NoQueries(Box::new(e))
        })
    }
}

// ── Responses ───────────────────────────────────────────────────────

/// Answers to queries.
pub struct Responses<'a>(Resource<'a>);

impl Responses<'_> {
    pub fn list(&self) -> ClientResult<Value> {
        self.0.list()
    }

    pub fn read(&self, id: &str) -> ClientResult<Value> {
        self.0.read(id)
    }

    /// Answer `query`, given by id or as the query object itself.
    pub fn create(&self, text: &str, query: impl Into<ObjectRef>) -> ClientResult<Value> {
        let query = query.into().id()?;
        self.0.call("create", json!({ "text": text, "query": query }))
    }
}

// ── Ratings ─────────────────────────────────────────────────────────

/// Verdicts on responses.
pub struct Ratings<'a>(Resource<'a>);

impl Ratings<'_> {
    pub fn list(&self) -> ClientResult<Value> {
        self.0.list()
    }

    pub fn read(&self, id: &str) -> ClientResult<Value> {
        self.0.read(id)
    }

    /// Rate `response`, given by id or as the response object itself.
    pub fn create(
        &self,
        satisfactory: bool,
        response: impl Into<ObjectRef>,
    ) -> ClientResult<Value> {
        let response = response.into().id()?;
        self.0.call("create", json!({ "satisfactory": satisfactory, "response": response }))
    }

    pub fn destroy(&self, id: &str) -> ClientResult<Value> {
        self.0.destroy(id)
    }
}
