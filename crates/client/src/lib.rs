//! People API client.
//!
//! Requests human intervention from a remote service: post Queries, answer
//! them with Responses, rate the answers, and move money in and out with
//! Deposits and Transfers.
//!
//! Every call fetches the server's schema and dispatches one blocking HTTP
//! request. No state is kept between calls; results are raw JSON.
//!
//! ```no_run
//! use people_client::{ClientConfig, PeopleClient, QueryOptions};
//!
//! let config = ClientConfig::default().with_credentials("alice", "secret");
//! let client = PeopleClient::new(config)?;
//! let query = client.queries().create("Is this a cat?", &QueryOptions::default())?;
//! println!("posted {}", query["id"]);
//! # Ok::<(), people_client::ClientError>(())
//! ```

mod client;
mod config;
mod error;
mod resources;
mod schema;

pub use client::{Auth, Params, PeopleClient};
pub use config::{ClientConfig, Credentials, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use error::{ClientError, ClientResult};
pub use resources::{
    Attributes, Deposits, ObjectRef, Queries, QueryOptions, Ratings, Responses, Transfers, Users,
    ANY_RESPONSE,
};
pub use schema::{Field, Link, Location, Schema};
