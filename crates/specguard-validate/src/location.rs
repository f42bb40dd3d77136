//! Request input locations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five parts of an incoming request that can carry a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Headers,
    Body,
    Query,
    Params,
    Cookies,
}

impl Location {
    /// All locations in validation order.
    pub const ALL: [Location; 5] = [
        Location::Headers,
        Location::Body,
        Location::Query,
        Location::Params,
        Location::Cookies,
    ];

    /// The lowercase name used in error records (`"body"`, `"query"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Headers => "headers",
            Location::Body => "body",
            Location::Query => "query",
            Location::Params => "params",
            Location::Cookies => "cookies",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
