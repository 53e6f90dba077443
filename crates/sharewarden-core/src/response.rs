use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SharewardenError;

/// Outcome of a folder-sharing authorization request.
///
/// The `Onetime` variants are valid for exactly one subsequent lookup and
/// are erased when that lookup happens. `Block` is a request-time value
/// only: recording it stores a machine-wide `DenyAlways` instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    AllowOnetime,
    DenyOnetime,
    AllowAlways,
    DenyAlways,
    Block,
}

impl Response {
    pub fn is_allow(&self) -> bool {
        matches!(self, Response::AllowOnetime | Response::AllowAlways)
    }

    pub fn is_onetime(&self) -> bool {
        matches!(self, Response::AllowOnetime | Response::DenyOnetime)
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Response::Block)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Response::AllowOnetime => "ALLOW_ONETIME",
            Response::DenyOnetime => "DENY_ONETIME",
            Response::AllowAlways => "ALLOW_ALWAYS",
            Response::DenyAlways => "DENY_ALWAYS",
            Response::Block => "BLOCK",
        }
    }
}

impl FromStr for Response {
    type Err = SharewardenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ALLOW_ONETIME" => Ok(Response::AllowOnetime),
            "DENY_ONETIME" => Ok(Response::DenyOnetime),
            "ALLOW_ALWAYS" => Ok(Response::AllowAlways),
            "DENY_ALWAYS" => Ok(Response::DenyAlways),
            "BLOCK" => Ok(Response::Block),
            _ => Err(SharewardenError::UnknownResponse(value.to_string())),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
