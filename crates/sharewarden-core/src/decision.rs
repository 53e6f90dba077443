use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::response::Response;

/// One recorded authorization: `source` may (or may not) access `folder`
/// on `target`, with the durability carried by `response`.
///
/// Decisions are never edited in place; a changed authorization is a new
/// `Decision` replacing the old one in the matrix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub source: String,
    pub target: String,
    pub folder: PathBuf,
    pub response: Response,
}

impl Decision {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        folder: impl Into<PathBuf>,
        response: Response,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            folder: folder.into(),
            response,
        }
    }
}
