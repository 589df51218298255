use serde::{Deserialize, Serialize};

/// A single position-addressed edit against a document's content.
///
/// Positions and lengths are character offsets. They are signed on the wire so that
/// out-of-range values from clients can be clamped rather than rejected.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    Insert {
        position: i64,
        #[serde(default)]
        text: String,
    },
    Delete {
        position: i64,
        #[serde(default)]
        length: i64,
    },
    /// Any tag this server does not know about
    #[serde(other)]
    Unsupported,
}

impl Operation {
    pub fn insert(position: i64, text: impl Into<String>) -> Self {
        Operation::Insert { position, text: text.into() }
    }

    #[cfg(test)]
    pub fn delete(position: i64, length: i64) -> Self {
        Operation::Delete { position, length }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Operation::Unsupported)
    }
}
