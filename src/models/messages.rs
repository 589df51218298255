use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::Operation;

/// Envelope exchanged with the browser over the websocket
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireMessage {
    /// Snapshot sent once on admission
    Init {
        content: String,
        #[serde(rename = "userId")]
        user_id: String,
        count: usize,
    },
    Operation {
        operation: Operation,
        #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    ClientCount {
        count: usize,
    },
    DocumentListUpdate,
}

impl WireMessage {
    /// Serialize once so the same payload can be fanned out to many sessions
    pub fn encode(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_uses_camel_case_fields() {
        let msg = WireMessage::Init {
            content: "abc".to_string(),
            user_id: "u1".to_string(),
            count: 2,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"init\""));
        assert!(json.contains("\"userId\":\"u1\""));
        assert!(json.contains("\"count\":2"));
    }

    #[test]
    fn client_operation_without_user_id_parses() {
        let json = r#"{"type":"operation","operation":{"type":"insert","position":3,"text":"hi"}}"#;
        let msg: WireMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            WireMessage::Operation { operation: Operation::insert(3, "hi"), user_id: None }
        );
    }

    #[test]
    fn unknown_operation_tag_parses_as_unsupported() {
        let json = r#"{"type":"operation","operation":{"type":"replace","position":0}}"#;
        let msg: WireMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            WireMessage::Operation { operation: Operation::Unsupported, .. }
        ));
    }

    #[test]
    fn delete_without_length_defaults_to_zero() {
        let op: Operation = serde_json::from_str(r#"{"type":"delete","position":4}"#).unwrap();
        assert_eq!(op, Operation::delete(4, 0));
    }

    #[test]
    fn count_and_list_update_tags() {
        let count = serde_json::to_string(&WireMessage::ClientCount { count: 3 }).unwrap();
        assert_eq!(count, r#"{"type":"clientCount","count":3}"#);
        let update = serde_json::to_string(&WireMessage::DocumentListUpdate).unwrap();
        assert_eq!(update, r#"{"type":"documentListUpdate"}"#);
    }

    #[test]
    fn unknown_message_type_is_an_error() {
        assert!(serde_json::from_str::<WireMessage>(r#"{"type":"cursor","x":1}"#).is_err());
    }
}
