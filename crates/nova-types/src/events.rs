use serde::{Deserialize, Serialize};

/// A row that can travel through a change feed
pub trait Record {
    fn id(&self) -> &str;
}

/// Row-level change notification pushed by a backend's change feed
///
/// Deletes only carry the row id: some backends cannot hand out the
/// deleted row itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent<T> {
    Insert { record: T },
    Update { record: T },
    Delete { id: String },
}

impl<T: Record> ChangeEvent<T> {
    /// Id of the row this event is about
    pub fn id(&self) -> &str {
        match self {
            Self::Insert { record } | Self::Update { record } => record.id(),
            Self::Delete { id } => id,
        }
    }
}

impl<T> ChangeEvent<T> {
    pub fn record(&self) -> Option<&T> {
        match self {
            Self::Insert { record } | Self::Update { record } => Some(record),
            Self::Delete { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: String,
    }

    impl Record for Row {
        fn id(&self) -> &str {
            &self.id
        }
    }

    #[test]
    fn test_change_event_wire_format() {
        let event = ChangeEvent::Insert { record: Row { id: "r1".to_string() } };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "insert");
        assert_eq!(json["record"]["id"], "r1");

        let delete: ChangeEvent<Row> =
            serde_json::from_str(r#"{"type":"delete","id":"r2"}"#).unwrap();
        assert_eq!(delete.id(), "r2");
        assert!(delete.record().is_none());
        assert_eq!(delete.kind(), "delete");
    }
}
