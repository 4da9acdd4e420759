//! Step records emitted by the wallet SDK and their tracked form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `typeID` of the terminal settlement step.
pub const SETTLEMENT_STEP_ID: &str = "IS";
/// Data field of the settlement step holding the block explorer link.
pub const EXPLORER_URL_FIELD: &str = "explorerURL";

/// One step as delivered by the SDK. `data` is SDK-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStep {
    #[serde(rename = "typeID", default)]
    pub type_id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl ProgressStep {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            step_type: None,
            data: Value::Null,
        }
    }

    pub fn with_type(mut self, step_type: impl Into<String>) -> Self {
        self.step_type = Some(step_type.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Explorer link when this is the settlement step and carries one.
    pub fn settlement_explorer_url(&self) -> Option<&str> {
        if self.type_id != SETTLEMENT_STEP_ID {
            return None;
        }
        self.data.get(EXPLORER_URL_FIELD)?.as_str()
    }
}

/// A step in the locally owned list, with its completion flag.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedStep {
    pub index: usize,
    pub completed: bool,
    pub step: ProgressStep,
}

/// Operation whose steps are being tracked; selects the SDK event pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    #[default]
    Bridge,
    Transfer,
    BridgeAndExecute,
}

impl TransactionKind {
    /// Present-tense label used in headers and status lines.
    pub fn operation_text(self) -> &'static str {
        match self {
            Self::Bridge => "Transaction",
            Self::Transfer => "Transferring",
            Self::BridgeAndExecute => "Bridge & Execute",
        }
    }
}

/// Human label for an SDK step `type`.
pub fn status_label(step_type: &str, kind: TransactionKind) -> String {
    let label = match step_type {
        "INTENT_ACCEPTED" => "Intent Accepted",
        "INTENT_HASH_SIGNED" => "Signing Transaction",
        "INTENT_SUBMITTED" => "Submitting Transaction",
        "INTENT_COLLECTION" => "Collecting Confirmations",
        "INTENT_COLLECTION_COMPLETE" => "Confirmations Complete",
        "APPROVAL" => "Approving",
        "TRANSACTION_SENT" => "Sending Transaction",
        "RECEIPT_RECEIVED" => "Receipt Received",
        "TRANSACTION_CONFIRMED" | "INTENT_FULFILLED" => {
            return format!("{} Complete", kind.operation_text());
        }
        _ => return format!("Processing {}", kind.operation_text()),
    };
    label.to_string()
}

#[cfg(test)]
mod tests {
    use super::{status_label, ProgressStep, TransactionKind};
    use serde_json::json;

    #[test]
    fn explorer_url_only_from_settlement_step() {
        let settled = ProgressStep::new("IS").with_data(json!({"explorerURL": "https://x/1"}));
        assert_eq!(settled.settlement_explorer_url(), Some("https://x/1"));

        let other = ProgressStep::new("IA").with_data(json!({"explorerURL": "https://x/2"}));
        assert_eq!(other.settlement_explorer_url(), None);
        assert_eq!(ProgressStep::new("IS").settlement_explorer_url(), None);
    }

    #[test]
    fn labels_cover_known_and_terminal_types() {
        assert_eq!(
            status_label("APPROVAL", TransactionKind::Bridge),
            "Approving"
        );
        assert_eq!(
            status_label("INTENT_FULFILLED", TransactionKind::Transfer),
            "Transferring Complete"
        );
        assert_eq!(
            status_label("SOMETHING_NEW", TransactionKind::BridgeAndExecute),
            "Processing Bridge & Execute"
        );
    }

    #[test]
    fn sdk_payload_uses_type_id_key() {
        let step: ProgressStep =
            serde_json::from_value(json!({"typeID": "CS", "type": "INTENT_COLLECTION"})).unwrap();
        assert_eq!(step.type_id, "CS");
        assert_eq!(step.step_type.as_deref(), Some("INTENT_COLLECTION"));
    }
}
