use serde::{Deserialize, Serialize};

/// Snapshot of the live telephony widget. Never cached across renders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

impl CallContext {
    pub fn contact_hint(&self) -> Option<&str> {
        non_empty(self.contact_id.as_deref())
    }

    pub fn account_hint(&self) -> Option<&str> {
        non_empty(self.account_id.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
