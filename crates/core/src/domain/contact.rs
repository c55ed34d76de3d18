use serde::{Deserialize, Serialize};

/// Canonical CRM contact. Every field is a plain string; absent data is `""`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    /// Every non-empty identifier alias the upstream record carried.
    pub record_ids: Vec<String>,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub title: String,
    pub email: String,
    pub work_direct_phone: String,
    pub mobile_phone: String,
    pub other_phone: String,
    pub generic_phone: String,
    pub phone: String,
    pub company: String,
    pub account_id: String,
    pub supplier: String,
    pub contract_end: String,
}

impl Contact {
    pub fn matches_id(&self, id: &str) -> bool {
        let id = id.trim();
        !id.is_empty() && self.record_ids.iter().any(|candidate| candidate == id)
    }

    /// Phones in lookup priority order.
    pub fn phones(&self) -> [&str; 4] {
        [
            self.work_direct_phone.as_str(),
            self.mobile_phone.as_str(),
            self.other_phone.as_str(),
            self.generic_phone.as_str(),
        ]
    }
}
