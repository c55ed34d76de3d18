use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub record_ids: Vec<String>,
    pub name: String,
    pub industry: String,
    pub city: String,
    pub state: String,
    pub website: String,
    pub phone: String,
    pub supplier: String,
    pub contract_end: String,
}

impl Account {
    pub fn matches_id(&self, id: &str) -> bool {
        let id = id.trim();
        !id.is_empty() && self.record_ids.iter().any(|candidate| candidate == id)
    }

    /// `city, state` with whichever half is present.
    pub fn location(&self) -> String {
        match (self.city.is_empty(), self.state.is_empty()) {
            (false, false) => format!("{}, {}", self.city, self.state),
            (false, true) => self.city.clone(),
            (true, false) => self.state.clone(),
            (true, true) => String::new(),
        }
    }
}
