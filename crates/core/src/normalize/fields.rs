use serde_json::Value;

use crate::domain::{Account, Contact};

/// Ordered list of upstream keys for one canonical field. The first key holding
/// a non-empty value wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldChain(pub &'static [&'static str]);

impl FieldChain {
    pub fn resolve(&self, record: &Value) -> String {
        self.0
            .iter()
            .map(|key| field_text(record, key))
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }

    pub fn all(&self, record: &Value) -> Vec<String> {
        let mut values: Vec<String> = Vec::new();
        for value in self.0.iter().map(|key| field_text(record, key)) {
            if !value.is_empty() && !values.contains(&value) {
                values.push(value);
            }
        }
        values
    }
}

pub mod contact_fields {
    use super::FieldChain;

    pub const ID: FieldChain = FieldChain(&["id", "contactId", "contact_id", "_id"]);
    pub const FIRST_NAME: FieldChain = FieldChain(&["firstName", "first_name", "first"]);
    pub const LAST_NAME: FieldChain = FieldChain(&["lastName", "last_name", "last"]);
    pub const FULL_NAME: FieldChain = FieldChain(&["fullName", "full_name", "name", "displayName"]);
    pub const WORK_DIRECT_PHONE: FieldChain = FieldChain(&[
        "workDirectPhone",
        "work_direct_phone",
        "directPhone",
        "direct_phone",
        "workPhone",
    ]);
    pub const MOBILE_PHONE: FieldChain =
        FieldChain(&["mobile", "mobilePhone", "mobile_phone", "cellPhone"]);
    pub const OTHER_PHONE: FieldChain = FieldChain(&["otherPhone", "other_phone"]);
    pub const GENERIC_PHONE: FieldChain = FieldChain(&["phone", "phoneNumber", "phone_number"]);
    pub const EMAIL: FieldChain =
        FieldChain(&["email", "emailAddress", "email_address", "workEmail"]);
    pub const TITLE: FieldChain = FieldChain(&["title", "jobTitle", "job_title"]);
    pub const COMPANY: FieldChain = FieldChain(&[
        "company",
        "companyName",
        "company_name",
        "accountName",
        "account_name",
        "organization",
    ]);
    pub const ACCOUNT_ID: FieldChain = FieldChain(&["accountId", "account_id", "companyId"]);
    pub const SUPPLIER: FieldChain = FieldChain(&[
        "electricitySupplier",
        "electricity_supplier",
        "currentSupplier",
        "supplier",
    ]);
    pub const CONTRACT_END: FieldChain =
        FieldChain(&["contractEndDate", "contract_end_date", "contractEnd", "contract_end"]);
}

pub mod account_fields {
    use super::FieldChain;

    pub const ID: FieldChain = FieldChain(&["id", "accountId", "account_id", "_id"]);
    pub const NAME: FieldChain =
        FieldChain(&["accountName", "account_name", "name", "companyName", "company"]);
    pub const INDUSTRY: FieldChain = FieldChain(&["industry", "sector"]);
    pub const CITY: FieldChain = FieldChain(&["city", "billingCity"]);
    pub const STATE: FieldChain = FieldChain(&["state", "billingState", "region"]);
    pub const WEBSITE: FieldChain = FieldChain(&["website", "site", "domain", "url"]);
    pub const PHONE: FieldChain = FieldChain(&["companyPhone", "phone", "phoneNumber"]);
    pub const SUPPLIER: FieldChain = FieldChain(&[
        "electricitySupplier",
        "electricity_supplier",
        "currentSupplier",
        "supplier",
    ]);
    pub const CONTRACT_END: FieldChain = FieldChain(&[
        "contractEndDate",
        "contract_end_date",
        "contractEnd",
        "contract_end",
        "currentContractEnd",
    ]);
}

pub fn canonicalize_contact(record: &Value) -> Contact {
    use contact_fields as f;

    let mut first_name = f::FIRST_NAME.resolve(record);
    let mut last_name = f::LAST_NAME.resolve(record);
    let mut full_name = f::FULL_NAME.resolve(record);

    if full_name.is_empty() {
        full_name = join_non_empty(&[&first_name, &last_name]);
    }
    if first_name.is_empty() && last_name.is_empty() && !full_name.is_empty() {
        let (first, last) = split_full_name(&full_name);
        first_name = first;
        last_name = last;
    }

    let work_direct_phone = f::WORK_DIRECT_PHONE.resolve(record);
    let mobile_phone = f::MOBILE_PHONE.resolve(record);
    let other_phone = f::OTHER_PHONE.resolve(record);
    let generic_phone = f::GENERIC_PHONE.resolve(record);
    let phone = [&work_direct_phone, &mobile_phone, &other_phone, &generic_phone]
        .into_iter()
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or_default();

    let record_ids = f::ID.all(record);
    Contact {
        id: record_ids.first().cloned().unwrap_or_default(),
        record_ids,
        first_name,
        last_name,
        full_name,
        title: f::TITLE.resolve(record),
        email: f::EMAIL.resolve(record),
        work_direct_phone,
        mobile_phone,
        other_phone,
        generic_phone,
        phone,
        company: f::COMPANY.resolve(record),
        account_id: f::ACCOUNT_ID.resolve(record),
        supplier: f::SUPPLIER.resolve(record),
        contract_end: f::CONTRACT_END.resolve(record),
    }
}

pub fn canonicalize_account(record: &Value) -> Account {
    use account_fields as f;

    let record_ids = f::ID.all(record);
    Account {
        id: record_ids.first().cloned().unwrap_or_default(),
        record_ids,
        name: f::NAME.resolve(record),
        industry: f::INDUSTRY.resolve(record),
        city: f::CITY.resolve(record),
        state: f::STATE.resolve(record),
        website: f::WEBSITE.resolve(record),
        phone: f::PHONE.resolve(record),
        supplier: f::SUPPLIER.resolve(record),
        contract_end: f::CONTRACT_END.resolve(record),
    }
}

/// Splits a display name into first token and remainder.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_owned();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

fn join_non_empty(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn field_text(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(text)) => text.trim().to_owned(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}
