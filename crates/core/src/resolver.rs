//! Best-effort matching of a live call to CRM contact and account records.
//!
//! Each lookup walks a fixed precedence list and stops at the first hit. A
//! miss never surfaces as an error: the last strategy always synthesizes a
//! stub record from whatever the call itself carries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::{Account, CallContext, Contact};
use crate::normalize::fields::split_full_name;
use crate::normalize::{
    canonicalize_account, canonicalize_contact, normalize_company_key, normalize_domain,
    normalize_host, normalize_name, normalize_phone,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactSource {
    Override,
    ContextId,
    Phone,
    Name,
    Stub,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountSource {
    ContextId,
    ContactLink,
    CompanyName,
    Domain,
    Stub,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub contact: Contact,
    pub contact_source: ContactSource,
    pub account: Account,
    pub account_source: AccountSource,
}

/// Stateless; resolution runs again on every call because the caches and the
/// call context change between renders.
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityResolver;

impl EntityResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        call: &CallContext,
        override_id: Option<&str>,
        people: &[Value],
        accounts: &[Value],
    ) -> Resolution {
        let people: Vec<Contact> = people.iter().map(canonicalize_contact).collect();
        let accounts: Vec<Account> = accounts.iter().map(canonicalize_account).collect();

        let (contact, contact_source) = resolve_contact(call, override_id, &people);
        let (mut account, account_source) = resolve_account(call, &contact, &accounts);
        backfill_energy_fields(&contact, &mut account);
        if account.name.trim().is_empty() {
            account.name = company_name(call, &contact).to_owned();
        }

        debug!(
            event_name = "resolver.resolution.completed",
            contact_source = ?contact_source,
            account_source = ?account_source,
            contact_id = %contact.id,
            account_id = %account.id,
            "resolved call participants"
        );

        Resolution { contact, contact_source, account, account_source }
    }
}

fn resolve_contact(
    call: &CallContext,
    override_id: Option<&str>,
    people: &[Contact],
) -> (Contact, ContactSource) {
    if let Some(found) = override_id.and_then(|id| find_contact_by_id(people, id)) {
        return (found.clone(), ContactSource::Override);
    }
    if let Some(found) = call.contact_hint().and_then(|id| find_contact_by_id(people, id)) {
        return (found.clone(), ContactSource::ContextId);
    }
    if let Some(found) = find_contact_by_phone(people, &call.number) {
        return (found.clone(), ContactSource::Phone);
    }
    if let Some(found) = find_contact_by_name(people, &call.name) {
        return (found.clone(), ContactSource::Name);
    }
    (stub_contact(call), ContactSource::Stub)
}

fn find_contact_by_id<'a>(people: &'a [Contact], id: &str) -> Option<&'a Contact> {
    people.iter().find(|contact| contact.matches_id(id))
}

/// One pass per phone kind, so a work-direct hit on any contact beats a
/// mobile hit on an earlier one.
fn find_contact_by_phone<'a>(people: &'a [Contact], number: &str) -> Option<&'a Contact> {
    let target = normalize_phone(number);
    if target.is_empty() {
        return None;
    }
    (0..4).find_map(|slot| {
        people.iter().find(|contact| {
            let phone = contact.phones()[slot];
            !phone.is_empty() && normalize_phone(phone) == target
        })
    })
}

fn find_contact_by_name<'a>(people: &'a [Contact], caller_name: &str) -> Option<&'a Contact> {
    let target = normalize_name(caller_name);
    if target.is_empty() {
        return None;
    }
    people.iter().find(|contact| {
        let composed = normalize_name(&format!("{} {}", contact.first_name, contact.last_name));
        composed == target || normalize_name(&contact.full_name) == target
    })
}

fn stub_contact(call: &CallContext) -> Contact {
    let full_name = call.name.trim().to_owned();
    let (first_name, last_name) = split_full_name(&full_name);
    let id = call.contact_hint().unwrap_or_default().to_owned();
    let number = call.number.trim().to_owned();
    Contact {
        record_ids: if id.is_empty() { Vec::new() } else { vec![id.clone()] },
        id,
        first_name,
        last_name,
        full_name,
        generic_phone: number.clone(),
        phone: number,
        company: call.company.trim().to_owned(),
        ..Contact::default()
    }
}

fn resolve_account(
    call: &CallContext,
    contact: &Contact,
    accounts: &[Account],
) -> (Account, AccountSource) {
    if let Some(found) = call.account_hint().and_then(|id| find_account_by_id(accounts, id)) {
        return (found.clone(), AccountSource::ContextId);
    }
    if let Some(found) = find_account_by_id(accounts, &contact.account_id) {
        return (found.clone(), AccountSource::ContactLink);
    }
    let company = company_name(call, contact);
    if let Some(found) = find_account_by_company(accounts, company) {
        return (found.clone(), AccountSource::CompanyName);
    }
    if let Some(found) = find_account_by_domain(accounts, &contact.email) {
        return (found.clone(), AccountSource::Domain);
    }
    (stub_account(call, contact, company), AccountSource::Stub)
}

fn company_name<'a>(call: &'a CallContext, contact: &'a Contact) -> &'a str {
    let from_contact = contact.company.trim();
    if from_contact.is_empty() {
        call.company.trim()
    } else {
        from_contact
    }
}

fn find_account_by_id<'a>(accounts: &'a [Account], id: &str) -> Option<&'a Account> {
    accounts.iter().find(|account| account.matches_id(id))
}

fn find_account_by_company<'a>(accounts: &'a [Account], company: &str) -> Option<&'a Account> {
    let target = normalize_company_key(company);
    if target.is_empty() {
        return None;
    }
    let keyed: Vec<(String, &Account)> = accounts
        .iter()
        .map(|account| (normalize_company_key(&account.name), account))
        .filter(|(key, _)| !key.is_empty())
        .collect();

    keyed
        .iter()
        .find(|(key, _)| *key == target)
        .or_else(|| {
            keyed.iter().find(|(key, _)| key.contains(&target) || target.contains(key.as_str()))
        })
        .map(|(_, account)| *account)
}

fn find_account_by_domain<'a>(accounts: &'a [Account], email: &str) -> Option<&'a Account> {
    let domain = normalize_domain(email);
    if domain.is_empty() {
        return None;
    }
    accounts.iter().find(|account| {
        let host = normalize_host(&account.website);
        !host.is_empty() && (is_domain_suffix(&host, &domain) || is_domain_suffix(&domain, &host))
    })
}

/// `shop.acme.com` ends with `acme.com`; `notacme.com` does not.
fn is_domain_suffix(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

fn stub_account(call: &CallContext, contact: &Contact, company: &str) -> Account {
    let id = call
        .account_hint()
        .map(str::to_owned)
        .unwrap_or_else(|| contact.account_id.trim().to_owned());
    Account {
        record_ids: if id.is_empty() { Vec::new() } else { vec![id.clone()] },
        id,
        name: company.to_owned(),
        ..Account::default()
    }
}

/// Energy fields live on either record depending on how the CRM was filled in.
/// They only ever flow contact -> account, and never overwrite.
fn backfill_energy_fields(contact: &Contact, account: &mut Account) {
    if account.supplier.is_empty() && !contact.supplier.is_empty() {
        account.supplier = contact.supplier.clone();
    }
    if account.contract_end.is_empty() && !contact.contract_end.is_empty() {
        account.contract_end = contact.contract_end.clone();
    }
}
