//! Read-only collaborators consumed by a script session.
//!
//! Every accessor returns a fresh snapshot; callers must not hold on to the
//! result across renders.

use chrono::{Local, Timelike};
use serde_json::Value;

use crate::domain::CallContext;

pub trait DataCache {
    fn people(&self) -> Vec<Value>;
    fn accounts(&self) -> Vec<Value>;
}

pub trait CallContextSource {
    fn call_context(&self) -> CallContext;
}

pub trait AgentSettings {
    fn agent_first_name(&self) -> String;
}

/// Contact explicitly picked through manual search, if any.
pub trait OverrideSource {
    fn override_contact_id(&self) -> Option<String>;
}

pub trait Clock {
    /// Local hour of day, `0..24`.
    fn local_hour(&self) -> u32;
}

/// Borrowed bundle of every port a render step consults.
#[derive(Clone, Copy)]
pub struct SessionPorts<'a> {
    pub cache: &'a dyn DataCache,
    pub call: &'a dyn CallContextSource,
    pub agent: &'a dyn AgentSettings,
    pub selection: &'a dyn OverrideSource,
    pub clock: &'a dyn Clock,
}

#[derive(Clone, Debug, Default)]
pub struct StaticDataCache {
    pub people: Vec<Value>,
    pub accounts: Vec<Value>,
}

impl StaticDataCache {
    pub fn new(people: Vec<Value>, accounts: Vec<Value>) -> Self {
        Self { people, accounts }
    }
}

impl DataCache for StaticDataCache {
    fn people(&self) -> Vec<Value> {
        self.people.clone()
    }

    fn accounts(&self) -> Vec<Value> {
        self.accounts.clone()
    }
}

#[derive(Clone, Debug, Default)]
pub struct FixedCallContext(pub CallContext);

impl CallContextSource for FixedCallContext {
    fn call_context(&self) -> CallContext {
        self.0.clone()
    }
}

#[derive(Clone, Debug, Default)]
pub struct FixedAgent(pub String);

impl AgentSettings for FixedAgent {
    fn agent_first_name(&self) -> String {
        self.0.clone()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ManualOverride(pub Option<String>);

impl ManualOverride {
    pub fn set(&mut self, contact_id: impl Into<String>) {
        self.0 = Some(contact_id.into());
    }

    /// Called when the operator empties the search box.
    pub fn clear(&mut self) {
        self.0 = None;
    }
}

impl OverrideSource for ManualOverride {
    fn override_contact_id(&self) -> Option<String> {
        self.0.as_deref().map(str::trim).filter(|id| !id.is_empty()).map(str::to_owned)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn local_hour(&self) -> u32 {
        Local::now().hour()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn local_hour(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{ManualOverride, OverrideSource};

    #[test]
    fn cleared_or_blank_override_is_absent() {
        let mut selection = ManualOverride::default();
        assert_eq!(selection.override_contact_id(), None);

        selection.set("  ");
        assert_eq!(selection.override_contact_id(), None);

        selection.set("c-7");
        assert_eq!(selection.override_contact_id().as_deref(), Some("c-7"));

        selection.clear();
        assert_eq!(selection.override_contact_id(), None);
    }
}
