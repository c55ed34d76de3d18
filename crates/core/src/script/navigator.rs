use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::render::parse_spend_input;
use crate::script::graph::{DialogNode, ScriptGraph};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Node the operator was on when the response was chosen.
    pub node: String,
    pub response_label: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationFacts {
    pub monthly_spend: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub current: String,
    pub history: Vec<HistoryEntry>,
    pub facts: ConversationFacts,
}

impl NavigationState {
    pub fn at(node: impl Into<String>) -> Self {
        Self { current: node.into(), history: Vec::new(), facts: ConversationFacts::default() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionOutcome {
    Moved { from: String, to: String, label: String },
    /// Target missing; state untouched.
    Ignored { at: String, requested: String },
}

impl TransitionOutcome {
    pub fn moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Walks a shared [`ScriptGraph`]. Only `go`, `back` and `restart` mutate the
/// position; `current` always names a node of the graph.
#[derive(Clone, Debug)]
pub struct Navigator {
    graph: Arc<ScriptGraph>,
    state: NavigationState,
    opener: Option<String>,
}

impl Navigator {
    pub fn new(graph: Arc<ScriptGraph>, opener: Option<String>) -> Self {
        let opener = opener.map(|key| key.trim().to_owned()).filter(|key| !key.is_empty());
        let state = NavigationState::at(graph.entry_for(opener.as_deref()));
        Self { graph, state, opener }
    }

    pub fn graph(&self) -> &ScriptGraph {
        &self.graph
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn current(&self) -> &str {
        &self.state.current
    }

    pub fn current_node(&self) -> Option<&DialogNode> {
        self.graph.node(&self.state.current)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.state.history
    }

    pub fn opener(&self) -> Option<&str> {
        self.opener.as_deref()
    }

    /// Changes the operator's opener preference. It survives restarts and
    /// takes effect at the next one.
    pub fn set_opener(&mut self, opener: Option<String>) {
        self.opener = opener.map(|key| key.trim().to_owned()).filter(|key| !key.is_empty());
    }

    pub fn go(&mut self, next: &str, label: &str) -> TransitionOutcome {
        if !self.graph.contains(next) {
            debug!(
                event_name = "script.navigation.ignored",
                current = %self.state.current,
                requested = %next,
                "response target does not exist"
            );
            return TransitionOutcome::Ignored {
                at: self.state.current.clone(),
                requested: next.to_owned(),
            };
        }

        let from = std::mem::replace(&mut self.state.current, next.to_owned());
        self.state
            .history
            .push(HistoryEntry { node: from.clone(), response_label: label.to_owned() });
        debug!(
            event_name = "script.navigation.moved",
            from = %from,
            to = %next,
            label = %label,
            depth = self.state.history.len(),
            "moved to next node"
        );
        TransitionOutcome::Moved { from, to: next.to_owned(), label: label.to_owned() }
    }

    pub fn go_with_audit<S>(
        &mut self,
        next: &str,
        label: &str,
        sink: &S,
        audit: &AuditContext,
    ) -> TransitionOutcome
    where
        S: AuditSink,
    {
        let outcome = self.go(next, label);
        let event = match &outcome {
            TransitionOutcome::Moved { from, to, label } => AuditEvent::new(
                audit,
                "script.transition_applied",
                AuditCategory::Navigation,
                AuditOutcome::Success,
            )
            .with_metadata("from", from.clone())
            .with_metadata("to", to.clone())
            .with_metadata("label", label.clone()),
            TransitionOutcome::Ignored { at, requested } => AuditEvent::new(
                audit,
                "script.transition_ignored",
                AuditCategory::Navigation,
                AuditOutcome::Ignored,
            )
            .with_metadata("at", at.clone())
            .with_metadata("requested", requested.clone()),
        };
        sink.emit(event);
        outcome
    }

    /// Follows the response with this label on the current node, if any.
    pub fn choose(&mut self, label: &str) -> TransitionOutcome {
        let wanted = label.trim();
        let next = self.current_node().and_then(|node| {
            node.responses
                .iter()
                .find(|response| response.label.trim().eq_ignore_ascii_case(wanted))
                .map(|response| (response.next.clone(), response.label.clone()))
        });
        match next {
            Some((next, label)) => self.go(&next, &label),
            None => TransitionOutcome::Ignored {
                at: self.state.current.clone(),
                requested: wanted.to_owned(),
            },
        }
    }

    pub fn back(&mut self) -> bool {
        match self.state.history.pop() {
            Some(entry) => {
                self.state.current = entry.node;
                true
            }
            None => false,
        }
    }

    /// Back to the entry node with empty history and facts. The opener
    /// preference is kept.
    pub fn restart(&mut self) {
        self.state = NavigationState::at(self.graph.entry_for(self.opener.as_deref()));
        debug!(
            event_name = "script.navigation.restarted",
            entry = %self.state.current,
            opener = self.opener.as_deref().unwrap_or("default"),
            "script restarted"
        );
    }

    /// Stores the answer typed into the amount prompt. Unusable input is ignored.
    pub fn record_monthly_spend(&mut self, input: &str) -> Option<Decimal> {
        let amount = parse_spend_input(input)?;
        self.state.facts.monthly_spend = Some(amount);
        Some(amount)
    }

    /// Labels chosen on nodes of `stage`, newest first.
    pub fn responses_in_stage(&self, stage: &str) -> Vec<&str> {
        self.state
            .history
            .iter()
            .rev()
            .filter(|entry| self.graph.node(&entry.node).is_some_and(|node| node.stage == stage))
            .map(|entry| entry.response_label.as_str())
            .collect()
    }
}
