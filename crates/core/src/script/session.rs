use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::{AuditContext, AuditSink, SessionId};
use crate::config::AppConfig;
use crate::ports::SessionPorts;
use crate::render::{ResolvedContext, SpendFigures, SpendHeuristics, TemplateRenderer};
use crate::resolver::{EntityResolver, Resolution};
use crate::script::graph::{Response, ScriptGraph};
use crate::script::navigator::{Navigator, TransitionOutcome};

/// What the UI shows after a transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedStep {
    pub node_id: String,
    pub stage: String,
    pub html: String,
    /// Offered as-is; targets are only checked when one is followed.
    pub responses: Vec<Response>,
    pub can_go_back: bool,
}

/// One operator's walk through a script. Every transition is followed by a
/// render that reads all ports fresh.
#[derive(Clone, Debug)]
pub struct ScriptSession {
    id: SessionId,
    navigator: Navigator,
    resolver: EntityResolver,
    renderer: TemplateRenderer,
    heuristics: SpendHeuristics,
}

impl ScriptSession {
    pub fn new(
        graph: Arc<ScriptGraph>,
        heuristics: SpendHeuristics,
        opener: Option<String>,
    ) -> Self {
        Self {
            id: SessionId::generate(),
            navigator: Navigator::new(graph, opener),
            resolver: EntityResolver::new(),
            renderer: TemplateRenderer::new(),
            heuristics,
        }
    }

    pub fn from_config(graph: Arc<ScriptGraph>, config: &AppConfig) -> Self {
        Self::new(graph, config.spend_heuristics(), config.script.opener.clone())
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut Navigator {
        &mut self.navigator
    }

    pub fn choose(&mut self, next: &str, label: &str, ports: &SessionPorts<'_>) -> RenderedStep {
        self.navigator.go(next, label);
        self.render(ports)
    }

    /// Same as [`ScriptSession::choose`], recording the transition in `sink`.
    pub fn choose_with_audit<S>(
        &mut self,
        next: &str,
        label: &str,
        ports: &SessionPorts<'_>,
        sink: &S,
        actor: &str,
    ) -> RenderedStep
    where
        S: AuditSink,
    {
        let audit = self.audit_context(actor);
        self.navigator.go_with_audit(next, label, sink, &audit);
        self.render(ports)
    }

    pub fn audit_context(&self, actor: &str) -> AuditContext {
        let correlation_id = format!("{}:{}", self.id.0, self.navigator.history().len());
        AuditContext::new(Some(self.id.clone()), correlation_id, actor)
    }

    /// Follows a response of the current node by its label.
    pub fn respond(&mut self, label: &str, ports: &SessionPorts<'_>) -> RenderedStep {
        if let TransitionOutcome::Ignored { requested, .. } = self.navigator.choose(label) {
            debug!(
                event_name = "script.navigation.unknown_label",
                current = %self.navigator.current(),
                label = %requested,
                "no response with this label on the current node"
            );
        }
        self.render(ports)
    }

    pub fn back(&mut self, ports: &SessionPorts<'_>) -> RenderedStep {
        self.navigator.back();
        self.render(ports)
    }

    pub fn restart(&mut self, ports: &SessionPorts<'_>) -> RenderedStep {
        self.navigator.restart();
        self.render(ports)
    }

    pub fn record_monthly_spend(&mut self, input: &str) -> Option<Decimal> {
        self.navigator.record_monthly_spend(input)
    }

    pub fn set_opener(&mut self, opener: Option<String>) {
        self.navigator.set_opener(opener);
    }

    pub fn resolve(&self, ports: &SessionPorts<'_>) -> Resolution {
        let call = ports.call.call_context();
        let override_id = ports.selection.override_contact_id();
        self.resolver.resolve(
            &call,
            override_id.as_deref(),
            &ports.cache.people(),
            &ports.cache.accounts(),
        )
    }

    pub fn spend_figures(&self) -> SpendFigures {
        let discovered = self.navigator.responses_in_stage(&self.heuristics.discovery_stage);
        let monthly =
            self.heuristics.infer_monthly(self.navigator.state().facts.monthly_spend, discovered);
        self.heuristics.figures(monthly)
    }

    pub fn resolved_context(&self, ports: &SessionPorts<'_>) -> ResolvedContext {
        let resolution = self.resolve(ports);
        ResolvedContext::new(
            resolution,
            ports.call.call_context(),
            ports.agent.agent_first_name(),
            self.spend_figures(),
            ports.clock.local_hour(),
        )
    }

    pub fn render(&self, ports: &SessionPorts<'_>) -> RenderedStep {
        let can_go_back = !self.navigator.history().is_empty();
        let Some(node) = self.navigator.current_node() else {
            return RenderedStep {
                node_id: self.navigator.current().to_owned(),
                stage: String::new(),
                html: String::new(),
                responses: Vec::new(),
                can_go_back,
            };
        };

        let context = self.resolved_context(ports);
        let html = self.renderer.render(&node.text, &context);
        debug!(
            event_name = "script.render.completed",
            session_id = %self.id.0,
            node_id = %node.id,
            stage = %node.stage,
            responses = node.responses.len(),
            "rendered dialog node"
        );

        RenderedStep {
            node_id: node.id.clone(),
            stage: node.stage.clone(),
            html,
            responses: node.responses.clone(),
            can_go_back,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::audit::{AuditOutcome, InMemoryAuditSink};
    use crate::config::AppConfig;
    use crate::domain::CallContext;
    use crate::ports::{
        FixedAgent, FixedCallContext, FixedClock, ManualOverride, SessionPorts, StaticDataCache,
    };
    use crate::render::SpendHeuristics;
    use crate::resolver::{AccountSource, ContactSource};
    use crate::script::graph::{Response, ScriptGraph};

    use super::ScriptSession;

    fn graph() -> Arc<ScriptGraph> {
        Arc::new(
            ScriptGraph::builder("start")
                .static_node(
                    "start",
                    "opening",
                    "{{day.greeting}}, {{contact.first_name}}. This is {{agent.first_name}}.",
                    vec![Response::new("Yes", "situation"), Response::new("Broken", "gone")],
                )
                .static_node(
                    "situation",
                    "situation_discovery",
                    "What does {{account.name}} spend monthly?",
                    vec![
                        Response::new("$1K–$5K", "summary"),
                        Response::new("Let me enter it", "summary"),
                    ],
                )
                .computed_node(
                    "summary",
                    "value",
                    |context| {
                        if context.spend.monthly.is_zero() {
                            "We can estimate savings for {{account.name}}.".to_owned()
                        } else {
                            "That is {{annual_spend}} a year; we target {{potential_savings}}."
                                .to_owned()
                        }
                    },
                    Vec::new(),
                )
                .build()
                .expect("graph builds"),
        )
    }

    struct Fixture {
        cache: StaticDataCache,
        call: FixedCallContext,
        agent: FixedAgent,
        selection: ManualOverride,
        clock: FixedClock,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                cache: StaticDataCache::new(
                    vec![
                        json!({
                            "id": "c-jane",
                            "firstName": "Jane",
                            "workDirectPhone": "(972) 555-1234",
                            "company": "Acme LLC"
                        }),
                        json!({ "id": "c-omar", "fullName": "Omar Fay", "company": "Globex" }),
                    ],
                    vec![
                        json!({ "id": "a-acme", "name": "Acme Industries", "website": "acme.com" }),
                        json!({ "id": "a-globex", "name": "Globex" }),
                    ],
                ),
                call: FixedCallContext(CallContext {
                    name: "Jane Doe".to_owned(),
                    number: "9725551234".to_owned(),
                    is_active: true,
                    ..CallContext::default()
                }),
                agent: FixedAgent("Sam".to_owned()),
                selection: ManualOverride::default(),
                clock: FixedClock(14),
            }
        }

        fn ports(&self) -> SessionPorts<'_> {
            SessionPorts {
                cache: &self.cache,
                call: &self.call,
                agent: &self.agent,
                selection: &self.selection,
                clock: &self.clock,
            }
        }
    }

    fn session() -> ScriptSession {
        ScriptSession::new(graph(), SpendHeuristics::default(), None)
    }

    #[test]
    fn live_call_resolves_by_phone_and_company_containment() {
        let fixture = Fixture::new();
        let resolution = session().resolve(&fixture.ports());

        assert_eq!(resolution.contact.id, "c-jane");
        assert_eq!(resolution.contact_source, ContactSource::Phone);
        assert_eq!(resolution.account.name, "Acme Industries");
        assert_eq!(resolution.account_source, AccountSource::CompanyName);
    }

    #[test]
    fn render_materializes_the_current_node() {
        let fixture = Fixture::new();
        let step = session().render(&fixture.ports());

        assert_eq!(step.node_id, "start");
        assert_eq!(step.stage, "opening");
        assert_eq!(step.html, "Good afternoon, Jane. This is Sam.");
        assert_eq!(step.responses.len(), 2);
        assert!(!step.can_go_back);
    }

    #[test]
    fn rendering_twice_is_byte_identical() {
        let fixture = Fixture::new();
        let session = session();

        assert_eq!(session.render(&fixture.ports()), session.render(&fixture.ports()));
    }

    #[test]
    fn override_is_read_fresh_on_every_render() {
        let mut fixture = Fixture::new();
        let session = session();
        assert!(session.render(&fixture.ports()).html.contains("Jane"));

        fixture.selection.set("c-omar");
        assert!(session.render(&fixture.ports()).html.contains("Omar"));

        fixture.selection.clear();
        assert!(session.render(&fixture.ports()).html.contains("Jane"));
    }

    #[test]
    fn cache_changes_are_visible_without_invalidation() {
        let mut fixture = Fixture::new();
        let session = session();

        fixture.cache.people.clear();
        let step = session.render(&fixture.ports());

        assert_eq!(step.html, "Good afternoon, Jane. This is Sam.");
        assert_eq!(session.resolve(&fixture.ports()).contact_source, ContactSource::Stub);
    }

    #[test]
    fn invalid_responses_leave_the_step_unchanged() {
        let fixture = Fixture::new();
        let mut session = session();
        let before = session.render(&fixture.ports());

        let after = session.choose("gone", "Broken", &fixture.ports());

        assert_eq!(before, after);
    }

    #[test]
    fn entered_spend_feeds_the_computed_summary() {
        let fixture = Fixture::new();
        let mut session = session();
        session.respond("Yes", &fixture.ports());
        session.respond("Let me enter it", &fixture.ports());
        assert_eq!(session.record_monthly_spend("5000"), Some(Decimal::from(5_000)));

        let step = session.render(&fixture.ports());

        assert_eq!(step.node_id, "summary");
        assert_eq!(step.html, "That is $60,000 a year; we target $15,000.");
        assert!(step.can_go_back);
    }

    #[test]
    fn range_answer_in_history_infers_spend() {
        let fixture = Fixture::new();
        let mut session = session();
        session.respond("Yes", &fixture.ports());

        let step = session.respond("$1K–$5K", &fixture.ports());

        assert_eq!(step.html, "That is $36,000 a year; we target $9,000.");
    }

    #[test]
    fn unknown_spend_uses_the_fallback_copy() {
        let fixture = Fixture::new();
        let mut session = session();
        session.respond("Yes", &fixture.ports());

        let step = session.respond("Let me enter it", &fixture.ports());

        assert_eq!(step.html, "We can estimate savings for Acme Industries.");
    }

    #[test]
    fn back_and_restart_render_the_restored_node() {
        let fixture = Fixture::new();
        let mut session = session();
        session.respond("Yes", &fixture.ports());

        assert_eq!(session.back(&fixture.ports()).node_id, "start");

        session.respond("Yes", &fixture.ports());
        session.record_monthly_spend("9000");
        let restarted = session.restart(&fixture.ports());
        assert_eq!(restarted.node_id, "start");
        assert!(!restarted.can_go_back);
        assert!(session.spend_figures().monthly.is_zero());
    }

    #[test]
    fn audited_choices_carry_the_session_id() {
        let fixture = Fixture::new();
        let mut session = session();
        let sink = InMemoryAuditSink::default();

        let step =
            session.choose_with_audit("situation", "Yes", &fixture.ports(), &sink, "operator");
        session.choose_with_audit("gone", "Broken", &fixture.ports(), &sink, "operator");

        assert_eq!(step.node_id, "situation");
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].session_id.as_ref(), Some(session.id()));
        assert_eq!(events[0].event_type, "script.transition_applied");
        assert_eq!(events[1].outcome, AuditOutcome::Ignored);
        assert_eq!(events[1].metadata.get("requested").map(String::as_str), Some("gone"));
    }

    #[test]
    fn config_heuristics_drive_spend_figures() {
        let mut config = AppConfig::default();
        config.heuristics.savings_rate = Decimal::new(5, 1);
        let mut session = ScriptSession::from_config(graph(), &config);

        session.record_monthly_spend("1,000");
        let figures = session.spend_figures();

        assert_eq!(figures.annual, Decimal::from(12_000));
        assert_eq!(figures.potential_savings, Decimal::from(6_000));
    }

    #[test]
    fn oversized_spend_renders_the_fallback_copy() {
        let fixture = Fixture::new();
        let mut session = session();
        session.respond("Yes", &fixture.ports());
        session.record_monthly_spend("8000000000000000000000000000");

        let step = session.choose("summary", "Let me enter it", &fixture.ports());
        assert_eq!(step.html, "We can estimate savings for Acme Industries.");
    }
}
