pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod normalize;
pub mod ports;
pub mod render;
pub mod resolver;
pub mod script;

pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, SessionId};
pub use domain::{Account, CallContext, Contact};
pub use errors::{ApplicationError, DomainError};
pub use ports::{
    AgentSettings, CallContextSource, Clock, DataCache, OverrideSource, SessionPorts,
};
pub use render::{NodeText, ResolvedContext, TemplateRenderer};
pub use resolver::{AccountSource, ContactSource, EntityResolver, Resolution};
pub use script::{
    default_script, Navigator, RenderedStep, ScriptGraph, ScriptGraphBuilder, ScriptSession,
};
