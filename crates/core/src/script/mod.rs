pub mod graph;
pub mod library;
pub mod navigator;
pub mod session;

pub use graph::{
    DanglingEdge, DialogNode, Response, ScriptDefinitionError, ScriptGraph, ScriptGraphBuilder,
};
pub use library::default_script;
pub use navigator::{
    ConversationFacts, HistoryEntry, NavigationState, Navigator, TransitionOutcome,
};
pub use session::{RenderedStep, ScriptSession};
