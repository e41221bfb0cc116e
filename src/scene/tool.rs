use std::fmt;

/// Interaction handler attached to a component, e.g. a rotate or drag tool.
///
/// The scene graph only stores tools and reports list changes; activation
/// and event routing belong to the tool system of the viewer.
pub trait Tool: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn description(&self) -> &str {
        "tool"
    }
}
