//! Tool registry.
//!
//! A closed set of named capabilities, fixed at run start.

use crate::BoxedTool;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a registry with the built-in capability set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(crate::http::HttpGetTool));
        registry.register(Arc::new(crate::http::HttpPostTool));
        registry.register(Arc::new(crate::scan::PortScanTool));
        registry.register(Arc::new(crate::install::AptInstallTool));
        registry.register(Arc::new(crate::install::PipInstallTool));
        registry.register(Arc::new(crate::python::RunPythonTool));
        registry.register(Arc::new(crate::shell::ShellTool));

        registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: BoxedTool) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&BoxedTool> {
        self.tools.get(name)
    }

    /// List all tool names.
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get all tools.
    pub fn all(&self) -> impl Iterator<Item = &BoxedTool> {
        self.tools.values()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_set_is_closed() {
        let registry = ToolRegistry::with_builtins();
        let mut names = registry.list();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "apt_install",
                "http_get",
                "http_post",
                "pip_install",
                "port_scan",
                "run_python",
                "shell"
            ]
        );
    }

    #[test]
    fn test_get_unknown_tool() {
        let registry = ToolRegistry::with_builtins();
        assert!(registry.get("rm_rf").is_none());
    }
}
