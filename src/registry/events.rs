//! Developer-facing registry events.
//!
//! Events are informational only: they are broadcast to subscribers and
//! written to the log, and never drive control flow.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Loaded,
    Reloaded,
    Removed,
    Reloading,
    BuildError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEvent {
    pub kind: EventKind,
    /// Handler the event is about; `None` for registry-wide events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegistryEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            function: None,
            display_name: None,
            warnings: Vec::new(),
            error: None,
        }
    }

    pub fn for_function(kind: EventKind, function: &str, display_name: &str, warnings: &[String]) -> Self {
        Self {
            function: Some(function.to_string()),
            display_name: Some(display_name.to_string()),
            warnings: warnings.to_vec(),
            ..Self::new(kind)
        }
    }

    pub fn build_error(error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(EventKind::BuildError)
        }
    }

    /// Human-readable console line.
    pub fn render(&self) -> String {
        let subject = match &self.display_name {
            Some(name) => format!("edge function {name}"),
            None => "edge functions".to_string(),
        };
        let warnings = if self.warnings.is_empty() {
            String::new()
        } else {
            let lines: Vec<String> = self.warnings.iter().map(|w| format!("  - {w}")).collect();
            format!(" with warnings:\n{}", lines.join("\n"))
        };

        match self.kind {
            EventKind::Loaded => format!("Loaded {subject}{warnings}"),
            EventKind::Reloaded => format!("Reloaded {subject}{warnings}"),
            EventKind::Removed => format!("Removed {subject}"),
            EventKind::Reloading => format!("Reloading {subject}..."),
            EventKind::BuildError => format!(
                "Failed to load {subject}: {}",
                self.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    /// Write the rendered event to the log at a level matching its severity.
    pub fn log(&self) {
        let message = self.render();
        let function = self.function.as_deref().unwrap_or_default();
        match self.kind {
            EventKind::BuildError => tracing::error!(function, "{message}"),
            _ if !self.warnings.is_empty() => tracing::warn!(function, "{message}"),
            _ => tracing::info!(function, "{message}"),
        }
    }
}
