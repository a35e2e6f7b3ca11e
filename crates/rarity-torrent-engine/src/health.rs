//! Degraded-component tracking shared by the pump, the handlers, and the health endpoint.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

/// Set of engine components currently considered degraded.
#[derive(Debug, Clone, Default)]
pub struct EngineHealth {
    degraded: Arc<Mutex<BTreeSet<String>>>,
}

impl EngineHealth {
    /// Mark a component degraded, logging the transition (or the repeated failure).
    pub fn mark_degraded(&self, component: &str, detail: Option<&str>) {
        let inserted = self
            .degraded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(component.to_string());
        if inserted {
            if let Some(detail) = detail {
                warn!(
                    component = component,
                    detail = %detail,
                    "engine component degraded"
                );
            } else {
                warn!(component = component, "engine component degraded");
            }
        } else if let Some(detail) = detail {
            warn!(
                component = component,
                detail = %detail,
                "engine component still degraded"
            );
        }
    }

    /// Clear a component's degraded flag, logging only when it was set.
    pub fn mark_recovered(&self, component: &str) {
        let removed = self
            .degraded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(component);
        if removed {
            info!(component = component, "engine component recovered");
        }
    }

    /// Sorted names of the degraded components.
    #[must_use]
    pub fn degraded(&self) -> Vec<String> {
        self.degraded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Whether every component is healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.degraded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
