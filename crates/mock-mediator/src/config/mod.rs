//! Configuration types for the mediator.

use crate::handler::{RequestHandler, RouteDelay, RouteHandler, RouteHandlerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Runtime options shared read-only by every invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediatorConfig {
    /// Suppress the log line for successfully mocked requests.
    /// Warnings for handlers that returned no response are still emitted.
    #[serde(default)]
    pub quiet: bool,
}

/// On-disk configuration: mediator options plus declarative route handlers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediatorFile {
    #[serde(default)]
    pub quiet: bool,

    /// Handlers in match order.
    #[serde(default)]
    pub handlers: Vec<RouteHandlerConfig>,
}

impl MediatorFile {
    /// Load from YAML, or JSON when the file extension is `.json`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: MediatorFile = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for (index, handler) in self.handlers.iter().enumerate() {
            if !handler.path.starts_with('/') {
                anyhow::bail!(
                    "Handler #{index} path '{}' must start with '/'",
                    handler.path
                );
            }
            if handler.response.is_some() && handler.fail.is_some() {
                anyhow::bail!(
                    "Handler #{index} ({}) sets both 'response' and 'fail'; choose one",
                    handler.path
                );
            }
            if let Some(RouteDelay::Range { min_ms, max_ms }) = handler.delay {
                if min_ms > max_ms {
                    anyhow::bail!(
                        "Handler #{index} ({}) has delay min {min_ms} greater than max {max_ms}",
                        handler.path
                    );
                }
            }
        }
        Ok(())
    }

    pub fn mediator_config(&self) -> MediatorConfig {
        MediatorConfig { quiet: self.quiet }
    }

    /// Compile the declared routes into handlers, preserving order.
    pub fn build_handlers(&self) -> Result<Vec<Arc<dyn RequestHandler>>, anyhow::Error> {
        self.handlers
            .iter()
            .cloned()
            .map(|config| {
                RouteHandler::compile(config)
                    .map(|handler| Arc::new(handler) as Arc<dyn RequestHandler>)
                    .map_err(anyhow::Error::from)
            })
            .collect()
    }
}
