//! Declarative route handler loaded from configuration.
//!
//! Matches on method, an optional origin and a path pattern (radix trie via
//! `matchit`, so `/user/{id}` and `/static/{*rest}` both work).

use super::{HandlerOutcome, RequestHandler};
use crate::codec::{InterceptedRequest, MockedResponse};
use anyhow::anyhow;
use async_trait::async_trait;
use matchit::Router;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Delay applied before a route answers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RouteDelay {
    /// Fixed delay in milliseconds
    Fixed(u64),
    /// Random delay within range
    Range {
        #[serde(rename = "min")]
        min_ms: u64,
        #[serde(rename = "max")]
        max_ms: u64,
    },
}

impl RouteDelay {
    pub fn duration(&self) -> Duration {
        let ms = match self {
            RouteDelay::Fixed(ms) => *ms,
            RouteDelay::Range { min_ms, max_ms } if min_ms < max_ms => {
                use rand::Rng;
                rand::thread_rng().gen_range(*min_ms..=*max_ms)
            }
            RouteDelay::Range { min_ms, .. } => *min_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Route definition as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHandlerConfig {
    /// HTTP method, case-insensitive. Absent matches any method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Path pattern, e.g. `/user/{id}`.
    pub path: String,
    /// Restrict the route to one origin, e.g. `https://api.example.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Mocked response. Absent means the route claims the request but declines to answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<MockedResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<RouteDelay>,
    /// Answer a single request, then stop matching.
    #[serde(default)]
    pub once: bool,
    /// Raise with this message instead of answering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Invalid path pattern '{0}': {1}")]
    InvalidPath(String, String),
    #[error("Invalid origin '{0}': {1}")]
    InvalidOrigin(String, url::ParseError),
}

/// Compiled route handler.
pub struct RouteHandler {
    config: RouteHandlerConfig,
    router: Router<()>,
    origin: Option<String>,
    used: AtomicBool,
}

impl RouteHandler {
    pub fn compile(config: RouteHandlerConfig) -> Result<Self, RouteError> {
        let mut router = Router::new();
        router
            .insert(config.path.clone(), ())
            .map_err(|e| RouteError::InvalidPath(config.path.clone(), e.to_string()))?;

        let origin = config
            .origin
            .as_deref()
            .map(|raw| {
                Url::parse(raw)
                    .map(|url| url.origin().ascii_serialization())
                    .map_err(|e| RouteError::InvalidOrigin(raw.to_string(), e))
            })
            .transpose()?;

        Ok(Self {
            config,
            router,
            origin,
            used: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &RouteHandlerConfig {
        &self.config
    }

    fn matches(&self, request: &InterceptedRequest) -> bool {
        if let Some(method) = &self.config.method {
            if !method.eq_ignore_ascii_case(&request.method) {
                return false;
            }
        }
        if let Some(origin) = &self.origin {
            if *origin != request.url.origin().ascii_serialization() {
                return false;
            }
        }
        self.router.at(request.url.path()).is_ok()
    }
}

#[async_trait]
impl RequestHandler for RouteHandler {
    fn description(&self) -> String {
        let method = self
            .config
            .method
            .as_deref()
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| "ALL".to_string());
        match &self.origin {
            Some(origin) => format!("{method} {origin}{}", self.config.path),
            None => format!("{method} {}", self.config.path),
        }
    }

    async fn try_resolve(&self, request: &InterceptedRequest) -> anyhow::Result<HandlerOutcome> {
        if !self.matches(request) {
            return Ok(HandlerOutcome::Skipped);
        }
        if self.config.once && self.used.swap(true, Ordering::SeqCst) {
            debug!("Route {} already used once, skipping", self.description());
            return Ok(HandlerOutcome::Skipped);
        }

        if let Some(delay) = &self.config.delay {
            tokio::time::sleep(delay.duration()).await;
        }

        if let Some(message) = &self.config.fail {
            return Err(anyhow!("{message}"));
        }

        Ok(HandlerOutcome::Claimed(self.config.response.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route(value: serde_json::Value) -> RouteHandler {
        let config: RouteHandlerConfig = serde_json::from_value(value).unwrap();
        RouteHandler::compile(config).unwrap()
    }

    fn get(url: &str) -> InterceptedRequest {
        InterceptedRequest::new("GET", Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_matches_method_and_path_params() {
        let handler = route(json!({
            "method": "get",
            "path": "/user/{id}",
            "response": {"status": 200, "body": {"firstName": "John"}}
        }));

        let outcome = handler.try_resolve(&get("https://example.com/user/42")).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Claimed(Some(_))));

        let outcome = handler.try_resolve(&get("https://example.com/users")).await.unwrap();
        assert_eq!(outcome, HandlerOutcome::Skipped);

        let post = InterceptedRequest::new("POST", Url::parse("https://example.com/user/1").unwrap());
        assert_eq!(handler.try_resolve(&post).await.unwrap(), HandlerOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_catch_all_path() {
        let handler = route(json!({"path": "/static/{*rest}"}));
        let outcome = handler
            .try_resolve(&get("https://example.com/static/css/app.css"))
            .await
            .unwrap();
        assert_eq!(outcome, HandlerOutcome::Claimed(None));
        assert_eq!(handler.description(), "ALL /static/{*rest}");
    }

    #[tokio::test]
    async fn test_origin_restriction() {
        let handler = route(json!({
            "method": "GET",
            "path": "/v1/items",
            "origin": "https://api.example.com/ignored",
            "response": {"status": 204}
        }));
        assert_eq!(handler.description(), "GET https://api.example.com/v1/items");

        let hit = handler
            .try_resolve(&get("https://api.example.com/v1/items"))
            .await
            .unwrap();
        assert!(matches!(hit, HandlerOutcome::Claimed(Some(_))));

        let miss = handler
            .try_resolve(&get("https://other.example.com/v1/items"))
            .await
            .unwrap();
        assert_eq!(miss, HandlerOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_once_route_is_skipped_after_first_use() {
        let handler = route(json!({"path": "/token", "once": true, "response": {"status": 200}}));
        let req = get("https://example.com/token");
        assert!(matches!(
            handler.try_resolve(&req).await.unwrap(),
            HandlerOutcome::Claimed(Some(_))
        ));
        assert_eq!(handler.try_resolve(&req).await.unwrap(), HandlerOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_fail_route_raises() {
        let handler = route(json!({"path": "/explode", "fail": "boom"}));
        let err = handler
            .try_resolve(&get("https://example.com/explode"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_suspends_before_answering() {
        let handler = route(json!({"path": "/slow", "delay": 250, "response": {"status": 200}}));
        let start = tokio::time::Instant::now();
        handler.try_resolve(&get("https://example.com/slow")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn test_delay_range_stays_in_bounds() {
        let delay: RouteDelay = serde_json::from_value(json!({"min": 10, "max": 20})).unwrap();
        for _ in 0..50 {
            let d = delay.duration();
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
        }
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = RouteHandlerConfig {
            method: None,
            path: "/files/{*rest}/more".to_string(),
            origin: None,
            response: None,
            delay: None,
            once: false,
            fail: None,
        };
        assert!(matches!(
            RouteHandler::compile(config),
            Err(RouteError::InvalidPath(_, _))
        ));
    }
}
