//! Router builder for the lpt-event HTTP server

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::Request,
    http::HeaderValue,
    routing::{get, MethodRouter},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::{Timestamp, Uuid};

use lpt_kernel::ModuleRegistry;

use crate::spa;

/// Builder for constructing the main HTTP router.
///
/// Middleware flags are recorded and applied in [`RouterBuilder::build`], so
/// they wrap every route no matter the order the builder methods are called.
pub struct RouterBuilder {
    api_prefix: String,
    router: Router,
    api: Router,
    static_dir: Option<PathBuf>,
    tracing: bool,
    cors: bool,
    request_id: bool,
    timeout: Option<Duration>,
}

impl RouterBuilder {
    /// Create a new router builder; module routes are mounted under `api_prefix`.
    pub fn new(api_prefix: impl Into<String>) -> Self {
        Self {
            api_prefix: normalize_prefix(api_prefix.into()),
            router: Router::new(),
            api: Router::new(),
            static_dir: None,
            tracing: false,
            cors: false,
            request_id: false,
            timeout: None,
        }
    }

    /// Add a route outside the API prefix
    pub fn route(mut self, path: &str, route: MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router at `{api_prefix}{base_path}`. An empty base
    /// path merges the routes directly under the prefix.
    pub fn mount_module(mut self, base_path: &str, module_router: Router) -> Self {
        let base_path = base_path.trim_end_matches('/');
        self.api = if base_path.is_empty() {
            self.api.merge(module_router)
        } else {
            self.api.nest(base_path, module_router)
        };
        self
    }

    /// Mount every module in the registry
    pub fn mount_modules(mut self, registry: &ModuleRegistry) -> Self {
        for module in registry.modules() {
            let base_path = module.base_path();
            tracing::info!(
                module = module.name(),
                "mounting module routes under {}{}",
                self.api_prefix,
                base_path
            );
            self = self.mount_module(&base_path, module.routes());
        }
        self
    }

    /// Serve the built frontend from `dir`, with client-side routing fallback
    pub fn with_static_assets(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Add request ID middleware
    pub fn with_request_id(mut self) -> Self {
        self.request_id = true;
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }

    /// Add OpenAPI documentation by collecting specs from all modules
    pub fn with_openapi(mut self, registry: &ModuleRegistry, title: &str) -> Self {
        let openapi_spec = merged_openapi(registry, &self.api_prefix, title);

        // Deserialize our JSON spec into a proper utoipa OpenApi object
        // This allows SwaggerUI to serve it correctly
        let openapi_obj: utoipa::openapi::OpenApi = serde_json::from_value(openapi_spec.clone())
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "merged OpenAPI document is invalid");
                utoipa::openapi::OpenApiBuilder::new()
                    .info(
                        utoipa::openapi::InfoBuilder::new()
                            .title(title)
                            .version(env!("CARGO_PKG_VERSION"))
                            .build(),
                    )
                    .build()
            });

        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi_obj),
        );

        // Also serve the raw JSON spec for external consumers
        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        let mut router = if self.api_prefix.is_empty() {
            self.router.merge(self.api)
        } else {
            self.router.nest(&self.api_prefix, self.api)
        };

        router = match self.static_dir {
            Some(dir) => router.fallback_service(spa::fallback(dir, self.api_prefix.clone())),
            None => router.fallback(spa::not_found),
        };

        // Layers wrap everything added before them; the last one is outermost.
        if let Some(timeout) = self.timeout {
            router = router.layer(TimeoutLayer::new(timeout));
        }
        if self.cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }
        if self.request_id {
            router = router.layer(PropagateRequestIdLayer::x_request_id());
        }
        if self.tracing {
            router = router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            );
        }
        if self.request_id {
            router = router.layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        }

        router
    }
}

/// Build the OpenAPI document from every module's fragment.
pub fn merged_openapi(registry: &ModuleRegistry, api_prefix: &str, title: &str) -> serde_json::Value {
    let mut openapi_spec = serde_json::json!({
        "openapi": "3.1.0",
        "info": {
            "title": title,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    openapi_spec["components"]["schemas"]["ErrorResponse"] = serde_json::json!({
        "type": "object",
        "properties": {
            "error": {
                "type": "object",
                "properties": {
                    "code": { "type": "string" },
                    "message": { "type": "string" },
                    "details": { "type": "array", "items": {} },
                    "trace_id": { "type": "string" },
                    "timestamp": { "type": "string" }
                },
                "required": ["code", "message", "trace_id", "timestamp"]
            }
        },
        "required": ["error"]
    });

    openapi_spec["paths"]["/healthz"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "operationId": "healthz",
            "responses": {
                "200": {
                    "description": "OK",
                    "content": { "text/plain": { "schema": { "type": "string" } } }
                }
            }
        }
    });

    for module in registry.modules() {
        let Some(module_spec) = module.openapi() else {
            continue;
        };
        let base_path = module.base_path();

        if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths {
                let full_path = join_paths(&[api_prefix, &base_path, path]);
                openapi_spec["paths"][full_path] = path_item.clone();
            }
        }

        if let Some(schemas) = module_spec
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (schema_name, schema_def) in schemas {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }
    }

    openapi_spec
}

/// `"/api"`, `"/events"`, `"/"` -> `"/api/events"`
fn join_paths(parts: &[&str]) -> String {
    let joined: String = parts
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .map(|part| format!("/{part}"))
        .collect();
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

fn normalize_prefix(prefix: String) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Request ID generator producing time-ordered UUIDs
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}
