use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use taskdesk_core::{AuthContext, DeskError, FunctionKind, RequestMetadata, Result, Store};

use super::registry::FunctionRegistry;
use super::router::{FunctionRouter, RouteResult};

/// Runs routed calls under a timeout.
pub struct FunctionExecutor {
    router: FunctionRouter,
    default_timeout: Duration,
}

impl FunctionExecutor {
    pub fn new(
        registry: Arc<FunctionRegistry>,
        store: Arc<dyn Store>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            router: FunctionRouter::new(registry, store),
            default_timeout,
        }
    }

    pub async fn execute(
        &self,
        function_name: &str,
        args: Value,
        auth: AuthContext,
        request: RequestMetadata,
    ) -> Result<ExecutionResult> {
        let start = Instant::now();
        let limit = self.timeout_for(function_name);
        let request_id = request.request_id;

        let routed = timeout(limit, self.router.route(function_name, args, auth, request))
            .await
            .map_err(|_| {
                DeskError::Timeout(format!(
                    "Function '{}' timed out after {:?}",
                    function_name, limit
                ))
            })
            .and_then(|r| r);
        let duration = start.elapsed();

        match routed {
            Ok(RouteResult::Query(result)) | Ok(RouteResult::Mutation(result)) => {
                debug!(
                    function = function_name,
                    %request_id,
                    duration_ms = duration.as_millis() as u64,
                    "Function executed"
                );
                Ok(ExecutionResult {
                    function_name: function_name.to_string(),
                    function_kind: self
                        .router
                        .get_function_kind(function_name)
                        .unwrap_or(FunctionKind::Query),
                    result,
                    duration,
                })
            }
            Err(e) => {
                match &e {
                    DeskError::Sql(_)
                    | DeskError::Database(_)
                    | DeskError::Internal(_)
                    | DeskError::Io(_)
                    | DeskError::Timeout(_) => {
                        error!(function = function_name, %request_id, error = %e, "Function failed")
                    }
                    _ => warn!(function = function_name, %request_id, error = %e, "Function rejected"),
                }
                Err(e)
            }
        }
    }

    /// Per-function override from `FunctionInfo::timeout`, else the default.
    fn timeout_for(&self, function_name: &str) -> Duration {
        self.router
            .info(function_name)
            .and_then(|info| info.timeout)
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
    }

    pub fn has_function(&self, function_name: &str) -> bool {
        self.router.has_function(function_name)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionResult {
    pub function_name: String,
    #[serde(serialize_with = "kind_name")]
    pub function_kind: FunctionKind,
    pub result: Value,
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,
}

fn kind_name<S: serde::Serializer>(kind: &FunctionKind, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(kind)
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdesk_core::model::Role;
    use taskdesk_core::testing::seed_user;
    use taskdesk_core::MemoryStore;

    fn executor(store: Arc<MemoryStore>) -> FunctionExecutor {
        let mut registry = FunctionRegistry::new();
        crate::function::register_all(&mut registry);
        FunctionExecutor::new(Arc::new(registry), store, Duration::from_secs(5))
    }

    #[test]
    fn test_execution_result_serialization() {
        let result = ExecutionResult {
            function_name: "get_task".to_string(),
            function_kind: FunctionKind::Query,
            result: serde_json::json!({"id": "123"}),
            duration: Duration::from_millis(42),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration"], 42);
        assert_eq!(json["function_kind"], "query");
    }

    #[tokio::test]
    async fn test_execute_reports_kind() {
        let store = Arc::new(MemoryStore::new());
        let user = seed_user(store.as_ref(), "Grace", Role::User).await.unwrap();
        let exec = executor(store);

        let result = exec
            .execute(
                "get_task_status_counts",
                Value::Null,
                AuthContext::authenticated(user.id, vec!["USER".into()]),
                RequestMetadata::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.function_kind, FunctionKind::Query);
        assert_eq!(result.result["data"]["todo"], 0);
    }

    #[tokio::test]
    async fn test_execute_propagates_typed_errors() {
        let exec = executor(Arc::new(MemoryStore::new()));
        let err = exec
            .execute(
                "list_tasks",
                Value::Null,
                AuthContext::unauthenticated(),
                RequestMetadata::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeskError::Unauthorized(_)));
    }
}
