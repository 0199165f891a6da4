use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use taskdesk_core::{
    DeskError, DeskMutation, DeskQuery, FunctionInfo, FunctionKind, MutationContext, QueryContext,
    Result,
};

/// A query erased to JSON in, JSON out.
pub type BoxedQueryFn = Arc<
    dyn Fn(&QueryContext, Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>>
        + Send
        + Sync,
>;

pub type BoxedMutationFn = Arc<
    dyn Fn(&MutationContext, Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>>
        + Send
        + Sync,
>;

pub enum FunctionEntry {
    Query {
        info: FunctionInfo,
        handler: BoxedQueryFn,
    },
    Mutation {
        info: FunctionInfo,
        handler: BoxedMutationFn,
    },
}

impl FunctionEntry {
    pub fn info(&self) -> &FunctionInfo {
        match self {
            FunctionEntry::Query { info, .. } => info,
            FunctionEntry::Mutation { info, .. } => info,
        }
    }

    pub fn kind(&self) -> FunctionKind {
        self.info().kind
    }
}

/// Decode call arguments. A missing or `null` body counts as `{}`.
fn parse_args<A: DeserializeOwned>(function: &str, args: Value) -> Result<A> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| DeskError::Validation(format!("Invalid arguments for '{}': {}", function, e)))
}

fn to_json<T: serde::Serialize>(output: T) -> Result<Value> {
    serde_json::to_value(output).map_err(|e| DeskError::Internal(e.to_string()))
}

/// Functions callable over RPC, by name.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionEntry>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_query<Q: DeskQuery>(&mut self)
    where
        Q::Args: 'static,
        Q::Output: 'static,
    {
        let info = Q::info();
        let name = info.name;

        let handler: BoxedQueryFn = Arc::new(move |ctx, args| {
            Box::pin(async move {
                let args: Q::Args = parse_args(name, args)?;
                to_json(Q::execute(ctx, args).await?)
            })
        });

        self.functions
            .insert(name.to_string(), FunctionEntry::Query { info, handler });
    }

    pub fn register_mutation<M: DeskMutation>(&mut self)
    where
        M::Args: 'static,
        M::Output: 'static,
    {
        let info = M::info();
        let name = info.name;

        let handler: BoxedMutationFn = Arc::new(move |ctx, args| {
            Box::pin(async move {
                let args: M::Args = parse_args(name, args)?;
                to_json(M::execute(ctx, args).await?)
            })
        });

        self.functions
            .insert(name.to_string(), FunctionEntry::Mutation { info, handler });
    }

    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Functions that require the given role.
    pub fn requiring_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.functions
            .iter()
            .filter(move |(_, entry)| entry.info().required_role == Some(role))
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdesk_core::ops::tasks::{CreateTask, ListTasks};
    use taskdesk_core::ops::NoArgs;

    #[test]
    fn test_empty_registry() {
        let registry = FunctionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("list_tasks").is_none());
    }

    #[test]
    fn test_register_by_info_name() {
        let mut registry = FunctionRegistry::new();
        registry.register_query::<ListTasks>();
        registry.register_mutation::<CreateTask>();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("list_tasks").unwrap().kind(), FunctionKind::Query);
        assert_eq!(
            registry.get("create_task").unwrap().kind(),
            FunctionKind::Mutation
        );
    }

    #[test]
    fn test_null_args_mean_empty_object() {
        let _: NoArgs = parse_args("list_users", Value::Null).unwrap();
    }

    #[test]
    fn test_bad_args_are_validation_errors() {
        let result: Result<taskdesk_core::ops::ById> =
            parse_args("get_task", serde_json::json!({"id": "not-a-uuid"}));
        match result {
            Err(DeskError::Validation(msg)) => assert!(msg.contains("get_task")),
            other => panic!("expected validation error, got {:?}", other.map(|a| a.id)),
        }
    }
}
