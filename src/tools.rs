//! Capability registry.
//!
//! A capability is a named, schema-described async handler. The registry is
//! what an orchestration layer consumes: it can list function declarations for
//! a model, call a capability with typed errors, or invoke it at the string
//! boundary where every failure becomes a one-line message.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::LookupError;

pub type CapabilityFuture = Pin<Box<dyn Future<Output = Result<String, LookupError>> + Send>>;
type Handler = Arc<dyn Fn(Value) -> CapabilityFuture + Send + Sync>;

#[derive(Clone)]
pub struct Capability {
    name: String,
    description: String,
    input_schema: Value,
    error_context: String,
    prefix_all_errors: bool,
    handler: Handler,
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

impl Capability {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, LookupError>> + Send + 'static,
    {
        let name = name.into();
        Self {
            error_context: format!("Error running {}", name),
            name,
            description: description.into(),
            input_schema,
            prefix_all_errors: false,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Label put in front of transport and parse errors at the string boundary.
    pub fn with_error_context(mut self, context: impl Into<String>) -> Self {
        self.error_context = context.into();
        self
    }

    /// Prefix every error kind with the context label, not only transport/parse.
    pub fn prefix_all_errors(mut self) -> Self {
        self.prefix_all_errors = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    pub fn render_error(&self, error: &LookupError) -> String {
        if self.prefix_all_errors {
            format!("{}: {}", self.error_context, error)
        } else {
            error.render(&self.error_context)
        }
    }

    pub async fn call(&self, args: Value) -> Result<String, LookupError> {
        (self.handler)(args).await
    }

    /// Gemini-style function declaration.
    pub fn declaration(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.input_schema,
        })
    }
}

/// Name-ordered collection of capabilities.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: BTreeMap<String, Capability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a capability with the same name was replaced.
    pub fn register(&mut self, capability: Capability) -> bool {
        let name = capability.name.clone();
        let replaced = self.capabilities.insert(name.clone(), capability).is_some();
        if replaced {
            warn!("Capability {} was registered twice; keeping the latest", name);
        }
        replaced
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.register(capability);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.capabilities.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn declarations(&self) -> Vec<Value> {
        self.capabilities.values().map(Capability::declaration).collect()
    }

    /// Typed call; unknown names are a `NotFound` error.
    pub async fn call(&self, name: &str, args: Value) -> Result<String, LookupError> {
        let capability = self
            .get(name)
            .ok_or_else(|| LookupError::not_found(format!("Unknown capability: {}", name)))?;
        capability.call(args).await
    }

    /// String boundary: never fails, errors come back as descriptive text.
    pub async fn invoke(&self, name: &str, args: Value) -> String {
        let Some(capability) = self.get(name) else {
            return format!("Unknown capability: {}", name);
        };
        debug!("Invoking capability {}", name);
        match capability.call(args).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Capability {} failed ({}): {}", name, e.kind(), e);
                capability.render_error(&e)
            }
        }
    }
}

/// Pull a required string argument out of a JSON object.
pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, LookupError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| LookupError::parse(format!("missing string argument '{}'", key)))
}

/// Schema for a capability taking one string argument.
pub fn single_string_schema(key: &str, description: &str) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        key.to_string(),
        json!({"type": "string", "description": description}),
    );
    json!({
        "type": "object",
        "properties": properties,
        "required": [key]
    })
}
