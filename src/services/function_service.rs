//! services/function_service.rs
//! Funciones que el assistant puede invocar durante la llamada.

use std::collections::HashMap;

use serde_json::{json, Value};

type FunctionHandler = Box<dyn Fn(&Value) -> Value + Send + Sync>;

pub struct FunctionRegistry {
    handlers: HashMap<String, FunctionHandler>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        FunctionRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Registro con las funciones que usa el assistant en producción.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("check_availability", check_availability);
        registry
    }

    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
    }

    /// `None` si la función no existe.
    pub fn invoke(&self, name: &str, parameters: &Value) -> Option<Value> {
        self.handlers.get(name).map(|handler| handler(parameters))
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn check_availability(parameters: &Value) -> Value {
    let zona = parameters
        .get("zona")
        .and_then(|z| z.as_str())
        .map(str::trim)
        .filter(|z| !z.is_empty());

    let message = match zona {
        Some(zona) => format!("Abbiamo 3 appartamenti disponibili in zona {}", zona),
        None => "Abbiamo 3 appartamenti disponibili in quella zona".to_string(),
    };
    json!({
        "available": true,
        "message": message
    })
}
