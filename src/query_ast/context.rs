use serde_json::{Map, Value};

use crate::config::TranslatorConfig;

/// Everything one translation needs besides the schema and the request.
///
/// Built once per request and passed by reference into every factory and
/// emitter function; never mutated during translation.
#[derive(Debug, Clone, Default)]
pub struct TranslationContext {
    /// Verified JWT claims; `None` when the request carries no token
    pub jwt: Option<Map<String, Value>>,
    pub config: TranslatorConfig,
}

impl TranslationContext {
    pub fn new(config: TranslatorConfig) -> Self {
        TranslationContext { jwt: None, config }
    }

    pub fn with_jwt(mut self, claims: Map<String, Value>) -> Self {
        self.jwt = Some(claims);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.jwt.is_some()
    }

    /// Claims as a parameter value; an absent token is an empty object so
    /// that every `$jwt.<claim>` evaluates to null.
    pub fn jwt_param(&self) -> Value {
        Value::Object(self.jwt.clone().unwrap_or_default())
    }
}
