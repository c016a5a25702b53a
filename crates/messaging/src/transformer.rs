use std::{collections::HashMap, fmt, sync::Arc};

use {
    serde_json::{Map, Value},
    stubwire_entity::{Message, MessageDefinition},
    stubwire_matching::Request,
};

use crate::mapping::MessageStubMapping;

/// What a transformer may consult while rewriting an outbound message.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub stub: &'a MessageStubMapping,
    /// The inbound message, when the stub was triggered by one.
    pub incoming: Option<&'a Message>,
    /// The request that opened the originating channel, or the HTTP request
    /// that fired the trigger.
    pub request: Option<&'a Request>,
    pub parameters: &'a Map<String, Value>,
}

/// Rewrites a message definition before it is resolved and sent.
pub trait MessageActionTransformer: Send + Sync {
    fn name(&self) -> &str;

    /// Applied to every send action, whether or not it names this transformer.
    fn applies_globally(&self) -> bool {
        false
    }

    fn transform(&self, message: MessageDefinition, context: &TransformContext<'_>) -> MessageDefinition;
}

/// Registered transformers, applied in registration order.
#[derive(Clone, Default)]
pub struct Transformers {
    ordered: Vec<Arc<dyn MessageActionTransformer>>,
    by_name: HashMap<String, usize>,
}

impl Transformers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, transformer: Arc<dyn MessageActionTransformer>) {
        let name = transformer.name().to_string();
        match self.by_name.get(&name) {
            Some(&index) => self.ordered[index] = transformer,
            None => {
                self.by_name.insert(name, self.ordered.len());
                self.ordered.push(transformer);
            },
        }
    }

    pub fn with(mut self, transformer: Arc<dyn MessageActionTransformer>) -> Self {
        self.register(transformer);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn MessageActionTransformer>> {
        self.by_name.get(name).and_then(|&i| self.ordered.get(i))
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Global transformers first, then the requested ones in request order.
    /// Unknown names are skipped.
    pub fn select<'a>(&'a self, requested: &'a [String]) -> impl Iterator<Item = &'a Arc<dyn MessageActionTransformer>> {
        let global = self.ordered.iter().filter(|t| t.applies_globally());
        let named = requested
            .iter()
            .filter_map(|name| self.get(name))
            .filter(|t| !t.applies_globally());
        global.chain(named)
    }

    pub fn apply(
        &self,
        requested: &[String],
        message: MessageDefinition,
        context: &TransformContext<'_>,
    ) -> MessageDefinition {
        self.select(requested)
            .fold(message, |message, t| t.transform(message, context))
    }
}

impl fmt::Debug for Transformers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.ordered.iter().map(|t| t.name()).collect();
        f.debug_struct("Transformers").field("names", &names).finish()
    }
}
