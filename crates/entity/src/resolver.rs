use {bytes::Bytes, tracing::debug};

use crate::{
    definition::{EntityDefinition, EntitySource, MessageDefinition},
    message::Message,
    store::{StoreAccess, StoreValue},
    types::{Compression, Format},
};

/// Defaults applied to definitions that leave a field unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDefaults {
    pub format: Format,
    pub compression: Compression,
    pub charset: String,
}

impl Default for EntityDefaults {
    fn default() -> Self {
        Self {
            format: Format::Text,
            compression: Compression::None,
            charset: "utf-8".into(),
        }
    }
}

/// Turns entity definitions into messages.
///
/// Resolution is infallible: a missing store, file or key yields a message
/// with no body. Compression tags pass through untouched.
#[derive(Debug, Clone, Default)]
pub struct EntityResolver {
    defaults: EntityDefaults,
}

impl EntityResolver {
    pub fn new(defaults: EntityDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &EntityDefaults {
        &self.defaults
    }

    pub fn resolve_message(
        &self,
        definition: &MessageDefinition,
        stores: Option<&dyn StoreAccess>,
    ) -> Message {
        self.resolve(&definition.body, stores)
    }

    pub fn resolve(&self, definition: &EntityDefinition, stores: Option<&dyn StoreAccess>) -> Message {
        let compression = definition
            .compression()
            .unwrap_or(self.defaults.compression);
        let mut format = definition.format().unwrap_or(self.defaults.format);

        let body = match definition.source() {
            EntitySource::Empty => None,
            EntitySource::Text(text) => Some(self.encode_text(text, definition.charset())),
            EntitySource::Json(value) => Some(Bytes::from(value.to_string())),
            EntitySource::Binary(bytes) => Some(bytes.clone()),
            EntitySource::File(path) => {
                let value = stores
                    .and_then(|s| s.files())
                    .and_then(|files| files.get(path));
                if value.is_none() {
                    debug!(path, "file reference resolved to no content");
                }
                self.value_to_bytes(value, definition, &mut format)
            },
            EntitySource::Store { store, key } => {
                let value = stores
                    .and_then(|s| s.store(store))
                    .and_then(|named| named.get(key));
                if value.is_none() {
                    debug!(store, key, "store reference resolved to no content");
                }
                self.value_to_bytes(value, definition, &mut format)
            },
        };

        Message::new(definition.encoding(), format, compression, body)
    }

    fn value_to_bytes(
        &self,
        value: Option<StoreValue>,
        definition: &EntityDefinition,
        format: &mut Format,
    ) -> Option<Bytes> {
        match value? {
            StoreValue::Bytes(bytes) => Some(bytes),
            StoreValue::Object(object) => {
                if definition.format().is_none() {
                    *format = Format::Json;
                }
                Some(Bytes::from(object.to_string()))
            },
        }
    }

    fn encode_text(&self, text: &str, charset: Option<&str>) -> Bytes {
        let label = charset.unwrap_or(&self.defaults.charset);
        let encoding = encoding_rs::Encoding::for_label(label.as_bytes()).unwrap_or_else(|| {
            debug!(charset = label, "unknown charset, using utf-8");
            encoding_rs::UTF_8
        });
        if encoding == encoding_rs::UTF_8 {
            return Bytes::copy_from_slice(text.as_bytes());
        }
        let (encoded, _, _) = encoding.encode(text);
        Bytes::copy_from_slice(&encoded)
    }
}
