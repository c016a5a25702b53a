use {
    base64::{Engine as _, engine::general_purpose::STANDARD as BASE64},
    bytes::Bytes,
    serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _},
    serde_json::Value,
};

use crate::{
    Error, Result,
    error::Context,
    types::{Compression, Encoding, Format},
};

/// Where the content of an entity comes from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EntitySource {
    /// No content configured.
    #[default]
    Empty,
    Text(String),
    /// Structured JSON, serialized at resolution time.
    Json(Value),
    Binary(Bytes),
    /// Logical path in the files store.
    File(String),
    /// Key in a named blob or object store.
    Store { store: String, key: String },
}

/// Declarative, unresolved message content.
///
/// Unset format, compression and charset fall back to the resolver's
/// configured defaults. Serializes as a bare string for plain inline text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDefinition {
    encoding: Encoding,
    format: Option<Format>,
    compression: Option<Compression>,
    charset: Option<String>,
    source: EntitySource,
}

impl EntityDefinition {
    pub fn builder() -> EntityDefinitionBuilder {
        EntityDefinitionBuilder::default()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            source: EntitySource::Text(text.into()),
            ..Self::default()
        }
    }

    /// JSON content. A bare string value is kept as text, and `null` as
    /// empty content, so the definition reads back unchanged.
    pub fn json(value: Value) -> Self {
        Self {
            format: Some(Format::Json),
            source: EntitySource::Json(value),
            ..Self::default()
        }
        .normalized()
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Self {
            encoding: Encoding::Binary,
            source: EntitySource::Binary(bytes.into()),
            ..Self::default()
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self {
            source: EntitySource::File(path.into()),
            ..Self::default()
        }
    }

    pub fn store(store: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            source: EntitySource::Store {
                store: store.into(),
                key: key.into(),
            },
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Mark the content as raw bytes. Inline text or JSON becomes its
    /// UTF-8 bytes; file and store references are read as bytes.
    pub fn as_binary(mut self) -> Self {
        self.encoding = Encoding::Binary;
        self.normalized()
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn format(&self) -> Option<Format> {
        self.format
    }

    pub fn compression(&self) -> Option<Compression> {
        self.compression
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn source(&self) -> &EntitySource {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.source, EntitySource::Empty)
    }

    /// Canonical source for the encoding, matching what the wire form can
    /// carry.
    fn normalized(mut self) -> Self {
        let source = match std::mem::take(&mut self.source) {
            EntitySource::Json(Value::Null) => EntitySource::Empty,
            EntitySource::Json(Value::String(text)) => EntitySource::Text(text),
            other => other,
        };
        self.source = match (self.encoding, source) {
            (Encoding::Binary, EntitySource::Text(text)) => EntitySource::Binary(Bytes::from(text)),
            (Encoding::Binary, EntitySource::Json(value)) => {
                EntitySource::Binary(Bytes::from(value.to_string()))
            },
            (_, source) => source,
        };
        self
    }

    fn is_plain_text(&self) -> bool {
        matches!(self.source, EntitySource::Text(_))
            && self.encoding == Encoding::Text
            && self.format.is_none()
            && self.compression.is_none()
            && self.charset.is_none()
    }
}

/// Validating builder: at most one of inline data, file path or store
/// reference may be set.
#[derive(Debug, Clone, Default)]
pub struct EntityDefinitionBuilder {
    encoding: Option<Encoding>,
    format: Option<Format>,
    compression: Option<Compression>,
    charset: Option<String>,
    data: Option<EntitySource>,
    file_path: Option<String>,
    store: Option<(String, String)>,
}

impl EntityDefinitionBuilder {
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.data = Some(EntitySource::Text(text.into()));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.data = Some(EntitySource::Json(value));
        self
    }

    pub fn binary(mut self, bytes: impl Into<Bytes>) -> Self {
        self.data = Some(EntitySource::Binary(bytes.into()));
        self
    }

    pub fn file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn store_ref(mut self, store: impl Into<String>, key: impl Into<String>) -> Self {
        self.store = Some((store.into(), key.into()));
        self
    }

    pub fn build(self) -> Result<EntityDefinition> {
        let sources = usize::from(self.data.is_some())
            + usize::from(self.file_path.is_some())
            + usize::from(self.store.is_some());
        if sources > 1 {
            return Err(Error::invalid_input(
                "only one of data, filePath or dataStore/dataRef may be set",
            ));
        }

        let source = match (self.data, self.file_path, self.store) {
            (Some(data), _, _) => data,
            (_, Some(path), _) => EntitySource::File(path),
            (_, _, Some((store, key))) => EntitySource::Store { store, key },
            (None, None, None) => EntitySource::Empty,
        };

        let encoding = match (&source, self.encoding) {
            (EntitySource::Binary(_), _) => Encoding::Binary,
            (_, Some(encoding)) => encoding,
            (_, None) => Encoding::Text,
        };

        let format = match (&source, self.format) {
            (EntitySource::Json(_), None) => Some(Format::Json),
            (_, format) => format,
        };

        Ok(EntityDefinition {
            encoding,
            format,
            compression: self.compression,
            charset: self.charset,
            source,
        }
        .normalized())
    }
}

// ── Wire form ───────────────────────────────────────────────────────────────

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encoding: Option<Encoding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<Format>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    compression: Option<Compression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_store: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_ref: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireForm {
    Bare(String),
    Object(WireEntity),
}

impl WireEntity {
    fn into_definition(self) -> Result<EntityDefinition> {
        let mut builder = EntityDefinition::builder();
        if let Some(encoding) = self.encoding {
            builder = builder.encoding(encoding);
        }
        if let Some(format) = self.format {
            builder = builder.format(format);
        }
        if let Some(compression) = self.compression {
            builder = builder.compression(compression);
        }
        if let Some(charset) = self.charset {
            builder = builder.charset(charset);
        }

        builder = match (self.data, self.encoding) {
            (None | Some(Value::Null), _) => builder,
            (Some(Value::String(data)), Some(Encoding::Binary)) => {
                let bytes = BASE64
                    .decode(data.as_bytes())
                    .context("binary data is not base64")?;
                builder.binary(bytes)
            },
            (Some(Value::String(text)), _) => builder.text(text),
            (Some(_), Some(Encoding::Binary)) => {
                return Err(Error::invalid_input("binary data must be a base64 string"));
            },
            (Some(value), _) => builder.json(value),
        };

        if let Some(path) = self.file_path {
            builder = builder.file_path(path);
        }

        match (self.data_store, self.data_ref) {
            (Some(store), Some(key)) => builder = builder.store_ref(store, key),
            (None, None) => {},
            _ => {
                return Err(Error::invalid_input(
                    "dataStore and dataRef must be set together",
                ));
            },
        }

        builder.build()
    }

    fn from_definition(definition: &EntityDefinition) -> Self {
        let mut wire = WireEntity {
            encoding: (definition.encoding == Encoding::Binary).then_some(Encoding::Binary),
            format: definition.format,
            compression: definition.compression,
            charset: definition.charset.clone(),
            ..WireEntity::default()
        };
        match &definition.source {
            EntitySource::Empty => {},
            EntitySource::Text(text) => wire.data = Some(Value::String(text.clone())),
            EntitySource::Json(value) => wire.data = Some(value.clone()),
            EntitySource::Binary(bytes) => wire.data = Some(Value::String(BASE64.encode(bytes))),
            EntitySource::File(path) => wire.file_path = Some(path.clone()),
            EntitySource::Store { store, key } => {
                wire.data_store = Some(store.clone());
                wire.data_ref = Some(key.clone());
            },
        }
        wire
    }
}

impl Serialize for EntityDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.is_plain_text()
            && let EntitySource::Text(text) = &self.source
        {
            return serializer.serialize_str(text);
        }
        WireEntity::from_definition(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EntityDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match WireForm::deserialize(deserializer)? {
            WireForm::Bare(text) => Ok(Self::text(text)),
            WireForm::Object(wire) => wire.into_definition().map_err(D::Error::custom),
        }
    }
}

// ── MessageDefinition ───────────────────────────────────────────────────────

/// The declared body of an outbound message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageDefinition {
    #[serde(default, skip_serializing_if = "EntityDefinition::is_empty")]
    pub body: EntityDefinition,
}

impl MessageDefinition {
    pub fn new(body: EntityDefinition) -> Self {
        Self { body }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(EntityDefinition::text(text))
    }

    pub fn json(value: Value) -> Self {
        Self::new(EntityDefinition::json(value))
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Self::new(EntityDefinition::binary(bytes))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn builder_rejects_multiple_sources() {
        let err = EntityDefinition::builder()
            .text("hi")
            .file_path("greeting.txt")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));

        let err = EntityDefinition::builder()
            .file_path("a.txt")
            .store_ref("blobs", "a")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("only one of"));
    }

    #[test]
    fn builder_with_nothing_is_empty() {
        assert!(EntityDefinition::builder().build().unwrap().is_empty());
    }

    #[test]
    fn plain_text_serializes_as_bare_string() {
        let json = serde_json::to_value(EntityDefinition::text("pong")).unwrap();
        assert_eq!(json, json!("pong"));
        let back: EntityDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, EntityDefinition::text("pong"));
    }

    #[test]
    fn non_default_fields_use_object_form() {
        let def = EntityDefinition::text("<p/>").with_format(Format::Html);
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json, json!({"format": "html", "data": "<p/>"}));
    }

    #[test]
    fn binary_uses_base64() {
        let def = EntityDefinition::binary(vec![1u8, 2, 3]);
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json, json!({"encoding": "binary", "data": "AQID"}));
        let back: EntityDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn store_reference_round_trips() {
        let def = EntityDefinition::store("blobs", "greeting").with_compression(Compression::Gzip);
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(
            json,
            json!({"compression": "gzip", "dataStore": "blobs", "dataRef": "greeting"})
        );
        let back: EntityDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn json_object_data_stays_structured() {
        let def: EntityDefinition = serde_json::from_value(json!({"data": {"a": 1}})).unwrap();
        assert_eq!(def.format(), Some(Format::Json));
        assert_eq!(def.source(), &EntitySource::Json(json!({"a": 1})));
    }

    #[test]
    fn wire_rejects_conflicting_sources() {
        let err = serde_json::from_value::<EntityDefinition>(
            json!({"data": "x", "filePath": "x.txt"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("only one of"));

        let err =
            serde_json::from_value::<EntityDefinition>(json!({"dataStore": "blobs"})).unwrap_err();
        assert!(err.to_string().contains("dataRef"));
    }

    #[test]
    fn json_string_reads_back_as_text() {
        let def = EntityDefinition::json(json!("hello"));
        assert_eq!(def.source(), &EntitySource::Text("hello".into()));
        assert_eq!(def.format(), Some(Format::Json));
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json, json!({"format": "json", "data": "hello"}));
        let back: EntityDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, def);

        assert!(EntityDefinition::json(Value::Null).is_empty());
    }

    #[test]
    fn inline_text_marked_binary_becomes_bytes() {
        let def = EntityDefinition::text("hello!").as_binary();
        assert_eq!(def.source(), &EntitySource::Binary(Bytes::from_static(b"hello!")));
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json, json!({"encoding": "binary", "data": "aGVsbG8h"}));
        let back: EntityDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, def);

        let built = EntityDefinition::builder()
            .encoding(Encoding::Binary)
            .json(json!({"a": 1}))
            .build()
            .unwrap();
        assert_eq!(built.source(), &EntitySource::Binary(Bytes::from_static(b"{\"a\":1}")));
        let back: EntityDefinition =
            serde_json::from_value(serde_json::to_value(&built).unwrap()).unwrap();
        assert_eq!(back, built);
    }

    #[test]
    fn malformed_base64_is_reported() {
        let err = serde_json::from_value::<EntityDefinition>(
            json!({"encoding": "binary", "data": "hello!"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("binary data is not base64"));
    }

    #[test]
    fn binary_file_reference_stays_a_reference() {
        let def = EntityDefinition::file("blob.bin").as_binary();
        assert_eq!(def.source(), &EntitySource::File("blob.bin".into()));
        let back: EntityDefinition =
            serde_json::from_value(serde_json::to_value(&def).unwrap()).unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn message_definition_omits_empty_body() {
        let json = serde_json::to_value(MessageDefinition::default()).unwrap();
        assert_eq!(json, json!({}));
        let def: MessageDefinition = serde_json::from_value(json!({"body": "hi"})).unwrap();
        assert_eq!(def, MessageDefinition::text("hi"));
    }
}
