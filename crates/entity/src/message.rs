use std::io::Read;

use {
    base64::{Engine as _, engine::general_purpose::STANDARD as BASE64},
    bytes::Bytes,
    flate2::read::{GzDecoder, ZlibDecoder},
    serde::{Deserialize, Deserializer, Serialize, Serializer},
};

use crate::{
    Error, Result,
    types::{Compression, Encoding, Format},
};

/// Resolved content ready to hand to a channel.
///
/// Immutable once built. The body is absent when the definition had no
/// content or referenced a missing file or store key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    encoding: Encoding,
    format: Format,
    compression: Compression,
    body: Option<Bytes>,
}

impl Message {
    pub fn new(
        encoding: Encoding,
        format: Format,
        compression: Compression,
        body: Option<Bytes>,
    ) -> Self {
        Self {
            encoding,
            format,
            compression,
            body,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(
            Encoding::Text,
            Format::Text,
            Compression::None,
            Some(Bytes::from(text.into())),
        )
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Self::new(
            Encoding::Binary,
            Format::Text,
            Compression::None,
            Some(bytes.into()),
        )
    }

    pub fn empty() -> Self {
        Self::new(Encoding::Text, Format::Text, Compression::None, None)
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn is_binary(&self) -> bool {
        self.encoding == Encoding::Binary
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Raw payload; empty when there is no body.
    pub fn bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }

    /// Payload decoded as UTF-8, replacing invalid sequences.
    pub fn body_as_string(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Text payloads as-is, binary payloads base64-encoded.
    pub fn to_wire_string(&self) -> String {
        match (&self.body, self.encoding) {
            (None, _) => String::new(),
            (Some(body), Encoding::Binary) => BASE64.encode(body),
            (Some(body), Encoding::Text) => String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// Undo the declared compression.
    pub fn decompressed(&self) -> Result<Bytes> {
        let body = self.bytes();
        let mut out = Vec::new();
        match self.compression {
            Compression::None => return Ok(Bytes::copy_from_slice(body)),
            Compression::Gzip => GzDecoder::new(body).read_to_end(&mut out),
            Compression::Deflate => ZlibDecoder::new(body).read_to_end(&mut out),
        }
        .map_err(|e| Error::decompress(self.compression, e))?;
        Ok(Bytes::from(out))
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire_string())
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Message::text)
    }
}
