//! Lazy decoding of a multi-document legacy pool file

use crate::MigrateError;
use crate::legacy::LegacyPoolEntry;
use serde::Deserialize;
use serde_yaml::Value;

/// Yields one [`LegacyPoolEntry`] per non-empty YAML document.
///
/// Empty documents (a bare `---`, or an empty file) are not entries.
/// Document indices in errors count every document, empty ones included.
pub struct LegacyPoolStream<'de> {
    documents: serde_yaml::Deserializer<'de>,
    index: usize,
}

impl<'de> LegacyPoolStream<'de> {
    pub fn new(input: &'de str) -> Self {
        Self {
            documents: serde_yaml::Deserializer::from_str(input),
            index: 0,
        }
    }
}

impl Iterator for LegacyPoolStream<'_> {
    type Item = Result<LegacyPoolEntry, MigrateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let document = self.documents.next()?;
            let index = self.index;
            self.index += 1;

            let decoded = Value::deserialize(document).and_then(|value| match value {
                Value::Null => Ok(None),
                value => serde_yaml::from_value(value).map(Some),
            });

            match decoded {
                Ok(None) => continue,
                Ok(Some(entry)) => return Some(Ok(entry)),
                Err(source) => return Some(Err(MigrateError::Decode { index, source })),
            }
        }
    }
}
