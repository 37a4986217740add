//! Cached extraction of name, place and dates from one raw listing.

use std::sync::Arc;

use crate::cache::{ExtractionCache, Lookup};
use crate::decode::{self, DecodeError, Payload};
use crate::gazetteer::Gazetteer;
use crate::generator::{ChunkSink, TextGenerator, TransportError};
use crate::name::{normalize_name, restore_name};
use crate::place::normalize_place;
use crate::prompt::InstructionTemplate;
use crate::{COUNTRY_INFERRED_NOTE, ExtractionResult};

/// Drives the generator for a raw listing and normalizes what comes back.
/// Results are memoized per exact raw string.
pub struct Extractor {
    generator: Arc<dyn TextGenerator>,
    cache: Arc<ExtractionCache>,
    gazetteer: Arc<Gazetteer>,
    template: InstructionTemplate,
}

impl Extractor {
    pub fn new(generator: Arc<dyn TextGenerator>, gazetteer: Arc<Gazetteer>) -> Self {
        Self {
            generator,
            cache: Arc::new(ExtractionCache::new()),
            gazetteer,
            template: InstructionTemplate::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<ExtractionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_template(mut self, template: InstructionTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn cache(&self) -> &Arc<ExtractionCache> {
        &self.cache
    }

    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    /// Extract `raw`, calling the generator only on a cache miss.
    ///
    /// Decoder failures produce a cached fallback result; transport failures
    /// are returned and leave the cache untouched.
    pub async fn extract(
        &self,
        raw: &str,
        on_chunk: Option<&ChunkSink<'_>>,
    ) -> Result<Lookup, TransportError> {
        self.cache
            .get_or_try_extract(raw, || async {
                let prompt = self.template.render(raw);
                let text = self.generator.generate(&prompt, on_chunk).await?;
                tracing::debug!(
                    generator = self.generator.name(),
                    chars = text.len(),
                    "completion received"
                );
                Ok::<_, TransportError>(self.interpret(raw, &text))
            })
            .await
    }

    /// Decode and normalize a completion for `raw`.
    pub fn interpret(&self, raw: &str, text: &str) -> ExtractionResult {
        match decode::decode(text) {
            Ok(payload) => self.normalize(raw, payload),
            Err(e) => {
                tracing::warn!(error = %e, raw, "falling back to raw listing");
                decode_fallback(raw, &e)
            }
        }
    }

    fn normalize(&self, raw: &str, payload: Payload) -> ExtractionResult {
        let name_source = if payload.name.trim().is_empty() {
            raw
        } else {
            payload.name.as_str()
        };
        let name = restore_name(raw, &normalize_name(name_source));

        let place = normalize_place(&payload.place, &self.gazetteer);

        let mut note = if self.template.keeps_note() {
            payload.note.trim().to_string()
        } else {
            String::new()
        };
        if place.country_inferred {
            if !note.is_empty() {
                note.push(' ');
            }
            note.push_str(COUNTRY_INFERRED_NOTE);
        }

        ExtractionResult {
            name,
            place: place.place,
            dates: payload.dates.trim().to_string(),
            note,
        }
    }
}

/// Result recorded when the completion could not be decoded: the raw
/// listing becomes the name so nothing is lost.
pub fn decode_fallback(raw: &str, err: &DecodeError) -> ExtractionResult {
    ExtractionResult {
        name: raw.to_string(),
        place: String::new(),
        dates: String::new(),
        note: err.fallback_note().to_string(),
    }
}
