use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera, Value};

const DEFAULT_CLIP_CHARS: usize = 1000;

/// Marker appended to clipped excerpts.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Template engine for rendering payload layers.
pub(crate) struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Creates a new template engine with the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns an error if template registration fails.
    pub(crate) fn new() -> Result<Self> {
        let mut tera = Tera::default();

        Self::register_builtin_templates(&mut tera)?;
        Self::register_filters(&mut tera);

        Ok(Self { tera })
    }

    /// Registers built-in templates for each payload layer.
    fn register_builtin_templates(tera: &mut Tera) -> Result<()> {
        tera.add_raw_templates(vec![
            ("preamble", include_str!("../templates/preamble.tera")),
            ("full", include_str!("../templates/full.tera")),
            ("layer1", include_str!("../templates/layer1.tera")),
            ("layer2", include_str!("../templates/layer2.tera")),
        ])
        .map_err(|e| Error::template("builtin", e))
    }

    /// Registers custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        tera.register_filter("clip_chars", Self::clip_chars_filter);
    }

    /// Keeps the first `max` characters and appends [`TRUNCATION_MARKER`]
    /// when anything was cut.
    fn clip_chars_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let max = args
            .get("max")
            .and_then(Value::as_u64)
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(DEFAULT_CLIP_CHARS);

        match value.as_str() {
            Some(s) => Ok(Value::String(clip_chars(s, max))),
            None => Ok(value.clone()),
        }
    }

    /// Renders a named template with `context` bound to `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub(crate) fn render(&self, template: &str, context: &impl Serialize) -> Result<String> {
        let mut tera_context = Context::new();
        tera_context.insert("ctx", context);

        self.tera
            .render(template, &tera_context)
            .map_err(|e| Error::template(template, e))
    }
}

/// Clips `text` to `max` characters, marking the cut.
pub(crate) fn clip_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}\n{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
