//! Page templates
//!
//! The site's tera templates are embedded in the binary with rust-embed and
//! parsed once at startup. Base templates are registered first so that
//! `{% extends %}` chains resolve.

use rust_embed::RustEmbed;
use serde::Serialize;
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ThemeError;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct Templates;

/// Renders the embedded page templates
pub struct PageRenderer {
    tera: Tera,
}

impl PageRenderer {
    /// Parse every embedded template
    pub fn new() -> Result<Self, ThemeError> {
        let mut templates: Vec<(String, String)> = Vec::new();
        for name in Templates::iter() {
            let file = Templates::get(&name).ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
            let content = String::from_utf8(file.data.into_owned())
                .map_err(|_| ThemeError::InvalidEncoding(name.to_string()))?;
            templates.push((name.to_string(), content));
        }

        Self::from_templates(templates)
    }

    /// Build a renderer from `(name, source)` pairs
    pub fn from_templates(mut templates: Vec<(String, String)>) -> Result<Self, ThemeError> {
        templates.sort_by(|a, b| {
            let a_is_base = is_base(&a.0);
            let b_is_base = is_base(&b.0);
            b_is_base.cmp(&a_is_base).then_with(|| a.0.cmp(&b.0))
        });

        let mut tera = Tera::default();
        for (name, content) in &templates {
            tera.add_raw_template(name, content)
                .map_err(|e| ThemeError::TemplateError(format!("{}: {}", name, describe(&e))))?;
        }
        tera.build_inheritance_chains()
            .map_err(|e| ThemeError::TemplateError(describe(&e)))?;

        tracing::debug!(count = templates.len(), "Page templates loaded");
        Ok(Self { tera })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render `name` with a serializable context
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, ThemeError> {
        if !self.has_template(name) {
            return Err(ThemeError::NotFound(name.to_string()));
        }
        let context = TeraContext::from_serialize(data)
            .map_err(|e| ThemeError::TemplateError(describe(&e)))?;

        self.tera
            .render(name, &context)
            .map_err(|e| ThemeError::TemplateError(describe(&e)))
    }
}

fn is_base(name: &str) -> bool {
    name == "base.html" || name.ends_with("/base.html")
}

/// Tera nests the useful message in the error source chain
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
