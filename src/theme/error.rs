//! Template engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThemeError {
    /// No embedded template has this name
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Parse or render failure
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Embedded template is not valid UTF-8
    #[error("Template {0} is not valid UTF-8")]
    InvalidEncoding(String),
}
