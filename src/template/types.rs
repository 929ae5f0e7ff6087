//! Template domain types and error definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Template-domain error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Layout not found: {0}")]
    LayoutNotFound(String),

    #[error("Template already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Layout {layout_id} must contain the content placeholder exactly once (found {found})")]
    MissingPlaceholder { layout_id: String, found: usize },

    #[error("Unresolved variable: {0}")]
    UnresolvedVariable(String),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// A reusable HTML shell wrapping rendered template bodies.
///
/// The shell must contain the content placeholder exactly once; this is
/// checked both on save and again at composition time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    /// Unique layout identifier (alphanumeric, dash, underscore)
    pub id: String,

    /// Human-readable layout name
    pub name: String,

    /// HTML shell with a single {{content}} placeholder
    pub html: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// A named message definition, optionally bound to a layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Unique template identifier (alphanumeric, dash, underscore)
    pub id: String,

    /// Human-readable template name
    pub name: String,

    /// Layout to wrap the rendered HTML body in (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_id: Option<String>,

    /// Subject line with {{variable}} placeholders
    pub subject: String,

    /// HTML body with {{variable}} placeholders
    pub html: String,

    /// Plain-text body with {{variable}} placeholders (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Declared variable names, for operator tooling
    #[serde(default)]
    pub variables: Vec<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// An attachment reference owned by a template.
///
/// `content_key` points into the blob store; the bytes are resolved just
/// before dispatch, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: Uuid,

    /// Owning template
    pub template_id: String,

    /// Filename presented to the recipient
    pub filename: String,

    /// Key of the content blob in the blob store
    pub content_key: String,

    /// MIME type, e.g. "application/pdf"
    pub mime_type: String,
}

fn validate_id(id: &str) -> TemplateResult<()> {
    if id.is_empty() || id.len() > 64 {
        return Err(TemplateError::InvalidId(
            "ID must be 1-64 characters".to_string(),
        ));
    }

    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(TemplateError::InvalidId(
            "ID must contain only alphanumeric, dash, or underscore".to_string(),
        ));
    }

    Ok(())
}

impl Layout {
    /// Number of content placeholder occurrences in the shell.
    pub fn placeholder_count(&self) -> usize {
        self.html.matches(super::CONTENT_PLACEHOLDER).count()
    }

    /// Validate the layout
    pub fn validate(&self) -> TemplateResult<()> {
        validate_id(&self.id)?;

        if self.name.is_empty() || self.name.len() > 256 {
            return Err(TemplateError::InvalidLayout(
                "Name must be 1-256 characters".to_string(),
            ));
        }

        let found = self.placeholder_count();
        if found != 1 {
            return Err(TemplateError::MissingPlaceholder {
                layout_id: self.id.clone(),
                found,
            });
        }

        Ok(())
    }
}

impl Template {
    /// Validate the template
    pub fn validate(&self) -> TemplateResult<()> {
        validate_id(&self.id)?;

        if self.name.is_empty() || self.name.len() > 256 {
            return Err(TemplateError::InvalidTemplate(
                "Name must be 1-256 characters".to_string(),
            ));
        }

        if self.subject.is_empty() {
            return Err(TemplateError::InvalidTemplate(
                "Subject must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Request to create a layout
#[derive(Debug, Deserialize)]
pub struct NewLayout {
    pub id: String,
    pub name: String,
    pub html: String,
}

impl From<NewLayout> for Layout {
    fn from(req: NewLayout) -> Self {
        let now = Utc::now();
        Layout {
            id: req.id,
            name: req.name,
            html: req.html,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to create a template
#[derive(Debug, Deserialize)]
pub struct NewTemplate {
    pub id: String,
    pub name: String,
    pub layout_id: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
    #[serde(default)]
    pub variables: Vec<String>,
}

impl From<NewTemplate> for Template {
    fn from(req: NewTemplate) -> Self {
        let now = Utc::now();
        Template {
            id: req.id,
            name: req.name,
            layout_id: req.layout_id,
            subject: req.subject,
            html: req.html,
            text: req.text,
            variables: req.variables,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to register an attachment reference on a template
#[derive(Debug, Deserialize)]
pub struct NewAttachmentRef {
    pub template_id: String,
    pub filename: String,
    pub content_key: String,
    pub mime_type: String,
}

/// Request to update an existing layout
#[derive(Debug, Default, Deserialize)]
pub struct UpdateLayoutRequest {
    pub name: Option<String>,
    pub html: Option<String>,
}

/// Request to update an existing template
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    /// Use Some(None) to unbind the layout
    pub layout_id: Option<Option<String>>,
    pub subject: Option<String>,
    pub html: Option<String>,
    /// Use Some(None) to clear the text body
    pub text: Option<Option<String>>,
    pub variables: Option<Vec<String>>,
}
