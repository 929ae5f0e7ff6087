//! Template composer: merges layout, template and variables into a
//! renderable message.

use std::sync::Arc;

use crate::config::RenderConfig;

use super::store::TemplateStore;
use super::substitution::{substitute, SubstitutionMode};
use super::types::{TemplateError, TemplateResult};

/// Token a layout shell must contain exactly once.
pub const CONTENT_PLACEHOLDER: &str = "{{content}}";

/// A fully substituted message ready for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
}

/// Composes rendered messages from stored templates.
///
/// Composition is a pure read: it never writes to the store and either
/// returns a complete `RenderedMessage` or an error, never a partial
/// result.
pub struct Composer {
    store: Arc<TemplateStore>,
    mode: SubstitutionMode,
}

impl Composer {
    pub fn new(store: Arc<TemplateStore>, config: &RenderConfig) -> Self {
        let mode = if config.strict_variables {
            SubstitutionMode::Strict
        } else {
            SubstitutionMode::Lenient
        };
        Self { store, mode }
    }

    /// Render a template with the given variables.
    ///
    /// `layout_override` takes precedence over the template's bound
    /// layout; pass `None` to use the binding as stored.
    pub fn compose(
        &self,
        template_id: &str,
        variables: &serde_json::Map<String, serde_json::Value>,
        layout_override: Option<&str>,
    ) -> TemplateResult<RenderedMessage> {
        let template = self.store.get_template(template_id)?;

        let layout_id = layout_override
            .map(str::to_string)
            .or_else(|| template.layout_id.clone());

        let subject = substitute(&template.subject, variables, self.mode)?;

        let html = match layout_id {
            Some(layout_id) => {
                let layout = self.store.get_layout(&layout_id)?;
                let found = layout.placeholder_count();
                if found != 1 {
                    return Err(TemplateError::MissingPlaceholder { layout_id, found });
                }
                // Insert the body first so layout-level variables get
                // substituted in the same pass
                let shell = layout.html.replace(CONTENT_PLACEHOLDER, &template.html);
                substitute(&shell, variables, self.mode)?
            }
            None => substitute(&template.html, variables, self.mode)?,
        };

        let text = match &template.text {
            Some(text) => Some(substitute(text, variables, self.mode)?),
            None => None,
        };

        Ok(RenderedMessage {
            subject,
            html,
            text,
        })
    }
}
