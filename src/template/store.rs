//! Layout, template and attachment-reference storage with CRUD operations.
//!
//! Saving an entity has no implicit side effects: no hooks fire, no
//! caches are invalidated. Derived actions are explicit calls made by
//! the operator.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::types::{
    AttachmentRef, Layout, NewAttachmentRef, Template, TemplateError, TemplateResult,
    UpdateLayoutRequest, UpdateTemplateRequest,
};

/// In-memory storage for layouts, templates and attachment references.
pub struct TemplateStore {
    layouts: DashMap<String, Layout>,
    templates: DashMap<String, Template>,
    attachments: DashMap<Uuid, AttachmentRef>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateStore {
    pub fn new() -> Self {
        Self {
            layouts: DashMap::new(),
            templates: DashMap::new(),
            attachments: DashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Layouts
    // ------------------------------------------------------------------

    /// Create a new layout
    pub fn create_layout(&self, layout: Layout) -> TemplateResult<Layout> {
        layout.validate()?;

        if self.layouts.contains_key(&layout.id) {
            return Err(TemplateError::AlreadyExists(layout.id));
        }

        self.layouts.insert(layout.id.clone(), layout.clone());
        Ok(layout)
    }

    /// Get a layout by ID
    pub fn get_layout(&self, id: &str) -> TemplateResult<Layout> {
        self.layouts
            .get(id)
            .map(|l| l.clone())
            .ok_or_else(|| TemplateError::LayoutNotFound(id.to_string()))
    }

    /// Update an existing layout
    pub fn update_layout(&self, id: &str, updates: UpdateLayoutRequest) -> TemplateResult<Layout> {
        let mut layout = self.get_layout(id)?;

        if let Some(name) = updates.name {
            layout.name = name;
        }
        if let Some(html) = updates.html {
            layout.html = html;
        }

        layout.updated_at = Utc::now();
        layout.validate()?;

        self.layouts.insert(id.to_string(), layout.clone());
        Ok(layout)
    }

    /// Delete a layout. Fails while any template is still bound to it.
    pub fn delete_layout(&self, id: &str) -> TemplateResult<()> {
        let in_use = self
            .templates
            .iter()
            .any(|t| t.layout_id.as_deref() == Some(id));
        if in_use {
            return Err(TemplateError::InvalidLayout(format!(
                "Layout {} is still referenced by a template",
                id
            )));
        }

        self.layouts
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| TemplateError::LayoutNotFound(id.to_string()))
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    /// Create a new template. A bound layout must already exist.
    pub fn create_template(&self, template: Template) -> TemplateResult<Template> {
        template.validate()?;

        if let Some(layout_id) = &template.layout_id {
            if !self.layouts.contains_key(layout_id) {
                return Err(TemplateError::LayoutNotFound(layout_id.clone()));
            }
        }

        if self.templates.contains_key(&template.id) {
            return Err(TemplateError::AlreadyExists(template.id));
        }

        self.templates
            .insert(template.id.clone(), template.clone());
        Ok(template)
    }

    /// Get a template by ID
    pub fn get_template(&self, id: &str) -> TemplateResult<Template> {
        self.templates
            .get(id)
            .map(|t| t.clone())
            .ok_or_else(|| TemplateError::TemplateNotFound(id.to_string()))
    }

    /// List all templates
    pub fn list_templates(&self) -> Vec<Template> {
        self.templates
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Update an existing template
    pub fn update_template(
        &self,
        id: &str,
        updates: UpdateTemplateRequest,
    ) -> TemplateResult<Template> {
        let mut template = self.get_template(id)?;

        if let Some(name) = updates.name {
            template.name = name;
        }
        if let Some(layout_id) = updates.layout_id {
            if let Some(ref layout_id) = layout_id {
                if !self.layouts.contains_key(layout_id) {
                    return Err(TemplateError::LayoutNotFound(layout_id.clone()));
                }
            }
            template.layout_id = layout_id;
        }
        if let Some(subject) = updates.subject {
            template.subject = subject;
        }
        if let Some(html) = updates.html {
            template.html = html;
        }
        if let Some(text) = updates.text {
            template.text = text;
        }
        if let Some(variables) = updates.variables {
            template.variables = variables;
        }

        template.updated_at = Utc::now();
        template.validate()?;

        self.templates.insert(id.to_string(), template.clone());
        Ok(template)
    }

    /// Delete a template along with its attachment references.
    pub fn delete_template(&self, id: &str) -> TemplateResult<()> {
        self.templates
            .remove(id)
            .ok_or_else(|| TemplateError::TemplateNotFound(id.to_string()))?;

        self.attachments.retain(|_, a| a.template_id != id);
        Ok(())
    }

    /// Check if a template exists
    pub fn template_exists(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    // ------------------------------------------------------------------
    // Attachment references
    // ------------------------------------------------------------------

    /// Register an attachment reference on an existing template.
    pub fn add_attachment(&self, req: NewAttachmentRef) -> TemplateResult<AttachmentRef> {
        if !self.templates.contains_key(&req.template_id) {
            return Err(TemplateError::TemplateNotFound(req.template_id));
        }

        if req.filename.is_empty() {
            return Err(TemplateError::InvalidTemplate(
                "Attachment filename must not be empty".to_string(),
            ));
        }

        let attachment = AttachmentRef {
            id: Uuid::new_v4(),
            template_id: req.template_id,
            filename: req.filename,
            content_key: req.content_key,
            mime_type: req.mime_type,
        };

        self.attachments.insert(attachment.id, attachment.clone());
        Ok(attachment)
    }

    /// Remove a single attachment reference.
    pub fn remove_attachment(&self, id: Uuid) -> TemplateResult<()> {
        self.attachments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| TemplateError::InvalidTemplate(format!("Attachment {} not found", id)))
    }

    /// Attachment references for a template, ordered by filename for a
    /// stable resolution order.
    pub fn attachments_for(&self, template_id: &str) -> Vec<AttachmentRef> {
        let mut refs: Vec<AttachmentRef> = self
            .attachments
            .iter()
            .filter(|a| a.template_id == template_id)
            .map(|a| a.clone())
            .collect();
        refs.sort_by(|a, b| a.filename.cmp(&b.filename));
        refs
    }
}

/// Create an Arc-wrapped template store
pub fn create_template_store() -> Arc<TemplateStore> {
    Arc::new(TemplateStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::types::{NewLayout, NewTemplate};

    fn sample_template(id: &str, layout_id: Option<&str>) -> Template {
        Template::from(NewTemplate {
            id: id.to_string(),
            name: format!("Template {}", id),
            layout_id: layout_id.map(str::to_string),
            subject: "Hi {{name}}".to_string(),
            html: "<p>Hello {{name}}</p>".to_string(),
            text: Some("Hello {{name}}".to_string()),
            variables: vec!["name".to_string()],
        })
    }

    fn sample_layout(id: &str) -> Layout {
        Layout::from(NewLayout {
            id: id.to_string(),
            name: format!("Layout {}", id),
            html: "<html><body>{{content}}</body></html>".to_string(),
        })
    }

    #[test]
    fn test_create_and_get_template() {
        let store = TemplateStore::new();
        store.create_template(sample_template("welcome", None)).unwrap();

        let retrieved = store.get_template("welcome").unwrap();
        assert_eq!(retrieved.name, "Template welcome");
    }

    #[test]
    fn test_create_template_with_unknown_layout_fails() {
        let store = TemplateStore::new();
        let result = store.create_template(sample_template("welcome", Some("missing")));
        assert!(matches!(result, Err(TemplateError::LayoutNotFound(_))));
    }

    #[test]
    fn test_create_duplicate_template() {
        let store = TemplateStore::new();
        store.create_template(sample_template("dup", None)).unwrap();
        assert!(matches!(
            store.create_template(sample_template("dup", None)),
            Err(TemplateError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_layout_without_placeholder_rejected_on_save() {
        let store = TemplateStore::new();
        let result = store.create_layout(Layout::from(NewLayout {
            id: "bare".to_string(),
            name: "Bare".to_string(),
            html: "<html></html>".to_string(),
        }));
        assert!(matches!(
            result,
            Err(TemplateError::MissingPlaceholder { .. })
        ));
    }

    #[test]
    fn test_delete_layout_in_use_fails() {
        let store = TemplateStore::new();
        store.create_layout(sample_layout("base")).unwrap();
        store
            .create_template(sample_template("welcome", Some("base")))
            .unwrap();

        assert!(store.delete_layout("base").is_err());

        store.delete_template("welcome").unwrap();
        store.delete_layout("base").unwrap();
    }

    #[test]
    fn test_delete_template_cascades_attachments() {
        let store = TemplateStore::new();
        store.create_template(sample_template("welcome", None)).unwrap();

        store
            .add_attachment(NewAttachmentRef {
                template_id: "welcome".to_string(),
                filename: "terms.pdf".to_string(),
                content_key: "blobs/terms".to_string(),
                mime_type: "application/pdf".to_string(),
            })
            .unwrap();
        assert_eq!(store.attachments_for("welcome").len(), 1);

        store.delete_template("welcome").unwrap();
        assert!(store.attachments_for("welcome").is_empty());
    }

    #[test]
    fn test_attachments_ordered_by_filename() {
        let store = TemplateStore::new();
        store.create_template(sample_template("welcome", None)).unwrap();

        for name in ["zeta.pdf", "alpha.pdf", "mid.pdf"] {
            store
                .add_attachment(NewAttachmentRef {
                    template_id: "welcome".to_string(),
                    filename: name.to_string(),
                    content_key: format!("blobs/{}", name),
                    mime_type: "application/pdf".to_string(),
                })
                .unwrap();
        }

        let names: Vec<String> = store
            .attachments_for("welcome")
            .into_iter()
            .map(|a| a.filename)
            .collect();
        assert_eq!(names, vec!["alpha.pdf", "mid.pdf", "zeta.pdf"]);
    }

    #[test]
    fn test_update_template_unbind_layout() {
        let store = TemplateStore::new();
        store.create_layout(sample_layout("base")).unwrap();
        store
            .create_template(sample_template("welcome", Some("base")))
            .unwrap();

        let updates = UpdateTemplateRequest {
            layout_id: Some(None),
            ..Default::default()
        };
        let updated = store.update_template("welcome", updates).unwrap();
        assert!(updated.layout_id.is_none());
    }
}
