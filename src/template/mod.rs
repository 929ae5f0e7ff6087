//! Template domain: layouts, templates, attachment references, the
//! substitution engine and the composer that renders messages.

mod composer;
mod store;
mod substitution;
mod types;

pub use composer::{Composer, RenderedMessage, CONTENT_PLACEHOLDER};
pub use store::{create_template_store, TemplateStore};
pub use substitution::{substitute, unresolved_tokens, SubstitutionMode};
pub use types::{
    AttachmentRef, Layout, NewAttachmentRef, NewLayout, NewTemplate, Template, TemplateError,
    TemplateResult, UpdateLayoutRequest, UpdateTemplateRequest,
};
