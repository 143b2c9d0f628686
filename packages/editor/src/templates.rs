//! # Template Registry
//!
//! Templates turn a tag plus JSON props into a detached [`NodeTree`]. The
//! editor inserts that tree with fresh ids.
//!
//! Registries are plain values handed to the editor. [`TemplateRegistry::shared`]
//! is a process-wide default for application entry points; it is seeded with
//! the built-in templates and never cleared.
//!
//! Registering a tag twice replaces the first template. The replacement is
//! logged at `debug` and is not an error.

use crate::EditorError;
use kurbo::{Affine, Vec2};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use thiserror::Error;
use vellum_core::{Color, FontRef, NodeKind, NodeTree, Style};

/// A template rejected its props
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct TemplateError(pub String);

pub trait Template: Send + Sync {
    fn tag(&self) -> &str;

    fn build(&self, props: &Value) -> Result<NodeTree, TemplateError>;
}

/// Adapter so a closure can be registered as a template
pub struct FnTemplate<F> {
    tag: String,
    build: F,
}

impl<F> FnTemplate<F>
where
    F: Fn(&Value) -> Result<NodeTree, TemplateError> + Send + Sync,
{
    pub fn new(tag: impl Into<String>, build: F) -> Self {
        Self { tag: tag.into(), build }
    }
}

impl<F> Template for FnTemplate<F>
where
    F: Fn(&Value) -> Result<NodeTree, TemplateError> + Send + Sync,
{
    fn tag(&self) -> &str {
        &self.tag
    }

    fn build(&self, props: &Value) -> Result<NodeTree, TemplateError> {
        (self.build)(props)
    }
}

#[derive(Default)]
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, Arc<dyn Template>>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in `card` and `badge` templates
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(FnTemplate::new("card", build_card));
        registry.register(FnTemplate::new("badge", build_badge));
        registry
    }

    /// Process-wide registry for application entry points
    pub fn shared() -> Arc<TemplateRegistry> {
        static SHARED: OnceLock<Arc<TemplateRegistry>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(TemplateRegistry::with_builtins())).clone()
    }

    /// Register `template` under its tag. A previous template with the same
    /// tag is replaced.
    pub fn register(&self, template: impl Template + 'static) {
        let tag = template.tag().to_string();
        let mut templates = self.templates.write().unwrap_or_else(PoisonError::into_inner);
        if templates.insert(tag.clone(), Arc::new(template)).is_some() {
            tracing::debug!(tag = %tag, "template replaced");
        }
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn Template>> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tag)
            .cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(tag)
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.templates.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the tree for `tag`. The lock is released before the template runs.
    pub fn instantiate(&self, tag: &str, props: &Value) -> Result<NodeTree, EditorError> {
        let template = self
            .get(tag)
            .ok_or_else(|| EditorError::UnknownTemplate(tag.to_string()))?;
        template.build(props).map_err(|source| EditorError::TemplateError {
            tag: tag.to_string(),
            source,
        })
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry").field("tags", &self.tags()).finish()
    }
}

fn number_prop(props: &Value, key: &str, default: f64) -> Result<f64, TemplateError> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| TemplateError(format!("`{}` must be a number", key))),
    }
}

fn text_prop<'a>(props: &'a Value, key: &str, default: &'a str) -> Result<&'a str, TemplateError> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_str()
            .ok_or_else(|| TemplateError(format!("`{}` must be a string", key))),
    }
}

/// Framed card: background, title, body text
fn build_card(props: &Value) -> Result<NodeTree, TemplateError> {
    let width = number_prop(props, "width", 240.0)?;
    let height = number_prop(props, "height", 160.0)?;
    let title = text_prop(props, "title", "Card")?;
    let body = text_prop(props, "body", "")?;
    if width <= 0.0 || height <= 0.0 {
        return Err(TemplateError("card size must be positive".into()));
    }

    let background = NodeTree::new(NodeKind::Rectangle {
        size: kurbo::Size::new(width, height),
        corner_radius: 8.0,
    })
    .named("Background")
    .with_style(Style::filled(Color::WHITE));

    let heading = NodeTree::new(NodeKind::text(title, FontRef::new("Inter", 18.0)))
        .named("Title")
        .with_transform(Affine::translate(Vec2::new(16.0, 16.0)));

    let mut card = NodeTree::new(NodeKind::Container {
        size: kurbo::Size::new(width, height),
        clip: true,
    })
    .named("Card")
    .with_child(background)
    .with_child(heading);

    if !body.is_empty() {
        card = card.with_child(
            NodeTree::new(NodeKind::Text {
                runs: vec![vellum_core::TextRun::new(body, FontRef::new("Inter", 14.0))],
                width: Some(width - 32.0),
            })
            .named("Body")
            .with_transform(Affine::translate(Vec2::new(16.0, 48.0))),
        );
    }
    Ok(card)
}

/// Pill-shaped label
fn build_badge(props: &Value) -> Result<NodeTree, TemplateError> {
    let label = text_prop(props, "label", "New")?;
    let width = 16.0 + 7.0 * label.chars().count() as f64;

    Ok(NodeTree::new(NodeKind::container(width, 24.0))
        .named("Badge")
        .with_child(
            NodeTree::new(NodeKind::Rectangle {
                size: kurbo::Size::new(width, 24.0),
                corner_radius: 12.0,
            })
            .named("Pill")
            .with_style(Style::filled(Color::rgb(0.23, 0.51, 0.96))),
        )
        .with_child(
            NodeTree::new(NodeKind::text(label, FontRef::new("Inter", 12.0)))
                .named("Label")
                .with_transform(Affine::translate(Vec2::new(8.0, 5.0))),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(
        size: f64,
    ) -> FnTemplate<impl Fn(&Value) -> Result<NodeTree, TemplateError> + Send + Sync + 'static> {
        FnTemplate::new("square", move |_: &Value| Ok(NodeTree::new(NodeKind::rectangle(size, size))))
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = TemplateRegistry::with_builtins();
        assert_eq!(registry.tags(), vec!["badge", "card"]);
        assert!(registry.contains("card"));
        assert!(!registry.contains("button"));
    }

    #[test]
    fn test_card_props() {
        let registry = TemplateRegistry::with_builtins();
        let tree = registry
            .instantiate("card", &json!({ "title": "Hello", "body": "World" }))
            .unwrap();

        assert_eq!(tree.name.as_deref(), Some("Card"));
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn test_bad_props_are_template_errors() {
        let registry = TemplateRegistry::with_builtins();
        let err = registry.instantiate("card", &json!({ "width": "wide" })).unwrap_err();
        assert!(matches!(err, EditorError::TemplateError { tag, .. } if tag == "card"));
    }

    #[test]
    fn test_unknown_tag() {
        let registry = TemplateRegistry::new();
        assert!(registry.is_empty());
        let err = registry.instantiate("card", &Value::Null).unwrap_err();
        assert!(matches!(err, EditorError::UnknownTemplate(tag) if tag == "card"));
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = TemplateRegistry::new();
        registry.register(square(10.0));
        registry.register(square(20.0));

        let tree = registry.instantiate("square", &Value::Null).unwrap();
        assert_eq!(tree.kind, NodeKind::rectangle(20.0, 20.0));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_shared_registry_is_one_instance() {
        let a = TemplateRegistry::shared();
        let b = TemplateRegistry::shared();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.contains("badge"));
    }
}
