//! Element fragments inserted into the page.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// Declarative description of an element subtree.
///
/// Attributes keep insertion order so rendered markup is stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    /// Creates an element with the given tag name.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Sets the element id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a class name.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Sets the inline style.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Adds a child element.
    pub fn with_child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Renders the subtree as HTML markup.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }

    fn render(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        if let Some(id) = &self.id {
            push_attribute(out, "id", id);
        }
        if !self.classes.is_empty() {
            push_attribute(out, "class", &self.classes.join(" "));
        }
        if let Some(style) = &self.style {
            push_attribute(out, "style", style);
        }
        for (name, value) in &self.attributes {
            push_attribute(out, name, value);
        }
        out.push('>');

        for child in &self.children {
            child.render(out);
        }

        let _ = write!(out, "</{}>", self.tag);
    }
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    let _ = write!(
        out,
        " {}=\"{}\"",
        name,
        html_escape::encode_double_quoted_attribute(value)
    );
}
