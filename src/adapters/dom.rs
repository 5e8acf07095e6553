use crate::adapters::selector::{Selectable, Selector};
use crate::domain::ports::{Document, ElementHandle};
use crate::utils::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use url::Url;

/// Serializable description of one element, also used as a builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementFixture {
    #[serde(default = "default_tag")]
    pub tag: String,
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub content: String,
}

fn default_tag() -> String {
    "div".to_string()
}

impl ElementFixture {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            attributes: HashMap::new(),
            content: String::new(),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn content(mut self, html: &str) -> Self {
        self.content = html.to_string();
        self
    }
}

/// A page: optional base URL plus elements in document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageFixture {
    pub base_url: Option<String>,
    #[serde(default)]
    pub elements: Vec<ElementFixture>,
}

impl PageFixture {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| LoaderError::config("page", format!("TOML parsing error: {}", e)))
    }
}

#[derive(Debug)]
pub struct ElementNode {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: HashMap<String, String>,
    content: RwLock<String>,
}

impl Selectable for ElementNode {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            _ => self.attributes.get(name).cloned(),
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

impl From<ElementFixture> for ElementNode {
    fn from(mut fixture: ElementFixture) -> Self {
        // `id` and `class` given as plain attributes are folded into the typed fields.
        if let Some(class_attr) = fixture.attributes.remove("class") {
            fixture
                .classes
                .extend(class_attr.split_whitespace().map(str::to_string));
        }
        let id_attr = fixture.attributes.remove("id");

        Self {
            tag: fixture.tag.to_ascii_lowercase(),
            id: fixture.id.or(id_attr),
            classes: fixture.classes,
            attributes: fixture.attributes,
            content: RwLock::new(fixture.content),
        }
    }
}

/// Shared handle to an element of a [`MemoryDocument`].
#[derive(Debug, Clone)]
pub struct ElementRef(Arc<ElementNode>);

impl ElementRef {
    pub fn content(&self) -> String {
        self.0
            .content
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn id(&self) -> Option<&str> {
        self.0.id.as_deref()
    }

    pub fn ptr_eq(&self, other: &ElementRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl ElementHandle for ElementRef {
    fn get_attribute(&self, name: &str) -> Option<String> {
        self.0.attribute(name)
    }

    fn append_markup(&self, html: &str) {
        self.0
            .content
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_str(html);
    }

    fn has_class(&self, class: &str) -> bool {
        Selectable::has_class(self.0.as_ref(), class)
    }

    fn describe(&self) -> String {
        match &self.0.id {
            Some(id) => format!("{}#{}", self.0.tag, id),
            None => self.0.tag.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    base_url: Option<Url>,
    elements: Vec<ElementRef>,
}

impl MemoryDocument {
    pub fn new(base_url: Option<Url>) -> Self {
        Self {
            base_url,
            elements: Vec::new(),
        }
    }

    pub fn from_fixture(fixture: PageFixture) -> Result<Self> {
        let base_url = fixture
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| {
                    LoaderError::config("base_url", format!("Invalid URL `{}`: {}", raw, e))
                })
            })
            .transpose()?;

        let mut document = Self::new(base_url);
        for element in fixture.elements {
            document.insert(element);
        }
        tracing::debug!("Built document with {} elements", document.elements.len());
        Ok(document)
    }

    /// Appends an element at the end of the document.
    pub fn insert(&mut self, element: ElementFixture) -> ElementRef {
        let handle = ElementRef(Arc::new(ElementNode::from(element)));
        self.elements.push(handle.clone());
        handle
    }

    pub fn elements(&self) -> &[ElementRef] {
        &self.elements
    }

    pub fn content_of(&self, selector: &str) -> Result<Option<String>> {
        Ok(self.query_selector(selector)?.map(|element| element.content()))
    }
}

impl Document for MemoryDocument {
    type Element = ElementRef;

    fn query_selector(&self, selector: &str) -> Result<Option<ElementRef>> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .elements
            .iter()
            .find(|element| selector.matches(element.0.as_ref()))
            .cloned())
    }

    fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }
}
