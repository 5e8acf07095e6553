//! Compound CSS selectors: `tag`, `#id`, `.class`, `[attr]` and `[attr=value]`,
//! in any combination without whitespace (`div#panel-1.open[data-src]`).
//! Combinators, pseudo-classes and selector lists are rejected.

use crate::utils::error::{LoaderError, Result};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeMatch>,
}

/// What a selector needs to see of an element.
pub trait Selectable {
    fn tag(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<String>;
    fn has_class(&self, class: &str) -> bool;
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| LoaderError::InvalidSelector {
            selector: input.to_string(),
            reason: reason.to_string(),
        };

        let source = input.trim();
        if source.is_empty() {
            return Err(invalid("selector is empty"));
        }

        let mut selector = Selector::default();
        let mut chars = source.chars().peekable();

        if chars.peek().is_some_and(|c| is_ident_char(*c)) {
            selector.tag = Some(take_ident(&mut chars).to_ascii_lowercase());
        }

        while let Some(c) = chars.next() {
            match c {
                '#' => {
                    let id = take_ident(&mut chars);
                    if id.is_empty() {
                        return Err(invalid("expected an id after `#`"));
                    }
                    match &selector.id {
                        Some(existing) if *existing != id => {
                            return Err(invalid("conflicting ids in one compound selector"));
                        }
                        _ => selector.id = Some(id),
                    }
                }
                '.' => {
                    let class = take_ident(&mut chars);
                    if class.is_empty() {
                        return Err(invalid("expected a class name after `.`"));
                    }
                    selector.classes.push(class);
                }
                '[' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        body.push(c);
                    }
                    if !closed {
                        return Err(invalid("unterminated attribute selector"));
                    }
                    selector.attributes.push(Self::parse_attribute(&body).ok_or_else(|| {
                        invalid("malformed attribute selector")
                    })?);
                }
                c if c.is_whitespace() || matches!(c, '>' | '+' | '~') => {
                    return Err(invalid(
                        "combinators are not supported; use a flat compound selector such as `div#panel-1.open`",
                    ));
                }
                other => {
                    return Err(invalid(&format!("unexpected character `{}`", other)));
                }
            }
        }

        Ok(selector)
    }

    fn parse_attribute(body: &str) -> Option<AttributeMatch> {
        let (name, value) = match body.split_once('=') {
            Some((name, value)) => {
                let value = value.trim();
                let unquoted = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                    .unwrap_or(value);
                (name.trim(), Some(unquoted.to_string()))
            }
            None => (body.trim(), None),
        };

        if name.is_empty() || !name.chars().all(is_ident_char) {
            return None;
        }

        Some(AttributeMatch {
            name: name.to_string(),
            value,
        })
    }

    pub fn matches<T: Selectable + ?Sized>(&self, element: &T) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if element.attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }

        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }

        self.attributes.iter().all(|m| match (element.attribute(&m.name), &m.value) {
            (Some(actual), Some(expected)) => &actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }
}
