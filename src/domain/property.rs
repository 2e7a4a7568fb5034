//! Property value objects.
//!
//! The engine only sees the [`Property`] contract: an element name, scalar
//! attributes, optional text and optional nested values. Typed value objects
//! validate their input when constructed, so the engine can trust payloads.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::domain::error::{DomainError, DomainResult};

/// Payload accepted by the property insertion engine.
pub trait Property {
    fn element_name(&self) -> &str;

    fn attributes(&self) -> BTreeMap<String, String>;

    fn text(&self) -> Option<&str>;

    /// Nested values, inserted in the given order below the property element.
    fn children(&self) -> Vec<PropertyValue> {
        Vec::new()
    }
}

/// Generic property: name, attributes, text and nested values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    name: String,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    children: Vec<PropertyValue>,
}

impl PropertyValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set `attr` only when `value` is present.
    pub fn attr_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.attr(name, v),
            None => self,
        }
    }

    pub fn child(mut self, child: PropertyValue) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Property for PropertyValue {
    fn element_name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> BTreeMap<String, String> {
        self.attributes.clone()
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn children(&self) -> Vec<PropertyValue> {
        self.children.clone()
    }
}

/// Implements [`Property`] for a typed value object by delegating to the
/// `PropertyValue` it converts into.
macro_rules! delegate_property {
    ($ty:ty) => {
        impl Property for $ty {
            fn element_name(&self) -> &str {
                self.0.element_name()
            }

            fn attributes(&self) -> BTreeMap<String, String> {
                self.0.attributes()
            }

            fn text(&self) -> Option<&str> {
                self.0.text.as_deref()
            }

            fn children(&self) -> Vec<PropertyValue> {
                self.0.children()
            }
        }
    };
}

fn non_empty(property: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::InvalidValue {
            property: property.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

/// `urgency`: editorial urgency, 1 (highest) to 9 (lowest).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Urgency(PropertyValue);

impl Urgency {
    pub fn new(value: u8) -> DomainResult<Self> {
        if !(1..=9).contains(&value) {
            return Err(DomainError::InvalidValue {
                property: "urgency".to_string(),
                message: format!("{} is outside 1..=9", value),
            });
        }
        Ok(Self(PropertyValue::new("urgency").with_text(value.to_string())))
    }
}
delegate_property!(Urgency);

/// `headline`, optionally with a role and language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline(PropertyValue);

impl Headline {
    pub fn new(text: &str, role: Option<&str>, lang: Option<&str>) -> DomainResult<Self> {
        non_empty("headline", text)?;
        Ok(Self(
            PropertyValue::new("headline")
                .with_text(text)
                .attr_opt("role", role)
                .attr_opt("xml:lang", lang),
        ))
    }
}
delegate_property!(Headline);

/// `slugline`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slugline(PropertyValue);

impl Slugline {
    pub fn new(text: &str) -> DomainResult<Self> {
        non_empty("slugline", text)?;
        Ok(Self(PropertyValue::new("slugline").with_text(text)))
    }
}
delegate_property!(Slugline);

/// `title` of the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title(PropertyValue);

impl Title {
    pub fn new(text: &str, lang: Option<&str>) -> DomainResult<Self> {
        non_empty("title", text)?;
        Ok(Self(
            PropertyValue::new("title").with_text(text).attr_opt("xml:lang", lang),
        ))
    }
}
delegate_property!(Title);

/// Checks the shape of a BCP 47 tag: alphanumeric subtags of at most
/// eight characters joined by `-`.
pub(crate) fn language_tag<'t>(property: &str, tag: &'t str) -> DomainResult<&'t str> {
    let tag = tag.trim();
    let well_formed = !tag.is_empty()
        && tag.split('-').all(|sub| {
            (1..=8).contains(&sub.len()) && sub.chars().all(|c| c.is_ascii_alphanumeric())
        });
    if !well_formed {
        return Err(DomainError::InvalidValue {
            property: property.to_string(),
            message: format!("'{}' is not a language tag", tag),
        });
    }
    Ok(tag)
}

/// `language` with its BCP 47 tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language(PropertyValue);

impl Language {
    pub fn new(tag: &str) -> DomainResult<Self> {
        let tag = language_tag("language", tag)?;
        Ok(Self(PropertyValue::new("language").attr("tag", tag)))
    }
}
delegate_property!(Language);

/// A QCode-valued property such as `itemClass`, `subject`, `genre` or
/// `pubStatus`, with an optional display name child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QCodeProperty(PropertyValue);

impl QCodeProperty {
    pub fn new(element: &str, qcode: &str, name: Option<&str>) -> DomainResult<Self> {
        if !qcode.contains(':') {
            return Err(DomainError::InvalidValue {
                property: element.to_string(),
                message: format!("'{}' is not a scheme:code QCode", qcode),
            });
        }
        let mut value = PropertyValue::new(element).attr("qcode", qcode);
        if let Some(name) = name {
            value = value.child(PropertyValue::new("name").with_text(name));
        }
        Ok(Self(value))
    }

    pub fn subject(qcode: &str, name: Option<&str>) -> DomainResult<Self> {
        Self::new("subject", qcode, name)
    }

    pub fn genre(qcode: &str, name: Option<&str>) -> DomainResult<Self> {
        Self::new("genre", qcode, name)
    }
}
delegate_property!(QCodeProperty);

/// A date-time property such as `versionCreated`, `firstCreated` or
/// `contentCreated`, rendered as RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeProperty(PropertyValue);

impl DateTimeProperty {
    pub fn new(element: &str, at: DateTime<FixedOffset>) -> Self {
        Self(PropertyValue::new(element).with_text(at.to_rfc3339()))
    }

    pub fn version_created(at: DateTime<FixedOffset>) -> Self {
        Self::new("versionCreated", at)
    }
}
delegate_property!(DateTimeProperty);
