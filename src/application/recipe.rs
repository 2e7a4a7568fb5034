//! Build recipes: a TOML description of a document and the steps that fill it.
//!
//! ```toml
//! [document]
//! variant = "newsItem"
//! guid = "urn:newsml:example.com:20240101:abc"
//!
//! [[step]]
//! op = "property"
//! wrapper = "contentMeta"
//! name = "headline"
//! text = "Hello"
//!
//! [[step]]
//! op = "wrapper_attributes"
//! name = "partMeta"
//! key = "p1"
//! attributes = { seq = "1", contentrefs = "body" }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{
    DocumentBuilder, DocumentConfig, DomainError, DomainResult, Property, PropertyValue, Selector,
    Urgency, Variant,
};

/// Parsed recipe file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    #[serde(default)]
    pub document: RecipeDocument,
    #[serde(default, rename = "step")]
    pub steps: Vec<RecipeStep>,
}

/// `[document]` table. Unset fields fall back to [`Settings`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RecipeDocument {
    pub variant: Option<Variant>,
    pub guid: Option<String>,
    pub version: Option<u32>,
    pub standard_version: Option<String>,
    pub conformance: Option<String>,
    pub catalogs: Option<Vec<String>>,
    /// Extra prefix bindings usable in selectors and declared on the root
    pub namespaces: BTreeMap<String, String>,
}

/// One `[[step]]`, dispatched on its `op` field.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RecipeStep {
    Wrapper {
        parent: Option<String>,
        name: String,
        key: Option<String>,
    },
    Property {
        parent: Option<String>,
        wrapper: Option<String>,
        key: Option<String>,
        name: String,
        text: Option<String>,
        #[serde(default)]
        attributes: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<RecipeValue>,
    },
    CatalogRef {
        href: String,
    },
    RootLang {
        lang: String,
    },
    WrapperAttributes {
        parent: Option<String>,
        name: String,
        key: Option<String>,
        attributes: BTreeMap<String, String>,
    },
}

/// Nested value below a property.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RecipeValue {
    pub name: String,
    pub text: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<RecipeValue>,
}

impl RecipeValue {
    fn to_value(&self) -> PropertyValue {
        let mut value = PropertyValue::new(&self.name);
        if let Some(text) = &self.text {
            value = value.with_text(text);
        }
        for (k, v) in &self.attributes {
            value = value.attr(k, v);
        }
        self.children
            .iter()
            .fold(value, |acc, child| acc.child(child.to_value()))
    }
}

impl Recipe {
    pub fn parse(content: &str) -> ApplicationResult<Self> {
        toml::from_str(content).map_err(|e| ApplicationError::Recipe {
            message: e.to_string(),
        })
    }

    /// Document parameters, with `variant` taking precedence over the recipe
    /// and the recipe over `settings`.
    pub fn document_config(
        &self,
        settings: &Settings,
        variant: Option<Variant>,
    ) -> DocumentConfig {
        let doc = &self.document;
        let variant = variant.or(doc.variant).unwrap_or(settings.variant);
        let mut config = DocumentConfig::new(variant);
        config.guid = doc
            .guid
            .clone()
            .unwrap_or_else(|| settings.generate_guid());
        if let Some(version) = doc.version {
            config.version = version;
        }
        config.standard_version = doc
            .standard_version
            .clone()
            .unwrap_or_else(|| settings.standard_version.clone());
        config.conformance = doc
            .conformance
            .clone()
            .unwrap_or_else(|| settings.conformance.clone());
        config.catalogs = doc
            .catalogs
            .clone()
            .unwrap_or_else(|| settings.catalogs.clone());
        config
    }

    /// Run all steps in order. The first failing step aborts the run.
    #[instrument(level = "debug", skip_all, fields(steps = self.steps.len()))]
    pub fn apply(&self, builder: &mut DocumentBuilder) -> ApplicationResult<()> {
        for (prefix, uri) in &self.document.namespaces {
            builder.bind_namespace(prefix, uri)?;
        }
        for (i, step) in self.steps.iter().enumerate() {
            let index = i + 1;
            debug!("step {}: {:?}", index, step);
            step.apply(builder)
                .map_err(|source| ApplicationError::Step { index, source })?;
        }
        Ok(())
    }
}

impl RecipeStep {
    fn apply(&self, builder: &mut DocumentBuilder) -> DomainResult<()> {
        match self {
            RecipeStep::Wrapper { parent, name, key } => {
                let parent = parse_parent(parent.as_deref())?;
                builder.ensure_wrapper(&parent, name, key.as_deref())?;
            }
            RecipeStep::Property {
                parent,
                wrapper,
                key,
                name,
                text,
                attributes,
                children,
            } => {
                let parent = parse_parent(parent.as_deref())?;
                let property = typed_property(name, text.as_deref(), attributes, children)?;
                match wrapper {
                    Some(wrapper) => {
                        builder.add_property_in(&parent, wrapper, key.as_deref(), &*property)?;
                    }
                    None => {
                        builder.add_property_under(&parent, &*property)?;
                    }
                }
            }
            RecipeStep::CatalogRef { href } => {
                builder.add_catalog_ref(href)?;
            }
            RecipeStep::RootLang { lang } => {
                builder.set_root_lang(lang)?;
            }
            RecipeStep::WrapperAttributes {
                parent,
                name,
                key,
                attributes,
            } => {
                let parent = parse_parent(parent.as_deref())?;
                builder.set_wrapper_attributes(&parent, name, key.as_deref(), attributes)?;
            }
        }
        Ok(())
    }
}

fn parse_parent(parent: Option<&str>) -> DomainResult<Selector> {
    parent.map_or_else(|| Ok(Selector::root()), Selector::parse)
}

/// Value object for `name`; properties with a typed guard are validated here.
fn typed_property(
    name: &str,
    text: Option<&str>,
    attributes: &BTreeMap<String, String>,
    children: &[RecipeValue],
) -> DomainResult<Box<dyn Property>> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidValue {
            property: "step".to_string(),
            message: "property name must not be empty".to_string(),
        });
    }
    if name == "urgency" {
        if !attributes.is_empty() || !children.is_empty() {
            return Err(DomainError::InvalidValue {
                property: name.to_string(),
                message: "takes neither attributes nor children".to_string(),
            });
        }
        let raw = text.unwrap_or_default().trim();
        let value = raw.parse::<u8>().map_err(|_| DomainError::InvalidValue {
            property: name.to_string(),
            message: format!("'{}' is not a number", raw),
        })?;
        return Ok(Box::new(Urgency::new(value)?));
    }
    let value = RecipeValue {
        name: name.to_string(),
        text: text.map(str::to_string),
        attributes: attributes.clone(),
        children: children.to_vec(),
    };
    Ok(Box::new(value.to_value()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_all_step_kinds_when_parsing_then_dispatched_on_op() {
        let recipe = Recipe::parse(
            r#"
            [document]
            variant = "packageItem"

            [[step]]
            op = "wrapper"
            name = "groupSet"

            [[step]]
            op = "property"
            wrapper = "itemMeta"
            name = "title"
            text = "Top stories"

            [[step]]
            op = "catalog_ref"
            href = "http://example.com/catalog.xml"

            [[step]]
            op = "root_lang"
            lang = "en"

            [[step]]
            op = "wrapper_attributes"
            name = "partMeta"
            key = "p1"
            attributes = { seq = "2" }
            "#,
        )
        .unwrap();

        assert_eq!(recipe.document.variant, Some(Variant::PackageItem));
        assert_eq!(recipe.steps.len(), 5);
        assert!(matches!(recipe.steps[2], RecipeStep::CatalogRef { .. }));
        assert!(matches!(recipe.steps[3], RecipeStep::RootLang { .. }));
        assert!(matches!(recipe.steps[4], RecipeStep::WrapperAttributes { .. }));
    }

    #[test]
    fn given_unknown_op_when_parsing_then_recipe_error() {
        let result = Recipe::parse("[[step]]\nop = \"delete\"\nname = \"x\"\n");

        assert!(matches!(result, Err(ApplicationError::Recipe { .. })));
    }

    #[test]
    fn given_urgency_out_of_range_when_building_property_then_invalid_value() {
        let result = typed_property("urgency", Some("12"), &BTreeMap::new(), &[]);

        assert!(matches!(result, Err(DomainError::InvalidValue { .. })));
    }

    #[test]
    fn given_urgency_with_attributes_when_building_property_then_rejected() {
        let attributes = BTreeMap::from([("role".to_string(), "main".to_string())]);

        let result = typed_property("urgency", Some("3"), &attributes, &[]);

        assert!(matches!(result, Err(DomainError::InvalidValue { .. })));
    }
}
