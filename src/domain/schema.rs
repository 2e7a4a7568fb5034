//! Schema sequence tables.
//!
//! Each document variant declares, per parent element, the one legal relative
//! order of its children and whether a child is a singleton or a repeatable
//! wrapper keyed by an identity attribute. Tables are static and never change
//! at runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Namespace of all NewsML-G2 elements.
pub const NAR_NAMESPACE: &str = "http://iptc.org/std/nar/2006-10-01/";

/// Prefix bound to [`NAR_NAMESPACE`] in selectors.
pub const NAR_PREFIX: &str = "nar";

/// Always-leading element, prepended to the root regardless of any table.
pub const CATALOG_REF: &str = "catalogRef";

/// How often a child may occur under its parent, and how instances are told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Singleton,
    Keyed { attribute: &'static str },
}

impl Cardinality {
    pub fn identity_attribute(&self) -> Option<&'static str> {
        match self {
            Cardinality::Singleton => None,
            Cardinality::Keyed { attribute } => Some(*attribute),
        }
    }
}

/// One declared child of a content model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub name: &'static str,
    pub cardinality: Cardinality,
}

const fn one(name: &'static str) -> Slot {
    Slot {
        name,
        cardinality: Cardinality::Singleton,
    }
}

const fn keyed(name: &'static str, attribute: &'static str) -> Slot {
    Slot {
        name,
        cardinality: Cardinality::Keyed { attribute },
    }
}

/// Relative order of two names within a [`Sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeOrder {
    Before,
    After,
    Same,
    /// At least one name is not ranked by the sequence
    Incomparable,
}

/// Declared children of one parent element.
///
/// Unordered sequences (schema choices) only contribute cardinality; none of
/// their names is ranked.
#[derive(Debug, Clone, Copy)]
pub struct Sequence {
    slots: &'static [Slot],
    ordered: bool,
}

impl Sequence {
    pub const fn ordered(slots: &'static [Slot]) -> Self {
        Self {
            slots,
            ordered: true,
        }
    }

    pub const fn unordered(slots: &'static [Slot]) -> Self {
        Self {
            slots,
            ordered: false,
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    pub fn slots(&self) -> &'static [Slot] {
        self.slots
    }

    /// Rank of `name`, None when the name is not ranked by this sequence.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        if !self.ordered {
            return None;
        }
        self.slots.iter().position(|s| s.name == name)
    }

    pub fn relative_order(&self, a: &str, b: &str) -> RelativeOrder {
        match (self.position_of(a), self.position_of(b)) {
            (Some(x), Some(y)) if x < y => RelativeOrder::Before,
            (Some(x), Some(y)) if x > y => RelativeOrder::After,
            (Some(_), Some(_)) => RelativeOrder::Same,
            _ => RelativeOrder::Incomparable,
        }
    }

    pub fn cardinality_of(&self, name: &str) -> Option<Cardinality> {
        self.slots
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.cardinality)
    }
}

/// Content model of a nested (non-root) element, shared by all variants.
#[derive(Debug, Clone, Copy)]
pub struct ContentModel {
    pub parent: &'static str,
    pub sequence: Sequence,
}

/// Supported document variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    NewsItem,
    PackageItem,
    ConceptItem,
    KnowledgeItem,
    PlanningItem,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::NewsItem,
        Variant::PackageItem,
        Variant::ConceptItem,
        Variant::KnowledgeItem,
        Variant::PlanningItem,
    ];

    /// Local name of the root element, identical to the variant name.
    pub fn root_name(&self) -> &'static str {
        match self {
            Variant::NewsItem => "newsItem",
            Variant::PackageItem => "packageItem",
            Variant::ConceptItem => "conceptItem",
            Variant::KnowledgeItem => "knowledgeItem",
            Variant::PlanningItem => "planningItem",
        }
    }

    pub fn schema(&self) -> &'static Schema {
        Schema::for_variant(*self)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root_name())
    }
}

impl FromStr for Variant {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.root_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::UnknownVariant(s.to_string()))
    }
}

/// Schema profile of one document variant.
#[derive(Debug)]
pub struct Schema {
    pub variant: Variant,
    pub namespace: &'static str,
    pub prefix: &'static str,
    root_sequence: Sequence,
    models: &'static [ContentModel],
}

impl Schema {
    pub fn for_variant(variant: Variant) -> &'static Schema {
        match variant {
            Variant::NewsItem => &NEWS_ITEM,
            Variant::PackageItem => &PACKAGE_ITEM,
            Variant::ConceptItem => &CONCEPT_ITEM,
            Variant::KnowledgeItem => &KNOWLEDGE_ITEM,
            Variant::PlanningItem => &PLANNING_ITEM,
        }
    }

    pub fn root_name(&self) -> &'static str {
        self.variant.root_name()
    }

    pub fn root_sequence(&self) -> &Sequence {
        &self.root_sequence
    }

    /// Sequence governing the children of an element named `parent`.
    pub fn sequence_for(&self, parent: &str) -> Option<&Sequence> {
        if parent == self.root_name() {
            return Some(&self.root_sequence);
        }
        self.models
            .iter()
            .find(|m| m.parent == parent)
            .map(|m| &m.sequence)
    }

    /// Cardinality of `child` under `parent`; undeclared children are singletons.
    pub fn cardinality(&self, parent: &str, child: &str) -> Cardinality {
        self.sequence_for(parent)
            .and_then(|s| s.cardinality_of(child))
            .unwrap_or(Cardinality::Singleton)
    }

    /// Nested content models known to this variant.
    pub fn models(&self) -> &'static [ContentModel] {
        self.models
    }
}

const ITEM_META: &[Slot] = &[
    one("itemClass"),
    one("provider"),
    one("versionCreated"),
    one("firstCreated"),
    one("embargoed"),
    one("pubStatus"),
    one("role"),
    one("fileName"),
    one("generator"),
    one("profile"),
    one("service"),
    one("title"),
    one("edNote"),
    one("memberOf"),
    one("instanceOf"),
    one("signal"),
    one("altRep"),
    one("deliverableOf"),
    one("hash"),
    one("expires"),
    one("origRep"),
    one("incomingFeedId"),
    one("metadataCreator"),
    one("link"),
];

const CONTENT_META: &[Slot] = &[
    one("icon"),
    one("urgency"),
    one("contentCreated"),
    one("contentModified"),
    one("located"),
    one("infoSource"),
    one("creator"),
    one("contributor"),
    one("audience"),
    one("exclAudience"),
    one("altId"),
    one("rating"),
    one("userInteraction"),
    one("language"),
    one("genre"),
    one("keyword"),
    one("subject"),
    one("slugline"),
    one("headline"),
    one("dateline"),
    one("by"),
    one("creditline"),
    one("description"),
    one("contentMetaExtProperty"),
];

const PART_META: &[Slot] = &[
    one("icon"),
    one("timeDelim"),
    one("regionDelim"),
    one("role"),
    one("urgency"),
    one("contentCreated"),
    one("contentModified"),
    one("located"),
    one("infoSource"),
    one("creator"),
    one("contributor"),
    one("audience"),
    one("exclAudience"),
    one("altId"),
    one("rating"),
    one("userInteraction"),
    one("language"),
    one("genre"),
    one("keyword"),
    one("subject"),
    one("slugline"),
    one("headline"),
    one("dateline"),
    one("by"),
    one("creditline"),
    one("description"),
    one("partMetaExtProperty"),
    one("signal"),
    one("edNote"),
    one("link"),
];

const RIGHTS_INFO: &[Slot] = &[
    one("accountable"),
    one("copyrightHolder"),
    one("copyrightNotice"),
    one("usageTerms"),
    one("link"),
];

const CONCEPT: &[Slot] = &[
    one("conceptId"),
    one("type"),
    one("name"),
    one("definition"),
    one("note"),
    one("facet"),
    one("remoteInfo"),
    one("hierarchyInfo"),
    one("sameAs"),
    one("broader"),
    one("narrower"),
    one("related"),
];

const NEWS_COVERAGE: &[Slot] = &[one("planning"), one("delivery")];

const PLANNING: &[Slot] = &[
    one("g2contentType"),
    one("itemClass"),
    one("itemCount"),
    one("assignedTo"),
    one("scheduled"),
    one("service"),
    one("title"),
    one("edNote"),
    one("genre"),
    one("subject"),
    one("slugline"),
    one("headline"),
    one("description"),
];

const CONTENT_SET: &[Slot] = &[
    keyed("inlineXML", "contenttype"),
    keyed("inlineData", "contenttype"),
    keyed("remoteContent", "residref"),
];

const GROUP_SET: &[Slot] = &[keyed("group", "id")];
const GROUP: &[Slot] = &[keyed("itemRef", "residref"), keyed("groupRef", "idref")];
const CONCEPT_SET: &[Slot] = &[keyed("concept", "id")];
const NEWS_COVERAGE_SET: &[Slot] = &[keyed("newsCoverage", "id")];

const MODELS: &[ContentModel] = &[
    ContentModel {
        parent: "itemMeta",
        sequence: Sequence::ordered(ITEM_META),
    },
    ContentModel {
        parent: "contentMeta",
        sequence: Sequence::ordered(CONTENT_META),
    },
    ContentModel {
        parent: "partMeta",
        sequence: Sequence::ordered(PART_META),
    },
    ContentModel {
        parent: "rightsInfo",
        sequence: Sequence::ordered(RIGHTS_INFO),
    },
    ContentModel {
        parent: "contentSet",
        sequence: Sequence::unordered(CONTENT_SET),
    },
    ContentModel {
        parent: "groupSet",
        sequence: Sequence::unordered(GROUP_SET),
    },
    ContentModel {
        parent: "group",
        sequence: Sequence::unordered(GROUP),
    },
    ContentModel {
        parent: "conceptSet",
        sequence: Sequence::unordered(CONCEPT_SET),
    },
    ContentModel {
        parent: "concept",
        sequence: Sequence::ordered(CONCEPT),
    },
    ContentModel {
        parent: "newsCoverageSet",
        sequence: Sequence::unordered(NEWS_COVERAGE_SET),
    },
    ContentModel {
        parent: "newsCoverage",
        sequence: Sequence::ordered(NEWS_COVERAGE),
    },
    ContentModel {
        parent: "planning",
        sequence: Sequence::ordered(PLANNING),
    },
];

const NEWS_ITEM_ROOT: &[Slot] = &[
    one("catalog"),
    one("hopHistory"),
    one("pubHistory"),
    keyed("rightsInfo", "id"),
    one("itemMeta"),
    one("contentMeta"),
    keyed("partMeta", "partid"),
    keyed("assert", "qcode"),
    one("inlineRef"),
    one("derivedFrom"),
    one("derivedFromValue"),
    one("contentSet"),
];

const PACKAGE_ITEM_ROOT: &[Slot] = &[
    one("catalog"),
    one("hopHistory"),
    one("pubHistory"),
    keyed("rightsInfo", "id"),
    one("itemMeta"),
    one("contentMeta"),
    keyed("partMeta", "partid"),
    keyed("assert", "qcode"),
    one("inlineRef"),
    one("derivedFrom"),
    one("derivedFromValue"),
    one("groupSet"),
];

const CONCEPT_ITEM_ROOT: &[Slot] = &[
    one("catalog"),
    one("hopHistory"),
    one("pubHistory"),
    keyed("rightsInfo", "id"),
    one("itemMeta"),
    one("contentMeta"),
    keyed("assert", "qcode"),
    one("inlineRef"),
    one("derivedFrom"),
    one("derivedFromValue"),
    one("concept"),
];

const KNOWLEDGE_ITEM_ROOT: &[Slot] = &[
    one("catalog"),
    one("hopHistory"),
    one("pubHistory"),
    keyed("rightsInfo", "id"),
    one("itemMeta"),
    one("contentMeta"),
    keyed("partMeta", "partid"),
    keyed("assert", "qcode"),
    one("inlineRef"),
    one("derivedFrom"),
    one("derivedFromValue"),
    one("conceptSet"),
    one("schemeMeta"),
];

const PLANNING_ITEM_ROOT: &[Slot] = &[
    one("catalog"),
    one("hopHistory"),
    one("pubHistory"),
    keyed("rightsInfo", "id"),
    one("itemMeta"),
    one("contentMeta"),
    keyed("partMeta", "partid"),
    keyed("assert", "qcode"),
    one("inlineRef"),
    one("derivedFrom"),
    one("derivedFromValue"),
    one("newsCoverageSet"),
    one("eventsSet"),
];

static NEWS_ITEM: Schema = Schema {
    variant: Variant::NewsItem,
    namespace: NAR_NAMESPACE,
    prefix: NAR_PREFIX,
    root_sequence: Sequence::ordered(NEWS_ITEM_ROOT),
    models: MODELS,
};

static PACKAGE_ITEM: Schema = Schema {
    variant: Variant::PackageItem,
    namespace: NAR_NAMESPACE,
    prefix: NAR_PREFIX,
    root_sequence: Sequence::ordered(PACKAGE_ITEM_ROOT),
    models: MODELS,
};

static CONCEPT_ITEM: Schema = Schema {
    variant: Variant::ConceptItem,
    namespace: NAR_NAMESPACE,
    prefix: NAR_PREFIX,
    root_sequence: Sequence::ordered(CONCEPT_ITEM_ROOT),
    models: MODELS,
};

static KNOWLEDGE_ITEM: Schema = Schema {
    variant: Variant::KnowledgeItem,
    namespace: NAR_NAMESPACE,
    prefix: NAR_PREFIX,
    root_sequence: Sequence::ordered(KNOWLEDGE_ITEM_ROOT),
    models: MODELS,
};

static PLANNING_ITEM: Schema = Schema {
    variant: Variant::PlanningItem,
    namespace: NAR_NAMESPACE,
    prefix: NAR_PREFIX,
    root_sequence: Sequence::ordered(PLANNING_ITEM_ROOT),
    models: MODELS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_ranked_names_when_comparing_then_follows_declared_order() {
        let seq = Schema::for_variant(Variant::NewsItem).root_sequence();

        assert_eq!(seq.relative_order("itemMeta", "contentMeta"), RelativeOrder::Before);
        assert_eq!(seq.relative_order("contentSet", "itemMeta"), RelativeOrder::After);
        assert_eq!(seq.relative_order("partMeta", "partMeta"), RelativeOrder::Same);
    }

    #[test]
    fn given_unknown_name_when_comparing_then_incomparable() {
        let seq = Schema::for_variant(Variant::NewsItem).root_sequence();

        assert_eq!(seq.position_of("noSuchElement"), None);
        assert_eq!(seq.position_of(CATALOG_REF), None);
        assert_eq!(
            seq.relative_order("noSuchElement", "itemMeta"),
            RelativeOrder::Incomparable
        );
    }

    #[test]
    fn given_unordered_model_when_ranking_then_nothing_is_ranked() {
        let schema = Schema::for_variant(Variant::NewsItem);
        let content_set = schema.sequence_for("contentSet").unwrap();

        assert!(!content_set.is_ordered());
        assert_eq!(content_set.position_of("remoteContent"), None);
        assert_eq!(
            content_set.cardinality_of("remoteContent"),
            Some(Cardinality::Keyed { attribute: "residref" })
        );
    }

    #[test]
    fn given_concept_when_parent_differs_then_cardinality_differs() {
        let schema = Schema::for_variant(Variant::KnowledgeItem);

        assert_eq!(
            schema.cardinality("conceptSet", "concept"),
            Cardinality::Keyed { attribute: "id" }
        );
        assert_eq!(
            Schema::for_variant(Variant::ConceptItem).cardinality("conceptItem", "concept"),
            Cardinality::Singleton
        );
        assert_eq!(schema.cardinality("itemMeta", "undeclared"), Cardinality::Singleton);
    }

    #[test]
    fn given_variant_names_when_parsing_then_round_trips_display() {
        for variant in Variant::ALL {
            let parsed: Variant = variant.to_string().parse().unwrap();
            assert_eq!(parsed, variant);
            assert_eq!(variant.schema().root_name(), variant.root_name());
        }
        assert!("nope".parse::<Variant>().is_err());
    }
}
