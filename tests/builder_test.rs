//! Tests for the ordered wrapper/property insertion engine

use std::collections::BTreeMap;

use rstest::rstest;

use g2tree::domain::{
    DocumentBuilder, DocumentConfig, DomainError, Headline, NodeId, Outcome, PropertyValue,
    QCodeProperty, Selector, Urgency, Variant,
};
use g2tree::util::testing;

fn news_item() -> DocumentBuilder {
    testing::init_test_setup();
    DocumentBuilder::new(&DocumentConfig::new(Variant::NewsItem).with_guid("urn:test:builder"))
}

fn texts(b: &DocumentBuilder, node: NodeId) -> Vec<String> {
    b.tree()
        .children(node)
        .iter()
        .filter_map(|&c| b.tree().element(c))
        .map(|e| e.text.clone().unwrap_or_default())
        .collect()
}

fn attribute_values(b: &DocumentBuilder, node: NodeId, attr: &str) -> Vec<String> {
    b.tree()
        .children(node)
        .iter()
        .filter_map(|&c| b.tree().element(c)?.attribute(attr).map(str::to_string))
        .collect()
}

#[rstest]
#[case(&["contentSet", "itemMeta", "contentMeta"])]
#[case(&["contentMeta", "contentSet", "itemMeta"])]
#[case(&["itemMeta", "contentSet", "contentMeta"])]
#[case(&["contentSet", "contentMeta", "itemMeta"])]
#[case(&["itemMeta", "contentMeta", "contentSet"])]
#[case(&["contentMeta", "itemMeta", "contentSet"])]
fn given_any_call_order_when_ensuring_wrappers_then_children_follow_schema_order(
    #[case] calls: &[&str],
) {
    // Arrange
    let mut b = news_item();

    // Act
    for name in calls {
        b.ensure_wrapper(&Selector::root(), name, None).unwrap();
    }

    // Assert
    assert_eq!(
        b.tree().child_names(b.root()),
        vec!["itemMeta", "contentMeta", "contentSet"]
    );
}

#[test]
fn given_reverse_order_scenario_when_building_then_wrappers_properties_and_parts_placed() {
    // Arrange
    let mut b = news_item();
    let root = Selector::root();

    // Act: wrappers in reverse order
    b.ensure_wrapper(&root, "contentSet", None).unwrap();
    b.ensure_wrapper(&root, "itemMeta", None).unwrap();
    b.ensure_wrapper(&root, "contentMeta", None).unwrap();

    // Act: two properties into the first wrapper
    b.add_property("itemMeta", None, &PropertyValue::new("edNote").with_text("x"))
        .unwrap();
    b.add_property("itemMeta", None, &PropertyValue::new("edNote").with_text("y"))
        .unwrap();
    let item_meta = b.wrapper(&root, "itemMeta", None).unwrap();

    // Act: keyed wrappers
    let p1 = b.ensure_wrapper(&root, "partMeta", Some("p1")).unwrap();
    let p1_again = b.ensure_wrapper(&root, "partMeta", Some("p1")).unwrap();
    let p2 = b.ensure_wrapper(&root, "partMeta", Some("p2")).unwrap();

    // Assert
    assert_eq!(
        b.tree().child_names(b.root()),
        vec!["itemMeta", "contentMeta", "partMeta", "partMeta", "contentSet"]
    );
    assert_eq!(texts(&b, item_meta), vec!["x", "y"]);
    assert!(p1.created);
    assert!(!p1_again.created);
    assert_eq!(p1.node, p1_again.node);
    assert!(p2.created);
    assert_ne!(p1.node, p2.node);
    assert_eq!(attribute_values(&b, b.root(), "partid"), vec!["p1", "p2"]);
}

#[test]
fn given_existing_singleton_when_ensuring_again_then_reused_without_mutation() {
    // Arrange
    let mut b = news_item();
    let first = b.ensure_wrapper(&Selector::root(), "itemMeta", None).unwrap();
    let size = b.tree().len();

    // Act
    let second = b.ensure_wrapper(&Selector::root(), "itemMeta", None).unwrap();

    // Assert
    assert_eq!(first.node, second.node);
    assert!(!second.created);
    assert_eq!(b.tree().len(), size);
    assert_eq!(b.outcome(), Outcome::Ok);
}

#[rstest]
#[case(None)]
#[case(Some(""))]
#[case(Some("   "))]
fn given_keyed_wrapper_without_usable_key_when_ensuring_then_missing_identity_key(
    #[case] key: Option<&str>,
) {
    // Arrange
    let mut b = news_item();
    let size = b.tree().len();

    // Act
    let result = b.ensure_wrapper(&Selector::root(), "partMeta", key);

    // Assert
    assert!(matches!(
        result,
        Err(DomainError::MissingIdentityKey { ref attribute, .. }) if attribute == "partid"
    ));
    assert_eq!(b.outcome(), Outcome::MissingIdentityKey);
    assert_eq!(b.tree().len(), size);
}

#[rstest]
#[case(None)]
#[case(Some(""))]
fn given_keyed_wrapper_without_key_when_adding_property_then_missing_identity_key(
    #[case] key: Option<&str>,
) {
    // Arrange
    let mut b = news_item();
    let size = b.tree().len();

    // Act
    let result = b.add_property(
        "partMeta",
        key,
        &PropertyValue::new("headline").with_text("part headline"),
    );

    // Assert
    assert!(matches!(result, Err(DomainError::MissingIdentityKey { .. })));
    assert_eq!(b.outcome(), Outcome::MissingIdentityKey);
    assert_eq!(b.tree().len(), size);
}

#[test]
fn given_properties_in_any_order_when_adding_then_ranked_and_never_deduplicated() {
    // Arrange
    let mut b = news_item();
    let headline = Headline::new("Storm warning", None, Some("en")).unwrap();
    let weather = QCodeProperty::subject("medtop:17000000", None).unwrap();
    let disaster = QCodeProperty::subject("medtop:03000000", None).unwrap();

    // Act
    b.add_property("contentMeta", None, &headline).unwrap();
    b.add_property("contentMeta", None, &weather).unwrap();
    b.add_property("contentMeta", None, &Urgency::new(3).unwrap()).unwrap();
    b.add_property("contentMeta", None, &disaster).unwrap();

    // Assert
    let content_meta = b.wrapper(&Selector::root(), "contentMeta", None).unwrap();
    assert_eq!(
        b.tree().child_names(content_meta),
        vec!["urgency", "subject", "subject", "headline"]
    );
    assert_eq!(
        attribute_values(&b, content_meta, "qcode"),
        vec!["medtop:17000000", "medtop:03000000"]
    );
}

#[test]
fn given_unranked_property_when_adding_then_appended_after_ranked_siblings() {
    // Arrange
    let mut b = news_item();
    b.add_property("contentMeta", None, &PropertyValue::new("headline").with_text("h"))
        .unwrap();

    // Act
    b.add_property("contentMeta", None, &PropertyValue::new("vendorExtension"))
        .unwrap();
    b.add_property("contentMeta", None, &PropertyValue::new("urgency").with_text("1"))
        .unwrap();

    // Assert
    let content_meta = b.wrapper(&Selector::root(), "contentMeta", None).unwrap();
    assert_eq!(
        b.tree().child_names(content_meta),
        vec!["urgency", "headline", "vendorExtension"]
    );
}

#[test]
fn given_unordered_content_set_when_adding_keyed_children_then_arrival_order_kept() {
    // Arrange
    let mut b = news_item();
    let content_set = Selector::root().child("contentSet");
    b.ensure_wrapper(&Selector::root(), "contentSet", None).unwrap();

    // Act
    b.ensure_wrapper(&content_set, "remoteContent", Some("urn:r1")).unwrap();
    b.ensure_wrapper(&content_set, "inlineXML", Some("application/nitf+xml"))
        .unwrap();
    b.ensure_wrapper(&content_set, "remoteContent", Some("urn:r1")).unwrap();

    // Assert
    let set = b.find(&content_set).unwrap();
    assert_eq!(
        b.tree().child_names(set),
        vec!["remoteContent", "inlineXML"]
    );
}

#[test]
fn given_missing_parent_when_ensuring_then_ambiguous_or_missing_parent_and_untouched() {
    // Arrange
    let mut b = news_item();
    let size = b.tree().len();

    // Act
    let parent = Selector::parse("/newsItem/contentSet").unwrap();
    let result = b.ensure_wrapper(&parent, "remoteContent", Some("r1"));

    // Assert
    assert!(matches!(
        result,
        Err(DomainError::AmbiguousOrMissingParent { matches: 0, .. })
    ));
    assert_eq!(b.outcome(), Outcome::AmbiguousOrMissingParent);
    assert_eq!(b.tree().len(), size);
}

#[test]
fn given_two_part_metas_when_unkeyed_selector_used_as_parent_then_ambiguous() {
    // Arrange
    let mut b = news_item();
    b.ensure_wrapper(&Selector::root(), "partMeta", Some("p1")).unwrap();
    b.ensure_wrapper(&Selector::root(), "partMeta", Some("p2")).unwrap();

    // Act
    let result = b.add_property_under(
        &Selector::parse("partMeta").unwrap(),
        &PropertyValue::new("headline").with_text("h"),
    );

    // Assert
    assert!(matches!(
        result,
        Err(DomainError::AmbiguousOrMissingParent { matches: 2, .. })
    ));
}

#[test]
fn given_keyed_selector_when_adding_property_under_then_lands_in_that_part() {
    // Arrange
    let mut b = news_item();
    b.ensure_wrapper(&Selector::root(), "partMeta", Some("p1")).unwrap();
    let p2 = b.ensure_wrapper(&Selector::root(), "partMeta", Some("p2")).unwrap();

    // Act
    b.add_property_under(
        &Selector::parse("/newsItem/nar:partMeta[@partid='p2']").unwrap(),
        &PropertyValue::new("headline").with_text("second"),
    )
    .unwrap();

    // Assert
    assert_eq!(texts(&b, p2.node), vec!["second"]);
    assert_eq!(b.outcome(), Outcome::Ok);
}

#[test]
fn given_catalog_refs_when_added_then_always_first_and_deduplicated_by_href() {
    // Arrange
    let mut b = news_item();
    b.ensure_wrapper(&Selector::root(), "itemMeta", None).unwrap();

    // Act
    let first = b.add_catalog_ref("http://a/catalog.xml").unwrap();
    b.add_catalog_ref("http://b/catalog.xml").unwrap();
    let again = b.add_catalog_ref("http://a/catalog.xml").unwrap();

    // Assert
    assert_eq!(
        b.tree().child_names(b.root()),
        vec!["catalogRef", "catalogRef", "itemMeta"]
    );
    assert_eq!(first.node, again.node);
    assert!(!again.created);
    assert!(b.add_catalog_ref(" ").is_err());
    assert_eq!(b.outcome(), Outcome::InvalidInput);
}

#[test]
fn given_absent_node_when_finding_then_not_found_outcome() {
    // Arrange
    let b = news_item();

    // Act
    let result = b.find(&Selector::parse("contentMeta/headline").unwrap());

    // Assert
    assert!(matches!(result, Err(DomainError::NotFound(_))));
    assert_eq!(b.outcome(), Outcome::NotFound);
}

#[test]
fn given_unbound_prefix_when_resolving_then_invalid_input() {
    // Arrange
    let mut b = news_item();

    // Act
    let result = b.ensure_wrapper(&Selector::parse("ext:itemMeta").unwrap(), "title", None);

    // Assert
    assert!(matches!(result, Err(DomainError::UnknownPrefix { .. })));
    assert_eq!(b.outcome(), Outcome::InvalidInput);
}

#[test]
fn given_concept_item_when_adding_concept_properties_then_concept_order() {
    // Arrange
    let mut b = DocumentBuilder::new(&DocumentConfig::new(Variant::ConceptItem));

    // Act
    b.add_property("concept", None, &PropertyValue::new("definition").with_text("d"))
        .unwrap();
    b.add_property("concept", None, &PropertyValue::new("name").with_text("Weather"))
        .unwrap();
    let concept_id = PropertyValue::new("conceptId").attr("qcode", "medtop:17000000");
    b.add_property("concept", None, &concept_id).unwrap();
    b.ensure_wrapper(&Selector::root(), "itemMeta", None).unwrap();

    // Assert
    let concept = b.wrapper(&Selector::root(), "concept", None).unwrap();
    assert_eq!(
        b.tree().child_names(concept),
        vec!["conceptId", "name", "definition"]
    );
    assert_eq!(b.tree().child_names(b.root()), vec!["itemMeta", "concept"]);
}

#[test]
fn given_node_when_computing_path_then_keyed_absolute_selector() {
    // Arrange
    let mut b = news_item();
    let part = b.ensure_wrapper(&Selector::root(), "partMeta", Some("p1")).unwrap();

    // Act
    let path = b.path_of(part.node);

    // Assert
    assert_eq!(path.to_string(), "/newsItem/partMeta[@partid='p1']");
    assert_eq!(b.find(&path).unwrap(), part.node);
}

#[test]
fn given_part_meta_when_setting_seq_and_contentrefs_then_attributes_on_existing_wrapper() {
    // Arrange
    let mut b = news_item();
    let created = b.ensure_wrapper(&Selector::root(), "partMeta", Some("p1")).unwrap();

    // Act
    let updated = b.add_part_meta("p1", Some(2), Some("body")).unwrap();

    // Assert
    assert_eq!(updated.node, created.node);
    assert!(!updated.created);
    let part = b.tree().element(updated.node).unwrap();
    assert_eq!(part.attribute("partid"), Some("p1"));
    assert_eq!(part.attribute("seq"), Some("2"));
    assert_eq!(part.attribute("contentrefs"), Some("body"));
    assert_eq!(b.outcome(), Outcome::Ok);
}

#[test]
fn given_absent_wrapper_when_setting_attributes_then_created_in_schema_order() {
    // Arrange
    let mut b = news_item();
    b.ensure_wrapper(&Selector::root(), "contentSet", None).unwrap();
    let attributes = BTreeMap::from([("id".to_string(), "meta1".to_string())]);

    // Act
    let ensured = b
        .set_wrapper_attributes(&Selector::root(), "itemMeta", None, &attributes)
        .unwrap();

    // Assert
    assert!(ensured.created);
    assert_eq!(b.tree().child_names(b.root()), vec!["itemMeta", "contentSet"]);
    assert_eq!(b.tree().element(ensured.node).unwrap().attribute("id"), Some("meta1"));
}

#[rstest]
#[case("partid", "p2")]
#[case("xmlns", "http://example.com/")]
#[case("xmlns:x", "http://example.com/")]
#[case(" ", "v")]
fn given_unsettable_attribute_when_setting_wrapper_attributes_then_invalid_input_and_untouched(
    #[case] name: &str,
    #[case] value: &str,
) {
    // Arrange
    let mut b = news_item();
    let size = b.tree().len();
    let attributes = BTreeMap::from([(name.to_string(), value.to_string())]);

    // Act
    let result = b.set_wrapper_attributes(&Selector::root(), "partMeta", Some("p1"), &attributes);

    // Assert
    assert!(matches!(result, Err(DomainError::InvalidValue { .. })));
    assert_eq!(b.outcome(), Outcome::InvalidInput);
    assert_eq!(b.tree().len(), size);
}

#[test]
fn given_language_tag_when_setting_root_lang_then_xml_lang_on_root() {
    // Arrange
    let mut b = news_item();

    // Act
    b.set_root_lang("en-GB").unwrap();
    let invalid = b.set_root_lang("not a tag");

    // Assert
    let root = b.tree().element(b.root()).unwrap();
    assert_eq!(root.attribute("xml:lang"), Some("en-GB"));
    assert!(matches!(invalid, Err(DomainError::InvalidValue { .. })));
    assert_eq!(b.outcome(), Outcome::InvalidInput);
}

#[test]
fn given_empty_guid_and_zero_version_when_creating_then_attributes_omitted() {
    // Arrange
    let config = DocumentConfig::new(Variant::NewsItem)
        .with_guid("")
        .with_version(0);

    // Act
    let b = DocumentBuilder::new(&config);

    // Assert
    let root = b.tree().element(b.root()).unwrap();
    assert_eq!(root.attribute("guid"), None);
    assert_eq!(root.attribute("version"), None);
    assert_eq!(root.attribute("standard"), Some("NewsML-G2"));
}

#[test]
fn given_blank_configured_catalog_when_creating_then_skipped() {
    // Arrange
    let config = DocumentConfig::new(Variant::NewsItem)
        .with_catalog("  ")
        .with_catalog("http://a/catalog.xml");

    // Act
    let b = DocumentBuilder::new(&config);

    // Assert
    assert_eq!(b.tree().child_names(b.root()), vec!["catalogRef"]);
    assert_eq!(
        attribute_values(&b, b.root(), "href"),
        vec!["http://a/catalog.xml"]
    );
}
