//! Tests for selector parsing and resolution against built documents

use rstest::rstest;

use g2tree::domain::{
    DocumentBuilder, DocumentConfig, DomainError, NamespaceBindings, NodeMatch, Outcome,
    Resolver, Selector, Variant, NAR_NAMESPACE,
};

fn package_with_groups() -> DocumentBuilder {
    let mut b = DocumentBuilder::new(&DocumentConfig::new(Variant::PackageItem));
    let group_set = Selector::root().child("groupSet");
    b.ensure_wrapper(&Selector::root(), "groupSet", None).unwrap();
    b.ensure_wrapper(&group_set, "group", Some("root")).unwrap();
    b.ensure_wrapper(&group_set, "group", Some("main")).unwrap();
    b
}

#[rstest]
#[case("/packageItem/groupSet/group[@id='main']", 1)]
#[case("groupSet/group", 2)]
#[case("nar:groupSet/nar:group[@id=\"root\"]", 1)]
#[case("/packageItem/groupSet/group[@id='missing']", 0)]
#[case("/newsItem/groupSet", 0)]
#[case("/", 1)]
fn given_package_when_looking_up_then_match_count(#[case] expr: &str, #[case] expected: usize) {
    // Arrange
    let b = package_with_groups();
    let selector = Selector::parse(expr).unwrap();

    // Act
    let found = b.lookup(&selector).unwrap();

    // Assert
    assert_eq!(found.count(), expected, "selector {}", expr);
}

#[test]
fn given_extra_binding_when_resolving_prefixed_step_then_namespace_expanded() {
    // Arrange
    let mut b = package_with_groups();
    b.bind_namespace("g2", NAR_NAMESPACE).unwrap();

    // Act
    let found = b
        .lookup(&Selector::parse("/g2:packageItem/g2:groupSet").unwrap())
        .unwrap();

    // Assert
    assert!(matches!(found, NodeMatch::One(_)));
}

#[test]
fn given_unbound_prefix_when_looking_up_then_unknown_prefix() {
    // Arrange
    let b = package_with_groups();

    // Act
    let result = b.lookup(&Selector::parse("x:groupSet").unwrap());

    // Assert
    assert!(matches!(
        result,
        Err(DomainError::UnknownPrefix { ref prefix, .. }) if prefix == "x"
    ));
}

#[test]
fn given_empty_tree_when_resolving_then_no_match() {
    // Arrange
    let tree = g2tree::domain::DocumentTree::new();
    let bindings = NamespaceBindings::new("nar", NAR_NAMESPACE);
    let resolver = Resolver::new(&tree, &bindings);

    // Act
    let result = resolver.lookup_one(&Selector::root());

    // Assert
    assert!(matches!(
        result,
        Err(DomainError::AmbiguousOrMissingParent { matches: 0, .. })
    ));
}

#[rstest]
#[case("groupSet/")]
#[case("group[@id='a'")]
#[case("1group")]
#[case("a//b")]
fn given_malformed_expression_when_parsing_then_invalid_selector(#[case] expr: &str) {
    assert!(matches!(
        Selector::parse(expr),
        Err(DomainError::InvalidSelector { .. })
    ));
}

#[rstest]
#[case("nar", "http://example.com/other/")]
#[case("xml", "http://example.com/other/")]
#[case("xmlns", "http://example.com/other/")]
#[case("", "http://example.com/other/")]
#[case("ext", "  ")]
fn given_invalid_binding_when_binding_then_rejected_and_schema_lookup_intact(
    #[case] prefix: &str,
    #[case] uri: &str,
) {
    // Arrange
    let mut b = package_with_groups();

    // Act
    let result = b.bind_namespace(prefix, uri);

    // Assert
    assert!(matches!(result, Err(DomainError::InvalidBinding { .. })));
    assert_eq!(b.outcome(), Outcome::InvalidInput);
    assert_eq!(b.bindings().namespace_of(None), Some(NAR_NAMESPACE));
    assert_eq!(b.lookup(&Selector::parse("groupSet").unwrap()).unwrap().count(), 1);
}

#[test]
fn given_schema_prefix_when_rebound_to_same_namespace_then_accepted() {
    // Arrange
    let mut b = package_with_groups();

    // Act
    let result = b.bind_namespace("nar", NAR_NAMESPACE);

    // Assert
    assert!(result.is_ok());
    assert_eq!(b.outcome(), Outcome::Ok);
}
