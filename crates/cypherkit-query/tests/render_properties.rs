//! Rendering properties over arbitrary fragment trees.

use cypherkit_query::{cypher, CypherQuery, PlaceholderStyle, QueryValue, RenderOptions};
use proptest::prelude::*;
use serde_json::json;

fn segments_for(values: usize) -> Vec<String> {
    (0..=values).map(|i| format!(" s{i} ")).collect()
}

fn count_params(query: &CypherQuery) -> usize {
    query
        .values()
        .iter()
        .map(|value| match value {
            QueryValue::Param(_) => 1,
            QueryValue::Fragment(nested) => count_params(nested),
        })
        .sum()
}

fn arb_query() -> impl Strategy<Value = CypherQuery> {
    let leaf = prop::collection::vec(any::<i64>(), 0..4).prop_map(|values| {
        CypherQuery::from_parts(
            segments_for(values.len()),
            values.into_iter().map(QueryValue::from).collect(),
        )
        .unwrap()
    });

    leaf.prop_recursive(4, 48, 4, |inner| {
        prop::collection::vec(
            prop_oneof![
                any::<i64>().prop_map(QueryValue::from),
                inner.prop_map(QueryValue::from),
            ],
            0..4,
        )
        .prop_map(|values| CypherQuery::from_parts(segments_for(values.len()), values).unwrap())
    })
}

proptest! {
    #[test]
    fn render_is_deterministic(query in arb_query()) {
        prop_assert_eq!(query.render(), query.render());
    }

    #[test]
    fn parameter_names_never_collide(query in arb_query()) {
        let rendered = query.render();

        // every bound value survives under its own name
        prop_assert_eq!(rendered.params.len(), count_params(&query));
        // and every name appears as exactly one placeholder
        prop_assert_eq!(rendered.text.matches('$').count(), rendered.params.len());
    }

    #[test]
    fn braces_style_renders_same_params(query in arb_query()) {
        let dollar = query.render();
        let braces = query.render_with(&RenderOptions::default().placeholder(PlaceholderStyle::Braces));

        prop_assert_eq!(dollar.params, braces.params);
    }
}

#[test]
fn test_round_trip_single_value() {
    let query = CypherQuery::from_parts(
        vec!["MATCH (n) WHERE n.id = ", ""],
        vec![QueryValue::param("someValue")],
    )
    .unwrap();
    let rendered = query.render();

    assert_eq!(rendered.text.matches('$').count(), 1);
    assert_eq!(rendered.params.len(), 1);
    let (name, value) = rendered.params.first().unwrap();
    assert!(rendered.text.ends_with(&format!("${name}")));
    assert_eq!(value, &json!("someValue"));
}

#[test]
fn test_nested_keys_are_disjoint_union() {
    let b = cypher!("WHERE b.x = {} AND b.y = {}", 1, 2);
    let a = cypher!("MATCH (a {{id: {}}})\n{}", 0, b.clone());

    let a_keys: Vec<String> = a.render().params.keys().cloned().collect();
    let b_own: Vec<String> = b.render().params.keys().cloned().collect();

    assert_eq!(a_keys, vec!["p_0", "p_1_0", "p_1_1"]);
    assert_eq!(b_own, vec!["p_0", "p_1"]);
    assert!(a_keys
        .iter()
        .filter(|key| key.starts_with("p_1_"))
        .all(|key| b_own.contains(&key.replacen("p_1_", "p_", 1))));
}

#[test]
fn test_template_runtime_errors() {
    let err = CypherQuery::from_template("RETURN {}", vec![]).unwrap_err();
    assert!(matches!(
        err,
        cypherkit_query::ConstructionError::ArityMismatch {
            segments: 2,
            values: 0
        }
    ));

    let err = CypherQuery::from_template("RETURN {x}", vec![]).unwrap_err();
    assert!(matches!(
        err,
        cypherkit_query::ConstructionError::MalformedTemplate { .. }
    ));
}
