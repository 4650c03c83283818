use oasgraph_core::paths::parameters::resolve_parameters;
use oasgraph_core::{
    encode, ApiDocument, AppError, DynamicAnchorScope, ParamLocation, ParamStyle,
    ParameterEncoding, ResolutionContext, SchemaGraph, TypeClassifier, ValueShape,
};
use oasgraph_core::{resolve_path_item, Components, PathItem};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn document(yaml: &str) -> ApiDocument {
    ApiDocument::from_yaml_str(yaml).unwrap()
}

#[test]
fn resolving_a_plain_path_item_is_identity() {
    let doc = document(
        r#"
openapi: 3.2.0
paths:
  /pets:
    summary: Pets
    get:
      operationId: listPets
"#,
    );
    let item = &doc.paths.items["/pets"];
    let ctx = ResolutionContext::new(&doc.components);
    let once = resolve_path_item(item, &ctx).unwrap().item;
    assert_eq!(&once, item);
    let twice = resolve_path_item(&once, &ctx).unwrap().item;
    assert_eq!(twice, once);
}

#[test]
fn innermost_dynamic_anchor_wins() {
    let graph = SchemaGraph::from_value(&json!({
        "$id": "https://example.com/outer",
        "$dynamicAnchor": "X",
        "type": "object",
        "$defs": {
            "inner": {
                "$id": "https://example.com/inner",
                "$dynamicAnchor": "X",
                "properties": {"here": {"$dynamicRef": "#X"}}
            }
        },
        "properties": {"there": {"$dynamicRef": "#X"}}
    }))
    .unwrap();
    let root = graph.root().unwrap();
    let inner = graph.node(root).defs["inner"];
    let here = graph.node(inner).properties["here"];
    let there = graph.node(root).properties["there"];

    let scope = DynamicAnchorScope::build(&graph, root);
    assert_eq!(scope.resolve_dynamic_ref(here, "#X"), Some(inner));
    assert_eq!(scope.resolve_dynamic_ref(there, "#X"), Some(root));
}

#[test]
fn reference_cycles_terminate() {
    let doc = document(
        r#"
openapi: 3.2.0
paths:
  /loop:
    $ref: '#/components/pathItems/A'
  /ok:
    get: {}
components:
  schemas:
    A: {$ref: '#/components/schemas/B'}
    B: {$ref: '#/components/schemas/A'}
  pathItems:
    A: {$ref: '#/components/pathItems/B'}
    B: {$ref: '#/components/pathItems/A'}
"#,
    );
    let graph = &doc.components.schemas;
    let a = graph.named("A").unwrap();
    assert!(TypeClassifier::new(graph).effective_types(a).is_empty());

    let ops = doc.operations(None).unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].path, "/ok");
}

#[test]
fn referrer_summary_overrides_target() {
    let components: Components = serde_yaml::from_str(
        r#"
pathItems:
  Pets:
    summary: Target
    get: {}
"#,
    )
    .unwrap();
    let item = PathItem {
        reference: Some("#/components/pathItems/Pets".into()),
        summary: Some("Referrer".into()),
        ..PathItem::default()
    };
    let resolved = resolve_path_item(&item, &ResolutionContext::new(&components)).unwrap();
    assert_eq!(resolved.item.summary.as_deref(), Some("Referrer"));
}

#[test]
fn operation_parameter_replaces_container_parameter() {
    let doc = document(
        r#"
openapi: 3.2.0
paths:
  /items:
    parameters:
      - {name: x, in: query, description: container, schema: {type: string}}
    get:
      parameters:
        - {name: x, in: query, description: operation, schema: {type: integer}}
"#,
    );
    let ops = doc.operations(None).unwrap();
    let own: Vec<_> = serde_yaml::from_str(
        "- {name: x, in: query, description: operation, schema: {type: integer}}",
    )
    .unwrap();
    let expected = resolve_parameters(&own, &doc.components, None).unwrap();
    assert_eq!(ops[0].parameters, expected);
}

#[test]
fn serialization_table() {
    let cases: [(ParamLocation, ParamStyle, bool, &str, Value, &str); 4] = [
        (ParamLocation::Query, ParamStyle::Form, false, "id", json!([3, 4, 5]), "id=3,4,5"),
        (
            ParamLocation::Query,
            ParamStyle::SpaceDelimited,
            false,
            "id",
            json!([3, 4, 5]),
            "id=3%204%205",
        ),
        (
            ParamLocation::Query,
            ParamStyle::DeepObject,
            true,
            "color",
            json!({"r": "100", "g": "200", "b": "150"}),
            "color[r]=100&color[g]=200&color[b]=150",
        ),
        (ParamLocation::Path, ParamStyle::Matrix, false, "id", json!(5), ";id=5"),
    ];
    for (location, style, explode, name, value, expected) in cases {
        let encoding = ParameterEncoding::new(location)
            .with_style(style)
            .with_explode(explode);
        let wire = encode(&encoding, ValueShape::of_value(&value), name, &value).unwrap();
        assert_eq!(wire.text, expected);
    }
}

#[test]
fn illegal_configurations_are_rejected() {
    let encoding = ParameterEncoding::new(ParamLocation::Query)
        .with_style(ParamStyle::PipeDelimited)
        .with_explode(true);
    let value = json!(["a", "b"]);
    let err = encode(&encoding, ValueShape::Array, "ids", &value).unwrap_err();
    assert!(matches!(err, AppError::InvalidParameterConfiguration { .. }));

    let doc = document(
        r#"
openapi: 3.2.0
paths:
  /search:
    get:
      parameters:
        - {name: raw, in: querystring, content: {application/x-www-form-urlencoded: {schema: {type: string}}}}
        - {name: page, in: query, schema: {type: integer}}
"#,
    );
    let err = doc.operations(None).unwrap_err();
    assert!(err.is_invalid_parameter());
}

#[test]
fn implicit_types_are_inferred() {
    let graph = SchemaGraph::from_value(&json!({
        "properties": {
            "n": {"minimum": 0},
            "o": {"properties": {"a": {}}}
        }
    }))
    .unwrap();
    let root = graph.root().unwrap();
    let n = graph.node(root).properties["n"];
    let o = graph.node(root).properties["o"];

    let types = |id| graph.node(id).types.iter().cloned().collect::<Vec<_>>();
    assert_eq!(types(n), vec!["number".to_string()]);
    assert_eq!(types(o), vec!["object".to_string()]);
    assert!(graph.node(n).types_inferred);
}
