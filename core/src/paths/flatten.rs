#![deny(missing_docs)]

//! # Path Flattening
//!
//! Produces one [`OperationDescriptor`] per declared operation, with container and
//! operation metadata merged.
//!
//! Order: entries in declaration order; within an entry, the fixed methods in
//! canonical order followed by `additionalOperations` in declaration order.

use crate::error::{AppError, AppResult};
use crate::params::descriptor::ParameterDescriptor;
use crate::params::style::ParamLocation;
use crate::paths::model::{HttpMethod, Operation, OperationDescriptor, PathItem, PathMap, RouteKind};
use crate::paths::parameters::resolve_parameters;
use crate::paths::resolve::{resolve_path_item, ResolutionContext, ResolvedPathItem};

/// Flattens `paths` then `webhooks`.
pub fn flatten(
    paths: &PathMap,
    webhooks: Option<&PathMap>,
    ctx: &ResolutionContext<'_>,
) -> AppResult<Vec<OperationDescriptor>> {
    let mut operations = flatten_map(paths, RouteKind::Path, ctx)?;
    if let Some(webhooks) = webhooks {
        operations.extend(flatten_map(webhooks, RouteKind::Webhook, ctx)?);
    }
    Ok(operations)
}

/// Flattens every entry of one map. Unresolvable containers are skipped.
pub fn flatten_map(
    map: &PathMap,
    kind: RouteKind,
    ctx: &ResolutionContext<'_>,
) -> AppResult<Vec<OperationDescriptor>> {
    let mut operations = Vec::new();
    for (path, item) in &map.items {
        match resolve_path_item(item, ctx) {
            Some(resolved) => operations.extend(flatten_item(path, kind, &resolved, ctx)?),
            None => tracing::warn!(
                path = %path,
                reference = item.reference.as_deref().unwrap_or_default(),
                "skipping unresolved path item"
            ),
        }
    }
    Ok(operations)
}

/// Flattens one resolved container.
pub fn flatten_item(
    path: &str,
    kind: RouteKind,
    resolved: &ResolvedPathItem<'_>,
    ctx: &ResolutionContext<'_>,
) -> AppResult<Vec<OperationDescriptor>> {
    let container = &resolved.item;
    let components = resolved.components.as_ref();
    let self_uri = resolved.self_uri.as_deref();
    let (param_components, param_self) = resolved.parameter_context();
    let common = resolve_parameters(&container.parameters, param_components, param_self)?;

    let mut methods: Vec<(HttpMethod, &Operation)> = container.fixed_operations().collect();
    for (token, operation) in &container.additional_operations {
        if !is_http_token(token) {
            tracing::warn!(path, method = %token, "skipping operation with invalid method token");
            continue;
        }
        if is_reserved_method(token) {
            tracing::warn!(
                path,
                method = %token,
                "skipping additional operation that shadows a fixed method"
            );
            continue;
        }
        methods.push((HttpMethod::Custom(token.clone()), operation));
    }

    let mut operations = Vec::with_capacity(methods.len());
    for (method, operation) in methods {
        let own = resolve_parameters(&operation.parameters, components, self_uri)?;
        let parameters = merge_parameters(&common, own);
        validate_query_families(path, &method, &parameters)?;
        operations.push(build_operation(path, kind, method, operation, container, parameters, ctx));
    }
    Ok(operations)
}

/// Container parameters in order, replaced in place by operation parameters with the
/// same `(location, name)`; operation-only parameters follow.
pub fn merge_parameters(
    common: &[ParameterDescriptor],
    own: Vec<ParameterDescriptor>,
) -> Vec<ParameterDescriptor> {
    let mut merged: Vec<ParameterDescriptor> = common.to_vec();
    for param in own {
        match merged.iter_mut().find(|p| p.key() == param.key()) {
            Some(slot) => *slot = param,
            None => merged.push(param),
        }
    }
    merged
}

fn validate_query_families(
    path: &str,
    method: &HttpMethod,
    parameters: &[ParameterDescriptor],
) -> AppResult<()> {
    let querystrings: Vec<&ParameterDescriptor> = parameters
        .iter()
        .filter(|p| p.location == ParamLocation::QueryString)
        .collect();
    let Some(first) = querystrings.first() else {
        return Ok(());
    };
    if querystrings.len() > 1 {
        return Err(AppError::invalid_parameter(
            &first.name,
            format!("{} {} defines multiple querystring parameters", method, path),
        ));
    }
    if let Some(query) = parameters.iter().find(|p| p.location == ParamLocation::Query) {
        return Err(AppError::invalid_parameter(
            &first.name,
            format!(
                "{} {} mixes a querystring parameter with query parameter '{}'",
                method, path, query.name
            ),
        ));
    }
    Ok(())
}

fn build_operation(
    path: &str,
    kind: RouteKind,
    method: HttpMethod,
    operation: &Operation,
    container: &PathItem,
    parameters: Vec<ParameterDescriptor>,
    ctx: &ResolutionContext<'_>,
) -> OperationDescriptor {
    let servers = match &operation.servers {
        Some(servers) if !servers.is_empty() => servers.clone(),
        _ => container.servers.clone(),
    };
    let security = operation
        .security
        .clone()
        .or_else(|| ctx.global_security.map(<[_]>::to_vec));

    OperationDescriptor {
        path: path.to_string(),
        kind,
        method,
        operation_id: operation.operation_id.clone(),
        summary: operation.summary.clone().or_else(|| container.summary.clone()),
        description: operation
            .description
            .clone()
            .or_else(|| container.description.clone()),
        tags: operation.tags.clone(),
        deprecated: operation.deprecated,
        parameters,
        request_body: operation.request_body.clone(),
        responses: operation.responses.clone(),
        callbacks: operation.callbacks.clone(),
        security,
        servers,
        extensions: operation.extensions.clone(),
    }
}

fn is_reserved_method(method: &str) -> bool {
    matches!(
        method.to_ascii_lowercase().as_str(),
        "get" | "put" | "post" | "delete" | "options" | "head" | "patch" | "trace" | "query"
    )
}

fn is_http_token(method: &str) -> bool {
    !method.is_empty() && method.chars().all(is_tchar)
}

fn is_tchar(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|' | '~'
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::model::Components;
    use crate::paths::resolve::ExternalPathItem;
    use serde_json::{json, Value};

    fn paths(yaml: &str) -> PathMap {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_operation_parameter_overrides_container() {
        let map = paths(
            r#"
/items:
  parameters:
    - {name: x, in: query, description: container, schema: {type: string}}
    - {name: page, in: query, schema: {type: integer}}
  get:
    parameters:
      - {name: x, in: query, description: operation, schema: {type: array}}
      - {name: trace, in: header}
"#,
        );
        let comps = Components::default();
        let ctx = ResolutionContext::new(&comps);
        let ops = flatten(&map, None, &ctx).unwrap();
        assert_eq!(ops.len(), 1);

        let names: Vec<&str> = ops[0].parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["x", "page", "trace"]);
        let x = ops[0].parameter(ParamLocation::Query, "x").unwrap();
        assert_eq!(x.description.as_deref(), Some("operation"));
        assert!(x.value_types.contains("array"));
    }

    #[test]
    fn test_same_name_different_location_kept() {
        let map = paths(
            r#"
/items/{id}:
  parameters:
    - {name: id, in: path, required: true}
  get:
    parameters:
      - {name: id, in: query}
"#,
        );
        let comps = Components::default();
        let ops = flatten(&map, None, &ResolutionContext::new(&comps)).unwrap();
        assert_eq!(ops[0].parameters.len(), 2);
    }

    #[test]
    fn test_summary_description_servers_fallback() {
        let map = paths(
            r#"
/items:
  summary: Items
  description: All items
  servers:
    - url: https://items.example.com
  get:
    summary: List items
  post:
    servers:
      - url: https://write.example.com
"#,
        );
        let comps = Components::default();
        let ops = flatten(&map, None, &ResolutionContext::new(&comps)).unwrap();
        assert_eq!(ops[0].summary.as_deref(), Some("List items"));
        assert_eq!(ops[0].description.as_deref(), Some("All items"));
        assert_eq!(ops[0].servers[0].url, "https://items.example.com");
        assert_eq!(ops[1].summary.as_deref(), Some("Items"));
        assert_eq!(ops[1].servers[0].url, "https://write.example.com");
    }

    #[test]
    fn test_method_order_and_custom_methods() {
        let map = paths(
            r#"
/files:
  query: {}
  delete: {}
  get: {}
  additionalOperations:
    PURGE: {}
    "BAD TOKEN": {}
    post: {}
    COPY: {}
"#,
        );
        let comps = Components::default();
        let ops = flatten(&map, None, &ResolutionContext::new(&comps)).unwrap();
        let methods: Vec<String> = ops.iter().map(|op| op.method.to_string()).collect();
        assert_eq!(methods, vec!["GET", "DELETE", "QUERY", "PURGE", "COPY"]);
        assert_eq!(ops[3].method, HttpMethod::Custom("PURGE".to_string()));
    }

    #[test]
    fn test_querystring_and_query_rejected() {
        let map = paths(
            r#"
/search:
  parameters:
    - {name: q, in: querystring, content: {application/x-www-form-urlencoded: {schema: {type: string}}}}
  get:
    parameters:
      - {name: limit, in: query}
"#,
        );
        let comps = Components::default();
        let err = flatten(&map, None, &ResolutionContext::new(&comps)).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_multiple_querystrings_rejected() {
        let map = paths(
            r#"
/search:
  get:
    parameters:
      - {name: a, in: querystring}
      - {name: b, in: querystring}
"#,
        );
        let comps = Components::default();
        assert!(flatten(&map, None, &ResolutionContext::new(&comps)).is_err());
    }

    #[test]
    fn test_security_fallback() {
        let map = paths(
            r#"
/a:
  get: {}
  post:
    security: []
  put:
    security:
      - apiKey: []
"#,
        );
        let comps = Components::default();
        let global = vec![json!({"oauth": ["read"]})];
        let ctx = ResolutionContext::new(&comps).with_global_security(Some(global.as_slice()));
        let ops = flatten(&map, None, &ctx).unwrap();
        assert_eq!(ops[0].security, Some(global.clone()));
        assert_eq!(ops[1].security, Some(vec![json!({"apiKey": []})]));
        assert_eq!(ops[2].security, Some(Vec::<Value>::new()));
    }

    #[test]
    fn test_webhooks_follow_paths() {
        let map = paths("/a:\n  get: {}\n");
        let hooks = paths("newPet:\n  post:\n    operationId: onNewPet\n");
        let comps = Components::default();
        let ops = flatten(&map, Some(&hooks), &ResolutionContext::new(&comps)).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1].kind, RouteKind::Webhook);
        assert_eq!(ops[1].path, "newPet");
        assert_eq!(ops[1].operation_id.as_deref(), Some("onNewPet"));
    }

    #[test]
    fn test_unresolved_container_skipped() {
        let map = paths(
            r#"
/missing:
  $ref: '#/components/pathItems/Missing'
/ok:
  get: {}
"#,
        );
        let comps = Components::default();
        let ops = flatten(&map, None, &ResolutionContext::new(&comps)).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].path, "/ok");
    }

    #[test]
    fn test_external_parameters_use_external_components() {
        let map = paths(
            r#"
/users:
  $ref: 'https://example.com/shared.yaml#/components/pathItems/Users'
"#,
        );
        let shared: Components = serde_yaml::from_str(
            r#"
parameters:
  Tenant:
    name: tenant
    in: header
pathItems:
  Users:
    parameters:
      - $ref: '#/components/parameters/Tenant'
    get: {}
"#,
        )
        .unwrap();
        let resolver = |base: Option<&str>, key: &str| {
            let comps = shared.clone();
            let item = comps.path_items.get(key)?.clone();
            Some(ExternalPathItem {
                item,
                components: Some(comps),
                self_base: base.map(str::to_string),
            })
        };
        let local = Components::default();
        let ctx = ResolutionContext::new(&local).with_external(&resolver);
        let ops = flatten(&map, None, &ctx).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(ops[0].parameter(ParamLocation::Header, "tenant").is_some());
    }

    #[test]
    fn test_referrer_parameters_resolve_in_referrer_document() {
        let map = paths(
            r#"
/users:
  $ref: 'shared.yaml#/components/pathItems/Users'
  parameters:
    - $ref: '#/components/parameters/Tenant'
"#,
        );
        let local: Components = serde_yaml::from_str(
            r#"
parameters:
  Tenant:
    name: tenant
    in: header
"#,
        )
        .unwrap();
        let shared: Components = serde_yaml::from_str(
            r#"
parameters:
  Tenant:
    name: shared-tenant
    in: query
pathItems:
  Users:
    parameters:
      - $ref: '#/components/parameters/Tenant'
    get: {}
"#,
        )
        .unwrap();
        let resolver = |base: Option<&str>, key: &str| {
            let item = shared.path_items.get(key)?.clone();
            Some(ExternalPathItem {
                item,
                components: Some(shared.clone()),
                self_base: base.map(str::to_string),
            })
        };
        let ctx = ResolutionContext::new(&local)
            .with_self_uri(Some("https://example.com/api.yaml"))
            .with_external(&resolver);

        let ops = flatten(&map, None, &ctx).unwrap();
        let names: Vec<&str> = ops[0].parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["tenant"]);
        assert!(ops[0].parameter(ParamLocation::Header, "tenant").is_some());
    }
}
