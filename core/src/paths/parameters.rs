#![deny(missing_docs)]

//! # Parameter Resolution
//!
//! Turns the `parameters` list of a container or operation into
//! [`ParameterDescriptor`]s: references are followed, defaults applied and
//! unsatisfiable configurations rejected.

use crate::error::{AppError, AppResult};
use crate::params::descriptor::{ParameterDescriptor, ParameterPayload};
use crate::params::style::{
    resolve_explode, resolve_style, validate_explode_for_style, validate_style_for_location,
    ParamLocation, ParamStyle,
};
use crate::paths::model::{Components, Parameter, ParameterOrRef};
use crate::refs::{parse_component_ref, resolve_against, same_document};
use crate::schema::classify::{value_types, ValueShape};
use crate::schema::graph::TypeSet;
use serde_json::Value;
use std::collections::HashSet;

/// Resolves a list of parameters declared in one document.
///
/// Unresolvable references are skipped with a warning. Two entries with the same
/// `(location, name)` are an error.
pub fn resolve_parameters(
    params: &[ParameterOrRef],
    components: &Components,
    self_uri: Option<&str>,
) -> AppResult<Vec<ParameterDescriptor>> {
    let mut result = Vec::new();
    let mut seen = HashSet::new();

    for entry in params {
        let (param, ref_description) = match entry {
            ParameterOrRef::Item(param) => (Some(param.as_ref().clone()), None),
            ParameterOrRef::Ref(r) => (
                resolve_parameter_ref(&r.reference, components, self_uri, &mut HashSet::new()),
                r.description.clone(),
            ),
        };

        let Some(mut param) = param else {
            if let ParameterOrRef::Ref(r) = entry {
                tracing::warn!(reference = %r.reference, "skipping unresolved parameter reference");
            }
            continue;
        };
        if let Some(description) = ref_description {
            param.description = Some(description);
        }
        if is_ignored_header(&param) {
            tracing::debug!(name = %param.name, "ignoring reserved header parameter");
            continue;
        }
        if !seen.insert((param.location, param.name.clone())) {
            return Err(AppError::invalid_parameter(
                &param.name,
                format!("declared twice in location '{}'", param.location),
            ));
        }
        result.push(build_descriptor(&param, components)?);
    }

    Ok(result)
}

/// Follows a `#/components/parameters/{key}` reference (possibly chained).
pub fn resolve_parameter_ref(
    reference: &str,
    components: &Components,
    self_uri: Option<&str>,
    visiting: &mut HashSet<String>,
) -> Option<Parameter> {
    let target = parse_component_ref(reference, "parameters")?;
    if let Some(base) = target.base.as_deref() {
        let resolved = resolve_against(base, self_uri);
        if !self_uri.is_some_and(|s| same_document(&resolved, s)) {
            tracing::debug!(reference, "parameter reference points to another document");
            return None;
        }
    }
    if !visiting.insert(target.key.clone()) {
        tracing::debug!(reference, "parameter reference cycle");
        return None;
    }
    match components.parameters.get(&target.key)? {
        ParameterOrRef::Item(param) => Some(param.as_ref().clone()),
        ParameterOrRef::Ref(next) => {
            let mut param = resolve_parameter_ref(&next.reference, components, self_uri, visiting)?;
            if next.description.is_some() {
                param.description = next.description.clone();
            }
            Some(param)
        }
    }
}

/// Headers the protocol defines elsewhere; such parameter definitions are ignored.
fn is_ignored_header(param: &Parameter) -> bool {
    param.location == ParamLocation::Header
        && matches!(
            param.name.to_ascii_lowercase().as_str(),
            "accept" | "content-type" | "authorization"
        )
}

/// Builds the descriptor of one resolved parameter.
pub fn build_descriptor(param: &Parameter, components: &Components) -> AppResult<ParameterDescriptor> {
    let name = param.name.as_str();

    let payload = match (&param.schema, &param.content) {
        (Some(_), Some(_)) => {
            return Err(AppError::invalid_parameter(
                name,
                "cannot specify both 'schema' and 'content'",
            ))
        }
        (Some(schema), None) => Some(ParameterPayload::Schema(schema.clone())),
        (None, Some(content)) => {
            if content.len() != 1 {
                return Err(AppError::invalid_parameter(
                    name,
                    "'content' must define exactly one media type",
                ));
            }
            Some(ParameterPayload::Content(content.clone()))
        }
        (None, None) => None,
    };

    let allow_empty_value = param.allow_empty_value.unwrap_or(false);
    if allow_empty_value && param.location != ParamLocation::Query {
        return Err(AppError::invalid_parameter(
            name,
            "allowEmptyValue is only allowed for query parameters",
        ));
    }

    let style = resolve_style(param.style, param.location);
    validate_style_for_location(name, param.location, style)?;
    if param.explode == Some(true) {
        validate_explode_for_style(name, style, true)?;
    }
    let explode = resolve_explode(param.explode, style);

    let types = payload_types(payload.as_ref(), components);
    if style == ParamStyle::DeepObject
        && !types.is_empty()
        && ValueShape::from_types(&types) != ValueShape::Object
    {
        return Err(AppError::invalid_parameter(
            name,
            "style 'deepObject' requires an object schema",
        ));
    }
    if param.location == ParamLocation::QueryString && !types.is_empty() && !is_string_only(&types) {
        return Err(AppError::invalid_parameter(
            name,
            "querystring parameters must be string-typed",
        ));
    }

    Ok(ParameterDescriptor {
        name: param.name.clone(),
        location: param.location,
        description: param.description.clone(),
        required: param.location == ParamLocation::Path || param.required,
        deprecated: param.deprecated,
        style,
        explode,
        allow_reserved: param.allow_reserved.unwrap_or(false),
        allow_empty_value,
        payload,
        value_types: types,
        extensions: param.extensions.clone(),
    })
}

/// True when the non-null members of `types` are exactly `string`.
fn is_string_only(types: &TypeSet) -> bool {
    let mut non_null = types.iter().filter(|t| t.as_str() != "null");
    non_null.next().is_some_and(|t| t == "string") && non_null.next().is_none()
}

fn payload_types(payload: Option<&ParameterPayload>, components: &Components) -> TypeSet {
    let schema = match payload {
        Some(ParameterPayload::Schema(schema)) => Some(schema),
        Some(ParameterPayload::Content(content)) => {
            content.values().next().and_then(|media| media.get("schema"))
        }
        None => None,
    };
    schema
        .filter(|s| !s.is_null())
        .map(|s: &Value| value_types(s, &components.schemas, components.schema_scope()))
        .unwrap_or_default()
}
