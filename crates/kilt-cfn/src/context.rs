//! Target context extraction from templates

use indexmap::IndexMap;
use kilt_patch::{container, target_context, PatchResult};
use kilt_recipe::TargetContext;
use serde_json::{Map, Value};

use crate::metadata::ImageMetadataProvider;

/// Template parameter values, deployment values over declared defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterValues {
    values: Map<String, Value>,
}

impl ParameterValues {
    /// Combine `provided` values with the `Default`s of the template's `Parameters`
    #[must_use]
    pub fn new(provided: &Value, declared: Option<&Value>) -> Self {
        let mut values = Map::new();
        if let Some(Value::Object(declared)) = declared {
            for (name, declaration) in declared {
                if let Some(default) = declaration.get("Default") {
                    values.insert(name.clone(), default.clone());
                }
            }
        }
        if let Value::Object(provided) = provided {
            for (name, value) in provided {
                values.insert(name.clone(), value.clone());
            }
        }
        Self { values }
    }

    /// String value of a parameter
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }
}

/// Literal image of a container, resolving `{"Ref": parameter}`
#[must_use]
pub fn resolve_image(container: &Value, parameters: &ParameterValues) -> Option<String> {
    match container.get(container::IMAGE)? {
        Value::String(image) => Some(image.clone()),
        Value::Object(image) => {
            let Some(parameter) = image.get("Ref").and_then(Value::as_str) else {
                let image = Value::Object(image.clone());
                tracing::warn!(%image, "could not find the name of the image parameter");
                return None;
            };
            match parameters.get(parameter) {
                Some(resolved) => {
                    tracing::info!(%parameter, image = %resolved, "resolved image from template parameters");
                    Some(resolved.to_string())
                }
                None => {
                    tracing::warn!(%parameter, "could not resolve the image parameter");
                    None
                }
            }
        }
        _ => None,
    }
}

/// Inputs shared by every container of one resource
pub(crate) struct ResourceScope<'a> {
    pub(crate) name: &'a str,
    pub(crate) tags: &'a IndexMap<String, String>,
    pub(crate) parameters: &'a ParameterValues,
    pub(crate) metadata: Option<&'a dyn ImageMetadataProvider>,
}

impl ResourceScope<'_> {
    /// Snapshot one container of the resource
    pub(crate) fn context(&self, container: &Value) -> PatchResult<TargetContext> {
        let mut context = target_context(container, self.name)?;
        context.image = resolve_image(container, self.parameters);
        context.metadata = self.tags.clone();

        if let (Some(provider), Some(image)) = (self.metadata, context.image.as_deref()) {
            match provider.image_metadata(image) {
                Ok(metadata) => {
                    tracing::info!(%image, "extracted metadata from image");
                    if context.entry_point.is_none() {
                        context.entry_point = metadata.entry_point;
                    }
                    if context.command.is_none() {
                        context.command = metadata.command;
                    }
                }
                Err(err) => tracing::warn!(%image, error = %err, "could not retrieve image metadata"),
            }
        }

        if context.entry_point.is_none() {
            tracing::debug!(container = %context.container_name, "no EntryPoint was specified");
        }
        if context.command.is_none() {
            tracing::debug!(container = %context.container_name, "no Command was specified");
        }
        Ok(context)
    }
}

/// All tags of a resource as `Key -> Value`
pub(crate) fn resource_tags(resource: &Value) -> IndexMap<String, String> {
    let Some(Value::Array(entries)) = resource.get("Properties").and_then(|p| p.get("Tags")) else {
        return IndexMap::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let key = entry.get("Key")?.as_str()?;
            let value = entry.get("Value")?.as_str()?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
