//! Template patching
//!
//! Walks the `Resources` of a CloudFormation template and instruments
//! the containers of every `AWS::ECS::TaskDefinition`.

use indexmap::IndexMap;
use kilt_patch::document::merge_defaults;
use kilt_patch::{container_name, should_patch, OptTags, PatchEngine, PatchOutcome};
use kilt_recipe::{Recipe, TaskSpec};
use serde_json::{Map, Value};

use crate::config::PatcherConfig;
use crate::context::{resource_tags, ParameterValues, ResourceScope};
use crate::error::{ContainerError, PatcherError, PatcherResult};
use crate::metadata::ImageMetadataProvider;
use crate::report::{ContainerFailure, PatchReport, ResourceReport};

/// Resource type holding container definitions
pub const TASK_DEFINITION_TYPE: &str = "AWS::ECS::TaskDefinition";

/// Patches CloudFormation templates with one recipe
pub struct TemplatePatcher {
    config: PatcherConfig,
    recipe: Recipe,
    metadata: Option<Box<dyn ImageMetadataProvider>>,
}

impl std::fmt::Debug for TemplatePatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplatePatcher")
            .field("config", &self.config)
            .field("metadata", &self.metadata.is_some())
            .finish_non_exhaustive()
    }
}

impl TemplatePatcher {
    /// Create patcher
    #[must_use]
    pub fn new(config: PatcherConfig) -> Self {
        let recipe = Recipe::new(config.recipe.clone()).with_config(config.recipe_config.clone());
        Self {
            config,
            recipe,
            metadata: None,
        }
    }

    /// Use `provider` for containers without entry point or command
    #[must_use]
    pub fn with_metadata_provider(mut self, provider: impl ImageMetadataProvider + 'static) -> Self {
        self.metadata = Some(Box::new(provider));
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PatcherConfig {
        &self.config
    }

    /// Patch `template` in place
    ///
    /// `parameter_values` maps template parameter names to deployment
    /// values; it may be `null`.
    ///
    /// # Errors
    /// Returns error if the template is malformed, the recipe cannot be
    /// parsed or every selected container of a resource fails
    pub fn patch(&self, template: &mut Value, parameter_values: &Value) -> PatcherResult<PatchReport> {
        let Value::Object(root) = template else {
            return Err(PatcherError::invalid_template("template must be an object"));
        };

        let parameters = ParameterValues::new(parameter_values, root.get("Parameters"));
        let mut report = PatchReport::default();
        let mut declared = Map::new();

        let resources = match root.get_mut("Resources") {
            None => return Ok(report),
            Some(Value::Object(resources)) => resources,
            Some(_) => return Err(PatcherError::invalid_template("Resources must be an object")),
        };

        for (name, resource) in resources.iter_mut() {
            if resource.get("Type").and_then(Value::as_str) != Some(TASK_DEFINITION_TYPE) {
                continue;
            }

            let tags = OptTags::from_resource(resource);
            if tags.skips_resource() {
                tracing::info!(resource = %name, "skipping resource due to ignore tag");
                report.ignored.push(name.clone());
                continue;
            }

            let (resource_report, resource_parameters) = self.patch_resource(name, resource, &tags, &parameters)?;
            for (parameter, declaration) in resource_parameters {
                declared.entry(parameter).or_insert(declaration);
            }
            report.resources.push(resource_report);
        }

        if !declared.is_empty() {
            let slot = root
                .entry("Parameters")
                .or_insert_with(|| Value::Object(Map::new()));
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            if !slot.is_object() {
                return Err(PatcherError::invalid_template("Parameters must be an object"));
            }
            report.parameters = declared.keys().cloned().collect();
            merge_defaults(slot, &Value::Object(declared));
        }

        tracing::info!(
            resources = report.resources.len(),
            containers = report.patched_containers(),
            parameters = report.parameters.len(),
            "template patched"
        );
        Ok(report)
    }

    /// Parse, patch and serialize a template
    ///
    /// Empty `parameter_values` text means no values.
    ///
    /// # Errors
    /// Returns error if either text is not JSON or patching fails
    pub fn patch_json(&self, template: &str, parameter_values: &str) -> PatcherResult<(String, PatchReport)> {
        let mut template: Value = serde_json::from_str(template)?;
        let parameter_values: Value = if parameter_values.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(parameter_values)?
        };
        let report = self.patch(&mut template, &parameter_values)?;
        Ok((serde_json::to_string_pretty(&template)?, report))
    }

    fn patch_resource(
        &self,
        name: &str,
        resource: &mut Value,
        tags: &OptTags,
        parameters: &ParameterValues,
    ) -> PatcherResult<(ResourceReport, Map<String, Value>)> {
        self.recipe
            .validate()
            .map_err(|source| PatcherError::recipe(name, source))?;
        let engine = PatchEngine::new(self.config.patch_options(name)?);

        let all_tags = resource_tags(resource);
        let scope = ResourceScope {
            name,
            tags: &all_tags,
            parameters,
            metadata: self.metadata.as_deref(),
        };

        let mut report = ResourceReport::new(name);
        let mut sidecars: IndexMap<String, Value> = IndexMap::new();
        let mut declared = Map::new();
        let mut pid_mode = None;

        let Some(containers) = resource
            .pointer_mut("/Properties/ContainerDefinitions")
            .and_then(Value::as_array_mut)
        else {
            tracing::warn!(resource = %name, "task definition has no container definitions");
            return Ok((report, declared));
        };

        for container in containers.iter_mut() {
            let container_name = container_name(container);
            if !should_patch(&container_name, tags, self.config.opt_in) {
                tracing::info!(resource = %name, container = %container_name, "skipping container due to opt tags");
                report.skipped.push(container_name);
                continue;
            }

            match Self::patch_container(&scope, &self.recipe, &engine, container) {
                Ok((outcome, task)) => {
                    tracing::info!(resource = %name, container = %container_name, "patched container");
                    if pid_mode.is_none() {
                        pid_mode = task.pid_mode;
                    }
                    for (sidecar, definition) in outcome.sidecars {
                        sidecars.entry(sidecar).or_insert(definition);
                    }
                    for (parameter, declaration) in outcome.parameters {
                        declared.entry(parameter).or_insert(declaration);
                    }
                    report.patched.push(container_name);
                }
                Err(ContainerError::Recipe(source)) if source.is_syntax() => {
                    return Err(PatcherError::recipe(name, source));
                }
                Err(err) => {
                    tracing::warn!(resource = %name, container = %container_name, error = %err, "skipping container after failure");
                    report.failed.push(ContainerFailure {
                        container: container_name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if report.patched.is_empty() {
            if let Some(first) = report.failed.first() {
                return Err(PatcherError::ResourceFailed {
                    resource: name.to_string(),
                    container: first.container.clone(),
                    reason: first.reason.clone(),
                });
            }
            return Ok((report, declared));
        }

        for (sidecar, definition) in sidecars {
            let exists = containers
                .iter()
                .any(|c| c.get("Name").and_then(Value::as_str) == Some(sidecar.as_str()));
            if exists {
                tracing::debug!(resource = %name, %sidecar, "sidecar already present");
                continue;
            }
            containers.push(definition);
            report.sidecars.push(sidecar);
        }

        if let Some(pid_mode) = pid_mode {
            if let Some(Value::Object(properties)) = resource.get_mut("Properties") {
                properties.insert("PidMode".to_string(), Value::String(pid_mode.clone()));
            }
            report.pid_mode = Some(pid_mode);
        }

        tracing::info!(
            resource = %name,
            patched = report.patched.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "patched task definition"
        );
        Ok((report, declared))
    }

    /// Evaluate and apply the recipe, leaving the container untouched on failure
    fn patch_container(
        scope: &ResourceScope<'_>,
        recipe: &Recipe,
        engine: &PatchEngine,
        container: &mut Value,
    ) -> Result<(PatchOutcome, TaskSpec), ContainerError> {
        let context = scope.context(container)?;
        let spec = recipe.evaluate(&context)?;
        let original = container.clone();
        match engine.apply(container, &spec) {
            Ok(outcome) => Ok((outcome, spec.task)),
            Err(err) => {
                *container = original;
                Err(ContainerError::from(err))
            }
        }
    }
}
