//! Recipe evaluation
//!
//! A recipe is evaluated against a stack of layers, lowest precedence first:
//!
//! 1. the target context under `original.*`
//! 2. the user configuration under `config`
//! 3. built-in defaults for `build`
//! 4. the recipe itself
//!
//! The resolved `build` and `task` trees are then converted into a
//! [`BuildSpec`].

use indexmap::{IndexMap, IndexSet};
use kilt_hocon::{Config, ConfigBuilder, Document};
use serde_json::{Map, Value};

use crate::context::TargetContext;
use crate::error::{RecipeError, RecipeResult};
use crate::spec::{BuildSpec, EnvPair, Override, SidecarSpec, TaskSpec};

const DEFAULTS: &str = r"
build {
    entry_point: ${original.entry_point}
    command: ${original.command}
    image: ${original.image}

    mount: []
}
";

const USER_CONFIG_PATH: &str = "config";

/// Recipe text paired with its user configuration
///
/// # Examples
/// ```
/// use kilt_recipe::{Override, Recipe, TargetContext};
///
/// let recipe = Recipe::new(r#"build.entry_point: ["/kilt/run", "--"]"#);
/// let context = TargetContext::new("app").with_image("busybox").with_command(["/app"]);
/// let spec = recipe.evaluate(&context)?;
/// assert_eq!(spec.image.as_deref(), Some("busybox"));
/// assert_eq!(spec.command, Override::Explicit(vec!["/app".to_string()]));
/// # Ok::<(), kilt_recipe::RecipeError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    definition: String,
    config: String,
}

impl Recipe {
    /// Create recipe with an empty user configuration
    #[inline]
    #[must_use]
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            config: String::new(),
        }
    }

    /// Attach user configuration, exposed to the recipe as `config.*`
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = config.into();
        self
    }

    /// Recipe text
    #[inline]
    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// User configuration text
    #[inline]
    #[must_use]
    pub fn config(&self) -> &str {
        &self.config
    }

    /// Check that recipe and configuration parse
    ///
    /// # Errors
    /// Returns [`RecipeError::ConfigSyntax`] if either text is malformed
    pub fn validate(&self) -> RecipeResult<()> {
        Document::parse("recipe", &self.definition)?;
        Document::parse("recipe config", &self.config)?;
        Ok(())
    }

    /// Evaluate the recipe against one container
    ///
    /// # Errors
    /// Returns error if the text is malformed, a hard substitution does
    /// not resolve, a value has the wrong shape or a sidecar is incomplete
    pub fn evaluate(&self, context: &TargetContext) -> RecipeResult<BuildSpec> {
        let tree = self.resolve(context)?;
        let spec = extract(&tree)?;
        tracing::debug!(
            container = %context.container_name,
            group = %context.group_name,
            sidecars = spec.sidecars.len(),
            "evaluated recipe"
        );
        Ok(spec)
    }

    /// Task-level settings, evaluated without a target container
    ///
    /// Only `task.pid_mode` and what it references is resolved, so
    /// container-specific substitutions elsewhere do not fail.
    ///
    /// # Errors
    /// Returns error if the text is malformed or `task.pid_mode` does not
    /// resolve to a simple value
    pub fn task(&self) -> RecipeResult<TaskSpec> {
        let config = self.layers(&TargetContext::default())?;
        let pid_mode = match config.get("task.pid_mode")? {
            Some(value) => text(&value).map_err(|reason| RecipeError::invalid_value("task.pid_mode", reason))?,
            None => None,
        };
        Ok(TaskSpec { pid_mode })
    }

    fn layers(&self, context: &TargetContext) -> RecipeResult<Config> {
        Ok(ConfigBuilder::new()
            .layer("target context", &context.to_layer())?
            .layer_at(USER_CONFIG_PATH, "recipe config", &self.config)?
            .layer("defaults", DEFAULTS)?
            .layer("recipe", &self.definition)?
            .build())
    }

    fn resolve(&self, context: &TargetContext) -> RecipeResult<Value> {
        Ok(self.layers(context)?.resolve()?)
    }
}

/// Evaluate `recipe` with `user_config` against one container
///
/// # Errors
/// See [`Recipe::evaluate`]
pub fn evaluate(recipe: &str, user_config: &str, context: &TargetContext) -> RecipeResult<BuildSpec> {
    Recipe::new(recipe).with_config(user_config).evaluate(context)
}

/// Apply the rendering rule: null, empty lists and empty objects are absent
#[must_use]
pub fn render(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other),
    }
}

fn extract(tree: &Value) -> RecipeResult<BuildSpec> {
    let build = tree.get("build").unwrap_or(&Value::Null);

    // an empty image inherits like an absent one
    let image = match build.get("image") {
        Some(value) => text(value).map_err(|reason| RecipeError::invalid_value("build.image", reason))?,
        None => None,
    }
    .filter(|image| !image.is_empty());

    Ok(BuildSpec {
        image,
        entry_point: Override::from_list(list(build.get("entry_point"), "build.entry_point")?),
        command: Override::from_list(list(build.get("command"), "build.command")?),
        capabilities: list(build.get("capabilities"), "build.capabilities")?
            .unwrap_or_default()
            .into_iter()
            .collect::<IndexSet<_>>(),
        environment: environment(build.get("environment_variables"))?,
        sidecars: sidecars(build.get("mount"))?,
        task: task_spec(tree)?,
    })
}

fn task_spec(tree: &Value) -> RecipeResult<TaskSpec> {
    let pid_mode = match tree.get("task").and_then(|task| task.get("pid_mode")) {
        Some(value) => text(value).map_err(|reason| RecipeError::invalid_value("task.pid_mode", reason))?,
        None => None,
    };
    Ok(TaskSpec { pid_mode })
}

/// Simple value as text, `None` when it renders absent
fn text(value: &Value) -> Result<Option<String>, String> {
    match render(value) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err("expected a simple value".to_string()),
    }
}

fn text_list(value: &Value) -> Result<Option<Vec<String>>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match text(item)? {
                    Some(s) => out.push(s),
                    None => return Err("list items must be simple values".to_string()),
                }
            }
            Ok(Some(out))
        }
        _ => Err("expected a list".to_string()),
    }
}

fn list(value: Option<&Value>, path: &str) -> RecipeResult<Option<Vec<String>>> {
    match value {
        None => Ok(None),
        Some(value) => text_list(value).map_err(|reason| RecipeError::invalid_value(path, reason)),
    }
}

fn text_map(value: &Value) -> Result<IndexMap<String, String>, (String, String)> {
    let map = match value {
        Value::Null => return Ok(IndexMap::new()),
        Value::Object(map) => map,
        _ => return Err((String::new(), "expected an object".to_string())),
    };

    let mut out = IndexMap::with_capacity(map.len());
    for (name, value) in map {
        if let Some(text) = text(value).map_err(|reason| (name.clone(), reason))? {
            out.insert(name.clone(), text);
        }
    }
    out.sort_keys();
    Ok(out)
}

fn environment(value: Option<&Value>) -> RecipeResult<IndexMap<String, String>> {
    const PATH: &str = "build.environment_variables";
    let Some(value) = value else {
        return Ok(IndexMap::new());
    };
    text_map(value).map_err(|(name, reason)| {
        let path = if name.is_empty() {
            PATH.to_string()
        } else {
            format!("{PATH}.{name}")
        };
        RecipeError::invalid_value(path, reason)
    })
}

fn sidecars(value: Option<&Value>) -> RecipeResult<Vec<SidecarSpec>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| sidecar(entry).map_err(|reason| RecipeError::invalid_sidecar(index, reason)))
            .collect(),
        Some(_) => Err(RecipeError::invalid_value("build.mount", "expected a list")),
    }
}

fn sidecar(entry: &Value) -> Result<SidecarSpec, String> {
    let Value::Object(fields) = entry else {
        return Err("entry must be an object".to_string());
    };

    let name = required_text(fields, "name")?;
    let image = required_text(fields, "image")?;

    let volumes = match fields.get("volumes") {
        None | Some(Value::Null) => return Err("volumes is required".to_string()),
        Some(value) => text_list(value)
            .map_err(|reason| format!("volumes: {reason}"))?
            .unwrap_or_default(),
    };

    let entry_point = match fields.get("entry_point") {
        Some(value) => text_list(value).map_err(|reason| format!("entry_point: {reason}"))?,
        None => None,
    }
    .filter(|entry_point| !entry_point.is_empty())
    .ok_or_else(|| "entry_point is required".to_string())?;

    let environment = match fields.get("environment_variables") {
        Some(value) => text_map(value).map_err(|(name, reason)| {
            if name.is_empty() {
                format!("environment_variables: {reason}")
            } else {
                format!("environment_variables.{name}: {reason}")
            }
        })?,
        None => IndexMap::new(),
    }
    .into_iter()
    .map(|(name, value)| EnvPair { name, value })
    .collect();

    Ok(SidecarSpec {
        name,
        image,
        volumes,
        entry_point,
        environment,
    })
}

fn required_text(fields: &Map<String, Value>, key: &str) -> Result<String, String> {
    let value = fields.get(key).unwrap_or(&Value::Null);
    text(value)
        .map_err(|reason| format!("{key}: {reason}"))?
        .filter(|text| !text.is_empty())
        .ok_or_else(|| format!("{key} is required"))
}
