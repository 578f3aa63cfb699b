//! Container definition layout
//!
//! Field names follow the ECS container definition as written in
//! CloudFormation templates.

use indexmap::IndexMap;
use kilt_recipe::TargetContext;
use serde_json::{json, Value};

use crate::document::kind;
use crate::error::{PatchError, PatchResult};

/// Container name
pub const NAME: &str = "Name";
/// Container image
pub const IMAGE: &str = "Image";
/// Entry point list
pub const ENTRY_POINT: &str = "EntryPoint";
/// Command list
pub const COMMAND: &str = "Command";
/// Environment list of `{Name, Value}` entries
pub const ENVIRONMENT: &str = "Environment";
/// Added Linux capabilities
pub const CAPABILITIES: &str = "LinuxParameters.Capabilities.Add";
/// Volumes mounted from other containers
pub const VOLUMES_FROM: &str = "VolumesFrom";

/// Display name of a container: `Name` if it is a string, its JSON text otherwise
#[must_use]
pub fn container_name(container: &Value) -> String {
    match container.get(NAME) {
        Some(Value::String(name)) => name.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Read the `Environment` list, later duplicates win
///
/// # Errors
/// Returns error if the list or one of its entries is malformed
pub fn read_environment(container: &Value) -> PatchResult<IndexMap<String, Value>> {
    let entries = match container.get(ENVIRONMENT) {
        None | Some(Value::Null) => return Ok(IndexMap::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(PatchError::application(
                ENVIRONMENT,
                format!("expected a list, found {}", kind(other)),
            ))
        }
    };

    let mut env = IndexMap::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let Some(Value::String(name)) = entry.get("Name") else {
            return Err(PatchError::application(
                format!("{ENVIRONMENT}.{i}.Name"),
                "environment variable name must be a string",
            ));
        };
        let value = entry.get("Value").cloned().unwrap_or(Value::Null);
        env.insert(name.clone(), value);
    }
    Ok(env)
}

/// Rewrite the `Environment` list sorted by name
///
/// Nothing is written for an empty environment.
pub fn write_environment(container: &mut Value, env: &IndexMap<String, Value>) {
    if env.is_empty() {
        return;
    }
    let mut names: Vec<&String> = env.keys().collect();
    names.sort();
    let entries = names
        .into_iter()
        .map(|name| json!({"Name": name, "Value": env[name]}))
        .collect();
    if let Value::Object(map) = container {
        map.insert(ENVIRONMENT.to_string(), Value::Array(entries));
    }
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    match value? {
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        Value::Null => None,
        Value::String(s) => Some(vec![s.clone()]),
        other => Some(vec![other.to_string()]),
    }
}

/// Snapshot a container definition as a [`TargetContext`]
///
/// `Image` is taken only when it is a literal string; template references
/// are left for the caller to resolve.
///
/// # Errors
/// Returns error if the environment list is malformed
pub fn target_context(container: &Value, group_name: &str) -> PatchResult<TargetContext> {
    let image = match container.get(IMAGE) {
        Some(Value::String(image)) => Some(image.clone()),
        _ => None,
    };

    Ok(TargetContext {
        image,
        container_name: container_name(container),
        group_name: group_name.to_string(),
        entry_point: string_list(container.get(ENTRY_POINT)),
        command: string_list(container.get(COMMAND)),
        environment: read_environment(container)?,
        metadata: IndexMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn context_from_container() {
        let container = json!({
            "Name": "app",
            "Image": "busybox",
            "Command": ["/app", "--port", 8080],
            "Environment": [
                {"Name": "B", "Value": "2"},
                {"Name": "A", "Value": {"Ref": "Param"}}
            ]
        });
        let context = target_context(&container, "task").unwrap();
        assert_eq!(context.image.as_deref(), Some("busybox"));
        assert_eq!(context.group_name, "task");
        assert_eq!(context.entry_point, None);
        assert_eq!(
            context.command,
            Some(vec!["/app".to_string(), "--port".to_string(), "8080".to_string()])
        );
        assert_eq!(context.environment["A"], json!({"Ref": "Param"}));
    }

    #[test]
    fn image_reference_is_not_a_literal() {
        let container = json!({"Name": "app", "Image": {"Ref": "AppImage"}});
        assert_eq!(target_context(&container, "").unwrap().image, None);
    }

    #[test]
    fn structured_name_is_rendered_as_json() {
        let container = json!({"Name": {"Ref": "Name"}});
        assert_eq!(container_name(&container), r#"{"Ref":"Name"}"#);
    }

    #[test]
    fn malformed_environment() {
        let container = json!({"Environment": [{"Value": "x"}]});
        assert_eq!(read_environment(&container).unwrap_err().path(), "Environment.0.Name");
        let container = json!({"Environment": "x"});
        assert!(read_environment(&container).is_err());
    }

    #[test]
    fn environment_is_written_sorted() {
        let mut container = json!({"Name": "app"});
        let env: IndexMap<String, Value> =
            [("Z".to_string(), json!("1")), ("A".to_string(), json!("2"))].into_iter().collect();
        write_environment(&mut container, &env);
        assert_eq!(
            container["Environment"],
            json!([{"Name": "A", "Value": "2"}, {"Name": "Z", "Value": "1"}])
        );
    }
}
