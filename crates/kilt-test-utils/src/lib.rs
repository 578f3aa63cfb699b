//! Testing utilities for the Kilt workspace
//!
//! Shared recipes, container definitions and template builders.

#![allow(missing_docs)]

use kilt_recipe::TargetContext;
use serde_json::{json, Map, Value};

pub mod recipes {
    /// Wraps the command and mounts one sidecar
    pub const DEFAULT_RECIPE: &str = r#"
build {
    entry_point: ["/kilt/run", "--"]
    command: [] ${?original.entry_point} ${?original.command}
    mount: [
        {
            name: "KiltImage"
            image: "KILT:latest"
            volumes: ["/kilt"]
            entry_point: ["/kilt/wait"]
        }
    ]
    capabilities: ["SYS_PTRACE"]
}
"#;

    pub const PARAMETERIZE_RECIPE: &str = r#"
build {
    entry_point: ["/kilt/run", "--"]
    command: [] ${?original.entry_point} ${?original.command}
    environment_variables: {
        "SO_LONG_AND_THANKS": "ForAllTheFish"
    }
    mount: [
        {
            name: "KiltImage"
            image: "KILT:latest"
            volumes: ["/kilt"]
            entry_point: ["/kilt/wait"]
        }
    ]
    capabilities: ["SYS_PTRACE"]
}
"#;

    pub const SIDECAR_ENV_RECIPE: &str = r#"
build {
    entry_point: ["/kilt/run", "--"]
    command: [] ${?original.entry_point} ${?original.command}
    mount: [
        {
            name: "KiltImage"
            image: "KILT:latest"
            volumes: ["/kilt"]
            entry_point: ["/kilt/wait"]
            environment_variables: {
                "MEANING_OF_LIFE": "42"
            }
        }
    ]
    capabilities: ["SYS_PTRACE"]
}
"#;

    pub const TASK_PID_MODE_RECIPE: &str = r#"
build {
    entry_point: ["/kilt/run", "--"]
    command: [] ${?original.entry_point} ${?original.command}
    mount: [
        {
            name: "KiltImage"
            image: "KILT:latest"
            volumes: ["/kilt"]
            entry_point: ["/kilt/wait"]
        }
    ]
    capabilities: ["SYS_PTRACE"]
}
task {
    pid_mode: "task"
}
"#;

    /// Sidecar without shared volumes
    pub const STANDALONE_SIDECAR_RECIPE: &str = r#"
build.mount: [
    {
        name: "Standalone"
        image: "standalone:1"
        volumes: []
        entry_point: ["/run"]
    }
]
"#;
}

/// Minimal container definition
pub fn container(name: &str, image: &str) -> Value {
    json!({
        "Name": name,
        "Image": image,
    })
}

/// Container definition with a command and environment
pub fn container_with(name: &str, image: &str, command: &[&str], env: &[(&str, &str)]) -> Value {
    let mut container = container(name, image);
    container["Command"] = json!(command);
    if !env.is_empty() {
        container["Environment"] = Value::Array(
            env.iter()
                .map(|(name, value)| json!({"Name": name, "Value": value}))
                .collect(),
        );
    }
    container
}

/// `AWS::ECS::TaskDefinition` resource holding `containers`
pub fn task_definition(containers: Vec<Value>) -> Value {
    json!({
        "Type": "AWS::ECS::TaskDefinition",
        "Properties": {
            "ContainerDefinitions": containers,
        }
    })
}

/// Add `Properties.Tags` to a resource
pub fn with_tags(mut resource: Value, tags: &[(&str, &str)]) -> Value {
    resource["Properties"]["Tags"] = Value::Array(
        tags.iter()
            .map(|(key, value)| json!({"Key": key, "Value": value}))
            .collect(),
    );
    resource
}

/// Template with the given resources
pub fn template(resources: Vec<(&str, Value)>) -> Value {
    let resources: Map<String, Value> = resources
        .into_iter()
        .map(|(name, resource)| (name.to_string(), resource))
        .collect();
    json!({ "Resources": resources })
}

/// Environment of a container definition as `(name, value)` pairs
pub fn environment(container: &Value) -> Vec<(String, Value)> {
    container["Environment"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| {
                    (
                        entry["Name"].as_str().unwrap_or_default().to_string(),
                        entry["Value"].clone(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Container names of a task definition, in order
pub fn container_names(resource: &Value) -> Vec<String> {
    resource["Properties"]["ContainerDefinitions"]
        .as_array()
        .map(|containers| {
            containers
                .iter()
                .map(|c| c["Name"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Context of a plain application container
pub fn app_context() -> TargetContext {
    TargetContext::new("app")
        .with_group_name("group")
        .with_image("busybox")
        .with_command(["/app"])
}
