//! Build specification application
//!
//! [`PatchEngine::apply`] mutates one container definition in place and
//! returns the sidecar definitions and template parameters the caller
//! has to insert into the surrounding document.

use indexmap::IndexMap;
use kilt_recipe::{BuildSpec, SidecarSpec};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::container::{self, read_environment, write_environment};
use crate::document::{append_path, merge_defaults, set_path};
use crate::error::{PatchError, PatchResult};
use crate::params::{declaration, is_template_value, parameter_name, reference};

/// Options shared by every container patched with one engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOptions {
    /// Replace literal values of new environment variables with parameter references
    pub parametrize: bool,
    /// Let the recipe overwrite environment variables already set on the container
    pub overwrite_env: bool,
    /// Fields merged into every sidecar definition, sidecar fields win
    pub sidecar_config: Map<String, Value>,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            parametrize: false,
            overwrite_env: true,
            sidecar_config: Map::new(),
        }
    }
}

impl PatchOptions {
    /// Set parametrization
    #[inline]
    #[must_use]
    pub fn with_parametrize(mut self, parametrize: bool) -> Self {
        self.parametrize = parametrize;
        self
    }

    /// Set environment overwrite policy
    #[inline]
    #[must_use]
    pub fn with_overwrite_env(mut self, overwrite_env: bool) -> Self {
        self.overwrite_env = overwrite_env;
        self
    }

    /// Set sidecar configuration
    #[inline]
    #[must_use]
    pub fn with_sidecar_config(mut self, sidecar_config: Map<String, Value>) -> Self {
        self.sidecar_config = sidecar_config;
        self
    }
}

/// Documents produced next to the patched container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchOutcome {
    /// Sidecar container definitions by name, in recipe order
    pub sidecars: IndexMap<String, Value>,
    /// Parameter declarations by parameter name
    pub parameters: Map<String, Value>,
}

/// Applies [`BuildSpec`]s to container definitions
#[derive(Debug, Clone, Default)]
pub struct PatchEngine {
    options: PatchOptions,
}

/// How recipe variables are folded into an existing environment
#[derive(Debug, Clone, Copy)]
struct EnvMerge {
    overwrite: bool,
    parametrize: bool,
}

impl PatchEngine {
    /// Create engine
    #[inline]
    #[must_use]
    pub fn new(options: PatchOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[inline]
    #[must_use]
    pub fn options(&self) -> &PatchOptions {
        &self.options
    }

    /// Apply `spec` to `container`
    ///
    /// Fields the spec leaves absent are not touched. The environment is
    /// rewritten sorted by name whenever it is non-empty.
    ///
    /// # Errors
    /// Returns [`PatchError::Application`] if the container is not an
    /// object or a field has an incompatible shape. The container may be
    /// partially modified in that case.
    pub fn apply(&self, container: &mut Value, spec: &BuildSpec) -> PatchResult<PatchOutcome> {
        if !container.is_object() {
            return Err(PatchError::application(".", "container definition must be an object"));
        }

        let original_env = read_environment(container)?;
        let mut parameters = Map::new();

        if let Some(image) = &spec.image {
            set_path(container, container::IMAGE, json!(image))?;
        }
        if let Some(entry_point) = spec.entry_point.as_slice() {
            set_path(container, container::ENTRY_POINT, json!(entry_point))?;
        }
        if let Some(command) = spec.command.as_slice() {
            set_path(container, container::COMMAND, json!(command))?;
        }
        for capability in &spec.capabilities {
            append_path(container, container::CAPABILITIES, json!(capability))?;
        }

        let mut env = original_env.clone();
        Self::merge_env(
            &mut env,
            &spec.environment,
            EnvMerge {
                overwrite: self.options.overwrite_env,
                parametrize: self.options.parametrize,
            },
            &mut parameters,
        );
        write_environment(container, &env);

        let mut sidecars = IndexMap::with_capacity(spec.sidecars.len());
        for sidecar in &spec.sidecars {
            if !sidecar.volumes.is_empty() {
                append_path(
                    container,
                    container::VOLUMES_FROM,
                    json!({
                        "ReadOnly": true,
                        "SourceContainer": sidecar.name,
                    }),
                )?;
            }
            let definition = self.sidecar(sidecar, &original_env, &spec.environment, &mut parameters);
            sidecars.insert(sidecar.name.clone(), definition);
        }

        tracing::debug!(
            container = %container::container_name(container),
            sidecars = sidecars.len(),
            parameters = parameters.len(),
            "applied build spec"
        );

        Ok(PatchOutcome {
            sidecars,
            parameters,
        })
    }

    fn sidecar(
        &self,
        spec: &SidecarSpec,
        original_env: &IndexMap<String, Value>,
        build_env: &IndexMap<String, String>,
        parameters: &mut Map<String, Value>,
    ) -> Value {
        let mut definition = json!({
            "Name": spec.name,
            "Image": spec.image,
        });
        if !spec.entry_point.is_empty() {
            definition["EntryPoint"] = json!(spec.entry_point);
        }

        let mut env: IndexMap<String, Value> = IndexMap::new();
        for pair in &spec.environment {
            env.entry(pair.name.clone())
                .or_insert_with(|| Value::String(pair.value.clone()));
        }
        for (name, value) in original_env {
            env.entry(name.clone()).or_insert_with(|| value.clone());
        }
        Self::merge_env(
            &mut env,
            build_env,
            EnvMerge {
                overwrite: false,
                parametrize: self.options.parametrize,
            },
            parameters,
        );
        write_environment(&mut definition, &env);

        merge_defaults(&mut definition, &Value::Object(self.options.sidecar_config.clone()));
        definition
    }

    /// Fold `additions` into `env`
    ///
    /// Names already in `env` are only replaced when overwriting is on and
    /// the current value is a literal. New names become parameter
    /// references when parametrizing.
    fn merge_env(
        env: &mut IndexMap<String, Value>,
        additions: &IndexMap<String, String>,
        merge: EnvMerge,
        parameters: &mut Map<String, Value>,
    ) {
        for (name, value) in additions {
            match env.get_mut(name) {
                Some(existing) => {
                    if merge.overwrite && !is_template_value(existing) {
                        *existing = Value::String(value.clone());
                    }
                }
                None if merge.parametrize => {
                    let parameter = parameter_name(name);
                    tracing::debug!(variable = %name, %parameter, "parametrizing environment variable");
                    env.insert(name.clone(), reference(&parameter));
                    parameters.insert(parameter, declaration(value));
                }
                None => {
                    env.insert(name.clone(), Value::String(value.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kilt_recipe::{EnvPair, Override};
    use pretty_assertions::assert_eq;

    fn spec() -> BuildSpec {
        BuildSpec {
            entry_point: Override::Explicit(vec!["/kilt/run".into(), "--".into()]),
            command: Override::Explicit(vec!["/app".into()]),
            sidecars: vec![SidecarSpec {
                name: "KiltImage".into(),
                image: "kilt:latest".into(),
                volumes: vec!["/kilt".into()],
                entry_point: vec!["/kilt/wait".into()],
                environment: vec![],
            }],
            ..BuildSpec::default()
        }
    }

    #[test]
    fn wraps_container() {
        let mut container = json!({"Name": "app", "Image": "busybox", "Command": ["/app"]});
        let outcome = PatchEngine::default().apply(&mut container, &spec()).unwrap();
        assert_eq!(
            container,
            json!({
                "Name": "app",
                "Image": "busybox",
                "Command": ["/app"],
                "EntryPoint": ["/kilt/run", "--"],
                "VolumesFrom": [{"ReadOnly": true, "SourceContainer": "KiltImage"}],
            })
        );
        assert_eq!(
            outcome.sidecars["KiltImage"],
            json!({"Name": "KiltImage", "Image": "kilt:latest", "EntryPoint": ["/kilt/wait"]})
        );
        assert!(outcome.parameters.is_empty());
    }

    #[test]
    fn absent_fields_are_untouched() {
        let mut container = json!({"Name": "app", "Image": {"Ref": "Img"}, "Command": ["/app"]});
        let before = container.clone();
        PatchEngine::default()
            .apply(&mut container, &BuildSpec::default())
            .unwrap();
        assert_eq!(container, before);
    }

    #[test]
    fn explicit_empty_command_is_written() {
        let mut container = json!({"Name": "app", "Command": ["/app"]});
        let spec = BuildSpec {
            command: Override::ExplicitEmpty,
            ..BuildSpec::default()
        };
        PatchEngine::default().apply(&mut container, &spec).unwrap();
        assert_eq!(container["Command"], json!([]));
    }

    #[test]
    fn image_replaces_reference() {
        let mut container = json!({"Name": "app", "Image": {"Ref": "Img"}});
        let spec = BuildSpec {
            image: Some("busybox".into()),
            ..BuildSpec::default()
        };
        PatchEngine::default().apply(&mut container, &spec).unwrap();
        assert_eq!(container["Image"], json!("busybox"));
    }

    #[test]
    fn capabilities_are_appended() {
        let mut container = json!({
            "Name": "app",
            "LinuxParameters": {"Capabilities": {"Add": ["NET_ADMIN"]}}
        });
        let spec = BuildSpec {
            capabilities: ["SYS_PTRACE".to_string(), "NET_ADMIN".to_string()].into_iter().collect(),
            ..BuildSpec::default()
        };
        PatchEngine::default().apply(&mut container, &spec).unwrap();
        assert_eq!(
            container["LinuxParameters"]["Capabilities"]["Add"],
            json!(["NET_ADMIN", "SYS_PTRACE", "NET_ADMIN"])
        );
    }

    #[test]
    fn incompatible_shape_fails() {
        let mut container = json!({"Name": "app", "LinuxParameters": []});
        let spec = BuildSpec {
            capabilities: std::iter::once("SYS_PTRACE".to_string()).collect(),
            ..BuildSpec::default()
        };
        let err = PatchEngine::default().apply(&mut container, &spec).unwrap_err();
        assert_eq!(err.path(), "LinuxParameters");

        let mut not_object = json!("app");
        assert!(PatchEngine::default().apply(&mut not_object, &spec).is_err());
    }

    #[test]
    fn environment_overwrite_policy() {
        let spec = BuildSpec {
            environment: [("A".to_string(), "new".to_string()), ("B".to_string(), "b".to_string())]
                .into_iter()
                .collect(),
            ..BuildSpec::default()
        };
        let original = json!({
            "Name": "app",
            "Environment": [{"Name": "A", "Value": "old"}, {"Name": "C", "Value": "c"}]
        });

        let mut container = original.clone();
        PatchEngine::default().apply(&mut container, &spec).unwrap();
        assert_eq!(
            container["Environment"],
            json!([
                {"Name": "A", "Value": "new"},
                {"Name": "B", "Value": "b"},
                {"Name": "C", "Value": "c"},
            ])
        );

        let mut container = original;
        PatchEngine::new(PatchOptions::default().with_overwrite_env(false))
            .apply(&mut container, &spec)
            .unwrap();
        assert_eq!(container["Environment"][0], json!({"Name": "A", "Value": "old"}));
    }

    #[test]
    fn template_reference_survives_overwrite() {
        let spec = BuildSpec {
            environment: std::iter::once(("A".to_string(), "new".to_string())).collect(),
            ..BuildSpec::default()
        };
        let mut container = json!({
            "Name": "app",
            "Environment": [{"Name": "A", "Value": {"Ref": "AParam"}}]
        });
        PatchEngine::default().apply(&mut container, &spec).unwrap();
        assert_eq!(container["Environment"][0]["Value"], json!({"Ref": "AParam"}));
    }

    #[test]
    fn parametrize_new_names_only() {
        let spec = BuildSpec {
            environment: [
                ("SO_LONG_AND_THANKS".to_string(), "ForAllTheFish".to_string()),
                ("EXISTING".to_string(), "replaced".to_string()),
            ]
            .into_iter()
            .collect(),
            ..BuildSpec::default()
        };
        let mut container = json!({
            "Name": "app",
            "Environment": [{"Name": "EXISTING", "Value": "kept"}]
        });
        let outcome = PatchEngine::new(PatchOptions::default().with_parametrize(true))
            .apply(&mut container, &spec)
            .unwrap();
        assert_eq!(
            container["Environment"],
            json!([
                {"Name": "EXISTING", "Value": "replaced"},
                {"Name": "SO_LONG_AND_THANKS", "Value": {"Ref": "soLongAndThanks"}},
            ])
        );
        assert_eq!(
            Value::Object(outcome.parameters),
            json!({"soLongAndThanks": {"Type": "String", "Default": "ForAllTheFish"}})
        );
    }

    #[test]
    fn sidecar_environment_precedence() {
        let mut spec = spec();
        spec.environment = [("A".to_string(), "build".to_string()), ("D".to_string(), "d".to_string())]
            .into_iter()
            .collect();
        spec.sidecars[0].environment = vec![EnvPair::new("B", "explicit"), EnvPair::new("A", "explicit")];
        let mut container = json!({
            "Name": "app",
            "Environment": [{"Name": "B", "Value": "original"}, {"Name": "C", "Value": "c"}]
        });
        let outcome = PatchEngine::default().apply(&mut container, &spec).unwrap();
        assert_eq!(
            outcome.sidecars["KiltImage"]["Environment"],
            json!([
                {"Name": "A", "Value": "explicit"},
                {"Name": "B", "Value": "explicit"},
                {"Name": "C", "Value": "c"},
                {"Name": "D", "Value": "d"},
            ])
        );
    }

    #[test]
    fn sidecar_without_volumes_has_no_volumes_from() {
        let mut spec = spec();
        spec.sidecars[0].volumes.clear();
        let mut container = json!({"Name": "app"});
        let outcome = PatchEngine::default().apply(&mut container, &spec).unwrap();
        assert!(container.get("VolumesFrom").is_none());
        assert!(outcome.sidecars.contains_key("KiltImage"));
    }

    #[test]
    fn sidecar_config_is_merged_under_sidecar_fields() {
        let config = json!({
            "Name": "ignored",
            "Essential": false,
            "RepositoryCredentials": {"CredentialsParameter": "arn:secret"}
        });
        let options = PatchOptions::default().with_sidecar_config(config.as_object().cloned().unwrap());
        let mut container = json!({"Name": "app"});
        let outcome = PatchEngine::new(options).apply(&mut container, &spec()).unwrap();
        let sidecar = &outcome.sidecars["KiltImage"];
        assert_eq!(sidecar["Name"], json!("KiltImage"));
        assert_eq!(sidecar["Essential"], json!(false));
        assert_eq!(
            sidecar["RepositoryCredentials"]["CredentialsParameter"],
            json!("arn:secret")
        );
    }
}
