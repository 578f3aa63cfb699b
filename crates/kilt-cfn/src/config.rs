//! Patcher configuration

use kilt_patch::document::set_path;
use kilt_patch::{PatchOptions, PatchResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Resource settings applied to every injected sidecar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarSettings {
    /// `Essential` flag
    pub essential: Option<bool>,
    /// CPU units
    pub cpu: Option<u32>,
    /// Hard memory limit in MiB
    pub memory: Option<u32>,
    /// Soft memory limit in MiB
    pub memory_reservation: Option<u32>,
}

/// Configuration of a [`TemplatePatcher`](crate::TemplatePatcher)
///
/// # Examples
/// ```
/// use kilt_cfn::PatcherConfig;
///
/// let config = PatcherConfig::new(r#"build.entry_point: ["/kilt/run"]"#)
///     .with_opt_in(true)
///     .with_log_group("kilt-logs");
/// assert!(config.opt_in);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatcherConfig {
    /// Recipe text
    pub recipe: String,
    /// User configuration text, exposed to the recipe as `config.*`
    pub recipe_config: String,
    /// Only patch containers that opt in through tags
    pub opt_in: bool,
    /// Turn new environment variables into template parameters
    pub parametrize: bool,
    /// Let the recipe overwrite existing environment variables
    pub overwrite_env: bool,
    /// awslogs group for sidecar logs
    pub log_group: Option<String>,
    /// Secret holding registry credentials for sidecar images
    pub image_auth_secret: Option<String>,
    /// Sidecar resource settings
    pub sidecar: SidecarSettings,
    /// Extra fields merged into every sidecar
    pub sidecar_config: Map<String, Value>,
}

impl PatcherConfig {
    /// Create configuration for a recipe
    #[must_use]
    pub fn new(recipe: impl Into<String>) -> Self {
        Self {
            recipe: recipe.into(),
            recipe_config: String::new(),
            opt_in: false,
            parametrize: false,
            overwrite_env: true,
            log_group: None,
            image_auth_secret: None,
            sidecar: SidecarSettings::default(),
            sidecar_config: Map::new(),
        }
    }

    /// Set user configuration
    #[inline]
    #[must_use]
    pub fn with_recipe_config(mut self, recipe_config: impl Into<String>) -> Self {
        self.recipe_config = recipe_config.into();
        self
    }

    /// Set opt-in mode
    #[inline]
    #[must_use]
    pub fn with_opt_in(mut self, opt_in: bool) -> Self {
        self.opt_in = opt_in;
        self
    }

    /// Set environment parametrization
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

    /// Set sidecar log group
    #[inline]
    #[must_use]
    pub fn with_log_group(mut self, log_group: impl Into<String>) -> Self {
        self.log_group = Some(log_group.into());
        self
    }

    /// Set registry credentials secret
    #[inline]
    #[must_use]
    pub fn with_image_auth_secret(mut self, secret: impl Into<String>) -> Self {
        self.image_auth_secret = Some(secret.into());
        self
    }

    /// Set sidecar resource settings
    #[inline]
    #[must_use]
    pub fn with_sidecar_settings(mut self, sidecar: SidecarSettings) -> Self {
        self.sidecar = sidecar;
        self
    }

    /// Set extra sidecar fields
    #[inline]
    #[must_use]
    pub fn with_sidecar_config(mut self, sidecar_config: Map<String, Value>) -> Self {
        self.sidecar_config = sidecar_config;
        self
    }

    /// Fields merged into the sidecars of task `task_name`
    ///
    /// Explicit settings replace the same fields of the extra sidecar configuration.
    ///
    /// # Errors
    /// Returns error if the extra configuration has an incompatible shape
    /// at `RepositoryCredentials`
    pub fn sidecar_config_for(&self, task_name: &str) -> PatchResult<Map<String, Value>> {
        let mut config = Value::Object(self.sidecar_config.clone());

        if let Some(secret) = &self.image_auth_secret {
            set_path(&mut config, "RepositoryCredentials.CredentialsParameter", json!(secret))?;
        }
        if let Some(log_group) = &self.log_group {
            set_path(&mut config, "LogConfiguration", log_configuration(task_name, log_group))?;
        }
        if let Some(essential) = self.sidecar.essential {
            set_path(&mut config, "Essential", json!(essential))?;
        }
        if let Some(cpu) = self.sidecar.cpu {
            set_path(&mut config, "Cpu", json!(cpu))?;
        }
        if let Some(memory) = self.sidecar.memory {
            set_path(&mut config, "Memory", json!(memory))?;
        }
        if let Some(reservation) = self.sidecar.memory_reservation {
            set_path(&mut config, "MemoryReservation", json!(reservation))?;
        }

        match config {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    /// Patch options for task `task_name`
    ///
    /// # Errors
    /// See [`PatcherConfig::sidecar_config_for`]
    pub fn patch_options(&self, task_name: &str) -> PatchResult<PatchOptions> {
        Ok(PatchOptions::default()
            .with_parametrize(self.parametrize)
            .with_overwrite_env(self.overwrite_env)
            .with_sidecar_config(self.sidecar_config_for(task_name)?))
    }
}

/// awslogs log configuration streaming under the task name
#[must_use]
pub fn log_configuration(task_name: &str, log_group: &str) -> Value {
    json!({
        "LogDriver": "awslogs",
        "Options": {
            "awslogs-region": {"Ref": "AWS::Region"},
            "awslogs-group": log_group,
            "awslogs-stream-prefix": task_name,
        }
    })
}
