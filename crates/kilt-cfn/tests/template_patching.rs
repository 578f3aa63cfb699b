//! Template-level patching scenarios

use std::collections::HashMap;

use kilt_cfn::{
    ImageMetadata, PatcherConfig, PatcherError, SidecarSettings, TemplatePatcher,
};
use kilt_recipe::RecipeError;
use kilt_test_utils::{
    container, container_names, container_with, environment, recipes, task_definition, template,
    with_tags,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn patcher(recipe: &str) -> TemplatePatcher {
    TemplatePatcher::new(PatcherConfig::new(recipe))
}

fn two_containers() -> Value {
    task_definition(vec![
        container_with("app", "busybox", &["/app"], &[]),
        container_with("worker", "busybox", &["/worker"], &[]),
    ])
}

#[test]
fn opt_out_patches_every_container() {
    let mut doc = template(vec![("Task", two_containers())]);
    let report = patcher(recipes::DEFAULT_RECIPE).patch(&mut doc, &Value::Null).unwrap();

    let task = &doc["Resources"]["Task"];
    assert_eq!(container_names(task), vec!["app", "worker", "KiltImage"]);
    assert_eq!(task["Properties"]["ContainerDefinitions"][0]["EntryPoint"], json!(["/kilt/run", "--"]));
    assert_eq!(task["Properties"]["ContainerDefinitions"][1]["Command"], json!(["/worker"]));
    assert_eq!(
        task["Properties"]["ContainerDefinitions"][2],
        json!({"Name": "KiltImage", "Image": "KILT:latest", "EntryPoint": ["/kilt/wait"]})
    );

    let resource = report.resource("Task").unwrap();
    assert_eq!(resource.patched, vec!["app", "worker"]);
    assert_eq!(resource.sidecars, vec!["KiltImage"]);
    assert_eq!(report.patched_containers(), 2);
}

#[test]
fn opt_out_respects_ignored_containers() {
    let task = with_tags(two_containers(), &[("kilt-ignore-containers", "worker")]);
    let mut doc = template(vec![("Task", task)]);
    let report = patcher(recipes::DEFAULT_RECIPE).patch(&mut doc, &Value::Null).unwrap();

    let containers = &doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"];
    assert!(containers[0].get("EntryPoint").is_some());
    assert_eq!(containers[1], container_with("worker", "busybox", &["/worker"], &[]));
    assert_eq!(report.resource("Task").unwrap().skipped, vec!["worker"]);
}

#[test]
fn ignore_tag_skips_resource() {
    let task = with_tags(two_containers(), &[("kilt-ignore", "true")]);
    let mut doc = template(vec![("Task", task)]);
    let before = doc.clone();
    let report = patcher(recipes::DEFAULT_RECIPE).patch(&mut doc, &Value::Null).unwrap();

    assert_eq!(doc, before);
    assert_eq!(report.ignored, vec!["Task"]);
    assert!(report.resources.is_empty());
}

#[test]
fn opt_in_without_tags_changes_nothing() {
    let mut doc = template(vec![("Task", two_containers())]);
    let before = doc.clone();
    let config = PatcherConfig::new(recipes::DEFAULT_RECIPE).with_opt_in(true);
    let report = TemplatePatcher::new(config).patch(&mut doc, &Value::Null).unwrap();

    assert_eq!(doc, before);
    assert_eq!(report.resource("Task").unwrap().skipped, vec!["app", "worker"]);
}

#[test]
fn opt_in_single_and_global() {
    let config = PatcherConfig::new(recipes::DEFAULT_RECIPE).with_opt_in(true);
    let patcher = TemplatePatcher::new(config);

    let single = with_tags(two_containers(), &[("kilt-include-containers", "worker")]);
    let mut doc = template(vec![("Task", single)]);
    patcher.patch(&mut doc, &Value::Null).unwrap();
    let containers = &doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"];
    assert!(containers[0].get("EntryPoint").is_none());
    assert!(containers[1].get("EntryPoint").is_some());

    let multiple = with_tags(two_containers(), &[("kilt-include-containers", "app:worker")]);
    let mut doc = template(vec![("Task", multiple)]);
    let report = patcher.patch(&mut doc, &Value::Null).unwrap();
    assert_eq!(report.patched_containers(), 2);

    let global = with_tags(two_containers(), &[("kilt-include", "")]);
    let mut doc = template(vec![("Task", global)]);
    let report = patcher.patch(&mut doc, &Value::Null).unwrap();
    assert_eq!(report.patched_containers(), 2);
}

#[test]
fn other_resources_are_untouched() {
    let bucket = json!({"Type": "AWS::S3::Bucket", "Properties": {"BucketName": "b"}});
    let mut doc = template(vec![("Bucket", bucket.clone()), ("Task", two_containers())]);
    patcher(recipes::DEFAULT_RECIPE).patch(&mut doc, &Value::Null).unwrap();
    assert_eq!(doc["Resources"]["Bucket"], bucket);
}

#[test]
fn image_reference_is_resolved() {
    let mut app = container("app", "placeholder");
    app["Image"] = json!({"Ref": "AppImage"});
    let mut doc = template(vec![("Task", task_definition(vec![app.clone()]))]);
    patcher("").patch(&mut doc, &json!({"AppImage": "nginx:1"})).unwrap();
    assert_eq!(
        doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"][0]["Image"],
        json!("nginx:1")
    );

    let mut doc = template(vec![("Task", task_definition(vec![app.clone()]))]);
    doc["Parameters"] = json!({"AppImage": {"Type": "String", "Default": "nginx:default"}});
    patcher("").patch(&mut doc, &Value::Null).unwrap();
    assert_eq!(
        doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"][0]["Image"],
        json!("nginx:default")
    );

    let mut doc = template(vec![("Task", task_definition(vec![app]))]);
    patcher("").patch(&mut doc, &Value::Null).unwrap();
    assert_eq!(
        doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"][0]["Image"],
        json!({"Ref": "AppImage"})
    );
}

#[test]
fn referenced_environment_values_are_kept() {
    let mut app = container_with("app", "busybox", &["/app"], &[]);
    app["Environment"] = json!([{"Name": "SO_LONG_AND_THANKS", "Value": {"Ref": "Fish"}}]);
    let mut doc = template(vec![("Task", task_definition(vec![app]))]);
    patcher(recipes::PARAMETERIZE_RECIPE).patch(&mut doc, &Value::Null).unwrap();

    let app = &doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"][0];
    assert_eq!(
        environment(app),
        vec![("SO_LONG_AND_THANKS".to_string(), json!({"Ref": "Fish"}))]
    );
}

#[test]
fn parametrized_variables_become_template_parameters() {
    let mut doc = template(vec![("Task", two_containers())]);
    doc["Parameters"] = json!({"Existing": {"Type": "String"}});
    let config = PatcherConfig::new(recipes::PARAMETERIZE_RECIPE).with_parametrize(true);
    let report = TemplatePatcher::new(config).patch(&mut doc, &Value::Null).unwrap();

    assert_eq!(
        doc["Parameters"],
        json!({
            "Existing": {"Type": "String"},
            "soLongAndThanks": {"Type": "String", "Default": "ForAllTheFish"},
        })
    );
    assert_eq!(report.parameters, vec!["soLongAndThanks"]);

    let app = &doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"][0];
    assert_eq!(
        environment(app),
        vec![("SO_LONG_AND_THANKS".to_string(), json!({"Ref": "soLongAndThanks"}))]
    );
}

#[test]
fn declared_parameters_are_not_clobbered() {
    let mut doc = template(vec![("Task", two_containers())]);
    doc["Parameters"] = json!({"soLongAndThanks": {"Type": "String", "Default": "Mine"}});
    let config = PatcherConfig::new(recipes::PARAMETERIZE_RECIPE).with_parametrize(true);
    TemplatePatcher::new(config).patch(&mut doc, &Value::Null).unwrap();
    assert_eq!(doc["Parameters"]["soLongAndThanks"]["Default"], json!("Mine"));
}

#[test]
fn task_pid_mode_is_set() {
    let mut doc = template(vec![("Task", two_containers())]);
    let report = patcher(recipes::TASK_PID_MODE_RECIPE).patch(&mut doc, &Value::Null).unwrap();
    assert_eq!(doc["Resources"]["Task"]["Properties"]["PidMode"], json!("task"));
    assert_eq!(report.resource("Task").unwrap().pid_mode.as_deref(), Some("task"));
}

#[test]
fn container_references_only_fail_their_container() {
    let recipe = r#"
build.environment_variables.SERVICE: ${original.environment_variables.SVC}
task.pid_mode: "task"
"#;
    let task = task_definition(vec![
        container_with("orders", "busybox", &["/orders"], &[("SVC", "orders")]),
        container_with("plain", "busybox", &["/plain"], &[]),
    ]);
    let mut doc = template(vec![("Task", task)]);
    let report = patcher(recipe).patch(&mut doc, &Value::Null).unwrap();

    let containers = &doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"];
    assert_eq!(
        environment(&containers[0]),
        vec![
            ("SERVICE".to_string(), json!("orders")),
            ("SVC".to_string(), json!("orders")),
        ]
    );
    assert_eq!(containers[1], container_with("plain", "busybox", &["/plain"], &[]));
    assert_eq!(doc["Resources"]["Task"]["Properties"]["PidMode"], json!("task"));

    let resource = report.resource("Task").unwrap();
    assert_eq!(resource.patched, vec!["orders"]);
    assert_eq!(resource.failed.len(), 1);
    assert_eq!(resource.failed[0].container, "plain");
}

#[test]
fn sidecars_receive_log_and_auth_configuration() {
    let config = PatcherConfig::new(recipes::DEFAULT_RECIPE)
        .with_log_group("kilt-logs")
        .with_image_auth_secret("arn:aws:secretsmanager:kilt")
        .with_sidecar_settings(SidecarSettings {
            essential: Some(false),
            cpu: Some(64),
            ..SidecarSettings::default()
        });
    let mut doc = template(vec![("Task", two_containers())]);
    TemplatePatcher::new(config).patch(&mut doc, &Value::Null).unwrap();

    let sidecar = &doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"][2];
    assert_eq!(sidecar["Name"], json!("KiltImage"));
    assert_eq!(
        sidecar["LogConfiguration"],
        json!({
            "LogDriver": "awslogs",
            "Options": {
                "awslogs-region": {"Ref": "AWS::Region"},
                "awslogs-group": "kilt-logs",
                "awslogs-stream-prefix": "Task",
            }
        })
    );
    assert_eq!(
        sidecar["RepositoryCredentials"],
        json!({"CredentialsParameter": "arn:aws:secretsmanager:kilt"})
    );
    assert_eq!(sidecar["Essential"], json!(false));
    assert_eq!(sidecar["Cpu"], json!(64));
}

#[test]
fn existing_sidecar_is_not_duplicated() {
    let task = task_definition(vec![
        container_with("app", "busybox", &["/app"], &[]),
        container("KiltImage", "KILT:older"),
    ]);
    let mut doc = template(vec![("Task", with_tags(task, &[("kilt-ignore-containers", "KiltImage")]))]);
    let report = patcher(recipes::DEFAULT_RECIPE).patch(&mut doc, &Value::Null).unwrap();

    assert_eq!(container_names(&doc["Resources"]["Task"]), vec!["app", "KiltImage"]);
    assert!(report.resource("Task").unwrap().sidecars.is_empty());
}

#[test]
fn syntax_error_aborts() {
    let mut doc = template(vec![("Task", two_containers())]);
    let err = patcher("build { image: x").patch(&mut doc, &Value::Null).unwrap_err();
    assert!(matches!(
        err,
        PatcherError::Recipe {
            source: RecipeError::ConfigSyntax(_),
            ..
        }
    ));
}

#[test]
fn failing_containers_are_skipped_and_restored() {
    let mut broken = container_with("broken", "busybox", &["/broken"], &[]);
    broken["Environment"] = json!([{"Name": 42, "Value": "x"}]);
    let task = task_definition(vec![broken.clone(), container_with("app", "busybox", &["/app"], &[])]);
    let mut doc = template(vec![("Task", task)]);
    let report = patcher(recipes::DEFAULT_RECIPE).patch(&mut doc, &Value::Null).unwrap();

    let containers = &doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"];
    assert_eq!(containers[0], broken);
    assert!(containers[1].get("EntryPoint").is_some());

    let resource = report.resource("Task").unwrap();
    assert_eq!(resource.patched, vec!["app"]);
    assert_eq!(resource.failed.len(), 1);
    assert_eq!(resource.failed[0].container, "broken");
}

#[test]
fn resource_fails_when_every_container_fails() {
    let recipe = r#"build.mount: [{ name: "s", volumes: [], entry_point: ["/run"] }]"#;
    let mut doc = template(vec![("Task", two_containers())]);
    let err = patcher(recipe).patch(&mut doc, &Value::Null).unwrap_err();
    match err {
        PatcherError::ResourceFailed { resource, container, .. } => {
            assert_eq!(resource, "Task");
            assert_eq!(container, "app");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn image_metadata_feeds_the_recipe() {
    let mut images = HashMap::new();
    images.insert(
        "busybox".to_string(),
        ImageMetadata {
            entry_point: Some(vec!["/bin/sh".into()]),
            command: Some(vec!["-c".into(), "echo".into()]),
        },
    );
    let mut doc = template(vec![("Task", task_definition(vec![container("app", "busybox")]))]);
    patcher(recipes::DEFAULT_RECIPE)
        .with_metadata_provider(images)
        .patch(&mut doc, &Value::Null)
        .unwrap();

    let app = &doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"][0];
    assert_eq!(app["Command"], json!(["/bin/sh", "-c", "echo"]));
}

#[test]
fn recipe_sees_resource_tags() {
    let recipe = "build.environment_variables.TEAM: ${?original.metadata.team}";
    let task = with_tags(two_containers(), &[("team", "core")]);
    let mut doc = template(vec![("Task", task)]);
    patcher(recipe).patch(&mut doc, &Value::Null).unwrap();

    let app = &doc["Resources"]["Task"]["Properties"]["ContainerDefinitions"][0];
    assert_eq!(environment(app), vec![("TEAM".to_string(), json!("core"))]);
}

#[test]
fn json_round_trip() {
    let doc = template(vec![("Task", two_containers())]);
    let (text, report) = patcher(recipes::DEFAULT_RECIPE)
        .patch_json(&doc.to_string(), "")
        .unwrap();
    let patched: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(container_names(&patched["Resources"]["Task"]), vec!["app", "worker", "KiltImage"]);
    assert_eq!(report.patched_containers(), 2);

    assert!(matches!(
        patcher("").patch_json("{not json", ""),
        Err(PatcherError::Json(_))
    ));
}
