use kilt_recipe::{Override, Recipe, TargetContext};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;

const WRAP_RECIPE: &str = r#"
build {
    entry_point: ["/kilt/run", "--"]
    command: [] ${?original.entry_point} ${?original.command}
}
"#;

proptest! {
    #[test]
    fn prop_empty_recipe_keeps_image(image in "[a-z][a-z0-9./:-]{0,20}") {
        let context = TargetContext::new("app").with_image(image.clone());
        let spec = Recipe::new("").evaluate(&context).unwrap();
        prop_assert_eq!(spec.image, Some(image));
        prop_assert!(spec.entry_point.is_inherit());
    }

    #[test]
    fn prop_wrapped_command_preserves_original(
        command in proptest::collection::vec("[a-z/]{1,10}", 1..5),
    ) {
        let context = TargetContext::new("app").with_command(command.clone());
        let spec = Recipe::new(WRAP_RECIPE).evaluate(&context).unwrap();
        prop_assert_eq!(spec.command, Override::Explicit(command));
    }

    #[test]
    fn prop_environment_is_sorted(
        variables in proptest::collection::btree_map("[A-Z][A-Z_]{0,8}", "[a-z0-9]{1,8}", 0..8),
    ) {
        let recipe = format!(
            "build.environment_variables: {}",
            serde_json::to_string(&variables).unwrap()
        );
        let spec = Recipe::new(recipe).evaluate(&TargetContext::new("app")).unwrap();
        let names: Vec<&String> = spec.environment.keys().collect();
        let expected: Vec<&String> = variables.keys().collect();
        prop_assert_eq!(names, expected);
        let rendered: BTreeMap<String, String> = spec.environment.into_iter().collect();
        prop_assert_eq!(rendered, variables);
    }
}

#[test]
fn recipe_sees_group_and_metadata() {
    let context = TargetContext::new("app")
        .with_group_name("Task")
        .with_metadata("team", "core");
    let spec = Recipe::new(
        r#"build.environment_variables: {
    GROUP: ${original.container_group_name}
    TEAM: ${original.metadata.team}
}"#,
    )
    .evaluate(&context)
    .unwrap();
    assert_eq!(spec.environment["GROUP"], "Task");
    assert_eq!(spec.environment["TEAM"], "core");
}
