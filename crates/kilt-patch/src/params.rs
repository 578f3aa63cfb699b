//! Template parameters for parametrized environment variables

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

/// One non-alphanumeric character, optionally followed by the character it capitalizes
static SEPARATOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9][a-zA-Z0-9]?").expect("separator regex is valid"));

/// Parameter type written into declarations
///
/// CloudFormation spells the type `String`, so the capitalised form is
/// used rather than a lower-case `string`.
pub const PARAMETER_TYPE: &str = "String";

/// Derive a template parameter name from an environment variable name
///
/// Alphanumeric names are returned unchanged. Anything else is lower-cased
/// and camel-cased at every separator: `MY_AWESOME_VAR` becomes
/// `myAwesomeVar`. Collisions are not detected.
///
/// # Examples
/// ```
/// use kilt_patch::parameter_name;
///
/// assert_eq!(parameter_name("SO_LONG_AND_THANKS"), "soLongAndThanks");
/// assert_eq!(parameter_name("Plain42"), "Plain42");
/// ```
#[must_use]
pub fn parameter_name(variable: &str) -> String {
    if !SEPARATOR_REGEX.is_match(variable) {
        return variable.to_string();
    }

    SEPARATOR_REGEX
        .replace_all(&variable.to_lowercase(), |caps: &regex::Captures<'_>| {
            caps[0].chars().skip(1).collect::<String>().to_uppercase()
        })
        .into_owned()
}

/// Template reference to a parameter
#[must_use]
pub fn reference(parameter: &str) -> Value {
    json!({ "Ref": parameter })
}

/// Parameter declaration with a default value
#[must_use]
pub fn declaration(default: &str) -> Value {
    json!({
        "Type": PARAMETER_TYPE,
        "Default": default,
    })
}

/// Check if a value is a template reference (or any non-literal value)
#[inline]
#[must_use]
pub fn is_template_value(value: &Value) -> bool {
    value.is_object()
}
