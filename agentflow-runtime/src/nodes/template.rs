use regex::{Captures, Regex};
use std::sync::OnceLock;

fn placeholder() -> Option<&'static Regex> {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").ok())
        .as_ref()
}

/// Replaces every `{{ key }}` in `template` with `lookup(key)`.
///
/// Keys are trimmed; unknown keys render as the empty string. An opening
/// `{{` without a closing `}}` is kept verbatim.
pub fn render_template<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let Some(re) = placeholder() else {
        return template.to_string();
    };
    re.replace_all(template, |caps: &Captures<'_>| {
        lookup(&caps[1]).unwrap_or_default()
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_known_and_unknown() {
        let rendered = render_template("Hi {{ name }}, {{missing}}!", |key| {
            (key == "name").then(|| "Ada".to_string())
        });
        assert_eq!(rendered, "Hi Ada, !");
    }

    #[test]
    fn test_unclosed_placeholder_is_kept() {
        assert_eq!(render_template("a {{b", |_| None), "a {{b");
    }

    #[test]
    fn test_dotted_keys_and_repeats() {
        let template = "{{scenario.timezone}} / {{  input }} / {{input}}";
        let rendered = render_template(template, |key| match key {
            "scenario.timezone" => Some("UTC".to_string()),
            "input" => Some("hi".to_string()),
            _ => None,
        });
        assert_eq!(rendered, "UTC / hi / hi");
    }
}
