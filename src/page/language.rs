use kuchiki::NodeRef;

/// Declared page language: `<html lang>`, else `<body lang>`, else the
/// provided fallback, else "auto". Lower-cased. No content-based language
/// identification is attempted.
pub fn detect(document: &NodeRef, fallback: Option<&str>) -> String {
    element_lang(document, "html")
        .or_else(|| element_lang(document, "body"))
        .or_else(|| {
            fallback
                .map(str::trim)
                .filter(|lang| !lang.is_empty())
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| "auto".to_string())
        .to_lowercase()
}

/// Primary subtag of a language code ("en-US" -> "en").
pub fn primary_subtag(code: &str) -> String {
    code.split(|c: char| c == '-' || c == '_')
        .next()
        .unwrap_or(code)
        .trim()
        .to_lowercase()
}

/// Locale from the environment, normalized toward a language tag
/// ("en_US.UTF-8" -> "en-us"). Stands in for the host runtime's locale.
pub fn locale_from_env() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|value| !value.is_empty()))
        .and_then(|raw| normalize_locale(&raw))
}

fn normalize_locale(raw: &str) -> Option<String> {
    let raw = raw.split('.').next().unwrap_or(raw).trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("c") || raw.eq_ignore_ascii_case("posix") {
        return None;
    }
    Some(raw.replace('_', "-").to_lowercase())
}

fn element_lang(document: &NodeRef, selector: &str) -> Option<String> {
    let element = document.select_first(selector).ok()?;
    let attributes = element.attributes.borrow();
    attributes
        .get("lang")
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(ToOwned::to_owned)
}
