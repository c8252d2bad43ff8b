use crate::error::TranslateError;

/// How the translation array was recovered from the raw completion. The
/// upstream endpoint is a general-purpose text completion with no output
/// schema, so callers may want to know which tier produced the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// The completion parsed strictly as a JSON array of strings.
    Structured(Vec<String>),
    /// Strict parsing failed; the array was rebuilt by line splitting.
    LineRecovered(Vec<String>),
}

impl Normalized {
    pub fn lines(&self) -> &[String] {
        match self {
            Normalized::Structured(lines) | Normalized::LineRecovered(lines) => lines,
        }
    }

    pub fn into_lines(self) -> Vec<String> {
        match self {
            Normalized::Structured(lines) | Normalized::LineRecovered(lines) => lines,
        }
    }
}

/// Instruction for one batch. The model is asked for a strict JSON array
/// so the structured tier usually succeeds; everything else is handled by
/// `normalize_response`.
pub fn render_instruction(target_language: &str, source_language: Option<&str>) -> String {
    let source = source_language
        .map(str::trim)
        .filter(|lang| !lang.is_empty() && !lang.eq_ignore_ascii_case("auto"))
        .unwrap_or("the auto-detected language");
    format!(
        "You are a professional webpage translator. Translate each input line from {source} to {target_language}. Preserve placeholders like {{{{...}}}}, URLs, numbers, and basic punctuation style. Return strictly a JSON array of translated strings in the same order."
    )
}

/// Source lines are sent as one numbered block per request to amortize
/// request overhead.
pub fn numbered_block(texts: &[String]) -> String {
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| format!("{}. {}", index + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Two-tier normalization of the raw completion: strict JSON array parse
/// (after stripping an optional code fence), then line-based recovery.
/// Yields an error rather than an empty array when neither tier produces
/// any string.
pub fn normalize_response(content: &str) -> Result<Normalized, TranslateError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(TranslateError::EmptyResponse);
    }

    if let Some(lines) = parse_structured(content) {
        if lines.is_empty() {
            return Err(TranslateError::EmptyResponse);
        }
        return Ok(Normalized::Structured(lines));
    }

    let lines = recover_lines(content);
    if lines.is_empty() {
        return Err(TranslateError::EmptyResponse);
    }
    Ok(Normalized::LineRecovered(lines))
}

fn parse_structured(content: &str) -> Option<Vec<String>> {
    serde_json::from_str(strip_code_fence(content)).ok()
}

fn strip_code_fence(content: &str) -> &str {
    let mut inner = content.trim();
    if let Some(rest) = inner.strip_prefix("```") {
        let rest = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        inner = rest.trim_start();
    }
    if let Some(rest) = inner.strip_suffix("```") {
        inner = rest.trim_end();
    }
    inner
}

fn recover_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(strip_enumeration)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Drops a leading "1. " or "1) " enumeration prefix the model tends to
/// echo back from the numbered input block.
fn strip_enumeration(line: &str) -> &str {
    let trimmed = line.trim();
    let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return trimmed;
    }
    let rest = &trimmed[digits..];
    match rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
        Some(rest) => rest.trim_start(),
        None => trimmed,
    }
}
