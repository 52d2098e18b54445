//! Persona (system prompt) loading.

use std::path::Path;

use tracing::{info, warn};

use relay_core::config::DEFAULT_PERSONA;

/// Persona size cap, in characters.
const MAX_PERSONA_CHARS: usize = 20_000;

/// Resolve the persona text with a fallback chain:
///   1. `inline` set and non-blank → use it
///   2. `path` set and readable → file contents
///   3. built-in shop-assistant persona
pub fn load(inline: Option<&str>, path: Option<&str>) -> String {
    if let Some(text) = inline.map(str::trim).filter(|t| !t.is_empty()) {
        return truncate_chars(text, MAX_PERSONA_CHARS);
    }

    if let Some(p) = path {
        match read_persona_file(Path::new(p)) {
            Some(text) => {
                info!(path = p, chars = text.chars().count(), "loaded persona file");
                return text;
            }
            None => warn!(path = p, "persona file unusable, using built-in persona"),
        }
    }

    DEFAULT_PERSONA.to_string()
}

fn read_persona_file(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| warn!(path = %path.display(), error = %e, "failed to read persona file"))
        .ok()?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed, MAX_PERSONA_CHARS))
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            warn!(max_chars, "persona truncated");
            text[..byte_idx].to_string()
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn inline_wins_over_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("persona.md");
        fs::write(&file, "from file").expect("write");

        let persona = load(Some("  from config  "), file.to_str());
        assert_eq!(persona, "from config");
    }

    #[test]
    fn file_used_when_inline_blank() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("persona.md");
        fs::write(&file, "\nคุณคือแอดมินร้านเครื่องเสียง\n").expect("write");

        let persona = load(Some("   "), file.to_str());
        assert_eq!(persona, "คุณคือแอดมินร้านเครื่องเสียง");
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let persona = load(None, Some("/definitely/not/here/persona.md"));
        assert_eq!(persona, DEFAULT_PERSONA);
    }

    #[test]
    fn nothing_configured_is_default() {
        assert_eq!(load(None, None), DEFAULT_PERSONA);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "สวัสดี".repeat(10);
        let cut = truncate_chars(&text, 7);
        assert_eq!(cut.chars().count(), 7);
        assert!(text.starts_with(&cut));
    }
}
