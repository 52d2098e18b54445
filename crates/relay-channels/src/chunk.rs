//! Length-bounded message splitting.
//!
//! LINE caps a text message at 5000 characters (not bytes). Replies are
//! split on line boundaries; a split inside a fenced code block closes the
//! fence and re-opens it at the top of the next chunk.

/// Maximum characters per LINE text message.
pub const LINE_TEXT_MAX_CHARS: usize = 5000;

const FENCE: &str = "```";
const FENCE_CLOSE: &str = "\n```";

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Leading/trailing whitespace is trimmed; blank input yields no chunks.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;
    let mut fence_lang: Option<String> = None;

    for line in text.split('\n') {
        let line_chars = line.chars().count();
        let needs_newline = !current.is_empty() && !current.ends_with('\n');
        let cost = line_chars + usize::from(needs_newline);
        // Leave room to close an open fence.
        let limit = if fence_lang.is_some() {
            max_chars.saturating_sub(FENCE_CLOSE.len())
        } else {
            max_chars
        };

        if !current.is_empty() && current_chars + cost > limit {
            if fence_lang.is_some() {
                current.push_str(FENCE_CLOSE);
            }
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
            if let Some(ref lang) = fence_lang {
                current.push_str(FENCE);
                current.push_str(lang);
                current.push('\n');
                current_chars = FENCE.len() + lang.chars().count() + 1;
            }
        }

        if !current.is_empty() && !current.ends_with('\n') {
            current.push('\n');
            current_chars += 1;
        }
        current.push_str(line);
        current_chars += line_chars;

        if let Some(after_fence) = line.trim_start().strip_prefix(FENCE) {
            if fence_lang.is_some() {
                fence_lang = None;
            } else {
                fence_lang = Some(after_fence.trim().to_string());
            }
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }

    // A single line longer than the cap still needs cutting.
    let mut result = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.chars().count() <= max_chars {
            result.push(chunk);
        } else {
            force_split(&chunk, max_chars, &mut result);
        }
    }
    result
}

fn force_split(chunk: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut remaining = chunk;
    while remaining.chars().count() > max_chars {
        let limit = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        out.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }
    if !remaining.is_empty() {
        out.push(remaining.to_string());
    }
}
