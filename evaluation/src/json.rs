//! Defensive parsing for untrusted LLM output: trim, and if the whole
//! body is wrapped in a fenced code block, drop the fence lines.

pub fn strip_markdown_code_block(output: &str) -> String {
    let cleaned = output.trim();
    if cleaned.starts_with("```") {
        let lines: Vec<&str> = cleaned.lines().collect();
        if lines.len() > 2 {
            return lines[1..lines.len() - 1].join("\n");
        }
    }
    cleaned.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_a_fenced_json_block() {
        let raw = "```json\n{\"score\": 0.5}\n```";
        assert_eq!(strip_markdown_code_block(raw), "{\"score\": 0.5}");
    }

    #[test]
    fn leaves_unfenced_output_untouched() {
        let raw = "{\"score\": 0.5}";
        assert_eq!(strip_markdown_code_block(raw), raw);
    }

    #[test]
    fn a_lone_fence_marker_is_left_as_is() {
        let raw = "```";
        assert_eq!(strip_markdown_code_block(raw), "```");
    }
}
