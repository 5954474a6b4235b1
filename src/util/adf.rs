use serde_json::{json, Value};

/// Wrap plain text into a single-paragraph Atlassian Document Format document,
/// the shape Jira's v3 API expects for rich-text fields.
pub fn text_to_adf(text: &str) -> Value {
    let paragraph = if text.is_empty() {
        // ADF rejects empty text nodes
        json!({ "type": "paragraph", "content": [] })
    } else {
        json!({ "type": "paragraph", "content": [{ "type": "text", "text": text }] })
    };
    json!({ "type": "doc", "version": 1, "content": [paragraph] })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_text_in_doc_paragraph() {
        let doc = text_to_adf("Server down");
        assert_eq!(doc["type"], "doc");
        assert_eq!(doc["version"], 1);
        assert_eq!(doc["content"][0]["type"], "paragraph");
        assert_eq!(doc["content"][0]["content"][0]["text"], "Server down");
    }

    #[test]
    fn empty_text_gives_empty_paragraph() {
        let doc = text_to_adf("");
        assert_eq!(doc["content"][0]["content"], json!([]));
    }

    #[test]
    fn multiline_text_kept_verbatim() {
        let doc = text_to_adf("line one\nline two");
        assert_eq!(doc["content"][0]["content"][0]["text"], "line one\nline two");
    }
}
