use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: safe tags (like <b>, <p>) survive,
/// dangerous tags (<script>, <iframe>) and attributes (onclick) are
/// stripped. Applied to rich-text fields before storage so stored
/// content is safe for any client to render.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags() {
        let cleaned = clean_html("<p>aphids on <b>maize</b></p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>aphids on <b>maize</b></p>");
    }
}
