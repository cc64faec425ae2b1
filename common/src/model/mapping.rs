use serde::{Deserialize, Serialize};

/// Binds the logical certificate fields to CSV header names.
///
/// Only `name` is mandatory to start a batch; the rest may stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvColumnMapping {
    pub name: String,
    #[serde(default)]
    pub verify_link: String,
    #[serde(default)]
    pub design: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl CsvColumnMapping {
    /// Best-guess mapping by case-insensitive substring match on the header
    /// names. First match wins; the user may override any binding afterwards.
    pub fn suggest(headers: &[String]) -> Self {
        let mut mapping = CsvColumnMapping::default();
        for header in headers {
            let lower = header.to_lowercase();
            if lower.contains("name") && mapping.name.is_empty() {
                mapping.name = header.clone();
            }
            if (lower.contains("link") || lower.contains("url") || lower.contains("verify"))
                && mapping.verify_link.is_empty()
            {
                mapping.verify_link = header.clone();
            }
            if (lower.contains("design") || lower.contains("template")) && mapping.design.is_empty()
            {
                mapping.design = header.clone();
            }
            if lower.contains("mail") && mapping.email.is_none() {
                mapping.email = Some(header.clone());
            }
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn maps_by_substring_case_insensitively() {
        let mapping = CsvColumnMapping::suggest(&headers(&[
            "Full Name",
            "Verify URL",
            "Design Template",
            "E-Mail",
        ]));
        assert_eq!(mapping.name, "Full Name");
        assert_eq!(mapping.verify_link, "Verify URL");
        assert_eq!(mapping.design, "Design Template");
        assert_eq!(mapping.email.as_deref(), Some("E-Mail"));
    }

    #[test]
    fn first_match_wins() {
        let mapping = CsvColumnMapping::suggest(&headers(&["name", "nickname", "link", "url"]));
        assert_eq!(mapping.name, "name");
        assert_eq!(mapping.verify_link, "link");
    }

    #[test]
    fn unmatched_headers_leave_bindings_empty() {
        let mapping = CsvColumnMapping::suggest(&headers(&["id", "score"]));
        assert!(mapping.name.is_empty());
        assert!(mapping.verify_link.is_empty());
        assert!(mapping.design.is_empty());
        assert!(mapping.email.is_none());
    }
}
