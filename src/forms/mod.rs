//! Form data validation.
//!
//! A [`Form`] wraps the submitted field values of a single request and
//! accumulates field-level error messages as rules are applied. Rules never
//! fail hard: violations are recorded and surfaced when the page is
//! re-rendered.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Regular expression for sanity checking the format of an email address.
/// This pattern is the one currently recommended by the W3C and Web Hypertext
/// Application Technology Working Group.
pub fn email_pattern() -> &'static Regex {
    static EMAIL_RX: OnceLock<Regex> = OnceLock::new();
    EMAIL_RX.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("email pattern must compile")
    })
}

/// Validation error messages keyed by form field name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Errors(HashMap<String, Vec<String>>);

impl Errors {
    /// Append an error message for a given field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Retrieve the first error message for a given field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field)?.first().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Submitted form values plus the accumulated validation errors.
#[derive(Debug, Default, Clone)]
pub struct Form {
    values: HashMap<String, String>,
    pub errors: Errors,
}

impl Form {
    #[must_use]
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values,
            errors: Errors::default(),
        }
    }

    /// The submitted value for a field, empty string when absent.
    #[must_use]
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map_or("", String::as_str)
    }

    /// Check that specific fields are present and not blank.
    pub fn required(&mut self, fields: &[&str]) {
        for field in fields {
            if self.get(field).trim().is_empty() {
                self.errors.add(field, "This field cannot be blank");
            }
        }
    }

    /// Check that a field contains a minimum number of characters.
    /// Counts Unicode codepoints, not bytes.
    pub fn min_length(&mut self, field: &str, min: usize) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }
        if value.chars().count() < min {
            self.errors.add(
                field,
                format!("This field is too short (minimum is {min} characters)"),
            );
        }
    }

    /// Check that a field contains a maximum number of characters.
    /// Counts Unicode codepoints, not bytes.
    pub fn max_length(&mut self, field: &str, max: usize) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }
        if value.chars().count() > max {
            self.errors.add(
                field,
                format!("This field is too long (maximum is {max} characters)"),
            );
        }
    }

    /// Check that a field matches one of a set of permitted values.
    pub fn permitted_values(&mut self, field: &str, opts: &[&str]) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }
        if !opts.contains(&value) {
            self.errors.add(field, "This field is invalid");
        }
    }

    /// Check that a field matches a regular expression.
    pub fn matches_pattern(&mut self, field: &str, pattern: &Regex) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }
        if !pattern.is_match(value) {
            self.errors.add(field, "This field is invalid");
        }
    }

    /// True if no rule has recorded an error so far.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_required_flags_blank_fields() {
        let mut f = form(&[("title", "Music festival"), ("description", "   ")]);
        f.required(&["title", "description", "days"]);

        assert!(!f.valid());
        assert_eq!(f.errors.get("title"), None);
        assert_eq!(
            f.errors.get("description"),
            Some("This field cannot be blank")
        );
        assert_eq!(f.errors.get("days"), Some("This field cannot be blank"));
    }

    #[test]
    fn test_min_length_counts_codepoints() {
        // 3 codepoints, 9 bytes in UTF-8
        let mut f = form(&[("name", "日本語")]);
        f.min_length("name", 4);
        assert_eq!(
            f.errors.get("name"),
            Some("This field is too short (minimum is 4 characters)")
        );

        let mut f = form(&[("name", "日本語")]);
        f.min_length("name", 3);
        assert!(f.valid());
    }

    #[test]
    fn test_max_length_counts_codepoints() {
        let mut f = form(&[("title", "ééééé")]);
        f.max_length("title", 5);
        assert!(f.valid());

        f.max_length("title", 4);
        assert_eq!(
            f.errors.get("title"),
            Some("This field is too long (maximum is 4 characters)")
        );
    }

    #[test]
    fn test_length_rules_skip_empty_values() {
        let mut f = form(&[]);
        f.min_length("name", 10);
        f.max_length("name", 2);
        assert!(f.valid());
    }

    #[test]
    fn test_permitted_values() {
        let mut f = form(&[("x", "a")]);
        f.permitted_values("x", &["a", "b"]);
        assert!(f.valid());

        let mut f = form(&[("x", "b")]);
        f.permitted_values("x", &["a", "b"]);
        assert!(f.valid());

        let mut f = form(&[("x", "")]);
        f.permitted_values("x", &["a", "b"]);
        assert!(f.valid());

        let mut f = form(&[("x", "c")]);
        f.permitted_values("x", &["a", "b"]);
        assert_eq!(f.errors.get("x"), Some("This field is invalid"));
    }

    #[test]
    fn test_matches_pattern() {
        let mut f = form(&[("email", "alice@example.com")]);
        f.matches_pattern("email", email_pattern());
        assert!(f.valid());

        let mut f = form(&[("email", "not-an-email")]);
        f.matches_pattern("email", email_pattern());
        assert_eq!(f.errors.get("email"), Some("This field is invalid"));
    }

    #[test]
    fn test_multiple_violations_surface_first_message() {
        let mut f = form(&[("password", "short")]);
        f.min_length("password", 10);
        f.matches_pattern("password", email_pattern());

        assert_eq!(
            f.errors.get("password"),
            Some("This field is too short (minimum is 10 characters)")
        );
    }
}
