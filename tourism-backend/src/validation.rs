//! Request body validation
//!
//! Each request type implements [`Validate`] and reports every violated field
//! at once, so the client can highlight all problems in a single round trip.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::errors::ApiError;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));
static CURRENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid currency regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

/// Collects field errors while a request is being checked
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: &str, message: &str) -> &mut Self {
        self.errors.push(FieldError::new(field, message));
        self
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.error(field, message);
        }
        self
    }

    /// Non-blank string no longer than `max` characters
    pub fn required(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.error(field, "is required");
        } else if trimmed.chars().count() > max {
            self.error(field, &format!("must be at most {} characters", max));
        }
        self
    }

    pub fn optional(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.error(field, &format!("must be at most {} characters", max));
            }
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_valid_email(value) {
            self.error(field, "must be a valid email address");
        }
        self
    }

    pub fn slug(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(slug) = value {
            if !SLUG_RE.is_match(slug) {
                self.error(field, "must contain only lowercase letters, digits and single dashes");
            }
        }
        self
    }

    pub fn http_url(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_http_url(value) {
            self.error(field, "must be an http(s) URL");
        }
        self
    }

    pub fn currency(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(c) = value {
            if !CURRENCY_RE.is_match(c) {
                self.error(field, "must be a 3-letter ISO currency code");
            }
        }
        self
    }

    pub fn positive(&mut self, field: &str, value: i64) -> &mut Self {
        if value <= 0 {
            self.error(field, "must be greater than 0");
        }
        self
    }

    pub fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
        if value < 0 {
            self.error(field, "must not be negative");
        }
        self
    }

    pub fn range(&mut self, field: &str, value: i64, min: i64, max: i64) -> &mut Self {
        if value < min || value > max {
            self.error(field, &format!("must be between {} and {}", min, max));
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 254 && EMAIL_RE.is_match(value.trim())
}

pub fn is_http_url(value: &str) -> bool {
    match url::Url::parse(value.trim()) {
        Ok(u) => (u.scheme() == "http" || u.scheme() == "https") && u.host_str().is_some(),
        Err(_) => false,
    }
}

/// Derive a URL slug from a human title ("Ha Long Bay 2 Days!" -> "ha-long-bay-2-days")
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        let c = fold_diacritic(c);
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Fold the common Latin (including Vietnamese) accented letters onto ASCII
fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'ả' | 'ã' | 'ạ' | 'ă' | 'ằ' | 'ắ' | 'ẳ' | 'ẵ' | 'ặ' | 'â' | 'ầ' | 'ấ' | 'ẩ'
        | 'ẫ' | 'ậ' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Ả' | 'Ã' | 'Ạ' | 'Ă' | 'Ằ' | 'Ắ' | 'Ẳ' | 'Ẵ' | 'Ặ' | 'Â' | 'Ầ' | 'Ấ' | 'Ẩ'
        | 'Ẫ' | 'Ậ' | 'Ä' | 'Å' => 'a',
        'è' | 'é' | 'ẻ' | 'ẽ' | 'ẹ' | 'ê' | 'ề' | 'ế' | 'ể' | 'ễ' | 'ệ' | 'ë' => 'e',
        'È' | 'É' | 'Ẻ' | 'Ẽ' | 'Ẹ' | 'Ê' | 'Ề' | 'Ế' | 'Ể' | 'Ễ' | 'Ệ' | 'Ë' => 'e',
        'ì' | 'í' | 'ỉ' | 'ĩ' | 'ị' | 'ï' | 'Ì' | 'Í' | 'Ỉ' | 'Ĩ' | 'Ị' | 'Ï' => 'i',
        'ò' | 'ó' | 'ỏ' | 'õ' | 'ọ' | 'ô' | 'ồ' | 'ố' | 'ổ' | 'ỗ' | 'ộ' | 'ơ' | 'ờ' | 'ớ' | 'ở'
        | 'ỡ' | 'ợ' | 'ö' | 'ø' => 'o',
        'Ò' | 'Ó' | 'Ỏ' | 'Õ' | 'Ọ' | 'Ô' | 'Ồ' | 'Ố' | 'Ổ' | 'Ỗ' | 'Ộ' | 'Ơ' | 'Ờ' | 'Ớ' | 'Ở'
        | 'Ỡ' | 'Ợ' | 'Ö' | 'Ø' => 'o',
        'ù' | 'ú' | 'ủ' | 'ũ' | 'ụ' | 'ư' | 'ừ' | 'ứ' | 'ử' | 'ữ' | 'ự' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Ủ' | 'Ũ' | 'Ụ' | 'Ư' | 'Ừ' | 'Ứ' | 'Ử' | 'Ữ' | 'Ự' | 'Ü' => 'u',
        'ỳ' | 'ý' | 'ỷ' | 'ỹ' | 'ỵ' | 'Ỳ' | 'Ý' | 'Ỷ' | 'Ỹ' | 'Ỵ' => 'y',
        'đ' | 'Đ' => 'd',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Ha Long Bay 2 Days!"), "ha-long-bay-2-days");
        assert_eq!(slugify("  --Sapa   Trekking-- "), "sapa-trekking");
        assert_eq!(slugify("Đà Lạt Homestay"), "da-lat-homestay");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_email_and_url() {
        assert!(is_valid_email("guest@example.com"));
        assert!(!is_valid_email("guest@example"));
        assert!(!is_valid_email("not an email"));

        assert!(is_http_url("https://n8n.example.com/webhook/abc"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn test_validator_collects_all_errors() {
        let result = Validator::new()
            .required("name", "  ", 100)
            .email("email", "nope")
            .positive("guests", 0)
            .slug("slug", Some("Bad Slug"))
            .finish();

        match result {
            Err(ApiError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "email", "guests", "slug"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validator_passes() {
        assert!(
            Validator::new()
                .required("name", "Sapa", 100)
                .currency("currency", Some("VND"))
                .range("max_guests", 4, 1, 50)
                .finish()
                .is_ok()
        );
    }
}
