use regex::Regex;
use std::sync::LazyLock;

/// Same loose shape the landing page accepts: something@something.tld
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

pub const INCOMPLETE_FORM_MESSAGE: &str = "Please fill out all fields correctly.";
pub const MISSING_FILE_MESSAGE: &str = "Please select a file to upload.";

/// Longest name forwarded to the manager, in bytes.
const MAX_FILENAME_BYTES: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Checks the free-text part of a submission.
///
/// Missing fields and a malformed email share one message; an overlong
/// description gets its own so the user knows what to shorten. The email
/// pattern is matched against the raw input, so surrounding whitespace
/// makes it invalid.
pub fn validate_form(
    description: &str,
    email: &str,
    max_description_chars: usize,
) -> Result<(), ValidationError> {
    let description = description.trim();

    if description.is_empty() || email.trim().is_empty() || !is_valid_email(email) {
        return Err(ValidationError {
            code: "INCOMPLETE_FORM",
            message: INCOMPLETE_FORM_MESSAGE.to_string(),
        });
    }

    if description.chars().count() > max_description_chars {
        return Err(ValidationError {
            code: "DESCRIPTION_TOO_LONG",
            message: format!(
                "Description must be {} characters or less",
                max_description_chars
            ),
        });
    }

    Ok(())
}

/// Validates file size against maximum limit. A file of exactly `max_size`
/// bytes is accepted.
pub fn validate_file_size(size: u64, max_size: u64) -> Result<(), ValidationError> {
    if size > max_size {
        return Err(ValidationError {
            code: "FILE_TOO_LARGE",
            message: format!("File size must be {} or less", describe_limit(max_size)),
        });
    }
    Ok(())
}

pub fn missing_file() -> ValidationError {
    ValidationError {
        code: "MISSING_FILE",
        message: MISSING_FILE_MESSAGE.to_string(),
    }
}

fn describe_limit(bytes: u64) -> String {
    const GIB: u64 = 1024 * 1024 * 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= GIB && bytes % GIB == 0 {
        format!("{}GB", bytes / GIB)
    } else if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Reduces a client-supplied file name to a single safe path component
/// before it is used to build an object key upstream.
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot be empty".to_string(),
        });
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path components stripped from file name: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Limit length safely for UTF-8
    let sanitized = if sanitized.len() > MAX_FILENAME_BYTES {
        let mut end = MAX_FILENAME_BYTES;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    if sanitized.starts_with('.') {
        return Err(ValidationError {
            code: "HIDDEN_FILE",
            message: "Hidden files (starting with '.') are not allowed".to_string(),
        });
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GB: u64 = 2 * 1024 * 1024 * 1024;

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size(1024, TWO_GB).is_ok());
        assert!(validate_file_size(TWO_GB, TWO_GB).is_ok());

        let err = validate_file_size(TWO_GB + 1, TWO_GB).unwrap_err();
        assert_eq!(err.code, "FILE_TOO_LARGE");
        assert_eq!(err.message, "File size must be 2GB or less");
    }

    #[test]
    fn test_validate_form() {
        assert!(validate_form("A legal-domain model", "ada@example.com", 500).is_ok());
        assert!(validate_form("  padded  ", "ada@example.com", 500).is_ok());

        for (description, email) in [
            ("", "ada@example.com"),
            ("   ", "ada@example.com"),
            ("model", ""),
            ("model", "ada@example"),
            ("model", "ada example@x.com"),
            ("model", "@example.com"),
            ("model", " ada@example.com "),
            ("model", "ada@example.com\n"),
        ] {
            let err = validate_form(description, email, 500).unwrap_err();
            assert_eq!(err.message, INCOMPLETE_FORM_MESSAGE, "{:?}", (description, email));
        }
    }

    #[test]
    fn test_description_limit_counts_characters() {
        let exactly = "é".repeat(500);
        assert!(validate_form(&exactly, "ada@example.com", 500).is_ok());

        let over = "a".repeat(501);
        let err = validate_form(&over, "ada@example.com", 500).unwrap_err();
        assert_eq!(err.code, "DESCRIPTION_TOO_LONG");
        assert_eq!(err.message, "Description must be 500 characters or less");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test.pdf").unwrap(), "test.pdf");
        assert_eq!(sanitize_filename("my file.csv").unwrap(), "my file.csv");
        assert_eq!(
            sanitize_filename("test<script>.pdf").unwrap(),
            "test_script_.pdf"
        );
        assert_eq!(sanitize_filename("法律.pdf").unwrap(), "法律.pdf");

        assert_eq!(sanitize_filename("../../../etc/passwd").unwrap(), "passwd");
        assert_eq!(
            sanitize_filename("..\\..\\windows\\corpus.txt").unwrap(),
            "corpus.txt"
        );

        assert!(sanitize_filename("").is_err());
        assert!(sanitize_filename("uploads/").is_err());
        assert!(sanitize_filename(".env").is_err());
    }

    #[test]
    fn test_sanitize_filename_truncates_on_char_boundary() {
        let long = format!("{}.pdf", "数".repeat(200));
        let sanitized = sanitize_filename(&long).unwrap();
        assert!(sanitized.len() <= MAX_FILENAME_BYTES);
        assert!(sanitized.chars().all(|c| c == '数'));
    }
}
