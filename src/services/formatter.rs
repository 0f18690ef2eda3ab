use crate::models::FormatFlags;
use regex::Regex;

/// Renders canonical UUID strings according to [`FormatFlags`].
///
/// Rendering is pure: the same identifiers and flags always produce byte-identical
/// output, which is what lets the coordinator reformat existing identifiers instead
/// of generating new ones.
///
/// # Fields
///
/// - `canonical_pattern`: `8-4-4-4-12` hex groups, hyphenated, case-insensitive
/// - `v4_pattern`: the canonical pattern plus a `4` version nibble and `8`/`9`/`a`/`b`
///   variant nibble
#[derive(Debug, Clone)]
pub struct UuidFormatter {
    canonical_pattern: Regex,
    v4_pattern: Regex,
}

impl UuidFormatter {
    pub fn new() -> Self {
        Self {
            canonical_pattern: Regex::new(
                r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
            )
            .expect("Invalid canonical UUID regex"),
            v4_pattern: Regex::new(
                r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$",
            )
            .expect("Invalid v4 UUID regex"),
        }
    }

    /// Format a single identifier.
    ///
    /// Steps run in a fixed order: hyphens, case, quotes, then braces, so braces always
    /// end up outermost (`{"..."}`).
    pub fn format_one(&self, identifier: &str, flags: &FormatFlags) -> String {
        let mut value = if flags.include_hyphens {
            identifier.to_string()
        } else {
            identifier.replace('-', "")
        };

        value = if flags.upper_case {
            value.to_uppercase()
        } else {
            value.to_lowercase()
        };

        if flags.include_quotes {
            value = format!("\"{}\"", value);
        }

        if flags.include_braces {
            value = format!("{{{}}}", value);
        }

        value
    }

    /// Format a sequence of identifiers into one display / copy string.
    ///
    /// Comma separation only applies to more than one identifier; everything else is
    /// newline separated. An empty sequence yields an empty string.
    pub fn format_all<S: AsRef<str>>(&self, identifiers: &[S], flags: &FormatFlags) -> String {
        if identifiers.is_empty() {
            return String::new();
        }

        let separator = if flags.separate_with_commas && identifiers.len() > 1 {
            ", "
        } else {
            "\n"
        };

        identifiers
            .iter()
            .map(|id| self.format_one(id.as_ref(), flags))
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Whether `candidate` is in canonical `8-4-4-4-12` form, any case.
    pub fn is_valid_canonical_uuid(&self, candidate: &str) -> bool {
        self.canonical_pattern.is_match(candidate)
    }

    /// Whether `candidate` is canonical and carries v4 version and RFC 4122 variant bits.
    pub fn is_valid_v4_uuid(&self, candidate: &str) -> bool {
        self.v4_pattern.is_match(candidate)
    }
}

impl Default for UuidFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn flags() -> FormatFlags {
        FormatFlags::default()
    }

    #[test]
    fn test_format_one_default_is_canonical() {
        let formatter = UuidFormatter::new();
        assert_eq!(formatter.format_one(SAMPLE, &flags()), SAMPLE);
    }

    #[test]
    fn test_format_one_strips_hyphens() {
        let formatter = UuidFormatter::new();
        let flags = FormatFlags {
            include_hyphens: false,
            ..flags()
        };
        assert_eq!(
            formatter.format_one(SAMPLE, &flags),
            "550e8400e29b41d4a716446655440000"
        );
    }

    #[test]
    fn test_format_one_canonicalizes_case() {
        let formatter = UuidFormatter::new();

        let upper = FormatFlags {
            upper_case: true,
            ..flags()
        };
        assert_eq!(
            formatter.format_one(SAMPLE, &upper),
            "550E8400-E29B-41D4-A716-446655440000"
        );

        // Lower case is applied even when the input is already upper case
        assert_eq!(
            formatter.format_one("550E8400-E29B-41D4-A716-446655440000", &flags()),
            SAMPLE
        );
    }

    #[test]
    fn test_braces_wrap_quotes() {
        let formatter = UuidFormatter::new();
        let flags = FormatFlags {
            include_braces: true,
            include_quotes: true,
            ..flags()
        };
        assert_eq!(
            formatter.format_one(SAMPLE, &flags),
            "{\"550e8400-e29b-41d4-a716-446655440000\"}"
        );
    }

    #[test]
    fn test_all_flags() {
        let formatter = UuidFormatter::new();
        let flags = FormatFlags {
            include_hyphens: false,
            include_braces: true,
            include_quotes: true,
            upper_case: true,
            separate_with_commas: true,
        };
        assert_eq!(
            formatter.format_one(SAMPLE, &flags),
            "{\"550E8400E29B41D4A716446655440000\"}"
        );
    }

    #[test]
    fn test_format_all_empty() {
        let formatter = UuidFormatter::new();
        let empty: Vec<String> = Vec::new();
        let commas = FormatFlags {
            separate_with_commas: true,
            ..flags()
        };
        assert_eq!(formatter.format_all(&empty, &flags()), "");
        assert_eq!(formatter.format_all(&empty, &commas), "");
    }

    #[test]
    fn test_format_all_separators() {
        let formatter = UuidFormatter::new();
        let ids = vec![SAMPLE.to_string(), "6ba7b810-9dad-41d1-80b4-00c04fd430c8".to_string()];

        assert_eq!(
            formatter.format_all(&ids, &flags()),
            format!("{}\n{}", ids[0], ids[1])
        );

        let commas = FormatFlags {
            separate_with_commas: true,
            ..flags()
        };
        assert_eq!(
            formatter.format_all(&ids, &commas),
            format!("{}, {}", ids[0], ids[1])
        );
    }

    #[test]
    fn test_single_identifier_never_gets_comma() {
        let formatter = UuidFormatter::new();
        let commas = FormatFlags {
            separate_with_commas: true,
            ..flags()
        };
        let output = formatter.format_all(&[SAMPLE], &commas);
        assert!(!output.contains(','));
        assert_eq!(output, SAMPLE);
    }

    #[test]
    fn test_canonical_validation() {
        let formatter = UuidFormatter::new();

        assert!(formatter.is_valid_canonical_uuid(SAMPLE));
        assert!(formatter.is_valid_canonical_uuid(&SAMPLE.to_uppercase()));
        assert!(!formatter.is_valid_canonical_uuid(""));
        assert!(!formatter.is_valid_canonical_uuid("not-a-uuid"));
        assert!(!formatter.is_valid_canonical_uuid(&SAMPLE.replace('-', "")));
        assert!(!formatter.is_valid_canonical_uuid(&format!("{{{}}}", SAMPLE)));
        assert!(!formatter.is_valid_canonical_uuid(&format!("{} ", SAMPLE)));
    }

    #[test]
    fn test_v4_validation() {
        let formatter = UuidFormatter::new();

        assert!(formatter.is_valid_v4_uuid(SAMPLE));
        // Version 1 identifier
        assert!(!formatter.is_valid_v4_uuid("6ba7b810-9dad-11d1-80b4-00c04fd430c8"));
        // Wrong variant nibble
        assert!(!formatter.is_valid_v4_uuid("550e8400-e29b-41d4-c716-446655440000"));
    }
}
