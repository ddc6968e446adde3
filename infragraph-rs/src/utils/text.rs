//! Text processing utilities.

use regex::Regex;
use std::sync::OnceLock;

static NON_WORD_RE: OnceLock<Regex> = OnceLock::new();
static UNDERSCORES_RE: OnceLock<Regex> = OnceLock::new();

fn non_word_re() -> &'static Regex {
    NON_WORD_RE.get_or_init(|| Regex::new(r"\W+").expect("static regex is valid"))
}

fn underscores_re() -> &'static Regex {
    UNDERSCORES_RE.get_or_init(|| Regex::new(r"__+").expect("static regex is valid"))
}

/// Canonicalize a raw column header into an identifier.
///
/// Trims surrounding whitespace, replaces every run of non-word characters with a
/// single underscore and collapses repeated underscores. Idempotent; whitespace-only
/// input yields an empty string.
///
/// ```
/// use infragraph_rs::utils::normalize_column_name;
/// assert_eq!(normalize_column_name(" Tag: aws:autoscaling:groupName "), "Tag_aws_autoscaling_groupName");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    let replaced = non_word_re().replace_all(name.trim(), "_");
    underscores_re().replace_all(&replaced, "_").into_owned()
}

/// Split a bracketed, whitespace-separated list such as `"[sg-1 sg-2]"` into its
/// identifiers.
///
/// One leading `[` and one trailing `]` are removed when present. Tokens keep
/// their source order and duplicates; empty tokens are dropped.
pub fn parse_security_groups(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix('[').unwrap_or(trimmed);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    inner
        .split_whitespace()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- normalize_column_name ---

    #[test]
    fn test_normalize_replaces_separators() {
        assert_eq!(normalize_column_name("Availability Zone"), "Availability_Zone");
        assert_eq!(normalize_column_name("Root Volume ID"), "Root_Volume_ID");
        assert_eq!(normalize_column_name("VPC-ID"), "VPC_ID");
    }

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(
            normalize_column_name("Tag: aws:ec2launchtemplate:id"),
            "Tag_aws_ec2launchtemplate_id"
        );
        assert_eq!(normalize_column_name("a  --  b"), "a_b");
        assert_eq!(normalize_column_name("a__b"), "a_b");
    }

    #[test]
    fn test_normalize_trims_surrounding_whitespace() {
        assert_eq!(normalize_column_name("  Servers\t"), "Servers");
    }

    #[test]
    fn test_normalize_keeps_edge_separators() {
        assert_eq!(normalize_column_name("(Product)"), "_Product_");
    }

    #[test]
    fn test_normalize_all_whitespace_is_empty() {
        assert_eq!(normalize_column_name("   "), "");
        assert_eq!(normalize_column_name(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "Servers",
            " Tag: aws:autoscaling:groupName ",
            "Supporting Product Owner",
            "__weird__  name!!",
            "(x)",
            "%%%",
            "Région / Zone",
        ];
        for input in inputs {
            let once = normalize_column_name(input);
            assert_eq!(normalize_column_name(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_normalize_keeps_unicode_word_characters() {
        assert_eq!(normalize_column_name("Région"), "Région");
    }

    // --- parse_security_groups ---

    #[test]
    fn test_parse_bracketed_list() {
        assert_eq!(parse_security_groups("[sg-1 sg-2]"), vec!["sg-1", "sg-2"]);
    }

    #[test]
    fn test_parse_empty_inputs() {
        assert!(parse_security_groups("").is_empty());
        assert!(parse_security_groups("[]").is_empty());
        assert!(parse_security_groups("[   ]").is_empty());
        assert!(parse_security_groups("   ").is_empty());
    }

    #[test]
    fn test_parse_without_brackets() {
        assert_eq!(parse_security_groups("sg-1"), vec!["sg-1"]);
        assert_eq!(parse_security_groups("sg-1\tsg-2\nsg-3"), vec!["sg-1", "sg-2", "sg-3"]);
    }

    #[test]
    fn test_parse_preserves_order_and_duplicates() {
        assert_eq!(
            parse_security_groups("[sg-b sg-a sg-b]"),
            vec!["sg-b", "sg-a", "sg-b"]
        );
    }

    #[test]
    fn test_parse_strips_only_one_bracket_each_side() {
        assert_eq!(parse_security_groups("[[sg-1]]"), vec!["[sg-1]"]);
    }

    #[test]
    fn test_parse_tolerates_extra_spacing() {
        assert_eq!(parse_security_groups("  [ sg-1    sg-2 ]  "), vec!["sg-1", "sg-2"]);
    }
}
