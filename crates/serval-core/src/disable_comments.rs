//! Inline suppression comments
//!
//! Supports `// serval-disable-line [RULES]` on the offending line and
//! `// serval-disable-next-line [RULES]` on the preceding line. With no
//! rule list, every rule is suppressed for that line; otherwise only the
//! comma-separated ids or names given.

use std::collections::HashMap;

const DISABLE_NEXT_LINE: &str = "serval-disable-next-line";
const DISABLE_LINE: &str = "serval-disable-line";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Suppression {
    All,
    Rules(Vec<String>),
}

#[derive(Debug, Default)]
pub struct DisableDirectives {
    /// Line number (1-based) -> suppression active on that line.
    by_line: HashMap<usize, Suppression>,
}

impl DisableDirectives {
    pub fn from_source(source: &str) -> Self {
        let mut by_line = HashMap::new();

        for (idx, line) in source.lines().enumerate() {
            let line_no = idx + 1;
            let Some(comment_start) = line.find("//") else {
                continue;
            };
            let comment = &line[comment_start + 2..];
            let trimmed = comment.trim_start();

            // Check the longer marker first: "-next-line" contains "-line".
            if let Some(rest) = trimmed.strip_prefix(DISABLE_NEXT_LINE) {
                by_line.insert(line_no + 1, parse_rule_list(rest));
            } else if let Some(rest) = trimmed.strip_prefix(DISABLE_LINE) {
                by_line.insert(line_no, parse_rule_list(rest));
            }
        }

        Self { by_line }
    }

    pub fn is_disabled(&self, line: usize, rule: &str) -> bool {
        match self.by_line.get(&line) {
            Some(Suppression::All) => true,
            Some(Suppression::Rules(rules)) => rules.iter().any(|r| r == rule),
            None => false,
        }
    }
}

fn parse_rule_list(rest: &str) -> Suppression {
    let rules: Vec<String> = rest
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();

    if rules.is_empty() {
        Suppression::All
    } else {
        Suppression::Rules(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disable_line_suppresses_same_line() {
        let directives = DisableDirectives::from_source("gets(buf); // serval-disable-line S003");

        assert!(directives.is_disabled(1, "S003"));
        assert!(!directives.is_disabled(1, "S001"));
    }

    #[test]
    fn disable_next_line_suppresses_following_line() {
        let source = "// serval-disable-next-line S003\ngets(buf);";
        let directives = DisableDirectives::from_source(source);

        assert!(directives.is_disabled(2, "S003"));
        assert!(!directives.is_disabled(1, "S003"));
    }

    #[test]
    fn bare_directive_suppresses_all_rules() {
        let source = "// serval-disable-next-line\ngets(buf);";
        let directives = DisableDirectives::from_source(source);

        assert!(directives.is_disabled(2, "S003"));
        assert!(directives.is_disabled(2, "ANY"));
    }

    #[test]
    fn multiple_rules_in_one_directive() {
        let source = "// serval-disable-next-line S001, S003\nstrcpy(d, s);";
        let directives = DisableDirectives::from_source(source);

        assert!(directives.is_disabled(2, "S001"));
        assert!(directives.is_disabled(2, "S003"));
        assert!(!directives.is_disabled(2, "S002"));
    }

    #[test]
    fn unrelated_lines_are_not_suppressed() {
        let source = "// serval-disable-next-line S003\ngets(buf);\ngets(other);";
        let directives = DisableDirectives::from_source(source);

        assert!(!directives.is_disabled(3, "S003"));
    }

    #[test]
    fn plain_comments_are_ignored() {
        let directives = DisableDirectives::from_source("// just a comment\nint x;");

        assert!(!directives.is_disabled(1, "S003"));
        assert!(!directives.is_disabled(2, "S003"));
    }
}
