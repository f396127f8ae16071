//! Rule applicability: which rules run on which changed files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

use crate::changeset::FileChange;
use crate::config::{ApplyTo, Rule};
use crate::{LinterError, Severity};

/// Files and rule ids selected for one analyzer group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Each selected file with the ids of the rules that apply to it,
    /// in change-set order and catalog order respectively.
    pub by_file: Vec<(PathBuf, Vec<String>)>,
}

impl Selection {
    /// Returns `true` when no rule applies to any file.
    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }

    /// Distinct files with at least one applicable rule.
    pub fn files(&self) -> Vec<PathBuf> {
        self.by_file.iter().map(|(path, _)| path.clone()).collect()
    }

    /// Distinct rule ids applicable to at least one file, first-seen order.
    pub fn rule_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.by_file
            .iter()
            .flat_map(|(_, ids)| ids.iter())
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }
}

/// Compiled applicability checks for a rule catalog.
pub struct Applicability<'a> {
    rules: Vec<CompiledRule<'a>>,
}

struct CompiledRule<'a> {
    rule: &'a Rule,
    /// `None` when the rule has no patterns.
    patterns: Option<GlobSet>,
}

impl<'a> Applicability<'a> {
    /// Compiles the file patterns of `rules`.
    pub fn new(rules: &'a [Rule]) -> Result<Self, LinterError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    rule,
                    patterns: build_globset(&rule.file_patterns)?,
                })
            })
            .collect::<Result<Vec<_>, LinterError>>()?;
        Ok(Self { rules })
    }

    /// Returns `true` when the rule at `index` applies to `file`.
    pub fn applies(&self, index: usize, file: &FileChange) -> bool {
        self.rules
            .get(index)
            .is_some_and(|compiled| compiled.applies(file))
    }

    /// Selects, for each file, the rules that apply to it.
    ///
    /// Files without any applicable rule are left out, as are duplicates.
    pub fn select(&self, files: &[FileChange]) -> Selection {
        let mut seen = HashSet::new();
        let mut by_file = Vec::new();

        for file in files {
            if !seen.insert(file.path.as_path()) {
                continue;
            }
            let ids: Vec<String> = self
                .rules
                .iter()
                .filter(|compiled| compiled.applies(file))
                .map(|compiled| compiled.rule.id.clone())
                .collect();
            if !ids.is_empty() {
                by_file.push((file.path.clone(), ids));
            }
        }

        Selection { by_file }
    }
}

impl CompiledRule<'_> {
    fn applies(&self, file: &FileChange) -> bool {
        if self.rule.severity == Severity::None {
            return false;
        }
        self.matches_name(&file.path) && applies_to_change(&self.rule.apply_to, file)
    }

    fn matches_name(&self, path: &Path) -> bool {
        let Some(patterns) = &self.patterns else {
            return true;
        };
        path.file_name()
            .is_some_and(|name| patterns.is_match(Path::new(name)))
    }
}

fn applies_to_change(apply_to: &[ApplyTo], file: &FileChange) -> bool {
    apply_to.iter().any(|kind| match kind {
        ApplyTo::All => true,
        ApplyTo::New => file.added,
        ApplyTo::Modified => file.modified,
    })
}

/// Rewrites a file pattern so only `*` and `?` act as wildcards.
///
/// Every other glob metacharacter is wrapped in a one-character class and
/// runs of `*` collapse to one.
fn literal_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut last_star = false;
    for ch in pattern.chars() {
        match ch {
            '*' if last_star => continue,
            '*' | '?' => out.push(ch),
            '[' => out.push_str("[[]"),
            ']' => out.push_str("[]]"),
            '{' => out.push_str("[{]"),
            '}' => out.push_str("[}]"),
            _ => out.push(ch),
        }
        last_star = ch == '*';
    }
    out
}

fn build_glob(pattern: &str) -> Result<Glob, LinterError> {
    GlobBuilder::new(&literal_glob(pattern))
        .case_insensitive(true)
        .literal_separator(true)
        .backslash_escape(false)
        .build()
        .map_err(|e| LinterError::config(format!("Invalid file pattern '{}': {}", pattern, e)))
}

/// Builds a case-insensitive GlobSet from base-name patterns.
fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>, LinterError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(build_glob(pattern)?);
    }

    let globset = builder
        .build()
        .map_err(|e| LinterError::config(format!("Failed to build globset: {}", e)))?;

    Ok(Some(globset))
}

/// Returns `true` when `name` fully matches the glob `pattern`, ignoring case.
pub fn glob_matches(pattern: &str, name: &str) -> Result<bool, LinterError> {
    Ok(build_glob(pattern)?.compile_matcher().is_match(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("*.cs", "Foo.cs", true)]
    #[case("*.cs", "foo.CS", true)]
    #[case("*.cs", "Foo.csx", false)]
    #[case("*.cs", "Foo.cs.bak", false)]
    #[case("Foo?.cs", "Foo1.cs", true)]
    #[case("Foo?.cs", "Foo.cs", false)]
    #[case("Foo?.cs", "Foo12.cs", false)]
    #[case("*Service*", "UserServiceImpl.cs", true)]
    #[case("Program.cs", "program.cs", true)]
    #[case("Program.cs", "MyProgram.cs", false)]
    fn test_glob_matches(#[case] pattern: &str, #[case] name: &str, #[case] expected: bool) {
        assert_eq!(glob_matches(pattern, name).unwrap(), expected);
    }

    #[rstest]
    #[case::brackets("File[1].cs", "File[1].cs", true)]
    #[case::brackets_not_a_class("File[1].cs", "File1.cs", false)]
    #[case::unclosed_bracket("Gen[.cs", "Gen[.cs", true)]
    #[case::closing_bracket("a].cs", "a].cs", true)]
    #[case::braces("{a,b}.cs", "{a,b}.cs", true)]
    #[case::braces_not_alternation("{a,b}.cs", "a.cs", false)]
    #[case::bang("!a.cs", "!a.cs", true)]
    #[case::double_star("**.cs", "A.cs", true)]
    #[case::wildcards_around_brackets("*[Gen]*", "Foo[gen]Bar.cs", true)]
    fn test_glob_metacharacters_are_literal(
        #[case] pattern: &str,
        #[case] name: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(glob_matches(pattern, name).unwrap(), expected);
    }

    #[test]
    fn test_unbalanced_pattern_compiles() {
        let rules = vec![Rule::new("X").apply_to(&[ApplyTo::All]).patterns(&["[a"])];
        let app = Applicability::new(&rules).unwrap();
        assert!(app.applies(0, &FileChange::added("/r/[A")));
        assert!(!app.applies(0, &FileChange::added("/r/a")));
    }

    #[test]
    fn test_patterns_match_base_name_only() {
        let rules = vec![Rule::new("X").apply_to(&[ApplyTo::All]).patterns(&["src*"])];
        let app = Applicability::new(&rules).unwrap();
        assert!(!app.applies(0, &FileChange::added("/repo/src/A.cs")));
        assert!(app.applies(0, &FileChange::added("/repo/lib/srcgen.cs")));
    }

    #[rstest]
    #[case(&[ApplyTo::All], FileChange::added("/r/A.cs"), true)]
    #[case(&[ApplyTo::All], FileChange::modified("/r/A.cs"), true)]
    #[case(&[ApplyTo::New], FileChange::added("/r/A.cs"), true)]
    #[case(&[ApplyTo::New], FileChange::modified("/r/A.cs"), false)]
    #[case(&[ApplyTo::Modified], FileChange::modified("/r/A.cs"), true)]
    #[case(&[ApplyTo::Modified], FileChange::added("/r/A.cs"), false)]
    #[case(&[ApplyTo::New, ApplyTo::Modified], FileChange::modified("/r/A.cs"), true)]
    #[case(&[], FileChange::added("/r/A.cs"), false)]
    #[case(&[], FileChange::modified("/r/A.cs"), false)]
    fn test_apply_to(
        #[case] kinds: &[ApplyTo],
        #[case] file: FileChange,
        #[case] expected: bool,
    ) {
        let rules = vec![Rule::new("X").apply_to(kinds)];
        let app = Applicability::new(&rules).unwrap();
        assert_eq!(app.applies(0, &file), expected);
    }

    #[test]
    fn test_empty_apply_to_selects_nothing() {
        let rules = vec![Rule::new("X").patterns(&["*"])];
        let files = vec![
            FileChange::added("/r/A.cs"),
            FileChange::modified("/r/B.cs"),
            FileChange::added("/r/C.txt"),
        ];
        let selection = Applicability::new(&rules).unwrap().select(&files);
        assert!(selection.is_empty());
        assert!(selection.rule_ids().is_empty());
    }

    #[test]
    fn test_no_patterns_only_apply_to_excludes() {
        let rules = vec![Rule::new("X").apply_to(&[ApplyTo::New])];
        let files = vec![
            FileChange::added("/r/A.cs"),
            FileChange::added("/r/readme"),
            FileChange::modified("/r/B.cs"),
        ];
        let selection = Applicability::new(&rules).unwrap().select(&files);
        assert_eq!(
            selection.files(),
            vec![PathBuf::from("/r/A.cs"), PathBuf::from("/r/readme")]
        );
    }

    #[test]
    fn test_disabled_rule_never_applies() {
        let rules = vec![Rule::new("X").apply_to(&[ApplyTo::All]).severity(Severity::None)];
        let app = Applicability::new(&rules).unwrap();
        assert!(!app.applies(0, &FileChange::added("/r/A.cs")));
    }

    #[test]
    fn test_select_groups_files_and_rule_ids() {
        let rules = vec![
            Rule::new("IDE0290").apply_to(&[ApplyTo::New]).patterns(&["*.cs"]),
            Rule::new("IDE0032").apply_to(&[ApplyTo::All]).patterns(&["*Model.cs"]),
            Rule::new("IDE0009").apply_to(&[ApplyTo::Modified]),
        ];
        let files = vec![
            FileChange::added("/r/A.cs"),
            FileChange::modified("/r/UserModel.cs"),
            FileChange::modified("/r/notes.txt"),
            FileChange::added("/r/A.cs"),
        ];
        let selection = Applicability::new(&rules).unwrap().select(&files);

        assert_eq!(
            selection.by_file,
            vec![
                (PathBuf::from("/r/A.cs"), vec!["IDE0290".to_string()]),
                (
                    PathBuf::from("/r/UserModel.cs"),
                    vec!["IDE0032".to_string(), "IDE0009".to_string()]
                ),
                (PathBuf::from("/r/notes.txt"), vec!["IDE0009".to_string()]),
            ]
        );
        assert_eq!(selection.rule_ids(), vec!["IDE0290", "IDE0032", "IDE0009"]);
    }

    #[test]
    fn test_applies_out_of_range_index() {
        let rules: Vec<Rule> = Vec::new();
        let app = Applicability::new(&rules).unwrap();
        assert!(!app.applies(3, &FileChange::added("/r/A.cs")));
    }
}
