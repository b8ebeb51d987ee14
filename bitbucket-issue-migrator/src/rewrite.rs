//! Body-text rewriting.
//!
//! Pure functions that translate Bitbucket-flavored text into something
//! GitHub renders natively: same-repo issue links become bare `#n` tokens,
//! `{{{ }}}` blocks become fenced code, `<<changeset>>` markers become
//! commit links, and attribution blocks are appended exactly once.
//!
//! Every function here is idempotent, so a retried submission that
//! re-feeds already-rewritten text never accumulates duplicates.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Matches a Bitbucket issue URL; group 1 is `owner/repo`, group 2 the id.
static ISSUE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://bitbucket\.org/([A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+)/issues?/(\d+)(?:/[A-Za-z0-9_.-]*)?",
    )
    .expect("issue link pattern")
});

/// Matches Bitbucket `<<changeset ...>>` / `<<cset ...>>` wiki markers.
static CHANGESET_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<<(?:changeset|cset)\s+([0-9a-fA-F]{7,40})>>").expect("changeset pattern")
});

/// Rewrites links to issues of `source_repo` into bare `#n` tokens that
/// GitHub auto-links. Links to any other repository are left alone, and
/// bare `#n` tokens are already canonical so a second pass is a no-op.
pub fn rewrite_issue_links(body: &str, source_repo: &str) -> String {
    ISSUE_LINK
        .replace_all(body, |caps: &Captures<'_>| {
            if caps[1].eq_ignore_ascii_case(source_repo) {
                format!("#{}", &caps[2])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Rewrites `<<changeset sha>>` markers into markdown links to the source
/// repository's commits.
pub fn link_changesets(body: &str, source_repo: &str) -> String {
    CHANGESET_MARKER
        .replace_all(body, |caps: &Captures<'_>| {
            let sha = &caps[1];
            format!("[{sha}](https://bitbucket.org/{source_repo}/commits/{sha})")
        })
        .into_owned()
}

/// Converts Bitbucket/Trac `{{{ }}}` code markup into markdown.
///
/// Block markers become ``` fences (a `{{{#!lang` opener keeps the syntax
/// hint); inline `{{{x}}}` becomes backticks.
pub fn normalize_code_blocks(body: &str) -> String {
    let mut out = Vec::new();
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("{{{") && !trimmed.contains("}}}") {
            let rest = trimmed[3..].trim();
            if let Some(lang) = rest.strip_prefix("#!") {
                out.push(format!("```{lang}"));
            } else if rest.is_empty() {
                out.push("```".to_string());
            } else {
                out.push("```".to_string());
                out.push(rest.to_string());
            }
        } else if trimmed == "}}}" {
            out.push("```".to_string());
        } else {
            out.push(line.replace("{{{", "`").replace("}}}", "`"));
        }
    }
    out.join("\n")
}

/// Appends `annotation` to `body` unless it is already present, so retried
/// submissions don't stack duplicate attribution blocks.
pub fn append_attribution(body: &str, annotation: &str) -> String {
    if body.contains(annotation) {
        return body.to_string();
    }
    if body.trim().is_empty() {
        annotation.to_string()
    } else {
        format!("{body}\n\n{annotation}")
    }
}

/// The full body rewrite applied to every migrated issue and comment.
pub fn rewrite_body(body: &str, source_repo: &str, changeset_links: bool) -> String {
    let body = normalize_code_blocks(body);
    let body = rewrite_issue_links(&body, source_repo);
    if changeset_links {
        link_changesets(&body, source_repo)
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPO: &str = "acme/widget";

    #[test]
    fn same_repo_link_becomes_hash_token() {
        let body = "see https://bitbucket.org/acme/widget/issues/7/crash-on-startup for details";
        assert_eq!(
            rewrite_issue_links(body, REPO),
            "see #7 for details"
        );
    }

    #[test]
    fn foreign_repo_link_is_untouched() {
        let body = "see issue #7 in this repo and bitbucket.org/other/repo/issues/2";
        let rewritten = rewrite_issue_links(
            "see issue https://bitbucket.org/acme/widget/issues/7 in this repo \
             and https://bitbucket.org/other/repo/issues/2",
            REPO,
        );
        assert_eq!(
            rewritten,
            "see issue #7 in this repo and https://bitbucket.org/other/repo/issues/2"
        );
        // A body with no local links at all is left byte-identical.
        assert_eq!(rewrite_issue_links(body, REPO), body);
    }

    #[test]
    fn bare_tokens_are_not_double_rewritten() {
        let body = "duplicate of #12";
        assert_eq!(rewrite_issue_links(body, REPO), body);
    }

    #[test]
    fn old_issue_singular_path_is_recognized() {
        let body = "https://bitbucket.org/acme/widget/issue/3";
        assert_eq!(rewrite_issue_links(body, REPO), "#3");
    }

    #[test]
    fn changeset_markers_become_commit_links() {
        let body = "fixed in <<changeset deadbeefcafe>>";
        assert_eq!(
            link_changesets(body, REPO),
            "fixed in [deadbeefcafe](https://bitbucket.org/acme/widget/commits/deadbeefcafe)"
        );
        let body = "see <<cset 0123abc>>";
        assert!(link_changesets(body, REPO).contains("/commits/0123abc"));
    }

    #[test]
    fn code_blocks_become_fences() {
        let body = "before\n{{{#!python\nprint('hi')\n}}}\nafter";
        assert_eq!(
            normalize_code_blocks(body),
            "before\n```python\nprint('hi')\n```\nafter"
        );
    }

    #[test]
    fn inline_braces_become_backticks() {
        assert_eq!(
            normalize_code_blocks("call {{{foo()}}} here"),
            "call `foo()` here"
        );
    }

    #[test]
    fn attribution_is_appended_once() {
        let annotation = "---\n\nOriginal comment by [jsmith](https://bitbucket.org/jsmith)";
        let once = append_attribution("hello", annotation);
        assert!(once.ends_with(annotation));
        assert_eq!(append_attribution(&once, annotation), once);
    }

    #[test]
    fn attribution_on_empty_body() {
        let annotation = "---\n\nOriginal comment by somebody";
        assert_eq!(append_attribution("  ", annotation), annotation);
    }

    #[test]
    fn full_rewrite_is_idempotent() {
        let bodies = [
            "see https://bitbucket.org/acme/widget/issues/7 and #9",
            "block:\n{{{\ncode {{{nested\n}}}\ndone",
            "inline {{{x}}} and <<changeset deadbeef1>>",
            "plain text, nothing special",
            "foreign https://bitbucket.org/other/repo/issues/2 stays",
        ];
        for body in bodies {
            let once = rewrite_body(body, REPO, true);
            let twice = rewrite_body(&once, REPO, true);
            assert_eq!(once, twice, "rewrite not idempotent for {body:?}");
        }
    }
}
