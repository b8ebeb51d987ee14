//! Projects source records onto the destination import schema.
//!
//! Mapping is pure string and taxonomy work except for milestone
//! resolution, which goes through the run's [`MilestoneRegistry`] and may
//! create the milestone on first encounter. Dry runs never resolve
//! milestones, so a preview touches nothing on the destination.
//!
//! [`MilestoneRegistry`]: crate::taxonomy::MilestoneRegistry

mod error;
mod mapped;

pub use error::MapError;
pub use mapped::{MappedComment, MappedIssue};

use crate::context::MigrationContext;
use crate::rewrite;
use crate::source::{SourceComment, SourceIssue, StatusChange};
use crate::taxonomy::{label_for, TaxonomyKind};
use crate::users::Resolution;
use octocrab::Octocrab;

/// Maps one source issue (plus its ancillary records) onto the
/// destination schema.
///
/// # Errors
///
/// Returns [`MapError`] if the issue's milestone can't be resolved.
pub async fn map_issue(
    ctx: &MigrationContext,
    octocrab: &Octocrab,
    issue: &SourceIssue,
    comments: &[SourceComment],
    attachments: &[String],
    changes: &[StatusChange],
) -> Result<MappedIssue, MapError> {
    let repo = &ctx.config.bitbucket_repo;

    let mut body = rewrite::rewrite_body(issue.body(), repo, ctx.config.link_changesets);
    if ctx.config.mention_attachments && !attachments.is_empty() {
        body = rewrite::append_attribution(&body, &attachment_note(attachments));
    }
    body = rewrite::append_attribution(&body, &issue_annotation(ctx, issue));

    let source_milestone = issue.milestone.as_ref().map(|m| m.name.clone());
    let milestone = match &source_milestone {
        // Dry runs must not create milestones on the destination.
        Some(title) if !ctx.config.dry_run => {
            Some(ctx.milestones.milestone_id_for(octocrab, title).await?)
        }
        _ => None,
    };

    let assignee = issue
        .assignee
        .as_ref()
        .and_then(|a| a.handle())
        .and_then(|h| ctx.users.assignee_for(h));

    let mut mapped_comments: Vec<MappedComment> =
        comments.iter().map(|c| map_comment(ctx, c)).collect();
    if ctx.config.mention_status_changes {
        mapped_comments.extend(changes.iter().map(status_change_comment));
    }
    mapped_comments.sort_by_key(|c| c.created_at);

    Ok(MappedIssue {
        title: issue.title.clone(),
        body,
        created_at: issue.created_on,
        updated_at: issue.updated_on,
        closed: issue.is_closed(),
        labels: collect_labels(issue),
        milestone,
        assignee,
        source_milestone,
        comments: mapped_comments,
    })
}

/// Maps one comment, rewriting its body and attributing it to the source
/// author unless that author is suppressed.
pub fn map_comment(ctx: &MigrationContext, comment: &SourceComment) -> MappedComment {
    let repo = &ctx.config.bitbucket_repo;
    let body = rewrite::rewrite_body(comment.body(), repo, ctx.config.link_changesets);

    let suppressed = comment
        .author_handle()
        .is_some_and(|h| ctx.users.is_suppressed(h));
    let body = if suppressed {
        body
    } else {
        rewrite::append_attribution(&body, &comment_annotation(ctx, comment))
    };

    MappedComment {
        created_at: comment.created_on,
        body,
    }
}

/// Deduplicated label set derived from the issue's taxonomy values.
fn collect_labels(issue: &SourceIssue) -> Vec<String> {
    let mut labels = Vec::new();
    let mut push = |label: String| {
        if !label.is_empty() && !labels.contains(&label) {
            labels.push(label);
        }
    };

    push(label_for(TaxonomyKind::Priority, &issue.priority));
    push(label_for(TaxonomyKind::IssueType, &issue.kind));
    if let Some(component) = &issue.component {
        push(label_for(TaxonomyKind::Component, &component.name));
    }
    if let Some(version) = &issue.version {
        push(label_for(TaxonomyKind::Version, &version.name));
    }
    labels
}

/// `[name](bitbucket profile)` plus the GitHub profile when the user is
/// mapped; `Anonymous` for deleted accounts.
fn author_reference(ctx: &MigrationContext, handle: Option<&str>) -> String {
    let Some(handle) = handle else {
        return "Anonymous".to_string();
    };
    let source = format!("[{handle}](https://bitbucket.org/{handle})");
    match ctx.users.resolve(handle) {
        Resolution::Destination(dest) => {
            format!("{source} ([{dest}](https://github.com/{dest}))")
        }
        Resolution::Suppressed | Resolution::Unknown => source,
    }
}

fn issue_annotation(ctx: &MigrationContext, issue: &SourceIssue) -> String {
    format!(
        "---\n\n\
         - Bitbucket issue: https://bitbucket.org/{repo}/issues/{id}\n\
         - Originally reported by: {author}\n\
         - Originally created at: {created}",
        repo = ctx.config.bitbucket_repo,
        id = issue.id,
        author = author_reference(ctx, issue.reporter_handle()),
        created = issue.created_on.to_rfc3339(),
    )
}

fn comment_annotation(ctx: &MigrationContext, comment: &SourceComment) -> String {
    format!(
        "---\n\nOriginal comment by {}",
        author_reference(ctx, comment.author_handle())
    )
}

fn attachment_note(attachments: &[String]) -> String {
    let mut note = String::from("---\n\nAttachments (not migrated):\n");
    for name in attachments {
        note.push_str("- ");
        note.push_str(name);
        note.push('\n');
    }
    note.truncate(note.trim_end().len());
    note
}

fn status_change_comment(change: &StatusChange) -> MappedComment {
    let actor = change.actor.as_deref().unwrap_or("someone");
    MappedComment {
        created_at: change.created_on,
        body: format!("*{actor} changed the issue status to **{}**.*", change.to),
    }
}
