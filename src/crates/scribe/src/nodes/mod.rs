//! Node implementations for the article-proposal pipeline.

mod deep_research;
mod prompts;
mod submit_draft_branch;
mod topic_proposal;

pub use deep_research::DeepResearchNode;
pub use submit_draft_branch::SubmitDraftBranchNode;
pub use topic_proposal::TopicProposalNode;

/// Reduce arbitrary text to a filesystem- and branch-safe slug.
///
/// Lowercases, maps runs of non-alphanumeric characters to single hyphens,
/// trims hyphens from both ends, and caps the result at 50 characters.
/// Applying it to an already-slugified string yields the same string.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len().min(50));
    let mut pending_hyphen = false;

    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
        if slug.len() >= 50 {
            break;
        }
    }

    slug.truncate(50);
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        "draft".to_string()
    } else {
        slug
    }
}
