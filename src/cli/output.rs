//! Output formatting utilities

use crate::application::{BulkReport, MergeReport, SweepReport, TreeLine};
use crate::domain::{ContentItem, Tag, TagNormalization};

/// One-line summary of a tag
pub fn format_tag(tag: &Tag) -> String {
    format!("#{:<5} {} ({})", tag.id.0, tag.name, tag.tag_type)
}

/// Format a list of tags for display.
pub fn format_tag_list(tags: &[Tag]) -> String {
    if tags.is_empty() {
        return "No tags found".to_string();
    }

    let mut output = String::new();
    for tag in tags {
        output.push_str(&format_tag(tag));
        output.push('\n');
    }
    output
}

/// Full view of one tag
pub fn format_tag_details(tag: &Tag, parents: &[Tag], children: &[Tag], content: usize) -> String {
    let mut output = format!("{}\n", format_tag(tag));
    if let Some(description) = &tag.description {
        output.push_str(&format!("  description: {}\n", description));
    }
    let mut flags = Vec::new();
    if tag.is_featured {
        flags.push("featured");
    }
    if tag.is_private {
        flags.push("private");
    }
    if !flags.is_empty() {
        output.push_str(&format!("  flags: {}\n", flags.join(", ")));
    }
    output.push_str(&format!("  parents: {}\n", join_names(parents)));
    output.push_str(&format!("  children: {}\n", join_names(children)));
    output.push_str(&format!("  content items: {}\n", content));
    output.push_str(&format!("  created: {}\n", tag.created_at.format("%Y-%m-%d %H:%M")));
    output
}

fn join_names(tags: &[Tag]) -> String {
    if tags.is_empty() {
        return "-".to_string();
    }
    tags.iter()
        .map(|tag| tag.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Indented hierarchy; tags reached again through another parent are marked
pub fn format_tree(lines: &[TreeLine]) -> String {
    if lines.is_empty() {
        return "No tags found".to_string();
    }

    let mut output = String::new();
    for line in lines {
        output.push_str(&"  ".repeat(line.depth));
        output.push_str(&line.tag.name);
        if line.repeated {
            output.push_str(" (*)");
        }
        output.push('\n');
    }
    output
}

pub fn format_merge_report(report: &MergeReport) -> String {
    format!(
        "Merged '{}' into '{}'\n  edges re-pointed: {}\n  edges dropped: {}\n  \
         content moved: {}\n  normalizations redirected: {}\n",
        report.merged_name,
        report.tag.name,
        report.edges_repointed,
        report.edges_dropped,
        report.content_moved,
        report.normalizations_redirected
    )
}

pub fn format_sweep_report(report: &SweepReport) -> String {
    if report.sets == 0 {
        return "No duplicates found\n".to_string();
    }

    let mut output = format!(
        "Found {} duplicate set(s), merged {} tag(s)\n",
        report.sets, report.merged
    );
    for group in &report.groups {
        output.push_str(&format!(
            "  {} <- {} tag(s)\n",
            group.primary_name,
            group.merged.len()
        ));
    }
    for failure in &report.failures {
        output.push_str(&format!("  failed '{}': {}\n", failure.key, failure.error));
    }
    output
}

pub fn format_normalization(record: &TagNormalization) -> String {
    let mut output = format!(
        "#{:<5} {} -> {} [{}] confidence {:.2} ({})",
        record.id.0,
        record.original_name,
        record.normalized_name,
        record.review_status,
        record.confidence_score,
        record.source
    );
    if let Some(tag) = record.approved_tag_id {
        output.push_str(&format!(" tag #{}", tag));
    }
    if record.auto_approved {
        output.push_str(" auto");
    }
    if let Some(notes) = &record.admin_notes {
        output.push_str(&format!(" notes: {}", notes));
    }
    output
}

pub fn format_normalization_list(records: &[TagNormalization]) -> String {
    if records.is_empty() {
        return "No normalizations found".to_string();
    }

    let mut output = String::new();
    for record in records {
        output.push_str(&format_normalization(record));
        output.push('\n');
    }
    output
}

pub fn format_bulk_report(report: &BulkReport) -> String {
    let mut output = String::new();
    for record in &report.succeeded {
        output.push_str(&format_normalization(record));
        output.push('\n');
    }
    for failure in &report.failed {
        output.push_str(&format!("failed #{}: {}\n", failure.id, failure.error));
    }
    output
}

pub fn format_content(item: &ContentItem) -> String {
    format!("#{:<5} {}", item.id.0, item.title)
}
