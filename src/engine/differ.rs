//! Plan and summary display

use colored::{ColoredString, Colorize};
use declarative::{Change, DiffSummary, ExecuteSummary, ResourceDiff, group_by_type};

/// Display order of resource types, with their headings
const SECTIONS: [(&str, &str); 5] = [
    ("group", "Connection groups"),
    ("connection", "Connections"),
    ("sharing_profile", "Sharing profiles"),
    ("user", "Users"),
    ("permission", "Permissions"),
];

fn symbol(change: Change) -> ColoredString {
    match change {
        Change::Create => change.symbol().green(),
        Change::Delete => change.symbol().red(),
        Change::Update => change.symbol().yellow(),
        Change::Unchanged => change.symbol().dimmed(),
    }
}

fn state_desc(diff: &ResourceDiff) -> String {
    match (diff.change, diff.detail.as_deref()) {
        (Change::Create, _) => "(will create)".to_string(),
        (Change::Delete, _) => "(will remove)".to_string(),
        (_, Some(detail)) if !detail.is_empty() => detail.to_string(),
        _ => String::new(),
    }
}

/// Display the planned changes grouped by resource type
pub fn display_plan(diffs: &[ResourceDiff]) {
    let changes: Vec<ResourceDiff> = diffs
        .iter()
        .filter(|d| d.change.is_change())
        .cloned()
        .collect();
    if changes.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    let by_type = group_by_type(&changes);
    let mut types: Vec<&str> = by_type.keys().map(String::as_str).collect();
    types.sort_by_key(|t| {
        SECTIONS
            .iter()
            .position(|(name, _)| name == t)
            .unwrap_or(SECTIONS.len())
    });

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Reconciliation Plan".bold()
    );
    println!("│");

    for resource_type in types {
        let heading = SECTIONS
            .iter()
            .find(|(name, _)| *name == resource_type)
            .map_or(resource_type, |(_, heading)| *heading);
        println!("│ {}", heading.bold());

        for diff in &by_type[resource_type] {
            println!(
                "│   {} {:<30} {}",
                symbol(diff.change),
                diff.resource_id,
                state_desc(diff).dimmed()
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(&changes);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Plan: {} to create, {} to change, {} to remove",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Print the final summary of a run
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Reconciliation complete!", "✓".green().bold());
    } else {
        println!("  {} Reconciliation finished with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if summary.no_change > 0 {
        println!("    • {} resources unchanged", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
