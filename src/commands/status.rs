use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use guacamole::{Backend, HttpBackend, ROOT_IDENTIFIER};

use crate::Context;
use crate::config::Settings;
use crate::engine::{CurrentTree, Walker};
use crate::resource::{Entity, Kind};
use crate::ui;

pub fn run(ctx: &Context, config: Option<&str>, only: &[String]) -> Result<()> {
    let settings = Settings::load(config)?;
    settings.validate()?;
    let backend = HttpBackend::new(&settings.url, &settings.data_source, settings.token.clone());

    ui::header("Guacamole Status");
    ui::kv("Server", &settings.url);
    ui::kv("Data source", &settings.data_source);

    show_counts(&backend)?;

    let tree = Walker::new(&backend)
        .walk(ROOT_IDENTIFIER)
        .context("Could not walk the connection tree")?;
    show_top_level(&tree, only, ctx.verbose > 0);

    println!();
    Ok(())
}

fn show_counts(backend: &dyn Backend) -> Result<()> {
    ui::section("Objects");

    let groups = backend.list_groups().context("Could not list groups")?;
    let connections = backend
        .list_connections()
        .context("Could not list connections")?;
    let users = backend.list_users().context("Could not list users")?;

    ui::kv("Connection groups", &groups.len().to_string().bold().to_string());
    ui::kv("Connections", &connections.len().to_string().bold().to_string());
    ui::kv("Users", &users.len().to_string().bold().to_string());
    Ok(())
}

/// Root-level groups, restricted to `only` unless it is empty
fn top_level_groups<'a>(tree: &'a CurrentTree, only: &[String]) -> Vec<&'a Entity> {
    let candidates = if only.is_empty() {
        tree.entities().iter().collect()
    } else {
        tree.filter_names(only)
    };
    candidates
        .into_iter()
        .filter(|e| e.kind() == Kind::Group && e.parent().is_root())
        .collect()
}

fn show_top_level(tree: &CurrentTree, only: &[String], detailed: bool) {
    ui::section("Top-level groups");

    let top = top_level_groups(tree, only);
    if top.is_empty() {
        ui::dim("None");
        return;
    }

    for group in top {
        let Some(id) = group.identifier() else {
            continue;
        };
        let (mut connections, mut profiles) = (0, 0);
        for entity in tree.entities() {
            let top_id = entity
                .identifier()
                .and_then(|own| tree.top_level(own))
                .and_then(Entity::identifier);
            if top_id != Some(id) {
                continue;
            }
            match entity.kind() {
                Kind::Connection => connections += 1,
                Kind::SharingProfile => profiles += 1,
                Kind::Group => {}
            }
        }
        let detail = if detailed {
            format!("#{id}, {connections} connections, {profiles} sharing profiles")
        } else {
            format!("{connections} connections")
        };
        ui::kv(group.name(), &detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ConnectionGroup, ParentRef};

    fn group(name: &str, id: &str, parent: ParentRef) -> Entity {
        let mut group = ConnectionGroup::new(name, parent);
        group.identifier = Some(id.to_string());
        Entity::Group(group)
    }

    #[test]
    fn test_top_level_groups_filtered_by_name() {
        let tree = CurrentTree::new(vec![
            group("range-1", "1", ParentRef::Root),
            group("range-2", "2", ParentRef::Root),
            group("range-1", "3", ParentRef::Id("2".to_string())),
        ]);

        let all = top_level_groups(&tree, &[]);
        assert_eq!(all.len(), 2);

        let only = top_level_groups(&tree, &["range-1".to_string()]);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].identifier(), Some("1"));

        assert!(top_level_groups(&tree, &["missing".to_string()]).is_empty());
    }
}
