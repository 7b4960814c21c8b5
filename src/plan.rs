use std::collections::BTreeMap;

use crate::UploadError;
use crate::fileset::FileSet;

/// Nested directory tree keyed by single path segments. A `Leaf` marks a
/// file basename, a `Dir` holds further segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf,
    Dir(BTreeMap<String, Node>),
}

pub type DirTree = BTreeMap<String, Node>;

/// Merge the per-file segment chains of every FileSet entry into one tree.
///
/// A segment that is a file leaf for one entry and a directory prefix for
/// another would name a file and a directory identically on the remote
/// side; that FileSet is rejected up front instead of producing an
/// inconsistent plan.
pub fn build_tree(files: &FileSet) -> Result<DirTree, UploadError> {
    let mut root: DirTree = BTreeMap::new();
    for rel in files.keys() {
        let rel = rel.trim_start_matches('/');
        let segments: Vec<&str> = rel.split('/').filter(|s| !s.is_empty()).collect();
        insert_chain(&mut root, &segments, rel)?;
    }
    Ok(root)
}

fn insert_chain(map: &mut DirTree, segments: &[&str], rel: &str) -> Result<(), UploadError> {
    let Some((head, tail)) = segments.split_first() else {
        return Ok(());
    };
    if tail.is_empty() {
        match map.get(*head) {
            Some(Node::Dir(_)) => return Err(UploadError::ConflictingPath(rel.to_string())),
            _ => {
                map.insert((*head).to_string(), Node::Leaf);
            }
        }
        return Ok(());
    }
    match map.entry((*head).to_string()).or_insert_with(|| Node::Dir(BTreeMap::new())) {
        Node::Leaf => Err(UploadError::ConflictingPath(rel.to_string())),
        Node::Dir(children) => insert_chain(children, tail, rel),
    }
}

/// Compute the mkdir plan for a tree rooted at `destination`.
///
/// A node contributes an entry only when none of its descendants does: the
/// deepest directory of every chain is enough because creation happens with
/// `mkdir -p` semantics, and files sitting directly in the destination root
/// need nothing beyond the root itself. A flat tree therefore falls back to
/// the single-entry plan `[destination]`.
///
/// Plan order across independent subtrees is recursion order, not
/// parent-before-child; callers must create entries with
/// intermediate-directory semantics rather than relying on ordering.
pub fn plan_mkdirs(tree: &DirTree, destination: &str) -> Vec<String> {
    let dest = destination.trim_end_matches('/');
    let dest = if dest.is_empty() { "." } else { dest };
    match collect_subdirs(tree) {
        Some(dirs) => dirs.into_iter().map(|d| format!("{}/{}", dest, d)).collect(),
        None => vec![dest.to_string()],
    }
}

// None 表示该层级之下没有任何目录（全部是文件叶子）
fn collect_subdirs(map: &DirTree) -> Option<Vec<String>> {
    let has_subdirs = map.values().any(|n| matches!(n, Node::Dir(_)));
    if !has_subdirs {
        return None;
    }
    let mut out = Vec::new();
    for (name, node) in map {
        if let Node::Dir(children) = node {
            match collect_subdirs(children) {
                Some(subs) => {
                    out.extend(subs.into_iter().map(|s| format!("{}/{}", name, s)));
                }
                None => out.push(name.clone()),
            }
        }
    }
    Some(out)
}

/// Compose the semicolon-joined remote command line for a plan: one
/// `mkdir -p "<path>"` clause per entry, a single round trip.
pub fn mkdir_command_line(plan: &[String]) -> String {
    plan.iter().map(|dir| format!("mkdir -p \"{}\"", dir)).collect::<Vec<_>>().join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fileset(rels: &[&str]) -> FileSet {
        rels.iter().map(|r| (r.to_string(), PathBuf::from(format!("/abs/{}", r)))).collect()
    }

    #[test]
    fn flat_fileset_falls_back_to_destination_root() {
        let tree = build_tree(&fileset(&["index.html", "app.js"])).unwrap();
        assert_eq!(plan_mkdirs(&tree, "/srv/web"), vec!["/srv/web".to_string()]);
    }

    #[test]
    fn deepest_directory_per_chain_only() {
        let tree = build_tree(&fileset(&["assets/img/logo.png", "assets/app.css"])).unwrap();
        // "assets" 不需要单独的条目，mkdir -p assets/img 会连带创建
        assert_eq!(plan_mkdirs(&tree, "/srv/web"), vec!["/srv/web/assets/img".to_string()]);
    }

    #[test]
    fn shared_prefix_subtrees_merge() {
        let tree =
            build_tree(&fileset(&["a/b/one.txt", "a/c/two.txt", "d/three.txt", "top.txt"]))
                .unwrap();
        let plan = plan_mkdirs(&tree, "/dst");
        assert_eq!(
            plan,
            vec!["/dst/a/b".to_string(), "/dst/a/c".to_string(), "/dst/d".to_string()]
        );
    }

    #[test]
    fn leaf_vs_prefix_collision_rejected() {
        let err = build_tree(&fileset(&["conf", "conf/extra.toml"])).unwrap_err();
        assert!(matches!(err, UploadError::ConflictingPath(_)));
    }

    #[test]
    fn command_line_is_semicolon_joined() {
        let plan = vec!["/dst/a/b".to_string(), "/dst/c".to_string()];
        assert_eq!(mkdir_command_line(&plan), "mkdir -p \"/dst/a/b\";mkdir -p \"/dst/c\"");
        assert_eq!(mkdir_command_line(&plan[..1]), "mkdir -p \"/dst/a/b\"");
    }

    #[test]
    fn tilde_destination_joins_without_leading_slash() {
        let tree = build_tree(&fileset(&["logs/today/x.log"])).unwrap();
        assert_eq!(plan_mkdirs(&tree, "app"), vec!["app/logs/today".to_string()]);
    }
}
