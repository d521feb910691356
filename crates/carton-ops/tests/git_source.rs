//! Exercises `GitSource` against throwaway local repositories. Skipped when
//! no `git` binary is available.

use std::path::Path;
use std::sync::Arc;

use carton_core::cartfile::Cartfile;
use carton_core::project::{GitUrl, ProjectIdentifier};
use carton_core::version::PinnedVersion;
use carton_ops::git_source::GitSource;
use carton_resolver::resolver::Resolver;
use carton_resolver::source::ProjectSource;
use carton_util::process::CommandBuilder;

fn git_available() -> bool {
    CommandBuilder::new("git").arg("--version").exec_stdout().is_ok()
}

fn git(dir: &Path, args: &[&str]) -> String {
    CommandBuilder::new("git")
        .arg("-C")
        .arg(dir.to_string_lossy())
        .args(["-c", "user.name=Carton", "-c", "user.email=carton@example.com"])
        .args(args.iter().copied())
        .exec_stdout()
        .unwrap()
}

/// Create a repository at `dir` whose `main` branch gets one commit per
/// `(tag, Cartfile)` pair. `None` removes the Cartfile for that commit.
fn make_repo(dir: &Path, commits: &[(&str, Option<&str>)]) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "--quiet"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    for &(tag, cartfile) in commits {
        match cartfile {
            Some(text) => std::fs::write(dir.join("Cartfile"), text).unwrap(),
            None => {
                let _ = std::fs::remove_file(dir.join("Cartfile"));
            }
        }
        std::fs::write(dir.join("VERSION"), tag).unwrap();
        git(dir, &["add", "--all"]);
        git(dir, &["commit", "--quiet", "-m", tag]);
        git(dir, &["tag", tag]);
    }
}

fn file_project(dir: &Path) -> ProjectIdentifier {
    ProjectIdentifier::Git(GitUrl::new(format!("file://{}", dir.display())))
}

#[tokio::test]
async fn lists_tags_reads_manifests_and_resolves_references() {
    if !git_available() {
        return;
    }
    let tmp = tempfile::TempDir::new().unwrap();
    let repo = tmp.path().join("upstream");
    make_repo(
        &repo,
        &[("1.0.0", Some("github \"org/Leaf\" ~> 1.0\n")), ("2.0.0", None)],
    );
    let project = file_project(&repo);
    let source = GitSource::new(tmp.path().join("cache"));

    let tags = source.list_versions(&project).await.unwrap();
    assert_eq!(tags, vec![PinnedVersion::new("1.0.0"), PinnedVersion::new("2.0.0")]);

    let at_one = source
        .fetch_manifest(&project, &PinnedVersion::new("1.0.0"))
        .await
        .unwrap();
    assert_eq!(at_one.len(), 1);

    let at_two = source
        .fetch_manifest(&project, &PinnedVersion::new("2.0.0"))
        .await
        .unwrap();
    assert!(at_two.is_empty());

    let head = git(&repo, &["rev-parse", "main"]);
    let pinned = source.resolve_reference(&project, "main").await.unwrap();
    assert_eq!(pinned.as_str(), head.trim());
    assert_eq!(pinned.as_str().len(), 40);

    assert!(source.resolve_reference(&project, "nope").await.is_err());
    assert!(source.mirror_path(&project).is_dir());
}

#[tokio::test]
async fn resolves_local_repositories_end_to_end() {
    if !git_available() {
        return;
    }
    let tmp = tempfile::TempDir::new().unwrap();
    let leaf = tmp.path().join("Leaf");
    make_repo(&leaf, &[("1.0.0", None), ("1.2.0", None), ("2.0.0", None)]);

    let app_dep = tmp.path().join("Core");
    let leaf_line = format!("git \"file://{}\" ~> 1.0\n", leaf.display());
    make_repo(&app_dep, &[("0.9.0", Some(leaf_line.as_str()))]);

    let root = Cartfile::parse(&format!("git \"file://{}\"\n", app_dep.display())).unwrap();
    let source = GitSource::new(tmp.path().join("cache"));
    let resolution = Resolver::new(Arc::new(source))
        .with_jobs(2)
        .resolve(&root)
        .await
        .unwrap();

    let resolved = resolution.resolved;
    assert_eq!(resolved.len(), 2);
    assert_eq!(
        resolved.version_of(&file_project(&app_dep)),
        Some(&PinnedVersion::new("0.9.0"))
    );
    assert_eq!(
        resolved.version_of(&file_project(&leaf)),
        Some(&PinnedVersion::new("1.2.0"))
    );
}
