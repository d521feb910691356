//! Operation: display the resolved dependency tree.

use std::path::Path;

use carton_resolver::resolver::Resolver;

/// Options for `carton tree`.
#[derive(Debug, Default)]
pub struct TreeOptions {
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    /// Show how the root reaches this project instead of the whole tree.
    pub why: Option<String>,
    /// Override the configured number of concurrent fetches.
    pub jobs: Option<usize>,
}

/// Resolve the project's dependencies and print them as a tree.
pub async fn tree(project_root: &Path, opts: &TreeOptions) -> miette::Result<()> {
    let resolver = crate::git_resolver(project_root, opts.jobs)?;
    print!("{}", render_tree(project_root, &resolver, opts).await?);
    Ok(())
}

/// Resolve and render the tree (or the `why` path) as text.
pub async fn render_tree(
    project_root: &Path,
    resolver: &Resolver,
    opts: &TreeOptions,
) -> miette::Result<String> {
    let root = crate::load_root_manifest(project_root)?;
    let resolution = resolver.resolve(&root).await?;
    let graph = &resolution.graph;

    let Some(ref target) = opts.why else {
        return Ok(graph.print_tree(opts.depth));
    };

    let mut output = String::new();
    match graph.find_path(target) {
        Some(path) => {
            output.push_str(&format!("Path to {target}:\n"));
            for (i, node) in path.iter().enumerate() {
                let indent = "  ".repeat(i);
                output.push_str(&format!("{indent}{node}\n"));
            }
            output.push('\n');
            output.push_str(&graph.print_inverted_tree(target));
        }
        None => output.push_str(&format!("Dependency '{target}' not found in the graph.\n")),
    }
    Ok(output)
}
