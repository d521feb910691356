//! Handler for `carton tree`.

use miette::Result;

use carton_ops::ops_tree::{self, TreeOptions};

pub async fn exec(depth: Option<usize>, why: Option<String>, jobs: Option<usize>) -> Result<()> {
    let project_root = super::project_root()?;
    let opts = TreeOptions { depth, why, jobs };
    ops_tree::tree(&project_root, &opts).await
}
