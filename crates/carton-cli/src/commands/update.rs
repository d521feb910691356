//! Handler for `carton update`.

use miette::Result;

use carton_ops::ops_update::{self, UpdateOptions};

pub async fn exec(dry_run: bool, jobs: Option<usize>) -> Result<()> {
    let project_root = super::project_root()?;
    let opts = UpdateOptions { dry_run, jobs };
    ops_update::update(&project_root, &opts).await
}
