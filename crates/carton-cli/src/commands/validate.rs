//! Handler for `carton validate`.

use miette::Result;

use carton_ops::ops_validate;

pub fn exec() -> Result<()> {
    let project_root = super::project_root()?;
    ops_validate::validate(&project_root)?;
    Ok(())
}
