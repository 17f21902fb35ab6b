//! `extbuild clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use crate::commands::{descriptors, load_package_config, package_root, registry};
use extbuild::ops::clean_extensions;

pub fn execute(args: CleanArgs) -> Result<()> {
    let root = package_root(args.root)?;
    let config = load_package_config(&root);
    let build_config = config.to_build_config(&root);
    let targets = descriptors(&root, args.descriptors);

    let warnings = clean_extensions(&registry(&config), &build_config, &targets);
    for target in &targets {
        eprintln!("     Cleaned {}", target.display());
    }
    if !warnings.is_empty() {
        eprintln!("warning: {} clean step(s) failed", warnings.len());
    }

    Ok(())
}
