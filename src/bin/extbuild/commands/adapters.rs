//! `extbuild adapters` command

use anyhow::Result;

use crate::cli::AdaptersArgs;
use crate::commands::{load_package_config, package_root, registry};

pub fn execute(args: AdaptersArgs) -> Result<()> {
    let root = package_root(args.root)?;
    let config = load_package_config(&root);

    for adapter in registry(&config).adapters() {
        let tools: Vec<String> = adapter
            .required_tools()
            .into_iter()
            .filter(|tool| !tool.optional)
            .map(|tool| tool.name)
            .collect();
        println!("{:<10} {}", adapter.name(), tools.join(", "));
    }

    Ok(())
}
