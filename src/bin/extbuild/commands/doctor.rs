//! `extbuild doctor` command

use anyhow::Result;

use crate::cli::{DoctorArgs, MessageFormat};
use crate::commands::{load_package_config, package_root, registry};
use extbuild::ops::{doctor, format_report};

pub fn execute(args: DoctorArgs, verbose: bool) -> Result<()> {
    let root = package_root(args.root)?;
    let config = load_package_config(&root);
    let report = doctor(&registry(&config));

    match args.message_format {
        MessageFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        MessageFormat::Human => print!("{}", format_report(&report, verbose)),
    }

    Ok(())
}
