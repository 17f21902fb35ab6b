//! `extbuild build` command

use anyhow::Result;

use crate::cli::{BuildArgs, MessageFormat};
use crate::commands::{descriptors, load_package_config, package_root, registry};
use extbuild::core::CancellationToken;
use extbuild::ops::{build_extensions, with_detected_runtime, BuildOptions, ExtensionsReport};
use extbuild::util::SystemRunner;

pub fn execute(args: BuildArgs, verbose: bool) -> Result<()> {
    let root = package_root(args.root)?;
    let config = load_package_config(&root);

    // CLI flags override configuration
    let mut build_config = config
        .to_build_config(&root)
        .with_build_args(args.build_args)
        .with_clean_first(args.clean_first || config.build.clean_first.unwrap_or(false))
        .with_verbose(verbose || config.build.verbose.unwrap_or(false));
    if args.jobs.is_some() {
        build_config = build_config.with_parallel(args.jobs);
    }
    if args.keep_going {
        build_config = build_config.with_stop_on_failure(false);
    }
    if let Some(dest) = args.dest {
        build_config = build_config.with_dest_path(root.join(dest));
    }
    if let Some(lib_dir) = args.lib_dir {
        build_config = build_config.with_lib_dir(root.join(lib_dir));
    }
    if let Some(ruby) = args.ruby {
        build_config = build_config.with_runtime_path(ruby);
    }
    if let Some(version) = args.ruby_version {
        build_config = build_config.with_runtime_version(version);
    }
    if let Some(engine) = args.engine {
        build_config = build_config.with_runtime_engine(engine);
    }
    if build_config.runtime_version.is_none() {
        build_config = with_detected_runtime(&SystemRunner, build_config);
    }

    let targets = descriptors(&root, args.descriptors);
    let options = BuildOptions {
        install: !args.no_install,
    };
    let report = build_extensions(
        &registry(&config),
        &build_config,
        &targets,
        &CancellationToken::new(),
        &options,
    );

    match args.message_format {
        MessageFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        MessageFormat::Human => print_human(&report, verbose),
    }

    match report.first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn print_human(report: &ExtensionsReport, verbose: bool) {
    for extension in &report.extensions {
        let adapter = extension.adapter.as_deref().unwrap_or("-");
        if extension.success {
            eprintln!("       Built {} ({})", extension.descriptor.display(), adapter);
        } else {
            eprintln!("      Failed {} ({})", extension.descriptor.display(), adapter);
        }

        if verbose {
            for line in &extension.output {
                eprintln!("             {}", line);
            }
        }
        for path in &extension.installed {
            eprintln!("   Installed {}", path);
        }
        if !extension.missing_dependencies.is_empty() {
            eprintln!(
                "     Missing {}",
                extension.missing_dependencies.join(", ")
            );
        }
    }
}
