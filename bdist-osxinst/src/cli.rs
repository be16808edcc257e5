// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{interpreter::probe_interpreter, setup_py::SetupPyStaging},
    anyhow::{Context, Result},
    clap::{value_parser, Arg, ArgAction, ArgMatches, Command},
    log::{info, LevelFilter},
    osxinst::{
        builder::{ensure_host_platform, BuildLayout, InstallerBuilder},
        config::InstallerConfig,
        settings::{ProductSettings, SettingsOverrides},
        tools::ProcessRunner,
    },
    std::path::{Path, PathBuf},
};

const ABOUT: &str = "\
Create a macOS installer package for a Python distribution.

The SOURCE_DIR argument is the directory containing the distribution's
setup.py. The distribution is built and installed into a temporary stage
directory using the given Python interpreter. Every top-level Python
package then becomes its own component of the installer so users can see
what gets installed. Top-level modules and data files share one
component and so do scripts.

The installer refuses to install on volumes lacking the python.org build
of the interpreter's Python version.

Titles and descriptions of components can be defined in a TOML config
file. Its \":globals:\" section may define title, welcome, readme,
license and arch. The \":scripts:\" and \":mods:\" sections and sections
named after top-level packages may define title and description.

The commands used to create the packages are written to a mkpkg.sh
script stored next to the product package.
";

fn command() -> Command {
    Command::new("bdist-osxinst")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Create a macOS installer package for a Python distribution")
        .long_about(ABOUT)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Increase logging verbosity. Can be specified multiple times."),
        )
        .arg(
            Arg::new("source_dir")
                .value_name("SOURCE_DIR")
                .value_parser(value_parser!(PathBuf))
                .default_value(".")
                .help("Directory containing setup.py"),
        )
        .arg(
            Arg::new("python")
                .long("python")
                .value_name("EXE")
                .value_parser(value_parser!(PathBuf))
                .default_value("python3")
                .help("Python interpreter to build and install the distribution with"),
        )
        .arg(
            Arg::new("title")
                .long("title")
                .short('t')
                .help("Title to display inside the installer instead of the default"),
        )
        .arg(
            Arg::new("welcome")
                .long("welcome")
                .short('w')
                .value_parser(value_parser!(PathBuf))
                .help("Welcome file that should be displayed during installation"),
        )
        .arg(
            Arg::new("readme")
                .long("readme")
                .short('r')
                .value_parser(value_parser!(PathBuf))
                .help("Readme file that should be displayed during installation"),
        )
        .arg(
            Arg::new("license")
                .long("license")
                .short('l')
                .value_parser(value_parser!(PathBuf))
                .help("License file that should be displayed during installation"),
        )
        .arg(
            Arg::new("dist_dir")
                .long("dist-dir")
                .short('d')
                .value_parser(value_parser!(PathBuf))
                .help("Directory to put the final installer package in [default: SOURCE_DIR/dist]"),
        )
        .arg(
            Arg::new("bdist_dir")
                .long("bdist-dir")
                .value_parser(value_parser!(PathBuf))
                .help("Temporary directory for creating the package [default: SOURCE_DIR/build/bdist.<platform>/osxinst]"),
        )
        .arg(
            Arg::new("skip_build")
                .long("skip-build")
                .action(ArgAction::SetTrue)
                .help("Skip rebuilding everything (for testing/debugging)"),
        )
        .arg(
            Arg::new("keep_temp")
                .long("keep-temp")
                .short('k')
                .action(ArgAction::SetTrue)
                .help("Keep the temporary directory after creating the package"),
        )
        .arg(
            Arg::new("config_file")
                .long("config-file")
                .short('c')
                .value_parser(value_parser!(PathBuf))
                .help("TOML config file describing packages"),
        )
        .arg(
            Arg::new("config_str")
                .long("config-str")
                .help("TOML config given as a string"),
        )
        .arg(
            Arg::new("arch")
                .long("arch")
                .help("Required host architectures (default derived from CFLAGS). Only used when the distribution contains extension modules"),
        )
        .arg(
            Arg::new("single_lib_pkg")
                .long("single-lib-pkg")
                .action(ArgAction::SetTrue)
                .help("Only create one package for all Python packages and modules"),
        )
        .arg(
            Arg::new("id_prefix")
                .long("id-prefix")
                .help("Prefix of package identifiers (default derived from the distribution URL)"),
        )
}

fn absolute_path(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Load configuration; values of `--config-file` replace `--config-str` ones.
fn config_from_matches(matches: &ArgMatches) -> Result<InstallerConfig> {
    let mut config = InstallerConfig::default();

    if let Some(s) = matches.get_one::<String>("config_str") {
        config.merge(InstallerConfig::from_toml(s).context("parsing --config-str")?);
    }

    if let Some(path) = matches.get_one::<PathBuf>("config_file") {
        config.merge(
            InstallerConfig::from_path(path)
                .with_context(|| format!("reading config file {}", path.display()))?,
        );
    }

    Ok(config)
}

fn overrides_from_matches(matches: &ArgMatches, cwd: &Path) -> SettingsOverrides {
    let path = |name: &str| {
        matches
            .get_one::<PathBuf>(name)
            .map(|p| absolute_path(cwd, p))
    };

    SettingsOverrides {
        title: matches.get_one::<String>("title").cloned(),
        welcome: path("welcome"),
        readme: path("readme"),
        license: path("license"),
        arch: matches.get_one::<String>("arch").cloned(),
        id_prefix: matches.get_one::<String>("id_prefix").cloned(),
        single_lib_pkg: matches.get_flag("single_lib_pkg"),
        keep_temp: matches.get_flag("keep_temp"),
    }
}

fn init_logging(matches: &ArgMatches) {
    let log_level = match matches.get_count("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();
}

pub fn run_cli() -> Result<()> {
    let matches = command().get_matches();

    init_logging(&matches);

    ensure_host_platform()?;

    let cwd = std::env::current_dir().context("resolving current directory")?;
    let source_dir = absolute_path(
        &cwd,
        matches
            .get_one::<PathBuf>("source_dir")
            .map(|p| p.as_path())
            .unwrap_or_else(|| Path::new(".")),
    );
    let python = matches
        .get_one::<PathBuf>("python")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("python3"));

    let config = config_from_matches(&matches)?;

    let interpreter = probe_interpreter(&python)?;
    let target = interpreter.target();

    let staging = SetupPyStaging::new(&python, &source_dir);
    let metadata = staging.metadata()?;

    let settings = ProductSettings::resolve(
        overrides_from_matches(&matches, &cwd),
        &config,
        &metadata,
        &target,
    );
    // Documents named by the config file are relative to the source directory.
    let settings = ProductSettings {
        welcome: settings.welcome.map(|p| source_dir.join(p)),
        readme: settings.readme.map(|p| source_dir.join(p)),
        license: settings.license.map(|p| source_dir.join(p)),
        ..settings
    };

    let bdist_dir = match matches.get_one::<PathBuf>("bdist_dir") {
        Some(p) => absolute_path(&cwd, p),
        None => source_dir
            .join("build")
            .join(format!("bdist.{}", target.platform))
            .join("osxinst"),
    };
    let dist_dir = match matches.get_one::<PathBuf>("dist_dir") {
        Some(p) => absolute_path(&cwd, p),
        None => source_dir.join("dist"),
    };

    let layout = BuildLayout::new(bdist_dir, dist_dir);

    let staged = staging.stage(
        &layout.stage_dir,
        &interpreter,
        matches.get_flag("skip_build"),
    )?;

    let runner = ProcessRunner;
    let product = InstallerBuilder::new(&metadata, &config, &settings, &target, &runner)
        .build(&layout, &staged)
        .context("building installer package")?;

    info!(
        "{} components; reproduce with {}",
        product.packages.len(),
        product.script_path.display()
    );
    println!("{}", product.archive_path.display());

    Ok(())
}
