use std::io::BufRead;
use std::path::{Path, PathBuf};

use smithy::config::{Settings, CONFIG_FILE};
use smithy::error::Result;
use smithy::pipeline::{Driver, Mode};

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Builds the site in <input> into <output>.
        cmd anvil {
            /// The site root, holding the configuration file.
            required input: PathBuf
            /// Where the generated site is written.
            required output: PathBuf
            /// Keep running and rebuild on every line read from stdin.
            optional -w, --watch
            /// The configuration file; `<input>/config.toml` by default.
            optional -c, --config config: PathBuf
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let flags = flags::Anvil::from_env_or_exit();
    if let Err(e) = run(flags) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn settings(input: &Path, config: Option<PathBuf>) -> Result<Settings> {
    let path = config.unwrap_or_else(|| input.join(CONFIG_FILE));
    let settings = if path.exists() {
        Settings::load(&path)?
    } else {
        log::warn!("{} not found; using the default configuration", path.display());
        Settings::default()
    };

    Ok(settings.rebase(input))
}

fn run(flags: flags::Anvil) -> Result<()> {
    smithy::markdown::warm_up();

    let settings = settings(&flags.input, flags.config)?;
    let driver = Driver::for_site(&settings, &flags.output)?;
    if !flags.watch {
        driver.build(Mode::OneShot)?;
        return Ok(());
    }

    driver.build(Mode::Watch)?;
    log::info!("press enter to rebuild, ctrl-d to stop");
    for line in std::io::stdin().lock().lines() {
        line?;
        driver.build(Mode::Watch)?;
    }

    Ok(())
}
