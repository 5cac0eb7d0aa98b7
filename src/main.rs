use std::fs::File;
use std::io::BufReader;

use anyhow::{self, format_err, Context};
use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

use bandsym::drivers::band_analysis::BandAnalysisDriver;
use bandsym::drivers::BandSymDriver;
use bandsym::interfaces::cli::{log_heading, Cli};
use bandsym::interfaces::input::{Input, WavefunctionSourceKind};
use bandsym::io::{write_bandsym_yaml, BandsymFileType};

/// Configures the loggers: debug information goes to the console, the main
/// program output goes to the `bandsym-output` logger, echoed to the console
/// and optionally to an `.out` file.
fn setup_logging(cli: &Cli) -> Result<(), anyhow::Error> {
    let level = if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{m}{n}")))
        .build();
    let mut config_builder =
        Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));
    let mut output_logger = Logger::builder().appender("stdout");

    if let Some(output) = &cli.output {
        let mut path = output.clone();
        path.set_extension("out");
        let outfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{m}{n}")))
            .append(false)
            .build(path)
            .map_err(|err| format_err!("Cannot open the output file: {err}."))?;
        config_builder =
            config_builder.appender(Appender::builder().build("outfile", Box::new(outfile)));
        output_logger = output_logger.appender("outfile");
    }

    let config = config_builder
        .logger(output_logger.additive(false).build("bandsym-output", LevelFilter::Info))
        .build(Root::builder().appender("stdout").build(level))
        .map_err(|err| format_err!("Cannot configure the loggers: {err}."))?;
    log4rs::init_config(config).map_err(|err| format_err!("Cannot initialise logging: {err}."))?;
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    setup_logging(&cli)?;
    log_heading();

    let reader = BufReader::new(
        File::open(&cli.config)
            .with_context(|| format!("Cannot open `{}`", cli.config.display()))?,
    );
    let input: Input = serde_yaml::from_reader(reader)
        .with_context(|| format!("Cannot parse `{}`", cli.config.display()))?;

    let space_group = input.resolve_space_group()?;
    let WavefunctionSourceKind::Binaries(source) = input.source;

    let mut driver = BandAnalysisDriver::builder()
        .parameters(input.analysis)
        .source(source)
        .space_group(space_group)
        .build()
        .map_err(|err| format_err!("{err}"))?;
    driver.run()?;

    if let Some(output) = &cli.output {
        write_bandsym_yaml(driver.result()?, output, BandsymFileType::Res)?;
    }
    Ok(())
}
