//! Nice BandSym output formatting.

use std::fmt;

use num_complex::Complex;

const BANDSYM_BANNER_LENGTH: usize = 103;

/// Logs an error to the `bandsym-output` logger.
macro_rules! bandsym_error {
    ($fmt:expr $(, $($arg:tt)*)?) => {
        log::error!($fmt, $($($arg)*)?);
        log::error!(target: "bandsym-output", $fmt, $($($arg)*)?);
    }
}

/// Logs a warning to the `bandsym-output` logger.
macro_rules! bandsym_warn {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::warn!(target: "bandsym-output", $fmt, $($($arg)*)?); }
}

/// Logs a main output line to the `bandsym-output` logger.
macro_rules! bandsym_output {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::info!(target: "bandsym-output", $fmt, $($($arg)*)?); }
}

pub(crate) use {bandsym_error, bandsym_output, bandsym_warn};

/// Writes a nicely formatted section title.
pub(crate) fn write_title(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    let length = title.chars().count().max(BANDSYM_BANNER_LENGTH - 6);
    let bar = "─".repeat(length);
    writeln!(f, "┌──{bar}──┐")?;
    writeln!(f, "│§ {title:^length$} §│")?;
    writeln!(f, "└──{bar}──┘")?;
    Ok(())
}

/// Logs a nicely formatted section title to the `bandsym-output` logger.
pub(crate) fn log_title(title: &str) {
    let length = title.chars().count().max(BANDSYM_BANNER_LENGTH - 6);
    let bar = "─".repeat(length);
    bandsym_output!("┌──{bar}──┐");
    bandsym_output!("│§ {title:^length$} §│");
    bandsym_output!("└──{bar}──┘");
}

/// Writes a nicely formatted subtitle.
pub(crate) fn write_subtitle(f: &mut fmt::Formatter<'_>, subtitle: &str) -> fmt::Result {
    let length = subtitle.chars().count();
    let bar = "═".repeat(length);
    writeln!(f, "{subtitle}")?;
    writeln!(f, "{bar}")?;
    Ok(())
}

/// Returns a nicely formatted `true` or `false`.
pub(crate) fn nice_bool(b: bool) -> String {
    if b {
        "yes".to_string()
    } else {
        "no".to_string()
    }
}

/// Formats a complex number compactly with `nd` decimals, suppressing a
/// vanishing real or imaginary part.
pub(crate) fn short_complex(x: Complex<f64>, nd: usize) -> String {
    let eps = 10.0_f64.powi(-(nd as i32));
    if x.im.abs() < eps {
        format!("{:+.nd$}", x.re)
    } else if x.re.abs() < eps {
        format!("{:+.nd$}j", x.im)
    } else {
        format!("{:+.nd$}{:+.nd$}j", x.re, x.im)
    }
}
