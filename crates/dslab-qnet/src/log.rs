//! Logging facilities.
//!
//! The macros accept any value exposing `time()` and `name()`, e.g. [`Node`](crate::Node),
//! [`NodeCore`](crate::node::NodeCore) or [`Model`](crate::Model). Records are emitted with the
//! context name as the log target, so `RUST_LOG=server=trace` narrows the output to a single node.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};

use crate::error::ConfigurationError;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

/// Returns the padded and colored label of a log level.
pub fn level_label(level: log::Level) -> ColoredString {
    let (label, color) = match level {
        log::Level::Error => ("ERROR", Color::Red),
        log::Level::Warn => ("WARN ", Color::Yellow),
        log::Level::Info => ("INFO ", Color::Green),
        log::Level::Debug => ("DEBUG", Color::Blue),
        log::Level::Trace => ("TRACE", Color::Cyan),
    };
    get_colored(label, color)
}

#[doc(hidden)]
#[macro_export]
macro_rules! __qnet_log {
    ($level:expr, $ctx:expr, $msg:expr) => (
        log::log!(
            target: $ctx.name(),
            $level,
            "[{:.3} {} {}] {}",
            $ctx.time(), $crate::log::level_label($level), $ctx.name(), $msg
        )
    );
    ($level:expr, $ctx:expr, $format:expr, $($arg:tt)+) => (
        log::log!(
            target: $ctx.name(),
            $level,
            concat!("[{:.3} {} {}] ", $format),
            $ctx.time(), $crate::log::level_label($level), $ctx.name(), $($arg)+
        )
    );
}

/// Logs a message at the info level.
///
/// # Examples
///
/// ```rust
/// use std::io::Write;
/// use env_logger::Builder;
/// use dslab_qnet::{log_info, Delay, FactoryNode, Model, Network};
///
/// Builder::from_default_env()
///     .format(|buf, record| writeln!(buf, "{}", record.args()))
///     .init();
///
/// let mut network = Network::<()>::new();
/// let source = network.add("source", FactoryNode::new(Delay::constant(1.)).unwrap());
/// let model = Model::new(network, source, 123).unwrap();
/// log_info!(model, "built with {} nodes", model.nodes().count());
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::__qnet_log!(log::Level::Info, $ctx, $($arg)+));
}

/// Logs a message at the debug level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::__qnet_log!(log::Level::Debug, $ctx, $($arg)+));
}

/// Logs a message at the trace level.
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => ($crate::__qnet_log!(log::Level::Trace, $ctx, $($arg)+));
}

/// Logs a message at the warn level.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => ($crate::__qnet_log!(log::Level::Warn, $ctx, $($arg)+));
}

/// Logs a message at the error level.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => ($crate::__qnet_log!(log::Level::Error, $ctx, $($arg)+));
}

/// Logs a configuration problem which is about to be returned as an error.
pub(crate) fn log_config_error(err: &ConfigurationError) {
    log::error!(
        target: "network",
        "[{} network] {}",
        level_label(log::Level::Error),
        err
    );
}
