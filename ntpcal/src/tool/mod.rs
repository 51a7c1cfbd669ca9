mod config;
mod tracing;

use std::{
    io::Write,
    num::ParseIntError,
    path::PathBuf,
    process::ExitCode,
    str::FromStr,
};

use ntp_calendar::{
    encode, resolve, Calendar, NtpSeconds, ReferenceClock, ReferenceConfig, Weekday,
};
use serde::Serialize;
use tracing_subscriber::util::SubscriberInitExt;

use self::{
    config::{Config, ConfigError, Format, NtpCalAction, NtpCalOptions},
    tracing::LogLevel,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn main() -> std::io::Result<ExitCode> {
    let options = match NtpCalOptions::try_parse_from(std::env::args()) {
        Ok(options) => options,
        Err(msg) => return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg)),
    };

    match options.action {
        NtpCalAction::Help => {
            println!("{}", config::long_help_message());
            Ok(ExitCode::SUCCESS)
        }
        NtpCalAction::Version => {
            eprintln!("ntpcal {VERSION}");
            Ok(ExitCode::SUCCESS)
        }
        NtpCalAction::Validate => validate(options.config).await,
        NtpCalAction::Decode | NtpCalAction::Encode => {
            let config = match initialize_logging_parse_config(
                options.log_level,
                options.config,
                options.reference,
            )
            .await
            {
                Ok(config) => config,
                Err(e) => {
                    // print to stderr because tracing is not yet setup
                    eprintln!("There was an error loading the config: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            };

            let mut stdout = std::io::stdout().lock();
            let all_converted = if options.action == NtpCalAction::Decode {
                let clock = config.reference.to_clock();
                decode_inputs(&clock, &options.inputs, options.format, &mut stdout)?
            } else {
                encode_inputs(&options.inputs, options.format, &mut stdout)?
            };

            Ok(if all_converted {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

// initializes the logger so that logs during config parsing are reported. Then it overrides the
// log level based on the config if required.
async fn initialize_logging_parse_config(
    initial_log_level: Option<LogLevel>,
    config_path: Option<PathBuf>,
    reference: Option<ReferenceConfig>,
) -> Result<Config, ConfigError> {
    let mut log_level = initial_log_level.unwrap_or_default();

    let config = {
        let _guard =
            ::tracing::subscriber::set_default(self::tracing::tracing_init(log_level, true));
        Config::from_args(config_path, reference).await?
    };

    if let Some(config_log_level) = config.observability.log_level {
        if initial_log_level.is_none() {
            log_level = config_log_level;
        }
    }

    // set a default global subscriber from now on
    self::tracing::tracing_init(log_level, config.observability.ansi_colors).init();

    Ok(config)
}

async fn validate(config: Option<PathBuf>) -> std::io::Result<ExitCode> {
    self::tracing::tracing_init(LogLevel::Info, true).init();
    match Config::from_args(config, None).await {
        Ok(config) => {
            match config.reference {
                ReferenceConfig::System => ::tracing::info!("reference: system clock"),
                ReferenceConfig::Fixed { time } => {
                    ::tracing::info!("reference: fixed at {time} seconds since 1900")
                }
            }
            eprintln!("Config looks good");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: Could not load configuration: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[derive(Debug, Serialize)]
struct DecodedTimestamp {
    wire: u32,
    seconds: NtpSeconds,
    era: i64,
    weekday: Option<Weekday>,
    calendar: Calendar,
}

#[derive(Debug, Serialize)]
struct EncodedTimestamp {
    calendar: Calendar,
    wire: u32,
}

fn parse_wire(input: &str) -> Result<u32, ParseIntError> {
    match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    }
}

fn write_json(out: &mut impl Write, value: &impl Serialize) -> std::io::Result<bool> {
    match serde_json::to_string(value) {
        Ok(line) => {
            writeln!(out, "{line}")?;
            Ok(true)
        }
        Err(e) => {
            eprintln!("Failed to encode json: {e}");
            Ok(false)
        }
    }
}

/// Decode every input against a single snapshot of `clock`, so one batch
/// never straddles two references. Returns whether all inputs were valid.
fn decode_inputs(
    clock: &impl ReferenceClock,
    inputs: &[String],
    format: Format,
    out: &mut impl Write,
) -> std::io::Result<bool> {
    let now = clock.now();
    let mut all_valid = true;

    for input in inputs {
        let wire = match parse_wire(input) {
            Ok(wire) => wire,
            Err(e) => {
                eprintln!("Invalid timestamp {input:?}: {e}");
                all_valid = false;
                continue;
            }
        };

        let seconds = resolve(wire, now);
        let calendar = match Calendar::from_ntp_seconds(seconds) {
            Ok(calendar) => calendar,
            Err(e) => {
                eprintln!("Could not decode {wire}: {e}");
                all_valid = false;
                continue;
            }
        };

        match format {
            Format::Plain => writeln!(out, "{wire} -> {calendar}")?,
            Format::Json => {
                let decoded = DecodedTimestamp {
                    wire,
                    seconds,
                    era: seconds.era(),
                    weekday: calendar.weekday().ok(),
                    calendar,
                };
                all_valid &= write_json(out, &decoded)?;
            }
        }
    }

    Ok(all_valid)
}

fn encode_inputs(
    inputs: &[String],
    format: Format,
    out: &mut impl Write,
) -> std::io::Result<bool> {
    let mut all_valid = true;

    for input in inputs {
        let result = Calendar::from_str(input)
            .and_then(|calendar| encode(&calendar).map(|wire| (calendar, wire)));
        let (calendar, wire) = match result {
            Ok(encoded) => encoded,
            Err(e) => {
                eprintln!("Invalid date {input:?}: {e}");
                all_valid = false;
                continue;
            }
        };

        match format {
            Format::Plain => writeln!(out, "{calendar} -> {wire}")?,
            Format::Json => {
                all_valid &= write_json(out, &EncodedTimestamp { calendar, wire })?;
            }
        }
    }

    Ok(all_valid)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use ntp_calendar::FixedReference;

    use super::*;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn at_unix_epoch() -> FixedReference {
        FixedReference::new(NtpSeconds::from_unix_seconds(0))
    }

    fn inputs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_wire() {
        assert_eq!(parse_wire("3485080800"), Ok(3_485_080_800));
        assert_eq!(parse_wire("0xffffffff"), Ok(u32::MAX));
        assert_eq!(parse_wire("0XCFB8F5E0"), Ok(0xcfb8_f5e0));
        assert!(parse_wire("4294967296").is_err());
        assert!(parse_wire("-1").is_err());
        assert!(parse_wire("0x").is_err());
    }

    #[test]
    fn test_decode_plain() {
        let mut out = Vec::new();
        let ok = decode_inputs(
            &at_unix_epoch(),
            &inputs(&["3485080800", "0xffffffff", "0"]),
            Format::Plain,
            &mut out,
        )
        .unwrap();

        assert!(ok);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "3485080800 -> 2010-06-09 (160) 14:00:00\n\
             4294967295 -> 2036-02-07 (38) 06:28:15\n\
             0 -> 2036-02-07 (38) 06:28:16\n"
        );
    }

    #[test]
    fn test_decode_json() {
        let mut out = Vec::new();
        let ok = decode_inputs(&at_unix_epoch(), &inputs(&["0"]), Format::Json, &mut out).unwrap();
        assert!(ok);

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["wire"], 0);
        assert_eq!(value["seconds"], 1i64 << 32);
        assert_eq!(value["era"], 1);
        assert_eq!(value["weekday"], "Thursday");
        assert_eq!(value["calendar"]["year"], 2036);
        assert_eq!(value["calendar"]["yearday"], 38);
        assert_eq!(value["calendar"]["second"], 16);
    }

    #[test]
    fn test_decode_resolves_each_input_once() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(::tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        ::tracing::subscriber::with_default(subscriber, || {
            let mut out = Vec::new();
            let ok = decode_inputs(
                &at_unix_epoch(),
                &inputs(&["0", "3485080800"]),
                Format::Json,
                &mut out,
            )
            .unwrap();
            assert!(ok);
        });

        let logs = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logs.matches("resolved ntp era").count(), 2);
    }

    #[test]
    fn test_decode_reports_invalid_input() {
        let mut out = Vec::new();
        let ok = decode_inputs(
            &at_unix_epoch(),
            &inputs(&["noon", "0"]),
            Format::Plain,
            &mut out,
        )
        .unwrap();

        assert!(!ok);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0 -> 2036-02-07 (38) 06:28:16\n"
        );
    }

    #[test]
    fn test_encode() {
        let mut out = Vec::new();
        let ok = encode_inputs(
            &inputs(&["2036-02-07 06:28:16", "2010-06-09T14:00:00"]),
            Format::Plain,
            &mut out,
        )
        .unwrap();

        assert!(ok);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2036-02-07 (38) 06:28:16 -> 0\n\
             2010-06-09 (160) 14:00:00 -> 3485080800\n"
        );

        let mut out = Vec::new();
        let ok = encode_inputs(&inputs(&["1970-01-01 00:00:00"]), Format::Json, &mut out).unwrap();
        assert!(ok);
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["wire"], 2_208_988_800u32);
        assert_eq!(value["calendar"]["month"], 1);
    }

    #[test]
    fn test_encode_reports_invalid_input() {
        let mut out = Vec::new();
        let ok = encode_inputs(
            &inputs(&["2021-02-30 00:00:00", "2021-03-01 00:00:60", "soon"]),
            Format::Plain,
            &mut out,
        )
        .unwrap();

        assert!(!ok);
        assert!(out.is_empty());
    }
}
