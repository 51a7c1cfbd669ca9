use std::{
    fmt::Display,
    io::{self, ErrorKind},
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    str::FromStr,
};

use ntp_calendar::{Calendar, ReferenceConfig};
use serde::Deserialize;
use tokio::fs::read_to_string;
use tracing::{info, warn};

use super::tracing::LogLevel;

const USAGE_MSG: &str = "\
usage: ntpcal decode [-r DATE] [-f FORMAT] [-c PATH] [-l LOG_LEVEL] WIRE...
       ntpcal encode [-f FORMAT] [-c PATH] [-l LOG_LEVEL] DATE...
       ntpcal validate [-c PATH]
       ntpcal -h | ntpcal -v";

const DESCRIPTOR: &str = "ntpcal - convert between NTP timestamps and calendar dates";

const HELP_MSG: &str = "Options:
  -r, --reference=DATE                 resolve eras relative to DATE instead of the configured reference
  -f, --format=FORMAT                  which format to use for printing results [plain, json]
  -c, --config=PATH                    change the config .toml file
  -l, --log-level=LOG_LEVEL            change the log level
  -h, --help                           display this help text
  -v, --version                        display version information

WIRE is a 32-bit NTP seconds value, in decimal or with a 0x prefix.
DATE is written as YYYY-MM-DD HH:MM:SS or YYYY-MM-DDTHH:MM:SS.";

pub const GLOBAL_CONFIG_PATH: &str = "/etc/ntpcal/ntpcal.toml";

pub fn long_help_message() -> String {
    format!("{DESCRIPTOR}\n\n{USAGE_MSG}\n\n{HELP_MSG}")
}

pub enum CliArg {
    Flag(String),
    Argument(String, String),
    Rest(Vec<String>),
}

impl CliArg {
    pub fn normalize_arguments<I>(
        takes_argument: &[&str],
        takes_argument_short: &[char],
        iter: I,
    ) -> Result<Vec<Self>, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut arg_iter = iter.into_iter().skip(1);
        let mut processed = vec![];
        let mut rest = vec![];

        while let Some(arg) = arg_iter.next() {
            match arg.as_str() {
                "--" => {
                    rest.extend(arg_iter);
                    break;
                }
                long_arg if long_arg.starts_with("--") => {
                    let invalid = Err(format!("invalid option: '{long_arg}'"));

                    if let Some((key, value)) = long_arg.split_once('=') {
                        if takes_argument.contains(&key) {
                            processed.push(CliArg::Argument(key.to_string(), value.to_string()))
                        } else {
                            invalid?
                        }
                    } else if takes_argument.contains(&long_arg) {
                        if let Some(next) = arg_iter.next() {
                            processed.push(CliArg::Argument(long_arg.to_string(), next))
                        } else {
                            Err(format!("'{}' expects an argument", &long_arg))?;
                        }
                    } else {
                        processed.push(CliArg::Flag(arg));
                    }
                }
                short_arg if short_arg.starts_with('-') && short_arg.len() > 1 => {
                    // -fjson, -hv
                    let flags = short_arg.trim_start_matches('-');
                    let offset = short_arg.len() - flags.len();
                    for (i, char) in flags.char_indices() {
                        let flag = format!("-{char}");
                        if takes_argument_short.contains(&char) {
                            let rest = short_arg[offset + i + char.len_utf8()..]
                                .trim()
                                .to_string();
                            if rest.starts_with('=') {
                                Err("invalid option '='")?;
                            }
                            if !rest.is_empty() {
                                processed.push(CliArg::Argument(flag, rest));
                            } else if let Some(next) = arg_iter.next() {
                                processed.push(CliArg::Argument(flag, next));
                            } else {
                                Err(format!("'-{}' expects an argument", char))?;
                            }
                            break;
                        } else {
                            processed.push(CliArg::Flag(flag));
                        }
                    }
                }
                _argument => rest.push(arg),
            }
        }

        if !rest.is_empty() {
            processed.push(CliArg::Rest(rest));
        }

        Ok(processed)
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Format {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum NtpCalAction {
    #[default]
    Help,
    Version,
    Decode,
    Encode,
    Validate,
}

#[derive(Debug, Default)]
pub(crate) struct NtpCalOptions {
    /// Path of the configuration file
    pub config: Option<PathBuf>,
    /// Level for messages to display in logs
    pub log_level: Option<LogLevel>,
    /// Reference time overriding the configured one
    pub reference: Option<ReferenceConfig>,
    pub format: Format,
    /// Wire values or dates, depending on the command
    pub inputs: Vec<String>,
    help: bool,
    version: bool,
    command: Option<NtpCalAction>,
    pub action: NtpCalAction,
}

impl NtpCalOptions {
    const TAKES_ARGUMENT: &'static [&'static str] =
        &["--config", "--log-level", "--format", "--reference"];
    const TAKES_ARGUMENT_SHORT: &'static [char] = &['c', 'l', 'f', 'r'];

    /// Parse `ntpcal` arguments, the first item being the program name.
    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str> + Clone,
    {
        let mut options = NtpCalOptions::default();
        let arg_iter = CliArg::normalize_arguments(
            Self::TAKES_ARGUMENT,
            Self::TAKES_ARGUMENT_SHORT,
            iter.into_iter().map(|x| x.as_ref().to_string()),
        )?
        .into_iter()
        .peekable();

        for arg in arg_iter {
            match arg {
                CliArg::Flag(flag) => match flag.as_str() {
                    "-h" | "--help" => {
                        options.help = true;
                    }
                    "-v" | "--version" => {
                        options.version = true;
                    }
                    option => {
                        Err(format!("invalid option provided: {option}"))?;
                    }
                },
                CliArg::Argument(option, value) => match option.as_str() {
                    "-c" | "--config" => {
                        options.config = Some(PathBuf::from(value));
                    }
                    "-l" | "--log-level" => match LogLevel::from_str(&value) {
                        Ok(level) => options.log_level = Some(level),
                        Err(e) => return Err(e.to_string()),
                    },
                    "-f" | "--format" => match value.as_str() {
                        "plain" => options.format = Format::Plain,
                        "json" => options.format = Format::Json,
                        _ => Err(format!("invalid format option provided: {value}"))?,
                    },
                    "-r" | "--reference" => {
                        match Calendar::from_str(&value).and_then(|c| c.to_ntp_seconds()) {
                            Ok(time) => options.reference = Some(ReferenceConfig::Fixed { time }),
                            Err(e) => return Err(format!("invalid reference time: {e}")),
                        }
                    }
                    option => {
                        Err(format!("invalid option provided: {option}"))?;
                    }
                },
                CliArg::Rest(rest) => {
                    let mut rest = rest.into_iter();
                    if let Some(command) = rest.next() {
                        options.command = Some(match command.as_str() {
                            "decode" => NtpCalAction::Decode,
                            "encode" => NtpCalAction::Encode,
                            "validate" => NtpCalAction::Validate,
                            unknown => return Err(format!("unknown command: {unknown}")),
                        });
                    }
                    options.inputs.extend(rest);
                }
            }
        }

        options.resolve_action();

        if matches!(options.action, NtpCalAction::Decode | NtpCalAction::Encode)
            && options.inputs.is_empty()
        {
            return Err("nothing to convert".into());
        }

        Ok(options)
    }

    fn resolve_action(&mut self) {
        if self.help {
            self.action = NtpCalAction::Help;
        } else if self.version {
            self.action = NtpCalAction::Version;
        } else {
            self.action = self.command.take().unwrap_or_default();
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub log_level: Option<LogLevel>,
    #[serde(default = "default_ansi_colors")]
    pub ansi_colors: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: Default::default(),
            ansi_colors: default_ansi_colors(),
        }
    }
}

const fn default_ansi_colors() -> bool {
    true
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    async fn from_file(file: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let meta = std::fs::metadata(&file)?;
        let perm = meta.permissions();

        if perm.mode() as libc::mode_t & libc::S_IWOTH != 0 {
            warn!(path = ?file.as_ref(), "config file is writable by anyone");
        }

        let contents = read_to_string(file).await?;
        Ok(toml::de::from_str(&contents)?)
    }

    async fn from_first_file(file: Option<impl AsRef<Path>>) -> Result<Config, ConfigError> {
        if let Some(f) = file {
            let path: &Path = f.as_ref();
            info!(?path, "using config file");
            return Config::from_file(f).await;
        }

        // an unreadable global file is not an error, defaults apply
        let global_path = Path::new(GLOBAL_CONFIG_PATH);
        if global_path.exists() {
            info!(path = ?global_path, "using config file");
            match Config::from_file(global_path).await {
                Err(ConfigError::Io(e)) if e.kind() == ErrorKind::PermissionDenied => {
                    warn!(path = ?global_path, "cannot read config file, using defaults");
                }
                other => {
                    return other;
                }
            }
        }

        Ok(Config::default())
    }

    pub async fn from_args(
        file: Option<impl AsRef<Path>>,
        reference: Option<ReferenceConfig>,
    ) -> Result<Config, ConfigError> {
        let mut config = Config::from_first_file(file.as_ref()).await?;

        if let Some(reference) = reference {
            if config.reference != ReferenceConfig::System {
                info!("overriding reference from configuration");
            }
            config.reference = reference;
        }

        Ok(config)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Toml(toml::de::Error),
}

impl std::error::Error for ConfigError {}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "could not read config file: {e}"),
            Self::Toml(e) => write!(f, "invalid config file: {e}"),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Toml(value)
    }
}
