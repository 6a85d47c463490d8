use bilicache_config::{Existing, InputMode, NamingOverrides, Overrides, TranscoderOverrides};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert Bilibili mobile download caches into audio files", long_about = None)]
pub struct Cli {
    /// Cache directory to scan (the client's `download` folder, or any folder above entries)
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Directory the audio files are written to [default: output_mp3]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of entries converted at once [default: 1]
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Keep output files that already exist
    #[arg(long, conflicts_with = "overwrite")]
    pub skip_existing: bool,

    /// Replace output files that already exist (the default)
    #[arg(long)]
    pub overwrite: bool,

    /// FFmpeg executable to use instead of the one on the PATH
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Seconds before a single conversion is abandoned [default: 600]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output name template, e.g. "{{ page }}. {{ part }}" [default: "{{ name }}"]
    #[arg(long, value_name = "TEMPLATE")]
    pub template: Option<String>,

    /// How fragments are handed to FFmpeg [default: pipe]
    #[arg(long, value_enum)]
    pub input_mode: Option<InputModeArg>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Less output (-q warnings only, -qq errors only)
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputModeArg {
    /// Stream through stdin
    Pipe,
    /// Write a temporary file FFmpeg can seek in
    Tempfile,
}
impl From<InputModeArg> for InputMode {
    fn from(arg: InputModeArg) -> Self {
        match arg {
            InputModeArg::Pipe => Self::Pipe,
            InputModeArg::Tempfile => Self::Tempfile,
        }
    }
}

impl Cli {
    /// Configuration values given on the command line.
    pub fn overrides(&self) -> Overrides {
        let existing = match (self.skip_existing, self.overwrite) {
            (true, _) => Some(Existing::Skip),
            (_, true) => Some(Existing::Overwrite),
            _ => None,
        };
        Overrides {
            output: self.output.clone(),
            jobs: self.jobs,
            existing,
            naming: NamingOverrides { template: self.template.clone() },
            transcoder: TranscoderOverrides {
                program: self.ffmpeg.clone(),
                timeout: self.timeout,
                input: self.input_mode.map(Into::into),
            },
        }
    }

    /// Verbosity relative to the default level; negative is quieter.
    pub fn verbosity(&self) -> i8 {
        i8::try_from(self.verbose).unwrap_or(i8::MAX).saturating_sub(i8::try_from(self.quiet).unwrap_or(i8::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_command() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["bilicache"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("."));
        assert_eq!(cli.overrides(), Overrides::default());
        assert_eq!(cli.verbosity(), 0);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "bilicache",
            "/sdcard/Android/data/tv.danmaku.bili/download",
            "-o",
            "music",
            "-j",
            "4",
            "--skip-existing",
            "--ffmpeg",
            "/opt/ffmpeg/bin/ffmpeg",
            "--timeout",
            "30",
            "--template",
            "{{ part }}",
            "--input-mode",
            "tempfile",
        ])
        .unwrap();
        let expected = Overrides {
            output: Some("music".into()),
            jobs: Some(4),
            existing: Some(Existing::Skip),
            naming: NamingOverrides { template: Some("{{ part }}".into()) },
            transcoder: TranscoderOverrides {
                program: Some("/opt/ffmpeg/bin/ffmpeg".into()),
                timeout: Some(30),
                input: Some(InputMode::Tempfile),
            },
        };
        assert_eq!(cli.overrides(), expected);
    }

    #[rstest]
    #[case(&["bilicache", "-vv"], 2)]
    #[case(&["bilicache", "-q"], -1)]
    #[case(&["bilicache", "-qq"], -2)]
    fn test_verbosity(#[case] args: &[&str], #[case] expected: i8) {
        assert_eq!(Cli::try_parse_from(args).unwrap().verbosity(), expected);
    }

    #[rstest]
    #[case(&["bilicache", "--skip-existing", "--overwrite"])]
    #[case(&["bilicache", "-v", "-q"])]
    #[case(&["bilicache", "--input-mode", "socket"])]
    fn test_rejected(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
