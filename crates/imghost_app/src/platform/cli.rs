use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use super::config::DEFAULT_CONFIG_FILENAME;

#[derive(Debug, Parser)]
#[command(name = "imghost", about = "Upload images into a GitHub repository", version)]
pub struct Cli {
    /// Image files to upload
    pub files: Vec<PathBuf>,

    /// Repository folder to upload into (defaults to the configured folder)
    #[arg(long, value_name = "DIR")]
    pub target: Option<String>,

    /// Number of simultaneous uploads
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Settings file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Where log records go
    #[arg(long, value_enum, default_value_t = LogTarget::Both)]
    pub log_to: LogTarget,

    /// Log file used by `--log-to file` and `--log-to both`
    #[arg(long, value_name = "PATH", default_value = "imghost.log")]
    pub log_file: PathBuf,

    /// Log debug records
    #[arg(short, long)]
    pub verbose: bool,

    /// List the folders under the configured root and exit
    #[arg(long, conflicts_with_all = ["files", "mkdir"])]
    pub list_dirs: bool,

    /// Create a folder in the repository and exit
    #[arg(long, value_name = "PATH", conflicts_with = "files")]
    pub mkdir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_upload_invocation() {
        let cli = Cli::try_parse_from([
            "imghost", "--target", "images/2024", "--threads", "3", "a.png", "b.jpg",
        ])
        .unwrap();

        assert_eq!(cli.files, vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")]);
        assert_eq!(cli.target.as_deref(), Some("images/2024"));
        assert_eq!(cli.threads, Some(3));
        assert_eq!(cli.log_to, LogTarget::Both);
        assert_eq!(cli.config, PathBuf::from("imghost.ron"));
    }

    #[test]
    fn list_dirs_excludes_files() {
        assert!(Cli::try_parse_from(["imghost", "--list-dirs", "a.png"]).is_err());
    }
}
