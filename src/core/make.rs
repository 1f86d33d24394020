//! Make module - Command lines for the firmware's make based build
//!
//! The firmware tree is built with `make <keyboard>:<keymap>[:<target>]` from
//! its root. Tongs passes the resolved configuration as `KEY=value`
//! overrides so the build sees exactly what was validated.

use std::path::{Path, PathBuf};

use super::config::env_vars;
use super::descriptor::BuildConfiguration;

/// Name of the make executable to run.
///
/// `$MAKE` wins; BSDs and macOS ship a BSD make, so GNU make is used as
/// `gmake` there when it is installed.
pub fn make_program() -> String {
    if let Ok(make) = std::env::var(env_vars::MAKE) {
        if !make.trim().is_empty() {
            return make;
        }
    }

    let bsd_like = cfg!(any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    ));
    if bsd_like && which::which("gmake").is_ok() {
        return "gmake".to_string();
    }

    "make".to_string()
}

/// One make invocation against the firmware tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeCommand {
    pub program: String,
    pub root: PathBuf,
    pub keyboard: String,
    pub keymap: String,
    pub target: Option<String>,
    pub jobs: Option<usize>,
    pub dry_run: bool,
    pub vars: Vec<(String, String)>,
}

impl MakeCommand {
    pub fn new(root: &Path, keyboard: &str, keymap: &str) -> Self {
        Self {
            program: make_program(),
            root: root.to_path_buf(),
            keyboard: keyboard.to_string(),
            keymap: keymap.to_string(),
            target: None,
            jobs: None,
            dry_run: false,
            vars: Vec::new(),
        }
    }

    /// Extra make target after the keymap, e.g. `flash`.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs.max(1));
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Pass every rules variable of `config` on the command line.
    pub fn with_config(mut self, config: &BuildConfiguration) -> Self {
        self.vars.extend(config.make_vars());
        self
    }

    /// `<keyboard>:<keymap>[:<target>]`
    pub fn goal(&self) -> String {
        match &self.target {
            Some(target) => format!("{}:{}:{}", self.keyboard, self.keymap, target),
            None => format!("{}:{}", self.keyboard, self.keymap),
        }
    }

    /// Arguments after the program name.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-print-directory".to_string(),
            "-r".to_string(),
            "-R".to_string(),
            "-C".to_string(),
            self.root.display().to_string(),
        ];

        if let Some(jobs) = self.jobs {
            args.push("-j".to_string());
            args.push(jobs.to_string());
        }

        if self.dry_run {
            args.push("-n".to_string());
        }

        args.push(self.goal());
        args.extend(self.vars.iter().map(|(k, v)| format!("{}={}", k, v)));
        args
    }

    /// Arguments for `make clean` in the same tree.
    pub fn clean_args(&self) -> Vec<String> {
        vec![
            "-C".to_string(),
            self.root.display().to_string(),
            "clean".to_string(),
        ]
    }

    /// Shell-quoted command line, for display.
    pub fn command_line(&self) -> String {
        let mut words = vec![self.program.clone()];
        words.extend(self.args());
        shlex::try_join(words.iter().map(String::as_str)).unwrap_or_else(|_| words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor;

    fn command() -> MakeCommand {
        let mut cmd = MakeCommand::new(Path::new("/fw"), "handwired/pad", "default");
        cmd.program = "make".to_string();
        cmd
    }

    #[test]
    fn plain_build_args() {
        assert_eq!(
            command().args(),
            vec!["--no-print-directory", "-r", "-R", "-C", "/fw", "handwired/pad:default"]
        );
    }

    #[test]
    fn dry_run_with_jobs_and_target() {
        let args = command().jobs(4).dry_run(true).target("flash").args();
        assert_eq!(
            &args[5..],
            &["-j", "4", "-n", "handwired/pad:default:flash"]
        );
    }

    #[test]
    fn zero_jobs_means_one() {
        assert_eq!(command().jobs(0).jobs, Some(1));
    }

    #[test]
    fn config_becomes_variables() {
        let config = descriptor::load("IS_MACROPAD = yes\nTAP_DANCE_ENABLE = yes\n").unwrap();
        let args = command().with_config(&config).args();
        assert_eq!(
            &args[6..],
            &[
                "IS_MACROPAD=yes",
                "MCU=atmega32u4",
                "BOOTLOADER=atmel-dfu",
                "TAP_DANCE_ENABLE=yes"
            ]
        );
    }

    #[test]
    fn command_line_quotes_spaces() {
        let mut cmd = command();
        cmd.root = PathBuf::from("/my fw");
        let line = cmd.command_line();
        assert!(line.contains("my fw"));
        assert!(!line.contains(" /my fw "));
        assert_eq!(cmd.clean_args(), vec!["-C", "/my fw", "clean"]);
    }
}
