//! Compilation database module - `compile_commands.json` from a make dry run
//!
//! `make -n <keyboard>:<keymap>` prints, for every translation unit, a
//! `printf "Compiling: <file>"` banner followed by the recipe that wraps the
//! real compiler call in `LOG=$(<command> && ...`. Pairing the two gives one
//! clang compilation database entry per file.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"printf "Compiling: ([^"]+)"#).expect("valid regex"));
static CMD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"LOG=\$\((.+?)&&").expect("valid regex"));

/// Flags GCC accepts for ARM but clang tooling chokes on.
const DROPPED_FLAGS: &[&str] = &["-mno-thumb-interwork"];

/// One entry of a clang JSON compilation database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRecord {
    pub directory: String,
    pub command: String,
    pub file: String,
}

/// Looks up (and remembers) the system include directories of compilers.
#[derive(Debug, Default)]
pub struct SystemIncludes {
    cache: HashMap<String, Vec<PathBuf>>,
}

impl SystemIncludes {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<prefix>/*/include` for the toolchain prefix `binary` lives in.
    ///
    /// Unknown binaries yield no directories.
    pub fn lookup(&mut self, binary: &str) -> Vec<PathBuf> {
        self.cache
            .entry(binary.to_string())
            .or_insert_with(|| find_system_includes(binary))
            .clone()
    }
}

fn find_system_includes(binary: &str) -> Vec<PathBuf> {
    let Ok(path) = which::which(binary) else {
        return Vec::new();
    };
    let resolved = path.canonicalize().unwrap_or(path);
    let Some(prefix) = resolved.parent().and_then(Path::parent) else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(prefix) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().join("include"))
        .filter(|include| include.is_dir())
        .collect();
    dirs.sort();
    dirs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Cmd,
}

/// Parse `make -n` output into compilation database records.
///
/// `directory` is recorded as the working directory of every command;
/// `includes` maps a compiler binary to extra `-I` directories.
pub fn parse_make_n<R, F>(reader: R, directory: &Path, mut includes: F) -> Result<Vec<CompileRecord>>
where
    R: BufRead,
    F: FnMut(&str) -> Vec<PathBuf>,
{
    let directory = directory.display().to_string();
    let mut state = State::Start;
    let mut this_file = String::new();
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read make output")?;

        if state == State::Start {
            if let Some(caps) = FILE_RE.captures(&line) {
                this_file = caps[1].to_string();
                state = State::Cmd;
            }
        }

        if state == State::Cmd {
            if let Some(caps) = CMD_RE.captures(&line) {
                let mut args = shlex::split(&caps[1])
                    .with_context(|| format!("Unbalanced quoting in make output line {}", idx + 1))?;

                if let Some(compiler) = args.first().cloned() {
                    args.extend(
                        includes(&compiler)
                            .into_iter()
                            .map(|dir| format!("-I{}", dir.display())),
                    );
                }

                let kept: Vec<&str> = args
                    .iter()
                    .map(String::as_str)
                    .filter(|arg| !DROPPED_FLAGS.contains(arg))
                    .collect();
                let command = shlex::try_join(kept.iter().copied())
                    .with_context(|| format!("Cannot quote command for {}", this_file))?;

                records.push(CompileRecord {
                    directory: directory.clone(),
                    command,
                    file: std::mem::take(&mut this_file),
                });
                state = State::Start;
            }
        }
    }

    Ok(records)
}

/// Write `records` as a 4-space indented JSON array.
pub fn write(path: &Path, records: &[CompileRecord]) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records
        .serialize(&mut ser)
        .context("Failed to serialize compilation database")?;

    std::fs::write(path, buf).context(format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DRY_RUN: &str = r#"
mkdir -p .build/obj_pad_default
printf "Compiling: keyboards/pad/pad.c" | awk '{ printf "%-99s", $0; }'
LOG=$(avr-gcc -c -mmcu=atmega32u4 -DTAP_DANCE_ENABLE -Os keyboards/pad/pad.c -o .build/pad.o && mv -f .build/pad.td .build/pad.d 2>&1) ; if [ -n "$LOG" ]; then echo ok; fi
printf "Compiling: quantum/quantum.c" | awk '{ printf "%-99s", $0; }'
echo unrelated
LOG=$(arm-none-eabi-gcc -c -mno-thumb-interwork -I"lib/my dir" quantum/quantum.c -o .build/quantum.o && true 2>&1)
LOG=$(orphan-gcc -c stray.c && true 2>&1)
"#;

    fn parse(includes: impl FnMut(&str) -> Vec<PathBuf>) -> Vec<CompileRecord> {
        parse_make_n(Cursor::new(DRY_RUN), Path::new("/fw"), includes).unwrap()
    }

    #[test]
    fn pairs_banners_with_commands() {
        let records = parse(|_| Vec::new());
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].file, "keyboards/pad/pad.c");
        assert_eq!(records[0].directory, "/fw");
        assert_eq!(
            records[0].command,
            "avr-gcc -c '-mmcu=atmega32u4' -DTAP_DANCE_ENABLE -Os keyboards/pad/pad.c -o .build/pad.o"
        );
        assert_eq!(
            shlex::split(&records[0].command).unwrap(),
            vec![
                "avr-gcc",
                "-c",
                "-mmcu=atmega32u4",
                "-DTAP_DANCE_ENABLE",
                "-Os",
                "keyboards/pad/pad.c",
                "-o",
                ".build/pad.o"
            ]
        );
        assert_eq!(records[1].file, "quantum/quantum.c");
    }

    #[test]
    fn drops_interwork_and_requotes() {
        let records = parse(|_| Vec::new());
        let cmd = &records[1].command;
        assert!(!cmd.contains("-mno-thumb-interwork"));
        assert!(cmd.starts_with("arm-none-eabi-gcc -c "));
        assert!(cmd.contains("my dir"));
    }

    #[test]
    fn appends_system_includes() {
        let mut seen = Vec::new();
        let records = parse(|bin| {
            seen.push(bin.to_string());
            vec![PathBuf::from(format!("/opt/{bin}/include"))]
        });

        assert_eq!(seen, vec!["avr-gcc", "arm-none-eabi-gcc"]);
        assert!(records[0].command.ends_with("-I/opt/avr-gcc/include"));
    }

    #[test]
    fn empty_output_has_no_records() {
        let records = parse_make_n(Cursor::new(""), Path::new("/fw"), |_| Vec::new()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn unknown_compiler_has_no_includes() {
        let mut includes = SystemIncludes::new();
        assert!(includes.lookup("definitely-not-a-compiler-xyz").is_empty());
    }

    #[test]
    fn writes_four_space_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compile_commands.json");
        let records = vec![CompileRecord {
            directory: "/fw".into(),
            command: "cc -c a.c".into(),
            file: "a.c".into(),
        }];

        write(&path, &records).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n        \"directory\": \"/fw\""));

        let back: Vec<CompileRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, records);
    }
}
