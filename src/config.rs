use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::preload::PreloadConfig;

const APP_DIR: &str = "tooncast";
const LOCAL_RC: &str = ".tooncastrc";

/// Flags that can be stored as defaults in an rc file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub perf: bool,
    pub render_debug_log: Option<PathBuf>,
    pub ahead: Option<usize>,
    pub behind: Option<usize>,
    pub max_concurrent: Option<usize>,
    pub cache_capacity: Option<usize>,
}

impl ConfigFlags {
    /// Merge two flag sets; `other` wins for valued options.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            perf: self.perf || other.perf,
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
            ahead: other.ahead.or(self.ahead),
            behind: other.behind.or(self.behind),
            max_concurrent: other.max_concurrent.or(self.max_concurrent),
            cache_capacity: other.cache_capacity.or(self.cache_capacity),
        }
    }

    /// Preload tuning with unset values left at their defaults.
    pub fn preload_config(&self) -> PreloadConfig {
        let defaults = PreloadConfig::default();
        PreloadConfig {
            ahead: self.ahead.unwrap_or(defaults.ahead),
            behind: self.behind.unwrap_or(defaults.behind),
            max_concurrent: self.max_concurrent.unwrap_or(defaults.max_concurrent).max(1),
            capacity: self.cache_capacity.unwrap_or(defaults.capacity),
        }
    }
}

/// Platform configuration directory for this application.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Some(PathBuf::from(appdata).join(APP_DIR));
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join(APP_DIR),
            );
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg).join(APP_DIR));
        }
        if let Some(home) = std::env::var_os("HOME") {
            return Some(PathBuf::from(home).join(".config").join(APP_DIR));
        }
    }

    None
}

pub fn global_config_path() -> PathBuf {
    config_dir().map_or_else(local_override_path, |dir| dir.join("config"))
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(LOCAL_RC)
}

/// Where persisted viewer settings live.
pub fn state_path() -> PathBuf {
    config_dir().map_or_else(
        || PathBuf::from(".tooncast-state.json"),
        |dir| dir.join("state.json"),
    )
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# tooncast defaults (saved with --save)".to_string()];
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    for (name, value) in [
        ("--ahead", flags.ahead),
        ("--behind", flags.behind),
        ("--max-concurrent", flags.max_concurrent),
        ("--cache-capacity", flags.cache_capacity),
    ] {
        if let Some(value) = value {
            lines.push(format!("{name} {value}"));
        }
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick known flags out of a token list, skipping anything else.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };
        match name {
            "--watch" => flags.watch = true,
            "--perf" => flags.perf = true,
            "--render-debug-log" | "--ahead" | "--behind" | "--max-concurrent"
            | "--cache-capacity" => {
                let value = match inline {
                    Some(value) => Some(value),
                    None => {
                        let next = tokens.get(i + 1).map(String::as_str);
                        if next.is_some() {
                            i += 1;
                        }
                        next
                    }
                };
                if let Some(value) = value {
                    apply_valued(&mut flags, name, value);
                }
            }
            _ => {}
        }
        i += 1;
    }
    flags
}

fn apply_valued(flags: &mut ConfigFlags, name: &str, value: &str) {
    if name == "--render-debug-log" {
        flags.render_debug_log = Some(PathBuf::from(value));
        return;
    }
    let Ok(count) = value.parse::<usize>() else {
        return;
    };
    match name {
        "--ahead" => flags.ahead = Some(count),
        "--behind" => flags.behind = Some(count),
        "--max-concurrent" => flags.max_concurrent = Some(count),
        "--cache-capacity" => flags.cache_capacity = Some(count),
        _ => {}
    }
}
