//! Test environment helpers.
//!
//! Live bridge tests read their endpoint from the environment. A
//! repository-root `.env` is loaded first so IDE and CI runs pick it up;
//! variables already set in the process win.

use std::env;
use std::fs;
use std::path::Path;

/// Load `KEY=VALUE` lines from `<repo>/.env` without overriding the process
/// environment. Missing or unreadable files are ignored.
pub fn load_dotenv_if_present() {
    let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    let entries = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), unquote(value.trim())))
        .filter(|(key, _)| !key.is_empty());

    for (key, value) in entries {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }
}

/// Value of `name` after loading `.env`, if set and non-empty.
pub fn var(name: &str) -> Option<String> {
    load_dotenv_if_present();
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|quote| {
            value
                .strip_prefix(*quote)
                .and_then(|rest| rest.strip_suffix(*quote))
        })
        .unwrap_or(value)
}
