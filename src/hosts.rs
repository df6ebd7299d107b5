//! The managed section of the hosts file.
//!
//! Everything before [`START_MARKER`] is preserved as-is.  The marker,
//! every line after it and the [`END_MARKER`] belong to us and are
//! regenerated from the registry on each render.  An empty registry
//! removes the section and both markers.
//!
//! The file is handled as raw bytes: preserved lines need not be UTF-8.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::fs;

use crate::error::{HosterError, Result};
use crate::types::Registry;

pub const START_MARKER: &str = "#-----------Docker-Hoster-Domains----------";
pub const END_MARKER: &str = "#-----Do-not-add-hosts-after-this-line-----";

/// Suffix of the sibling file written before the atomic rename.
const AUX_SUFFIX: &str = ".aux";

#[derive(Debug)]
pub struct HostsFile {
    path: PathBuf,
}

impl HostsFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn aux_path(&self) -> PathBuf {
        let mut aux = self.path.clone().into_os_string();
        aux.push(AUX_SUFFIX);
        PathBuf::from(aux)
    }

    /// Rewrite the managed section so it mirrors `registry`.
    ///
    /// The new content goes to a sibling file that is then renamed over
    /// the target, so readers see either the old or the new file and a
    /// failed write leaves the target untouched.
    pub async fn render(&self, registry: &Registry) -> Result<()> {
        if registry.is_empty() {
            info!("Removing all hosts entries from {}", self.path.display());
        } else {
            info!(
                "Updating {} with {} container(s)",
                self.path.display(),
                registry.len()
            );
            for record in registry.values().flatten() {
                debug!(
                    "{} ip: {} domains: {:?}",
                    record.owner_name, record.ip, record.aliases
                );
            }
        }

        let current = fs::read(&self.path)
            .await
            .map_err(|source| self.io_error("read", source))?;
        let content = render_content(&current, registry);

        let aux = self.aux_path();
        fs::write(&aux, content)
            .await
            .map_err(|source| HosterError::HostsFile {
                action: "write",
                path: aux.clone(),
                source,
            })?;
        fs::rename(&aux, &self.path)
            .await
            .map_err(|source| self.io_error("replace", source))?;
        Ok(())
    }

    fn io_error(&self, action: &'static str, source: std::io::Error) -> HosterError {
        HosterError::HostsFile {
            action,
            path: self.path.clone(),
            source,
        }
    }
}

/// Produce the new file content from the current one.
///
/// The preserved prefix keeps its lines byte for byte, minus trailing
/// blank lines, and every kept line ends with a newline.  A non-empty
/// registry is always preceded by one blank separator line.
pub fn render_content(current: &[u8], registry: &Registry) -> Vec<u8> {
    let mut lines: Vec<&[u8]> = current.split(|&b| b == b'\n').collect();

    if let Some(pos) = lines.iter().position(|line| is_marker(line, START_MARKER)) {
        lines.truncate(pos);
    }
    while lines
        .last()
        .is_some_and(|line| line.iter().all(u8::is_ascii_whitespace))
    {
        lines.pop();
    }

    let mut out = Vec::with_capacity(current.len());
    for line in &lines {
        out.extend_from_slice(line);
        out.push(b'\n');
    }

    if registry.is_empty() {
        return out;
    }

    out.push(b'\n');
    let _ = writeln!(out, "{START_MARKER}");
    for record in registry.values().flatten() {
        let domains: Vec<&str> = record.aliases.iter().map(String::as_str).collect();
        let _ = writeln!(out, "{}    {}", record.ip, domains.join("   "));
    }
    let _ = writeln!(out, "{END_MARKER}");
    out
}

/// Recover the `(ip, names)` pairs written to the managed section.
pub fn parse_managed_section(content: &str) -> Vec<(String, BTreeSet<String>)> {
    content
        .lines()
        .skip_while(|line| !is_marker(line.as_bytes(), START_MARKER))
        .skip(1)
        .take_while(|line| !is_marker(line.as_bytes(), END_MARKER))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let ip = fields.next()?;
            Some((ip.to_string(), fields.map(str::to_string).collect()))
        })
        .collect()
}

fn is_marker(line: &[u8], marker: &str) -> bool {
    line.strip_suffix(b"\r").unwrap_or(line) == marker.as_bytes()
}
