//! Output renderers.
//!
//! A renderer turns a validated [`Graph`] into a set of named files.
//! [`write`] puts them in place all at once: the whole set is staged in a
//! scratch directory next to the destination and swapped in only after
//! every file was written.

pub mod ifcfg;
pub mod layout;
pub mod netplan;
pub mod networkd;

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use field_rules::Value;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, warn};

use crate::graph::Graph;

pub use ifcfg::IfcfgRenderer;
pub use layout::LayoutRenderer;
pub use netplan::NetplanRenderer;
pub use networkd::NetworkdRenderer;

/// File name to file contents.
pub type RenderedFiles = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode {file}: {source}")]
    Encode {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("cannot render {name}: {reason}")]
    Interface { name: String, reason: String },
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to restore {dest}, previous output kept in {saved}: {source}")]
    Restore {
        dest: PathBuf,
        saved: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub trait Renderer {
    /// Match devices by hardware address instead of by name.
    fn bind_physical_addressing(&mut self);

    fn render(&self, graph: &Graph) -> Result<RenderedFiles, RenderError>;
}

/// Render `graph` and replace the directory `dest` with the result.
///
/// `-` prints the files to stdout instead. Nothing at `dest` changes unless
/// rendering and staging both succeed.
pub fn write(renderer: &dyn Renderer, graph: &Graph, dest: &Path) -> Result<(), RenderError> {
    let files = renderer.render(graph)?;
    if dest == Path::new("-") {
        let mut out = io::stdout().lock();
        for (name, contents) in &files {
            if files.len() > 1 {
                writeln!(out, "# {name}").map_err(io_err(Path::new("<stdout>")))?;
            }
            out.write_all(contents.as_bytes())
                .map_err(io_err(Path::new("<stdout>")))?;
        }
        return Ok(());
    }

    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_err(parent))?;
    let staging = tempfile::Builder::new()
        .prefix(".netlayout-")
        .tempdir_in(parent)
        .map_err(io_err(parent))?;

    let fresh = staging.path().join("new");
    fs::create_dir(&fresh).map_err(io_err(&fresh))?;
    for (name, contents) in &files {
        let path = fresh.join(name);
        fs::write(&path, contents).map_err(io_err(&path))?;
    }

    swap_into_place(staging, dest, |from, to| fs::rename(from, to))?;
    info!(dest = %dest.display(), files = files.len(), "wrote rendered output");
    Ok(())
}

/// Move `staging/new` to `dest`, parking any previous `dest` in
/// `staging/old` until the move succeeded.
///
/// If the new tree cannot be moved in and the old one cannot be moved back,
/// the staging directory is kept on disk and the error names where the
/// previous output now lives.
fn swap_into_place(
    staging: TempDir,
    dest: &Path,
    rename: impl Fn(&Path, &Path) -> io::Result<()>,
) -> Result<(), RenderError> {
    let fresh = staging.path().join("new");
    let old = staging.path().join("old");
    let had_old = dest.exists();
    if had_old {
        rename(dest, &old).map_err(io_err(dest))?;
    }
    let Err(source) = rename(&fresh, dest) else {
        return Ok(());
    };
    if had_old {
        if let Err(restore) = rename(&old, dest) {
            let saved = staging.keep().join("old");
            warn!(dest = %dest.display(), saved = %saved.display(), "previous output could not be restored");
            return Err(RenderError::Restore {
                dest: dest.to_path_buf(),
                saved,
                source: restore,
            });
        }
    }
    Err(RenderError::Io {
        path: dest.to_path_buf(),
        source,
    })
}

/// A parameter value as plain text; lists are joined with `sep`.
pub(crate) fn flat_value(value: &Value, sep: &str) -> String {
    match value {
        Value::List(items) => items
            .iter()
            .map(|item| flat_value(item, sep))
            .collect::<Vec<_>>()
            .join(sep),
        other => other.to_string(),
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> RenderError {
    let path = path.to_path_buf();
    move |source| RenderError::Io { path, source }
}
