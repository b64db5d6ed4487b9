use crate::graph::Graph;

use super::{RenderError, RenderedFiles, Renderer};

pub const LAYOUT_FILE: &str = "layout.yaml";

/// Dumps the compiled graph as YAML.
///
/// The dump always carries both the current and desired hardware
/// addresses, so binding physical addressing changes nothing here.
#[derive(Debug, Default)]
pub struct LayoutRenderer;

impl Renderer for LayoutRenderer {
    fn bind_physical_addressing(&mut self) {}

    fn render(&self, graph: &Graph) -> Result<RenderedFiles, RenderError> {
        let body = serde_yaml::to_string(graph).map_err(|source| RenderError::Encode {
            file: LAYOUT_FILE.to_string(),
            source,
        })?;
        Ok(RenderedFiles::from([(LAYOUT_FILE.to_string(), body)]))
    }
}
