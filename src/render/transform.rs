//! Per-result XML-to-HTML rendering through an external XSLT processor.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::html::html_escape;
use super::{DOCUMENT_PATH, SIMILAR_PATH};
use crate::soap::ResultItem;

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>"#;
const MAX_STDERR_CHARS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("failed to run stylesheet processor '{program}': {source}")]
    Spawn { program: String, source: io::Error },

    #[error("stylesheet processor I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("stylesheet processor failed ({status}): {stderr}")]
    Failed { status: String, stderr: String },
}

/// `xsltproc`-compatible command line processor.
#[derive(Debug, Clone)]
pub struct Xsltproc {
    program: String,
    stylesheet: PathBuf,
}

impl Xsltproc {
    pub fn new(program: &str, stylesheet: PathBuf) -> Self {
        Self {
            program: program.to_string(),
            stylesheet,
        }
    }

    /// Transform one result fragment, passing `score` as a string parameter.
    pub async fn transform(&self, xml: &str, score: f32) -> Result<String, TransformError> {
        let mut child = Command::new(&self.program)
            .arg("--stringparam")
            .arg("score")
            .arg(score.to_string())
            .arg(&self.stylesheet)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransformError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let document = format!("{XML_HEADER}{xml}");
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(document.as_bytes()).await?;
            }
            Ok::<_, io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(TransformError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }
        fed?;

        debug!(bytes = output.stdout.len(), "stylesheet transform complete");
        let html = String::from_utf8_lossy(&output.stdout);
        Ok(strip_xml_declaration(&html).to_string())
    }
}

/// How result items become HTML.
#[derive(Debug, Clone)]
pub enum ItemRenderer {
    Stylesheet(Xsltproc),
    Escaped,
}

impl ItemRenderer {
    /// Render one result. Transform failures fall back to the escaped form.
    pub async fn render(&self, item: &ResultItem) -> String {
        let (ItemRenderer::Stylesheet(xslt), Some(xml)) = (self, item.xml.as_deref()) else {
            return escaped_item(item);
        };
        match xslt.transform(xml, item.score).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, identifier = ?item.identifier, "stylesheet transform failed, showing raw XML");
                escaped_item(item)
            }
        }
    }
}

fn escaped_item(item: &ResultItem) -> String {
    let mut out = format!("<li><p>Score: {:.3}", item.score);
    if let Some(id) = &item.identifier {
        let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
        out.push_str(&format!(
            " &middot; <a href=\"{DOCUMENT_PATH}?id={encoded}\">{}</a> &middot; <a href=\"{SIMILAR_PATH}?id={encoded}\">similar</a>",
            html_escape(id)
        ));
    }
    out.push_str("</p>");
    if let Some(xml) = &item.xml {
        out.push_str(&format!("<pre>{}</pre>", html_escape(xml)));
    }
    if !item.fields.is_empty() {
        out.push_str("<dl>");
        for (name, values) in &item.fields {
            out.push_str(&format!(
                "<dt>{}</dt><dd>{}</dd>",
                html_escape(name),
                html_escape(&values.join("; "))
            ));
        }
        out.push_str("</dl>");
    }
    out.push_str("</li>\n");
    out
}

fn strip_xml_declaration(s: &str) -> &str {
    let trimmed = s.trim_start();
    if trimmed.starts_with("<?xml")
        && let Some(end) = trimmed.find("?>")
    {
        return trimmed[end + 2..].trim_start();
    }
    s
}
