use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8801/axis/Search";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid service URL: scheme must be http or https, got '{0}'")]
    InvalidScheme(String),

    #[error("--timeout-secs must be greater than zero")]
    ZeroTimeout,
}

/// Web front end for a remote SOAP search service.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Address the portal listens on
    #[arg(long, env = "PORTAL_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Search service endpoint (a trailing `?wsdl` is ignored)
    #[arg(long, env = "PORTAL_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    pub service_url: String,

    /// Namespace of the service operations
    #[arg(long, env = "PORTAL_SERVICE_NS", default_value = "urn:Search")]
    pub namespace: String,

    /// Index searched by every page
    #[arg(long, env = "PORTAL_INDEX", default_value = "dataportal")]
    pub index: String,

    /// Exact-match field offered as a facet selector; empty disables it
    #[arg(long, env = "PORTAL_FACET_FIELD", default_value = "dataCenterFull")]
    pub facet_field: String,

    /// Label shown next to the facet selector
    #[arg(long, env = "PORTAL_FACET_LABEL", default_value = "Data Center")]
    pub facet_label: String,

    /// Fields offered as min/max range inputs (comma separated)
    #[arg(long = "range-field", env = "PORTAL_RANGE_FIELDS", value_delimiter = ',')]
    pub range_fields: Vec<String>,

    /// Sort results by this field first, then by relevance
    #[arg(long, env = "PORTAL_SORT_FIELD")]
    pub sort_field: Option<String>,

    /// Reverse the field sort order
    #[arg(long, env = "PORTAL_SORT_REVERSE")]
    pub sort_reverse: bool,

    /// XSLT stylesheet rendering each result's XML; results are shown escaped without one
    #[arg(long, env = "PORTAL_STYLESHEET")]
    pub stylesheet: Option<PathBuf>,

    /// Stylesheet processor, invoked like xsltproc
    #[arg(long, env = "PORTAL_XSLTPROC", default_value = "xsltproc")]
    pub xsltproc: String,

    /// Page title
    #[arg(long, env = "PORTAL_TITLE", default_value = "Example Data Portal")]
    pub title: String,

    /// Maximum number of facet values requested
    #[arg(long, env = "PORTAL_TERM_LIMIT", default_value_t = 65536)]
    pub term_limit: u32,

    /// Timeout for one call to the search service, in seconds
    #[arg(long, env = "PORTAL_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub service_url: String,
    pub namespace: String,
    pub index: String,
    pub facet: Option<Facet>,
    pub range_fields: Vec<String>,
    pub sort: Option<(String, bool)>,
    pub stylesheet: Option<PathBuf>,
    pub xsltproc: String,
    pub title: String,
    pub term_limit: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub field: String,
    pub label: String,
}

impl Args {
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let service_url = service_endpoint(&self.service_url)?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let field = self.facet_field.trim();
        let facet = (!field.is_empty()).then(|| Facet {
            field: field.to_string(),
            label: self.facet_label.clone(),
        });
        let range_fields = self
            .range_fields
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        let sort = self
            .sort_field
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| (f.to_string(), self.sort_reverse));
        Ok(Config {
            bind: self.bind,
            service_url,
            namespace: self.namespace,
            index: self.index,
            facet,
            range_fields,
            sort,
            stylesheet: self.stylesheet,
            xsltproc: self.xsltproc,
            title: self.title,
            term_limit: self.term_limit,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

/// Normalize the service URL: validate the scheme and drop a WSDL query.
fn service_endpoint(raw: &str) -> Result<String, ConfigError> {
    let mut parsed = url::Url::parse(raw.trim())?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(ConfigError::InvalidScheme(other.to_string())),
    }
    if parsed
        .query()
        .is_some_and(|q| q.eq_ignore_ascii_case("wsdl"))
    {
        parsed.set_query(None);
    }
    Ok(parsed.to_string())
}
