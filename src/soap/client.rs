use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use super::decode::{self, Body, DecodeError, Fault};
use super::envelope::{Value, envelope};
use super::types::{Exchange, QueryClause, ResultItem, SearchRequest, SearchResponse};

const MAX_RESPONSE_BYTES: usize = 10_000_000;

#[derive(Debug, thiserror::Error)]
pub enum SoapError {
    #[error("{message}")]
    Fault {
        code: String,
        message: String,
        exchange: Box<Exchange>,
    },

    #[error("search service returned HTTP {status}")]
    Status { status: u16, exchange: Box<Exchange> },

    #[error("malformed response: {source}")]
    Malformed {
        source: DecodeError,
        exchange: Box<Exchange>,
    },

    #[error("network error: {source}")]
    Network {
        source: reqwest::Error,
        exchange: Box<Exchange>,
    },

    #[error("response too large (>{} bytes)", MAX_RESPONSE_BYTES)]
    TooLarge { exchange: Box<Exchange> },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl SoapError {
    /// The request/response pair; `None` only when nothing was sent.
    pub fn exchange(&self) -> Option<&Exchange> {
        match self {
            SoapError::Fault { exchange, .. }
            | SoapError::Status { exchange, .. }
            | SoapError::Malformed { exchange, .. }
            | SoapError::Network { exchange, .. }
            | SoapError::TooLarge { exchange } => Some(exchange),
            SoapError::InvalidRequest(_) => None,
        }
    }
}

/// RPC/encoded SOAP client for one service endpoint.
#[derive(Clone)]
pub struct SoapClient {
    http: Client,
    endpoint: String,
    namespace: String,
}

impl SoapClient {
    pub fn new(http: Client, endpoint: &str, namespace: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub async fn search(
        &self,
        req: &SearchRequest,
        offset: u32,
        count: u32,
    ) -> Result<SearchResponse, SoapError> {
        req.validate().map_err(SoapError::InvalidRequest)?;
        debug!(
            index = %req.index,
            clauses = %req.queries.iter().map(ToString::to_string).collect::<Vec<_>>().join(" AND "),
            ranges = req.ranges.len(),
            offset,
            count,
            "search"
        );
        let args = [
            Value::from(req),
            Value::Int(offset.into()),
            Value::Int(count.into()),
        ];
        self.call("search", &args, |body| {
            let ret = body.return_value()?.ok_or(DecodeError::Missing("searchReturn"))?;
            body.search_response(ret)
        })
        .await
    }

    /// Indexed values of `field`, optionally restricted to a prefix.
    pub async fn list_terms(
        &self,
        index: &str,
        field: &str,
        prefix: Option<&str>,
        count: u32,
    ) -> Result<Vec<String>, SoapError> {
        let mut args = vec![Value::Str(index.to_string()), Value::Str(field.to_string())];
        if let Some(prefix) = prefix {
            args.push(Value::Str(prefix.to_string()));
        }
        args.push(Value::Int(count.into()));
        self.call("listTerms", &args, string_array).await
    }

    pub async fn suggest(
        &self,
        index: &str,
        clause: &QueryClause,
        count: u32,
    ) -> Result<Vec<String>, SoapError> {
        let args = [
            Value::Str(index.to_string()),
            Value::from(clause),
            Value::Int(count.into()),
        ];
        self.call("suggest", &args, string_array).await
    }

    pub async fn get_document(
        &self,
        index: &str,
        identifier: &str,
    ) -> Result<Option<ResultItem>, SoapError> {
        let args = [
            Value::Str(index.to_string()),
            Value::Str(identifier.to_string()),
        ];
        self.call("getDocument", &args, |body| {
            body.return_value()?
                .map(|ret| body.result_item(ret))
                .transpose()
        })
        .await
    }

    /// Documents similar to `identifier`, over all fields or a single one.
    pub async fn more_like_this(
        &self,
        index: &str,
        identifier: &str,
        field: Option<&str>,
        offset: u32,
        count: u32,
    ) -> Result<SearchResponse, SoapError> {
        let mut args = vec![
            Value::Str(index.to_string()),
            Value::Str(identifier.to_string()),
        ];
        let operation = match field {
            Some(field) => {
                args.push(Value::Str(field.to_string()));
                "fieldedMoreLikeThis"
            }
            None => "defaultMoreLikeThis",
        };
        args.push(Value::Int(offset.into()));
        args.push(Value::Int(count.into()));
        self.call(operation, &args, |body| {
            let ret = body.return_value()?.ok_or(DecodeError::Missing("moreLikeThisReturn"))?;
            body.search_response(ret)
        })
        .await
    }

    async fn call<T>(
        &self,
        operation: &str,
        args: &[Value],
        extract: impl FnOnce(&Body<'_>) -> Result<T, DecodeError>,
    ) -> Result<T, SoapError> {
        let request = envelope(&self.namespace, operation, args);

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "\"\"")
            .header("User-Agent", crate::USER_AGENT)
            .body(request.clone())
            .send()
            .await
            .map_err(|source| {
                warn!(operation, error = %source, "search service unreachable");
                SoapError::Network {
                    source,
                    exchange: unanswered(&request),
                }
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = read_body(response, content_type.as_deref(), &request).await?;
        debug!(operation, status = %status, bytes = text.len(), "soap call complete");

        let decoded = decode_envelope(&text, extract);
        let exchange = Box::new(Exchange {
            request,
            response: Some(text),
        });

        match decoded {
            Ok(Err(fault)) => {
                warn!(operation, code = %fault.code, message = %fault.message, "SOAP fault");
                Err(SoapError::Fault {
                    code: fault.code,
                    message: fault.message,
                    exchange,
                })
            }
            _ if !status.is_success() => {
                warn!(operation, status = %status, "search service error (no fault body)");
                Err(SoapError::Status {
                    status: status.as_u16(),
                    exchange,
                })
            }
            Ok(Ok(value)) => Ok(value),
            Err(source) => {
                warn!(operation, error = %source, "undecodable SOAP response");
                Err(SoapError::Malformed { source, exchange })
            }
        }
    }
}

fn unanswered(request: &str) -> Box<Exchange> {
    Box::new(Exchange {
        request: request.to_string(),
        response: None,
    })
}

fn string_array(body: &Body<'_>) -> Result<Vec<String>, DecodeError> {
    Ok(body
        .return_value()?
        .map(|ret| body.strings(ret))
        .unwrap_or_default())
}

fn decode_envelope<T>(
    xml: &str,
    extract: impl FnOnce(&Body<'_>) -> Result<T, DecodeError>,
) -> Result<Result<T, Fault>, DecodeError> {
    let root = decode::parse(xml)?;
    let body = Body::new(&root)?;
    if let Some(fault) = body.fault() {
        return Ok(Err(fault));
    }
    extract(&body).map(Ok)
}

async fn read_body(
    mut response: reqwest::Response,
    content_type: Option<&str>,
    request: &str,
) -> Result<String, SoapError> {
    let too_large = || SoapError::TooLarge {
        exchange: unanswered(request),
    };
    if response
        .content_length()
        .is_some_and(|len| len > MAX_RESPONSE_BYTES as u64)
    {
        return Err(too_large());
    }

    let mut body = Vec::new();
    loop {
        let chunk = response.chunk().await.map_err(|source| SoapError::Network {
            source,
            exchange: unanswered(request),
        })?;
        let Some(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(too_large());
        }
    }
    Ok(decode_text(&body, content_type))
}

fn decode_text(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset)
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_from_content_type() {
        assert_eq!(charset("text/xml; charset=ISO-8859-1"), Some("ISO-8859-1"));
        assert_eq!(charset(r#"text/xml;Charset="utf-8""#), Some("utf-8"));
        assert_eq!(charset("text/xml"), None);
    }

    #[test]
    fn decodes_latin1_body() {
        let bytes = b"Bremerhaven \xdcbersee";
        assert_eq!(
            decode_text(bytes, Some("text/xml; charset=iso-8859-1")),
            "Bremerhaven Übersee"
        );
    }

    #[test]
    fn defaults_to_utf8() {
        assert_eq!(decode_text("Übersee".as_bytes(), None), "Übersee");
    }

    #[test]
    fn exchange_kept_for_every_sent_request() {
        assert!(SoapError::InvalidRequest("empty".into()).exchange().is_none());
        let err = SoapError::TooLarge {
            exchange: unanswered("<req/>"),
        };
        let exchange = err.exchange().unwrap();
        assert_eq!(exchange.request, "<req/>");
        assert!(exchange.response.is_none());
        let err = SoapError::Status {
            status: 502,
            exchange: Box::new(Exchange {
                request: "<req/>".into(),
                response: Some("bad gateway".into()),
            }),
        };
        assert_eq!(err.exchange().map(|e| e.request.as_str()), Some("<req/>"));
    }
}
