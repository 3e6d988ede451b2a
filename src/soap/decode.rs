//! Response envelope decoding, including `multiRef`/`href` indirection.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::types::{ResultItem, SearchResponse};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid XML attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("missing element: {0}")]
    Missing(&'static str),

    #[error("invalid value for {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

/// A fault reported by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub code: String,
    pub message: String,
}

/// Parsed XML element, namespace prefixes stripped.
#[derive(Debug, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, DecodeError> {
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            attrs.push((key, attr.unescape_value()?.into_owned()));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attrs,
            ..Default::default()
        })
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn is_nil(&self) -> bool {
        matches!(self.attr("nil"), Some("true" | "1"))
    }
}

pub(crate) fn parse(xml: &str) -> Result<Element, DecodeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = vec![Element::default()];
    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(Element::from_start(&e)?),
            Event::Empty(e) => {
                let el = Element::from_start(&e)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(el);
                }
            }
            Event::Text(t) => {
                if let Some(cur) = stack.last_mut() {
                    cur.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(cur) = stack.last_mut() {
                    cur.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                if stack.len() > 1
                    && let Some(el) = stack.pop()
                    && let Some(parent) = stack.last_mut()
                {
                    parent.children.push(el);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    let mut root = stack.swap_remove(0);
    if root.children.len() == 1 {
        Ok(root.children.remove(0))
    } else {
        Err(DecodeError::Missing("document element"))
    }
}

/// Decoded `soapenv:Body` with its `multiRef` index.
pub(crate) struct Body<'a> {
    body: &'a Element,
    refs: HashMap<&'a str, &'a Element>,
}

impl<'a> Body<'a> {
    pub fn new(envelope: &'a Element) -> Result<Self, DecodeError> {
        if envelope.name != "Envelope" {
            return Err(DecodeError::Missing("Envelope"));
        }
        let body = envelope.child("Body").ok_or(DecodeError::Missing("Body"))?;
        let refs = body
            .children
            .iter()
            .filter_map(|c| c.attr("id").map(|id| (id, c)))
            .collect();
        Ok(Self { body, refs })
    }

    pub fn fault(&self) -> Option<Fault> {
        let fault = self.body.child("Fault")?;
        let text = |name: &str| fault.child(name).map(|e| e.text.clone()).unwrap_or_default();
        Some(Fault {
            code: text("faultcode"),
            message: text("faultstring"),
        })
    }

    /// The operation's return value, `None` when it is nil.
    pub fn return_value(&self) -> Result<Option<&'a Element>, DecodeError> {
        let response = self
            .body
            .children
            .iter()
            .find(|c| c.attr("id").is_none() && c.name != "Fault")
            .ok_or(DecodeError::Missing("operation response"))?;
        let Some(ret) = response.children.first() else {
            return Ok(None);
        };
        let ret = self.resolve(ret);
        Ok((!ret.is_nil()).then_some(ret))
    }

    fn resolve(&self, el: &'a Element) -> &'a Element {
        el.attr("href")
            .and_then(|h| h.strip_prefix('#'))
            .and_then(|id| self.refs.get(id).copied())
            .unwrap_or(el)
    }

    fn items(&self, array: &'a Element) -> Vec<&'a Element> {
        array.children.iter().map(|c| self.resolve(c)).collect()
    }

    fn text_of(&self, el: &'a Element, name: &str) -> Option<&'a str> {
        let child = self.resolve(el.child(name)?);
        (!child.is_nil()).then_some(child.text.as_str())
    }

    pub fn strings(&self, array: &'a Element) -> Vec<String> {
        self.items(array)
            .into_iter()
            .filter(|e| !e.is_nil())
            .map(|e| e.text.clone())
            .collect()
    }

    pub fn search_response(&self, el: &'a Element) -> Result<SearchResponse, DecodeError> {
        let total_count = parse_num(self.text_of(el, "totalCount"), "totalCount")?
            .ok_or(DecodeError::Missing("totalCount"))?;
        let offset = parse_num(self.text_of(el, "offset"), "offset")?.unwrap_or(0);
        let query_time = parse_num(self.text_of(el, "queryTime"), "queryTime")?;
        let results = match el.child("results").map(|r| self.resolve(r)) {
            Some(r) if !r.is_nil() => self
                .items(r)
                .into_iter()
                .map(|item| self.result_item(item))
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        Ok(SearchResponse {
            total_count,
            offset,
            query_time,
            results,
        })
    }

    pub fn result_item(&self, el: &'a Element) -> Result<ResultItem, DecodeError> {
        let score = match self.text_of(el, "score") {
            Some(s) => s.trim().parse().map_err(|_| DecodeError::InvalidValue {
                field: "score",
                value: s.to_string(),
            })?,
            None => 0.0,
        };
        let fields = el
            .child("fields")
            .map(|f| self.resolve(f))
            .map(|f| self.fields(f))
            .unwrap_or_default();
        Ok(ResultItem {
            score,
            xml: self.text_of(el, "xml").map(str::to_string),
            identifier: self.text_of(el, "identifier").map(str::to_string),
            fields,
        })
    }

    // Maps arrive as arrays of <item><key/><value/></item>.
    fn fields(&self, map: &'a Element) -> Vec<(String, Vec<String>)> {
        self.items(map)
            .into_iter()
            .filter_map(|entry| {
                let key = self.text_of(entry, "key")?.to_string();
                let value = self.resolve(entry.child("value")?);
                let values = if value.children.is_empty() {
                    vec![value.text.clone()]
                } else {
                    self.strings(value)
                };
                Some((key, values))
            })
            .collect()
    }
}

fn parse_num(value: Option<&str>, field: &'static str) -> Result<Option<u64>, DecodeError> {
    value
        .map(|v| {
            v.trim().parse().map_err(|_| DecodeError::InvalidValue {
                field,
                value: v.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTIREF: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
 <soapenv:Body>
  <ns1:searchResponse xmlns:ns1="urn:Search">
   <searchReturn href="#id0"/>
  </ns1:searchResponse>
  <multiRef id="id0" xsi:type="ns2:SearchResponse">
   <offset xsi:type="xsd:int">10</offset>
   <queryTime xsi:type="xsd:long">7</queryTime>
   <results xsi:type="soapenc:Array">
    <results href="#id1"/>
    <results href="#id2"/>
   </results>
   <totalCount xsi:type="xsd:int">25</totalCount>
  </multiRef>
  <multiRef id="id1">
   <score xsi:type="xsd:float">0.93</score>
   <xml xsi:type="xsd:string">&lt;DIF&gt;&lt;Entry_Title&gt;Ice cores&lt;/Entry_Title&gt;&lt;/DIF&gt;</xml>
   <identifier xsi:type="xsd:string">oai:pangaea:1</identifier>
  </multiRef>
  <multiRef id="id2">
   <score xsi:type="xsd:float">0.5</score>
   <xml xsi:nil="true"/>
   <identifier xsi:type="xsd:string">oai:pangaea:2</identifier>
   <fields>
    <item><key>dataCenterFull</key><value><value>PANGAEA</value></value></item>
   </fields>
  </multiRef>
 </soapenv:Body>
</soapenv:Envelope>"##;

    #[test]
    fn resolves_multiref_search_response() {
        let root = parse(MULTIREF).unwrap();
        let body = Body::new(&root).unwrap();
        let ret = body.return_value().unwrap().unwrap();
        let resp = body.search_response(ret).unwrap();

        assert_eq!(resp.total_count, 25);
        assert_eq!(resp.offset, 10);
        assert_eq!(resp.query_time, Some(7));
        assert_eq!(resp.results.len(), 2);
        assert_eq!(
            resp.results[0].xml.as_deref(),
            Some("<DIF><Entry_Title>Ice cores</Entry_Title></DIF>")
        );
        assert!((resp.results[0].score - 0.93).abs() < 1e-6);
        assert_eq!(resp.results[1].xml, None);
        assert_eq!(
            resp.results[1].fields,
            vec![("dataCenterFull".to_string(), vec!["PANGAEA".to_string()])]
        );
    }

    #[test]
    fn reads_inline_string_array() {
        let xml = r#"<Envelope><Body><listTermsResponse><listTermsReturn>
            <item>AWI</item><item>PANGAEA</item></listTermsReturn></listTermsResponse></Body></Envelope>"#;
        let root = parse(xml).unwrap();
        let body = Body::new(&root).unwrap();
        let ret = body.return_value().unwrap().unwrap();
        assert_eq!(body.strings(ret), vec!["AWI", "PANGAEA"]);
    }

    #[test]
    fn nil_return_is_none() {
        let xml = r#"<Envelope><Body><getDocumentResponse><getDocumentReturn xsi:nil="true"/></getDocumentResponse></Body></Envelope>"#;
        let root = parse(xml).unwrap();
        let body = Body::new(&root).unwrap();
        assert!(body.return_value().unwrap().is_none());
    }

    #[test]
    fn extracts_fault() {
        let xml = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body>
            <soapenv:Fault><faultcode>soapenv:Server.userException</faultcode>
            <faultstring>java.lang.IllegalArgumentException: no constraints</faultstring></soapenv:Fault>
            </soapenv:Body></soapenv:Envelope>"#;
        let root = parse(xml).unwrap();
        let fault = Body::new(&root).unwrap().fault().unwrap();
        assert_eq!(fault.code, "soapenv:Server.userException");
        assert!(fault.message.contains("no constraints"));
    }

    #[test]
    fn rejects_non_envelope() {
        let root = parse("<html><body>oops</body></html>").unwrap();
        assert!(matches!(Body::new(&root), Err(DecodeError::Missing("Envelope"))));
    }

    #[test]
    fn rejects_bad_total_count() {
        let xml = r#"<Envelope><Body><searchResponse><r><totalCount>many</totalCount></r></searchResponse></Body></Envelope>"#;
        let root = parse(xml).unwrap();
        let body = Body::new(&root).unwrap();
        let ret = body.return_value().unwrap().unwrap();
        assert!(matches!(
            body.search_response(ret),
            Err(DecodeError::InvalidValue { field: "totalCount", .. })
        ));
    }

    #[test]
    fn rejects_truncated_xml() {
        assert!(parse("<Envelope><Body>").is_err());
    }
}
