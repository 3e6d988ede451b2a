use std::fmt;

/// One query clause. `field: None` targets the service's default field.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryClause {
    pub field: Option<String>,
    pub query: String,
    pub any_of: bool,
}

impl QueryClause {
    pub fn default_field(query: &str) -> Self {
        Self {
            field: None,
            query: query.to_string(),
            any_of: false,
        }
    }

    pub fn field(field: &str, query: &str) -> Self {
        Self {
            field: Some(field.to_string()),
            query: query.to_string(),
            any_of: false,
        }
    }
}

/// A range bound. Numbers travel as `xsd:double`; text bounds are left for
/// the service to interpret as number or date.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeBound {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    pub field: String,
    pub min: Option<RangeBound>,
    pub max: Option<RangeBound>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub index: String,
    pub sort_field: Option<String>,
    pub sort_reverse: Option<bool>,
    pub queries: Vec<QueryClause>,
    pub ranges: Vec<RangeFilter>,
}

impl SearchRequest {
    /// Relevance-ordered request without constraints.
    pub fn new(index: &str) -> Self {
        Self {
            index: index.to_string(),
            sort_field: None,
            sort_reverse: None,
            queries: Vec::new(),
            ranges: Vec::new(),
        }
    }

    pub fn with_query(mut self, clause: QueryClause) -> Self {
        self.queries.push(clause);
        self
    }

    pub fn with_range(mut self, range: RangeFilter) -> Self {
        self.ranges.push(range);
        self
    }

    /// Sort by `field` first, then by relevance.
    pub fn sorted_by(mut self, field: &str, reverse: bool) -> Self {
        self.sort_field = Some(field.to_string());
        self.sort_reverse = Some(reverse);
        self
    }

    /// Rejects requests the service would refuse anyway.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(clause) = self
            .queries
            .iter()
            .find(|q| q.any_of && q.field.is_none())
        {
            return Err(format!(
                "anyOf cannot be used with the default field (query '{}')",
                clause.query
            ));
        }
        let has_clause = self.queries.iter().any(|q| !q.query.is_empty());
        if !has_clause && self.ranges.is_empty() {
            return Err("the search request does not contain any constraints".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultItem {
    pub score: f32,
    pub xml: Option<String>,
    pub identifier: Option<String>,
    pub fields: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub total_count: u64,
    pub offset: u64,
    pub query_time: Option<u64>,
    pub results: Vec<ResultItem>,
}

/// The envelope sent and the body received for one call.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    pub request: String,
    pub response: Option<String>,
}

impl fmt::Display for RangeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeBound::Number(n) => write!(f, "{n}"),
            RangeBound::Text(s) => f.write_str(s),
        }
    }
}

impl RangeBound {
    /// Numbers become `Number`, anything else is sent as text.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => RangeBound::Number(n),
            _ => RangeBound::Text(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for QueryClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}='{}'", self.query)?,
            None => write!(f, "'{}'", self.query)?,
        }
        if self.any_of {
            f.write_str("(anyOf)")?;
        }
        Ok(())
    }
}
