//! Search query parameters.
//!
//! A [`SearchQuery`] is the typed form of the `params` string the service
//! expects. It is encoded once, right before it goes on the wire, as an
//! `application/x-www-form-urlencoded` string. List parameters are encoded as
//! JSON arrays.

use std::collections::BTreeMap;
use url::form_urlencoded;

use super::filters::FilterExpression;

/// Parameters of a single search.
///
/// Every field is optional; unset fields are omitted from the encoded params
/// so the index settings apply.
///
/// # Example
///
/// ```
/// use searchlane_common::SearchQuery;
///
/// let query = SearchQuery::new("tower")
///     .with_page(2)
///     .with_facets(["city", "stars"]);
///
/// assert_eq!(
///     query.to_params(),
///     "query=tower&page=2&facets=%5B%22city%22%2C%22stars%22%5D"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub page: Option<u32>,
    pub hits_per_page: Option<u32>,
    pub filters: Option<String>,
    pub facets: Option<Vec<String>>,
    pub attributes_to_retrieve: Option<Vec<String>>,
    pub attributes_to_highlight: Option<Vec<String>>,
    pub attributes_to_snippet: Option<Vec<String>>,
    pub analytics: Option<bool>,
    pub max_values_per_facet: Option<u32>,
    /// Parameters without a typed field, encoded after the typed ones.
    pub extra: BTreeMap<String, String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_hits_per_page(mut self, hits_per_page: u32) -> Self {
        self.hits_per_page = Some(hits_per_page);
        self
    }

    pub fn with_filters(mut self, filters: impl Into<String>) -> Self {
        self.filters = Some(filters.into());
        self
    }

    /// Replaces the filter string with a rendered expression.
    ///
    /// An empty expression clears the filter.
    pub fn with_filter_expression(mut self, expression: &FilterExpression) -> Self {
        self.filters = expression.render();
        self
    }

    pub fn with_facets<I, S>(mut self, facets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facets = Some(facets.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_attributes_to_retrieve<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes_to_retrieve = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_attributes_to_highlight<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes_to_highlight = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_attributes_to_snippet<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes_to_snippet = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_analytics(mut self, enabled: bool) -> Self {
        self.analytics = Some(enabled);
        self
    }

    pub fn with_max_values_per_facet(mut self, max: u32) -> Self {
        self.max_values_per_facet = Some(max);
        self
    }

    /// Sets an untyped parameter. Typed fields win if both are set.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Encodes the query as a url-encoded params string.
    pub fn to_params(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        if let Some(query) = &self.query {
            serializer.append_pair("query", query);
        }
        if let Some(page) = self.page {
            serializer.append_pair("page", &page.to_string());
        }
        if let Some(hits_per_page) = self.hits_per_page {
            serializer.append_pair("hitsPerPage", &hits_per_page.to_string());
        }
        if let Some(filters) = self.filters.as_deref().filter(|f| !f.trim().is_empty()) {
            serializer.append_pair("filters", filters);
        }
        append_list(&mut serializer, "facets", self.facets.as_deref());
        append_list(
            &mut serializer,
            "attributesToRetrieve",
            self.attributes_to_retrieve.as_deref(),
        );
        append_list(
            &mut serializer,
            "attributesToHighlight",
            self.attributes_to_highlight.as_deref(),
        );
        append_list(
            &mut serializer,
            "attributesToSnippet",
            self.attributes_to_snippet.as_deref(),
        );
        if let Some(analytics) = self.analytics {
            serializer.append_pair("analytics", if analytics { "true" } else { "false" });
        }
        if let Some(max) = self.max_values_per_facet {
            serializer.append_pair("maxValuesPerFacet", &max.to_string());
        }
        for (name, value) in &self.extra {
            if !self.has_typed_param(name) {
                serializer.append_pair(name, value);
            }
        }

        serializer.finish()
    }

    fn has_typed_param(&self, name: &str) -> bool {
        match name {
            "query" => self.query.is_some(),
            "page" => self.page.is_some(),
            "hitsPerPage" => self.hits_per_page.is_some(),
            "filters" => self.filters.is_some(),
            "facets" => self.facets.is_some(),
            "attributesToRetrieve" => self.attributes_to_retrieve.is_some(),
            "attributesToHighlight" => self.attributes_to_highlight.is_some(),
            "attributesToSnippet" => self.attributes_to_snippet.is_some(),
            "analytics" => self.analytics.is_some(),
            "maxValuesPerFacet" => self.max_values_per_facet.is_some(),
            _ => false,
        }
    }
}

fn append_list(
    serializer: &mut form_urlencoded::Serializer<'_, String>,
    name: &str,
    values: Option<&[String]>,
) {
    if let Some(values) = values {
        // A slice of strings always serializes.
        let encoded = serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string());
        serializer.append_pair(name, &encoded);
    }
}
