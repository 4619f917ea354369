//! Expansion of a faceted search into a multi-query batch.
//!
//! A disjunctive facet is one whose values are OR-ed together ("4 or 5
//! stars"). Its counts must ignore the facet's own refinement, so besides the
//! primary query the plan holds one sibling per disjunctive facet that keeps
//! every other refinement and drops that facet's own.

use searchlane_common::{FilterClause, FilterExpression, SearchQuery};
use std::collections::BTreeMap;

/// Facet name → selected values.
pub type Refinements = BTreeMap<String, Vec<String>>;

/// Count query for one disjunctive facet.
#[derive(Debug, Clone, PartialEq)]
pub struct SiblingQuery {
    pub facet: String,
    pub query: SearchQuery,
    /// Structured form of `query.filters`; never constrains `facet`.
    pub filter: FilterExpression,
}

/// Sub-queries for one faceted search, in the order they are sent.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetQueryPlan {
    base_query: SearchQuery,
    disjunctive_facets: Vec<String>,
    refinements: Refinements,
    conjunctive_clauses: Vec<FilterClause>,
    disjunctive_clauses: BTreeMap<String, FilterClause>,
    primary: SearchQuery,
    siblings: Vec<SiblingQuery>,
}

impl FacetQueryPlan {
    pub fn base_query(&self) -> &SearchQuery {
        &self.base_query
    }

    /// Disjunctive facet names, deduplicated, in the caller's order.
    pub fn disjunctive_facets(&self) -> &[String] {
        &self.disjunctive_facets
    }

    /// Non-empty refinements, values deduplicated.
    pub fn refinements(&self) -> &Refinements {
        &self.refinements
    }

    pub fn conjunctive_clauses(&self) -> &[FilterClause] {
        &self.conjunctive_clauses
    }

    /// The OR-group of a refined disjunctive facet.
    pub fn disjunctive_clause(&self, facet: &str) -> Option<&FilterClause> {
        self.disjunctive_clauses.get(facet)
    }

    /// Values selected for `facet`; empty if it is not refined.
    pub fn refined_values(&self, facet: &str) -> &[String] {
        self.refinements
            .get(facet)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_disjunctive(&self, facet: &str) -> bool {
        self.disjunctive_facets.iter().any(|f| f == facet)
    }

    pub fn primary(&self) -> &SearchQuery {
        &self.primary
    }

    pub fn siblings(&self) -> &[SiblingQuery] {
        &self.siblings
    }

    /// Primary query first, then one sibling per disjunctive facet.
    pub fn sub_queries(&self) -> Vec<SearchQuery> {
        std::iter::once(self.primary.clone())
            .chain(self.siblings.iter().map(|s| s.query.clone()))
            .collect()
    }

    /// Number of sub-queries, and so of expected responses.
    pub fn len(&self) -> usize {
        1 + self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Builds [`FacetQueryPlan`]s.
pub struct DisjunctiveFacetPlanner;

impl DisjunctiveFacetPlanner {
    /// Plans the queries for `base_query` refined by `refinements`.
    ///
    /// Refinements on facets listed in `disjunctive_facets` become OR-groups;
    /// all others become one equality clause per value. An existing filter on
    /// `base_query`, typed or set through `with_param("filters", ..)`, is kept
    /// and AND-ed with the refinements.
    pub fn plan<I, S>(
        base_query: &SearchQuery,
        disjunctive_facets: I,
        refinements: &Refinements,
    ) -> FacetQueryPlan
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut facets: Vec<String> = Vec::new();
        for facet in disjunctive_facets {
            let facet = facet.into();
            if !facet.trim().is_empty() && !facets.contains(&facet) {
                facets.push(facet);
            }
        }

        let refinements: Refinements = refinements
            .iter()
            .filter_map(|(facet, values)| {
                let values = dedup(values);
                (!values.is_empty()).then(|| (facet.clone(), values))
            })
            .collect();

        let mut conjunctive_clauses = Vec::new();
        let mut disjunctive_clauses = BTreeMap::new();
        for (facet, values) in &refinements {
            if facets.contains(facet) {
                disjunctive_clauses.insert(
                    facet.clone(),
                    FilterClause::any_of(facet.as_str(), values.iter().cloned()),
                );
            } else {
                conjunctive_clauses.extend(
                    values
                        .iter()
                        .map(|value| FilterClause::equals(facet.as_str(), value.as_str())),
                );
            }
        }

        let base_filter = base_query
            .filters
            .as_deref()
            .or_else(|| base_query.extra.get("filters").map(String::as_str))
            .filter(|f| !f.trim().is_empty())
            .map(FilterClause::raw);

        let filter_without = |excluded: Option<&str>| {
            let mut expression = FilterExpression::new();
            if let Some(base) = &base_filter {
                expression.push(base.clone());
            }
            for facet in &facets {
                if Some(facet.as_str()) == excluded {
                    continue;
                }
                if let Some(clause) = disjunctive_clauses.get(facet) {
                    expression.push(clause.clone());
                }
            }
            for clause in &conjunctive_clauses {
                expression.push(clause.clone());
            }
            expression
        };

        let primary = with_filter(base_query.clone(), &filter_without(None));

        let siblings = facets
            .iter()
            .map(|facet| {
                let query = SearchQuery {
                    page: Some(0),
                    hits_per_page: Some(0),
                    analytics: Some(false),
                    attributes_to_retrieve: Some(Vec::new()),
                    attributes_to_highlight: Some(Vec::new()),
                    attributes_to_snippet: Some(Vec::new()),
                    facets: Some(vec![facet.clone()]),
                    ..base_query.clone()
                };
                let filter = filter_without(Some(facet));
                SiblingQuery {
                    facet: facet.clone(),
                    query: with_filter(query, &filter),
                    filter,
                }
            })
            .collect();

        FacetQueryPlan {
            base_query: base_query.clone(),
            disjunctive_facets: facets,
            refinements,
            conjunctive_clauses,
            disjunctive_clauses,
            primary,
            siblings,
        }
    }
}

fn with_filter(mut query: SearchQuery, expression: &FilterExpression) -> SearchQuery {
    query.extra.remove("filters");
    query.filters = expression.render();
    query
}

fn dedup(values: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(value) {
            unique.push(value.clone());
        }
    }
    unique
}
