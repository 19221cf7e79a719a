//! Query planning: index selection and backend request construction.
//!
//! Planning is pure and deterministic: the same schema and the same filter
//! set always select the same access path. Candidate indexes are those whose
//! hash attribute carries an equality filter; ties break range-capable
//! first, then the primary index, then lexical index name (the catalog's
//! deterministic order).

use crate::{
    backend::{Conditions, QueryRequest, RawKey, ScanRequest},
    error::CapabilityError,
    query::{Filter, Operator, Query},
    schema::{Index, TableSchema},
    value,
};
use std::collections::BTreeSet;

///
/// PlannedAccess
///
/// The access path a plan settled on, exposed for observability.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlannedAccess<'a> {
    /// Native query against the table's primary index.
    Primary,
    /// Native query against a named secondary index.
    Secondary(&'a str),
    /// Unindexed scan with backend-side filter conditions.
    Scan,
}

///
/// PlannedRequest
///
/// Backend-shaped outcome of planning one query. Residual filters are the
/// conjuncts the chosen index cannot evaluate server-side; the cursor must
/// re-apply them client-side — they degrade, never drop.
///

#[derive(Clone, Debug, PartialEq)]
pub enum PlannedRequest {
    Query {
        request: QueryRequest,
        post_filters: Vec<Filter>,
    },
    Scan {
        request: ScanRequest,
    },
}

impl PlannedRequest {
    /// The access path this plan uses.
    #[must_use]
    pub fn access(&self) -> PlannedAccess<'_> {
        match self {
            Self::Query { request, .. } => match request.index.as_deref() {
                Some(name) => PlannedAccess::Secondary(name),
                None => PlannedAccess::Primary,
            },
            Self::Scan { .. } => PlannedAccess::Scan,
        }
    }

    #[must_use]
    pub const fn is_scan(&self) -> bool {
        matches!(self, Self::Scan { .. })
    }

    /// Filters the cursor must re-apply client-side.
    #[must_use]
    pub fn post_filters(&self) -> &[Filter] {
        match self {
            Self::Query { post_filters, .. } => post_filters,
            Self::Scan { .. } => &[],
        }
    }
}

/// Reject query features the backend has no native support for.
///
/// Called before anything else — including table resolution — so a rejected
/// query provably issues no backend call.
pub(crate) fn check_capabilities(query: &Query) -> Result<(), CapabilityError> {
    if !query.orders.is_empty() {
        return Err(CapabilityError::Ordering);
    }
    if query.offset > 0 {
        return Err(CapabilityError::OffsetCount);
    }

    Ok(())
}

/// Plan `query` against `schema`, with any continuation already resolved to
/// a raw backend key.
pub fn plan(
    schema: &TableSchema,
    query: &Query,
    start_key: Option<RawKey>,
) -> Result<PlannedRequest, CapabilityError> {
    check_capabilities(query)?;

    let chosen = choose_index(schema, &query.filters);

    let Some(index) = chosen else {
        let mut filter_conditions = Conditions::new();
        for filter in &query.filters {
            filter_conditions.insert(
                &filter.field,
                filter.op.condition_name(),
                value::encode(&filter.value),
            );
        }

        tracing::debug!(table = schema.name(), "planned unindexed scan");
        return Ok(PlannedRequest::Scan {
            request: ScanRequest {
                filter_conditions,
                limit: query.limit,
                exclusive_start_key: start_key,
            },
        });
    };

    let mut key_conditions = Conditions::new();
    let mut post_filters = Vec::new();
    for filter in &query.filters {
        let on_hash = filter.field == index.hash_key;
        let on_range = index.range_key.as_deref() == Some(filter.field.as_str());

        // Only conditions on the chosen index's own attributes go to the
        // backend; one level of server-side filtering is all it guarantees.
        // A non-equality condition on the hash attribute is not expressible
        // as a key condition either.
        if (on_hash && filter.op == Operator::Eq) || on_range {
            key_conditions.insert(
                &filter.field,
                filter.op.condition_name(),
                value::encode(&filter.value),
            );
        } else {
            post_filters.push(filter.clone());
        }
    }

    tracing::debug!(
        table = schema.name(),
        index = index.label(),
        residual = post_filters.len(),
        "planned index query"
    );
    Ok(PlannedRequest::Query {
        request: QueryRequest {
            index: index.name.clone(),
            key_conditions,
            limit: query.limit,
            exclusive_start_key: start_key,
        },
        post_filters,
    })
}

// Select the best index for a filter set, or None to fall back to a scan.
fn choose_index<'a>(schema: &'a TableSchema, filters: &[Filter]) -> Option<&'a Index> {
    let equality_fields: BTreeSet<&str> = filters
        .iter()
        .filter(|filter| filter.op == Operator::Eq)
        .map(|filter| filter.field.as_str())
        .collect();
    let filter_fields: BTreeSet<&str> =
        filters.iter().map(|filter| filter.field.as_str()).collect();

    let mut best: Option<&Index> = None;
    for field in &equality_fields {
        for candidate in schema.indexes_by_hash_attribute(field) {
            best = Some(match best {
                Some(current) if !better_index(candidate, current, &filter_fields) => current,
                _ => candidate,
            });
        }
    }

    best
}

// True when `candidate` beats `current` under the fixed total order.
fn better_index(candidate: &Index, current: &Index, filter_fields: &BTreeSet<&str>) -> bool {
    let range_capable =
        |index: &Index| index.range_key.as_deref().is_some_and(|r| filter_fields.contains(r));

    let (cand_range, best_range) = (range_capable(candidate), range_capable(current));
    if cand_range != best_range {
        return cand_range;
    }
    if candidate.is_primary() != current.is_primary() {
        return candidate.is_primary();
    }

    candidate.sort_name() < current.sort_name()
}

///
/// TESTS
///
