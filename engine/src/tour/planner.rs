//! Budget Planner
//!
//! Asks the allocation estimator how a tour's minutes should be spread and
//! turns the reply into a `SectionBudget`. The plan is advisory: the
//! dispatcher sizes specialist output with its own even split.

use sdk::errors::TourError;
use sdk::types::{SectionBudget, SectionKey, TopicKind, TourRequest};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::decode::{decode_object, JsonObject};
use crate::capabilities::AllocationEstimator;

/// A plan whose total strays further than this from the requested duration
/// is logged.
const TOTAL_TOLERANCE_MINUTES: f64 = 1.0;

/// Produce the advisory budget for `request`.
///
/// The estimator is invoked exactly once. A reply that cannot be decoded, or
/// that lacks a finite non-negative number for any of the six sections,
/// fails with `TourError::Planning`; no value is ever filled in.
pub async fn plan_budget(
    estimator: &dyn AllocationEstimator,
    request: &TourRequest,
    timeout: Duration,
) -> Result<SectionBudget, TourError> {
    let topics: Vec<TopicKind> = request.topics_in_order().collect();

    let raw = match tokio::time::timeout(
        timeout,
        estimator.estimate_allocation(request.location(), &topics, request.duration_minutes()),
    )
    .await
    {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => return Err(TourError::Planning(e.to_string())),
        Err(_) => {
            return Err(TourError::Planning(format!(
                "allocation estimate timed out after {}s",
                timeout.as_secs()
            )))
        }
    };

    let object = decode_object(&raw).map_err(|e| TourError::Planning(e.to_string()))?;
    let budget = parse_budget(&object)?;

    let total = budget.total();
    if (total - request.duration_minutes()).abs() > TOTAL_TOLERANCE_MINUTES {
        tracing::warn!(
            "Plan totals {:.1} minutes for a {:.1} minute tour",
            total,
            request.duration_minutes()
        );
    }

    Ok(budget)
}

/// Read all six allocations from a decoded reply.
pub fn parse_budget(object: &JsonObject) -> Result<SectionBudget, TourError> {
    let mut topics = BTreeMap::new();
    for topic in TopicKind::CANONICAL_ORDER {
        topics.insert(topic, read_minutes(object, SectionKey::Topic(topic))?);
    }

    Ok(SectionBudget {
        introduction: read_minutes(object, SectionKey::Introduction)?,
        topics,
        conclusion: read_minutes(object, SectionKey::Conclusion)?,
    })
}

fn read_minutes(object: &JsonObject, section: SectionKey) -> Result<f64, TourError> {
    let value = object.get(section.key()).ok_or_else(|| {
        TourError::Planning(format!("allocation is missing '{}'", section.key()))
    })?;

    let minutes = match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
    .ok_or_else(|| {
        TourError::Planning(format!(
            "allocation for '{}' is not a number: {}",
            section.key(),
            value
        ))
    })?;

    if !minutes.is_finite() || minutes < 0.0 {
        return Err(TourError::Planning(format!(
            "allocation for '{}' must be a non-negative number, got {}",
            section.key(),
            minutes
        )));
    }

    Ok(minutes)
}
