use proptest::prelude::*;
use tour_sdk::errors::{TourError, TourErrorExt};
use tour_sdk::types::{TopicFailure, TopicKind, TourRequest};

fn any_topic() -> impl Strategy<Value = TopicKind> {
    proptest::sample::select(TopicKind::CANONICAL_ORDER.to_vec())
}

// Hints are fixed strings: never empty and never echo the raw error detail.
proptest! {
    #[test]
    fn test_error_user_hint_completeness(detail in "\\PC+") {
        let errs = vec![
            TourError::InvalidRequest(detail.clone()),
            TourError::Planning(detail.clone()),
            TourError::Backend(detail.clone()),
            TourError::SynthesisParse(detail.clone()),
            TourError::Config(detail.clone()),
            TourError::AllSpecialistsFailed {
                failures: vec![TopicFailure::new(TopicKind::History, detail.clone())],
            },
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            if detail.len() > 12 {
                prop_assert!(!hint.contains(detail.as_str()));
            }
        }
    }
}

// Topic names parse regardless of case and surrounding whitespace.
proptest! {
    #[test]
    fn test_topic_parse_case_insensitive(topic in any_topic(), upper in any::<bool>(), pad in " {0,3}") {
        let name = if upper {
            topic.key().to_uppercase()
        } else {
            topic.label().to_string()
        };
        let parsed: TopicKind = format!("{}{}{}", pad, name, pad).parse().unwrap();
        prop_assert_eq!(parsed, topic);
    }
}

// Any selection walks in canonical order with duplicates collapsed.
proptest! {
    #[test]
    fn test_request_topics_canonical(
        topics in proptest::collection::vec(any_topic(), 1..8),
        duration in 0.1f64..600.0,
    ) {
        let request = TourRequest::new("Kyoto", topics.clone(), duration).unwrap();
        let walked: Vec<_> = request.topics_in_order().collect();

        let expected: Vec<_> = TopicKind::CANONICAL_ORDER
            .into_iter()
            .filter(|t| topics.contains(t))
            .collect();
        prop_assert_eq!(walked, expected);
    }

    #[test]
    fn test_non_positive_duration_rejected(duration in -600.0f64..=0.0) {
        let result = TourRequest::new("Kyoto", [TopicKind::Culture], duration);
        prop_assert!(matches!(result, Err(TourError::InvalidRequest(_))));
    }
}
