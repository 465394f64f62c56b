//! Explanations and feature importance for emitted recommendations.
//!
//! Every recommendation carries text built from the statistics that fired the
//! rule, plus a weight per input feature (`amount`, `department`,
//! `category`, `vendor`) describing how much it drove the decision.

use crate::cohort::CohortStatistics;
use crate::detectors::{Candidate, Evidence};
use crate::types::transaction::TransactionRecord;
use std::collections::BTreeMap;

/// Rendered explanation for one candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub title: String,
    pub text: String,
    pub suggested_action: String,
    pub feature_importance: BTreeMap<String, f64>,
}

/// Renders explanations from detector evidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplanationBuilder;

impl ExplanationBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the explanation for a candidate produced for `record`.
    pub fn explain(
        &self,
        candidate: &Candidate,
        record: &TransactionRecord,
        statistics: &CohortStatistics,
    ) -> Explanation {
        let cohort_name = format!("{}/{}", record.department, record.category);
        let amount = format_usd(record.amount);

        match &candidate.evidence {
            Evidence::Anomaly {
                z_score,
                mean,
                std_dev,
                threshold,
            } => {
                let direction = if *z_score >= 0.0 { "above" } else { "below" };
                Explanation {
                    title: format!("Spending anomaly in {}", cohort_name),
                    text: format!(
                        "{} is {:.1} standard deviations {} the {} mean of {} \
                         (standard deviation {}, threshold {:.1}).",
                        amount,
                        z_score.abs(),
                        direction,
                        cohort_name,
                        format_usd(*mean),
                        format_usd(*std_dev),
                        threshold
                    ),
                    suggested_action: if *z_score >= 0.0 {
                        "Review the purchase justification and confirm the amount was approved."
                            .to_string()
                    } else {
                        "Confirm the purchase was recorded in full and not split across transactions."
                            .to_string()
                    },
                    feature_importance: weights(&[
                        ("amount", 0.7),
                        ("category", 0.15),
                        ("department", 0.15),
                    ]),
                }
            }

            Evidence::CostSaving {
                median,
                ratio,
                factor,
                cheapest_vendor,
            } => {
                let vendor_note = statistics
                    .vendor(&record.department, &record.vendor)
                    .map(|v| {
                        format!(
                            " {} averages {} per {} purchase across {} transactions.",
                            record.vendor,
                            format_usd(v.mean),
                            record.department,
                            v.count
                        )
                    })
                    .unwrap_or_default();
                Explanation {
                    title: format!("Potential {} cost saving", record.category),
                    text: format!(
                        "{} from {} is {:.1}x the {} median of {} (limit {:.1}x). \
                         The lowest-cost vendor in this cohort is {}.{}",
                        amount,
                        record.vendor,
                        ratio,
                        cohort_name,
                        format_usd(*median),
                        factor,
                        cheapest_vendor,
                        vendor_note
                    ),
                    suggested_action: format!(
                        "Request a competing quote from {} or negotiate pricing with {}.",
                        cheapest_vendor, record.vendor
                    ),
                    feature_importance: weights(&[
                        ("amount", 0.5),
                        ("category", 0.15),
                        ("vendor", 0.35),
                    ]),
                }
            }

            Evidence::VendorConsolidation {
                vendor_count,
                max_vendors,
                vendors,
            } => Explanation {
                title: format!("Consolidate {} vendors", cohort_name),
                text: format!(
                    "{} buys {} from {} distinct vendors ({}), more than the {} expected.",
                    record.department,
                    record.category,
                    vendor_count,
                    vendors.join(", "),
                    max_vendors
                ),
                suggested_action: "Consolidate purchases under fewer vendors to negotiate volume pricing."
                    .to_string(),
                feature_importance: weights(&[
                    ("category", 0.35),
                    ("department", 0.15),
                    ("vendor", 0.5),
                ]),
            },

            Evidence::BudgetOptimization {
                cohort_total,
                ceiling,
                utilization,
            } => Explanation {
                title: format!("{} budget pressure", cohort_name),
                text: format!(
                    "{} spend of {} is {:.0}% of its {} budget.",
                    cohort_name,
                    format_usd(*cohort_total),
                    utilization * 100.0,
                    format_usd(*ceiling)
                ),
                suggested_action: if *utilization >= 1.0 {
                    "Freeze discretionary purchases in this category until the budget is reconciled."
                        .to_string()
                } else {
                    "Defer non-essential purchases in this category for the rest of the period."
                        .to_string()
                },
                feature_importance: weights(&[
                    ("amount", 0.2),
                    ("category", 0.4),
                    ("department", 0.4),
                ]),
            },

            Evidence::PolicyCeiling { ceiling } => Explanation {
                title: "Single-transaction ceiling exceeded".to_string(),
                text: format!(
                    "{} exceeds the {} single-transaction ceiling of {}.",
                    amount,
                    record.category,
                    format_usd(*ceiling)
                ),
                suggested_action: "Obtain additional approval or split the requirement into a formal procurement."
                    .to_string(),
                feature_importance: weights(&[("amount", 0.8), ("category", 0.2)]),
            },

            Evidence::PolicyBidding {
                vendor_count,
                min_vendors,
                amount_threshold,
            } => Explanation {
                title: "Competitive bidding requirement not met".to_string(),
                text: format!(
                    "{} purchases of {} or more need at least {} competing vendors; \
                     {} has used {}.",
                    record.category,
                    format_usd(*amount_threshold),
                    min_vendors,
                    cohort_name,
                    vendor_count
                ),
                suggested_action: "Run a competitive bid before committing to this vendor."
                    .to_string(),
                feature_importance: weights(&[
                    ("amount", 0.3),
                    ("category", 0.2),
                    ("vendor", 0.5),
                ]),
            },
        }
    }
}

fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs
        .iter()
        .map(|(name, weight)| (name.to_string(), *weight))
        .collect()
}

/// Format a dollar amount as `$1,234.56`.
pub fn format_usd(value: f64) -> String {
    let cents = format!("{:.2}", value.abs());
    let (whole, fraction) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{record, statistics_with};
    use crate::types::recommendation::RecommendationType;

    fn candidate_with(evidence: Evidence, rec_type: RecommendationType) -> Candidate {
        Candidate::new(
            &record("Parks", "IT Equipment", "Dell", 1250.75),
            rec_type,
            1.0,
            0.0,
            evidence,
        )
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(999.5), "$999.50");
        assert_eq!(format_usd(1250.75), "$1,250.75");
        assert_eq!(format_usd(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_usd(-42.0), "-$42.00");
    }

    #[test]
    fn test_anomaly_explanation_names_the_statistics() {
        let stats = statistics_with(
            "Parks",
            "IT Equipment",
            500.0,
            100.0,
            500.0,
            &[("Dell", 1, 500.0)],
        );
        let candidate = candidate_with(
            Evidence::Anomaly {
                z_score: 7.5075,
                mean: 500.0,
                std_dev: 100.0,
                threshold: 2.0,
            },
            RecommendationType::SpendingAnomaly,
        );

        let explanation = ExplanationBuilder::new().explain(
            &candidate,
            &record("Parks", "IT Equipment", "Dell", 1250.75),
            &stats,
        );

        assert!(explanation
            .text
            .starts_with("$1,250.75 is 7.5 standard deviations above the Parks/IT Equipment mean of $500.00"));
        let amount = explanation.feature_importance["amount"];
        assert!(explanation
            .feature_importance
            .iter()
            .all(|(name, w)| *w >= 0.0 && (name == "amount" || *w < amount)));
    }

    #[test]
    fn test_vendor_consolidation_weights_vendor_and_category() {
        let stats = CohortStatistics::default();
        let candidate = candidate_with(
            Evidence::VendorConsolidation {
                vendor_count: 5,
                max_vendors: 3,
                vendors: vec!["CDW".into(), "Dell".into()],
            },
            RecommendationType::VendorConsolidation,
        );

        let explanation = ExplanationBuilder::new().explain(
            &candidate,
            &record("Parks", "IT Equipment", "Dell", 1250.75),
            &stats,
        );

        let fi = &explanation.feature_importance;
        assert!(fi["vendor"] > fi["department"]);
        assert!(fi["category"] > fi["department"]);
        assert!(!fi.contains_key("amount"));
        assert!(explanation.text.contains("5 distinct vendors"));
    }

    #[test]
    fn test_every_evidence_kind_has_non_negative_weights() {
        let stats = CohortStatistics::default();
        let record = record("Parks", "IT Equipment", "Dell", 1250.75);
        let evidence = vec![
            Evidence::CostSaving {
                median: 500.0,
                ratio: 2.5,
                factor: 1.5,
                cheapest_vendor: "CDW".into(),
            },
            Evidence::BudgetOptimization {
                cohort_total: 12_000.0,
                ceiling: 10_000.0,
                utilization: 1.2,
            },
            Evidence::PolicyCeiling { ceiling: 1_000.0 },
            Evidence::PolicyBidding {
                vendor_count: 1,
                min_vendors: 3,
                amount_threshold: 1_000.0,
            },
        ];

        for e in evidence {
            let candidate = candidate_with(e, RecommendationType::PolicyViolation);
            let explanation = ExplanationBuilder::new().explain(&candidate, &record, &stats);
            assert!(!explanation.text.is_empty());
            assert!(!explanation.title.is_empty());
            assert!(!explanation.suggested_action.is_empty());
            assert!(explanation.feature_importance.values().all(|w| *w >= 0.0));
        }
    }
}
