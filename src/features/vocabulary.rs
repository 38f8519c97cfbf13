//! Indicator vocabulary for categorical columns
//!
//! One-hot columns are derived from the values observed when the vocabulary
//! is fitted. The fitted vocabulary is then reused verbatim for every row
//! scored later, so a model always sees the same columns in the same order.

use crate::error::{LoanfundError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Value part of the unknown-bucket column name (`sector_` + `_unknown`)
const UNKNOWN_SUFFIX: &str = "_unknown";

/// What to do with a category value the vocabulary has never seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnseenCategoryPolicy {
    /// Fail with [`LoanfundError::UnseenCategory`]
    #[default]
    Reject,
    /// Leave every indicator of the group at 0
    ZeroFill,
    /// Route to a reserved `<prefix>_unknown` column present in every group
    UnknownBucket,
}

impl std::str::FromStr for UnseenCategoryPolicy {
    type Err = LoanfundError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "reject" => Ok(Self::Reject),
            "zero_fill" | "zero" => Ok(Self::ZeroFill),
            "unknown_bucket" | "unknown" => Ok(Self::UnknownBucket),
            _ => Err(LoanfundError::ConfigError(format!(
                "unknown category policy '{}' (expected reject, zero_fill or unknown_bucket)",
                s
            ))),
        }
    }
}

/// Indicator columns for one categorical source column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    /// Source column name
    pub column: String,
    /// Feature name prefix, e.g. `sector_`
    pub prefix: String,
    /// Lowercased values, sorted
    values: Vec<String>,
    /// Whether the trailing unknown-bucket column exists
    unknown_bucket: bool,
}

impl CategoryGroup {
    /// Build a group from the values observed in the engineering input
    pub fn fit<'a, I>(column: &str, prefix: &str, observed: I, policy: UnseenCategoryPolicy) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unknown_bucket = policy == UnseenCategoryPolicy::UnknownBucket;
        let mut values: BTreeSet<String> = observed.into_iter().map(normalize).collect();
        // A literal `_unknown` value would share the bucket's column name; it lands in the bucket instead
        if unknown_bucket {
            values.remove(UNKNOWN_SUFFIX);
        }
        Self {
            column: column.to_string(),
            prefix: prefix.to_string(),
            values: values.into_iter().collect(),
            unknown_bucket,
        }
    }

    /// Number of indicator columns this group produces
    pub fn width(&self) -> usize {
        self.values.len() + usize::from(self.unknown_bucket)
    }

    /// Known (lowercased) values in column order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .values
            .iter()
            .map(|v| format!("{}{}", self.prefix, v))
            .collect();
        if self.unknown_bucket {
            names.push(format!("{}{}", self.prefix, UNKNOWN_SUFFIX));
        }
        names
    }

    /// Index of the indicator that fires for `value`, if any
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values.binary_search(&normalize(value)).ok()
    }

    /// Write this group's indicators for `value` into `out` (length [`width`](Self::width))
    pub fn encode(&self, value: &str, policy: UnseenCategoryPolicy, out: &mut [f64]) -> Result<()> {
        debug_assert_eq!(out.len(), self.width());
        out.fill(0.0);
        match self.index_of(value) {
            Some(idx) => out[idx] = 1.0,
            None => match policy {
                UnseenCategoryPolicy::Reject => {
                    return Err(LoanfundError::UnseenCategory {
                        column: self.column.clone(),
                        value: value.to_string(),
                    })
                }
                UnseenCategoryPolicy::ZeroFill => {}
                UnseenCategoryPolicy::UnknownBucket => {
                    if !self.unknown_bucket {
                        return Err(LoanfundError::ValidationError(format!(
                            "vocabulary for {} was fitted without an unknown bucket",
                            self.column
                        )));
                    }
                    out[self.values.len()] = 1.0;
                }
            },
        }
        Ok(())
    }
}

/// Ordered set of category groups plus the policy they were fitted with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVocabulary {
    pub groups: Vec<CategoryGroup>,
    pub policy: UnseenCategoryPolicy,
}

impl FeatureVocabulary {
    pub fn new(groups: Vec<CategoryGroup>, policy: UnseenCategoryPolicy) -> Self {
        Self { groups, policy }
    }

    /// Total number of indicator columns
    pub fn width(&self) -> usize {
        self.groups.iter().map(CategoryGroup::width).sum()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.groups.iter().flat_map(|g| g.feature_names()).collect()
    }

    /// Encode one value per group (in group order) into `out`
    pub fn encode(&self, values: &[&str], out: &mut [f64]) -> Result<()> {
        if values.len() != self.groups.len() {
            return Err(LoanfundError::ShapeError {
                expected: format!("{} category values", self.groups.len()),
                actual: format!("{} category values", values.len()),
            });
        }
        let mut offset = 0;
        for (group, value) in self.groups.iter().zip(values) {
            let width = group.width();
            group.encode(value, self.policy, &mut out[offset..offset + width])?;
            offset += width;
        }
        Ok(())
    }
}

fn normalize(value: &str) -> String {
    value.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector_group(policy: UnseenCategoryPolicy) -> CategoryGroup {
        CategoryGroup::fit(
            "SECTOR_NAME",
            "sector_",
            ["Retail", "Food", "Agriculture", "Food"],
            policy,
        )
    }

    #[test]
    fn test_fit_sorts_and_dedups() {
        let group = sector_group(UnseenCategoryPolicy::Reject);
        assert_eq!(group.values(), &["agriculture", "food", "retail"]);
        assert_eq!(
            group.feature_names(),
            vec!["sector_agriculture", "sector_food", "sector_retail"]
        );
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let group = CategoryGroup::fit("SECTOR_NAME", "sector_", ["Food", "food"], UnseenCategoryPolicy::Reject);
        assert_eq!(group.width(), 1);
        assert_eq!(group.index_of("FOOD"), Some(0));
    }

    #[test]
    fn test_encode_one_hot() {
        let group = sector_group(UnseenCategoryPolicy::Reject);
        let mut out = vec![0.0; group.width()];
        group.encode("Food", UnseenCategoryPolicy::Reject, &mut out).unwrap();
        assert_eq!(out, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unseen_reject() {
        let group = sector_group(UnseenCategoryPolicy::Reject);
        let mut out = vec![0.0; group.width()];
        let err = group
            .encode("Housing", UnseenCategoryPolicy::Reject, &mut out)
            .unwrap_err();
        assert!(matches!(err, LoanfundError::UnseenCategory { .. }));
    }

    #[test]
    fn test_unseen_zero_fill() {
        let group = sector_group(UnseenCategoryPolicy::ZeroFill);
        let mut out = vec![1.0; group.width()];
        group.encode("Housing", UnseenCategoryPolicy::ZeroFill, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_unseen_unknown_bucket() {
        let group = sector_group(UnseenCategoryPolicy::UnknownBucket);
        assert_eq!(group.width(), 4);
        assert_eq!(group.feature_names()[3], "sector__unknown");

        let mut out = vec![0.0; group.width()];
        group
            .encode("Housing", UnseenCategoryPolicy::UnknownBucket, &mut out)
            .unwrap();
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_literal_unknown_value_shares_bucket() {
        let group = CategoryGroup::fit(
            "SECTOR_NAME",
            "sector_",
            ["Food", "_Unknown"],
            UnseenCategoryPolicy::UnknownBucket,
        );
        let names = group.feature_names();
        assert_eq!(names, vec!["sector_food", "sector__unknown"]);

        let mut out = vec![0.0; group.width()];
        group
            .encode("_unknown", UnseenCategoryPolicy::UnknownBucket, &mut out)
            .unwrap();
        assert_eq!(out, vec![0.0, 1.0]);
    }

    #[test]
    fn test_literal_unknown_value_kept_without_bucket() {
        let group = CategoryGroup::fit("SECTOR_NAME", "sector_", ["Food", "_unknown"], UnseenCategoryPolicy::Reject);
        assert_eq!(group.feature_names(), vec!["sector__unknown", "sector_food"]);
    }

    #[test]
    fn test_vocabulary_encode_offsets() {
        let vocab = FeatureVocabulary::new(
            vec![
                sector_group(UnseenCategoryPolicy::Reject),
                CategoryGroup::fit("REPAYMENT_INTERVAL", "repayment_", ["monthly", "bullet"], UnseenCategoryPolicy::Reject),
            ],
            UnseenCategoryPolicy::Reject,
        );
        assert_eq!(vocab.width(), 5);

        let mut out = vec![0.0; vocab.width()];
        vocab.encode(&["Retail", "monthly"], &mut out).unwrap();
        assert_eq!(out, vec![0.0, 0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("reject".parse::<UnseenCategoryPolicy>().unwrap(), UnseenCategoryPolicy::Reject);
        assert_eq!("zero-fill".parse::<UnseenCategoryPolicy>().unwrap(), UnseenCategoryPolicy::ZeroFill);
        assert_eq!(
            "unknown_bucket".parse::<UnseenCategoryPolicy>().unwrap(),
            UnseenCategoryPolicy::UnknownBucket
        );
        assert!("drop".parse::<UnseenCategoryPolicy>().is_err());
    }
}
