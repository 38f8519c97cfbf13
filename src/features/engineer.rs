//! Feature engineering for loan listings

use super::timestamps::{parse_timestamp, whole_days_between, year};
use super::vocabulary::{CategoryGroup, FeatureVocabulary, UnseenCategoryPolicy};
use crate::data::{columns, LoanRecord};
use crate::error::{LoanfundError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Numeric features, in column order
pub const NUMERIC_FEATURES: [&str; 5] = [
    "posted_year",
    "posted_duration",
    "loan_amount",
    "lender_term",
    "num_journal_entries",
];

/// Fixed boolean features, in column order
pub const FLAG_FEATURES: [&str; 4] = [
    "has_borrower_pic",
    "has_female_borrower",
    "direct_distribution",
    "currency_usd",
];

/// Name of the label column in exported tables
pub const LABEL_COLUMN: &str = "funded";

/// Categorical source columns expanded into indicators, with their prefixes
const CATEGORICAL: [(&str, &str); 3] = [
    (columns::SECTOR_NAME, "sector_"),
    (columns::ACTIVITY_NAME, "activity_"),
    (columns::REPAYMENT_INTERVAL, "repayment_"),
];

/// Engineered feature table with its label column
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub feature_names: Vec<String>,
    /// Row-major features, one row per kept record
    pub x: Array2<f64>,
    /// 1.0 = funded, 0.0 otherwise
    pub y: Array1<f64>,
    /// Loan identifiers of the kept rows
    pub ids: Vec<i64>,
    /// Records dropped for missing required fields
    pub n_dropped: usize,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn n_positive(&self) -> usize {
        self.y.iter().filter(|&&v| v > 0.5).count()
    }

    /// Values of one named feature
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.feature_names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.x.column(idx))
    }

    /// Copy of the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            feature_names: self.feature_names.clone(),
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
            ids: indices.iter().map(|&i| self.ids[i]).collect(),
            n_dropped: 0,
        }
    }

    /// Export as a frame: `LOAN_ID`, every feature, then the label
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut cols: Vec<Column> = Vec::with_capacity(self.n_features() + 2);
        cols.push(Column::new(columns::LOAN_ID.into(), self.ids.as_slice()));
        for (idx, name) in self.feature_names.iter().enumerate() {
            let values: Vec<f64> = self.x.column(idx).to_vec();
            cols.push(Column::new(name.as_str().into(), values));
        }
        cols.push(Column::new(LABEL_COLUMN.into(), self.y.to_vec()));
        Ok(DataFrame::new(cols)?)
    }
}

/// Required fields of a record, borrowed; `None` when any is missing
struct CompleteRecord<'a> {
    loan_id: i64,
    posted_time: &'a str,
    planned_expiration_time: &'a str,
    loan_amount: f64,
    lender_term: f64,
    num_journal_entries: f64,
    categories: [&'a str; 3],
    borrower_pictured: Option<&'a str>,
    borrower_genders: Option<&'a str>,
    distribution_model: &'a str,
    currency: &'a str,
    funded: bool,
}

impl<'a> CompleteRecord<'a> {
    fn from_record(record: &'a LoanRecord, require_status: bool) -> Option<Self> {
        if require_status && record.status.is_none() {
            return None;
        }
        Some(Self {
            loan_id: record.loan_id,
            posted_time: record.posted_time.as_deref()?,
            planned_expiration_time: record.planned_expiration_time.as_deref()?,
            loan_amount: record.loan_amount?,
            lender_term: record.lender_term?,
            num_journal_entries: record.num_journal_entries?,
            categories: [
                record.sector_name.as_deref()?,
                record.activity_name.as_deref()?,
                record.repayment_interval.as_deref()?,
            ],
            borrower_pictured: record.borrower_pictured.as_deref(),
            borrower_genders: record.borrower_genders.as_deref(),
            distribution_model: record.distribution_model.as_deref()?,
            currency: record.currency.as_deref()?,
            funded: record.is_funded(),
        })
    }
}

/// Turns loan records into a model-ready [`FeatureMatrix`].
///
/// `fit` learns the indicator vocabulary; `transform` applies it. The input
/// records are never modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEngineer {
    policy: UnseenCategoryPolicy,
    vocabulary: Option<FeatureVocabulary>,
}

impl FeatureEngineer {
    pub fn new(policy: UnseenCategoryPolicy) -> Self {
        Self {
            policy,
            vocabulary: None,
        }
    }

    /// Engineer that applies an already fitted vocabulary
    pub fn from_vocabulary(vocabulary: FeatureVocabulary) -> Self {
        Self {
            policy: vocabulary.policy,
            vocabulary: Some(vocabulary),
        }
    }

    pub fn vocabulary(&self) -> Option<&FeatureVocabulary> {
        self.vocabulary.as_ref()
    }

    /// Learn indicator columns from the complete rows of `records`
    pub fn fit(&mut self, records: &[LoanRecord]) -> Result<&mut Self> {
        let complete: Vec<CompleteRecord<'_>> = records
            .iter()
            .filter_map(|r| CompleteRecord::from_record(r, true))
            .collect();

        if complete.is_empty() {
            return Err(LoanfundError::DataError(
                "no record has every required field".to_string(),
            ));
        }

        let groups = CATEGORICAL
            .iter()
            .enumerate()
            .map(|(g, (column, prefix))| {
                CategoryGroup::fit(column, prefix, complete.iter().map(|r| r.categories[g]), self.policy)
            })
            .collect();

        let vocabulary = FeatureVocabulary::new(groups, self.policy);
        info!(
            indicators = vocabulary.width(),
            rows = complete.len(),
            "Fitted feature vocabulary"
        );
        self.vocabulary = Some(vocabulary);
        Ok(self)
    }

    /// Engineer labeled rows; rows missing any required field (status included) are dropped
    pub fn transform(&self, records: &[LoanRecord]) -> Result<FeatureMatrix> {
        self.engineer(records, true)
    }

    /// Engineer rows for scoring; a missing status does not drop the row
    pub fn transform_unlabeled(&self, records: &[LoanRecord]) -> Result<FeatureMatrix> {
        self.engineer(records, false)
    }

    pub fn fit_transform(&mut self, records: &[LoanRecord]) -> Result<FeatureMatrix> {
        self.fit(records)?;
        self.transform(records)
    }

    /// Feature names in column order
    pub fn feature_names(&self) -> Result<Vec<String>> {
        let vocabulary = self.vocabulary.as_ref().ok_or(LoanfundError::ModelNotFitted)?;
        let mut names: Vec<String> = NUMERIC_FEATURES
            .iter()
            .chain(FLAG_FEATURES.iter())
            .map(|s| s.to_string())
            .collect();
        names.extend(vocabulary.feature_names());
        Ok(names)
    }

    fn engineer(&self, records: &[LoanRecord], require_status: bool) -> Result<FeatureMatrix> {
        let vocabulary = self.vocabulary.as_ref().ok_or(LoanfundError::ModelNotFitted)?;
        let feature_names = self.feature_names()?;
        let n_features = feature_names.len();
        let fixed = NUMERIC_FEATURES.len() + FLAG_FEATURES.len();

        let complete: Vec<CompleteRecord<'_>> = records
            .iter()
            .filter_map(|r| CompleteRecord::from_record(r, require_status))
            .collect();
        let n_dropped = records.len() - complete.len();
        if n_dropped > 0 {
            debug!(dropped = n_dropped, "Dropped records with missing required fields");
        }

        let mut x = Array2::zeros((complete.len(), n_features));
        let mut y = Array1::zeros(complete.len());
        let mut ids = Vec::with_capacity(complete.len());

        for (i, record) in complete.iter().enumerate() {
            let posted = parse_timestamp(record.posted_time).ok_or_else(|| {
                LoanfundError::TimestampParse {
                    column: columns::POSTED_TIME.to_string(),
                    value: record.posted_time.to_string(),
                }
            })?;
            let expiration = parse_timestamp(record.planned_expiration_time).ok_or_else(|| {
                LoanfundError::TimestampParse {
                    column: columns::PLANNED_EXPIRATION_TIME.to_string(),
                    value: record.planned_expiration_time.to_string(),
                }
            })?;

            let mut row = x.row_mut(i);
            let row = row
                .as_slice_mut()
                .ok_or_else(|| LoanfundError::DataError("non-contiguous feature row".to_string()))?;

            row[0] = f64::from(year(&posted));
            row[1] = whole_days_between(&posted, &expiration) as f64;
            row[2] = record.loan_amount;
            row[3] = record.lender_term;
            row[4] = record.num_journal_entries;

            row[5] = flag(record.borrower_pictured.is_some_and(|s| s.contains("true")));
            row[6] = flag(record.borrower_genders.is_some_and(|s| s.contains("female")));
            row[7] = flag(record.distribution_model == "direct");
            row[8] = flag(record.currency == "USD");

            vocabulary.encode(&record.categories, &mut row[fixed..])?;

            y[i] = flag(record.funded);
            ids.push(record.loan_id);
        }

        info!(
            rows = complete.len(),
            dropped = n_dropped,
            features = n_features,
            "Engineered features"
        );

        Ok(FeatureMatrix {
            feature_names,
            x,
            y,
            ids,
            n_dropped,
        })
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, sector: &str, status: &str) -> LoanRecord {
        LoanRecord {
            loan_id: id,
            posted_time: Some("2014-03-01 10:00:00.000 +0000".to_string()),
            planned_expiration_time: Some("2014-03-31 09:00:00.000 +0000".to_string()),
            loan_amount: Some(400.0),
            lender_term: Some(14.0),
            num_journal_entries: Some(1.0),
            sector_name: Some(sector.to_string()),
            activity_name: Some("Farming".to_string()),
            repayment_interval: Some("monthly".to_string()),
            borrower_pictured: Some("true".to_string()),
            borrower_genders: Some("male, female".to_string()),
            distribution_model: Some("field_partner".to_string()),
            currency: Some("USD".to_string()),
            status: Some(status.to_string()),
        }
    }

    #[test]
    fn test_derived_features() {
        let records = vec![record(1, "Food", "funded"), record(2, "Retail", "expired")];
        let mut engineer = FeatureEngineer::new(UnseenCategoryPolicy::Reject);
        let features = engineer.fit_transform(&records).unwrap();

        assert_eq!(features.n_rows(), 2);
        assert_eq!(features.column("posted_year").unwrap()[0], 2014.0);
        // 29 days and 23 hours
        assert_eq!(features.column("posted_duration").unwrap()[0], 29.0);
        assert_eq!(features.column("has_borrower_pic").unwrap()[0], 1.0);
        assert_eq!(features.column("has_female_borrower").unwrap()[0], 1.0);
        assert_eq!(features.column("direct_distribution").unwrap()[0], 0.0);
        assert_eq!(features.column("currency_usd").unwrap()[0], 1.0);
        assert_eq!(features.y.to_vec(), vec![1.0, 0.0]);
        assert_eq!(features.ids, vec![1, 2]);
    }

    #[test]
    fn test_feature_order() {
        let records = vec![record(1, "Retail", "funded"), record(2, "Food", "expired")];
        let mut engineer = FeatureEngineer::new(UnseenCategoryPolicy::Reject);
        let features = engineer.fit_transform(&records).unwrap();

        assert_eq!(
            &features.feature_names[9..],
            &[
                "sector_food",
                "sector_retail",
                "activity_farming",
                "repayment_monthly"
            ]
        );
        assert_eq!(features.column("sector_retail").unwrap().to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_case_sensitive_flags() {
        let mut r = record(1, "Food", "funded");
        r.borrower_pictured = Some("TRUE".to_string());
        r.borrower_genders = None;
        r.distribution_model = Some("Direct".to_string());
        r.currency = Some("usd".to_string());

        let mut engineer = FeatureEngineer::new(UnseenCategoryPolicy::Reject);
        let features = engineer.fit_transform(&[r]).unwrap();
        for name in FLAG_FEATURES {
            assert_eq!(features.column(name).unwrap()[0], 0.0, "{name}");
        }
    }

    #[test]
    fn test_drops_incomplete_rows() {
        let mut missing_amount = record(2, "Food", "funded");
        missing_amount.loan_amount = None;
        let mut missing_status = record(3, "Food", "funded");
        missing_status.status = None;
        let mut missing_picture = record(4, "Food", "funded");
        missing_picture.borrower_pictured = None;

        let records = vec![record(1, "Food", "funded"), missing_amount, missing_status, missing_picture];
        let mut engineer = FeatureEngineer::new(UnseenCategoryPolicy::Reject);
        let features = engineer.fit_transform(&records).unwrap();

        assert_eq!(features.ids, vec![1, 4]);
        assert_eq!(features.n_dropped, 2);
        assert_eq!(features.column("has_borrower_pic").unwrap()[1], 0.0);
    }

    #[test]
    fn test_negative_duration_passes_through() {
        let mut r = record(1, "Food", "funded");
        r.planned_expiration_time = Some("2014-02-20 10:00:00.000 +0000".to_string());
        let mut engineer = FeatureEngineer::new(UnseenCategoryPolicy::Reject);
        let features = engineer.fit_transform(&[r]).unwrap();
        assert_eq!(features.column("posted_duration").unwrap()[0], -9.0);
    }

    #[test]
    fn test_expiration_just_before_posting() {
        let mut r = record(1, "Food", "funded");
        r.planned_expiration_time = Some("2014-03-01 09:00:00.000 +0000".to_string());
        let mut engineer = FeatureEngineer::new(UnseenCategoryPolicy::Reject);
        let features = engineer.fit_transform(&[r]).unwrap();
        assert_eq!(features.column("posted_duration").unwrap()[0], -1.0);
    }

    #[test]
    fn test_bad_timestamp() {
        let mut r = record(1, "Food", "funded");
        r.posted_time = Some("03/01/2014".to_string());
        let mut engineer = FeatureEngineer::new(UnseenCategoryPolicy::Reject);
        let err = engineer.fit_transform(&[r]).unwrap_err();
        assert!(matches!(err, LoanfundError::TimestampParse { .. }));
    }

    #[test]
    fn test_transform_requires_fit() {
        let engineer = FeatureEngineer::new(UnseenCategoryPolicy::Reject);
        let err = engineer.transform(&[record(1, "Food", "funded")]).unwrap_err();
        assert!(matches!(err, LoanfundError::ModelNotFitted));
    }

    #[test]
    fn test_unseen_category_at_scoring() {
        let mut engineer = FeatureEngineer::new(UnseenCategoryPolicy::Reject);
        engineer.fit(&[record(1, "Food", "funded")]).unwrap();
        let err = engineer.transform(&[record(2, "Housing", "funded")]).unwrap_err();
        assert!(matches!(err, LoanfundError::UnseenCategory { .. }));

        let mut engineer = FeatureEngineer::new(UnseenCategoryPolicy::ZeroFill);
        engineer.fit(&[record(1, "Food", "funded")]).unwrap();
        let features = engineer.transform(&[record(2, "Housing", "funded")]).unwrap();
        assert_eq!(features.column("sector_food").unwrap()[0], 0.0);
    }

    #[test]
    fn test_unlabeled_keeps_missing_status() {
        let mut engineer = FeatureEngineer::new(UnseenCategoryPolicy::Reject);
        engineer.fit(&[record(1, "Food", "funded")]).unwrap();

        let mut r = record(2, "Food", "funded");
        r.status = None;
        let features = engineer.transform_unlabeled(&[r]).unwrap();
        assert_eq!(features.n_rows(), 1);
        assert_eq!(features.y[0], 0.0);
    }

    #[test]
    fn test_select_rows_and_export() {
        let records = vec![
            record(1, "Food", "funded"),
            record(2, "Retail", "expired"),
            record(3, "Food", "funded"),
        ];
        let mut engineer = FeatureEngineer::new(UnseenCategoryPolicy::Reject);
        let features = engineer.fit_transform(&records).unwrap();

        let subset = features.select_rows(&[2, 0]);
        assert_eq!(subset.ids, vec![3, 1]);
        assert_eq!(subset.n_rows(), 2);

        let df = features.to_dataframe().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), features.n_features() + 2);
        assert!(df.column(LABEL_COLUMN).is_ok());
    }
}
