//! Typed loan listing records

use crate::error::{LoanfundError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source column names
pub mod columns {
    pub const LOAN_ID: &str = "LOAN_ID";
    pub const STATUS: &str = "STATUS";
    pub const POSTED_TIME: &str = "POSTED_TIME";
    pub const PLANNED_EXPIRATION_TIME: &str = "PLANNED_EXPIRATION_TIME";
    pub const LOAN_AMOUNT: &str = "LOAN_AMOUNT";
    pub const LENDER_TERM: &str = "LENDER_TERM";
    pub const NUM_JOURNAL_ENTRIES: &str = "NUM_JOURNAL_ENTRIES";
    pub const SECTOR_NAME: &str = "SECTOR_NAME";
    pub const ACTIVITY_NAME: &str = "ACTIVITY_NAME";
    pub const REPAYMENT_INTERVAL: &str = "REPAYMENT_INTERVAL";
    pub const BORROWER_PICTURED: &str = "BORROWER_PICTURED";
    pub const BORROWER_GENDERS: &str = "BORROWER_GENDERS";
    pub const DISTRIBUTION_MODEL: &str = "DISTRIBUTION_MODEL";
    pub const CURRENCY: &str = "CURRENCY";

    /// Every column the feature engineer reads (LOAN_ID is optional, STATUS
    /// only when training)
    pub const CONSUMED: [&str; 13] = [
        STATUS,
        POSTED_TIME,
        PLANNED_EXPIRATION_TIME,
        LOAN_AMOUNT,
        LENDER_TERM,
        NUM_JOURNAL_ENTRIES,
        SECTOR_NAME,
        ACTIVITY_NAME,
        REPAYMENT_INTERVAL,
        BORROWER_PICTURED,
        BORROWER_GENDERS,
        DISTRIBUTION_MODEL,
        CURRENCY,
    ];
}

/// Status value marking a funded loan
pub const FUNDED_STATUS: &str = "funded";

/// One loan listing as read from the source table.
///
/// Every field except the identifier may be missing; the feature engineer
/// decides which gaps drop the row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoanRecord {
    pub loan_id: i64,
    pub posted_time: Option<String>,
    pub planned_expiration_time: Option<String>,
    pub loan_amount: Option<f64>,
    pub lender_term: Option<f64>,
    pub num_journal_entries: Option<f64>,
    pub sector_name: Option<String>,
    pub activity_name: Option<String>,
    pub repayment_interval: Option<String>,
    pub borrower_pictured: Option<String>,
    pub borrower_genders: Option<String>,
    pub distribution_model: Option<String>,
    pub currency: Option<String>,
    pub status: Option<String>,
}

impl LoanRecord {
    /// True when the listing was funded
    pub fn is_funded(&self) -> bool {
        self.status.as_deref() == Some(FUNDED_STATUS)
    }

    /// Convert a loaded frame into records.
    ///
    /// Fails when a consumed column is absent. A missing `LOAN_ID` column falls
    /// back to the row position.
    pub fn from_frame(df: &DataFrame) -> Result<Vec<LoanRecord>> {
        Self::convert(df, true)
    }

    /// Like [`from_frame`](Self::from_frame) for listings still to be scored:
    /// the `STATUS` column may be absent, leaving every status `None`.
    pub fn from_frame_unlabeled(df: &DataFrame) -> Result<Vec<LoanRecord>> {
        Self::convert(df, false)
    }

    fn convert(df: &DataFrame, require_status: bool) -> Result<Vec<LoanRecord>> {
        use columns::*;

        let n = df.height();
        let ids: Vec<i64> = if df.column(LOAN_ID).is_ok() {
            int_column(df, LOAN_ID)?
                .into_iter()
                .enumerate()
                .map(|(i, v)| v.unwrap_or(i as i64))
                .collect()
        } else {
            (0..n as i64).collect()
        };

        let posted = string_column(df, POSTED_TIME)?;
        let expiration = string_column(df, PLANNED_EXPIRATION_TIME)?;
        let amount = float_column(df, LOAN_AMOUNT)?;
        let term = float_column(df, LENDER_TERM)?;
        let journal = float_column(df, NUM_JOURNAL_ENTRIES)?;
        let sector = string_column(df, SECTOR_NAME)?;
        let activity = string_column(df, ACTIVITY_NAME)?;
        let repayment = string_column(df, REPAYMENT_INTERVAL)?;
        let pictured = string_column(df, BORROWER_PICTURED)?;
        let genders = string_column(df, BORROWER_GENDERS)?;
        let distribution = string_column(df, DISTRIBUTION_MODEL)?;
        let currency = string_column(df, CURRENCY)?;
        let status = if require_status || df.column(STATUS).is_ok() {
            string_column(df, STATUS)?
        } else {
            vec![None; n]
        };

        let mut records = Vec::with_capacity(n);
        for i in 0..n {
            records.push(LoanRecord {
                loan_id: ids[i],
                posted_time: posted[i].clone(),
                planned_expiration_time: expiration[i].clone(),
                loan_amount: amount[i],
                lender_term: term[i],
                num_journal_entries: journal[i],
                sector_name: sector[i].clone(),
                activity_name: activity[i].clone(),
                repayment_interval: repayment[i].clone(),
                borrower_pictured: pictured[i].clone(),
                borrower_genders: genders[i].clone(),
                distribution_model: distribution[i].clone(),
                currency: currency[i].clone(),
                status: status[i].clone(),
            });
        }

        Ok(records)
    }
}

/// Shape and label counts of a loaded table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<String>,
    /// STATUS value counts; missing statuses are counted under `"<missing>"`
    pub status_counts: BTreeMap<String, usize>,
    pub n_funded: usize,
}

impl DatasetSummary {
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let statuses = string_column(df, columns::STATUS)?;
        let mut status_counts = BTreeMap::new();
        let mut n_funded = 0;
        for status in &statuses {
            let key = status.clone().unwrap_or_else(|| "<missing>".to_string());
            if key == FUNDED_STATUS {
                n_funded += 1;
            }
            *status_counts.entry(key).or_insert(0) += 1;
        }

        Ok(Self {
            n_rows: df.height(),
            n_cols: df.width(),
            columns: df
                .get_column_names()
                .into_iter()
                .map(|s| s.to_string())
                .collect(),
            status_counts,
            n_funded,
        })
    }

    /// Fraction of rows whose status is funded
    pub fn funded_rate(&self) -> f64 {
        if self.n_rows == 0 {
            0.0
        } else {
            self.n_funded as f64 / self.n_rows as f64
        }
    }
}

fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    let column = df
        .column(name)
        .map_err(|_| LoanfundError::ColumnNotFound(name.to_string()))?;
    Ok(column.as_materialized_series())
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let cast = series(df, name)?.cast(&DataType::String)?;
    let values = cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let cast = series(df, name)?.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

fn int_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let cast = series(df, name)?.cast(&DataType::Int64)?;
    Ok(cast.i64()?.into_iter().collect())
}
