//! Spending transaction records

use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single spending transaction, as delivered by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique transaction identifier
    pub transaction_id: String,

    /// User or team that made the purchase
    #[serde(default)]
    pub user_id: String,

    /// Purchasing department
    pub department: String,

    /// Borough the spend is attributed to
    #[serde(default)]
    pub borough: String,

    /// Vendor or service provider
    pub vendor: String,

    /// Expense category (software, hardware, services, ...)
    pub category: String,

    /// Transaction amount (USD, non-negative)
    pub amount: f64,

    /// Transaction date
    #[serde(alias = "spending_date")]
    pub date: NaiveDate,

    /// Project or initiative the spend belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    /// Reason given for the expense
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

impl TransactionRecord {
    /// Create a record with the fields the engine requires.
    pub fn new(
        transaction_id: impl Into<String>,
        department: impl Into<String>,
        category: impl Into<String>,
        vendor: impl Into<String>,
        amount: f64,
        date: NaiveDate,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            user_id: String::new(),
            department: department.into(),
            borough: String::new(),
            vendor: vendor.into(),
            category: category.into(),
            amount,
            date,
            project_name: None,
            justification: None,
        }
    }

    /// Parse a record from a JSON payload.
    pub fn from_json(payload: &[u8]) -> Result<Self, ValidationError> {
        let record: Self = serde_json::from_slice(payload)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Check that required fields are present and the amount is usable.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("transaction_id", &self.transaction_id),
            ("department", &self.department),
            ("category", &self.category),
            ("vendor", &self.vendor),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField {
                    transaction_id: self.transaction_id.clone(),
                    field,
                });
            }
        }

        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(ValidationError::InvalidAmount {
                transaction_id: self.transaction_id.clone(),
                amount: self.amount,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn test_valid_record() {
        let record = TransactionRecord::new("tx_1", "Parks", "IT Equipment", "Acme", 120.0, date());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_missing_vendor_is_rejected() {
        let record = TransactionRecord::new("tx_1", "Parks", "IT Equipment", "  ", 120.0, date());
        assert_eq!(
            record.validate(),
            Err(ValidationError::MissingField {
                transaction_id: "tx_1".into(),
                field: "vendor",
            })
        );
    }

    #[test]
    fn test_negative_and_nan_amounts_are_rejected() {
        let negative = TransactionRecord::new("tx_1", "Parks", "IT", "Acme", -1.0, date());
        assert!(matches!(
            negative.validate(),
            Err(ValidationError::InvalidAmount { .. })
        ));

        let nan = TransactionRecord::new("tx_2", "Parks", "IT", "Acme", f64::NAN, date());
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_from_json_accepts_spending_date_alias() {
        let payload = br#"{
            "transaction_id": "TXN12345",
            "department": "Finance",
            "category": "Office Supplies",
            "vendor": "OfficeMax",
            "amount": 1500.0,
            "spending_date": "2025-01-15",
            "borough": "Manhattan",
            "project_name": "Office Upgrade 2025"
        }"#;

        let record = TransactionRecord::from_json(payload).unwrap();
        assert_eq!(record.transaction_id, "TXN12345");
        assert_eq!(record.borough, "Manhattan");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(record.project_name.as_deref(), Some("Office Upgrade 2025"));
        assert!(record.user_id.is_empty());
    }

    #[test]
    fn test_from_json_missing_amount_is_malformed() {
        let payload = br#"{"transaction_id": "t", "department": "HR", "category": "Training",
            "vendor": "Learnly", "date": "2025-01-15"}"#;
        assert!(matches!(
            TransactionRecord::from_json(payload),
            Err(ValidationError::Malformed(_))
        ));
    }
}
