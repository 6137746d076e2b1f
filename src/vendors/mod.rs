//! Vendor Extension System for Manufacturer-Specific Answer Handling
//!
//! Some meters report faults in-band: the answer frame is valid, but a value
//! carries an error code instead of a reading. An [`ErrorClassifier`] inspects
//! every decoded answer and turns such values into
//! [`Iec62056Error::Device`](crate::error::Iec62056Error::Device).
//!
//! The classifier is chosen once, when the client is built, through
//! [`ClassifierKind`].

pub mod manufacturer;

use crate::error::{Iec62056Error, Result};
use crate::iec::message::AnswerDataMessage;
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inspects a decoded answer for device-reported faults.
pub trait ErrorClassifier: Send + Sync {
    fn check_for_errors(&self, answer: &AnswerDataMessage) -> Result<()>;
}

/// Accepts every answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopClassifier;

impl ErrorClassifier for NoopClassifier {
    fn check_for_errors(&self, _answer: &AnswerDataMessage) -> Result<()> {
        Ok(())
    }
}

/// Elster LIS-200 volume converters answer a faulty register with `#dddd`
/// in place of the value.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lis200Classifier;

impl Lis200Classifier {
    fn error_code(value: &str) -> Option<&str> {
        let code = value.strip_prefix('#')?;
        (code.len() == 4 && code.bytes().all(|b| b.is_ascii_digit())).then_some(code)
    }
}

impl ErrorClassifier for Lis200Classifier {
    fn check_for_errors(&self, answer: &AnswerDataMessage) -> Result<()> {
        for data_set in &answer.data {
            if let Some(code) = Self::error_code(&data_set.value) {
                warn!(
                    "LIS-200 error {code} at {}",
                    data_set.address.as_deref().unwrap_or("<no address>")
                );
                return Err(Iec62056Error::Device {
                    code: code.to_string(),
                    address: data_set.address.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Registry of classifier implementations selectable from configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Noop,
    Lis200,
}

impl ClassifierKind {
    pub fn build(self) -> Arc<dyn ErrorClassifier> {
        match self {
            ClassifierKind::Noop => Arc::new(NoopClassifier),
            ClassifierKind::Lis200 => Arc::new(Lis200Classifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iec::message::DataSet;

    fn answer(values: &[(&str, &str)]) -> AnswerDataMessage {
        AnswerDataMessage::new(
            values
                .iter()
                .map(|(a, v)| DataSet::with_address(*a, *v))
                .collect(),
        )
    }

    #[test]
    fn test_noop_accepts_everything() {
        let classifier = ClassifierKind::Noop.build();
        assert!(classifier
            .check_for_errors(&answer(&[("1:400.0", "#0013")]))
            .is_ok());
    }

    #[test]
    fn test_lis200_reports_first_error_code() {
        let classifier = ClassifierKind::Lis200.build();
        let err = classifier
            .check_for_errors(&answer(&[
                ("1:310.0", "12.5"),
                ("2:300.0", "#0013"),
                ("3:300.0", "#0014"),
            ]))
            .unwrap_err();
        match err {
            Iec62056Error::Device { code, address } => {
                assert_eq!(code, "0013");
                assert_eq!(address.as_deref(), Some("2:300.0"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_lis200_ignores_non_codes() {
        let classifier = Lis200Classifier;
        assert!(classifier
            .check_for_errors(&answer(&[("a", "#12"), ("b", "#12345"), ("c", "#12a4")]))
            .is_ok());
    }
}
