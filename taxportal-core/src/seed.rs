//! Demo data written the first time a collection is read

use chrono::NaiveDate;

use crate::models::{Document, DocumentKind, ReturnStatus, ReturnType, TaxReturn};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn document(id: &str, name: &str, kind: DocumentKind, size_bytes: u64, uploaded: NaiveDate) -> Document {
    Document {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        size_bytes,
        upload_date: uploaded,
        comments: String::new(),
    }
}

/// Returns shown on a fresh install
pub fn seed_returns() -> Vec<TaxReturn> {
    let mut returns = vec![
        TaxReturn {
            id: "1".to_string(),
            name: Some("John Smith".to_string()),
            return_type: ReturnType::Form1040,
            status: ReturnStatus::Completed,
            documents: vec![
                document("1-1", "W2_2023.pdf", DocumentKind::Pdf, 245_760, date(2024, 1, 15)),
                document("1-2", "1099-INT.pdf", DocumentKind::Pdf, 102_400, date(2024, 1, 15)),
            ],
            document_count: 0,
            notes: "Standard deduction, no dependents".to_string(),
            created_date: date(2024, 1, 15),
            last_updated: date(2024, 2, 20),
        },
        TaxReturn {
            id: "2".to_string(),
            name: Some("Johnson & Lee Partners".to_string()),
            return_type: ReturnType::Form1065,
            status: ReturnStatus::InReview,
            documents: vec![
                document("2-1", "K1_Schedules.pdf", DocumentKind::Pdf, 1_048_576, date(2024, 2, 1)),
                document(
                    "2-2",
                    "Partnership_Agreement.docx",
                    DocumentKind::Docx,
                    524_288,
                    date(2024, 2, 1),
                ),
            ],
            document_count: 0,
            notes: "Awaiting final K-1 from second partner".to_string(),
            created_date: date(2024, 2, 1),
            last_updated: date(2024, 3, 5),
        },
        TaxReturn {
            id: "3".to_string(),
            name: Some("Maria Garcia".to_string()),
            return_type: ReturnType::Form1040,
            status: ReturnStatus::Pending,
            documents: vec![document(
                "3-1",
                "Receipts_scan.png",
                DocumentKind::Image,
                3_145_728,
                date(2024, 3, 10),
            )],
            document_count: 0,
            notes: String::new(),
            created_date: date(2024, 3, 10),
            last_updated: date(2024, 3, 10),
        },
    ];

    for r in &mut returns {
        r.document_count = r.documents.len();
    }
    returns
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seed_returns_are_consistent() {
        let returns = seed_returns();
        let ids: HashSet<_> = returns.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), returns.len());
        for r in &returns {
            assert_eq!(r.document_count, r.documents.len());
            assert!(r.created_date <= r.last_updated);
        }
    }
}
