//! Integration tests for ladder acceptance, pagination and record output.
//!
//! Passes are scripted fakes; everything downstream of them is real.

use async_trait::async_trait;
use docsift_core::{
    Category, EscalationEngine, ExtractionPass, FixedSpaceGauge, InputUnit, Ladder, Method,
    PageRef, PaginationMode, PaginationPolicy, PassContext, PassFailure, PassOutcome,
    QuarantineManager, ReasonCode, RecordWriter, Reliability, ReliabilityScorer, TextUnit,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const PROSE: &str = "The report of the committee was sent to all of the members \
                     and it was read with great interest by each of them. ";

/// Produces one unit per scripted page, scored by the real scorer.
struct PagesPass {
    method: Method,
    pages: Vec<String>,
}

#[async_trait]
impl ExtractionPass for PagesPass {
    fn method(&self) -> Method {
        self.method
    }

    async fn attempt(
        &self,
        unit: &InputUnit,
        _ctx: PassContext<'_>,
    ) -> Result<PassOutcome, PassFailure> {
        let scorer = ReliabilityScorer::default();
        let units = self
            .pages
            .iter()
            .enumerate()
            .map(|(i, text)| {
                TextUnit::new(
                    unit.file_name(),
                    PageRef::Index(i as u32 + 1),
                    text.clone(),
                    self.method,
                    scorer.score(text, self.method),
                )
            })
            .collect();
        Ok(PassOutcome::new(units).with_page_count(self.pages.len()))
    }
}

/// Scores every page with a fixed value.
struct FixedPass {
    method: Method,
    pages: usize,
    score: f64,
}

#[async_trait]
impl ExtractionPass for FixedPass {
    fn method(&self) -> Method {
        self.method
    }

    async fn attempt(
        &self,
        unit: &InputUnit,
        _ctx: PassContext<'_>,
    ) -> Result<PassOutcome, PassFailure> {
        let units = (1..=self.pages)
            .map(|i| {
                TextUnit::new(
                    unit.file_name(),
                    PageRef::Index(i as u32),
                    format!("page {} text", i),
                    self.method,
                    Reliability::new(self.score),
                )
            })
            .collect();
        Ok(PassOutcome::new(units).with_page_count(self.pages))
    }
}

fn input(dir: &Path, name: &str, bytes: usize) -> InputUnit {
    let path = dir.join(name);
    std::fs::write(&path, vec![b'x'; bytes]).unwrap();
    InputUnit::from_path(path, Category::Paginated).unwrap()
}

fn engine(dir: &Path) -> EscalationEngine {
    EscalationEngine::new(dir)
        .with_space_gauge(Arc::new(FixedSpaceGauge(u64::MAX)))
        .with_timeout(Duration::from_secs(5))
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

/// Dense page plus blank page: small, native, one whole-document row.
#[tokio::test]
async fn test_native_document_with_blank_page_is_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let unit = input(dir.path(), "report.pdf", 50_000);

    let ladder = Ladder::new()
        .rung(
            Arc::new(PagesPass {
                method: Method::PaginatedText,
                pages: vec![PROSE.repeat(8), String::new()],
            }),
            0.40,
        )
        .rung(
            Arc::new(FixedPass { method: Method::OcrPass1, pages: 2, score: 0.9 }),
            0.65,
        );

    let accepted = engine(dir.path()).escalate(&unit, &ladder).await.unwrap();
    assert_eq!(accepted.method, Method::PaginatedText);

    let policy = PaginationPolicy::default();
    let decision = policy.decide(
        accepted.outcome.page_count.unwrap_or(1),
        unit.size_bytes,
        accepted.outcome.total_chars(),
        accepted.outcome.used_visual_recognition(),
    );
    assert_eq!(decision.mode, PaginationMode::WholeDocument);

    let rows = policy.apply(&decision, accepted.outcome, "report.pdf", accepted.method, accepted.score);
    let csv_path = dir.path().join("out").join("report.csv");
    let mut writer = RecordWriter::open(&csv_path, false, false).unwrap();
    writer.write_units(&rows).unwrap();

    let written = read_rows(&csv_path);
    assert_eq!(written.len(), 1);
    assert_eq!(written[0][0], "report.pdf");
    assert_eq!(written[0][1], "-");
    assert_eq!(written[0][3], "paginated-text");
    assert_eq!(written[0][4], "false");
}

/// Image-only pages accepted by the first visual rung: one row per page.
#[tokio::test]
async fn test_scanned_document_is_per_page_ocr_rows() {
    let dir = tempfile::tempdir().unwrap();
    let unit = input(dir.path(), "scan.pdf", 80_000);

    let ladder = Ladder::new()
        .rung(
            Arc::new(PagesPass { method: Method::PaginatedText, pages: vec![String::new(); 10] }),
            0.75,
        )
        .rung(
            Arc::new(FixedPass { method: Method::OcrPass1, pages: 10, score: 0.68 }),
            0.65,
        );

    let accepted = engine(dir.path()).escalate(&unit, &ladder).await.unwrap();
    assert_eq!(accepted.method, Method::OcrPass1);

    let policy = PaginationPolicy::default();
    let decision = policy.decide(10, unit.size_bytes, accepted.outcome.total_chars(), true);
    assert_eq!(decision.mode, PaginationMode::PerPage);

    let rows = policy.apply(&decision, accepted.outcome, "scan.pdf", accepted.method, accepted.score);
    let csv_path = dir.path().join("scan.csv");
    let mut writer = RecordWriter::open(&csv_path, false, false).unwrap();
    writer.write_units(&rows).unwrap();

    let written = read_rows(&csv_path);
    assert_eq!(written.len(), 10);
    for (i, row) in written.iter().enumerate() {
        assert_eq!(row[1], (i + 1).to_string());
        assert_eq!(row[3], "OCR-pass-1");
        assert_eq!(row[4], "true");
        assert_eq!(row[5], "0.68");
    }
}

/// Blank document below every cutoff ends in review with pass_exhausted.
#[tokio::test]
async fn test_blank_document_is_quarantined() {
    let dir = tempfile::tempdir().unwrap();
    let unit = input(dir.path(), "blank.pdf", 1_000);

    let ladder = Ladder::new()
        .rung(Arc::new(PagesPass { method: Method::PaginatedText, pages: vec![String::new(); 3] }), 0.75)
        .rung(Arc::new(PagesPass { method: Method::OcrPass1, pages: vec!["~ ~".to_string(); 3] }), 0.65)
        .rung(Arc::new(PagesPass { method: Method::OcrPass2, pages: vec![String::new(); 3] }), 0.55);

    let failed = engine(dir.path()).escalate(&unit, &ladder).await.unwrap_err();
    assert_eq!(failed.reason, ReasonCode::PassExhausted);

    let out = dir.path().join("out");
    let manager = QuarantineManager::new(&out, "Mandatory Review");
    manager.quarantine(&unit.path, failed.reason, &failed.note).unwrap();

    assert!(!unit.path.exists());
    let records = manager.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].reason_code, ReasonCode::PassExhausted);
    assert!(records[0].note.contains("paginated-text"));
}

/// Low scratch space stops before any visual rung runs.
#[tokio::test]
async fn test_low_space_quarantines_without_visual_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let unit = input(dir.path(), "big.pdf", 1_000);

    let ladder = Ladder::new()
        .rung(Arc::new(PagesPass { method: Method::PaginatedText, pages: vec![String::new()] }), 0.75)
        .rung(Arc::new(FixedPass { method: Method::OcrPass1, pages: 1, score: 0.99 }), 0.65);

    let failed = engine(dir.path())
        .with_space_gauge(Arc::new(FixedSpaceGauge(500_000_000)))
        .escalate(&unit, &ladder)
        .await
        .unwrap_err();

    assert_eq!(failed.reason, ReasonCode::LowScratchSpace);
    assert_eq!(failed.reports.len(), 2);
    assert!(failed.reports.iter().all(|r| r.method != Method::OcrPass2));
}
