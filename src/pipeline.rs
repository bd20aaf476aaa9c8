// src/pipeline.rs

use crate::config::Config;
use crate::llm_extract::Extractor;
use crate::order::OrderRecord;
use crate::sheet::{AssemblyReport, assemble_order_sheet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Instrument, error, info, warn};

/// Outcome counts of one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    /// Extraction gave no data; nothing was written.
    pub skipped: usize,
    /// The spreadsheet could not be built or saved.
    pub failed: usize,
}

/// `<output_dir>/<pdf stem><suffix>`
pub fn output_path(output_dir: &Path, pdf: &Path, suffix: &str) -> PathBuf {
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "order".to_string());
    output_dir.join(format!("{stem}{suffix}"))
}

/// PDF files directly inside `dir`, sorted by name.
pub fn list_pdfs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut pdfs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort();
    Ok(pdfs)
}

/// Load the template, project `order` onto its active sheet and save the result.
pub fn fill_workbook(
    template: &Path,
    order: &OrderRecord,
    output: &Path,
) -> Result<AssemblyReport, Box<dyn std::error::Error>> {
    let mut book = umya_spreadsheet::reader::xlsx::read(template)?;
    let report = assemble_order_sheet(book.get_active_sheet_mut(), order);
    umya_spreadsheet::writer::xlsx::write(&book, output)?;
    info!(
        output = %output.display(),
        items = report.items_written,
        trailing_top = report.trailing_top,
        warnings = report.warnings.len(),
        "Created Excel file"
    );
    Ok(report)
}

/// Process every PDF of the input folder. One bad document never stops the batch.
pub async fn run_batch(cfg: &Config) -> Result<BatchSummary, Box<dyn std::error::Error>> {
    let input_dir = Path::new(&cfg.paths.input_dir);
    let template = Path::new(&cfg.paths.template);
    let output_dir = Path::new(&cfg.paths.output_dir);

    if !input_dir.exists() {
        fs::create_dir_all(input_dir)?;
        warn!(
            input_dir = %input_dir.display(),
            "Input folder did not exist and was created; place PDF files there and run again"
        );
        return Ok(BatchSummary::default());
    }
    if !template.is_file() {
        return Err(format!("Template file not found at: {}", template.display()).into());
    }
    fs::create_dir_all(output_dir)?;

    let pdfs = list_pdfs(input_dir)?;
    if pdfs.is_empty() {
        info!(input_dir = %input_dir.display(), "No PDF files found");
        return Ok(BatchSummary::default());
    }
    info!(count = pdfs.len(), "PDF files to process");

    let extractor = Extractor::new(&cfg.llm)?;
    extractor.preflight().await?;

    let mut summary = BatchSummary::default();
    for (idx, pdf) in pdfs.iter().enumerate() {
        let span = tracing::info_span!(
            "pdf",
            n = idx + 1,
            of = pdfs.len(),
            file = %pdf.file_name().unwrap_or_default().to_string_lossy()
        );
        let output = output_path(output_dir, pdf, &cfg.paths.output_suffix);
        match process_document(&extractor, pdf, template, &output)
            .instrument(span)
            .await
        {
            Outcome::Written => summary.processed += 1,
            Outcome::NoData => summary.skipped += 1,
            Outcome::Failed => summary.failed += 1,
        }
    }

    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        failed = summary.failed,
        "All files processed"
    );
    Ok(summary)
}

enum Outcome {
    Written,
    NoData,
    Failed,
}

async fn process_document(
    extractor: &Extractor,
    pdf: &Path,
    template: &Path,
    output: &Path,
) -> Outcome {
    let bytes = match fs::read(pdf) {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "Error reading PDF");
            return Outcome::NoData;
        }
    };

    let order = match extractor.extract(&bytes).await {
        Ok(order) => order,
        Err(e) => {
            error!(error = %e, "Failed to extract data, skipping file");
            return Outcome::NoData;
        }
    };

    match fill_workbook(template, &order, output) {
        Ok(_) => Outcome::Written,
        Err(e) => {
            error!(error = %e, output = %output.display(), "Error creating Excel file");
            Outcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::ItemRecord;
    use crate::sheet::merged_ranges;
    use crate::sheet::template::write_template;

    #[test]
    fn test_output_naming() {
        let out = output_path(
            Path::new("output_excel"),
            Path::new("orders/PO 17.pdf"),
            "_filled_order_note.xlsx",
        );
        assert_eq!(out, PathBuf::from("output_excel/PO 17_filled_order_note.xlsx"));
    }

    #[test]
    fn test_list_pdfs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PDF", "a.pdf", "notes.txt", "c.pdf.bak"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let names: Vec<String> = list_pdfs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.PDF"]);
    }

    #[test]
    fn test_fill_workbook_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.xlsx");
        let output = dir.path().join("out.xlsx");
        write_template(&template).unwrap();

        let order = OrderRecord {
            client: "Kozmetika s.r.o.".into(),
            requirements: "Archív: ÁNO".into(),
            items: vec![ItemRecord::default(); 3],
            ..Default::default()
        };
        let report = fill_workbook(&template, &order, &output).unwrap();
        assert!(report.is_clean(), "{:?}", report.warnings);

        let book = umya_spreadsheet::reader::xlsx::read(&output).unwrap();
        let sheet = book.get_sheet(&0).unwrap();
        assert_eq!(sheet.get_value((3, 3)), "Kozmetika s.r.o.");
        assert_eq!(sheet.get_value((1, 14)), "3.");
        assert_eq!(sheet.get_value((9, 16)), "Expedícia objednávky");
        assert_eq!(merged_ranges(sheet).0.len(), 4);
        // the template itself is untouched
        let blank = umya_spreadsheet::reader::xlsx::read(&template).unwrap();
        assert_eq!(blank.get_sheet(&0).unwrap().get_value((3, 3)), "");
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = fill_workbook(
            &dir.path().join("missing.xlsx"),
            &OrderRecord::default(),
            &dir.path().join("out.xlsx"),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_batch_creates_missing_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.paths.input_dir = dir.path().join("in").to_string_lossy().into_owned();
        let summary = run_batch(&cfg).await.unwrap();
        assert_eq!(summary, BatchSummary::default());
        assert!(dir.path().join("in").is_dir());
    }

    #[tokio::test]
    async fn test_batch_isolates_bad_documents() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("broken.pdf"), b"not a pdf").unwrap();
        fs::write(input.join("empty.pdf"), b"").unwrap();
        let template = dir.path().join("template.xlsx");
        write_template(&template).unwrap();

        let mut cfg = Config::default();
        cfg.paths.input_dir = input.to_string_lossy().into_owned();
        cfg.paths.template = template.to_string_lossy().into_owned();
        cfg.paths.output_dir = dir.path().join("out").to_string_lossy().into_owned();
        cfg.llm.backend = crate::config::LlmBackend::Heuristics;

        let summary = run_batch(&cfg).await.unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                processed: 0,
                skipped: 2,
                failed: 0
            }
        );
    }
}
