//! Integration tests for ledger-inspector

use ledger_inspector::amount::is_amount;
use ledger_inspector::export::{output_file_name, write_csv, write_csv_file};
use ledger_inspector::lines::reconstruct_lines;
use ledger_inspector::{
    median, parse_pages, parse_source, process_statement, process_statement_mem, Advisory,
    Fragment, FragmentSource, LedgerError, MemorySource, ParseOptions, PdfSource,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::PathBuf;

// Helper to create test fragments
fn make_fragment(text: &str, x: f32, y: f32) -> Fragment {
    Fragment::new(text, x, y)
}

/// A statement line: identifier at the left margin, description words spread
/// between it and the amount at `amount_x`
fn make_row(id: &str, desc: &[&str], amount: &str, amount_x: f32, y: f32) -> Vec<Fragment> {
    let mut out = vec![make_fragment(id, 0.0, y)];
    let step = amount_x / (desc.len() as f32 + 1.0);
    for (i, word) in desc.iter().enumerate() {
        out.push(make_fragment(word, step * (i as f32 + 1.0), y));
    }
    out.push(make_fragment(amount, amount_x, y));
    out
}

/// Build a one-font PDF with each page given as (text, x, y) runs
fn build_pdf(pages: &[Vec<(&str, f32, f32)>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for runs in pages {
        let mut operations = Vec::new();
        for (text, x, y) in runs {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn sample_statement_pdf() -> Vec<u8> {
    build_pdf(&[
        vec![
            ("Fecha: 2024-01-31", 40.0, 760.0),
            ("Account", 40.0, 730.0),
            ("Description", 100.0, 730.0),
            ("1001", 40.0, 700.0),
            ("Office", 100.0, 700.0),
            ("Supplies", 145.0, 700.0),
            ("1,250.00", 400.0, 700.0),
            ("4002", 40.0, 680.0),
            ("Services", 100.0, 680.0),
            ("Revenue", 145.0, 680.0),
            ("980.50", 480.0, 680.0),
            ("Page 1 of 2", 40.0, 40.0),
            ("1", 300.0, 40.0),
        ],
        vec![
            ("5-100", 40.0, 700.0),
            ("Rent", 100.0, 700.0),
            ("2,000.00", 402.0, 700.0),
            ("2-200", 40.0, 680.0),
            ("Payables", 100.0, 680.0),
            ("0.00", 478.0, 680.0),
        ],
    ])
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn test_parse_options_default() {
    let options = ParseOptions::default();
    assert_eq!(options.line_bucket, 3.0);
    assert_eq!(options.skip_markers, vec!["Page", "Fecha"]);
}

// ============================================================================
// Line reconstruction
// ============================================================================

#[test]
fn test_line_grouping_is_order_independent() {
    let fragments = vec![
        make_fragment("1001", 40.0, 700.4),
        make_fragment("Office", 100.0, 699.1),
        make_fragment("120.00", 400.0, 698.6),
        make_fragment("4002", 40.0, 680.0),
        make_fragment("80.00", 480.0, 680.3),
    ];
    let mut shuffled = fragments.clone();
    shuffled.swap(0, 4);
    shuffled.swap(1, 3);

    let a: Vec<String> = reconstruct_lines(fragments, 3.0).iter().map(|l| l.text()).collect();
    let b: Vec<String> = reconstruct_lines(shuffled, 3.0).iter().map(|l| l.text()).collect();
    assert_eq!(a, vec!["1001 Office 120.00", "4002 80.00"]);
    assert_eq!(a, b);
}

// ============================================================================
// Amount predicate
// ============================================================================

#[test]
fn test_amount_predicate_examples() {
    assert!(is_amount("1,234.56"));
    assert!(is_amount("$500"));
    assert!(!is_amount("-"));
    assert!(!is_amount(""));
    assert!(!is_amount("ABC"));
}

#[test]
fn test_median_examples() {
    assert_eq!(median(&[]), 0.0);
    assert_eq!(median(&[5.0]), 5.0);
    assert_eq!(median(&[1.0, 3.0]), 2.0);
    assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
}

// ============================================================================
// Pipeline over pre-extracted fragments
// ============================================================================

#[test]
fn test_cut_point_symmetry() {
    let mut page = Vec::new();
    page.extend(make_row("1001", &[], "1.00", 10.0, 700.0));
    page.extend(make_row("1002", &[], "2.00", 10.0, 690.0));
    page.extend(make_row("2001", &[], "3.00", 50.0, 680.0));
    page.extend(make_row("2002", &[], "4.00", 50.0, 670.0));
    page.extend(make_row("9001", &[], "5.00", 20.0, 660.0));
    page.extend(make_row("9002", &[], "6.00", 40.0, 650.0));

    let statement = parse_pages(vec![page], &ParseOptions::default());
    assert_eq!(statement.calibration.cut_point, 30.0);
    assert!(statement.advisories.is_empty());
    let ids: Vec<&str> = statement
        .rows
        .iter()
        .map(|r| r.identifier_raw.as_str())
        .collect();
    assert_eq!(ids, vec!["1001", "1002", "2001", "2002", "9001", "9002"]);
    assert_eq!(statement.rows[0].debit, Some(1.0));
    assert_eq!(statement.rows[2].credit, Some(3.0));

    let row_9001 = &statement.rows[4];
    assert_eq!(row_9001.identifier_raw, "9001");
    assert_eq!(row_9001.debit, Some(5.0));
    assert_eq!(row_9001.credit, None);
    let row_9002 = &statement.rows[5];
    assert_eq!(row_9002.debit, None);
    assert_eq!(row_9002.credit, Some(6.0));
}

#[test]
fn test_fallback_uses_median_of_all_rows() {
    let mut page = Vec::new();
    page.extend(make_row("2001", &["Loan"], "10.00", 300.0, 700.0));
    page.extend(make_row("3001", &["Equity"], "20.00", 320.0, 680.0));
    page.extend(make_row("8001", &["Other"], "30.00", 500.0, 660.0));

    let statement = parse_pages(vec![page], &ParseOptions::default());
    assert_eq!(statement.calibration.cut_point, 320.0);
    assert!(statement.advisories.contains(&Advisory::DegradedCalibration {
        debit_samples: 0,
        credit_samples: 2,
    }));
    assert_eq!(statement.rows[0].debit, Some(10.0));
    assert_eq!(statement.rows[1].credit, Some(20.0));
    assert_eq!(statement.rows[2].credit, Some(30.0));
}

#[test]
fn test_footer_and_date_rows_filtered() {
    let mut page = Vec::new();
    page.push(make_fragment("Fecha: 2024-01-01", 40.0, 760.0));
    page.push(make_fragment("1,000.00", 350.0, 760.0));
    page.extend(make_row("1001", &["Cash"], "10.00", 300.0, 700.0));
    page.extend(make_row("4001", &["Sales"], "10.00", 400.0, 680.0));
    page.push(make_fragment("Page 1 of 3", 40.0, 30.0));
    page.push(make_fragment("3", 300.0, 30.0));

    let statement = parse_pages(vec![page], &ParseOptions::default());
    assert_eq!(statement.raw_row_count, 4);
    assert_eq!(statement.excluded_row_count, 2);
    let ids: Vec<&str> = statement
        .rows
        .iter()
        .map(|r| r.identifier_raw.as_str())
        .collect();
    assert_eq!(ids, vec!["1001", "4001"]);
}

#[test]
fn test_end_to_end_scenario() {
    let mut page = Vec::new();
    page.push(make_fragment("1001", 5.0, 700.0));
    page.push(make_fragment("Office", 15.0, 700.0));
    page.push(make_fragment("Supplies", 30.0, 700.0));
    page.push(make_fragment("120.00", 50.0, 700.0));
    page.push(make_fragment("4002", 5.0, 680.0));
    page.push(make_fragment("Services", 15.0, 680.0));
    page.push(make_fragment("Revenue", 40.0, 680.0));
    page.push(make_fragment("80.00", 95.0, 680.0));

    let statement = parse_pages(vec![page], &ParseOptions::default());
    assert_eq!(statement.calibration.cut_point, 72.5);
    assert_eq!(statement.rows.len(), 2);
    assert_eq!(statement.rows[0].debit, Some(120.0));
    assert_eq!(statement.rows[0].credit, None);
    assert_eq!(statement.rows[1].debit, None);
    assert_eq!(statement.rows[1].credit, Some(80.0));
}

#[test]
fn test_zero_amount_scenario() {
    let mut page = Vec::new();
    page.extend(make_row("1001", &[], "0.00", 10.0, 700.0));
    page.extend(make_row("2001", &[], "5.00", 90.0, 680.0));

    let statement = parse_pages(vec![page], &ParseOptions::default());
    assert_eq!(statement.calibration.cut_point, 50.0);
    assert_eq!(statement.rows[0].identifier_raw, "1001");
    assert_eq!(statement.rows[0].debit, None);
    assert_eq!(statement.rows[0].credit, None);
    assert_eq!(statement.rows[1].credit, Some(5.0));
    assert!(statement.advisories.is_empty());
}

struct FailingSource;

impl FragmentSource for FailingSource {
    fn page_count(&self) -> u32 {
        3
    }

    fn page_fragments(&self, page: u32) -> Result<Vec<Fragment>, LedgerError> {
        if page == 2 {
            Err(LedgerError::Parse("corrupt content stream".to_string()))
        } else {
            Ok(make_row("1001", &[], "1.00", 10.0, 700.0))
        }
    }
}

#[test]
fn test_extractor_failure_aborts_document() {
    let result = parse_source(&FailingSource, &ParseOptions::default());
    assert!(matches!(result, Err(LedgerError::Parse(_))));
}

#[test]
fn test_memory_source_matches_parse_pages() {
    let pages = vec![
        make_row("1001", &["Cash"], "10.00", 300.0, 700.0),
        make_row("4001", &["Sales"], "10.00", 400.0, 700.0),
    ];
    let from_source =
        parse_source(&MemorySource::new(pages.clone()), &ParseOptions::default()).unwrap();
    let from_pages = parse_pages(pages, &ParseOptions::default());
    assert_eq!(from_source.rows, from_pages.rows);
    assert_eq!(from_source.calibration, from_pages.calibration);
}

// ============================================================================
// PDF input
// ============================================================================

#[test]
fn test_pdf_source_extracts_positions() {
    let pdf = build_pdf(&[vec![("1001", 40.0, 700.0), ("120.00", 400.0, 700.0)]]);
    let source = PdfSource::load_mem(&pdf).unwrap();
    assert_eq!(source.page_count(), 1);

    let fragments = source.page_fragments(1).unwrap();
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].text, "1001");
    assert_eq!((fragments[0].x, fragments[0].y), (40.0, 700.0));
    assert_eq!(fragments[1].text, "120.00");
    assert_eq!((fragments[1].x, fragments[1].y), (400.0, 700.0));
}

#[test]
fn test_process_statement_mem() {
    let statement =
        process_statement_mem(&sample_statement_pdf(), &ParseOptions::default()).unwrap();

    assert_eq!(statement.page_count, 2);
    // debit pool [400, 402], credit pool [480, 478]
    assert_eq!(statement.calibration.cut_point, 440.0);

    let rows: Vec<(&str, Option<f64>, Option<f64>)> = statement
        .rows
        .iter()
        .map(|r| (r.identifier_clean.as_str(), r.debit, r.credit))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("1001", Some(1250.0), None),
            ("4002", None, Some(980.5)),
            ("5100", Some(2000.0), None),
            ("2200", None, None),
        ]
    );
    assert_eq!(statement.rows[0].description, "Office Supplies");
    assert_eq!(statement.excluded_row_count, 1);
}

#[test]
fn test_process_statement_to_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let pdf_path = dir.path().join("march.pdf");
    std::fs::write(&pdf_path, sample_statement_pdf()).unwrap();

    let statement = process_statement(&pdf_path).unwrap();
    let csv_path = output_file_name(&pdf_path);
    assert_eq!(csv_path, dir.path().join("Resultado_march.csv"));
    write_csv_file(&statement.rows, &csv_path).unwrap();

    let text = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(
        lines[0],
        "identifier_original,identifier_clean,description,debit,credit"
    );
    assert_eq!(lines[1], "1001,1001,Office Supplies,1250.0,");
    assert_eq!(lines[4], "2-200,2200,Payables,,");
}

#[test]
fn test_scanned_pdf_rejected() {
    let pdf = build_pdf(&[vec![], vec![]]);
    let result = process_statement_mem(&pdf, &ParseOptions::default());
    assert!(matches!(result, Err(LedgerError::NoTextLayer)));
}

#[test]
fn test_not_a_pdf() {
    let result = process_statement_mem(b"this is not a pdf", &ParseOptions::default());
    assert!(result.is_err());
}

#[test]
fn test_process_statement_nonexistent_file() {
    let result = process_statement(PathBuf::from("/nonexistent/statement.pdf"));
    assert!(result.is_err());
}

#[test]
fn test_write_csv_preserves_order() {
    let pages = vec![[
        make_row("4001", &[], "1.00", 400.0, 700.0),
        make_row("1001", &[], "2.00", 300.0, 690.0),
    ]
    .concat()];
    let statement = parse_pages(pages, &ParseOptions::default());
    let mut buf = Vec::new();
    write_csv(&statement.rows, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let ids: Vec<&str> = text
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap())
        .collect();
    assert_eq!(ids, vec!["4001", "1001"]);
}
