use ledger_inspector::extractor::extract_fragments;
use ledger_inspector::lines::reconstruct_lines;
use ledger_inspector::rows::classify_line;
use ledger_inspector::{ParseOptions, Side};
use std::env;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: debug_rows <pdf_path> [max_page | min-max]");
        std::process::exit(1);
    }

    let range = args.get(2).map(|s| s.as_str()).unwrap_or("1-3");
    let (min_page, max_page) = if let Some((a, b)) = range.split_once('-') {
        (a.parse().unwrap_or(1), b.parse().unwrap_or(3))
    } else {
        (1, range.parse().unwrap_or(3))
    };

    let pages = match extract_fragments(&args[1]) {
        Ok(pages) => pages,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let bucket = ParseOptions::default().line_bucket;

    for (idx, fragments) in pages.into_iter().enumerate() {
        let page = idx as u32 + 1;
        if page < min_page || page > max_page {
            continue;
        }
        println!("=== PAGE {} ({} fragments) ===", page, fragments.len());
        for line in reconstruct_lines(fragments, bucket) {
            let cells: Vec<String> = line
                .fragments
                .iter()
                .map(|f| format!("{:?}@{:.1}", f.text, f.x))
                .collect();
            let tag = match classify_line(&line, page) {
                Some(row) => match Side::from_identifier(&row.identifier_raw) {
                    Some(Side::Debit) => "ROW debit-pool",
                    Some(Side::Credit) => "ROW credit-pool",
                    None => "ROW",
                },
                None => "   ",
            };
            println!("  y={:7.1} {:<15} {}", line.y, tag, cells.join(" "));
        }
        println!();
    }
}
