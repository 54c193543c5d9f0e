#![cfg(not(tarpaulin_include))]

use docfill::docx::DocxPackage;
use docfill::{loader, resolver, rewriter};
use std::env;
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 || args.len() > 5 {
        eprintln!(
            "Usage: {} <template.docx> <data.xlsx|data.csv> <output.docx> [sources.json]",
            args[0]
        );
        std::process::exit(2);
    }

    let template_path = &args[1];
    let data_path = &args[2];
    let output_path = &args[3];

    let mut source = loader::open_source(data_path)?;

    // Explicit prefix-to-sheet configuration, or every sheet under its own name
    let specs = if args.len() == 5 {
        let text = fs::read_to_string(&args[4])?;
        resolver::specs_from_json(&text)?
    } else {
        resolver::specs_from_sheets(source.as_ref())
    };

    let build = resolver::build_mapping(source.as_mut(), &specs)?;
    for warning in &build.warnings {
        eprintln!("warning: {}", warning);
    }

    let package = DocxPackage::read_file(template_path)?;
    let (package, stats) = rewriter::fill_document(package, &build.mapping)?;
    package.write_file(output_path)?;

    println!(
        "{}: {} tags replaced, {} unresolved",
        output_path, stats.replaced, stats.unresolved
    );

    Ok(())
}
