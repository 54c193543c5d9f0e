/*!
# Docfill

A document-templating tool that fills placeholder tags in Word documents
from spreadsheet data, built in Rust.

## Overview

Templates are ordinary `.docx` files containing bracketed tags such as
`[Data:A1]` or `[Sales Report (Q1):B12]`. Each tag names a data source by
prefix and a cell by its spreadsheet reference. Docfill loads one or more
tabular sources (workbook sheets or CSV files), builds a key-value mapping
from qualified keys to display strings, and rewrites the document with every
recognized tag replaced by its resolved value. Unresolved tags are left in
place so a reviewer can find and fix them in the output.

## Architecture

Two components, one dependent on the other:

### Tag Resolver
- **Key Components**:
  - Cell value model - Closed variant for text, numbers, booleans, dates and
    blanks with one canonical display rule each
  - Source loaders - Workbook (calamine) and CSV table sources behind one
    `TableSource` trait, injected per request
  - Mapping builder - Walks configured sources in declaration order,
    last-wins on key collisions, skip-and-warn on missing sources
  - TTL cache - Optional bounded memoization of source fetches

### Document Rewriter
- **Key Components**:
  - Package I/O - Reads the docx zip into ordered entries and writes it back,
    untouched entries byte for byte
  - Run scanner - Locates paragraphs and their styled text runs in the main
    document part, including paragraphs nested in table cells
  - Rewrite engine - Concatenates each paragraph's runs, scans the combined
    text for tags (which may span run boundaries), substitutes resolved
    values and collapses the paragraph's text into its first run

## Key behaviors

- Tags split across run boundaries by the authoring tool are still found
- Paragraphs without tags round-trip byte for byte, styling included
- A tag with no matching key degrades to its original bracketed form,
  never an error
- Substituting a paragraph collapses its per-run styling; this is a
  documented simplification, not a defect
- Rewriting the output a second time with the same mapping is a no-op

## Modules

- **cell**: CellValue variant and canonical stringification
- **tag**: cell references, qualified keys and the tag pattern
- **resolver**: Mapping, source configuration and the mapping build
- **loader**: workbook and CSV table sources
- **cache**: bounded TTL memoization for source fetches
- **docx**: docx package I/O and run scanning
- **rewriter**: the tag substitution engine
- **error**: failure taxonomy
- **app**: routing and upload handling (requires the `web` feature)

## Usage

The CLI fills a local template against a local data file:

```text
docfill invoice_template.docx ledger.xlsx invoice.docx sources.json
```

The web application (built with `--features web`) serves an upload form and
a `POST /api/fill` endpoint that returns the rewritten document as a
download.
*/

pub mod cache;
pub mod cell;
pub mod docx;
pub mod error;
pub mod loader;
pub mod resolver;
pub mod rewriter;
pub mod tag;

#[cfg(feature = "web")]
pub mod app;

/// Re-export everything from these modules to make it easier to use
pub use cache::*;
pub use cell::*;
pub use docx::*;
pub use error::*;
pub use loader::*;
pub use resolver::*;
pub use rewriter::*;
pub use tag::*;
