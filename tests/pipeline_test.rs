//! End-to-end tests from analyzer output on disk to chunk records.

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use layoutchunk::render::{build_records, to_json, ChunkStats, JsonFormat};
use layoutchunk::{
    chunk_file, process_batch, read_content_list, ChunkOptions, ContentListParser, CropScope,
    Delimiter, DocumentInput, PageRasters, ParseOptions, Pipeline, SectionLayout,
};

const CONTENT_LIST: &str = r#"[
    {"type": "text", "text": "Results", "text_level": 1, "bbox": [100, 50, 500, 80], "page_idx": 0},
    {"type": "text", "text": "The measured throughput grows linearly with the number of workers until the disk saturates.", "bbox": [100, 100, 900, 200], "page_idx": 0},
    {"type": "discarded", "text": "Page 1", "bbox": [450, 950, 550, 980], "page_idx": 0},
    {"type": "image", "img_path": "images/fig1.jpg", "image_caption": ["Figure 1: Throughput."], "image_footnote": [], "bbox": [100, 250, 700, 600], "page_idx": 0},
    {"type": "table", "table_body": "<table><tr><td>workers</td><td>MB/s</td></tr></table>", "table_caption": ["Table 1"], "bbox": [100, 100, 900, 300], "page_idx": 1},
    {"type": "equation", "text": "$$t = n / w$$", "bbox": [300, 400, 700, 450], "page_idx": 1},
    {"type": "list", "list_items": ["first point", "second point"], "bbox": [100, 500, 900, 600], "page_idx": 1}
]"#;

fn words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn write_output_dir(root: &Path) -> std::path::PathBuf {
    let dir = root.join("report").join("auto");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("report_content_list.json"), CONTENT_LIST).unwrap();
    dir
}

fn rasters() -> PageRasters {
    PageRasters::new(vec![
        RgbImage::from_pixel(1000, 1400, Rgb([250, 250, 250])),
        RgbImage::from_pixel(1000, 1400, Rgb([240, 240, 240])),
    ])
}

#[test]
fn test_read_and_chunk_output_dir() {
    let root = tempfile::tempdir().unwrap();
    write_output_dir(root.path());

    let content = read_content_list(root.path(), "report", "auto").unwrap();
    assert_eq!(content.len(), 7);

    let options = ChunkOptions::new().with_token_budget(1000).per_unit();
    let output = Pipeline::new(options, ParseOptions::default())
        .with_counter(words)
        .process(&content, &rasters())
        .unwrap();

    // Discarded block dropped, one chunk per remaining unit
    assert_eq!(output.len(), 6);
    let texts = output.texts();
    assert!(texts[0].starts_with("\nResults"));
    assert!(texts[3].contains("<table>"));
    assert!(texts[3].contains("Table 1"));
    assert!(texts[5].contains("first point\nsecond point"));

    // Figure and table are cropped, text is not
    assert!(output.chunks[0].image.is_none());
    assert!(output.chunks[2].image.is_some());
    assert!(output.chunks[3].image.is_some());

    // The long paragraph carries its pixel-space tag
    assert!(texts[1].ends_with("@@1\t100.0\t900.0\t140.0\t280.0##"));
    assert_eq!(output.chunks[1].positions[0].top, 140);
}

#[test]
fn test_merged_chunk_collects_images() {
    let content = layoutchunk::parse_content_list(CONTENT_LIST).unwrap();
    let options = ChunkOptions::new().with_token_budget(1000);

    let output = Pipeline::new(options, ParseOptions::default())
        .with_counter(words)
        .process(&content, &rasters())
        .unwrap();

    assert_eq!(output.len(), 1);
    let image = output.chunks[0].image.as_ref().unwrap();
    // Figure is 600 px wide, table 800 px; both are stacked
    assert_eq!(image.width(), 800);
    assert!(image.height() > 350 + 280);
}

#[test]
fn test_context_attached_to_figure() {
    let content = layoutchunk::parse_content_list(CONTENT_LIST).unwrap();
    let options = ChunkOptions::new()
        .with_token_budget(1000)
        .with_image_context(20)
        .per_unit();
    let parse = ParseOptions::new().with_crop_scope(CropScope::Off);

    let output = Pipeline::new(options, parse)
        .with_counter(words)
        .process(&content, &PageRasters::default())
        .unwrap();

    let figure = output.texts()[2];
    assert!(figure.contains("Results"));
    assert!(figure.contains("disk saturates."));
    assert!(figure.contains("Figure 1: Throughput."));
    // The table after the figure stops the forward scan
    assert!(!figure.contains("<table>"));
}

#[test]
fn test_paper_layout_inlines_tags() {
    let content = layoutchunk::parse_content_list(CONTENT_LIST).unwrap();
    let parse = ParseOptions::new().with_layout(SectionLayout::Paper);
    let sections = Pipeline::new(ChunkOptions::default(), parse).sections(&content, &PageRasters::default());

    assert_eq!(sections.len(), 6);
    assert!(sections[0].text().starts_with("Results@@1\t"));
    assert_eq!(sections[0].tag(), "");
}

#[test]
fn test_records_json_with_children() {
    let root = tempfile::tempdir().unwrap();
    let dir = write_output_dir(root.path());

    let options = ChunkOptions::new()
        .with_token_budget(1000)
        .with_child_delimiter(Delimiter::boundaries_only("\n"));
    let records = chunk_file(dir.join("report_content_list.json"), &rasters(), &options).unwrap();

    assert!(records.len() > 1);
    let parent = records[0].parent.clone().unwrap();
    assert!(records.iter().all(|r| r.parent.as_deref() == Some(parent.as_str())));
    assert!(!records.iter().any(|r| r.content.contains("@@")));

    let stats = ChunkStats::from_records(&records);
    assert_eq!(stats.child_count, records.len());
    assert_eq!(stats.page_count, 2);

    let json = to_json(&records, JsonFormat::Compact).unwrap();
    assert!(json.contains("\"page_num_int\":[1"));
    assert!(json.contains("\"parent\""));
}

#[test]
fn test_lenient_parse_and_records() {
    let json = r#"[
        {"type": "text", "text": "kept text block", "bbox": [0, 0, 100, 100], "page_idx": 0},
        {"type": "text", "text": 42},
        {"type": "unknown_kind", "text": "ignored"}
    ]"#;
    let options = ParseOptions::new().lenient();
    let content = ContentListParser::from_bytes_with_options(json.as_bytes(), options.clone())
        .parse()
        .unwrap();
    assert_eq!(content.len(), 2);

    let output = Pipeline::new(ChunkOptions::default(), options)
        .process(&content, &PageRasters::default())
        .unwrap();
    let records = build_records(&output.chunks, None);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content.trim(), "kept text block");
}

#[test]
fn test_batch_documents() {
    let good = layoutchunk::parse_content_list(CONTENT_LIST).unwrap();
    let docs = vec![
        DocumentInput::new("a", good.clone(), rasters()),
        DocumentInput::new("b", good, PageRasters::default()),
    ];
    let options = ChunkOptions::new().with_token_budget(16);

    let results = process_batch(&docs, &options, &ParseOptions::default(), &words);
    assert_eq!(results.len(), 2);

    let a = results[0].as_ref().unwrap();
    let b = results[1].as_ref().unwrap();
    assert_eq!(a.name, "a");
    // Tags differ in scale, the text around them does not
    let plain = |out: &layoutchunk::DocumentOutput| -> Vec<String> {
        out.chunks.texts().into_iter().map(layoutchunk::remove_tags).collect()
    };
    assert_eq!(plain(a), plain(b));
    assert!(a.chunks.chunks.iter().any(|c| c.image.is_some()));
    assert!(b.chunks.chunks.iter().all(|c| c.image.is_none()));
}

#[test]
fn test_batch_reports_invalid_options_per_document() {
    let docs = vec![DocumentInput::new(
        "doc",
        layoutchunk::parse_content_list(CONTENT_LIST).unwrap(),
        PageRasters::default(),
    )];
    let options = ChunkOptions::new().with_overlap(120);
    let results = process_batch(&docs, &options, &ParseOptions::default(), &words);
    assert!(results[0].is_err());
}
