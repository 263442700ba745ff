use page_map_reduce_core::collaborators::DocumentAssembler;
use page_map_reduce_core::error::CollaboratorError;
use page_map_reduce_core::output_layout::OutputLayout;
use page_map_reduce_text::TextAssembler;

#[tokio::test]
async fn test_assembles_pages_in_numeric_order() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    for (page, text) in [(10, "ten"), (2, "two"), (1, "one")] {
        layout
            .write_page_output("docs/book.txt", page, text)
            .await
            .unwrap();
    }
    layout
        .write_page_output("docs/other.txt", 1, "not mine")
        .await
        .unwrap();

    TextAssembler::new(layout.clone())
        .assemble("docs/book.txt")
        .await
        .unwrap();

    let assembled =
        std::fs::read_to_string(layout.assembled_output_path("docs/book.txt")).unwrap();
    assert_eq!(
        assembled,
        "Part 1: mr-1-book.txt\n\none\n\nPart 2: mr-2-book.txt\n\ntwo\n\nPart 10: mr-10-book.txt\n\nten\n"
    );
    assert!(layout
        .assembled_output_path("docs/book.txt")
        .ends_with("translated_book.txt"));
}

#[tokio::test]
async fn test_nothing_to_assemble() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());

    let err = TextAssembler::new(layout)
        .assemble("book.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, CollaboratorError::NoPageOutputs { .. }));
}

#[tokio::test]
async fn test_reassigned_reduce_rewrites_the_whole_document() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let long_page = "word ".repeat(50_000);
    for page in 1..=4 {
        layout
            .write_page_output("book.txt", page, &long_page)
            .await
            .unwrap();
    }

    let first = TextAssembler::new(layout.clone());
    let second = TextAssembler::new(layout.clone());
    let (a, b) = tokio::join!(first.assemble("book.txt"), second.assemble("book.txt"));
    a.unwrap();
    b.unwrap();

    let assembled = std::fs::read_to_string(layout.assembled_output_path("book.txt")).unwrap();
    assert_eq!(assembled.matches("Part ").count(), 4);
    assert!(assembled.starts_with("Part 1: mr-1-book.txt\n\n"));

    let leftovers: Vec<String> = std::fs::read_dir(layout.dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}
