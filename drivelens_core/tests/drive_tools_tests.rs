mod common;

use std::sync::Arc;

use common::{file, text_file, Call, FakeDrive, Failure, MIB};
use drivelens_core::drive::resolver::{exact_name_query, similar_name_query};
use drivelens_core::drive::render::VALIDATION_MESSAGE;
use drivelens_core::drive::DriveTools;
use drivelens_core::DriveConfig;

const SHEET: &str = "application/vnd.google-apps.spreadsheet";
const DOC: &str = "application/vnd.google-apps.document";

fn tools(fake: FakeDrive) -> (DriveTools, Arc<FakeDrive>) {
    tools_with(fake, DriveConfig::default())
}

fn tools_with(fake: FakeDrive, config: DriveConfig) -> (DriveTools, Arc<FakeDrive>) {
    let fake = Arc::new(fake);
    (DriveTools::new(fake.clone(), config), fake)
}

fn three_files() -> FakeDrive {
    FakeDrive::new()
        .with_file(text_file("f1", "a.txt", "a"), b"a")
        .with_file(text_file("f2", "b.txt", "b"), b"b")
        .with_file(text_file("f3", "c.txt", "c"), b"c")
}

#[tokio::test]
async fn list_returns_page_and_echoes_paging() {
    let (tools, _) = tools(three_files());

    let page = tools.list_files(0, Some(10)).await.unwrap();
    assert_eq!(page["count"], 3);
    assert_eq!(page["offset"], 0);
    assert_eq!(page["limit"], 10);
    assert_eq!(page["data"].as_array().unwrap().len(), 3);
    assert_eq!(page["data"][0]["name"], "a.txt");

    let page = tools.list_files(1, Some(1)).await.unwrap();
    assert_eq!(page["count"], 1);
    assert_eq!(page["data"][0]["id"], "f2");

    let page = tools.list_files(5, Some(10)).await.unwrap();
    assert_eq!(page["count"], 0);
    assert_eq!(page["offset"], 5);
}

#[tokio::test]
async fn list_uses_configured_default_limit() {
    let (tools, fake) = tools(three_files());
    tools.list_files(0, None).await.unwrap();
    assert_eq!(fake.calls(), vec![Call::List { offset: 0, limit: 25 }]);
}

#[tokio::test]
async fn list_echoes_limits_above_one_provider_page() {
    let (tools, fake) = tools(three_files());
    let page = tools.list_files(2, Some(5000)).await.unwrap();
    assert_eq!(page["limit"], 5000);
    assert_eq!(page["offset"], 2);
    assert_eq!(page["count"], 1);
    assert_eq!(fake.calls(), vec![Call::List { offset: 2, limit: 5000 }]);
}

#[tokio::test]
async fn list_failure_is_an_error() {
    let (tools, _) = tools(three_files().failing(Failure::Server));
    assert!(tools.list_files(0, Some(1)).await.is_err());
}

#[tokio::test]
async fn search_with_no_results_names_the_query() {
    let (tools, _) = tools(FakeDrive::new());
    assert_eq!(
        tools.search_files("nonexistent", Some(10)).await,
        "No files found matching query: nonexistent"
    );
}

#[tokio::test]
async fn search_passes_query_through_and_renders_fields() {
    let query = "mimeType='application/pdf'";
    let report = file("search123", "Report.pdf", "application/pdf", Some(10));
    let (tools, fake) = tools(FakeDrive::new().with_search(query, vec![report]));

    let text = tools.search_files(query, None).await;
    assert!(text.contains("ID: search123"));
    assert!(text.contains("Name: Report.pdf"));
    assert!(text.contains("Type: application/pdf"));
    assert!(text.contains("Link: https://drive.google.com/search123"));
    assert!(text.contains("Created: 2024-01-01T00:00:00Z"));
    assert!(text.contains("Modified: 2024-01-02T00:00:00Z"));
    assert_eq!(
        fake.calls(),
        vec![Call::Search {
            query: query.into(),
            max_results: 10
        }]
    );
}

#[tokio::test]
async fn search_failure_is_described() {
    let (tools, _) = tools(FakeDrive::new().failing(Failure::Auth));
    let text = tools.search_files("x", None).await;
    assert!(text.starts_with("Error:"));
    assert!(text.contains("authentication failed"));
}

#[tokio::test]
async fn read_without_id_or_name_makes_no_calls() {
    let (tools, fake) = tools(three_files());
    assert_eq!(tools.read_file(None, None).await, VALIDATION_MESSAGE);
    assert_eq!(tools.read_file(Some("  "), Some("")).await, VALIDATION_MESSAGE);
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn read_text_file_by_id() {
    let content = "Hello, World! This is test content.";
    let (tools, fake) = tools(
        FakeDrive::new().with_file(text_file("test123", "test.txt", content), content.as_bytes()),
    );
    assert_eq!(tools.read_file(Some("test123"), None).await, content);
    assert_eq!(
        fake.calls(),
        vec![
            Call::Metadata("test123".into()),
            Call::Download("test123".into())
        ]
    );
}

#[tokio::test]
async fn read_google_doc_exports_plain_text() {
    let body = "Exported document content from Google Docs";
    let (tools, fake) =
        tools(FakeDrive::new().with_file(file("doc123", "Notes", DOC, None), body.as_bytes()));
    assert_eq!(tools.read_file(Some("doc123"), None).await, body);
    assert!(fake.calls().contains(&Call::Export {
        id: "doc123".into(),
        mime: "text/plain".into()
    }));
}

#[tokio::test]
async fn read_missing_id_reports_not_found_without_download() {
    let (tools, fake) = tools(FakeDrive::new());
    let text = tools.read_file(Some("missing"), None).await;
    assert!(text.contains("File with ID 'missing' not found"));
    assert_eq!(fake.content_calls(), 0);
}

#[tokio::test]
async fn oversized_file_is_refused_before_transfer() {
    let big = file("big1", "huge.log", "text/plain", Some(15 * MIB));
    let (tools, fake) = tools(FakeDrive::new().with_file(big, b"tiny"));
    let text = tools.read_file(Some("big1"), None).await;
    assert!(text.contains("too large to read"));
    assert!(text.contains("15.00 MB"));
    assert!(text.contains("Maximum file size is 10 MB"));
    assert_eq!(fake.content_calls(), 0);
}

#[tokio::test]
async fn unsized_export_over_the_ceiling_is_refused() {
    let body = vec![b'x'; (11 * MIB) as usize];
    let (tools, _) = tools(FakeDrive::new().with_file(file("doc9", "Big doc", DOC, None), &body));
    let text = tools.read_file(Some("doc9"), None).await;
    assert!(text.contains("too large to read"));
    assert!(text.contains("11.00 MB"));
}

#[tokio::test]
async fn spreadsheet_is_unsupported_with_link() {
    let (tools, fake) =
        tools(FakeDrive::new().with_file(file("sheet123", "Budget", SHEET, None), b""));
    let text = tools.read_file(Some("sheet123"), None).await;
    assert!(text.contains(&format!("MIME type '{}'", SHEET)));
    assert!(text.contains("not supported"));
    assert!(text.contains("File ID: sheet123"));
    assert!(text.contains("https://drive.google.com/sheet123"));
    assert_eq!(fake.content_calls(), 0);
}

#[tokio::test]
async fn pdf_is_unsupported() {
    let pdf = file("pdf123", "paper.pdf", "application/pdf", Some(1024));
    let (tools, fake) = tools(FakeDrive::new().with_file(pdf, b"%PDF"));
    let text = tools.read_file(Some("pdf123"), None).await;
    assert!(text.contains("MIME type 'application/pdf'"));
    assert!(text.contains("not supported"));
    assert!(text.contains("pdf123"));
    assert_eq!(fake.content_calls(), 0);
}

#[tokio::test]
async fn transport_failure_names_file_and_operation() {
    let (tools, _) = tools(three_files().failing(Failure::Server));
    let text = tools.read_file(Some("f1"), None).await;
    assert!(text.starts_with("Error: Failed to read file 'f1'"));
    assert!(text.contains("HTTP 500"));
}

#[tokio::test]
async fn id_takes_precedence_over_name() {
    let (tools, fake) = tools(three_files());
    assert_eq!(tools.read_file(Some("f1"), Some("b.txt")).await, "a");
    assert!(fake.search_queries().is_empty());
}

#[tokio::test]
async fn single_exact_match_is_listed_not_read() {
    let hit = text_file("file123", "test.txt", "x");
    let fake = FakeDrive::new()
        .with_file(hit.clone(), b"x")
        .with_search(&exact_name_query("test.txt"), vec![hit]);
    let (tools, fake) = tools(fake);

    let text = tools.read_file(None, Some("test.txt")).await;
    assert!(text.contains("Found 1 file with the exact name"));
    assert!(text.contains("File ID: file123"));
    assert_eq!(fake.content_calls(), 0);
}

#[tokio::test]
async fn single_exact_match_read_when_configured() {
    let hit = text_file("file123", "test.txt", "hello");
    let fake = FakeDrive::new()
        .with_file(hit.clone(), b"hello")
        .with_search(&exact_name_query("test.txt"), vec![hit]);
    let config = DriveConfig {
        auto_read_single_match: true,
        ..DriveConfig::default()
    };
    let (tools, _) = tools_with(fake, config);
    assert_eq!(tools.read_file(None, Some("test.txt")).await, "hello");
}

#[tokio::test]
async fn multiple_exact_matches_list_every_id() {
    let mut older = text_file("file1", "test.txt", "one");
    older.modified_time = Some("2024-01-01T00:00:00Z".into());
    let mut newer = text_file("file2", "test.txt", "two");
    newer.modified_time = Some("2024-05-01T00:00:00Z".into());
    let fake = FakeDrive::new()
        .with_file(older.clone(), b"one")
        .with_file(newer.clone(), b"two")
        .with_search(&exact_name_query("test.txt"), vec![older, newer]);
    let (tools, fake) = tools(fake);

    let text = tools.read_file(None, Some("test.txt")).await;
    assert!(text.contains("Found 2 files with the exact name"));
    assert!(text.contains("File ID: file1"));
    assert!(text.contains("File ID: file2"));
    assert!(text.contains("Please use the 'file_id' parameter"));
    assert!(text.find("file2").unwrap() < text.find("file1").unwrap());
    assert_eq!(fake.search_queries().len(), 1);
    assert_eq!(fake.content_calls(), 0);
}

#[tokio::test]
async fn many_duplicate_names_are_all_listed() {
    let dupes: Vec<_> = (0..60)
        .map(|i| text_file(&format!("dup{:02}", i), "minutes.txt", "x"))
        .collect();
    let fake = FakeDrive::new().with_search(&exact_name_query("minutes.txt"), dupes);
    let (tools, fake) = tools(fake);

    let text = tools.read_file(None, Some("minutes.txt")).await;
    assert!(text.contains("Found 60 files with the exact name 'minutes.txt'"));
    assert!(text.contains("File ID: dup00"));
    assert!(text.contains("File ID: dup59"));
    assert!(fake.calls().contains(&Call::Search {
        query: exact_name_query("minutes.txt"),
        max_results: 1000,
    }));
}

#[tokio::test]
async fn id_from_listing_reads_same_content_as_direct_read() {
    let a = text_file("dup-a", "test.txt", "alpha");
    let b = text_file("dup-b", "test.txt", "beta");
    let fake = FakeDrive::new()
        .with_file(a.clone(), b"alpha")
        .with_file(b.clone(), b"beta")
        .with_search(&exact_name_query("test.txt"), vec![a, b]);
    let (tools, _) = tools(fake);

    let listing = tools.read_file(None, Some("test.txt")).await;
    let id = listing
        .lines()
        .find_map(|l| l.trim().strip_prefix("File ID: "))
        .unwrap()
        .to_string();

    let via_listing = tools.read_file(Some(id.as_str()), None).await;
    let direct = tools.read_file(Some(id.as_str()), Some("ignored.txt")).await;
    assert_eq!(via_listing, direct);
    assert!(via_listing == "alpha" || via_listing == "beta");
}

#[tokio::test]
async fn similar_matches_are_offered_when_no_exact_match() {
    let fake = FakeDrive::new().with_search(
        &similar_name_query("test.txt"),
        vec![
            text_file("s1", "test_file.txt", "1"),
            text_file("s2", "test_document.txt", "2"),
        ],
    );
    let (tools, fake) = tools(fake);

    let text = tools.read_file(None, Some("test.txt")).await;
    assert!(text.contains("No exact match found"));
    assert!(text.contains("found 2 similar file(s)"));
    assert!(text.contains("Name: 'test_file.txt'"));
    assert!(text.contains("Name: 'test_document.txt'"));
    assert_eq!(
        fake.search_queries(),
        vec![
            "name = 'test.txt' and trashed = false".to_string(),
            "name contains 'test' and trashed = false".to_string(),
        ]
    );
}

#[tokio::test]
async fn similar_matches_are_capped() {
    let many = (0..15)
        .map(|i| text_file(&format!("s{}", i), &format!("report_{}.txt", i), "x"))
        .collect();
    let fake = FakeDrive::new().with_search(&similar_name_query("report.txt"), many);
    let config = DriveConfig {
        similar_limit: 3,
        ..DriveConfig::default()
    };
    let (tools, _) = tools_with(fake, config);
    let text = tools.read_file(None, Some("report.txt")).await;
    assert!(text.contains("found 3 similar file(s)"));
}

#[tokio::test]
async fn no_match_at_all() {
    let (tools, fake) = tools(FakeDrive::new());
    let text = tools.read_file(None, Some("nonexistent.txt")).await;
    assert!(text.contains("No files found with the name 'nonexistent.txt'"));
    assert_eq!(fake.search_queries().len(), 2);
}

#[tokio::test]
async fn quotes_in_names_are_escaped() {
    let (tools, fake) = tools(FakeDrive::new());
    tools.read_file(None, Some("Bob's plan.txt")).await;
    assert_eq!(
        fake.search_queries()[0],
        r"name = 'Bob\'s plan.txt' and trashed = false"
    );
}
