//! End-to-end pipeline tests against the in-memory repository.

use std::sync::Arc;

use proptest::prelude::*;

use scopus_hal::models::{RecordState, RefDoc, SearchDoc};
use scopus_hal::normalize::normalize_issn;
use scopus_hal::repository::{FacetResult, InMemoryRepository, RefKind};
use scopus_hal::source::{JsonSource, ScopusCsvSource};
use scopus_hal::{AliasTable, LanguageTable, Pipeline, PipelineSettings, ReportSink};

const HEADER: &str = "Authors,Author full names,Author(s) ID,Title,Year,Source title,Volume,Issue,\
Page start,Page end,DOI,Authors with affiliations,Abstract,Author Keywords,Correspondence Address,\
Publisher,ISSN,ISBN,Language of Original Document,Document Type,Conference name,Conference date,\
Conference location,EID";

const CONFERENCE_ROW: &str = "\"Smith J.; Durand P.-A.\",\"Smith, John (1); Durand, Pierre-Alain (2)\",\
1;2,Reliability of systems,2023,Proc. ESREL,,,12,20,10.1/abc,\
\"Smith J., Lab B, Lyon, France; Durand P.-A., Laboratoire Génie Industriel, CentraleSupélec, 91190 Gif-sur-Yvette, France\",\
We study X. © 2023 Elsevier,maintenance; risk,Smith J.; Lab B; email: j@x.com,\
Elsevier,,978-3-16-148410-0,English,Conference paper,ESREL 2023,\
3 September 2023 through 7 September 2023,\"Southampton, UK\",2-s2.0-85000000001";

fn export(rows: &[&str]) -> String {
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text
}

fn lab_b() -> RefDoc {
    RefDoc { docid: "300".into(), label: "Lab B".into(), valid: Some("VALID".into()) }
}

// =============================================================================
// Full runs
// =============================================================================

#[tokio::test]
async fn test_conference_paper_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(InMemoryRepository::new().with_reference(
        RefKind::Structure,
        "text",
        "(Lab B)",
        vec![lab_b()],
    ));
    let settings = PipelineSettings {
        stamps: vec!["CENTRALESUPELEC".into()],
        output_dir: Some(dir.path().to_path_buf()),
        ..PipelineSettings::default()
    };
    let report = ReportSink::create(&dir.path().join("log.csv")).unwrap();
    let mut pipeline =
        Pipeline::new(repo.clone(), settings, AliasTable::new(), LanguageTable::default(), report);

    let text = export(&[CONFERENCE_ROW]);
    let source = ScopusCsvSource::from_reader(text.as_bytes()).unwrap();
    let summary = pipeline.run(source).await.unwrap();
    drop(pipeline);

    assert_eq!(summary.total(), 1);
    assert_eq!(summary.count(RecordState::UploadSuccess), 1);

    let notice =
        std::fs::read_to_string(dir.path().join("TEI").join("2-s2.0-85000000001.xml")).unwrap();
    assert!(notice.contains(r#"<classCode scheme="halTypology" n="COMM"/>"#));
    assert!(notice.contains(r#"<idno type="stamp" n="CENTRALESUPELEC"/>"#));
    assert!(notice.contains(r#"<idno type="doi">10.1/abc</idno>"#));
    assert!(notice.contains(r##"<affiliation ref="#struct-300"/>"##));
    assert!(notice.contains(r##"<affiliation ref="#localStruct-1"/>"##));
    assert!(notice.contains(r#"xml:id="localStruct-1""#));
    assert!(notice.contains(r#"<date type="start">2023-09-03</date>"#));
    assert!(notice.contains("<settlement>Southampton</settlement>"));
    assert!(notice.contains(r#"<country key="gb"/>"#));
    assert!(!notice.contains("978-3-16"));
    assert_eq!(repo.deposits(), vec![notice]);

    let log = std::fs::read_to_string(dir.path().join("log.csv")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "eid,doi,doctype,state,info,hal_matches,corresponding_emails");
    assert_eq!(lines[1], "2-s2.0-85000000001,10.1/abc,COMM,upload-success,hal-00000001,,j@x.com");
}

#[tokio::test]
async fn test_batch_continues_past_bad_records() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(InMemoryRepository::new().with_search(
        "doiId_id",
        "\"10.1/dup\"",
        vec![SearchDoc { uri: "https://hal.science/hal-01".into(), titles: Vec::new() }],
    ));
    let settings =
        PipelineSettings { output_dir: Some(dir.path().to_path_buf()), ..PipelineSettings::default() };
    let mut pipeline = Pipeline::new(
        repo.clone(),
        settings,
        AliasTable::new(),
        LanguageTable::default(),
        ReportSink::new(Vec::new()),
    );

    let source = JsonSource::from_json(
        r#"[
            {"eid": "e-1", "documentType": "Article", "title": "Already there", "doi": "10.1/dup"},
            {"eid": "e-2", "documentType": "Patent", "title": "Not a paper"},
            {"eid": "e-3", "documentType": "Article"},
            {"eid": "e-4", "authors": 12},
            {"eid": "e-5", "documentType": "Review", "title": "Fine"}
        ]"#,
    )
    .unwrap();
    let summary = pipeline.run(source).await.unwrap();

    assert_eq!(summary.total(), 5);
    assert_eq!(summary.count(RecordState::Duplicate), 1);
    assert_eq!(summary.count(RecordState::UnsupportedType), 1);
    assert_eq!(summary.count(RecordState::InvalidRecord), 2);
    assert_eq!(summary.count(RecordState::UploadSuccess), 1);
    assert_eq!(repo.deposits().len(), 1);

    let written: Vec<_> = std::fs::read_dir(dir.path().join("TEI")).unwrap().collect();
    assert_eq!(written.len(), 1);

    let log = String::from_utf8(pipeline.into_report().into_inner().unwrap()).unwrap();
    assert!(log.contains("e-1,10.1/dup,ART,duplicate,doi match,https://hal.science/hal-01,"));
    assert!(log.contains("e-2,,Patent,unsupported-type,"));
    assert!(log.contains("e-3,,Article,invalid-record,missing title"));
}

// =============================================================================
// Enrichment
// =============================================================================

#[tokio::test]
async fn test_curated_author_and_journal_domain() {
    let repo = Arc::new(
        InMemoryRepository::new()
            .with_reference(
                RefKind::Journal,
                "issn_s",
                "\"0951-8320\"",
                vec![RefDoc {
                    docid: "15123".into(),
                    label: "Reliability Engineering & System Safety".into(),
                    valid: Some("VALID".into()),
                }],
            )
            .with_facet(
                "journalId_i",
                "15123",
                FacetResult { num_found: 42, values: vec![("spi.meca".into(), 30)] },
            ),
    );
    let aliases = AliasTable::from_reader(
        "key,forename,affil_id,idHAL,mail\nSmith J.,John,\"200,201\",john-smith,john@lgi.fr\n".as_bytes(),
    )
    .unwrap();
    let settings = PipelineSettings { upload: false, ..PipelineSettings::default() };
    let mut pipeline =
        Pipeline::new(repo.clone(), settings, aliases, LanguageTable::default(), ReportSink::new(Vec::new()));

    let source = JsonSource::from_json(
        r#"[{
            "eid": "e-1",
            "documentType": "Article",
            "title": "Maintenance of wind farms",
            "issn": "9518320",
            "language": "English",
            "authors": [{
                "surname": "Smith",
                "initial": "J.",
                "forename": "John",
                "affiliations": [{"name": "Somewhere unknown"}]
            }]
        }]"#,
    )
    .unwrap();
    let record = source.into_iter().next().unwrap().unwrap();
    let processed = pipeline.process(&record).await.unwrap();

    assert_eq!(processed.state, RecordState::Built);
    let notice = processed.tei.unwrap();
    assert!(notice.contains(r#"<idno type="halJournalId">15123</idno>"#));
    assert!(notice.contains(r#"<classCode scheme="halDomain" n="spi.meca"/>"#));
    assert!(notice.contains(r##"<affiliation ref="#struct-200"/>"##));
    assert!(notice.contains(r##"<affiliation ref="#struct-201"/>"##));
    assert!(notice.contains(r#"<idno type="idhal">john-smith</idno>"#));
    assert!(!notice.contains("<back>"));
    assert!(repo.calls().iter().all(|c| !c.starts_with("ref structure")));
}

#[tokio::test]
async fn test_dry_run_without_duplicate_check_touches_nothing_remote() {
    let repo = Arc::new(InMemoryRepository::new());
    let settings = PipelineSettings {
        upload: false,
        check_duplicates: false,
        create_local_structures: false,
        ..PipelineSettings::default()
    };
    let mut pipeline = Pipeline::new(
        repo.clone(),
        settings,
        AliasTable::new(),
        LanguageTable::default(),
        ReportSink::new(Vec::new()),
    );

    let source = JsonSource::from_json(
        r#"[{"eid": "e-1", "documentType": "Book", "title": "A book", "isbn": "978-1-23; 978-4-56"}]"#,
    )
    .unwrap();
    let summary = pipeline.run(source).await.unwrap();

    assert_eq!(summary.count(RecordState::Built), 1);
    assert!(repo.calls().is_empty());
    assert!(repo.deposits().is_empty());
}

// =============================================================================
// Property tests
// =============================================================================

proptest! {
    #[test]
    fn prop_issn_normalization_is_idempotent(digits in "[0-9]{1,7}[0-9Xx]") {
        if let Some(once) = normalize_issn(&digits) {
            prop_assert_eq!(normalize_issn(&once), Some(once.clone()));
            prop_assert_eq!(once.len(), 9);
        }
    }
}
