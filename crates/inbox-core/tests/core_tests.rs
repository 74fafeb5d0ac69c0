use std::fs;

use tempfile::TempDir;

use inbox_core::chunker::{chunk_emails, TextSplitter};
use inbox_core::loader::load_emails;
use inbox_core::types::{Email, Recipients};
use inbox_core::Error;

fn email(id: &str, body: &str) -> Email {
    Email {
        id: id.to_string(),
        thread_id: format!("thread-{id}"),
        from: "alice@example.com".to_string(),
        to: Recipients::Many(vec!["bob@example.com".to_string()]),
        cc: None,
        subject: format!("Subject {id}"),
        body: body.to_string(),
        timestamp: "2024-03-01T10:00:00Z".to_string(),
        in_reply_to: None,
        references: None,
        labels: None,
        arc_id: None,
        phase_id: None,
    }
}

fn numbered_words(n: usize) -> String {
    (0..n).map(|i| format!("word{i:04}")).collect::<Vec<_>>().join(" ")
}

/// Longest prefix of `next` that `prev` ends with.
fn shared_overlap(prev: &str, next: &str) -> usize {
    let chars: Vec<char> = next.chars().collect();
    (0..=chars.len())
        .rev()
        .find(|&k| prev.ends_with(&chars[..k].iter().collect::<String>()))
        .unwrap_or(0)
}

#[test]
fn short_body_is_a_single_chunk() {
    let chunks = chunk_emails(&[email("e1", "A B C D E F G H")]);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].index, 0);
    assert_eq!(chunks[0].total_chunks, 1);
    assert_eq!(chunks[0].chunk, "A B C D E F G H");
}

#[test]
fn blank_body_yields_no_chunks() {
    let chunks = chunk_emails(&[email("e1", ""), email("e2", "   \n\n  ")]);
    assert!(chunks.is_empty());
}

#[test]
fn long_body_respects_size_and_overlap() {
    let body = numbered_words(400);
    let chunks = chunk_emails(&[email("e1", &body)]);

    assert!(chunks.len() >= 3, "expected several chunks, got {}", chunks.len());
    for c in &chunks {
        assert!(c.chunk.chars().count() <= 1000, "chunk {} too long", c.index);
        assert_eq!(c.total_chunks, chunks.len());
    }
    for pair in chunks.windows(2) {
        let overlap = shared_overlap(&pair[0].chunk, &pair[1].chunk);
        assert!((80..=100).contains(&overlap), "overlap {overlap} out of range");
    }
    // Nothing lost: every word shows up in some chunk.
    for i in [0, 199, 399] {
        let w = format!("word{i:04}");
        assert!(chunks.iter().any(|c| c.chunk.contains(&w)), "{w} missing");
    }
}

#[test]
fn chunks_follow_document_order_and_copy_metadata() {
    let long = numbered_words(250);
    let emails = vec![email("e1", &long), email("e2", "short note")];
    let chunks = chunk_emails(&emails);

    let ids: Vec<_> = chunks.iter().map(|c| (c.id.as_str(), c.index)).collect();
    let e1_count = chunks.iter().filter(|c| c.id == "e1").count();
    assert!(e1_count > 1);
    for (pos, (id, index)) in ids.iter().enumerate() {
        if pos < e1_count {
            assert_eq!((*id, *index), ("e1", pos));
        } else {
            assert_eq!((*id, *index), ("e2", 0));
        }
    }
    let last = chunks.last().expect("chunk");
    assert_eq!(last.subject, "Subject e2");
    assert_eq!(last.from, "alice@example.com");
    assert_eq!(last.to, Recipients::Many(vec!["bob@example.com".to_string()]));
    assert_eq!(last.timestamp, "2024-03-01T10:00:00Z");
}

#[test]
fn custom_splitter_sizes_are_honoured() {
    let splitter = TextSplitter::new(200, 20).expect("splitter");
    let chunks = splitter.chunk_emails(&[email("e1", &numbered_words(100))]);
    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.chunk.chars().count() <= 200));
}

#[tokio::test]
async fn load_emails_reads_json_array() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("emails.json");
    fs::write(
        &path,
        r#"[{"id":"1","threadId":"t1","from":"a@x.io","to":"b@x.io","subject":"Hi","body":"Hello","timestamp":"2024-01-01T00:00:00Z","phaseId":2}]"#,
    )
    .unwrap();

    let emails = load_emails(&path).await.expect("load");
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].thread_id, "t1");
    assert_eq!(emails[0].to, Recipients::One("b@x.io".to_string()));
    assert_eq!(emails[0].phase_id, Some(2));
}

#[tokio::test]
async fn load_emails_missing_file_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = load_emails(&tmp.path().join("nope.json")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
