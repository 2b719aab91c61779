// tests/history_ledger.rs
// Multi-day ledger flow: aggregate per-day artifacts, reconcile against the
// ledger, persist, repeat. Day boundaries are simulated with separate
// artifact directories against one shared data dir.

use gradscout::aggregate::combine;
use gradscout::artifact::{read_postings, write_postings};
use gradscout::config::JobType;
use gradscout::dates::PostedDate;
use gradscout::history::{reconcile, HistoryLedger};
use gradscout::posting::JobPosting;

fn posting(company: &str, title: &str, link: &str) -> JobPosting {
    JobPosting {
        company: company.to_string(),
        title: title.to_string(),
        details: "USA".to_string(),
        posted_at: PostedDate::Invalid,
        link: link.to_string(),
        source: "Sequoia".to_string(),
    }
}

#[test]
fn new_postings_shrink_to_the_delta_across_days() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path();
    let exclusions: Vec<String> = vec!["Senior".into()];

    // Day 1: two postings, both unseen.
    let day1 = data.join("CS2025-01-01").join("CSsequoia_jobs_2025-01-01.csv");
    let a = posting("Harvey", "Software Engineer", "https://jobs.example.com/a");
    let b = posting("Glean", "Backend Engineer", "https://jobs.example.com/b");
    write_postings(&day1, &[a.clone(), b.clone()]).unwrap();

    let candidates = combine(&[day1], &exclusions);
    assert_eq!(candidates.len(), 2);
    let ledger = HistoryLedger::load(data, JobType::Cs).unwrap();
    assert!(ledger.is_empty());
    let outcome = reconcile(candidates, ledger);
    assert_eq!(outcome.new_postings.len(), 2);
    outcome.ledger.persist(data, JobType::Cs).unwrap();

    // Day 2: one repeat, one new, one excluded by title.
    let day2 = data.join("CS2025-01-02").join("CSsequoia_jobs_2025-01-02.csv");
    let c = posting("Harvey", "Platform Engineer", "https://jobs.example.com/c");
    let senior = posting("Glean", "Senior Staff Engineer", "https://jobs.example.com/d");
    write_postings(&day2, &[b.clone(), c.clone(), senior]).unwrap();

    let candidates = combine(&[day2.clone()], &exclusions);
    assert_eq!(candidates.len(), 2, "excluded title never reaches the ledger");
    let ledger = HistoryLedger::load(data, JobType::Cs).unwrap();
    assert_eq!(ledger.len(), 2);
    let outcome = reconcile(candidates, ledger);
    assert_eq!(outcome.new_postings.len(), 1);
    assert_eq!(outcome.new_postings[0].link, c.link);
    outcome.ledger.persist(data, JobType::Cs).unwrap();

    // Day 3: nothing new; the ledger stays put and reports an empty delta.
    let candidates = combine(&[day2], &exclusions);
    let ledger = HistoryLedger::load(data, JobType::Cs).unwrap();
    assert_eq!(ledger.len(), 3);
    let outcome = reconcile(candidates, ledger);
    assert!(outcome.new_postings.is_empty());
    outcome.ledger.persist(data, JobType::Cs).unwrap();
    assert_eq!(HistoryLedger::load(data, JobType::Cs).unwrap().len(), 3);
}

#[test]
fn ledger_survives_round_trips_with_commas_and_quotes() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path();

    let tricky = posting(
        "Acme, Inc.",
        "Engineer, Tools & \"Infra\"",
        "https://jobs.example.com/tricky?a=1&b=2",
    );
    let ledger = HistoryLedger::load(data, JobType::Ds).unwrap();
    let outcome = reconcile(vec![tricky.clone()], ledger);
    outcome.ledger.persist(data, JobType::Ds).unwrap();

    let reloaded = HistoryLedger::load(data, JobType::Ds).unwrap();
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded.contains_link(&tricky.link));
    assert_eq!(reloaded.records()[0].company, "Acme, Inc.");
    assert_eq!(reloaded.records()[0].title, "Engineer, Tools & \"Infra\"");
}

#[test]
fn missing_artifacts_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("CSmicrosoft_jobs_2025-01-01.csv");
    let absent = dir.path().join("CSamazon_jobs_2025-01-01.csv");
    write_postings(
        &present,
        &[posting("Microsoft", "Software Engineer", "https://jobs.example.com/ms")],
    )
    .unwrap();

    let rows = combine(&[absent, present.clone()], &[]);
    assert_eq!(rows.len(), 1);
    assert_eq!(read_postings(&present).unwrap().len(), 1);
}

#[test]
fn combining_twice_yields_identical_rows() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("CSsequoia_jobs_2025-01-01.csv");
    let second = dir.path().join("CSmicrosoft_jobs_2025-01-01.csv");
    write_postings(
        &first,
        &[
            posting("Harvey", "Software Engineer", "https://jobs.example.com/a"),
            posting("Glean", "Senior Engineer", "https://jobs.example.com/b"),
        ],
    )
    .unwrap();
    write_postings(
        &second,
        &[posting("Microsoft", "Software Engineer II", "https://jobs.example.com/c")],
    )
    .unwrap();

    let paths = [first, second];
    let exclusions: Vec<String> = vec!["Senior".into()];
    let once = combine(&paths, &exclusions);
    let twice = combine(&paths, &exclusions);
    assert_eq!(once, twice);
    assert_eq!(once.len(), 2);
}

// Two per-source files, one of them missing, one row excluded by title,
// empty prior history: two rows come through and land in the ledger.
#[test]
fn two_file_run_against_an_empty_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path();
    let present = data.join("CS2025-01-01").join("CSsequoia_jobs_2025-01-01.csv");
    let absent = data.join("CS2025-01-01").join("CSamazon_jobs_2025-01-01.csv");
    write_postings(
        &present,
        &[
            posting("Harvey", "Software Engineer", "https://jobs.example.com/a"),
            posting("Glean", "Senior Staff Engineer", "https://jobs.example.com/b"),
            posting("Cohere", "Backend Engineer", "https://jobs.example.com/c"),
        ],
    )
    .unwrap();

    let exclusions: Vec<String> = vec!["Senior".into()];
    let candidates = combine(&[present, absent], &exclusions);
    assert_eq!(candidates.len(), 2);

    let ledger = HistoryLedger::load(data, JobType::Cs).unwrap();
    assert!(ledger.is_empty());
    let outcome = reconcile(candidates, ledger);
    assert_eq!(outcome.new_postings.len(), 2);
    outcome.ledger.persist(data, JobType::Cs).unwrap();

    let reloaded = HistoryLedger::load(data, JobType::Cs).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.contains_link("https://jobs.example.com/a"));
    assert!(reloaded.contains_link("https://jobs.example.com/c"));
}
