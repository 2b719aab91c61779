// tests/run_isolation.rs
// run_all keeps category passes isolated and fails cleanly when the oracle
// is unconfigured. The first test mutates process env, hence serial.

use std::env;

use gradscout::config::FileConfig;
use gradscout::pipeline::run_all;
use gradscout::JobType;

struct EnvGuard {
    key: &'static str,
    old: Option<String>,
}

impl EnvGuard {
    fn unset(key: &'static str) -> Self {
        let old = env::var(key).ok();
        env::remove_var(key);
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.old {
            Some(v) => env::set_var(self.key, v),
            None => env::remove_var(self.key),
        }
    }
}

#[serial_test::serial]
#[tokio::test]
async fn missing_oracle_key_fails_both_passes_without_scraping() {
    let _guard = EnvGuard::unset("GROQ_API_KEY");
    let dir = tempfile::tempdir().unwrap();

    let results = run_all(
        &[JobType::Ds, JobType::Cs],
        &FileConfig::default(),
        dir.path(),
        false,
    )
    .await;

    assert_eq!(results.len(), 2, "a failed pass must not stop the next");
    assert_eq!(results[0].0, JobType::Ds);
    assert_eq!(results[1].0, JobType::Cs);
    for (_, result) in &results {
        let err = result
            .as_ref()
            .expect_err("pass should fail without GROQ_API_KEY");
        assert!(format!("{err:#}").contains("GROQ_API_KEY"));
    }
    // The failure happened before any artifact or ledger was written.
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn offline_run_all_runs_ds_before_cs() {
    let dir = tempfile::tempdir().unwrap();
    let results = run_all(
        &[JobType::Ds, JobType::Cs],
        &FileConfig::default(),
        dir.path(),
        true,
    )
    .await;

    assert_eq!(results.len(), 2);
    let ds = results[0].1.as_ref().expect("ds pass");
    let cs = results[1].1.as_ref().expect("cs pass");
    assert_eq!(ds.job_type, JobType::Ds);
    assert_eq!(cs.job_type, JobType::Cs);
    assert_eq!(ds.new_postings, 5);
    assert_eq!(cs.new_postings, 6);
}
