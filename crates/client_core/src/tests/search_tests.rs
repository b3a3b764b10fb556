use super::*;
use crate::test_support::ScriptedBackend;

use shared::domain::Metric;

fn sbi_bluechip() -> FundRecord {
    FundRecord {
        scheme_name: Some("SBI Bluechip Fund".into()),
        amc_name: Some("SBI Mutual Fund".into()),
        nav: Some(Metric::Number(45.23)),
        ..FundRecord::default()
    }
}

fn controller_with(backend: ScriptedBackend) -> (Arc<FundSearchController>, Arc<ScriptedBackend>) {
    let backend = Arc::new(backend);
    (FundSearchController::new(backend.clone()), backend)
}

#[tokio::test]
async fn found_results_are_stored_with_success_notice() {
    let (controller, backend) = controller_with(
        ScriptedBackend::new().search_result(FundSearchResponse::found(vec![sbi_bluechip()])),
    );

    let outcome = controller.search("  SBI Bluechip ", SearchType::Nav).await;

    assert_eq!(outcome, SearchOutcome::Found(1));
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.results, vec![sbi_bluechip()]);
    assert_eq!(snapshot.query, "SBI Bluechip");
    assert_eq!(snapshot.search_type, SearchType::Nav);
    assert!(snapshot.has_searched);
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.error, None);
    assert_eq!(
        snapshot.notice,
        Some(Notice {
            kind: NoticeKind::Success,
            text: "Found 1 result(s)".into()
        })
    );

    let requests = backend.search_requests();
    assert_eq!(requests[0].fund_name, "SBI Bluechip");
    assert_eq!(requests[0].search_type, SearchType::Nav);
}

#[tokio::test]
async fn blank_query_is_rejected_before_any_request() {
    let (controller, backend) = controller_with(ScriptedBackend::new());

    assert_eq!(
        controller.search("   ", SearchType::General).await,
        SearchOutcome::Rejected
    );

    let snapshot = controller.snapshot();
    assert!(!snapshot.has_searched);
    assert_eq!(
        snapshot.notice.map(|n| n.text),
        Some("Please enter a fund name to search".to_string())
    );
    assert!(backend.search_requests().is_empty());
}

#[tokio::test]
async fn not_found_uses_backend_message_or_default() {
    let (controller, _backend) = controller_with(
        ScriptedBackend::new()
            .search_result(FundSearchResponse::found(vec![sbi_bluechip()]))
            .search_result(FundSearchResponse::not_found(Some("No scheme named xyz".into())))
            .search_result(FundSearchResponse::not_found(None)),
    );

    controller.search("sbi", SearchType::General).await;
    assert_eq!(
        controller.search("xyz", SearchType::General).await,
        SearchOutcome::NotFound
    );
    let snapshot = controller.snapshot();
    assert!(snapshot.results.is_empty());
    assert_eq!(snapshot.error, None);
    assert_eq!(
        controller.take_notice().map(|n| (n.kind, n.text)),
        Some((NoticeKind::Failure, "No scheme named xyz".to_string()))
    );
    assert_eq!(controller.take_notice(), None);

    controller.search("abc", SearchType::Risk).await;
    assert_eq!(
        controller.take_notice().map(|n| n.text),
        Some("No funds found matching your search".to_string())
    );
}

#[tokio::test]
async fn found_without_results_counts_as_not_found() {
    let (controller, _backend) = controller_with(ScriptedBackend::new().search_result(
        FundSearchResponse {
            found: true,
            results: None,
            error: None,
        },
    ));

    assert_eq!(
        controller.search("axis", SearchType::General).await,
        SearchOutcome::NotFound
    );
}

#[tokio::test]
async fn transport_failure_sets_error_and_clears_results() {
    let (controller, _backend) = controller_with(
        ScriptedBackend::new()
            .search_result(FundSearchResponse::found(vec![sbi_bluechip()]))
            .search_failure(TransportError::Timeout),
    );

    controller.search("sbi", SearchType::General).await;
    let outcome = controller.search("sbi", SearchType::Performance).await;

    assert!(matches!(outcome, SearchOutcome::Failed(_)));
    let snapshot = controller.snapshot();
    assert!(snapshot.results.is_empty());
    assert!(snapshot.error.is_some());
    assert!(!snapshot.is_loading);
    let notice = snapshot.notice.expect("notice");
    assert_eq!(notice.kind, NoticeKind::Failure);
    assert!(notice.text.starts_with("Search failed: "));
}

#[tokio::test]
async fn clear_during_search_discards_result() {
    let backend =
        ScriptedBackend::new().search_result(FundSearchResponse::found(vec![sbi_bluechip()]));
    let release = backend.gate_next_call();
    let (controller, _backend) = controller_with(backend);

    let mut pending = Box::pin(controller.search("sbi", SearchType::General));
    assert!(futures::poll!(&mut pending).is_pending());
    assert!(controller.snapshot().is_loading);

    controller.clear_search();
    release.send(()).expect("release");

    assert_eq!(pending.await, SearchOutcome::Discarded);
    let snapshot = controller.snapshot();
    assert!(snapshot.results.is_empty());
    assert!(!snapshot.has_searched);
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.query, "");
}

#[tokio::test]
async fn newer_search_supersedes_older_one() {
    // Scripted results are handed out in completion order: the newer search
    // settles first.
    let backend = ScriptedBackend::new()
        .search_result(FundSearchResponse::found(vec![sbi_bluechip()]))
        .search_result(FundSearchResponse::not_found(None));
    let release_old = backend.gate_next_call();
    let (controller, _backend) = controller_with(backend);

    let mut old = Box::pin(controller.search("old", SearchType::General));
    assert!(futures::poll!(&mut old).is_pending());

    assert_eq!(
        controller.search("sbi", SearchType::General).await,
        SearchOutcome::Found(1)
    );
    release_old.send(()).expect("release");
    assert_eq!(old.await, SearchOutcome::Discarded);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.query, "sbi");
    assert_eq!(snapshot.results.len(), 1);
    assert!(!snapshot.is_loading);
}
