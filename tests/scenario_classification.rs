//! End-to-end classification scenarios against fake origin servers.
//!
//! These cover the browserless leg of the pipeline: the pre-check
//! verdicts that decide whether a browser session ever starts, and the
//! reason tags they surface.

use httptest::{matchers::*, responders::*, Expectation, Server};

use domain_recon::precheck::{classify, Precheck};

fn manual_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

// A plain HTML origin goes to the browser untouched.
#[tokio::test]
async fn plain_html_origin_classifies_ok() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/")).respond_with(
            status_code(200)
                .insert_header("Content-Type", "text/html; charset=utf-8")
                .body("<html><body>hi</body></html>"),
        ),
    );

    let outcome = classify(&manual_client(), &server.url("/").to_string(), 15).await;
    assert_eq!(outcome, Precheck::Ok);
}

// An attachment response must never reach a browser.
#[tokio::test]
async fn attachment_origin_is_skipped() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/")).respond_with(
            status_code(200)
                .insert_header("Content-Type", "application/zip")
                .insert_header("Content-Disposition", "attachment; filename=\"f.zip\"")
                .body("PK"),
        ),
    );

    let outcome = classify(&manual_client(), &server.url("/").to_string(), 15).await;
    assert_eq!(outcome, Precheck::Attachment);
    assert_eq!(outcome.reason().as_deref(), Some("attachment"));
}

// A 302 whose target serves HTML resolves to a marketing redirect
// carrying the target as the new start URL.
#[tokio::test]
async fn marketing_redirect_resolves_target() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/")).respond_with(
            status_code(302).insert_header("Location", "/real-landing"),
        ),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/real-landing")).respond_with(
            status_code(200)
                .insert_header("Content-Type", "text/html")
                .body("<html></html>"),
        ),
    );

    let outcome = classify(&manual_client(), &server.url("/").to_string(), 15).await;
    let Precheck::MarketingRedirect(target) = &outcome else {
        panic!("expected MarketingRedirect, got {outcome:?}");
    };
    assert!(target.ends_with("/real-landing"));
    assert_eq!(
        outcome.reason(),
        Some(format!("marketing-redirect({target})"))
    );
}

// A two-node cycle is caught without HTML having been seen.
#[tokio::test]
async fn redirect_cycle_is_reported_as_loop() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/a"))
            .times(1..)
            .respond_with(status_code(302).insert_header("Location", "/b")),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/b"))
            .times(1..)
            .respond_with(status_code(302).insert_header("Location", "/a")),
    );

    let outcome = classify(&manual_client(), &server.url("/a").to_string(), 15).await;
    assert_eq!(outcome, Precheck::RedirectLoop { html_seen: false });
    assert_eq!(outcome.reason().as_deref(), Some("redirect-loop"));
}

// A cycle whose hops hinted at HTML keeps the browser option open.
#[tokio::test]
async fn redirect_cycle_with_html_hint_escalates() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/a"))
            .times(1..)
            .respond_with(
                status_code(302)
                    .insert_header("Location", "/b")
                    .insert_header("Content-Type", "text/html"),
            ),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/b"))
            .times(1..)
            .respond_with(status_code(302).insert_header("Location", "/a")),
    );

    let outcome = classify(&manual_client(), &server.url("/a").to_string(), 15).await;
    assert_eq!(outcome, Precheck::RedirectLoop { html_seen: true });
}

// A redirect into a downloadable asset is pre-resolved, never browsed.
#[tokio::test]
async fn redirect_to_asset_is_skipped_with_final_url() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/")).respond_with(
            status_code(301).insert_header("Location", "/downloads/tool-v2.tar.gz"),
        ),
    );

    let outcome = classify(&manual_client(), &server.url("/").to_string(), 15).await;
    match outcome {
        Precheck::RedirectToFile(url) => assert!(url.ends_with("/downloads/tool-v2.tar.gz")),
        other => panic!("expected RedirectToFile, got {other:?}"),
    }
}

// Chains longer than the hop budget fail fast with the budget in the tag.
#[tokio::test]
async fn chain_beyond_budget_reports_hop_limit() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/hop1"))
            .respond_with(status_code(302).insert_header("Location", "/hop2")),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/hop2"))
            .respond_with(status_code(302).insert_header("Location", "/hop3")),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/hop3"))
            .respond_with(status_code(302).insert_header("Location", "/hop4")),
    );

    let outcome = classify(&manual_client(), &server.url("/hop1").to_string(), 3).await;
    assert_eq!(
        outcome,
        Precheck::HopLimit {
            hops: 3,
            html_seen: false
        }
    );
    assert_eq!(outcome.reason().as_deref(), Some("redirect-loop(3)"));
}
