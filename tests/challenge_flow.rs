//! End-to-end challenge scenarios over the scripted page driver.

use std::sync::Arc;

use automation_context::AutomationContext;
use browser_session::{ScriptedPage, ScriptedPageBuilder, ScriptedSessionProvider, SessionProvider};
use challenger_core_types::{AuthorityId, ChallengeStatus, StepOrder, TicketId};
use evidence_store::{EvidenceStore, MemoryEvidenceStore};
use issuer_adapters::{execute_challenge, MeridianParkingAdapter, RetryPolicy};
use recipes::{Recipe, RecipeStatus, Step, StepAction, WaitFor};
use report_sink::{MemorySink, ReportLevel};
use runner::RecipeRunner;

fn search_recipe() -> Recipe {
    let mut recipe = Recipe::new(
        AuthorityId::new("metro-parking"),
        "https://appeals.metro-parking.example/start",
    );
    recipe.status = RecipeStatus::Verified;
    recipe.steps = vec![
        Step::new(StepOrder(1), StepAction::Navigate, "Open the appeal portal")
            .with_value("https://appeals.metro-parking.example/start"),
        Step::new(StepOrder(2), StepAction::Fill, "Enter the PCN number")
            .with_selector("#pcnNumber")
            .with_value("{{pcn_number}}"),
        Step::new(StepOrder(3), StepAction::Fill, "Enter the vehicle registration")
            .with_selector("#vehicleReg")
            .with_value("{{vehicle_registration}}"),
        Step::new(
            StepOrder(4),
            StepAction::Click {
                final_submission: true,
            },
            "Submit the challenge form",
        )
        .with_selector("#submit")
        .with_wait(WaitFor::SelectorVisible {
            selector: "#results".into(),
        }),
    ];
    recipe
}

fn context() -> AutomationContext {
    AutomationContext {
        pcn_number: "PCN123456".into(),
        vehicle_registration: "AB12CDE".into(),
        narrative: "The parking charge was paid in full.".into(),
        ..Default::default()
    }
}

fn harness(
    page: ScriptedPageBuilder,
) -> (
    Arc<ScriptedPage>,
    Arc<ScriptedSessionProvider>,
    Arc<MemoryEvidenceStore>,
    RecipeRunner,
) {
    let page = page.build();
    let provider = Arc::new(ScriptedSessionProvider::new(Arc::clone(&page)));
    let evidence = Arc::new(MemoryEvidenceStore::new());
    let runner = RecipeRunner::new(
        Arc::clone(&provider) as Arc<dyn SessionProvider>,
        Arc::clone(&evidence) as Arc<dyn EvidenceStore>,
    );
    (page, provider, evidence, runner)
}

// A clean run ends SUCCESS with one screenshot per step.
#[tokio::test]
async fn clean_run_succeeds_with_one_screenshot_per_step() {
    let (page, provider, evidence, runner) = harness(ScriptedPage::builder());

    let challenge = runner
        .execute(&search_recipe(), &TicketId("t-100".into()), &context(), false)
        .await
        .unwrap();

    assert_eq!(challenge.status, ChallengeStatus::Success);
    assert_eq!(challenge.evidence.len(), 4);
    assert_eq!(evidence.count(), 4);
    assert_eq!(provider.opened(), 1);

    // Steps ran strictly in recipe order.
    let actions: Vec<String> = page
        .actions()
        .into_iter()
        .filter(|a| !a.starts_with("screenshot"))
        .collect();
    assert_eq!(
        actions,
        vec![
            "navigate:https://appeals.metro-parking.example/start".to_string(),
            "fill:#pcnNumber=PCN123456".to_string(),
            "fill:#vehicleReg=AB12CDE".to_string(),
            "click:#submit".to_string(),
            "wait_selector:#results".to_string(),
        ]
    );
}

// The final wait never resolves; the challenge errors citing step 4,
// with three completed-step screenshots plus the failure capture.
#[tokio::test]
async fn wait_timeout_fails_the_challenge_citing_the_step() {
    let (_page, _provider, evidence, runner) =
        harness(ScriptedPage::builder().fail_wait_on("#results"));

    let challenge = runner
        .execute(&search_recipe(), &TicketId("t-101".into()), &context(), false)
        .await
        .unwrap();

    assert_eq!(challenge.status, ChallengeStatus::Error);
    let reason = challenge.failure_reason.as_deref().unwrap();
    assert!(reason.contains("step 4"), "reason was: {reason}");
    assert!(reason.contains("#results"), "reason was: {reason}");
    assert_eq!(challenge.evidence.len(), 4);
    assert_eq!(evidence.count(), 4);
}

// Dry runs skip the submission but keep the evidence trail.
#[tokio::test]
async fn dry_run_evidence_matches_live_run() {
    let (live_page, _, _, live_runner) = harness(ScriptedPage::builder());
    let live = live_runner
        .execute(&search_recipe(), &TicketId("t-102".into()), &context(), false)
        .await
        .unwrap();

    let (dry_page, _, _, dry_runner) = harness(ScriptedPage::builder());
    let dry = dry_runner
        .execute(&search_recipe(), &TicketId("t-103".into()), &context(), true)
        .await
        .unwrap();

    assert_eq!(dry.status, ChallengeStatus::Pending);
    assert!(live_page.actions().contains(&"click:#submit".to_string()));
    assert!(!dry_page.actions().contains(&"click:#submit".to_string()));
    assert!(live.evidence.len() - dry.evidence.len() <= 1);
}

// A runner handed anything but a Verified recipe refuses before opening a
// session.
#[tokio::test]
async fn non_verified_recipe_opens_zero_sessions() {
    let (_page, provider, _evidence, runner) = harness(ScriptedPage::builder());

    let mut recipe = search_recipe();
    recipe.status = RecipeStatus::PendingReview;
    let result = runner
        .execute(&recipe, &TicketId("t-104".into()), &context(), false)
        .await;

    assert!(result.is_err());
    assert_eq!(provider.opened(), 0);
}

// An unresolvable placeholder aborts the step before it reaches the page.
#[tokio::test]
async fn unresolved_placeholder_never_reaches_the_browser() {
    let (page, _, _, runner) = harness(ScriptedPage::builder());

    let mut recipe = search_recipe();
    recipe.steps.insert(
        3,
        Step::new(StepOrder(4), StepAction::Fill, "Enter the email")
            .with_selector("#email")
            .with_value("{{email}}"),
    );
    recipe.steps[4].order = StepOrder(5);

    // Context has no email.
    let challenge = runner
        .execute(&recipe, &TicketId("t-105".into()), &context(), false)
        .await
        .unwrap();

    assert_eq!(challenge.status, ChallengeStatus::Error);
    assert!(challenge.failure_reason.unwrap().contains("email"));
    assert!(!page
        .actions()
        .iter()
        .any(|action| action.starts_with("fill:#email")));
}

const ANTI_BOT_PAGE: &str = "<h1>Automated activity detected</h1>";
const CLEAN_SEARCH_PAGE: &str = "<div class='charge-summary'>Charge details</div>";

fn meridian_context() -> AutomationContext {
    AutomationContext {
        pcn_number: "MP00000001".into(),
        vehicle_registration: "AB12CDE".into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.test".into(),
        address_line1: "1 Test Street".into(),
        postcode: "TS1 1ST".into(),
        narrative: "The signage was obscured.".into(),
        ..Default::default()
    }
}

fn meridian_over(page: Arc<ScriptedPage>, sink: Arc<MemorySink>) -> MeridianParkingAdapter {
    MeridianParkingAdapter::new(
        Arc::new(ScriptedSessionProvider::new(page)),
        Arc::new(MemoryEvidenceStore::new()),
        sink,
    )
    .with_retry_policy(RetryPolicy {
        max_attempts: 3,
        delay: std::time::Duration::from_millis(1),
    })
}

// Anti-bot interstitial on attempts 1 and 2, success on 3.
#[tokio::test]
async fn anti_bot_interstitial_recovers_within_the_retry_allowance() {
    let page = ScriptedPage::builder()
        .push_content(ANTI_BOT_PAGE)
        .push_content(ANTI_BOT_PAGE)
        .push_content(CLEAN_SEARCH_PAGE)
        .build();
    let sink = MemorySink::new();
    let adapter = meridian_over(page, Arc::clone(&sink));

    let challenge = execute_challenge(
        &adapter,
        &TicketId("t-200".into()),
        &meridian_context(),
        false,
    )
    .await;

    assert_eq!(challenge.status, ChallengeStatus::Success);
    assert_eq!(sink.count_by_action("anti_bot_retrying"), 1);
    assert_eq!(sink.count_by_level(ReportLevel::Error), 0);
}

// Anti-bot on every attempt: the adapter raises, the sink gets exactly
// one exhausted error with attempt=3, the challenge ends ERROR.
#[tokio::test]
async fn anti_bot_exhaustion_raises_and_errors_the_challenge() {
    let page = ScriptedPage::builder()
        .push_content(ANTI_BOT_PAGE)
        .push_content(ANTI_BOT_PAGE)
        .push_content(ANTI_BOT_PAGE)
        .build();
    let sink = MemorySink::new();
    let adapter = meridian_over(page, Arc::clone(&sink));

    let challenge = execute_challenge(
        &adapter,
        &TicketId("t-201".into()),
        &meridian_context(),
        false,
    )
    .await;

    assert_eq!(challenge.status, ChallengeStatus::Error);
    assert_eq!(sink.count_by_action("anti_bot_exhausted"), 1);
    let exhausted = sink
        .reports()
        .into_iter()
        .find(|r| r.action == "anti_bot_exhausted")
        .unwrap();
    assert_eq!(exhausted.attempt, Some(3));
}
