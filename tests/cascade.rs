use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mathroute::{
    CollaboratorError, Confidence, ErrorKind, GeneratedAnswer, IdentityTable, InMemoryKnowledgeBase,
    KbHit, KnowledgeBase, LanguageModel, ResultSource, Router, RouterConfig, SolveError,
    SolveResult, Solver, SolverDispatcher, Stage, StageOutcome, WebSearch,
};

/// Knowledge base that returns a fixed hit and counts searches.
struct FixedKb {
    confidence: f32,
    calls: AtomicUsize,
}

impl FixedKb {
    fn new(confidence: f32) -> Arc<Self> {
        Arc::new(Self {
            confidence,
            calls: AtomicUsize::new(0),
        })
    }
}

impl KnowledgeBase for FixedKb {
    fn search(&self, _text: &str) -> Result<Option<KbHit>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(KbHit {
            answer: "I'm not sure the answer is 42".to_string(),
            steps: vec!["looked it up".to_string()],
            solution: "42".to_string(),
            confidence: Confidence::new(self.confidence).unwrap(),
            topic: "General".to_string(),
            difficulty: "Easy".to_string(),
        }))
    }
}

struct SlowKb;

impl KnowledgeBase for SlowKb {
    fn search(&self, _text: &str) -> Result<Option<KbHit>, CollaboratorError> {
        thread::sleep(Duration::from_millis(500));
        Ok(None)
    }
}

struct PanickingKb;

impl KnowledgeBase for PanickingKb {
    fn search(&self, _text: &str) -> Result<Option<KbHit>, CollaboratorError> {
        panic!("index corrupted")
    }
}

/// Solver that delegates to the real dispatcher and counts calls.
struct CountingSolver {
    inner: SolverDispatcher,
    calls: AtomicUsize,
}

impl CountingSolver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SolverDispatcher::new(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Solver for CountingSolver {
    fn solve(&self, normalized: &str) -> Result<SolveResult, SolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.solve(normalized)
    }
}

struct FixedLlm {
    solution: &'static str,
}

impl LanguageModel for FixedLlm {
    fn generate(&self, _question: &str) -> Result<Option<GeneratedAnswer>, CollaboratorError> {
        Ok(Some(GeneratedAnswer {
            answer: format!("I apologize for the delay. The answer is {}", self.solution),
            steps: vec!["reasoned".to_string()],
            solution: self.solution.to_string(),
            confidence: Confidence::new(0.85).unwrap(),
        }))
    }
}

struct DownWeb;

impl WebSearch for DownWeb {
    fn search_and_generate(&self, _text: &str) -> Result<Option<GeneratedAnswer>, CollaboratorError> {
        Err(CollaboratorError::unavailable("web_search", "connection refused"))
    }
}

struct UsefulWeb;

impl WebSearch for UsefulWeb {
    fn search_and_generate(&self, _text: &str) -> Result<Option<GeneratedAnswer>, CollaboratorError> {
        Ok(Some(GeneratedAnswer {
            answer: "From the web: 4".to_string(),
            steps: Vec::new(),
            solution: "4".to_string(),
            confidence: Confidence::new(0.85).unwrap(),
        }))
    }
}

fn quick_config() -> RouterConfig {
    RouterConfig {
        collaborator_timeout_ms: 50,
        ..RouterConfig::default()
    }
}

#[test]
fn confident_kb_hit_skips_the_solver() {
    let kb = FixedKb::new(0.95);
    let solver = CountingSolver::new();
    let router = Router::builder()
        .knowledge_base(kb.clone())
        .solver(solver.clone())
        .build()
        .unwrap();

    let r = router.route("solve x + 2 = 5");
    assert_eq!(r.source, ResultSource::KnowledgeBase);
    assert_eq!(r.answer, "the answer is 42");
    assert_eq!(kb.calls.load(Ordering::SeqCst), 1);
    assert_eq!(solver.calls(), 0);
}

#[test]
fn kb_threshold_is_strict() {
    let kb = FixedKb::new(0.85);
    let solver = CountingSolver::new();
    let router = Router::builder()
        .knowledge_base(kb)
        .solver(solver.clone())
        .build()
        .unwrap();

    let outcome = router.route_with_trace("solve x + 2 = 5");
    assert_eq!(outcome.result.source, ResultSource::Solver);
    assert_eq!(outcome.result.solution, "x = 3");
    assert_eq!(solver.calls(), 1);
    assert!(matches!(
        outcome.trace.outcome(Stage::KnowledgeBase),
        Some(StageOutcome::BelowThreshold { .. })
    ));
}

#[test]
fn rejected_questions_reach_no_collaborator() {
    let kb = FixedKb::new(0.99);
    let solver = CountingSolver::new();
    let router = Router::builder()
        .knowledge_base(kb.clone())
        .solver(solver.clone())
        .build()
        .unwrap();

    let r = router.route("what is the weather today");
    assert_eq!(r.source, ResultSource::None);
    assert_eq!(kb.calls.load(Ordering::SeqCst), 0);
    assert_eq!(solver.calls(), 0);
}

#[test]
fn slow_kb_times_out_and_cascade_continues() {
    let router = Router::builder()
        .config(quick_config())
        .knowledge_base(Arc::new(SlowKb))
        .build()
        .unwrap();

    let outcome = router.route_with_trace("2+2");
    assert_eq!(outcome.result.solution, "4");
    assert_eq!(
        outcome.trace.outcome(Stage::KnowledgeBase).and_then(StageOutcome::error_kind),
        Some(ErrorKind::CollaboratorUnavailable)
    );
}

#[test]
fn panicking_kb_is_isolated() {
    let router = Router::builder()
        .knowledge_base(Arc::new(PanickingKb))
        .build()
        .unwrap();

    let r = router.route("derivative of x^3");
    assert_eq!(r.solution, "3*x**2");
    assert!(!r.answer.contains("index corrupted"));
}

#[test]
fn verified_llm_answer_gets_high_confidence() {
    let router = Router::builder()
        .language_model(Arc::new(FixedLlm { solution: "x = 3" }))
        .build()
        .unwrap();

    let r = router.route("solve x + 2 = 5");
    assert_eq!(r.source, ResultSource::Llm);
    assert_eq!(r.confidence, Confidence::VERIFIED);
    assert_eq!(r.answer, "for the delay. The answer is x = 3");
}

#[test]
fn unverified_llm_answer_is_downgraded_not_dropped() {
    let router = Router::builder()
        .language_model(Arc::new(FixedLlm { solution: "x = 4" }))
        .build()
        .unwrap();

    let outcome = router.route_with_trace("solve x + 2 = 5");
    assert_eq!(outcome.result.source, ResultSource::Llm);
    assert_eq!(outcome.result.confidence, Confidence::UNVERIFIED);
    assert_eq!(outcome.result.solution, "x = 4");
    assert!(matches!(
        outcome.trace.outcome(Stage::Llm),
        Some(StageOutcome::Downgraded {
            kind: ErrorKind::VerificationFailed,
            ..
        })
    ));
}

#[test]
fn failing_web_search_is_skipped() {
    let router = Router::builder()
        .web_search(Arc::new(DownWeb))
        .build()
        .unwrap();

    let outcome = router.route_with_trace("2+2");
    assert_eq!(outcome.result.source, ResultSource::Solver);
    assert_eq!(
        outcome.trace.stage_order(),
        vec![Stage::Guardrail, Stage::WebSearch, Stage::Solver]
    );
}

#[test]
fn web_search_runs_before_the_solver() {
    let solver = CountingSolver::new();
    let router = Router::builder()
        .web_search(Arc::new(UsefulWeb))
        .solver(solver.clone())
        .build()
        .unwrap();

    let r = router.route("2+2");
    assert_eq!(r.source, ResultSource::WebSearch);
    assert_eq!(r.confidence.value(), 0.85);
    assert_eq!(solver.calls(), 0);
}

#[test]
fn identity_table_is_consulted_after_the_solver() {
    let solver = CountingSolver::new();
    let router = Router::builder().solver(solver.clone()).build().unwrap();

    let outcome = router.route_with_trace("What is the Laplace transform of t^3?");
    assert_eq!(outcome.result.source, ResultSource::IdentityTable);
    assert_eq!(outcome.result.confidence, Confidence::ONE);
    assert_eq!(outcome.result.answer, "The Laplace transform of t^3 is 6 / s^4.");
    assert_eq!(solver.calls(), 1);
    assert_eq!(
        outcome.trace.stage_order(),
        vec![Stage::Guardrail, Stage::Solver, Stage::IdentityTable]
    );
}

#[test]
fn solver_wins_over_a_matching_identity_entry() {
    let table = IdentityTable::from_json_str(
        r#"[{"pattern": "x + 2 = 5", "answer": "three", "solution": "x = 3"}]"#,
    )
    .unwrap();
    let router = Router::builder().identity_table(table).build().unwrap();

    let r = router.route("solve x + 2 = 5");
    assert_eq!(r.source, ResultSource::Solver);
    assert_eq!(r.confidence, Confidence::EQUATION);
}

#[test]
fn config_file_points_at_an_identity_table() {
    let dir = tempfile::tempdir().unwrap();
    let table_path = dir.path().join("identities.json");
    std::fs::write(
        &table_path,
        r#"[{"pattern": "golden ratio", "answer": "(1 + sqrt(5))/2", "solution": "1.618033988749895"}]"#,
    )
    .unwrap();
    let config_path = dir.path().join("mathroute.toml");
    std::fs::write(
        &config_path,
        format!(
            "kb_threshold = 0.5\ncollaborator_timeout_ms = 200\nidentity_table = {:?}\n",
            table_path.display().to_string()
        ),
    )
    .unwrap();

    let config = RouterConfig::load(&config_path).unwrap();
    assert_eq!(config.collaborator_timeout_ms, 200);
    let router = Router::builder().config(config).build().unwrap();

    let r = router.route("compute the golden ratio");
    assert_eq!(r.source, ResultSource::IdentityTable);
    assert_eq!(r.solution, "1.618033988749895");
    // The bundled table is replaced, not merged.
    assert_eq!(router.route("laplace transform of t^3").source, ResultSource::None);
}

#[test]
fn missing_identity_table_fails_the_build() {
    let config = RouterConfig {
        identity_table: Some("/nonexistent/identities.json".into()),
        ..RouterConfig::default()
    };
    assert!(Router::builder().config(config).build().is_err());
}

#[test]
fn in_memory_kb_end_to_end() {
    let kb = InMemoryKnowledgeBase::from_json_str(
        r#"[{
            "question": "What is the integral of 1/x?",
            "answer": "The integral of 1/x is ln|x| + C.",
            "steps": ["Recall d/dx ln|x| = 1/x"],
            "solution": "ln|x| + C",
            "topic": "Calculus"
        }]"#,
    )
    .unwrap();
    let router = Router::builder().knowledge_base(Arc::new(kb)).build().unwrap();

    let r = router.route("what is the integral of 1/x");
    assert_eq!(r.source, ResultSource::KnowledgeBase);
    assert_eq!(r.solution, "ln|x| + C");
}

#[test]
fn trace_records_request_metadata() {
    let router = Router::new().unwrap();
    let outcome = router.route_with_trace("solve 2x = 4");
    assert_eq!(outcome.trace.normalized, "2*x = 4");
    assert_eq!(outcome.trace.accepted_stage(), Some(Stage::Solver));

    let json = serde_json::to_value(&outcome).unwrap();
    assert!(json["trace"]["request_id"].is_string());
    assert_eq!(json["result"]["solution"], "x = 2");
}

#[test]
fn router_is_shareable_across_threads() {
    let router = Arc::new(Router::new().unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let router = Arc::clone(&router);
            thread::spawn(move || router.route(&format!("{i}+{i}")).solution)
        })
        .collect();
    let answers: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(answers, vec!["0", "2", "4", "6"]);
}
