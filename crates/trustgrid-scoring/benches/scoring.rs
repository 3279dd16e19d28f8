//! Scoring benchmarks
//!
//! - Pillar scoring over growing declaration sets
//! - Historical/peer factor computation over a full history buffer

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use trustgrid_common::{
    AdvancedSettings, Agent, Evidence, EvidenceType, ScoringSettings, TrustDeclaration,
};
use trustgrid_scoring::{
    AdvancedScoringEngine, AssessmentStore, InMemoryDeclarationStore, PeerAssessment,
    ScoringContext, TrustScoringEngine,
};

const ASSERTIONS: [&str; 6] = [
    "performance benchmark",
    "bias audit",
    "uptime report",
    "transparency report",
    "security review",
    "gdpr compliance",
];

fn declarations(n: usize) -> Vec<TrustDeclaration> {
    let now = Utc::now();
    (0..n)
        .map(|i| {
            TrustDeclaration::new(
                format!("d{i}"),
                "agent-1",
                ASSERTIONS[i % ASSERTIONS.len()],
                (i % 10) as f64 / 10.0,
            )
            .with_evidence(Evidence::new(EvidenceType::Attestation).with_meta("verified", true))
            .mark_verified(now - Duration::days((i % 45) as i64))
        })
        .collect()
}

fn bench_trust_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("trust_score");
    let engine = TrustScoringEngine::new(
        ScoringSettings::default(),
        Arc::new(InMemoryDeclarationStore::new()),
    )
    .unwrap();

    for size in [10usize, 100, 1000] {
        let decls = declarations(size);
        let now = Utc::now();
        group.bench_with_input(BenchmarkId::new("declarations", size), &decls, |b, decls| {
            b.iter(|| engine.score_declarations(black_box(decls), now));
        });
    }

    group.finish();
}

fn bench_advanced_score(c: &mut Criterion) {
    let store = Arc::new(AssessmentStore::default());
    let engine = AdvancedScoringEngine::new(
        AdvancedSettings::default(),
        ScoringSettings::default(),
        store,
    )
    .unwrap();

    let scoring = TrustScoringEngine::new(
        ScoringSettings::default(),
        Arc::new(InMemoryDeclarationStore::new()),
    )
    .unwrap();
    let base = scoring.score_declarations(&declarations(50), Utc::now());

    for _ in 0..100 {
        engine.record_assessment("agent-1", &base);
    }
    let peers: Vec<String> = (0..20).map(|i| format!("peer-{i}")).collect();
    for peer in &peers {
        engine.record_peer_assessment(PeerAssessment {
            assessor_id: peer.clone(),
            subject_id: "agent-1".to_string(),
            score: 0.75,
            recorded_at: Utc::now(),
        });
    }

    let agent = Agent::new("agent-1", "did:web:agent-1", Utc::now() - Duration::days(400));
    let context = ScoringContext {
        history: None,
        peers: Some(peers),
    };

    c.bench_function("advanced_score/full_history", |b| {
        b.iter(|| engine.compute_advanced_score(black_box(&agent), &base, &context));
    });
}

criterion_group!(benches, bench_trust_score, bench_advanced_score);
criterion_main!(benches);
