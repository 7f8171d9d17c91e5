use chrono::{TimeZone, Utc};
use serde_json::json;
use sovereign_canonical::{
    AgentId, Canonicalizer, Jurisdiction, KeyId, Nonce, Timestamp, TraceId,
};
use sovereign_core::{
    Details, EventEnvelope, EventName, EventSigner, KeyRing, ManualClock, SignedEvent,
    SigningKey,
};
use sovereign_store::{event_hash, HashChainLedger, LineageTracer, MemoryBackend};
use std::sync::Arc;

struct Fixture {
    ledger: Arc<HashChainLedger<MemoryBackend>>,
    backend: MemoryBackend,
    clock: ManualClock,
    signer: EventSigner,
    nonce: u32,
}

impl Fixture {
    fn new() -> Self {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap());
        let backend = MemoryBackend::new();
        let ledger = Arc::new(
            HashChainLedger::open_with_clock(backend.clone(), Arc::new(clock.clone())).unwrap(),
        );
        let signer = EventSigner::new(KeyRing::new(
            SigningKey::new(KeyId::new("v1"), vec![0x11; 32]).unwrap(),
        ));
        Self {
            ledger,
            backend,
            clock,
            signer,
            nonce: 0,
        }
    }

    /// Appends one event one second after the previous one.
    fn emit(&mut self, trace: &str, name: EventName) -> u64 {
        self.clock.advance(chrono::Duration::seconds(1));
        self.nonce += 1;
        let envelope = EventEnvelope {
            trace_id: TraceId::new(trace),
            timestamp: Timestamp::from_datetime(self.clock_now()),
            agent_id: AgentId::new("router"),
            jurisdiction: Jurisdiction::new("UK"),
            event_name: name,
            request_hash: "h".repeat(64),
            nonce: Nonce::new(format!("nonce-{}", self.nonce)),
            details: Details::new(),
        };
        self.ledger
            .append_event(self.signer.sign_event(envelope).unwrap())
            .unwrap()
    }

    fn clock_now(&self) -> chrono::DateTime<Utc> {
        use sovereign_core::Clock;
        self.clock.now()
    }

    fn tracer(&self) -> LineageTracer<MemoryBackend> {
        LineageTracer::new(Arc::clone(&self.ledger))
    }
}

#[test]
fn test_history_is_ordered_and_isolated() {
    let mut fx = Fixture::new();
    fx.emit("T1", EventName::QueryReceived);
    fx.emit("T2", EventName::QueryReceived);
    fx.emit("T1", EventName::JurisdictionResolved);
    fx.emit("T2", EventName::TraceCompleted);
    fx.emit("T1", EventName::DecisionExplained);

    let history = fx.tracer().get_trace_history("T1").unwrap();
    assert_eq!(history.trace_id, "T1");
    assert!(history.chain_valid);
    let indices: Vec<u64> = history.events.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![1, 3, 5]);
    assert!(history
        .events
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(history
        .events
        .iter()
        .all(|e| e.signed_event.event.trace_id.as_str() == "T1"));
}

#[test]
fn test_history_sorts_by_entry_timestamp() {
    let mut fx = Fixture::new();
    fx.emit("T1", EventName::QueryReceived);
    // a backwards clock step puts a later entry earlier in time
    fx.clock
        .set(Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap());
    fx.emit("T1", EventName::TraceCompleted);

    let history = fx.tracer().get_trace_history("T1").unwrap();
    let indices: Vec<u64> = history.events.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![2, 1]);
}

#[test]
fn test_unknown_trace_is_vacuously_valid() {
    let mut fx = Fixture::new();
    fx.emit("T1", EventName::QueryReceived);

    let history = fx.tracer().get_trace_history("missing").unwrap();
    assert!(history.events.is_empty());
    assert!(history.chain_valid);
}

#[test]
fn test_tampered_entry_invalidates_its_trace_only() {
    let mut fx = Fixture::new();
    fx.emit("T1", EventName::QueryReceived);
    fx.emit("T2", EventName::QueryReceived);
    fx.emit("T3", EventName::QueryReceived);

    fx.backend
        .tamper(2, |e| e["signed_event"]["event"]["details"] = json!({"forged": true}));

    let tracer = fx.tracer();
    assert!(!tracer.get_trace_history("T2").unwrap().chain_valid);
    assert!(tracer.get_trace_history("T1").unwrap().chain_valid);
    assert!(tracer.get_trace_history("T3").unwrap().chain_valid);
}

#[test]
fn test_rehashed_forgery_invalidates_the_forged_trace() {
    let mut fx = Fixture::new();
    fx.emit("T1", EventName::QueryReceived);
    fx.emit("T2", EventName::QueryReceived);
    fx.emit("T3", EventName::QueryReceived);

    // rewrite entry 2 and store a hash that matches the forged content
    assert!(fx.backend.tamper(2, |e| {
        e["signed_event"]["event"]["details"] = json!({"forged": true});
        let forged: SignedEvent = serde_json::from_value(e["signed_event"].clone()).unwrap();
        let hash = event_hash(&Canonicalizer::new(), &forged).unwrap();
        e["event_hash"] = json!(hash.as_str());
    }));

    let report = fx.ledger.verify_chain_report().unwrap();
    assert_eq!(report.flagged_positions().into_iter().collect::<Vec<_>>(), vec![3]);

    let tracer = fx.tracer();
    assert!(!tracer.get_trace_history("T2").unwrap().chain_valid);
    // the broken link cannot say which side was rewritten
    assert!(!tracer.get_trace_history("T3").unwrap().chain_valid);
    assert!(tracer.get_trace_history("T1").unwrap().chain_valid);
}

#[test]
fn test_recent_traces_window_counts_entries() {
    let mut fx = Fixture::new();
    fx.emit("A", EventName::QueryReceived); // 1
    fx.emit("B", EventName::QueryReceived); // 2
    fx.emit("A", EventName::AgentClassified); // 3
    fx.emit("C", EventName::QueryReceived); // 4
    fx.emit("A", EventName::TraceCompleted); // 5

    let recent = fx.tracer().get_recent_traces(3).unwrap();
    // window is entries 3..=5
    let ids: Vec<&str> = recent.iter().map(|s| s.trace_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "C"]);
    assert_eq!(recent[0].event_count, 2);
    assert_eq!(recent[0].latest_event, EventName::TraceCompleted);
    assert_eq!(recent[1].event_count, 1);
    assert!(recent[0].latest_timestamp > recent[1].latest_timestamp);
}

#[test]
fn test_recent_traces_truncates_to_limit() {
    let mut fx = Fixture::new();
    for trace in ["A", "B", "C", "D"] {
        fx.emit(trace, EventName::QueryReceived);
    }

    let recent = fx.tracer().get_recent_traces(2).unwrap();
    let ids: Vec<&str> = recent.iter().map(|s| s.trace_id.as_str()).collect();
    assert_eq!(ids, vec!["D", "C"]);

    let all = fx.tracer().get_recent_traces(100).unwrap();
    assert_eq!(all.len(), 4);
}

#[test]
fn test_recent_traces_non_positive_limit() {
    let mut fx = Fixture::new();
    fx.emit("A", EventName::QueryReceived);

    assert!(fx.tracer().get_recent_traces(0).unwrap().is_empty());
    assert!(fx.tracer().get_recent_traces(-5).unwrap().is_empty());
}

#[test]
fn test_recent_traces_on_genesis_only_ledger() {
    let fx = Fixture::new();
    assert!(fx.tracer().get_recent_traces(10).unwrap().is_empty());
}
