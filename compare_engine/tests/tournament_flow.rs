use compare_engine::bracket::{champion, round_label};
use compare_engine::*;
use serde_json::json;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn engine() -> CompareEngine {
    let ds: Dataset = serde_json::from_value(json!({
        "candidates": [
            {"id": "c1", "electionId": "E1", "name": "Ana", "party": "Verde"},
            {"id": "c2", "electionId": "E1", "name": "Luis"},
            {"id": "c3", "electionId": "E1", "name": "Marta"},
            {"id": "c4", "electionId": "E1", "name": "Pedro"},
            {"id": "c5", "electionId": "E1", "name": "Rosa"}
        ],
        "proposals": [
            {"id": "p1", "candidateId": "c1", "electionId": "E1", "topic": "Salud", "title": "Clinicas"},
            {"id": "p2", "candidateId": "c2", "electionId": "E1", "topic": "salud ", "title": "Hospitales"},
            {"id": "p3", "candidateId": "c3", "electionId": "E1", "topic": "Educación", "title": "Becas"},
            {"id": "p4", "candidateId": "c5", "electionId": {"id": "E1"}, "type": "Salud mental"}
        ]
    }))
    .unwrap();
    CompareEngine::new(MemoryStore::new(ds), &EngineRules::DEFAULT_RULES)
}

#[tokio::test]
async fn derived_topics_then_comparison() {
    init();
    let engine = engine();
    let topics = engine.resolve_topics("E1").await.unwrap();
    let labels: Vec<&str> = topics.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, vec!["Salud", "Educación"]);

    let ids: Vec<String> = ["c1", "c3", "c5"].iter().map(|s| s.to_string()).collect();
    let res = engine.compare(&topics[0].value, "E1", &ids).await.unwrap();
    let answered: Vec<(&str, bool)> = res
        .comparison
        .iter()
        .map(|e| (e.candidate_id.as_str(), e.answered))
        .collect();
    assert_eq!(answered, vec![("c1", true), ("c3", false), ("c5", true)]);

    let js = serde_json::to_value(&res).unwrap();
    assert_eq!(
        js["comparison"][1],
        json!({"candidateId": "c3", "answered": false, "proposals": []})
    );
    assert_eq!(js["candidates"][0]["electionId"], json!("E1"));
}

#[tokio::test]
async fn five_candidate_tournament() {
    init();
    let engine = engine();
    let mut session = TournamentSession::new("E1", engine.rules());

    let ticket = session.begin_election_fetch();
    let topics = engine.resolve_topics("E1").await.unwrap();
    assert!(session.accept_topics(&ticket, topics));
    let candidate_ids: Vec<String> = (1..=5).map(|i| format!("c{}", i)).collect();
    assert!(session.accept_candidates(&ticket, candidate_ids));

    session.set_topic("Salud");
    let request = session.start_tournament().unwrap();
    let result = engine.run_request(&request).await.unwrap();
    assert!(session.accept_comparison(&request.ticket, result));

    let rounds = session.rounds();
    assert_eq!(rounds.len(), 3);
    assert_eq!(rounds[0].len(), 4);
    // c5 gets a bye in the first two rounds.
    assert_eq!(rounds[0][2].winner.as_deref(), Some("c5"));
    assert_eq!(rounds[1][1].winner.as_deref(), Some("c5"));

    session.choose_winner(0, 0, "c2");
    session.choose_winner(0, 1, "c3");
    let token = DragSource {
        round_index: 1,
        match_index: 0,
        candidate_id: "c2".to_string(),
    };
    // 1-0 feeds slot 0 of the final.
    let wrong = DropTarget {
        round_index: 2,
        match_index: 0,
        slot: 1,
    };
    assert!(session.drop_winner(&token, &wrong).is_err());
    let right = DropTarget {
        round_index: 2,
        match_index: 0,
        slot: 0,
    };
    session.drop_winner(&token, &right).unwrap();
    session.choose_winner(2, 0, "c5");
    assert_eq!(champion(&session.rounds()), Some("c5"));

    let view = session.bracket_view();
    assert_eq!(view[2].label, round_label(2, 3));
    let finalists = &view[2].matches[0].slots;
    assert_eq!(finalists[0].name.as_deref(), Some("Luis"));
    assert_eq!(finalists[0].headlines, vec!["Hospitales".to_string()]);
    assert!(finalists[1].is_winner);
    assert_eq!(finalists[1].headlines, vec!["Proposal".to_string()]);
}
