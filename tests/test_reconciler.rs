//! Integration tests for answer reconciliation.
//!
//! Tests cover:
//! - Selecting nearby facilities (valid and stale ids)
//! - Merging field edits into one draft under a stable id
//! - Discarding a selected facility when authoring starts
//! - Location stamping and corrupt stored answers

mod common;

use common::*;
use facility_picker::ObjectId;

#[tokio::test]
async fn test_first_edit_creates_draft_with_location() -> anyhow::Result<()> {
    // 1. No answer yet, worker located at (1.0, 2.0)
    let store = MemoryStore::with_location(HOME);
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    assert_eq!(reconciler.answer().await?, Answer::Empty);

    // 2. Name the new facility
    let draft = reconciler
        .edit_field(FacilityEdit::Name("Clinic X".to_string()))
        .await?;
    assert!(draft.facility_id.is_well_formed());
    assert_eq!(draft.facility_name.as_deref(), Some("Clinic X"));
    assert_eq!(draft.lat, Some(1.0));
    assert_eq!(draft.lng, Some(2.0));
    assert_eq!(draft.facility_sector, None);

    // 3. Pick a sector; id and name survive
    let updated = reconciler
        .edit_field(FacilityEdit::from_selection(["health"]))
        .await?;
    assert_eq!(updated.facility_id, draft.facility_id);
    assert_eq!(updated.facility_sector.as_deref(), Some("health"));
    assert_eq!(updated.facility_name.as_deref(), Some("Clinic X"));

    // 4. Stored shape carries the creation marker
    let raw = store.raw(&test_key()).await.expect("answer stored");
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(json.as_array().map(Vec::len), Some(1));
    assert_eq!(json[0]["metadata"]["is_new"], true);
    assert_eq!(json[0]["response_type"], "answer");
    assert_eq!(json[0]["response"]["facility_id"], draft.facility_id.as_str());

    Ok(())
}

#[tokio::test]
async fn test_sequential_edits_keep_one_answer_and_one_id() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;

    let first = reconciler
        .edit_field(FacilityEdit::Name("Well A".to_string()))
        .await?;
    reconciler
        .edit_field(FacilityEdit::ListedSector(Some("water".to_string())))
        .await?;
    reconciler
        .edit_field(FacilityEdit::Name("Well A (north)".to_string()))
        .await?;

    let responses = store.get_responses(&test_key()).await?;
    assert_eq!(responses.len(), 1);
    let answer = Answer::from_responses(&responses)?;
    let draft = answer.as_draft().expect("answer should be a draft");
    assert_eq!(draft.facility_id, first.facility_id);
    assert_eq!(draft.facility_name.as_deref(), Some("Well A (north)"));
    assert_eq!(draft.facility_sector.as_deref(), Some("water"));

    Ok(())
}

#[tokio::test]
async fn test_draft_id_survives_a_new_session() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    let first = AnswerReconciler::new(store.clone(), test_key())
        .await
        .edit_field(FacilityEdit::Name("Pump".to_string()))
        .await?;

    // Navigate away and back: a new reconciler over the same store
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    let second = reconciler
        .edit_field(FacilityEdit::OtherSector("agriculture".to_string()))
        .await?;

    assert_eq!(second.facility_id, first.facility_id);
    assert_eq!(second.facility_name.as_deref(), Some("Pump"));
    assert_eq!(second.facility_sector.as_deref(), Some("agriculture"));

    Ok(())
}

#[tokio::test]
async fn test_select_valid_candidate() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    let candidates = make_nearby_facilities();
    let clinic = &candidates[1];

    assert!(reconciler.select(&clinic.uuid, &candidates).await?);

    // Fields match the candidate exactly, no creation marker
    let answer = reconciler.answer().await?;
    let existing = answer.as_existing().expect("answer should reference a facility");
    assert_eq!(existing.facility_id, clinic.uuid);
    assert_eq!(existing.facility_name, "Central Clinic");
    assert_eq!(existing.facility_sector.as_deref(), Some("health"));
    assert_eq!(existing.lat, clinic.coordinates[1]);
    assert_eq!(existing.lng, clinic.coordinates[0]);

    let raw = store.raw(&test_key()).await.expect("answer stored");
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    assert!(json[0].get("metadata").is_none());
    assert_eq!(json[0]["response"]["facility_id"], clinic.uuid.to_string());

    Ok(())
}

#[tokio::test]
async fn test_select_stale_candidate_is_noop() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    let candidates = make_nearby_facilities();

    // 1. Existing answer: a selected facility
    reconciler.select(&candidates[0].uuid, &candidates).await?;
    let before = store.raw(&test_key()).await;

    // 2. Select an id that is not among the current candidates
    let applied = reconciler.select(&FacilityId::from("no-such-facility"), &candidates).await?;
    assert!(!applied);
    assert_eq!(store.raw(&test_key()).await, before);

    // 3. Same against an empty candidate set with a draft stored
    reconciler
        .edit_field(FacilityEdit::Name("Draft".to_string()))
        .await?;
    let draft_before = reconciler.answer().await?;
    assert!(!reconciler.select(&candidates[1].uuid, &[]).await?);
    assert_eq!(reconciler.answer().await?, draft_before);

    Ok(())
}

#[tokio::test]
async fn test_select_replaces_draft_entirely() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    let candidates = make_nearby_facilities();

    reconciler
        .edit_field(FacilityEdit::Name("My new school".to_string()))
        .await?;
    reconciler.select(&candidates[2].uuid, &candidates).await?;

    let responses = store.get_responses(&test_key()).await?;
    assert_eq!(responses.len(), 1);
    assert!(!responses[0].is_new());
    assert_eq!(responses[0].response.facility_name.as_deref(), Some("Primary School"));

    Ok(())
}

#[tokio::test]
async fn test_edit_after_selection_starts_fresh_draft() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    let candidates = make_nearby_facilities();
    let clinic = &candidates[1];
    reconciler.select(&clinic.uuid, &candidates).await?;

    let draft = reconciler
        .edit_field(FacilityEdit::Name("Clinic annex".to_string()))
        .await?;

    // Nothing is inherited from the selected facility
    assert_ne!(draft.facility_id.as_str(), clinic.uuid.to_string());
    assert!(draft.facility_id.is_well_formed());
    assert_eq!(draft.facility_sector, None);
    assert_eq!(draft.facility_name.as_deref(), Some("Clinic annex"));
    assert_eq!(draft.location(), Some(HOME));

    Ok(())
}

#[tokio::test]
async fn test_fresh_drafts_get_distinct_ids() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    let candidates = make_nearby_facilities();

    let first = reconciler
        .edit_field(FacilityEdit::Name("A".to_string()))
        .await?;
    reconciler.select(&candidates[0].uuid, &candidates).await?;
    let second = reconciler
        .edit_field(FacilityEdit::Name("B".to_string()))
        .await?;

    assert_ne!(first.facility_id, second.facility_id);
    assert!(second.facility_id.is_well_formed());

    Ok(())
}

#[tokio::test]
async fn test_draft_without_location_leaves_coordinates_unset() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    assert_eq!(reconciler.location(), None);

    let draft = reconciler
        .edit_field(FacilityEdit::Name("Unplaced".to_string()))
        .await?;
    assert_eq!(draft.lat, None);
    assert_eq!(draft.lng, None);

    let raw = store.raw(&test_key()).await.expect("answer stored");
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    assert!(json[0]["response"].get("lat").is_none());
    assert!(json[0]["response"].get("lng").is_none());

    Ok(())
}

#[tokio::test]
async fn test_edits_stamp_latest_known_location() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    let mut reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    reconciler
        .edit_field(FacilityEdit::Name("Moving".to_string()))
        .await?;

    let moved = Location::new(1.5, 2.5);
    reconciler.set_location(moved).await?;
    let draft = reconciler
        .edit_field(FacilityEdit::ListedSector(Some("energy".to_string())))
        .await?;

    assert_eq!(draft.location(), Some(moved));
    assert_eq!(store.get_location().await?, Some(moved));

    Ok(())
}

#[tokio::test]
async fn test_sector_edits() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;

    reconciler
        .edit_field(FacilityEdit::OtherSector("agriculture".to_string()))
        .await?;
    assert_eq!(
        reconciler.answer().await?.sector_class(),
        SectorClass::Other("agriculture".to_string())
    );

    reconciler
        .edit_field(FacilityEdit::from_selection(vec!["education".to_string(), "health".to_string()]))
        .await?;
    assert_eq!(
        reconciler.answer().await?.facility_sector(),
        Some("education"),
        "only the first selected value counts"
    );

    reconciler
        .edit_field(FacilityEdit::from_selection(Vec::<String>::new()))
        .await?;
    let answer = reconciler.answer().await?;
    assert!(answer.is_draft());
    assert_eq!(answer.sector_class(), SectorClass::Unset);

    Ok(())
}

#[tokio::test]
async fn test_corrupt_answer_reads_empty_and_is_replaced() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);

    // Not JSON at all
    store.insert_raw(test_key(), "{not json").await;
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    assert_eq!(reconciler.answer().await?, Answer::Empty);

    let draft = reconciler
        .edit_field(FacilityEdit::Name("Recovered".to_string()))
        .await?;
    assert_eq!(reconciler.answer().await?.as_draft(), Some(&draft));

    // Valid JSON, but an existing reference without coordinates
    let other_key = AnswerKey::new("survey-1", "question-2");
    store
        .insert_raw(
            other_key.clone(),
            r#"[{"response": {"facility_id": "7f1c2b1e-3f2a-4c4e-9a55-0d2b8e7c6a10",
                "facility_name": "Half"}, "response_type": "answer"}]"#,
        )
        .await;
    let reconciler = AnswerReconciler::new(store.clone(), other_key).await;
    assert_eq!(reconciler.answer().await?, Answer::Empty);

    Ok(())
}

#[tokio::test]
async fn test_stored_draft_ids_are_preserved_verbatim() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    store
        .insert_raw(
            test_key(),
            r#"[{"response": {"facility_id": "server-assigned-1", "facility_name": "Old"},
                "response_type": "answer", "metadata": {"is_new": true}}]"#,
        )
        .await;
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;

    let draft = reconciler
        .edit_field(FacilityEdit::Name("Renamed".to_string()))
        .await?;
    assert_eq!(draft.facility_id, ObjectId::from("server-assigned-1".to_string()));

    Ok(())
}

#[tokio::test]
async fn test_answers_are_scoped_per_question() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    let first = AnswerReconciler::new(store.clone(), AnswerKey::new("s", "q1")).await;
    let second = AnswerReconciler::new(store.clone(), AnswerKey::new("s", "q2")).await;

    first.edit_field(FacilityEdit::Name("One".to_string())).await?;
    assert_eq!(second.answer().await?, Answer::Empty);
    assert_eq!(
        store.get_responses(&AnswerKey::new("other", "q1")).await?.len(),
        0
    );

    Ok(())
}

#[tokio::test]
async fn test_selected_facility_id_is_stored_verbatim() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    let mut candidates = make_nearby_facilities();
    candidates[1].uuid = FacilityId::from("1EA5E2F0B1C84F6C8F53F9D2C1B5E0A7");
    candidates[2].uuid = FacilityId::from("site-42");

    for candidate in &candidates[1..] {
        assert!(reconciler.select(&candidate.uuid, &candidates).await?);

        let raw = store.raw(&test_key()).await.expect("answer stored");
        let json: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(json[0]["response"]["facility_id"], candidate.uuid.as_str());

        let answer = reconciler.answer().await?;
        assert_eq!(
            answer.as_existing().map(|existing| &existing.facility_id),
            Some(&candidate.uuid)
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_draft_saved_without_id_keeps_its_fields() -> anyhow::Result<()> {
    let store = MemoryStore::with_location(HOME);
    store
        .insert_raw(
            test_key(),
            r#"[{"response": {"facility_name": "Old pump", "facility_sector": "water"},
                "response_type": "answer", "metadata": {"is_new": true}}]"#,
        )
        .await;
    let reconciler = AnswerReconciler::new(store.clone(), test_key()).await;
    assert!(reconciler.answer().await?.is_draft());

    let draft = reconciler
        .edit_field(FacilityEdit::Name("New pump".to_string()))
        .await?;
    assert!(draft.facility_id.is_well_formed());
    assert_eq!(draft.facility_name.as_deref(), Some("New pump"));
    assert_eq!(draft.facility_sector.as_deref(), Some("water"));

    // The id chosen on that edit sticks from then on
    let next = reconciler
        .edit_field(FacilityEdit::ListedSector(Some("health".to_string())))
        .await?;
    assert_eq!(next.facility_id, draft.facility_id);

    Ok(())
}
