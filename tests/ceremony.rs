use ceremony_coordinator::{
    environment::{Environment, Settings},
    hashing::ContributionHasher,
    validation::Dummy,
    CeremonyStatus,
    Coordinator,
    ErrorKind,
    InitializeCeremony,
    Parameters,
    RegisterParticipant,
    SubmitContribution,
    VerifyCeremony,
};

use serde_json::json;

fn coordinator() -> anyhow::Result<Coordinator> {
    Ok(Coordinator::new(Environment::Test(Settings::testing()), Box::new(Dummy))?)
}

fn contribution(participant_id: &str, round: u64) -> anyhow::Result<SubmitContribution> {
    let parameters = Parameters::Json(json!({
        "vk_alpha_1": [format!("{}", round), "2", "1"],
        "vk_delta_2": [["3", "4"], ["5", "6"], ["1", "0"]],
        "IC": [["7", "8", "1"], ["9", "10", "1"]],
        "h": [round],
    }));
    let hash = ContributionHasher::hash(&parameters)?;
    Ok(SubmitContribution::new(participant_id, parameters, &hash))
}

#[test]
fn test_ceremony_lifecycle() -> anyhow::Result<()> {
    let coordinator = coordinator()?;

    let ceremony_id = coordinator.initialize_ceremony(InitializeCeremony::new("c1", "Test"))?;
    assert_eq!(CeremonyStatus::Initialized, coordinator.get_ceremony_status(&ceremony_id)?.status);

    coordinator.register_participant(&ceremony_id, RegisterParticipant::new("p1", "pk1"))?;
    coordinator.register_participant(&ceremony_id, RegisterParticipant::new("p2", "pk2"))?;

    // A duplicate registration is a conflict.
    let error = coordinator
        .register_participant(&ceremony_id, RegisterParticipant::new("p1", "pk1"))
        .unwrap_err();
    assert_eq!(ErrorKind::Conflict, error.kind());
    assert_eq!("ConflictError", error.kind().to_string());

    let first = coordinator.submit_contribution(&ceremony_id, contribution("p1", 1)?)?;

    // A tampered hash is rejected and leaves the running parameters unchanged.
    let mut tampered = contribution("p2", 2)?;
    tampered.hash = "0xBAD".to_string();
    let error = coordinator.submit_contribution(&ceremony_id, tampered).unwrap_err();
    assert_eq!(ErrorKind::Integrity, error.kind());
    assert_eq!(
        Some(first.hash.as_str()),
        coordinator.get_ceremony(&ceremony_id)?.current_parameters_hash()
    );

    let mut second = contribution("p2", 2)?;
    second.previous_hash = Some(first.hash.clone());
    coordinator.submit_contribution(&ceremony_id, second)?;

    let result = coordinator.finalize_ceremony(&ceremony_id)?;
    assert_eq!(CeremonyStatus::Completed, result.status);
    assert_eq!(2, result.participant_count);
    let key_id = result.verification_key.id;

    coordinator.verify_ceremony(&ceremony_id, VerifyCeremony::new("v1", true))?;
    let error = coordinator
        .verify_ceremony(&ceremony_id, VerifyCeremony::new("v1", true))
        .unwrap_err();
    assert_eq!(ErrorKind::Conflict, error.kind());
    assert_eq!(ErrorKind::NotFound, coordinator.get_verification_key(&key_id).unwrap_err().kind());

    let outcome = coordinator.verify_ceremony(&ceremony_id, VerifyCeremony::new("v2", true))?;
    assert_eq!(CeremonyStatus::Verified, outcome.ceremony_status);

    let entry = coordinator.get_verification_key(&key_id)?;
    assert_eq!(ceremony_id, entry.ceremony_id);
    assert_eq!("c1", entry.circuit_id);
    assert_eq!(2, coordinator.contribution_history(&ceremony_id)?.len());
    Ok(())
}

#[test]
fn test_summaries_serialize_in_camel_case() -> anyhow::Result<()> {
    let coordinator = coordinator()?;
    let ceremony_id = coordinator.initialize_ceremony(InitializeCeremony::new("c1", "Test"))?;

    let summary = serde_json::to_value(coordinator.get_ceremony_status(&ceremony_id)?)?;
    assert_eq!(json!("initialized"), summary["status"]);
    assert_eq!(json!(2), summary["requiredParticipants"]);
    assert_eq!(json!("standard"), summary["securityLevel"]);
    Ok(())
}
