//! SEPA credit transfers: batching limits and export profile selection.

mod common;

use common::*;
use hbci_core::application::jobs::SepaTransfer;
use hbci_core::application::EngineSettings;
use hbci_core::domain::{
    shared, DomainError, JobQueue, JobStatus, Transaction, TransactionCommand, TransactionStatus,
};

fn transfer(name: &str, cents: i64) -> Transaction {
    let mut t = Transaction::new(TransactionCommand::SepaTransfer);
    t.remote_name = Some(name.to_string());
    t.remote_iban = Some("DE89370400440532013000".to_string());
    t.remote_bic = Some("COBADEFFXXX".to_string());
    t.purpose = Some("Rechnung 2026-10".to_string());
    t.amount_minor = Some(cents);
    t.currency = Some("EUR".to_string());
    t
}

#[tokio::test]
async fn test_batched_transfer_selects_supported_profile() {
    let bank = Bank::new(pintan_user(), EngineSettings::default()).await;
    let user = bank.user("u1").await;

    let mut job =
        SepaTransfer::create(&bank.factory, bank.profiles.clone(), &user, IBAN, true, None)
            .unwrap();
    assert_eq!(job.max_transfers(), 2);
    job.add_transfer(transfer("Anna", 1000)).unwrap();
    job.add_transfer(transfer("Bernd", 2500)).unwrap();
    assert!(matches!(
        job.add_transfer(transfer("Carla", 100)),
        Err(DomainError::LimitExceeded(_))
    ));

    let mut queue = JobQueue::new();
    let id = queue.enqueue(shared(job)).await;
    bank.answer(1, vec![msg_result("0010"), seg_result(2, "0010", None)]);
    let report = bank.runner(None).run(DIALOG, "u1", &queue).await.unwrap();
    assert_eq!(report.finished, vec![id]);

    let sent = bank.sent();
    let segment = &sent[0].segments[0];
    assert_eq!(segment.code, "HKCCM");
    // 001.003.03 ranks higher but the bank only offers 001.002.03
    assert_eq!(segment.data["sepa"]["profile"], "ccm_001_002_03");
    assert_eq!(
        segment.data["sepa"]["descriptor"],
        "urn:iso:std:iso:20022:tech:xsd:pain.001.002.03"
    );
    assert_eq!(segment.data["sepa"]["count"], 2);

    let job = queue.get_by_id(id).unwrap();
    let job = job.lock().await;
    assert_eq!(job.sepa_profile().unwrap().sepa_type, "001.002.03");
    assert!(job
        .commands()
        .iter()
        .all(|t| t.status == TransactionStatus::Accepted));
}

#[tokio::test]
async fn test_job_descriptors_override_user_descriptors() {
    let bank = Bank::new(pintan_user(), EngineSettings::default()).await;
    let user = bank.user("u1").await;

    let mut job =
        SepaTransfer::create(&bank.factory, bank.profiles.clone(), &user, IBAN, false, None)
            .unwrap();
    assert_eq!(job.max_transfers(), 1);
    job.set_sepa_descriptors(Some(vec![
        "urn:iso:std:iso:20022:tech:xsd:pain.001.003.03".to_string(),
    ]));
    job.add_transfer(transfer("Anna", 1000)).unwrap();

    let mut queue = JobQueue::new();
    queue.enqueue(shared(job)).await;
    bank.answer(1, vec![seg_result(2, "0020", None)]);
    bank.runner(None).run(DIALOG, "u1", &queue).await.unwrap();

    let sent = bank.sent();
    assert_eq!(sent[0].segments[0].code, "HKCCS");
    assert_eq!(sent[0].segments[0].data["sepa"]["profile"], "ccm_001_003_03");
}

#[tokio::test]
async fn test_unsupported_named_profile_fails_before_sending() {
    let bank = Bank::new(pintan_user(), EngineSettings::default()).await;
    let user = bank.user("u1").await;

    let mut job = SepaTransfer::create(
        &bank.factory,
        bank.profiles.clone(),
        &user,
        IBAN,
        false,
        Some("ccm_001_003_03".to_string()),
    )
    .unwrap();
    job.add_transfer(transfer("Anna", 1000)).unwrap();

    let mut queue = JobQueue::new();
    let id = queue.enqueue(shared(job)).await;
    let report = bank.runner(None).run(DIALOG, "u1", &queue).await.unwrap();

    assert_eq!(report.messages_sent, 0);
    assert_eq!(report.failed, vec![id]);
    assert_eq!(bank.transport.call_count(), 0);
    let job = queue.get_by_id(id).unwrap();
    let job = job.lock().await;
    assert_eq!(job.status(), JobStatus::Error);
    assert!(job
        .logs()
        .iter()
        .any(|l| l.contains("not supported by bank server")));
}

#[tokio::test]
async fn test_bank_rejection_marks_transfers() {
    let bank = Bank::new(pintan_user(), EngineSettings::default()).await;
    let user = bank.user("u1").await;

    let mut job =
        SepaTransfer::create(&bank.factory, bank.profiles.clone(), &user, IBAN, false, None)
            .unwrap();
    job.add_transfer(transfer("Anna", 99_999_999)).unwrap();

    let mut queue = JobQueue::new();
    let id = queue.enqueue(shared(job)).await;
    bank.answer(1, vec![seg_result(2, "9340", None)]);
    let report = bank.runner(None).run(DIALOG, "u1", &queue).await.unwrap();

    assert_eq!(report.failed, vec![id]);
    let job = queue.get_by_id(id).unwrap();
    assert_eq!(job.lock().await.commands()[0].status, TransactionStatus::Error);
}
