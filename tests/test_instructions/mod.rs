use crate::{ctx::*, utils::*};
use anchor_lang::{
    prelude::Pubkey,
    solana_program::instruction::{AccountMeta, Instruction},
    AnchorDeserialize,
};
use crowdfund_sync::{
    gateway::{Gateway, ProgramGateway},
    instructions::*,
    utils::*,
    ErrorKind, GatewayError, ReconcilePolicy, SyncStore,
};
use std::sync::Arc;

pub async fn test_instructions() {
    let ctx = Ctx::new();
    test_list_campaign_addresses(&ctx).await;
    test_fetch_campaign(&ctx).await;
    test_create_campaign(&ctx).await;
    test_contribute(&ctx).await;
    test_list_withdrawal_requests(&ctx).await;
    test_create_withdrawal_request(&ctx).await;
    test_approve_request(&ctx).await;
    test_finalize_request(&ctx).await;
    test_manage_teachers(&ctx).await;
    test_transport_failure(&ctx).await;
    test_store_over_program(&ctx).await;
    test_refresh_reads_each_campaign_once(&ctx).await;
}

fn gateway(payer: Pubkey) -> (Arc<Ledger>, ProgramGateway<Ledger>) {
    let ledger = Arc::new(Ledger::new(payer));
    (ledger.clone(), ProgramGateway::new(ledger))
}

fn only_instruction(ledger: &Ledger) -> Instruction {
    let sent = ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].len(), 1);
    sent[0][0].clone()
}

fn args<A: AnchorDeserialize>(instruction: &Instruction, name: &str) -> A {
    assert_eq!(instruction.program_id, crowdfund_sync::ID);
    assert_eq!(instruction.data[..8], sighash(name));
    A::try_from_slice(&instruction.data[8..]).unwrap()
}

async fn test_list_campaign_addresses(ctx: &Ctx) {
    let (ledger, gateway) = gateway(ctx.student);
    assert_eq!(
        gateway.list_campaign_addresses().await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    let addresses = seed_campaigns(
        &ledger,
        ctx,
        vec![
            campaign_state(ctx.student, "Chess club", 0, SOL),
            campaign_state(ctx.student, "Solar car", 0, 40 * SOL),
            campaign_state(ctx.donor, "Debate trip", 0, 3 * SOL),
        ],
    );
    assert_eq!(gateway.list_campaign_addresses().await.unwrap(), addresses);
    assert_eq!(addresses[1], find_campaign(1));
    assert_eq!(gateway.signer(), ctx.student);
}

async fn test_fetch_campaign(ctx: &Ctx) {
    let (ledger, gateway) = gateway(ctx.student);
    let state = campaign_state(ctx.student, "Chess club", SOL / 4, SOL);
    let address = seed_campaigns(&ledger, ctx, vec![state.clone()])[0];

    let campaign = gateway.fetch_campaign(address).await.unwrap();
    assert_eq!(campaign.address, address);
    assert_eq!(campaign.title, "Chess club");
    assert_eq!(campaign.balance, SOL / 4);
    assert_eq!(campaign.minimum_contribution, state.minimum_contribution);
    assert_eq!(gateway.fetch_campaign(address).await.unwrap(), campaign);

    let missing = Pubkey::new_unique();
    assert_eq!(
        gateway.fetch_campaign(missing).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    let foreign = Pubkey::new_unique();
    let mut data = Vec::new();
    anchor_lang::AccountSerialize::try_serialize(&state, &mut data).unwrap();
    ledger.put_raw(foreign, Pubkey::new_unique(), data);
    assert_eq!(
        gateway.fetch_campaign(foreign).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    // A request account is not a campaign.
    let request = find_request(&address, 0);
    ledger.put(request, &request_state(address, 0, SOL, ctx.recipient));
    assert_eq!(
        gateway.fetch_campaign(request).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    let corrupt = Pubkey::new_unique();
    let mut data = account_discriminator("CampaignState").to_vec();
    data.extend_from_slice(&[7, 7, 7]);
    ledger.put_raw(corrupt, crowdfund_sync::ID, data);
    assert_eq!(
        gateway.fetch_campaign(corrupt).await.unwrap_err().kind(),
        ErrorKind::Decode
    );
    assert!(ledger.sent().is_empty());
}

async fn test_create_campaign(ctx: &Ctx) {
    let (ledger, gateway) = gateway(ctx.student);
    seed_campaigns(
        &ledger,
        ctx,
        vec![campaign_state(ctx.donor, "Debate trip", 0, 3 * SOL)],
    );

    let mut invalid = campaign_form();
    invalid.target_amount = "twelve".to_string();
    assert_eq!(
        gateway.create_campaign(&invalid).await.unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert!(ledger.sent().is_empty());

    gateway.create_campaign(&campaign_form()).await.unwrap();
    let instruction = only_instruction(&ledger);
    let created: CreateCampaign = args(&instruction, "create_campaign");
    assert_eq!(
        created,
        CreateCampaign {
            minimum_contribution: SOL / 20,
            title: "Hackathon travel".to_string(),
            description: "Train tickets for four students".to_string(),
            image: "https://img.example/train.png".to_string(),
            target_amount: 12 * SOL + SOL / 2,
            student_roll: "CS-1107".to_string(),
        }
    );
    assert_eq!(instruction.accounts[0], AccountMeta::new(find_factory(), false));
    assert_eq!(instruction.accounts[1], AccountMeta::new(find_campaign(1), false));
    assert_eq!(instruction.accounts[2], AccountMeta::new(ctx.student, true));
}

async fn test_contribute(ctx: &Ctx) {
    let (ledger, gateway) = gateway(ctx.donor);
    let address = seed_campaigns(
        &ledger,
        ctx,
        vec![campaign_state(ctx.student, "Chess club", 0, SOL)],
    )[0];

    for amount in [0, SOL / 1000] {
        assert_eq!(
            gateway.contribute(address, amount).await.unwrap_err().kind(),
            ErrorKind::Validation
        );
    }
    assert!(ledger.sent().is_empty());
    assert_eq!(
        gateway
            .contribute(Pubkey::new_unique(), SOL)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );

    gateway.contribute(address, SOL / 100).await.unwrap();
    let instruction = only_instruction(&ledger);
    let contribution: Contribute = args(&instruction, "contribute");
    assert_eq!(contribution.amount, SOL / 100);
    assert_eq!(
        instruction.accounts[1],
        AccountMeta::new(find_contribution(&address, &ctx.donor), false)
    );
    assert_eq!(instruction.accounts[2], AccountMeta::new(ctx.donor, true));
}

async fn test_list_withdrawal_requests(ctx: &Ctx) {
    let (ledger, gateway) = gateway(ctx.student);
    let mut state = campaign_state(ctx.student, "Solar car", 10 * SOL, 40 * SOL);
    let address = seed_campaigns(&ledger, ctx, vec![state.clone()])[0];
    assert!(gateway.list_withdrawal_requests(address).await.unwrap().is_empty());

    seed_requests(
        &ledger,
        address,
        &mut state,
        (0..3)
            .map(|i| request_state(address, i, (i as u64 + 1) * SOL, ctx.recipient))
            .collect(),
    );
    let requests = gateway.list_withdrawal_requests(address).await.unwrap();
    let indices: Vec<_> = requests.iter().map(|r| r.index).collect();
    assert_eq!(indices, [0, 1, 2]);
    assert_eq!(requests[2].value, 3 * SOL);
    assert_eq!(requests[0].recipient, ctx.recipient);

    // Request 1 claims to be request 0.
    ledger.put(find_request(&address, 1), &request_state(address, 0, SOL, ctx.recipient));
    assert_eq!(
        gateway.list_withdrawal_requests(address).await.unwrap_err().kind(),
        ErrorKind::Decode
    );

    ledger.put(find_request(&address, 1), &request_state(address, 1, SOL, ctx.recipient));
    state.requests_count = 4;
    ledger.put(address, &state);
    assert_eq!(
        gateway.list_withdrawal_requests(address).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

async fn test_create_withdrawal_request(ctx: &Ctx) {
    let (ledger, gateway) = gateway(ctx.student);
    let mut state = campaign_state(ctx.student, "Solar car", 10 * SOL, 40 * SOL);
    let address = seed_campaigns(&ledger, ctx, vec![state.clone()])[0];
    seed_requests(
        &ledger,
        address,
        &mut state,
        vec![request_state(address, 0, SOL, ctx.recipient)],
    );

    let reads = ledger.reads();
    assert_eq!(
        gateway
            .create_withdrawal_request(address, "Wheels", 0, ctx.recipient)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        gateway
            .create_withdrawal_request(address, "   ", SOL, ctx.recipient)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::Validation
    );
    assert_eq!(ledger.reads(), reads);
    assert!(ledger.sent().is_empty());

    gateway
        .create_withdrawal_request(address, " Wheels ", 2 * SOL, ctx.recipient)
        .await
        .unwrap();
    let instruction = only_instruction(&ledger);
    let created: CreateWithdrawalRequest = args(&instruction, "create_withdrawal_request");
    assert_eq!(created.description, "Wheels");
    assert_eq!(created.value, 2 * SOL);
    assert_eq!(created.recipient, ctx.recipient);
    // The next index is carried by the request PDA, not by the arguments.
    assert_eq!(
        instruction.accounts[1],
        AccountMeta::new(find_request(&address, 1), false)
    );
}

async fn test_approve_request(ctx: &Ctx) {
    let teacher = ctx.teachers[0];
    let (ledger, gateway) = gateway(teacher);
    let mut state = campaign_state(ctx.student, "Solar car", 10 * SOL, 40 * SOL);
    let address = seed_campaigns(&ledger, ctx, vec![state.clone()])[0];
    seed_requests(
        &ledger,
        address,
        &mut state,
        vec![
            request_state(address, 0, SOL, Pubkey::new_unique()),
            request_state(address, 1, SOL, ctx.recipient),
        ],
    );

    assert_eq!(
        gateway
            .approve_withdrawal_request(address, 2)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );

    gateway.approve_withdrawal_request(address, 1).await.unwrap();
    let instruction = only_instruction(&ledger);
    let approved: ApproveRequest = args(&instruction, "approve_request");
    assert_eq!(approved.index, 1);
    assert_eq!(
        instruction.accounts[..5],
        [
            AccountMeta::new_readonly(find_factory(), false),
            AccountMeta::new(address, false),
            AccountMeta::new(find_request(&address, 1), false),
            AccountMeta::new(teacher, true),
            AccountMeta::new(ctx.recipient, false),
        ]
    );

    ledger.fail_next_send(GatewayError::Revert {
        code: Some(6005),
        reason: "This teacher has already approved the request".to_string(),
    });
    let err = gateway.approve_withdrawal_request(address, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Revert);
    assert_eq!(ledger.sent().len(), 1);
}

async fn test_finalize_request(ctx: &Ctx) {
    let (ledger, gateway) = gateway(ctx.student);
    let mut state = campaign_state(ctx.student, "Solar car", 10 * SOL, 40 * SOL);
    let address = seed_campaigns(&ledger, ctx, vec![state.clone()])[0];
    seed_requests(
        &ledger,
        address,
        &mut state,
        vec![request_state(address, 0, 4 * SOL, ctx.recipient)],
    );

    gateway.finalize_withdrawal_request(address, 0).await.unwrap();
    let instruction = only_instruction(&ledger);
    let finalized: FinalizeRequest = args(&instruction, "finalize_request");
    assert_eq!(finalized.index, 0);
    assert!(instruction
        .accounts
        .contains(&AccountMeta::new(ctx.recipient, false)));
    assert!(instruction
        .accounts
        .contains(&AccountMeta::new(ctx.student, true)));
}

async fn test_manage_teachers(ctx: &Ctx) {
    let (ledger, gateway) = gateway(ctx.admin);
    seed_campaigns(&ledger, ctx, vec![]);

    assert!(gateway.is_admin(ctx.admin).await.unwrap());
    assert!(!gateway.is_admin(ctx.student).await.unwrap());
    assert!(gateway.is_teacher(ctx.teachers[1]).await.unwrap());
    assert!(!gateway.is_teacher(ctx.admin).await.unwrap());
    assert_eq!(gateway.list_teachers().await.unwrap(), ctx.teachers);

    let newcomer = Pubkey::new_unique();
    gateway.add_teacher(newcomer).await.unwrap();
    let added: AddTeacher = args(&only_instruction(&ledger), "add_teacher");
    assert_eq!(added.teacher, newcomer);

    gateway.remove_teacher(ctx.teachers[0]).await.unwrap();
    let sent = ledger.sent();
    let removed: RemoveTeacher = args(&sent[1][0], "remove_teacher");
    assert_eq!(removed.teacher, ctx.teachers[0]);
    assert_eq!(sent[1][0].accounts[1], AccountMeta::new_readonly(ctx.admin, true));

    ledger.fail_next_send(GatewayError::Authorization(
        "Only the admin can do this".to_string(),
    ));
    assert_eq!(
        gateway.add_teacher(newcomer).await.unwrap_err().kind(),
        ErrorKind::Authorization
    );
    assert_eq!(ledger.sent().len(), 2);
}

async fn test_transport_failure(ctx: &Ctx) {
    let (ledger, gateway) = gateway(ctx.donor);
    let address = seed_campaigns(
        &ledger,
        ctx,
        vec![campaign_state(ctx.student, "Chess club", 0, SOL)],
    )[0];

    ledger.fail_next_read(GatewayError::Transport("connection reset".to_string()));
    assert_eq!(
        gateway.fetch_campaign(address).await.unwrap_err().kind(),
        ErrorKind::Transport
    );
    ledger.fail_next_read(GatewayError::Transport("connection reset".to_string()));
    assert_eq!(
        gateway.contribute(address, SOL).await.unwrap_err().kind(),
        ErrorKind::Transport
    );
    assert!(ledger.sent().is_empty());
    assert!(gateway.fetch_campaign(address).await.is_ok());
}

async fn test_store_over_program(ctx: &Ctx) {
    let ledger = Arc::new(Ledger::new(ctx.donor));
    let mut chess = campaign_state(ctx.student, "Chess club", SOL, 2 * SOL);
    let solar = campaign_state(ctx.donor, "Solar car", 3 * SOL, 3 * SOL);
    let addresses = seed_campaigns(&ledger, ctx, vec![chess.clone(), solar]);
    seed_requests(
        &ledger,
        addresses[0],
        &mut chess,
        vec![request_state(addresses[0], 0, SOL / 2, ctx.recipient)],
    );
    let store = SyncStore::new(
        Arc::new(ProgramGateway::new(ledger.clone())),
        ReconcilePolicy { deferred_lag: None },
    );

    let before = store.refresh().await.unwrap();
    let order: Vec<_> = before.campaigns().iter().map(|c| c.address).collect();
    assert_eq!(order, addresses);
    assert_eq!(before.requests(&addresses[0]).len(), 1);
    assert!(before.requests(&addresses[1]).is_empty());

    ledger.fail_next_read(GatewayError::Transport("connection reset".to_string()));
    assert_eq!(store.refresh().await.unwrap_err().kind(), ErrorKind::Transport);
    assert!(Arc::ptr_eq(&store.snapshot(), &before));

    store.contribute(addresses[0], SOL / 10).await.unwrap();
    assert_eq!(ledger.sent().len(), 1);
    assert_eq!(store.snapshot().generation(), 3);
}

async fn test_refresh_reads_each_campaign_once(ctx: &Ctx) {
    let ledger = Arc::new(Ledger::new(ctx.student));
    let mut state = campaign_state(ctx.student, "Solar car", 10 * SOL, 40 * SOL);
    let address = seed_campaigns(&ledger, ctx, vec![state.clone()])[0];
    let first = request_state(address, 0, SOL, ctx.recipient);
    seed_requests(&ledger, address, &mut state, vec![first.clone()]);

    // A second request lands right after the campaign account is served.
    let second = request_state(address, 1, 2 * SOL, ctx.recipient);
    let mut grown = state.clone();
    ledger.after_next_read_of(address, move |ledger| {
        seed_requests(ledger, address, &mut grown, vec![first, second]);
    });
    let store = SyncStore::new(
        Arc::new(ProgramGateway::new(ledger.clone())),
        ReconcilePolicy { deferred_lag: None },
    );

    let snapshot = store.refresh().await.unwrap();
    assert_eq!(snapshot.campaign(&address).unwrap().requests_count, 1);
    assert_eq!(snapshot.requests(&address).len(), 1);

    let snapshot = store.refresh().await.unwrap();
    assert_eq!(snapshot.campaign(&address).unwrap().requests_count, 2);
    assert_eq!(snapshot.requests(&address).len(), 2);
}
