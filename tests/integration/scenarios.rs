//! End-to-end market lifecycle against the emulated ledger.

use std::sync::Arc;

use soroban_predict::contract::{self, ContractError};
use soroban_predict::economics::{self, Phase};
use soroban_predict::engine::{CallOrchestrator, InvokeSettings};
use soroban_predict::ledger::xdr::ScVal;
use soroban_predict::market::actions::{claimed_amount, created_market_id};
use soroban_predict::market::{MarketActions, MarketCache, MarketRepository};
use soroban_predict::types::{MarketError, MarketStatus, Position, Side, SignerError};
use soroban_predict::wallet::WalletSession;

use crate::emulated_ledger::{account, contract_id, EmulatedLedger, TestWallet, PASSPHRASE};

const START: u64 = 1_800_000_000;
const ONE_DAY: u64 = 86_400;

struct Harness {
    ledger: Arc<EmulatedLedger>,
    orchestrator: Arc<CallOrchestrator>,
    repo: MarketRepository,
    admin: String,
}

impl Harness {
    fn new() -> Self {
        let admin = account(1);
        let ledger = Arc::new(EmulatedLedger::new(&admin, START));
        let settings = InvokeSettings {
            network_passphrase: PASSPHRASE.to_string(),
            ..InvokeSettings::default()
        };
        let orchestrator = Arc::new(CallOrchestrator::new(ledger.clone(), settings));
        let cache = Arc::new(MarketCache::new());
        let repo = MarketRepository::new(orchestrator.clone(), contract_id(), cache);
        Self {
            ledger,
            orchestrator,
            repo,
            admin,
        }
    }

    async fn actions_with(&self, wallet: TestWallet) -> MarketActions {
        self.actions_with_shared(Arc::new(wallet)).await
    }

    async fn actions_with_shared(&self, wallet: Arc<TestWallet>) -> MarketActions {
        let session = Arc::new(WalletSession::new(wallet, PASSPHRASE));
        session.connect().await.unwrap();
        MarketActions::new(self.orchestrator.clone(), contract_id(), session)
    }

    /// Funded, connected actions for `address`.
    async fn user(&self, address: &str) -> MarketActions {
        self.ledger.fund(address);
        self.actions_with(TestWallet::new(address)).await
    }

    async fn create(&self, actions: &MarketActions, question: &str) -> u64 {
        let outcome = actions.create(question, START + ONE_DAY).await.unwrap();
        created_market_id(&outcome).unwrap()
    }
}

// -- Reads --

#[tokio::test]
async fn test_fresh_registry_is_empty() {
    let h = Harness::new();
    assert_eq!(h.repo.count().await.unwrap(), 0);
    assert!(h.repo.list().await.unwrap().is_empty());
    assert!(matches!(h.repo.get(0).await, Err(MarketError::NotFound(_))));
    // reads never touch an account
    assert_eq!(h.ledger.counts().get_account, 0);
    assert_eq!(h.ledger.counts().submit, 0);
}

#[tokio::test]
async fn test_position_defaults_for_unknown_account() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    let id = h.create(&alice, "Will it rain?").await;

    let position = h.repo.position(id, &account(9)).await.unwrap();
    assert_eq!(position, Position::EMPTY);
}

// -- Create --

#[tokio::test]
async fn test_create_market_appears_open_and_empty() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    let before = h.repo.count().await.unwrap();

    let id = h.create(&alice, "  Will BTC close above $100k?  ").await;

    assert_eq!(h.repo.count().await.unwrap(), before + 1);
    let market = h.repo.get(id).await.unwrap();
    assert_eq!(market.status, MarketStatus::Open);
    assert_eq!(market.question, "Will BTC close above $100k?");
    assert_eq!(market.creator, account(2));
    assert_eq!(market.deadline, START + ONE_DAY);
    assert_eq!((market.total_yes, market.total_no, market.pool_balance), (0, 0, 0));
    assert_eq!(economics::probability_split(&market), (50, 50));
}

#[tokio::test]
async fn test_create_with_past_deadline_fails_in_simulation() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;

    let err = alice.create("Too late?", START - 1).await.unwrap_err();
    assert_eq!(err.contract_error(), Some(ContractError::InvalidDeadline));
    assert_eq!(h.ledger.counts().submit, 0);
    assert_eq!(h.repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_sequence_advances_per_write() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    let start = h.ledger.sequence_of(&account(2)).unwrap();

    h.create(&alice, "First").await;
    h.create(&alice, "Second").await;

    assert_eq!(h.ledger.sequence_of(&account(2)), Some(start + 2));
    assert_eq!(h.repo.count().await.unwrap(), 2);
    let newest = h.repo.newest(1).await.unwrap();
    assert_eq!(newest[0].question, "Second");
}

// -- Buy --

#[tokio::test]
async fn test_buy_updates_totals_and_position() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    let id = h.create(&alice, "Will it snow?").await;

    alice.buy_shares(id, Side::Yes, 10).await.unwrap();

    let market = h.repo.get(id).await.unwrap();
    assert_eq!(market.total_yes, 10);
    assert_eq!(market.total_no, 0);
    assert_eq!(market.pool_balance, 10);
    assert_eq!(economics::yes_percent(market.total_yes, market.total_no), 100);
    assert!(economics::pool_is_balanced(&market));

    let position = h.repo.position(id, &account(2)).await.unwrap();
    assert_eq!(position.yes_shares, 10);
    assert_eq!(position.no_shares, 0);
    assert!(!position.claimed);
}

#[tokio::test]
async fn test_buy_in_xlm() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    let id = h.create(&alice, "Decimal stakes").await;

    alice.buy_shares_xlm(id, Side::No, "2.5").await.unwrap();

    let market = h.repo.get(id).await.unwrap();
    assert_eq!(market.total_no, 25_000_000);
    assert_eq!(economics::probability_split(&market), (0, 100));
}

#[tokio::test]
async fn test_buy_after_deadline_fails_before_submission() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    let id = h.create(&alice, "Expired market").await;
    let submits = h.ledger.counts().submit;

    h.ledger.set_time(START + ONE_DAY);
    let err = alice.buy_shares(id, Side::Yes, 10).await.unwrap_err();

    assert!(matches!(err, MarketError::Simulation { .. }));
    assert_eq!(err.contract_error(), Some(ContractError::MarketClosed));
    assert!(err.is_retry_safe());
    assert_eq!(h.ledger.counts().submit, submits);
    assert_eq!(h.repo.get(id).await.unwrap().pool_balance, 0);
}

#[tokio::test]
async fn test_buy_missing_market() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;

    let err = alice.buy_shares(7, Side::Yes, 10).await.unwrap_err();
    assert_eq!(err.contract_error(), Some(ContractError::MarketNotFound));
}

// -- Confirmation --

#[tokio::test(start_paused = true)]
async fn test_write_confirms_after_not_found_polls() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    h.ledger.confirm_after(3);
    let polls_before = h.ledger.counts().status;

    let outcome = alice.create("Slow ledger", START + ONE_DAY).await.unwrap();

    assert_eq!(outcome.polls, 4);
    assert_eq!(h.ledger.counts().status - polls_before, 4);
    assert_eq!(created_market_id(&outcome), Some(0));
    assert_eq!(h.repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_write_reports_hash_and_ledger() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;

    let outcome = alice.create("Hashing", START + ONE_DAY).await.unwrap();
    assert_eq!(outcome.hash.len(), 64);
    assert!(outcome.ledger > 1);
    assert_eq!(outcome.polls, 1);
    // confirmed value agrees with the simulated one
    assert_eq!(outcome.return_value, outcome.simulated_return);
}

#[tokio::test]
async fn test_confirmed_return_value_read_from_result_meta() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    h.create(&alice, "First").await;

    let outcome = alice.create("Second", START + ONE_DAY).await.unwrap();
    let confirmed = outcome.return_value.as_ref().expect("meta carries the return value");
    assert_eq!(contract::decode_u64(confirmed).unwrap(), 1);
    assert_eq!(created_market_id(&outcome), Some(1));

    let id = created_market_id(&outcome).unwrap();
    alice.buy_shares(id, Side::Yes, 10).await.unwrap();
    let buy = alice.buy_shares(id, Side::No, 10).await.unwrap();
    // buy_shares returns nothing, which the meta records as Void
    assert_eq!(buy.return_value, Some(ScVal::Void));
}

#[tokio::test]
async fn test_on_chain_failure_surfaces_hash() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    h.ledger.fail_next_on_chain();

    let err = alice.create("Reverted", START + ONE_DAY).await.unwrap_err();
    match err {
        MarketError::OnChainFailure { hash, .. } => assert_eq!(hash.len(), 64),
        other => panic!("expected OnChainFailure, got {other:?}"),
    }
    assert_eq!(h.ledger.counts().submit, 1);
    assert_eq!(h.repo.count().await.unwrap(), 0);
}

// -- Wallet --

#[tokio::test]
async fn test_declined_signature_submits_nothing() {
    let h = Harness::new();
    h.ledger.fund(&account(3));
    let actions = h.actions_with(TestWallet::refusing(&account(3))).await;

    let err = actions.create("Declined", START + ONE_DAY).await.unwrap_err();
    assert!(matches!(err, MarketError::Signer(SignerError::Rejected(_))));
    assert_eq!(h.ledger.counts().simulate, 1);
    assert_eq!(h.ledger.counts().submit, 0);
}

#[tokio::test]
async fn test_wallet_account_switch_blocks_signing() {
    let h = Harness::new();
    h.ledger.fund(&account(2));
    h.ledger.fund(&account(3));
    let wallet = Arc::new(TestWallet::new(&account(2)));
    let actions = h.actions_with_shared(wallet.clone()).await;

    wallet.switch_to(&account(3));
    let err = actions.create("Switched", START + ONE_DAY).await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::Signer(SignerError::AccountChanged { .. })
    ));
    assert_eq!(h.ledger.counts().submit, 0);
    assert_eq!(h.ledger.sequence_of(&account(3)), Some(1_000));

    // switching back lets the original session sign again
    wallet.switch_to(&account(2));
    actions.create("Back again", START + ONE_DAY).await.unwrap();
    assert_eq!(h.repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unfunded_account() {
    let h = Harness::new();
    let actions = h.actions_with(TestWallet::new(&account(4))).await;

    let err = actions.create("No account", START + ONE_DAY).await.unwrap_err();
    assert!(matches!(err, MarketError::NotFound(_)));
    assert_eq!(h.ledger.counts().simulate, 0);
}

#[tokio::test]
async fn test_actions_after_disconnect() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    alice.session().disconnect().await;

    let err = alice.buy_shares(0, Side::Yes, 10).await.unwrap_err();
    assert!(matches!(err, MarketError::Signer(SignerError::NotConnected)));
    assert_eq!(h.ledger.counts().get_account, 0);
}

// -- Resolution and claims --

#[tokio::test]
async fn test_full_lifecycle() {
    let h = Harness::new();
    let admin = h.user(&h.admin).await;
    let alice = h.user(&account(2)).await;
    let bob = h.user(&account(3)).await;

    let id = h.create(&alice, "Will the launch succeed?").await;
    alice.buy_shares(id, Side::Yes, 30).await.unwrap();
    bob.buy_shares(id, Side::No, 10).await.unwrap();

    let market = h.repo.get(id).await.unwrap();
    assert_eq!(economics::probability_split(&market), (75, 25));
    assert_eq!(market.pool_balance, 40);

    // too early to settle
    let err = admin.resolve(id, Side::Yes).await.unwrap_err();
    assert_eq!(err.contract_error(), Some(ContractError::DeadlineNotReached));

    h.ledger.set_time(START + ONE_DAY);
    let market = h.repo.get(id).await.unwrap();
    assert_eq!(Phase::of(&market, h.ledger.now()), Phase::Expired);

    // only the admin may settle
    let err = alice.resolve(id, Side::Yes).await.unwrap_err();
    assert_eq!(err.contract_error(), Some(ContractError::Unauthorized));

    admin.resolve(id, Side::Yes).await.unwrap();
    let market = h.repo.get(id).await.unwrap();
    assert_eq!(market.status, MarketStatus::Resolved(Side::Yes));

    let err = admin.resolve(id, Side::No).await.unwrap_err();
    assert_eq!(err.contract_error(), Some(ContractError::MarketAlreadyResolved));

    let position = h.repo.position(id, &account(2)).await.unwrap();
    assert_eq!(economics::payout_for(&market, &position), Some(40));
    assert!(economics::has_claimable(&market, &position));

    let outcome = alice.claim_winnings(id).await.unwrap();
    assert_eq!(claimed_amount(&outcome), Some(40));

    let position = h.repo.position(id, &account(2)).await.unwrap();
    assert!(position.claimed);
    assert!(!economics::has_claimable(&market, &position));

    // the losing side collects nothing
    let bob_position = h.repo.position(id, &account(3)).await.unwrap();
    assert_eq!(economics::payout_for(&market, &bob_position), Some(0));
    assert!(!economics::has_claimable(&market, &bob_position));
}

#[tokio::test]
async fn test_second_claim_rejected() {
    let h = Harness::new();
    let admin = h.user(&h.admin).await;
    let alice = h.user(&account(2)).await;

    let id = h.create(&alice, "Double claim").await;
    alice.buy_shares(id, Side::No, 5).await.unwrap();
    h.ledger.set_time(START + ONE_DAY + 1);
    admin.resolve(id, Side::No).await.unwrap();

    alice.claim_winnings(id).await.unwrap();
    let submits = h.ledger.counts().submit;

    let err = alice.claim_winnings(id).await.unwrap_err();
    assert_eq!(err.contract_error(), Some(ContractError::AlreadyClaimed));
    assert_eq!(h.ledger.counts().submit, submits);
}

#[tokio::test]
async fn test_claim_before_resolution() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    let id = h.create(&alice, "Early claim").await;
    alice.buy_shares(id, Side::Yes, 5).await.unwrap();

    let err = alice.claim_winnings(id).await.unwrap_err();
    assert_eq!(err.contract_error(), Some(ContractError::MarketNotResolved));
}

#[tokio::test]
async fn test_listing_and_ticker() {
    let h = Harness::new();
    let alice = h.user(&account(2)).await;
    for q in ["One", "Two", "Three"] {
        h.create(&alice, q).await;
    }
    alice.buy_shares(1, Side::Yes, 20_000_000).await.unwrap();

    let markets = h.repo.list().await.unwrap();
    let ids: Vec<u64> = markets.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(h.repo.cache().len(), 3);

    let ticker = h.repo.ticker(2).await.unwrap();
    assert_eq!(ticker.len(), 2);
    assert_eq!(ticker[1].question, "Two");
    assert_eq!(ticker[1].yes_percent, 100);
    assert_eq!(ticker[1].volume, "2");
}
