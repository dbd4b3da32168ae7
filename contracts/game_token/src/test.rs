#![cfg(test)]

use super::{Error, GameToken, GameTokenClient};
use soroban_sdk::{
    testutils::{Address as _, Ledger},
    Address, Env, InvokeError, String,
};

const EXPIRATION: u32 = 1_000;

fn assert_contract_error<T, C>(
    result: Result<Result<T, C>, Result<Error, InvokeError>>,
    expected: Error,
) {
    assert!(matches!(result, Err(Ok(err)) if err == expected));
}

fn setup(env: &Env) -> (GameTokenClient<'_>, Address) {
    env.mock_all_auths();
    let owner = Address::generate(env);
    let contract_id = env.register(GameToken, ());
    let client = GameTokenClient::new(env, &contract_id);
    client.initialize(
        &owner,
        &String::from_str(env, "Game Protocol Token"),
        &String::from_str(env, "GXT"),
        &18,
    );
    (client, owner)
}

#[test]
fn test_metadata_after_construction() {
    let env = Env::default();
    let (client, owner) = setup(&env);

    assert_eq!(client.name(), String::from_str(&env, "Game Protocol Token"));
    assert_eq!(client.symbol(), String::from_str(&env, "GXT"));
    assert_eq!(client.decimals(), 18);
    assert_eq!(client.total_supply(), 0);
    assert_eq!(client.owner(), owner);
    assert!(client.paused());
    assert!(!client.minting_finished());
}

#[test]
fn test_initialize_twice_fails() {
    let env = Env::default();
    let (client, owner) = setup(&env);

    assert_contract_error(
        client.try_initialize(
            &owner,
            &String::from_str(&env, "Other"),
            &String::from_str(&env, "OTH"),
            &18,
        ),
        Error::AlreadyInitialized,
    );
}

#[test]
fn test_issue_updates_balance_and_total_supply() {
    let env = Env::default();
    let (client, owner) = setup(&env);
    let account = Address::generate(&env);

    client.issue(&owner, &account, &100);

    assert_eq!(client.total_supply(), 100);
    assert_eq!(client.balance(&account), 100);

    client.issue(&owner, &owner, &100);
    assert_eq!(client.balance(&owner), 100);
    assert_eq!(client.total_supply(), 200);
}

#[test]
fn test_mint_rejects_token_address_and_non_owner() {
    let env = Env::default();
    let (client, owner) = setup(&env);
    let stranger = Address::generate(&env);

    assert_contract_error(
        client.try_mint(&owner, &client.address, &100),
        Error::InvalidRecipient,
    );
    assert_contract_error(
        client.try_mint(&stranger, &stranger, &100),
        Error::NotOwner,
    );
    assert_contract_error(client.try_mint(&owner, &owner, &-1), Error::InvalidAmount);
    assert_eq!(client.total_supply(), 0);
}

#[test]
fn test_destroy_by_owner_and_by_holder() {
    let env = Env::default();
    let (client, owner) = setup(&env);
    let holder = Address::generate(&env);
    let stranger = Address::generate(&env);

    client.issue(&owner, &holder, &100);
    client.destroy(&owner, &holder, &20);
    assert_eq!(client.balance(&holder), 80);
    assert_eq!(client.total_supply(), 80);

    client.destroy(&holder, &holder, &30);
    assert_eq!(client.balance(&holder), 50);
    assert_eq!(client.total_supply(), 50);

    assert_contract_error(
        client.try_destroy(&stranger, &holder, &10),
        Error::NotOwner,
    );
    assert_contract_error(
        client.try_destroy(&owner, &holder, &51),
        Error::InsufficientBalance,
    );
    assert_eq!(client.total_supply(), 50);
}

#[test]
fn test_transfer_blocked_while_paused() {
    let env = Env::default();
    let (client, owner) = setup(&env);
    let receiver = Address::generate(&env);

    client.mint(&owner, &owner, &1_000);
    assert_contract_error(
        client.try_transfer(&owner, &receiver, &100),
        Error::TransfersPaused,
    );

    client.disable_transfers(&owner, &false);
    assert!(!client.paused());
    client.transfer(&owner, &receiver, &100);
    assert_eq!(client.balance(&owner), 900);
    assert_eq!(client.balance(&receiver), 100);

    client.disable_transfers(&owner, &true);
    assert!(client.paused());
    assert_contract_error(
        client.try_transfer(&owner, &receiver, &100),
        Error::TransfersPaused,
    );
}

#[test]
fn test_non_owner_cannot_toggle_transfers() {
    let env = Env::default();
    let (client, _) = setup(&env);
    let stranger = Address::generate(&env);

    assert_contract_error(
        client.try_disable_transfers(&stranger, &false),
        Error::NotOwner,
    );
    assert_contract_error(client.try_unpause(&stranger), Error::NotOwner);
    assert!(client.paused());
}

#[test]
fn test_transfer_failures_leave_balances_untouched() {
    let env = Env::default();
    let (client, owner) = setup(&env);
    let receiver = Address::generate(&env);

    client.unpause(&owner);
    client.mint(&owner, &owner, &10_000);

    assert_contract_error(
        client.try_transfer(&owner, &receiver, &10_001),
        Error::InsufficientBalance,
    );
    assert_contract_error(
        client.try_transfer(&owner, &client.address, &1),
        Error::InvalidRecipient,
    );

    client.transfer(&owner, &receiver, &500);
    assert_eq!(client.balance(&owner), 9_500);
    assert_eq!(client.balance(&receiver), 500);
    assert_eq!(
        client.balance(&owner) + client.balance(&receiver),
        client.total_supply()
    );
}

#[test]
fn test_approve_then_transfer_from_exact_allowance() {
    let env = Env::default();
    let (client, owner) = setup(&env);
    let spender = Address::generate(&env);
    let receiver = Address::generate(&env);

    client.unpause(&owner);
    client.mint(&owner, &owner, &10_000);
    client.approve(&owner, &spender, &500, &EXPIRATION);
    assert_eq!(client.allowance(&owner, &spender), 500);

    client.transfer_from(&spender, &owner, &receiver, &500);

    assert_eq!(client.allowance(&owner, &spender), 0);
    assert_eq!(client.balance(&owner), 9_500);
    assert_eq!(client.balance(&receiver), 500);

    assert_contract_error(
        client.try_transfer_from(&spender, &owner, &receiver, &1),
        Error::InsufficientAllowance,
    );
}

#[test]
fn test_transfer_from_blocked_while_paused() {
    let env = Env::default();
    let (client, owner) = setup(&env);
    let spender = Address::generate(&env);
    let receiver = Address::generate(&env);

    client.unpause(&owner);
    client.mint(&owner, &owner, &1_000);
    client.approve(&owner, &spender, &500, &EXPIRATION);
    client.transfer_from(&spender, &owner, &receiver, &50);

    client.pause(&owner);
    assert_contract_error(
        client.try_transfer_from(&spender, &owner, &receiver, &50),
        Error::TransfersPaused,
    );
    assert_eq!(client.allowance(&owner, &spender), 450);
    assert_eq!(client.balance(&receiver), 50);
}

#[test]
fn test_approve_rejects_past_expiration() {
    let env = Env::default();
    let (client, owner) = setup(&env);
    let spender = Address::generate(&env);

    env.ledger().with_mut(|li| li.sequence_number = 100);
    assert_contract_error(
        client.try_approve(&owner, &spender, &500, &99),
        Error::InvalidArgument,
    );
    assert_eq!(client.allowance(&owner, &spender), 0);

    client.approve(&owner, &spender, &500, &200);
    assert_eq!(client.allowance(&owner, &spender), 500);
}

#[test]
fn test_burn_and_burn_from() {
    let env = Env::default();
    let (client, owner) = setup(&env);
    let holder = Address::generate(&env);
    let spender = Address::generate(&env);

    client.mint(&owner, &holder, &1_000);
    client.burn(&holder, &100);
    assert_eq!(client.balance(&holder), 900);

    client.approve(&holder, &spender, &200, &EXPIRATION);
    client.burn_from(&spender, &holder, &150);
    assert_eq!(client.balance(&holder), 750);
    assert_eq!(client.allowance(&holder, &spender), 50);
    assert_eq!(client.total_supply(), 750);

    assert_contract_error(
        client.try_burn(&holder, &751),
        Error::InsufficientBalance,
    );
}

#[test]
fn test_finish_minting_is_permanent() {
    let env = Env::default();
    let (client, owner) = setup(&env);

    client.mint(&owner, &owner, &100);
    client.finish_minting(&owner);
    assert!(client.minting_finished());

    assert_contract_error(client.try_mint(&owner, &owner, &1), Error::MintingFinished);
    assert_contract_error(client.try_finish_minting(&owner), Error::MintingFinished);
    assert_eq!(client.total_supply(), 100);
}

#[test]
fn test_two_step_ownership_transfer() {
    let env = Env::default();
    let (client, owner) = setup(&env);
    let next_owner = Address::generate(&env);
    let stranger = Address::generate(&env);

    assert_contract_error(client.try_claim_ownership(&next_owner), Error::NoPendingOwner);

    client.transfer_ownership(&owner, &next_owner);
    assert_eq!(client.owner(), owner);
    assert_eq!(client.pending_owner(), Some(next_owner.clone()));

    assert_contract_error(client.try_claim_ownership(&stranger), Error::NoPendingOwner);

    client.claim_ownership(&next_owner);
    assert_eq!(client.owner(), next_owner);
    assert_eq!(client.pending_owner(), None);

    assert_contract_error(client.try_mint(&owner, &owner, &1), Error::NotOwner);
    client.mint(&next_owner, &owner, &1);
    assert_eq!(client.balance(&owner), 1);
}

#[test]
fn test_supply_matches_sum_of_balances() {
    let env = Env::default();
    let (client, owner) = setup(&env);
    let alice = Address::generate(&env);
    let bob = Address::generate(&env);
    let carol = Address::generate(&env);

    client.unpause(&owner);
    client.mint(&owner, &alice, &5_000);
    client.mint(&owner, &bob, &3_000);
    client.transfer(&alice, &carol, &1_200);
    client.burn(&bob, &700);
    client.destroy(&owner, &carol, &200);
    let _ = client.try_transfer(&bob, &alice, &10_000);

    let sum = client.balance(&alice) + client.balance(&bob) + client.balance(&carol);
    assert_eq!(sum, client.total_supply());
    assert_eq!(client.total_supply(), 7_100);
}
