use soroban_sdk::{contractclient, Address, Env};

/// Owner-gated surface of the token sold by the sale.
#[allow(dead_code)]
#[contractclient(name = "SaleTokenClient")]
pub trait SaleToken {
    fn mint(env: Env, caller: Address, to: Address, amount: i128);
    fn finish_minting(env: Env, caller: Address);
    fn unpause(env: Env, caller: Address);
    fn transfer_ownership(env: Env, caller: Address, new_owner: Address);
    fn claim_ownership(env: Env, caller: Address);
}

/// Refund vault holding contributions until the sale is finalized.
#[allow(dead_code)]
#[contractclient(name = "EscrowClient")]
pub trait Escrow {
    fn deposit(env: Env, caller: Address, from: Address, payee: Address, amount: i128);
    fn close(env: Env, caller: Address);
    fn enable_refunds(env: Env, caller: Address);
    fn beneficiary_withdraw(env: Env) -> i128;
    fn withdraw(env: Env, payee: Address) -> i128;
    fn deposits_of(env: Env, payee: Address) -> i128;
}
