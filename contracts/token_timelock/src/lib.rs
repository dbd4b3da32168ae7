#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, token, Address, Env,
};

const DAY_IN_LEDGERS: u32 = 17280;
const BUMP_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;
const BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;

const WEEK: u64 = 7 * 24 * 60 * 60;

/// Spacing between two tranche unlocks.
pub const TRANCHE_INTERVAL: u64 = 24 * WEEK;
pub const TRANCHES: u64 = 4;

#[contract]
pub struct TokenTimelock;

#[derive(Clone)]
#[contracttype]
enum DataKey {
    Token,
    Beneficiary,
    ReleaseTime,
    Released,
}

#[contracterror]
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[repr(u32)]
pub enum Error {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    InvalidArgument = 3,
    TooEarly = 4,
    NothingToRelease = 5,
    MathOverflow = 6,
}

fn extend_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(BUMP_THRESHOLD, BUMP_AMOUNT);
}

fn read_address(env: &Env, key: &DataKey) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(key)
        .ok_or(Error::NotInitialized)
}

fn read_release_time(env: &Env) -> Result<u64, Error> {
    env.storage()
        .instance()
        .get(&DataKey::ReleaseTime)
        .ok_or(Error::NotInitialized)
}

fn read_released(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::Released)
        .unwrap_or(0)
}

/// Number of tranches unlocked at `now`, zero before the first release time.
fn unlocked_tranches(release_time: u64, now: u64) -> u64 {
    if now < release_time {
        return 0;
    }
    let elapsed = (now - release_time) / TRANCHE_INTERVAL;
    TRANCHES.min(elapsed.saturating_add(1))
}

/// Amount the beneficiary is owed but has not received yet.
fn compute_releasable(env: &Env) -> Result<i128, Error> {
    let release_time = read_release_time(env)?;
    let tranches = unlocked_tranches(release_time, env.ledger().timestamp());
    if tranches == 0 {
        return Err(Error::TooEarly);
    }

    let token = read_address(env, &DataKey::Token)?;
    let balance = token::Client::new(env, &token).balance(&env.current_contract_address());
    let released = read_released(env);
    let locked_total = balance.checked_add(released).ok_or(Error::MathOverflow)?;

    let entitled = locked_total
        .checked_mul(i128::from(tranches))
        .ok_or(Error::MathOverflow)?
        .checked_div(i128::from(TRANCHES))
        .ok_or(Error::MathOverflow)?;

    Ok(entitled.saturating_sub(released).max(0))
}

#[contractimpl]
impl TokenTimelock {
    /// The token balance held by this contract at each release is what gets vested.
    /// The beneficiary authorises the schedule it is bound to.
    pub fn initialize(
        env: Env,
        token: Address,
        beneficiary: Address,
        release_time: u64,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Token) {
            return Err(Error::AlreadyInitialized);
        }
        beneficiary.require_auth();
        if release_time <= env.ledger().timestamp() {
            return Err(Error::InvalidArgument);
        }

        let storage = env.storage().instance();
        storage.set(&DataKey::Token, &token);
        storage.set(&DataKey::Beneficiary, &beneficiary);
        storage.set(&DataKey::ReleaseTime, &release_time);
        storage.set(&DataKey::Released, &0i128);
        extend_instance(&env);
        Ok(())
    }

    pub fn token(env: Env) -> Result<Address, Error> {
        read_address(&env, &DataKey::Token)
    }

    pub fn beneficiary(env: Env) -> Result<Address, Error> {
        read_address(&env, &DataKey::Beneficiary)
    }

    pub fn release_time(env: Env) -> Result<u64, Error> {
        read_release_time(&env)
    }

    pub fn released(env: Env) -> i128 {
        read_released(&env)
    }

    /// Zero before the first release time.
    pub fn releasable(env: Env) -> Result<i128, Error> {
        match compute_releasable(&env) {
            Err(Error::TooEarly) => Ok(0),
            other => other,
        }
    }

    /// Sends every unlocked and unreleased token to the beneficiary. Anyone may trigger it.
    pub fn release(env: Env) -> Result<i128, Error> {
        let amount = compute_releasable(&env)?;
        if amount == 0 {
            return Err(Error::NothingToRelease);
        }

        let released = read_released(&env)
            .checked_add(amount)
            .ok_or(Error::MathOverflow)?;
        env.storage().instance().set(&DataKey::Released, &released);
        extend_instance(&env);

        let token = read_address(&env, &DataKey::Token)?;
        let beneficiary = read_address(&env, &DataKey::Beneficiary)?;
        token::Client::new(&env, &token).transfer(
            &env.current_contract_address(),
            &beneficiary,
            &amount,
        );

        env.events()
            .publish((symbol_short!("released"), beneficiary), (amount, released));
        Ok(amount)
    }
}
