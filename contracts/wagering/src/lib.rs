#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, token, Address, Env,
};

const DAY_IN_LEDGERS: u32 = 17280;
const BUMP_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;
const BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;

/// Seconds after the start of a match before anyone may unwind it.
pub const REFUND_TIMEOUT: u64 = 60 * 60;

#[contract]
pub struct Wagering;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[contracttype]
pub enum MatchState {
    None,
    Started,
    Ended,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub struct MatchRecord {
    pub player1: Address,
    pub player2: Address,
    pub bet: i128,
    pub started_at: u64,
    pub state: MatchState,
}

#[derive(Clone)]
#[contracttype]
enum DataKey {
    Owner,
    Token,
    Match(u64),
}

#[contracterror]
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[repr(u32)]
pub enum Error {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    NotOwner = 3,
    InvalidArgument = 4,
    InvalidAmount = 5,
    InsufficientBalance = 6,
    InsufficientAllowance = 7,
    MatchExists = 8,
    MatchNotStarted = 9,
    InvalidWinner = 10,
    TooEarly = 11,
    MathOverflow = 12,
}

fn read_address(env: &Env, key: &DataKey) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(key)
        .ok_or(Error::NotInitialized)
}

fn require_operator(env: &Env, caller: &Address) -> Result<(), Error> {
    let owner = read_address(env, &DataKey::Owner)?;
    if *caller != owner {
        return Err(Error::NotOwner);
    }
    caller.require_auth();
    Ok(())
}

fn read_match(env: &Env, match_id: u64) -> Option<MatchRecord> {
    env.storage().persistent().get(&DataKey::Match(match_id))
}

fn write_match(env: &Env, match_id: u64, record: &MatchRecord) {
    let key = DataKey::Match(match_id);
    env.storage().persistent().set(&key, record);
    env.storage()
        .persistent()
        .extend_ttl(&key, BUMP_THRESHOLD, BUMP_AMOUNT);
}

fn read_started_match(env: &Env, match_id: u64) -> Result<MatchRecord, Error> {
    match read_match(env, match_id) {
        Some(record) if record.state == MatchState::Started => Ok(record),
        _ => Err(Error::MatchNotStarted),
    }
}

/// Marks the match ended. Must run before any stake leaves the contract.
fn end_match(env: &Env, match_id: u64, mut record: MatchRecord) -> MatchRecord {
    record.state = MatchState::Ended;
    write_match(env, match_id, &record);
    record
}

fn check_stake(
    client: &token::Client,
    player: &Address,
    spender: &Address,
    bet: i128,
) -> Result<(), Error> {
    if client.balance(player) < bet {
        return Err(Error::InsufficientBalance);
    }
    if client.allowance(player, spender) < bet {
        return Err(Error::InsufficientAllowance);
    }
    Ok(())
}

fn return_stakes(env: &Env, record: &MatchRecord) -> Result<(), Error> {
    let token = read_address(env, &DataKey::Token)?;
    let client = token::Client::new(env, &token);
    let contract = env.current_contract_address();
    client.transfer(&contract, &record.player1, &record.bet);
    client.transfer(&contract, &record.player2, &record.bet);
    Ok(())
}

#[contractimpl]
impl Wagering {
    /// `owner` reports match starts and results.
    pub fn initialize(env: Env, owner: Address, token: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }
        owner.require_auth();
        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage()
            .instance()
            .extend_ttl(BUMP_THRESHOLD, BUMP_AMOUNT);
        Ok(())
    }

    pub fn owner(env: Env) -> Result<Address, Error> {
        read_address(&env, &DataKey::Owner)
    }

    pub fn token(env: Env) -> Result<Address, Error> {
        read_address(&env, &DataKey::Token)
    }

    pub fn get_match(env: Env, match_id: u64) -> Option<MatchRecord> {
        read_match(&env, match_id)
    }

    pub fn match_state(env: Env, match_id: u64) -> MatchState {
        read_match(&env, match_id)
            .map(|record| record.state)
            .unwrap_or(MatchState::None)
    }

    /// Pulls `bet` from both players. Each must have approved this contract beforehand.
    pub fn match_started(
        env: Env,
        caller: Address,
        match_id: u64,
        player1: Address,
        player2: Address,
        bet: i128,
    ) -> Result<(), Error> {
        require_operator(&env, &caller)?;
        if read_match(&env, match_id).is_some() {
            return Err(Error::MatchExists);
        }
        if player1 == player2 {
            return Err(Error::InvalidArgument);
        }
        if bet <= 0 {
            return Err(Error::InvalidAmount);
        }

        let token = read_address(&env, &DataKey::Token)?;
        let client = token::Client::new(&env, &token);
        let contract = env.current_contract_address();
        check_stake(&client, &player1, &contract, bet)?;
        check_stake(&client, &player2, &contract, bet)?;

        let record = MatchRecord {
            player1: player1.clone(),
            player2: player2.clone(),
            bet,
            started_at: env.ledger().timestamp(),
            state: MatchState::Started,
        };
        write_match(&env, match_id, &record);

        client.transfer_from(&contract, &player1, &contract, &bet);
        client.transfer_from(&contract, &player2, &contract, &bet);

        env.events().publish(
            (symbol_short!("m_start"), match_id),
            (player1, player2, bet),
        );
        Ok(())
    }

    /// `None` is a draw and returns each stake.
    pub fn match_ended(
        env: Env,
        caller: Address,
        match_id: u64,
        winner: Option<Address>,
    ) -> Result<(), Error> {
        require_operator(&env, &caller)?;
        let record = read_started_match(&env, match_id)?;

        match winner.clone() {
            Some(player) => {
                if player != record.player1 && player != record.player2 {
                    return Err(Error::InvalidWinner);
                }
                let record = end_match(&env, match_id, record);
                let pot = record.bet.checked_mul(2).ok_or(Error::MathOverflow)?;
                let token = read_address(&env, &DataKey::Token)?;
                token::Client::new(&env, &token).transfer(
                    &env.current_contract_address(),
                    &player,
                    &pot,
                );
            }
            None => {
                let record = end_match(&env, match_id, record);
                return_stakes(&env, &record)?;
            }
        }

        env.events()
            .publish((symbol_short!("match_end"), match_id), winner);
        Ok(())
    }

    /// Unwinds a match whose result was never reported. Open to anyone after the timeout.
    pub fn refund_match(env: Env, match_id: u64) -> Result<(), Error> {
        let record = read_started_match(&env, match_id)?;
        let elapsed = env
            .ledger()
            .timestamp()
            .saturating_sub(record.started_at);
        if elapsed < REFUND_TIMEOUT {
            return Err(Error::TooEarly);
        }

        let record = end_match(&env, match_id, record);
        return_stakes(&env, &record)?;

        env.events()
            .publish((symbol_short!("m_refund"), match_id), record.bet);
        Ok(())
    }
}
