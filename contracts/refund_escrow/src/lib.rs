#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, token, Address, Env,
};

const DAY_IN_LEDGERS: u32 = 17280;
const BUMP_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;
const BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;

/// Fee percentages are whole percents of the escrowed balance.
pub const MAX_FEE_PERCENT: u32 = 100;

#[contract]
pub struct RefundEscrow;

/// `Active` accepts deposits. `Closed` and `Refunding` are terminal and exclusive of each other.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[contracttype]
pub enum EscrowState {
    Active,
    Closed,
    Refunding,
}

#[derive(Clone)]
#[contracttype]
enum DataKey {
    Owner,
    PaymentToken,
    Beneficiary,
    FeeWallet,
    FeePercent,
    State,
    Deposit(Address),
}

#[contracterror]
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[repr(u32)]
pub enum Error {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    NotOwner = 3,
    NotActive = 4,
    InvalidState = 5,
    InvalidAmount = 6,
    InvalidArgument = 7,
    MathOverflow = 8,
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

fn require_owner(env: &Env, caller: &Address) -> Result<(), Error> {
    let owner = read_address(env, &DataKey::Owner)?;
    if *caller != owner {
        return Err(Error::NotOwner);
    }
    caller.require_auth();
    Ok(())
}

fn read_state(env: &Env) -> Result<EscrowState, Error> {
    env.storage()
        .instance()
        .get(&DataKey::State)
        .ok_or(Error::NotInitialized)
}

fn write_state(env: &Env, state: EscrowState) {
    env.storage().instance().set(&DataKey::State, &state);
    extend_instance(env);
}

fn read_fee_percent(env: &Env) -> Result<u32, Error> {
    env.storage()
        .instance()
        .get(&DataKey::FeePercent)
        .ok_or(Error::NotInitialized)
}

fn read_deposit(env: &Env, payee: &Address) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::Deposit(payee.clone()))
        .unwrap_or(0)
}

fn write_deposit(env: &Env, payee: &Address, amount: i128) {
    let key = DataKey::Deposit(payee.clone());
    env.storage().persistent().set(&key, &amount);
    env.storage()
        .persistent()
        .extend_ttl(&key, BUMP_THRESHOLD, BUMP_AMOUNT);
}

/// Moves the escrow from `Active` into `next`, failing for any other starting state.
fn transition(env: &Env, caller: &Address, next: EscrowState) -> Result<(), Error> {
    require_owner(env, caller)?;
    if read_state(env)? != EscrowState::Active {
        return Err(Error::InvalidState);
    }
    write_state(env, next);
    Ok(())
}

/// Splits `balance` into `(beneficiary_share, fee_share)`. The beneficiary share is floored,
/// so rounding dust goes to the fee wallet.
fn split_fee(balance: i128, fee_percent: u32) -> Result<(i128, i128), Error> {
    let kept_percent = MAX_FEE_PERCENT
        .checked_sub(fee_percent)
        .ok_or(Error::MathOverflow)?;
    let beneficiary_share = balance
        .checked_mul(i128::from(kept_percent))
        .ok_or(Error::MathOverflow)?
        .checked_div(100)
        .ok_or(Error::MathOverflow)?;
    let fee_share = balance
        .checked_sub(beneficiary_share)
        .ok_or(Error::MathOverflow)?;
    Ok((beneficiary_share, fee_share))
}

#[contractimpl]
impl RefundEscrow {
    pub fn initialize(
        env: Env,
        owner: Address,
        payment_token: Address,
        beneficiary: Address,
        fee_wallet: Address,
        fee_percent: u32,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }
        owner.require_auth();
        if fee_percent > MAX_FEE_PERCENT {
            return Err(Error::InvalidArgument);
        }

        let storage = env.storage().instance();
        storage.set(&DataKey::Owner, &owner);
        storage.set(&DataKey::PaymentToken, &payment_token);
        storage.set(&DataKey::Beneficiary, &beneficiary);
        storage.set(&DataKey::FeeWallet, &fee_wallet);
        storage.set(&DataKey::FeePercent, &fee_percent);
        storage.set(&DataKey::State, &EscrowState::Active);
        extend_instance(&env);
        Ok(())
    }

    pub fn state(env: Env) -> Result<EscrowState, Error> {
        read_state(&env)
    }

    pub fn deposits_of(env: Env, payee: Address) -> i128 {
        read_deposit(&env, &payee)
    }

    pub fn owner(env: Env) -> Result<Address, Error> {
        read_address(&env, &DataKey::Owner)
    }

    pub fn beneficiary(env: Env) -> Result<Address, Error> {
        read_address(&env, &DataKey::Beneficiary)
    }

    pub fn fee_wallet(env: Env) -> Result<Address, Error> {
        read_address(&env, &DataKey::FeeWallet)
    }

    pub fn fee_percent(env: Env) -> Result<u32, Error> {
        read_fee_percent(&env)
    }

    /// Owner-only. Pulls `amount` of the payment asset from `from` and credits it to `payee`.
    pub fn deposit(
        env: Env,
        caller: Address,
        from: Address,
        payee: Address,
        amount: i128,
    ) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        if read_state(&env)? != EscrowState::Active {
            return Err(Error::NotActive);
        }
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        from.require_auth();

        let credited = read_deposit(&env, &payee)
            .checked_add(amount)
            .ok_or(Error::MathOverflow)?;
        write_deposit(&env, &payee, credited);

        let payment = read_address(&env, &DataKey::PaymentToken)?;
        token::Client::new(&env, &payment).transfer(
            &from,
            &env.current_contract_address(),
            &amount,
        );

        env.events()
            .publish((symbol_short!("deposited"), payee), amount);
        Ok(())
    }

    pub fn close(env: Env, caller: Address) -> Result<(), Error> {
        transition(&env, &caller, EscrowState::Closed)?;
        env.events().publish((symbol_short!("closed"),), ());
        Ok(())
    }

    pub fn enable_refunds(env: Env, caller: Address) -> Result<(), Error> {
        transition(&env, &caller, EscrowState::Refunding)?;
        env.events().publish((symbol_short!("refunds"),), ());
        Ok(())
    }

    /// Pays out the whole current balance, net of the fee share. Callable by anyone once closed.
    pub fn beneficiary_withdraw(env: Env) -> Result<i128, Error> {
        if read_state(&env)? != EscrowState::Closed {
            return Err(Error::InvalidState);
        }

        let payment = read_address(&env, &DataKey::PaymentToken)?;
        let client = token::Client::new(&env, &payment);
        let contract = env.current_contract_address();
        let balance = client.balance(&contract);
        let (beneficiary_share, fee_share) = split_fee(balance, read_fee_percent(&env)?)?;

        let beneficiary = read_address(&env, &DataKey::Beneficiary)?;
        let fee_wallet = read_address(&env, &DataKey::FeeWallet)?;
        if beneficiary_share > 0 {
            client.transfer(&contract, &beneficiary, &beneficiary_share);
        }
        if fee_share > 0 {
            client.transfer(&contract, &fee_wallet, &fee_share);
        }

        env.events().publish(
            (symbol_short!("ben_wdraw"), beneficiary),
            (beneficiary_share, fee_share),
        );
        Ok(beneficiary_share)
    }

    /// Refunds `payee` in full. A payee with nothing on deposit gets a successful no-op.
    pub fn withdraw(env: Env, payee: Address) -> Result<i128, Error> {
        if read_state(&env)? != EscrowState::Refunding {
            return Err(Error::InvalidState);
        }

        let payment_amount = read_deposit(&env, &payee);
        if payment_amount == 0 {
            return Ok(0);
        }
        write_deposit(&env, &payee, 0);

        let payment = read_address(&env, &DataKey::PaymentToken)?;
        token::Client::new(&env, &payment).transfer(
            &env.current_contract_address(),
            &payee,
            &payment_amount,
        );

        env.events()
            .publish((symbol_short!("withdrawn"), payee), payment_amount);
        Ok(payment_amount)
    }

    pub fn set_fee_percent(env: Env, caller: Address, fee_percent: u32) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        if read_state(&env)? != EscrowState::Active {
            return Err(Error::InvalidState);
        }
        if fee_percent > MAX_FEE_PERCENT {
            return Err(Error::InvalidArgument);
        }

        let previous = read_fee_percent(&env)?;
        env.storage()
            .instance()
            .set(&DataKey::FeePercent, &fee_percent);
        extend_instance(&env);

        env.events()
            .publish((symbol_short!("fee_upd"),), (previous, fee_percent));
        Ok(())
    }
}
