#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, Address, Env, String,
};

const DAY_IN_LEDGERS: u32 = 17280;
const BUMP_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;
const BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;

#[contract]
pub struct GameToken;

#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub struct AllowanceValue {
    pub amount: i128,
    pub expiration_ledger: u32,
}

#[derive(Clone)]
#[contracttype]
enum DataKey {
    Owner,
    /// Set by `transfer_ownership`, cleared by `claim_ownership`.
    PendingOwner,
    Name,
    Symbol,
    Decimals,
    TotalSupply,
    /// Transfers are rejected while set. Minting and burning are unaffected.
    Paused,
    MintingFinished,
    Balance(Address),
    Allowance(Address, Address),
}

#[contracterror]
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[repr(u32)]
pub enum Error {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    NotOwner = 3,
    TransfersPaused = 4,
    InsufficientBalance = 5,
    InsufficientAllowance = 6,
    /// Recipient is the token contract itself.
    InvalidRecipient = 7,
    InvalidAmount = 8,
    MathOverflow = 9,
    MintingFinished = 10,
    NoPendingOwner = 11,
    InvalidArgument = 12,
}

fn extend_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(BUMP_THRESHOLD, BUMP_AMOUNT);
}

fn read_owner(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Owner)
        .ok_or(Error::NotInitialized)
}

fn require_owner(env: &Env, caller: &Address) -> Result<(), Error> {
    let owner = read_owner(env)?;
    if *caller != owner {
        return Err(Error::NotOwner);
    }
    caller.require_auth();
    Ok(())
}

fn read_flag(env: &Env, key: &DataKey) -> bool {
    env.storage().instance().get(key).unwrap_or(false)
}

fn read_total_supply(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::TotalSupply)
        .unwrap_or(0)
}

fn write_total_supply(env: &Env, supply: i128) {
    env.storage().instance().set(&DataKey::TotalSupply, &supply);
    extend_instance(env);
}

fn read_balance(env: &Env, id: &Address) -> i128 {
    let key = DataKey::Balance(id.clone());
    match env.storage().persistent().get::<_, i128>(&key) {
        Some(balance) => {
            env.storage()
                .persistent()
                .extend_ttl(&key, BUMP_THRESHOLD, BUMP_AMOUNT);
            balance
        }
        None => 0,
    }
}

fn write_balance(env: &Env, id: &Address, balance: i128) {
    let key = DataKey::Balance(id.clone());
    env.storage().persistent().set(&key, &balance);
    env.storage()
        .persistent()
        .extend_ttl(&key, BUMP_THRESHOLD, BUMP_AMOUNT);
}

fn read_allowance(env: &Env, from: &Address, spender: &Address) -> AllowanceValue {
    let key = DataKey::Allowance(from.clone(), spender.clone());
    match env.storage().temporary().get::<_, AllowanceValue>(&key) {
        Some(allowance) if allowance.expiration_ledger >= env.ledger().sequence() => allowance,
        _ => AllowanceValue {
            amount: 0,
            expiration_ledger: 0,
        },
    }
}

fn write_allowance(
    env: &Env,
    from: &Address,
    spender: &Address,
    amount: i128,
    expiration_ledger: u32,
) -> Result<(), Error> {
    let sequence = env.ledger().sequence();
    if amount > 0 && expiration_ledger < sequence {
        return Err(Error::InvalidArgument);
    }

    let key = DataKey::Allowance(from.clone(), spender.clone());
    let allowance = AllowanceValue {
        amount,
        expiration_ledger,
    };
    env.storage().temporary().set(&key, &allowance);

    if amount > 0 {
        let live_for = expiration_ledger
            .checked_sub(sequence)
            .ok_or(Error::MathOverflow)?;
        env.storage().temporary().extend_ttl(&key, live_for, live_for);
    }
    Ok(())
}

fn spend_allowance(env: &Env, from: &Address, spender: &Address, amount: i128) -> Result<(), Error> {
    let allowance = read_allowance(env, from, spender);
    if allowance.amount < amount {
        return Err(Error::InsufficientAllowance);
    }
    if amount > 0 {
        let remaining = allowance
            .amount
            .checked_sub(amount)
            .ok_or(Error::MathOverflow)?;
        write_allowance(env, from, spender, remaining, allowance.expiration_ledger)?;
    }
    Ok(())
}

fn check_amount(amount: i128) -> Result<(), Error> {
    if amount < 0 {
        return Err(Error::InvalidAmount);
    }
    Ok(())
}

fn check_recipient(env: &Env, to: &Address) -> Result<(), Error> {
    if *to == env.current_contract_address() {
        return Err(Error::InvalidRecipient);
    }
    Ok(())
}

fn credit(env: &Env, to: &Address, amount: i128) -> Result<(), Error> {
    let balance = read_balance(env, to)
        .checked_add(amount)
        .ok_or(Error::MathOverflow)?;
    write_balance(env, to, balance);
    Ok(())
}

fn debit(env: &Env, from: &Address, amount: i128) -> Result<(), Error> {
    let balance = read_balance(env, from);
    if balance < amount {
        return Err(Error::InsufficientBalance);
    }
    let remaining = balance.checked_sub(amount).ok_or(Error::MathOverflow)?;
    write_balance(env, from, remaining);
    Ok(())
}

fn move_balance(env: &Env, from: &Address, to: &Address, amount: i128) -> Result<(), Error> {
    if read_flag(env, &DataKey::Paused) {
        return Err(Error::TransfersPaused);
    }
    check_amount(amount)?;
    check_recipient(env, to)?;
    debit(env, from, amount)?;
    credit(env, to, amount)?;

    env.events().publish(
        (symbol_short!("transfer"), from.clone(), to.clone()),
        amount,
    );
    Ok(())
}

fn mint_to(env: &Env, to: &Address, amount: i128) -> Result<(), Error> {
    if read_flag(env, &DataKey::MintingFinished) {
        return Err(Error::MintingFinished);
    }
    check_amount(amount)?;
    check_recipient(env, to)?;

    let supply = read_total_supply(env)
        .checked_add(amount)
        .ok_or(Error::MathOverflow)?;
    credit(env, to, amount)?;
    write_total_supply(env, supply);

    env.events().publish((symbol_short!("mint"), to.clone()), amount);
    Ok(())
}

fn burn_from_balance(env: &Env, from: &Address, amount: i128) -> Result<(), Error> {
    check_amount(amount)?;
    debit(env, from, amount)?;
    let supply = read_total_supply(env)
        .checked_sub(amount)
        .ok_or(Error::MathOverflow)?;
    write_total_supply(env, supply);

    env.events().publish((symbol_short!("burn"), from.clone()), amount);
    Ok(())
}

fn set_paused(env: &Env, paused: bool) {
    env.storage().instance().set(&DataKey::Paused, &paused);
    extend_instance(env);
    if paused {
        env.events().publish((symbol_short!("paused"),), ());
    } else {
        env.events().publish((symbol_short!("unpaused"),), ());
    }
}

#[contractimpl]
impl GameToken {
    /// Deploys the ledger with zero supply. Transfers start disabled; the owner (usually the
    /// crowdsale) enables them once distribution is over.
    pub fn initialize(
        env: Env,
        owner: Address,
        name: String,
        symbol: String,
        decimals: u32,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }
        if decimals > 18 {
            return Err(Error::InvalidArgument);
        }
        owner.require_auth();

        let storage = env.storage().instance();
        storage.set(&DataKey::Owner, &owner);
        storage.set(&DataKey::Name, &name);
        storage.set(&DataKey::Symbol, &symbol);
        storage.set(&DataKey::Decimals, &decimals);
        storage.set(&DataKey::TotalSupply, &0_i128);
        storage.set(&DataKey::Paused, &true);
        storage.set(&DataKey::MintingFinished, &false);
        extend_instance(&env);
        Ok(())
    }

    pub fn name(env: Env) -> Result<String, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Name)
            .ok_or(Error::NotInitialized)
    }

    pub fn symbol(env: Env) -> Result<String, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Symbol)
            .ok_or(Error::NotInitialized)
    }

    pub fn decimals(env: Env) -> Result<u32, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Decimals)
            .ok_or(Error::NotInitialized)
    }

    pub fn total_supply(env: Env) -> i128 {
        read_total_supply(&env)
    }

    pub fn balance(env: Env, id: Address) -> i128 {
        read_balance(&env, &id)
    }

    pub fn allowance(env: Env, from: Address, spender: Address) -> i128 {
        read_allowance(&env, &from, &spender).amount
    }

    pub fn paused(env: Env) -> bool {
        read_flag(&env, &DataKey::Paused)
    }

    pub fn minting_finished(env: Env) -> bool {
        read_flag(&env, &DataKey::MintingFinished)
    }

    pub fn owner(env: Env) -> Result<Address, Error> {
        read_owner(&env)
    }

    pub fn pending_owner(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::PendingOwner)
    }

    pub fn transfer(env: Env, from: Address, to: Address, amount: i128) -> Result<(), Error> {
        from.require_auth();
        move_balance(&env, &from, &to, amount)
    }

    pub fn transfer_from(
        env: Env,
        spender: Address,
        from: Address,
        to: Address,
        amount: i128,
    ) -> Result<(), Error> {
        spender.require_auth();
        if read_flag(&env, &DataKey::Paused) {
            return Err(Error::TransfersPaused);
        }
        check_amount(amount)?;
        spend_allowance(&env, &from, &spender, amount)?;
        move_balance(&env, &from, &to, amount)
    }

    pub fn approve(
        env: Env,
        from: Address,
        spender: Address,
        amount: i128,
        expiration_ledger: u32,
    ) -> Result<(), Error> {
        from.require_auth();
        check_amount(amount)?;
        write_allowance(&env, &from, &spender, amount, expiration_ledger)?;

        env.events().publish(
            (symbol_short!("approve"), from, spender),
            (amount, expiration_ledger),
        );
        Ok(())
    }

    pub fn mint(env: Env, caller: Address, to: Address, amount: i128) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        mint_to(&env, &to, amount)
    }

    /// Same as [`GameToken::mint`]; kept under the converter-style name.
    pub fn issue(env: Env, caller: Address, to: Address, amount: i128) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        mint_to(&env, &to, amount)
    }

    /// Removes tokens from `from`. The owner may destroy from any account, a holder only from
    /// its own.
    pub fn destroy(env: Env, caller: Address, from: Address, amount: i128) -> Result<(), Error> {
        if caller != from {
            require_owner(&env, &caller)?;
        } else {
            caller.require_auth();
        }
        burn_from_balance(&env, &from, amount)
    }

    pub fn burn(env: Env, from: Address, amount: i128) -> Result<(), Error> {
        from.require_auth();
        burn_from_balance(&env, &from, amount)
    }

    pub fn burn_from(env: Env, spender: Address, from: Address, amount: i128) -> Result<(), Error> {
        spender.require_auth();
        check_amount(amount)?;
        spend_allowance(&env, &from, &spender, amount)?;
        burn_from_balance(&env, &from, amount)
    }

    pub fn disable_transfers(env: Env, caller: Address, disable: bool) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        set_paused(&env, disable);
        Ok(())
    }

    pub fn pause(env: Env, caller: Address) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        set_paused(&env, true);
        Ok(())
    }

    pub fn unpause(env: Env, caller: Address) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        set_paused(&env, false);
        Ok(())
    }

    /// Closes minting for good. `total_supply` can only shrink afterwards.
    pub fn finish_minting(env: Env, caller: Address) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        if read_flag(&env, &DataKey::MintingFinished) {
            return Err(Error::MintingFinished);
        }
        env.storage()
            .instance()
            .set(&DataKey::MintingFinished, &true);
        extend_instance(&env);

        env.events().publish((symbol_short!("mint_fin"),), ());
        Ok(())
    }

    pub fn transfer_ownership(env: Env, caller: Address, new_owner: Address) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        env.storage()
            .instance()
            .set(&DataKey::PendingOwner, &new_owner);
        extend_instance(&env);

        env.events()
            .publish((symbol_short!("own_prop"), caller), new_owner);
        Ok(())
    }

    pub fn claim_ownership(env: Env, caller: Address) -> Result<(), Error> {
        let pending: Address = env
            .storage()
            .instance()
            .get(&DataKey::PendingOwner)
            .ok_or(Error::NoPendingOwner)?;
        if caller != pending {
            return Err(Error::NoPendingOwner);
        }
        caller.require_auth();

        let previous = read_owner(&env)?;
        env.storage().instance().set(&DataKey::Owner, &caller);
        env.storage().instance().remove(&DataKey::PendingOwner);
        extend_instance(&env);

        env.events()
            .publish((symbol_short!("own_xfer"), previous), caller);
        Ok(())
    }
}

mod test;
